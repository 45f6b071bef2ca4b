use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LeadStatus {
    New,
    Contacted,
    Qualified,
    Unqualified,
    Lost,
}

impl LeadStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::New => "new",
            Self::Contacted => "contacted",
            Self::Qualified => "qualified",
            Self::Unqualified => "unqualified",
            Self::Lost => "lost",
        }
    }

    /// Statically knowable "Convert" precondition: dead leads can never be
    /// converted, so the action should be disabled up front.
    pub fn is_convertible(self) -> bool {
        !matches!(self, Self::Unqualified | Self::Lost)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LeadSource {
    Website,
    Referral,
    Social,
    Email,
    Phone,
    Other,
}

impl LeadSource {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Website => "website",
            Self::Referral => "referral",
            Self::Social => "social",
            Self::Email => "email",
            Self::Phone => "phone",
            Self::Other => "other",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OpportunityStage {
    Prospecting,
    Qualification,
    Proposal,
    Negotiation,
    ClosedWon,
    ClosedLost,
}

impl OpportunityStage {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Prospecting => "prospecting",
            Self::Qualification => "qualification",
            Self::Proposal => "proposal",
            Self::Negotiation => "negotiation",
            Self::ClosedWon => "closed_won",
            Self::ClosedLost => "closed_lost",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Lead {
    pub id: String,
    pub name: String,
    pub company: String,
    pub email: String,
    pub source: LeadSource,
    pub score: i64,
    pub status: LeadStatus,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Opportunity {
    pub id: String,
    pub name: String,
    pub stage: OpportunityStage,
    pub amount: Option<f64>,
    pub account_name: String,
    pub lead_id: Option<String>,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
}

/// Partial field update for a lead. Omitted fields keep their current value;
/// the merged record is re-validated before it is accepted anywhere.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LeadUpdate {
    pub name: Option<String>,
    pub company: Option<String>,
    pub email: Option<String>,
    pub source: Option<LeadSource>,
    pub score: Option<i64>,
    pub status: Option<LeadStatus>,
}

impl LeadUpdate {
    pub fn status(status: LeadStatus) -> Self {
        Self {
            status: Some(status),
            ..Self::default()
        }
    }

    pub fn email(email: impl Into<String>) -> Self {
        Self {
            email: Some(email.into()),
            ..Self::default()
        }
    }

    pub fn apply_to(&self, lead: &mut Lead) {
        if let Some(name) = &self.name {
            lead.name = name.clone();
        }
        if let Some(company) = &self.company {
            lead.company = company.clone();
        }
        if let Some(email) = &self.email {
            lead.email = email.clone();
        }
        if let Some(source) = self.source {
            lead.source = source;
        }
        if let Some(score) = self.score {
            lead.score = score;
        }
        if let Some(status) = self.status {
            lead.status = status;
        }
        lead.updated_at = Some(Utc::now());
    }
}

/// Payload for creating an opportunity directly.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OpportunityDraft {
    pub name: String,
    pub stage: OpportunityStage,
    pub amount: Option<f64>,
    pub account_name: String,
    pub lead_id: Option<String>,
}

/// Payload for the convert-lead workflow. The facade assigns id, timestamps
/// and the back-reference to the originating lead.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConvertFields {
    pub name: String,
    pub stage: OpportunityStage,
    pub amount: Option<f64>,
    pub account_name: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum LeadSortField {
    Score,
    Name,
    Company,
    Status,
    Source,
    CreatedAt,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum OpportunitySortField {
    Name,
    Stage,
    Amount,
    AccountName,
    CreatedAt,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    Asc,
    Desc,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LeadFilters {
    pub search: String,
    pub status: Vec<LeadStatus>,
    pub sort_by: LeadSortField,
    pub sort_order: SortOrder,
}

impl Default for LeadFilters {
    fn default() -> Self {
        Self {
            search: String::new(),
            status: Vec::new(),
            sort_by: LeadSortField::Score,
            sort_order: SortOrder::Desc,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OpportunityFilters {
    pub search: String,
    pub stage: Vec<OpportunityStage>,
    pub sort_by: OpportunitySortField,
    pub sort_order: SortOrder,
}

impl Default for OpportunityFilters {
    fn default() -> Self {
        Self {
            search: String::new(),
            stage: Vec::new(),
            sort_by: OpportunitySortField::CreatedAt,
            sort_order: SortOrder::Desc,
        }
    }
}

/// Partial-merge patch: supplied keys overwrite, omitted keys retain.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LeadFilterPatch {
    pub search: Option<String>,
    pub status: Option<Vec<LeadStatus>>,
    pub sort_by: Option<LeadSortField>,
    pub sort_order: Option<SortOrder>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OpportunityFilterPatch {
    pub search: Option<String>,
    pub stage: Option<Vec<OpportunityStage>>,
    pub sort_by: Option<OpportunitySortField>,
    pub sort_order: Option<SortOrder>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiResponse<T> {
    pub data: T,
    pub success: bool,
    pub message: Option<String>,
}

impl<T> ApiResponse<T> {
    pub fn ok(data: T, message: impl Into<String>) -> Self {
        Self {
            data,
            success: true,
            message: Some(message.into()),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConversionOutcome {
    pub lead: Lead,
    pub opportunity: Opportunity,
}

/// User-facing export bundle, also accepted back by import.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportBundle {
    pub leads: Vec<Lead>,
    pub opportunities: Vec<Opportunity>,
    pub exported_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoadingState {
    pub is_loading: bool,
    pub error: Option<String>,
}

/// The persistent subset of client state: record lists and filter criteria.
/// Selection and loading status are session-local and never persisted.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PersistedState {
    pub leads: Vec<Lead>,
    pub opportunities: Vec<Opportunity>,
    pub lead_filters: LeadFilters,
    pub opportunity_filters: OpportunityFilters,
}

/// Full read snapshot of the container, including session-local fields.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConsoleStateSnapshot {
    pub leads: Vec<Lead>,
    pub opportunities: Vec<Opportunity>,
    pub selected_lead_id: Option<String>,
    pub lead_filters: LeadFilters,
    pub opportunity_filters: OpportunityFilters,
    pub loading: LoadingState,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LeadStats {
    pub total: usize,
    pub filtered: usize,
    pub status_counts: BTreeMap<LeadStatus, usize>,
    pub average_score: i64,
    pub high_score_leads: usize,
    pub conversion_rate: i64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OpportunityStats {
    pub total: usize,
    pub filtered: usize,
    pub stage_counts: BTreeMap<OpportunityStage, usize>,
    pub total_value: f64,
    pub filtered_value: f64,
    pub won_count: usize,
    pub won_value: f64,
}

/// One page of a derived list. Pages are 1-indexed and the requested page is
/// clamped into range rather than rejected.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Page<T> {
    pub items: Vec<T>,
    pub current_page: usize,
    pub total_pages: usize,
    pub total_items: usize,
    pub items_per_page: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StorageInfo {
    pub leads: usize,
    pub opportunities: usize,
    pub total_size: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn enums_use_wire_names() {
        assert_eq!(
            serde_json::to_string(&LeadStatus::Unqualified).expect("serialize"),
            "\"unqualified\""
        );
        assert_eq!(
            serde_json::to_string(&OpportunityStage::ClosedWon).expect("serialize"),
            "\"closed_won\""
        );
        assert_eq!(
            serde_json::to_string(&LeadSortField::CreatedAt).expect("serialize"),
            "\"createdAt\""
        );
    }

    #[test]
    fn out_of_enum_status_is_rejected() {
        let err = serde_json::from_str::<LeadStatus>("\"warm\"");
        assert!(err.is_err());
    }

    #[test]
    fn lead_update_merges_and_stamps() {
        let mut lead = Lead {
            id: "lead-1".to_string(),
            name: "John Doe".to_string(),
            company: "TechCorp".to_string(),
            email: "john@techcorp.com".to_string(),
            source: LeadSource::Website,
            score: 85,
            status: LeadStatus::New,
            created_at: None,
            updated_at: None,
        };
        LeadUpdate::status(LeadStatus::Contacted).apply_to(&mut lead);
        assert_eq!(lead.status, LeadStatus::Contacted);
        assert_eq!(lead.email, "john@techcorp.com");
        assert!(lead.updated_at.is_some());
    }

    #[test]
    fn default_filters_match_initial_ui_state() {
        let lead_filters = LeadFilters::default();
        assert_eq!(lead_filters.sort_by, LeadSortField::Score);
        assert_eq!(lead_filters.sort_order, SortOrder::Desc);
        assert!(lead_filters.status.is_empty());

        let opp_filters = OpportunityFilters::default();
        assert_eq!(opp_filters.sort_by, OpportunitySortField::CreatedAt);
        assert_eq!(opp_filters.sort_order, SortOrder::Desc);
    }

    #[test]
    fn lead_serializes_camel_case() {
        let lead = Lead {
            id: "lead-1".to_string(),
            name: "John Doe".to_string(),
            company: "TechCorp".to_string(),
            email: "john@techcorp.com".to_string(),
            source: LeadSource::Referral,
            score: 70,
            status: LeadStatus::Qualified,
            created_at: None,
            updated_at: None,
        };
        let value = serde_json::to_value(&lead).expect("serialize");
        assert!(value.get("createdAt").is_some());
        assert_eq!(value["source"], "referral");
    }
}

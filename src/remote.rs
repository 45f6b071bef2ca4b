use crate::errors::{AppError, AppResult};
use crate::faults::FaultPolicy;
use crate::models::{
    ApiResponse, ConversionOutcome, ConvertFields, ExportBundle, Lead, LeadStatus, LeadUpdate,
    Opportunity, OpportunityDraft, StorageInfo,
};
use crate::storage::KvStore;
use crate::validate::{parse_leads, parse_opportunities, validate_lead, validate_opportunity};
use chrono::Utc;
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};
use uuid::Uuid;

const SEED_LEADS_JSON: &str = include_str!("seed_leads.json");

const LEADS_KEY: &str = "api-leads-data";
const OPPORTUNITIES_KEY: &str = "api-opportunities-data";
const LAST_SYNC_KEY: &str = "api-last-sync";

/// Simulated backend: in-memory tables per record type, injected latency and
/// failures, and its own durable cache independent of the client store's
/// persistence. The tables are private; the client's copy is a cache that is
/// reconciled against responses, never assumed authoritative.
pub struct RemoteService {
    leads: RwLock<Vec<Lead>>,
    opportunities: RwLock<Vec<Opportunity>>,
    faults: FaultPolicy,
    storage: Arc<KvStore>,
}

impl RemoteService {
    /// Seeds from previously persisted backend-side storage when present and
    /// valid, otherwise from the static sample data.
    pub fn new(storage: Arc<KvStore>, faults: FaultPolicy) -> AppResult<Self> {
        let leads = match load_table(&storage, LEADS_KEY, parse_leads) {
            Some(leads) => leads,
            None => seed_leads()?,
        };
        let opportunities =
            load_table(&storage, OPPORTUNITIES_KEY, parse_opportunities).unwrap_or_default();

        Ok(Self {
            leads: RwLock::new(leads),
            opportunities: RwLock::new(opportunities),
            faults,
            storage,
        })
    }

    pub async fn list_leads(&self) -> AppResult<ApiResponse<Vec<Lead>>> {
        tokio::time::sleep(self.faults.latency(300, 1000)).await;
        if self.faults.should_fail(0.05) {
            return Err(AppError::Fetch("Failed to fetch leads".to_string()));
        }
        let leads = self.read_leads()?.clone();
        Ok(ApiResponse::ok(leads, "Leads fetched successfully"))
    }

    pub async fn get_lead(&self, id: &str) -> AppResult<ApiResponse<Option<Lead>>> {
        tokio::time::sleep(self.faults.latency(100, 300)).await;
        if self.faults.should_fail(0.02) {
            return Err(AppError::Fetch("Failed to fetch lead".to_string()));
        }
        let lead = self.read_leads()?.iter().find(|lead| lead.id == id).cloned();
        let message = if lead.is_some() {
            "Lead found"
        } else {
            "Lead not found"
        };
        Ok(ApiResponse::ok(lead, message))
    }

    /// Transient failure is checked before the lookup, so a failure can mask
    /// a would-be NOT_FOUND. Callers depend on this ordering.
    pub async fn update_lead(&self, id: &str, updates: &LeadUpdate) -> AppResult<ApiResponse<Lead>> {
        tokio::time::sleep(self.faults.latency(200, 500)).await;
        if self.faults.should_fail(0.10) {
            return Err(AppError::Update("Failed to update lead".to_string()));
        }

        let updated = {
            let mut leads = self.write_leads()?;
            let index = leads
                .iter()
                .position(|lead| lead.id == id)
                .ok_or_else(|| AppError::NotFound("Lead not found".to_string()))?;

            let mut merged = leads[index].clone();
            updates.apply_to(&mut merged);
            validate_lead(&merged)
                .map_err(|_| AppError::Validation("Invalid lead data".to_string()))?;

            leads[index] = merged.clone();
            merged
        };

        self.persist_tables();
        Ok(ApiResponse::ok(updated, "Lead updated successfully"))
    }

    pub async fn list_opportunities(&self) -> AppResult<ApiResponse<Vec<Opportunity>>> {
        tokio::time::sleep(self.faults.latency(300, 1000)).await;
        if self.faults.should_fail(0.05) {
            return Err(AppError::Fetch("Failed to fetch opportunities".to_string()));
        }
        let opportunities = self.read_opportunities()?.clone();
        Ok(ApiResponse::ok(
            opportunities,
            "Opportunities fetched successfully",
        ))
    }

    pub async fn create_opportunity(
        &self,
        draft: &OpportunityDraft,
    ) -> AppResult<ApiResponse<Opportunity>> {
        tokio::time::sleep(self.faults.latency(300, 700)).await;
        if self.faults.should_fail(0.08) {
            return Err(AppError::Create("Failed to create opportunity".to_string()));
        }

        let opportunity = build_opportunity(draft.clone(), draft.lead_id.clone());
        validate_opportunity(&opportunity)
            .map_err(|_| AppError::Validation("Invalid opportunity data".to_string()))?;

        self.write_opportunities()?.push(opportunity.clone());
        self.persist_tables();
        Ok(ApiResponse::ok(
            opportunity,
            "Opportunity created successfully",
        ))
    }

    /// Atomic from the caller's point of view: every check and the
    /// opportunity construction happen before either table is touched.
    pub async fn convert_lead(
        &self,
        lead_id: &str,
        fields: &ConvertFields,
    ) -> AppResult<ApiResponse<ConversionOutcome>> {
        tokio::time::sleep(self.faults.latency(400, 800)).await;
        if self.faults.should_fail(0.10) {
            return Err(AppError::Conversion(
                "Failed to convert lead to opportunity".to_string(),
            ));
        }

        let outcome = {
            let mut leads = self.write_leads()?;
            let index = leads
                .iter()
                .position(|lead| lead.id == lead_id)
                .ok_or_else(|| AppError::NotFound("Lead not found".to_string()))?;

            if !leads[index].status.is_convertible() {
                return Err(AppError::BusinessRule(
                    "Cannot convert unqualified or lost lead".to_string(),
                ));
            }

            let draft = OpportunityDraft {
                name: fields.name.clone(),
                stage: fields.stage,
                amount: fields.amount,
                account_name: fields.account_name.clone(),
                lead_id: None,
            };
            let opportunity = build_opportunity(draft, Some(lead_id.to_string()));
            validate_opportunity(&opportunity)
                .map_err(|_| AppError::Validation("Invalid data during conversion".to_string()))?;

            let mut lead = leads[index].clone();
            lead.status = LeadStatus::Qualified;
            lead.updated_at = Some(Utc::now());

            self.write_opportunities()?.push(opportunity.clone());
            leads[index] = lead.clone();
            ConversionOutcome { lead, opportunity }
        };

        self.persist_tables();
        Ok(ApiResponse::ok(
            outcome,
            "Lead converted to opportunity successfully",
        ))
    }

    /// Restores leads to seed state and clears opportunities.
    pub async fn reset_data(&self) -> AppResult<()> {
        *self.write_leads()? = seed_leads()?;
        self.write_opportunities()?.clear();
        self.persist_tables();
        Ok(())
    }

    pub async fn export_snapshot(&self) -> AppResult<ExportBundle> {
        Ok(ExportBundle {
            leads: self.read_leads()?.clone(),
            opportunities: self.read_opportunities()?.clone(),
            exported_at: Utc::now(),
        })
    }

    /// All-or-nothing: every record is validated before any table changes.
    pub async fn import_snapshot(&self, bundle: &ExportBundle) -> AppResult<()> {
        for lead in &bundle.leads {
            validate_lead(lead)?;
        }
        for opportunity in &bundle.opportunities {
            validate_opportunity(opportunity)?;
        }

        *self.write_leads()? = bundle.leads.clone();
        *self.write_opportunities()? = bundle.opportunities.clone();
        self.persist_tables();
        Ok(())
    }

    pub fn storage_info(&self) -> AppResult<StorageInfo> {
        let leads = self.read_leads()?;
        let opportunities = self.read_opportunities()?;
        let size = serde_json::to_string(&*leads)?.len() + serde_json::to_string(&*opportunities)?.len();
        Ok(StorageInfo {
            leads: leads.len(),
            opportunities: opportunities.len(),
            total_size: format!("{:.1} KB", size as f64 / 1024.0),
        })
    }

    pub fn last_sync(&self) -> Option<String> {
        self.storage.get(LAST_SYNC_KEY).ok().flatten()
    }

    fn persist_tables(&self) {
        let result = (|| -> AppResult<()> {
            let leads = serde_json::to_string(&*self.read_leads()?)?;
            let opportunities = serde_json::to_string(&*self.read_opportunities()?)?;
            self.storage.put(LEADS_KEY, &leads)?;
            self.storage.put(OPPORTUNITIES_KEY, &opportunities)?;
            self.storage.put(LAST_SYNC_KEY, &Utc::now().to_rfc3339())?;
            Ok(())
        })();
        if let Err(error) = result {
            tracing::warn!(error = %error, "failed to persist backend tables");
        }
    }

    fn read_leads(&self) -> AppResult<RwLockReadGuard<'_, Vec<Lead>>> {
        self.leads
            .read()
            .map_err(|_| AppError::Internal("leads table lock poisoned".to_string()))
    }

    fn write_leads(&self) -> AppResult<RwLockWriteGuard<'_, Vec<Lead>>> {
        self.leads
            .write()
            .map_err(|_| AppError::Internal("leads table lock poisoned".to_string()))
    }

    fn read_opportunities(&self) -> AppResult<RwLockReadGuard<'_, Vec<Opportunity>>> {
        self.opportunities
            .read()
            .map_err(|_| AppError::Internal("opportunities table lock poisoned".to_string()))
    }

    fn write_opportunities(&self) -> AppResult<RwLockWriteGuard<'_, Vec<Opportunity>>> {
        self.opportunities
            .write()
            .map_err(|_| AppError::Internal("opportunities table lock poisoned".to_string()))
    }
}

fn seed_leads() -> AppResult<Vec<Lead>> {
    parse_leads(SEED_LEADS_JSON)
}

fn load_table<T>(
    storage: &KvStore,
    key: &str,
    parse: impl Fn(&str) -> AppResult<Vec<T>>,
) -> Option<Vec<T>> {
    let raw = storage.get(key).ok().flatten()?;
    match parse(&raw) {
        Ok(records) => Some(records),
        Err(error) => {
            tracing::warn!(key = %key, error = %error, "discarding invalid persisted table");
            None
        }
    }
}

fn build_opportunity(draft: OpportunityDraft, lead_id: Option<String>) -> Opportunity {
    let now = Utc::now();
    Opportunity {
        id: format!("opp-{}", Uuid::new_v4()),
        name: draft.name,
        stage: draft.stage,
        amount: draft.amount,
        account_name: draft.account_name,
        lead_id,
        created_at: Some(now),
        updated_at: Some(now),
    }
}

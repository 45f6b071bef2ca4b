//! Pure derivation pipeline: filter, sort, paginate and aggregate over the
//! record store. No mutation, no I/O; safe to recompute on every read.

use crate::models::{
    Lead, LeadFilters, LeadSortField, LeadStats, LeadStatus, Opportunity, OpportunityFilters,
    OpportunitySortField, OpportunityStage, OpportunityStats, Page, SortOrder,
};
use std::cmp::Ordering;
use std::collections::BTreeMap;

pub fn filter_leads(leads: &[Lead], filters: &LeadFilters) -> Vec<Lead> {
    let mut result: Vec<Lead> = leads
        .iter()
        .filter(|lead| matches_lead(lead, filters))
        .cloned()
        .collect();

    result.sort_by(|a, b| {
        let ordering = compare_leads(a, b, filters.sort_by);
        apply_order(ordering, filters.sort_order)
    });
    result
}

pub fn filter_opportunities(
    opportunities: &[Opportunity],
    filters: &OpportunityFilters,
) -> Vec<Opportunity> {
    let mut result: Vec<Opportunity> = opportunities
        .iter()
        .filter(|opportunity| matches_opportunity(opportunity, filters))
        .cloned()
        .collect();

    result.sort_by(|a, b| {
        let ordering = compare_opportunities(a, b, filters.sort_by);
        apply_order(ordering, filters.sort_order)
    });
    result
}

fn matches_lead(lead: &Lead, filters: &LeadFilters) -> bool {
    if !filters.search.is_empty() {
        let term = filters.search.to_lowercase();
        if !lead.name.to_lowercase().contains(&term)
            && !lead.company.to_lowercase().contains(&term)
        {
            return false;
        }
    }
    // Empty set means no restriction, not "match nothing".
    filters.status.is_empty() || filters.status.contains(&lead.status)
}

fn matches_opportunity(opportunity: &Opportunity, filters: &OpportunityFilters) -> bool {
    if !filters.search.is_empty() {
        let term = filters.search.to_lowercase();
        if !opportunity.name.to_lowercase().contains(&term)
            && !opportunity.account_name.to_lowercase().contains(&term)
        {
            return false;
        }
    }
    filters.stage.is_empty() || filters.stage.contains(&opportunity.stage)
}

fn compare_leads(a: &Lead, b: &Lead, field: LeadSortField) -> Ordering {
    match field {
        LeadSortField::Score => a.score.cmp(&b.score),
        LeadSortField::Name => a.name.to_lowercase().cmp(&b.name.to_lowercase()),
        LeadSortField::Company => a.company.to_lowercase().cmp(&b.company.to_lowercase()),
        LeadSortField::Status => a.status.as_str().cmp(b.status.as_str()),
        LeadSortField::Source => a.source.as_str().cmp(b.source.as_str()),
        LeadSortField::CreatedAt => timestamp_or_epoch(a.created_at).cmp(&timestamp_or_epoch(b.created_at)),
    }
}

fn compare_opportunities(a: &Opportunity, b: &Opportunity, field: OpportunitySortField) -> Ordering {
    match field {
        OpportunitySortField::Name => a.name.to_lowercase().cmp(&b.name.to_lowercase()),
        OpportunitySortField::AccountName => {
            a.account_name.to_lowercase().cmp(&b.account_name.to_lowercase())
        }
        OpportunitySortField::Stage => a.stage.as_str().cmp(b.stage.as_str()),
        OpportunitySortField::Amount => {
            a.amount.unwrap_or(0.0).total_cmp(&b.amount.unwrap_or(0.0))
        }
        OpportunitySortField::CreatedAt => {
            timestamp_or_epoch(a.created_at).cmp(&timestamp_or_epoch(b.created_at))
        }
    }
}

fn timestamp_or_epoch(value: Option<chrono::DateTime<chrono::Utc>>) -> i64 {
    value.map(|at| at.timestamp_millis()).unwrap_or(0)
}

fn apply_order(ordering: Ordering, order: SortOrder) -> Ordering {
    match order {
        SortOrder::Asc => ordering,
        SortOrder::Desc => ordering.reverse(),
    }
}

/// Next sort state for a header click: an explicit order wins; otherwise
/// toggling the already-active field flips desc to asc, everything else
/// defaults to desc.
pub fn toggle_sort<F: PartialEq + Copy>(
    current_field: F,
    current_order: SortOrder,
    field: F,
    explicit: Option<SortOrder>,
) -> (F, SortOrder) {
    let order = explicit.unwrap_or({
        if current_field == field && current_order == SortOrder::Desc {
            SortOrder::Asc
        } else {
            SortOrder::Desc
        }
    });
    (field, order)
}

pub fn paginate<T: Clone>(items: &[T], current_page: usize, items_per_page: usize) -> Page<T> {
    let per_page = items_per_page.max(1);
    let total_items = items.len();
    let total_pages = total_items.div_ceil(per_page).max(1);
    let page = current_page.clamp(1, total_pages);

    let start = (page - 1) * per_page;
    let end = (start + per_page).min(total_items);
    let slice = if start < total_items {
        items[start..end].to_vec()
    } else {
        Vec::new()
    };

    Page {
        items: slice,
        current_page: page,
        total_pages,
        total_items,
        items_per_page: per_page,
    }
}

/// Session-local pagination cursor. Any filter change must reset it: page
/// position is not meaningful across a changed result set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Pager {
    pub current_page: usize,
    pub items_per_page: usize,
}

impl Default for Pager {
    fn default() -> Self {
        Self {
            current_page: 1,
            items_per_page: 10,
        }
    }
}

impl Pager {
    pub fn go_to(&mut self, page: usize, total_pages: usize) {
        if page >= 1 && page <= total_pages.max(1) {
            self.current_page = page;
        }
    }

    pub fn next(&mut self, total_pages: usize) {
        if self.current_page < total_pages {
            self.current_page += 1;
        }
    }

    pub fn previous(&mut self) {
        if self.current_page > 1 {
            self.current_page -= 1;
        }
    }

    pub fn set_items_per_page(&mut self, items_per_page: usize) {
        self.items_per_page = items_per_page.max(1);
        self.current_page = 1;
    }

    pub fn reset(&mut self) {
        self.current_page = 1;
    }
}

pub fn lead_stats(leads: &[Lead], filtered_count: usize) -> LeadStats {
    let total = leads.len();

    let mut status_counts: BTreeMap<LeadStatus, usize> = BTreeMap::new();
    for lead in leads {
        *status_counts.entry(lead.status).or_insert(0) += 1;
    }

    let average_score = if total > 0 {
        let sum: i64 = leads.iter().map(|lead| lead.score).sum();
        (sum as f64 / total as f64).round() as i64
    } else {
        0
    };

    let high_score_leads = leads.iter().filter(|lead| lead.score >= 80).count();

    let qualified = status_counts.get(&LeadStatus::Qualified).copied().unwrap_or(0);
    let conversion_rate = if total > 0 {
        (qualified as f64 / total as f64 * 100.0).round() as i64
    } else {
        0
    };

    LeadStats {
        total,
        filtered: filtered_count,
        status_counts,
        average_score,
        high_score_leads,
        conversion_rate,
    }
}

pub fn opportunity_stats(opportunities: &[Opportunity], filtered: &[Opportunity]) -> OpportunityStats {
    let mut stage_counts: BTreeMap<OpportunityStage, usize> = BTreeMap::new();
    for opportunity in opportunities {
        *stage_counts.entry(opportunity.stage).or_insert(0) += 1;
    }

    let sum_amounts = |records: &[Opportunity]| -> f64 {
        records.iter().map(|opp| opp.amount.unwrap_or(0.0)).sum()
    };

    let won: Vec<&Opportunity> = opportunities
        .iter()
        .filter(|opp| opp.stage == OpportunityStage::ClosedWon)
        .collect();

    OpportunityStats {
        total: opportunities.len(),
        filtered: filtered.len(),
        stage_counts,
        total_value: sum_amounts(opportunities),
        filtered_value: sum_amounts(filtered),
        won_count: won.len(),
        won_value: won.iter().map(|opp| opp.amount.unwrap_or(0.0)).sum(),
    }
}

pub fn has_active_lead_filters(filters: &LeadFilters) -> bool {
    *filters != LeadFilters::default()
}

pub fn has_active_opportunity_filters(filters: &OpportunityFilters) -> bool {
    *filters != OpportunityFilters::default()
}

use crate::models::{
    ConsoleStateSnapshot, Lead, LeadFilterPatch, LeadFilters, LeadStatus, LeadUpdate, LoadingState,
    Opportunity, OpportunityFilterPatch, OpportunityFilters, PersistedState,
};
use chrono::Utc;
use std::sync::RwLock;

type PersistObserver = Box<dyn Fn(&PersistedState) + Send + Sync>;

#[derive(Debug, Clone, Default)]
struct ConsoleState {
    leads: Vec<Lead>,
    opportunities: Vec<Opportunity>,
    selected_lead_id: Option<String>,
    lead_filters: LeadFilters,
    opportunity_filters: OpportunityFilters,
    loading: LoadingState,
}

/// Single source of truth for leads, opportunities, selection, filter
/// criteria and loading status. All mutations are synchronous and run
/// through this operation set; nothing writes fields directly.
///
/// The persistent subset (record lists and filters) notifies a registered
/// observer after every change; the Persistence Gateway attaches there.
#[derive(Default)]
pub struct ConsoleStore {
    state: RwLock<ConsoleState>,
    observer: RwLock<Option<PersistObserver>>,
}

impl ConsoleStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn restore(&self, persisted: PersistedState) {
        {
            let mut state = self.write();
            state.leads = persisted.leads;
            state.opportunities = persisted.opportunities;
            state.lead_filters = persisted.lead_filters;
            state.opportunity_filters = persisted.opportunity_filters;
        }
        // Restoring is not a user mutation; no observer notification, or a
        // fresh load would immediately rewrite what it just read.
    }

    pub fn set_observer(&self, observer: PersistObserver) {
        let mut slot = self
            .observer
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        *slot = Some(observer);
    }

    // ─── Records ────────────────────────────────────────────────────────

    pub fn set_leads(&self, leads: Vec<Lead>) {
        self.write().leads = leads;
        self.notify_persistent_change();
    }

    pub fn set_opportunities(&self, opportunities: Vec<Opportunity>) {
        self.write().opportunities = opportunities;
        self.notify_persistent_change();
    }

    /// Merges partial fields into the matching lead and stamps updatedAt.
    /// Selection stays live automatically because only the id is stored.
    pub fn update_lead(&self, lead_id: &str, updates: &LeadUpdate) {
        {
            let mut state = self.write();
            if let Some(lead) = state.leads.iter_mut().find(|lead| lead.id == lead_id) {
                updates.apply_to(lead);
            }
        }
        self.notify_persistent_change();
    }

    /// Whole-record swap by id; used for rollback to a pre-mutation snapshot
    /// and for reconciling with a server-stamped record.
    pub fn replace_lead(&self, lead: Lead) {
        {
            let mut state = self.write();
            if let Some(existing) = state.leads.iter_mut().find(|existing| existing.id == lead.id)
            {
                *existing = lead;
            }
        }
        self.notify_persistent_change();
    }

    pub fn add_opportunity(&self, opportunity: Opportunity) {
        self.write().opportunities.push(opportunity);
        self.notify_persistent_change();
    }

    pub fn bulk_update_status(&self, lead_ids: &[String], status: LeadStatus) {
        {
            let mut state = self.write();
            let now = Utc::now();
            for lead in state.leads.iter_mut() {
                if lead_ids.contains(&lead.id) {
                    lead.status = status;
                    lead.updated_at = Some(now);
                }
            }
        }
        self.notify_persistent_change();
    }

    /// Batch-delete utility; not part of the primary workflow.
    pub fn bulk_delete(&self, lead_ids: &[String]) {
        {
            let mut state = self.write();
            state.leads.retain(|lead| !lead_ids.contains(&lead.id));
            if let Some(selected) = &state.selected_lead_id {
                if lead_ids.contains(selected) {
                    state.selected_lead_id = None;
                }
            }
        }
        self.notify_persistent_change();
    }

    // ─── Selection ──────────────────────────────────────────────────────

    pub fn select_lead(&self, lead_id: &str) {
        let mut state = self.write();
        if state.leads.iter().any(|lead| lead.id == lead_id) {
            state.selected_lead_id = Some(lead_id.to_string());
        }
    }

    pub fn clear_selection(&self) {
        self.write().selected_lead_id = None;
    }

    pub fn selected_lead(&self) -> Option<Lead> {
        let state = self.read();
        let selected = state.selected_lead_id.as_deref()?;
        state.leads.iter().find(|lead| lead.id == selected).cloned()
    }

    pub fn lead_by_id(&self, lead_id: &str) -> Option<Lead> {
        self.read().leads.iter().find(|lead| lead.id == lead_id).cloned()
    }

    // ─── Filters ────────────────────────────────────────────────────────

    pub fn patch_lead_filters(&self, patch: &LeadFilterPatch) {
        {
            let mut state = self.write();
            let filters = &mut state.lead_filters;
            if let Some(search) = &patch.search {
                filters.search = search.clone();
            }
            if let Some(status) = &patch.status {
                filters.status = status.clone();
            }
            if let Some(sort_by) = patch.sort_by {
                filters.sort_by = sort_by;
            }
            if let Some(sort_order) = patch.sort_order {
                filters.sort_order = sort_order;
            }
        }
        self.notify_persistent_change();
    }

    pub fn reset_lead_filters(&self) {
        self.write().lead_filters = LeadFilters::default();
        self.notify_persistent_change();
    }

    pub fn patch_opportunity_filters(&self, patch: &OpportunityFilterPatch) {
        {
            let mut state = self.write();
            let filters = &mut state.opportunity_filters;
            if let Some(search) = &patch.search {
                filters.search = search.clone();
            }
            if let Some(stage) = &patch.stage {
                filters.stage = stage.clone();
            }
            if let Some(sort_by) = patch.sort_by {
                filters.sort_by = sort_by;
            }
            if let Some(sort_order) = patch.sort_order {
                filters.sort_order = sort_order;
            }
        }
        self.notify_persistent_change();
    }

    pub fn reset_opportunity_filters(&self) {
        self.write().opportunity_filters = OpportunityFilters::default();
        self.notify_persistent_change();
    }

    // ─── Loading / errors ───────────────────────────────────────────────

    pub fn set_loading(&self, is_loading: bool) {
        self.write().loading.is_loading = is_loading;
    }

    pub fn set_error(&self, error: Option<String>) {
        self.write().loading.error = error;
    }

    // ─── Read snapshots ─────────────────────────────────────────────────

    pub fn leads(&self) -> Vec<Lead> {
        self.read().leads.clone()
    }

    pub fn opportunities(&self) -> Vec<Opportunity> {
        self.read().opportunities.clone()
    }

    pub fn lead_filters(&self) -> LeadFilters {
        self.read().lead_filters.clone()
    }

    pub fn opportunity_filters(&self) -> OpportunityFilters {
        self.read().opportunity_filters.clone()
    }

    pub fn loading(&self) -> LoadingState {
        self.read().loading.clone()
    }

    pub fn snapshot(&self) -> ConsoleStateSnapshot {
        let state = self.read();
        ConsoleStateSnapshot {
            leads: state.leads.clone(),
            opportunities: state.opportunities.clone(),
            selected_lead_id: state.selected_lead_id.clone(),
            lead_filters: state.lead_filters.clone(),
            opportunity_filters: state.opportunity_filters.clone(),
            loading: state.loading.clone(),
        }
    }

    pub fn persisted_state(&self) -> PersistedState {
        let state = self.read();
        PersistedState {
            leads: state.leads.clone(),
            opportunities: state.opportunities.clone(),
            lead_filters: state.lead_filters.clone(),
            opportunity_filters: state.opportunity_filters.clone(),
        }
    }

    fn notify_persistent_change(&self) {
        let observer = self
            .observer
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        if let Some(observer) = observer.as_ref() {
            observer(&self.persisted_state());
        }
    }

    fn read(&self) -> std::sync::RwLockReadGuard<'_, ConsoleState> {
        self.state
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn write(&self) -> std::sync::RwLockWriteGuard<'_, ConsoleState> {
        self.state
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

use crate::errors::AppResult;
use crate::models::{
    ConversionOutcome, ConvertFields, ExportBundle, Lead, LeadUpdate, Opportunity,
    OpportunityDraft,
};
use crate::persist::PersistenceGateway;
use crate::remote::RemoteService;
use crate::store::ConsoleStore;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

/// Orchestrates reads and optimistic writes between the client store and the
/// simulated backend. Owned by the application's composition root; both
/// collaborators are injected.
pub struct MutationCoordinator {
    store: Arc<ConsoleStore>,
    remote: Arc<RemoteService>,
    // Per-record edit sequence. A settlement whose sequence is stale (a
    // newer edit was issued while it was in flight) must neither reconcile
    // nor roll back, or it would clobber the newer optimistic value.
    edit_seqs: Mutex<HashMap<String, u64>>,
}

impl MutationCoordinator {
    pub fn new(store: Arc<ConsoleStore>, remote: Arc<RemoteService>) -> Self {
        Self {
            store,
            remote,
            edit_seqs: Mutex::new(HashMap::new()),
        }
    }

    pub fn store(&self) -> &Arc<ConsoleStore> {
        &self.store
    }

    pub fn remote(&self) -> &Arc<RemoteService> {
        &self.remote
    }

    // ─── Read paths ─────────────────────────────────────────────────────

    pub async fn refresh_leads(&self) -> AppResult<Vec<Lead>> {
        self.store.set_loading(true);
        self.store.set_error(None);
        let result = self.remote.list_leads().await;
        self.store.set_loading(false);
        match result {
            Ok(response) => {
                self.store.set_leads(response.data.clone());
                Ok(response.data)
            }
            Err(error) => {
                self.store.set_error(Some(error.to_string()));
                Err(error)
            }
        }
    }

    pub async fn refresh_opportunities(&self) -> AppResult<Vec<Opportunity>> {
        self.store.set_loading(true);
        self.store.set_error(None);
        let result = self.remote.list_opportunities().await;
        self.store.set_loading(false);
        match result {
            Ok(response) => {
                self.store.set_opportunities(response.data.clone());
                Ok(response.data)
            }
            Err(error) => {
                self.store.set_error(Some(error.to_string()));
                Err(error)
            }
        }
    }

    // ─── Optimistic field edit ──────────────────────────────────────────

    /// Applies the edit to the store before the remote call resolves. The
    /// rollback snapshot is captured before the optimistic write. On success
    /// the store is reconciled with the authoritative server-stamped record;
    /// on failure it reverts to the snapshot and the error is surfaced.
    pub async fn update_lead(&self, lead_id: &str, updates: LeadUpdate) -> AppResult<Lead> {
        let snapshot = self.store.lead_by_id(lead_id);
        if snapshot.is_some() {
            self.store.update_lead(lead_id, &updates);
        }
        let seq = self.bump_seq(lead_id);

        let result = self.remote.update_lead(lead_id, &updates).await;
        let still_current = self.is_current_seq(lead_id, seq);

        match result {
            Ok(response) => {
                if still_current {
                    self.store.replace_lead(response.data.clone());
                }
                Ok(response.data)
            }
            Err(error) => {
                if still_current {
                    if let Some(prior) = snapshot {
                        self.store.replace_lead(prior);
                    }
                    self.store.set_error(Some(error.to_string()));
                }
                Err(error)
            }
        }
    }

    // ─── Conversion ─────────────────────────────────────────────────────

    /// No optimistic pre-write: the opportunity does not exist until the
    /// server assigns its id. On failure nothing was applied locally, so
    /// there is nothing to roll back.
    pub async fn convert_lead(
        &self,
        lead_id: &str,
        fields: ConvertFields,
    ) -> AppResult<ConversionOutcome> {
        match self.remote.convert_lead(lead_id, &fields).await {
            Ok(response) => {
                let outcome = response.data;
                self.store.replace_lead(outcome.lead.clone());
                self.store.add_opportunity(outcome.opportunity.clone());
                Ok(outcome)
            }
            Err(error) => {
                self.store.set_error(Some(error.to_string()));
                Err(error)
            }
        }
    }

    pub async fn create_opportunity(&self, draft: OpportunityDraft) -> AppResult<Opportunity> {
        match self.remote.create_opportunity(&draft).await {
            Ok(response) => {
                self.store.add_opportunity(response.data.clone());
                Ok(response.data)
            }
            Err(error) => {
                self.store.set_error(Some(error.to_string()));
                Err(error)
            }
        }
    }

    // ─── Data management ────────────────────────────────────────────────

    pub async fn export_data(&self) -> AppResult<ExportBundle> {
        self.remote.export_snapshot().await
    }

    /// Imports a bundle into the backend, then re-syncs the store from the
    /// backend's accepted copy.
    pub async fn import_data(&self, bundle: &ExportBundle) -> AppResult<()> {
        self.remote.import_snapshot(bundle).await?;
        let synced = self.remote.export_snapshot().await?;
        self.store.set_leads(synced.leads);
        self.store.set_opportunities(synced.opportunities);
        Ok(())
    }

    pub async fn clear_all_data(&self, gateway: &PersistenceGateway) -> AppResult<()> {
        self.remote.reset_data().await?;
        self.store.set_leads(Vec::new());
        self.store.set_opportunities(Vec::new());
        gateway.clear();
        Ok(())
    }

    fn bump_seq(&self, lead_id: &str) -> u64 {
        let mut seqs = self
            .edit_seqs
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        let entry = seqs.entry(lead_id.to_string()).or_insert(0);
        *entry += 1;
        *entry
    }

    fn is_current_seq(&self, lead_id: &str, seq: u64) -> bool {
        let seqs = self
            .edit_seqs
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        seqs.get(lead_id).copied() == Some(seq)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::AppError;
    use crate::faults::FaultPolicy;
    use crate::models::{LeadStatus, OpportunityStage};
    use crate::storage::KvStore;

    fn coordinator(faults: FaultPolicy) -> MutationCoordinator {
        let storage = Arc::new(KvStore::open_in_memory().expect("storage"));
        let remote = Arc::new(RemoteService::new(storage, faults).expect("remote"));
        MutationCoordinator::new(Arc::new(ConsoleStore::new()), remote)
    }

    fn convert_fields() -> ConvertFields {
        ConvertFields {
            name: "Integration Project".to_string(),
            stage: OpportunityStage::Prospecting,
            amount: Some(150_000.0),
            account_name: "TechCorp Brasil".to_string(),
        }
    }

    #[tokio::test]
    async fn refresh_populates_store_and_clears_loading() {
        let coordinator = coordinator(FaultPolicy::disabled());
        let leads = coordinator.refresh_leads().await.expect("refresh");
        assert_eq!(leads.len(), 10);
        assert_eq!(coordinator.store().leads().len(), 10);

        let loading = coordinator.store().loading();
        assert!(!loading.is_loading);
        assert!(loading.error.is_none());
    }

    #[tokio::test]
    async fn failed_refresh_sets_container_error_flag() {
        let coordinator = coordinator(FaultPolicy::always_fail());
        let err = coordinator.refresh_leads().await.expect_err("forced failure");
        assert!(err.is_transient());

        let loading = coordinator.store().loading();
        assert!(!loading.is_loading);
        assert!(loading.error.as_deref().unwrap_or("").starts_with("FETCH_ERROR"));
        assert!(coordinator.store().leads().is_empty());
    }

    #[tokio::test]
    async fn successful_edit_reconciles_server_stamp() {
        let coordinator = coordinator(FaultPolicy::disabled());
        coordinator.refresh_leads().await.expect("refresh");

        let updated = coordinator
            .update_lead("lead-001", LeadUpdate::status(LeadStatus::Contacted))
            .await
            .expect("update");
        assert_eq!(updated.status, LeadStatus::Contacted);

        let stored = coordinator.store().lead_by_id("lead-001").expect("lead");
        // The store carries the authoritative server-stamped record.
        assert_eq!(stored.updated_at, updated.updated_at);
    }

    #[tokio::test]
    async fn invalid_email_edit_rolls_back_the_store() {
        let coordinator = coordinator(FaultPolicy::disabled());
        coordinator.refresh_leads().await.expect("refresh");
        let before = coordinator.store().lead_by_id("lead-001").expect("lead");

        let err = coordinator
            .update_lead("lead-001", LeadUpdate::email("invalid-email"))
            .await
            .expect_err("invalid email");
        assert!(matches!(err, AppError::Validation(_)));

        let after = coordinator.store().lead_by_id("lead-001").expect("lead");
        assert_eq!(after, before);
        assert!(coordinator.store().loading().error.is_some());
    }

    #[tokio::test]
    async fn transient_edit_failure_reverts_optimistic_value() {
        let storage = Arc::new(KvStore::open_in_memory().expect("storage"));
        let healthy = RemoteService::new(storage.clone(), FaultPolicy::disabled()).expect("remote");
        let seed = healthy.export_snapshot().await.expect("export");

        let failing = Arc::new(RemoteService::new(storage, FaultPolicy::always_fail()).expect("remote"));
        let store = Arc::new(ConsoleStore::new());
        store.set_leads(seed.leads);
        let coordinator = MutationCoordinator::new(store, failing);

        let before = coordinator.store().lead_by_id("lead-001").expect("lead");
        let err = coordinator
            .update_lead("lead-001", LeadUpdate::status(LeadStatus::Qualified))
            .await
            .expect_err("forced failure");
        assert!(err.is_transient());
        assert_eq!(coordinator.store().lead_by_id("lead-001").expect("lead"), before);
    }

    #[tokio::test]
    async fn conversion_merges_lead_and_appends_opportunity() {
        let coordinator = coordinator(FaultPolicy::disabled());
        coordinator.refresh_leads().await.expect("refresh");

        let outcome = coordinator
            .convert_lead("lead-001", convert_fields())
            .await
            .expect("convert");

        let lead = coordinator.store().lead_by_id("lead-001").expect("lead");
        assert_eq!(lead.status, LeadStatus::Qualified);
        let opportunities = coordinator.store().opportunities();
        assert_eq!(opportunities.len(), 1);
        assert_eq!(opportunities[0].id, outcome.opportunity.id);
        assert_eq!(opportunities[0].lead_id.as_deref(), Some("lead-001"));
    }

    #[tokio::test]
    async fn failed_conversion_leaves_store_untouched() {
        let coordinator = coordinator(FaultPolicy::disabled());
        coordinator.refresh_leads().await.expect("refresh");
        let leads_before = coordinator.store().leads();

        // lead-008 is lost; the business rule fires server-side.
        let err = coordinator
            .convert_lead("lead-008", convert_fields())
            .await
            .expect_err("dead lead");
        assert!(matches!(err, AppError::BusinessRule(_)));

        assert_eq!(coordinator.store().leads(), leads_before);
        assert!(coordinator.store().opportunities().is_empty());
    }

    #[tokio::test]
    async fn stale_settlement_does_not_clobber_newer_edit() {
        let coordinator = coordinator(FaultPolicy::disabled());
        coordinator.refresh_leads().await.expect("refresh");

        // Simulate a later edit landing while an earlier one is in flight:
        // the earlier sequence token is no longer current.
        let first_seq = coordinator.bump_seq("lead-001");
        let second_seq = coordinator.bump_seq("lead-001");
        assert!(!coordinator.is_current_seq("lead-001", first_seq));
        assert!(coordinator.is_current_seq("lead-001", second_seq));
    }

    #[tokio::test]
    async fn clear_all_data_resets_backend_store_and_client_key() {
        let storage = Arc::new(KvStore::open_in_memory().expect("storage"));
        let remote = Arc::new(RemoteService::new(storage.clone(), FaultPolicy::disabled()).expect("remote"));
        let store = Arc::new(ConsoleStore::new());
        let gateway = PersistenceGateway::new(storage);
        gateway.attach(&store);
        let coordinator = MutationCoordinator::new(store, remote);

        coordinator.refresh_leads().await.expect("refresh");
        coordinator
            .convert_lead("lead-001", convert_fields())
            .await
            .expect("convert");

        coordinator.clear_all_data(&gateway).await.expect("clear");
        assert!(coordinator.store().leads().is_empty());
        assert!(coordinator.store().opportunities().is_empty());
        // Backend is back at seed state.
        let leads = coordinator.remote().list_leads().await.expect("list").data;
        assert_eq!(leads.len(), 10);
    }
}

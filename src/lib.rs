mod coordinator;
mod errors;
mod faults;
mod models;
mod persist;
mod remote;
mod storage;
mod store;
mod validate;
mod views;

pub use coordinator::MutationCoordinator;
pub use errors::{AppError, AppResult};
pub use faults::FaultPolicy;
pub use models::{
    ApiResponse, ConsoleStateSnapshot, ConversionOutcome, ConvertFields, ExportBundle, Lead,
    LeadFilterPatch, LeadFilters, LeadSortField, LeadSource, LeadStats, LeadStatus, LeadUpdate,
    LoadingState, Opportunity, OpportunityDraft, OpportunityFilterPatch, OpportunityFilters,
    OpportunitySortField, OpportunityStage, OpportunityStats, Page, PersistedState, SortOrder,
    StorageInfo,
};
pub use persist::{PersistenceGateway, CLIENT_STATE_KEY, SCHEMA_VERSION};
pub use remote::RemoteService;
pub use storage::KvStore;
pub use store::ConsoleStore;
pub use validate::{
    lead_field_errors, opportunity_field_errors, parse_leads, parse_opportunities, validate_lead,
    validate_opportunity, FieldError,
};
pub use views::{
    filter_leads, filter_opportunities, has_active_lead_filters, has_active_opportunity_filters,
    lead_stats, opportunity_stats, paginate, toggle_sort, Pager,
};

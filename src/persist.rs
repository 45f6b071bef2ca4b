use crate::errors::{AppError, AppResult};
use crate::models::PersistedState;
use crate::storage::KvStore;
use crate::store::ConsoleStore;
use crate::validate::{validate_lead, validate_opportunity};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

pub const SCHEMA_VERSION: i64 = 1;
pub const CLIENT_STATE_KEY: &str = "console-state";

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Envelope {
    version: i64,
    state: serde_json::Value,
}

/// Serializes the persistent subset of client state to durable storage with
/// a schema version tag. Loading never fails: absent, corrupt or
/// incompatible payloads fall back to defaults. Saving never propagates
/// storage errors; a failed save must not crash a mutation.
pub struct PersistenceGateway {
    storage: Arc<KvStore>,
}

impl PersistenceGateway {
    pub fn new(storage: Arc<KvStore>) -> Self {
        Self { storage }
    }

    pub fn load(&self) -> PersistedState {
        match self.try_load() {
            Ok(state) => state,
            Err(error) => {
                tracing::warn!(error = %error, "falling back to default client state");
                PersistedState::default()
            }
        }
    }

    fn try_load(&self) -> AppResult<PersistedState> {
        let Some(raw) = self.storage.get(CLIENT_STATE_KEY)? else {
            return Ok(PersistedState::default());
        };

        let envelope: Envelope = serde_json::from_str(&raw)
            .map_err(|error| AppError::Storage(format!("corrupt client state: {error}")))?;
        if envelope.version > SCHEMA_VERSION {
            return Err(AppError::Storage(format!(
                "stored schema version {} is newer than supported {}",
                envelope.version, SCHEMA_VERSION
            )));
        }

        let migrated = migrate(envelope.state, envelope.version);
        let state: PersistedState = serde_json::from_value(migrated)
            .map_err(|error| AppError::Validation(error.to_string()))?;

        // Records from durable storage pass the same validation boundary as
        // remote responses and imports.
        for lead in &state.leads {
            validate_lead(lead)?;
        }
        for opportunity in &state.opportunities {
            validate_opportunity(opportunity)?;
        }
        Ok(state)
    }

    pub fn save(&self, state: &PersistedState) {
        let result = (|| -> AppResult<()> {
            let envelope = Envelope {
                version: SCHEMA_VERSION,
                state: serde_json::to_value(state)?,
            };
            let raw = serde_json::to_string(&envelope)?;
            self.storage.put(CLIENT_STATE_KEY, &raw)
        })();
        if let Err(error) = result {
            tracing::warn!(error = %error, "failed to persist client state");
        }
    }

    pub fn clear(&self) {
        if let Err(error) = self.storage.delete(CLIENT_STATE_KEY) {
            tracing::warn!(error = %error, "failed to clear client state");
        }
    }

    /// Registers the on-change observer so every mutation of the persistent
    /// subset re-serializes synchronously.
    pub fn attach(&self, store: &ConsoleStore) {
        let storage = Arc::clone(&self.storage);
        store.set_observer(Box::new(move |state| {
            let gateway = PersistenceGateway::new(Arc::clone(&storage));
            gateway.save(state);
        }));
    }
}

/// Forward migration hook: pure function of the stored payload and its
/// version. Version 1 is current, so this is a pass-through today.
fn migrate(state: serde_json::Value, from_version: i64) -> serde_json::Value {
    if from_version < SCHEMA_VERSION {
        // Older-version transforms slot in here as the schema evolves.
    }
    state
}

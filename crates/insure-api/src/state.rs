//! Axum application state: the handles every handler and background loop
//! shares.

use std::sync::Arc;

use axum::extract::FromRef;
use insure_security::ApiKeyStore;
use insure_state::collaborators::UtilizationTracker;
use insure_state::SharedState;

#[derive(Clone)]
pub struct ApiState {
    pub shared: SharedState,
    pub utilization: Arc<dyn UtilizationTracker>,
    pub api_keys: ApiKeyStore,
}

impl FromRef<ApiState> for ApiKeyStore {
    fn from_ref(state: &ApiState) -> Self {
        state.api_keys.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use insure_core::{Cents, UnifiedPool};
    use insure_state::SharedState;

    #[test]
    fn from_ref_extracts_the_shared_api_key_store() {
        let state = ApiState {
            shared: SharedState::new(UnifiedPool::new(Cents::new(1_000))),
            utilization: Arc::new(crate::adapters::UnconfiguredUtilizationTracker),
            api_keys: ApiKeyStore::default(),
        };
        let _keys: ApiKeyStore = FromRef::from_ref(&state);
    }
}

use axum::extract::FromRef;

use crate::catalog_api::CatalogApi;
use crate::experiment::ExperimentManager;
use crate::oauth::{AuthStateStore, OAuthClient};
use crate::store::FullStore;
use std::sync::Arc;
use std::time::Instant;

use super::ServerConfig;

pub type GuardedStore = Arc<dyn FullStore>;
pub type GuardedCatalogApi = Arc<dyn CatalogApi>;
pub type GuardedExperimentManager = Arc<ExperimentManager>;
pub type OptionalOAuthClient = Option<Arc<OAuthClient>>;
pub type GuardedAuthStateStore = Arc<AuthStateStore>;

#[derive(Clone)]
pub struct ServerState {
    pub config: ServerConfig,
    pub start_time: Instant,
    pub store: GuardedStore,
    pub catalog_api: GuardedCatalogApi,
    pub experiment_manager: GuardedExperimentManager,
    pub oauth_client: OptionalOAuthClient,
    pub auth_state_store: GuardedAuthStateStore,
    pub version: String,
}

impl ServerState {
    pub fn new(
        config: ServerConfig,
        store: GuardedStore,
        catalog_api: GuardedCatalogApi,
        oauth_client: Option<OAuthClient>,
    ) -> ServerState {
        ServerState {
            config,
            start_time: Instant::now(),
            experiment_manager: Arc::new(ExperimentManager::new(store.clone())),
            store,
            catalog_api,
            oauth_client: oauth_client.map(Arc::new),
            auth_state_store: Arc::new(AuthStateStore::new()),
            version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }
}

impl FromRef<ServerState> for GuardedStore {
    fn from_ref(input: &ServerState) -> Self {
        input.store.clone()
    }
}

impl FromRef<ServerState> for GuardedCatalogApi {
    fn from_ref(input: &ServerState) -> Self {
        input.catalog_api.clone()
    }
}

impl FromRef<ServerState> for GuardedExperimentManager {
    fn from_ref(input: &ServerState) -> Self {
        input.experiment_manager.clone()
    }
}

impl FromRef<ServerState> for OptionalOAuthClient {
    fn from_ref(input: &ServerState) -> Self {
        input.oauth_client.clone()
    }
}

impl FromRef<ServerState> for GuardedAuthStateStore {
    fn from_ref(input: &ServerState) -> Self {
        input.auth_state_store.clone()
    }
}

impl FromRef<ServerState> for ServerConfig {
    fn from_ref(input: &ServerState) -> Self {
        input.config.clone()
    }
}

//! Application context shared across the dashboard.
//!
//! One explicit object wires configuration, the HTTP adapter and the
//! services together; there are no ambient singletons.

use std::sync::Arc;

use crate::auth::AuthService;
use crate::config::Config;
use crate::credentials::{CredentialStore, FileCredentialStore};
use crate::http::ApiClient;
use crate::resources::{DashboardService, InvestorService, ProjectService};

/// Shared application context
#[derive(Clone)]
pub struct App {
    pub config: Config,
    pub client: Arc<ApiClient>,
    pub auth: Arc<AuthService>,
    pub projects: Arc<ProjectService>,
    pub investors: Arc<InvestorService>,
    pub dashboard: Arc<DashboardService>,
}

impl App {
    /// Context backed by the file credential store at
    /// `config.credentials_path`.
    pub fn new(config: Config) -> Self {
        let credentials = Arc::new(FileCredentialStore::new(config.credentials_path.clone()));
        Self::with_credential_store(config, credentials)
    }

    /// Context with an injected credential store (in-memory for tests and
    /// embedded use).
    pub fn with_credential_store(config: Config, credentials: Arc<dyn CredentialStore>) -> Self {
        let client = Arc::new(ApiClient::new(&config, credentials.clone()));
        Self {
            config,
            auth: Arc::new(AuthService::new(client.clone(), credentials)),
            projects: Arc::new(ProjectService::new(client.clone())),
            investors: Arc::new(InvestorService::new(client.clone())),
            dashboard: Arc::new(DashboardService::new(client.clone())),
            client,
        }
    }
}

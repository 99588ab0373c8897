//! Dashboard statistics store. Read-only; refreshed on demand.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use tokio::sync::RwLock;

use crate::http::ApiClient;
use crate::models::DashboardStats;

const LOAD_FAILED: &str = "Failed to load statistics";

#[derive(Debug, Clone, Default)]
pub struct DashboardState {
    pub stats: Option<DashboardStats>,
    pub last_updated: Option<DateTime<Utc>>,
    pub is_loading: bool,
    pub error: Option<String>,
}

pub struct DashboardService {
    client: Arc<ApiClient>,
    state: RwLock<DashboardState>,
}

impl DashboardService {
    pub fn new(client: Arc<ApiClient>) -> Self {
        Self {
            client,
            state: RwLock::new(DashboardState::default()),
        }
    }

    pub async fn state(&self) -> DashboardState {
        self.state.read().await.clone()
    }

    pub async fn clear_error(&self) {
        self.state.write().await.error = None;
    }

    /// Fetches a fresh snapshot. `last_updated` moves only on success, so a
    /// failed refresh keeps showing when the visible numbers were taken.
    pub async fn fetch_stats(&self) -> Option<DashboardStats> {
        {
            let mut state = self.state.write().await;
            state.is_loading = true;
            state.error = None;
        }

        match self.client.get::<DashboardStats>("/dashboard/stats").await {
            Ok(stats) => {
                let mut state = self.state.write().await;
                state.is_loading = false;
                state.stats = Some(stats.clone());
                state.last_updated = Some(Utc::now());
                Some(stats)
            }
            Err(err) => {
                let mut state = self.state.write().await;
                state.is_loading = false;
                state.error = Some(err.message_or(LOAD_FAILED));
                None
            }
        }
    }
}

//! Investor store: KYC review listing, detail and decisions.

use std::sync::Arc;

use tokio::sync::RwLock;
use tracing::debug;
use uuid::Uuid;

use crate::error::ApiError;
use crate::http::ApiClient;
use crate::models::{Investor, KycDecisionRequest, KycStatus};

use super::{reconcile, CacheOp, Keyed};

const LOAD_FAILED: &str = "Failed to load investors";
const NOT_FOUND: &str = "Investor not found";
const KYC_FAILED: &str = "Failed to update KYC status";

impl Keyed for Investor {
    fn key(&self) -> Uuid {
        self.id
    }
}

#[derive(Debug, Clone, Default)]
pub struct InvestorFilters {
    pub kyc_status: Option<KycStatus>,
    pub search: String,
}

#[derive(Debug, Clone, Default)]
pub struct InvestorsState {
    pub investors: Vec<Investor>,
    pub current_investor: Option<Investor>,
    pub is_loading: bool,
    pub error: Option<String>,
    pub filters: InvestorFilters,
}

pub struct InvestorService {
    client: Arc<ApiClient>,
    state: RwLock<InvestorsState>,
}

impl InvestorService {
    pub fn new(client: Arc<ApiClient>) -> Self {
        Self {
            client,
            state: RwLock::new(InvestorsState::default()),
        }
    }

    pub async fn state(&self) -> InvestorsState {
        self.state.read().await.clone()
    }

    pub async fn clear_error(&self) {
        self.state.write().await.error = None;
    }

    pub async fn clear_current(&self) {
        self.state.write().await.current_investor = None;
    }

    async fn begin(&self) {
        let mut state = self.state.write().await;
        state.is_loading = true;
        state.error = None;
    }

    async fn fail(&self, err: ApiError, fallback: &str) {
        let mut state = self.state.write().await;
        state.is_loading = false;
        state.error = Some(err.message_or(fallback));
    }

    /// Replaces the cached collection with the backend result for the
    /// current filters. Both the KYC status and the search term travel to
    /// the backend; the search term is also applied client-side by
    /// `visible_investors`.
    pub async fn fetch_investors(&self) -> bool {
        let filters = self.state.read().await.filters.clone();
        self.begin().await;

        let mut query: Vec<(&str, String)> = Vec::new();
        if let Some(status) = filters.kyc_status {
            query.push(("kycStatus", status.as_str().to_string()));
        }
        if !filters.search.trim().is_empty() {
            query.push(("search", filters.search.trim().to_string()));
        }

        match self
            .client
            .get_with_query::<Vec<Investor>>("/investors", &query)
            .await
        {
            Ok(investors) => {
                debug!(count = investors.len(), "investors fetched");
                let mut state = self.state.write().await;
                state.is_loading = false;
                reconcile(&mut state.investors, CacheOp::Replace(investors));
                true
            }
            Err(err) => {
                self.fail(err, LOAD_FAILED).await;
                false
            }
        }
    }

    pub async fn fetch_investor(&self, id: Uuid) -> Option<Investor> {
        self.begin().await;
        match self
            .client
            .get::<Investor>(&format!("/investors/{id}"))
            .await
        {
            Ok(investor) => {
                let mut state = self.state.write().await;
                state.is_loading = false;
                state.current_investor = Some(investor.clone());
                Some(investor)
            }
            Err(err) => {
                self.fail(err, NOT_FOUND).await;
                None
            }
        }
    }

    /// Records an admin KYC decision. The decision is one-shot in the UI
    /// (`Investor::kyc_decision_open`); the backend remains the real gate
    /// and its rejections surface verbatim.
    pub async fn decide_kyc(&self, id: Uuid, request: KycDecisionRequest) -> Option<Investor> {
        self.begin().await;
        match self
            .client
            .patch::<_, Investor>(&format!("/investors/{id}/kyc"), &request)
            .await
        {
            Ok(investor) => {
                let mut state = self.state.write().await;
                state.is_loading = false;
                if state
                    .current_investor
                    .as_ref()
                    .is_some_and(|current| current.id == investor.id)
                {
                    state.current_investor = Some(investor.clone());
                }
                reconcile(&mut state.investors, CacheOp::Update(investor.clone()));
                Some(investor)
            }
            Err(err) => {
                self.fail(err, KYC_FAILED).await;
                None
            }
        }
    }

    /// Changing the KYC filter re-fetches from the backend.
    pub async fn set_kyc_filter(&self, status: Option<KycStatus>) -> bool {
        self.state.write().await.filters.kyc_status = status;
        self.fetch_investors().await
    }

    /// Changing the search term re-fetches from the backend; the same term
    /// also narrows the cached collection via `visible_investors` while the
    /// round trip is in flight.
    pub async fn set_search(&self, search: impl Into<String>) -> bool {
        self.state.write().await.filters.search = search.into();
        self.fetch_investors().await
    }

    /// Cached investors narrowed by the free-text filter.
    pub async fn visible_investors(&self) -> Vec<Investor> {
        let state = self.state.read().await;
        let needle = state.filters.search.trim().to_lowercase();
        if needle.is_empty() {
            return state.investors.clone();
        }
        state
            .investors
            .iter()
            .filter(|investor| {
                investor.email.to_lowercase().contains(&needle)
                    || investor.first_name.to_lowercase().contains(&needle)
                    || investor.last_name.to_lowercase().contains(&needle)
                    || investor.document_number.to_lowercase().contains(&needle)
            })
            .cloned()
            .collect()
    }
}

//! Session management for the admin dashboard.
//!
//! Owns the authentication lifecycle and the credential material every
//! other request depends on. Session state only changes through
//! `SessionState::apply`, so the transitions are testable without any IO.

use std::sync::Arc;

use serde_json::json;
use tokio::sync::RwLock;
use tracing::{debug, warn};
use validator::Validate;

use crate::credentials::{CredentialStore, StoredCredentials};
use crate::error::{ApiError, Result};
use crate::http::ApiClient;
use crate::models::{AuthResponse, LoginRequest, RegisterRequest, UserProfile};

const INVALID_CREDENTIALS: &str = "Invalid credentials";
const ADMIN_REQUIRED: &str = "Unauthorized: admin access required";
const NOT_AUTHENTICATED: &str = "Not authenticated";
const SESSION_EXPIRED: &str = "Session expired";

/// Observable session state. `is_checking_auth` starts true and stays true
/// until the initial revalidation resolves, so route guards can tell "not
/// yet known" from "confirmed unauthenticated".
#[derive(Debug, Clone)]
pub struct SessionState {
    pub user: Option<UserProfile>,
    pub is_authenticated: bool,
    pub is_loading: bool,
    pub is_checking_auth: bool,
    pub error: Option<String>,
}

impl Default for SessionState {
    fn default() -> Self {
        Self {
            user: None,
            is_authenticated: false,
            is_loading: false,
            is_checking_auth: true,
            error: None,
        }
    }
}

/// Session lifecycle events.
#[derive(Debug, Clone)]
pub enum SessionEvent {
    LoginStarted,
    LoginSucceeded(UserProfile),
    LoginFailed(String),
    LogoutStarted,
    LogoutCompleted,
    AuthCheckStarted,
    AuthCheckConfirmed(UserProfile),
    AuthCheckRejected(String),
    ErrorCleared,
}

impl SessionState {
    pub fn apply(&mut self, event: SessionEvent) {
        match event {
            SessionEvent::LoginStarted => {
                self.is_loading = true;
                self.error = None;
            }
            SessionEvent::LoginSucceeded(user) => {
                self.is_loading = false;
                self.is_authenticated = true;
                self.user = Some(user);
                self.error = None;
            }
            SessionEvent::LoginFailed(message) => {
                self.is_loading = false;
                self.is_authenticated = false;
                self.user = None;
                self.error = Some(message);
            }
            SessionEvent::LogoutStarted => {
                self.is_loading = true;
            }
            SessionEvent::LogoutCompleted => {
                self.is_loading = false;
                self.is_authenticated = false;
                self.user = None;
                self.error = None;
            }
            SessionEvent::AuthCheckStarted => {
                self.is_checking_auth = true;
            }
            SessionEvent::AuthCheckConfirmed(user) => {
                self.is_checking_auth = false;
                self.is_authenticated = true;
                self.user = Some(user);
                self.error = None;
            }
            SessionEvent::AuthCheckRejected(message) => {
                self.is_checking_auth = false;
                self.is_authenticated = false;
                self.user = None;
                self.error = Some(message);
            }
            SessionEvent::ErrorCleared => {
                self.error = None;
            }
        }
    }
}

pub struct AuthService {
    client: Arc<ApiClient>,
    credentials: Arc<dyn CredentialStore>,
    state: RwLock<SessionState>,
}

impl AuthService {
    pub fn new(client: Arc<ApiClient>, credentials: Arc<dyn CredentialStore>) -> Self {
        Self {
            client,
            credentials,
            state: RwLock::new(SessionState::default()),
        }
    }

    pub async fn state(&self) -> SessionState {
        self.state.read().await.clone()
    }

    pub async fn clear_error(&self) {
        self.state.write().await.apply(SessionEvent::ErrorCleared);
    }

    async fn apply(&self, event: SessionEvent) {
        self.state.write().await.apply(event);
    }

    /// Authenticates against the backend. A backend-valid user whose role is
    /// not ADMIN or SUPER_ADMIN is rejected exactly like a bad password, and
    /// nothing is persisted.
    pub async fn login(&self, request: LoginRequest) -> bool {
        if let Err(errors) = request.validate() {
            self.apply(SessionEvent::LoginFailed(
                ApiError::from(errors).user_message(),
            ))
            .await;
            return false;
        }

        self.apply(SessionEvent::LoginStarted).await;

        let response: Result<AuthResponse> =
            self.client.post_unauthenticated("/auth/login", &request).await;

        match response {
            Ok(auth) if !auth.user.role.is_admin() => {
                debug!(email = %auth.user.email, "non-admin login rejected");
                self.apply(SessionEvent::LoginFailed(INVALID_CREDENTIALS.to_string()))
                    .await;
                false
            }
            Ok(auth) => {
                let stored = StoredCredentials {
                    access_token: auth.access_token,
                    refresh_token: auth.refresh_token,
                    user: auth.user.clone(),
                };
                if let Err(err) = self.credentials.store(&stored).await {
                    warn!(error = %err, "failed to persist credentials");
                    self.apply(SessionEvent::LoginFailed(err.user_message())).await;
                    return false;
                }
                self.apply(SessionEvent::LoginSucceeded(auth.user)).await;
                true
            }
            Err(err) => {
                self.apply(SessionEvent::LoginFailed(
                    err.message_or(INVALID_CREDENTIALS),
                ))
                .await;
                false
            }
        }
    }

    /// Informs the backend best-effort, then always clears local state.
    pub async fn logout(&self) {
        self.apply(SessionEvent::LogoutStarted).await;

        if let Ok(Some(stored)) = self.credentials.load().await {
            let body = json!({ "refreshToken": stored.refresh_token });
            let result: Result<()> = self.client.post_unauthenticated("/auth/logout", &body).await;
            if let Err(err) = result {
                debug!(error = %err, "logout call failed, proceeding locally");
            }
        }

        if let Err(err) = self.credentials.clear().await {
            warn!(error = %err, "failed to clear stored credentials");
        }
        self.apply(SessionEvent::LogoutCompleted).await;
    }

    /// Revalidates a persisted session, once per application load. With no
    /// stored credentials this resolves unauthenticated without touching the
    /// network.
    pub async fn check_auth(&self) -> bool {
        self.apply(SessionEvent::AuthCheckStarted).await;

        let stored = match self.credentials.load().await {
            Ok(Some(stored)) => stored,
            _ => {
                self.apply(SessionEvent::AuthCheckRejected(
                    NOT_AUTHENTICATED.to_string(),
                ))
                .await;
                return false;
            }
        };

        match self.client.get::<UserProfile>("/users/me").await {
            Ok(user) if user.role.is_admin() => {
                // Tokens may have rotated during the call; only the profile
                // is refreshed here.
                if let Ok(Some(current)) = self.credentials.load().await {
                    let refreshed = StoredCredentials {
                        user: user.clone(),
                        ..current
                    };
                    if let Err(err) = self.credentials.store(&refreshed).await {
                        warn!(error = %err, "failed to refresh stored profile");
                    }
                }
                self.apply(SessionEvent::AuthCheckConfirmed(user)).await;
                true
            }
            Ok(user) => {
                debug!(email = %user.email, role = ?user.role, "non-admin session invalidated");
                if let Err(err) = self.credentials.clear().await {
                    warn!(error = %err, "failed to clear stored credentials");
                }
                self.apply(SessionEvent::AuthCheckRejected(ADMIN_REQUIRED.to_string()))
                    .await;
                false
            }
            Err(err) => {
                debug!(error = %err, email = %stored.user.email, "session revalidation failed");
                if let Err(err) = self.credentials.clear().await {
                    warn!(error = %err, "failed to clear stored credentials");
                }
                self.apply(SessionEvent::AuthCheckRejected(
                    err.message_or(SESSION_EXPIRED),
                ))
                .await;
                false
            }
        }
    }

    /// Creates a new user account. Does not establish a session and never
    /// touches the credential store.
    pub async fn register(&self, request: RegisterRequest) -> Result<UserProfile> {
        request.validate()?;
        self.client.post_unauthenticated("/auth/register", &request).await
    }
}

//! Data models for the Satoru backend API
//!
//! Wire structs are camelCase on the JSON side; status enums travel as
//! SCREAMING_SNAKE_CASE strings.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;
use validator::Validate;

/// User roles
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum UserRole {
    SuperAdmin,
    Admin,
    Investor,
}

impl UserRole {
    /// Roles allowed to hold an authenticated dashboard session.
    pub fn is_admin(self) -> bool {
        matches!(self, UserRole::SuperAdmin | UserRole::Admin)
    }

    /// Destructive actions (project deletion) are offered to super admins only.
    pub fn can_delete_projects(self) -> bool {
        matches!(self, UserRole::SuperAdmin)
    }
}

/// Admin user profile
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    pub id: Uuid,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub role: UserRole,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Successful login payload
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthResponse {
    pub access_token: String,
    pub refresh_token: String,
    pub user: UserProfile,
}

/// Rotated token pair returned by the refresh endpoint
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenPair {
    pub access_token: String,
    pub refresh_token: String,
}

/// Login request payload
#[derive(Debug, Clone, Serialize, Validate)]
pub struct LoginRequest {
    #[validate(email)]
    pub email: String,
    #[validate(length(min = 1))]
    pub password: String,
}

/// Registration request payload
#[derive(Debug, Clone, Serialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct RegisterRequest {
    #[validate(length(min = 1))]
    pub full_name: String,
    #[validate(email)]
    pub email: String,
    #[validate(length(min = 8))]
    pub password: String,
    pub role: UserRole,
}

/// Project lifecycle status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ProjectStatus {
    Draft,
    Funding,
    Active,
    Completed,
    Cancelled,
}

impl ProjectStatus {
    /// Legal next statuses from this one. COMPLETED and CANCELLED are
    /// terminal and admit no transition.
    pub fn legal_transitions(self) -> &'static [ProjectStatus] {
        match self {
            ProjectStatus::Draft => &[ProjectStatus::Funding, ProjectStatus::Cancelled],
            ProjectStatus::Funding => &[ProjectStatus::Active, ProjectStatus::Cancelled],
            ProjectStatus::Active => &[ProjectStatus::Completed, ProjectStatus::Cancelled],
            ProjectStatus::Completed | ProjectStatus::Cancelled => &[],
        }
    }

    pub fn can_transition_to(self, next: ProjectStatus) -> bool {
        self.legal_transitions().contains(&next)
    }

    pub fn is_terminal(self) -> bool {
        self.legal_transitions().is_empty()
    }

    /// Wire form, also used as the path segment of the status endpoint.
    pub fn as_str(self) -> &'static str {
        match self {
            ProjectStatus::Draft => "DRAFT",
            ProjectStatus::Funding => "FUNDING",
            ProjectStatus::Active => "ACTIVE",
            ProjectStatus::Completed => "COMPLETED",
            ProjectStatus::Cancelled => "CANCELLED",
        }
    }
}

impl std::fmt::Display for ProjectStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Real-estate investment project
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Project {
    pub id: Uuid,
    pub name: String,
    pub slug: String,
    pub description: String,
    pub location: String,
    #[serde(default)]
    pub images: Vec<String>,
    #[serde(default)]
    pub documents: Vec<String>,
    pub token_price: f64,
    pub total_tokens: i64,
    pub tokens_sold: i64,
    pub min_investment: f64,
    pub max_investment: Option<f64>,
    pub expected_return: f64,
    pub expected_return_max: Option<f64>,
    pub project_value: f64,
    pub status: ProjectStatus,
    pub start_date: Option<DateTime<Utc>>,
    pub end_date: Option<DateTime<Utc>>,
    pub metadata: Option<Value>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Project {
    /// Amount raised so far. tokensSold <= totalTokens is enforced
    /// server-side; the client trusts it.
    pub fn raised_amount(&self) -> f64 {
        self.token_price * self.tokens_sold as f64
    }

    /// Full funding target for the token sale.
    pub fn target_amount(&self) -> f64 {
        self.token_price * self.total_tokens as f64
    }
}

/// Project creation payload
#[derive(Debug, Clone, Serialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateProjectRequest {
    #[validate(length(min = 1))]
    pub name: String,
    #[validate(length(min = 1))]
    pub slug: String,
    pub description: String,
    pub location: String,
    #[validate(range(min = 0.0))]
    pub target_amount: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub images: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub documents: Option<Vec<String>>,
    #[validate(range(min = 0.01))]
    pub token_price: f64,
    #[validate(range(min = 1))]
    pub total_tokens: i64,
    #[validate(range(min = 0.01))]
    pub min_investment: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_investment: Option<f64>,
    pub expected_return: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expected_return_max: Option<f64>,
    pub project_value: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<ProjectStatus>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub start_date: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub end_date: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metadata: Option<Value>,
}

/// Partial project update payload; absent fields are left untouched
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateProjectRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub slug: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub images: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub documents: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub token_price: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total_tokens: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub min_investment: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_investment: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expected_return: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expected_return_max: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub project_value: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub start_date: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub end_date: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metadata: Option<Value>,
}

/// Investor KYC status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum KycStatus {
    Pending,
    InReview,
    Approved,
    Rejected,
}

impl KycStatus {
    /// Wire form, used as the `kycStatus` query parameter.
    pub fn as_str(self) -> &'static str {
        match self {
            KycStatus::Pending => "PENDING",
            KycStatus::InReview => "IN_REVIEW",
            KycStatus::Approved => "APPROVED",
            KycStatus::Rejected => "REJECTED",
        }
    }
}

/// Supporting KYC submission data
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KycData {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub full_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub birth_date: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub nationality: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub document_front_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub document_back_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub selfie_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub submitted_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reviewed_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub review_comment: Option<String>,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, Value>,
}

/// Platform investor under KYC review
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Investor {
    pub id: Uuid,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub phone: Option<String>,
    pub document_type: String,
    pub document_number: String,
    pub wallet_address: Option<String>,
    pub kyc_status: KycStatus,
    pub kyc_data: Option<KycData>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Investor {
    /// Whether a KYC decision is still open. Approval and rejection are
    /// one-shot; afterwards the dashboard offers no decision actions.
    pub fn kyc_decision_open(&self) -> bool {
        matches!(self.kyc_status, KycStatus::Pending | KycStatus::InReview)
    }
}

/// KYC decision payload
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct KycDecisionRequest {
    pub status: KycStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub kyc_data: Option<KycData>,
}

/// Aggregate dashboard snapshot, read-only
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardStats {
    pub total_investors: i64,
    pub active_investors: i64,
    pub total_projects: i64,
    pub active_projects: i64,
    pub pending_kyc: i64,
    pub total_invested: f64,
    pub total_raised: f64,
}

/// API response wrapper used by part of the backend surface; the HTTP
/// adapter unwraps it transparently
#[derive(Debug, Serialize, Deserialize)]
pub struct ApiEnvelope<T> {
    pub success: bool,
    pub data: Option<T>,
    pub error: Option<String>,
}

/// Error body shape for non-2xx responses. `message` may be a single string
/// or an array of validation messages.
#[derive(Debug, Deserialize)]
pub struct ApiErrorBody {
    pub message: Option<Value>,
    pub error: Option<String>,
}

impl ApiErrorBody {
    pub fn into_message(self) -> Option<String> {
        match self.message {
            Some(Value::String(message)) => Some(message),
            Some(Value::Array(parts)) => {
                let parts: Vec<&str> = parts.iter().filter_map(Value::as_str).collect();
                if parts.is_empty() {
                    self.error
                } else {
                    Some(parts.join(", "))
                }
            }
            _ => self.error,
        }
    }
}

//! Satoru admin smoke tool
//!
//! Authenticates against the configured backend (reusing a persisted
//! session when one is still valid) and prints the dashboard statistics
//! snapshot. Exits non-zero when authentication fails.

use anyhow::{bail, Context};
use tracing::info;

use satoru_admin::app::App;
use satoru_admin::config::Config;
use satoru_admin::models::LoginRequest;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt::init();

    // Load environment variables
    dotenvy::dotenv().ok();

    let config = Config::from_env();
    info!(base_url = %config.base_url, "connecting to Satoru backend");

    let app = App::new(config);

    if app.auth.check_auth().await {
        info!("persisted session is still valid");
    } else {
        let email = std::env::var("SATORU_ADMIN_EMAIL")
            .context("SATORU_ADMIN_EMAIL must be set when no valid session is persisted")?;
        let password = std::env::var("SATORU_ADMIN_PASSWORD")
            .context("SATORU_ADMIN_PASSWORD must be set when no valid session is persisted")?;

        if !app.auth.login(LoginRequest { email, password }).await {
            let state = app.auth.state().await;
            bail!(
                "login failed: {}",
                state.error.unwrap_or_else(|| "unknown error".to_string())
            );
        }
    }

    let session = app.auth.state().await;
    if let Some(user) = &session.user {
        info!(email = %user.email, role = ?user.role, "authenticated");
    }

    match app.dashboard.fetch_stats().await {
        Some(stats) => {
            info!(
                total_investors = stats.total_investors,
                active_investors = stats.active_investors,
                total_projects = stats.total_projects,
                active_projects = stats.active_projects,
                pending_kyc = stats.pending_kyc,
                total_invested = stats.total_invested,
                total_raised = stats.total_raised,
                "dashboard statistics"
            );
            Ok(())
        }
        None => {
            let state = app.dashboard.state().await;
            bail!(
                "failed to fetch dashboard statistics: {}",
                state.error.unwrap_or_else(|| "unknown error".to_string())
            );
        }
    }
}

use portal_client::{
    AppConfig, AppCore, AuthErrorKind,
    config::Env,
    guard::NavigationDecision,
    routes::Route,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// main
///
/// Operator smoke tool: wires the core against a live backend, logs in
/// with credentials from the environment (or resumes a persisted session),
/// and walks the read path once. Useful for verifying a deployment without
/// the full console UI.
#[tokio::main]
async fn main() {
    // 1. Configuration & Environment Loading (Fail-Fast)
    dotenv::dotenv().ok();
    let config = AppConfig::load();

    // 2. Logging Filter Setup
    // Prioritizes RUST_LOG, falling back to sensible defaults.
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "portal_client=debug,reqwest=info".into());

    // 3. Initialize Logging based on Environment
    match config.env {
        Env::Local => {
            // LOCAL: Pretty print output for human readability.
            tracing_subscriber::registry()
                .with(env_filter)
                .with(tracing_subscriber::fmt::layer().pretty())
                .init();
        }
        Env::Production => {
            // PROD: JSON format output for log aggregators.
            tracing_subscriber::registry()
                .with(env_filter)
                .with(tracing_subscriber::fmt::layer().json())
                .init();
        }
    }

    tracing::info!("portal client starting against {}", config.api_base_url);

    // 4. Core Assembly over the real HTTP transport.
    let core = AppCore::with_http(config);

    // 5. Session Establishment
    // Fresh credentials win over a persisted session; without either, the
    // guard demonstrates the redirect a UI would perform.
    let username = std::env::var("PORTAL_USERNAME").ok();
    let password = std::env::var("PORTAL_PASSWORD").ok();
    match (username, password) {
        (Some(username), Some(password)) => {
            if let Err(e) = core.auth.login(&username, &password).await {
                match e.kind {
                    AuthErrorKind::InvalidCredentials => tracing::error!("login rejected: {e}"),
                    _ => tracing::error!("login failed: {e}"),
                }
                return;
            }
        }
        _ if core.session.is_authenticated() => {
            tracing::info!("resuming persisted session");
        }
        _ => {
            if let NavigationDecision::Redirect(to) = core.guard.check(Route::Dashboard) {
                tracing::warn!(
                    "no session and no PORTAL_USERNAME/PORTAL_PASSWORD set; UI would redirect to {}",
                    to.path()
                );
            }
            return;
        }
    }

    // 6. Read Path Smoke Walk
    match core.current_user().await {
        Ok(user) => tracing::info!("authenticated as {}", user.email),
        Err(e) => {
            tracing::error!("failed to fetch current user: {e}");
            return;
        }
    }
    match core.items().await {
        Ok(page) => tracing::info!("item list fetched: {} of {} items", page.data.len(), page.count),
        Err(e) => tracing::error!("failed to fetch items: {e}"),
    }
}

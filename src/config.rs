use std::env;
use std::path::PathBuf;
use std::time::Duration;

/// AppConfig
///
/// Holds the client's entire configuration state. This struct is immutable
/// once loaded and is shared by every component wired into the core, so all
/// outbound requests agree on the base URL and timeout.
#[derive(Clone, Debug)]
pub struct AppConfig {
    // Base URL of the remote API, including the version prefix
    // (e.g. "http://localhost:8000/api/v1").
    pub api_base_url: String,
    // Per-request timeout applied by the HTTP transport.
    pub request_timeout: Duration,
    // Durable token storage location. `None` keeps the session in memory
    // only (used by tests and embedders that manage persistence themselves).
    pub token_path: Option<PathBuf>,
    // Runtime environment marker. Controls log formatting in the binary.
    pub env: Env,
}

/// Env
///
/// Defines the runtime context, used to switch between human-readable local
/// logging and JSON production logging.
#[derive(Clone, PartialEq, Debug)]
pub enum Env {
    Local,
    Production,
}

impl Default for AppConfig {
    /// default
    ///
    /// Provides a safe, non-panicking AppConfig instance primarily used for
    /// test setup. The session stays in memory so tests never touch the
    /// filesystem unless they opt in.
    fn default() -> Self {
        Self {
            api_base_url: "http://localhost:8000/api/v1".to_string(),
            request_timeout: Duration::from_secs(10),
            token_path: None,
            env: Env::Local,
        }
    }
}

impl AppConfig {
    /// load
    ///
    /// The canonical function for initializing configuration at startup.
    /// Reads all parameters from environment variables and implements the
    /// fail-fast principle.
    ///
    /// # Panics
    /// Panics if a variable required for the current runtime environment
    /// (especially Production) is not found, so the client never starts
    /// pointed at a guessed backend.
    pub fn load() -> Self {
        let env_str = env::var("APP_ENV").unwrap_or_else(|_| "local".to_string());
        let env = match env_str.as_str() {
            "production" => Env::Production,
            _ => Env::Local,
        };

        // The production API URL is mandatory and must be explicitly set.
        let api_base_url = match env {
            Env::Production => {
                env::var("PORTAL_API_URL").expect("FATAL: PORTAL_API_URL must be set in production.")
            }
            _ => env::var("PORTAL_API_URL")
                .unwrap_or_else(|_| "http://localhost:8000/api/v1".to_string()),
        };

        let request_timeout = env::var("PORTAL_REQUEST_TIMEOUT_SECS")
            .ok()
            .and_then(|raw| raw.parse::<u64>().ok())
            .map(Duration::from_secs)
            .unwrap_or_else(|| Duration::from_secs(10));

        // Token persistence defaults to a dotfile next to the process; an
        // explicit empty value disables persistence entirely.
        let token_path = match env::var("PORTAL_TOKEN_FILE") {
            Ok(raw) if raw.is_empty() => None,
            Ok(raw) => Some(PathBuf::from(raw)),
            Err(_) => Some(PathBuf::from(".portal_session")),
        };

        Self {
            api_base_url,
            request_timeout,
            token_path,
            env,
        }
    }
}

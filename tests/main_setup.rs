use portal_client::{AppConfig, config::Env};
use serial_test::serial;
use std::path::PathBuf;
use std::time::Duration;
use std::{env, panic};

// --- Setup/Teardown Utilities ---

/// Utility to run a test function and restore environment variables afterward
fn run_with_env<T, R>(test: T, cleanup_vars: Vec<&'static str>) -> R
where
    T: FnOnce() -> R + panic::UnwindSafe,
{
    // Save current environment variables
    let originals: Vec<(String, Option<String>)> = cleanup_vars
        .iter()
        .map(|&var| (var.to_string(), env::var(var).ok()))
        .collect();

    // Run the test
    let result = panic::catch_unwind(test);

    // Restore original environment variables
    for (key, original_value) in originals.into_iter().rev() {
        unsafe {
            if let Some(val) = original_value {
                env::set_var(&key, val);
            } else {
                env::remove_var(&key);
            }
        }
    }

    // Re-panic if the test failed
    match result {
        Ok(value) => value,
        Err(e) => panic::resume_unwind(e),
    }
}

// --- Tests ---

#[test]
#[serial]
fn test_app_config_production_fail_fast() {
    // We expect this to panic because the production API URL is not set
    let result = run_with_env(
        || {
            panic::catch_unwind(|| {
                unsafe {
                    env::set_var("APP_ENV", "production");
                    env::remove_var("PORTAL_API_URL");
                }
                AppConfig::load()
            })
        },
        vec!["APP_ENV", "PORTAL_API_URL"],
    );

    assert!(
        result.is_err(),
        "Production config loading should panic without PORTAL_API_URL"
    );
}

#[test]
#[serial]
fn test_app_config_local_env_defaults() {
    // Local mode should not panic, and should use hardcoded defaults
    let config = run_with_env(
        || {
            unsafe {
                env::set_var("APP_ENV", "local");
                // Clear other variables to test fallbacks
                env::remove_var("PORTAL_API_URL");
                env::remove_var("PORTAL_REQUEST_TIMEOUT_SECS");
                env::remove_var("PORTAL_TOKEN_FILE");
            }
            AppConfig::load()
        },
        vec![
            "APP_ENV",
            "PORTAL_API_URL",
            "PORTAL_REQUEST_TIMEOUT_SECS",
            "PORTAL_TOKEN_FILE",
        ],
    );

    assert_eq!(config.env, Env::Local);
    // Check the local backend default
    assert_eq!(config.api_base_url, "http://localhost:8000/api/v1");
    assert_eq!(config.request_timeout, Duration::from_secs(10));
    // Persistence defaults to the dotfile next to the process
    assert_eq!(config.token_path, Some(PathBuf::from(".portal_session")));
}

#[test]
#[serial]
fn test_app_config_overrides_apply() {
    let config = run_with_env(
        || {
            unsafe {
                env::set_var("APP_ENV", "production");
                env::set_var("PORTAL_API_URL", "https://portal.example.com/api/v1");
                env::set_var("PORTAL_REQUEST_TIMEOUT_SECS", "30");
                env::set_var("PORTAL_TOKEN_FILE", "/var/lib/portal/token");
            }
            AppConfig::load()
        },
        vec![
            "APP_ENV",
            "PORTAL_API_URL",
            "PORTAL_REQUEST_TIMEOUT_SECS",
            "PORTAL_TOKEN_FILE",
        ],
    );

    assert_eq!(config.env, Env::Production);
    assert_eq!(config.api_base_url, "https://portal.example.com/api/v1");
    assert_eq!(config.request_timeout, Duration::from_secs(30));
    assert_eq!(config.token_path, Some(PathBuf::from("/var/lib/portal/token")));
}

#[test]
#[serial]
fn test_app_config_empty_token_file_disables_persistence() {
    let config = run_with_env(
        || {
            unsafe {
                env::set_var("APP_ENV", "local");
                env::set_var("PORTAL_TOKEN_FILE", "");
            }
            AppConfig::load()
        },
        vec!["APP_ENV", "PORTAL_TOKEN_FILE"],
    );

    assert_eq!(config.token_path, None);
}

use std::sync::Arc;

use thiserror::Error;

use crate::errors::{ApiFailure, detail_message};
use crate::models::Token;
use crate::session::SessionStore;
use crate::transport::TransportState;

/// AuthErrorKind
///
/// Failure classes of the login flow. `InvalidCredentials` covers every
/// rejection of the submitted credentials themselves; `Network` and
/// `Server` mirror the transport taxonomy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthErrorKind {
    InvalidCredentials,
    Network,
    Server,
}

/// AuthError
///
/// Login failure with a user-displayable message. The session token is
/// never partially set: on any error the store is left untouched.
#[derive(Debug, Clone, Error)]
#[error("{message}")]
pub struct AuthError {
    pub kind: AuthErrorKind,
    pub message: String,
}

/// AuthGateway
///
/// Wraps the remote authentication endpoint and is, together with the
/// Error Normalizer, one of the two designated writers of the session
/// store.
///
/// Concurrent logins are not deduplicated — the most recent completion
/// wins, since only one login form is active per client.
pub struct AuthGateway {
    transport: TransportState,
    session: Arc<SessionStore>,
}

impl AuthGateway {
    pub fn new(transport: TransportState, session: Arc<SessionStore>) -> Self {
        Self { transport, session }
    }

    /// login
    ///
    /// Submits credentials; on success stores the issued token (notifying
    /// session subscribers) and returns it.
    pub async fn login(&self, username: &str, password: &str) -> Result<Token, AuthError> {
        match self.transport.login(username, password).await {
            Ok(token) => {
                self.session.set_token(token.access_token.clone());
                tracing::info!("login succeeded for {username}");
                Ok(token)
            }
            Err(ApiFailure::Network(detail)) => {
                tracing::debug!("login transport failure: {detail}");
                Err(AuthError {
                    kind: AuthErrorKind::Network,
                    message: "Cannot reach the server. Check your connection and try again."
                        .to_string(),
                })
            }
            Err(ApiFailure::Status { status, body }) if status == 400 || status == 401 || status == 403 => {
                // The backend reports bad credentials as 400 with a detail
                // string ("Incorrect email or password").
                let message = detail_message(&body)
                    .unwrap_or_else(|| "Incorrect email or password".to_string());
                tracing::info!("login rejected for {username} (HTTP {status})");
                Err(AuthError {
                    kind: AuthErrorKind::InvalidCredentials,
                    message,
                })
            }
            Err(ApiFailure::Status { status, body }) => {
                let message = detail_message(&body)
                    .unwrap_or_else(|| "Something went wrong. Please try again later.".to_string());
                tracing::warn!("login failed with HTTP {status}");
                Err(AuthError {
                    kind: AuthErrorKind::Server,
                    message,
                })
            }
        }
    }

    /// logout
    ///
    /// Clears the local session. Always succeeds: the backend holds no
    /// revocable session state, so local logout is authoritative.
    pub fn logout(&self) {
        self.session.clear_token();
        tracing::info!("logged out");
    }
}

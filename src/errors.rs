use std::sync::Arc;

use serde_json::Value;
use thiserror::Error;

use crate::models::ValidationItem;
use crate::session::SessionStore;

/// ApiFailure
///
/// Raw transport-level failure, produced by the `ApiTransport`
/// implementations before any user-facing interpretation. `Status` carries
/// the decoded response body so the normalizer can extract server detail.
#[derive(Debug, Clone, Error)]
pub enum ApiFailure {
    #[error("network failure: {0}")]
    Network(String),
    #[error("HTTP {status}")]
    Status { status: u16, body: Value },
}

/// ErrorKind
///
/// The uniform failure taxonomy surfaced to the presentation layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Transient transport failure; retryable by user resubmission.
    Network,
    /// Session invalid or expired; forces logout.
    Auth,
    /// Server-reported field errors, surfaced inline on the form.
    Validation,
    /// Opaque server failure, surfaced as a generic notification.
    Server,
}

/// FieldError
///
/// One field-level validation message, keyed by the form field name.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldError {
    pub field: String,
    pub message: String,
}

/// NormalizedError
///
/// Uniform failure representation independent of the originating transport
/// error shape. Ephemeral: produced by the normalizer, consumed once by the
/// notification surface (or inline form display for `Validation`).
#[derive(Debug, Clone, Error)]
#[error("{user_message}")]
pub struct NormalizedError {
    pub kind: ErrorKind,
    pub user_message: String,
    pub retryable: bool,
    /// Populated only for `Validation`.
    pub fields: Vec<FieldError>,
}

impl NormalizedError {
    pub(crate) fn server(user_message: impl Into<String>, retryable: bool) -> Self {
        Self {
            kind: ErrorKind::Server,
            user_message: user_message.into(),
            retryable,
            fields: Vec::new(),
        }
    }

    /// Malformed or unroutable caller input (e.g. an unsupported mutation
    /// combination). Not retryable and never reaches the transport.
    pub(crate) fn unsupported(what: impl Into<String>) -> Self {
        Self::server(what, false)
    }

    /// A 2xx response whose body did not match the expected schema.
    pub(crate) fn decode() -> Self {
        Self::server("Unexpected response from the server.", false)
    }
}

/// Extracts the server's `detail` message from a 4xx/5xx body, when it is a
/// plain string.
pub(crate) fn detail_message(body: &Value) -> Option<String> {
    body.get("detail")
        .and_then(|detail| detail.as_str())
        .map(|msg| msg.to_string())
}

/// Extracts field-level validation entries from a `{"detail": [...]}` body.
fn validation_fields(body: &Value) -> Option<Vec<FieldError>> {
    let items = body.get("detail")?.as_array()?;
    let fields: Vec<FieldError> = items
        .iter()
        .filter_map(|raw| serde_json::from_value::<ValidationItem>(raw.clone()).ok())
        .map(|item| FieldError {
            field: item.field_name().unwrap_or_else(|| "non_field".to_string()),
            message: item.msg,
        })
        .collect();
    if fields.is_empty() { None } else { Some(fields) }
}

/// ErrorNormalizer
///
/// Maps heterogeneous API failures into the uniform `NormalizedError`
/// signal. This is the only place user-facing failure text is decided, and
/// the only component besides the Auth Gateway allowed to write the session:
/// an authorization failure clears the token so a stale session cannot loop
/// through repeated 401s.
#[derive(Clone)]
pub struct ErrorNormalizer {
    session: Arc<SessionStore>,
}

impl ErrorNormalizer {
    pub fn new(session: Arc<SessionStore>) -> Self {
        Self { session }
    }

    /// normalize
    ///
    /// - network failures -> `Network`, retryable.
    /// - 401/403 -> `Auth`, not retryable; side effect: the session token is
    ///   cleared (implicit expiry).
    /// - bodies with a validation `detail` list -> `Validation` with
    ///   field-level entries for form display.
    /// - everything else -> `Server`; retryable only when the status itself
    ///   indicates a transient condition (502/503/504). Server-supplied
    ///   `detail` strings pass through as the user message.
    pub fn normalize(&self, raw: ApiFailure) -> NormalizedError {
        match raw {
            ApiFailure::Network(detail) => {
                tracing::debug!("network failure normalized: {detail}");
                NormalizedError {
                    kind: ErrorKind::Network,
                    user_message: "Cannot reach the server. Check your connection and try again."
                        .to_string(),
                    retryable: true,
                    fields: Vec::new(),
                }
            }
            ApiFailure::Status { status, .. } if status == 401 || status == 403 => {
                tracing::info!("authorization rejected (HTTP {status}), clearing session");
                self.session.clear_token();
                NormalizedError {
                    kind: ErrorKind::Auth,
                    user_message: "Your session has expired. Please log in again.".to_string(),
                    retryable: false,
                    fields: Vec::new(),
                }
            }
            ApiFailure::Status { status, body } => {
                if let Some(fields) = validation_fields(&body) {
                    return NormalizedError {
                        kind: ErrorKind::Validation,
                        user_message: "Some fields need attention.".to_string(),
                        retryable: false,
                        fields,
                    };
                }
                let retryable = matches!(status, 502 | 503 | 504);
                let user_message = detail_message(&body)
                    .unwrap_or_else(|| "Something went wrong. Please try again later.".to_string());
                tracing::debug!("server failure normalized (HTTP {status}): {user_message}");
                NormalizedError::server(user_message, retryable)
            }
        }
    }
}

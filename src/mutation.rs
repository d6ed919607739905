use std::sync::Arc;

use reqwest::Method;
use serde_json::Value;
use uuid::Uuid;

use crate::cache::{Resource, ResourceCache, ResourceKey, Scope};
use crate::errors::{ErrorNormalizer, NormalizedError};
use crate::models::{ItemCreate, ItemUpdate, UpdatePassword, UserUpdateMe};
use crate::session::SessionStore;
use crate::transport::TransportState;

/// Operation
///
/// The three mutation verbs the coordinator routes to the remote API.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    Create,
    Update,
    Delete,
}

/// MutationIntent
///
/// One user action against one resource. Ephemeral: exists only for the
/// duration of a single `execute` call and is never persisted. `target`
/// identifies the affected record for update/delete on record-scoped
/// resources.
#[derive(Debug, Clone)]
pub struct MutationIntent {
    pub operation: Operation,
    pub resource: Resource,
    pub payload: Value,
    pub target: Option<Uuid>,
}

impl MutationIntent {
    pub fn create_item(req: ItemCreate) -> Self {
        Self {
            operation: Operation::Create,
            resource: Resource::Items,
            payload: serde_json::to_value(req).expect("item payload serializes to JSON"),
            target: None,
        }
    }

    pub fn update_item(id: Uuid, req: ItemUpdate) -> Self {
        Self {
            operation: Operation::Update,
            resource: Resource::Items,
            payload: serde_json::to_value(req).expect("item payload serializes to JSON"),
            target: Some(id),
        }
    }

    pub fn delete_item(id: Uuid) -> Self {
        Self {
            operation: Operation::Delete,
            resource: Resource::Items,
            payload: Value::Null,
            target: Some(id),
        }
    }

    pub fn update_me(req: UserUpdateMe) -> Self {
        Self {
            operation: Operation::Update,
            resource: Resource::User,
            payload: serde_json::to_value(req).expect("user payload serializes to JSON"),
            target: None,
        }
    }

    pub fn delete_me() -> Self {
        Self {
            operation: Operation::Delete,
            resource: Resource::User,
            payload: Value::Null,
            target: None,
        }
    }

    pub fn update_password(req: UpdatePassword) -> Self {
        Self {
            operation: Operation::Update,
            resource: Resource::Password,
            payload: serde_json::to_value(req).expect("password payload serializes to JSON"),
            target: None,
        }
    }
}

/// Resolves an intent to its remote endpoint. Combinations outside this
/// table are caller errors and never reach the transport.
fn intent_route(intent: &MutationIntent) -> Result<(Method, String, Option<Value>), NormalizedError> {
    let body = match intent.payload {
        Value::Null => None,
        ref payload => Some(payload.clone()),
    };
    match (intent.resource, intent.operation) {
        (Resource::Items, Operation::Create) => Ok((Method::POST, "/items/".to_string(), body)),
        (Resource::Items, Operation::Update) => {
            let id = require_target(intent)?;
            Ok((Method::PUT, format!("/items/{id}"), body))
        }
        (Resource::Items, Operation::Delete) => {
            let id = require_target(intent)?;
            Ok((Method::DELETE, format!("/items/{id}"), None))
        }
        (Resource::User, Operation::Update) => Ok((Method::PATCH, "/users/me".to_string(), body)),
        (Resource::User, Operation::Delete) => Ok((Method::DELETE, "/users/me".to_string(), None)),
        (Resource::Password, Operation::Update) => {
            Ok((Method::PATCH, "/users/me/password".to_string(), body))
        }
        (resource, operation) => Err(NormalizedError::unsupported(format!(
            "unsupported mutation: {operation:?} on {resource:?}"
        ))),
    }
}

fn require_target(intent: &MutationIntent) -> Result<Uuid, NormalizedError> {
    intent.target.ok_or_else(|| {
        NormalizedError::unsupported(format!(
            "{:?} on {:?} requires a target id",
            intent.operation, intent.resource
        ))
    })
}

/// The cache key refreshed after any successful mutation of a resource
/// type. `None` for resources with no readable state (password).
fn primary_key(resource: Resource) -> Option<ResourceKey> {
    match resource {
        Resource::Items => Some(ResourceKey::items_list()),
        Resource::User => Some(ResourceKey::current_user()),
        Resource::Password => None,
    }
}

/// MutationCoordinator
///
/// Executes create/update/delete intents against the remote API and keeps
/// the read cache consistent: on success, the affected cache keys are
/// invalidated before the returned future resolves, so any subsequent read
/// observes the post-mutation state once the refresh settles. On failure
/// nothing is invalidated (the API applies no partial effects) and the
/// normalized error is returned to the caller.
///
/// Exactly one remote call per `execute`; retry is a user-initiated
/// resubmission, never automatic.
pub struct MutationCoordinator {
    transport: TransportState,
    session: Arc<SessionStore>,
    cache: ResourceCache,
    normalizer: ErrorNormalizer,
}

impl MutationCoordinator {
    pub fn new(
        transport: TransportState,
        session: Arc<SessionStore>,
        cache: ResourceCache,
        normalizer: ErrorNormalizer,
    ) -> Self {
        Self {
            transport,
            session,
            cache,
            normalizer,
        }
    }

    /// execute
    ///
    /// Routes the intent, attaches the current session token, issues the
    /// remote call, and on success invalidates:
    /// - the resource's primary scope key (items list / current user), and
    /// - for update/delete of a record-scoped resource, the record's own
    ///   key.
    pub async fn execute(&self, intent: MutationIntent) -> Result<Value, NormalizedError> {
        let (method, path, body) = intent_route(&intent)?;
        let token = self.session.token();
        let result = self
            .transport
            .send_json(method, &path, body.as_ref(), token.as_deref())
            .await;

        match result {
            Ok(value) => {
                tracing::debug!(
                    "mutation settled: {:?} {:?} -> invalidating",
                    intent.operation,
                    intent.resource
                );
                if let Some(key) = primary_key(intent.resource) {
                    self.cache.invalidate(&key);
                }
                if matches!(intent.operation, Operation::Update | Operation::Delete)
                    && let Some(id) = intent.target
                {
                    self.cache.invalidate(&ResourceKey {
                        resource: intent.resource,
                        scope: Scope::Item(id),
                    });
                }
                Ok(value)
            }
            Err(raw) => {
                let normalized = self.normalizer.normalize(raw);
                tracing::debug!(
                    "mutation failed: {:?} {:?}: {}",
                    intent.operation,
                    intent.resource,
                    normalized
                );
                Err(normalized)
            }
        }
    }
}

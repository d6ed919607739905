use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;
use reqwest::Method;
use serde_json::{Value, json};
use uuid::Uuid;

use crate::cache::{Resource, ResourceFetcher, ResourceKey, Scope};
use crate::config::AppConfig;
use crate::errors::{ApiFailure, ErrorNormalizer, NormalizedError};
use crate::models::{
    Item, ItemCreate, ItemUpdate, ItemsPage, Token, UpdatePassword, UserPublic, UserUpdateMe,
};
use crate::session::SessionStore;

// --- ApiTransport Contract ---

/// ApiTransport
///
/// Defines the abstract contract for all traffic to the remote API. The
/// core treats the backend as a black box behind this trait, allowing the
/// concrete implementation to be swapped from the real HTTP client
/// (`HttpApi`) to the in-memory `MockApi` during testing without affecting
/// the components above it.
///
/// **Send + Sync + async_trait** are required to make the trait object
/// (`Arc<dyn ApiTransport>`) safely shareable across task boundaries.
#[async_trait]
pub trait ApiTransport: Send + Sync {
    /// Submits credentials to the authentication endpoint
    /// (`POST /login/access-token`, form-encoded per the OAuth2 password
    /// flow) and returns the issued bearer token.
    async fn login(&self, username: &str, password: &str) -> Result<Token, ApiFailure>;

    /// Reads a resource path, attaching the bearer token when present.
    /// Returns the raw JSON body.
    async fn fetch_json(&self, path: &str, token: Option<&str>) -> Result<Value, ApiFailure>;

    /// Issues a mutating call (POST/PUT/PATCH/DELETE) with an optional JSON
    /// body, attaching the bearer token when present.
    async fn send_json(
        &self,
        method: Method,
        path: &str,
        body: Option<&Value>,
        token: Option<&str>,
    ) -> Result<Value, ApiFailure>;
}

/// TransportState
///
/// The concrete type used to share the transport across the core.
pub type TransportState = Arc<dyn ApiTransport>;

/// Resolves a cache key to the read path serving it. `None` for keys with
/// no readable endpoint (e.g. password state).
pub(crate) fn resource_path(key: &ResourceKey) -> Option<String> {
    match (key.resource, key.scope) {
        (Resource::Items, Scope::List) => Some("/items/".to_string()),
        (Resource::Items, Scope::Item(id)) => Some(format!("/items/{id}")),
        (Resource::User, Scope::Me) => Some("/users/me".to_string()),
        _ => None,
    }
}

// --- The Real Implementation (reqwest) ---

/// HttpApi
///
/// The concrete `ApiTransport` backed by `reqwest`, pointed at the base URL
/// and timeout from `AppConfig`. Non-2xx responses become
/// `ApiFailure::Status` carrying the decoded body; transport-level errors
/// become `ApiFailure::Network`.
#[derive(Clone)]
pub struct HttpApi {
    client: reqwest::Client,
    base_url: String,
}

impl HttpApi {
    /// new
    ///
    /// Constructs the HTTP client from the loaded configuration.
    ///
    /// # Panics
    /// Panics if the underlying TLS/client stack cannot be initialized;
    /// the process cannot do anything useful without a transport.
    pub fn new(config: &AppConfig) -> Self {
        let client = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .build()
            .expect("FATAL: failed to construct HTTP client");
        Self {
            client,
            base_url: config.api_base_url.trim_end_matches('/').to_string(),
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Folds a response into the transport result shape. Bodies that are
    /// not JSON (e.g. empty 204 responses) decode to `null`.
    async fn handle(response: reqwest::Response) -> Result<Value, ApiFailure> {
        let status = response.status();
        let body: Value = response.json().await.unwrap_or(Value::Null);
        if !status.is_success() {
            return Err(ApiFailure::Status {
                status: status.as_u16(),
                body,
            });
        }
        Ok(body)
    }
}

#[async_trait]
impl ApiTransport for HttpApi {
    async fn login(&self, username: &str, password: &str) -> Result<Token, ApiFailure> {
        let response = self
            .client
            .post(self.url("/login/access-token"))
            .form(&[
                ("grant_type", "password"),
                ("username", username),
                ("password", password),
            ])
            .send()
            .await
            .map_err(|e| ApiFailure::Network(e.to_string()))?;
        let body = Self::handle(response).await?;
        serde_json::from_value(body).map_err(|e| ApiFailure::Network(e.to_string()))
    }

    async fn fetch_json(&self, path: &str, token: Option<&str>) -> Result<Value, ApiFailure> {
        let mut request = self.client.get(self.url(path));
        if let Some(token) = token {
            request = request.bearer_auth(token);
        }
        let response = request
            .send()
            .await
            .map_err(|e| ApiFailure::Network(e.to_string()))?;
        Self::handle(response).await
    }

    async fn send_json(
        &self,
        method: Method,
        path: &str,
        body: Option<&Value>,
        token: Option<&str>,
    ) -> Result<Value, ApiFailure> {
        let mut request = self.client.request(method, self.url(path));
        if let Some(token) = token {
            request = request.bearer_auth(token);
        }
        if let Some(body) = body {
            request = request.json(body);
        }
        let response = request
            .send()
            .await
            .map_err(|e| ApiFailure::Network(e.to_string()))?;
        Self::handle(response).await
    }
}

// --- Cache Fetch Adapter ---

/// ApiFetcher
///
/// Bridges the cache's `ResourceFetcher` seam onto the transport: resolves
/// the key's read path, attaches the current session token, and normalizes
/// failures so the cache stores ready-to-display errors.
#[derive(Clone)]
pub struct ApiFetcher {
    transport: TransportState,
    session: Arc<SessionStore>,
    normalizer: ErrorNormalizer,
}

impl ApiFetcher {
    pub fn new(
        transport: TransportState,
        session: Arc<SessionStore>,
        normalizer: ErrorNormalizer,
    ) -> Self {
        Self {
            transport,
            session,
            normalizer,
        }
    }
}

#[async_trait]
impl ResourceFetcher for ApiFetcher {
    async fn fetch(&self, key: &ResourceKey) -> Result<Value, NormalizedError> {
        let Some(path) = resource_path(key) else {
            return Err(NormalizedError::unsupported(format!(
                "no readable endpoint for {key:?}"
            )));
        };
        let token = self.session.token();
        self.transport
            .fetch_json(&path, token.as_deref())
            .await
            .map_err(|raw| self.normalizer.normalize(raw))
    }
}

// --- The Mock Implementation (For Tests) ---

const MOCK_TOKEN: &str = "mock-access-token";

struct MockState {
    items: Vec<Item>,
    user: UserPublic,
    password: String,
    // Injected failure returned by the next call, whatever it is.
    fail_next: Option<ApiFailure>,
    fetch_calls: HashMap<String, usize>,
    total_calls: usize,
}

/// MockApi
///
/// An in-memory stand-in for the remote backend, used exclusively by unit
/// and integration tests. It honors the same wire shapes as the real API
/// (items page, `detail` error bodies, bearer-token checks) so the core is
/// exercised without a network connection.
pub struct MockApi {
    state: Mutex<MockState>,
}

impl Default for MockApi {
    fn default() -> Self {
        Self::new()
    }
}

impl MockApi {
    /// Mock backend with one known account (the template's default
    /// superuser) and no items.
    pub fn new() -> Self {
        let user = UserPublic {
            id: Uuid::new_v4(),
            email: "admin@example.com".to_string(),
            is_active: true,
            is_superuser: true,
            full_name: Some("Admin".to_string()),
        };
        Self {
            state: Mutex::new(MockState {
                items: Vec::new(),
                user,
                password: "changethis".to_string(),
                fail_next: None,
                fetch_calls: HashMap::new(),
                total_calls: 0,
            }),
        }
    }

    /// Queues a failure for the next call of any kind.
    pub fn fail_next(&self, failure: ApiFailure) {
        self.state.lock().fail_next = Some(failure);
    }

    /// Pre-populates the item store.
    pub fn seed_items(&self, items: Vec<Item>) {
        self.state.lock().items = items;
    }

    /// Number of reads issued against a path.
    pub fn fetch_count(&self, path: &str) -> usize {
        self.state
            .lock()
            .fetch_calls
            .get(path)
            .copied()
            .unwrap_or(0)
    }

    /// Total calls of any kind that reached the mock.
    pub fn total_calls(&self) -> usize {
        self.state.lock().total_calls
    }

    pub fn user_id(&self) -> Uuid {
        self.state.lock().user.id
    }

    fn take_failure(state: &mut MockState) -> Option<ApiFailure> {
        state.total_calls += 1;
        state.fail_next.take()
    }

    fn check_token(token: Option<&str>) -> Result<(), ApiFailure> {
        match token {
            Some(MOCK_TOKEN) => Ok(()),
            _ => Err(ApiFailure::Status {
                status: 401,
                body: json!({"detail": "Could not validate credentials"}),
            }),
        }
    }

    fn not_found(what: &str) -> ApiFailure {
        ApiFailure::Status {
            status: 404,
            body: json!({"detail": format!("{what} not found")}),
        }
    }

    fn invalid_body() -> ApiFailure {
        ApiFailure::Status {
            status: 422,
            body: json!({
                "detail": [{"loc": ["body"], "msg": "Field required", "type": "missing"}]
            }),
        }
    }
}

fn parse_body<T: serde::de::DeserializeOwned>(body: Option<&Value>) -> Result<T, ApiFailure> {
    let body = body.ok_or_else(MockApi::invalid_body)?;
    serde_json::from_value(body.clone()).map_err(|_| MockApi::invalid_body())
}

fn item_id(path: &str) -> Option<Uuid> {
    path.strip_prefix("/items/")
        .and_then(|raw| Uuid::parse_str(raw).ok())
}

#[async_trait]
impl ApiTransport for MockApi {
    async fn login(&self, username: &str, password: &str) -> Result<Token, ApiFailure> {
        let mut state = self.state.lock();
        if let Some(failure) = Self::take_failure(&mut state) {
            return Err(failure);
        }
        if username == state.user.email && password == state.password {
            Ok(Token {
                access_token: MOCK_TOKEN.to_string(),
                token_type: "bearer".to_string(),
            })
        } else {
            Err(ApiFailure::Status {
                status: 400,
                body: json!({"detail": "Incorrect email or password"}),
            })
        }
    }

    async fn fetch_json(&self, path: &str, token: Option<&str>) -> Result<Value, ApiFailure> {
        let mut state = self.state.lock();
        *state.fetch_calls.entry(path.to_string()).or_insert(0) += 1;
        if let Some(failure) = Self::take_failure(&mut state) {
            return Err(failure);
        }
        Self::check_token(token)?;

        if path == "/items/" {
            let page = ItemsPage {
                data: state.items.clone(),
                count: state.items.len() as i64,
            };
            return serde_json::to_value(page).map_err(|e| ApiFailure::Network(e.to_string()));
        }
        if path == "/users/me" {
            return serde_json::to_value(state.user.clone())
                .map_err(|e| ApiFailure::Network(e.to_string()));
        }
        if let Some(id) = item_id(path) {
            let item = state
                .items
                .iter()
                .find(|item| item.id == id)
                .cloned()
                .ok_or_else(|| Self::not_found("Item"))?;
            return serde_json::to_value(item).map_err(|e| ApiFailure::Network(e.to_string()));
        }
        Err(Self::not_found("Route"))
    }

    async fn send_json(
        &self,
        method: Method,
        path: &str,
        body: Option<&Value>,
        token: Option<&str>,
    ) -> Result<Value, ApiFailure> {
        let mut state = self.state.lock();
        if let Some(failure) = Self::take_failure(&mut state) {
            return Err(failure);
        }
        Self::check_token(token)?;

        if method == Method::POST && path == "/items/" {
            let req: ItemCreate = parse_body(body)?;
            let item = Item {
                id: Uuid::new_v4(),
                title: req.title,
                description: req.description,
                owner_id: state.user.id,
            };
            state.items.push(item.clone());
            return serde_json::to_value(item).map_err(|e| ApiFailure::Network(e.to_string()));
        }
        if method == Method::PATCH && path == "/users/me" {
            let req: UserUpdateMe = parse_body(body)?;
            if let Some(full_name) = req.full_name {
                state.user.full_name = Some(full_name);
            }
            if let Some(email) = req.email {
                state.user.email = email;
            }
            return serde_json::to_value(state.user.clone())
                .map_err(|e| ApiFailure::Network(e.to_string()));
        }
        if method == Method::PATCH && path == "/users/me/password" {
            let req: UpdatePassword = parse_body(body)?;
            if req.current_password != state.password {
                return Err(ApiFailure::Status {
                    status: 400,
                    body: json!({"detail": "Incorrect password"}),
                });
            }
            state.password = req.new_password;
            return Ok(json!({"message": "Password updated successfully"}));
        }
        if method == Method::DELETE && path == "/users/me" {
            return Ok(json!({"message": "User deleted successfully"}));
        }

        let Some(id) = item_id(path) else {
            return Err(Self::not_found("Route"));
        };
        let Some(position) = state.items.iter().position(|item| item.id == id) else {
            return Err(Self::not_found("Item"));
        };
        if method == Method::PUT {
            let req: ItemUpdate = parse_body(body)?;
            let item = &mut state.items[position];
            if let Some(title) = req.title {
                item.title = title;
            }
            if let Some(description) = req.description {
                item.description = Some(description);
            }
            serde_json::to_value(item.clone()).map_err(|e| ApiFailure::Network(e.to_string()))
        } else if method == Method::DELETE {
            state.items.remove(position);
            Ok(json!({"message": "Item deleted successfully"}))
        } else {
            Err(Self::not_found("Route"))
        }
    }
}

use std::sync::Arc;

// --- Module Structure ---

// Core session and synchronization components.
pub mod auth;
pub mod cache;
pub mod config;
pub mod errors;
pub mod guard;
pub mod models;
pub mod mutation;
pub mod session;
pub mod transport;

// Route table consumed by the guard.
pub mod routes;

// --- Public Re-exports ---

// Makes the core types easily accessible to embedders and the binary entry
// point.
pub use auth::{AuthError, AuthErrorKind, AuthGateway};
pub use cache::{
    CacheSubscription, EntrySnapshot, EntryStatus, Resource, ResourceCache, ResourceKey, Scope,
};
pub use config::{AppConfig, Env};
pub use errors::{ApiFailure, ErrorKind, ErrorNormalizer, FieldError, NormalizedError};
pub use guard::{NavigationDecision, RouteGuard};
pub use mutation::{MutationCoordinator, MutationIntent, Operation};
pub use session::SessionStore;
pub use transport::{ApiTransport, HttpApi, MockApi, TransportState};

use cache::ResourceFetcher;
use models::{ItemsPage, UserPublic};
use transport::ApiFetcher;

/// AppCore
///
/// Implements the **Unified State Pattern**: the single container holding
/// every core component, wired over one shared transport and one session
/// store. The presentation layer interacts with the console exclusively
/// through this struct — session subscription, cache reads, mutation
/// execution, and navigation guarding.
pub struct AppCore {
    /// The loaded, immutable configuration.
    pub config: AppConfig,
    /// Exclusive owner of the bearer token and authenticated state.
    pub session: Arc<SessionStore>,
    /// Login/logout against the remote authentication endpoint.
    pub auth: AuthGateway,
    /// Pass/redirect decision per navigation attempt.
    pub guard: RouteGuard,
    /// Keyed read-through cache of server resources.
    pub cache: ResourceCache,
    /// Mutation execution with targeted cache invalidation.
    pub mutations: MutationCoordinator,
}

impl AppCore {
    /// new
    ///
    /// Assembles the core over the given transport. The session store is
    /// file-backed when the configuration names a token path, in-memory
    /// otherwise; the error normalizer shares the store so auth failures
    /// anywhere in the core expire the session.
    pub fn new(config: AppConfig, transport: TransportState) -> Self {
        let session = Arc::new(match &config.token_path {
            Some(path) => SessionStore::with_storage(path.clone()),
            None => SessionStore::in_memory(),
        });
        let normalizer = ErrorNormalizer::new(Arc::clone(&session));
        let fetcher: Arc<dyn ResourceFetcher> = Arc::new(ApiFetcher::new(
            Arc::clone(&transport),
            Arc::clone(&session),
            normalizer.clone(),
        ));
        let cache = ResourceCache::new(fetcher);
        let auth = AuthGateway::new(Arc::clone(&transport), Arc::clone(&session));
        let guard = RouteGuard::new(Arc::clone(&session));
        let mutations = MutationCoordinator::new(
            transport,
            Arc::clone(&session),
            cache.clone(),
            normalizer,
        );

        Self {
            config,
            session,
            auth,
            guard,
            cache,
            mutations,
        }
    }

    /// Assembles the core over the real HTTP transport described by the
    /// configuration.
    pub fn with_http(config: AppConfig) -> Self {
        let transport: TransportState = Arc::new(HttpApi::new(&config));
        Self::new(config, transport)
    }

    // --- Typed Conveniences ---

    /// Current item collection, fetched through the cache.
    pub async fn items(&self) -> Result<ItemsPage, NormalizedError> {
        let value = self.cache.ensure_fresh(&ResourceKey::items_list()).await?;
        serde_json::from_value(value).map_err(|_| NormalizedError::decode())
    }

    /// The authenticated user's profile, fetched through the cache.
    pub async fn current_user(&self) -> Result<UserPublic, NormalizedError> {
        let value = self.cache.ensure_fresh(&ResourceKey::current_user()).await?;
        serde_json::from_value(value).map_err(|_| NormalizedError::decode())
    }
}

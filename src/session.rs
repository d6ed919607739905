use std::fs;
use std::path::PathBuf;
use std::sync::Arc;

use parking_lot::{Mutex, RwLock};

/// Listener invoked synchronously with the new authenticated state on every
/// token mutation. Listeners may re-enter the store (e.g. call
/// `is_authenticated`) but are called outside of any internal lock.
type AuthListener = Arc<dyn Fn(bool) + Send + Sync>;

/// SessionStore
///
/// The single owner of the client's Session: the opaque bearer token and the
/// authenticated/unauthenticated state derived from it. Exactly one store
/// exists per running core; every outbound authorized call reads the token
/// from here, and only the Auth Gateway (login/logout) and the Error
/// Normalizer (auth-failure expiry) write it.
///
/// When constructed with a storage path the token survives process restarts,
/// the analog of a browser's durable client storage. Persistence failures are
/// logged and never propagated: the in-memory session is authoritative.
pub struct SessionStore {
    token: RwLock<Option<String>>,
    listeners: Mutex<Vec<AuthListener>>,
    storage_path: Option<PathBuf>,
}

impl SessionStore {
    /// In-memory store with no durable persistence.
    pub fn in_memory() -> Self {
        Self {
            token: RwLock::new(None),
            listeners: Mutex::new(Vec::new()),
            storage_path: None,
        }
    }

    /// with_storage
    ///
    /// Store backed by a token file. A previously persisted token is loaded
    /// immediately, so a restarted client resumes its session without a
    /// fresh login.
    pub fn with_storage(path: PathBuf) -> Self {
        let persisted = fs::read_to_string(&path)
            .ok()
            .map(|raw| raw.trim().to_string())
            .filter(|token| !token.is_empty());

        if persisted.is_some() {
            tracing::debug!("session restored from {}", path.display());
        }

        Self {
            token: RwLock::new(persisted),
            listeners: Mutex::new(Vec::new()),
            storage_path: Some(path),
        }
    }

    /// set_token
    ///
    /// Stores the token, persists it when storage is configured, and
    /// synchronously notifies all listeners of the authenticated state.
    pub fn set_token(&self, token: impl Into<String>) {
        let token = token.into();
        {
            let mut slot = self.token.write();
            *slot = Some(token.clone());
        }
        self.persist(Some(&token));
        self.notify(self.is_authenticated());
    }

    /// clear_token
    ///
    /// Removes the token and notifies listeners. Idempotent: clearing an
    /// already-empty session is a no-op apart from the notification.
    pub fn clear_token(&self) {
        {
            let mut slot = self.token.write();
            *slot = None;
        }
        self.persist(None);
        self.notify(false);
    }

    /// Current token, if any. Used to attach authorization to outbound
    /// requests.
    pub fn token(&self) -> Option<String> {
        self.token.read().clone()
    }

    /// True iff a non-empty token is present.
    pub fn is_authenticated(&self) -> bool {
        self.token
            .read()
            .as_deref()
            .is_some_and(|token| !token.is_empty())
    }

    /// subscribe
    ///
    /// Registers a listener for authenticated-state changes. Listeners are
    /// invoked synchronously, in registration order, on every `set_token`
    /// and `clear_token` call.
    pub fn subscribe(&self, listener: impl Fn(bool) + Send + Sync + 'static) {
        self.listeners.lock().push(Arc::new(listener));
    }

    fn notify(&self, authenticated: bool) {
        // Snapshot under the lock, call outside it, so listeners can safely
        // read the store or register further listeners.
        let listeners: Vec<AuthListener> = self.listeners.lock().clone();
        for listener in listeners {
            listener(authenticated);
        }
    }

    fn persist(&self, token: Option<&str>) {
        let Some(path) = &self.storage_path else {
            return;
        };
        match token {
            Some(token) => {
                if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty())
                    && let Err(e) = fs::create_dir_all(parent)
                {
                    tracing::warn!("failed to create token directory: {e}");
                    return;
                }
                if let Err(e) = fs::write(path, token) {
                    tracing::warn!("failed to persist session token: {e}");
                }
            }
            None => {
                if let Err(e) = fs::remove_file(path)
                    && e.kind() != std::io::ErrorKind::NotFound
                {
                    tracing::warn!("failed to remove persisted token: {e}");
                }
            }
        }
    }
}

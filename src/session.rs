//! Identity and per-user storage for a hosting session.
//!
//! The identity provider is an external collaborator; the course only asks
//! who the current user is. An unauthenticated session has no progress to
//! load and runs against throwaway in-memory storage.

use async_trait::async_trait;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::errors::StorageError;
use crate::storage::{FileStore, MemoryStore, SharedStore};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct User {
    pub id: String,
    /// Bearer token for server calls, when the provider issues one
    pub token: Option<String>,
}

#[async_trait]
pub trait IdentityProvider: Send + Sync {
    async fn current_user(&self) -> Option<User>;

    async fn is_authenticated(&self) -> bool {
        self.current_user().await.is_some()
    }
}

/// Identity taken from configuration or the environment.
#[derive(Debug, Clone, Default)]
pub struct LocalIdentity {
    user: Option<User>,
}

impl LocalIdentity {
    /// A blank or missing id means "not signed in".
    pub fn new(user_id: Option<&str>, token: Option<&str>) -> Self {
        let user = user_id
            .map(str::trim)
            .filter(|id| !id.is_empty())
            .map(|id| User {
                id: id.to_string(),
                token: token.map(str::to_string),
            });
        Self { user }
    }

    pub fn anonymous() -> Self {
        Self::default()
    }
}

#[async_trait]
impl IdentityProvider for LocalIdentity {
    async fn current_user(&self) -> Option<User> {
        self.user.clone()
    }
}

/// Users already initialized during this hosting session.
#[derive(Debug, Default)]
pub struct SeenUsers {
    ids: HashSet<String>,
}

impl SeenUsers {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a user; returns `true` the first time only.
    pub fn first_sighting(&mut self, user_id: &str) -> bool {
        self.ids.insert(user_id.to_string())
    }

    /// Drop a user so the next sighting initializes again.
    pub fn forget(&mut self, user_id: &str) -> bool {
        self.ids.remove(user_id)
    }

    pub fn contains(&self, user_id: &str) -> bool {
        self.ids.contains(user_id)
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }
}

/// One-time per-user setup, deduplicated through an injected `SeenUsers`.
#[derive(Debug, Clone)]
pub struct SessionInitializer {
    data_dir: PathBuf,
}

impl SessionInitializer {
    pub fn new(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            data_dir: data_dir.into(),
        }
    }

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    pub fn user_dir(&self, user: &User) -> PathBuf {
        let safe: String = user
            .id
            .chars()
            .map(|c| if c.is_ascii_alphanumeric() || c == '-' { c } else { '_' })
            .collect();
        self.data_dir.join("users").join(safe)
    }

    /// Open the user's storage, creating it the first time the user is seen.
    /// A failed initialization leaves the user unseen.
    pub fn initialize(&self, seen: &mut SeenUsers, user: &User) -> Result<FileStore, StorageError> {
        let dir = self.user_dir(user);
        if seen.first_sighting(&user.id) {
            tracing::info!(user = %user.id, dir = %dir.display(), "Initializing user storage");
            FileStore::open(dir).inspect_err(|_| {
                seen.forget(&user.id);
            })
        } else {
            tracing::debug!(user = %user.id, "User storage already initialized");
            Ok(FileStore::existing(dir))
        }
    }
}

/// Storage bound to the signed-in user, or a guest.
pub struct UserStorage {
    pub user: Option<User>,
    pub backend: SharedStore,
    /// The user's directory could not be opened; `backend` is in-memory
    pub degraded: bool,
}

impl UserStorage {
    pub fn is_guest(&self) -> bool {
        self.user.is_none()
    }

    pub fn is_degraded(&self) -> bool {
        self.degraded
    }
}

/// Lifecycle owner of the `SeenUsers` cache.
pub struct HostSession {
    initializer: SessionInitializer,
    seen: SeenUsers,
}

impl HostSession {
    pub fn new(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            initializer: SessionInitializer::new(data_dir),
            seen: SeenUsers::new(),
        }
    }

    pub fn seen(&self) -> &SeenUsers {
        &self.seen
    }

    /// Resolve storage for whoever the provider says is signed in. Guests get
    /// fresh in-memory storage, so nothing is loaded or kept. A signed-in user
    /// whose directory cannot be opened plays on in-memory storage too.
    pub async fn open_storage(&mut self, identity: &dyn IdentityProvider) -> UserStorage {
        match identity.current_user().await {
            Some(user) => match self.initializer.initialize(&mut self.seen, &user) {
                Ok(store) => UserStorage {
                    user: Some(user),
                    backend: Arc::new(store),
                    degraded: false,
                },
                Err(err) => {
                    tracing::warn!(user = %user.id, error = %err, "User storage unavailable; progress will not be saved");
                    UserStorage {
                        user: Some(user),
                        backend: Arc::new(MemoryStore::new()),
                        degraded: true,
                    }
                }
            },
            None => {
                tracing::debug!("No authenticated user; using guest storage");
                UserStorage {
                    user: None,
                    backend: Arc::new(MemoryStore::new()),
                    degraded: false,
                }
            }
        }
    }
}

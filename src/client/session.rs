//! Session Store
//!
//! Holds the one active session for a client. Adapters receive the store as
//! an explicit `Arc<SessionStore>` so several independent clients (and tests)
//! can coexist in one process.
//!
//! The session is cached in memory and written through to the [`LocalStore`]
//! under [`SESSION_STORAGE_KEY`], so a restarted client picks it up again
//! without signing in.

use tokio::sync::RwLock;

use crate::client::local_db::LocalStore;
use crate::shared::error::Result;
use crate::shared::forum::{AuthUser, Session};

/// Storage key of the persisted session
pub const SESSION_STORAGE_KEY: &str = "session";

/// Single-session credential holder
#[derive(Debug)]
pub struct SessionStore {
    storage: Option<LocalStore>,
    current: RwLock<Option<Session>>,
}

impl SessionStore {
    /// A store that forgets everything when dropped
    pub fn in_memory() -> Self {
        Self {
            storage: None,
            current: RwLock::new(None),
        }
    }

    /// Open a durable store, restoring a previously persisted session.
    ///
    /// A persisted value that no longer decodes is discarded.
    pub async fn open(storage: LocalStore) -> Result<Self> {
        let restored = match storage.get(SESSION_STORAGE_KEY).await? {
            Some(raw) => match serde_json::from_str::<Session>(&raw) {
                Ok(session) => {
                    tracing::info!("Restored session for {}", session.user.email);
                    Some(session)
                }
                Err(e) => {
                    tracing::warn!("Discarding unreadable persisted session: {}", e);
                    storage.delete(SESSION_STORAGE_KEY).await?;
                    None
                }
            },
            None => None,
        };

        Ok(Self {
            storage: Some(storage),
            current: RwLock::new(restored),
        })
    }

    /// The active session, if any. Never touches storage.
    pub async fn get(&self) -> Option<Session> {
        self.current.read().await.clone()
    }

    /// Bearer token of the active session
    pub async fn token(&self) -> Option<String> {
        self.current.read().await.as_ref().map(|s| s.token.clone())
    }

    /// Whether a session is active
    pub async fn is_active(&self) -> bool {
        self.current.read().await.is_some()
    }

    /// Replace the active session; any previous one is discarded
    pub async fn set(&self, session: Session) -> Result<()> {
        let mut current = self.current.write().await;
        if let Some(storage) = &self.storage {
            storage
                .put(SESSION_STORAGE_KEY, &serde_json::to_string(&session)?)
                .await?;
        }
        tracing::debug!("Session set for {}", session.user.email);
        *current = Some(session);
        Ok(())
    }

    /// Swap the user attached to the active session, keeping its token.
    ///
    /// Does nothing when no session is active.
    pub async fn update_user(&self, user: AuthUser) -> Result<()> {
        let mut current = self.current.write().await;
        let Some(session) = current.as_ref() else {
            return Ok(());
        };
        let updated = Session {
            token: session.token.clone(),
            user,
        };
        if let Some(storage) = &self.storage {
            storage
                .put(SESSION_STORAGE_KEY, &serde_json::to_string(&updated)?)
                .await?;
        }
        *current = Some(updated);
        Ok(())
    }

    /// Forget the active session; succeeds when there is none
    pub async fn clear(&self) -> Result<()> {
        let mut current = self.current.write().await;
        // A failed delete leaves the cached session untouched.
        if let Some(storage) = &self.storage {
            storage.delete(SESSION_STORAGE_KEY).await?;
        }
        if current.take().is_some() {
            tracing::debug!("Session cleared");
        }
        Ok(())
    }
}

use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

use tracing::{debug, warn};

use super::storage::Storage;
use crate::api::TokenProvider;
use crate::models::UserInfo;

/// Storage key for the bearer token
pub const TOKEN_KEY: &str = "token";

/// Storage key for the JSON-serialized identity snapshot
pub const USER_KEY: &str = "user";

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Credentials {
    pub token: String,
    pub user: UserInfo,
}

impl Credentials {
    pub fn is_authenticated(&self) -> bool {
        !self.token.is_empty()
    }
}

/// The single holder of the current session token and identity.
///
/// The pair is always replaced as a whole, so a concurrent reader sees
/// either the old or the new credentials.
pub struct CredentialStore {
    storage: Arc<dyn Storage>,
    current: RwLock<Credentials>,
}

impl CredentialStore {
    /// Create an empty store, then hydrate it from `storage`.
    ///
    /// Missing or unreadable entries leave the store empty.
    pub fn load(storage: Arc<dyn Storage>) -> Self {
        let current = Self::read_persisted(storage.as_ref());
        debug!(authenticated = current.is_authenticated(), "Loaded session");
        Self {
            storage,
            current: RwLock::new(current),
        }
    }

    fn read_persisted(storage: &dyn Storage) -> Credentials {
        let token = match storage.get(TOKEN_KEY) {
            Ok(Some(token)) => token,
            Ok(None) => return Credentials::default(),
            Err(e) => {
                warn!(error = %e, "Failed to read stored token");
                return Credentials::default();
            }
        };
        if token.is_empty() {
            return Credentials::default();
        }

        let user = match storage.get(USER_KEY) {
            Ok(Some(json)) => serde_json::from_str(&json).unwrap_or_else(|e| {
                warn!(error = %e, "Ignoring malformed stored user");
                UserInfo::default()
            }),
            Ok(None) => UserInfo::default(),
            Err(e) => {
                warn!(error = %e, "Failed to read stored user");
                UserInfo::default()
            }
        };

        Credentials { token, user }
    }

    fn read(&self) -> RwLockReadGuard<'_, Credentials> {
        self.current.read().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn write(&self) -> RwLockWriteGuard<'_, Credentials> {
        self.current.write().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Replace token and identity, then persist both.
    pub fn set(&self, token: String, user: UserInfo) {
        let user_json = serde_json::to_string(&user).unwrap_or_else(|_| "{}".to_string());
        *self.write() = Credentials {
            token: token.clone(),
            user,
        };

        if let Err(e) = self.storage.set(TOKEN_KEY, &token) {
            warn!(error = %e, "Failed to persist token");
        }
        if let Err(e) = self.storage.set(USER_KEY, &user_json) {
            warn!(error = %e, "Failed to persist user");
        }
    }

    /// Swap in a new identity snapshot, but only while `token` is still the
    /// current token. Returns whether the user was replaced.
    pub fn replace_user_if(&self, token: &str, user: UserInfo) -> bool {
        let mut current = self.write();
        if !current.is_authenticated() || current.token != token {
            return false;
        }

        let user_json = serde_json::to_string(&user).unwrap_or_else(|_| "{}".to_string());
        current.user = user;
        // Persist under the lock so a concurrent clear can't be overwritten
        if let Err(e) = self.storage.set(USER_KEY, &user_json) {
            warn!(error = %e, "Failed to persist user");
        }
        true
    }

    /// Reset to the empty session and remove persisted entries.
    pub fn clear(&self) {
        *self.write() = Credentials::default();

        for key in [TOKEN_KEY, USER_KEY] {
            if let Err(e) = self.storage.remove(key) {
                warn!(error = %e, key = key, "Failed to remove persisted session entry");
            }
        }
    }

    pub fn is_authenticated(&self) -> bool {
        self.read().is_authenticated()
    }

    pub fn token(&self) -> String {
        self.read().token.clone()
    }

    pub fn user(&self) -> UserInfo {
        self.read().user.clone()
    }

    pub fn snapshot(&self) -> Credentials {
        self.read().clone()
    }
}

impl TokenProvider for CredentialStore {
    fn token(&self) -> Option<String> {
        let current = self.read();
        current
            .is_authenticated()
            .then(|| current.token.clone())
    }
}

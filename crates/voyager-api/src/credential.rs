// Session credential
//
// Holds the bearer/session token shared by every client of one
// application context. Writers replace the whole value under an exclusive
// lock, so readers always see either the old token or the new one.

use std::sync::{PoisonError, RwLock};

use secrecy::{ExposeSecret, SecretString};
use tracing::debug;

/// Thread-safe cell for the current session token.
///
/// Construct one per application context and share it via `Arc` with the
/// service clients that need it.
#[derive(Debug, Default)]
pub struct CredentialStore {
    token: RwLock<Option<SecretString>>,
}

impl CredentialStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start with a token already in place (e.g. restored from disk).
    pub fn with_token(token: impl Into<String>) -> Self {
        Self {
            token: RwLock::new(Some(SecretString::from(token.into()))),
        }
    }

    /// The current token, if any.
    pub fn get(&self) -> Option<SecretString> {
        self.token
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn set(&self, token: impl Into<String>) {
        let token = token.into();
        debug!(token_len = token.len(), "storing session token");
        *self.token.write().unwrap_or_else(PoisonError::into_inner) =
            Some(SecretString::from(token));
    }

    pub fn clear(&self) {
        debug!("clearing session token");
        *self.token.write().unwrap_or_else(PoisonError::into_inner) = None;
    }

    /// Present and non-empty.
    pub fn is_valid(&self) -> bool {
        self.token
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .as_ref()
            .is_some_and(|t| !t.expose_secret().is_empty())
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;

    #[test]
    fn set_get_clear_round_trip() {
        let store = CredentialStore::new();
        assert!(!store.is_valid());

        store.set("tok-123");
        assert_eq!(
            store.get().map(|t| t.expose_secret().to_owned()),
            Some("tok-123".to_owned())
        );
        assert!(store.is_valid());

        store.clear();
        assert!(store.get().is_none());
        assert!(!store.is_valid());
    }

    #[test]
    fn empty_token_is_not_valid() {
        let store = CredentialStore::with_token("");
        assert!(store.get().is_some());
        assert!(!store.is_valid());
    }

    #[test]
    fn concurrent_readers_never_see_torn_tokens() {
        let old = "a".repeat(4096);
        let new = "b".repeat(4096);
        let store = Arc::new(CredentialStore::with_token(old.clone()));

        std::thread::scope(|scope| {
            for _ in 0..8 {
                let store = Arc::clone(&store);
                let (old, new) = (&old, &new);
                scope.spawn(move || {
                    for _ in 0..2_000 {
                        let seen = store.get().map(|t| t.expose_secret().to_owned());
                        let seen = seen.as_deref();
                        assert!(
                            seen == Some(old.as_str()) || seen == Some(new.as_str()),
                            "observed a partially written token"
                        );
                    }
                });
            }

            let writer = Arc::clone(&store);
            let (old, new) = (&old, &new);
            scope.spawn(move || {
                for i in 0..500 {
                    writer.set(if i % 2 == 0 { new.clone() } else { old.clone() });
                }
            });
        });
    }
}

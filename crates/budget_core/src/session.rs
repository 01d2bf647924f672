//! crates/budget_core/src/session.rs
//!
//! The session store: owns the authenticated identity for this client
//! instance and persists it to one of two injected storage tiers. Which
//! tier is written is decided once, at login time, by the "remember me"
//! choice; restore checks the durable tier first.

use std::sync::{Arc, Mutex};
use tracing::warn;

use crate::domain::{Persistence, Session, StoredIdentity};
use crate::ports::{IdentityStore, LoginTokens, TokenCell};

/// Holds at most one active session and the storage tiers backing it.
///
/// The store itself never talks to the backend; the tracker facade performs
/// the credential exchange and hands the resulting tokens to [`establish`].
/// Logout is client-local only: both tiers are cleared and no server-side
/// revocation is attempted.
///
/// [`establish`]: SessionStore::establish
pub struct SessionStore {
    durable: Arc<dyn IdentityStore>,
    ephemeral: Arc<dyn IdentityStore>,
    token: TokenCell,
    current: Mutex<Option<Session>>,
}

impl SessionStore {
    pub fn new(
        durable: Arc<dyn IdentityStore>,
        ephemeral: Arc<dyn IdentityStore>,
        token: TokenCell,
    ) -> Self {
        Self {
            durable,
            ephemeral,
            token,
            current: Mutex::new(None),
        }
    }

    /// Installs a freshly authenticated identity, replacing any previous
    /// session, and persists it to the tier selected by `remember`.
    ///
    /// Persistence failures are logged and swallowed: the in-memory session
    /// is already valid, the user just won't be restored next run.
    pub fn establish(&self, email: &str, tokens: LoginTokens, remember: bool) -> Session {
        let persistence = if remember {
            Persistence::Durable
        } else {
            Persistence::Ephemeral
        };
        let session = Session {
            email: email.to_string(),
            access_token: tokens.access_token,
            refresh_token: tokens.refresh_token,
            persistence,
        };

        let identity = StoredIdentity {
            email: session.email.clone(),
            access_token: session.access_token.clone(),
            refresh_token: session.refresh_token.clone(),
        };
        let tier = match persistence {
            Persistence::Durable => &self.durable,
            Persistence::Ephemeral => &self.ephemeral,
        };
        if let Err(e) = tier.save(&identity) {
            warn!("failed to persist identity: {e}");
        }

        self.token.set(&session.access_token);
        if let Ok(mut current) = self.current.lock() {
            *current = Some(session.clone());
        }
        session
    }

    /// Looks for a previously saved identity, durable tier first, then
    /// ephemeral. The token is not validated against the backend here; an
    /// expired token surfaces as a 401 on the first authenticated call.
    ///
    /// An unreadable tier is treated as absent rather than an error, so a
    /// corrupted state file degrades to the login screen instead of a crash.
    pub fn restore(&self) -> Option<Session> {
        let tiers = [
            (&self.durable, Persistence::Durable),
            (&self.ephemeral, Persistence::Ephemeral),
        ];
        for (tier, persistence) in tiers {
            let identity = match tier.load() {
                Ok(identity) => identity,
                Err(e) => {
                    warn!("ignoring unreadable identity tier: {e}");
                    None
                }
            };
            if let Some(identity) = identity {
                let session = Session {
                    email: identity.email,
                    access_token: identity.access_token,
                    refresh_token: identity.refresh_token,
                    persistence,
                };
                self.token.set(&session.access_token);
                if let Ok(mut current) = self.current.lock() {
                    *current = Some(session.clone());
                }
                return Some(session);
            }
        }
        None
    }

    /// Clears the identity from both storage tiers and drops the in-memory
    /// session. Client-local only; the backend is not called.
    pub fn logout(&self) {
        for tier in [&self.durable, &self.ephemeral] {
            if let Err(e) = tier.clear() {
                warn!("failed to clear identity tier: {e}");
            }
        }
        self.token.clear();
        if let Ok(mut current) = self.current.lock() {
            *current = None;
        }
    }

    /// Forced logout after the backend rejected our token mid-flight.
    pub fn expire(&self) {
        warn!("session rejected by backend, forcing logout");
        self.logout();
    }

    pub fn current(&self) -> Option<Session> {
        self.current.lock().ok().and_then(|current| current.clone())
    }

    pub fn current_user(&self) -> Option<String> {
        self.current().map(|s| s.email)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ports::StoreError;

    /// A storage tier backed by a mutex slot, standing in for real storage.
    #[derive(Default)]
    struct SlotStore {
        slot: Mutex<Option<StoredIdentity>>,
        fail_load: bool,
    }

    impl IdentityStore for SlotStore {
        fn load(&self) -> Result<Option<StoredIdentity>, StoreError> {
            if self.fail_load {
                return Err(StoreError::Corrupt("bad json".into()));
            }
            Ok(self.slot.lock().unwrap().clone())
        }
        fn save(&self, identity: &StoredIdentity) -> Result<(), StoreError> {
            *self.slot.lock().unwrap() = Some(identity.clone());
            Ok(())
        }
        fn clear(&self) -> Result<(), StoreError> {
            *self.slot.lock().unwrap() = None;
            Ok(())
        }
    }

    fn store_with(
        durable: Arc<SlotStore>,
        ephemeral: Arc<SlotStore>,
    ) -> (SessionStore, TokenCell) {
        let token = TokenCell::new();
        (
            SessionStore::new(durable, ephemeral, token.clone()),
            token,
        )
    }

    fn tokens(access: &str) -> LoginTokens {
        LoginTokens {
            access_token: access.to_string(),
            refresh_token: Some(format!("{access}-refresh")),
        }
    }

    #[test]
    fn remembered_login_lands_in_durable_tier() {
        let durable = Arc::new(SlotStore::default());
        let ephemeral = Arc::new(SlotStore::default());
        let (store, token) = store_with(durable.clone(), ephemeral.clone());

        let session = store.establish("amy@example.com", tokens("t1"), true);
        assert_eq!(session.persistence, Persistence::Durable);
        assert!(durable.slot.lock().unwrap().is_some());
        assert!(ephemeral.slot.lock().unwrap().is_none());
        assert_eq!(token.get().as_deref(), Some("t1"));
    }

    #[test]
    fn unremembered_login_stays_ephemeral() {
        let durable = Arc::new(SlotStore::default());
        let ephemeral = Arc::new(SlotStore::default());
        let (store, _) = store_with(durable.clone(), ephemeral.clone());

        let session = store.establish("amy@example.com", tokens("t1"), false);
        assert_eq!(session.persistence, Persistence::Ephemeral);
        assert!(durable.slot.lock().unwrap().is_none());
        assert!(ephemeral.slot.lock().unwrap().is_some());
    }

    #[test]
    fn restart_without_remember_me_loses_the_session() {
        // Simulated restart: the ephemeral tier comes back empty.
        let durable = Arc::new(SlotStore::default());
        {
            let (store, _) = store_with(durable.clone(), Arc::new(SlotStore::default()));
            store.establish("amy@example.com", tokens("t1"), false);
        }
        let (fresh, token) = store_with(durable, Arc::new(SlotStore::default()));
        assert!(fresh.restore().is_none());
        assert_eq!(token.get(), None);
    }

    #[test]
    fn restore_prefers_durable_over_ephemeral() {
        let durable = Arc::new(SlotStore::default());
        let ephemeral = Arc::new(SlotStore::default());
        durable
            .save(&StoredIdentity {
                email: "durable@example.com".into(),
                access_token: "d".into(),
                refresh_token: None,
            })
            .unwrap();
        ephemeral
            .save(&StoredIdentity {
                email: "ephemeral@example.com".into(),
                access_token: "e".into(),
                refresh_token: None,
            })
            .unwrap();

        let (store, token) = store_with(durable, ephemeral);
        let session = store.restore().unwrap();
        assert_eq!(session.email, "durable@example.com");
        assert_eq!(session.persistence, Persistence::Durable);
        assert_eq!(token.get().as_deref(), Some("d"));
    }

    #[test]
    fn unreadable_durable_tier_falls_through_to_ephemeral() {
        let durable = Arc::new(SlotStore {
            fail_load: true,
            ..Default::default()
        });
        let ephemeral = Arc::new(SlotStore::default());
        ephemeral
            .save(&StoredIdentity {
                email: "amy@example.com".into(),
                access_token: "e".into(),
                refresh_token: None,
            })
            .unwrap();

        let (store, _) = store_with(durable, ephemeral);
        assert_eq!(store.restore().unwrap().email, "amy@example.com");
    }

    #[test]
    fn logout_clears_both_tiers_and_the_token() {
        let durable = Arc::new(SlotStore::default());
        let ephemeral = Arc::new(SlotStore::default());
        let (store, token) = store_with(durable.clone(), ephemeral.clone());

        store.establish("amy@example.com", tokens("t1"), true);
        store.establish("amy@example.com", tokens("t2"), false);
        store.logout();

        assert!(durable.slot.lock().unwrap().is_none());
        assert!(ephemeral.slot.lock().unwrap().is_none());
        assert_eq!(token.get(), None);
        assert!(store.current().is_none());
    }

    #[test]
    fn establish_replaces_any_previous_session() {
        let (store, _) = store_with(
            Arc::new(SlotStore::default()),
            Arc::new(SlotStore::default()),
        );
        store.establish("first@example.com", tokens("t1"), false);
        store.establish("second@example.com", tokens("t2"), false);
        assert_eq!(store.current_user().as_deref(), Some("second@example.com"));
    }
}

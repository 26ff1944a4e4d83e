use super::credentials::{CredentialStore, Result};

/// Session state as projected from the credential store.
///
/// There is no separate logged-in flag: a session exists exactly when an
/// access token is stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Anonymous,
    /// Access token stored, refresh token may or may not be present
    Authenticated { refreshable: bool },
}

impl SessionState {
    pub fn from_store(store: &dyn CredentialStore) -> Result<Self> {
        let state = match store.access_token()? {
            Some(_) => SessionState::Authenticated {
                refreshable: store.refresh_token()?.is_some(),
            },
            None => SessionState::Anonymous,
        };
        Ok(state)
    }

    pub fn is_authenticated(&self) -> bool {
        matches!(self, SessionState::Authenticated { .. })
    }
}

/// Hook invoked when a token refresh fails and the session has been purged.
///
/// Replaces a direct navigation to the login page; callers decide what
/// "go to login" means for them.
pub trait SessionExpiryHandler: Send + Sync {
    fn on_session_expired(&self);

    /// True while the caller is on the registration flow. No expiry
    /// notification is sent in that case.
    fn in_registration_flow(&self) -> bool {
        false
    }
}

impl<F> SessionExpiryHandler for F
where
    F: Fn() + Send + Sync,
{
    fn on_session_expired(&self) {
        self()
    }
}

/// Handler that ignores expiry. Useful for headless callers.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopExpiryHandler;

impl SessionExpiryHandler for NoopExpiryHandler {
    fn on_session_expired(&self) {}
}

//! Authentication module for managing tokens and session state.
//!
//! This module provides:
//! - `CredentialStore`: Storage for the access/refresh token pair, backed by
//!   the OS keychain (`KeyringCredentialStore`) or memory (`MemoryCredentialStore`)
//! - `SessionState`: Login state derived from which tokens are stored
//! - `SessionExpiryHandler`: Hook run when a session cannot be refreshed

pub mod credentials;
pub mod session;

pub use credentials::{
    CredentialError, CredentialPair, CredentialStore, KeyringCredentialStore,
    MemoryCredentialStore, TokenKey,
};
pub use session::{NoopExpiryHandler, SessionExpiryHandler, SessionState};

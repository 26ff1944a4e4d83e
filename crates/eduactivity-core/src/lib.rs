//! Core library for the EduActivity provider marketplace.
//!
//! Provides the authenticated session client, token storage, configuration,
//! and the data models exchanged with the backend.

pub mod api;
pub mod auth;
pub mod config;
pub mod models;

pub use api::{ApiError, ApiResponse, RequestDescriptor, SessionClient};
pub use auth::{
    CredentialPair, CredentialStore, KeyringCredentialStore, MemoryCredentialStore,
    NoopExpiryHandler, SessionExpiryHandler, SessionState,
};
pub use config::{Config, SessionConfig};

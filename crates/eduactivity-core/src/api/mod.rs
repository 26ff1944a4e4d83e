//! REST API client module for the marketplace backend.
//!
//! This module provides the `SessionClient` for communicating with the
//! backend to authenticate, search providers, and manage services,
//! pricing, and bookings.
//!
//! The API uses JWT bearer authentication. Access tokens are short-lived;
//! the client refreshes them once per failed request using the stored
//! refresh token.

pub mod client;
pub mod endpoints;
pub mod error;
pub mod request;

pub use client::SessionClient;
pub use error::ApiError;
pub use request::{ApiResponse, RequestDescriptor};

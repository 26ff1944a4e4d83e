//! Data models for marketplace entities.
//!
//! This module contains the data structures exchanged with the backend:
//!
//! - `UserProfile`, `RegistrationRequest`, `ProfileUpdate`: Accounts
//! - `Provider`, `SearchParams`: Provider listings and search filters
//! - `Service`, `Pricing`: What a provider offers and at what price
//! - `Booking`, `BookingStatus`: Reservations against services
//! - `Page`: The paginated envelope used by list endpoints

pub mod booking;
pub mod provider;
pub mod service;
pub mod user;

use serde::{Deserialize, Deserializer, Serialize};

pub use booking::{Booking, BookingStatus};
pub(crate) use booking::BookingStatusUpdate;
pub use provider::{Provider, ProviderDraft, ProviderPhoto, SearchParams, SearchSort, SubscriptionStatus};
pub use service::{Pricing, PricingDraft, PricingType, Service, ServiceDraft, ServiceType};
pub use user::{
    PasswordChange, ProfileUpdate, RegistrationRequest, RegistrationResult, UserProfile, UserType,
};
pub(crate) use user::{LoginRequest, LoginResponse};

/// Paginated list envelope.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Page<T> {
    #[serde(default)]
    pub count: u64,
    #[serde(default)]
    pub next: Option<String>,
    #[serde(default)]
    pub previous: Option<String>,
    pub results: Vec<T>,
}

impl<T> Page<T> {
    pub fn has_more(&self) -> bool {
        self.next.is_some()
    }
}

/// List endpoints answer with either a bare array or a `Page`.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub(crate) enum Listing<T> {
    Paged(Page<T>),
    Plain(Vec<T>),
}

impl<T> Listing<T> {
    pub fn into_vec(self) -> Vec<T> {
        match self {
            Listing::Paged(page) => page.results,
            Listing::Plain(items) => items,
        }
    }
}

/// Accept an identifier serialized either as a string or a number
pub(crate) fn id_string<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum RawId {
        Text(String),
        Number(i64),
    }

    Ok(match RawId::deserialize(deserializer)? {
        RawId::Text(s) => s,
        RawId::Number(n) => n.to_string(),
    })
}

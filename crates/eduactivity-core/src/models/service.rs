//! Services a provider offers and their price points.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ServiceType {
    #[default]
    Individual,
    Group,
    Package,
    Consultation,
    Assessment,
    #[serde(other)]
    Unknown,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Service {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub service_type: ServiceType,
    #[serde(default)]
    pub duration_hours: u32,
    #[serde(default)]
    pub duration_minutes: u32,
    #[serde(default)]
    pub max_participants: u32,
    #[serde(default)]
    pub is_active: bool,
    #[serde(default)]
    pub pricings: Vec<Pricing>,
    #[serde(default)]
    pub duration_display: Option<String>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

impl Service {
    pub fn total_minutes(&self) -> u32 {
        self.duration_hours * 60 + self.duration_minutes
    }
}

/// Editable service fields for create and update.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceDraft {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub service_type: ServiceType,
    pub duration_hours: u32,
    pub duration_minutes: u32,
    pub max_participants: u32,
    pub is_active: bool,
}

impl Default for ServiceDraft {
    fn default() -> Self {
        Self {
            name: String::new(),
            description: None,
            service_type: ServiceType::Individual,
            duration_hours: 1,
            duration_minutes: 0,
            max_participants: 1,
            is_active: true,
        }
    }
}

impl ServiceDraft {
    /// Mirror of the backend's duration rules, checked before a round-trip.
    pub fn validate(&self) -> Result<(), String> {
        if self.name.trim().is_empty() {
            return Err("Service name is required.".to_string());
        }
        if self.duration_hours == 0 && self.duration_minutes == 0 {
            return Err("Service must have a duration greater than 0.".to_string());
        }
        if self.duration_minutes >= 60 {
            return Err("Duration minutes must be less than 60.".to_string());
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum PricingType {
    #[default]
    PerSession,
    PerHour,
    PerParticipant,
    Fixed,
    Package,
    #[serde(other)]
    Unknown,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Pricing {
    pub id: String,
    #[serde(default)]
    pub pricing_type: PricingType,
    /// Decimal amount exactly as the backend serialized it
    pub price: String,
    #[serde(default = "default_currency")]
    pub currency: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub min_sessions: Option<u32>,
    #[serde(default)]
    pub max_sessions: Option<u32>,
    #[serde(default)]
    pub is_active: bool,
    #[serde(default)]
    pub valid_from: Option<NaiveDate>,
    #[serde(default)]
    pub valid_until: Option<NaiveDate>,
}

fn default_currency() -> String {
    "USD".to_string()
}

/// Editable pricing fields for create and update.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PricingDraft {
    pub pricing_type: PricingType,
    pub price: String,
    pub currency: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub min_sessions: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_sessions: Option<u32>,
    pub is_active: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub valid_from: Option<NaiveDate>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub valid_until: Option<NaiveDate>,
}

impl PricingDraft {
    pub fn new(pricing_type: PricingType, price: impl Into<String>) -> Self {
        Self {
            pricing_type,
            price: price.into(),
            currency: default_currency(),
            description: None,
            min_sessions: 1,
            max_sessions: None,
            is_active: true,
            valid_from: None,
            valid_until: None,
        }
    }
}

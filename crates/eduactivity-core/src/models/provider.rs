//! Provider listings and search.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::Service;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum SubscriptionStatus {
    #[default]
    Inactive,
    Active,
    Expired,
    #[serde(other)]
    Unknown,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderPhoto {
    pub id: String,
    pub photo_url: String,
    #[serde(default)]
    pub is_primary: bool,
}

/// A provider as returned by the listing, search, and detail endpoints.
/// Search results omit contact and subscription fields.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Provider {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub category: String,
    #[serde(default)]
    pub subcategory: Option<String>,
    #[serde(default)]
    pub address: String,
    /// Decimal degrees, serialized by the backend as strings
    #[serde(default)]
    pub latitude: Option<String>,
    #[serde(default)]
    pub longitude: Option<String>,
    #[serde(default)]
    pub contact_email: Option<String>,
    #[serde(default)]
    pub contact_phone: Option<String>,
    #[serde(default)]
    pub website: Option<String>,
    #[serde(default)]
    pub pricing_info: Option<String>,
    #[serde(default)]
    pub is_approved: bool,
    #[serde(default)]
    pub subscription_status: SubscriptionStatus,
    #[serde(default)]
    pub profile_views: i64,
    #[serde(default)]
    pub photos: Vec<ProviderPhoto>,
    #[serde(default)]
    pub services: Vec<Service>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

impl Provider {
    pub fn primary_photo(&self) -> Option<&ProviderPhoto> {
        self.photos
            .iter()
            .find(|p| p.is_primary)
            .or_else(|| self.photos.first())
    }
}

/// Editable provider fields for create and update.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProviderDraft {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub category: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subcategory: Option<String>,
    pub address: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub contact_email: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub contact_phone: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub website: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pricing_info: Option<String>,
}

/// Ordering accepted by the search endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SearchSort {
    #[default]
    Relevance,
    Rating,
    Popularity,
    Newest,
    Distance,
}

impl SearchSort {
    pub fn as_str(self) -> &'static str {
        match self {
            SearchSort::Relevance => "relevance",
            SearchSort::Rating => "rating",
            SearchSort::Popularity => "popularity",
            SearchSort::Newest => "newest",
            SearchSort::Distance => "distance",
        }
    }
}

impl std::str::FromStr for SearchSort {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "relevance" => Ok(SearchSort::Relevance),
            "rating" => Ok(SearchSort::Rating),
            "popularity" => Ok(SearchSort::Popularity),
            "newest" => Ok(SearchSort::Newest),
            "distance" => Ok(SearchSort::Distance),
            other => Err(format!("unknown sort order: {}", other)),
        }
    }
}

/// Provider search filters. Empty filters are left out of the query.
#[derive(Debug, Clone, Default)]
pub struct SearchParams {
    pub q: Option<String>,
    pub category: Option<String>,
    pub subcategory: Option<String>,
    pub location: Option<String>,
    pub lat: Option<f64>,
    pub lng: Option<f64>,
    /// Kilometres around `lat`/`lng`
    pub radius: Option<f64>,
    pub min_rating: Option<f32>,
    pub max_price: Option<String>,
    pub sort: Option<SearchSort>,
    pub page: Option<u32>,
    pub page_size: Option<u32>,
}

impl SearchParams {
    pub fn query(q: impl Into<String>) -> Self {
        Self {
            q: Some(q.into()),
            ..Default::default()
        }
    }

    pub fn to_query(&self) -> Vec<(String, String)> {
        let mut pairs = Vec::new();
        let mut push = |name: &str, value: Option<String>| {
            if let Some(value) = value {
                let value = value.trim().to_string();
                if !value.is_empty() {
                    pairs.push((name.to_string(), value));
                }
            }
        };

        push("q", self.q.clone());
        push("category", self.category.clone());
        push("subcategory", self.subcategory.clone());
        push("location", self.location.clone());
        push("lat", self.lat.map(|v| v.to_string()));
        push("lng", self.lng.map(|v| v.to_string()));
        push("radius", self.radius.map(|v| v.to_string()));
        push("min_rating", self.min_rating.map(|v| v.to_string()));
        push("max_price", self.max_price.clone());
        push("sort", self.sort.map(|s| s.as_str().to_string()));
        push("page", self.page.map(|v| v.to_string()));
        push("page_size", self.page_size.map(|v| v.to_string()));
        pairs
    }
}

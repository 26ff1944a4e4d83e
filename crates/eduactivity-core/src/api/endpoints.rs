//! Typed wrappers over `SessionClient::send` for each backend resource.
//!
//! Every call goes through the same session pipeline, so an expired access
//! token is refreshed transparently here too.

use crate::models::{
    Booking, BookingStatus, BookingStatusUpdate, Listing, Page, PasswordChange, Pricing,
    PricingDraft, ProfileUpdate, Provider, ProviderDraft, SearchParams, Service, ServiceDraft,
    UserProfile,
};

use super::{ApiError, RequestDescriptor, SessionClient};

const PROFILE_PATH: &str = "/api/users/profile/";
const CHANGE_PASSWORD_PATH: &str = "/api/users/change-password/";
const SEARCH_PATH: &str = "/api/search/";
const PROVIDERS_PATH: &str = "/api/providers/";
const MY_PROVIDER_PATH: &str = "/api/providers/my/";
const SERVICES_PATH: &str = "/api/providers/services/";
const BOOKINGS_PATH: &str = "/api/providers/bookings/";

fn provider_path(id: &str) -> String {
    format!("{}{}/", PROVIDERS_PATH, id)
}

fn service_path(id: &str) -> String {
    format!("{}{}/", SERVICES_PATH, id)
}

fn service_pricing_path(service_id: &str) -> String {
    format!("{}{}/pricing/", SERVICES_PATH, service_id)
}

fn pricing_path(id: &str) -> String {
    format!("/api/providers/pricing/{}/", id)
}

fn booking_path(id: &str) -> String {
    format!("{}{}/", BOOKINGS_PATH, id)
}

impl SessionClient {
    // ===== Account =====

    pub async fn current_user(&self) -> Result<UserProfile, ApiError> {
        self.send_json(RequestDescriptor::get(PROFILE_PATH)).await
    }

    pub async fn update_profile(&self, update: &ProfileUpdate) -> Result<UserProfile, ApiError> {
        self.send_json(RequestDescriptor::patch(PROFILE_PATH).json(update)?)
            .await
    }

    pub async fn change_password(&self, change: &PasswordChange) -> Result<(), ApiError> {
        self.send_empty(RequestDescriptor::post(CHANGE_PASSWORD_PATH).json(change)?)
            .await
    }

    // ===== Search =====

    /// Search approved providers. Blank filters are not sent.
    pub async fn search_providers(&self, params: &SearchParams) -> Result<Page<Provider>, ApiError> {
        let mut request = RequestDescriptor::get(SEARCH_PATH);
        request.query = params.to_query();
        let listing: Listing<Provider> = self.send_json(request).await?;
        Ok(match listing {
            Listing::Paged(page) => page,
            Listing::Plain(results) => Page {
                count: results.len() as u64,
                next: None,
                previous: None,
                results,
            },
        })
    }

    // ===== Providers =====

    pub async fn provider(&self, id: &str) -> Result<Provider, ApiError> {
        self.send_json(RequestDescriptor::get(provider_path(id))).await
    }

    pub async fn create_provider(&self, draft: &ProviderDraft) -> Result<Provider, ApiError> {
        self.send_json(RequestDescriptor::post(PROVIDERS_PATH).json(draft)?)
            .await
    }

    pub async fn update_provider(&self, id: &str, draft: &ProviderDraft) -> Result<Provider, ApiError> {
        self.send_json(RequestDescriptor::put(provider_path(id)).json(draft)?)
            .await
    }

    /// The logged-in provider's own profile
    pub async fn my_provider(&self) -> Result<Provider, ApiError> {
        self.send_json(RequestDescriptor::get(MY_PROVIDER_PATH)).await
    }

    /// Create or update the logged-in provider's own profile
    pub async fn save_my_provider(&self, draft: &ProviderDraft) -> Result<Provider, ApiError> {
        self.send_json(RequestDescriptor::post(MY_PROVIDER_PATH).json(draft)?)
            .await
    }

    // ===== Services =====

    pub async fn services(&self) -> Result<Vec<Service>, ApiError> {
        let listing: Listing<Service> = self.send_json(RequestDescriptor::get(SERVICES_PATH)).await?;
        Ok(listing.into_vec())
    }

    pub async fn create_service(&self, draft: &ServiceDraft) -> Result<Service, ApiError> {
        draft.validate().map_err(ApiError::InvalidRequest)?;
        self.send_json(RequestDescriptor::post(SERVICES_PATH).json(draft)?)
            .await
    }

    pub async fn update_service(&self, id: &str, draft: &ServiceDraft) -> Result<Service, ApiError> {
        draft.validate().map_err(ApiError::InvalidRequest)?;
        self.send_json(RequestDescriptor::put(service_path(id)).json(draft)?)
            .await
    }

    pub async fn delete_service(&self, id: &str) -> Result<(), ApiError> {
        self.send_empty(RequestDescriptor::delete(service_path(id))).await
    }

    // ===== Pricing =====

    pub async fn pricing_for_service(&self, service_id: &str) -> Result<Vec<Pricing>, ApiError> {
        let listing: Listing<Pricing> = self
            .send_json(RequestDescriptor::get(service_pricing_path(service_id)))
            .await?;
        Ok(listing.into_vec())
    }

    pub async fn create_pricing(&self, service_id: &str, draft: &PricingDraft) -> Result<Pricing, ApiError> {
        self.send_json(RequestDescriptor::post(service_pricing_path(service_id)).json(draft)?)
            .await
    }

    pub async fn update_pricing(&self, id: &str, draft: &PricingDraft) -> Result<Pricing, ApiError> {
        self.send_json(RequestDescriptor::put(pricing_path(id)).json(draft)?)
            .await
    }

    pub async fn delete_pricing(&self, id: &str) -> Result<(), ApiError> {
        self.send_empty(RequestDescriptor::delete(pricing_path(id))).await
    }

    // ===== Bookings =====

    pub async fn bookings(&self) -> Result<Vec<Booking>, ApiError> {
        let listing: Listing<Booking> = self.send_json(RequestDescriptor::get(BOOKINGS_PATH)).await?;
        Ok(listing.into_vec())
    }

    pub async fn update_booking_status(&self, id: &str, status: BookingStatus) -> Result<Booking, ApiError> {
        let body = BookingStatusUpdate { status };
        self.send_json(RequestDescriptor::patch(booking_path(id)).json(&body)?)
            .await
    }
}

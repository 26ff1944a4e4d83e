//! Session client for the marketplace REST API.
//!
//! `SessionClient::send` attaches the stored access token as a bearer
//! header. When a request comes back 401 it gets exactly one recovery
//! attempt: the refresh token is exchanged for a new access token and the
//! request is replayed once. If the refresh itself fails, both tokens are
//! purged and the session expiry hook runs.
//!
//! Requests to the login and registration endpoints never trigger a
//! refresh; a 401 there means the submitted credentials were wrong.

use std::sync::Arc;

use reqwest::header::{HeaderMap, HeaderName, HeaderValue, AUTHORIZATION};
use reqwest::Client;
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::auth::{CredentialStore, SessionExpiryHandler, SessionState};
use crate::config::SessionConfig;
use crate::models::{LoginRequest, LoginResponse, RegistrationRequest, RegistrationResult, UserProfile};

use super::{ApiError, ApiResponse, RequestDescriptor};

// ============================================================================
// Constants
// ============================================================================

/// Exchanges a refresh token for a new access token
pub const REFRESH_PATH: &str = "/api/auth/token/refresh/";

pub const LOGIN_PATH: &str = "/api/users/login/";

pub const REGISTER_PATH: &str = "/api/users/register/";

/// Any request whose path contains one of these is exempt from refresh
const CREDENTIAL_ENDPOINT_MARKERS: [&str; 2] = ["/login", "/register"];

#[derive(Debug, Serialize)]
struct RefreshRequest<'a> {
    refresh: &'a str,
}

#[derive(Debug, Deserialize)]
struct RefreshResponse {
    access: String,
}

/// Authenticated client for the marketplace API.
/// Clone is cheap - the HTTP pool, credential store and refresh guard are shared.
#[derive(Clone)]
pub struct SessionClient {
    client: Client,
    config: SessionConfig,
    store: Arc<dyn CredentialStore>,
    on_expired: Arc<dyn SessionExpiryHandler>,
    refresh_guard: Arc<Mutex<()>>,
}

impl SessionClient {
    pub fn new(
        config: SessionConfig,
        store: Arc<dyn CredentialStore>,
        on_expired: Arc<dyn SessionExpiryHandler>,
    ) -> Result<Self, ApiError> {
        let client = Client::builder().timeout(config.timeout).build()?;

        Ok(Self {
            client,
            config,
            store,
            on_expired,
            refresh_guard: Arc::new(Mutex::new(())),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.config.base_url
    }

    pub fn credentials(&self) -> &Arc<dyn CredentialStore> {
        &self.store
    }

    pub fn session_state(&self) -> Result<SessionState, ApiError> {
        Ok(SessionState::from_store(self.store.as_ref())?)
    }

    /// Whether an access token is stored. A store that cannot be read
    /// counts as logged out.
    pub fn is_authenticated(&self) -> bool {
        match self.session_state() {
            Ok(state) => state.is_authenticated(),
            Err(e) => {
                warn!(error = %e, "Could not read credential store");
                false
            }
        }
    }

    // ===== Request Pipeline =====

    /// Send a request, recovering once from an expired access token.
    ///
    /// The upstream response is returned as-is on success. Any non-2xx
    /// status becomes an `ApiError`; only a 401 is ever retried, and only
    /// once per descriptor.
    pub async fn send(&self, request: &mut RequestDescriptor) -> Result<ApiResponse, ApiError> {
        let sent_with = self.store.access_token()?;
        if let Some(ref token) = sent_with {
            Self::attach_bearer(request, token);
        }

        let error = match self.transmit(request).await {
            Ok(response) => return Ok(response),
            Err(error) => error,
        };

        if !error.is_auth_failure() || request.retried || self.is_credential_endpoint(request) {
            return Err(error);
        }
        if self.store.refresh_token()?.is_none() {
            debug!(path = %request.path, "401 without a refresh token, not retrying");
            return Err(error);
        }

        request.retried = true;
        debug!(path = %request.path, error = %error, "Access token rejected, refreshing");

        let access = match self.renew_access_token(sent_with.as_deref()).await? {
            Some(access) => access,
            // Another caller already purged the session
            None => return Err(error),
        };

        Self::attach_bearer(request, &access);
        debug!(method = %request.method, path = %request.path, "Replaying request with new token");
        self.transmit(request).await
    }

    /// Send and decode a JSON response body
    pub async fn send_json<T: DeserializeOwned>(
        &self,
        mut request: RequestDescriptor,
    ) -> Result<T, ApiError> {
        let path = request.path.clone();
        let response = self.send(&mut request).await?;
        response.json().map_err(|e| match e {
            ApiError::InvalidResponse(msg) => {
                ApiError::InvalidResponse(format!("{} (from {})", msg, path))
            }
            other => other,
        })
    }

    /// Send, discarding any response body
    pub async fn send_empty(&self, mut request: RequestDescriptor) -> Result<(), ApiError> {
        self.send(&mut request).await.map(|_| ())
    }

    fn attach_bearer(request: &mut RequestDescriptor, token: &str) {
        request
            .headers
            .retain(|name, _| !name.eq_ignore_ascii_case(AUTHORIZATION.as_str()));
        request
            .headers
            .insert(AUTHORIZATION.as_str().to_string(), format!("Bearer {}", token));
    }

    fn is_credential_endpoint(&self, request: &RequestDescriptor) -> bool {
        CREDENTIAL_ENDPOINT_MARKERS
            .iter()
            .any(|marker| request.targets(marker))
    }

    fn url(&self, path: &str) -> String {
        if path.starts_with('/') {
            format!("{}{}", self.config.base_url, path)
        } else {
            format!("{}/{}", self.config.base_url, path)
        }
    }

    fn header_map(request: &RequestDescriptor) -> Result<HeaderMap, ApiError> {
        let mut headers = HeaderMap::with_capacity(request.headers.len());
        for (name, value) in &request.headers {
            let name = HeaderName::from_bytes(name.as_bytes())
                .map_err(|e| ApiError::InvalidRequest(format!("Bad header name {}: {}", name, e)))?;
            let value = HeaderValue::from_str(value)
                .map_err(|e| ApiError::InvalidRequest(format!("Bad value for header {}: {}", name, e)))?;
            headers.insert(name, value);
        }
        Ok(headers)
    }

    /// One network round-trip for the descriptor as it stands
    async fn transmit(&self, request: &RequestDescriptor) -> Result<ApiResponse, ApiError> {
        let mut builder = self
            .client
            .request(request.method.clone(), self.url(&request.path))
            .headers(Self::header_map(request)?);

        if !request.query.is_empty() {
            builder = builder.query(&request.query);
        }
        if let Some(ref body) = request.body {
            builder = builder.json(body);
        }

        debug!(method = %request.method, path = %request.path, retried = request.retried, "Sending request");
        let response = ApiResponse::read(builder.send().await?).await?;
        debug!(method = %request.method, path = %request.path, status = %response.status, "Response received");

        response.error_for_status()
    }

    // ===== Token Refresh =====

    /// Obtain a fresh access token after `stale` was rejected.
    ///
    /// Returns `Ok(None)` when no refresh token is stored any more. A failed
    /// refresh purges the session before its error is returned.
    async fn renew_access_token(&self, stale: Option<&str>) -> Result<Option<String>, ApiError> {
        let _guard = if self.config.coalesce_refresh {
            Some(self.refresh_guard.lock().await)
        } else {
            None
        };

        if self.config.coalesce_refresh {
            if let Some(current) = self.store.access_token()? {
                if stale != Some(current.as_str()) {
                    debug!("Access token already renewed by a concurrent request");
                    return Ok(Some(current));
                }
            }
        }

        let Some(refresh_token) = self.store.refresh_token()? else {
            return Ok(None);
        };

        match self.exchange_refresh_token(&refresh_token).await {
            Ok(access) => {
                debug!("Access token refreshed");
                Ok(Some(access))
            }
            Err(e) => {
                warn!(error = %e, "Token refresh failed, ending session");
                self.expire_session();
                Err(e)
            }
        }
    }

    /// Call the refresh endpoint and persist the new access token.
    /// The refresh token itself is kept as-is.
    async fn exchange_refresh_token(&self, refresh_token: &str) -> Result<String, ApiError> {
        let response = self
            .client
            .post(self.url(REFRESH_PATH))
            .json(&RefreshRequest {
                refresh: refresh_token,
            })
            .send()
            .await?;
        let response = ApiResponse::read(response).await?.error_for_status()?;

        let RefreshResponse { access } = response.json()?;
        self.store.set_access_token(&access)?;
        Ok(access)
    }

    fn expire_session(&self) {
        if let Err(e) = self.store.clear() {
            warn!(error = %e, "Failed to clear stored tokens");
        }
        if self.on_expired.in_registration_flow() {
            debug!("Session expired during registration, staying put");
        } else {
            self.on_expired.on_session_expired();
        }
    }

    // ===== Credential Lifecycle =====

    /// Log in and store the returned token pair.
    pub async fn login(&self, email: &str, password: &str) -> Result<UserProfile, ApiError> {
        let mut request =
            RequestDescriptor::post(LOGIN_PATH).json(&LoginRequest { email, password })?;

        let response = self
            .send(&mut request)
            .await
            .map_err(ApiError::into_credential_rejection)?;

        let login: LoginResponse = response.json()?;
        self.store.store_pair(&login.tokens)?;
        info!(user_id = %login.user.id, "Logged in");
        Ok(login.user)
    }

    /// Create an account. Any stored session is cleared first, and no
    /// tokens are stored afterwards; call `login` to start a session.
    pub async fn register(
        &self,
        registration: &RegistrationRequest,
    ) -> Result<RegistrationResult, ApiError> {
        self.store.clear()?;

        let mut request = RequestDescriptor::post(REGISTER_PATH).json(registration)?;
        let response = self
            .send(&mut request)
            .await
            .map_err(ApiError::into_credential_rejection)?;

        let result = response.json()?;
        info!("Registration accepted");
        Ok(result)
    }

    /// Forget both tokens. Local only; the backend is not contacted.
    pub fn logout(&self) -> Result<(), ApiError> {
        self.store.clear()?;
        info!("Logged out");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use serde_json::json;
    use wiremock::matchers::{body_json, header, method, path};
    use wiremock::{Mock, MockServer, Request, ResponseTemplate};

    use super::*;
    use crate::auth::{CredentialPair, MemoryCredentialStore};

    #[derive(Default)]
    struct RecordingHandler {
        expired: AtomicUsize,
        registering: bool,
    }

    impl RecordingHandler {
        fn registering() -> Self {
            Self {
                expired: AtomicUsize::new(0),
                registering: true,
            }
        }

        fn expired_count(&self) -> usize {
            self.expired.load(Ordering::SeqCst)
        }
    }

    impl SessionExpiryHandler for RecordingHandler {
        fn on_session_expired(&self) {
            self.expired.fetch_add(1, Ordering::SeqCst);
        }

        fn in_registration_flow(&self) -> bool {
            self.registering
        }
    }

    struct Harness {
        server: MockServer,
        store: Arc<MemoryCredentialStore>,
        handler: Arc<RecordingHandler>,
        client: SessionClient,
    }

    async fn harness_with(store: MemoryCredentialStore, handler: RecordingHandler, coalesce: bool) -> Harness {
        let server = MockServer::start().await;
        let store = Arc::new(store);
        let handler = Arc::new(handler);
        let config = SessionConfig::new(server.uri()).with_coalesce_refresh(coalesce);
        let client = SessionClient::new(config, store.clone(), handler.clone())
            .expect("client creation");
        Harness {
            server,
            store,
            handler,
            client,
        }
    }

    async fn logged_in_harness() -> Harness {
        harness_with(
            MemoryCredentialStore::with_pair(&CredentialPair::new("A1", "R1")),
            RecordingHandler::default(),
            true,
        )
        .await
    }

    async fn mount_refresh(server: &MockServer, response: ResponseTemplate, times: u64) {
        Mock::given(method("POST"))
            .and(path(REFRESH_PATH))
            .respond_with(response)
            .expect(times)
            .mount(server)
            .await;
    }

    #[tokio::test]
    async fn test_attaches_bearer_token_when_stored() {
        let h = logged_in_harness().await;
        Mock::given(method("GET"))
            .and(path("/api/users/profile/"))
            .and(header("authorization", "Bearer A1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"id": 1})))
            .expect(1)
            .mount(&h.server)
            .await;

        let mut request = RequestDescriptor::get("/api/users/profile/");
        let response = h.client.send(&mut request).await.expect("request succeeds");
        assert!(response.is_success());
        assert!(!request.retried);
    }

    #[tokio::test]
    async fn test_sends_no_authorization_without_token() {
        let h = harness_with(MemoryCredentialStore::new(), RecordingHandler::default(), true).await;
        Mock::given(method("GET"))
            .and(path("/api/search/"))
            .and(|req: &Request| !req.headers.contains_key("authorization"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
            .expect(1)
            .mount(&h.server)
            .await;

        let mut request = RequestDescriptor::get("/api/search/");
        assert!(h.client.send(&mut request).await.is_ok());
    }

    #[tokio::test]
    async fn test_non_auth_errors_are_not_retried() {
        let h = logged_in_harness().await;
        Mock::given(method("GET"))
            .and(path("/api/providers/bookings/"))
            .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
            .expect(1)
            .mount(&h.server)
            .await;
        Mock::given(method("GET"))
            .and(path("/api/providers/services/"))
            .respond_with(ResponseTemplate::new(403).set_body_string("forbidden"))
            .expect(1)
            .mount(&h.server)
            .await;
        mount_refresh(&h.server, ResponseTemplate::new(200).set_body_json(json!({"access": "A2"})), 0).await;

        let mut bookings = RequestDescriptor::get("/api/providers/bookings/");
        let err = h.client.send(&mut bookings).await.unwrap_err();
        assert!(matches!(err, ApiError::ServerError { .. }));
        assert_eq!(err.body(), Some("boom"));
        assert!(!bookings.retried);

        let mut services = RequestDescriptor::get("/api/providers/services/");
        let err = h.client.send(&mut services).await.unwrap_err();
        assert!(matches!(err, ApiError::AccessDenied { .. }));

        assert_eq!(h.store.access_token().unwrap().as_deref(), Some("A1"));
    }

    #[tokio::test]
    async fn test_expired_token_is_refreshed_and_request_replayed() {
        let h = logged_in_harness().await;
        Mock::given(method("GET"))
            .and(path("/api/providers/my/"))
            .and(header("authorization", "Bearer A1"))
            .respond_with(ResponseTemplate::new(401).set_body_json(json!({"code": "token_not_valid"})))
            .expect(1)
            .mount(&h.server)
            .await;
        Mock::given(method("GET"))
            .and(path("/api/providers/my/"))
            .and(header("authorization", "Bearer A2"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"id": 7})))
            .expect(1)
            .mount(&h.server)
            .await;
        Mock::given(method("POST"))
            .and(path(REFRESH_PATH))
            .and(body_json(json!({"refresh": "R1"})))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"access": "A2"})))
            .expect(1)
            .mount(&h.server)
            .await;

        let mut request = RequestDescriptor::get("/api/providers/my/");
        let response = h.client.send(&mut request).await.expect("replay succeeds");

        let body: serde_json::Value = response.json().unwrap();
        assert_eq!(body, json!({"id": 7}));
        assert!(request.retried);
        assert_eq!(h.store.access_token().unwrap().as_deref(), Some("A2"));
        assert_eq!(h.store.refresh_token().unwrap().as_deref(), Some("R1"));
        assert_eq!(h.handler.expired_count(), 0);
    }

    #[tokio::test]
    async fn test_replay_failure_is_returned_without_looping() {
        let h = logged_in_harness().await;
        Mock::given(method("GET"))
            .and(path("/api/providers/bookings/"))
            .respond_with(ResponseTemplate::new(401))
            .expect(2)
            .mount(&h.server)
            .await;
        mount_refresh(&h.server, ResponseTemplate::new(200).set_body_json(json!({"access": "A2"})), 1).await;

        let mut request = RequestDescriptor::get("/api/providers/bookings/");
        let err = h.client.send(&mut request).await.unwrap_err();

        assert!(matches!(err, ApiError::Unauthorized { .. }));
        assert_eq!(h.store.access_token().unwrap().as_deref(), Some("A2"));
        assert_eq!(h.store.refresh_token().unwrap().as_deref(), Some("R1"));
        assert_eq!(h.handler.expired_count(), 0);
    }

    #[tokio::test]
    async fn test_already_retried_request_is_not_refreshed_again() {
        let h = logged_in_harness().await;
        Mock::given(method("GET"))
            .and(path("/api/users/profile/"))
            .respond_with(ResponseTemplate::new(401))
            .expect(1)
            .mount(&h.server)
            .await;
        mount_refresh(&h.server, ResponseTemplate::new(200).set_body_json(json!({"access": "A2"})), 0).await;

        let mut request = RequestDescriptor::get("/api/users/profile/");
        request.retried = true;
        let err = h.client.send(&mut request).await.unwrap_err();
        assert!(err.is_auth_failure());
    }

    #[tokio::test]
    async fn test_missing_refresh_token_surfaces_original_401() {
        let store = MemoryCredentialStore::new();
        store.set_access_token("A1").unwrap();
        let h = harness_with(store, RecordingHandler::default(), true).await;
        Mock::given(method("GET"))
            .and(path("/api/users/profile/"))
            .respond_with(ResponseTemplate::new(401).set_body_string("original"))
            .expect(1)
            .mount(&h.server)
            .await;
        mount_refresh(&h.server, ResponseTemplate::new(200).set_body_json(json!({"access": "A2"})), 0).await;

        let mut request = RequestDescriptor::get("/api/users/profile/");
        let err = h.client.send(&mut request).await.unwrap_err();
        assert_eq!(err.body(), Some("original"));
        assert!(!request.retried);
        assert_eq!(h.store.access_token().unwrap().as_deref(), Some("A1"));
    }

    #[tokio::test]
    async fn test_refresh_failure_purges_session_and_notifies() {
        let h = logged_in_harness().await;
        Mock::given(method("GET"))
            .and(path("/api/providers/bookings/"))
            .respond_with(ResponseTemplate::new(401).set_body_string("expired access"))
            .expect(1)
            .mount(&h.server)
            .await;
        mount_refresh(
            &h.server,
            ResponseTemplate::new(401).set_body_json(json!({"code": "token_not_valid"})),
            1,
        )
        .await;

        let mut request = RequestDescriptor::get("/api/providers/bookings/");
        let err = h.client.send(&mut request).await.unwrap_err();

        // The refresh failure is what the caller sees
        assert!(err.is_auth_failure());
        assert_eq!(err.payload().unwrap()["code"], "token_not_valid");
        assert_eq!(h.store.access_token().unwrap(), None);
        assert_eq!(h.store.refresh_token().unwrap(), None);
        assert_eq!(h.handler.expired_count(), 1);
        assert!(!h.client.is_authenticated());
    }

    #[tokio::test]
    async fn test_malformed_refresh_response_counts_as_failure() {
        let h = logged_in_harness().await;
        Mock::given(method("GET"))
            .and(path("/api/users/profile/"))
            .respond_with(ResponseTemplate::new(401))
            .expect(1)
            .mount(&h.server)
            .await;
        mount_refresh(&h.server, ResponseTemplate::new(200).set_body_json(json!({"token": "?"})), 1).await;

        let mut request = RequestDescriptor::get("/api/users/profile/");
        let err = h.client.send(&mut request).await.unwrap_err();
        assert!(matches!(err, ApiError::InvalidResponse(_)));
        assert_eq!(h.store.refresh_token().unwrap(), None);
        assert_eq!(h.handler.expired_count(), 1);
    }

    #[tokio::test]
    async fn test_refresh_failure_during_registration_skips_redirect() {
        let h = harness_with(
            MemoryCredentialStore::with_pair(&CredentialPair::new("A1", "R1")),
            RecordingHandler::registering(),
            true,
        )
        .await;
        Mock::given(method("GET"))
            .and(path("/api/users/profile/"))
            .respond_with(ResponseTemplate::new(401))
            .mount(&h.server)
            .await;
        mount_refresh(&h.server, ResponseTemplate::new(401), 1).await;

        let mut request = RequestDescriptor::get("/api/users/profile/");
        assert!(h.client.send(&mut request).await.is_err());
        assert_eq!(h.store.access_token().unwrap(), None);
        assert_eq!(h.handler.expired_count(), 0);
    }

    #[tokio::test]
    async fn test_login_401_never_refreshes() {
        let h = logged_in_harness().await;
        Mock::given(method("POST"))
            .and(path(LOGIN_PATH))
            .respond_with(ResponseTemplate::new(401).set_body_json(json!({"error": "Invalid credentials."})))
            .expect(1)
            .mount(&h.server)
            .await;
        mount_refresh(&h.server, ResponseTemplate::new(200).set_body_json(json!({"access": "A2"})), 0).await;

        let err = h.client.login("asha@example.com", "wrong").await.unwrap_err();

        assert!(matches!(err, ApiError::CredentialRejected { .. }));
        assert_eq!(err.payload().unwrap()["error"], "Invalid credentials.");
        // Failed login leaves whatever was stored untouched
        assert_eq!(h.store.access_token().unwrap().as_deref(), Some("A1"));
        assert_eq!(h.handler.expired_count(), 0);
    }

    #[tokio::test]
    async fn test_register_401_never_refreshes() {
        let h = logged_in_harness().await;
        Mock::given(method("POST"))
            .and(path(REGISTER_PATH))
            .respond_with(ResponseTemplate::new(401))
            .expect(1)
            .mount(&h.server)
            .await;
        mount_refresh(&h.server, ResponseTemplate::new(200).set_body_json(json!({"access": "A2"})), 0).await;

        let err = h
            .client
            .register(&RegistrationRequest::default())
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::CredentialRejected { .. }));
    }

    #[tokio::test]
    async fn test_login_stores_both_tokens() {
        let h = harness_with(MemoryCredentialStore::new(), RecordingHandler::default(), true).await;
        Mock::given(method("POST"))
            .and(path(LOGIN_PATH))
            .and(body_json(json!({"email": "asha@example.com", "password": "s3cret!"})))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "user": {"id": 12, "email": "asha@example.com", "first_name": "Asha",
                         "last_name": "Rao", "user_type": "parent"},
                "tokens": {"access": "A1", "refresh": "R1"}
            })))
            .expect(1)
            .mount(&h.server)
            .await;

        let user = h.client.login("asha@example.com", "s3cret!").await.expect("login");

        assert_eq!(user.email, "asha@example.com");
        assert_eq!(h.store.access_token().unwrap().as_deref(), Some("A1"));
        assert_eq!(h.store.refresh_token().unwrap().as_deref(), Some("R1"));
        assert!(h.client.is_authenticated());
    }

    #[tokio::test]
    async fn test_register_clears_session_before_request() {
        let h = logged_in_harness().await;
        Mock::given(method("POST"))
            .and(path(REGISTER_PATH))
            .and(|req: &Request| !req.headers.contains_key("authorization"))
            .respond_with(ResponseTemplate::new(201).set_body_json(json!({
                "user": {"id": 3, "email": "new@example.com"},
                "message": "User registered successfully. Please login to continue."
            })))
            .expect(1)
            .mount(&h.server)
            .await;

        let registration = RegistrationRequest {
            email: "new@example.com".to_string(),
            password: "pw".to_string(),
            password_confirm: "pw".to_string(),
            ..Default::default()
        };
        let result = h.client.register(&registration).await.expect("register");

        assert!(result.message.is_some());
        assert_eq!(h.store.access_token().unwrap(), None);
        assert_eq!(h.store.refresh_token().unwrap(), None);
    }

    #[tokio::test]
    async fn test_logout_is_local_and_unconditional() {
        let h = logged_in_harness().await;

        h.client.logout().expect("logout");
        assert_eq!(h.store.access_token().unwrap(), None);
        assert_eq!(h.store.refresh_token().unwrap(), None);

        // Second logout with nothing stored still succeeds
        h.client.logout().expect("logout again");

        let requests = h.server.received_requests().await.unwrap_or_default();
        assert!(requests.is_empty());
    }

    async fn mount_concurrent_scenario(server: &MockServer, refreshes: u64) {
        Mock::given(method("GET"))
            .and(path("/api/providers/bookings/"))
            .and(header("authorization", "Bearer A1"))
            .respond_with(ResponseTemplate::new(401))
            .expect(2)
            .mount(server)
            .await;
        Mock::given(method("GET"))
            .and(path("/api/providers/bookings/"))
            .and(header("authorization", "Bearer A2"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
            .expect(2)
            .mount(server)
            .await;
        mount_refresh(server, ResponseTemplate::new(200).set_body_json(json!({"access": "A2"})), refreshes).await;
    }

    #[tokio::test]
    async fn test_concurrent_401s_share_one_refresh() {
        let h = logged_in_harness().await;
        mount_concurrent_scenario(&h.server, 1).await;

        let mut first = RequestDescriptor::get("/api/providers/bookings/");
        let mut second = RequestDescriptor::get("/api/providers/bookings/");
        let (a, b) = futures::join!(h.client.send(&mut first), h.client.send(&mut second));

        assert!(a.is_ok());
        assert!(b.is_ok());
        assert!(first.retried && second.retried);
    }

    #[tokio::test]
    async fn test_concurrent_401s_refresh_independently_without_coalescing() {
        let h = harness_with(
            MemoryCredentialStore::with_pair(&CredentialPair::new("A1", "R1")),
            RecordingHandler::default(),
            false,
        )
        .await;
        mount_concurrent_scenario(&h.server, 2).await;

        let mut first = RequestDescriptor::get("/api/providers/bookings/");
        let mut second = RequestDescriptor::get("/api/providers/bookings/");
        let (a, b) = futures::join!(h.client.send(&mut first), h.client.send(&mut second));

        assert!(a.is_ok());
        assert!(b.is_ok());
    }
}

use std::sync::Arc;

use tracing::{debug, info, warn};

use super::CredentialStore;
use crate::api::{
    ApiError, RequestPipeline, SessionExpiryHandler, TokenSource, UnauthorizedPolicy, LOGIN_PATH,
};
use crate::config::Config;
use crate::models::{AuthResponse, LoginRequest, RegisterRequest, UserInfo};
use crate::routes::{guard, Navigator, Route};

pub const REGISTER_PATH: &str = "/auth/register";

/// Current identity of the bearer of the session token
pub const ME_PATH: &str = "/auth/me";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Anonymous,
    Authenticated,
}

/// Tears the session down when the server rejects the token.
pub struct SessionExpiry {
    store: Arc<CredentialStore>,
    navigator: Arc<dyn Navigator>,
}

impl SessionExpiry {
    pub fn new(store: Arc<CredentialStore>, navigator: Arc<dyn Navigator>) -> Self {
        Self { store, navigator }
    }
}

impl SessionExpiryHandler for SessionExpiry {
    fn session_expired(&self) {
        self.store.clear();
        self.navigator.navigate(Route::Login);
    }
}

/// Build the dashboard-mode pipeline: token read from the store on every
/// call, forced logout on a 401 outside the login endpoint.
pub fn dashboard_pipeline(
    config: &Config,
    store: Arc<CredentialStore>,
    navigator: Arc<dyn Navigator>,
) -> Result<RequestPipeline, ApiError> {
    let expiry = SessionExpiry::new(store.clone(), navigator);
    RequestPipeline::builder(config.api_base_url(), TokenSource::Dynamic(store))
        .timeout(config.request_timeout())
        .rate_limit_retries(config.rate_limit_retries)
        .on_unauthorized(UnauthorizedPolicy::ForceLogout(Arc::new(expiry)))
        .build()
}

/// Drives login, registration and logout against the credential store.
///
/// Errors from the pipeline are handed back unchanged; a failed call never
/// touches the store.
pub struct SessionController {
    pipeline: RequestPipeline,
    store: Arc<CredentialStore>,
    navigator: Arc<dyn Navigator>,
}

impl SessionController {
    pub fn new(
        pipeline: RequestPipeline,
        store: Arc<CredentialStore>,
        navigator: Arc<dyn Navigator>,
    ) -> Self {
        Self {
            pipeline,
            store,
            navigator,
        }
    }

    pub fn from_config(
        config: &Config,
        store: Arc<CredentialStore>,
        navigator: Arc<dyn Navigator>,
    ) -> Result<Self, ApiError> {
        let pipeline = dashboard_pipeline(config, store.clone(), navigator.clone())?;
        Ok(Self::new(pipeline, store, navigator))
    }

    pub fn state(&self) -> SessionState {
        if self.store.is_authenticated() {
            SessionState::Authenticated
        } else {
            SessionState::Anonymous
        }
    }

    pub fn is_authenticated(&self) -> bool {
        self.state() == SessionState::Authenticated
    }

    pub fn store(&self) -> &Arc<CredentialStore> {
        &self.store
    }

    /// The dashboard pipeline, for calls beyond the session endpoints
    pub fn pipeline(&self) -> &RequestPipeline {
        &self.pipeline
    }

    pub async fn login(&self, username: &str, password: &str) -> Result<UserInfo, ApiError> {
        let auth: AuthResponse = self
            .pipeline
            .post(LOGIN_PATH, &LoginRequest { username, password })
            .await
            .inspect_err(|e| warn!(error = %e, "Login failed"))?;
        info!(username = username, "Login successful");
        Ok(self.establish(auth))
    }

    pub async fn register(
        &self,
        username: &str,
        password: &str,
        email: &str,
    ) -> Result<UserInfo, ApiError> {
        let auth: AuthResponse = self
            .pipeline
            .post(REGISTER_PATH, &RegisterRequest { username, password, email })
            .await
            .inspect_err(|e| warn!(error = %e, "Registration failed"))?;
        info!(username = username, "Registration successful");
        Ok(self.establish(auth))
    }

    fn establish(&self, auth: AuthResponse) -> UserInfo {
        let user = auth.user.clone();
        self.store.set(auth.token, auth.user);
        self.navigator.navigate(Route::Dashboard);
        user
    }

    /// End the session locally. The server is not contacted.
    pub fn logout(&self) {
        self.store.clear();
        info!("Logged out");
        self.navigator.navigate(Route::Login);
    }

    /// Re-fetch the identity snapshot for the current token.
    pub async fn refresh_user(&self) -> Result<UserInfo, ApiError> {
        let token = self.store.token();
        if token.is_empty() {
            return Err(ApiError::Validation("not logged in".to_string()));
        }

        let user: UserInfo = self.pipeline.get(ME_PATH).await?;
        if !self.store.replace_user_if(&token, user.clone()) {
            debug!("Session changed during identity refresh, discarding result");
        }
        Ok(user)
    }

    /// Navigate through the route guard; returns where we ended up.
    pub fn navigate(&self, target: Route) -> Route {
        let destination = guard(target, self.is_authenticated()).destination(target);
        self.navigator.navigate(destination);
        destination
    }
}

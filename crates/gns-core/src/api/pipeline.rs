//! Request pipeline shared by the dashboard session and the notification SDK.
//!
//! A pipeline is bound to one base URL. On every call it attaches the bearer
//! token from its [`TokenSource`], unwraps the response body on 2xx and
//! classifies everything else into an [`ApiError`]. The only behavioral
//! difference between the dashboard and SDK instances is the token source
//! and the [`UnauthorizedPolicy`].

use std::sync::Arc;
use std::time::Duration;

use reqwest::{Client, Method, StatusCode};
use serde::{de::DeserializeOwned, Serialize};
use serde_json::Value;
use tracing::{debug, warn};

use super::ApiError;

/// Login endpoint path. A 401 from this path never forces a logout.
pub const LOGIN_PATH: &str = "/auth/login";

/// Default request timeout for dashboard calls
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(5);

/// Initial backoff delay in milliseconds for rate limiting.
const INITIAL_BACKOFF_MS: u64 = 1000;

/// Supplies the current bearer token, read fresh on every call.
pub trait TokenProvider: Send + Sync {
    fn token(&self) -> Option<String>;
}

/// Reacts to a server-side session expiry (a 401 on an authenticated call).
pub trait SessionExpiryHandler: Send + Sync {
    fn session_expired(&self);
}

/// Where the pipeline gets its bearer token from
#[derive(Clone)]
pub enum TokenSource {
    /// Read from a provider (the credential store) on every request
    Dynamic(Arc<dyn TokenProvider>),
    /// Fixed at construction time
    Fixed(String),
}

impl TokenSource {
    fn current(&self) -> Option<String> {
        match self {
            TokenSource::Dynamic(provider) => provider.token(),
            TokenSource::Fixed(token) => Some(token.clone()),
        }
        .filter(|t| !t.is_empty())
    }
}

/// What happens, besides returning the error, when a call gets a 401
#[derive(Clone)]
pub enum UnauthorizedPolicy {
    ForceLogout(Arc<dyn SessionExpiryHandler>),
    Ignore,
}

pub struct PipelineBuilder {
    base_url: String,
    tokens: TokenSource,
    timeout: Duration,
    on_unauthorized: UnauthorizedPolicy,
    rate_limit_retries: u32,
}

impl PipelineBuilder {
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn on_unauthorized(mut self, policy: UnauthorizedPolicy) -> Self {
        self.on_unauthorized = policy;
        self
    }

    /// Retry 429 responses up to `retries` times with exponential backoff.
    pub fn rate_limit_retries(mut self, retries: u32) -> Self {
        self.rate_limit_retries = retries;
        self
    }

    pub fn build(self) -> Result<RequestPipeline, ApiError> {
        let client = Client::builder().timeout(self.timeout).build()?;

        Ok(RequestPipeline {
            client,
            base_url: self.base_url.trim_end_matches('/').to_string(),
            tokens: self.tokens,
            on_unauthorized: self.on_unauthorized,
            rate_limit_retries: self.rate_limit_retries,
        })
    }
}

/// Clone is cheap - reqwest::Client uses Arc internally for connection pooling.
#[derive(Clone)]
pub struct RequestPipeline {
    client: Client,
    base_url: String,
    tokens: TokenSource,
    on_unauthorized: UnauthorizedPolicy,
    rate_limit_retries: u32,
}

impl RequestPipeline {
    pub fn builder(base_url: impl Into<String>, tokens: TokenSource) -> PipelineBuilder {
        PipelineBuilder {
            base_url: base_url.into(),
            tokens,
            timeout: DEFAULT_TIMEOUT,
            on_unauthorized: UnauthorizedPolicy::Ignore,
            rate_limit_retries: 0,
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        if path.starts_with('/') {
            format!("{}{}", self.base_url, path)
        } else {
            format!("{}/{}", self.base_url, path)
        }
    }

    pub async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T, ApiError> {
        let value = self.send_json(Method::GET, path, None::<&()>).await?;
        Self::decode(path, value)
    }

    pub async fn post<T, B>(&self, path: &str, body: &B) -> Result<T, ApiError>
    where
        T: DeserializeOwned,
        B: Serialize + ?Sized,
    {
        let value = self.send_json(Method::POST, path, Some(body)).await?;
        Self::decode(path, value)
    }

    /// Dispatch one call and return the unwrapped response body.
    ///
    /// Empty bodies decode to `null`; bodies that aren't JSON come back as a
    /// JSON string of the raw text.
    pub async fn send_json<B>(
        &self,
        method: Method,
        path: &str,
        body: Option<&B>,
    ) -> Result<Value, ApiError>
    where
        B: Serialize + ?Sized,
    {
        let url = self.url(path);
        let mut retries = 0;
        let mut backoff_ms = INITIAL_BACKOFF_MS;

        loop {
            let mut request = self.client.request(method.clone(), &url);
            if let Some(token) = self.tokens.current() {
                request = request.bearer_auth(token);
            }
            if let Some(body) = body {
                request = request.json(body);
            }

            let response = request.send().await?;
            let status = response.status();
            debug!(method = %method, path = path, status = status.as_u16(), "API response");

            if status == StatusCode::TOO_MANY_REQUESTS && retries < self.rate_limit_retries {
                retries += 1;
                warn!(path = path, retry = retries, backoff_ms = backoff_ms, "Rate limited, backing off");
                tokio::time::sleep(Duration::from_millis(backoff_ms)).await;
                backoff_ms *= 2;
                continue;
            }

            let text = response.text().await?;

            if status.is_success() {
                return Ok(Self::unwrap_body(&text));
            }

            let error = ApiError::from_response(status, &text);
            if status == StatusCode::UNAUTHORIZED {
                self.handle_unauthorized(path);
            }
            return Err(error);
        }
    }

    fn handle_unauthorized(&self, path: &str) {
        if path.contains(LOGIN_PATH) {
            return;
        }
        if let UnauthorizedPolicy::ForceLogout(ref handler) = self.on_unauthorized {
            warn!(path = path, "Session rejected by server, forcing logout");
            handler.session_expired();
        }
    }

    fn unwrap_body(text: &str) -> Value {
        if text.trim().is_empty() {
            return Value::Null;
        }
        serde_json::from_str(text).unwrap_or_else(|_| Value::String(text.to_string()))
    }

    fn decode<T: DeserializeOwned>(path: &str, value: Value) -> Result<T, ApiError> {
        serde_json::from_value(value)
            .map_err(|e| ApiError::InvalidResponse(format!("{}: {}", path, e)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct StaticToken(Option<String>);

    impl TokenProvider for StaticToken {
        fn token(&self) -> Option<String> {
            self.0.clone()
        }
    }

    #[test]
    fn test_token_source_skips_empty_tokens() {
        assert_eq!(TokenSource::Fixed(String::new()).current(), None);
        assert_eq!(TokenSource::Fixed("abc".into()).current().as_deref(), Some("abc"));

        let empty = TokenSource::Dynamic(Arc::new(StaticToken(Some(String::new()))));
        assert_eq!(empty.current(), None);
        let missing = TokenSource::Dynamic(Arc::new(StaticToken(None)));
        assert_eq!(missing.current(), None);
        let present = TokenSource::Dynamic(Arc::new(StaticToken(Some("t".into()))));
        assert_eq!(present.current().as_deref(), Some("t"));
    }

    #[test]
    fn test_url_join() {
        let pipeline = RequestPipeline::builder("http://localhost:8080/api/v1/", TokenSource::Fixed("t".into()))
            .build()
            .expect("build pipeline");
        assert_eq!(pipeline.base_url(), "http://localhost:8080/api/v1");
        assert_eq!(pipeline.url("/auth/login"), "http://localhost:8080/api/v1/auth/login");
        assert_eq!(pipeline.url("auth/me"), "http://localhost:8080/api/v1/auth/me");
    }

    #[test]
    fn test_unwrap_body() {
        assert_eq!(RequestPipeline::unwrap_body(""), Value::Null);
        assert_eq!(RequestPipeline::unwrap_body("  \n"), Value::Null);
        assert_eq!(
            RequestPipeline::unwrap_body(r#"{"status":"queued"}"#),
            serde_json::json!({"status": "queued"})
        );
        assert_eq!(RequestPipeline::unwrap_body("OK"), Value::String("OK".into()));
    }

    #[test]
    fn test_decode_failure_is_invalid_response() {
        let err = RequestPipeline::decode::<Vec<String>>("/auth/me", serde_json::json!({"id": 1}))
            .unwrap_err();
        assert!(matches!(err, ApiError::InvalidResponse(ref msg) if msg.starts_with("/auth/me")));
    }
}

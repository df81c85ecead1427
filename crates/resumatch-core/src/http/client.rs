//! HTTP client for the matching backend.
//!
//! Every request goes through [`ApiClient::execute`], which attaches the
//! default `Authorization` header and runs the response-interception stage:
//! a 401 from any endpoint fires the `on_unauthorized` hook injected at
//! construction.

use std::sync::{Arc, RwLock};
use std::time::Duration;

use reqwest::header::{HeaderValue, AUTHORIZATION};
use reqwest::{Method, RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use url::Url;

use crate::error::{AuthError, CoreError, Result, TransportError};
use crate::session::{ListenerId, SessionManager};

/// Callback fired when the backend answers 401.
pub type UnauthorizedHook = Arc<dyn Fn() + Send + Sync>;

/// Shared default `Authorization` header.
///
/// The session manager writes it through a subscription (see
/// [`ApiClient::bind_session`]); requests only read it.
#[derive(Debug, Clone, Default)]
pub struct AuthHeader {
    value: Arc<RwLock<Option<HeaderValue>>>,
}

impl AuthHeader {
    /// Set `Bearer <token>`, or remove the header for `None`.
    pub fn set_token(&self, token: Option<&str>) {
        let header = token.and_then(|t| {
            let mut value = HeaderValue::from_str(&format!("Bearer {t}")).ok()?;
            value.set_sensitive(true);
            Some(value)
        });
        if token.is_some() && header.is_none() {
            tracing::warn!("token contains characters not allowed in a header; sending no credentials");
        }
        *self.value.write().unwrap_or_else(|e| e.into_inner()) = header;
    }

    pub fn value(&self) -> Option<HeaderValue> {
        self.value.read().unwrap_or_else(|e| e.into_inner()).clone()
    }

    pub fn is_set(&self) -> bool {
        self.value().is_some()
    }
}

#[derive(Clone)]
pub struct ApiClient {
    http: reqwest::Client,
    base_url: Url,
    auth: AuthHeader,
    on_unauthorized: Option<UnauthorizedHook>,
}

pub struct ApiClientBuilder {
    base_url: String,
    timeout: Duration,
    on_unauthorized: Option<UnauthorizedHook>,
}

impl ApiClientBuilder {
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn on_unauthorized<F>(mut self, hook: F) -> Self
    where
        F: Fn() + Send + Sync + 'static,
    {
        self.on_unauthorized = Some(Arc::new(hook));
        self
    }

    pub fn build(self) -> Result<ApiClient> {
        let base_url = parse_base_url(&self.base_url)?;
        let http = reqwest::Client::builder()
            .timeout(self.timeout)
            .user_agent(concat!("resumatch/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(ApiClient {
            http,
            base_url,
            auth: AuthHeader::default(),
            on_unauthorized: self.on_unauthorized,
        })
    }
}

fn parse_base_url(raw: &str) -> Result<Url> {
    let invalid = |message: String| {
        CoreError::Transport(TransportError::InvalidUrl {
            url: raw.to_string(),
            message,
        })
    };

    let mut url = Url::parse(raw.trim()).map_err(|e| invalid(e.to_string()))?;
    if url.cannot_be_a_base() {
        return Err(invalid("not a base URL".to_string()));
    }
    // `Url::join` replaces the last segment unless the path ends in '/'.
    if !url.path().ends_with('/') {
        let path = format!("{}/", url.path());
        url.set_path(&path);
    }
    Ok(url)
}

impl ApiClient {
    pub fn builder(base_url: impl Into<String>) -> ApiClientBuilder {
        ApiClientBuilder {
            base_url: base_url.into(),
            timeout: Duration::from_secs(30),
            on_unauthorized: None,
        }
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    pub fn auth_header(&self) -> &AuthHeader {
        &self.auth
    }

    /// Keep the default header in step with `sessions`.
    pub fn bind_session(&self, sessions: &SessionManager) -> ListenerId {
        let header = self.auth.clone();
        sessions.subscribe(move |session| header.set_token(session.map(|s| s.token.as_str())))
    }

    pub fn endpoint(&self, path: &str) -> Result<Url> {
        self.base_url
            .join(path.trim_start_matches('/'))
            .map_err(|e| {
                CoreError::Transport(TransportError::InvalidUrl {
                    url: format!("{}{}", self.base_url, path),
                    message: e.to_string(),
                })
            })
    }

    /// Start a request to `path` relative to the base URL.
    pub fn request(&self, method: Method, path: &str) -> Result<RequestBuilder> {
        Ok(self.http.request(method, self.endpoint(path)?))
    }

    /// Send `request` with the default header and intercept 401s.
    ///
    /// Returns the response whatever its status; only transport failures
    /// are errors here.
    pub async fn execute(&self, request: RequestBuilder) -> Result<Response> {
        let request = match self.auth.value() {
            Some(value) => request.header(AUTHORIZATION, value),
            None => request,
        };
        let request = request.build()?;
        let method = request.method().clone();
        let path = request.url().path().to_string();

        let response = self.http.execute(request).await.map_err(|e| {
            tracing::debug!(%method, %path, error = %e, "request failed");
            TransportError::Request(e)
        })?;

        tracing::debug!(%method, %path, status = response.status().as_u16(), "response");
        if response.status() == StatusCode::UNAUTHORIZED {
            tracing::warn!(%path, "backend rejected credentials");
            if let Some(hook) = &self.on_unauthorized {
                hook();
            }
        }
        Ok(response)
    }

    /// Execute and fail on any non-success status.
    pub async fn send(&self, request: RequestBuilder) -> Result<Response> {
        let response = self.execute(request).await?;
        if response.status().is_success() {
            Ok(response)
        } else {
            Err(error_for_response(response).await)
        }
    }

    /// Execute, check the status and decode a JSON body.
    pub async fn send_json<T: DeserializeOwned>(&self, request: RequestBuilder) -> Result<T> {
        let response = self.send(request).await?;
        decode_json(response).await
    }
}

impl std::fmt::Debug for ApiClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiClient")
            .field("base_url", &self.base_url.as_str())
            .field("authenticated", &self.auth.is_set())
            .finish()
    }
}

pub(crate) async fn decode_json<T: DeserializeOwned>(response: Response) -> Result<T> {
    let bytes = response.bytes().await?;
    serde_json::from_slice(&bytes)
        .map_err(|e| CoreError::Transport(TransportError::Decode(e.to_string())))
}

/// Turn a non-success response into an error, keeping the backend's
/// `detail` message when there is one.
pub async fn error_for_response(response: Response) -> CoreError {
    let status = response.status();
    if status == StatusCode::UNAUTHORIZED {
        return AuthError::Unauthorized.into();
    }

    let body = response.text().await.unwrap_or_default();
    TransportError::Status {
        status: status.as_u16(),
        detail: detail_message(&body).unwrap_or_else(|| {
            status
                .canonical_reason()
                .unwrap_or("Request failed")
                .to_string()
        }),
    }
    .into()
}

/// Extract `detail` from an error body. FastAPI-style validation errors
/// carry a list of `{msg}` objects instead of a string.
pub fn detail_message(body: &str) -> Option<String> {
    let value: serde_json::Value = serde_json::from_str(body).ok()?;
    match value.get("detail")? {
        serde_json::Value::String(s) if !s.is_empty() => Some(s.clone()),
        serde_json::Value::Array(items) => {
            let msgs: Vec<&str> = items
                .iter()
                .filter_map(|item| item.get("msg").and_then(|m| m.as_str()))
                .collect();
            (!msgs.is_empty()).then(|| msgs.join("; "))
        }
        _ => None,
    }
}

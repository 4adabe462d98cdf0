//! HTTP transport for the hub REST surface

use std::time::Duration;

use http::{header, HeaderMap, HeaderValue, Method};
use reqwest::{Client, Request};
use secrecy::{ExposeSecret, SecretString};
use serde::{de::DeserializeOwned, Serialize};
use tracing::debug;
use url::Url;

use crate::errors::LeapError;
use crate::http::response::HubResponse;
use crate::http::API_VERSION;

/// Default per-request timeout
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Authenticated JSON client pinned to one hub base URL.
///
/// The underlying `reqwest::Client` keeps a connection pool and is cheap to
/// clone, so a single `HubClient` can be shared by sequential releases.
#[derive(Debug, Clone)]
pub struct HubClient {
    client: Client,
    base_url: Url,
    timeout: Duration,
}

impl HubClient {
    /// Create a new client for the given base URL.
    ///
    /// The base URL path must end with `/`; this is checked when building
    /// each request so relative paths always resolve below it.
    pub fn new(base_url: &str) -> Result<Self, LeapError> {
        Self::with_timeout(base_url, DEFAULT_TIMEOUT)
    }

    /// Create a new client with an explicit per-request timeout
    pub fn with_timeout(base_url: &str, timeout: Duration) -> Result<Self, LeapError> {
        let base_url = Url::parse(base_url)?;
        let client = build_client(timeout, HeaderMap::new())?;

        Ok(Self {
            client,
            base_url,
            timeout,
        })
    }

    /// Return a client that sends `Authorization: Bearer <token>` on every request.
    ///
    /// The header is installed as a client default, so it is also carried on
    /// redirects issued by the transport.
    pub fn with_auth_token(self, token: &SecretString) -> Result<Self, LeapError> {
        let mut value = HeaderValue::from_str(&format!("Bearer {}", token.expose_secret()))
            .map_err(|_| LeapError::ConfigError("token contains invalid header characters".to_string()))?;
        value.set_sensitive(true);

        let mut headers = HeaderMap::new();
        headers.insert(header::AUTHORIZATION, value);

        Ok(Self {
            client: build_client(self.timeout, headers)?,
            base_url: self.base_url,
            timeout: self.timeout,
        })
    }

    /// Get the base URL
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Build a request for `path`, resolved against the base URL.
    ///
    /// When `body` is present it is JSON encoded and `Content-Type` is set.
    /// serde_json does not HTML-escape, so image references pass through as is.
    pub fn new_request<B: Serialize + ?Sized>(
        &self,
        method: Method,
        path: &str,
        body: Option<&B>,
    ) -> Result<Request, LeapError> {
        self.check_base_url()?;
        let url = self.base_url.join(path)?;
        self.build_request(method, url, body)
    }

    /// Build a request for the resource named by `segments` below the base
    /// URL, pinned to the hub API version.
    ///
    /// Each segment is percent-encoded, so ids holding `?`, `%` or `/` stay
    /// inside their own path segment.
    pub fn new_resource_request<B: Serialize + ?Sized>(
        &self,
        method: Method,
        segments: &[&str],
        body: Option<&B>,
    ) -> Result<Request, LeapError> {
        let url = self.resource_url(segments)?;
        self.build_request(method, url, body)
    }

    /// URL of the resource named by `segments`, with `api-version` set
    pub fn resource_url(&self, segments: &[&str]) -> Result<Url, LeapError> {
        self.check_base_url()?;

        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| {
                LeapError::ConfigError(format!(
                    "base URL {:?} cannot carry a path",
                    self.base_url.as_str()
                ))
            })?
            .pop_if_empty()
            .extend(segments);
        url.query_pairs_mut().append_pair("api-version", API_VERSION);
        Ok(url)
    }

    fn check_base_url(&self) -> Result<(), LeapError> {
        if self.base_url.path().ends_with('/') {
            Ok(())
        } else {
            Err(LeapError::ConfigError(format!(
                "base URL must have a trailing slash, but {:?} does not",
                self.base_url.as_str()
            )))
        }
    }

    fn build_request<B: Serialize + ?Sized>(
        &self,
        method: Method,
        url: Url,
        body: Option<&B>,
    ) -> Result<Request, LeapError> {
        let mut builder = self.client.request(method, url);

        if let Some(body) = body {
            let encoded = serde_json::to_vec(body)?;
            builder = builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(encoded);
        }

        Ok(builder.build()?)
    }

    /// Execute a request and decode a JSON body on success.
    ///
    /// An empty body decodes to `None`. Bodies of non-2xx responses are not
    /// decoded; the status in the returned [`HubResponse`] tells the caller
    /// what happened.
    pub async fn execute<T: DeserializeOwned>(
        &self,
        operation: &str,
        request: Request,
    ) -> Result<(HubResponse, Option<T>), LeapError> {
        debug!("{} {} ({})", request.method(), request.url(), operation);

        let response = self.client.execute(request).await?;
        let status = response.status();
        let headers = response.headers().clone();
        let bytes = response.bytes().await?;

        let envelope = HubResponse::new(operation, status, headers);

        if !status.is_success() {
            if !bytes.is_empty() {
                debug!(
                    "{} returned {}: {}",
                    operation,
                    status,
                    String::from_utf8_lossy(&bytes)
                );
            }
            return Ok((envelope, None));
        }

        if bytes.iter().all(u8::is_ascii_whitespace) {
            return Ok((envelope, None));
        }

        let value = serde_json::from_slice(&bytes)?;
        Ok((envelope, Some(value)))
    }

    /// Execute a request whose response body is not needed
    pub async fn execute_no_content(
        &self,
        operation: &str,
        request: Request,
    ) -> Result<HubResponse, LeapError> {
        let (envelope, _) = self
            .execute::<serde_json::Value>(operation, request)
            .await?;
        Ok(envelope)
    }
}

fn build_client(timeout: Duration, default_headers: HeaderMap) -> Result<Client, LeapError> {
    Ok(Client::builder()
        .timeout(timeout)
        .default_headers(default_headers)
        .build()?)
}

use std::env;
use std::pin::Pin;
use std::time::{Duration, Instant};

use bytes::Bytes;
use futures::Stream;
use futures::stream::StreamExt;
use reqwest::header::{HeaderMap, HeaderValue};
use reqwest::{Client as ReqwestClient, RequestBuilder, Response, header};
use serde::Deserialize;
use url::Url;

use crate::error::{Error, Result};
use crate::observability::{CLIENT_REQUEST_DURATION, CLIENT_REQUEST_ERRORS, CLIENT_REQUESTS};
use crate::types::ChatRequest;

const DEFAULT_BASE_URL: &str = "https://chat.z.ai/";
const COMPLETIONS_PATH: &str = "api/v2/chat/completions";
const AUTHS_PATH: &str = "api/v1/auths/";
const DEFAULT_FE_VERSION: &str = "prod-fe-1.0.0";
const DEFAULT_USER_NAME: &str = "Guest";
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60);

/// Environment variable consulted for a session token.
pub const TOKEN_ENV_VAR: &str = "ZCHAT_TOKEN";

/// Raw response body chunks as they arrive from the upstream.
pub type ByteStream = Pin<Box<dyn Stream<Item = Result<Bytes>> + Send>>;

/// Opens response streams for chat requests.
///
/// The session controller only talks to the upstream through this trait, so
/// tests and alternative backends can stand in for [`ZaiClient`].
#[async_trait::async_trait]
pub trait Transport: Send + Sync {
    /// Prepares whatever the transport needs before the first request.
    ///
    /// Also called to recover when a request fails with an authentication
    /// error.
    async fn initialize(&mut self) -> Result<()> {
        Ok(())
    }

    /// Name substituted for the upstream's `{{USER_NAME}}` variable.
    fn user_name(&self) -> &str {
        DEFAULT_USER_NAME
    }

    /// Sends `request` and returns the response body as a byte stream.
    ///
    /// A connection failure or non-success status is reported here, before
    /// any bytes are yielded.
    async fn open(&self, request: &ChatRequest) -> Result<ByteStream>;
}

/// Client for the Z.AI chat service.
#[derive(Debug, Clone)]
pub struct ZaiClient {
    token: Option<String>,
    guest: bool,
    user_name: String,
    fe_version: String,
    client: ReqwestClient,
    base_url: Url,
    timeout: Duration,
}

#[derive(Deserialize)]
struct AuthResponse {
    token: String,
    #[serde(default)]
    name: Option<String>,
}

impl ZaiClient {
    /// Create a new client.
    ///
    /// The token can be provided directly or read from the `ZCHAT_TOKEN`
    /// environment variable.  Without either, [`Transport::initialize`]
    /// requests a guest token.
    pub fn new(token: Option<String>) -> Result<Self> {
        Self::with_options(token, None, None)
    }

    /// Create a new client with custom settings.
    pub fn with_options(
        token: Option<String>,
        base_url: Option<&str>,
        timeout: Option<Duration>,
    ) -> Result<Self> {
        let token = token
            .or_else(|| env::var(TOKEN_ENV_VAR).ok())
            .filter(|t| !t.trim().is_empty());
        let mut base_url = Url::parse(base_url.unwrap_or(DEFAULT_BASE_URL))?;
        if !base_url.path().ends_with('/') {
            let path = format!("{}/", base_url.path());
            base_url.set_path(&path);
        }

        let timeout = timeout.unwrap_or(DEFAULT_TIMEOUT);
        let client = ReqwestClient::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| {
                Error::http_client(
                    format!("Failed to build HTTP client: {}", e),
                    Some(Box::new(e)),
                )
            })?;

        Ok(Self {
            token,
            guest: false,
            user_name: DEFAULT_USER_NAME.to_string(),
            fe_version: DEFAULT_FE_VERSION.to_string(),
            client,
            base_url,
            timeout,
        })
    }

    /// Returns true once a session token is available.
    pub fn has_token(&self) -> bool {
        self.token.is_some()
    }

    /// The base URL requests are sent to.
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    fn endpoint(&self, path: &str) -> Result<Url> {
        Ok(self.base_url.join(path)?)
    }

    /// Create and return default headers for API requests.
    fn default_headers(&self) -> Result<HeaderMap> {
        let mut headers = HeaderMap::new();
        headers.insert(
            header::CONTENT_TYPE,
            HeaderValue::from_static("application/json"),
        );
        headers.insert(header::ACCEPT, HeaderValue::from_static("application/json"));
        let origin = self.base_url.origin().ascii_serialization();
        headers.insert(header::ORIGIN, header_value("origin", &origin)?);
        headers.insert(
            header::REFERER,
            header_value("referer", self.base_url.as_str())?,
        );
        headers.insert(
            "x-fe-version",
            header_value("x-fe-version", &self.fe_version)?,
        );
        if let Some(token) = &self.token {
            headers.insert(
                header::AUTHORIZATION,
                header_value("token", &format!("Bearer {token}"))?,
            );
        }
        Ok(headers)
    }

    async fn execute(&self, request: RequestBuilder) -> Result<Response> {
        CLIENT_REQUESTS.click();
        let start = Instant::now();
        let response = request.send().await.map_err(|e| {
            CLIENT_REQUEST_ERRORS.click();
            if e.is_timeout() {
                Error::timeout(
                    format!("Request timed out: {}", e),
                    Some(self.timeout.as_secs_f64()),
                )
            } else if e.is_connect() {
                Error::connection(format!("Connection error: {}", e), Some(Box::new(e)))
            } else {
                Error::http_client(format!("Request failed: {}", e), Some(Box::new(e)))
            }
        })?;
        CLIENT_REQUEST_DURATION.add(start.elapsed().as_secs_f64());

        if !response.status().is_success() {
            CLIENT_REQUEST_ERRORS.click();
            return Err(Self::process_error_response(response).await);
        }
        Ok(response)
    }

    /// Process API response errors and convert to our Error type
    async fn process_error_response(response: Response) -> Error {
        let status_code = response.status().as_u16();

        let retry_after = response
            .headers()
            .get("retry-after")
            .and_then(|val| val.to_str().ok())
            .and_then(|val| val.parse::<u64>().ok());

        let error_body = match response.text().await {
            Ok(body) => body,
            Err(e) => {
                return Error::http_client(
                    format!("Failed to read error response: {}", e),
                    Some(Box::new(e)),
                );
            }
        };
        error_from_status(status_code, &error_body, retry_after)
    }
}

/// Maps an HTTP error status and body onto an [`Error`].
fn error_from_status(status_code: u16, body: &str, retry_after: Option<u64>) -> Error {
    #[derive(Deserialize)]
    struct ErrorBody {
        detail: Option<String>,
        message: Option<String>,
        error: Option<ErrorDetail>,
    }

    #[derive(Deserialize)]
    struct ErrorDetail {
        message: Option<String>,
    }

    let message = serde_json::from_str::<ErrorBody>(body)
        .ok()
        .and_then(|e| {
            e.detail
                .or(e.message)
                .or_else(|| e.error.and_then(|d| d.message))
        })
        .unwrap_or_else(|| body.to_string());

    match status_code {
        400 => Error::bad_request(message),
        401 => Error::authentication(message),
        403 => Error::permission(message),
        404 => Error::not_found(message),
        408 => Error::timeout(message, None),
        429 => Error::rate_limit(message, retry_after),
        500 => Error::internal_server(message),
        502..=504 => Error::service_unavailable(message, retry_after),
        _ => Error::api(status_code, message),
    }
}

fn header_value(name: &str, value: &str) -> Result<HeaderValue> {
    HeaderValue::from_str(value).map_err(|e| {
        Error::validation(
            format!("value is not a valid HTTP header: {e}"),
            Some(name.to_string()),
        )
    })
}

#[async_trait::async_trait]
impl Transport for ZaiClient {
    /// Fetches a guest token when none was configured.
    ///
    /// A guest token is replaced with a fresh one on every call; a configured
    /// token is kept as is.
    async fn initialize(&mut self) -> Result<()> {
        if self.token.is_some() && !self.guest {
            return Ok(());
        }
        self.token = None;
        let url = self.endpoint(AUTHS_PATH)?;
        let response = self
            .execute(self.client.get(url).headers(self.default_headers()?))
            .await?;
        let auth = response.json::<AuthResponse>().await.map_err(|e| {
            Error::serialization(
                format!("Failed to parse auth response: {}", e),
                Some(Box::new(e)),
            )
        })?;
        if auth.token.is_empty() {
            return Err(Error::authentication("upstream issued an empty token"));
        }
        self.token = Some(auth.token);
        self.guest = true;
        if let Some(name) = auth.name.filter(|n| !n.is_empty()) {
            self.user_name = name;
        }
        Ok(())
    }

    fn user_name(&self) -> &str {
        &self.user_name
    }

    async fn open(&self, request: &ChatRequest) -> Result<ByteStream> {
        let url = self.endpoint(COMPLETIONS_PATH)?;
        let mut headers = self.default_headers()?;
        headers.insert(
            header::ACCEPT,
            HeaderValue::from_static("text/event-stream"),
        );

        let response = self
            .execute(self.client.post(url).headers(headers).json(request))
            .await?;

        let stream = response.bytes_stream().map(|result| {
            result.map_err(|e| {
                Error::streaming(format!("Error in HTTP stream: {e}"), Some(Box::new(e)))
            })
        });
        Ok(Box::pin(stream))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn client_creation() {
        let client = ZaiClient::new(Some("test-token".to_string())).unwrap();
        assert_eq!(client.token.as_deref(), Some("test-token"));
        assert_eq!(client.base_url.as_str(), DEFAULT_BASE_URL);
        assert_eq!(client.timeout, DEFAULT_TIMEOUT);
        assert_eq!(client.user_name(), "Guest");

        let client = ZaiClient::with_options(
            Some("test-token".to_string()),
            Some("http://localhost:8080/proxy"),
            Some(Duration::from_secs(30)),
        )
        .unwrap();
        assert_eq!(client.base_url.as_str(), "http://localhost:8080/proxy/");
        assert_eq!(
            client.endpoint(COMPLETIONS_PATH).unwrap().as_str(),
            "http://localhost:8080/proxy/api/v2/chat/completions"
        );
        assert_eq!(client.timeout, Duration::from_secs(30));
    }

    #[test]
    fn invalid_base_url() {
        let err = ZaiClient::with_options(Some("t".to_string()), Some("not a url"), None)
            .unwrap_err();
        assert!(matches!(err, Error::Url { .. }));
    }

    #[test]
    fn headers_carry_token() {
        let client = ZaiClient::new(Some("abc".to_string())).unwrap();
        let headers = client.default_headers().unwrap();
        assert_eq!(headers[header::AUTHORIZATION], "Bearer abc");
        assert_eq!(headers[header::ORIGIN], "https://chat.z.ai");
        assert_eq!(headers["x-fe-version"], DEFAULT_FE_VERSION);
    }

    #[test]
    fn status_mapping() {
        assert!(error_from_status(401, r#"{"detail":"expired"}"#, None).is_authentication());
        assert!(error_from_status(429, "slow down", Some(5)).is_rate_limit());
        assert!(matches!(
            error_from_status(503, "", None),
            Error::ServiceUnavailable { .. }
        ));
        let err = error_from_status(418, r#"{"error":{"message":"teapot"}}"#, None);
        assert_eq!(err.to_string(), "API error (418): teapot");
        let err = error_from_status(400, r#"{"message":"missing model"}"#, None);
        assert_eq!(err.to_string(), "Bad request: missing model");
    }
}

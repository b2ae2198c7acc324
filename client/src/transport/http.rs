use std::time::Duration;

use async_trait::async_trait;
use config::Config;
use reqwest::{Client as HttpClient, RequestBuilder, Url, header::CONTENT_TYPE};
use serde::Deserialize;
use tracing::instrument;
use uuid::Uuid;

use crate::transport::{
    RequestBody, RetrySettings, Transport, TransportError, TransportRequest, TransportResponse,
};

const DEFAULT_BASE_URL: &str = "https://api.notion.com/v1/";
const DEFAULT_API_VERSION: &str = "2022-06-28";
const DEFAULT_TIMEOUT_SECS: i64 = 30;

const API_VERSION_HEADER: &str = "Notion-Version";
const CORRELATION_ID_HEADER: &str = "X-Correlation-Id";

#[derive(Clone, Debug)]
pub struct HttpTransportArgs {
    pub base_url: Url,
    pub api_token: String,
    pub api_version: String,
    pub timeout: Duration,
    pub retry_settings: RetrySettings,
    pub correlation_id: Uuid,
}

impl HttpTransportArgs {
    const CONFIG_PREFIX: &'static str = "FILE_UPLOAD";

    pub fn new(base_url: Url, api_token: impl Into<String>) -> Self {
        Self {
            base_url,
            api_token: api_token.into(),
            api_version: DEFAULT_API_VERSION.to_owned(),
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS as u64),
            retry_settings: RetrySettings::default(),
            correlation_id: Uuid::new_v4(),
        }
    }

    /// Reads `FILE_UPLOAD__*` variables, e.g. `FILE_UPLOAD__API_TOKEN`.
    pub fn load_from_env() -> anyhow::Result<Self> {
        let defaults = RetrySettings::default();

        let config = Config::builder()
            .set_default("base_url", DEFAULT_BASE_URL)?
            .set_default("api_version", DEFAULT_API_VERSION)?
            .set_default("timeout_secs", DEFAULT_TIMEOUT_SECS)?
            .set_default("max_retries", defaults.max_retries as i64)?
            .set_default("base_delay_ms", defaults.base_delay.as_millis() as i64)?
            .set_default("max_delay_ms", defaults.max_delay.as_millis() as i64)?
            .set_default("respect_retry_after", defaults.respect_retry_after)?
            .add_source(config::Environment::with_prefix(Self::CONFIG_PREFIX).separator("__"))
            .build()?
            .try_deserialize::<HttpTransportConfig>()
            .map_err(|e| anyhow::anyhow!("failed to load HTTP transport configuration: {}", e))?;

        Ok(Self {
            base_url: Url::parse(&config.base_url)?,
            api_token: config.api_token,
            api_version: config.api_version,
            timeout: Duration::from_secs(config.timeout_secs),
            retry_settings: RetrySettings {
                max_retries: config.max_retries,
                base_delay: Duration::from_millis(config.base_delay_ms),
                max_delay: Duration::from_millis(config.max_delay_ms),
                respect_retry_after: config.respect_retry_after,
            },
            correlation_id: Uuid::new_v4(),
        })
    }
}

#[derive(Debug, Deserialize)]
struct HttpTransportConfig {
    base_url: String,
    api_token: String,
    api_version: String,
    timeout_secs: u64,
    max_retries: usize,
    base_delay_ms: u64,
    max_delay_ms: u64,
    respect_retry_after: bool,
}

/// `Transport` over HTTPS with bearer authentication and retries on
/// transient failures.
#[derive(Clone)]
pub struct HttpTransport {
    http: HttpClient,
    args: HttpTransportArgs,
}

impl HttpTransport {
    pub fn new(mut args: HttpTransportArgs) -> Result<Self, TransportError> {
        // Without the trailing slash `Url::join` would drop the last segment (e.g. `/v1`)
        if !args.base_url.path().ends_with('/') {
            let path = format!("{}/", args.base_url.path());
            args.base_url.set_path(&path);
        }

        let http = HttpClient::builder()
            .timeout(args.timeout)
            .build()
            .map_err(|e| TransportError::Other(e.to_string()))?;

        Ok(Self { http, args })
    }

    pub fn base_url(&self) -> &Url {
        &self.args.base_url
    }

    pub(super) fn retry_settings(&self) -> &RetrySettings {
        &self.args.retry_settings
    }

    pub(super) fn correlation_id(&self) -> Uuid {
        self.args.correlation_id
    }

    fn sign_request(&self, req_builder: RequestBuilder) -> RequestBuilder {
        req_builder
            .bearer_auth(&self.args.api_token)
            .header(API_VERSION_HEADER, &self.args.api_version)
            .header(CORRELATION_ID_HEADER, self.args.correlation_id.to_string())
    }
}

#[async_trait]
impl Transport for HttpTransport {
    #[instrument(skip(self, request), fields(correlation_id = %self.args.correlation_id, method = %request.method, path = %request.path))]
    async fn request(&self, request: TransportRequest) -> Result<TransportResponse, TransportError> {
        let url = self
            .args
            .base_url
            .join(&request.path)
            .map_err(|e| TransportError::Request(format!("invalid path {}: {e}", request.path)))?;

        let mut req_builder = self.http.request(request.method, url).query(&request.query);

        // Set before the body so `json` does not add its own content type
        if let Some(content_type) = request.content_type {
            req_builder = req_builder.header(CONTENT_TYPE, content_type);
        }

        req_builder = match request.body {
            RequestBody::Empty => req_builder,
            RequestBody::Json(value) => req_builder.json(&value),
            RequestBody::Bytes(bytes) => req_builder.body(bytes),
        };

        let resp = self.send_with_retries(self.sign_request(req_builder)).await?;

        let status = resp.status();
        let body = resp.bytes().await?;

        Ok(TransportResponse { status, body })
    }
}

use std::time::Duration;

use reqwest::{RequestBuilder, Response, StatusCode};
use tokio_retry::{
    RetryIf,
    strategy::{ExponentialBackoff, jitter},
};
use tracing::Instrument;
use uuid::Uuid;

use crate::transport::{HttpTransport, TransportError};

fn is_transient_http(status: StatusCode) -> bool {
    status.is_server_error() || status == StatusCode::TOO_MANY_REQUESTS
}

fn retry_after(resp: &Response) -> Option<Duration> {
    resp.headers()
        .get("retry-after")
        .and_then(|h| h.to_str().ok())
        .and_then(|s| s.parse::<u64>().ok())
        .map(Duration::from_secs)
}

fn not_retryable_body() -> TransportError {
    TransportError::Request("request body cannot be cloned for retries".to_owned())
}

#[derive(Clone, Debug)]
pub struct RetrySettings {
    pub max_retries: usize,
    pub base_delay: Duration,
    pub max_delay: Duration,
    pub respect_retry_after: bool,
}

impl Default for RetrySettings {
    fn default() -> Self {
        Self {
            max_retries: 5,
            base_delay: Duration::from_millis(200),
            max_delay: Duration::from_secs(5),
            respect_retry_after: true,
        }
    }
}

impl RetrySettings {
    pub fn disabled() -> Self {
        Self {
            max_retries: 0,
            ..Self::default()
        }
    }
}

enum AttemptError {
    // Kept so the caller sees the real status once retries run out
    Status(Response),
    Network(TransportError),
}

impl AttemptError {
    fn is_transient(&self) -> bool {
        match self {
            AttemptError::Status(_) => true,
            AttemptError::Network(e) => e.is_transient(),
        }
    }
}

impl HttpTransport {
    pub(super) async fn send_with_retries(
        &self,
        req_builder: RequestBuilder,
    ) -> Result<Response, TransportError> {
        let retry_settings = self.retry_settings().clone();
        let request = req_builder
            .try_clone()
            .ok_or_else(not_retryable_body)?
            .build()?;
        let method = request.method().as_str().to_string();
        let path = request.url().path().to_string();

        let request_id = Uuid::new_v4().to_string();
        let correlation_id = self.correlation_id().to_string();

        let strategy =
            ExponentialBackoff::from_millis(retry_settings.base_delay.as_millis() as u64)
                .max_delay(retry_settings.max_delay)
                .map(jitter)
                .take(retry_settings.max_retries);

        let respect_retry_after = retry_settings.respect_retry_after;
        let max_delay = retry_settings.max_delay;

        let outcome = RetryIf::start(
            strategy,
            move || {
                let attempt = req_builder.try_clone();

                let span = tracing::info_span!(
                    "http.client",
                    %method,
                    %path,
                    %request_id,
                    %correlation_id,
                );

                async move {
                    let Some(attempt) = attempt else {
                        return Err(AttemptError::Network(not_retryable_body()));
                    };

                    match attempt.send().instrument(span.clone()).await {
                        Ok(resp) => {
                            let status = resp.status();

                            if !is_transient_http(status) {
                                return Ok(resp);
                            }

                            if respect_retry_after && let Some(wait) = retry_after(&resp) {
                                tracing::warn!(
                                    parent: &span,
                                    status = %status,
                                    ?wait,
                                    "transient HTTP; honoring Retry-After"
                                );
                                tokio::time::sleep(wait.min(max_delay)).await;
                            } else {
                                tracing::warn!(parent: &span, status = %status, "transient HTTP; retrying");
                            }

                            Err(AttemptError::Status(resp))
                        }
                        Err(e) => {
                            let err = TransportError::from(e);
                            if err.is_transient() {
                                tracing::warn!(parent: &span, error = %err, "transient network; retrying");
                            } else {
                                tracing::error!(parent: &span, error = %err, "non-retryable error");
                            }
                            Err(AttemptError::Network(err))
                        }
                    }
                }
            },
            |e: &AttemptError| e.is_transient(),
        )
        .await;

        match outcome {
            Ok(resp) | Err(AttemptError::Status(resp)) => Ok(resp),
            Err(AttemptError::Network(err)) => Err(err),
        }
    }
}

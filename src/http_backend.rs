// HTTP confirmation backend: posts bookings and payments as JSON and retries
// transient failures with exponential backoff and jitter.

use crate::config::{BackendConfig, ConfigError, RetryConfig, StorefrontConfig};
use crate::confirmation::{
    BookingRecord, BookingRequest, ConfirmationService, PaymentRecord, PaymentRequest,
    SubmissionError,
};
use crate::validation::ValidationResult;
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::future::Future;
use std::time::Duration;
use tokio::time::sleep;
use tracing::{debug, info, warn};

pub const IDEMPOTENCY_HEADER: &str = "Idempotency-Key";

/// Exponential backoff with jitter for the given retry attempt (0-based).
pub fn calculate_backoff(retry_attempt: u32, config: &RetryConfig) -> Duration {
    let base_backoff_ms = (config.initial_backoff_ms as f64
        * config.backoff_multiplier.powf(retry_attempt as f64))
    .min(config.max_backoff_ms as f64);

    // Spread retries so clients recovering together don't hit the backend at once
    let jitter = rand::random::<f64>() * config.jitter_factor * base_backoff_ms;
    let backoff_ms = base_backoff_ms * (1.0 - config.jitter_factor / 2.0) + jitter;

    Duration::from_millis(backoff_ms as u64)
}

/// Maps a non-success response to a submission error.
fn error_for_status(status: StatusCode, body: &str, key: Option<&str>) -> SubmissionError {
    match status {
        StatusCode::UNPROCESSABLE_ENTITY => match serde_json::from_str::<ValidationResult>(body) {
            Ok(errors) if !errors.is_empty() => SubmissionError::Validation(errors),
            _ => SubmissionError::Backend {
                status: status.as_u16(),
                message: truncate(body),
                retryable: false,
            },
        },
        StatusCode::CONFLICT => SubmissionError::InFlight(key.unwrap_or_default().to_string()),
        _ => SubmissionError::Backend {
            status: status.as_u16(),
            message: truncate(body),
            retryable: status.is_server_error() || status == StatusCode::TOO_MANY_REQUESTS,
        },
    }
}

/// Runs `attempt` until it succeeds, fails for good, or the retry budget is spent.
/// Only errors that report `is_retryable` are tried again.
pub async fn with_retries<T, F, Fut>(
    retry: &RetryConfig,
    path: &str,
    mut attempt: F,
) -> Result<T, SubmissionError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, SubmissionError>>,
{
    let mut retries = 0;

    loop {
        match attempt().await {
            Ok(value) => return Ok(value),
            Err(err) if err.is_retryable() && retries < retry.max_retries => {
                let backoff = calculate_backoff(retries, retry);
                warn!(
                    path,
                    attempt = retries + 1,
                    backoff_ms = backoff.as_millis() as u64,
                    error = %err,
                    "retrying submission"
                );
                sleep(backoff).await;
                retries += 1;
            }
            Err(err) => {
                debug!(path, attempts = retries + 1, error = %err, "submission failed");
                return Err(err);
            }
        }
    }
}

fn truncate(body: &str) -> String {
    body.chars().take(200).collect()
}

/// `ConfirmationService` backed by a remote booking API.
pub struct HttpConfirmationService {
    http: Client,
    config: BackendConfig,
}

impl HttpConfirmationService {
    pub fn new(config: BackendConfig) -> Result<Self, ConfigError> {
        if config.base_url.trim().is_empty() {
            return Err(ConfigError::InvalidValue {
                field: "backend.base_url",
                reason: "must not be empty".to_string(),
            });
        }

        let http = Client::builder()
            .timeout(Duration::from_millis(config.timeout_ms))
            .build()
            .map_err(|e| ConfigError::InvalidValue {
                field: "backend",
                reason: e.to_string(),
            })?;

        Ok(Self { http, config })
    }

    /// Client for the backend section of a loaded storefront configuration.
    pub fn from_config(config: &StorefrontConfig) -> Result<Self, ConfigError> {
        Self::new(config.backend.clone())
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.config.base_url.trim_end_matches('/'), path)
    }

    async fn post_once<B, R>(&self, path: &str, body: &B, key: Option<&str>) -> Result<R, SubmissionError>
    where
        B: Serialize + Sync,
        R: DeserializeOwned,
    {
        let mut request = self
            .http
            .post(self.url(path))
            .header("Accept", "application/json")
            .json(body);
        if let Some(key) = key {
            request = request.header(IDEMPOTENCY_HEADER, key);
        }

        let response = request.send().await.map_err(|e| {
            if e.is_timeout() {
                SubmissionError::Timeout(self.config.timeout_ms)
            } else {
                SubmissionError::Network(e.to_string())
            }
        })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(error_for_status(status, &body, key));
        }

        response.json().await.map_err(|e| SubmissionError::Backend {
            status: status.as_u16(),
            message: format!("Failed to parse response from {}: {}", path, e),
            retryable: false,
        })
    }

    async fn post<B, R>(&self, path: &str, body: &B, key: Option<&str>) -> Result<R, SubmissionError>
    where
        B: Serialize + Sync,
        R: DeserializeOwned,
    {
        with_retries(&self.config.retry, path, move || self.post_once(path, body, key)).await
    }
}

#[async_trait]
impl ConfirmationService for HttpConfirmationService {
    async fn submit_booking(
        &self,
        request: BookingRequest,
    ) -> Result<BookingRecord, SubmissionError> {
        let key = request.idempotency_key.clone();
        let record: BookingRecord = self.post("bookings", &request, key.as_deref()).await?;
        info!(reference = %record.reference, kind = ?record.kind, "booking confirmed by backend");
        Ok(record)
    }

    async fn submit_payment(
        &self,
        request: PaymentRequest,
    ) -> Result<PaymentRecord, SubmissionError> {
        let key = request.idempotency_key.clone();
        let record: PaymentRecord = self.post("payments", &request, key.as_deref()).await?;
        info!(reference = %record.reference, method = ?record.method, "payment completed by backend");
        Ok(record)
    }
}

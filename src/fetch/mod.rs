mod basic;
mod client;
pub mod auth;

pub use basic::BasicClient;
pub use client::HttpClient;

use reqwest::header::{CONTENT_TYPE, HeaderValue};
use reqwest::{Method, Request, StatusCode, Url};
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::time::Duration;
use tracing::{debug, warn};

/// Failure of a JSON call to an upstream service.
#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    #[error("request to {url} failed: {source}")]
    Transport {
        url: String,
        #[source]
        source: reqwest::Error,
    },
    #[error("{url} returned status {status}: {body}")]
    Status {
        url: String,
        status: StatusCode,
        body: String,
    },
    #[error("failed to decode response from {url}: {source}")]
    Decode {
        url: String,
        #[source]
        source: serde_json::Error,
    },
    #[error("failed to encode request body: {0}")]
    Encode(#[source] serde_json::Error),
}

impl FetchError {
    /// Transport errors, 429 and 5xx are worth another attempt.
    pub fn is_transient(&self) -> bool {
        match self {
            FetchError::Transport { .. } => true,
            FetchError::Status { status, .. } => {
                status.is_server_error() || *status == StatusCode::TOO_MANY_REQUESTS
            }
            FetchError::Decode { .. } | FetchError::Encode(_) => false,
        }
    }
}

/// Bounded exponential backoff. The default performs a single attempt.
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 0,
            backoff: Duration::from_millis(250),
        }
    }
}

impl RetryPolicy {
    fn delay(&self, attempt: u32) -> Duration {
        self.backoff.saturating_mul(1 << attempt.min(16))
    }
}

fn json_request(url: &Url, body: &[u8]) -> Request {
    let mut req = Request::new(Method::POST, url.clone());
    req.headers_mut()
        .insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
    *req.body_mut() = Some(body.to_vec().into());
    req
}

async fn post_once<C, R>(client: &C, url: &Url, body: &[u8]) -> Result<R, FetchError>
where
    C: HttpClient + ?Sized,
    R: DeserializeOwned,
{
    let transport = |source| FetchError::Transport {
        url: url.to_string(),
        source,
    };

    let resp = client.execute(json_request(url, body)).await.map_err(transport)?;
    let status = resp.status();
    let bytes = resp.bytes().await.map_err(transport)?;

    if !status.is_success() {
        return Err(FetchError::Status {
            url: url.to_string(),
            status,
            body: String::from_utf8_lossy(&bytes).into_owned(),
        });
    }

    serde_json::from_slice(&bytes).map_err(|source| FetchError::Decode {
        url: url.to_string(),
        source,
    })
}

/// POSTs `body` as JSON and decodes a JSON response, retrying transient
/// failures according to `retry`. Only safe for read-only endpoints.
pub async fn post_json<C, B, R>(
    client: &C,
    url: &Url,
    body: &B,
    retry: RetryPolicy,
) -> Result<R, FetchError>
where
    C: HttpClient + ?Sized,
    B: Serialize + ?Sized,
    R: DeserializeOwned,
{
    let body = serde_json::to_vec(body).map_err(FetchError::Encode)?;
    let mut attempt = 0;

    loop {
        match post_once(client, url, &body).await {
            Err(e) if e.is_transient() && attempt < retry.max_retries => {
                let delay = retry.delay(attempt);
                warn!(%url, attempt, delay_ms = delay.as_millis() as u64, error = %e, "Retrying provider call");
                tokio::time::sleep(delay).await;
                attempt += 1;
            }
            result => {
                debug!(%url, attempts = attempt + 1, ok = result.is_ok(), "Provider call finished");
                return result;
            }
        }
    }
}

use reqwest::StatusCode;

use crate::fetch::FetchError;

/// Failure of a route-with-obstacles request.
///
/// Per-variant trace failures are not errors; they surface as
/// `trace_degraded` on the variant report instead.
#[derive(Debug, thiserror::Error)]
pub enum MatchError {
    #[error("bad request: {0}")]
    BadRequest(String),

    #[error("routing provider failed: {0}")]
    Routing(#[from] FetchError),

    #[error("hazard store failed: {0:#}")]
    HazardStore(anyhow::Error),

    #[error("internal error: {0}")]
    Internal(String),
}

impl MatchError {
    pub fn status(&self) -> StatusCode {
        match self {
            MatchError::BadRequest(_) => StatusCode::BAD_REQUEST,
            MatchError::Routing(_) => StatusCode::BAD_GATEWAY,
            MatchError::HazardStore(_) | MatchError::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

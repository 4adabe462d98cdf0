//! Response envelope returned by every hub call

use http::{HeaderMap, StatusCode};

use crate::errors::LeapError;

/// Header the hub uses to report its own error code
pub const HUB_ERROR_CODE_HEADER: &str = "iothub-errorcode";

/// Status and headers of a completed hub call, detached from the body.
///
/// The body has already been consumed by [`HubClient::execute`]; what remains
/// is enough for callers to decide the next step of a release.
///
/// [`HubClient::execute`]: crate::http::client::HubClient::execute
#[derive(Debug, Clone)]
pub struct HubResponse {
    operation: String,
    status: StatusCode,
    headers: HeaderMap,
}

impl HubResponse {
    pub fn new(operation: impl Into<String>, status: StatusCode, headers: HeaderMap) -> Self {
        Self {
            operation: operation.into(),
            status,
            headers,
        }
    }

    /// Operation name used in error messages
    pub fn operation(&self) -> &str {
        &self.operation
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }

    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    /// Hub error code header, when the hub sent one
    pub fn error_code(&self) -> Option<String> {
        self.headers
            .get(HUB_ERROR_CODE_HEADER)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string)
    }

    /// True when the status equals `code`
    pub fn is(&self, code: StatusCode) -> bool {
        self.status == code
    }

    /// Fail unless the status is one of `expected`.
    ///
    /// A 401 outside the expected set is reported as [`LeapError::Unauthorized`]
    /// so token problems stand apart from other hub failures.
    pub fn expect(&self, expected: &[StatusCode]) -> Result<(), LeapError> {
        if expected.contains(&self.status) {
            return Ok(());
        }

        if self.status == StatusCode::UNAUTHORIZED {
            return Err(LeapError::Unauthorized {
                operation: self.operation.clone(),
            });
        }

        Err(LeapError::UnexpectedStatus {
            operation: self.operation.clone(),
            status: self.status,
            error_code: self.error_code(),
        })
    }
}

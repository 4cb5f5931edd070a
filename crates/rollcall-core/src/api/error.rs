use thiserror::Error;

/// Broad class of a failure, used to pick remediation guidance.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureCause {
    /// Sharing settings, key or permissions need fixing.
    Access,
    /// Network trouble or server hiccup; retrying later may work.
    Transient,
    /// The endpoint answered with something that isn't roster data.
    Data,
}

impl std::fmt::Display for FailureCause {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FailureCause::Access => write!(f, "access"),
            FailureCause::Transient => write!(f, "network"),
            FailureCause::Data => write!(f, "data"),
        }
    }
}

#[derive(Error, Debug)]
pub enum ApiError {
    #[error("Access denied: {0}")]
    AccessDenied(String),

    #[error("Unauthorized - the sheet is not shared publicly or the key was rejected")]
    Unauthorized,

    #[error("No access key configured for the values API")]
    MissingKey,

    #[error("Spreadsheet or range not found: {0}")]
    NotFound(String),

    #[error("Rate limited - please wait before retrying")]
    RateLimited,

    #[error("Server error: {0}")]
    ServerError(String),

    #[error("Request timed out")]
    Timeout,

    #[error("Network error: {0}")]
    NetworkError(#[from] reqwest::Error),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("Invalid request: {0}")]
    InvalidRequest(String),
}

/// Maximum length for error response bodies in error messages
const MAX_ERROR_BODY_LENGTH: usize = 500;

/// Markers Google puts in a 400 body when the API key itself is bad.
const INVALID_KEY_MARKERS: [&str; 2] = ["API_KEY_INVALID", "API key not valid"];

impl ApiError {
    /// Truncate a response body to avoid logging excessive data
    fn truncate_body(body: &str) -> String {
        if body.len() <= MAX_ERROR_BODY_LENGTH {
            body.to_string()
        } else {
            let cut = (0..=MAX_ERROR_BODY_LENGTH)
                .rev()
                .find(|&i| body.is_char_boundary(i))
                .unwrap_or(0);
            format!("{}... (truncated, {} total bytes)", &body[..cut], body.len())
        }
    }

    pub fn from_status(status: reqwest::StatusCode, body: &str) -> Self {
        let truncated = Self::truncate_body(body);
        match status.as_u16() {
            400 if INVALID_KEY_MARKERS.iter().any(|m| body.contains(m)) => {
                ApiError::AccessDenied(truncated)
            }
            401 => ApiError::Unauthorized,
            403 => ApiError::AccessDenied(truncated),
            404 => ApiError::NotFound(truncated),
            408 => ApiError::Timeout,
            429 => ApiError::RateLimited,
            500..=599 => ApiError::ServerError(truncated),
            _ => ApiError::InvalidResponse(format!("Status {}: {}", status, truncated)),
        }
    }

    /// Map a transport error, singling out timeouts.
    pub fn from_transport(error: reqwest::Error) -> Self {
        if error.is_timeout() {
            ApiError::Timeout
        } else {
            ApiError::NetworkError(error)
        }
    }

    pub fn cause(&self) -> FailureCause {
        match self {
            ApiError::AccessDenied(_)
            | ApiError::Unauthorized
            | ApiError::MissingKey
            | ApiError::NotFound(_) => FailureCause::Access,
            ApiError::RateLimited
            | ApiError::ServerError(_)
            | ApiError::Timeout
            | ApiError::NetworkError(_) => FailureCause::Transient,
            ApiError::InvalidResponse(_) | ApiError::InvalidRequest(_) => FailureCause::Data,
        }
    }
}

/// Failure of an append to the sheet. The in-memory roster is untouched.
#[derive(Error, Debug)]
pub enum WriteError {
    #[error("Write permission denied - the configured credentials cannot append to this sheet ({0})")]
    PermissionDenied(String),

    #[error(transparent)]
    Api(ApiError),
}

impl From<ApiError> for WriteError {
    fn from(error: ApiError) -> Self {
        match error {
            ApiError::Unauthorized | ApiError::AccessDenied(_) | ApiError::MissingKey => {
                WriteError::PermissionDenied(error.to_string())
            }
            other => WriteError::Api(other),
        }
    }
}

impl WriteError {
    pub fn cause(&self) -> FailureCause {
        match self {
            WriteError::PermissionDenied(_) => FailureCause::Access,
            WriteError::Api(e) => e.cause(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use reqwest::StatusCode;

    #[test]
    fn test_from_status_classification() {
        assert!(matches!(ApiError::from_status(StatusCode::UNAUTHORIZED, ""), ApiError::Unauthorized));
        assert!(matches!(ApiError::from_status(StatusCode::FORBIDDEN, "no"), ApiError::AccessDenied(_)));
        assert!(matches!(ApiError::from_status(StatusCode::NOT_FOUND, ""), ApiError::NotFound(_)));
        assert!(matches!(ApiError::from_status(StatusCode::TOO_MANY_REQUESTS, ""), ApiError::RateLimited));
        assert!(matches!(ApiError::from_status(StatusCode::BAD_GATEWAY, ""), ApiError::ServerError(_)));
        assert!(matches!(ApiError::from_status(StatusCode::IM_A_TEAPOT, ""), ApiError::InvalidResponse(_)));
    }

    #[test]
    fn test_invalid_key_400_is_access_problem() {
        let body = r#"{"error":{"code":400,"message":"API key not valid. Please pass a valid API key."}}"#;
        let err = ApiError::from_status(StatusCode::BAD_REQUEST, body);
        assert_eq!(err.cause(), FailureCause::Access);

        let other = ApiError::from_status(StatusCode::BAD_REQUEST, "Unable to parse range");
        assert_eq!(other.cause(), FailureCause::Data);
    }

    #[test]
    fn test_truncate_respects_char_boundaries() {
        let body = "가".repeat(400); // 1200 bytes
        let err = ApiError::from_status(StatusCode::FORBIDDEN, &body);
        assert!(err.to_string().contains("truncated, 1200 total bytes"));
    }

    #[test]
    fn test_write_error_from_api_error() {
        assert!(matches!(WriteError::from(ApiError::Unauthorized), WriteError::PermissionDenied(_)));
        assert!(matches!(
            WriteError::from(ApiError::AccessDenied("read-only".into())),
            WriteError::PermissionDenied(_)
        ));
        let transient = WriteError::from(ApiError::Timeout);
        assert!(matches!(transient, WriteError::Api(ApiError::Timeout)));
        assert_eq!(transient.cause(), FailureCause::Transient);
    }
}

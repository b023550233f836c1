use axum::http::StatusCode;

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("Failed to fetch data: {0}")]
    FetchFailure(String),

    #[error("Failed to decode response: {0}")]
    DecodeFailure(String),

    #[error("Country not found")]
    CountryNotFound,

    #[error("Site configuration does not match page layout: {0}")]
    ConfigurationMismatch(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),
}

impl AppError {
    /// Status code reported to API clients. Only an unknown country is the
    /// caller's fault; everything else is a server-side failure.
    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::CountryNotFound => StatusCode::BAD_REQUEST,
            AppError::FetchFailure(_)
            | AppError::DecodeFailure(_)
            | AppError::ConfigurationMismatch(_)
            | AppError::ConfigError(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<reqwest::Error> for AppError {
    fn from(err: reqwest::Error) -> Self {
        AppError::FetchFailure(err.to_string())
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::DecodeFailure(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_country_not_found_is_client_error() {
        assert_eq!(AppError::CountryNotFound.status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(AppError::CountryNotFound.to_string(), "Country not found");
    }

    #[test]
    fn test_other_failures_are_server_errors() {
        let errors = [
            AppError::FetchFailure("timeout".into()),
            AppError::DecodeFailure("bad json".into()),
            AppError::ConfigurationMismatch("short".into()),
            AppError::ConfigError("missing".into()),
        ];
        for err in errors {
            assert_eq!(err.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
        }
    }

    #[test]
    fn test_json_error_maps_to_decode_failure() {
        let err: AppError = serde_json::from_str::<u32>("nope").unwrap_err().into();
        assert!(matches!(err, AppError::DecodeFailure(_)));
    }
}

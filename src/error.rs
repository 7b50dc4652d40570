use thiserror::Error;

use crate::sync::PinId;

/// Main application error type
#[derive(Error, Debug)]
pub enum PinmapError {
    #[error("Boundary dataset error: {0}")]
    Geo(#[from] GeoError),

    #[error("Persistence service error: {0}")]
    Sync(#[from] SyncError),

    #[error("Session snapshot error: {0}")]
    Session(#[from] SessionError),

    #[error("TUI error: {0}")]
    Tui(#[from] TuiError),

    #[error("Configuration error: {0}")]
    Config(String),
}

/// Errors raised by a single map gesture. None of these are fatal.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum PinError {
    #[error("You can't pin the ocean")]
    RejectedOcean,

    #[error("Sign in to pin countries")]
    NotSignedIn,

    #[error("No pin with id {0}")]
    UnknownPin(PinId),

    #[error("No pin selected")]
    NoSelection,
}

/// Persistence service errors
#[derive(Error, Debug)]
pub enum SyncError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("HTTP status {0}")]
    HttpStatus(reqwest::StatusCode),

    #[error("JSON parsing failed: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Invalid API URL: {0}")]
    InvalidUrl(String),
}

impl SyncError {
    /// Check if the request is worth repeating
    pub fn is_recoverable(&self) -> bool {
        match self {
            SyncError::Http(e) => e.is_timeout() || e.is_connect() || e.is_request(),
            SyncError::HttpStatus(status) => {
                status.is_server_error() || *status == reqwest::StatusCode::TOO_MANY_REQUESTS
            }
            SyncError::Json(_) | SyncError::InvalidUrl(_) => false,
        }
    }
}

/// Boundary dataset errors
#[derive(Error, Debug)]
pub enum GeoError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("GeoJSON parsing failed: {0}")]
    GeoJson(#[from] geojson::Error),

    #[error("Boundary dataset is not a FeatureCollection")]
    NotFeatureCollection,

    #[error("Invalid geometry in feature {feature}: {reason}")]
    InvalidGeometry { feature: usize, reason: String },

    #[error("Dataset contains no usable country features")]
    Empty,
}

/// Session snapshot errors
#[derive(Error, Debug)]
pub enum SessionError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON parsing failed: {0}")]
    Json(#[from] serde_json::Error),
}

/// TUI errors
#[derive(Error, Debug)]
pub enum TuiError {
    #[error("Terminal IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type alias for pinmap operations
pub type Result<T> = std::result::Result<T, PinmapError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_recoverability() {
        assert!(SyncError::HttpStatus(reqwest::StatusCode::BAD_GATEWAY).is_recoverable());
        assert!(SyncError::HttpStatus(reqwest::StatusCode::TOO_MANY_REQUESTS).is_recoverable());
        assert!(!SyncError::HttpStatus(reqwest::StatusCode::UNAUTHORIZED).is_recoverable());
        assert!(!SyncError::InvalidUrl("nope".into()).is_recoverable());
    }

    #[test]
    fn test_ocean_message() {
        assert_eq!(PinError::RejectedOcean.to_string(), "You can't pin the ocean");
    }
}

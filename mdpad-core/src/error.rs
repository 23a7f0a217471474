//! Error types for the mdpad client

use thiserror::Error;

/// Core error type for mdpad operations
#[derive(Error, Debug)]
pub enum PadError {
    /// Invalid input or arguments (maps to exit code 2 in the binary)
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// No valid session for an authenticated command
    #[error("You need to authenticate first. Run `mdpadctl login <email|ldap>`.")]
    AuthRequired,

    /// The server rejected the submitted credentials
    #[error("Login failed: the server rejected the credentials")]
    LoginRejected,

    /// Unexpected HTTP status where success (or a redirect) was expected
    #[error("Server returned HTTP {status} for {endpoint}")]
    Http { status: u16, endpoint: String },

    /// Network-level failures (connection refused, DNS, etc.)
    #[error("Transport error: {0}")]
    Transport(String),

    /// Response shape not as expected (missing redirect segment, bad JSON)
    #[error("Could not interpret server response: {0}")]
    Extraction(String),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization/deserialization errors
    #[error("Serialization error: {0}")]
    Serialization(String),
}

/// Result type alias for mdpad operations
pub type Result<T> = std::result::Result<T, PadError>;

impl PadError {
    /// Process exit code associated with this error.
    ///
    /// Usage errors exit 2, everything else (auth, transport,
    /// extraction, I/O) exits 1.
    pub fn exit_code(&self) -> i32 {
        match self {
            PadError::InvalidInput(_) => 2,
            _ => 1,
        }
    }
}

impl From<serde_json::Error> for PadError {
    fn from(err: serde_json::Error) -> Self {
        PadError::Serialization(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_serde_json_error_conversion() {
        let json_err = serde_json::from_str::<serde_json::Value>("not json").unwrap_err();
        let pad_err: PadError = json_err.into();

        match pad_err {
            PadError::Serialization(msg) => assert!(!msg.is_empty()),
            _ => panic!("Expected Serialization error"),
        }
    }

    #[test]
    fn test_io_error_conversion() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let pad_err: PadError = io_err.into();

        match pad_err {
            PadError::Io(e) => assert_eq!(e.kind(), std::io::ErrorKind::NotFound),
            _ => panic!("Expected Io error"),
        }
    }

    #[test]
    fn test_error_display() {
        let err = PadError::Http {
            status: 403,
            endpoint: "new".to_string(),
        };
        assert_eq!(format!("{}", err), "Server returned HTTP 403 for new");

        let err = PadError::InvalidInput("missing note id".to_string());
        assert_eq!(format!("{}", err), "Invalid input: missing note id");

        let err = PadError::AuthRequired;
        assert!(format!("{}", err).contains("authenticate"));
    }

    #[test]
    fn test_exit_codes() {
        assert_eq!(PadError::InvalidInput("x".into()).exit_code(), 2);
        assert_eq!(PadError::AuthRequired.exit_code(), 1);
        assert_eq!(PadError::LoginRejected.exit_code(), 1);
        assert_eq!(
            PadError::Http {
                status: 500,
                endpoint: "me".into()
            }
            .exit_code(),
            1
        );
    }
}

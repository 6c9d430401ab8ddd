//! Error handling for the poll

/// Result type alias for the poll
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for the poll
///
/// Expected voting outcomes (a repeat voter, an unknown option) are not
/// errors; they are reported through [`crate::ballot::CastOutcome`].
#[derive(thiserror::Error, Debug)]
pub enum Error {
    /// The persisted store could not be read or written
    #[error("Persistence unavailable: {message}")]
    Persistence { message: String },

    /// Invalid configuration values
    #[error("Configuration error: {message}")]
    Config { message: String },

    /// Validation errors
    #[error("Validation failed: {field}")]
    Validation { field: String },

    /// Serialization errors
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Filesystem errors from the file-backed store
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Create a new persistence error
    pub fn persistence(message: impl Into<String>) -> Self {
        Self::Persistence {
            message: message.into(),
        }
    }

    /// Create a new configuration error
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Create a new validation error
    pub fn validation(field: impl Into<String>) -> Self {
        Self::Validation {
            field: field.into(),
        }
    }

    /// Whether the error means state will not survive a restart
    pub fn is_persistence(&self) -> bool {
        matches!(self, Self::Persistence { .. } | Self::Io(_))
    }
}

/// Convenience macros for creating specific error types
#[macro_export]
macro_rules! persistence_error {
    ($msg:expr) => {
        $crate::Error::persistence($msg)
    };
    ($fmt:expr, $($arg:tt)*) => {
        $crate::Error::persistence(format!($fmt, $($arg)*))
    };
}

#[macro_export]
macro_rules! config_error {
    ($msg:expr) => {
        $crate::Error::config($msg)
    };
    ($fmt:expr, $($arg:tt)*) => {
        $crate::Error::config(format!($fmt, $($arg)*))
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_creation() {
        let persistence_err = Error::persistence("quota exceeded");
        assert!(matches!(persistence_err, Error::Persistence { .. }));
        assert!(persistence_err.is_persistence());

        let config_err = Error::config("bad value");
        assert!(matches!(config_err, Error::Config { .. }));
        assert!(!config_err.is_persistence());

        let validation_err = Error::validation("options");
        assert!(matches!(validation_err, Error::Validation { .. }));
    }

    #[test]
    fn test_error_macros() {
        let persistence_err = persistence_error!("store {} is read-only", "votes");
        assert_eq!(
            persistence_err.to_string(),
            "Persistence unavailable: store votes is read-only"
        );

        let config_err = config_error!("test error");
        assert!(matches!(config_err, Error::Config { .. }));
    }

    #[test]
    fn test_io_errors_count_as_persistence() {
        let io = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied");
        assert!(Error::from(io).is_persistence());
    }
}

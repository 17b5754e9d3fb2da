use std::path::PathBuf;
use thiserror::Error;

/// Application error types
#[derive(Error, Debug)]
pub enum AppError {
    /// The requested capture interface does not exist
    #[error("Interface '{interface}' not found. Run `myrmyr interface` to list available interfaces")]
    InterfaceNotFound { interface: String },

    /// The process lacks the privilege needed to capture on the interface
    #[error("Permission denied opening interface '{interface}': {reason}. Capture usually requires root or CAP_NET_RAW")]
    PermissionDenied { interface: String, reason: String },

    /// The capture device failed while opening or reading
    #[error("Capture device failure on interface '{interface}': {reason}")]
    DeviceFailure { interface: String, reason: String },

    /// Error from I/O operations
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The capture library could not create or write the output file
    #[error("Cannot write capture output '{}': {reason}", .path.display())]
    OutputFile { path: PathBuf, reason: String },

    /// Bulk capture count did not resolve to a positive integer
    #[error("Invalid packet count '{0}': expected a positive integer")]
    InvalidCount(String),

    /// Invalid configuration value
    #[error("Configuration error: {0}")]
    Config(String),
}

impl AppError {
    /// Errors that belong to the interface family (missing, privilege, device)
    pub fn is_interface_error(&self) -> bool {
        matches!(
            self,
            AppError::InterfaceNotFound { .. }
                | AppError::PermissionDenied { .. }
                | AppError::DeviceFailure { .. }
        )
    }

    /// Errors raised while creating or writing a capture artifact
    pub fn is_io_error(&self) -> bool {
        matches!(self, AppError::Io(_) | AppError::OutputFile { .. })
    }
}

impl Clone for AppError {
    fn clone(&self) -> Self {
        match self {
            AppError::InterfaceNotFound { interface } => AppError::InterfaceNotFound {
                interface: interface.clone(),
            },
            AppError::PermissionDenied { interface, reason } => AppError::PermissionDenied {
                interface: interface.clone(),
                reason: reason.clone(),
            },
            AppError::DeviceFailure { interface, reason } => AppError::DeviceFailure {
                interface: interface.clone(),
                reason: reason.clone(),
            },
            // io::Error is not Clone; kind and message survive
            AppError::Io(e) => AppError::Io(std::io::Error::new(e.kind(), e.to_string())),
            AppError::OutputFile { path, reason } => AppError::OutputFile {
                path: path.clone(),
                reason: reason.clone(),
            },
            AppError::InvalidCount(text) => AppError::InvalidCount(text.clone()),
            AppError::Config(message) => AppError::Config(message.clone()),
        }
    }
}

/// Result type for application
pub type AppResult<T> = Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_families() {
        let not_found = AppError::InterfaceNotFound { interface: "eth9".into() };
        let denied = AppError::PermissionDenied {
            interface: "eth0".into(),
            reason: "Operation not permitted".into(),
        };
        let io = AppError::Io(std::io::Error::new(std::io::ErrorKind::Other, "disk full"));

        assert!(not_found.is_interface_error());
        assert!(denied.is_interface_error());
        assert!(!io.is_interface_error());
        assert!(io.is_io_error());
        assert!(!AppError::InvalidCount("0".into()).is_io_error());
    }

    #[test]
    fn test_messages_name_interface_and_cause() {
        let not_found = AppError::InterfaceNotFound { interface: "eth9".into() }.to_string();
        let denied = AppError::PermissionDenied {
            interface: "eth0".into(),
            reason: "socket: Operation not permitted".into(),
        }
        .to_string();

        assert!(not_found.contains("eth9"));
        assert!(not_found.contains("not found"));
        assert!(denied.contains("eth0"));
        assert!(denied.contains("Permission denied"));
    }

    #[test]
    fn test_clone_keeps_variant_and_message() {
        let denied = AppError::PermissionDenied {
            interface: "eth0".into(),
            reason: "Operation not permitted".into(),
        };
        let copy = denied.clone();
        assert!(matches!(copy, AppError::PermissionDenied { .. }));
        assert_eq!(copy.to_string(), denied.to_string());

        let io = AppError::Io(std::io::Error::new(std::io::ErrorKind::PermissionDenied, "read-only"));
        match io.clone() {
            AppError::Io(e) => assert_eq!(e.kind(), std::io::ErrorKind::PermissionDenied),
            other => panic!("unexpected variant: {:?}", other),
        }
    }
}

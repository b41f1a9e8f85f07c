//! CLI Exit Codes
//!
//! Standard exit codes for CLI operations and automation.

use crate::config::ConfigError;
use crate::core::gpio::AdapterError;
use crate::core::power::PowerError;
use crate::core::probe::ProbeError;
use std::process::ExitCode;

/// Exit code constants
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExitCodes;

impl ExitCodes {
    /// Success
    pub const SUCCESS: u8 = 0;

    /// General error
    pub const ERROR: u8 = 1;

    /// Invalid arguments
    pub const INVALID_ARGS: u8 = 2;

    /// Connection failed
    pub const CONNECTION_FAILED: u8 = 3;

    /// Connection timeout
    pub const TIMEOUT: u8 = 4;

    /// Permission denied
    pub const PERMISSION_DENIED: u8 = 7;

    /// Configuration error
    pub const CONFIG_ERROR: u8 = 8;

    /// User cancelled
    pub const CANCELLED: u8 = 11;

    /// Device not found
    pub const DEVICE_NOT_FOUND: u8 = 12;

    /// Device I/O failed
    pub const DEVICE_ERROR: u8 = 13;

    /// Vendor library missing
    pub const LIBRARY_NOT_FOUND: u8 = 18;
}

/// CLI operation result
#[derive(Debug)]
pub enum CliResult {
    /// Success with optional message
    Success(Option<String>),

    /// Error with code and message
    Error(u8, String),
}

impl CliResult {
    pub fn success() -> Self {
        Self::Success(None)
    }

    pub fn success_with_message(msg: impl Into<String>) -> Self {
        Self::Success(Some(msg.into()))
    }

    pub fn error(code: u8, msg: impl Into<String>) -> Self {
        Self::Error(code, msg.into())
    }

    /// Get exit code
    pub fn code(&self) -> u8 {
        match self {
            Self::Success(_) => ExitCodes::SUCCESS,
            Self::Error(code, _) => *code,
        }
    }

    /// Get message
    pub fn message(&self) -> Option<&str> {
        match self {
            Self::Success(Some(msg)) | Self::Error(_, msg) => Some(msg),
            Self::Success(None) => None,
        }
    }

    /// Convert to ExitCode
    pub fn to_exit_code(&self) -> ExitCode {
        ExitCode::from(self.code())
    }

    /// Is success?
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success(_))
    }
}

impl From<std::io::Error> for CliResult {
    fn from(err: std::io::Error) -> Self {
        use std::io::ErrorKind;

        let code = match err.kind() {
            ErrorKind::PermissionDenied => ExitCodes::PERMISSION_DENIED,
            ErrorKind::ConnectionRefused => ExitCodes::CONNECTION_FAILED,
            ErrorKind::TimedOut => ExitCodes::TIMEOUT,
            _ => ExitCodes::ERROR,
        };

        Self::Error(code, err.to_string())
    }
}

impl From<AdapterError> for CliResult {
    fn from(err: AdapterError) -> Self {
        let code = match &err {
            AdapterError::LibraryNotFound(_) | AdapterError::MissingFunction(_) => {
                ExitCodes::LIBRARY_NOT_FOUND
            }
            AdapterError::OpenFailed { .. } => ExitCodes::DEVICE_NOT_FOUND,
            AdapterError::OperationFailed { .. } | AdapterError::EnumerationFailed { .. } => {
                ExitCodes::DEVICE_ERROR
            }
        };
        Self::Error(code, err.to_string())
    }
}

impl From<PowerError> for CliResult {
    fn from(err: PowerError) -> Self {
        match err {
            PowerError::Adapter(e) => e.into(),
            PowerError::Marker(e) => e.into(),
        }
    }
}

impl From<ProbeError> for CliResult {
    fn from(err: ProbeError) -> Self {
        match err {
            ProbeError::ConnectionFailed { .. } | ProbeError::BindFailed { .. } => {
                Self::Error(ExitCodes::CONNECTION_FAILED, err.to_string())
            }
            ProbeError::Timeout(_) | ProbeError::ReplyTimeout(_) => {
                Self::Error(ExitCodes::TIMEOUT, err.to_string())
            }
            ProbeError::Interrupted => Self::Error(ExitCodes::CANCELLED, err.to_string()),
            ProbeError::Io(e) => e.into(),
        }
    }
}

impl From<ConfigError> for CliResult {
    fn from(err: ConfigError) -> Self {
        Self::Error(ExitCodes::CONFIG_ERROR, err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_result() {
        let success = CliResult::success();
        assert!(success.is_success());
        assert_eq!(success.code(), 0);

        let error = CliResult::error(3, "Connection failed");
        assert!(!error.is_success());
        assert_eq!(error.code(), 3);
        assert_eq!(error.message(), Some("Connection failed"));
    }

    #[test]
    fn test_from_power_error() {
        let result = CliResult::from(PowerError::Adapter(AdapterError::OpenFailed {
            port: 0,
            code: -7,
        }));
        assert_eq!(result.code(), ExitCodes::DEVICE_NOT_FOUND);
    }

    #[test]
    fn test_from_probe_error() {
        assert_eq!(
            CliResult::from(ProbeError::Timeout(10)).code(),
            ExitCodes::TIMEOUT
        );
        assert_eq!(
            CliResult::from(ProbeError::ReplyTimeout(1)).code(),
            ExitCodes::TIMEOUT
        );
        assert_eq!(
            CliResult::from(ProbeError::Interrupted).code(),
            ExitCodes::CANCELLED
        );
    }
}

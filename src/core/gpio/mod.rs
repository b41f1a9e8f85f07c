//! GPIO access to the USB relay adapter
//!
//! Supports:
//! - Total Phase Aardvark adapters (vendor library loaded at runtime)
//! - A simulated adapter for dry runs and tests

mod aardvark;
mod sim;

pub use aardvark::{find_devices, AardvarkAdapter, DeviceInfo};
pub use sim::{GpioOp, SimulatedAdapter};

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use std::str::FromStr;
use thiserror::Error;

/// All pins are controlled by the GPIO subsystem
pub const AA_CONFIG_GPIO_ONLY: u8 = 0x00;

/// Disable the external I2C line pull-ups
pub const AA_I2C_PULLUP_NONE: u8 = 0x00;

/// Direction mask that turns all six adapter pins into outputs
pub const GPIO_ALL_OUTPUTS: u8 = 0x3f;

/// Adapter error types
#[derive(Error, Debug)]
pub enum AdapterError {
    /// Vendor library could not be loaded
    #[error("Unable to load adapter library: {0}")]
    LibraryNotFound(String),

    /// Vendor library is missing an entry point
    #[error("Adapter library is missing function {0}")]
    MissingFunction(&'static str),

    /// Device could not be opened
    #[error("Unable to open Aardvark device on port {port} (error code {code})")]
    OpenFailed {
        /// Port number that was requested
        port: u16,
        /// Vendor status code
        code: i32,
    },

    /// An operation on an open device failed
    #[error("{op} failed: {status} (error code {code})")]
    OperationFailed {
        /// Operation name
        op: &'static str,
        /// Vendor status name
        status: &'static str,
        /// Vendor status code
        code: i32,
    },

    /// Device enumeration failed
    #[error("Device enumeration failed: {status} (error code {code})")]
    EnumerationFailed {
        /// Vendor status name
        status: &'static str,
        /// Vendor status code
        code: i32,
    },
}

impl AdapterError {
    /// Vendor status code carried by this error, if any
    pub fn code(&self) -> Option<i32> {
        match self {
            Self::OpenFailed { code, .. }
            | Self::OperationFailed { code, .. }
            | Self::EnumerationFailed { code, .. } => Some(*code),
            Self::LibraryNotFound(_) | Self::MissingFunction(_) => None,
        }
    }
}

/// Human-readable name for an Aardvark status code
pub fn status_string(code: i32) -> &'static str {
    match code {
        0 => "AA_OK",
        -1 => "AA_UNABLE_TO_LOAD_LIBRARY",
        -2 => "AA_UNABLE_TO_LOAD_DRIVER",
        -3 => "AA_UNABLE_TO_LOAD_FUNCTION",
        -4 => "AA_INCOMPATIBLE_LIBRARY",
        -5 => "AA_INCOMPATIBLE_DEVICE",
        -6 => "AA_COMMUNICATION_ERROR",
        -7 => "AA_UNABLE_TO_OPEN",
        -8 => "AA_UNABLE_TO_CLOSE",
        -9 => "AA_INVALID_HANDLE",
        -10 => "AA_CONFIG_ERROR",
        -400 => "AA_GPIO_NOT_AVAILABLE",
        _ => "AA_UNKNOWN_STATUS",
    }
}

/// GPIO adapter trait
///
/// The handle is released when the adapter is dropped.
#[cfg_attr(test, mockall::automock)]
pub trait GpioAdapter {
    /// Port number the adapter was opened on
    fn port(&self) -> u16;

    /// Select which subsystems own the adapter pins
    fn configure(&mut self, config: u8) -> Result<(), AdapterError>;

    /// Set pin directions (1 = output)
    fn gpio_direction(&mut self, mask: u8) -> Result<(), AdapterError>;

    /// Enable or disable the I2C pull-up resistors
    fn i2c_pullup(&mut self, mask: u8) -> Result<(), AdapterError>;

    /// Drive the output pins
    fn gpio_set(&mut self, value: u8) -> Result<(), AdapterError>;
}

impl<A: GpioAdapter + ?Sized> GpioAdapter for Box<A> {
    fn port(&self) -> u16 {
        (**self).port()
    }

    fn configure(&mut self, config: u8) -> Result<(), AdapterError> {
        (**self).configure(config)
    }

    fn gpio_direction(&mut self, mask: u8) -> Result<(), AdapterError> {
        (**self).gpio_direction(mask)
    }

    fn i2c_pullup(&mut self, mask: u8) -> Result<(), AdapterError> {
        (**self).i2c_pullup(mask)
    }

    fn gpio_set(&mut self, value: u8) -> Result<(), AdapterError> {
        (**self).gpio_set(value)
    }
}

/// Adapter backend selection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Backend {
    /// Real Aardvark hardware
    #[default]
    Aardvark,
    /// Simulated adapter (no hardware access)
    Sim,
    /// Simulated adapter that is never found on the bus
    #[serde(rename = "sim-unplugged")]
    SimUnplugged,
}

impl fmt::Display for Backend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Aardvark => write!(f, "aardvark"),
            Self::Sim => write!(f, "sim"),
            Self::SimUnplugged => write!(f, "sim-unplugged"),
        }
    }
}

impl FromStr for Backend {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "aardvark" | "hw" => Ok(Self::Aardvark),
            "sim" | "simulated" => Ok(Self::Sim),
            "sim-unplugged" => Ok(Self::SimUnplugged),
            other => Err(format!("unknown backend: {other}")),
        }
    }
}

/// Open an adapter on the given port
pub fn open_adapter(
    backend: Backend,
    port: u16,
    library: Option<&Path>,
) -> Result<Box<dyn GpioAdapter>, AdapterError> {
    match backend {
        Backend::Aardvark => {
            let adapter = AardvarkAdapter::open(port, library)?;
            Ok(Box::new(adapter))
        }
        Backend::Sim => Ok(Box::new(SimulatedAdapter::open(port))),
        Backend::SimUnplugged => Ok(Box::new(SimulatedAdapter::open_failing(port)?)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_strings() {
        assert_eq!(status_string(-7), "AA_UNABLE_TO_OPEN");
        assert_eq!(status_string(-9), "AA_INVALID_HANDLE");
        assert_eq!(status_string(-1234), "AA_UNKNOWN_STATUS");
    }

    #[test]
    fn test_backend_parse() {
        assert_eq!("sim".parse::<Backend>().unwrap(), Backend::Sim);
        assert_eq!("Aardvark".parse::<Backend>().unwrap(), Backend::Aardvark);
        assert_eq!(
            "sim-unplugged".parse::<Backend>().unwrap(),
            Backend::SimUnplugged
        );
        assert!("ftdi".parse::<Backend>().is_err());
    }

    #[test]
    fn test_open_simulated() {
        let adapter = open_adapter(Backend::Sim, 3, None).unwrap();
        assert_eq!(adapter.port(), 3);
    }

    #[test]
    fn test_open_unplugged() {
        assert!(matches!(
            open_adapter(Backend::SimUnplugged, 5, None),
            Err(AdapterError::OpenFailed { port: 5, code: -7 })
        ));
    }

    #[test]
    fn test_error_code() {
        let err = AdapterError::OpenFailed { port: 0, code: -7 };
        assert_eq!(err.code(), Some(-7));
        assert!(err.to_string().contains("port 0"));
        assert_eq!(AdapterError::MissingFunction("c_aa_open").code(), None);
    }
}

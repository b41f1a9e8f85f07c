//! # Benchctl Core Library
//!
//! Small bench utilities:
//! - Relay power control through the GPIO pins of a Total Phase Aardvark
//!   USB adapter (reset / on / off), with the power state remembered in a
//!   marker file
//! - TCP probes: a one-shot client and a single-peer echo/sink server
//!
//! ## Example
//!
//! ```rust,no_run
//! use benchctl_core::{MarkerFile, PowerController, PowerMode, SimulatedAdapter};
//!
//! let adapter = SimulatedAdapter::open(0);
//! let mut controller = PowerController::new(adapter, MarkerFile::default());
//! let outcome = controller.apply(PowerMode::On)?;
//! assert!(outcome.marker_after);
//! # Ok::<(), benchctl_core::PowerError>(())
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod cli;
pub mod config;
pub mod core;

// Re-exports for convenience
pub use crate::cli::{CliResult, ExitCodes, OutputFormat};
pub use crate::config::{AppConfig, ConfigError, PowerSettings};
pub use crate::core::gpio::{
    open_adapter, AardvarkAdapter, AdapterError, Backend, GpioAdapter, SimulatedAdapter,
};
pub use crate::core::power::{
    MarkerFile, PowerController, PowerError, PowerMode, PowerOutcome, RelayPattern,
};
pub use crate::core::probe::{
    run_client, ClientConfig, ClientReport, ProbeError, ProbeServer, ServerConfig, ServerMode,
    SessionReport,
};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Library name
pub const NAME: &str = env!("CARGO_PKG_NAME");

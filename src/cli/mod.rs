//! CLI Module
//!
//! Provides command-line interface functionality including:
//! - Exit codes for automation
//! - Output formatting for reports and payloads

pub mod exit_codes;
pub mod output;

pub use exit_codes::{CliResult, ExitCodes};
pub use output::{format_payload, output_data, output_report, OutputFormat};

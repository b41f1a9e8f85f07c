//! Report and payload printing

use clap::ValueEnum;
use serde::Serialize;
use std::io::{self, Write};

/// CLI output format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable text
    #[default]
    Text,
    /// JSON format for scripting
    Json,
    /// Hex dump of payloads
    Hex,
}

/// Render payload bytes for the given format
pub fn format_payload(format: OutputFormat, data: &[u8]) -> String {
    match format {
        OutputFormat::Hex => hex::encode(data),
        OutputFormat::Json => serde_json::json!({
            "hex": hex::encode(data),
            "ascii": String::from_utf8_lossy(data),
        })
        .to_string(),
        OutputFormat::Text => String::from_utf8_lossy(data).into_owned(),
    }
}

/// Print payload bytes to stdout
pub fn output_data(format: OutputFormat, data: &[u8]) {
    let mut stdout = io::stdout().lock();
    let _ = writeln!(stdout, "{}", format_payload(format, data));
    let _ = stdout.flush();
}

/// Print a report: JSON in JSON mode, otherwise the text rendering
pub fn output_report<T: Serialize>(format: OutputFormat, report: &T, text: &str) {
    match format {
        OutputFormat::Json => match serde_json::to_string_pretty(report) {
            Ok(json) => println!("{json}"),
            Err(e) => tracing::error!("Could not serialize report: {}", e),
        },
        OutputFormat::Text | OutputFormat::Hex => println!("{text}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_payload() {
        assert_eq!(format_payload(OutputFormat::Hex, b"\x01AB"), "014142");
        assert_eq!(format_payload(OutputFormat::Text, b"hello"), "hello");

        let json: serde_json::Value =
            serde_json::from_str(&format_payload(OutputFormat::Json, b"hi")).unwrap();
        assert_eq!(json["hex"], "6869");
        assert_eq!(json["ascii"], "hi");
    }
}

//! aardvark - relay power control
//!
//! Drives the GPIO pins of an Aardvark USB adapter wired to a relay board:
//!
//! ```text
//! aardvark <port> <-r | -n | -f>
//! ```
//!
//! `-r` pulses reset (only while the system is marked on), `-n` powers on,
//! `-f` powers off. The power state is kept in a marker file named `on` in
//! the working directory.

use benchctl_core::cli::{output_report, CliResult, ExitCodes, OutputFormat};
use benchctl_core::config::AppConfig;
use benchctl_core::core::gpio::{self, AdapterError, Backend};
use benchctl_core::core::logging;
use benchctl_core::core::power::{MarkerFile, PowerController, PowerMode, PowerOutcome};
use clap::{Args, CommandFactory, Parser};
use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;

/// Relay power control through an Aardvark adapter
#[derive(Parser, Debug)]
#[command(
    name = "aardvark",
    version,
    about = "Power-cycle a bench system through Aardvark GPIO relays",
    override_usage = "aardvark <PORT> <-r | -n | -f>\n       aardvark --list"
)]
struct Cli {
    /// Adapter port number
    #[arg(required_unless_present = "list")]
    port: Option<u16>,

    #[command(flatten)]
    mode: ModeArgs,

    /// List attached adapters and exit
    #[arg(long, conflicts_with_all = ["reset", "on", "off"])]
    list: bool,

    /// Marker file recording the power-on state
    #[arg(long)]
    marker: Option<PathBuf>,

    /// Adapter backend (aardvark, sim)
    #[arg(long)]
    backend: Option<Backend>,

    /// Path to the vendor library
    #[arg(long)]
    library: Option<PathBuf>,

    /// Reset pulse width in milliseconds
    #[arg(long)]
    pulse_ms: Option<u64>,

    /// Configuration file
    #[arg(long, env = "BENCHCTL_CONFIG")]
    config: Option<PathBuf>,

    /// Also log to this file
    #[arg(long)]
    log_file: Option<PathBuf>,

    /// Output format
    #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
    format: OutputFormat,

    /// Verbose output
    #[arg(short, long)]
    verbose: bool,

    /// Quiet mode (errors only)
    #[arg(short, long)]
    quiet: bool,
}

#[derive(Args, Debug)]
#[group(multiple = false)]
struct ModeArgs {
    /// Reset the system (only if it is on)
    #[arg(short = 'r', long = "reset")]
    reset: bool,

    /// Power on
    #[arg(short = 'n', long = "on")]
    on: bool,

    /// Power off
    #[arg(short = 'f', long = "off")]
    off: bool,
}

impl ModeArgs {
    fn mode(&self) -> Option<PowerMode> {
        if self.reset {
            Some(PowerMode::Reset)
        } else if self.on {
            Some(PowerMode::On)
        } else if self.off {
            Some(PowerMode::Off)
        } else {
            None
        }
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let request = if cli.list {
        None
    } else {
        match requested(&cli) {
            Ok(request) => Some(request),
            Err(e) => return report(e),
        }
    };

    let config = match AppConfig::load(cli.config.as_deref()) {
        Ok(config) => config,
        Err(e) => return report(CliResult::from(e)),
    };

    let mut log_config = config.logging.clone().with_verbosity(cli.verbose, cli.quiet);
    if cli.log_file.is_some() {
        log_config.file.clone_from(&cli.log_file);
    }
    let _guard = match logging::init(&log_config) {
        Ok(guard) => guard,
        Err(e) => return report(CliResult::error(ExitCodes::CONFIG_ERROR, e.to_string())),
    };

    report(match request {
        Some((port, mode)) => run(&cli, &config, port, mode),
        None => list_devices(&cli, &config),
    })
}

/// Port and mode, checked before any configuration or logging is touched
fn requested(cli: &Cli) -> Result<(u16, PowerMode), CliResult> {
    let Some(mode) = cli.mode.mode() else {
        let mut cmd = Cli::command();
        let usage = cmd.render_usage();
        return Err(CliResult::error(
            ExitCodes::INVALID_ARGS,
            format!("Missing mode flag: one of -r, -n, -f\n{usage}"),
        ));
    };
    // clap enforces presence unless --list
    let Some(port) = cli.port else {
        return Err(CliResult::error(ExitCodes::INVALID_ARGS, "Missing adapter port"));
    };
    Ok((port, mode))
}

fn report(result: CliResult) -> ExitCode {
    match &result {
        CliResult::Success(Some(msg)) => println!("{msg}"),
        CliResult::Error(_, msg) => eprintln!("{msg}"),
        CliResult::Success(None) => {}
    }
    result.to_exit_code()
}

fn run(cli: &Cli, config: &AppConfig, port: u16, mode: PowerMode) -> CliResult {
    let backend = cli.backend.unwrap_or(config.power.backend);
    let library = cli.library.as_deref().or(config.power.library.as_deref());
    let marker = MarkerFile::new(cli.marker.clone().unwrap_or_else(|| config.power.marker.clone()));
    let pulse = cli
        .pulse_ms
        .map_or_else(|| config.power.pulse(), Duration::from_millis);

    tracing::debug!(%backend, port, marker = %marker.path().display(), "Opening adapter");

    let adapter = match gpio::open_adapter(backend, port, library) {
        Ok(adapter) => adapter,
        Err(e) => return open_failed(port, e),
    };

    let mut controller = PowerController::new(adapter, marker).reset_pulse(pulse);
    let result = controller.apply(mode);
    // Close the adapter before reporting
    drop(controller);

    match result {
        Ok(outcome) => {
            output_report(cli.format, &outcome, &describe(&outcome));
            CliResult::success()
        }
        Err(e) => e.into(),
    }
}

fn open_failed(port: u16, err: AdapterError) -> CliResult {
    let code = err.code();
    let mut result = CliResult::from(err);
    if let (Some(code), CliResult::Error(_, msg)) = (code, &mut result) {
        *msg = format!("Unable to open Aardvark device on port {port}\nError code = {code}");
    }
    result
}

fn describe(outcome: &PowerOutcome) -> String {
    match (outcome.mode, outcome.signalled) {
        (PowerMode::Reset, false) => "System is off, reset skipped".to_string(),
        (PowerMode::Reset, true) => format!("Reset pulsed on port {}", outcome.port),
        (PowerMode::On, _) => format!("Power on (port {})", outcome.port),
        (PowerMode::Off, _) => format!("Power off (port {})", outcome.port),
    }
}

fn list_devices(cli: &Cli, config: &AppConfig) -> CliResult {
    let backend = cli.backend.unwrap_or(config.power.backend);
    let library = cli.library.as_deref().or(config.power.library.as_deref());

    if matches!(backend, Backend::Sim | Backend::SimUnplugged) {
        return CliResult::success_with_message("Simulated backend: no devices to list");
    }

    let devices = match gpio::find_devices(library) {
        Ok(devices) => devices,
        Err(e) => return e.into(),
    };

    match cli.format {
        OutputFormat::Json => output_report(cli.format, &devices, ""),
        OutputFormat::Text | OutputFormat::Hex => {
            if devices.is_empty() {
                println!("No Aardvark devices found.");
            } else {
                println!("{} device(s) found:", devices.len());
                for device in &devices {
                    let status = if device.in_use { "(in-use)" } else { "(avail)" };
                    println!("  port = {:<3} {}", device.port, status);
                }
            }
        }
    }

    CliResult::success()
}

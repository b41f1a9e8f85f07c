//! tcpprobe - minimal TCP client/server for bench network testing
//!
//! `tcpprobe client` connects, sends a payload and closes.
//! `tcpprobe server` accepts one peer, prints each received chunk in the
//! selected output format, and echoes (or discards) it.

use benchctl_core::cli::{output_data, output_report, CliResult, ExitCodes, OutputFormat};
use benchctl_core::config::AppConfig;
use benchctl_core::core::logging;
use benchctl_core::core::probe::{run_client, ProbeServer, ServerMode};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::process::ExitCode;

/// TCP probe CLI
#[derive(Parser, Debug)]
#[command(name = "tcpprobe", version, about = "Minimal TCP test client and server")]
struct Cli {
    /// Configuration file
    #[arg(long, global = true, env = "BENCHCTL_CONFIG")]
    config: Option<PathBuf>,

    /// Also log to this file
    #[arg(long, global = true)]
    log_file: Option<PathBuf>,

    /// Output format
    #[arg(long, global = true, value_enum, default_value_t = OutputFormat::Text)]
    format: OutputFormat,

    /// Verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Quiet mode (errors only)
    #[arg(short, long, global = true)]
    quiet: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Connect and send a payload
    Client {
        /// Host address
        #[arg(short = 'H', long)]
        host: Option<String>,

        /// Port number
        #[arg(short, long)]
        port: Option<u16>,

        /// Payload text
        #[arg(short, long)]
        message: Option<String>,

        /// Number of times to send the payload
        #[arg(short = 'n', long)]
        count: Option<u32>,

        /// Delay between sends (milliseconds)
        #[arg(long)]
        interval_ms: Option<u64>,

        /// Read a reply after each send (gives up after --timeout seconds)
        #[arg(short, long)]
        reply: bool,

        /// Connection and reply timeout (seconds)
        #[arg(long)]
        timeout: Option<u64>,
    },

    /// Accept one connection and serve it
    Server {
        /// Address to bind
        #[arg(short, long)]
        bind: Option<String>,

        /// Port number
        #[arg(short, long)]
        port: Option<u16>,

        /// What to do with received data (echo, sink)
        #[arg(long)]
        mode: Option<ServerMode>,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

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

    let result = match &cli.command {
        Commands::Client {
            host,
            port,
            message,
            count,
            interval_ms,
            reply,
            timeout,
        } => {
            let mut client = config.client.clone();
            if let Some(host) = host {
                client.host.clone_from(host);
            }
            if let Some(message) = message {
                client.message.clone_from(message);
            }
            client.port = port.unwrap_or(client.port);
            client.count = count.unwrap_or(client.count);
            client.interval_ms = interval_ms.unwrap_or(client.interval_ms);
            client.timeout_secs = timeout.unwrap_or(client.timeout_secs);
            client.await_reply |= *reply;

            match run_client(&client).await {
                Ok(report) => {
                    for data in &report.replies {
                        output_data(cli.format, data);
                    }
                    let text = format!(
                        "Sent {} bytes in {} send(s) to {}",
                        report.bytes_sent, report.sends, report.peer
                    );
                    output_report(cli.format, &report, &text);
                    CliResult::success()
                }
                Err(e) => e.into(),
            }
        }
        Commands::Server { bind, port, mode } => {
            let mut server = config.server.clone();
            if let Some(bind) = bind {
                server.bind.clone_from(bind);
            }
            server.port = port.unwrap_or(server.port);
            server.mode = mode.unwrap_or(server.mode);

            match serve(&server, cli.format).await {
                Ok(()) => CliResult::success(),
                Err(e) => e,
            }
        }
    };

    report(result)
}

async fn serve(
    config: &benchctl_core::ServerConfig,
    format: OutputFormat,
) -> Result<(), CliResult> {
    let server = ProbeServer::bind(config).await.map_err(CliResult::from)?;
    let report = server
        .serve_one_until_interrupted(|chunk: &[u8]| output_data(format, chunk))
        .await
        .map_err(CliResult::from)?;

    let text = format!(
        "{} from {}: {} bytes in {} chunk(s), {} echoed",
        report.mode, report.peer, report.bytes_received, report.chunks, report.bytes_echoed
    );
    output_report(format, &report, &text);
    Ok(())
}

fn report(result: CliResult) -> ExitCode {
    match &result {
        CliResult::Success(Some(msg)) => println!("{msg}"),
        CliResult::Error(_, msg) => eprintln!("{msg}"),
        CliResult::Success(None) => {}
    }
    result.to_exit_code()
}

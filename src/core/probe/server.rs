//! Single-peer TCP probe server

use super::{ProbeError, DEFAULT_BUFFER_SIZE};
use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::net::SocketAddr;
use std::str::FromStr;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};

/// What the server does with received bytes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ServerMode {
    /// Write every chunk back to the peer
    #[default]
    Echo,
    /// Read and discard until the peer disconnects
    Sink,
}

impl fmt::Display for ServerMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Echo => write!(f, "echo"),
            Self::Sink => write!(f, "sink"),
        }
    }
}

impl FromStr for ServerMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "echo" => Ok(Self::Echo),
            "sink" | "idle" => Ok(Self::Sink),
            other => Err(format!("unknown server mode: {other}")),
        }
    }
}

/// Server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Address to bind
    pub bind: String,
    /// Port to listen on
    pub port: u16,
    /// Echo or sink
    pub mode: ServerMode,
    /// Receive buffer size
    pub buffer_size: usize,
}

impl ServerConfig {
    /// Create a new server configuration
    pub fn new(bind: &str, port: u16) -> Self {
        Self {
            bind: bind.to_string(),
            port,
            ..Self::default()
        }
    }

    /// Set mode
    #[must_use]
    pub fn mode(mut self, mode: ServerMode) -> Self {
        self.mode = mode;
        self
    }

    /// `bind:port`
    pub fn address(&self) -> String {
        format!("{}:{}", self.bind, self.port)
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: "192.168.1.10".to_string(),
            port: 60002,
            mode: ServerMode::Echo,
            buffer_size: DEFAULT_BUFFER_SIZE,
        }
    }
}

/// Summary of the served connection
#[derive(Debug, Clone, Serialize)]
pub struct SessionReport {
    /// Peer address
    pub peer: String,
    /// Accept time
    pub accepted_at: DateTime<Local>,
    /// Mode used
    pub mode: ServerMode,
    /// Chunks read
    pub chunks: u64,
    /// Total bytes read
    pub bytes_received: u64,
    /// Total bytes written back
    pub bytes_echoed: u64,
}

/// Listening probe server
pub struct ProbeServer {
    listener: TcpListener,
    config: ServerConfig,
}

impl ProbeServer {
    /// Bind the listening socket
    pub async fn bind(config: &ServerConfig) -> Result<Self, ProbeError> {
        let addr = config.address();
        let listener = TcpListener::bind(&addr)
            .await
            .map_err(|source| ProbeError::BindFailed { addr, source })?;

        tracing::info!("Listening on {} ({})", listener.local_addr()?, config.mode);
        Ok(Self {
            listener,
            config: config.clone(),
        })
    }

    /// Bound address (useful when binding port 0)
    pub fn local_addr(&self) -> Result<SocketAddr, ProbeError> {
        Ok(self.listener.local_addr()?)
    }

    /// Accept exactly one peer and serve it until it disconnects.
    ///
    /// Every received chunk is handed to `on_chunk` as it arrives; nothing
    /// is retained. The listener is closed when this returns.
    pub async fn serve_one<F>(self, on_chunk: F) -> Result<SessionReport, ProbeError>
    where
        F: FnMut(&[u8]),
    {
        let (conn, peer) = self.listener.accept().await?;
        drop(self.listener);
        tracing::info!("Accepted connection from {}", peer);

        serve_connection(conn, peer, &self.config, on_chunk).await
    }

    /// Like [`serve_one`](Self::serve_one), but gives up waiting for a peer on Ctrl-C
    pub async fn serve_one_until_interrupted<F>(
        self,
        on_chunk: F,
    ) -> Result<SessionReport, ProbeError>
    where
        F: FnMut(&[u8]),
    {
        let (conn, peer) = tokio::select! {
            accepted = self.listener.accept() => accepted?,
            _ = tokio::signal::ctrl_c() => {
                tracing::info!("Interrupted while waiting for a peer");
                return Err(ProbeError::Interrupted);
            }
        };
        drop(self.listener);
        tracing::info!("Accepted connection from {}", peer);

        serve_connection(conn, peer, &self.config, on_chunk).await
    }
}

async fn serve_connection<F>(
    mut conn: TcpStream,
    peer: SocketAddr,
    config: &ServerConfig,
    mut on_chunk: F,
) -> Result<SessionReport, ProbeError>
where
    F: FnMut(&[u8]),
{
    let mut report = SessionReport {
        peer: peer.to_string(),
        accepted_at: Local::now(),
        mode: config.mode,
        chunks: 0,
        bytes_received: 0,
        bytes_echoed: 0,
    };
    let mut buffer = vec![0u8; config.buffer_size.max(1)];

    loop {
        let n = conn.read(&mut buffer).await?;
        if n == 0 {
            break;
        }
        let chunk = &buffer[..n];
        report.chunks += 1;
        report.bytes_received += n as u64;
        tracing::debug!("Received {} bytes from {}", n, peer);
        on_chunk(chunk);

        if config.mode == ServerMode::Echo {
            conn.write_all(chunk).await?;
            report.bytes_echoed += n as u64;
        }
    }

    tracing::info!("Closing connection to {}", peer);
    conn.shutdown().await.ok();

    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;
    use std::sync::Arc;

    #[test]
    fn test_mode_parse() {
        assert_eq!("echo".parse::<ServerMode>().unwrap(), ServerMode::Echo);
        assert_eq!("IDLE".parse::<ServerMode>().unwrap(), ServerMode::Sink);
        assert!("reflect".parse::<ServerMode>().is_err());
    }

    #[test]
    fn test_default_config() {
        let config = ServerConfig::default();
        assert_eq!(config.address(), "192.168.1.10:60002");
        assert_eq!(config.mode, ServerMode::Echo);
    }

    #[tokio::test]
    async fn test_sink_does_not_echo() {
        let server = ProbeServer::bind(&ServerConfig::new("127.0.0.1", 0).mode(ServerMode::Sink))
            .await
            .unwrap();
        let addr = server.local_addr().unwrap();
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = seen.clone();
        let handle = tokio::spawn(
            server.serve_one(move |chunk: &[u8]| sink.lock().extend_from_slice(chunk)),
        );

        let mut client = TcpStream::connect(addr).await.unwrap();
        client.write_all(b"discard me").await.unwrap();
        client.shutdown().await.unwrap();

        let mut reply = Vec::new();
        client.read_to_end(&mut reply).await.unwrap();
        assert!(reply.is_empty());

        let report = handle.await.unwrap().unwrap();
        assert_eq!(report.bytes_received, 10);
        assert_eq!(report.bytes_echoed, 0);
        assert!(report.chunks >= 1);
        assert_eq!(seen.lock().as_slice(), b"discard me");
    }

    #[tokio::test]
    async fn test_bind_failure() {
        let first = ProbeServer::bind(&ServerConfig::new("127.0.0.1", 0)).await.unwrap();
        let port = first.local_addr().unwrap().port();

        let err = ProbeServer::bind(&ServerConfig::new("127.0.0.1", port))
            .await
            .err()
            .unwrap();
        assert!(matches!(err, ProbeError::BindFailed { .. }));
    }
}

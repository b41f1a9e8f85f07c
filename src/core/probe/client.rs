//! TCP probe client

use super::{ProbeError, DEFAULT_BUFFER_SIZE};
use bytes::{Bytes, BytesMut};
use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;

/// Default payload: a ruler that makes truncation easy to spot
pub const DEFAULT_MESSAGE: &str =
    "1---5---10---15---20---25---30---35---40---45---50---55---60---65---70---75---80";

/// Client configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// Target host
    pub host: String,
    /// Target port
    pub port: u16,
    /// Payload sent on each iteration
    pub message: String,
    /// Number of times the payload is sent
    pub count: u32,
    /// Delay between sends in milliseconds
    pub interval_ms: u64,
    /// Connection and reply timeout in seconds
    pub timeout_secs: u64,
    /// Read the reply after each send, waiting at most `timeout_secs`
    pub await_reply: bool,
    /// Receive buffer size
    pub buffer_size: usize,
}

impl ClientConfig {
    /// Create a new client configuration
    pub fn new(host: &str, port: u16) -> Self {
        Self {
            host: host.to_string(),
            port,
            ..Self::default()
        }
    }

    /// Set payload
    #[must_use]
    pub fn message(mut self, message: impl Into<String>) -> Self {
        self.message = message.into();
        self
    }

    /// Send the payload `count` times, `interval_ms` apart
    #[must_use]
    pub fn repeat(mut self, count: u32, interval_ms: u64) -> Self {
        self.count = count;
        self.interval_ms = interval_ms;
        self
    }

    /// Read a reply after each send
    #[must_use]
    pub fn await_reply(mut self, enabled: bool) -> Self {
        self.await_reply = enabled;
        self
    }

    /// Set timeout
    #[must_use]
    pub fn timeout(mut self, secs: u64) -> Self {
        self.timeout_secs = secs;
        self
    }

    /// `host:port`
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            host: "192.168.1.19".to_string(),
            port: 60001,
            message: DEFAULT_MESSAGE.to_string(),
            count: 1,
            interval_ms: 0,
            timeout_secs: 10,
            await_reply: false,
            buffer_size: DEFAULT_BUFFER_SIZE,
        }
    }
}

/// What the client did
#[derive(Debug, Clone, Serialize)]
pub struct ClientReport {
    /// Peer address
    pub peer: String,
    /// Local address of the socket
    pub local: String,
    /// Connection time
    pub connected_at: DateTime<Local>,
    /// Sends performed
    pub sends: u32,
    /// Total bytes written
    pub bytes_sent: u64,
    /// Replies read, one per send when enabled (each up to the payload length)
    #[serde(skip)]
    pub replies: Vec<Bytes>,
    /// Total bytes read
    pub bytes_received: u64,
}

/// Connect, send the payload, optionally read replies, and close
pub async fn run_client(config: &ClientConfig) -> Result<ClientReport, ProbeError> {
    let addr = config.address();
    tracing::info!("Connecting to {}", addr);

    let mut stream = tokio::time::timeout(
        Duration::from_secs(config.timeout_secs),
        TcpStream::connect(&addr),
    )
    .await
    .map_err(|_| ProbeError::Timeout(config.timeout_secs))?
    .map_err(|source| ProbeError::ConnectionFailed {
        addr: addr.clone(),
        source,
    })?;

    let mut report = ClientReport {
        peer: stream.peer_addr()?.to_string(),
        local: stream.local_addr()?.to_string(),
        connected_at: Local::now(),
        sends: 0,
        bytes_sent: 0,
        replies: Vec::new(),
        bytes_received: 0,
    };
    tracing::debug!("Connected {} -> {}", report.local, report.peer);

    let payload = config.message.as_bytes();
    let mut buffer = vec![0u8; config.buffer_size.max(1)];

    for i in 0..config.count {
        if i > 0 && config.interval_ms > 0 {
            tokio::time::sleep(Duration::from_millis(config.interval_ms)).await;
        }

        stream.write_all(payload).await?;
        stream.flush().await?;
        report.sends += 1;
        report.bytes_sent += payload.len() as u64;
        tracing::debug!("Sent {} bytes ({}/{})", payload.len(), i + 1, config.count);

        if config.await_reply {
            let reply = tokio::time::timeout(
                Duration::from_secs(config.timeout_secs),
                read_reply(&mut stream, &mut buffer, payload.len()),
            )
            .await
            .map_err(|_| ProbeError::ReplyTimeout(config.timeout_secs))??;
            let closed = reply.len() < payload.len();
            report.bytes_received += reply.len() as u64;
            if !reply.is_empty() {
                report.replies.push(reply);
            }
            if closed {
                tracing::info!("Peer closed the connection");
                break;
            }
        }
    }

    stream.shutdown().await.ok();
    tracing::info!(
        "Closed connection to {} ({} bytes sent, {} received)",
        report.peer,
        report.bytes_sent,
        report.bytes_received
    );

    Ok(report)
}

/// Read until `expected` bytes arrived or the peer closed
async fn read_reply(
    stream: &mut TcpStream,
    buffer: &mut [u8],
    expected: usize,
) -> Result<Bytes, ProbeError> {
    let mut reply = BytesMut::with_capacity(expected);
    while reply.len() < expected {
        let want = (expected - reply.len()).min(buffer.len());
        let n = stream.read(&mut buffer[..want]).await?;
        if n == 0 {
            break;
        }
        reply.extend_from_slice(&buffer[..n]);
    }
    Ok(reply.freeze())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::net::TcpListener;

    #[test]
    fn test_default_config() {
        let config = ClientConfig::default();
        assert_eq!(config.address(), "192.168.1.19:60001");
        assert_eq!(config.message.len(), 80);
        assert_eq!(config.count, 1);
    }

    #[tokio::test]
    async fn test_sends_payload_and_closes() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();

        let server = tokio::spawn(async move {
            let (mut conn, _) = listener.accept().await.unwrap();
            let mut received = Vec::new();
            conn.read_to_end(&mut received).await.unwrap();
            received
        });

        let config = ClientConfig::new("127.0.0.1", port)
            .message("ping")
            .repeat(3, 5);
        let report = run_client(&config).await.unwrap();
        assert_eq!(report.sends, 3);
        assert_eq!(report.bytes_sent, 12);

        assert_eq!(server.await.unwrap(), b"pingpingping");
    }

    #[tokio::test]
    async fn test_connection_refused() {
        // Bind then drop to get a port with nothing listening
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        drop(listener);

        let config = ClientConfig::new("127.0.0.1", port).timeout(2);
        let err = run_client(&config).await.unwrap_err();
        assert!(matches!(err, ProbeError::ConnectionFailed { .. }));
    }
}

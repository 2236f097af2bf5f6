use std::time::Duration;

use serde_json::Value;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::net::TcpStream;

use crate::protocol::error::{Result, RpcError};

/// Maximum response size (100 MB)
const MAX_MESSAGE_SIZE: usize = 100 * 1024 * 1024;

/// Read buffer chunk size
const READ_CHUNK: usize = 8 * 1024;

/// Raw TCP transport for jsonrpc2.
///
/// Opens a fresh connection for every call; there is no pooling.
///
/// # Wire Protocol
///
/// The request is written as a single JSON value followed by a newline. The
/// response is the first complete JSON value read back, terminated either by
/// a newline or by the server closing the connection:
///
/// ```text
/// -> {"method":"Foo.Bar","params":[{"foo":"bar"}],"id":"…","jsonrpc":"2.0"}\n
/// <- {"id":"…","jsonrpc":"2.0","result":42}\n
/// ```
///
/// # Example
///
/// ```no_run
/// use jsonrpc2_common::transport::TcpTransport;
/// use std::time::Duration;
///
/// # #[tokio::main]
/// # async fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let transport = TcpTransport::new();
/// let body = br#"{"method":"Foo.Bar","params":[],"id":"1","jsonrpc":"2.0"}"#;
/// let raw = transport
///     .exchange("127.0.0.1", 4003, body, Duration::from_secs(5))
///     .await?;
/// # let _ = raw;
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone, Copy, Default)]
pub struct TcpTransport;

/// Outcome of scanning the read buffer for a response value.
enum Frame {
    Complete(Value),
    Incomplete,
}

/// Tracks JSON nesting across reads so each byte is inspected once.
///
/// Reports the positions where a top-level value may end: a closing bracket
/// or quote back at depth zero, or a newline outside any value. Only those
/// positions are worth a full parse.
#[derive(Debug, Default)]
struct Framer {
    scanned: usize,
    depth: usize,
    in_string: bool,
    escaped: bool,
}

impl Framer {
    /// Consumes the bytes of `buf` not seen yet; true if a value may have ended.
    fn advance(&mut self, buf: &[u8]) -> bool {
        let mut boundary = false;

        for &byte in &buf[self.scanned..] {
            if self.in_string {
                if self.escaped {
                    self.escaped = false;
                } else if byte == b'\\' {
                    self.escaped = true;
                } else if byte == b'"' {
                    self.in_string = false;
                    boundary |= self.depth == 0;
                }
                continue;
            }

            match byte {
                b'"' => self.in_string = true,
                b'{' | b'[' => self.depth += 1,
                b'}' | b']' => {
                    self.depth = self.depth.saturating_sub(1);
                    boundary |= self.depth == 0;
                }
                b'\n' => boundary |= self.depth == 0,
                _ => {}
            }
        }

        self.scanned = buf.len();
        boundary
    }
}

impl TcpTransport {
    /// Creates a new TCP transport instance.
    pub fn new() -> Self {
        Self
    }

    /// Connects, sends `body`, and reads one response value.
    ///
    /// The deadline covers the whole exchange (connect, write, and read).
    /// The connection is closed before returning.
    pub async fn exchange(
        &self,
        host: &str,
        port: u16,
        body: &[u8],
        timeout: Duration,
    ) -> Result<Option<Value>> {
        let timeout_ms = timeout.as_millis() as u64;

        tokio::time::timeout(timeout, async {
            let mut stream = Self::connect(host, port).await?;
            Self::send_message(&mut stream, body).await?;
            let response = Self::receive_message(&mut stream).await?;

            // Best effort: the server may already have closed its end
            let _ = stream.shutdown().await;

            Ok(response)
        })
        .await
        .map_err(|_| RpcError::Timeout(timeout_ms))?
    }

    /// Connects to a remote endpoint.
    ///
    /// Resolves the host (which may yield several addresses) and tries each
    /// until one accepts the connection.
    pub async fn connect(host: &str, port: u16) -> Result<TcpStream> {
        let socket_addrs = tokio::net::lookup_host((host, port)).await.map_err(|e| {
            RpcError::Connection(format!("Invalid address '{}:{}': {}", host, port, e))
        })?;

        let mut last_err = None;
        for socket_addr in socket_addrs {
            match TcpStream::connect(socket_addr).await {
                Ok(stream) => {
                    tracing::debug!(%socket_addr, "TCP connection established");
                    return Ok(stream);
                }
                Err(e) => {
                    last_err = Some(e);
                }
            }
        }

        Err(RpcError::Connection(format!(
            "Failed to connect to {}:{}: {}",
            host,
            port,
            last_err
                .map(|e| e.to_string())
                .unwrap_or_else(|| "no addresses resolved".to_string())
        )))
    }

    /// Writes one newline-terminated message.
    pub async fn send_message<W>(stream: &mut W, data: &[u8]) -> Result<()>
    where
        W: AsyncWrite + Unpin,
    {
        stream
            .write_all(data)
            .await
            .map_err(|e| Self::map_io_error(e, "writing data"))?;

        stream
            .write_all(b"\n")
            .await
            .map_err(|e| Self::map_io_error(e, "writing delimiter"))?;

        stream
            .flush()
            .await
            .map_err(|e| Self::map_io_error(e, "flushing stream"))?;

        Ok(())
    }

    /// Reads until one complete JSON value is available.
    ///
    /// Returns `None` if the peer closed the connection without sending
    /// anything.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - The stream fails
    /// - The response exceeds the maximum size (100 MB)
    /// - The bytes received are not JSON, or the connection closes mid-value
    pub async fn receive_message<R>(stream: &mut R) -> Result<Option<Value>>
    where
        R: AsyncRead + Unpin,
    {
        let mut buf = Vec::new();
        let mut chunk = vec![0u8; READ_CHUNK];
        let mut framer = Framer::default();

        loop {
            let n = stream
                .read(&mut chunk)
                .await
                .map_err(|e| Self::map_io_error(e, "reading data"))?;

            if n == 0 {
                return Self::finish(&buf);
            }

            buf.extend_from_slice(&chunk[..n]);

            if buf.len() > MAX_MESSAGE_SIZE {
                return Err(RpcError::InvalidResponse(format!(
                    "Message too large: more than {} bytes",
                    MAX_MESSAGE_SIZE
                )));
            }

            if !framer.advance(&buf) {
                continue;
            }

            if let Frame::Complete(value) = Self::scan(&buf)? {
                return Ok(Some(value));
            }
        }
    }

    /// Looks for a complete value at the start of `buf`.
    ///
    /// Scalars (numbers, literals) are only complete once a byte follows them,
    /// since `12` may still become `123`.
    fn scan(buf: &[u8]) -> Result<Frame> {
        let mut values = serde_json::Deserializer::from_slice(buf).into_iter::<Value>();

        match values.next() {
            Some(Ok(value)) => {
                let delimited = values.byte_offset() < buf.len();
                if delimited || value.is_object() || value.is_array() || value.is_string() {
                    Ok(Frame::Complete(value))
                } else {
                    Ok(Frame::Incomplete)
                }
            }
            Some(Err(e)) if e.is_eof() => Ok(Frame::Incomplete),
            Some(Err(e)) => Err(RpcError::JsonSerialization(e)),
            None => Ok(Frame::Incomplete),
        }
    }

    /// Handles end-of-stream: whatever was buffered must be one whole value.
    fn finish(buf: &[u8]) -> Result<Option<Value>> {
        if buf.iter().all(u8::is_ascii_whitespace) {
            return Ok(None);
        }

        let mut values = serde_json::Deserializer::from_slice(buf).into_iter::<Value>();
        match values.next() {
            Some(Ok(value)) => Ok(Some(value)),
            Some(Err(e)) if e.is_eof() => Err(RpcError::InvalidResponse(
                "Connection closed before a complete response was received".to_string(),
            )),
            Some(Err(e)) => Err(RpcError::JsonSerialization(e)),
            None => Ok(None),
        }
    }

    /// Map IO errors to appropriate RpcError variants
    ///
    /// - Connection errors -> `Connection`
    /// - Other IO errors -> `Io`
    ///
    /// Deadlines are enforced around the whole exchange, so timeouts never
    /// surface here.
    fn map_io_error(err: std::io::Error, context: &str) -> RpcError {
        match err.kind() {
            std::io::ErrorKind::ConnectionReset
            | std::io::ErrorKind::ConnectionAborted
            | std::io::ErrorKind::BrokenPipe
            | std::io::ErrorKind::NotConnected => {
                RpcError::Connection(format!("{}: Connection lost", context))
            }
            _ => RpcError::Io(err),
        }
    }
}

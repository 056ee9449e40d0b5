//! Base-protocol framing: `Content-Length: N\r\n\r\n{json}` over a byte stream.
//!
//! The client talks to the server over stdin/stdout. [`MessageReader`]
//! splits the inbound stream into JSON values; [`MessageWriter`] frames
//! outbound ones.

use anyhow::{Context, Result, bail};
use serde::Serialize;
use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt, BufReader};

/// Upper bound on a single message body (16 MiB). Full-text sync sends
/// whole documents, so this is generous.
pub const MAX_MESSAGE_BYTES: usize = 16 * 1024 * 1024;

const CONTENT_LENGTH: &str = "Content-Length";

/// Value of a `Content-Length` header line, `None` for any other header.
fn content_length(line: &str) -> Result<Option<usize>> {
    let Some((name, value)) = line.split_once(':') else {
        bail!("malformed header line: {line:?}");
    };
    if !name.trim().eq_ignore_ascii_case(CONTENT_LENGTH) {
        return Ok(None);
    }
    let len = value
        .trim()
        .parse()
        .with_context(|| format!("invalid {CONTENT_LENGTH}: {:?}", value.trim()))?;
    Ok(Some(len))
}

pub struct MessageReader<R> {
    inner: BufReader<R>,
    line: String,
}

impl<R: AsyncRead + Unpin> MessageReader<R> {
    pub fn new(reader: R) -> Self {
        Self {
            inner: BufReader::new(reader),
            line: String::new(),
        }
    }

    /// Next message, or `Ok(None)` when the stream ends between messages.
    ///
    /// EOF inside a header block or body is an error. A complete frame whose
    /// body is not JSON is logged and skipped; the stream stays in sync.
    pub async fn read_message(&mut self) -> Result<Option<serde_json::Value>> {
        loop {
            let Some(body) = self.read_frame().await? else {
                return Ok(None);
            };
            match serde_json::from_slice(&body) {
                Ok(value) => return Ok(Some(value)),
                Err(e) => {
                    tracing::warn!(
                        error = %e,
                        body_bytes = body.len(),
                        "Skipping message whose body is not valid JSON"
                    );
                }
            }
        }
    }

    async fn read_frame(&mut self) -> Result<Option<Vec<u8>>> {
        let Some(len) = self.read_header_block().await? else {
            return Ok(None);
        };
        if len > MAX_MESSAGE_BYTES {
            bail!("{CONTENT_LENGTH} {len} exceeds limit of {MAX_MESSAGE_BYTES} bytes");
        }

        let mut body = vec![0u8; len];
        self.inner
            .read_exact(&mut body)
            .await
            .with_context(|| format!("reading {len}-byte message body"))?;
        Ok(Some(body))
    }

    async fn read_header_block(&mut self) -> Result<Option<usize>> {
        let mut len = None;
        let mut started = false;
        loop {
            self.line.clear();
            let n = self
                .inner
                .read_line(&mut self.line)
                .await
                .context("reading header line")?;
            if n == 0 {
                if started {
                    bail!("stream ended inside a header block");
                }
                return Ok(None);
            }
            started = true;

            let header = self.line.trim_end_matches(['\r', '\n']);
            if header.is_empty() {
                break;
            }
            if let Some(value) = content_length(header)? {
                len = Some(value);
            }
        }
        len.map(Some)
            .with_context(|| format!("header block without {CONTENT_LENGTH}"))
    }
}

pub struct MessageWriter<W> {
    inner: W,
}

impl<W: AsyncWrite + Unpin> MessageWriter<W> {
    pub fn new(writer: W) -> Self {
        Self { inner: writer }
    }

    /// Serialize `msg` and write it as one framed message, then flush.
    pub async fn write_message<T: Serialize>(&mut self, msg: &T) -> Result<()> {
        let body = serde_json::to_vec(msg).context("serializing message")?;
        let header = format!("{CONTENT_LENGTH}: {}\r\n\r\n", body.len());

        let mut frame = Vec::with_capacity(header.len() + body.len());
        frame.extend_from_slice(header.as_bytes());
        frame.extend_from_slice(&body);
        self.inner
            .write_all(&frame)
            .await
            .context("writing message")?;
        self.inner.flush().await.context("flushing message")
    }
}

//! Trait abstraction for line oriented serial input to enable testing

use async_trait::async_trait;
use bytes::BytesMut;
use std::io;
use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::time::{timeout_at, Duration, Instant};
use tracing::warn;

/// Longest valid receiver line: 0xFFFF bits of hex plus count, CRC,
/// separators and CRLF
pub const MAX_LINE_LEN: usize = 4 + 1 + 2 * ((0xFFFF + 7) / 8) + 1 + 2 + 2;

/// Trait for reading receiver lines
#[async_trait]
pub trait LineSource: Send {
    /// Read one line, waiting at most `timeout`
    ///
    /// Returns `Ok(None)` when no complete line arrived in time. The line is
    /// decoded as ISO-8859-1 with surrounding whitespace removed.
    async fn read_line(&mut self, timeout: Duration) -> io::Result<Option<String>>;
}

/// Splits any async byte stream into lines
///
/// Bytes of a line that is still incomplete when the timeout fires are kept
/// for the next call. A line longer than [`MAX_LINE_LEN`] is dropped up to
/// and including its newline.
pub struct LineReader<R> {
    reader: R,
    pending: BytesMut,
    discarding: bool,
}

impl<R> LineReader<R> {
    pub fn new(reader: R) -> Self {
        Self {
            reader,
            pending: BytesMut::with_capacity(256),
            discarding: false,
        }
    }

    /// Drop any partially received line
    pub fn discard_pending(&mut self) {
        self.pending.clear();
        self.discarding = false;
    }

    /// Underlying reader
    pub fn get_ref(&self) -> &R {
        &self.reader
    }

    fn take_line(&mut self) -> Option<String> {
        loop {
            let end = self.pending.iter().position(|&byte| byte == b'\n')?;
            let line = self.pending.split_to(end + 1);

            if self.discarding || line.len() > MAX_LINE_LEN {
                if !self.discarding {
                    warn!("Dropping line longer than {} bytes", MAX_LINE_LEN);
                }
                self.discarding = false;
                continue;
            }
            return Some(decode_latin1(&line));
        }
    }
}

#[async_trait]
impl<R> LineSource for LineReader<R>
where
    R: AsyncRead + Unpin + Send,
{
    async fn read_line(&mut self, timeout: Duration) -> io::Result<Option<String>> {
        let deadline = Instant::now() + timeout;

        loop {
            if let Some(line) = self.take_line() {
                return Ok(Some(line));
            }

            if self.pending.len() > MAX_LINE_LEN {
                if !self.discarding {
                    warn!("Dropping line longer than {} bytes", MAX_LINE_LEN);
                }
                self.pending.clear();
                self.discarding = true;
            }

            match timeout_at(deadline, self.reader.read_buf(&mut self.pending)).await {
                Err(_) => return Ok(None),
                Ok(Ok(0)) => {
                    return Err(io::Error::new(
                        io::ErrorKind::UnexpectedEof,
                        "receiver closed the connection",
                    ))
                }
                Ok(Ok(_)) => continue,
                Ok(Err(e)) => return Err(e),
            }
        }
    }
}

/// ISO-8859-1 maps every byte to the code point of the same value
fn decode_latin1(bytes: &[u8]) -> String {
    let text: String = bytes.iter().map(|&byte| byte as char).collect();
    text.trim().to_string()
}

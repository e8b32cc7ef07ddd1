//! Incremental, encoding-tolerant reader for a subprocess output stream.

use futures::FutureExt;
use std::io;
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};

/// Outcome of waiting on the stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Readiness {
    /// Bytes are buffered and can be taken with [`StreamReader::read_available`].
    Ready,
    /// The writer closed its end; no more bytes will arrive.
    Closed,
}

/// Reads whatever the subprocess has written so far, without line buffering.
///
/// Bytes are decoded as UTF-8. A multi-byte sequence split across two reads is
/// held back and completed on the next read; invalid sequences become U+FFFD.
pub struct StreamReader<R> {
    inner: BufReader<R>,
    pending: Vec<u8>,
    closed: bool,
}

impl<R: AsyncRead + Unpin> StreamReader<R> {
    pub fn new(inner: R) -> Self {
        Self {
            inner: BufReader::new(inner),
            pending: Vec::new(),
            closed: false,
        }
    }

    /// Waits until the stream has data or is closed.
    pub async fn poll_readable(&mut self) -> io::Result<Readiness> {
        if self.closed {
            return Ok(Readiness::Closed);
        }
        if self.inner.fill_buf().await?.is_empty() {
            self.closed = true;
            Ok(Readiness::Closed)
        } else {
            Ok(Readiness::Ready)
        }
    }

    /// Takes the buffered bytes without waiting. May return an empty string.
    pub fn read_available(&mut self) -> String {
        let buffered = self.inner.buffer();
        let len = buffered.len();
        self.pending.extend_from_slice(buffered);
        self.inner.consume(len);
        self.decode_pending()
    }

    /// Takes everything that can be read right now, without waiting.
    pub fn drain_ready(&mut self) -> String {
        let mut text = String::new();
        while let Some(Ok(Readiness::Ready)) = self.poll_readable().now_or_never() {
            text.push_str(&self.read_available());
        }
        text.push_str(&self.read_available());
        text
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }

    fn decode_pending(&mut self) -> String {
        let mut text = String::new();
        loop {
            match std::str::from_utf8(&self.pending) {
                Ok(valid) => {
                    text.push_str(valid);
                    self.pending.clear();
                    return text;
                }
                Err(e) => {
                    let valid_up_to = e.valid_up_to();
                    text.push_str(&String::from_utf8_lossy(&self.pending[..valid_up_to]));
                    match e.error_len() {
                        Some(bad) => {
                            text.push(char::REPLACEMENT_CHARACTER);
                            self.pending.drain(..valid_up_to + bad);
                        }
                        None => {
                            self.pending.drain(..valid_up_to);
                            if self.closed {
                                text.push_str(&String::from_utf8_lossy(&self.pending));
                                self.pending.clear();
                            }
                            return text;
                        }
                    }
                }
            }
        }
    }
}

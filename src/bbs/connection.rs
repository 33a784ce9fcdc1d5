//! Line-oriented caller connection.
//!
//! Wraps any buffered reader / writer pair (a TCP stream split in two, the local
//! console, or an in-memory duplex in tests). Everything written goes through
//! [`terminal::render`] under the mode passed by the session.

use std::time::Duration;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::time::timeout;

use crate::terminal::{self, DisplayMode};
use super::SessionError;

/// Longest accepted input line; the remainder of a longer line is discarded
pub const MAX_LINE_BYTES: usize = 1024;

const EOL: &[u8] = b"\r\n";

pub struct Connection<R, W> {
    reader: R,
    writer: W,
    read_timeout: Option<Duration>,
}

impl<R, W> Connection<R, W>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    pub fn new(reader: R, writer: W, read_timeout: Option<Duration>) -> Self {
        Connection { reader, writer, read_timeout }
    }

    /// Read one line, trimmed. EOF ends the session.
    ///
    /// The read deadline covers the whole line, including discarding the tail of
    /// an overlong one.
    pub async fn read_line(&mut self) -> Result<String, SessionError> {
        let read = read_capped(&mut self.reader);
        let buf = match self.read_timeout {
            Some(limit) => timeout(limit, read).await.map_err(|_| SessionError::Timeout)??,
            None => read.await?,
        };
        Ok(String::from_utf8_lossy(&buf).trim().to_string())
    }

    /// Send `text` without a line ending and wait for the answer
    pub async fn prompt(&mut self, mode: DisplayMode, text: &str) -> Result<String, SessionError> {
        self.send(mode, text).await?;
        self.read_line().await
    }

    pub async fn send(&mut self, mode: DisplayMode, text: &str) -> Result<(), SessionError> {
        self.send_raw(mode, text.as_bytes()).await
    }

    pub async fn send_line(&mut self, mode: DisplayMode, text: &str) -> Result<(), SessionError> {
        self.writer.write_all(&terminal::render(mode, text.as_bytes())).await?;
        self.writer.write_all(EOL).await?;
        self.writer.flush().await?;
        Ok(())
    }

    /// Render arbitrary payload bytes (asset files) under `mode`
    pub async fn send_raw(&mut self, mode: DisplayMode, payload: &[u8]) -> Result<(), SessionError> {
        self.writer.write_all(&terminal::render(mode, payload)).await?;
        self.writer.flush().await?;
        Ok(())
    }

    pub async fn newline(&mut self) -> Result<(), SessionError> {
        self.writer.write_all(EOL).await?;
        self.writer.flush().await?;
        Ok(())
    }

    pub async fn shutdown(&mut self) -> Result<(), SessionError> {
        self.writer.shutdown().await?;
        Ok(())
    }
}

/// Up to `MAX_LINE_BYTES` of the next line; the rest of a longer line is dropped
async fn read_capped<R: AsyncBufRead + Unpin>(reader: &mut R) -> Result<Vec<u8>, SessionError> {
    let mut buf = Vec::new();
    let mut limited = (&mut *reader).take(MAX_LINE_BYTES as u64);
    let n = limited.read_until(b'\n', &mut buf).await?;
    if n == 0 {
        return Err(SessionError::Disconnected);
    }
    if n == MAX_LINE_BYTES && buf.last() != Some(&b'\n') {
        loop {
            let mut sink = Vec::new();
            let mut limited = (&mut *reader).take(MAX_LINE_BYTES as u64);
            let n = limited.read_until(b'\n', &mut sink).await?;
            if n == 0 || sink.last() == Some(&b'\n') {
                break;
            }
        }
    }
    Ok(buf)
}

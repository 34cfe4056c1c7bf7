//! Serial link abstraction.
//!
//! The receiver only needs three primitives from the physical link: read a
//! line, read up to N bytes within the link's timeout, and write. Keeping
//! them behind a trait lets tests script the host side byte for byte.

use std::future::Future;
use std::io;
use std::pin::Pin;
use std::time::Duration;

use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::time::{Instant, timeout, timeout_at};

/// A boxed future returned by [`Link`] methods.
pub type LinkFuture<'a, T> = Pin<Box<dyn Future<Output = io::Result<T>> + Send + 'a>>;

/// Byte-oriented, half-duplex link to the host.
pub trait Link: Send {
    /// Reads one line including its terminator.
    ///
    /// Returns `None` when nothing complete arrived within the link timeout.
    fn read_line(&mut self) -> LinkFuture<'_, Option<Vec<u8>>>;

    /// Reads up to `max` bytes. May return fewer, or none, on timeout.
    fn read_chunk(&mut self, max: usize) -> LinkFuture<'_, Vec<u8>>;

    /// Writes and flushes `bytes`.
    fn write<'a>(&'a mut self, bytes: &'a [u8]) -> LinkFuture<'a, ()>;
}

/// [`Link`] over any tokio reader/writer pair (UART device, pipe, stdio).
pub struct StreamLink<R, W> {
    reader: R,
    writer: W,
    read_timeout: Duration,
    /// Bytes of a line that timed out before its terminator arrived.
    pending: Vec<u8>,
}

impl<R, W> StreamLink<R, W>
where
    R: AsyncBufRead + Unpin + Send,
    W: AsyncWrite + Unpin + Send,
{
    pub fn new(reader: R, writer: W, read_timeout: Duration) -> Self {
        Self {
            reader,
            writer,
            read_timeout,
            pending: Vec::new(),
        }
    }

    pub fn read_timeout(&self) -> Duration {
        self.read_timeout
    }

    /// Returns the underlying reader and writer.
    pub fn into_inner(self) -> (R, W) {
        (self.reader, self.writer)
    }
}

impl<R, W> Link for StreamLink<R, W>
where
    R: AsyncBufRead + Unpin + Send,
    W: AsyncWrite + Unpin + Send,
{
    fn read_line(&mut self) -> LinkFuture<'_, Option<Vec<u8>>> {
        Box::pin(async move {
            let read = timeout(
                self.read_timeout,
                self.reader.read_until(b'\n', &mut self.pending),
            )
            .await;
            match read {
                // Partial bytes stay in `pending` for the next call.
                Err(_elapsed) => Ok(None),
                Ok(Err(e)) => Err(e),
                // Either a full line or EOF; hand over whatever is buffered.
                Ok(Ok(_)) if self.pending.is_empty() => Ok(None),
                Ok(Ok(_)) => Ok(Some(std::mem::take(&mut self.pending))),
            }
        })
    }

    fn read_chunk(&mut self, max: usize) -> LinkFuture<'_, Vec<u8>> {
        Box::pin(async move {
            let mut buf = vec![0u8; max];
            let mut filled = self.pending.len().min(max);
            buf[..filled].copy_from_slice(&self.pending[..filled]);
            self.pending.drain(..filled);

            let deadline = Instant::now() + self.read_timeout;
            while filled < max {
                match timeout_at(deadline, self.reader.read(&mut buf[filled..])).await {
                    Ok(Ok(0)) | Err(_) => break,
                    Ok(Ok(n)) => filled += n,
                    Ok(Err(e)) => return Err(e),
                }
            }
            buf.truncate(filled);
            Ok(buf)
        })
    }

    fn write<'a>(&'a mut self, bytes: &'a [u8]) -> LinkFuture<'a, ()> {
        Box::pin(async move {
            self.writer.write_all(bytes).await?;
            self.writer.flush().await
        })
    }
}

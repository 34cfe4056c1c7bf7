use std::fmt;
use std::time::Duration;

use loranode_protocol::{CHUNK_SIZE, DecodedHeader};
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::TransferError;
use crate::checksum::{Cumulative, IntegrityCheck};
use crate::storage::{Sink, Storage};

/// The three object kinds the host can send.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ObjectKind {
    /// JSON configuration file, named by its header line.
    Config,
    /// Image tagged with a label line.
    LabeledBlob,
    /// One entry of a packaged archive, acknowledged per fragment.
    Archive,
}

impl fmt::Display for ObjectKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Config => "config",
            Self::LabeledBlob => "labeled_blob",
            Self::Archive => "archive",
        })
    }
}

/// Result of a successful receive call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// An object was finalized under this name.
    Stored(String),
    /// The host signalled the end of the session.
    Finished,
}

/// Receiver tuning.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReceiverConfig {
    /// Maximum bytes requested per fragment read (0 = protocol default).
    #[serde(default = "default_chunk_size")]
    pub chunk_size: usize,

    /// Link read timeout in milliseconds.
    #[serde(default = "default_read_timeout_ms")]
    pub read_timeout_ms: u64,

    /// Pause after an empty read, in milliseconds.
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,

    /// Abort a transfer after this long without any received byte.
    #[serde(default = "default_idle_timeout_ms")]
    pub idle_timeout_ms: u64,

    /// Header lines ending with this suffix announce a config object.
    #[serde(default = "default_config_suffix")]
    pub config_suffix: String,

    /// File extension of stored labeled blobs.
    #[serde(default = "default_image_extension")]
    pub image_extension: String,
}

fn default_chunk_size() -> usize {
    CHUNK_SIZE
}

fn default_read_timeout_ms() -> u64 {
    loranode_protocol::constants::DEFAULT_READ_TIMEOUT.as_millis() as u64
}

fn default_poll_interval_ms() -> u64 {
    loranode_protocol::constants::DEFAULT_POLL_INTERVAL.as_millis() as u64
}

fn default_idle_timeout_ms() -> u64 {
    30_000
}

fn default_config_suffix() -> String {
    ".json".into()
}

fn default_image_extension() -> String {
    "jpeg".into()
}

impl Default for ReceiverConfig {
    fn default() -> Self {
        Self {
            chunk_size: default_chunk_size(),
            read_timeout_ms: default_read_timeout_ms(),
            poll_interval_ms: default_poll_interval_ms(),
            idle_timeout_ms: default_idle_timeout_ms(),
            config_suffix: default_config_suffix(),
            image_extension: default_image_extension(),
        }
    }
}

impl ReceiverConfig {
    /// Fragment size actually used; a zero setting falls back to [`CHUNK_SIZE`].
    pub fn chunk_size(&self) -> usize {
        if self.chunk_size == 0 {
            CHUNK_SIZE
        } else {
            self.chunk_size
        }
    }

    pub fn read_timeout(&self) -> Duration {
        Duration::from_millis(self.read_timeout_ms)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn idle_timeout(&self) -> Duration {
        Duration::from_millis(self.idle_timeout_ms)
    }
}

/// An object being received.
///
/// Owns its sink. It either finalizes (sink closed, name handed back) or is
/// aborted (sink closed and deleted); it never outlives the receive call.
pub struct IncomingObject<K> {
    kind: ObjectKind,
    name: String,
    declared_size: u64,
    declared_checksum: u32,
    bytes_received: u64,
    checksum: Cumulative,
    sink: K,
}

impl<K> fmt::Debug for IncomingObject<K> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("IncomingObject")
            .field("kind", &self.kind)
            .field("name", &self.name)
            .field("declared_size", &self.declared_size)
            .field("declared_checksum", &self.declared_checksum)
            .field("bytes_received", &self.bytes_received)
            .finish_non_exhaustive()
    }
}

impl<K: Sink> IncomingObject<K> {
    pub(crate) fn new(kind: ObjectKind, name: String, header: &DecodedHeader, sink: K) -> Self {
        Self {
            kind,
            name,
            declared_size: header.size,
            declared_checksum: header.checksum,
            bytes_received: 0,
            checksum: Cumulative::new(),
            sink,
        }
    }

    pub fn kind(&self) -> ObjectKind {
        self.kind
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn declared_size(&self) -> u64 {
        self.declared_size
    }

    pub fn declared_checksum(&self) -> u32 {
        self.declared_checksum
    }

    pub fn bytes_received(&self) -> u64 {
        self.bytes_received
    }

    /// Bytes still expected.
    pub fn remaining(&self) -> u64 {
        self.declared_size - self.bytes_received
    }

    pub fn is_complete(&self) -> bool {
        self.bytes_received == self.declared_size
    }

    /// CRC of everything absorbed so far.
    pub fn checksum(&self) -> u32 {
        self.checksum.value()
    }

    /// Writes `data` to the sink and folds it into size and checksum.
    pub(crate) async fn absorb(&mut self, data: &[u8]) -> Result<(), TransferError> {
        let received = self.bytes_received + data.len() as u64;
        if received > self.declared_size {
            return Err(TransferError::SizeMismatch {
                declared: self.declared_size,
                received,
            });
        }
        self.sink.append(data).await?;
        self.checksum.update(data);
        self.bytes_received = received;
        Ok(())
    }

    /// Compares what was received against the header.
    pub(crate) fn verify(&self) -> Result<(), TransferError> {
        if self.bytes_received != self.declared_size {
            return Err(TransferError::SizeMismatch {
                declared: self.declared_size,
                received: self.bytes_received,
            });
        }
        let actual = self.checksum();
        if actual != self.declared_checksum {
            return Err(TransferError::ChecksumMismatch {
                expected: self.declared_checksum,
                actual,
            });
        }
        Ok(())
    }

    pub(crate) async fn close(&mut self) -> Result<(), TransferError> {
        self.sink.close().await?;
        Ok(())
    }

    /// Consumes the object once it has been verified and closed.
    pub(crate) fn into_name(self) -> String {
        self.name
    }

    /// Closes the sink and deletes whatever was written.
    pub(crate) async fn abort<S>(mut self, storage: &S)
    where
        S: Storage<Sink = K>,
    {
        if let Err(e) = self.sink.close().await {
            warn!(name = %self.name, error = %e, "failed to close aborted sink");
        }
        drop(self.sink);
        if let Err(e) = storage.delete(&self.name).await {
            warn!(name = %self.name, error = %e, "failed to delete aborted object");
        }
    }
}

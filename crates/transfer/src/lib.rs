//! Reception of configuration files, labeled images and archive entries
//! from a paired host over the node's serial link.
//!
//! [`ObjectReceiver`] owns a [`Link`] and a [`Storage`] and exposes one entry
//! point per object kind. Every failed transfer deletes its partial output.

mod checksum;
mod link;
#[cfg(test)]
mod mock;
mod poller;
mod receiver;
mod storage;
mod types;
mod validation;

pub use checksum::{Cumulative, IntegrityCheck, PerFragment, crc32};
pub use link::{Link, LinkFuture, StreamLink};
pub use poller::Poller;
pub use receiver::ObjectReceiver;
pub use storage::{FileSink, FsStorage, Sink, Storage, StorageFuture};
pub use types::{IncomingObject, ObjectKind, Outcome, ReceiverConfig};
pub use validation::validate_object_name;

/// Errors produced while receiving an object.
#[derive(Debug, thiserror::Error)]
pub enum TransferError {
    #[error("malformed header: {0}")]
    MalformedHeader(String),

    #[error("size mismatch: declared {declared}, received {received}")]
    SizeMismatch { declared: u64, received: u64 },

    #[error("checksum mismatch: expected {expected}, computed {actual}")]
    ChecksumMismatch { expected: u32, actual: u32 },

    #[error("missing END signal, got {0:?}")]
    MissingEndSignal(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid object name: {0}")]
    InvalidPath(String),

    #[error("link idle for too long")]
    Timeout,

    #[error("cancelled")]
    Cancelled,
}

impl From<loranode_protocol::DecodeError> for TransferError {
    fn from(err: loranode_protocol::DecodeError) -> Self {
        Self::MalformedHeader(err.to_string())
    }
}

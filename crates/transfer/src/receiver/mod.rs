//! The object receiver and its shared fragment loop.
//!
//! Variant entry points live in the submodules:
//! - [`receive_config`](ObjectReceiver::receive_config)
//! - [`receive_labeled_blob`](ObjectReceiver::receive_labeled_blob)
//! - [`receive_archive`](ObjectReceiver::receive_archive)

mod archive;
mod config;
mod labeled;

use loranode_protocol::{ControlToken, DecodedHeader, HeaderLayout, find_sentinel};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, trace, warn};

use crate::TransferError;
use crate::link::Link;
use crate::poller::Poller;
use crate::storage::Storage;
use crate::types::{IncomingObject, ObjectKind, ReceiverConfig};
use crate::validation::validate_object_name;

/// Receives objects from the host, one call at a time.
///
/// Holds the link exclusively; every entry point runs to completion (or
/// failure) before the next can start.
pub struct ObjectReceiver<L, S> {
    link: L,
    storage: S,
    config: ReceiverConfig,
    cancel: CancellationToken,
}

impl<L: Link, S: Storage> ObjectReceiver<L, S> {
    pub fn new(link: L, storage: S, config: ReceiverConfig, cancel: CancellationToken) -> Self {
        Self {
            link,
            storage,
            config,
            cancel,
        }
    }

    pub fn config(&self) -> &ReceiverConfig {
        &self.config
    }

    pub fn link(&self) -> &L {
        &self.link
    }

    pub fn storage(&self) -> &S {
        &self.storage
    }

    /// Releases the link and storage.
    pub fn into_parts(self) -> (L, S) {
        (self.link, self.storage)
    }

    fn poller(&self) -> Poller {
        Poller::from_config(&self.config, self.cancel.clone())
    }

    /// Reads exactly `len` bytes, polling through empty reads.
    async fn read_exact(
        &mut self,
        len: usize,
        poller: &mut Poller,
    ) -> Result<Vec<u8>, TransferError> {
        let mut buf = Vec::with_capacity(len);
        while buf.len() < len {
            poller.check()?;
            let part = self.link.read_chunk(len - buf.len()).await?;
            if part.is_empty() {
                poller.idle().await?;
                continue;
            }
            poller.activity();
            buf.extend_from_slice(&part);
        }
        Ok(buf)
    }

    async fn read_header(
        &mut self,
        layout: HeaderLayout,
        poller: &mut Poller,
    ) -> Result<DecodedHeader, TransferError> {
        let raw = self.read_exact(layout.wire_len(), poller).await?;
        Ok(layout.decode(&raw)?)
    }

    /// Validates the destination name and opens its sink.
    async fn open(
        &self,
        kind: ObjectKind,
        name: String,
        header: &DecodedHeader,
    ) -> Result<IncomingObject<S::Sink>, TransferError> {
        validate_object_name(&name)?;
        let sink = self.storage.create_sink(&name).await?;
        info!(
            %kind,
            name = %name,
            size = header.size,
            checksum = header.checksum,
            "receiving object"
        );
        Ok(IncomingObject::new(kind, name, header, sink))
    }

    /// Streams, verifies and finalizes `object`; deletes it on any failure.
    async fn receive_object(
        &mut self,
        mut object: IncomingObject<S::Sink>,
        poller: &mut Poller,
    ) -> Result<String, TransferError> {
        match self.complete(&mut object, poller).await {
            Ok(()) => {
                info!(
                    kind = %object.kind(),
                    name = %object.name(),
                    size = object.bytes_received(),
                    "object received"
                );
                Ok(object.into_name())
            }
            Err(e) => {
                warn!(
                    kind = %object.kind(),
                    name = %object.name(),
                    received = object.bytes_received(),
                    error = %e,
                    "aborting object"
                );
                object.abort(&self.storage).await;
                Err(e)
            }
        }
    }

    async fn complete(
        &mut self,
        object: &mut IncomingObject<S::Sink>,
        poller: &mut Poller,
    ) -> Result<(), TransferError> {
        self.stream_fragments(object, poller).await?;
        object.close().await?;
        self.expect_end().await?;
        object.verify()
    }

    /// Shared fragment loop for the cumulative-checksum kinds.
    ///
    /// Stops when the declared size is reached or when a fragment carries
    /// the in-band sentinel; in the latter case only the bytes before it
    /// are kept.
    async fn stream_fragments(
        &mut self,
        object: &mut IncomingObject<S::Sink>,
        poller: &mut Poller,
    ) -> Result<(), TransferError> {
        let chunk_size = self.config.chunk_size() as u64;
        while !object.is_complete() {
            poller.check()?;
            let want = object.remaining().min(chunk_size) as usize;
            let fragment = self.link.read_chunk(want).await?;
            if fragment.is_empty() {
                trace!(name = %object.name(), "no data received");
                poller.idle().await?;
                continue;
            }
            poller.activity();

            if let Some(offset) = find_sentinel(&fragment) {
                debug!(name = %object.name(), offset, "END signal inside fragment");
                object.absorb(&fragment[..offset]).await?;
                break;
            }
            object.absorb(&fragment).await?;
            debug!(
                name = %object.name(),
                received = object.bytes_received(),
                declared = object.declared_size(),
                "fragment stored"
            );
        }
        Ok(())
    }

    /// The line after the data must be a bare `END`.
    async fn expect_end(&mut self) -> Result<(), TransferError> {
        match self.link.read_line().await? {
            Some(line) if ControlToken::parse(&line) == Some(ControlToken::End) => Ok(()),
            Some(line) => Err(TransferError::MissingEndSignal(lossy(&line))),
            None => Err(TransferError::MissingEndSignal("<nothing>".into())),
        }
    }
}

/// Printable form of a received line for errors and logs.
fn lossy(line: &[u8]) -> String {
    String::from_utf8_lossy(line.trim_ascii()).into_owned()
}

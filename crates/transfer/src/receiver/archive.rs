//! Archive entries: stop-and-wait transfer with per-fragment checksums.
//!
//! ```text
//! host                          node
//! START\n                ->
//!                        <-     LISTEN\n
//! SIZE\n NAME\n CRC\n    ->
//! <crc>\n <fragment>     ->
//!                        <-     ACK\n | NACK\n (host resends)
//! ...
//! END\n                  ->
//!                        <-     OK\n
//! ```

use loranode_protocol::{ARCHIVE_LAYOUT, ControlToken, parse_checksum};
use tracing::{debug, info, warn};

use super::{ObjectReceiver, lossy};
use crate::TransferError;
use crate::checksum::{IntegrityCheck, PerFragment};
use crate::link::Link;
use crate::poller::Poller;
use crate::storage::Storage;
use crate::types::{IncomingObject, ObjectKind, Outcome};

impl<L: Link, S: Storage> ObjectReceiver<L, S> {
    /// Receives the next archive entry.
    ///
    /// Loops over control lines until an entry is finalized
    /// (`Outcome::Stored`) or the host sends `Finished`. Any error deletes
    /// the entry in progress and abandons the archive.
    pub async fn receive_archive(&mut self) -> Result<Outcome, TransferError> {
        let mut poller = self.poller();
        let mut entry = None;
        match self.archive_loop(&mut entry, &mut poller).await {
            Ok(outcome) => Ok(outcome),
            Err(e) => {
                if let Some(object) = entry.take() {
                    warn!(
                        name = %object.name(),
                        received = object.bytes_received(),
                        error = %e,
                        "aborting archive entry"
                    );
                    object.abort(&self.storage).await;
                }
                Err(e)
            }
        }
    }

    async fn archive_loop(
        &mut self,
        entry: &mut Option<IncomingObject<S::Sink>>,
        poller: &mut Poller,
    ) -> Result<Outcome, TransferError> {
        let mut fragment_check = PerFragment::new();
        loop {
            poller.check()?;
            let Some(line) = self.link.read_line().await? else {
                // The idle deadline only runs while an entry is open.
                if entry.is_none() {
                    poller.activity();
                }
                poller.idle().await?;
                continue;
            };
            poller.activity();

            match (ControlToken::parse(&line), entry.as_mut()) {
                (Some(ControlToken::Start), None) => {
                    self.link.write(ControlToken::Listen.line()).await?;
                    let header = self.read_header(ARCHIVE_LAYOUT, poller).await?;
                    let name = header.name.clone().unwrap_or_default();
                    *entry = Some(self.open(ObjectKind::Archive, name, &header).await?);
                }
                (Some(ControlToken::End), Some(object)) => {
                    object.verify()?;
                    object.close().await?;
                    self.link.write(ControlToken::Ok.line()).await?;
                    info!(
                        name = %object.name(),
                        size = object.bytes_received(),
                        "archive entry received"
                    );
                    let name = object.name().to_owned();
                    *entry = None;
                    return Ok(Outcome::Stored(name));
                }
                (Some(ControlToken::Finished), None) => {
                    info!("host finished sending archive entries");
                    return Ok(Outcome::Finished);
                }
                (Some(token), Some(object)) => {
                    return Err(TransferError::MalformedHeader(format!(
                        "unexpected {token} while receiving {}",
                        object.name()
                    )));
                }
                (Some(token), None) => {
                    return Err(TransferError::MalformedHeader(format!(
                        "unexpected {token} outside of an entry"
                    )));
                }
                (None, _) if line.trim_ascii().is_empty() => {}
                (None, None) => {
                    return Err(TransferError::MalformedHeader(format!(
                        "fragment header {:?} outside of an entry",
                        lossy(&line)
                    )));
                }
                (None, Some(object)) => {
                    let advertised = parse_checksum(&line)?;
                    let want = object.remaining().min(self.config.chunk_size() as u64) as usize;
                    let fragment = self.read_exact(want, poller).await?;

                    if fragment_check.verify(&fragment, advertised) {
                        self.link.write(ControlToken::Ack.line()).await?;
                        object.absorb(&fragment).await?;
                        debug!(
                            name = %object.name(),
                            received = object.bytes_received(),
                            declared = object.declared_size(),
                            "fragment acknowledged"
                        );
                    } else {
                        warn!(
                            name = %object.name(),
                            advertised,
                            computed = fragment_check.value(),
                            "fragment checksum mismatch, requesting resend"
                        );
                        self.link.write(ControlToken::Nack.line()).await?;
                    }
                }
            }
        }
    }
}

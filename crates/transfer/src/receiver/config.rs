use loranode_protocol::{CONFIG_LAYOUT, ControlToken};
use tracing::{debug, info};

use super::{ObjectReceiver, lossy};
use crate::TransferError;
use crate::link::Link;
use crate::storage::Storage;
use crate::types::{ObjectKind, Outcome};

impl<L: Link, S: Storage> ObjectReceiver<L, S> {
    /// Receives one configuration file.
    ///
    /// The header is a line ending with the configured suffix (`.json`); the
    /// whole line is the stored name. Returns `Ok(None)` when the link is
    /// idle or the line is not a config header, and
    /// `Ok(Some(Outcome::Finished))` when the host ends the session.
    pub async fn receive_config(&mut self) -> Result<Option<Outcome>, TransferError> {
        let Some(line) = self.link.read_line().await? else {
            return Ok(None);
        };
        if ControlToken::parse(&line) == Some(ControlToken::Finished) {
            info!("host finished sending config objects");
            return Ok(Some(Outcome::Finished));
        }

        let line = line.trim_ascii();
        if !line.ends_with(self.config.config_suffix.as_bytes()) {
            debug!(line = %lossy(line), "ignoring non-config line");
            return Ok(None);
        }
        let name = std::str::from_utf8(line)
            .map_err(|_| TransferError::MalformedHeader(format!("config name {:?}", lossy(line))))?
            .to_owned();

        let mut poller = self.poller();
        let header = self.read_header(CONFIG_LAYOUT, &mut poller).await?;
        let object = self.open(ObjectKind::Config, name, &header).await?;
        let name = self.receive_object(object, &mut poller).await?;
        Ok(Some(Outcome::Stored(name)))
    }
}

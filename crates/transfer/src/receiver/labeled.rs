use loranode_protocol::{ControlToken, LABELED_BLOB_LAYOUT};

use super::{ObjectReceiver, lossy};
use crate::TransferError;
use crate::link::Link;
use crate::storage::Storage;
use crate::types::ObjectKind;

impl<L: Link, S: Storage> ObjectReceiver<L, S> {
    /// Receives one labeled image, stored as `<base>-<label>.<ext>`.
    ///
    /// Returns the label, or `Ok(None)` if the link is idle.
    pub async fn receive_labeled_blob(
        &mut self,
        base: &str,
    ) -> Result<Option<String>, TransferError> {
        let Some(line) = self.link.read_line().await? else {
            return Ok(None);
        };
        if ControlToken::parse(&line) != Some(ControlToken::Start) {
            return Err(TransferError::MalformedHeader(format!(
                "expected START, got {:?}",
                lossy(&line)
            )));
        }

        let label = match self.link.read_line().await? {
            Some(line) => std::str::from_utf8(line.trim_ascii())
                .map_err(|_| TransferError::MalformedHeader("label is not UTF-8".into()))?
                .to_owned(),
            None => return Err(TransferError::MalformedHeader("missing label".into())),
        };
        if label.is_empty() {
            return Err(TransferError::MalformedHeader("empty label".into()));
        }

        let mut poller = self.poller();
        let header = self.read_header(LABELED_BLOB_LAYOUT, &mut poller).await?;
        let name = format!("{base}-{label}.{}", self.config.image_extension);
        let object = self.open(ObjectKind::LabeledBlob, name, &header).await?;
        self.receive_object(object, &mut poller).await?;
        Ok(Some(label))
    }
}

use std::path::{Component, Path};

use crate::TransferError;

/// Checks that an object name received from the host stays inside the
/// storage root.
///
/// Names may contain subdirectories (`logs/day1.zip`) but not:
/// - nothing at all, or NUL bytes
/// - a leading `/` or a drive/UNC prefix
/// - `..` components anywhere
pub fn validate_object_name(name: &str) -> Result<(), TransferError> {
    if name.is_empty() {
        return Err(TransferError::InvalidPath("empty name".into()));
    }
    if name.contains('\0') {
        return Err(TransferError::InvalidPath(format!(
            "NUL byte in name: {name:?}"
        )));
    }

    let mut has_file = false;
    for component in Path::new(name).components() {
        match component {
            Component::Normal(_) => has_file = true,
            Component::CurDir => {}
            Component::ParentDir => {
                return Err(TransferError::InvalidPath(format!(
                    "parent directory in name: {name}"
                )));
            }
            Component::RootDir | Component::Prefix(_) => {
                return Err(TransferError::InvalidPath(format!(
                    "absolute name: {name}"
                )));
            }
        }
    }

    if !has_file {
        return Err(TransferError::InvalidPath(format!("no file name: {name}")));
    }
    Ok(())
}

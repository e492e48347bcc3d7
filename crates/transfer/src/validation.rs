use std::path::{Component, Path};

use crate::TransferError;

/// Validates that an upload id can be used as a file name inside the
/// storage directory.
///
/// Rejects:
/// - Empty ids
/// - Path separators (`/`, `\`)
/// - `.` and `..`
/// - Absolute paths and Windows prefix components (`C:`, `\\server`)
pub fn validate_upload_id(id: &str) -> Result<(), TransferError> {
    if id.is_empty() {
        return Err(TransferError::InvalidId("empty id".into()));
    }

    if id.contains(['/', '\\']) {
        return Err(TransferError::InvalidId(format!(
            "path separator not allowed: {id}"
        )));
    }

    if id.len() >= 2 && id.as_bytes()[1] == b':' {
        return Err(TransferError::InvalidId(format!(
            "drive prefix not allowed: {id}"
        )));
    }

    let path = Path::new(id);
    if path.is_absolute() {
        return Err(TransferError::InvalidId(format!(
            "absolute path not allowed: {id}"
        )));
    }

    let mut components = path.components();
    match (components.next(), components.next()) {
        (Some(Component::Normal(_)), None) => Ok(()),
        _ => Err(TransferError::InvalidId(format!(
            "not a plain file name: {id}"
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_empty_id() {
        assert!(validate_upload_id("").is_err());
    }

    #[test]
    fn rejects_parent_dir() {
        assert!(validate_upload_id("..").is_err());
    }

    #[test]
    fn rejects_current_dir() {
        assert!(validate_upload_id(".").is_err());
    }

    #[test]
    fn rejects_nested_path() {
        assert!(validate_upload_id("sub/file").is_err());
        assert!(validate_upload_id("../../../etc/passwd").is_err());
    }

    #[test]
    fn rejects_absolute_unix_path() {
        assert!(validate_upload_id("/tmp/malicious").is_err());
    }

    #[test]
    fn rejects_windows_forms() {
        assert!(validate_upload_id("C:evil").is_err());
        assert!(validate_upload_id("\\\\server\\share").is_err());
        assert!(validate_upload_id("dir\\file").is_err());
    }

    #[test]
    fn accepts_uuid() {
        assert!(validate_upload_id("3f0b6c1e-8d6a-4f51-9a57-1c2f8e0b9d44").is_ok());
    }

    #[test]
    fn accepts_dotted_name() {
        assert!(validate_upload_id("upload.part").is_ok());
        assert!(validate_upload_id(".hidden").is_ok());
    }
}

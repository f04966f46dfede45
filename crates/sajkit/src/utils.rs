//! Host automation helpers.
use std::path::{Path, PathBuf};

use snafu::prelude::*;

use crate::{BackupSnafu, Result};

/// Format of the timestamp suffix appended by [`backup_file`].
pub const BACKUP_SUFFIX_FORMAT: &str = "%Y-%m-%d-%H%M%S";

/// Returns a suffix such as `.2024-05-01-134502` for the current local time.
pub fn timestamp_suffix() -> String {
    format!(".{}", chrono::Local::now().format(BACKUP_SUFFIX_FORMAT))
}

/// Copies the file at `src` to `src` + `suffix` and returns the path of the
/// copy.
///
/// Without a suffix, one is generated from the current time with
/// [`timestamp_suffix`].
pub fn backup_file(src: impl AsRef<Path>, suffix: Option<&str>) -> Result<PathBuf> {
    let src = src.as_ref();
    let suffix = suffix.map(str::to_owned).unwrap_or_else(timestamp_suffix);
    let mut dest = src.as_os_str().to_owned();
    dest.push(&suffix);
    let dest = PathBuf::from(dest);

    if !src.is_file() {
        return Err(std::io::Error::new(
            std::io::ErrorKind::NotFound,
            "source file not found or inaccessible",
        ))
        .context(crate::ResourceNotFoundSnafu { path: src });
    }
    log::debug!("backing up {} to {}", src.display(), dest.display());
    std::fs::copy(src, &dest).context(BackupSnafu {
        from: src,
        to: &dest,
    })?;
    Ok(dest)
}

/// Reads the role of this machine from the metadata file at `location`.
///
/// Surrounding whitespace, such as the trailing newline most provisioning
/// tools write, is trimmed.
pub fn whoami(location: impl AsRef<Path>) -> Result<String> {
    let location = location.as_ref();
    let role = std::fs::read_to_string(location)
        .context(crate::ResourceNotFoundSnafu { path: location })?;
    Ok(role.trim().to_owned())
}

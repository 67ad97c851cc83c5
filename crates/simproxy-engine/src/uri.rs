//! ---
//! sp_section: "02-engine-binding"
//! sp_subsection: "module"
//! sp_type: "source"
//! sp_scope: "code"
//! sp_description: "Engine interface and dynamic module binding."
//! sp_version: "v0.0.0-prealpha"
//! sp_owner: "tbd"
//! ---
use std::path::PathBuf;

/// Convert a resource URI (e.g. `file:///opt/engines`) to a filesystem path.
///
/// Orchestrators hand the proxy a URI for the unpacked resource
/// directory. Only the `file://` scheme is meaningful here; anything
/// else is returned unchanged and will fail later at module load with a
/// descriptive error. On Windows the standard writes drive paths as
/// `file:///C:/...`, so the leading separator ahead of the drive letter
/// is stripped as well.
pub fn uri_to_path(uri: &str) -> PathBuf {
    match uri.strip_prefix("file://") {
        Some(rest) => {
            #[cfg(windows)]
            let rest = strip_drive_separator(rest);
            PathBuf::from(rest)
        }
        None => PathBuf::from(uri),
    }
}

#[cfg(any(windows, test))]
fn strip_drive_separator(path: &str) -> &str {
    let bytes = path.as_bytes();
    if bytes.len() > 2 && bytes[0] == b'/' && bytes[2] == b':' {
        &path[1..]
    } else {
        path
    }
}

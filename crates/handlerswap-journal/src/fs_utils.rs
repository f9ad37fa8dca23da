use std::fs::{self, File};
use std::io::{self, Write};
use std::path::Path;

pub(crate) fn ensure_parent_dir(path: &Path) -> io::Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    Ok(())
}

/// Writes `bytes` and waits until the data reaches stable storage.
pub(crate) fn write_synced(file: &mut File, bytes: &[u8]) -> io::Result<()> {
    file.write_all(bytes)?;
    file.flush()?;
    file.sync_data()
}

#[cfg(unix)]
pub(crate) fn mark_executable(path: &Path) -> io::Result<()> {
    use std::os::unix::fs::PermissionsExt;
    fs::set_permissions(path, fs::Permissions::from_mode(0o750))
}

#[cfg(not(unix))]
pub(crate) fn mark_executable(_path: &Path) -> io::Result<()> {
    Ok(())
}

use std::fs;
use std::path::Path;
use std::process::Command;

use anyhow::{anyhow, Context, Result};
use handlerswap_core::{HostConfig, SwitchError};

/// Commands that talk to the host need root and a working Plesk CLI.
pub(crate) fn ensure_host_ready(config: &HostConfig) -> Result<()> {
    let uid = effective_uid()?;
    ensure_privileged(uid)?;
    ensure_host_cli(&config.plesk_bin)?;
    Ok(())
}

pub(crate) fn ensure_privileged(uid: u32) -> Result<(), SwitchError> {
    if uid != 0 {
        return Err(SwitchError::PrivilegeRequired { uid });
    }
    Ok(())
}

pub(crate) fn ensure_host_cli(path: &Path) -> Result<(), SwitchError> {
    if !host_cli_present(path) {
        return Err(SwitchError::HostMissing {
            path: path.to_path_buf(),
        });
    }
    Ok(())
}

pub(crate) fn host_cli_present(path: &Path) -> bool {
    let Ok(metadata) = fs::metadata(path) else {
        return false;
    };
    if !metadata.is_file() {
        return false;
    }
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        metadata.permissions().mode() & 0o111 != 0
    }
    #[cfg(not(unix))]
    {
        true
    }
}

pub(crate) fn effective_uid() -> Result<u32> {
    let output = Command::new("id")
        .arg("-u")
        .output()
        .context("failed to determine effective uid: could not run 'id -u'")?;
    if !output.status.success() {
        return Err(anyhow!(
            "failed to determine effective uid: 'id -u' exited with {}",
            output.status
        ));
    }
    parse_uid(&String::from_utf8_lossy(&output.stdout))
}

pub(crate) fn parse_uid(raw: &str) -> Result<u32> {
    raw.trim()
        .parse::<u32>()
        .with_context(|| format!("unexpected 'id -u' output: '{}'", raw.trim()))
}

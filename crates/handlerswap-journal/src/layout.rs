use anyhow::{Context, Result};
use std::fs;
use std::path::{Path, PathBuf};

/// Paths for everything handlerswap writes, derived from one state directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StateLayout {
    state_dir: PathBuf,
}

impl StateLayout {
    pub fn new(state_dir: impl Into<PathBuf>) -> Self {
        Self {
            state_dir: state_dir.into(),
        }
    }

    pub fn state_dir(&self) -> &Path {
        &self.state_dir
    }

    pub fn rollback_dir(&self) -> PathBuf {
        self.state_dir.join("rollback")
    }

    pub fn session_log_path(&self) -> PathBuf {
        self.state_dir.join("handlerswap.log")
    }

    /// `stamp` is `YYYYmmdd-HHMMSS`; `attempt` disambiguates runs within one second.
    pub fn rollback_artifact_path(
        &self,
        source: &str,
        target: &str,
        stamp: &str,
        attempt: u32,
    ) -> PathBuf {
        let suffix = if attempt == 0 {
            String::new()
        } else {
            format!("-{attempt}")
        };
        self.rollback_dir()
            .join(format!("rollback-{source}-to-{target}-{stamp}{suffix}.sh"))
    }

    pub fn ensure_base_dirs(&self) -> Result<()> {
        for dir in [self.state_dir.clone(), self.rollback_dir()] {
            fs::create_dir_all(&dir)
                .with_context(|| format!("failed to create {}", dir.display()))?;
        }
        Ok(())
    }
}

use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Local};
use handlerswap_core::SwitchError;

use crate::fs_utils::ensure_parent_dir;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    Info,
    Warn,
    Error,
    Success,
}

impl LogLevel {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Info => "INFO",
            Self::Warn => "WARN",
            Self::Error => "ERROR",
            Self::Success => "SUCCESS",
        }
    }
}

/// Append-only session log, one line per event. Opening it is mandatory;
/// individual appends are best-effort and never interrupt the caller.
#[derive(Debug)]
pub struct SessionLog {
    path: PathBuf,
    file: File,
    written: usize,
    dropped: usize,
}

impl SessionLog {
    pub fn open(path: &Path) -> Result<Self, SwitchError> {
        let file = ensure_parent_dir(path)
            .and_then(|()| fs::OpenOptions::new().create(true).append(true).open(path))
            .map_err(|source| SwitchError::ArtifactWriteFailed {
                artifact: "session log",
                path: path.to_path_buf(),
                source,
            })?;
        Ok(Self::from_file(path.to_path_buf(), file))
    }

    pub(crate) fn from_file(path: PathBuf, file: File) -> Self {
        Self {
            path,
            file,
            written: 0,
            dropped: 0,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn entries_written(&self) -> usize {
        self.written
    }

    pub fn entries_dropped(&self) -> usize {
        self.dropped
    }

    pub fn append(&mut self, level: LogLevel, message: impl AsRef<str>) {
        let line = format_log_line(&Local::now(), level, message.as_ref());
        match self
            .file
            .write_all(line.as_bytes())
            .and_then(|()| self.file.flush())
        {
            Ok(()) => self.written += 1,
            Err(err) => {
                self.dropped += 1;
                tracing::warn!(
                    path = %self.path.display(),
                    error = %err,
                    "session log append failed"
                );
            }
        }
    }

    pub fn info(&mut self, message: impl AsRef<str>) {
        self.append(LogLevel::Info, message);
    }

    pub fn warn(&mut self, message: impl AsRef<str>) {
        self.append(LogLevel::Warn, message);
    }

    pub fn error(&mut self, message: impl AsRef<str>) {
        self.append(LogLevel::Error, message);
    }

    pub fn success(&mut self, message: impl AsRef<str>) {
        self.append(LogLevel::Success, message);
    }
}

/// `[YYYY-mm-dd HH:MM:SS] [LEVEL] message`, flattened onto one line.
pub(crate) fn format_log_line(timestamp: &DateTime<Local>, level: LogLevel, message: &str) -> String {
    let flattened = message
        .lines()
        .map(str::trim_end)
        .collect::<Vec<_>>()
        .join(" | ");
    format!(
        "[{}] [{}] {}\n",
        timestamp.format("%Y-%m-%d %H:%M:%S"),
        level.as_str(),
        flattened
    )
}

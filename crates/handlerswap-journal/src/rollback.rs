use std::fs::{self, File};
use std::io;
use std::path::{Path, PathBuf};

use anyhow::{anyhow, Result};
use chrono::{DateTime, Local};
use handlerswap_core::SwitchError;

use crate::fs_utils::{ensure_parent_dir, mark_executable, write_synced};
use crate::StateLayout;

const ARTIFACT_KIND: &str = "rollback script";
const HEADER_SOURCE: &str = "# source handler: ";
const HEADER_TARGET: &str = "# target handler: ";
const HEADER_GENERATED: &str = "# generated at: ";
const MAX_NAME_ATTEMPTS: u32 = 100;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReversalLine {
    pub entity: String,
    pub handler: String,
}

/// A rollback script read back from disk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RollbackArtifact {
    pub source_handler: String,
    pub target_handler: String,
    pub generated_at: Option<String>,
    pub lines: Vec<ReversalLine>,
}

/// Append-only writer for one batch's rollback script. Every line is synced
/// to disk before `record` returns.
#[derive(Debug)]
pub struct RollbackRecorder {
    path: PathBuf,
    file: File,
    host_cli: PathBuf,
    recorded: usize,
}

impl RollbackRecorder {
    /// Creates a new script holding only the header. Never reuses an existing file.
    pub fn open(
        layout: &StateLayout,
        host_cli: &Path,
        source: &str,
        target: &str,
        generated_at: DateTime<Local>,
    ) -> Result<Self, SwitchError> {
        let stamp = generated_at.format("%Y%m%d-%H%M%S").to_string();
        let mut attempt = 0;
        let (path, file) = loop {
            let path = layout.rollback_artifact_path(source, target, &stamp, attempt);
            match create_new_artifact(&path) {
                Ok(file) => break (path, file),
                Err(err) if err.kind() == io::ErrorKind::AlreadyExists => {
                    attempt += 1;
                    if attempt >= MAX_NAME_ATTEMPTS {
                        return Err(artifact_error(path, err));
                    }
                }
                Err(err) => return Err(artifact_error(path, err)),
            }
        };

        let mut recorder = Self {
            path,
            file,
            host_cli: host_cli.to_path_buf(),
            recorded: 0,
        };
        let header = render_header(host_cli, source, target, &generated_at);
        write_synced(&mut recorder.file, header.as_bytes())
            .and_then(|()| mark_executable(&recorder.path))
            .map_err(|err| artifact_error(recorder.path.clone(), err))?;
        tracing::debug!(path = %recorder.path.display(), "opened rollback script");
        Ok(recorder)
    }

    #[cfg(test)]
    pub(crate) fn from_parts(path: PathBuf, file: File, host_cli: PathBuf) -> Self {
        Self {
            path,
            file,
            host_cli,
            recorded: 0,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn recorded(&self) -> usize {
        self.recorded
    }

    /// Appends the instruction that binds `entity` back to `reversal_handler`.
    pub fn record(&mut self, entity: &str, reversal_handler: &str) -> Result<(), SwitchError> {
        let mut line = render_reversal_line(&self.host_cli, entity, reversal_handler);
        line.push('\n');
        write_synced(&mut self.file, line.as_bytes())
            .map_err(|err| artifact_error(self.path.clone(), err))?;
        self.recorded += 1;
        Ok(())
    }
}

fn create_new_artifact(path: &Path) -> io::Result<File> {
    ensure_parent_dir(path)?;
    fs::OpenOptions::new()
        .write(true)
        .create_new(true)
        .open(path)
}

fn artifact_error(path: PathBuf, source: io::Error) -> SwitchError {
    SwitchError::ArtifactWriteFailed {
        artifact: ARTIFACT_KIND,
        path,
        source,
    }
}

pub(crate) fn render_header(
    host_cli: &Path,
    source: &str,
    target: &str,
    generated_at: &DateTime<Local>,
) -> String {
    format!(
        "#!/bin/sh\n\
         # handlerswap rollback script\n\
         {HEADER_SOURCE}{source}\n\
         {HEADER_TARGET}{target}\n\
         {HEADER_GENERATED}{}\n\
         # host cli: {}\n\
         # Each line binds one domain back to the source handler.\n\
         # Lines are independent and safe to run again.\n",
        generated_at.format("%Y-%m-%d %H:%M:%S %z"),
        host_cli.display()
    )
}

pub(crate) fn render_reversal_line(host_cli: &Path, entity: &str, handler: &str) -> String {
    format!(
        "{} bin domain --update {} -php_handler_id {}",
        shell_quote(&host_cli.display().to_string()),
        shell_quote(entity),
        shell_quote(handler)
    )
}

fn shell_quote(value: &str) -> String {
    format!("'{}'", value.replace('\'', "'\\''"))
}

pub fn parse_rollback_artifact(raw: &str) -> Result<RollbackArtifact> {
    let mut source_handler = None;
    let mut target_handler = None;
    let mut generated_at = None;
    let mut lines = Vec::new();

    for (number, line) in raw.lines().enumerate() {
        let line = line.trim();
        if let Some(value) = line.strip_prefix(HEADER_SOURCE) {
            source_handler = Some(value.trim().to_string());
            continue;
        }
        if let Some(value) = line.strip_prefix(HEADER_TARGET) {
            target_handler = Some(value.trim().to_string());
            continue;
        }
        if let Some(value) = line.strip_prefix(HEADER_GENERATED) {
            generated_at = Some(value.trim().to_string());
            continue;
        }
        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        let words = split_shell_words(line)
            .map_err(|err| anyhow!("line {}: {err}", number + 1))?;
        lines.push(
            reversal_from_words(&words)
                .ok_or_else(|| anyhow!("line {}: not a rollback instruction: {line}", number + 1))?,
        );
    }

    Ok(RollbackArtifact {
        source_handler: source_handler
            .ok_or_else(|| anyhow!("rollback script is missing the source handler header"))?,
        target_handler: target_handler
            .ok_or_else(|| anyhow!("rollback script is missing the target handler header"))?,
        generated_at,
        lines,
    })
}

fn reversal_from_words(words: &[String]) -> Option<ReversalLine> {
    match words {
        [_, bin, domain, update, entity, flag, handler]
            if bin == "bin"
                && domain == "domain"
                && update == "--update"
                && flag == "-php_handler_id" =>
        {
            Some(ReversalLine {
                entity: entity.clone(),
                handler: handler.clone(),
            })
        }
        _ => None,
    }
}

/// Splits a line of single-quoted and bare words, the subset of shell
/// syntax that `render_reversal_line` produces.
fn split_shell_words(line: &str) -> Result<Vec<String>> {
    let mut words = Vec::new();
    let mut current = String::new();
    let mut in_word = false;
    let mut chars = line.chars();

    while let Some(ch) = chars.next() {
        match ch {
            '\'' => {
                in_word = true;
                loop {
                    match chars.next() {
                        Some('\'') => break,
                        Some(inner) => current.push(inner),
                        None => return Err(anyhow!("unterminated single quote")),
                    }
                }
            }
            '\\' => {
                in_word = true;
                let escaped = chars
                    .next()
                    .ok_or_else(|| anyhow!("dangling escape at end of line"))?;
                current.push(escaped);
            }
            ch if ch.is_whitespace() => {
                if in_word {
                    words.push(std::mem::take(&mut current));
                    in_word = false;
                }
            }
            '"' | '$' | '`' | ';' | '|' | '&' | '<' | '>' => {
                return Err(anyhow!("unsupported shell syntax '{ch}'"));
            }
            other => {
                in_word = true;
                current.push(other);
            }
        }
    }
    if in_word {
        words.push(current);
    }
    Ok(words)
}

use std::path::{Path, PathBuf};
use std::process::Command;
use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use handlerswap_core::{HandlerRecord, HostConfig, HostPanel, SwitchError};
use serde::Deserialize;

use crate::command::run_with_timeout;

/// `HostPanel` backed by the Plesk command-line interface.
#[derive(Debug, Clone)]
pub struct PleskCli {
    bin: PathBuf,
    query_timeout: Duration,
    mutation_timeout: Duration,
}

#[derive(Debug, Deserialize)]
struct PleskHandlerJson {
    id: String,
    #[serde(default)]
    displayname: Option<String>,
    #[serde(default, rename = "fullVersion")]
    full_version: Option<String>,
    #[serde(default)]
    status: Option<String>,
}

impl PleskCli {
    pub fn new(config: &HostConfig) -> Self {
        Self {
            bin: config.plesk_bin.clone(),
            query_timeout: config.query_timeout(),
            mutation_timeout: config.mutation_timeout(),
        }
    }

    pub fn bin(&self) -> &Path {
        &self.bin
    }

    fn base_command(&self) -> Command {
        Command::new(&self.bin)
    }

    fn query(&self, command: Command, operation: &str) -> Result<String, SwitchError> {
        run_with_timeout(command, self.query_timeout, operation)
            .map(|output| output.stdout)
            .map_err(|err| SwitchError::host_unreachable(operation, &err))
    }
}

impl HostPanel for PleskCli {
    fn handler_records(&self) -> Result<Vec<HandlerRecord>, SwitchError> {
        let operation = "list php handlers";
        let raw = self.query(build_list_handlers_command(self.base_command()), operation)?;
        parse_handler_list_json(&raw).map_err(|err| SwitchError::host_unreachable(operation, &err))
    }

    fn usage_counts(&self, prefix: &str) -> Result<Vec<(String, u64)>, SwitchError> {
        let operation = "count handler usage";
        let command = build_usage_query_command(self.base_command(), prefix)
            .map_err(|err| SwitchError::host_unreachable(operation, &err))?;
        let raw = self.query(command, operation)?;
        parse_usage_rows(&raw).map_err(|err| SwitchError::host_unreachable(operation, &err))
    }

    fn entities_for(&self, handler: &str) -> Result<Vec<String>, SwitchError> {
        let operation = "list domains for handler";
        let command = build_entities_query_command(self.base_command(), handler)
            .map_err(|err| SwitchError::host_unreachable(operation, &err))?;
        let raw = self.query(command, operation)?;
        Ok(parse_entity_rows(&raw))
    }

    fn rebind(&self, entity: &str, handler: &str) -> Result<()> {
        let command = build_rebind_command(self.base_command(), entity, handler);
        run_with_timeout(
            command,
            self.mutation_timeout,
            &format!("failed to switch '{entity}' to '{handler}'"),
        )?;
        Ok(())
    }
}

pub(crate) fn build_list_handlers_command(mut command: Command) -> Command {
    command.args(["bin", "php_handler", "--list", "-json"]);
    command
}

pub(crate) fn build_usage_query_command(mut command: Command, prefix: &str) -> Result<Command> {
    ensure_query_token(prefix)?;
    let query = format!(
        "SELECT php_handler_id, COUNT(*) FROM hosting WHERE php_handler_id LIKE '{prefix}%' GROUP BY php_handler_id ORDER BY php_handler_id"
    );
    command.arg("db").arg("-Ne").arg(query);
    Ok(command)
}

pub(crate) fn build_entities_query_command(mut command: Command, handler: &str) -> Result<Command> {
    ensure_query_token(handler)?;
    let query = format!(
        "SELECT d.name FROM domains d JOIN hosting h ON h.dom_id = d.id WHERE h.php_handler_id = '{handler}' ORDER BY d.id"
    );
    command.arg("db").arg("-Ne").arg(query);
    Ok(command)
}

pub(crate) fn build_rebind_command(mut command: Command, entity: &str, handler: &str) -> Command {
    command.args([
        "bin",
        "domain",
        "--update",
        entity,
        "-php_handler_id",
        handler,
    ]);
    command
}

/// Values spliced into SQL must stay inside the handler-id alphabet.
fn ensure_query_token(value: &str) -> Result<()> {
    let valid = !value.is_empty()
        && value.bytes().all(|byte| {
            byte.is_ascii_alphanumeric() || byte == b'-' || byte == b'_' || byte == b'.'
        });
    if !valid {
        return Err(anyhow!("refusing to query with unsafe handler token '{value}'"));
    }
    Ok(())
}

pub(crate) fn parse_handler_list_json(raw: &str) -> Result<Vec<HandlerRecord>> {
    let entries: Vec<PleskHandlerJson> =
        serde_json::from_str(raw.trim()).context("php handler list is not valid JSON")?;
    Ok(entries
        .into_iter()
        .map(|entry| HandlerRecord {
            enabled: entry
                .status
                .as_deref()
                .is_some_and(|status| status.eq_ignore_ascii_case("enabled")),
            id: entry.id,
            display_name: entry.displayname,
            full_version: entry.full_version,
        })
        .collect())
}

pub(crate) fn parse_usage_rows(raw: &str) -> Result<Vec<(String, u64)>> {
    let mut rows = Vec::new();
    for line in raw.lines().map(str::trim).filter(|line| !line.is_empty()) {
        let (handler, count) = line
            .split_once('\t')
            .ok_or_else(|| anyhow!("invalid usage row: '{line}'"))?;
        let count = count
            .trim()
            .parse::<u64>()
            .with_context(|| format!("invalid usage count in row: '{line}'"))?;
        rows.push((handler.trim().to_string(), count));
    }
    Ok(rows)
}

pub(crate) fn parse_entity_rows(raw: &str) -> Vec<String> {
    raw.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(str::to_string)
        .collect()
}

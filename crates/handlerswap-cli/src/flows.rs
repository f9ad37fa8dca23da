use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::Local;
use handlerswap_core::{
    ensure_distinct, select_handler, validate_handler_id, Handler, HostConfig, HostPanel,
    SelectionMenu, SelectionMode, SwitchError, SwitchSummary,
};
use handlerswap_host::{Assignment, AssignmentIndex, HandlerInventory};
use handlerswap_journal::{
    parse_rollback_artifact, replay_all, switch_all, RollbackRecorder, SessionLog, StateLayout,
};

use crate::interrupt::InterruptGuard;
use crate::prompt::Operator;
use crate::render::{format_summary_lines, TerminalRenderer};

const SOURCE_MENU_TITLE: &str = "Select the handler to migrate away from";
const TARGET_MENU_TITLE: &str = "Select the handler to migrate to";

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub(crate) struct SwitchRequest {
    pub from: Option<String>,
    pub to: Option<String>,
    pub assume_yes: bool,
    pub dry_run: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum SwitchReport {
    NothingToSwitch {
        source: String,
    },
    DryRun {
        source: String,
        target: String,
        entities: Vec<String>,
    },
    Declined,
    Completed {
        summary: SwitchSummary,
        artifact: PathBuf,
    },
}

impl SwitchReport {
    fn describe(&self) -> String {
        match self {
            Self::NothingToSwitch { source } => format!("no domains use {source}"),
            Self::DryRun {
                source,
                target,
                entities,
            } => format!(
                "dry run, {} domains would move from {source} to {target}",
                entities.len()
            ),
            Self::Declined => "operator declined, no changes made".to_string(),
            Self::Completed { summary, artifact } => format!(
                "{} switched, {} failed, rollback script {}",
                summary.succeeded,
                summary.failed,
                artifact.display()
            ),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum ReplayReport {
    Empty,
    Declined,
    Completed { summary: SwitchSummary },
}

/// The interactive migration: pick source and target, confirm, then switch
/// every bound domain while recording the rollback script.
pub(crate) fn run_switch_flow<P, O>(
    panel: &P,
    config: &HostConfig,
    layout: &StateLayout,
    request: &SwitchRequest,
    operator: &mut O,
    renderer: TerminalRenderer,
) -> Result<SwitchReport>
where
    P: HostPanel + ?Sized,
    O: Operator,
{
    layout.ensure_base_dirs()?;
    let mut log = SessionLog::open(&layout.session_log_path())?;
    log.info(format!(
        "session started: switch (pid {}, dry_run={})",
        std::process::id(),
        request.dry_run
    ));

    let result = switch_session(panel, config, layout, request, operator, renderer, &mut log);
    match &result {
        Ok(report) => log.info(format!("session finished: {}", report.describe())),
        Err(err) => log.error(format!("session aborted: {err:#}")),
    }
    result
}

fn switch_session<P, O>(
    panel: &P,
    config: &HostConfig,
    layout: &StateLayout,
    request: &SwitchRequest,
    operator: &mut O,
    renderer: TerminalRenderer,
    log: &mut SessionLog,
) -> Result<SwitchReport>
where
    P: HostPanel + ?Sized,
    O: Operator,
{
    let candidates = HandlerInventory::new(panel, config).snapshot()?;

    let source = choose_handler(
        &candidates,
        SelectionMode::FilterToUsedOnly,
        request.from.as_deref(),
        SOURCE_MENU_TITLE,
        operator,
    )?;
    log.info(format!(
        "source handler selected: {} ({} domains)",
        source.id, source.usage
    ));

    let target = choose_handler(
        &candidates,
        SelectionMode::AllAvailable,
        request.to.as_deref(),
        TARGET_MENU_TITLE,
        operator,
    )?;
    log.info(format!("target handler selected: {}", target.id));
    ensure_distinct(&source, &target)?;

    let entities = AssignmentIndex::new(panel).entities_using(&source.id)?;
    if entities.is_empty() {
        renderer.print_status("warn", &format!("No domains use {}", source.id));
        return Ok(SwitchReport::NothingToSwitch { source: source.id });
    }

    renderer.print_section("Plan");
    renderer.print_lines(&format_switch_plan(&source, &target, &entities));

    if request.dry_run {
        renderer.print_status("ok", "dry run: no rollback script written, no domain changed");
        return Ok(SwitchReport::DryRun {
            source: source.id,
            target: target.id,
            entities,
        });
    }

    let question = format!(
        "Switch {} domains from {} to {}?",
        entities.len(),
        source.id,
        target.id
    );
    if !request.assume_yes && !operator.confirm(&question)? {
        renderer.print_status("warn", "Aborted: no changes made");
        return Ok(SwitchReport::Declined);
    }
    log.info(format!(
        "confirmed: switching {} domains from {} to {}",
        entities.len(),
        source.id,
        target.id
    ));

    let mut recorder =
        RollbackRecorder::open(layout, &config.plesk_bin, &source.id, &target.id, Local::now())?;
    renderer.print_status(
        "step",
        &format!("rollback script: {}", recorder.path().display()),
    );

    let guard = InterruptGuard::arm();
    let mut progress = renderer.start_progress("switch", entities.len() as u64);
    let result = switch_all(
        panel,
        &mut recorder,
        log,
        &entities,
        &source.id,
        &target.id,
        guard.flag(),
        |_, outcome| progress.record(outcome),
    );
    drop(guard);
    let summary = match result {
        Ok(summary) => {
            progress.finish_success();
            summary
        }
        Err(err) => {
            progress.finish_abandon();
            return Err(err).with_context(|| {
                format!(
                    "batch stopped; rollback script so far ({} lines): {}",
                    recorder.recorded(),
                    recorder.path().display()
                )
            });
        }
    };

    renderer.print_lines(&format_summary_lines(&summary, renderer.style()));
    if summary.is_interrupted() {
        return Err(SwitchError::Interrupted {
            processed: summary.total(),
            total: entities.len(),
        })
        .with_context(|| {
            format!(
                "{} domains not attempted; undo the switched ones with: sh {}",
                summary.skipped,
                recorder.path().display()
            )
        });
    }
    renderer.print_status(
        "step",
        &format!(
            "undo with: sh {} (or handlerswap rollback {})",
            recorder.path().display(),
            recorder.path().display()
        ),
    );
    Ok(SwitchReport::Completed {
        summary,
        artifact: recorder.path().to_path_buf(),
    })
}

fn choose_handler<O: Operator>(
    candidates: &[Handler],
    mode: SelectionMode,
    named: Option<&str>,
    title: &str,
    operator: &mut O,
) -> Result<Handler> {
    if let Some(named) = named {
        return Ok(SelectionMenu::build(candidates, mode).resolve_named(named)?);
    }
    select_handler(candidates, mode, |menu| operator.choose(title, menu))
}

pub(crate) fn format_switch_plan(
    source: &Handler,
    target: &Handler,
    entities: &[String],
) -> Vec<String> {
    let mut lines = Vec::with_capacity(entities.len() + 2);
    lines.push(format!("from:    {}", source.id));
    lines.push(format!("to:      {}", target.id));
    lines.push(format!("domains: {}", entities.len()));
    for entity in entities {
        lines.push(format!("  - {entity}"));
    }
    lines
}

pub(crate) fn run_handlers_command<P: HostPanel + ?Sized>(
    panel: &P,
    config: &HostConfig,
) -> Result<Vec<String>> {
    let handlers = HandlerInventory::new(panel, config).list_available_handlers()?;
    Ok(format_handler_lines(&handlers))
}

pub(crate) fn format_handler_lines(handlers: &[Handler]) -> Vec<String> {
    if handlers.is_empty() {
        return vec!["No enabled handlers in the managed family".to_string()];
    }

    let mut lines = Vec::with_capacity(handlers.len() + 1);
    lines.push("handler\tversion\tdomains".to_string());
    for handler in handlers {
        lines.push(format!(
            "{}\t{}\t{}",
            handler.id,
            handler.display_name.as_deref().unwrap_or("-"),
            handler.usage
        ));
    }
    lines
}

pub(crate) fn run_usage_command<P: HostPanel + ?Sized>(
    panel: &P,
    config: &HostConfig,
    with_domains: bool,
) -> Result<Vec<String>> {
    let used = HandlerInventory::new(panel, config).list_used_handlers()?;
    let assignment = if with_domains {
        Some(AssignmentIndex::new(panel).assignment(&used)?)
    } else {
        None
    };
    Ok(format_usage_lines(&used, assignment.as_ref()))
}

pub(crate) fn format_usage_lines(used: &[Handler], assignment: Option<&Assignment>) -> Vec<String> {
    if used.is_empty() {
        return vec!["No domains use a handler in the managed family".to_string()];
    }

    let mut lines = Vec::new();
    for handler in used {
        let state = if handler.available { "" } else { " (disabled)" };
        lines.push(format!("{}: {} domains{state}", handler.id, handler.usage));
        if let Some(assignment) = assignment {
            for entity in assignment.entities_for(&handler.id) {
                lines.push(format!("  {entity}"));
            }
        }
    }
    let total = used.iter().map(|handler| handler.usage).sum::<u64>();
    lines.push(format!("total: {total} domains"));
    lines
}

pub(crate) fn run_domains_command<P: HostPanel + ?Sized>(
    panel: &P,
    config: &HostConfig,
    handler: &str,
) -> Result<Vec<String>> {
    validate_handler_id(&config.handler_prefix, handler)
        .map_err(|err| SwitchError::invalid_selection(handler, format!("{err:#}")))?;
    let entities = AssignmentIndex::new(panel).entities_using(handler)?;
    if entities.is_empty() {
        return Ok(vec![format!("No domains use {handler}")]);
    }
    Ok(entities)
}

/// Replays a rollback script through the host instead of the shell, so each
/// line lands in the session log and failures are counted.
pub(crate) fn run_rollback_command<P, O>(
    panel: &P,
    layout: &StateLayout,
    script: &Path,
    assume_yes: bool,
    operator: &mut O,
    renderer: TerminalRenderer,
) -> Result<ReplayReport>
where
    P: HostPanel + ?Sized,
    O: Operator,
{
    let raw = fs::read_to_string(script)
        .with_context(|| format!("failed to read rollback script: {}", script.display()))?;
    let artifact = parse_rollback_artifact(&raw)
        .with_context(|| format!("failed parsing rollback script: {}", script.display()))?;

    if artifact.lines.is_empty() {
        renderer.print_status("warn", "Rollback script has no domains to restore");
        return Ok(ReplayReport::Empty);
    }

    renderer.print_section("Rollback");
    let mut lines = vec![
        format!("script:  {}", script.display()),
        format!(
            "restore: {} -> {}",
            artifact.target_handler, artifact.source_handler
        ),
        format!("domains: {}", artifact.lines.len()),
    ];
    if let Some(generated_at) = &artifact.generated_at {
        lines.push(format!("written: {generated_at}"));
    }
    renderer.print_lines(&lines);

    layout.ensure_base_dirs()?;
    let mut log = SessionLog::open(&layout.session_log_path())?;
    log.info(format!(
        "session started: rollback {} (pid {})",
        script.display(),
        std::process::id()
    ));

    let question = format!(
        "Restore {} domains to {}?",
        artifact.lines.len(),
        artifact.source_handler
    );
    if !assume_yes && !operator.confirm(&question)? {
        log.warn("session finished: rollback declined, no changes made");
        renderer.print_status("warn", "Aborted: no changes made");
        return Ok(ReplayReport::Declined);
    }

    let guard = InterruptGuard::arm();
    let mut progress = renderer.start_progress("rollback", artifact.lines.len() as u64);
    let summary = replay_all(panel, &mut log, &artifact, guard.flag(), |_, outcome| {
        progress.record(outcome)
    });
    drop(guard);
    progress.finish_success();
    renderer.print_lines(&format_summary_lines(&summary, renderer.style()));

    if summary.is_interrupted() {
        log.error(format!(
            "session aborted: rollback interrupted, {} switched, {} failed, {} skipped",
            summary.succeeded, summary.failed, summary.skipped
        ));
        return Err(SwitchError::Interrupted {
            processed: summary.total(),
            total: artifact.lines.len(),
        }
        .into());
    }
    log.info(format!(
        "session finished: rollback {} switched, {} failed",
        summary.succeeded, summary.failed
    ));
    Ok(ReplayReport::Completed { summary })
}

pub(crate) fn format_doctor_lines(
    config: &HostConfig,
    layout: &StateLayout,
    uid: Option<u32>,
    host_cli_present: bool,
) -> Result<Vec<String>> {
    let privileges = match uid {
        Some(0) => "root".to_string(),
        Some(uid) => format!("uid {uid} (root required)"),
        None => "unknown".to_string(),
    };
    let mut lines = vec![
        format!("privileges: {privileges}"),
        format!(
            "host cli: {} ({})",
            config.plesk_bin.display(),
            if host_cli_present { "found" } else { "missing" }
        ),
        format!("rollback scripts: {}", layout.rollback_dir().display()),
        format!("session log: {}", layout.session_log_path().display()),
        "config:".to_string(),
    ];
    let rendered = toml::to_string(config).context("failed serializing config")?;
    lines.extend(rendered.lines().map(|line| format!("  {line}")));
    Ok(lines)
}

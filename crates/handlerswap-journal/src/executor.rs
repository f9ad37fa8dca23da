use std::sync::atomic::{AtomicBool, Ordering};

use handlerswap_core::{HostPanel, SwitchError, SwitchOutcome, SwitchSummary};

use crate::{RollbackArtifact, RollbackRecorder, SessionLog};

/// Moves every domain in `entities` from `source` to `target`, one at a time
/// and in order.
///
/// The reversal line for a domain is on disk before its rebind is issued and
/// stays there whatever the outcome. If that line cannot be written the batch
/// stops before touching the domain. A failed rebind is counted and the sweep
/// carries on.
///
/// `interrupt` is checked between domains only; a rebind already issued is
/// always waited for. Domains left after an interrupt are counted as skipped.
pub fn switch_all<P, Observe>(
    panel: &P,
    recorder: &mut RollbackRecorder,
    log: &mut SessionLog,
    entities: &[String],
    source: &str,
    target: &str,
    interrupt: &AtomicBool,
    mut on_outcome: Observe,
) -> Result<SwitchSummary, SwitchError>
where
    P: HostPanel + ?Sized,
    Observe: FnMut(usize, &SwitchOutcome),
{
    log.info(format!(
        "batch started: {} domains from {source} to {target}, rollback script {}",
        entities.len(),
        recorder.path().display()
    ));

    let mut summary = SwitchSummary::default();
    for (index, entity) in entities.iter().enumerate() {
        if stop_requested(interrupt, log, &mut summary, index, entities.len()) {
            break;
        }
        if let Err(err) = recorder.record(entity, source) {
            log.error(format!(
                "stopping before {entity}: rollback line could not be written: {err}"
            ));
            log.info(format!(
                "batch aborted after {} of {} domains: {} succeeded, {} failed",
                summary.total(),
                entities.len(),
                summary.succeeded,
                summary.failed
            ));
            return Err(err);
        }

        let outcome = apply_rebind(panel, entity, source, target);
        log_outcome(log, &outcome);
        summary.observe(&outcome);
        on_outcome(index, &outcome);
    }

    log.info(format!(
        "batch {}: {} succeeded, {} failed, {} skipped",
        if summary.is_interrupted() { "interrupted" } else { "finished" },
        summary.succeeded,
        summary.failed,
        summary.skipped
    ));
    Ok(summary)
}

/// Replays a rollback script through the host, line by line, with the same
/// per-domain failure handling as `switch_all`.
pub fn replay_all<P, Observe>(
    panel: &P,
    log: &mut SessionLog,
    artifact: &RollbackArtifact,
    interrupt: &AtomicBool,
    mut on_outcome: Observe,
) -> SwitchSummary
where
    P: HostPanel + ?Sized,
    Observe: FnMut(usize, &SwitchOutcome),
{
    log.info(format!(
        "rollback started: {} domains from {} back to {}",
        artifact.lines.len(),
        artifact.target_handler,
        artifact.source_handler
    ));

    let mut summary = SwitchSummary::default();
    for (index, line) in artifact.lines.iter().enumerate() {
        if stop_requested(interrupt, log, &mut summary, index, artifact.lines.len()) {
            break;
        }
        let outcome = apply_rebind(panel, &line.entity, &artifact.target_handler, &line.handler);
        log_outcome(log, &outcome);
        summary.observe(&outcome);
        on_outcome(index, &outcome);
    }

    log.info(format!(
        "rollback {}: {} succeeded, {} failed, {} skipped",
        if summary.is_interrupted() { "interrupted" } else { "finished" },
        summary.succeeded,
        summary.failed,
        summary.skipped
    ));
    summary
}

fn stop_requested(
    interrupt: &AtomicBool,
    log: &mut SessionLog,
    summary: &mut SwitchSummary,
    index: usize,
    total: usize,
) -> bool {
    if !interrupt.load(Ordering::SeqCst) {
        return false;
    }
    summary.skipped = total - index;
    log.warn(format!(
        "interrupted after {index} of {total} domains; {} not attempted",
        summary.skipped
    ));
    true
}

fn apply_rebind<P>(panel: &P, entity: &str, source: &str, target: &str) -> SwitchOutcome
where
    P: HostPanel + ?Sized,
{
    match panel.rebind(entity, target) {
        Ok(()) => SwitchOutcome::Succeeded {
            entity: entity.to_string(),
            source: source.to_string(),
            target: target.to_string(),
        },
        Err(err) => SwitchOutcome::Failed {
            entity: entity.to_string(),
            source: source.to_string(),
            target: target.to_string(),
            detail: format!("{err:#}"),
        },
    }
}

fn log_outcome(log: &mut SessionLog, outcome: &SwitchOutcome) {
    match outcome {
        SwitchOutcome::Succeeded {
            entity,
            source,
            target,
        } => log.success(format!("{entity}: {source} -> {target}")),
        SwitchOutcome::Failed {
            entity,
            source,
            target,
            detail,
        } => log.error(format!(
            "{entity}: switch from {source} to {target} failed: {detail}"
        )),
    }
}

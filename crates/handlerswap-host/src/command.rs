use std::io::Read;
use std::process::{Child, Command, ExitStatus, Stdio};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use anyhow::{anyhow, Context, Result};

const POLL_INTERVAL: Duration = Duration::from_millis(25);

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct CommandOutput {
    pub stdout: String,
    pub stderr: String,
}

/// Runs `command` to completion or kills it once `timeout` elapses.
///
/// The child gets its own process group on unix, so a terminal interrupt
/// stops this tool without cutting a host mutation off halfway.
pub(crate) fn run_with_timeout(
    mut command: Command,
    timeout: Duration,
    context_message: &str,
) -> Result<CommandOutput> {
    command
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped());
    #[cfg(unix)]
    {
        use std::os::unix::process::CommandExt;
        command.process_group(0);
    }

    tracing::debug!(command = ?command, timeout_secs = timeout.as_secs(), "running host command");
    let started_at = Instant::now();
    let mut child = command
        .spawn()
        .with_context(|| format!("{context_message}: command failed to start"))?;
    let stdout_reader = child.stdout.take().map(spawn_pipe_reader);
    let stderr_reader = child.stderr.take().map(spawn_pipe_reader);

    let status = loop {
        if let Some(status) = child
            .try_wait()
            .with_context(|| format!("{context_message}: failed waiting for command"))?
        {
            break status;
        }
        if started_at.elapsed() >= timeout {
            terminate_process_group(&mut child);
            return Err(anyhow!("{context_message}: timed out after {timeout:?}"));
        }
        thread::sleep(POLL_INTERVAL);
    };

    let output = CommandOutput {
        stdout: join_pipe_reader(stdout_reader),
        stderr: join_pipe_reader(stderr_reader),
    };
    tracing::debug!(
        status = %status,
        elapsed_ms = started_at.elapsed().as_millis() as u64,
        "host command finished"
    );
    ensure_success(status, &output, context_message)?;
    Ok(output)
}

/// Kills the child and everything it spawned, then reaps the child. The
/// child leads its own process group, so its pid is the group id.
fn terminate_process_group(child: &mut Child) {
    #[cfg(unix)]
    {
        if let Ok(group) = libc::pid_t::try_from(child.id()) {
            unsafe {
                libc::killpg(group, libc::SIGKILL);
            }
        }
    }
    let _ = child.kill();
    let _ = child.wait();
}

fn ensure_success(status: ExitStatus, output: &CommandOutput, context_message: &str) -> Result<()> {
    if status.success() {
        return Ok(());
    }
    Err(anyhow!(
        "{context_message}: status={} stdout='{}' stderr='{}'",
        status,
        output.stdout.trim(),
        output.stderr.trim()
    ))
}

fn spawn_pipe_reader<R>(mut pipe: R) -> JoinHandle<Vec<u8>>
where
    R: Read + Send + 'static,
{
    thread::spawn(move || {
        let mut buffer = Vec::new();
        let _ = pipe.read_to_end(&mut buffer);
        buffer
    })
}

fn join_pipe_reader(reader: Option<JoinHandle<Vec<u8>>>) -> String {
    reader
        .and_then(|handle| handle.join().ok())
        .map(|bytes| String::from_utf8_lossy(&bytes).into_owned())
        .unwrap_or_default()
}

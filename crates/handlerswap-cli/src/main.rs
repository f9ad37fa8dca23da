use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use handlerswap_core::{SwitchError, EXIT_FAILURE, EXIT_INVALID_INPUT};
use tracing_subscriber::EnvFilter;

mod completion;
mod dispatch;
mod flows;
mod interrupt;
mod preflight;
mod prompt;
mod render;

use completion::CliCompletionShell;
use dispatch::run_cli;

const LOG_FILTER_ENV: &str = "HANDLERSWAP_LOG";

#[derive(Parser, Debug)]
#[command(name = "handlerswap", version)]
#[command(
    about = "Move Plesk domains between PHP handlers with a replayable rollback script",
    long_about = None
)]
struct Cli {
    /// Config file (defaults to /etc/handlerswap.toml when present).
    #[arg(long, global = true)]
    config: Option<PathBuf>,
    /// Print host commands and timings to stderr.
    #[arg(short, long, global = true)]
    verbose: bool,
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
enum Commands {
    /// Switch every domain using one handler to another (the default command).
    Switch {
        /// Source handler; skips the source menu.
        #[arg(long)]
        from: Option<String>,
        /// Target handler; skips the target menu.
        #[arg(long)]
        to: Option<String>,
        /// Do not ask for confirmation.
        #[arg(short, long)]
        yes: bool,
        /// Show the plan without writing a rollback script or touching domains.
        #[arg(long)]
        dry_run: bool,
    },
    /// List enabled handlers with the number of domains using each.
    Handlers,
    /// Report handlers in use.
    Usage {
        /// Also list the domains bound to each handler.
        #[arg(long)]
        domains: bool,
    },
    /// List domains bound to one handler.
    Domains { handler: String },
    /// Replay a rollback script written by an earlier switch.
    Rollback {
        script: PathBuf,
        #[arg(short, long)]
        yes: bool,
    },
    /// Show resolved configuration and check host prerequisites.
    Doctor,
    /// Print a shell completion script.
    Completions {
        #[arg(value_enum)]
        shell: CliCompletionShell,
    },
}

fn main() -> ExitCode {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(err) => {
            let code = if err.use_stderr() {
                EXIT_INVALID_INPUT
            } else {
                0
            };
            let _ = err.print();
            return ExitCode::from(code);
        }
    };

    init_tracing(cli.verbose);
    match run_cli(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("error: {err:#}");
            ExitCode::from(exit_code_for_error(&err))
        }
    }
}

fn init_tracing(verbose: bool) {
    let default_directive = if verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_env(LOG_FILTER_ENV)
        .unwrap_or_else(|_| EnvFilter::new(default_directive));
    let _ = tracing_subscriber::fmt()
        .with_target(false)
        .with_writer(std::io::stderr)
        .with_env_filter(filter)
        .try_init();
}

fn exit_code_for_error(err: &anyhow::Error) -> u8 {
    err.chain()
        .find_map(|cause| cause.downcast_ref::<SwitchError>())
        .map(SwitchError::exit_code)
        .unwrap_or(EXIT_FAILURE)
}

#[cfg(test)]
mod tests;

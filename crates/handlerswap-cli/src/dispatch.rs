use std::io;

use anyhow::Result;
use handlerswap_core::HostConfig;
use handlerswap_host::PleskCli;
use handlerswap_journal::StateLayout;
use tracing::debug;

use crate::completion::write_completions_script;
use crate::flows::{
    format_doctor_lines, run_domains_command, run_handlers_command, run_rollback_command,
    run_switch_flow, run_usage_command, SwitchRequest,
};
use crate::preflight::{effective_uid, ensure_host_ready, host_cli_present};
use crate::prompt::TerminalOperator;
use crate::render::TerminalRenderer;
use crate::{Cli, Commands};

pub(crate) fn run_cli(cli: Cli) -> Result<()> {
    let command = cli.command.unwrap_or(Commands::Switch {
        from: None,
        to: None,
        yes: false,
        dry_run: false,
    });

    if let Commands::Completions { shell } = command {
        return write_completions_script(shell, &mut io::stdout());
    }

    let config = HostConfig::load(cli.config.as_deref())?;
    let layout = StateLayout::new(&config.state_dir);
    let renderer = TerminalRenderer::current();
    debug!(
        plesk_bin = %config.plesk_bin.display(),
        state_dir = %config.state_dir.display(),
        "configuration loaded"
    );

    match command {
        Commands::Switch {
            from,
            to,
            yes,
            dry_run,
        } => {
            ensure_host_ready(&config)?;
            let panel = PleskCli::new(&config);
            let request = SwitchRequest {
                from,
                to,
                assume_yes: yes,
                dry_run,
            };
            let mut operator = TerminalOperator::stdio();
            run_switch_flow(&panel, &config, &layout, &request, &mut operator, renderer)?;
        }
        Commands::Handlers => {
            ensure_host_ready(&config)?;
            let panel = PleskCli::new(&config);
            renderer.print_lines(&run_handlers_command(&panel, &config)?);
        }
        Commands::Usage { domains } => {
            ensure_host_ready(&config)?;
            let panel = PleskCli::new(&config);
            renderer.print_lines(&run_usage_command(&panel, &config, domains)?);
        }
        Commands::Domains { handler } => {
            ensure_host_ready(&config)?;
            let panel = PleskCli::new(&config);
            renderer.print_lines(&run_domains_command(&panel, &config, &handler)?);
        }
        Commands::Rollback { script, yes } => {
            ensure_host_ready(&config)?;
            let panel = PleskCli::new(&config);
            let mut operator = TerminalOperator::stdio();
            run_rollback_command(&panel, &layout, &script, yes, &mut operator, renderer)?;
        }
        Commands::Doctor => {
            let uid = effective_uid().ok();
            let present = host_cli_present(&config.plesk_bin);
            renderer.print_section("Doctor");
            renderer.print_lines(&format_doctor_lines(&config, &layout, uid, present)?);
        }
        Commands::Completions { .. } => {}
    }

    Ok(())
}

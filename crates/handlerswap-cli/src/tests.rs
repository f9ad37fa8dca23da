use super::*;
use std::cell::RefCell;
use std::collections::{BTreeMap, BTreeSet, VecDeque};
use std::fs;
use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};

use anyhow::{anyhow, Result};
use clap::error::ErrorKind;
use handlerswap_core::{
    HandlerRecord, HostConfig, HostPanel, SelectionMenu, SwitchSummary, EXIT_HOST_MISSING,
    EXIT_INTERRUPTED, EXIT_PRIVILEGE_REQUIRED,
};
use handlerswap_journal::{parse_rollback_artifact, StateLayout};

use crate::completion::write_completions_script;
use crate::flows::{
    format_doctor_lines, run_domains_command, run_handlers_command, run_rollback_command,
    run_switch_flow, run_usage_command, ReplayReport, SwitchReport, SwitchRequest,
};
use crate::preflight::{ensure_host_cli, ensure_privileged, host_cli_present, parse_uid};
use crate::prompt::{is_affirmative, Operator, TerminalOperator};
use crate::render::{
    format_summary_lines, render_outcome_line, render_status_line, OutputStyle, TerminalRenderer,
};

struct FakePanel {
    records: Vec<HandlerRecord>,
    order: Vec<String>,
    bindings: RefCell<BTreeMap<String, String>>,
    failing: BTreeSet<String>,
    rebinds: RefCell<Vec<(String, String)>>,
    unreachable: bool,
}

impl FakePanel {
    fn sample() -> Self {
        let records = ["plesk-php74-fpm", "plesk-php82-fpm", "plesk-php83-fpm"]
            .iter()
            .map(|id| HandlerRecord {
                id: id.to_string(),
                display_name: None,
                full_version: None,
                enabled: true,
            })
            .collect();
        let bindings = [
            ("alpha.example", "plesk-php74-fpm"),
            ("bravo.example", "plesk-php74-fpm"),
            ("charlie.example", "plesk-php82-fpm"),
            ("delta.example", "plesk-php74-fpm"),
        ];
        Self {
            records,
            order: bindings.iter().map(|(entity, _)| entity.to_string()).collect(),
            bindings: RefCell::new(
                bindings
                    .iter()
                    .map(|(entity, handler)| (entity.to_string(), handler.to_string()))
                    .collect(),
            ),
            failing: BTreeSet::new(),
            rebinds: RefCell::new(Vec::new()),
            unreachable: false,
        }
    }

    fn unreachable() -> Self {
        Self {
            unreachable: true,
            ..Self::sample()
        }
    }

    fn failing_for(mut self, entity: &str) -> Self {
        self.failing.insert(entity.to_string());
        self
    }

    fn handler_of(&self, entity: &str) -> Option<String> {
        self.bindings.borrow().get(entity).cloned()
    }

    fn rebind_count(&self) -> usize {
        self.rebinds.borrow().len()
    }
}

impl HostPanel for FakePanel {
    fn handler_records(&self) -> Result<Vec<HandlerRecord>, SwitchError> {
        if self.unreachable {
            return Err(SwitchError::host_unreachable(
                "list php handlers",
                &anyhow!("plesk: connection to psa database refused"),
            ));
        }
        Ok(self.records.clone())
    }

    fn usage_counts(&self, prefix: &str) -> Result<Vec<(String, u64)>, SwitchError> {
        let mut counts = BTreeMap::new();
        for handler in self.bindings.borrow().values() {
            if handler.starts_with(prefix) {
                *counts.entry(handler.clone()).or_insert(0_u64) += 1;
            }
        }
        Ok(counts.into_iter().collect())
    }

    fn entities_for(&self, handler: &str) -> Result<Vec<String>, SwitchError> {
        let bindings = self.bindings.borrow();
        Ok(self
            .order
            .iter()
            .filter(|entity| bindings.get(*entity).map(String::as_str) == Some(handler))
            .cloned()
            .collect())
    }

    fn rebind(&self, entity: &str, handler: &str) -> Result<()> {
        self.rebinds
            .borrow_mut()
            .push((entity.to_string(), handler.to_string()));
        if self.failing.contains(entity) {
            return Err(anyhow!("domain '{entity}' is suspended"));
        }
        self.bindings
            .borrow_mut()
            .insert(entity.to_string(), handler.to_string());
        Ok(())
    }
}

#[derive(Default)]
struct ScriptedOperator {
    answers: VecDeque<String>,
    confirmations: VecDeque<bool>,
    menus: Vec<(String, Vec<String>)>,
    questions: Vec<String>,
}

impl ScriptedOperator {
    fn answering(answers: &[&str]) -> Self {
        Self {
            answers: answers.iter().map(|answer| answer.to_string()).collect(),
            ..Self::default()
        }
    }

    fn confirming(mut self, confirm: bool) -> Self {
        self.confirmations.push_back(confirm);
        self
    }
}

impl Operator for ScriptedOperator {
    fn choose(&mut self, title: &str, menu: &SelectionMenu) -> Result<String> {
        self.menus.push((title.to_string(), menu.lines()));
        Ok(self.answers.pop_front().unwrap_or_default())
    }

    fn confirm(&mut self, question: &str) -> Result<bool> {
        self.questions.push(question.to_string());
        Ok(self.confirmations.pop_front().unwrap_or(false))
    }
}

static TEST_LAYOUT_COUNTER: AtomicU64 = AtomicU64::new(0);

fn test_config() -> HostConfig {
    let nanos = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .expect("system time")
        .as_nanos();
    let mut path = std::env::temp_dir();
    path.push(format!(
        "handlerswap-cli-tests-{}-{}-{}",
        std::process::id(),
        nanos,
        TEST_LAYOUT_COUNTER.fetch_add(1, Ordering::Relaxed)
    ));
    HostConfig {
        state_dir: path,
        ..HostConfig::default()
    }
}

fn plain() -> TerminalRenderer {
    TerminalRenderer::from_style(OutputStyle::Plain)
}

fn log_lines(layout: &StateLayout) -> Vec<String> {
    fs::read_to_string(layout.session_log_path())
        .unwrap_or_default()
        .lines()
        .map(str::to_string)
        .collect()
}

fn rollback_scripts(layout: &StateLayout) -> Vec<std::path::PathBuf> {
    match fs::read_dir(layout.rollback_dir()) {
        Ok(entries) => entries
            .map(|entry| entry.expect("dir entry").path())
            .collect(),
        Err(_) => Vec::new(),
    }
}

fn switch_error(err: &anyhow::Error) -> &SwitchError {
    err.chain()
        .find_map(|cause| cause.downcast_ref::<SwitchError>())
        .expect("switch error in chain")
}

#[test]
fn no_subcommand_parses_to_interactive_switch() {
    let cli = Cli::try_parse_from(["handlerswap"]).expect("must parse");
    assert_eq!(cli.command, None);
    assert!(!cli.verbose);
}

#[test]
fn switch_flags_parse() {
    let cli = Cli::try_parse_from([
        "handlerswap",
        "--config",
        "/tmp/alt.toml",
        "switch",
        "--from",
        "plesk-php74-fpm",
        "--to",
        "plesk-php83-fpm",
        "--dry-run",
        "-y",
    ])
    .expect("must parse");
    assert_eq!(cli.config.as_deref(), Some(Path::new("/tmp/alt.toml")));
    assert_eq!(
        cli.command,
        Some(Commands::Switch {
            from: Some("plesk-php74-fpm".to_string()),
            to: Some("plesk-php83-fpm".to_string()),
            yes: true,
            dry_run: true,
        })
    );
}

#[test]
fn global_flags_are_accepted_after_subcommand() {
    let cli = Cli::try_parse_from(["handlerswap", "usage", "--domains", "--verbose"])
        .expect("must parse");
    assert!(cli.verbose);
    assert_eq!(cli.command, Some(Commands::Usage { domains: true }));
}

#[test]
fn unknown_subcommand_is_a_usage_error() {
    let err = Cli::try_parse_from(["handlerswap", "migrate"]).expect_err("must reject");
    assert_eq!(err.kind(), ErrorKind::InvalidSubcommand);
    assert!(err.use_stderr());
}

#[test]
fn rollback_requires_a_script_path() {
    let err = Cli::try_parse_from(["handlerswap", "rollback"]).expect_err("must reject");
    assert_eq!(err.kind(), ErrorKind::MissingRequiredArgument);
}

#[test]
fn exit_code_follows_typed_error_through_context() {
    let err = anyhow::Error::new(SwitchError::PrivilegeRequired { uid: 1000 })
        .context("preflight failed");
    assert_eq!(exit_code_for_error(&err), EXIT_PRIVILEGE_REQUIRED);

    let err = anyhow::Error::new(SwitchError::HostMissing {
        path: "/usr/sbin/plesk".into(),
    });
    assert_eq!(exit_code_for_error(&err), EXIT_HOST_MISSING);

    let err = anyhow::Error::new(SwitchError::invalid_selection("9", "out of range"));
    assert_eq!(exit_code_for_error(&err), EXIT_INVALID_INPUT);

    assert_eq!(exit_code_for_error(&anyhow!("disk on fire")), EXIT_FAILURE);
}

#[test]
fn affirmative_answers_are_y_and_yes_only() {
    for answer in ["y", "Y", "yes", " YES "] {
        assert!(is_affirmative(answer), "{answer}");
    }
    for answer in ["", "n", "no", "yep", "1"] {
        assert!(!is_affirmative(answer), "{answer}");
    }
}

#[test]
fn terminal_operator_prints_menu_and_reads_one_line() {
    let candidates = vec![
        handlerswap_core::Handler::new("plesk-php74-fpm", true, 2),
        handlerswap_core::Handler::new("plesk-php82-fpm", true, 1),
    ];
    let menu = SelectionMenu::build(&candidates, handlerswap_core::SelectionMode::AllAvailable);
    let mut output = Vec::new();
    let mut operator = TerminalOperator::new("2\ny\n".as_bytes(), &mut output);

    let answer = operator.choose("Pick one", &menu).expect("must read");
    assert_eq!(answer, "2");
    assert!(operator.confirm("Proceed?").expect("must read"));

    let printed = String::from_utf8(output).expect("utf8");
    assert!(printed.contains("Pick one:"));
    assert!(printed.contains("1) plesk-php74-fpm (2 domains)"));
    assert!(printed.contains("Enter a number [1-2]: "));
    assert!(printed.contains("Proceed? [y/N]: "));
}

#[test]
fn terminal_operator_treats_eof_as_empty_answer() {
    let menu = SelectionMenu::build(
        &[handlerswap_core::Handler::new("plesk-php74-fpm", true, 2)],
        handlerswap_core::SelectionMode::AllAvailable,
    );
    let mut operator = TerminalOperator::new("".as_bytes(), Vec::new());
    assert_eq!(operator.choose("Pick", &menu).expect("must read"), "");
    assert!(!operator.confirm("Proceed?").expect("must read"));
}

#[test]
fn uid_parsing_and_privilege_check() {
    assert_eq!(parse_uid("0\n").expect("must parse"), 0);
    assert_eq!(parse_uid(" 1000 ").expect("must parse"), 1000);
    assert!(parse_uid("root").is_err());

    assert!(ensure_privileged(0).is_ok());
    let err = ensure_privileged(1000).expect_err("non-root must fail");
    assert_eq!(err.exit_code(), EXIT_PRIVILEGE_REQUIRED);
}

#[test]
fn host_cli_presence_requires_an_executable_file() {
    let config = test_config();
    fs::create_dir_all(&config.state_dir).expect("must create dir");
    let missing = config.state_dir.join("plesk");
    assert!(!host_cli_present(&missing));
    assert!(!host_cli_present(&config.state_dir));
    let err = ensure_host_cli(&missing).expect_err("missing cli");
    assert_eq!(err.exit_code(), EXIT_HOST_MISSING);

    fs::write(&missing, "#!/bin/sh\n").expect("must write");
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        fs::set_permissions(&missing, fs::Permissions::from_mode(0o644)).expect("chmod");
        assert!(!host_cli_present(&missing));
        fs::set_permissions(&missing, fs::Permissions::from_mode(0o755)).expect("chmod");
    }
    assert!(host_cli_present(&missing));

    let _ = fs::remove_dir_all(&config.state_dir);
}

#[test]
fn plain_output_has_no_badges_or_escapes() {
    assert_eq!(
        render_status_line(OutputStyle::Plain, "ok", "done"),
        "done".to_string()
    );
    assert_eq!(
        render_status_line(OutputStyle::Rich, "warn", "careful"),
        "[WARN] careful".to_string()
    );

    let failed = handlerswap_core::SwitchOutcome::Failed {
        entity: "bravo.example".to_string(),
        source: "plesk-php74-fpm".to_string(),
        target: "plesk-php83-fpm".to_string(),
        detail: "suspended".to_string(),
    };
    assert_eq!(
        render_outcome_line(OutputStyle::Plain, &failed),
        "FAILED bravo.example -> plesk-php83-fpm (details in session log)"
    );

    let summary = SwitchSummary {
        succeeded: 2,
        failed: 1,
        skipped: 0,
    };
    assert_eq!(
        format_summary_lines(&summary, OutputStyle::Plain),
        vec!["3 domains processed: 2 switched, 1 failed".to_string()]
    );
}

#[test]
fn completions_script_mentions_binary_name() {
    let mut output = Vec::new();
    write_completions_script(completion::CliCompletionShell::Bash, &mut output)
        .expect("must generate");
    let script = String::from_utf8(output).expect("utf8");
    assert!(script.contains("handlerswap"));
    assert!(script.contains("rollback"));
}

#[test]
fn interactive_switch_moves_every_domain_and_writes_rollback_script() {
    let config = test_config();
    let layout = StateLayout::new(&config.state_dir);
    let panel = FakePanel::sample().failing_for("bravo.example");
    let mut operator = ScriptedOperator::answering(&["1", "3"]).confirming(true);

    let report = run_switch_flow(
        &panel,
        &config,
        &layout,
        &SwitchRequest::default(),
        &mut operator,
        plain(),
    )
    .expect("switch must finish");

    let SwitchReport::Completed { summary, artifact } = report else {
        panic!("unexpected report: {report:?}");
    };
    assert_eq!(summary.succeeded, 2);
    assert_eq!(summary.failed, 1);
    assert_eq!(panel.rebind_count(), 3);
    assert_eq!(panel.handler_of("alpha.example").as_deref(), Some("plesk-php83-fpm"));
    assert_eq!(panel.handler_of("bravo.example").as_deref(), Some("plesk-php74-fpm"));
    assert_eq!(panel.handler_of("charlie.example").as_deref(), Some("plesk-php82-fpm"));

    // source menu offers only handlers in use, target menu every enabled one
    assert_eq!(operator.menus.len(), 2);
    assert_eq!(operator.menus[0].1.len(), 2);
    assert_eq!(operator.menus[1].1.len(), 3);
    assert_eq!(
        operator.questions,
        vec!["Switch 3 domains from plesk-php74-fpm to plesk-php83-fpm?".to_string()]
    );

    let raw = fs::read_to_string(&artifact).expect("must read rollback script");
    let parsed = parse_rollback_artifact(&raw).expect("must parse rollback script");
    assert_eq!(parsed.source_handler, "plesk-php74-fpm");
    assert_eq!(parsed.target_handler, "plesk-php83-fpm");
    let restored = parsed
        .lines
        .iter()
        .map(|line| (line.entity.as_str(), line.handler.as_str()))
        .collect::<Vec<_>>();
    assert_eq!(
        restored,
        vec![
            ("alpha.example", "plesk-php74-fpm"),
            ("bravo.example", "plesk-php74-fpm"),
            ("delta.example", "plesk-php74-fpm"),
        ]
    );

    let lines = log_lines(&layout);
    assert!(lines.len() >= 3 + 2, "{lines:?}");
    assert!(lines[0].contains("[INFO] session started: switch"));
    assert!(lines
        .iter()
        .any(|line| line.contains("[ERROR] bravo.example: switch from")));
    assert!(lines
        .last()
        .expect("last line")
        .contains("session finished: 2 switched, 1 failed"));

    let _ = fs::remove_dir_all(&config.state_dir);
}

#[test]
fn same_source_and_target_changes_nothing() {
    let config = test_config();
    let layout = StateLayout::new(&config.state_dir);
    let panel = FakePanel::sample();
    let mut operator = ScriptedOperator::answering(&["1", "1"]).confirming(true);

    let err = run_switch_flow(
        &panel,
        &config,
        &layout,
        &SwitchRequest::default(),
        &mut operator,
        plain(),
    )
    .expect_err("same handler must be rejected");

    assert!(matches!(
        switch_error(&err),
        SwitchError::NoOpSelection { handler } if handler == "plesk-php74-fpm"
    ));
    assert_eq!(exit_code_for_error(&err), EXIT_INVALID_INPUT);
    assert_eq!(panel.rebind_count(), 0);
    assert!(operator.questions.is_empty());
    assert!(rollback_scripts(&layout).is_empty());
    assert!(log_lines(&layout)
        .last()
        .expect("last line")
        .contains("[ERROR] session aborted"));

    let _ = fs::remove_dir_all(&config.state_dir);
}

#[test]
fn out_of_range_answer_aborts_without_second_prompt() {
    let config = test_config();
    let layout = StateLayout::new(&config.state_dir);
    let panel = FakePanel::sample();
    let mut operator = ScriptedOperator::answering(&["9", "2"]);

    let err = run_switch_flow(
        &panel,
        &config,
        &layout,
        &SwitchRequest::default(),
        &mut operator,
        plain(),
    )
    .expect_err("out of range must fail");

    assert!(matches!(
        switch_error(&err),
        SwitchError::InvalidSelection { input, .. } if input == "9"
    ));
    assert_eq!(operator.menus.len(), 1);
    assert_eq!(panel.rebind_count(), 0);

    let _ = fs::remove_dir_all(&config.state_dir);
}

#[test]
fn dry_run_logs_plan_without_script_or_rebinds() {
    let config = test_config();
    let layout = StateLayout::new(&config.state_dir);
    let panel = FakePanel::sample();
    let mut operator = ScriptedOperator::default();
    let request = SwitchRequest {
        from: Some("plesk-php74-fpm".to_string()),
        to: Some("plesk-php82-fpm".to_string()),
        assume_yes: false,
        dry_run: true,
    };

    let report = run_switch_flow(&panel, &config, &layout, &request, &mut operator, plain())
        .expect("dry run must succeed");

    assert_eq!(
        report,
        SwitchReport::DryRun {
            source: "plesk-php74-fpm".to_string(),
            target: "plesk-php82-fpm".to_string(),
            entities: vec![
                "alpha.example".to_string(),
                "bravo.example".to_string(),
                "delta.example".to_string(),
            ],
        }
    );
    assert!(operator.menus.is_empty());
    assert!(operator.questions.is_empty());
    assert_eq!(panel.rebind_count(), 0);
    assert!(rollback_scripts(&layout).is_empty());
    assert!(log_lines(&layout)
        .iter()
        .any(|line| line.contains("dry run, 3 domains would move")));

    let _ = fs::remove_dir_all(&config.state_dir);
}

#[test]
fn named_handler_outside_menu_is_invalid() {
    let config = test_config();
    let layout = StateLayout::new(&config.state_dir);
    let panel = FakePanel::sample();
    let mut operator = ScriptedOperator::default();
    let request = SwitchRequest {
        from: Some("plesk-php83-fpm".to_string()),
        ..SwitchRequest::default()
    };

    let err = run_switch_flow(&panel, &config, &layout, &request, &mut operator, plain())
        .expect_err("unused source must be rejected");
    assert_eq!(exit_code_for_error(&err), EXIT_INVALID_INPUT);
    assert!(err.to_string().contains("not among the handlers in use"));

    let _ = fs::remove_dir_all(&config.state_dir);
}

#[test]
fn declined_confirmation_leaves_domains_untouched() {
    let config = test_config();
    let layout = StateLayout::new(&config.state_dir);
    let panel = FakePanel::sample();
    let mut operator = ScriptedOperator::answering(&["2", "1"]).confirming(false);

    let report = run_switch_flow(
        &panel,
        &config,
        &layout,
        &SwitchRequest::default(),
        &mut operator,
        plain(),
    )
    .expect("decline is not an error");

    assert_eq!(report, SwitchReport::Declined);
    assert_eq!(panel.rebind_count(), 0);
    assert!(rollback_scripts(&layout).is_empty());

    let _ = fs::remove_dir_all(&config.state_dir);
}

#[test]
fn rollback_command_restores_a_completed_switch() {
    let config = test_config();
    let layout = StateLayout::new(&config.state_dir);
    let panel = FakePanel::sample();
    let request = SwitchRequest {
        from: Some("plesk-php74-fpm".to_string()),
        to: Some("plesk-php83-fpm".to_string()),
        assume_yes: true,
        dry_run: false,
    };
    let mut operator = ScriptedOperator::default();
    let report = run_switch_flow(&panel, &config, &layout, &request, &mut operator, plain())
        .expect("switch must finish");
    let SwitchReport::Completed { artifact, .. } = report else {
        panic!("unexpected report: {report:?}");
    };
    assert_eq!(panel.handler_of("delta.example").as_deref(), Some("plesk-php83-fpm"));

    let mut operator = ScriptedOperator::default().confirming(true);
    let report = run_rollback_command(&panel, &layout, &artifact, false, &mut operator, plain())
        .expect("rollback must finish");

    assert_eq!(
        report,
        ReplayReport::Completed {
            summary: SwitchSummary {
                succeeded: 3,
                failed: 0,
                skipped: 0,
            }
        }
    );
    assert_eq!(
        operator.questions,
        vec!["Restore 3 domains to plesk-php74-fpm?".to_string()]
    );
    for entity in ["alpha.example", "bravo.example", "delta.example"] {
        assert_eq!(panel.handler_of(entity).as_deref(), Some("plesk-php74-fpm"));
    }
    assert_eq!(panel.handler_of("charlie.example").as_deref(), Some("plesk-php82-fpm"));

    let _ = fs::remove_dir_all(&config.state_dir);
}

#[test]
fn rollback_command_rejects_foreign_scripts() {
    let config = test_config();
    let layout = StateLayout::new(&config.state_dir);
    fs::create_dir_all(&config.state_dir).expect("must create dir");
    let script = config.state_dir.join("cleanup.sh");
    fs::write(&script, "#!/bin/sh\nrm -rf /var/www\n").expect("must write");

    let panel = FakePanel::sample();
    let mut operator = ScriptedOperator::default().confirming(true);
    let err = run_rollback_command(&panel, &layout, &script, true, &mut operator, plain())
        .expect_err("foreign script must be rejected");
    assert!(err.to_string().contains("failed parsing rollback script"));
    assert_eq!(panel.rebind_count(), 0);

    let _ = fs::remove_dir_all(&config.state_dir);
}

#[test]
fn reporting_commands_render_inventory() {
    let config = test_config();
    let panel = FakePanel::sample();

    let handlers = run_handlers_command(&panel, &config).expect("must list");
    assert_eq!(
        handlers,
        vec![
            "handler\tversion\tdomains".to_string(),
            "plesk-php74-fpm\t-\t3".to_string(),
            "plesk-php82-fpm\t-\t1".to_string(),
            "plesk-php83-fpm\t-\t0".to_string(),
        ]
    );

    let usage = run_usage_command(&panel, &config, true).expect("must report");
    assert_eq!(
        usage,
        vec![
            "plesk-php74-fpm: 3 domains".to_string(),
            "  alpha.example".to_string(),
            "  bravo.example".to_string(),
            "  delta.example".to_string(),
            "plesk-php82-fpm: 1 domains".to_string(),
            "  charlie.example".to_string(),
            "total: 4 domains".to_string(),
        ]
    );

    assert_eq!(
        run_domains_command(&panel, &config, "plesk-php83-fpm").expect("must list"),
        vec!["No domains use plesk-php83-fpm".to_string()]
    );
}

#[test]
fn doctor_lines_show_privilege_host_cli_and_config() {
    let config = test_config();
    let layout = StateLayout::new(&config.state_dir);
    let lines = format_doctor_lines(&config, &layout, Some(1000), false).expect("must render");

    assert_eq!(lines[0], "privileges: uid 1000 (root required)");
    assert_eq!(lines[1], "host cli: /usr/sbin/plesk (missing)");
    assert!(lines
        .iter()
        .any(|line| line == "  handler_prefix = \"plesk-php\""));
}

#[test]
fn unreachable_host_aborts_switch_before_any_menu() {
    let config = test_config();
    let layout = StateLayout::new(&config.state_dir);
    let panel = FakePanel::unreachable();
    let mut operator = ScriptedOperator::answering(&["1", "3"]).confirming(true);

    let err = run_switch_flow(
        &panel,
        &config,
        &layout,
        &SwitchRequest::default(),
        &mut operator,
        plain(),
    )
    .expect_err("inventory failure must abort");

    assert!(matches!(
        switch_error(&err),
        SwitchError::HostUnreachable { operation, .. } if operation == "list php handlers"
    ));
    assert_eq!(exit_code_for_error(&err), EXIT_FAILURE);
    assert!(operator.menus.is_empty(), "no menu may be shown");
    assert!(operator.questions.is_empty());
    assert_eq!(panel.rebind_count(), 0);
    assert!(rollback_scripts(&layout).is_empty());
    assert!(log_lines(&layout)
        .last()
        .expect("last line")
        .contains("[ERROR] session aborted: host unreachable while trying to list php handlers"));

    let _ = fs::remove_dir_all(&config.state_dir);
}

#[test]
fn domains_command_rejects_malformed_handler_as_invalid_input() {
    let config = test_config();
    let panel = FakePanel::sample();

    let err = run_domains_command(&panel, &config, "plesk-php82'; DROP TABLE domains")
        .expect_err("malformed handler must be rejected");
    assert!(matches!(switch_error(&err), SwitchError::InvalidSelection { .. }));
    assert_eq!(exit_code_for_error(&err), EXIT_INVALID_INPUT);

    let err = run_domains_command(&panel, &config, "module").expect_err("foreign family");
    assert_eq!(exit_code_for_error(&err), EXIT_INVALID_INPUT);
}

#[test]
fn declined_rollback_is_recorded_in_session_log() {
    let config = test_config();
    let layout = StateLayout::new(&config.state_dir);
    let panel = FakePanel::sample();
    let request = SwitchRequest {
        from: Some("plesk-php82-fpm".to_string()),
        to: Some("plesk-php83-fpm".to_string()),
        assume_yes: true,
        dry_run: false,
    };
    let report = run_switch_flow(
        &panel,
        &config,
        &layout,
        &request,
        &mut ScriptedOperator::default(),
        plain(),
    )
    .expect("switch must finish");
    let SwitchReport::Completed { artifact, .. } = report else {
        panic!("unexpected report: {report:?}");
    };
    let rebinds_before = panel.rebind_count();

    let mut operator = ScriptedOperator::default().confirming(false);
    let report = run_rollback_command(&panel, &layout, &artifact, false, &mut operator, plain())
        .expect("decline is not an error");

    assert_eq!(report, ReplayReport::Declined);
    assert_eq!(panel.rebind_count(), rebinds_before);
    let lines = log_lines(&layout);
    assert!(lines
        .iter()
        .any(|line| line.contains("session started: rollback")));
    assert!(lines
        .last()
        .expect("last line")
        .contains("[WARN] session finished: rollback declined, no changes made"));

    let _ = fs::remove_dir_all(&config.state_dir);
}

#[test]
fn interrupted_summary_reports_skipped_domains() {
    let summary = SwitchSummary {
        succeeded: 1,
        failed: 0,
        skipped: 2,
    };
    assert_eq!(
        format_summary_lines(&summary, OutputStyle::Plain),
        vec!["1 domains processed: 1 switched, 0 failed, 2 not attempted (interrupted)".to_string()]
    );

    let err = anyhow::Error::new(SwitchError::Interrupted {
        processed: 1,
        total: 3,
    })
    .context("2 domains not attempted");
    assert_eq!(exit_code_for_error(&err), EXIT_INTERRUPTED);
}

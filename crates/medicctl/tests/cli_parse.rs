//! Argument parsing for every subcommand

use clap::Parser;
use medicctl::cli::{Cli, Commands, DestructivePolicy};
use std::path::PathBuf;

fn parse(args: &[&str]) -> Cli {
    Cli::try_parse_from(std::iter::once("medicctl").chain(args.iter().copied())).unwrap()
}

#[test]
fn test_repair_defaults_to_dry_run_and_asking() {
    let cli = parse(&["repair"]);
    let Commands::Repair(args) = cli.command else {
        panic!("expected repair");
    };
    assert!(!args.execute);
    assert!(!args.auto_approve_destructive);
    assert!(!args.skip_diagnostics);
    assert_eq!(args.max_passes, None);
    assert_eq!(args.on_destructive, DestructivePolicy::Ask);
    assert!(args.hosts.is_empty());
}

#[test]
fn test_repair_flags() {
    let cli = parse(&[
        "repair",
        "--execute",
        "--auto-approve-destructive",
        "--max-passes",
        "3",
        "--skip-diagnostics",
        "--no-progress",
        "--on-destructive",
        "skip",
        "--hosts",
        "1.1.1.1,example.com",
    ]);
    let Commands::Repair(args) = cli.command else {
        panic!("expected repair");
    };
    assert!(args.execute);
    assert!(args.auto_approve_destructive);
    assert_eq!(args.max_passes, Some(3));
    assert!(args.skip_diagnostics);
    assert!(args.no_progress);
    assert_eq!(args.on_destructive, DestructivePolicy::Skip);
    assert_eq!(args.hosts, ["1.1.1.1", "example.com"]);
}

#[test]
fn test_global_flags_after_subcommand() {
    let cli = parse(&["diagnose", "--json", "-v", "--config", "/tmp/medic.toml"]);
    assert!(cli.json);
    assert!(cli.verbose);
    assert_eq!(cli.config, Some(PathBuf::from("/tmp/medic.toml")));
    assert_eq!(cli.command.name(), "diagnose");
}

#[test]
fn test_health_repeatable_options() {
    let cli = parse(&[
        "health", "--service", "sshd", "--service", "nginx", "--port", "22", "--host",
        "db:5432",
    ]);
    match cli.command {
        Commands::Health {
            services,
            ports,
            hosts,
        } => {
            assert_eq!(services, ["sshd", "nginx"]);
            assert_eq!(ports, [22]);
            assert_eq!(hosts, ["db:5432"]);
        }
        other => panic!("unexpected command {:?}", other),
    }
}

#[test]
fn test_invalid_input_is_rejected() {
    let run = |args: &[&str]| {
        Cli::try_parse_from(std::iter::once("medicctl").chain(args.iter().copied()))
    };
    assert!(run(&[]).is_err());
    assert!(run(&["health", "--port", "http"]).is_err());
    assert!(run(&["repair", "--on-destructive", "approve"]).is_err());
    // --force only makes sense with --init
    assert!(run(&["config", "--force"]).is_err());
    assert!(run(&["config", "--init", "--force"]).is_ok());
}

#[test]
fn test_command_names() {
    assert_eq!(parse(&["analyze", "--top", "5"]).command.name(), "analyze");
    assert_eq!(parse(&["info"]).command.name(), "info");
    assert_eq!(parse(&["config"]).command.name(), "config");
    assert_eq!(parse(&["health"]).command.name(), "health");
    assert_eq!(parse(&["repair"]).command.name(), "repair");
}

#[test]
fn test_info_options() {
    let cli = parse(&["info", "--top", "3", "--log-lines", "50", "-o", "/tmp/host.json"]);
    let Commands::Info {
        top,
        log_lines,
        output,
    } = cli.command
    else {
        panic!("expected info");
    };
    assert_eq!(top, Some(3));
    assert_eq!(log_lines, Some(50));
    assert_eq!(output, Some(PathBuf::from("/tmp/host.json")));

    let cli = parse(&["info", "--json"]);
    assert!(cli.json);
    assert!(matches!(
        cli.command,
        Commands::Info {
            top: None,
            log_lines: None,
            output: None
        }
    ));
}

//! Tests for the run subcommand and global flags.

use super::parse;
use crate::cli::{Cli, CliCommand};
use clap::Parser;

#[test]
fn cli_parse_run() {
    match parse(&["harvest", "run"]) {
        CliCommand::Run { only } => assert!(only.is_empty()),
        _ => panic!("expected Run"),
    }
}

#[test]
fn cli_parse_run_selected_jobs() {
    match parse(&["harvest", "run", "--job", "dvf", "--job", "sirene"]) {
        CliCommand::Run { only } => assert_eq!(only, vec!["dvf", "sirene"]),
        _ => panic!("expected Run with --job"),
    }
}

#[test]
fn cli_parse_global_config_after_subcommand() {
    let cli = Cli::try_parse_from(["harvest", "run", "--config", "/etc/harvest.toml"]).unwrap();
    assert_eq!(
        cli.config.as_deref(),
        Some(std::path::Path::new("/etc/harvest.toml"))
    );
    assert!(matches!(cli.command, CliCommand::Run { .. }));
}

#[test]
fn cli_parse_config_defaults_to_none() {
    let cli = Cli::try_parse_from(["harvest", "status"]).unwrap();
    assert!(cli.config.is_none());
}

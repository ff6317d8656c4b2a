//! Parse-level tests for the CLI surface.

use clap::Parser;

use super::{Cli, CliCommand};

#[test]
fn parse_run_defaults() {
    let cli = Cli::try_parse_from(["brd", "run"]).unwrap();
    match cli.command {
        CliCommand::Run {
            source,
            dest,
            limit,
            jobs,
        } => {
            assert!(source.is_none());
            assert!(dest.is_none());
            assert!(limit.is_none());
            assert!(jobs.is_none());
        }
        other => panic!("expected Run, got {other:?}"),
    }
}

#[test]
fn parse_run_with_overrides() {
    let cli = Cli::try_parse_from([
        "brd", "run", "--source", "in/reports.csv", "--dest", "out/pdfs", "--limit", "25",
        "--jobs", "8",
    ])
    .unwrap();
    match cli.command {
        CliCommand::Run {
            source,
            dest,
            limit,
            jobs,
        } => {
            assert_eq!(source.unwrap().to_str(), Some("in/reports.csv"));
            assert_eq!(dest.unwrap().to_str(), Some("out/pdfs"));
            assert_eq!(limit, Some(25));
            assert_eq!(jobs, Some(8));
        }
        other => panic!("expected Run, got {other:?}"),
    }
}

#[test]
fn parse_scan() {
    let cli = Cli::try_parse_from(["brd", "scan", "--dest", "out/pdfs"]).unwrap();
    match cli.command {
        CliCommand::Scan { dest } => {
            assert_eq!(dest.unwrap().to_str(), Some("out/pdfs"));
        }
        other => panic!("expected Scan, got {other:?}"),
    }
}

#[test]
fn parse_upload_requires_remote() {
    assert!(Cli::try_parse_from(["brd", "upload"]).is_err());

    let cli = Cli::try_parse_from(["brd", "upload", "/mnt/share/reports"]).unwrap();
    match cli.command {
        CliCommand::Upload { remote, dest } => {
            assert_eq!(remote.to_str(), Some("/mnt/share/reports"));
            assert!(dest.is_none());
        }
        other => panic!("expected Upload, got {other:?}"),
    }
}

#[test]
fn unknown_subcommand_is_rejected() {
    assert!(Cli::try_parse_from(["brd", "frobnicate"]).is_err());
}

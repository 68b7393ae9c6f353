//! Offline mutual-exclusion snapshot verifier.
//!
//! Reads `process_<id>.txt` snapshot dumps, rebuilds each global snapshot and
//! reports which of the six safety invariants hold.

use std::fs::File;
use std::io::BufWriter;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing::debug;

use mxcheck::check::{load_snapshots, run_check};
use mxcheck::exit_codes;
use mxcheck::io::config::{
    ConfigOverrides, DEFAULT_CONFIG_PATH, ReportFormat, VerifierConfig, apply_overrides,
    load_config, write_config,
};
use mxcheck::io::report::{JsonReport, ReportSink, TextReport};
use mxcheck::io::source::DirSource;
use mxcheck::logging;

#[derive(Parser)]
#[command(
    name = "mxcheck",
    version,
    about = "Check safety invariants of distributed mutual-exclusion snapshots"
)]
struct Cli {
    /// Config file (missing file means defaults).
    #[arg(long, global = true, default_value = DEFAULT_CONFIG_PATH)]
    config: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Check every snapshot and write the report.
    Check {
        /// Directory holding `process_<id>.txt` files.
        #[arg(long)]
        dir: Option<PathBuf>,
        /// Report file.
        #[arg(short, long)]
        output: Option<PathBuf>,
        /// Total number of processes (N).
        #[arg(short = 'n', long)]
        processes: Option<u32>,
        #[arg(long, value_enum)]
        format: Option<ReportFormat>,
        /// List violation details under each violated invariant.
        #[arg(long)]
        explain: bool,
        /// Exit with a non-zero code when any invariant is violated.
        #[arg(long)]
        fail_on_violation: bool,
    },
    /// List snapshot ids with their contributing processes.
    List {
        #[arg(long)]
        dir: Option<PathBuf>,
        #[arg(short = 'n', long)]
        processes: Option<u32>,
    },
    /// Write a default config file if missing.
    Init {
        /// Overwrite an existing file.
        #[arg(short, long)]
        force: bool,
    },
}

fn main() {
    logging::init();
    match run() {
        Ok(code) => std::process::exit(code),
        Err(err) => {
            eprintln!("{:#}", err);
            std::process::exit(exit_codes::INVALID);
        }
    }
}

fn run() -> Result<i32> {
    let cli = Cli::parse();
    match cli.command {
        Command::Check {
            dir,
            output,
            processes,
            format,
            explain,
            fail_on_violation,
        } => {
            let overrides = ConfigOverrides {
                process_count: processes,
                snapshot_dir: dir,
                report_path: output,
                format,
                explain,
            };
            let cfg = resolve_config(&cli.config, &overrides)?;
            cmd_check(&cfg, fail_on_violation)
        }
        Command::List { dir, processes } => {
            let overrides = ConfigOverrides {
                process_count: processes,
                snapshot_dir: dir,
                ..ConfigOverrides::default()
            };
            let cfg = resolve_config(&cli.config, &overrides)?;
            cmd_list(&cfg)
        }
        Command::Init { force } => cmd_init(&cli.config, force),
    }
}

fn resolve_config(path: &Path, overrides: &ConfigOverrides) -> Result<VerifierConfig> {
    let base = load_config(path).with_context(|| format!("load {}", path.display()))?;
    let cfg = apply_overrides(base, overrides)?;
    debug!(?cfg, "resolved config");
    Ok(cfg)
}

fn cmd_check(cfg: &VerifierConfig, fail_on_violation: bool) -> Result<i32> {
    let source = DirSource::new(&cfg.snapshot_dir);
    // A previous report stays untouched unless the snapshots assemble.
    let snapshots = load_snapshots(&source)?;

    let file = File::create(&cfg.report_path)
        .with_context(|| format!("create {}", cfg.report_path.display()))?;
    let out = BufWriter::new(file);
    let mut sink: Box<dyn ReportSink> = match cfg.format {
        ReportFormat::Text => Box::new(TextReport::new(out, cfg.explain, true)),
        ReportFormat::Json => Box::new(JsonReport::new(out)),
    };

    let summary = run_check(&snapshots, cfg.process_count, sink.as_mut())?;
    println!(
        "check: snapshots={} violated={} incomplete={} dir={} report={}",
        summary.snapshots,
        summary.violated_snapshots,
        summary.incomplete,
        source.dir().display(),
        cfg.report_path.display()
    );

    if fail_on_violation && !summary.clean() {
        return Ok(exit_codes::VIOLATED);
    }
    Ok(exit_codes::OK)
}

fn cmd_list(cfg: &VerifierConfig) -> Result<i32> {
    let snapshots = load_snapshots(&DirSource::new(&cfg.snapshot_dir))?;
    for snapshot in &snapshots {
        let missing = snapshot.missing_processes(cfg.process_count);
        let status = if missing.is_empty() {
            "complete".to_string()
        } else {
            format!("incomplete missing={missing:?}")
        };
        println!(
            "snapshot {}: processes={:?} {}",
            snapshot.id(),
            snapshot.process_ids(),
            status
        );
    }
    Ok(exit_codes::OK)
}

fn cmd_init(path: &Path, force: bool) -> Result<i32> {
    if path.exists() && !force {
        println!("init: {} exists (use --force to overwrite)", path.display());
        return Ok(exit_codes::OK);
    }
    write_config(path, &VerifierConfig::default())
        .with_context(|| format!("write {}", path.display()))?;
    println!("init: wrote {}", path.display());
    Ok(exit_codes::OK)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_check_defaults() {
        let cli = Cli::parse_from(["mxcheck", "check"]);
        assert_eq!(cli.config, PathBuf::from(DEFAULT_CONFIG_PATH));
        assert!(matches!(
            cli.command,
            Command::Check {
                dir: None,
                processes: None,
                explain: false,
                fail_on_violation: false,
                ..
            }
        ));
    }

    #[test]
    fn parse_check_overrides() {
        let cli = Cli::parse_from([
            "mxcheck",
            "check",
            "--dir",
            "dumps",
            "-n",
            "5",
            "--format",
            "json",
            "--fail-on-violation",
        ]);
        match cli.command {
            Command::Check {
                dir,
                processes,
                format,
                fail_on_violation,
                ..
            } => {
                assert_eq!(dir, Some(PathBuf::from("dumps")));
                assert_eq!(processes, Some(5));
                assert_eq!(format, Some(ReportFormat::Json));
                assert!(fail_on_violation);
            }
            _ => panic!("expected check"),
        }
    }

    #[test]
    fn parse_init_force() {
        let cli = Cli::parse_from(["mxcheck", "--config", "alt.toml", "init", "--force"]);
        assert_eq!(cli.config, PathBuf::from("alt.toml"));
        assert!(matches!(cli.command, Command::Init { force: true }));
    }
}

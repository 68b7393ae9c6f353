//! Verifier configuration stored in `mxcheck.toml`.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, anyhow};
use serde::{Deserialize, Serialize};

/// Default config file name, relative to the working directory.
pub const DEFAULT_CONFIG_PATH: &str = "mxcheck.toml";

/// Report output format.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum ReportFormat {
    #[default]
    Text,
    Json,
}

/// Verifier configuration (TOML).
///
/// Missing fields default to the layout the DIMEX dumper produces.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct VerifierConfig {
    /// Total number of participating processes (`N`).
    pub process_count: u32,

    /// Directory holding `process_<id>.txt` files.
    pub snapshot_dir: PathBuf,

    /// Where the report is written.
    pub report_path: PathBuf,

    pub format: ReportFormat,

    /// List violation details under each violated invariant (text format).
    pub explain: bool,
}

impl Default for VerifierConfig {
    fn default() -> Self {
        Self {
            process_count: 3,
            snapshot_dir: PathBuf::from("./snapshots"),
            report_path: PathBuf::from("./snapshot_analysis.txt"),
            format: ReportFormat::Text,
            explain: false,
        }
    }
}

impl VerifierConfig {
    pub fn validate(&self) -> Result<()> {
        if self.process_count == 0 {
            return Err(anyhow!("process_count must be > 0"));
        }
        if self.snapshot_dir.as_os_str().is_empty() {
            return Err(anyhow!("snapshot_dir must not be empty"));
        }
        if self.report_path.as_os_str().is_empty() {
            return Err(anyhow!("report_path must not be empty"));
        }
        Ok(())
    }
}

/// Command-line values that take precedence over the config file.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConfigOverrides {
    pub process_count: Option<u32>,
    pub snapshot_dir: Option<PathBuf>,
    pub report_path: Option<PathBuf>,
    pub format: Option<ReportFormat>,
    /// `--explain` can only switch explanations on.
    pub explain: bool,
}

/// Apply command-line overrides to the loaded config.
pub fn apply_overrides(
    mut base: VerifierConfig,
    overrides: &ConfigOverrides,
) -> Result<VerifierConfig> {
    if let Some(process_count) = overrides.process_count {
        base.process_count = process_count;
    }
    if let Some(dir) = &overrides.snapshot_dir {
        base.snapshot_dir = dir.clone();
    }
    if let Some(path) = &overrides.report_path {
        base.report_path = path.clone();
    }
    if let Some(format) = overrides.format {
        base.format = format;
    }
    base.explain |= overrides.explain;
    base.validate()?;
    Ok(base)
}

/// Load config from a TOML file.
///
/// If the file is missing, returns `VerifierConfig::default()`.
pub fn load_config(path: &Path) -> Result<VerifierConfig> {
    if !path.exists() {
        let cfg = VerifierConfig::default();
        cfg.validate()?;
        return Ok(cfg);
    }
    let contents = fs::read_to_string(path).with_context(|| format!("read {}", path.display()))?;
    let cfg: VerifierConfig =
        toml::from_str(&contents).with_context(|| format!("parse {}", path.display()))?;
    cfg.validate()?;
    Ok(cfg)
}

/// Atomically write config to disk (temp file + rename).
pub fn write_config(path: &Path, cfg: &VerifierConfig) -> Result<()> {
    cfg.validate()?;
    let mut buf = toml::to_string_pretty(cfg).context("serialize config toml")?;
    buf.push('\n');
    write_atomic(path, &buf)
}

fn write_atomic(path: &Path, contents: &str) -> Result<()> {
    let parent = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    fs::create_dir_all(parent).with_context(|| format!("create directory {}", parent.display()))?;
    let tmp_path = path.with_extension("toml.tmp");
    fs::write(&tmp_path, contents)
        .with_context(|| format!("write temp config {}", tmp_path.display()))?;
    fs::rename(&tmp_path, path).with_context(|| format!("replace config {}", path.display()))?;
    Ok(())
}

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use slotplan_core::SchedulerConfig;
use std::fs;
use std::path::{Path, PathBuf};

use crate::state::ensure_slotplan_home;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub scheduler: SchedulerConfig,
    pub output: OutputSection,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputSection {
    /// Pretty-print JSON results.
    pub pretty: bool,
    /// Prepended to every calendar event title.
    pub ics_prefix: String,
}

impl Default for OutputSection {
    fn default() -> Self {
        Self {
            pretty: true,
            ics_prefix: String::new(),
        }
    }
}

pub fn config_path() -> Result<PathBuf> {
    Ok(ensure_slotplan_home()?.join("config.toml"))
}

/// Load `path`, or `~/.slotplan/config.toml` when `None`. A missing file
/// means defaults.
pub fn load_config(path: Option<&Path>) -> Result<Config> {
    let p = match path {
        Some(p) => p.to_path_buf(),
        None => config_path()?,
    };
    if !p.exists() {
        return Ok(Config::default());
    }
    let s = fs::read_to_string(&p).with_context(|| format!("read {}", p.display()))?;
    parse_config(&s).with_context(|| format!("parse {}", p.display()))
}

pub fn parse_config(s: &str) -> Result<Config> {
    let cfg: Config = toml::from_str(s).context("parse config.toml")?;
    cfg.scheduler.validate().context("invalid [scheduler] section")?;
    Ok(cfg)
}

pub fn save_config(cfg: &Config, path: &Path) -> Result<()> {
    let s = toml::to_string_pretty(cfg).context("serialize config")?;
    fs::write(path, s).with_context(|| format!("write {}", path.display()))?;
    Ok(())
}

pub fn init_config(path: Option<&Path>) -> Result<()> {
    let p = match path {
        Some(p) => p.to_path_buf(),
        None => config_path()?,
    };
    if p.exists() {
        println!("Config already exists: {}", p.display());
        return Ok(());
    }
    save_config(&Config::default(), &p)?;
    println!("Wrote {}", p.display());
    Ok(())
}

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use tally_core::config::{
    DEFAULT_JUDGE_MODEL, DEFAULT_LLM_MODEL, DEFAULT_PLOTS_DIR, DEFAULT_REPORT_DIR,
};
use tally_core::{ColumnMapping, RetryPolicy, SessionConfig};
use tally_report::llm::DEFAULT_OLLAMA_HOST;

pub const DEFAULT_CONFIG_FILE: &str = "tally.toml";

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub output: OutputSection,
    pub llm: LlmSection,
    pub judge: JudgeSection,
    pub columns: ColumnMapping,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputSection {
    pub plots_dir: PathBuf,
    pub report_dir: PathBuf,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmSection {
    /// Model that writes the narrative.
    pub model: String,
    /// Model that reviews the narrative.
    pub judge_model: String,
    /// Ollama server, e.g. `http://localhost:11434`.
    pub host: String,
    pub timeout_secs: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct JudgeSection {
    pub max_attempts: u32,
    pub retry_delay_secs: u64,
}

impl Default for OutputSection {
    fn default() -> Self {
        Self {
            plots_dir: PathBuf::from(DEFAULT_PLOTS_DIR),
            report_dir: PathBuf::from(DEFAULT_REPORT_DIR),
        }
    }
}

impl Default for LlmSection {
    fn default() -> Self {
        Self {
            model: DEFAULT_LLM_MODEL.to_string(),
            judge_model: DEFAULT_JUDGE_MODEL.to_string(),
            host: DEFAULT_OLLAMA_HOST.to_string(),
            timeout_secs: 300,
        }
    }
}

impl Default for JudgeSection {
    fn default() -> Self {
        let retry = RetryPolicy::default();
        Self {
            max_attempts: retry.max_attempts,
            retry_delay_secs: retry.delay.as_secs(),
        }
    }
}

/// Values from flags or the environment; any that are set win over the file.
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub plots_dir: Option<PathBuf>,
    pub report_dir: Option<PathBuf>,
    pub llm_model: Option<String>,
    pub judge_model: Option<String>,
    pub ollama_host: Option<String>,
}

impl Config {
    pub fn apply(&mut self, o: Overrides) {
        if let Some(v) = o.plots_dir {
            self.output.plots_dir = v;
        }
        if let Some(v) = o.report_dir {
            self.output.report_dir = v;
        }
        if let Some(v) = o.llm_model {
            self.llm.model = v;
        }
        if let Some(v) = o.judge_model {
            self.llm.judge_model = v;
        }
        if let Some(v) = o.ollama_host {
            self.llm.host = v;
        }
    }

    pub fn session_config(&self) -> SessionConfig {
        SessionConfig {
            plots_dir: self.output.plots_dir.clone(),
            report_dir: self.output.report_dir.clone(),
            llm_model: self.llm.model.clone(),
            judge_model: self.llm.judge_model.clone(),
            columns: self.columns.clone(),
            judge_retry: RetryPolicy {
                max_attempts: self.judge.max_attempts,
                delay: Duration::from_secs(self.judge.retry_delay_secs),
            },
        }
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.llm.timeout_secs)
    }
}

/// Load `path`, or `./tally.toml` when no path is given. A missing default
/// file yields the defaults; a missing explicit file is an error.
pub fn load_config(path: Option<&Path>) -> Result<Config> {
    load_config_or(path, Path::new(DEFAULT_CONFIG_FILE))
}

/// Like [`load_config`], with `fallback` read when no path is given.
pub fn load_config_or(path: Option<&Path>, fallback: &Path) -> Result<Config> {
    let (p, explicit) = match path {
        Some(p) => (p.to_path_buf(), true),
        None => (fallback.to_path_buf(), false),
    };
    if !p.exists() {
        if explicit {
            bail!("config file not found: {}", p.display());
        }
        return Ok(Config::default());
    }
    let s = fs::read_to_string(&p).with_context(|| format!("read {}", p.display()))?;
    toml::from_str(&s).with_context(|| format!("parse {}", p.display()))
}

pub fn save_config(cfg: &Config, path: &Path) -> Result<()> {
    let s = toml::to_string_pretty(cfg).context("serialize config")?;
    fs::write(path, s).with_context(|| format!("write {}", path.display()))?;
    Ok(())
}

/// Write a default config to `path` unless one is already there.
pub fn init_config(path: &Path) -> Result<bool> {
    if path.exists() {
        println!("Config already exists: {}", path.display());
        return Ok(false);
    }
    save_config(&Config::default(), path)?;
    println!("Wrote {}", path.display());
    Ok(true)
}

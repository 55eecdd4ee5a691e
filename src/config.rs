use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use anyhow::Context;
use serde::Deserialize;

use crate::error::{Error, Result};

pub const DEFAULT_CONFIG_FILENAME: &str = "webnovel-translator.toml";
pub const CONFIG_ENV: &str = "WEBNOVEL_TRANSLATOR_CONFIG";

pub const DEFAULT_MODEL: &str = "gemini-2.5-flash";
pub const DEFAULT_ENDPOINT: &str = "https://generativelanguage.googleapis.com/v1beta/models";
pub const DEFAULT_API_KEY_ENV: &str = "GEMINI_API_KEY";
pub const DEFAULT_TEMPERATURE: f32 = 0.3;
pub const DEFAULT_THINKING_BUDGET: u32 = 1000;
pub const DEFAULT_TIMEOUT_SECS: u64 = 300;

pub const DEFAULT_MAX_ATTEMPTS: u32 = 7;
/// Minimum share of source lines a translation must reach to be accepted.
pub const DEFAULT_COMPLETENESS_RATIO: f64 = 0.75;
pub const DEFAULT_CONTEXT_WINDOW: u32 = 3;
pub const DEFAULT_RETRY_BASE_DELAY_MS: u64 = 800;

#[derive(Clone, Debug, Deserialize, Default)]
pub struct AppConfig {
    #[serde(default)]
    pub model: ModelSection,
    #[serde(default)]
    pub translation: TranslationSection,
    #[serde(default)]
    pub prompts: PromptsSection,
    #[serde(default)]
    pub output: OutputSection,
    #[serde(default)]
    pub scrape: ScrapeSection,
    /// Extra per-host identity rules, keyed by host (e.g. `booktoki.com`).
    #[serde(default)]
    pub sites: BTreeMap<String, SiteSection>,
}

#[derive(Clone, Debug, Deserialize, Default)]
pub struct ModelSection {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub temperature: Option<f32>,
    #[serde(default)]
    pub thinking_budget: Option<u32>,
    /// Name of the environment variable holding the API key.
    #[serde(default)]
    pub api_key_env: Option<String>,
    #[serde(default)]
    pub endpoint: Option<String>,
    #[serde(default)]
    pub timeout_secs: Option<u64>,
}

#[derive(Clone, Debug, Deserialize, Default)]
pub struct TranslationSection {
    #[serde(default)]
    pub max_attempts: Option<u32>,
    #[serde(default)]
    pub completeness_ratio: Option<f64>,
    #[serde(default)]
    pub context_window: Option<u32>,
    #[serde(default)]
    pub retry_base_delay_ms: Option<u64>,
    /// Emit `# {title}` / `# Untitled` when the chapter number is unknown,
    /// instead of no heading at all.
    #[serde(default)]
    pub untitled_heading: Option<bool>,
}

#[derive(Clone, Debug, Deserialize, Default)]
pub struct PromptsSection {
    #[serde(default)]
    pub translate: Option<String>,
}

#[derive(Clone, Debug, Deserialize, Default)]
pub struct OutputSection {
    #[serde(default)]
    pub dir: Option<String>,
    #[serde(default)]
    pub trace_dir: Option<String>,
    #[serde(default)]
    pub trace_prompts: Option<bool>,
}

#[derive(Clone, Debug, Deserialize, Default)]
pub struct ScrapeSection {
    /// id (or class) of the element wrapping the chapter body.
    #[serde(default)]
    pub content_id: Option<String>,
}

#[derive(Clone, Debug, Deserialize, Default)]
pub struct SiteSection {
    /// Regex with one capture group for the chapter digits.
    pub marker: String,
    #[serde(default)]
    pub strip: Vec<String>,
}

/// Settings the translation core runs with. Built once, passed explicitly.
#[derive(Clone, Debug, PartialEq)]
pub struct TranslationConfig {
    pub model_identifier: String,
    pub temperature: f32,
    pub thinking_budget: u32,
    pub max_attempts: u32,
    pub completeness_ratio: f64,
    pub context_window: u32,
    pub retry_base_delay_ms: u64,
    pub untitled_heading: bool,
}

impl Default for TranslationConfig {
    fn default() -> Self {
        Self {
            model_identifier: DEFAULT_MODEL.to_string(),
            temperature: DEFAULT_TEMPERATURE,
            thinking_budget: DEFAULT_THINKING_BUDGET,
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            completeness_ratio: DEFAULT_COMPLETENESS_RATIO,
            context_window: DEFAULT_CONTEXT_WINDOW,
            retry_base_delay_ms: DEFAULT_RETRY_BASE_DELAY_MS,
            untitled_heading: false,
        }
    }
}

impl TranslationConfig {
    pub fn from_app_config(cfg: &AppConfig) -> Result<Self> {
        let d = Self::default();
        let out = Self {
            model_identifier: cfg
                .model
                .name
                .as_deref()
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_string)
                .unwrap_or(d.model_identifier),
            temperature: cfg.model.temperature.unwrap_or(d.temperature),
            thinking_budget: cfg.model.thinking_budget.unwrap_or(d.thinking_budget),
            max_attempts: cfg.translation.max_attempts.unwrap_or(d.max_attempts),
            completeness_ratio: cfg
                .translation
                .completeness_ratio
                .unwrap_or(d.completeness_ratio),
            context_window: cfg.translation.context_window.unwrap_or(d.context_window),
            retry_base_delay_ms: cfg
                .translation
                .retry_base_delay_ms
                .unwrap_or(d.retry_base_delay_ms),
            untitled_heading: cfg.translation.untitled_heading.unwrap_or(d.untitled_heading),
        };
        out.validate()?;
        Ok(out)
    }

    pub fn validate(&self) -> Result<()> {
        if self.model_identifier.trim().is_empty() {
            return Err(Error::config("model name must not be empty"));
        }
        if !(0.0..=1.0).contains(&self.temperature) {
            return Err(Error::config(format!(
                "temperature must be within [0, 1], got {}",
                self.temperature
            )));
        }
        if self.max_attempts < 1 {
            return Err(Error::config("max_attempts must be at least 1"));
        }
        if !(self.completeness_ratio > 0.0 && self.completeness_ratio <= 1.0) {
            return Err(Error::config(format!(
                "completeness_ratio must be within (0, 1], got {}",
                self.completeness_ratio
            )));
        }
        Ok(())
    }
}

pub fn find_file_upwards(start_dir: &Path, filename: &str, max_levels: usize) -> Option<PathBuf> {
    let mut dir = start_dir;
    for _ in 0..=max_levels {
        let candidate = dir.join(filename);
        if candidate.exists() {
            return Some(candidate);
        }
        dir = dir.parent()?;
    }
    None
}

pub fn find_default_config(workdir: &Path, filename: &str) -> Option<PathBuf> {
    if let Ok(cwd) = std::env::current_dir() {
        if let Some(p) = find_file_upwards(&cwd, filename, 8) {
            return Some(p);
        }
    }
    if let Some(p) = find_file_upwards(workdir, filename, 8) {
        return Some(p);
    }
    if let Ok(exe) = std::env::current_exe() {
        if let Some(dir) = exe.parent() {
            if let Some(p) = find_file_upwards(dir, filename, 10) {
                return Some(p);
            }
        }
    }
    None
}

pub fn load_config(path: &Path) -> anyhow::Result<AppConfig> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("read config: {}", path.display()))?;
    parse_config(&text)
}

pub fn parse_config(text: &str) -> anyhow::Result<AppConfig> {
    let cfg: AppConfig = toml::from_str(text).context("parse config toml")?;
    Ok(cfg)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_config_uses_defaults() {
        let cfg = parse_config("").expect("parse");
        let tc = TranslationConfig::from_app_config(&cfg).expect("valid");
        assert_eq!(tc, TranslationConfig::default());
        assert_eq!(tc.model_identifier, "gemini-2.5-flash");
        assert_eq!(tc.max_attempts, 7);
    }

    #[test]
    fn sections_override_defaults() {
        let cfg = parse_config(
            r#"
[model]
name = "gemini-2.5-pro"
temperature = 0.5
thinking_budget = 0

[translation]
max_attempts = 3
completeness_ratio = 0.8
context_window = 0
untitled_heading = true

[sites."novelpia.com"]
marker = '(\d+)\s*회'
strip = [" - 노벨피아"]
"#,
        )
        .expect("parse");
        let tc = TranslationConfig::from_app_config(&cfg).expect("valid");
        assert_eq!(tc.model_identifier, "gemini-2.5-pro");
        assert_eq!(tc.thinking_budget, 0);
        assert_eq!(tc.max_attempts, 3);
        assert_eq!(tc.context_window, 0);
        assert!((tc.completeness_ratio - 0.8).abs() < f64::EPSILON);
        assert!(tc.untitled_heading);
        assert_eq!(cfg.sites["novelpia.com"].strip, vec![" - 노벨피아"]);
    }

    #[test]
    fn out_of_range_values_are_configuration_errors() {
        for toml_text in [
            "[translation]\nmax_attempts = 0",
            "[translation]\ncompleteness_ratio = 0.0",
            "[translation]\ncompleteness_ratio = 1.5",
            "[model]\ntemperature = 1.2",
        ] {
            let cfg = parse_config(toml_text).expect("parse");
            let err = TranslationConfig::from_app_config(&cfg).unwrap_err();
            assert!(matches!(err, Error::Config(_)), "{toml_text}");
        }
    }

    #[test]
    fn find_file_upwards_walks_parents() {
        let dir = tempfile::tempdir().unwrap();
        let nested = dir.path().join("a").join("b");
        std::fs::create_dir_all(&nested).unwrap();
        std::fs::write(dir.path().join(DEFAULT_CONFIG_FILENAME), "").unwrap();

        let found = find_file_upwards(&nested, DEFAULT_CONFIG_FILENAME, 4).expect("found");
        assert_eq!(found, dir.path().join(DEFAULT_CONFIG_FILENAME));
        assert!(find_file_upwards(&nested, "missing.toml", 4).is_none());
    }
}

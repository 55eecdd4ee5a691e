use std::path::{Path, PathBuf};

use anyhow::Context;
use tracing::{debug, info};

use crate::config::{
    find_default_config, load_config, AppConfig, TranslationConfig, CONFIG_ENV,
    DEFAULT_CONFIG_FILENAME,
};
use crate::pipeline::prompts::{default_prompt_files, PromptCatalog, DEFAULT_PROMPTS_DIR};
use crate::scrape::DEFAULT_CONTENT_ID;

pub const DEFAULT_OUTPUT_DIR: &str = "output";
pub const DEFAULT_TRACE_DIR: &str = "_trace";

/// Command-line values that take precedence over the config file.
#[derive(Clone, Debug, Default)]
pub struct RunOverrides {
    pub output_dir: Option<PathBuf>,
    pub context_chapters: Option<u32>,
    pub no_context: bool,
}

/// Everything one batch run needs, resolved once at startup.
#[derive(Clone, Debug)]
pub struct PipelineConfig {
    pub config_path: PathBuf,
    pub app: AppConfig,
    pub translation: TranslationConfig,
    pub output_dir: PathBuf,
    pub trace_dir: PathBuf,
    pub trace_prompts: bool,
    pub content_id: String,
    pub prompts: PromptCatalog,
}

impl PipelineConfig {
    pub fn from_paths_and_args(
        input: &Path,
        config_path: Option<PathBuf>,
        overrides: RunOverrides,
    ) -> anyhow::Result<Self> {
        let workdir = if input.is_dir() {
            input.to_path_buf()
        } else {
            input
                .parent()
                .map(|p| p.to_path_buf())
                .unwrap_or_else(|| PathBuf::from("."))
        };
        let workdir = workdir.canonicalize().unwrap_or(workdir);

        let cfg_file = config_path
            .or_else(|| std::env::var(CONFIG_ENV).ok().map(PathBuf::from))
            .or_else(|| find_default_config(&workdir, DEFAULT_CONFIG_FILENAME));

        let mut app = AppConfig::default();
        match cfg_file.as_ref() {
            Some(p) if p.exists() => {
                app = load_config(p)?;
                info!(config = %p.display(), "loaded config");
            }
            Some(p) => {
                return Err(anyhow::anyhow!("config file not found: {}", p.display()));
            }
            None => debug!("no config file; using built-in defaults"),
        }
        let config_path = cfg_file.unwrap_or_else(|| workdir.join(DEFAULT_CONFIG_FILENAME));

        let mut translation =
            TranslationConfig::from_app_config(&app).context("invalid [model]/[translation] config")?;
        if let Some(n) = overrides.context_chapters {
            translation.context_window = n;
        }
        if overrides.no_context {
            translation.context_window = 0;
        }

        let output_dir = overrides.output_dir.unwrap_or_else(|| {
            PathBuf::from(
                app.output
                    .dir
                    .clone()
                    .unwrap_or_else(|| DEFAULT_OUTPUT_DIR.to_string()),
            )
        });
        let trace_dir = app
            .output
            .trace_dir
            .clone()
            .unwrap_or_else(|| DEFAULT_TRACE_DIR.to_string());
        let trace_dir = if Path::new(&trace_dir).is_absolute() {
            PathBuf::from(trace_dir)
        } else {
            output_dir.join(trace_dir)
        };
        let trace_prompts = app.output.trace_prompts.unwrap_or(false);

        let content_id = app
            .scrape
            .content_id
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .unwrap_or(DEFAULT_CONTENT_ID)
            .to_string();

        let prompts = PromptCatalog::load(&config_path, &app).context("load prompts")?;

        Ok(Self {
            config_path,
            app,
            translation,
            output_dir,
            trace_dir,
            trace_prompts,
            content_id,
            prompts,
        })
    }
}

pub fn init_default_config(dir: &Path, force: bool) -> anyhow::Result<PathBuf> {
    std::fs::create_dir_all(dir)
        .with_context(|| format!("create config dir: {}", dir.display()))?;
    let cfg_path = dir.join(DEFAULT_CONFIG_FILENAME);

    let prompts_dir = dir.join(DEFAULT_PROMPTS_DIR);
    std::fs::create_dir_all(&prompts_dir)
        .with_context(|| format!("create prompts dir: {}", prompts_dir.display()))?;

    for (fname, body) in default_prompt_files() {
        let p = prompts_dir.join(fname);
        if p.exists() && !force {
            continue;
        }
        std::fs::write(&p, body).with_context(|| format!("write prompt: {}", p.display()))?;
    }

    if cfg_path.exists() && !force {
        return Ok(cfg_path);
    }
    std::fs::write(&cfg_path, DEFAULT_CONFIG_TOML)
        .with_context(|| format!("write config: {}", cfg_path.display()))?;
    Ok(cfg_path)
}

const DEFAULT_CONFIG_TOML: &str = r##"[model]
name = "gemini-2.5-flash"
temperature = 0.3
thinking_budget = 1000
# Environment variable that holds the API key.
api_key_env = "GEMINI_API_KEY"
endpoint = "https://generativelanguage.googleapis.com/v1beta/models"
timeout_secs = 300

[translation]
max_attempts = 7
# A reply must have at least this share of the source's non-empty lines.
completeness_ratio = 0.75
# Earlier translated chapters sent along for name/term consistency (0 = off).
context_window = 3
retry_base_delay_ms = 800
# When the chapter number is unknown: false = no heading, true = "# Title" / "# Untitled".
untitled_heading = false

[prompts]
translate = "prompts/translate.txt"

[output]
dir = "output"
trace_dir = "_trace"
trace_prompts = false

[scrape]
content_id = "novel_content"

# Extra sites: regex with one capture group around the chapter digits,
# plus site-chrome strings to remove from the page title.
# [sites."novelpia.com"]
# marker = '(\d+)\s*화'
# strip = ["노벨피아"]
"##;

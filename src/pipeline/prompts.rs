use std::path::{Path, PathBuf};

use anyhow::{anyhow, Context};

use crate::config::AppConfig;

pub const DEFAULT_PROMPTS_DIR: &str = "prompts";
pub const DEFAULT_TRANSLATE: &str = "translate.txt";

#[derive(Clone, Debug)]
pub struct PromptCatalog {
    pub translate: String,
}

impl Default for PromptCatalog {
    fn default() -> Self {
        Self {
            translate: DEFAULT_TRANSLATE_TEXT.to_string(),
        }
    }
}

impl PromptCatalog {
    /// An explicitly configured prompt file must exist; the default location
    /// falls back to the built-in prompt when absent.
    pub fn load(config_path: &Path, cfg: &AppConfig) -> anyhow::Result<Self> {
        let config_dir = config_path.parent().unwrap_or_else(|| Path::new("."));
        let configured = cfg
            .prompts
            .translate
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty());

        let (rel, required) = match configured {
            Some(p) => (p.to_string(), true),
            None => (format!("{DEFAULT_PROMPTS_DIR}/{DEFAULT_TRANSLATE}"), false),
        };
        let mut path = PathBuf::from(rel);
        if path.is_relative() {
            path = config_dir.join(&path);
        }

        if !path.exists() {
            if required {
                return Err(anyhow!(
                    "prompt file not found: {} (run: webnovel-translator --init-config)",
                    path.display()
                ));
            }
            return Ok(Self::default());
        }
        let text = std::fs::read_to_string(&path)
            .with_context(|| format!("read prompt: {}", path.display()))?;
        if text.trim().is_empty() {
            return Err(anyhow!("prompt file is empty: {}", path.display()));
        }
        Ok(Self { translate: text })
    }
}

/// Everything the model sees besides the fixed prompt.
#[derive(Clone, Copy, Debug)]
pub struct PromptInput<'a> {
    pub novel_title: &'a str,
    pub context: Option<&'a str>,
    pub instructions: Option<&'a str>,
    pub raw_text: &'a str,
}

/// Ordered content segments: fixed prompt, title note, context,
/// session instructions, chapter. Later segments only add to the prompt.
pub fn build_segments(prompt: &str, input: &PromptInput<'_>) -> Vec<String> {
    let mut segments = Vec::with_capacity(5);
    segments.push(prompt.to_string());
    segments.push(format!(
        "For your information, the novel title in its original language is {}. \
Do not use this as the chapter title you output.",
        input.novel_title
    ));
    if let Some(ctx) = input.context.map(str::trim).filter(|s| !s.is_empty()) {
        segments.push(ctx.to_string());
    }
    if let Some(extra) = input.instructions.map(str::trim).filter(|s| !s.is_empty()) {
        segments.push(format!(
            "The following additional instructions should also be followed:\n\n{extra}"
        ));
    }
    segments.push(format!(
        "Here is the chapter you will translate into English:\n\n{}",
        input.raw_text
    ));
    segments
}

pub fn default_prompt_files() -> Vec<(&'static str, &'static str)> {
    vec![(DEFAULT_TRANSLATE, DEFAULT_TRANSLATE_TEXT)]
}

pub const DEFAULT_TRANSLATE_TEXT: &str = r#"You are an experienced literary translator of East Asian web novels.
Translate the chapter you are given into natural, fluent English prose.

Rules:
- Translate the WHOLE chapter. Do NOT omit, summarize or merge passages.
- Keep one output line per source paragraph, in the same order.
- Keep dialogue in quotation marks and keep the speaker order.
- Romanize personal names consistently; translate titles, skills and place names into English.
- Keep sound effects and system messages, translated, in their original position.
- Do not add translator notes, commentary or headings.

Output JSON with exactly two fields:
- "chapter_title": the chapter's own title in English, or null when the chapter has none.
  Never use the novel title or the chapter number as the chapter title.
- "translated_text": the full English translation, paragraphs separated by newlines."#;

#[cfg(test)]
mod tests {
    use super::*;

    fn input<'a>(context: Option<&'a str>, instructions: Option<&'a str>) -> PromptInput<'a> {
        PromptInput {
            novel_title: "서울 생존기",
            context,
            instructions,
            raw_text: "첫 줄\n둘째 줄",
        }
    }

    #[test]
    fn segments_follow_fixed_order() {
        let segs = build_segments("PROMPT", &input(Some("CTX"), Some("Use British spelling.")));
        assert_eq!(segs.len(), 5);
        assert_eq!(segs[0], "PROMPT");
        assert!(segs[1].contains("서울 생존기"));
        assert_eq!(segs[2], "CTX");
        assert!(segs[3].ends_with("Use British spelling."));
        assert!(segs[4].ends_with("첫 줄\n둘째 줄"));
    }

    #[test]
    fn optional_segments_are_omitted_when_blank() {
        let segs = build_segments("PROMPT", &input(None, Some("   ")));
        assert_eq!(segs.len(), 3);
        assert_eq!(segs[0], "PROMPT");
        assert!(segs[2].starts_with("Here is the chapter"));
    }

    #[test]
    fn default_location_falls_back_to_builtin_prompt() {
        let dir = tempfile::tempdir().unwrap();
        let cfg_path = dir.path().join("webnovel-translator.toml");
        let cat = PromptCatalog::load(&cfg_path, &AppConfig::default()).unwrap();
        assert_eq!(cat.translate, DEFAULT_TRANSLATE_TEXT);

        std::fs::create_dir_all(dir.path().join(DEFAULT_PROMPTS_DIR)).unwrap();
        std::fs::write(
            dir.path().join(DEFAULT_PROMPTS_DIR).join(DEFAULT_TRANSLATE),
            "custom prompt",
        )
        .unwrap();
        let cat = PromptCatalog::load(&cfg_path, &AppConfig::default()).unwrap();
        assert_eq!(cat.translate, "custom prompt");
    }

    #[test]
    fn configured_prompt_must_exist() {
        let dir = tempfile::tempdir().unwrap();
        let cfg_path = dir.path().join("webnovel-translator.toml");
        let mut cfg = AppConfig::default();
        cfg.prompts.translate = Some("prompts/missing.txt".to_string());
        assert!(PromptCatalog::load(&cfg_path, &cfg).is_err());
    }
}

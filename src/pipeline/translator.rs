use tracing::{debug, info, warn};

use crate::chapter::{ScrapedChapter, TranslatedChapter};
use crate::config::TranslationConfig;
use crate::error::{Result, ScraperError};
use crate::models::{GenerationSettings, GenerativeModel};
use crate::pipeline::attempt::{AttemptLoop, AttemptPolicy};
use crate::pipeline::context;
use crate::pipeline::format::format_chapter;
use crate::pipeline::prompts::{build_segments, PromptCatalog, PromptInput};
use crate::pipeline::trace::TraceWriter;
use crate::quality::quality_heuristics;
use crate::store::{sanitize_dir_name, ArtifactStore};

/// Scraped chapter in, formatted English chapter out.
///
/// Owns its configuration and collaborators; nothing here is global. The
/// store is only read (for context); writing results is the caller's job.
pub struct Translator<M, S> {
    cfg: TranslationConfig,
    model: M,
    store: S,
    prompts: PromptCatalog,
    trace: TraceWriter,
    allow_partial: bool,
}

impl<M: GenerativeModel, S: ArtifactStore> Translator<M, S> {
    pub fn new(cfg: TranslationConfig, model: M, store: S, prompts: PromptCatalog) -> Self {
        Self {
            cfg,
            model,
            store,
            prompts,
            trace: TraceWriter::disabled(),
            allow_partial: false,
        }
    }

    pub fn with_trace(mut self, trace: TraceWriter) -> Self {
        self.trace = trace;
        self
    }

    /// Accept the most complete rejected attempt when the budget runs out.
    pub fn allow_partial(mut self, allow: bool) -> Self {
        self.allow_partial = allow;
        self
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn translate(
        &mut self,
        chapter: &ScrapedChapter,
        additional_instructions: Option<&str>,
    ) -> Result<TranslatedChapter> {
        if chapter.raw_text.trim().is_empty() {
            return Err(ScraperError::ContentNotFound("Chapter has no text to translate.".into()).into());
        }

        let ctx = match chapter.chapter_number {
            Some(n) => context::assemble(&self.store, &chapter.novel_title, n, self.cfg.context_window),
            None => {
                debug!("chapter number unknown; translating without context");
                None
            }
        };
        if let Some(c) = ctx.as_ref() {
            info!(chapters = ?c.chapters, "using earlier chapters as context");
        }

        let segments = build_segments(
            &self.prompts.translate,
            &PromptInput {
                novel_title: &chapter.novel_title,
                context: ctx.as_ref().map(|c| c.text.as_str()),
                instructions: additional_instructions,
                raw_text: &chapter.raw_text,
            },
        );
        debug!(
            segments = segments.len(),
            prompt_chars = segments.iter().map(|s| s.chars().count()).sum::<usize>(),
            "prompt assembled"
        );

        let settings = GenerationSettings {
            model: self.cfg.model_identifier.clone(),
            temperature: self.cfg.temperature,
            thinking_budget: self.cfg.thinking_budget,
        };
        let label = format!(
            "{}_ch{}",
            sanitize_dir_name(&chapter.novel_title),
            chapter
                .chapter_number
                .map(|n| n.to_string())
                .unwrap_or_else(|| "x".to_string())
        );
        let outcome = AttemptLoop::new(
            &mut self.model,
            &settings,
            AttemptPolicy::from_config(&self.cfg, self.allow_partial),
        )
        .with_trace(&self.trace, label)
        .run(&segments, &chapter.raw_text)?;

        let q = quality_heuristics(&chapter.raw_text, &outcome.response.translated_text);
        if q.flags.is_empty() {
            debug!(quality = %q.render_line(), "quality heuristics");
        } else {
            warn!(quality = %q.render_line(), "translation looks suspicious");
        }

        let chapter_title = outcome.response.chapter_title;
        let translated_text = format_chapter(
            &outcome.response.translated_text,
            chapter.chapter_number,
            chapter_title.as_deref(),
            self.cfg.untitled_heading,
        );

        Ok(TranslatedChapter {
            novel_title: chapter.novel_title.clone(),
            chapter_title,
            chapter_number: chapter.chapter_number,
            translated_text,
            attempts: outcome.attempts,
            complete: outcome.complete,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use crate::models::scripted::{english_lines as english, ScriptedModel};
    use crate::store::FsChapterStore;

    fn model(replies: Vec<(Option<&'static str>, String)>) -> ScriptedModel {
        ScriptedModel::replies(replies)
    }

    fn korean(n: usize) -> String {
        (1..=n)
            .map(|i| format!("한국어 문장 {i}."))
            .collect::<Vec<_>>()
            .join("\n\n")
    }

    fn cfg() -> TranslationConfig {
        TranslationConfig {
            max_attempts: 3,
            retry_base_delay_ms: 0,
            ..TranslationConfig::default()
        }
    }

    #[test]
    fn retries_short_reply_then_formats_accepted_one() {
        let dir = tempfile::tempdir().unwrap();
        let chapter = ScrapedChapter {
            novel_title: "서울 생존기".into(),
            chapter_number: Some(12),
            raw_text: korean(40),
        };
        let m = model(vec![
            (Some("Too Short"), english(30).replace('\n', " ")),
            (Some("The Gate"), english(35)),
        ]);
        let mut t = Translator::new(cfg(), m, FsChapterStore::new(dir.path()), PromptCatalog::default());

        let out = t.translate(&chapter, None).unwrap();
        assert_eq!(out.attempts, 2);
        assert!(out.complete);
        assert_eq!(out.chapter_title.as_deref(), Some("The Gate"));
        assert_eq!(out.chapter_number, Some(12));
        assert!(out.translated_text.starts_with("# Chapter 12. The Gate\n\nEnglish sentence 1.\n\n"));
        assert!(out.translated_text.ends_with("English sentence 35."));
        assert_eq!(t.model.calls, 2);
    }

    #[test]
    fn thirty_of_forty_lines_is_enough() {
        let dir = tempfile::tempdir().unwrap();
        let chapter = ScrapedChapter {
            novel_title: "n".into(),
            chapter_number: Some(1),
            raw_text: korean(40),
        };
        let m = model(vec![(None, english(30))]);
        let mut t = Translator::new(cfg(), m, FsChapterStore::new(dir.path()), PromptCatalog::default());
        let out = t.translate(&chapter, None).unwrap();
        assert_eq!(out.attempts, 1);
        assert!(out.translated_text.starts_with("# Chapter 1\n\n"));
    }

    #[test]
    fn earlier_chapters_and_instructions_reach_the_model() {
        let dir = tempfile::tempdir().unwrap();
        let store = FsChapterStore::new(dir.path());
        store.save("서울 생존기", 11, "# Chapter 11\n\nKim Dokja ran.").unwrap();

        let chapter = ScrapedChapter {
            novel_title: "서울 생존기".into(),
            chapter_number: Some(12),
            raw_text: korean(2),
        };
        let mut t = Translator::new(cfg(), model(vec![(None, english(2))]), store, PromptCatalog::default());
        t.translate(&chapter, Some("Call him Dokja.")).unwrap();

        let segs = &t.model.last_segments;
        assert_eq!(segs.len(), 5);
        assert!(segs[2].contains("Kim Dokja ran."));
        assert!(segs[3].contains("Call him Dokja."));
        assert!(segs[4].contains("한국어 문장 2."));
    }

    #[test]
    fn exhaustion_surfaces_scraper_error() {
        let dir = tempfile::tempdir().unwrap();
        let chapter = ScrapedChapter {
            novel_title: "n".into(),
            chapter_number: None,
            raw_text: korean(10),
        };
        let m = model(vec![(None, english(2)), (None, english(3)), (None, english(4))]);
        let mut t = Translator::new(cfg(), m, FsChapterStore::new(dir.path()), PromptCatalog::default());
        let err = t.translate(&chapter, None).unwrap_err();
        assert_eq!(err.to_string(), "Failed to translate chapter after 3 attempts");
        assert!(matches!(err, Error::Scraper(ScraperError::AttemptsExhausted { .. })));
        assert_eq!(t.model.calls, 3);
    }

    #[test]
    fn partial_result_is_flagged() {
        let dir = tempfile::tempdir().unwrap();
        let chapter = ScrapedChapter {
            novel_title: "n".into(),
            chapter_number: None,
            raw_text: korean(10),
        };
        let m = model(vec![(None, english(2)), (None, english(6)), (None, english(4))]);
        let mut t = Translator::new(cfg(), m, FsChapterStore::new(dir.path()), PromptCatalog::default())
            .allow_partial(true);
        let out = t.translate(&chapter, None).unwrap();
        assert!(!out.complete);
        assert_eq!(out.translated_text.matches("English sentence").count(), 6);
        // No chapter number and untitled_heading off: no heading.
        assert!(out.translated_text.starts_with("English sentence 1."));
    }
}

use std::path::{Path, PathBuf};

use tracing::{error, info, warn};

use crate::chapter::TranslatedChapter;
use crate::error::{Error, Result};
use crate::models::GenerativeModel;
use crate::pipeline::translator::Translator;
use crate::progress::ConsoleProgress;
use crate::scrape::HtmlScraper;
use crate::sites::SiteRegistry;
use crate::store::{partial_path, ArtifactStore, FsChapterStore};
use crate::textutil::first_number;

const INPUT_EXTENSIONS: &[&str] = &["html", "htm"];

/// A single HTML file, or every `*.html`/`*.htm` in a directory ordered by
/// the first number in the file name.
pub fn discover_inputs(input: &Path) -> Result<Vec<PathBuf>> {
    let meta = std::fs::metadata(input).map_err(|e| Error::io("read input", input, e))?;
    if meta.is_file() {
        return Ok(vec![input.to_path_buf()]);
    }

    let mut files = Vec::new();
    let entries = std::fs::read_dir(input).map_err(|e| Error::io("list input dir", input, e))?;
    for entry in entries {
        let entry = entry.map_err(|e| Error::io("list input dir", input, e))?;
        let path = entry.path();
        let is_html = path
            .extension()
            .and_then(|e| e.to_str())
            .is_some_and(|e| INPUT_EXTENSIONS.iter().any(|x| e.eq_ignore_ascii_case(x)));
        if is_html && path.is_file() {
            files.push(path);
        }
    }
    files.sort_by_cached_key(|p| {
        let name = p
            .file_name()
            .and_then(|s| s.to_str())
            .unwrap_or_default()
            .to_string();
        let stem = p.file_stem().and_then(|s| s.to_str()).unwrap_or_default();
        (first_number(stem).unwrap_or(0), name)
    });
    Ok(files)
}

#[derive(Clone, Debug, Default)]
pub struct BatchOptions {
    /// Retranslate chapters that already have an output file.
    pub force: bool,
    pub instructions: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum FileOutcome {
    Written { path: PathBuf, complete: bool },
    Skipped(PathBuf),
}

#[derive(Clone, Debug, Default)]
pub struct BatchSummary {
    pub succeeded: usize,
    pub partial: usize,
    pub skipped: usize,
    pub failed: Vec<(PathBuf, String)>,
}

impl BatchSummary {
    pub fn is_success(&self) -> bool {
        self.failed.is_empty()
    }

    pub fn render(&self) -> String {
        let mut out = format!(
            "Translation complete: {} successful, {} skipped, {} failed",
            self.succeeded,
            self.skipped,
            self.failed.len()
        );
        if self.partial > 0 {
            out.push_str(&format!(" ({} partial)", self.partial));
        }
        for (path, reason) in &self.failed {
            out.push_str(&format!("\n  - {}: {reason}", path.display()));
        }
        out
    }
}

/// Scrape, translate and write chapters one after another. A failing file
/// is recorded and the run moves on.
pub struct BatchRunner<M> {
    translator: Translator<M, FsChapterStore>,
    scraper: HtmlScraper,
    sites: SiteRegistry,
    progress: ConsoleProgress,
    opts: BatchOptions,
}

impl<M: GenerativeModel> BatchRunner<M> {
    pub fn new(
        translator: Translator<M, FsChapterStore>,
        scraper: HtmlScraper,
        sites: SiteRegistry,
        progress: ConsoleProgress,
        opts: BatchOptions,
    ) -> Self {
        Self {
            translator,
            scraper,
            sites,
            progress,
            opts,
        }
    }

    pub fn run(&mut self, inputs: &[PathBuf]) -> BatchSummary {
        let mut summary = BatchSummary::default();
        let total = inputs.len();
        for (i, path) in inputs.iter().enumerate() {
            let name = path
                .file_name()
                .map(|s| s.to_string_lossy().into_owned())
                .unwrap_or_else(|| path.display().to_string());
            self.progress.chapter(i + 1, total, &name);

            match self.process_one(path) {
                Ok(FileOutcome::Written { path: out, complete }) => {
                    summary.succeeded += 1;
                    if !complete {
                        summary.partial += 1;
                    }
                    info!(input = %path.display(), output = %out.display(), "chapter written");
                }
                Ok(FileOutcome::Skipped(out)) => {
                    summary.skipped += 1;
                    info!(output = %out.display(), "already translated; skipping (use --force to redo)");
                }
                Err(e) => {
                    error!(input = %path.display(), error = %e, "chapter failed");
                    summary.failed.push((path.clone(), e.to_string()));
                }
            }
        }
        summary
    }

    pub fn process_one(&mut self, input: &Path) -> Result<FileOutcome> {
        let (chapter, identity) = self.scraper.scrape_chapter(input, &self.sites)?;
        let store = self.translator.store();
        let out_path = match identity.chapter_number {
            Some(n) => store.chapter_path(&identity.novel_title, n),
            None => {
                let stem = input
                    .file_stem()
                    .and_then(|s| s.to_str())
                    .unwrap_or("chapter");
                warn!(input = %input.display(), "chapter number unresolved; naming output after the input file");
                store.unnumbered_path(&identity.novel_title, stem)
            }
        };
        if out_path.exists() && !self.opts.force {
            return Ok(FileOutcome::Skipped(out_path));
        }

        let translated = self
            .translator
            .translate(&chapter, self.opts.instructions.as_deref())?;
        let path = self.write(&translated, &out_path)?;
        Ok(FileOutcome::Written {
            path,
            complete: translated.complete,
        })
    }

    /// Partial results go next to the final path, never onto it.
    fn write(&self, chapter: &TranslatedChapter, out_path: &Path) -> Result<PathBuf> {
        let store = self.translator.store();
        if !chapter.complete {
            let path = partial_path(out_path);
            store.write_to(&path, &chapter.translated_text)?;
            warn!(
                output = %path.display(),
                "partial translation written; the chapter is retried on the next run"
            );
            return Ok(path);
        }

        let path = match chapter.chapter_number {
            Some(n) => store.save(&chapter.novel_title, n, &chapter.translated_text)?,
            None => {
                store.write_to(out_path, &chapter.translated_text)?;
                out_path.to_path_buf()
            }
        };
        store.discard(&partial_path(&path))?;
        Ok(path)
    }
}

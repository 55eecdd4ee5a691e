//! Chapter identity resolution, one rule set per source host.

mod marker;

use std::collections::{BTreeMap, HashMap};

use tracing::{debug, warn};

use crate::chapter::{ChapterConfidence, ChapterIdentity};
use crate::config::SiteSection;
use crate::error::{Result, ScraperError};
use crate::scrape::PageMetadata;
use crate::textutil::collapse_ws;

pub use marker::MarkerRule;

/// How one family of sites spells novel titles and chapter numbers.
pub trait SiteRules: Send + Sync {
    fn novel_title(&self, meta: &PageMetadata) -> Option<String>;
    fn chapter_number(&self, meta: &PageMetadata) -> (Option<u32>, ChapterConfidence);
}

/// Unknown hosts: the page title is the novel title, the number stays open.
#[derive(Clone, Copy, Debug, Default)]
pub struct GenericRule;

impl SiteRules for GenericRule {
    fn novel_title(&self, meta: &PageMetadata) -> Option<String> {
        meta.title
            .as_deref()
            .map(collapse_ws)
            .filter(|t| !t.is_empty())
    }

    fn chapter_number(&self, _meta: &PageMetadata) -> (Option<u32>, ChapterConfidence) {
        (None, ChapterConfidence::Unresolved)
    }
}

pub struct SiteRegistry {
    rules: HashMap<String, Box<dyn SiteRules>>,
    fallback: Box<dyn SiteRules>,
}

impl Default for SiteRegistry {
    fn default() -> Self {
        Self::with_builtin_sites()
    }
}

impl SiteRegistry {
    #[must_use]
    pub fn empty() -> Self {
        Self {
            rules: HashMap::new(),
            fallback: Box::new(GenericRule),
        }
    }

    #[must_use]
    pub fn with_builtin_sites() -> Self {
        let mut reg = Self::empty();
        reg.register("booktoki.com", MarkerRule::booktoki());
        reg
    }

    /// Built-in sites plus `[sites.<host>]` entries from the config file.
    /// Config entries replace built-ins with the same host key.
    pub fn from_config(sites: &BTreeMap<String, SiteSection>) -> Result<Self> {
        let mut reg = Self::with_builtin_sites();
        for (host, section) in sites {
            let rule = MarkerRule::new(&section.marker, section.strip.clone())?;
            reg.register(host, rule);
        }
        Ok(reg)
    }

    pub fn register(&mut self, host: &str, rules: impl SiteRules + 'static) {
        self.rules.insert(host_key(host), Box::new(rules));
    }

    pub fn rules_for(&self, hostname: Option<&str>) -> &dyn SiteRules {
        hostname
            .and_then(|h| self.rules.get(&host_key(h)))
            .map(|r| r.as_ref())
            .unwrap_or(self.fallback.as_ref())
    }

    /// `(novel_title, chapter_number)` for a scraped page. An empty title is
    /// an error: output directories are named after it.
    pub fn resolve_identity(&self, meta: &PageMetadata) -> Result<ChapterIdentity> {
        let rules = self.rules_for(meta.hostname.as_deref());
        let novel_title = rules
            .novel_title(meta)
            .map(|t| t.trim().to_string())
            .filter(|t| !t.is_empty())
            .ok_or(ScraperError::TitleNotFound)?;
        let (chapter_number, confidence) = rules.chapter_number(meta);

        match confidence {
            ChapterConfidence::Marker => {}
            ChapterConfidence::Fallback => warn!(
                title = meta.title.as_deref().unwrap_or_default(),
                "no chapter marker in page title; assuming chapter {}",
                chapter_number.unwrap_or(1)
            ),
            ChapterConfidence::Unresolved => debug!(
                host = meta.hostname.as_deref().unwrap_or("<none>"),
                "no site rule for host; chapter number left unresolved"
            ),
        }

        Ok(ChapterIdentity {
            novel_title,
            chapter_number,
            confidence,
        })
    }
}

/// Registry key for a host: lowercase, no `www.`, digits dropped from the
/// first label so rotating mirrors (`booktoki468.com`) share one entry.
pub fn host_key(host: &str) -> String {
    let host = host.trim().trim_end_matches('.').to_ascii_lowercase();
    let host = host.strip_prefix("www.").unwrap_or(&host);
    match host.split_once('.') {
        Some((first, rest)) => {
            let first: String = first.chars().filter(|c| !c.is_ascii_digit()).collect();
            format!("{first}.{rest}")
        }
        None => host.to_string(),
    }
}

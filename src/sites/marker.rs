use regex::Regex;

use crate::chapter::ChapterConfidence;
use crate::error::{Error, Result};
use crate::scrape::PageMetadata;
use crate::textutil::collapse_ws;

use super::SiteRules;

const EDGE_PUNCT: &[char] = &['-', '|', '>', '<', ':', '·', '/', '~'];

/// Titles of the form `<novel> <N><marker>`: a digit run immediately
/// followed by the site's chapter glyph (`12화`, `第12章`).
#[derive(Clone, Debug)]
pub struct MarkerRule {
    pattern: Regex,
    strip: Vec<String>,
}

impl MarkerRule {
    /// `pattern` must have exactly one capture group around the digits.
    pub fn new(pattern: &str, strip: Vec<String>) -> Result<Self> {
        let pattern = Regex::new(pattern)
            .map_err(|e| Error::config(format!("invalid chapter marker {pattern:?}: {e}")))?;
        if pattern.captures_len() != 2 {
            return Err(Error::config(format!(
                "chapter marker {:?} needs exactly one capture group",
                pattern.as_str()
            )));
        }
        Ok(Self { pattern, strip })
    }

    /// booktoki and its numbered mirrors: `서울 생존기 12화`.
    pub fn booktoki() -> Self {
        Self {
            pattern: Regex::new(r"(\d+)화").expect("booktoki marker"),
            strip: vec!["북토끼".to_string(), "BookToki".to_string()],
        }
    }

    fn clean(&self, s: &str) -> String {
        let mut out = s.to_string();
        for chrome in &self.strip {
            if !chrome.is_empty() {
                out = out.replace(chrome.as_str(), " ");
            }
        }
        collapse_ws(&out)
            .trim_matches(|c: char| c.is_whitespace() || EDGE_PUNCT.contains(&c))
            .to_string()
    }
}

impl SiteRules for MarkerRule {
    fn novel_title(&self, meta: &PageMetadata) -> Option<String> {
        let title = meta.title.as_deref()?;
        let Some(m) = self.pattern.find(title) else {
            return Some(self.clean(title)).filter(|t| !t.is_empty());
        };
        let before = self.clean(&title[..m.start()]);
        if !before.is_empty() {
            return Some(before);
        }
        // Marker leads the title; the novel name follows it.
        let rest = format!("{} {}", &title[..m.start()], &title[m.end()..]);
        Some(self.clean(&rest)).filter(|t| !t.is_empty())
    }

    fn chapter_number(&self, meta: &PageMetadata) -> (Option<u32>, ChapterConfidence) {
        let found = meta
            .title
            .as_deref()
            .and_then(|t| self.pattern.captures(t))
            .and_then(|c| c.get(1))
            .and_then(|m| m.as_str().parse::<u32>().ok())
            .filter(|n| *n > 0);
        match found {
            Some(n) => (Some(n), ChapterConfidence::Marker),
            None => (Some(1), ChapterConfidence::Fallback),
        }
    }
}

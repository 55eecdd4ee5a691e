//! Reading saved chapter pages: decoding, metadata, chapter body.

pub mod encoding;
pub mod html;

use std::path::Path;

use tracing::debug;

use crate::chapter::{ChapterIdentity, ScrapedChapter};
use crate::error::{Error, Result, ScraperError};
use crate::sites::SiteRegistry;

pub const DEFAULT_CONTENT_ID: &str = "novel_content";

/// What the identity resolver gets to look at.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct PageMetadata {
    pub title: Option<String>,
    pub url: Option<String>,
    pub hostname: Option<String>,
}

impl PageMetadata {
    pub fn from_html(html: &str) -> Self {
        let url = html::page_url(html);
        let hostname = url.as_deref().and_then(html::host_of);
        Self {
            title: html::page_title(html),
            url,
            hostname,
        }
    }
}

#[derive(Clone, Debug)]
pub struct ScrapedPage {
    pub metadata: PageMetadata,
    /// Paragraphs separated by blank lines.
    pub raw_text: String,
}

#[derive(Clone, Debug)]
pub struct HtmlScraper {
    content_id: String,
}

impl Default for HtmlScraper {
    fn default() -> Self {
        Self::new(DEFAULT_CONTENT_ID)
    }
}

impl HtmlScraper {
    pub fn new(content_id: impl Into<String>) -> Self {
        Self {
            content_id: content_id.into(),
        }
    }

    pub fn scrape_file(&self, path: &Path) -> Result<ScrapedPage> {
        let bytes = std::fs::read(path).map_err(|e| Error::io("read page", path, e))?;
        let decoded = encoding::decode_page(&bytes);
        debug!(
            file = %path.display(),
            encoding = decoded.encoding,
            had_errors = decoded.had_errors,
            "decoded page"
        );
        self.scrape_html(&decoded.text)
    }

    pub fn scrape_html(&self, html: &str) -> Result<ScrapedPage> {
        let inner = html::element_inner_html(html, &self.content_id).ok_or_else(|| {
            ScraperError::ContentNotFound("Chapter content not found.".to_string())
        })?;
        let paragraphs = html::paragraphs(inner);
        if paragraphs.is_empty() {
            return Err(ScraperError::ContentNotFound("No readable content found.".to_string()).into());
        }
        Ok(ScrapedPage {
            metadata: PageMetadata::from_html(html),
            raw_text: paragraphs.join("\n\n"),
        })
    }

    /// Page -> resolved identity -> chapter ready for translation.
    pub fn scrape_chapter(
        &self,
        path: &Path,
        sites: &SiteRegistry,
    ) -> Result<(ScrapedChapter, ChapterIdentity)> {
        let page = self.scrape_file(path)?;
        let identity = sites.resolve_identity(&page.metadata)?;
        Ok((ScrapedChapter::new(identity.clone(), page.raw_text), identity))
    }
}

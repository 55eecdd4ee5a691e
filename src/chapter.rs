/// How a chapter number was obtained.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ChapterConfidence {
    /// Read from the site's chapter marker.
    Marker,
    /// Marker missing; the site rule substituted chapter 1.
    Fallback,
    /// No rule could say anything about the number.
    Unresolved,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ChapterIdentity {
    pub novel_title: String,
    pub chapter_number: Option<u32>,
    pub confidence: ChapterConfidence,
}

/// Raw chapter as extracted from a scraped page.
#[derive(Clone, Debug)]
pub struct ScrapedChapter {
    pub novel_title: String,
    pub chapter_number: Option<u32>,
    pub raw_text: String,
}

impl ScrapedChapter {
    pub fn new(identity: ChapterIdentity, raw_text: String) -> Self {
        Self {
            novel_title: identity.novel_title,
            chapter_number: identity.chapter_number,
            raw_text,
        }
    }
}

#[derive(Clone, Debug)]
pub struct TranslatedChapter {
    pub novel_title: String,
    pub chapter_title: Option<String>,
    pub chapter_number: Option<u32>,
    /// Formatted markdown, heading included.
    pub translated_text: String,
    /// Model invocations spent, including the accepted one.
    pub attempts: u32,
    /// `false` only when the caller opted into a partial result.
    pub complete: bool,
}

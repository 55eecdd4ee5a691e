use crate::textutil::{collapse_ws, non_empty_lines};

/// `# Chapter N. Title`, `# Chapter N`, or for an unknown number either
/// nothing or `# Title` / `# Untitled`, depending on `untitled_heading`.
pub fn chapter_heading(
    chapter_number: Option<u32>,
    chapter_title: Option<&str>,
    untitled_heading: bool,
) -> Option<String> {
    let title = chapter_title.map(collapse_ws).filter(|t| !t.is_empty());
    match (chapter_number, title) {
        (Some(n), Some(t)) => Some(format!("# Chapter {n}. {t}")),
        (Some(n), None) => Some(format!("# Chapter {n}")),
        (None, Some(t)) if untitled_heading => Some(format!("# {t}")),
        (None, None) if untitled_heading => Some("# Untitled".to_string()),
        (None, _) => None,
    }
}

/// Double-spaced paragraphs under a canonical heading. Running it on its
/// own output changes nothing.
pub fn format_chapter(
    translated_text: &str,
    chapter_number: Option<u32>,
    chapter_title: Option<&str>,
    untitled_heading: bool,
) -> String {
    let heading = chapter_heading(chapter_number, chapter_title, untitled_heading);
    let mut lines: Vec<&str> = non_empty_lines(translated_text).collect();
    if let Some(h) = heading.as_deref() {
        if lines.first() == Some(&h) {
            lines.remove(0);
        }
    }
    let body = lines.join("\n\n");
    match heading {
        Some(h) if body.is_empty() => h,
        Some(h) => format!("{h}\n\n{body}"),
        None => body,
    }
}

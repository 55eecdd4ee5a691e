use std::ops::Range;

use tracing::{debug, warn};

use crate::store::ArtifactStore;

const CONTEXT_HEADER: &str =
    "For reference, these chapters come right before the one you will translate. Do not translate them again.";
const CONSISTENCY_INSTRUCTION: &str =
    "Keep character names and terminology consistent with the reference chapters above.";

/// Earlier translations handed to the model for consistency.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ChapterContext {
    /// Chapter numbers actually included, ascending.
    pub chapters: Vec<u32>,
    pub text: String,
}

/// `[max(1, chapter - window), chapter)`
pub fn context_range(chapter: u32, window: u32) -> Range<u32> {
    let start = chapter.saturating_sub(window).max(1);
    start..chapter.max(start)
}

/// Best-effort: missing or unreadable chapters are left out, and `None`
/// means there is nothing to add. `window == 0` touches no storage.
pub fn assemble<S: ArtifactStore + ?Sized>(
    store: &S,
    novel_title: &str,
    chapter: u32,
    window: u32,
) -> Option<ChapterContext> {
    if window == 0 {
        return None;
    }

    let mut chapters = Vec::new();
    let mut blocks = Vec::new();
    for n in context_range(chapter, window) {
        match store.load(novel_title, n) {
            Ok(Some(text)) if !text.trim().is_empty() => {
                blocks.push(format!(
                    "<previous_chapter number=\"{n}\">\n{}\n</previous_chapter>",
                    text.trim()
                ));
                chapters.push(n);
            }
            Ok(_) => debug!(chapter = n, "no earlier translation for context"),
            Err(e) => warn!(chapter = n, error = %e, "skipping unreadable context chapter"),
        }
    }

    if chapters.is_empty() {
        return None;
    }
    let text = format!(
        "{CONTEXT_HEADER}\n\n{}\n\n{CONSISTENCY_INSTRUCTION}",
        blocks.join("\n\n")
    );
    Some(ChapterContext { chapters, text })
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;
    use std::collections::BTreeMap;
    use std::path::PathBuf;

    use super::*;
    use crate::error::Result;
    use crate::store::FsChapterStore;

    #[derive(Default)]
    struct RecordingStore {
        chapters: BTreeMap<u32, String>,
        loads: RefCell<Vec<u32>>,
    }

    impl ArtifactStore for RecordingStore {
        fn load(&self, _novel: &str, n: u32) -> Result<Option<String>> {
            self.loads.borrow_mut().push(n);
            Ok(self.chapters.get(&n).cloned())
        }

        fn save(&self, _novel: &str, _n: u32, _md: &str) -> Result<PathBuf> {
            unreachable!("context assembly never writes")
        }
    }

    #[test]
    fn missing_chapter_is_skipped_silently() {
        let dir = tempfile::tempdir().unwrap();
        let store = FsChapterStore::new(dir.path());
        for n in [1, 2, 4, 5] {
            store.save("서울 생존기", n, &format!("# Chapter {n}\n\nbody {n}")).unwrap();
        }

        let ctx = assemble(&store, "서울 생존기", 5, 3).expect("context");
        assert_eq!(ctx.chapters, vec![2, 4]);
        let two = ctx.text.find("number=\"2\"").unwrap();
        let four = ctx.text.find("number=\"4\"").unwrap();
        assert!(two < four);
        assert!(!ctx.text.contains("body 1"));
        assert!(!ctx.text.contains("body 5"));
        assert!(ctx.text.ends_with(CONSISTENCY_INSTRUCTION));
    }

    #[test]
    fn zero_window_does_no_io() {
        let store = RecordingStore::default();
        assert_eq!(assemble(&store, "n", 9, 0), None);
        assert!(store.loads.borrow().is_empty());
    }

    #[test]
    fn loads_stay_inside_the_window() {
        for chapter in 1..=12u32 {
            for window in 0..=6u32 {
                let store = RecordingStore {
                    chapters: (1..=20).map(|n| (n, format!("c{n}"))).collect(),
                    ..RecordingStore::default()
                };
                let ctx = assemble(&store, "n", chapter, window);
                let loads = store.loads.borrow();
                for &n in loads.iter() {
                    assert!(n >= 1 && n < chapter, "chapter={chapter} window={window} n={n}");
                    assert!(n + window >= chapter, "chapter={chapter} window={window} n={n}");
                }
                assert!(loads.windows(2).all(|w| w[0] < w[1]));
                let expected = (chapter - 1).min(window) as usize;
                assert_eq!(loads.len(), expected);
                assert_eq!(ctx.map(|c| c.chapters.len()).unwrap_or(0), expected);
            }
        }
    }

    #[test]
    fn range_bounds() {
        assert_eq!(context_range(5, 3), 2..5);
        assert_eq!(context_range(2, 3), 1..2);
        assert_eq!(context_range(1, 3), 1..1);
        assert!(context_range(1, 3).is_empty());
    }
}

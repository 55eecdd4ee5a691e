use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};

const PLACEHOLDER: char = '_';
const UNNUMBERED_PREFIX: &str = "unnumbered-";
const PARTIAL_SUFFIX: &str = ".partial";

/// Where finished chapters live. The context assembler reads through the
/// same trait the batch driver writes through, so both agree on layout.
pub trait ArtifactStore {
    fn load(&self, novel_title: &str, chapter_number: u32) -> Result<Option<String>>;
    fn save(&self, novel_title: &str, chapter_number: u32, markdown: &str) -> Result<PathBuf>;
}

/// `<root>/<sanitized novel title>/ch-<N>.md`
///
/// Unnumbered chapters are `unnumbered-<stem>.md` and partial results carry
/// a `.partial.md` suffix, so neither can shadow a finished `ch-<N>.md`.
#[derive(Clone, Debug)]
pub struct FsChapterStore {
    root: PathBuf,
}

impl FsChapterStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn novel_dir(&self, novel_title: &str) -> PathBuf {
        self.root.join(sanitize_dir_name(novel_title))
    }

    pub fn chapter_path(&self, novel_title: &str, chapter_number: u32) -> PathBuf {
        self.novel_dir(novel_title)
            .join(format!("ch-{chapter_number}.md"))
    }

    /// Path for a chapter whose number could not be resolved.
    pub fn unnumbered_path(&self, novel_title: &str, stem: &str) -> PathBuf {
        self.novel_dir(novel_title)
            .join(format!("{UNNUMBERED_PREFIX}{}.md", sanitize_dir_name(stem)))
    }

    pub fn write_to(&self, path: &Path, markdown: &str) -> Result<()> {
        write_atomic(path, markdown.as_bytes())
    }

    /// Drop a leftover file, e.g. a partial result superseded by a full one.
    pub fn discard(&self, path: &Path) -> Result<()> {
        match fs::remove_file(path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(Error::io("remove", path, e)),
        }
    }
}

/// `ch-4.md` => `ch-4.partial.md`. Context loading and the skip check only
/// look at final paths, so a partial result is retried on the next run.
pub fn partial_path(final_path: &Path) -> PathBuf {
    let stem = final_path
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("chapter");
    final_path.with_file_name(format!("{stem}{PARTIAL_SUFFIX}.md"))
}

impl ArtifactStore for FsChapterStore {
    fn load(&self, novel_title: &str, chapter_number: u32) -> Result<Option<String>> {
        let path = self.chapter_path(novel_title, chapter_number);
        match fs::read_to_string(&path) {
            Ok(text) => Ok(Some(text)),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(Error::io("read chapter", path, e)),
        }
    }

    fn save(&self, novel_title: &str, chapter_number: u32, markdown: &str) -> Result<PathBuf> {
        let path = self.chapter_path(novel_title, chapter_number);
        write_atomic(&path, markdown.as_bytes())?;
        Ok(path)
    }
}

/// Filesystem-safe directory name for a novel title. Letters and digits of
/// any script are kept, as are space, `-`, `_` and inner `.`; everything
/// else becomes `_`.
pub fn sanitize_dir_name(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    for ch in name.trim().chars() {
        if ch.is_alphanumeric() || matches!(ch, ' ' | '-' | '_' | '.') {
            out.push(ch);
        } else {
            out.push(PLACEHOLDER);
        }
    }
    let out = out.trim_matches(|c: char| c == '.' || c == ' ').to_string();
    if out.is_empty() {
        PLACEHOLDER.to_string()
    } else {
        out
    }
}

fn write_atomic(path: &Path, bytes: &[u8]) -> Result<()> {
    let tmp = tmp_path(path);

    if let Some(parent) = tmp.parent() {
        fs::create_dir_all(parent).map_err(|e| Error::io("create dir", parent, e))?;
    }

    fs::write(&tmp, bytes).map_err(|e| Error::io("write", &tmp, e))?;

    if cfg!(windows) && path.exists() {
        fs::remove_file(path).map_err(|e| Error::io("replace", path, e))?;
    }
    fs::rename(&tmp, path).map_err(|e| Error::io("rename into", path, e))?;

    Ok(())
}

fn tmp_path(path: &Path) -> PathBuf {
    let mut p = path.to_path_buf();
    let file_name = match path.file_name().and_then(|s| s.to_str()) {
        Some(n) => n.to_string(),
        None => "chapter".to_string(),
    };
    p.set_file_name(format!("{file_name}.tmp"));
    p
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sanitize_keeps_hangul_and_replaces_path_hostile_chars() {
        assert_eq!(sanitize_dir_name("서울 생존기"), "서울 생존기");
        assert_eq!(sanitize_dir_name("a/b\\c:d*e?"), "a_b_c_d_e_");
        assert_eq!(sanitize_dir_name("../etc"), "_etc");
        assert_eq!(sanitize_dir_name("  Title.  "), "Title");
        assert_eq!(sanitize_dir_name("///"), "___");
        assert_eq!(sanitize_dir_name(""), "_");
    }

    #[test]
    fn save_then_load_uses_same_layout() {
        let dir = tempfile::tempdir().unwrap();
        let store = FsChapterStore::new(dir.path());

        let path = store.save("무림/검객", 4, "# Chapter 4\n\nbody").unwrap();
        assert_eq!(path, dir.path().join("무림_검객").join("ch-4.md"));
        assert!(!dir.path().join("무림_검객").join("ch-4.md.tmp").exists());

        assert_eq!(
            store.load("무림/검객", 4).unwrap().as_deref(),
            Some("# Chapter 4\n\nbody")
        );
        assert_eq!(store.load("무림/검객", 5).unwrap(), None);
        assert_eq!(store.load("other", 4).unwrap(), None);
    }

    #[test]
    fn unnumbered_and_partial_paths_never_collide_with_chapters() {
        let dir = tempfile::tempdir().unwrap();
        let store = FsChapterStore::new(dir.path());
        let numbered = store.chapter_path("n", 2);

        let unnumbered = store.unnumbered_path("n", "ch-2");
        assert_eq!(unnumbered, dir.path().join("n").join("unnumbered-ch-2.md"));
        assert_ne!(unnumbered, numbered);

        assert_eq!(partial_path(&numbered), dir.path().join("n").join("ch-2.partial.md"));
        assert_eq!(
            partial_path(&unnumbered),
            dir.path().join("n").join("unnumbered-ch-2.partial.md")
        );
    }

    #[test]
    fn discard_ignores_missing_files() {
        let dir = tempfile::tempdir().unwrap();
        let store = FsChapterStore::new(dir.path());
        let path = store.save("n", 1, "x").unwrap();
        store.discard(&path).unwrap();
        assert!(!path.exists());
        store.discard(&path).unwrap();
    }

    #[test]
    fn save_overwrites_existing_chapter() {
        let dir = tempfile::tempdir().unwrap();
        let store = FsChapterStore::new(dir.path());
        store.save("n", 1, "old").unwrap();
        store.save("n", 1, "new").unwrap();
        assert_eq!(store.load("n", 1).unwrap().as_deref(), Some("new"));
    }
}

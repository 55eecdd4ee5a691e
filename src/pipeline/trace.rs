use std::path::PathBuf;

use crate::error::{Error, Result};

/// Per-attempt prompt/response dumps under `trace_dir`, one file per stage.
pub struct TraceWriter {
    dir: PathBuf,
    enabled: bool,
}

impl TraceWriter {
    pub fn new(dir: PathBuf, enabled: bool) -> Result<Self> {
        if enabled {
            std::fs::create_dir_all(&dir).map_err(|e| Error::io("create trace dir", &dir, e))?;
        }
        Ok(Self { dir, enabled })
    }

    pub fn disabled() -> Self {
        Self {
            dir: PathBuf::new(),
            enabled: false,
        }
    }

    pub fn enabled(&self) -> bool {
        self.enabled
    }

    pub fn write_named_text(&self, name: &str, text: &str) -> Result<()> {
        if !self.enabled {
            return Ok(());
        }
        let path = self.dir.join(sanitize_filename(name));
        std::fs::write(&path, text).map_err(|e| Error::io("write trace", &path, e))?;
        Ok(())
    }

    /// `<chapter>.a<NN>.<kind>.txt`, e.g. `서울 생존기_ch12.a02.response.txt`.
    pub fn write_attempt_text(
        &self,
        chapter_label: &str,
        attempt: u32,
        kind: &str,
        text: &str,
    ) -> Result<()> {
        if !self.enabled {
            return Ok(());
        }
        let name = format!("{chapter_label}.a{attempt:02}.{kind}.txt");
        self.write_named_text(&name, text)
    }
}

fn sanitize_filename(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    for ch in name.chars() {
        match ch {
            '/' | '\\' | ':' | '*' | '?' | '"' | '<' | '>' | '|' => out.push('_'),
            _ => out.push(ch),
        }
    }
    out
}

use std::collections::VecDeque;

use crate::error::BackendError;

use super::{GenerationSettings, GenerativeModel, ModelResponse};

/// Test double: replays canned outcomes in order and records every call.
pub struct ScriptedModel {
    script: VecDeque<Result<ModelResponse, BackendError>>,
    pub calls: u32,
    pub last_segments: Vec<String>,
}

impl ScriptedModel {
    pub fn new(script: Vec<Result<ModelResponse, BackendError>>) -> Self {
        Self {
            script: script.into(),
            calls: 0,
            last_segments: Vec::new(),
        }
    }

    /// Every call succeeds with the given texts, in order.
    pub fn replies<I, T>(texts: I) -> Self
    where
        I: IntoIterator<Item = (Option<&'static str>, T)>,
        T: Into<String>,
    {
        Self::new(
            texts
                .into_iter()
                .map(|(title, text)| Ok(reply(title, text)))
                .collect(),
        )
    }
}

pub fn reply(title: Option<&str>, text: impl Into<String>) -> ModelResponse {
    ModelResponse {
        chapter_title: title.map(str::to_string),
        translated_text: text.into(),
    }
}

/// `n` lines of English, one sentence each.
pub fn english_lines(n: usize) -> String {
    (1..=n)
        .map(|i| format!("English sentence {i}."))
        .collect::<Vec<_>>()
        .join("\n")
}

impl GenerativeModel for ScriptedModel {
    fn name(&self) -> &str {
        "scripted"
    }

    fn generate(
        &mut self,
        segments: &[String],
        _settings: &GenerationSettings,
    ) -> Result<ModelResponse, BackendError> {
        self.calls += 1;
        self.last_segments = segments.to_vec();
        self.script
            .pop_front()
            .unwrap_or_else(|| Err(BackendError::Transport("script ran out".into())))
    }
}

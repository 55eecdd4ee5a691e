pub mod gemini;
#[cfg(test)]
pub(crate) mod scripted;

use serde::Deserialize;

use crate::error::BackendError;

pub use gemini::{GeminiClient, GeminiConfig};

/// The only shape a model is allowed to answer with.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ModelResponse {
    /// The key is required; only an explicit `null` means "no title".
    #[serde(deserialize_with = "Option::deserialize")]
    pub chapter_title: Option<String>,
    pub translated_text: String,
}

impl ModelResponse {
    /// Parse a structured-output payload. Unknown or missing keys
    /// and an empty translation are contract violations.
    pub fn from_json(text: &str) -> Result<Self, BackendError> {
        let mut resp: Self = serde_json::from_str(text.trim())
            .map_err(|e| BackendError::Contract(format!("response does not match schema: {e}")))?;
        if resp.translated_text.trim().is_empty() {
            return Err(BackendError::Contract(
                "translated_text is empty".to_string(),
            ));
        }
        resp.chapter_title = resp
            .chapter_title
            .map(|t| t.trim().to_string())
            .filter(|t| !t.is_empty());
        Ok(resp)
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct GenerationSettings {
    pub model: String,
    pub temperature: f32,
    pub thinking_budget: u32,
}

/// A blocking request/response call to a generative backend.
pub trait GenerativeModel {
    fn name(&self) -> &str;

    fn generate(
        &mut self,
        segments: &[String],
        settings: &GenerationSettings,
    ) -> Result<ModelResponse, BackendError>;
}

impl<M: GenerativeModel + ?Sized> GenerativeModel for Box<M> {
    fn name(&self) -> &str {
        (**self).name()
    }

    fn generate(
        &mut self,
        segments: &[String],
        settings: &GenerationSettings,
    ) -> Result<ModelResponse, BackendError> {
        (**self).generate(segments, settings)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_agreed_shape() {
        let r = ModelResponse::from_json(
            r#"{"chapter_title": " The Gate ", "translated_text": "Line one.\nLine two."}"#,
        )
        .unwrap();
        assert_eq!(r.chapter_title.as_deref(), Some("The Gate"));
        assert_eq!(r.translated_text, "Line one.\nLine two.");

        let r = ModelResponse::from_json(r#"{"chapter_title": null, "translated_text": "x"}"#)
            .unwrap();
        assert_eq!(r.chapter_title, None);
        let r = ModelResponse::from_json(r#"{"chapter_title": "", "translated_text": "x"}"#)
            .unwrap();
        assert_eq!(r.chapter_title, None);
    }

    #[test]
    fn other_shapes_are_contract_violations() {
        for bad in [
            r#"{"chapter_title": "t", "content": "x"}"#,
            r#"{"chapter_title": null, "translated_text": "x", "notes": "extra"}"#,
            r#"{"translated_text": "x"}"#,
            r#"{"chapter_title": null, "translated_text": "   "}"#,
            r#"["x"]"#,
            "not json",
        ] {
            let err = ModelResponse::from_json(bad).unwrap_err();
            assert!(matches!(err, BackendError::Contract(_)), "{bad}");
        }
    }
}

//! Bounded retry loop around one chapter's model call.
//!
//! Every attempt is an independent full translation. An attempt ends in one
//! of three ways: the reply passes the completeness check (accepted), the
//! reply is too short or the call failed (try again while budget remains),
//! or the budget is spent (exhausted). Non-retryable backend errors stop the
//! loop at once.

use std::thread;
use std::time::Duration;

use rand::{thread_rng, Rng};
use tracing::{debug, info, warn};

use crate::config::TranslationConfig;
use crate::error::{Result, ScraperError};
use crate::models::{GenerationSettings, GenerativeModel, ModelResponse};
use crate::pipeline::trace::TraceWriter;
use crate::quality::Completeness;
use crate::textutil::clip;

const MAX_BACKOFF_EXPONENT: u32 = 6;

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct AttemptPolicy {
    pub max_attempts: u32,
    pub completeness_ratio: f64,
    /// `0` disables sleeping between failed backend calls.
    pub retry_base_delay_ms: u64,
    /// On exhaustion, return the most complete rejected reply instead of
    /// failing. Off unless the caller asks for it.
    pub allow_partial: bool,
}

impl AttemptPolicy {
    pub fn from_config(cfg: &TranslationConfig, allow_partial: bool) -> Self {
        Self {
            max_attempts: cfg.max_attempts.max(1),
            completeness_ratio: cfg.completeness_ratio,
            retry_base_delay_ms: cfg.retry_base_delay_ms,
            allow_partial,
        }
    }
}

#[derive(Clone, Debug)]
pub struct AttemptOutcome {
    pub response: ModelResponse,
    /// Model invocations spent, the returned one included.
    pub attempts: u32,
    pub completeness: Completeness,
    /// `false` only for a partial result accepted on exhaustion.
    pub complete: bool,
}

#[derive(Debug)]
enum AttemptState {
    Attempting { attempt: u32 },
    Accepted(AttemptOutcome),
    Exhausted { attempts: u32, last_failure: String },
}

struct Rejected {
    response: ModelResponse,
    completeness: Completeness,
}

pub struct AttemptLoop<'a, M: GenerativeModel + ?Sized> {
    model: &'a mut M,
    settings: &'a GenerationSettings,
    policy: AttemptPolicy,
    trace: Option<(&'a TraceWriter, String)>,
    best_rejected: Option<Rejected>,
    last_failure: String,
}

impl<'a, M: GenerativeModel + ?Sized> AttemptLoop<'a, M> {
    pub fn new(model: &'a mut M, settings: &'a GenerationSettings, policy: AttemptPolicy) -> Self {
        Self {
            model,
            settings,
            policy,
            trace: None,
            best_rejected: None,
            last_failure: String::new(),
        }
    }

    /// Dump every attempt's prompt and reply under `label`.
    pub fn with_trace(mut self, trace: &'a TraceWriter, label: impl Into<String>) -> Self {
        if trace.enabled() {
            self.trace = Some((trace, label.into()));
        }
        self
    }

    /// Run until a reply is accepted or the budget is spent.
    pub fn run(mut self, segments: &[String], raw_text: &str) -> Result<AttemptOutcome> {
        let mut state = AttemptState::Attempting { attempt: 1 };
        loop {
            state = match state {
                AttemptState::Attempting { attempt } => self.attempt(attempt, segments, raw_text)?,
                AttemptState::Accepted(outcome) => return Ok(outcome),
                AttemptState::Exhausted {
                    attempts,
                    last_failure,
                } => return self.exhausted(attempts, last_failure),
            };
        }
    }

    fn attempt(&mut self, attempt: u32, segments: &[String], raw_text: &str) -> Result<AttemptState> {
        self.trace_text(attempt, "prompt", &segments.join("\n\n-----\n\n"));

        let failed_call = match self.model.generate(segments, self.settings) {
            Ok(response) => {
                self.trace_text(attempt, "response", &response.translated_text);
                let completeness =
                    Completeness::measure(raw_text, &response.translated_text, self.policy.completeness_ratio);
                debug!(
                    attempt,
                    source_lines = completeness.source_lines,
                    translated_lines = completeness.translated_lines,
                    required_lines = completeness.required_lines,
                    "completeness check"
                );
                if completeness.is_complete() {
                    info!(attempt, model = self.model.name(), "translation accepted");
                    return Ok(AttemptState::Accepted(AttemptOutcome {
                        response,
                        attempts: attempt,
                        completeness,
                        complete: true,
                    }));
                }
                self.last_failure = format!(
                    "incomplete translation: {}/{} lines, {} required",
                    completeness.translated_lines,
                    completeness.source_lines,
                    completeness.required_lines
                );
                warn!(attempt, "{}, retrying", self.last_failure);
                self.keep_if_best(response, completeness);
                false
            }
            Err(e) => {
                self.trace_text(attempt, "error", &e.to_string());
                if !e.is_retryable() {
                    return Err(ScraperError::BackendRejected {
                        attempt,
                        message: e.to_string(),
                    }
                    .into());
                }
                warn!(attempt, error = %clip(&e.to_string(), 300), "model call failed");
                self.last_failure = e.to_string();
                true
            }
        };

        if attempt >= self.policy.max_attempts {
            return Ok(AttemptState::Exhausted {
                attempts: attempt,
                last_failure: std::mem::take(&mut self.last_failure),
            });
        }
        if failed_call {
            if let Some(delay) = retry_delay(self.policy.retry_base_delay_ms, attempt) {
                debug!(attempt, delay_ms = delay.as_millis() as u64, "backing off");
                thread::sleep(delay);
            }
        }
        Ok(AttemptState::Attempting {
            attempt: attempt + 1,
        })
    }

    fn exhausted(self, attempts: u32, last_failure: String) -> Result<AttemptOutcome> {
        if self.policy.allow_partial {
            if let Some(best) = self.best_rejected {
                warn!(
                    attempts,
                    translated_lines = best.completeness.translated_lines,
                    required_lines = best.completeness.required_lines,
                    "attempts exhausted; keeping the most complete partial translation"
                );
                return Ok(AttemptOutcome {
                    response: best.response,
                    attempts,
                    completeness: best.completeness,
                    complete: false,
                });
            }
        }
        warn!(attempts, last_failure = %last_failure, "attempts exhausted");
        Err(ScraperError::AttemptsExhausted {
            attempts,
            last_failure,
        }
        .into())
    }

    fn keep_if_best(&mut self, response: ModelResponse, completeness: Completeness) {
        let better = self
            .best_rejected
            .as_ref()
            .map_or(true, |b| completeness.translated_lines > b.completeness.translated_lines);
        if better {
            self.best_rejected = Some(Rejected {
                response,
                completeness,
            });
        }
    }

    fn trace_text(&self, attempt: u32, kind: &str, text: &str) {
        if let Some((trace, label)) = &self.trace {
            if let Err(e) = trace.write_attempt_text(label, attempt, kind, text) {
                warn!(error = %e, "trace write failed");
            }
        }
    }
}

/// `base * 2^(attempt-1)` plus up to a quarter of `base` in jitter.
pub fn retry_delay(base_ms: u64, attempt: u32) -> Option<Duration> {
    if base_ms == 0 {
        return None;
    }
    let exp = attempt.saturating_sub(1).min(MAX_BACKOFF_EXPONENT);
    let jitter: u64 = thread_rng().gen_range(0..=base_ms / 4);
    Some(Duration::from_millis(
        base_ms.saturating_mul(2_u64.pow(exp)).saturating_add(jitter),
    ))
}

pub mod attempt;
pub mod batch;
mod config;
pub mod context;
pub mod format;
pub mod prompts;
pub mod trace;
mod translator;

pub use batch::{discover_inputs, BatchOptions, BatchRunner, BatchSummary};
pub use config::{init_default_config, PipelineConfig, RunOverrides};
pub use translator::Translator;

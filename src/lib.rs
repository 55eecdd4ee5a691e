pub mod chapter;
pub mod config;
pub mod error;
pub mod models;
pub mod pipeline;
pub mod progress;
pub mod quality;
pub mod scrape;
pub mod sites;
pub mod store;
pub mod textutil;

pub use error::{Error, Result};

//! tonegraph-services: Shared corpus, phrase tracking, and configuration

pub mod config;
pub mod corpus;
mod error;
pub mod tracker;

pub use config::TrackerConfig;
pub use corpus::{Corpus, CorpusEntry, CorpusSnapshot, Origin};
pub use error::ServiceError;
pub use tracker::PhraseTracker;

//! Tracker configuration loaded from TOML

use std::path::Path;

use serde::{Deserialize, Serialize};
use tonegraph_core::{MatcherConfig, SongTag, TonegraphError};

use crate::error::ServiceError;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrackerConfig {
    pub matcher: MatcherConfig,
    /// Matches must score strictly above this
    pub threshold: f64,
    /// Compose closed phrases into ranges and add them to the corpus
    pub learn_phrases: bool,
    /// Pulses buffered before `submit` blocks
    pub channel_capacity: usize,
    pub song: Option<String>,
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            matcher: MatcherConfig::default(),
            threshold: 0.5,
            learn_phrases: false,
            channel_capacity: 64,
            song: None,
        }
    }
}

impl TrackerConfig {
    pub fn from_toml_str(text: &str) -> Result<Self, ServiceError> {
        let config: Self = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, ServiceError> {
        let text = std::fs::read_to_string(path)?;
        Self::from_toml_str(&text)
    }

    pub fn validate(&self) -> Result<(), ServiceError> {
        self.matcher.validate()?;
        if !(0.0..1.0).contains(&self.threshold) {
            return Err(TonegraphError::InvalidConfig(format!("threshold must be in [0, 1), got {}", self.threshold)).into());
        }
        if self.channel_capacity == 0 {
            return Err(TonegraphError::InvalidConfig("channel capacity must be positive".into()).into());
        }
        Ok(())
    }

    pub fn song_tag(&self) -> Option<SongTag> {
        self.song.as_deref().map(SongTag::from)
    }
}

use std::path::Path;

use crate::error::CtcError;

/// Options for [`prefix_search_with`](crate::decode::prefix_search_with).
#[derive(Debug, Clone, serde::Deserialize)]
pub struct PrefixSearchConfig {
    /// Frames whose blank log-probability exceeds this threshold act as hard
    /// separators between independently decoded runs.
    #[serde(default = "default_blank_threshold")]
    pub blank_threshold: f64,
    /// Maximum live prefix states kept per frame. `None` keeps the search
    /// exact; setting a cap trades exactness for bounded latency on long
    /// low-blank-confidence runs.
    #[serde(default)]
    pub beam_width: Option<usize>,
}

impl PrefixSearchConfig {
    pub const DEFAULT_BLANK_THRESHOLD: f64 = -1e-3;

    pub fn load(path: &Path) -> Result<Self, CtcError> {
        let data = std::fs::read_to_string(path)
            .map_err(|e| CtcError::io("read prefix search config", e))?;
        serde_json::from_str(&data).map_err(|e| CtcError::json("parse prefix search config", e))
    }
}

impl Default for PrefixSearchConfig {
    fn default() -> Self {
        Self {
            blank_threshold: Self::DEFAULT_BLANK_THRESHOLD,
            beam_width: None,
        }
    }
}

fn default_blank_threshold() -> f64 {
    PrefixSearchConfig::DEFAULT_BLANK_THRESHOLD
}

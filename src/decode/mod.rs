//! Label-free decoders over log-probability frame sequences.

mod best_path;
mod prefix;

pub use best_path::best_path;
pub use prefix::{prefix_search, prefix_search_with};

use crate::config::PrefixSearchConfig;
use crate::error::CtcError;

/// A decoder recovering a label sequence from frames alone. `Send + Sync` so
/// an external batch layer can fan independent sequences out across threads.
pub trait SequenceDecoder: Send + Sync {
    fn decode(&self, log_probs: &[Vec<f64>]) -> Result<Vec<usize>, CtcError>;
}

/// Greedy per-frame argmax decoding.
#[derive(Debug, Clone, Copy, Default)]
pub struct BestPathDecoder;

impl SequenceDecoder for BestPathDecoder {
    fn decode(&self, log_probs: &[Vec<f64>]) -> Result<Vec<usize>, CtcError> {
        best_path(log_probs)
    }
}

/// Exact prefix-search decoding with blank-threshold segmentation.
#[derive(Debug, Clone, Default)]
pub struct PrefixSearchDecoder {
    pub config: PrefixSearchConfig,
}

impl PrefixSearchDecoder {
    pub fn new(config: PrefixSearchConfig) -> Self {
        Self { config }
    }
}

impl SequenceDecoder for PrefixSearchDecoder {
    fn decode(&self, log_probs: &[Vec<f64>]) -> Result<Vec<usize>, CtcError> {
        prefix_search_with(log_probs, &self.config)
    }
}

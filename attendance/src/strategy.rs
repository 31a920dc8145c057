use std::sync::Arc;

use kiosk_bitindex::{BinaryVector, BitIndex, IndexError};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::decision::decide_results;
use crate::error::KioskError;
use crate::kiosk::Recognition;

/// A way of picking the best enrolled identity for a probe.
///
/// The kiosk ranks every probe through one strategy. Implementations decide
/// on the candidates in `index` and report them with the decision.
pub trait MatchStrategy: Send + Sync {
    fn name(&self) -> &'static str;

    /// Ranks up to `top_k` candidates against `probe` and decides on the
    /// best one with `max_distance`.
    fn query(
        &self,
        probe: &BinaryVector,
        index: &BitIndex,
        max_distance: u32,
        top_k: usize,
    ) -> Result<Recognition, KioskError>;
}

/// Packed-bit Hamming ranking over the index. Lower is better.
///
/// An empty index yields an unmatched decision rather than an error.
pub struct HammingStrategy;

impl MatchStrategy for HammingStrategy {
    fn name(&self) -> &'static str {
        "hamming"
    }

    fn query(
        &self,
        probe: &BinaryVector,
        index: &BitIndex,
        max_distance: u32,
        top_k: usize,
    ) -> Result<Recognition, KioskError> {
        let candidates = match index.query(probe, top_k) {
            Ok(c) => c,
            Err(IndexError::EmptyStore) => {
                debug!("kiosk: nothing enrolled");
                Vec::new()
            }
            Err(e) => return Err(e.into()),
        };
        Ok(Recognition {
            decision: decide_results(&candidates, max_distance),
            candidates,
        })
    }
}

/// Strategy selected by `match.strategy` in the config file.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StrategyKind {
    #[default]
    Hamming,
}

impl StrategyKind {
    pub fn build(self) -> Arc<dyn MatchStrategy> {
        match self {
            StrategyKind::Hamming => Arc::new(HammingStrategy),
        }
    }
}

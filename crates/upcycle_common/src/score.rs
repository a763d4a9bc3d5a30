//! Subset scoring output.

use serde::{Deserialize, Serialize};

/// Result of scoring one material subset.
///
/// Pure function output: derived only from subset attributes, no side effects,
/// no persistent identity. All four numeric fields are clamped to 0-100.
/// `recommendations` and `warnings` are always present, possibly empty.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct ScoreResult {
    pub feasibility: u8,
    pub efficiency: u8,
    pub sustainability: u8,
    pub material_utilization: u8,
    #[serde(default)]
    pub recommendations: Vec<String>,
    #[serde(default)]
    pub warnings: Vec<String>,
}

impl ScoreResult {
    /// Mean of the four component scores, used as a coarse ranking signal.
    pub fn overall(&self) -> u8 {
        let sum = self.feasibility as u16
            + self.efficiency as u16
            + self.sustainability as u16
            + self.material_utilization as u16;
        (sum / 4) as u8
    }
}

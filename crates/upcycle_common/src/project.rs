//! Draft and persisted project records.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Difficulty rating shown to end users.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Difficulty {
    Easy,
    #[default]
    Medium,
    Hard,
}

impl Difficulty {
    pub fn as_str(&self) -> &'static str {
        match self {
            Difficulty::Easy => "easy",
            Difficulty::Medium => "medium",
            Difficulty::Hard => "hard",
        }
    }

    pub fn parse(s: &str) -> Option<Difficulty> {
        match s {
            "easy" => Some(Difficulty::Easy),
            "medium" => Some(Difficulty::Medium),
            "hard" => Some(Difficulty::Hard),
            _ => None,
        }
    }
}

/// One material line inside a draft or project.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProjectMaterial {
    pub name: String,
    pub quantity: f64,
    pub unit: String,
    /// Share of the material's available stock this project consumes, 0-100.
    pub usage_percentage: f64,
}

/// One tool line inside a draft or project.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProjectTool {
    pub name: String,
    pub essential: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alternative: Option<String>,
}

/// Oracle output for one subset. May be absent or partial on oracle failure;
/// the assembler always has a deterministic fallback construction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DraftProject {
    pub name: String,
    pub description: String,
    #[serde(default)]
    pub difficulty: Difficulty,
    #[serde(default)]
    pub estimated_time_minutes: u32,
    #[serde(default)]
    pub materials: Vec<ProjectMaterial>,
    #[serde(default)]
    pub tools: Vec<ProjectTool>,
    #[serde(default)]
    pub instructions: Vec<String>,
    /// Assembly techniques the oracle suggests, merged into the final record.
    #[serde(default)]
    pub techniques: Vec<String>,
}

/// Where the enrichment content of a project came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProjectSource {
    Oracle,
    Fallback,
}

impl ProjectSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProjectSource::Oracle => "oracle",
            ProjectSource::Fallback => "fallback",
        }
    }
}

/// Estimated environmental payoff of completing a project.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct EnvironmentalImpact {
    pub materials_recycled_kg: f64,
    pub money_saved: f64,
    pub co2_reduction_kg: f64,
    pub waste_reduction_kg: f64,
    pub energy_saved_kwh: f64,
}

/// Shape of the subset a project was assembled from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct Composition {
    pub material_count: usize,
    pub distinct_types: usize,
    pub total_quantity: f64,
}

/// Persisted project record. Created once per successfully processed subset
/// and never mutated by this pipeline; `source_key` is the idempotency key.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Project {
    pub id: Uuid,
    pub name: String,
    pub description: String,
    pub difficulty: Difficulty,
    pub estimated_time_minutes: u32,
    pub category: String,
    pub materials: Vec<ProjectMaterial>,
    pub tools: Vec<ProjectTool>,
    pub instructions: Vec<String>,
    pub preview_image_ref: String,
    pub source: ProjectSource,
    /// Confidence that the record describes a buildable project, 0-100.
    pub confidence: u8,
    pub environmental_impact: EnvironmentalImpact,
    pub assembly_methods: Vec<String>,
    #[serde(default)]
    pub certifications: Vec<String>,
    pub composition: Composition,
    pub source_key: String,
    pub created_at: DateTime<Utc>,
}

/// Outcome of one generation run. Always produced, even when every
/// enrichment call failed: the guarantee is best-effort catalog growth.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct RunSummary {
    /// Subsets the scheduler planned to forward to enrichment.
    pub planned: usize,
    /// Subsets fully attempted (assembled and offered to the catalog).
    pub processed: usize,
    /// Newly inserted catalog records.
    pub inserted: usize,
    /// Planned subsets never attempted (cancellation or fail-fast abort).
    pub skipped: usize,
    /// Processed subsets that used the deterministic fallback draft.
    pub fallbacks: usize,
    pub elapsed_seconds: f64,
    /// True when the run stopped early on persistent storage failure.
    #[serde(default)]
    pub aborted: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_draft_tolerates_partial_json() {
        // Oracle responses routinely omit optional sections.
        let draft: DraftProject =
            serde_json::from_str(r#"{"name": "Bottle planter", "description": "A planter."}"#)
                .unwrap();
        assert_eq!(draft.difficulty, Difficulty::Medium);
        assert!(draft.instructions.is_empty());
        assert!(draft.techniques.is_empty());
    }

    #[test]
    fn test_difficulty_roundtrip() {
        for d in [Difficulty::Easy, Difficulty::Medium, Difficulty::Hard] {
            assert_eq!(Difficulty::parse(d.as_str()), Some(d));
        }
    }
}

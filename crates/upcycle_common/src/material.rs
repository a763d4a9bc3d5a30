//! Material inventory types.
//!
//! A generation run reads a snapshot of the inventory once and treats it as
//! immutable for the whole pass. Subsets reference materials by value; the
//! snapshot's list order is the canonical element order for enumeration.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use uuid::Uuid;

/// Broad material family. Drives weight, role, and technique lookups.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MaterialType {
    Plastic,
    Wood,
    Metal,
    Paper,
    Glass,
    Fabric,
    Electronic,
    Ceramic,
    Rubber,
    Other,
}

impl MaterialType {
    /// All known types, in display order.
    pub const ALL: [MaterialType; 10] = [
        MaterialType::Plastic,
        MaterialType::Wood,
        MaterialType::Metal,
        MaterialType::Paper,
        MaterialType::Glass,
        MaterialType::Fabric,
        MaterialType::Electronic,
        MaterialType::Ceramic,
        MaterialType::Rubber,
        MaterialType::Other,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            MaterialType::Plastic => "plastic",
            MaterialType::Wood => "wood",
            MaterialType::Metal => "metal",
            MaterialType::Paper => "paper",
            MaterialType::Glass => "glass",
            MaterialType::Fabric => "fabric",
            MaterialType::Electronic => "electronic",
            MaterialType::Ceramic => "ceramic",
            MaterialType::Rubber => "rubber",
            MaterialType::Other => "other",
        }
    }

    pub fn parse(s: &str) -> Option<MaterialType> {
        Self::ALL.iter().copied().find(|t| t.as_str() == s)
    }
}

impl fmt::Display for MaterialType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Physical condition of a material as assessed at intake.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MaterialCondition {
    Excellent,
    Good,
    Fair,
    Poor,
}

impl MaterialCondition {
    pub fn as_str(&self) -> &'static str {
        match self {
            MaterialCondition::Excellent => "excellent",
            MaterialCondition::Good => "good",
            MaterialCondition::Fair => "fair",
            MaterialCondition::Poor => "poor",
        }
    }

    pub fn parse(s: &str) -> Option<MaterialCondition> {
        match s {
            "excellent" => Some(MaterialCondition::Excellent),
            "good" => Some(MaterialCondition::Good),
            "fair" => Some(MaterialCondition::Fair),
            "poor" => Some(MaterialCondition::Poor),
            _ => None,
        }
    }
}

impl fmt::Display for MaterialCondition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One reusable material in the inventory.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Material {
    pub id: Uuid,
    pub name: String,
    pub material_type: MaterialType,
    pub available_quantity: f64,
    pub unit: String,
    pub condition: MaterialCondition,
    /// How much of this material can realistically be recovered, 0-100.
    pub recycle_potential: u8,
    /// Environmental value of diverting this material from waste, 0-100.
    pub sustainability_score: u8,
}

impl Material {
    pub fn new(
        name: impl Into<String>,
        material_type: MaterialType,
        available_quantity: f64,
        unit: impl Into<String>,
        condition: MaterialCondition,
        recycle_potential: u8,
        sustainability_score: u8,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            material_type,
            available_quantity,
            unit: unit.into(),
            condition,
            recycle_potential: recycle_potential.min(100),
            sustainability_score: sustainability_score.min(100),
        }
    }
}

/// A duplicate-free selection of materials from one inventory snapshot.
///
/// Ephemeral: lives for one pipeline pass, never persisted directly.
/// Invariant: no repeated material id; element order follows the snapshot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MaterialSubset {
    pub materials: Vec<Material>,
}

impl MaterialSubset {
    pub fn new(materials: Vec<Material>) -> Self {
        Self { materials }
    }

    pub fn len(&self) -> usize {
        self.materials.len()
    }

    pub fn is_empty(&self) -> bool {
        self.materials.is_empty()
    }

    /// Distinct material types present, in canonical order.
    pub fn distinct_types(&self) -> BTreeSet<MaterialType> {
        self.materials.iter().map(|m| m.material_type).collect()
    }

    /// Sum of available quantities across members (unit-blind).
    pub fn total_quantity(&self) -> f64 {
        self.materials.iter().map(|m| m.available_quantity).sum()
    }

    /// Member names sorted case-insensitively. Stable input for idempotency keys.
    pub fn sorted_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self
            .materials
            .iter()
            .map(|m| m.name.trim().to_lowercase())
            .collect();
        names.sort();
        names
    }
}

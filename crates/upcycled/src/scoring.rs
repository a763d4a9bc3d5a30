//! Deterministic subset scoring.
//!
//! Scores come from concrete material attributes, not vibes: condition,
//! recycle potential, stock levels, and structural role coverage. The same
//! subset always scores the same; any stochastic variety belongs to the
//! oracle layer, never here.

use upcycle_common::{MaterialCondition, MaterialSubset, MaterialType, ScoreResult};

/// Feasibility starting point before penalties.
const FEASIBILITY_BASE: f64 = 90.0;

/// Penalty per poor-condition member.
const POOR_CONDITION_PENALTY: f64 = 18.0;

/// Penalty per member below its minimum viable quantity.
const LOW_STOCK_PENALTY: f64 = 12.0;

/// Efficiency starting point before the diversity bonus.
const EFFICIENCY_BASE: f64 = 52.0;

/// Bonus per distinct structural role covered by the subset.
const ROLE_DIVERSITY_BONUS: f64 = 16.0;

/// Structural role a material plays in an assembly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
enum StructuralRole {
    Rigid,
    Flexible,
    Connective,
}

fn role_of(material_type: MaterialType) -> StructuralRole {
    match material_type {
        MaterialType::Wood
        | MaterialType::Metal
        | MaterialType::Glass
        | MaterialType::Ceramic => StructuralRole::Rigid,
        MaterialType::Fabric | MaterialType::Rubber | MaterialType::Paper => {
            StructuralRole::Flexible
        }
        MaterialType::Plastic | MaterialType::Electronic | MaterialType::Other => {
            StructuralRole::Connective
        }
    }
}

/// Smallest stock that still supports a project, per unit of measure.
fn min_viable_quantity(unit: &str) -> f64 {
    match unit.trim().to_lowercase().as_str() {
        "kg" | "kilograms" => 0.5,
        "g" | "grams" => 200.0,
        "l" | "liters" | "litres" => 0.5,
        "m" | "meters" | "metres" => 0.5,
        "m2" | "sqm" => 0.25,
        // pieces, units, and anything unrecognized
        _ => 1.0,
    }
}

fn condition_factor(condition: MaterialCondition) -> f64 {
    match condition {
        MaterialCondition::Excellent => 1.0,
        MaterialCondition::Good => 0.95,
        MaterialCondition::Fair => 0.85,
        MaterialCondition::Poor => 0.65,
    }
}

fn clamp_score(value: f64) -> u8 {
    value.clamp(0.0, 100.0).round() as u8
}

/// Score a subset for upcycling suitability. Pure and deterministic.
pub fn score(subset: &MaterialSubset) -> ScoreResult {
    if subset.is_empty() {
        return ScoreResult {
            warnings: vec!["empty subset cannot be scored".to_string()],
            ..Default::default()
        };
    }

    let mut recommendations = Vec::new();
    let mut warnings = Vec::new();

    // Material utilization: quantity-weighted mean of recycle potential and
    // sustainability. Materials with more stock absorb more of the project.
    let total_quantity: f64 = subset.total_quantity();
    let utilization = if total_quantity > 0.0 {
        subset
            .materials
            .iter()
            .map(|m| {
                let per_material =
                    (m.recycle_potential as f64 + m.sustainability_score as f64) / 2.0;
                per_material * (m.available_quantity / total_quantity)
            })
            .sum()
    } else {
        0.0
    };

    // Feasibility: penalize poor condition and insufficient stock.
    let mut feasibility = FEASIBILITY_BASE;
    for material in &subset.materials {
        if material.condition == MaterialCondition::Poor {
            feasibility -= POOR_CONDITION_PENALTY;
            warnings.push(format!("{} is in poor condition", material.name));
        }
        if material.available_quantity < min_viable_quantity(&material.unit) {
            feasibility -= LOW_STOCK_PENALTY;
            warnings.push(format!(
                "{} stock ({} {}) is below the viable minimum",
                material.name, material.available_quantity, material.unit
            ));
        }
    }

    // Efficiency: reward complementary structural roles over homogeneity.
    let distinct_roles: std::collections::BTreeSet<StructuralRole> = subset
        .materials
        .iter()
        .map(|m| role_of(m.material_type))
        .collect();
    let efficiency = EFFICIENCY_BASE + distinct_roles.len() as f64 * ROLE_DIVERSITY_BONUS;
    if distinct_roles.len() == 1 && subset.len() > 1 {
        recommendations.push(
            "all materials play the same structural role; adding a complementary type \
             (rigid, flexible, or connective) would widen the project space"
                .to_string(),
        );
    }

    // Sustainability: mean score dampened by average condition.
    let mean_sustainability: f64 = subset
        .materials
        .iter()
        .map(|m| m.sustainability_score as f64)
        .sum::<f64>()
        / subset.len() as f64;
    let mean_condition: f64 = subset
        .materials
        .iter()
        .map(|m| condition_factor(m.condition))
        .sum::<f64>()
        / subset.len() as f64;
    let sustainability = mean_sustainability * mean_condition;

    if utilization >= 75.0 {
        recommendations
            .push("high recovery potential; prioritize this combination".to_string());
    }

    ScoreResult {
        feasibility: clamp_score(feasibility),
        efficiency: clamp_score(efficiency),
        sustainability: clamp_score(sustainability),
        material_utilization: clamp_score(utilization),
        recommendations,
        warnings,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use upcycle_common::Material;

    fn material(
        name: &str,
        material_type: MaterialType,
        quantity: f64,
        condition: MaterialCondition,
        recycle: u8,
        sustain: u8,
    ) -> Material {
        Material::new(name, material_type, quantity, "pieces", condition, recycle, sustain)
    }

    fn subset(materials: Vec<Material>) -> MaterialSubset {
        MaterialSubset::new(materials)
    }

    #[test]
    fn test_score_is_pure() {
        let s = subset(vec![
            material("bottle", MaterialType::Plastic, 10.0, MaterialCondition::Good, 80, 70),
            material("pallet", MaterialType::Wood, 2.0, MaterialCondition::Fair, 60, 85),
        ]);
        assert_eq!(score(&s), score(&s));
    }

    #[test]
    fn test_all_fields_within_bounds() {
        let extremes = [
            subset(vec![material("a", MaterialType::Metal, 1000.0, MaterialCondition::Excellent, 100, 100)]),
            subset(vec![
                material("b", MaterialType::Paper, 0.0, MaterialCondition::Poor, 0, 0),
                material("c", MaterialType::Paper, 0.0, MaterialCondition::Poor, 0, 0),
                material("d", MaterialType::Paper, 0.0, MaterialCondition::Poor, 0, 0),
                material("e", MaterialType::Paper, 0.0, MaterialCondition::Poor, 0, 0),
                material("f", MaterialType::Paper, 0.0, MaterialCondition::Poor, 0, 0),
                material("g", MaterialType::Paper, 0.0, MaterialCondition::Poor, 0, 0),
                material("h", MaterialType::Paper, 0.0, MaterialCondition::Poor, 0, 0),
            ]),
        ];
        for s in &extremes {
            let result = score(s);
            assert!(result.feasibility <= 100);
            assert!(result.efficiency <= 100);
            assert!(result.sustainability <= 100);
            assert!(result.material_utilization <= 100);
        }
    }

    #[test]
    fn test_poor_condition_penalized() {
        let good = score(&subset(vec![material(
            "plank", MaterialType::Wood, 5.0, MaterialCondition::Good, 70, 70,
        )]));
        let poor = score(&subset(vec![material(
            "plank", MaterialType::Wood, 5.0, MaterialCondition::Poor, 70, 70,
        )]));
        assert!(poor.feasibility < good.feasibility);
        assert!(!poor.warnings.is_empty());
    }

    #[test]
    fn test_low_stock_penalized_and_warned() {
        let result = score(&subset(vec![material(
            "scrap", MaterialType::Metal, 0.2, MaterialCondition::Good, 70, 70,
        )]));
        assert!(result.feasibility < clamp_score(FEASIBILITY_BASE));
        assert!(result.warnings.iter().any(|w| w.contains("viable minimum")));
    }

    #[test]
    fn test_role_diversity_beats_homogeneity() {
        let mixed = score(&subset(vec![
            material("frame", MaterialType::Wood, 2.0, MaterialCondition::Good, 70, 70),
            material("cover", MaterialType::Fabric, 2.0, MaterialCondition::Good, 70, 70),
            material("ties", MaterialType::Plastic, 2.0, MaterialCondition::Good, 70, 70),
        ]));
        let flat = score(&subset(vec![
            material("plank", MaterialType::Wood, 2.0, MaterialCondition::Good, 70, 70),
            material("beam", MaterialType::Wood, 2.0, MaterialCondition::Good, 70, 70),
            material("board", MaterialType::Wood, 2.0, MaterialCondition::Good, 70, 70),
        ]));
        assert!(mixed.efficiency > flat.efficiency);
        assert!(flat
            .recommendations
            .iter()
            .any(|r| r.contains("complementary")));
    }

    #[test]
    fn test_utilization_weighted_by_quantity() {
        // The plentiful high-value material should dominate the scarce low-value one.
        let result = score(&subset(vec![
            material("cans", MaterialType::Metal, 9.0, MaterialCondition::Good, 90, 90),
            material("rags", MaterialType::Fabric, 1.0, MaterialCondition::Good, 10, 10),
        ]));
        assert!(result.material_utilization > 70);
    }

    #[test]
    fn test_lists_always_present() {
        let result = score(&subset(vec![material(
            "jar", MaterialType::Glass, 4.0, MaterialCondition::Excellent, 80, 80,
        )]));
        // Possibly empty, never missing: serde must see arrays.
        let json = serde_json::to_value(&result).unwrap();
        assert!(json["recommendations"].is_array());
        assert!(json["warnings"].is_array());
    }

    #[test]
    fn test_empty_subset_scores_zero_with_warning() {
        let result = score(&MaterialSubset::new(vec![]));
        assert_eq!(result.feasibility, 0);
        assert!(!result.warnings.is_empty());
    }
}

//! Project assembly.
//!
//! Merges a subset, its score, and the oracle draft (when one arrived) into
//! the persisted project record. Every derived field is deterministic given
//! its inputs; when the oracle failed, the fallback draft keeps the subset
//! moving instead of dropping it.

use chrono::Utc;
use sha2::{Digest, Sha256};
use upcycle_common::{
    Composition, Difficulty, DraftProject, EnvironmentalImpact, MaterialSubset, MaterialType,
    Project, ProjectMaterial, ProjectSource, ProjectTool, ScoreResult,
};
use uuid::Uuid;

/// Estimated mass per inventory quantity unit, by material family.
fn weight_multiplier(material_type: MaterialType) -> f64 {
    match material_type {
        MaterialType::Metal => 2.5,
        MaterialType::Glass => 2.0,
        MaterialType::Ceramic => 1.5,
        MaterialType::Wood => 1.2,
        MaterialType::Electronic => 1.0,
        MaterialType::Rubber => 0.9,
        MaterialType::Plastic => 0.8,
        MaterialType::Fabric => 0.6,
        MaterialType::Other => 0.5,
        MaterialType::Paper => 0.4,
    }
}

/// Assembly techniques that suit a material family.
fn techniques_for(material_type: MaterialType) -> &'static [&'static str] {
    match material_type {
        MaterialType::Wood => &["screw assembly", "wood glue joints", "dowel joinery"],
        MaterialType::Metal => &["bolted joints", "rivet fastening"],
        MaterialType::Plastic => &["snap-fit joints", "adhesive bonding"],
        MaterialType::Glass => &["silicone seal mounting"],
        MaterialType::Fabric => &["sewn seams", "lacing"],
        MaterialType::Paper => &["laminated layering", "folded structures"],
        MaterialType::Electronic => &["wire splicing", "terminal blocks"],
        MaterialType::Ceramic => &["epoxy bonding"],
        MaterialType::Rubber => &["friction fitting", "adhesive bonding"],
        MaterialType::Other => &["adhesive bonding"],
    }
}

/// Techniques applicable to any combination.
const UNIVERSAL_TECHNIQUES: [&str; 2] = ["modular reversible assembly", "surface preparation"];

/// Hand tools implied by a material family in the fallback draft.
fn fallback_tools_for(material_type: MaterialType) -> &'static [&'static str] {
    match material_type {
        MaterialType::Wood => &["saw", "sandpaper", "screwdriver"],
        MaterialType::Metal => &["drill", "metal file"],
        MaterialType::Plastic => &["utility knife", "hot glue gun"],
        MaterialType::Glass => &["protective gloves", "silicone sealant"],
        MaterialType::Fabric => &["scissors", "needle and thread"],
        MaterialType::Paper => &["scissors", "craft glue"],
        MaterialType::Electronic => &["screwdriver", "wire cutters"],
        MaterialType::Ceramic => &["epoxy", "protective gloves"],
        MaterialType::Rubber => &["utility knife"],
        MaterialType::Other => &["utility knife", "adhesive"],
    }
}

/// Category of the project a subset yields, from its dominant material family.
///
/// Stable for a given subset: ties break by canonical type order.
pub fn category_for(subset: &MaterialSubset) -> String {
    let mut counts: Vec<(MaterialType, usize)> = Vec::new();
    for material in &subset.materials {
        match counts.iter_mut().find(|(t, _)| *t == material.material_type) {
            Some((_, c)) => *c += 1,
            None => counts.push((material.material_type, 1)),
        }
    }
    counts.sort_by(|a, b| b.1.cmp(&a.1).then(a.0.cmp(&b.0)));
    match counts.first() {
        Some((t, _)) => format!("{t} upcycling"),
        None => "mixed upcycling".to_string(),
    }
}

/// Idempotency key: SHA-256 over category and sorted member names.
///
/// Only stable inputs participate, so re-running the pipeline over an
/// unchanged inventory maps each subset to the same key.
pub fn source_key(category: &str, subset: &MaterialSubset) -> String {
    let mut hasher = Sha256::new();
    hasher.update(category.as_bytes());
    for name in subset.sorted_names() {
        hasher.update(b"\x1f");
        hasher.update(name.as_bytes());
    }
    hex::encode(hasher.finalize())
}

/// Deterministic placeholder when preview rendering failed or was skipped.
pub fn placeholder_preview(source_key: &str) -> String {
    format!("placeholder://preview/{source_key}")
}

/// Synthesize a draft from the subset alone. Used whenever the oracle call
/// failed, timed out, or is disabled; fully deterministic.
pub fn fallback_draft(subset: &MaterialSubset) -> DraftProject {
    let names: Vec<&str> = subset.materials.iter().map(|m| m.name.as_str()).collect();
    let title_list = names.join(", ");
    let share = if subset.is_empty() {
        0.0
    } else {
        (100.0 / subset.len() as f64 * 10.0).round() / 10.0
    };

    let difficulty = match subset.len() {
        0..=2 => Difficulty::Easy,
        3..=4 => Difficulty::Medium,
        _ => Difficulty::Hard,
    };

    let mut tools: Vec<ProjectTool> = Vec::new();
    for t in subset.distinct_types() {
        for name in fallback_tools_for(t) {
            if !tools.iter().any(|tool| tool.name == *name) {
                tools.push(ProjectTool {
                    name: (*name).to_string(),
                    essential: true,
                    alternative: None,
                });
            }
        }
    }

    let mut instructions = vec![
        "Clean all materials and remove labels, fasteners, and residue.".to_string(),
        format!("Lay out the components ({title_list}) and plan the arrangement."),
    ];
    for material in &subset.materials {
        instructions.push(format!(
            "Prepare the {}: cut or shape it to fit the planned assembly.",
            material.name
        ));
    }
    instructions.push("Join the components using reversible fasteners where possible.".to_string());
    instructions.push("Finish surfaces and check stability before use.".to_string());

    DraftProject {
        name: format!("Upcycled {title_list} build"),
        description: format!(
            "A practical upcycling project combining {} reclaimed material{}: {}.",
            subset.len(),
            if subset.len() == 1 { "" } else { "s" },
            title_list
        ),
        difficulty,
        estimated_time_minutes: 30 + 25 * subset.len() as u32,
        materials: subset
            .materials
            .iter()
            .map(|m| ProjectMaterial {
                name: m.name.clone(),
                quantity: m.available_quantity,
                unit: m.unit.clone(),
                usage_percentage: share,
            })
            .collect(),
        tools,
        instructions,
        techniques: Vec::new(),
    }
}

/// Estimated total reclaimed mass of a subset in kilograms.
pub fn total_weight_kg(subset: &MaterialSubset) -> f64 {
    subset
        .materials
        .iter()
        .map(|m| m.available_quantity * weight_multiplier(m.material_type))
        .sum()
}

/// Environmental payoff: linear in total reclaimed weight, scaled by the
/// subset's sustainability score.
pub fn environmental_impact(subset: &MaterialSubset, score: &ScoreResult) -> EnvironmentalImpact {
    let weight = total_weight_kg(subset);
    let factor = score.sustainability as f64 / 100.0;
    EnvironmentalImpact {
        materials_recycled_kg: weight,
        money_saved: weight * 4.5 * factor,
        co2_reduction_kg: weight * 1.8 * factor,
        waste_reduction_kg: weight * 0.9,
        energy_saved_kwh: weight * 2.2 * factor,
    }
}

/// Union of per-type technique templates, oracle suggestions, and universal
/// techniques. Deduplicated, order stable.
pub fn assembly_methods(subset: &MaterialSubset, suggested: &[String]) -> Vec<String> {
    let mut methods: Vec<String> = Vec::new();
    let mut push = |m: &str| {
        if !methods.iter().any(|existing| existing == m) {
            methods.push(m.to_string());
        }
    };
    for t in subset.distinct_types() {
        for technique in techniques_for(t) {
            push(technique);
        }
    }
    for technique in suggested {
        let trimmed = technique.trim();
        if !trimmed.is_empty() {
            push(trimmed);
        }
    }
    for technique in UNIVERSAL_TECHNIQUES {
        push(technique);
    }
    methods
}

fn certifications(score: &ScoreResult) -> Vec<String> {
    let mut certs = Vec::new();
    if score.sustainability >= 80 {
        certs.push("eco-certified candidate".to_string());
    }
    if score.material_utilization >= 75 {
        certs.push("high material recovery".to_string());
    }
    certs
}

fn confidence(score: &ScoreResult, used_fallback: bool) -> u8 {
    let base = (score.feasibility as u16 + score.material_utilization as u16) / 2;
    let adjusted = if used_fallback {
        base.saturating_sub(15)
    } else {
        base
    };
    adjusted.min(100) as u8
}

/// Build the persisted record for one subset.
///
/// `draft` and `preview_ref` are None when the corresponding oracle call
/// failed; both have deterministic substitutes. Output must not depend on
/// where in its batch the subset settled.
pub fn assemble(
    subset: &MaterialSubset,
    score: &ScoreResult,
    draft: Option<DraftProject>,
    preview_ref: Option<String>,
) -> Project {
    let used_fallback = draft.is_none();
    let draft = draft.unwrap_or_else(|| fallback_draft(subset));

    let category = category_for(subset);
    let source_key = source_key(&category, subset);
    let preview_image_ref = preview_ref.unwrap_or_else(|| placeholder_preview(&source_key));

    Project {
        id: Uuid::new_v4(),
        name: draft.name.clone(),
        description: draft.description.clone(),
        difficulty: draft.difficulty,
        estimated_time_minutes: draft.estimated_time_minutes,
        category,
        materials: draft.materials.clone(),
        tools: draft.tools.clone(),
        instructions: draft.instructions.clone(),
        preview_image_ref,
        source: if used_fallback {
            ProjectSource::Fallback
        } else {
            ProjectSource::Oracle
        },
        confidence: confidence(score, used_fallback),
        environmental_impact: environmental_impact(subset, score),
        assembly_methods: assembly_methods(subset, &draft.techniques),
        certifications: certifications(score),
        composition: Composition {
            material_count: subset.len(),
            distinct_types: subset.distinct_types().len(),
            total_quantity: subset.total_quantity(),
        },
        source_key,
        created_at: Utc::now(),
    }
}

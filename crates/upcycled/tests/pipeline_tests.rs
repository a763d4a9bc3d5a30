//! End-to-end pipeline tests.
//!
//! These tests run the full generation loop with FakeOracle and an
//! in-memory or temp-file SQLite catalog, so no network or daemon is needed.

use std::sync::Arc;
use tempfile::tempdir;
use upcycle_common::{
    Config, DraftProject, Material, MaterialCondition, MaterialType, OracleError, ProjectSource,
};
use upcycled::catalog::{MaterialCatalog, ProjectCatalog, SqliteCatalog};
use upcycled::oracle::FakeOracle;
use upcycled::scheduler::{run_generation, CancellationFlag};

fn scenario_inventory() -> Vec<Material> {
    vec![
        Material::new("PET bottle", MaterialType::Plastic, 10.0, "pieces", MaterialCondition::Good, 85, 70),
        Material::new("wood pallet", MaterialType::Wood, 2.0, "pieces", MaterialCondition::Fair, 60, 80),
        Material::new("cardboard", MaterialType::Paper, 5.0, "pieces", MaterialCondition::Good, 75, 65),
    ]
}

fn wide_inventory(n: usize) -> Vec<Material> {
    (0..n)
        .map(|i| {
            Material::new(
                format!("material-{i}"),
                MaterialType::ALL[i % MaterialType::ALL.len()],
                3.0,
                "pieces",
                MaterialCondition::Good,
                70,
                70,
            )
        })
        .collect()
}

fn fast_config() -> Config {
    let mut config = Config::default();
    config.generator.inter_batch_delay_ms = 0;
    config
}

fn oracle_draft(name: &str) -> DraftProject {
    DraftProject {
        name: name.to_string(),
        description: "An oracle-designed build.".to_string(),
        difficulty: Default::default(),
        estimated_time_minutes: 90,
        materials: vec![],
        tools: vec![],
        instructions: vec!["Assemble the parts.".to_string()],
        techniques: vec!["macrame wrapping".to_string()],
    }
}

// ============================================================================
// Full-run behavior
// ============================================================================

/// Three materials with max size 3 plan exactly C(3,3)+C(3,2)+C(3,1) = 7
/// subsets, and every one of them becomes a catalog record.
#[tokio::test]
async fn test_scenario_seven_subsets_all_persisted() {
    let catalog = Arc::new(SqliteCatalog::in_memory().unwrap());
    let oracle = Arc::new(FakeOracle::always(oracle_draft("Bottle shelf")));
    let mut config = fast_config();
    config.generator.max_subset_size = 3;

    let summary = run_generation(
        &scenario_inventory(),
        oracle,
        Arc::clone(&catalog) as Arc<dyn ProjectCatalog>,
        &config,
        CancellationFlag::new(),
    )
    .await;

    assert_eq!(summary.planned, 7);
    assert_eq!(summary.processed, 7);
    assert_eq!(summary.inserted, 7);
    assert_eq!(summary.skipped, 0);
    assert_eq!(summary.fallbacks, 0);
    assert!(!summary.aborted);
    assert_eq!(catalog.list_projects().unwrap().len(), 7);
}

/// One oracle failure inside a batch of three must not affect the other two:
/// all three are processed, the failed one lands as a fallback record.
#[tokio::test]
async fn test_partial_failure_isolation() {
    let catalog = Arc::new(SqliteCatalog::in_memory().unwrap());
    // Batch of 3 size-1 subsets: second call fails, third repeats forever.
    let oracle = Arc::new(FakeOracle::new(vec![
        Ok(oracle_draft("first")),
        Err(OracleError::Timeout(30)),
        Ok(oracle_draft("third")),
    ]));
    let mut config = fast_config();
    config.generator.max_subset_size = 1;

    let summary = run_generation(
        &scenario_inventory(),
        oracle,
        Arc::clone(&catalog) as Arc<dyn ProjectCatalog>,
        &config,
        CancellationFlag::new(),
    )
    .await;

    assert_eq!(summary.planned, 3);
    assert_eq!(summary.processed, 3);
    assert_eq!(summary.inserted, 3);
    assert_eq!(summary.fallbacks, 1);

    let projects = catalog.list_projects().unwrap();
    let fallbacks = projects
        .iter()
        .filter(|p| p.source == ProjectSource::Fallback)
        .count();
    assert_eq!(fallbacks, 1);
}

/// A run where every oracle call fails still completes and still grows the
/// catalog: every record comes from the deterministic fallback.
#[tokio::test]
async fn test_total_oracle_failure_still_produces_catalog() {
    let catalog = Arc::new(SqliteCatalog::in_memory().unwrap());
    let oracle = Arc::new(FakeOracle::always_error(OracleError::Backend(
        "model melted".to_string(),
    )));
    let mut config = fast_config();
    config.generator.max_subset_size = 2;

    let summary = run_generation(
        &scenario_inventory(),
        oracle,
        Arc::clone(&catalog) as Arc<dyn ProjectCatalog>,
        &config,
        CancellationFlag::new(),
    )
    .await;

    // C(3,2) + C(3,1) = 6
    assert_eq!(summary.processed, 6);
    assert_eq!(summary.fallbacks, 6);
    assert_eq!(summary.inserted, 6);
    assert!(catalog
        .list_projects()
        .unwrap()
        .iter()
        .all(|p| p.source == ProjectSource::Fallback));
}

/// Re-running over an unchanged inventory inserts nothing new: source keys
/// collide and the catalog stays duplicate-free.
#[tokio::test]
async fn test_rerun_is_idempotent() {
    let dir = tempdir().unwrap();
    let db_path = dir.path().join("catalog.db");
    let catalog = Arc::new(SqliteCatalog::open(&db_path).unwrap());
    let mut config = fast_config();
    config.generator.max_subset_size = 2;

    let first = run_generation(
        &scenario_inventory(),
        Arc::new(FakeOracle::always(oracle_draft("Planter"))),
        Arc::clone(&catalog) as Arc<dyn ProjectCatalog>,
        &config,
        CancellationFlag::new(),
    )
    .await;
    assert_eq!(first.inserted, 6);

    let second = run_generation(
        &scenario_inventory(),
        Arc::new(FakeOracle::always(oracle_draft("Planter"))),
        Arc::clone(&catalog) as Arc<dyn ProjectCatalog>,
        &config,
        CancellationFlag::new(),
    )
    .await;
    assert_eq!(second.processed, 6);
    assert_eq!(second.inserted, 0);
    assert_eq!(catalog.list_projects().unwrap().len(), 6);
}

/// With a cap of 5 over ten materials, exactly five subsets run, all taken
/// from the largest size.
#[tokio::test]
async fn test_cap_limits_run_to_largest_sizes() {
    let catalog = Arc::new(SqliteCatalog::in_memory().unwrap());
    let oracle = Arc::new(FakeOracle::always(oracle_draft("Big build")));
    let mut config = fast_config();
    config.generator.combination_cap = 5;

    let summary = run_generation(
        &wide_inventory(10),
        oracle,
        Arc::clone(&catalog) as Arc<dyn ProjectCatalog>,
        &config,
        CancellationFlag::new(),
    )
    .await;

    assert_eq!(summary.planned, 5);
    assert_eq!(summary.processed, 5);
    let projects = catalog.list_projects().unwrap();
    assert!(projects.iter().all(|p| p.composition.material_count == 7));
}

/// Oracle-suggested techniques flow into the persisted assembly methods.
#[tokio::test]
async fn test_oracle_techniques_reach_the_record() {
    let catalog = Arc::new(SqliteCatalog::in_memory().unwrap());
    let oracle = Arc::new(FakeOracle::always(oracle_draft("Woven rack")));
    let mut config = fast_config();
    config.generator.max_subset_size = 1;
    config.generator.combination_cap = 1;

    run_generation(
        &scenario_inventory(),
        oracle,
        Arc::clone(&catalog) as Arc<dyn ProjectCatalog>,
        &config,
        CancellationFlag::new(),
    )
    .await;

    let projects = catalog.list_projects().unwrap();
    assert_eq!(projects.len(), 1);
    assert!(projects[0]
        .assembly_methods
        .contains(&"macrame wrapping".to_string()));
    assert!(projects[0]
        .assembly_methods
        .contains(&"modular reversible assembly".to_string()));
}

// ============================================================================
// Storage failure escalation
// ============================================================================

/// A catalog that always fails trips the consecutive-failure threshold and
/// aborts the remaining run, but the summary still arrives.
#[tokio::test]
async fn test_persistent_storage_failure_aborts_run() {
    struct BrokenCatalog;
    impl ProjectCatalog for BrokenCatalog {
        fn insert_if_absent(
            &self,
            _project: &upcycle_common::Project,
        ) -> Result<bool, upcycle_common::CatalogError> {
            Err(upcycle_common::CatalogError::Storage("disk gone".to_string()))
        }
        fn list_projects(
            &self,
        ) -> Result<Vec<upcycle_common::Project>, upcycle_common::CatalogError> {
            Ok(vec![])
        }
    }

    let oracle = Arc::new(FakeOracle::always(oracle_draft("Doomed")));
    let mut config = fast_config();
    config.generator.max_consecutive_storage_failures = 4;

    let summary = run_generation(
        &wide_inventory(6),
        oracle,
        Arc::new(BrokenCatalog),
        &config,
        CancellationFlag::new(),
    )
    .await;

    assert!(summary.aborted);
    assert_eq!(summary.inserted, 0);
    assert!(summary.processed < summary.planned);
    assert_eq!(summary.skipped, summary.planned - summary.processed);
}

// ============================================================================
// Inventory snapshot behavior
// ============================================================================

/// The pipeline reads the inventory through the catalog trait, and the
/// seeded starter set drives a full offline run.
#[tokio::test]
async fn test_seeded_inventory_round_trip() {
    let dir = tempdir().unwrap();
    let db_path = dir.path().join("catalog.db");
    let catalog = Arc::new(SqliteCatalog::open(&db_path).unwrap());
    catalog.seed_starter_inventory().unwrap();

    let materials = catalog.list_available().unwrap();
    assert!(!materials.is_empty());

    let oracle = Arc::new(FakeOracle::always_error(OracleError::Disabled));
    let mut config = fast_config();
    config.generator.max_subset_size = 2;
    config.generator.per_size_limit = 5;

    let summary = run_generation(
        &materials,
        oracle,
        Arc::clone(&catalog) as Arc<dyn ProjectCatalog>,
        &config,
        CancellationFlag::new(),
    )
    .await;

    // Two sizes, five subsets each.
    assert_eq!(summary.planned, 10);
    assert_eq!(summary.processed, 10);
    assert_eq!(summary.fallbacks, 10);
    assert_eq!(catalog.list_projects().unwrap().len(), 10);
}

//! Material and project catalogs.
//!
//! The generator only needs two narrow operations from persistence: read the
//! material inventory snapshot and insert a project if its source key is not
//! already present. `SqliteCatalog` backs both with one SQLite file;
//! uniqueness is enforced at the storage layer, so concurrent duplicate
//! inserts resolve quietly.

use rusqlite::{params, Connection, OpenFlags};
use std::path::Path;
use std::sync::Mutex;
use tracing::info;
use upcycle_common::{CatalogError, Material, MaterialCondition, MaterialType, Project};
use uuid::Uuid;

/// Inventory read side.
pub trait MaterialCatalog: Send + Sync {
    /// Materials with stock on hand, in stable insertion order.
    fn list_available(&self) -> Result<Vec<Material>, CatalogError>;
}

/// Project write side.
pub trait ProjectCatalog: Send + Sync {
    /// Insert keyed by `source_key`. Returns false when a record with the
    /// same key already exists; that is a benign outcome, not an error.
    fn insert_if_absent(&self, project: &Project) -> Result<bool, CatalogError>;

    /// All stored projects, newest first.
    fn list_projects(&self) -> Result<Vec<Project>, CatalogError>;
}

fn storage_err(e: impl std::fmt::Display) -> CatalogError {
    CatalogError::Storage(e.to_string())
}

/// SQLite-backed implementation of both catalog sides.
pub struct SqliteCatalog {
    conn: Mutex<Connection>,
}

impl SqliteCatalog {
    /// Open or create the catalog database.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, CatalogError> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent).map_err(storage_err)?;
            }
        }
        let conn = Connection::open(path).map_err(storage_err)?;
        conn.execute_batch("PRAGMA journal_mode=WAL;")
            .map_err(storage_err)?;
        Self::init_schema(&conn)?;
        info!("Opened catalog at {}", path.display());
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Open read-only; None if the file does not exist.
    pub fn open_readonly<P: AsRef<Path>>(path: P) -> Option<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return None;
        }
        let conn = Connection::open_with_flags(path, OpenFlags::SQLITE_OPEN_READ_ONLY).ok()?;
        Some(Self {
            conn: Mutex::new(conn),
        })
    }

    /// In-memory catalog for tests.
    pub fn in_memory() -> Result<Self, CatalogError> {
        let conn = Connection::open_in_memory().map_err(storage_err)?;
        Self::init_schema(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn init_schema(conn: &Connection) -> Result<(), CatalogError> {
        conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS materials (
                id TEXT PRIMARY KEY,
                name TEXT NOT NULL UNIQUE,
                material_type TEXT NOT NULL,
                available_quantity REAL NOT NULL,
                unit TEXT NOT NULL,
                condition TEXT NOT NULL,
                recycle_potential INTEGER NOT NULL,
                sustainability_score INTEGER NOT NULL
            );

            CREATE TABLE IF NOT EXISTS projects (
                id TEXT PRIMARY KEY,
                source_key TEXT NOT NULL UNIQUE,
                name TEXT NOT NULL,
                category TEXT NOT NULL,
                difficulty TEXT NOT NULL,
                confidence INTEGER NOT NULL,
                source TEXT NOT NULL,
                payload TEXT NOT NULL,
                created_at TEXT NOT NULL
            );

            CREATE INDEX IF NOT EXISTS idx_projects_category ON projects(category);
            "#,
        )
        .map_err(storage_err)
    }

    /// Add one material. Names are unique; re-adding an existing name is a no-op.
    pub fn add_material(&self, material: &Material) -> Result<bool, CatalogError> {
        let conn = self.conn.lock().unwrap();
        let changed = conn
            .execute(
                "INSERT OR IGNORE INTO materials
                 (id, name, material_type, available_quantity, unit, condition,
                  recycle_potential, sustainability_score)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
                params![
                    material.id.to_string(),
                    material.name,
                    material.material_type.as_str(),
                    material.available_quantity,
                    material.unit,
                    material.condition.as_str(),
                    material.recycle_potential,
                    material.sustainability_score,
                ],
            )
            .map_err(storage_err)?;
        Ok(changed == 1)
    }

    /// Populate the inventory with a starter set. Idempotent by name.
    pub fn seed_starter_inventory(&self) -> Result<usize, CatalogError> {
        let mut added = 0;
        for material in starter_inventory() {
            if self.add_material(&material)? {
                added += 1;
            }
        }
        info!("Seeded {} starter materials", added);
        Ok(added)
    }

    fn row_to_material(row: &rusqlite::Row<'_>) -> rusqlite::Result<Material> {
        let id: String = row.get(0)?;
        let name: String = row.get(1)?;
        let type_str: String = row.get(2)?;
        let condition_str: String = row.get(5)?;
        Ok(Material {
            id: Uuid::parse_str(&id).unwrap_or_else(|_| Uuid::nil()),
            name,
            material_type: MaterialType::parse(&type_str).unwrap_or(MaterialType::Other),
            available_quantity: row.get(3)?,
            unit: row.get(4)?,
            condition: MaterialCondition::parse(&condition_str)
                .unwrap_or(MaterialCondition::Fair),
            recycle_potential: row.get::<_, i64>(6)?.clamp(0, 100) as u8,
            sustainability_score: row.get::<_, i64>(7)?.clamp(0, 100) as u8,
        })
    }
}

impl MaterialCatalog for SqliteCatalog {
    fn list_available(&self) -> Result<Vec<Material>, CatalogError> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn
            .prepare(
                "SELECT id, name, material_type, available_quantity, unit, condition,
                        recycle_potential, sustainability_score
                 FROM materials WHERE available_quantity > 0 ORDER BY rowid",
            )
            .map_err(storage_err)?;
        let rows = stmt
            .query_map([], Self::row_to_material)
            .map_err(storage_err)?;
        let mut materials = Vec::new();
        for row in rows {
            materials.push(row.map_err(storage_err)?);
        }
        Ok(materials)
    }
}

impl ProjectCatalog for SqliteCatalog {
    fn insert_if_absent(&self, project: &Project) -> Result<bool, CatalogError> {
        let payload = serde_json::to_string(project).map_err(storage_err)?;
        let conn = self.conn.lock().unwrap();
        let changed = conn
            .execute(
                "INSERT OR IGNORE INTO projects
                 (id, source_key, name, category, difficulty, confidence, source,
                  payload, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
                params![
                    project.id.to_string(),
                    project.source_key,
                    project.name,
                    project.category,
                    project.difficulty.as_str(),
                    project.confidence,
                    project.source.as_str(),
                    payload,
                    project.created_at.to_rfc3339(),
                ],
            )
            .map_err(storage_err)?;
        Ok(changed == 1)
    }

    fn list_projects(&self) -> Result<Vec<Project>, CatalogError> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn
            .prepare("SELECT payload FROM projects ORDER BY created_at DESC, rowid DESC")
            .map_err(storage_err)?;
        let rows = stmt
            .query_map([], |row| row.get::<_, String>(0))
            .map_err(storage_err)?;
        let mut projects = Vec::new();
        for row in rows {
            let payload = row.map_err(storage_err)?;
            projects.push(serde_json::from_str(&payload).map_err(storage_err)?);
        }
        Ok(projects)
    }
}

/// Starter inventory for fresh installs and demos.
pub fn starter_inventory() -> Vec<Material> {
    vec![
        Material::new("PET bottle", MaterialType::Plastic, 10.0, "pieces", MaterialCondition::Good, 85, 70),
        Material::new("wood pallet", MaterialType::Wood, 2.0, "pieces", MaterialCondition::Fair, 60, 80),
        Material::new("cardboard box", MaterialType::Paper, 5.0, "pieces", MaterialCondition::Good, 75, 65),
        Material::new("glass jar", MaterialType::Glass, 6.0, "pieces", MaterialCondition::Excellent, 90, 75),
        Material::new("tin can", MaterialType::Metal, 8.0, "pieces", MaterialCondition::Good, 95, 85),
        Material::new("denim jeans", MaterialType::Fabric, 3.0, "pieces", MaterialCondition::Fair, 70, 60),
        Material::new("bicycle inner tube", MaterialType::Rubber, 2.0, "pieces", MaterialCondition::Good, 55, 50),
        Material::new("ceramic tile", MaterialType::Ceramic, 12.0, "pieces", MaterialCondition::Good, 40, 45),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assembler;
    use crate::scoring;
    use upcycle_common::{MaterialSubset, ProjectSource};

    fn sample_project() -> Project {
        let subset = MaterialSubset::new(starter_inventory().into_iter().take(2).collect());
        let score = scoring::score(&subset);
        assembler::assemble(&subset, &score, None, None)
    }

    #[test]
    fn test_insert_if_absent_is_idempotent() {
        let catalog = SqliteCatalog::in_memory().unwrap();
        let project = sample_project();
        assert!(catalog.insert_if_absent(&project).unwrap());

        // Same source_key, fresh record id: still a duplicate.
        let mut again = sample_project();
        again.id = Uuid::new_v4();
        assert!(!catalog.insert_if_absent(&again).unwrap());

        assert_eq!(catalog.list_projects().unwrap().len(), 1);
    }

    #[test]
    fn test_projects_roundtrip_payload() {
        let catalog = SqliteCatalog::in_memory().unwrap();
        let project = sample_project();
        catalog.insert_if_absent(&project).unwrap();
        let stored = catalog.list_projects().unwrap();
        assert_eq!(stored.len(), 1);
        assert_eq!(stored[0], project);
        assert_eq!(stored[0].source, ProjectSource::Fallback);
    }

    #[test]
    fn test_seed_is_idempotent_by_name() {
        let catalog = SqliteCatalog::in_memory().unwrap();
        let first = catalog.seed_starter_inventory().unwrap();
        assert_eq!(first, starter_inventory().len());
        let second = catalog.seed_starter_inventory().unwrap();
        assert_eq!(second, 0);
        assert_eq!(catalog.list_available().unwrap().len(), first);
    }

    #[test]
    fn test_list_available_skips_depleted() {
        let catalog = SqliteCatalog::in_memory().unwrap();
        let depleted = Material::new(
            "empty spool",
            MaterialType::Plastic,
            0.0,
            "pieces",
            MaterialCondition::Good,
            50,
            50,
        );
        catalog.add_material(&depleted).unwrap();
        assert!(catalog.list_available().unwrap().is_empty());
    }
}

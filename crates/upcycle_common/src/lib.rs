//! Upcycle Common - Shared types for the material-combination project generator.
//!
//! Records crossing a component boundary (materials, scores, drafts, projects,
//! run summaries) live here, together with configuration and the error taxonomy.
//! Everything is serde-serializable; JSON is the interchange format at every seam.

pub mod config;
pub mod error;
pub mod material;
pub mod project;
pub mod score;

pub use config::*;
pub use error::*;
pub use material::*;
pub use project::*;
pub use score::*;

//! Core types for the javagraph Java code graph importer
//!
//! This crate provides the foundational abstractions shared by the storage
//! backends, the importer and the CLI:
//!
//! - **Entities**: entity, relation and artifact kinds plus the stored records
//! - **Signature grammar**: structural decomposition of type reference strings
//! - **Facts**: the per-artifact extracted fact streams the importer consumes
//! - **Configuration**: system configuration management
//! - **Error handling**: unified error types
//!

#![cfg_attr(not(test), deny(clippy::unwrap_used))]
#![cfg_attr(not(test), deny(clippy::expect_used))]

pub mod config;
pub mod entities;
pub mod error;
pub mod facts;
pub mod signature;

// Re-export main types for convenience
pub use config::{Config, ImporterConfig, RepositoryConfig, StorageConfig};
pub use entities::{
    ArtifactDependency, ArtifactId, ArtifactKind, ArtifactRecord, CommentKind, CommentRecord,
    EntityId, EntityKind, EntityRecord, FileId, FileKind, FileRecord, ImportRecord, Location,
    ProblemKind, ProblemRecord, RelationClass, RelationKind, RelationRecord, StageMarker,
    PRIMITIVE_TYPES, PRIVATE_MODIFIER,
};
pub use error::{Error, Result, ResultExt};
pub use facts::{DirectoryFacts, FactSource, InMemoryFacts};
pub use signature::{Signature, WildcardBound};

/// Version of the core library
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::config::Config;
    pub use crate::entities::{ArtifactId, EntityId, EntityKind, RelationKind};
    pub use crate::error::{Result, ResultExt};
}

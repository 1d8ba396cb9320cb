//! Graph data model: artifacts, entities, relations and the per-artifact
//! side tables (files, problems, imports, comments).

use serde::{Deserialize, Serialize};
use std::fmt;
use strum_macros::{AsRefStr, Display, EnumIter, EnumString};
use uuid::Uuid;

macro_rules! uuid_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub Uuid);

        impl $name {
            /// Reserve a fresh identifier
            pub fn new() -> Self {
                Self(Uuid::new_v4())
            }

            pub fn as_uuid(&self) -> Uuid {
                self.0
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl From<Uuid> for $name {
            fn from(value: Uuid) -> Self {
                Self(value)
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                self.0.fmt(f)
            }
        }
    };
}

uuid_id!(
    /// Identifier of a graph node
    EntityId
);
uuid_id!(
    /// Identifier of an imported artifact
    ArtifactId
);
uuid_id!(
    /// Identifier of a file belonging to an artifact
    FileId
);

impl EntityId {
    /// Stable identifier for an entity that must be recomputable without a
    /// lookup, such as local variables shared between the two import stages
    pub fn derived(artifact: ArtifactId, key: &str) -> Self {
        Self(Uuid::new_v5(&artifact.0, key.as_bytes()))
    }
}

/// Primitive type names owned by the PRIMITIVES artifact
pub const PRIMITIVE_TYPES: [&str; 9] = [
    "boolean", "char", "byte", "short", "int", "long", "float", "double", "void",
];

/// Kind of graph node
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    AsRefStr,
    EnumIter,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum EntityKind {
    Package,
    Class,
    Interface,
    Enum,
    Annotation,
    Method,
    Constructor,
    Field,
    EnumConstant,
    AnnotationElement,
    Initializer,
    LocalVariable,
    Parameter,
    Primitive,
    Array,
    Wildcard,
    TypeVariable,
    ParameterizedType,
    Unknown,
    Duplicate,
}

impl EntityKind {
    /// Kinds backed by a concrete declaration, written during stage one
    pub fn is_declared(&self) -> bool {
        !self.is_synthetic()
    }

    /// Kinds materialized only because some reference decomposes into them
    pub fn is_synthetic(&self) -> bool {
        matches!(
            self,
            EntityKind::Array
                | EntityKind::Wildcard
                | EntityKind::TypeVariable
                | EntityKind::ParameterizedType
                | EntityKind::Unknown
                | EntityKind::Duplicate
        )
    }

    /// Declared kinds other artifacts may refer to
    pub fn is_exported(&self) -> bool {
        matches!(
            self,
            EntityKind::Package
                | EntityKind::Class
                | EntityKind::Interface
                | EntityKind::Enum
                | EntityKind::Annotation
                | EntityKind::Method
                | EntityKind::Constructor
                | EntityKind::Field
                | EntityKind::EnumConstant
                | EntityKind::AnnotationElement
        )
    }
}

/// Kind of graph edge
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString, AsRefStr,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum RelationKind {
    Holds,
    Inside,
    Extends,
    Implements,
    Calls,
    Reads,
    Writes,
    Uses,
    Casts,
    Checks,
    Instantiates,
    Returns,
    Throws,
    Annotated,
    Parametrized,
    Overrides,
    HasElementsOf,
    HasUpperBound,
    HasLowerBound,
    HasBaseType,
    HasTypeArgument,
    Matches,
}

/// Where the right-hand side of a relation lives relative to its owner
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString, AsRefStr,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum RelationClass {
    Internal,
    JavaLibrary,
    External,
    Unknown,
    NotApplicable,
}

/// Kind of importable artifact
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString, AsRefStr,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum ArtifactKind {
    JavaLibrary,
    Jar,
    Maven,
    SourceProject,
    Primitives,
    Unknowns,
    System,
}

impl ArtifactKind {
    /// Jars are identified by content hash, everything else by path
    pub fn is_hashed(&self) -> bool {
        matches!(self, ArtifactKind::Jar | ArtifactKind::Maven)
    }
}

/// How far an artifact's import has progressed
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    PartialOrd,
    Ord,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    AsRefStr,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum StageMarker {
    NotStarted,
    StageOneDone,
    StageTwoDone,
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString, AsRefStr,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum FileKind {
    Source,
    Class,
    Jar,
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString, AsRefStr,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum ProblemKind {
    Error,
    Warning,
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString, AsRefStr,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum CommentKind {
    Line,
    Block,
    Javadoc,
    /// Javadoc comment not attached to any declaration
    Ujavadoc,
}

/// Position of a fact inside one of the artifact's files
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Location {
    pub file: FileId,
    pub offset: i32,
    pub length: i32,
}

/// Stored artifact row
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArtifactRecord {
    pub id: ArtifactId,
    pub name: String,
    pub kind: ArtifactKind,
    /// Repository relative path of the extracted artifact
    pub path: Option<String>,
    /// Content hash, present for jars
    pub hash: Option<String>,
    pub stage: StageMarker,
}

impl ArtifactRecord {
    pub fn new(name: impl Into<String>, kind: ArtifactKind) -> Self {
        Self {
            id: ArtifactId::new(),
            name: name.into(),
            kind,
            path: None,
            hash: None,
            stage: StageMarker::NotStarted,
        }
    }

    pub fn with_path(mut self, path: impl Into<String>) -> Self {
        self.path = Some(path.into());
        self
    }

    pub fn with_hash(mut self, hash: impl Into<String>) -> Self {
        self.hash = Some(hash.into());
        self
    }

    pub fn with_stage(mut self, stage: StageMarker) -> Self {
        self.stage = stage;
        self
    }
}

/// Modifier bit marking a private declaration
pub const PRIVATE_MODIFIER: i32 = 0x0002;

/// Stored entity row
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntityRecord {
    pub id: EntityId,
    pub artifact: ArtifactId,
    pub kind: EntityKind,
    /// Reference string that produced this entity
    pub fqn: String,
    pub modifiers: Option<i32>,
    /// Array dimensions
    pub multiplicity: Option<i32>,
    pub location: Option<Location>,
}

impl EntityRecord {
    pub fn new(artifact: ArtifactId, kind: EntityKind, fqn: impl Into<String>) -> Self {
        Self {
            id: EntityId::new(),
            artifact,
            kind,
            fqn: fqn.into(),
            modifiers: None,
            multiplicity: None,
            location: None,
        }
    }

    pub fn is_private(&self) -> bool {
        self.modifiers
            .is_some_and(|modifiers| modifiers & PRIVATE_MODIFIER != 0)
    }

    /// Whether a lookup from another artifact may resolve to this entity
    pub fn is_visible_to_dependents(&self) -> bool {
        self.kind == EntityKind::Primitive || (self.kind.is_exported() && !self.is_private())
    }
}

/// Stored relation row
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RelationRecord {
    pub kind: RelationKind,
    pub class: RelationClass,
    pub lhs: EntityId,
    pub rhs: EntityId,
    pub artifact: ArtifactId,
    pub location: Option<Location>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileRecord {
    pub id: FileId,
    pub artifact: ArtifactId,
    pub kind: FileKind,
    pub path: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProblemRecord {
    pub artifact: ArtifactId,
    pub file: FileId,
    pub kind: ProblemKind,
    pub error_code: i32,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImportRecord {
    pub artifact: ArtifactId,
    pub entity: EntityId,
    pub is_static: bool,
    pub on_demand: bool,
    pub location: Location,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommentRecord {
    pub artifact: ArtifactId,
    pub kind: CommentKind,
    /// Commented declaration, only for attached javadoc
    pub entity: Option<EntityId>,
    pub location: Location,
}

/// Edge of the artifact dependency graph, recorded from used jars
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ArtifactDependency {
    pub artifact: ArtifactId,
    pub dependency: ArtifactId,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn test_declared_and_synthetic_partition_kinds() {
        assert!(EntityKind::Class.is_declared());
        assert!(EntityKind::LocalVariable.is_declared());
        assert!(EntityKind::Primitive.is_declared());
        assert!(EntityKind::Duplicate.is_synthetic());
        assert!(EntityKind::ParameterizedType.is_synthetic());
        assert!(!EntityKind::Unknown.is_declared());
    }

    #[test]
    fn test_dependents_see_only_non_private_members() {
        let artifact = ArtifactId::new();
        let mut class = EntityRecord::new(artifact, EntityKind::Class, "a.A");
        assert!(class.is_visible_to_dependents());

        class.modifiers = Some(PRIVATE_MODIFIER | 0x0008);
        assert!(class.is_private());
        assert!(!class.is_visible_to_dependents());

        let local = EntityRecord::new(artifact, EntityKind::LocalVariable, "a.A.m()#x");
        assert!(!local.is_visible_to_dependents());
        let initializer = EntityRecord::new(artifact, EntityKind::Initializer, "a.A.<clinit>");
        assert!(!initializer.is_visible_to_dependents());
        let primitive = EntityRecord::new(artifact, EntityKind::Primitive, "int");
        assert!(primitive.is_visible_to_dependents());
    }

    #[test]
    fn test_kind_names_use_screaming_snake_case() {
        assert_eq!(EntityKind::ParameterizedType.as_ref(), "PARAMETERIZED_TYPE");
        assert_eq!(RelationKind::HasTypeArgument.to_string(), "HAS_TYPE_ARGUMENT");
        assert_eq!(
            StageMarker::from_str("STAGE_ONE_DONE").ok(),
            Some(StageMarker::StageOneDone)
        );
        assert_eq!(
            serde_json::to_string(&ArtifactKind::JavaLibrary).ok().as_deref(),
            Some("\"JAVA_LIBRARY\"")
        );
    }

    #[test]
    fn test_derived_ids_are_stable_per_artifact() {
        let artifact = ArtifactId::new();
        let first = EntityId::derived(artifact, "a.A#m()#x@0");
        assert_eq!(first, EntityId::derived(artifact, "a.A#m()#x@0"));
        assert_ne!(first, EntityId::derived(artifact, "a.A#m()#x@1"));
        assert_ne!(first, EntityId::derived(ArtifactId::new(), "a.A#m()#x@0"));
    }

    #[test]
    fn test_stage_markers_are_ordered() {
        assert!(StageMarker::NotStarted < StageMarker::StageOneDone);
        assert!(StageMarker::StageOneDone < StageMarker::StageTwoDone);
    }
}

//! Extracted fact streams for a single artifact.
//!
//! An extracted artifact directory holds an `artifact.json` descriptor and
//! one JSON Lines file per stream. Every stream can be read any number of
//! times, so stage one and stage two each get a fresh pass.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{BufRead, BufReader, Lines};
use std::marker::PhantomData;
use std::path::{Path, PathBuf};
use tracing::debug;

use crate::entities::{ArtifactKind, CommentKind, EntityKind, FileKind, ProblemKind, RelationKind};
use crate::error::{Error, Result, ResultExt};

pub const ARTIFACT_FILE: &str = "artifact.json";
pub const FILES_FILE: &str = "files.jsonl";
pub const PROBLEMS_FILE: &str = "problems.jsonl";
pub const ENTITIES_FILE: &str = "entities.jsonl";
pub const LOCAL_VARIABLES_FILE: &str = "local_variables.jsonl";
pub const RELATIONS_FILE: &str = "relations.jsonl";
pub const IMPORTS_FILE: &str = "imports.jsonl";
pub const COMMENTS_FILE: &str = "comments.jsonl";
pub const USED_JARS_FILE: &str = "used_jars.jsonl";

/// Lazy, fallible sequence of fact records
pub type FactIter<'a, T> = Box<dyn Iterator<Item = Result<T>> + Send + 'a>;

/// Descriptor read from `artifact.json`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArtifactDescriptor {
    pub name: String,
    pub kind: ArtifactKind,
    #[serde(default)]
    pub path: Option<String>,
    #[serde(default)]
    pub hash: Option<String>,
    /// False when the extractor gave up on this artifact
    #[serde(default = "default_extracted")]
    pub extracted: bool,
}

fn default_extracted() -> bool {
    true
}

impl ArtifactDescriptor {
    pub fn new(name: impl Into<String>, kind: ArtifactKind) -> Self {
        Self {
            name: name.into(),
            kind,
            path: None,
            hash: None,
            extracted: true,
        }
    }
}

/// Span inside a file of the artifact, keyed by file-relative path
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceSpan {
    pub path: String,
    pub offset: i32,
    pub length: i32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileFact {
    pub kind: FileKind,
    pub path: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProblemFact {
    pub kind: ProblemKind,
    pub error_code: i32,
    pub message: String,
    pub path: String,
}

/// Declared entity
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntityFact {
    pub kind: EntityKind,
    pub fqn: String,
    #[serde(default)]
    pub modifiers: Option<i32>,
    #[serde(default)]
    pub multiplicity: Option<i32>,
    #[serde(default)]
    pub location: Option<SourceSpan>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum LocalVariableKind {
    Local,
    Param,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LocalVariableFact {
    pub kind: LocalVariableKind,
    pub name: String,
    #[serde(default)]
    pub modifiers: Option<i32>,
    pub type_fqn: String,
    /// Enclosing method or initializer
    pub parent: String,
    /// Parameter position
    #[serde(default)]
    pub position: Option<i32>,
    #[serde(default)]
    pub location: Option<SourceSpan>,
}

impl LocalVariableFact {
    /// Reference string of the local variable entity
    pub fn fqn(&self) -> String {
        format!("{}#{}", self.parent, self.name)
    }

    pub fn entity_kind(&self) -> EntityKind {
        match self.kind {
            LocalVariableKind::Local => EntityKind::LocalVariable,
            LocalVariableKind::Param => EntityKind::Parameter,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RelationFact {
    pub kind: RelationKind,
    pub lhs: String,
    pub rhs: String,
    #[serde(default)]
    pub location: Option<SourceSpan>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImportFact {
    pub is_static: bool,
    pub on_demand: bool,
    pub imported: String,
    pub location: SourceSpan,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommentFact {
    pub kind: CommentKind,
    /// Commented declaration, present for attached javadoc
    #[serde(default)]
    pub fqn: Option<String>,
    pub location: SourceSpan,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UsedJarFact {
    pub hash: String,
}

/// Re-readable fact streams of one extracted artifact
pub trait FactSource: Send + Sync {
    fn descriptor(&self) -> &ArtifactDescriptor;

    fn files(&self) -> Result<FactIter<'_, FileFact>>;

    fn problems(&self) -> Result<FactIter<'_, ProblemFact>>;

    fn entities(&self) -> Result<FactIter<'_, EntityFact>>;

    fn local_variables(&self) -> Result<FactIter<'_, LocalVariableFact>>;

    fn relations(&self) -> Result<FactIter<'_, RelationFact>>;

    fn imports(&self) -> Result<FactIter<'_, ImportFact>>;

    fn comments(&self) -> Result<FactIter<'_, CommentFact>>;

    fn used_jars(&self) -> Result<FactIter<'_, UsedJarFact>>;
}

/// Fact streams stored as JSON Lines in an artifact directory
#[derive(Debug, Clone)]
pub struct DirectoryFacts {
    root: PathBuf,
    descriptor: ArtifactDescriptor,
}

impl DirectoryFacts {
    /// Open an extracted artifact directory, reading its descriptor
    pub fn open(root: impl Into<PathBuf>) -> Result<Self> {
        let root = root.into();
        let descriptor_path = root.join(ARTIFACT_FILE);
        let content = std::fs::read_to_string(&descriptor_path)
            .context(format!("Failed to read {}", descriptor_path.display()))?;
        let descriptor: ArtifactDescriptor = serde_json::from_str(&content)
            .map_err(|e| Error::parse(descriptor_path.display().to_string(), e.to_string()))?;
        Ok(Self { root, descriptor })
    }

    /// Use `path` as the repository path unless `artifact.json` names one
    pub fn with_default_path(mut self, path: impl Into<String>) -> Self {
        if self.descriptor.path.is_none() {
            self.descriptor.path = Some(path.into());
        }
        self
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn stream<T>(&self, name: &str) -> Result<FactIter<'_, T>>
    where
        T: DeserializeOwned + Send + 'static,
    {
        let path = self.root.join(name);
        if !path.exists() {
            debug!(artifact = %self.descriptor.name, stream = name, "No fact file, stream is empty");
            return Ok(Box::new(std::iter::empty()));
        }
        let file = File::open(&path).context(format!("Failed to open {}", path.display()))?;
        Ok(Box::new(JsonLines::<T>::new(path, BufReader::new(file))))
    }
}

impl FactSource for DirectoryFacts {
    fn descriptor(&self) -> &ArtifactDescriptor {
        &self.descriptor
    }

    fn files(&self) -> Result<FactIter<'_, FileFact>> {
        self.stream(FILES_FILE)
    }

    fn problems(&self) -> Result<FactIter<'_, ProblemFact>> {
        self.stream(PROBLEMS_FILE)
    }

    fn entities(&self) -> Result<FactIter<'_, EntityFact>> {
        self.stream(ENTITIES_FILE)
    }

    fn local_variables(&self) -> Result<FactIter<'_, LocalVariableFact>> {
        self.stream(LOCAL_VARIABLES_FILE)
    }

    fn relations(&self) -> Result<FactIter<'_, RelationFact>> {
        self.stream(RELATIONS_FILE)
    }

    fn imports(&self) -> Result<FactIter<'_, ImportFact>> {
        self.stream(IMPORTS_FILE)
    }

    fn comments(&self) -> Result<FactIter<'_, CommentFact>> {
        self.stream(COMMENTS_FILE)
    }

    fn used_jars(&self) -> Result<FactIter<'_, UsedJarFact>> {
        self.stream(USED_JARS_FILE)
    }
}

/// Line-by-line JSON reader that skips blank lines
struct JsonLines<T> {
    path: PathBuf,
    lines: Lines<BufReader<File>>,
    line_number: usize,
    _record: PhantomData<fn() -> T>,
}

impl<T> JsonLines<T> {
    fn new(path: PathBuf, reader: BufReader<File>) -> Self {
        Self {
            path,
            lines: reader.lines(),
            line_number: 0,
            _record: PhantomData,
        }
    }
}

impl<T: DeserializeOwned> Iterator for JsonLines<T> {
    type Item = Result<T>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let line = self.lines.next()?;
            self.line_number += 1;
            let line = match line {
                Ok(line) => line,
                Err(e) => return Some(Err(Error::Io(e))),
            };
            if line.trim().is_empty() {
                continue;
            }
            return Some(serde_json::from_str(&line).map_err(|e| {
                Error::parse(
                    self.path.display().to_string(),
                    format!("line {}: {e}", self.line_number),
                )
            }));
        }
    }
}

/// Fact streams held in memory
#[derive(Debug, Clone)]
pub struct InMemoryFacts {
    pub descriptor: ArtifactDescriptor,
    pub files: Vec<FileFact>,
    pub problems: Vec<ProblemFact>,
    pub entities: Vec<EntityFact>,
    pub local_variables: Vec<LocalVariableFact>,
    pub relations: Vec<RelationFact>,
    pub imports: Vec<ImportFact>,
    pub comments: Vec<CommentFact>,
    pub used_jars: Vec<UsedJarFact>,
}

impl InMemoryFacts {
    pub fn new(descriptor: ArtifactDescriptor) -> Self {
        Self {
            descriptor,
            files: Vec::new(),
            problems: Vec::new(),
            entities: Vec::new(),
            local_variables: Vec::new(),
            relations: Vec::new(),
            imports: Vec::new(),
            comments: Vec::new(),
            used_jars: Vec::new(),
        }
    }

    pub fn with_file(mut self, kind: FileKind, path: impl Into<String>) -> Self {
        self.files.push(FileFact {
            kind,
            path: path.into(),
        });
        self
    }

    pub fn with_entity(mut self, kind: EntityKind, fqn: impl Into<String>) -> Self {
        self.entities.push(EntityFact {
            kind,
            fqn: fqn.into(),
            modifiers: None,
            multiplicity: None,
            location: None,
        });
        self
    }

    pub fn with_relation(
        mut self,
        kind: RelationKind,
        lhs: impl Into<String>,
        rhs: impl Into<String>,
    ) -> Self {
        self.relations.push(RelationFact {
            kind,
            lhs: lhs.into(),
            rhs: rhs.into(),
            location: None,
        });
        self
    }

    pub fn with_used_jar(mut self, hash: impl Into<String>) -> Self {
        self.used_jars.push(UsedJarFact { hash: hash.into() });
        self
    }
}

fn replay<'a, T: Clone + Send + Sync>(items: &'a [T]) -> Result<FactIter<'a, T>> {
    Ok(Box::new(items.iter().cloned().map(Ok)))
}

impl FactSource for InMemoryFacts {
    fn descriptor(&self) -> &ArtifactDescriptor {
        &self.descriptor
    }

    fn files(&self) -> Result<FactIter<'_, FileFact>> {
        replay(&self.files)
    }

    fn problems(&self) -> Result<FactIter<'_, ProblemFact>> {
        replay(&self.problems)
    }

    fn entities(&self) -> Result<FactIter<'_, EntityFact>> {
        replay(&self.entities)
    }

    fn local_variables(&self) -> Result<FactIter<'_, LocalVariableFact>> {
        replay(&self.local_variables)
    }

    fn relations(&self) -> Result<FactIter<'_, RelationFact>> {
        replay(&self.relations)
    }

    fn imports(&self) -> Result<FactIter<'_, ImportFact>> {
        replay(&self.imports)
    }

    fn comments(&self) -> Result<FactIter<'_, CommentFact>> {
        replay(&self.comments)
    }

    fn used_jars(&self) -> Result<FactIter<'_, UsedJarFact>> {
        replay(&self.used_jars)
    }
}

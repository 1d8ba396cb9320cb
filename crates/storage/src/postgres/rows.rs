//! Row types and their conversion into core records

use javagraph_core::entities::{
    ArtifactRecord, CommentRecord, EntityRecord, FileRecord, ImportRecord, Location,
    ProblemRecord, RelationRecord,
};
use javagraph_core::Result;
use std::str::FromStr;
use uuid::Uuid;

use crate::error::StorageError;

fn parse_kind<T: FromStr>(table: &str, value: &str) -> Result<T> {
    T::from_str(value).map_err(|_| {
        StorageError::CorruptRow {
            table: table.to_string(),
            message: format!("unrecognized kind '{value}'"),
        }
        .into()
    })
}

fn location(file: Option<Uuid>, offset: Option<i32>, length: Option<i32>) -> Option<Location> {
    match (file, offset, length) {
        (Some(file), Some(offset), Some(length)) => Some(Location {
            file: file.into(),
            offset,
            length,
        }),
        _ => None,
    }
}

#[derive(sqlx::FromRow)]
pub(crate) struct ArtifactRow {
    pub artifact_id: Uuid,
    pub name: String,
    pub kind: String,
    pub path: Option<String>,
    pub hash: Option<String>,
    pub stage: String,
}

impl TryFrom<ArtifactRow> for ArtifactRecord {
    type Error = javagraph_core::Error;

    fn try_from(row: ArtifactRow) -> Result<Self> {
        Ok(ArtifactRecord {
            id: row.artifact_id.into(),
            name: row.name,
            kind: parse_kind("artifacts", &row.kind)?,
            path: row.path,
            hash: row.hash,
            stage: parse_kind("artifacts", &row.stage)?,
        })
    }
}

#[derive(sqlx::FromRow)]
pub(crate) struct FileRow {
    pub file_id: Uuid,
    pub artifact_id: Uuid,
    pub kind: String,
    pub path: String,
}

impl TryFrom<FileRow> for FileRecord {
    type Error = javagraph_core::Error;

    fn try_from(row: FileRow) -> Result<Self> {
        Ok(FileRecord {
            id: row.file_id.into(),
            artifact: row.artifact_id.into(),
            kind: parse_kind("files", &row.kind)?,
            path: row.path,
        })
    }
}

#[derive(sqlx::FromRow)]
pub(crate) struct ProblemRow {
    pub artifact_id: Uuid,
    pub file_id: Uuid,
    pub kind: String,
    pub error_code: i32,
    pub message: String,
}

impl TryFrom<ProblemRow> for ProblemRecord {
    type Error = javagraph_core::Error;

    fn try_from(row: ProblemRow) -> Result<Self> {
        Ok(ProblemRecord {
            artifact: row.artifact_id.into(),
            file: row.file_id.into(),
            kind: parse_kind("problems", &row.kind)?,
            error_code: row.error_code,
            message: row.message,
        })
    }
}

#[derive(sqlx::FromRow)]
pub(crate) struct EntityRow {
    pub entity_id: Uuid,
    pub artifact_id: Uuid,
    pub kind: String,
    pub fqn: String,
    pub modifiers: Option<i32>,
    pub multiplicity: Option<i32>,
    pub file_id: Option<Uuid>,
    pub start_offset: Option<i32>,
    pub length: Option<i32>,
}

impl TryFrom<EntityRow> for EntityRecord {
    type Error = javagraph_core::Error;

    fn try_from(row: EntityRow) -> Result<Self> {
        Ok(EntityRecord {
            id: row.entity_id.into(),
            artifact: row.artifact_id.into(),
            kind: parse_kind("entities", &row.kind)?,
            fqn: row.fqn,
            modifiers: row.modifiers,
            multiplicity: row.multiplicity,
            location: location(row.file_id, row.start_offset, row.length),
        })
    }
}

#[derive(sqlx::FromRow)]
pub(crate) struct RelationRow {
    pub kind: String,
    pub class: String,
    pub lhs_id: Uuid,
    pub rhs_id: Uuid,
    pub artifact_id: Uuid,
    pub file_id: Option<Uuid>,
    pub start_offset: Option<i32>,
    pub length: Option<i32>,
}

impl TryFrom<RelationRow> for RelationRecord {
    type Error = javagraph_core::Error;

    fn try_from(row: RelationRow) -> Result<Self> {
        Ok(RelationRecord {
            kind: parse_kind("relations", &row.kind)?,
            class: parse_kind("relations", &row.class)?,
            lhs: row.lhs_id.into(),
            rhs: row.rhs_id.into(),
            artifact: row.artifact_id.into(),
            location: location(row.file_id, row.start_offset, row.length),
        })
    }
}

#[derive(sqlx::FromRow)]
pub(crate) struct ImportRow {
    pub artifact_id: Uuid,
    pub entity_id: Uuid,
    pub is_static: bool,
    pub on_demand: bool,
    pub file_id: Uuid,
    pub start_offset: i32,
    pub length: i32,
}

impl From<ImportRow> for ImportRecord {
    fn from(row: ImportRow) -> Self {
        ImportRecord {
            artifact: row.artifact_id.into(),
            entity: row.entity_id.into(),
            is_static: row.is_static,
            on_demand: row.on_demand,
            location: Location {
                file: row.file_id.into(),
                offset: row.start_offset,
                length: row.length,
            },
        }
    }
}

#[derive(sqlx::FromRow)]
pub(crate) struct CommentRow {
    pub artifact_id: Uuid,
    pub kind: String,
    pub entity_id: Option<Uuid>,
    pub file_id: Uuid,
    pub start_offset: i32,
    pub length: i32,
}

impl TryFrom<CommentRow> for CommentRecord {
    type Error = javagraph_core::Error;

    fn try_from(row: CommentRow) -> Result<Self> {
        Ok(CommentRecord {
            artifact: row.artifact_id.into(),
            kind: parse_kind("comments", &row.kind)?,
            entity: row.entity_id.map(Into::into),
            location: Location {
                file: row.file_id.into(),
                offset: row.start_offset,
                length: row.length,
            },
        })
    }
}

/// Convert fetched rows, failing on the first corrupt one
pub(crate) fn convert<R, T>(rows: Vec<R>) -> Result<Vec<T>>
where
    T: TryFrom<R, Error = javagraph_core::Error>,
{
    rows.into_iter().map(T::try_from).collect()
}

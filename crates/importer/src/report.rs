//! Import outcomes and the recoverable issues collected along the way

use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, AsRefStr)]
#[strum(serialize_all = "kebab-case")]
pub enum ImportStage {
    StageOne,
    StageTwo,
}

/// Class of a recoverable problem with a single fact
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, AsRefStr)]
#[strum(serialize_all = "kebab-case")]
pub enum IssueKind {
    /// The fact points at a file the artifact does not have
    MissingFile,
    /// A relation or attachment endpoint could not be found
    DanglingEndpoint,
    /// The same reference string was declared twice in one artifact
    DuplicateDeclaration,
    /// A used jar is not in the store
    MissingDependency,
    /// A declared-entity fact carries a synthetic kind
    UnsupportedFact,
}

impl IssueKind {
    /// Issues that fail the artifact when strict references are enabled
    pub fn is_reference_failure(&self) -> bool {
        matches!(self, IssueKind::MissingFile | IssueKind::DanglingEndpoint)
    }
}

/// A fact that was dropped instead of imported
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImportIssue {
    pub artifact: String,
    pub kind: IssueKind,
    pub detail: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ArtifactOutcome {
    Completed,
    /// Already done by an earlier run or another worker
    Skipped,
    Failed(String),
}

/// Result of running one stage for one artifact
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArtifactReport {
    pub name: String,
    pub outcome: ArtifactOutcome,
    pub entities: usize,
    pub relations: usize,
    pub issues: Vec<ImportIssue>,
}

impl ArtifactReport {
    pub fn completed(name: impl Into<String>) -> Self {
        Self::with_outcome(name, ArtifactOutcome::Completed)
    }

    pub fn skipped(name: impl Into<String>) -> Self {
        Self::with_outcome(name, ArtifactOutcome::Skipped)
    }

    pub fn failed(name: impl Into<String>, message: impl Into<String>) -> Self {
        Self::with_outcome(name, ArtifactOutcome::Failed(message.into()))
    }

    fn with_outcome(name: impl Into<String>, outcome: ArtifactOutcome) -> Self {
        Self {
            name: name.into(),
            outcome,
            entities: 0,
            relations: 0,
            issues: Vec::new(),
        }
    }
}

/// Aggregated result of one stage across all artifacts
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StageReport {
    stage: ImportStage,
    artifacts: Vec<ArtifactReport>,
    elapsed_ms: u64,
}

impl StageReport {
    pub(crate) fn new(stage: ImportStage, mut artifacts: Vec<ArtifactReport>, elapsed_ms: u64) -> Self {
        artifacts.sort_by(|a, b| a.name.cmp(&b.name));
        Self {
            stage,
            artifacts,
            elapsed_ms,
        }
    }

    pub fn stage(&self) -> ImportStage {
        self.stage
    }

    pub fn artifacts(&self) -> &[ArtifactReport] {
        &self.artifacts
    }

    pub fn completed(&self) -> usize {
        self.count(|o| matches!(o, ArtifactOutcome::Completed))
    }

    pub fn skipped(&self) -> usize {
        self.count(|o| matches!(o, ArtifactOutcome::Skipped))
    }

    pub fn failed(&self) -> usize {
        self.count(|o| matches!(o, ArtifactOutcome::Failed(_)))
    }

    pub fn entities(&self) -> usize {
        self.artifacts.iter().map(|a| a.entities).sum()
    }

    pub fn relations(&self) -> usize {
        self.artifacts.iter().map(|a| a.relations).sum()
    }

    pub fn issues(&self) -> usize {
        self.artifacts.iter().map(|a| a.issues.len()).sum()
    }

    pub fn elapsed_ms(&self) -> u64 {
        self.elapsed_ms
    }

    /// Report for a single artifact by name
    pub fn artifact(&self, name: &str) -> Option<&ArtifactReport> {
        self.artifacts.iter().find(|a| a.name == name)
    }

    fn count(&self, predicate: impl Fn(&ArtifactOutcome) -> bool) -> usize {
        self.artifacts
            .iter()
            .filter(|a| predicate(&a.outcome))
            .count()
    }
}

/// Result of a complete two-stage import
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImportReport {
    stage_one: StageReport,
    stage_two: StageReport,
}

impl ImportReport {
    pub(crate) fn new(stage_one: StageReport, stage_two: StageReport) -> Self {
        Self {
            stage_one,
            stage_two,
        }
    }

    pub fn stage_one(&self) -> &StageReport {
        &self.stage_one
    }

    pub fn stage_two(&self) -> &StageReport {
        &self.stage_two
    }

    pub fn stages(&self) -> [&StageReport; 2] {
        [&self.stage_one, &self.stage_two]
    }

    /// Number of artifacts that failed in either stage
    pub fn failed(&self) -> usize {
        self.stage_one.failed() + self.stage_two.failed()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stage_report_counts_outcomes() {
        let mut done = ArtifactReport::completed("b");
        done.entities = 3;
        done.relations = 2;
        done.issues.push(ImportIssue {
            artifact: "b".to_string(),
            kind: IssueKind::MissingFile,
            detail: "x".to_string(),
        });
        let report = StageReport::new(
            ImportStage::StageTwo,
            vec![
                done,
                ArtifactReport::skipped("a"),
                ArtifactReport::failed("c", "boom"),
            ],
            5,
        );

        assert_eq!(report.completed(), 1);
        assert_eq!(report.skipped(), 1);
        assert_eq!(report.failed(), 1);
        assert_eq!(report.entities(), 3);
        assert_eq!(report.relations(), 2);
        assert_eq!(report.issues(), 1);
        assert_eq!(report.artifacts()[0].name, "a");
        assert_eq!(ImportStage::StageTwo.to_string(), "stage-two");
    }

    #[test]
    fn test_only_reference_failures_are_strict() {
        assert!(IssueKind::MissingFile.is_reference_failure());
        assert!(IssueKind::DanglingEndpoint.is_reference_failure());
        assert!(!IssueKind::DuplicateDeclaration.is_reference_failure());
        assert!(!IssueKind::MissingDependency.is_reference_failure());
    }
}

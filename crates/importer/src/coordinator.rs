//! Parallel import over a set of artifacts.
//!
//! Workers pull artifacts from one shared queue. Stage one runs to completion
//! for every artifact before the queue is rewound for stage two, so any
//! artifact a stage-two lookup can reach has its declarations stored. Stage
//! two shares a single [`UnknownsRegistry`] between all workers.

use anyhow::anyhow;
use futures::future::join_all;
use javagraph_core::facts::FactSource;
use javagraph_core::{Error, ImporterConfig, Result};
use javagraph_storage::GraphStore;
use std::collections::HashSet;
use std::sync::{Arc, Mutex};
use std::time::Instant;
use tracing::{debug, error, info, warn};

use crate::pipeline::{identity_key, ImportPipeline};
use crate::report::{ArtifactReport, ImportReport, ImportStage, StageReport};
use crate::unknowns::UnknownsRegistry;

/// Shared cursor over the artifact list
struct WorkQueue {
    artifacts: Vec<Arc<dyn FactSource>>,
    next: Mutex<usize>,
}

impl WorkQueue {
    fn new(artifacts: Vec<Arc<dyn FactSource>>) -> Self {
        Self {
            artifacts,
            next: Mutex::new(0),
        }
    }

    fn claim(&self) -> Result<Option<Arc<dyn FactSource>>> {
        let mut next = self
            .next
            .lock()
            .map_err(|_| Error::import("work queue lock poisoned"))?;
        let item = self.artifacts.get(*next).cloned();
        if item.is_some() {
            *next += 1;
        }
        Ok(item)
    }

    fn rewind(&self) -> Result<()> {
        *self
            .next
            .lock()
            .map_err(|_| Error::import("work queue lock poisoned"))? = 0;
        Ok(())
    }

    fn len(&self) -> usize {
        self.artifacts.len()
    }
}

/// Runs both import stages over many artifacts with a pool of workers
pub struct ImportCoordinator {
    store: Arc<dyn GraphStore>,
    options: ImporterConfig,
}

impl ImportCoordinator {
    pub fn new(store: Arc<dyn GraphStore>, options: ImporterConfig) -> Self {
        Self { store, options }
    }

    /// Import `artifacts`, stage one everywhere first, then stage two.
    ///
    /// # Errors
    ///
    /// Returns an error if the store was never initialized, a session cannot
    /// be opened or a worker panics. Failures of single artifacts are
    /// recorded in the report instead.
    pub async fn run(&self, artifacts: Vec<Arc<dyn FactSource>>) -> Result<ImportReport> {
        {
            let mut session = self.store.open_session().await?;
            UnknownsRegistry::unknowns_artifact(session.as_mut()).await?;
        }

        let (artifacts, duplicates) = distinct_artifacts(artifacts);
        let queue = Arc::new(WorkQueue::new(artifacts));
        let workers = self.options.thread_count.clamp(1, queue.len().max(1));
        info!(artifacts = queue.len(), workers, "Starting import");

        let stage_one = self
            .run_stage(ImportStage::StageOne, &queue, workers, &duplicates, None)
            .await?;
        log_stage(&stage_one);

        queue.rewind()?;
        let unknowns = {
            let mut session = self.store.open_session().await?;
            Arc::new(UnknownsRegistry::preload(session.as_mut()).await?)
        };
        let stage_two = self
            .run_stage(
                ImportStage::StageTwo,
                &queue,
                workers,
                &duplicates,
                Some(Arc::clone(&unknowns)),
            )
            .await?;
        log_stage(&stage_two);
        info!(unknowns = unknowns.len().await, "Unknown references after import");

        Ok(ImportReport::new(stage_one, stage_two))
    }

    /// Drain the queue with `workers` tasks and wait for all of them
    async fn run_stage(
        &self,
        stage: ImportStage,
        queue: &Arc<WorkQueue>,
        workers: usize,
        duplicates: &[String],
        unknowns: Option<Arc<UnknownsRegistry>>,
    ) -> Result<StageReport> {
        let start = Instant::now();
        let mut handles = Vec::with_capacity(workers);
        for worker in 0..workers {
            let session = self.store.open_session().await?;
            let pipeline = ImportPipeline::new(session, self.options.clone());
            handles.push(tokio::spawn(run_worker(
                worker,
                stage,
                pipeline,
                Arc::clone(queue),
                unknowns.clone(),
            )));
        }

        let mut reports = Vec::with_capacity(queue.len() + duplicates.len());
        reports.extend(duplicates.iter().cloned().map(ArtifactReport::skipped));
        for joined in join_all(handles).await {
            let worker_reports =
                joined.map_err(|e| Error::Other(anyhow!("Import worker panicked: {e}")))??;
            reports.extend(worker_reports);
        }

        let elapsed_ms = u64::try_from(start.elapsed().as_millis()).unwrap_or(u64::MAX);
        Ok(StageReport::new(stage, reports, elapsed_ms))
    }
}

/// Drop every artifact whose identity an earlier one already claimed,
/// returning the kept artifacts and the names of the dropped ones
fn distinct_artifacts(
    artifacts: Vec<Arc<dyn FactSource>>,
) -> (Vec<Arc<dyn FactSource>>, Vec<String>) {
    let mut seen = HashSet::new();
    let mut duplicates = Vec::new();
    let mut kept = Vec::with_capacity(artifacts.len());
    for facts in artifacts {
        let descriptor = facts.descriptor();
        if seen.insert(identity_key(descriptor)) {
            kept.push(facts);
        } else {
            warn!(artifact = %descriptor.name, "Same artifact listed twice, importing it once");
            duplicates.push(descriptor.name.clone());
        }
    }
    (kept, duplicates)
}

async fn run_worker(
    worker: usize,
    stage: ImportStage,
    mut pipeline: ImportPipeline,
    queue: Arc<WorkQueue>,
    unknowns: Option<Arc<UnknownsRegistry>>,
) -> Result<Vec<ArtifactReport>> {
    let mut reports = Vec::new();
    while let Some(facts) = queue.claim()? {
        let name = facts.descriptor().name.clone();
        debug!(worker, stage = %stage, artifact = %name, "Claimed artifact");
        let outcome = match (stage, unknowns.as_deref()) {
            (ImportStage::StageOne, _) => pipeline.stage_one(facts.as_ref()).await,
            (ImportStage::StageTwo, Some(unknowns)) => {
                pipeline.stage_two(facts.as_ref(), unknowns).await
            }
            (ImportStage::StageTwo, None) => Err(Error::import(
                "stage two needs an unknowns registry",
            )),
        };
        reports.push(outcome.unwrap_or_else(|e| {
            error!(stage = %stage, artifact = %name, "Import failed: {e}");
            ArtifactReport::failed(name, e.to_string())
        }));
    }
    Ok(reports)
}

fn log_stage(report: &StageReport) {
    info!(
        stage = %report.stage(),
        completed = report.completed(),
        skipped = report.skipped(),
        failed = report.failed(),
        entities = report.entities(),
        relations = report.relations(),
        issues = report.issues(),
        elapsed_ms = report.elapsed_ms(),
        "Stage finished"
    );
}

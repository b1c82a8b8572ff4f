//! Batch processor - orchestration layer
//!
//! ## Responsibilities
//!
//! Entry point of a run; owns every resource and the run-wide statistics.
//!
//! ## Core functions
//!
//! 1. **Initialization**: build the HTTP clients and the extractor from config
//! 2. **Reset / resume**: wipe earlier output on request, otherwise carry over
//!    rows an earlier run already finished
//! 3. **Row loop**: a single sequential worker runs [`RowFlow`] on each row
//! 4. **Batching**: rows owed a scan go to the accumulators; full batches are
//!    handed to [`ScanStage`] tasks right away
//! 5. **Concurrency**: polls across all batches share one semaphore
//! 6. **Cancellation**: Ctrl-C or the run deadline stop the row loop and
//!    wind down in-flight work without losing rows
//! 7. **Statistics**: aggregate per-batch counters into a [`RunSummary`]

use crate::clients::{DocumentFetcher, LinkFetcher, ScanClient, ScanService};
use crate::config::{Config, PollPolicy};
use crate::error::AppResult;
use crate::infrastructure::{OutputSink, ResultStore};
use crate::models::{load_input_records, load_previous_output, InputRecord};
use crate::orchestrator::scan_batch::{BatchResult, ScanStage};
use crate::services::{
    BatchAccumulators, JobPoller, LopdfExtractor, PropertyExtractor, ResultReconciler, ScanBatch,
    ScanDispatcher,
};
use crate::utils::logging::{log_input_loaded, log_startup, print_final_stats, RunSummary};
use crate::workflow::{RowCtx, RowFlow, RowOutcome};
use anyhow::{Context, Result};
use std::collections::HashSet;
use std::sync::Arc;
use tokio::sync::Semaphore;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

/// Application root
pub struct App {
    pipeline: Pipeline,
}

impl App {
    /// Builds the real clients from config
    pub async fn initialize(config: Config) -> AppResult<Self> {
        log_startup(&config);

        let scanner: Arc<dyn ScanService> = Arc::new(ScanClient::new(&config)?);
        let fetcher: Arc<dyn DocumentFetcher> = Arc::new(LinkFetcher::new(&config)?);
        let extractor: Arc<dyn PropertyExtractor> = Arc::new(LopdfExtractor::new());

        Ok(Self {
            pipeline: Pipeline::new(config, scanner, fetcher, extractor),
        })
    }

    /// Runs until the input is exhausted, Ctrl-C, or the run deadline
    pub async fn run(&self) -> Result<RunSummary> {
        let cancel = CancellationToken::new();

        let ctrl_c = {
            let cancel = cancel.clone();
            tokio::spawn(async move {
                if tokio::signal::ctrl_c().await.is_ok() {
                    warn!("⚠️ Ctrl-C received, winding down");
                    cancel.cancel();
                }
            })
        };

        let deadline = self.pipeline.config.run_deadline().map(|limit| {
            let cancel = cancel.clone();
            tokio::spawn(async move {
                tokio::time::sleep(limit).await;
                warn!("⚠️ Run deadline of {:?} reached, winding down", limit);
                cancel.cancel();
            })
        });

        let result = self.pipeline.run(cancel).await;

        ctrl_c.abort();
        if let Some(deadline) = deadline {
            deadline.abort();
        }

        let summary = result?;
        print_final_stats(&summary, &self.pipeline.config);
        Ok(summary)
    }
}

/// The whole analysis run over injected collaborators
pub struct Pipeline {
    config: Config,
    scanner: Arc<dyn ScanService>,
    flow: RowFlow,
    dispatcher: Arc<ScanDispatcher>,
    poller: Arc<JobPoller>,
    store: ResultStore,
}

impl Pipeline {
    pub fn new(
        config: Config,
        scanner: Arc<dyn ScanService>,
        fetcher: Arc<dyn DocumentFetcher>,
        extractor: Arc<dyn PropertyExtractor>,
    ) -> Self {
        let store = ResultStore::new(&config.results_dir);
        let flow = RowFlow::new(fetcher, extractor, config.fetch_timeout());
        let dispatcher = Arc::new(ScanDispatcher::new(Arc::clone(&scanner)));
        let poller = Arc::new(JobPoller::new(
            Arc::clone(&scanner),
            store.clone(),
            config.poll_policy(),
        ));
        Self {
            config,
            scanner,
            flow,
            dispatcher,
            poller,
            store,
        }
    }

    /// Replaces the poll policy derived from config (whole seconds only)
    pub fn with_poll_policy(mut self, policy: PollPolicy) -> Self {
        self.poller = Arc::new(JobPoller::new(
            Arc::clone(&self.scanner),
            self.store.clone(),
            policy,
        ));
        self
    }

    /// Processes the whole input sheet.
    ///
    /// Only setup failures (unreadable input, unwritable output) are errors;
    /// per-row and per-job failures end up in the output rows.
    pub async fn run(&self, cancel: CancellationToken) -> Result<RunSummary> {
        if self.config.reset {
            self.reset().await?;
        }

        let records = load_input_records(&self.config.input_path).await?;
        if records.is_empty() {
            warn!("⚠️ Input sheet has no rows, nothing to do");
        }

        // Rows an earlier run finished are carried over verbatim
        let previous = if self.config.reset {
            Vec::new()
        } else {
            load_previous_output(&self.config.output_path).await?
        };
        let carried: Vec<Vec<String>> = previous
            .iter()
            .filter(|row| row.processed)
            .map(|row| row.cells.clone())
            .collect();
        let done_keys: HashSet<String> = previous
            .into_iter()
            .filter(|row| row.processed)
            .map(|row| row.key)
            .collect();

        let resumed = records
            .iter()
            .filter(|r| done_keys.contains(r.target_url()))
            .count();
        log_input_loaded(records.len(), resumed);

        let sink = Arc::new(
            OutputSink::create(&self.config.output_path, &carried)
                .with_context(|| format!("Unable to create output {}", self.config.output_path.display()))?,
        );
        let stage = ScanStage {
            dispatcher: Arc::clone(&self.dispatcher),
            poller: Arc::clone(&self.poller),
            reconciler: ResultReconciler::new(Arc::clone(&sink)),
            semaphore: Arc::new(Semaphore::new(self.config.max_concurrent_polls)),
            cancel: cancel.clone(),
        };

        let mut summary = RunSummary {
            total: records.len(),
            resumed,
            ..Default::default()
        };
        let handles = self.process_rows(&records, &done_keys, &stage).await;
        summary.cancelled = cancel.is_cancelled();

        for (batch_num, handle) in handles {
            match handle.await {
                Ok(batch) => {
                    summary.scans_completed += batch.completed;
                    summary.scans_failed += batch.failed;
                    summary.scans_timed_out += batch.timed_out + batch.cancelled;
                }
                Err(e) => error!("→ Scan batch #{} task failed: {}", batch_num, e),
            }
        }

        summary.written = sink.written().await + carried.len();
        summary.cancelled |= cancel.is_cancelled();
        Ok(summary)
    }

    /// The sequential row loop. Returns the spawned batch tasks.
    async fn process_rows(
        &self,
        records: &[InputRecord],
        done_keys: &HashSet<String>,
        stage: &ScanStage,
    ) -> Vec<(usize, JoinHandle<BatchResult>)> {
        let mut accumulators = BatchAccumulators::new(self.config.batch_size);
        let mut handles = Vec::new();
        let mut batch_num = 0;
        let total = records.len();

        for record in records {
            if stage.cancel.is_cancelled() {
                warn!(
                    "⚠️ Run cancelled, {} input rows left unprocessed",
                    total - record.index.min(total)
                );
                break;
            }

            let ctx = RowCtx::new(record.index, total);
            if done_keys.contains(record.target_url()) {
                info!("{} ↻ already processed, skipping", ctx);
                continue;
            }

            match self.flow.run(record, &ctx).await {
                RowOutcome::Done(row) => {
                    if let Err(e) = stage.reconciler.emit(&row).await {
                        error!("{} ❌ failed to write output row: {}", ctx, e);
                    }
                }
                RowOutcome::Enqueue { mode, url, row } => {
                    let pushed = accumulators.push(mode, url, row);
                    if let Some(displaced) = pushed.displaced {
                        if let Err(e) = stage.reconciler.emit(&displaced).await {
                            error!("{} ❌ failed to write output row: {}", ctx, e);
                        }
                    }
                    if let Some(batch) = pushed.ready {
                        batch_num += 1;
                        handles.push((batch_num, spawn_batch(stage, batch_num, batch)));
                    }
                }
            }
        }

        // End of input (or cancellation): flush the partial batches
        for batch in accumulators.drain() {
            batch_num += 1;
            handles.push((batch_num, spawn_batch(stage, batch_num, batch)));
        }
        handles
    }

    /// Explicit full reset: earlier output and persisted results are removed
    async fn reset(&self) -> Result<()> {
        info!(
            "🧹 Reset requested, removing {} and {}",
            self.config.output_path.display(),
            self.store.dir().display()
        );
        match tokio::fs::remove_file(&self.config.output_path).await {
            Ok(()) => {}
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => {
                return Err(e).with_context(|| {
                    format!("Unable to remove {}", self.config.output_path.display())
                })
            }
        }
        self.store.purge().await?;
        Ok(())
    }
}

fn spawn_batch(stage: &ScanStage, batch_num: usize, batch: ScanBatch) -> JoinHandle<BatchResult> {
    let stage = stage.clone();
    tokio::spawn(async move { stage.process(batch_num, batch).await })
}

//! Batch generation scheduler.
//!
//! Drives the whole pipeline: walks subset sizes from large to small,
//! dispatches bounded batches against the enrichment oracle, and tolerates
//! per-item failure without aborting the run. One failing subset costs one
//! record; sustained storage failure is the only thing that stops a run
//! early.
//!
//! Ordering guarantees: sizes strictly descending, enumerator order within a
//! size. Items inside one batch settle in any order, so nothing downstream
//! may depend on intra-batch order.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::task::JoinSet;
use tokio::time::{sleep, timeout};
use tracing::{debug, error, info, warn};
use upcycle_common::{CatalogError, Config, Material, MaterialSubset, RunSummary};

use crate::assembler;
use crate::catalog::ProjectCatalog;
use crate::combinations::SubsetStream;
use crate::oracle::EnrichmentOracle;
use crate::scoring;

/// Cooperative cancellation handle, checked at batch boundaries.
/// In-flight items are allowed to settle naturally.
#[derive(Clone, Default)]
pub struct CancellationFlag(Arc<AtomicBool>);

impl CancellationFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Settled result of one subset's trip through enrichment and persistence.
struct ItemOutcome {
    used_fallback: bool,
    insert: Result<bool, CatalogError>,
}

/// Plan the run: drain the capped enumerator, group by size (descending),
/// and keep at most `per_size_limit` subsets per size. Subsets past the
/// per-size limit still count against the enumeration cap; they are simply
/// not forwarded to enrichment.
pub fn build_plan(materials: &[Material], config: &Config) -> Vec<Vec<MaterialSubset>> {
    let generator = &config.generator;
    let stream = SubsetStream::new(
        materials,
        generator.max_subset_size,
        generator.combination_cap,
    );

    let mut plan: Vec<Vec<MaterialSubset>> = Vec::new();
    let mut current_size = 0usize;
    for subset in stream {
        if subset.len() != current_size {
            current_size = subset.len();
            plan.push(Vec::new());
        }
        if let Some(bucket) = plan.last_mut() {
            if bucket.len() < generator.per_size_limit {
                bucket.push(subset);
            }
        }
    }
    plan.retain(|bucket| !bucket.is_empty());
    plan
}

/// Score, enrich, assemble, and persist one subset. Oracle failure of any
/// kind (including timeout) routes to the deterministic fallback; only the
/// persistence result is surfaced for escalation bookkeeping.
async fn process_subset(
    subset: MaterialSubset,
    oracle: Arc<dyn EnrichmentOracle>,
    projects: Arc<dyn ProjectCatalog>,
    oracle_timeout_secs: u64,
) -> ItemOutcome {
    let score = scoring::score(&subset);

    // The HTTP client carries its own timeout; this outer guard covers
    // oracle implementations that do not.
    let guard = Duration::from_secs(oracle_timeout_secs.saturating_add(1));

    let draft = match timeout(guard, oracle.draft_project(&subset.materials, &score)).await {
        Ok(Ok(draft)) => Some(draft),
        Ok(Err(e)) => {
            warn!("Oracle draft failed for size-{} subset: {}", subset.len(), e);
            None
        }
        Err(_) => {
            warn!(
                "Oracle draft for size-{} subset timed out after {}s",
                subset.len(),
                oracle_timeout_secs
            );
            None
        }
    };

    let preview = match &draft {
        Some(draft) => match timeout(guard, oracle.render_preview(draft)).await {
            Ok(Ok(url)) => Some(url),
            Ok(Err(e)) => {
                warn!("Preview render failed, using placeholder: {}", e);
                None
            }
            Err(_) => {
                warn!("Preview render timed out, using placeholder");
                None
            }
        },
        None => None,
    };

    let used_fallback = draft.is_none();
    let project = assembler::assemble(&subset, &score, draft, preview);
    let insert = projects.insert_if_absent(&project);

    ItemOutcome {
        used_fallback,
        insert,
    }
}

/// Run one full generation pass over the given inventory snapshot.
///
/// Always returns a summary, even when every enrichment call failed: the
/// contract is best-effort catalog growth, never all-or-nothing.
pub async fn run_generation(
    materials: &[Material],
    oracle: Arc<dyn EnrichmentOracle>,
    projects: Arc<dyn ProjectCatalog>,
    config: &Config,
    cancel: CancellationFlag,
) -> RunSummary {
    let started = Instant::now();
    let generator = &config.generator;

    let plan = build_plan(materials, config);
    let planned: usize = plan.iter().map(|bucket| bucket.len()).sum();
    info!(
        "Planned {} subsets across {} sizes from {} materials (cap {}, {} per size)",
        planned,
        plan.len(),
        materials.len(),
        generator.combination_cap,
        generator.per_size_limit
    );

    let mut summary = RunSummary {
        planned,
        ..Default::default()
    };

    // Batches never span a size boundary: size order is a run invariant.
    let mut batches: Vec<Vec<MaterialSubset>> = Vec::new();
    for bucket in plan {
        for chunk in bucket.chunks(generator.batch_size) {
            batches.push(chunk.to_vec());
        }
    }

    let total_batches = batches.len();
    let mut consecutive_storage_failures = 0usize;
    let mut last_size = 0usize;

    for (index, batch) in batches.into_iter().enumerate() {
        if cancel.is_cancelled() {
            info!(
                "Cancellation requested; stopping before batch {}/{}",
                index + 1,
                total_batches
            );
            break;
        }

        let size = batch[0].len();
        if size != last_size {
            last_size = size;
            info!("Starting size-{} combinations", size);
        }

        let mut in_flight = JoinSet::new();
        for subset in batch {
            let oracle = Arc::clone(&oracle);
            let projects = Arc::clone(&projects);
            let timeout_secs = config.oracle.timeout_secs;
            in_flight.spawn(process_subset(subset, oracle, projects, timeout_secs));
        }

        // Fan-in: wait for the whole batch to settle, in any order.
        while let Some(joined) = in_flight.join_next().await {
            summary.processed += 1;
            let outcome = match joined {
                Ok(outcome) => outcome,
                Err(e) => {
                    warn!("Enrichment task failed to settle: {}", e);
                    continue;
                }
            };
            if outcome.used_fallback {
                summary.fallbacks += 1;
            }
            match outcome.insert {
                Ok(true) => {
                    summary.inserted += 1;
                    consecutive_storage_failures = 0;
                }
                Ok(false) => {
                    debug!("Project already in catalog, skipping insert");
                    consecutive_storage_failures = 0;
                }
                Err(e) => {
                    warn!("Catalog insert failed: {}", e);
                    consecutive_storage_failures += 1;
                }
            }
        }

        info!(
            "Batch {}/{} settled: {}/{} subsets processed, {:.1}s elapsed",
            index + 1,
            total_batches,
            summary.processed,
            planned,
            started.elapsed().as_secs_f32()
        );

        if consecutive_storage_failures >= generator.max_consecutive_storage_failures {
            error!(
                "{} consecutive storage failures; aborting remaining run",
                consecutive_storage_failures
            );
            summary.aborted = true;
            break;
        }

        if index + 1 < total_batches {
            sleep(Duration::from_millis(generator.inter_batch_delay_ms)).await;
        }
    }

    summary.skipped = planned - summary.processed;
    summary.elapsed_seconds = started.elapsed().as_secs_f64();
    info!(
        "Run complete: {} processed, {} inserted, {} fallbacks, {} skipped in {:.1}s",
        summary.processed,
        summary.inserted,
        summary.fallbacks,
        summary.skipped,
        summary.elapsed_seconds
    );
    summary
}

//! Bounded worker pool resolving annotation batches concurrently.

use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};

use dashmap::DashSet;
use tokio::sync::{mpsc, Mutex};
use tokio_util::{sync::CancellationToken, task::TaskTracker};
use tracing::{error, info, warn};

use super::{
    entities::Annotation,
    repositories::{StoreError, StoreHandle},
    resolver::AnnotationResolver,
};
use crate::config::ResolverSettings;

/// Errors raised while resolving a batch of annotations.
#[derive(Debug, thiserror::Error)]
pub enum ResolutionError {
    /// The scheduler no longer accepts batches.
    #[error("resolution scheduler is shut down, rejected batch from `{datasource}`")]
    ShutDown { datasource: String },
    /// Resolving one annotation failed and the batch was aborted.
    #[error("resolution of `{datasource}` aborted: {source}")]
    Task {
        datasource: String,
        #[source]
        source: StoreError,
    },
    /// A worker task panicked or was cancelled by the runtime.
    #[error("resolution worker for `{datasource}` failed: {message}")]
    Worker { datasource: String, message: String },
}

type SharedQueue = Arc<Mutex<mpsc::Receiver<Annotation>>>;

/// Resolves batches through a pool of at most `workers` tasks.
///
/// Submissions wait once `workers` annotations are queued. The first failing
/// annotation cancels the rest of its batch.
pub struct ResolutionScheduler {
    resolver: AnnotationResolver,
    workers: usize,
    shut_down: AtomicBool,
    tracker: TaskTracker,
}

impl ResolutionScheduler {
    pub fn new(resolver: AnnotationResolver, workers: usize) -> Self {
        Self {
            resolver,
            workers: workers.max(1),
            shut_down: AtomicBool::new(false),
            tracker: TaskTracker::new(),
        }
    }

    /// Builds a scheduler over `store` with the configured strategy and pool size.
    pub fn from_config(store: Arc<StoreHandle>, settings: &ResolverSettings) -> Self {
        Self::new(
            AnnotationResolver::from_strategy(store, settings.strategy),
            settings.workers,
        )
    }

    #[must_use]
    pub fn workers(&self) -> usize {
        self.workers
    }

    #[must_use]
    pub fn is_shut_down(&self) -> bool {
        self.shut_down.load(Ordering::SeqCst)
    }

    /// Resolves every annotation of a batch and returns the tagged results.
    ///
    /// Result order is unspecified. Either every annotation resolves or the
    /// whole batch fails.
    pub async fn resolve_all(
        &self,
        datasource: &str,
        annotations: Vec<Annotation>,
    ) -> Result<Vec<Annotation>, ResolutionError> {
        if self.is_shut_down() {
            warn!(datasource, "resolution_batch_rejected");
            return Err(ResolutionError::ShutDown {
                datasource: datasource.to_string(),
            });
        }
        if annotations.is_empty() {
            return Ok(Vec::new());
        }

        let submitted = annotations.len();
        let worker_count = self.workers.min(submitted);
        info!(datasource, submitted, workers = worker_count, "resolution_batch_started");

        let (sender, receiver) = mpsc::channel(self.workers);
        let queue: SharedQueue = Arc::new(Mutex::new(receiver));
        let results = Arc::new(DashSet::new());
        let cancel = CancellationToken::new();

        let handles: Vec<_> = (0..worker_count)
            .map(|_| {
                self.tracker.spawn(run_worker(
                    self.resolver.clone(),
                    Arc::clone(&queue),
                    Arc::clone(&results),
                    cancel.clone(),
                ))
            })
            .collect();
        drop(queue);

        for annotation in annotations {
            tokio::select! {
                () = cancel.cancelled() => break,
                sent = sender.send(annotation) => {
                    if sent.is_err() {
                        break;
                    }
                }
            }
        }
        drop(sender);

        let mut failure = None;
        for handle in handles {
            let outcome = match handle.await {
                Ok(Ok(())) => continue,
                Ok(Err(source)) => ResolutionError::Task {
                    datasource: datasource.to_string(),
                    source,
                },
                Err(join) => ResolutionError::Worker {
                    datasource: datasource.to_string(),
                    message: join.to_string(),
                },
            };
            cancel.cancel();
            failure.get_or_insert(outcome);
        }
        if let Some(err) = failure {
            error!(datasource, err.msg = %err, err.detail = ?err, "resolution_batch_failed");
            return Err(err);
        }

        let resolved: Vec<Annotation> = match Arc::try_unwrap(results) {
            Ok(set) => set.into_iter().collect(),
            Err(shared) => shared.iter().map(|entry| entry.key().clone()).collect(),
        };
        let kept = AnnotationResolver::filter(resolved);
        info!(datasource, submitted, kept = kept.len(), "resolution_batch_completed");
        Ok(kept)
    }

    /// Stops accepting new batches. In-flight batches run to completion.
    pub fn shutdown(&self) {
        if self.shut_down.swap(true, Ordering::SeqCst) {
            info!("resolution_scheduler_already_shut_down");
        } else {
            info!(workers = self.workers, "resolution_scheduler_shut_down");
        }
    }

    /// Waits until every worker spawned so far has finished.
    pub async fn wait_idle(&self) {
        if self.tracker.is_closed() {
            self.tracker.wait().await;
            return;
        }
        self.tracker.close();
        self.tracker.wait().await;
        self.tracker.reopen();
    }
}

async fn run_worker(
    resolver: AnnotationResolver,
    queue: SharedQueue,
    results: Arc<DashSet<Annotation>>,
    cancel: CancellationToken,
) -> Result<(), StoreError> {
    loop {
        let next = tokio::select! {
            () = cancel.cancelled() => return Ok(()),
            next = async { queue.lock().await.recv().await } => next,
        };
        let Some(annotation) = next else {
            return Ok(());
        };
        let uri = annotation.uri().clone();
        match resolver.resolve(annotation).await {
            Ok(Some(resolved)) => {
                if !results.insert(resolved) {
                    warn!(annotation = %uri, "duplicate_resolution_result");
                }
            }
            Ok(None) => {}
            Err(err) => {
                cancel.cancel();
                return Err(err);
            }
        }
    }
}

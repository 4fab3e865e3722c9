//! Render job orchestration.
//!
//! Coordinates the expensive browser-driven fetch/render pipeline with request
//! concurrency and the artifact store:
//!
//! - at most one in-flight render per normalized key: later callers join the
//!   running job through a broadcast channel and observe the same terminal
//!   outcome exactly once;
//! - a bounded browser pool: `max_concurrent` sessions run at a time, up to
//!   `queue_capacity` more wait for a slot, and anything beyond that fails
//!   fast with a capacity error instead of queuing indefinitely;
//! - hard timeouts on both external capabilities; a timed-out browser is
//!   killed by the capability implementation, never leaked;
//! - the artifact is persisted only after a successful render, and the store
//!   write itself is atomic, so a failed job leaves nothing on disk.
//!
//! Jobs run as detached tasks so a caller that disconnects mid-render cannot
//! strand the other callers joined on the same key.

use std::collections::HashMap;
use std::hash::{Hash, Hasher};
use std::sync::Arc;
use std::time::Duration;

use crediport_core::AppError;
use crediport_render::{FetchError, PdfRenderer, RenderError, ReportFetcher};
use crediport_store::{ArtifactKey, ArtifactRef, ArtifactStore};
use tokio::sync::{broadcast, Mutex, Semaphore};

const REGISTRY_SHARDS: usize = 16;

/// Cloneable terminal outcome delivered to every caller joined on a key.
#[derive(Debug, Clone)]
enum JobFailure {
    Scrape(String),
    Render(String),
    Timeout { stage: &'static str },
    Capacity,
    Storage(String),
}

type JobOutcome = Result<ArtifactRef, JobFailure>;

impl From<JobFailure> for AppError {
    fn from(failure: JobFailure) -> Self {
        match failure {
            JobFailure::Scrape(msg) => AppError::ScrapeFailed(msg),
            JobFailure::Render(msg) => AppError::RenderFailed(msg),
            JobFailure::Timeout { stage } => AppError::UpstreamTimeout {
                stage: stage.to_string(),
            },
            JobFailure::Capacity => {
                AppError::CapacityExceeded("Render queue is full, try again later".to_string())
            }
            JobFailure::Storage(msg) => AppError::Storage(msg),
        }
    }
}

/// In-flight job registry, sharded so lookups for unrelated keys never
/// contend on one lock. A key is present exactly while its job is pending or
/// running; the entry is removed before the terminal outcome is broadcast.
struct JobRegistry {
    shards: Vec<Mutex<HashMap<ArtifactKey, broadcast::Sender<JobOutcome>>>>,
}

impl JobRegistry {
    fn new() -> Self {
        Self {
            shards: (0..REGISTRY_SHARDS)
                .map(|_| Mutex::new(HashMap::new()))
                .collect(),
        }
    }

    fn shard(&self, key: &ArtifactKey) -> &Mutex<HashMap<ArtifactKey, broadcast::Sender<JobOutcome>>> {
        let mut hasher = std::collections::hash_map::DefaultHasher::new();
        key.hash(&mut hasher);
        &self.shards[(hasher.finish() as usize) % self.shards.len()]
    }

    /// Join an existing job (returning a receiver for its outcome) or
    /// register a new one (returning the sender the runner must complete).
    async fn join_or_register(
        &self,
        key: &ArtifactKey,
    ) -> JobSlot {
        let mut shard = self.shard(key).lock().await;
        if let Some(sender) = shard.get(key) {
            // Subscribing under the shard lock guarantees the runner cannot
            // remove the entry and broadcast before we are listening.
            JobSlot::Joined(sender.subscribe())
        } else {
            let (tx, rx) = broadcast::channel(1);
            shard.insert(key.clone(), tx.clone());
            JobSlot::Owner(tx, rx)
        }
    }

    /// Remove a terminal job. Called by the runner before broadcasting, so a
    /// caller that misses the entry starts a fresh job rather than joining a
    /// finished one.
    async fn remove(&self, key: &ArtifactKey) {
        self.shard(key).lock().await.remove(key);
    }
}

enum JobSlot {
    Joined(broadcast::Receiver<JobOutcome>),
    Owner(broadcast::Sender<JobOutcome>, broadcast::Receiver<JobOutcome>),
}

pub struct RenderJobOrchestrator {
    store: Arc<ArtifactStore>,
    fetcher: Arc<dyn ReportFetcher>,
    renderer: Arc<dyn PdfRenderer>,
    jobs: JobRegistry,
    /// Admission gate sized `max_concurrent + queue_capacity`: exhausted means
    /// the wait queue is full and the job fails fast with a capacity error.
    admission: Arc<Semaphore>,
    /// Browser session pool sized `max_concurrent` (minimum 1).
    browser_slots: Arc<Semaphore>,
    scrape_timeout: Duration,
    render_timeout: Duration,
}

impl RenderJobOrchestrator {
    pub fn new(
        store: Arc<ArtifactStore>,
        fetcher: Arc<dyn ReportFetcher>,
        renderer: Arc<dyn PdfRenderer>,
        max_concurrent: usize,
        queue_capacity: usize,
        scrape_timeout: Duration,
        render_timeout: Duration,
    ) -> Self {
        let max_concurrent = max_concurrent.max(1);
        Self {
            store,
            fetcher,
            renderer,
            jobs: JobRegistry::new(),
            admission: Arc::new(Semaphore::new(max_concurrent + queue_capacity)),
            browser_slots: Arc::new(Semaphore::new(max_concurrent)),
            scrape_timeout,
            render_timeout,
        }
    }

    /// Generate (or join the in-flight generation of) the artifact for a DNI.
    pub async fn generate(self: &Arc<Self>, dni: &str) -> Result<ArtifactRef, AppError> {
        let key = ArtifactKey::from_dni(dni)
            .map_err(|e| AppError::InvalidInput(e.to_string()))?;

        let mut receiver = match self.jobs.join_or_register(&key).await {
            JobSlot::Joined(rx) => {
                tracing::debug!(key = %key, "Joining in-flight render job");
                rx
            }
            JobSlot::Owner(tx, rx) => {
                let this = Arc::clone(self);
                let job_key = key.clone();
                tokio::spawn(async move {
                    let outcome = this.run_job(&job_key).await;
                    // Remove before broadcasting: late callers start fresh
                    // instead of joining a job that already finished.
                    this.jobs.remove(&job_key).await;
                    let _ = tx.send(outcome);
                });
                rx
            }
        };

        match receiver.recv().await {
            Ok(outcome) => outcome.map_err(AppError::from),
            Err(_) => Err(AppError::Internal(
                "Render job ended without reporting an outcome".to_string(),
            )),
        }
    }

    async fn run_job(&self, key: &ArtifactKey) -> JobOutcome {
        // Fail fast when the wait queue is full; no browser resource is
        // touched for rejected work.
        let _admission = match self.admission.clone().try_acquire_owned() {
            Ok(permit) => permit,
            Err(_) => {
                tracing::warn!(key = %key, "Render admission queue full");
                return Err(JobFailure::Capacity);
            }
        };

        let _slot = match self.browser_slots.clone().acquire_owned().await {
            Ok(permit) => permit,
            Err(_) => return Err(JobFailure::Capacity),
        };

        tracing::info!(key = %key, "Render job running");

        let document = match tokio::time::timeout(
            self.scrape_timeout,
            self.fetcher.fetch(key.as_str()),
        )
        .await
        {
            Err(_) => {
                tracing::warn!(key = %key, stage = "scrape", "Render job timed out");
                return Err(JobFailure::Timeout { stage: "scrape" });
            }
            Ok(Err(FetchError::Timeout(_))) => {
                return Err(JobFailure::Timeout { stage: "scrape" });
            }
            Ok(Err(e)) => {
                tracing::error!(key = %key, stage = "scrape", error = %e, "Render job failed");
                return Err(JobFailure::Scrape(e.to_string()));
            }
            Ok(Ok(document)) => document,
        };

        let pdf_bytes = match tokio::time::timeout(
            self.render_timeout,
            self.renderer.render(&document),
        )
        .await
        {
            Err(_) => {
                tracing::warn!(key = %key, stage = "render", "Render job timed out");
                return Err(JobFailure::Timeout { stage: "render" });
            }
            Ok(Err(RenderError::Timeout(_))) => {
                return Err(JobFailure::Timeout { stage: "render" });
            }
            Ok(Err(e)) => {
                tracing::error!(key = %key, stage = "render", error = %e, "Render job failed");
                return Err(JobFailure::Render(e.to_string()));
            }
            Ok(Ok(bytes)) => bytes,
        };

        match self.store.write(key, pdf_bytes).await {
            Ok(artifact) => {
                tracing::info!(
                    key = %key,
                    filename = %artifact.filename,
                    size_bytes = artifact.size_bytes,
                    "Render job succeeded"
                );
                Ok(artifact)
            }
            Err(e) => {
                tracing::error!(key = %key, stage = "persist", error = %e, "Render job failed");
                Err(JobFailure::Storage(e.to_string()))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use crediport_render::ReportDocument;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tempfile::tempdir;

    struct CountingFetcher {
        calls: AtomicUsize,
        delay: Duration,
    }

    #[async_trait]
    impl ReportFetcher for CountingFetcher {
        async fn fetch(&self, dni: &str) -> Result<ReportDocument, FetchError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            tokio::time::sleep(self.delay).await;
            Ok(ReportDocument::new(format!("<html>{}</html>", dni)))
        }
    }

    struct StaticRenderer;

    #[async_trait]
    impl PdfRenderer for StaticRenderer {
        async fn render(&self, _document: &ReportDocument) -> Result<Vec<u8>, RenderError> {
            Ok(b"%PDF-1.4 fake".to_vec())
        }
    }

    struct FailingRenderer;

    #[async_trait]
    impl PdfRenderer for FailingRenderer {
        async fn render(&self, _document: &ReportDocument) -> Result<Vec<u8>, RenderError> {
            Err(RenderError::Failed("conversion exploded".to_string()))
        }
    }

    async fn orchestrator(
        fetcher: Arc<dyn ReportFetcher>,
        renderer: Arc<dyn PdfRenderer>,
        max_concurrent: usize,
        queue_capacity: usize,
    ) -> (tempfile::TempDir, Arc<ArtifactStore>, Arc<RenderJobOrchestrator>) {
        let dir = tempdir().unwrap();
        let store = Arc::new(ArtifactStore::new(dir.path()).await.unwrap());
        let orchestrator = Arc::new(RenderJobOrchestrator::new(
            store.clone(),
            fetcher,
            renderer,
            max_concurrent,
            queue_capacity,
            Duration::from_secs(5),
            Duration::from_secs(5),
        ));
        (dir, store, orchestrator)
    }

    #[tokio::test]
    async fn test_generate_persists_artifact() {
        let fetcher = Arc::new(CountingFetcher {
            calls: AtomicUsize::new(0),
            delay: Duration::ZERO,
        });
        let (_dir, store, orchestrator) =
            orchestrator(fetcher.clone(), Arc::new(StaticRenderer), 2, 8).await;

        let artifact = orchestrator.generate("12345678").await.unwrap();
        assert_eq!(artifact.filename, "reporte_12345678.pdf");
        assert_eq!(fetcher.calls.load(Ordering::SeqCst), 1);
        assert_eq!(store.list().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_invalid_dni_fails_before_fetch() {
        let fetcher = Arc::new(CountingFetcher {
            calls: AtomicUsize::new(0),
            delay: Duration::ZERO,
        });
        let (_dir, _store, orchestrator) =
            orchestrator(fetcher.clone(), Arc::new(StaticRenderer), 2, 8).await;

        let err = orchestrator.generate("not-a-dni").await.unwrap_err();
        assert!(matches!(err, AppError::InvalidInput(_)));
        assert_eq!(fetcher.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_concurrent_same_key_runs_one_job() {
        let fetcher = Arc::new(CountingFetcher {
            calls: AtomicUsize::new(0),
            delay: Duration::from_millis(100),
        });
        let (_dir, _store, orchestrator) =
            orchestrator(fetcher.clone(), Arc::new(StaticRenderer), 4, 8).await;

        let mut handles = Vec::new();
        for _ in 0..8 {
            let orchestrator = orchestrator.clone();
            handles.push(tokio::spawn(async move {
                orchestrator.generate("12345678").await
            }));
        }

        for handle in handles {
            let artifact = handle.await.unwrap().unwrap();
            assert_eq!(artifact.filename, "reporte_12345678.pdf");
        }
        // All eight callers shared a single fetch+render sequence.
        assert_eq!(fetcher.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_fresh_job_after_terminal_outcome() {
        let fetcher = Arc::new(CountingFetcher {
            calls: AtomicUsize::new(0),
            delay: Duration::ZERO,
        });
        let (_dir, _store, orchestrator) =
            orchestrator(fetcher.clone(), Arc::new(StaticRenderer), 2, 8).await;

        orchestrator.generate("12345678").await.unwrap();
        orchestrator.generate("12345678").await.unwrap();
        // No caching of terminal results: each call ran its own job.
        assert_eq!(fetcher.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_render_failure_leaves_no_artifact() {
        let fetcher = Arc::new(CountingFetcher {
            calls: AtomicUsize::new(0),
            delay: Duration::ZERO,
        });
        let (_dir, store, orchestrator) =
            orchestrator(fetcher, Arc::new(FailingRenderer), 2, 8).await;

        let err = orchestrator.generate("12345678").await.unwrap_err();
        assert!(matches!(err, AppError::RenderFailed(_)));
        assert!(store.list().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_queue_overflow_fails_fast_with_capacity_error() {
        let fetcher = Arc::new(CountingFetcher {
            calls: AtomicUsize::new(0),
            delay: Duration::from_millis(300),
        });
        // One browser slot, no wait queue: a second concurrent key overflows.
        let (_dir, _store, orchestrator) =
            orchestrator(fetcher, Arc::new(StaticRenderer), 1, 0).await;

        let first = {
            let orchestrator = orchestrator.clone();
            tokio::spawn(async move { orchestrator.generate("11111111").await })
        };
        tokio::time::sleep(Duration::from_millis(50)).await;

        let err = orchestrator.generate("22222222").await.unwrap_err();
        assert!(matches!(err, AppError::CapacityExceeded(_)));

        first.await.unwrap().unwrap();
    }

    #[tokio::test]
    async fn test_scrape_timeout_reported_as_upstream_timeout() {
        struct SlowFetcher;

        #[async_trait]
        impl ReportFetcher for SlowFetcher {
            async fn fetch(&self, _dni: &str) -> Result<ReportDocument, FetchError> {
                tokio::time::sleep(Duration::from_secs(60)).await;
                Ok(ReportDocument::new("<html></html>"))
            }
        }

        let dir = tempdir().unwrap();
        let store = Arc::new(ArtifactStore::new(dir.path()).await.unwrap());
        let orchestrator = Arc::new(RenderJobOrchestrator::new(
            store.clone(),
            Arc::new(SlowFetcher),
            Arc::new(StaticRenderer),
            1,
            4,
            Duration::from_millis(100),
            Duration::from_secs(5),
        ));

        let err = orchestrator.generate("12345678").await.unwrap_err();
        match err {
            AppError::UpstreamTimeout { stage } => assert_eq!(stage, "scrape"),
            other => panic!("expected UpstreamTimeout, got {:?}", other),
        }
        assert!(store.list().await.unwrap().is_empty());
    }
}

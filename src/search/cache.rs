use std::{
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
    time::Duration,
};

use async_trait::async_trait;
use moka::future::Cache;
use tracing::{debug, warn};

use super::{
    pipeline::{Next, SearchStage},
    service::{SearchError, SearchRequest},
    summary::AnnotationSummary,
};
use crate::config::CacheSettings;

/// Memoises search results per normalised request.
///
/// Concurrent misses on the same key share a single downstream search, and
/// failed searches are not remembered.
pub struct CachingStage {
    cache: Cache<String, Arc<Vec<AnnotationSummary>>>,
}

impl CachingStage {
    #[must_use]
    pub fn new(settings: &CacheSettings) -> Self {
        let mut builder = Cache::builder().max_capacity(settings.max_capacity);
        if let Some(seconds) = settings.time_to_live_secs {
            builder = builder.time_to_live(Duration::from_secs(seconds));
        }
        Self {
            cache: builder.build(),
        }
    }

    /// Number of cached requests, after pending maintenance.
    pub async fn entry_count(&self) -> u64 {
        self.cache.run_pending_tasks().await;
        self.cache.entry_count()
    }

    pub fn clear(&self) {
        self.cache.invalidate_all();
    }
}

#[async_trait]
impl SearchStage for CachingStage {
    fn name(&self) -> &'static str {
        "cache"
    }

    async fn search(
        &self,
        request: &SearchRequest,
        next: Next<'_>,
    ) -> Result<Vec<AnnotationSummary>, SearchError> {
        let key = request.cache_key();
        let computed = AtomicBool::new(false);
        let outcome = self
            .cache
            .try_get_with(key.clone(), async {
                computed.store(true, Ordering::SeqCst);
                next.run(request).await.map(Arc::new)
            })
            .await;
        match outcome {
            Ok(summaries) => {
                if !computed.load(Ordering::SeqCst) {
                    debug!(key = %key, "search_cache_hit");
                }
                Ok(summaries.as_ref().clone())
            }
            Err(err) => {
                warn!(key = %key, err.msg = %err, "search_cache_miss_failed");
                Err(err.as_ref().clone())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{
        atomic::{AtomicUsize, Ordering},
        Arc,
    };

    use async_trait::async_trait;

    use super::CachingStage;
    use crate::{
        config::CacheSettings,
        search::{
            pipeline::SearchPipeline,
            service::{AnnotationSummarySearch, SearchError, SearchRequest},
            summary::AnnotationSummary,
        },
    };

    /// Counts lookups and fails for the value `broken`.
    #[derive(Default)]
    struct CountingSearch {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl AnnotationSummarySearch for CountingSearch {
        async fn search(&self, request: &SearchRequest) -> Result<Vec<AnnotationSummary>, SearchError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            match request.pattern() {
                Some("broken") => Err(SearchError::query_failure("index offline")),
                Some(pattern) => Ok(vec![AnnotationSummary::new(None, pattern).with_score(10.0)]),
                None => Ok(Vec::new()),
            }
        }
    }

    #[tokio::test]
    async fn repeated_requests_hit_the_cache() {
        let base = Arc::new(CountingSearch::default());
        let stage = Arc::new(CachingStage::new(&CacheSettings::default()));
        let pipeline = SearchPipeline::new(base.clone()).with_stage(stage.clone());

        pipeline.search(&SearchRequest::value("Liver")).await.expect("first");
        pipeline.search(&SearchRequest::value("  liver ")).await.expect("second");
        assert_eq!(base.calls.load(Ordering::SeqCst), 1);
        assert_eq!(stage.entry_count().await, 1);
    }

    #[tokio::test]
    async fn failures_are_not_cached() {
        let base = Arc::new(CountingSearch::default());
        let pipeline = SearchPipeline::new(base.clone())
            .with_stage(Arc::new(CachingStage::new(&CacheSettings::default())));

        for _ in 0..2 {
            let err = pipeline
                .search(&SearchRequest::value("broken"))
                .await
                .expect_err("failure");
            assert!(matches!(err, SearchError::QueryFailure { .. }));
        }
        assert_eq!(base.calls.load(Ordering::SeqCst), 2);
    }
}

//! # Recommendation Resolver
//!
//! One resolution path shared by every ingress:
//! 1. Normalize the product key
//! 2. Consult the local model store
//! 3. Delegate to the worker pool (when so configured)
//! 4. Fall back to the configured default answer
//!
//! `resolve` never fails: every step degrades into the next one, and the
//! terminal fallback always produces an answer.

use crate::query_log::QueryLogEntry;
use crate::recent::RecentResults;
use model_store::{ModelStore, RankingEntry, normalize_key};
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};
use worker_client::WorkerPoolClient;

/// How a node answers queries.
///
/// Deployments differ only in this choice; the surrounding ingress and
/// logging are identical.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResolutionStrategy {
    /// Answer from the local model store only (worker nodes run this)
    LocalOnly,
    /// Local model store first, then the worker pool
    DelegateToWorkers,
    /// Always answer with the configured default (smoke-test deployments)
    StaticDefault,
}

/// The terminal answer when no source produced a ranking.
///
/// Deployment-configured, not hardcoded: production nodes serve a fixed
/// low-confidence institution list, smoke-test nodes serve an explicit
/// error sentinel.
#[derive(Debug, Clone)]
pub struct FallbackAnswer {
    entries: Vec<RankingEntry>,
}

impl FallbackAnswer {
    /// The fixed low-confidence institution list.
    pub fn institutions() -> Self {
        Self {
            entries: vec![
                RankingEntry::new("UNIVERSIDAD NACIONAL DE PIURA", 0.91),
                RankingEntry::new("MINISTERIO DE EDUCACIÓN", 0.88),
                RankingEntry::new("GOBIERNO REGIONAL DE LIMA", 0.85),
            ],
        }
    }

    /// A single `{"ERROR", 0.0}` sentinel entry.
    pub fn sentinel() -> Self {
        Self {
            entries: vec![RankingEntry::new("ERROR", 0.0)],
        }
    }

    /// Any other deployment-supplied list.
    pub fn custom(entries: Vec<RankingEntry>) -> Self {
        Self { entries }
    }

    pub fn entries(&self) -> Vec<RankingEntry> {
        self.entries.clone()
    }
}

/// Resolves product queries against the store, the worker pool and the
/// fallback, in that order.
#[derive(Clone)]
pub struct Resolver {
    store: Arc<dyn ModelStore>,
    workers: Option<WorkerPoolClient>,
    strategy: ResolutionStrategy,
    fallback: FallbackAnswer,
    recent: Arc<RecentResults>,
}

impl Resolver {
    pub fn new(
        store: Arc<dyn ModelStore>,
        strategy: ResolutionStrategy,
        fallback: FallbackAnswer,
    ) -> Self {
        Self {
            store,
            workers: None,
            strategy,
            fallback,
            recent: Arc::new(RecentResults::new()),
        }
    }

    /// Attach the worker pool used by [`ResolutionStrategy::DelegateToWorkers`].
    pub fn with_workers(mut self, workers: WorkerPoolClient) -> Self {
        self.workers = Some(workers);
        self
    }

    /// Share an externally owned recent-results buffer (the HTTP status
    /// endpoint reads it).
    pub fn with_recent(mut self, recent: Arc<RecentResults>) -> Self {
        self.recent = recent;
        self
    }

    pub fn recent(&self) -> Arc<RecentResults> {
        self.recent.clone()
    }

    /// Resolve `producto` into a ranking. Always succeeds.
    #[instrument(skip(self))]
    pub async fn resolve(&self, producto: &str) -> Vec<RankingEntry> {
        let key = normalize_key(producto);
        let resultados = self.resolve_key(&key).await;
        self.recent
            .record(QueryLogEntry::new(producto, resultados.clone()));
        resultados
    }

    async fn resolve_key(&self, key: &str) -> Vec<RankingEntry> {
        if self.strategy == ResolutionStrategy::StaticDefault {
            return self.fallback.entries();
        }

        if let Some(ranking) = self.store.get(key).await {
            if !ranking.is_empty() {
                debug!("Resolved '{}' from the local model store", key);
                return ranking;
            }
        }

        if self.strategy == ResolutionStrategy::DelegateToWorkers {
            if let Some(workers) = &self.workers {
                match workers.dispatch(key).await {
                    Ok(ranking) if !ranking.is_empty() => {
                        debug!("Resolved '{}' via the worker pool", key);
                        return ranking;
                    }
                    Ok(_) => debug!("Worker pool had no result for '{}'", key),
                    Err(e) => warn!("Worker dispatch for '{}' failed: {}", key, e),
                }
            }
        }

        info!("Serving default answer for '{}'", key);
        self.fallback.entries()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use model_store::InMemoryModelStore;
    use std::time::Duration;
    use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
    use tokio::net::TcpListener;
    use worker_client::WorkerEndpoint;

    fn ranking() -> Vec<RankingEntry> {
        vec![
            RankingEntry::new("MINISTERIO DE EDUCACIÓN", 0.7),
            RankingEntry::new("GOBIERNO REGIONAL DE LIMA", 0.3),
        ]
    }

    async fn store_with(key: &str, value: Vec<RankingEntry>) -> Arc<InMemoryModelStore> {
        let store = Arc::new(InMemoryModelStore::new());
        store
            .set(key, value, Duration::from_secs(3600))
            .await
            .unwrap();
        store
    }

    /// Mock worker speaking the line protocol, answering with `response`.
    async fn start_mock_worker(response: &'static str) -> String {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap().to_string();
        tokio::spawn(async move {
            while let Ok((mut socket, _)) = listener.accept().await {
                tokio::spawn(async move {
                    let (reader, mut writer) = socket.split();
                    let mut lines = BufReader::new(reader).lines();
                    while let Ok(Some(_)) = lines.next_line().await {
                        let _ = writer.write_all(response.as_bytes()).await;
                        let _ = writer.write_all(b"\n").await;
                    }
                });
            }
        });
        addr
    }

    #[tokio::test]
    async fn test_store_hit_short_circuits() {
        let store = store_with("laptop", ranking()).await;
        let resolver = Resolver::new(
            store,
            ResolutionStrategy::LocalOnly,
            FallbackAnswer::sentinel(),
        );

        let resultados = resolver.resolve("LAPTOP").await;
        assert_eq!(resultados, ranking());
    }

    #[tokio::test]
    async fn test_lookup_is_normalized() {
        let store = store_with("computadoras portátiles", ranking()).await;
        let resolver = Resolver::new(
            store,
            ResolutionStrategy::LocalOnly,
            FallbackAnswer::sentinel(),
        );

        let resultados = resolver.resolve("  COMPUTADORAS PORTÁTILES ").await;
        assert_eq!(resultados, ranking());
    }

    #[tokio::test]
    async fn test_miss_without_workers_serves_fallback() {
        let store = Arc::new(InMemoryModelStore::new());
        let resolver = Resolver::new(
            store,
            ResolutionStrategy::LocalOnly,
            FallbackAnswer::institutions(),
        );

        let resultados = resolver.resolve("nunca visto").await;
        assert_eq!(resultados, FallbackAnswer::institutions().entries());
    }

    #[tokio::test]
    async fn test_empty_stored_ranking_counts_as_miss() {
        let store = store_with("laptop", Vec::new()).await;
        let resolver = Resolver::new(
            store,
            ResolutionStrategy::LocalOnly,
            FallbackAnswer::sentinel(),
        );

        let resultados = resolver.resolve("laptop").await;
        assert_eq!(resultados, FallbackAnswer::sentinel().entries());
    }

    #[tokio::test]
    async fn test_delegation_fills_store_miss() {
        let worker = start_mock_worker(r#"[{"entidad":"X","score":0.9}]"#).await;
        let store = Arc::new(InMemoryModelStore::new());
        let resolver = Resolver::new(
            store,
            ResolutionStrategy::DelegateToWorkers,
            FallbackAnswer::sentinel(),
        )
        .with_workers(WorkerPoolClient::new(vec![WorkerEndpoint::new(worker)]));

        let resultados = resolver.resolve("laptop").await;
        assert_eq!(resultados, vec![RankingEntry::new("X", 0.9)]);
    }

    #[tokio::test]
    async fn test_exhausted_pool_degrades_to_fallback() {
        let store = Arc::new(InMemoryModelStore::new());
        let resolver = Resolver::new(
            store,
            ResolutionStrategy::DelegateToWorkers,
            FallbackAnswer::institutions(),
        )
        .with_workers(
            WorkerPoolClient::new(vec![WorkerEndpoint::new("127.0.0.1:1")])
                .with_attempt_timeout(Duration::from_millis(100)),
        );

        let resultados = resolver.resolve("laptop").await;
        assert_eq!(
            resultados,
            FallbackAnswer::institutions().entries(),
            "no-worker-available never propagates to the caller"
        );
    }

    #[tokio::test]
    async fn test_empty_worker_answer_degrades_to_fallback() {
        let worker = start_mock_worker("[]").await;
        let store = Arc::new(InMemoryModelStore::new());
        let resolver = Resolver::new(
            store,
            ResolutionStrategy::DelegateToWorkers,
            FallbackAnswer::sentinel(),
        )
        .with_workers(WorkerPoolClient::new(vec![WorkerEndpoint::new(worker)]));

        let resultados = resolver.resolve("laptop").await;
        assert_eq!(resultados, FallbackAnswer::sentinel().entries());
    }

    #[tokio::test]
    async fn test_static_default_never_touches_store() {
        let store = store_with("laptop", ranking()).await;
        let resolver = Resolver::new(
            store,
            ResolutionStrategy::StaticDefault,
            FallbackAnswer::sentinel(),
        );

        let resultados = resolver.resolve("laptop").await;
        assert_eq!(resultados, FallbackAnswer::sentinel().entries());
    }

    #[tokio::test]
    async fn test_every_resolution_lands_in_recent() {
        let store = Arc::new(InMemoryModelStore::new());
        let resolver = Resolver::new(
            store,
            ResolutionStrategy::LocalOnly,
            FallbackAnswer::sentinel(),
        );

        resolver.resolve("LAPTOP").await;
        resolver.resolve("PAPEL").await;

        let snapshot = resolver.recent().snapshot();
        assert_eq!(snapshot.len(), 2);
        assert_eq!(snapshot[0].producto, "PAPEL");
        assert_eq!(snapshot[1].producto, "LAPTOP");
    }
}

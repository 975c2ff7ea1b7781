//! Worker pool client for delegating queries to remote worker nodes.
//!
//! Each worker holds an independent copy of the model store and answers the
//! same line-delimited JSON protocol the main node serves:
//! - request frame: one JSON object `{"producto": <string>}` plus `\n`
//! - response frame: one JSON array of `{"entidad": <string>, "score":
//!   <float>}` plus `\n`; `[]` signals "no result"
//!
//! Dispatch is serial failover, not parallel fan-out: endpoints are tried in
//! their configured priority order, each under its own deadline, and the
//! first successfully parsed response wins. Later endpoints are never tried.

use model_store::RankingEntry;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;
use thiserror::Error;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::TcpStream;
use tokio::time::timeout;
use tracing::{debug, warn};

/// Deadline for one connect + query + read attempt against one worker.
pub const DEFAULT_ATTEMPT_TIMEOUT: Duration = Duration::from_secs(2);

/// One query frame on the wire.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueryFrame {
    pub producto: String,
}

impl QueryFrame {
    pub fn new(producto: impl Into<String>) -> Self {
        Self {
            producto: producto.into(),
        }
    }
}

/// A statically configured worker address. List order defines failover
/// priority; this is not a load-balancing set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkerEndpoint {
    pub address: String,
}

impl WorkerEndpoint {
    pub fn new(address: impl Into<String>) -> Self {
        Self {
            address: address.into(),
        }
    }
}

impl fmt::Display for WorkerEndpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.address)
    }
}

/// Errors that can occur when dispatching to the worker pool
#[derive(Error, Debug)]
pub enum WorkerError {
    /// One endpoint failed (connect, write, read or parse); dispatch logs
    /// this and moves on to the next endpoint
    #[error("Worker {addr} failed: {reason}")]
    Endpoint { addr: String, reason: String },

    /// Every configured endpoint failed
    #[error("No worker available after trying {attempted} endpoint(s)")]
    NoWorkerAvailable { attempted: usize },
}

/// Client for the worker pool.
///
/// Holds the ordered endpoint list and the per-attempt deadline; cheap to
/// clone into connection handlers.
#[derive(Debug, Clone)]
pub struct WorkerPoolClient {
    endpoints: Vec<WorkerEndpoint>,
    attempt_timeout: Duration,
}

impl WorkerPoolClient {
    pub fn new(endpoints: Vec<WorkerEndpoint>) -> Self {
        Self {
            endpoints,
            attempt_timeout: DEFAULT_ATTEMPT_TIMEOUT,
        }
    }

    /// Configure the per-attempt deadline (default: 2 s).
    ///
    /// One unreachable worker must not stall the whole failover chain, so
    /// every attempt is bounded even though the protocol itself carries no
    /// deadline.
    pub fn with_attempt_timeout(mut self, attempt_timeout: Duration) -> Self {
        self.attempt_timeout = attempt_timeout;
        self
    }

    pub fn endpoints(&self) -> &[WorkerEndpoint] {
        &self.endpoints
    }

    pub fn is_empty(&self) -> bool {
        self.endpoints.is_empty()
    }

    /// Ask the pool for the ranking of `producto`.
    ///
    /// Iterates the endpoint list in fixed order; the first successfully
    /// parsed response frame is returned immediately (an empty array is a
    /// valid "no result" answer). When the list is exhausted the typed
    /// terminal error is returned and the caller substitutes its default.
    pub async fn dispatch(&self, producto: &str) -> Result<Vec<RankingEntry>, WorkerError> {
        for endpoint in &self.endpoints {
            match timeout(self.attempt_timeout, self.query_endpoint(endpoint, producto)).await {
                Ok(Ok(ranking)) => {
                    debug!(
                        "Worker {} answered '{}' with {} entries",
                        endpoint,
                        producto,
                        ranking.len()
                    );
                    return Ok(ranking);
                }
                Ok(Err(e)) => warn!("{}; trying next endpoint", e),
                Err(_) => warn!(
                    "Worker {} timed out after {:?}; trying next endpoint",
                    endpoint, self.attempt_timeout
                ),
            }
        }

        Err(WorkerError::NoWorkerAvailable {
            attempted: self.endpoints.len(),
        })
    }

    /// One connect / one request frame / one response frame. No retry.
    async fn query_endpoint(
        &self,
        endpoint: &WorkerEndpoint,
        producto: &str,
    ) -> Result<Vec<RankingEntry>, WorkerError> {
        let fail = |reason: String| WorkerError::Endpoint {
            addr: endpoint.address.clone(),
            reason,
        };

        let mut stream = TcpStream::connect(&endpoint.address)
            .await
            .map_err(|e| fail(format!("connect: {}", e)))?;

        let frame = serde_json::to_string(&QueryFrame::new(producto))
            .map_err(|e| fail(format!("encode request: {}", e)))?;
        stream
            .write_all(frame.as_bytes())
            .await
            .map_err(|e| fail(format!("write: {}", e)))?;
        stream
            .write_all(b"\n")
            .await
            .map_err(|e| fail(format!("write: {}", e)))?;

        let mut reader = BufReader::new(stream);
        let mut line = String::new();
        let read = reader
            .read_line(&mut line)
            .await
            .map_err(|e| fail(format!("read: {}", e)))?;
        if read == 0 {
            return Err(fail("connection closed before response".to_string()));
        }

        serde_json::from_str(line.trim())
            .map_err(|e| fail(format!("invalid response frame: {}", e)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::net::TcpListener;

    /// Start a mock worker that answers every request line with `response`.
    async fn start_mock_worker(response: &'static str) -> String {
        let listener = TcpListener::bind("127.0.0.1:0")
            .await
            .expect("bind mock worker");
        let addr = listener.local_addr().expect("local addr").to_string();

        tokio::spawn(async move {
            loop {
                let (mut socket, _) = match listener.accept().await {
                    Ok(conn) => conn,
                    Err(_) => break,
                };
                tokio::spawn(async move {
                    let (reader, mut writer) = socket.split();
                    let mut lines = BufReader::new(reader).lines();
                    while let Ok(Some(_)) = lines.next_line().await {
                        if writer.write_all(response.as_bytes()).await.is_err() {
                            break;
                        }
                        if writer.write_all(b"\n").await.is_err() {
                            break;
                        }
                    }
                });
            }
        });

        addr
    }

    /// An address nothing listens on (bound, then immediately released).
    async fn dead_address() -> String {
        let listener = TcpListener::bind("127.0.0.1:0")
            .await
            .expect("bind probe");
        let addr = listener.local_addr().expect("local addr").to_string();
        drop(listener);
        addr
    }

    /// A worker that accepts connections but never answers.
    async fn start_hung_worker() -> String {
        let listener = TcpListener::bind("127.0.0.1:0")
            .await
            .expect("bind hung worker");
        let addr = listener.local_addr().expect("local addr").to_string();
        tokio::spawn(async move {
            let mut held = Vec::new();
            loop {
                match listener.accept().await {
                    Ok((socket, _)) => held.push(socket),
                    Err(_) => break,
                }
            }
        });
        addr
    }

    #[tokio::test]
    async fn test_failover_skips_dead_endpoint() {
        let dead = dead_address().await;
        let alive = start_mock_worker(r#"[{"entidad":"X","score":0.9}]"#).await;

        let client = WorkerPoolClient::new(vec![
            WorkerEndpoint::new(dead),
            WorkerEndpoint::new(alive),
        ]);

        let ranking = client.dispatch("x").await.expect("failover succeeds");
        assert_eq!(ranking, vec![RankingEntry::new("X", 0.9)]);
    }

    #[tokio::test]
    async fn test_all_endpoints_down_signals_no_worker() {
        let client = WorkerPoolClient::new(vec![
            WorkerEndpoint::new(dead_address().await),
            WorkerEndpoint::new(dead_address().await),
        ]);

        let err = client.dispatch("x").await.unwrap_err();
        assert!(matches!(err, WorkerError::NoWorkerAvailable { attempted: 2 }));
    }

    #[tokio::test]
    async fn test_first_endpoint_has_priority() {
        let first = start_mock_worker(r#"[{"entidad":"FIRST","score":0.8}]"#).await;
        let second = start_mock_worker(r#"[{"entidad":"SECOND","score":0.7}]"#).await;

        let client = WorkerPoolClient::new(vec![
            WorkerEndpoint::new(first),
            WorkerEndpoint::new(second),
        ]);

        let ranking = client.dispatch("x").await.unwrap();
        assert_eq!(ranking[0].entidad, "FIRST", "later endpoints are never tried");
    }

    #[tokio::test]
    async fn test_unparsable_response_falls_over() {
        let broken = start_mock_worker("not-json").await;
        let alive = start_mock_worker(r#"[{"entidad":"X","score":0.9}]"#).await;

        let client = WorkerPoolClient::new(vec![
            WorkerEndpoint::new(broken),
            WorkerEndpoint::new(alive),
        ]);

        let ranking = client.dispatch("x").await.unwrap();
        assert_eq!(ranking[0].entidad, "X");
    }

    #[tokio::test]
    async fn test_hung_worker_is_bounded_by_deadline() {
        let hung = start_hung_worker().await;
        let alive = start_mock_worker(r#"[{"entidad":"X","score":0.9}]"#).await;

        let client = WorkerPoolClient::new(vec![
            WorkerEndpoint::new(hung),
            WorkerEndpoint::new(alive),
        ])
        .with_attempt_timeout(Duration::from_millis(100));

        let ranking = client.dispatch("x").await.unwrap();
        assert_eq!(ranking[0].entidad, "X", "the deadline unsticks the chain");
    }

    #[tokio::test]
    async fn test_empty_array_is_a_valid_answer() {
        let empty = start_mock_worker("[]").await;
        let client = WorkerPoolClient::new(vec![WorkerEndpoint::new(empty)]);

        let ranking = client.dispatch("x").await.unwrap();
        assert!(ranking.is_empty(), "[] means no result, not an error");
    }

    #[tokio::test]
    async fn test_no_endpoints_configured() {
        let client = WorkerPoolClient::new(Vec::new());
        let err = client.dispatch("x").await.unwrap_err();
        assert!(matches!(err, WorkerError::NoWorkerAvailable { attempted: 0 }));
    }
}

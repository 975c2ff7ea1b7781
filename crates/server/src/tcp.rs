//! Line-oriented TCP ingress.
//!
//! One task per accepted connection; within a connection, frames are
//! processed strictly in arrival order. A malformed frame is logged and
//! skipped; the connection stays open for the next line. The connection
//! ends when the peer closes it or a read fails.

use crate::query_log::{PersistencePolicy, QueryLog, QueryLogEntry};
use crate::resolver::Resolver;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::{TcpListener, TcpStream};
use tracing::{debug, info, warn};
use worker_client::QueryFrame;

/// The persistent TCP query listener.
///
/// Serves the same frames the worker protocol uses, so a main node is
/// queryable by peers and ad-hoc clients alike.
pub struct TcpIngress {
    resolver: Resolver,
    query_log: Arc<dyn QueryLog>,
}

impl TcpIngress {
    /// This ingress answers before persisting: by the time the query log is
    /// written the response frame is already on the wire, so a persistence
    /// failure is logged and swallowed (fail-open).
    pub const PERSISTENCE_POLICY: PersistencePolicy = PersistencePolicy::RespondThenLog;

    pub fn new(resolver: Resolver, query_log: Arc<dyn QueryLog>) -> Self {
        Self {
            resolver,
            query_log,
        }
    }

    /// Accept connections forever, one handling task each.
    ///
    /// The listener is bound by the caller; failing to bind it is the one
    /// fatal startup condition of this ingress.
    pub async fn serve(self: Arc<Self>, listener: TcpListener) {
        if let Ok(addr) = listener.local_addr() {
            info!("TCP ingress listening on {}", addr);
        }
        loop {
            match listener.accept().await {
                Ok((stream, peer)) => {
                    debug!("Accepted TCP connection from {}", peer);
                    let ingress = self.clone();
                    tokio::spawn(async move {
                        ingress.handle_connection(stream).await;
                    });
                }
                Err(e) => warn!("Failed to accept TCP connection: {}", e),
            }
        }
    }

    /// Serve one connection until EOF or a dead socket.
    pub async fn handle_connection(&self, stream: TcpStream) {
        let peer = stream
            .peer_addr()
            .map(|a| a.to_string())
            .unwrap_or_else(|_| "<unknown>".to_string());
        let (reader, mut writer) = stream.into_split();
        let mut lines = BufReader::new(reader).lines();

        while let Ok(Some(line)) = lines.next_line().await {
            let frame: QueryFrame = match serde_json::from_str(&line) {
                Ok(frame) => frame,
                Err(e) => {
                    warn!("Ignoring malformed query frame from {}: {}", peer, e);
                    continue;
                }
            };

            info!("TCP query from {}: {}", peer, frame.producto);
            let resultados = self.resolver.resolve(&frame.producto).await;

            let payload = match serde_json::to_string(&resultados) {
                Ok(payload) => payload,
                Err(e) => {
                    warn!("Failed to encode response frame: {}", e);
                    continue;
                }
            };
            if writer.write_all(payload.as_bytes()).await.is_err()
                || writer.write_all(b"\n").await.is_err()
            {
                debug!("Connection to {} lost mid-response", peer);
                break;
            }

            // Respond-then-log: the answer is already on the wire.
            let entry = QueryLogEntry::new(&frame.producto, resultados);
            if let Err(e) = self.query_log.append(entry).await {
                warn!("Failed to persist TCP query log entry: {}", e);
            }
        }

        debug!("Connection from {} closed", peer);
    }
}

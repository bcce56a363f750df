//! Fan-out list retrieval: one spawned task per requested kind, each delivering
//! a single (items, error) pair through a one-shot slot.

use std::sync::Arc;
use std::time::Instant;

use kdash_core::ResourceKind;
use serde::de::DeserializeOwned;
use tokio::sync::oneshot;
use tracing::{debug, info};

use crate::client::{ClusterClient, ClusterError, NamespaceQuery};
use crate::errors::{RetrievalError, Role};

/// Outcome of one retrieval. `items` may be non-empty alongside a (degraded) error.
#[derive(Debug)]
pub struct Fetched<K> {
    pub kind: ResourceKind,
    pub items: Vec<K>,
    pub error: Option<RetrievalError>,
}

/// Pending retrieval. Consumed by [`ListHandle::wait`], so it is read at most once.
#[derive(Debug)]
pub struct ListHandle<K> {
    kind: ResourceKind,
    role: Role,
    rx: oneshot::Receiver<Fetched<K>>,
}

impl<K> ListHandle<K> {
    pub fn kind(&self) -> ResourceKind { self.kind }

    pub fn role(&self) -> Role { self.role }

    /// Wait for the retrieval to finish. A task that died without answering
    /// reports a transport error.
    pub async fn wait(self) -> Fetched<K> {
        match self.rx.await {
            Ok(fetched) => fetched,
            Err(_) => Fetched {
                kind: self.kind,
                items: Vec::new(),
                error: Some(RetrievalError::new(
                    self.kind,
                    self.role,
                    ClusterError::Transport("retrieval task ended without a result".into()),
                )),
            },
        }
    }
}

/// Start listing `kind` in the background and return its handle. Must be called
/// inside a tokio runtime. No retries; failures come back through the handle.
pub fn spawn_list<K>(client: Arc<dyn ClusterClient>, kind: ResourceKind, namespaces: NamespaceQuery, role: Role) -> ListHandle<K>
where
    K: DeserializeOwned + Send + 'static,
{
    let (tx, rx) = oneshot::channel();
    tokio::spawn(async move {
        let t0 = Instant::now();
        let (items, error) = fetch_typed::<K>(client.as_ref(), kind, &namespaces).await;
        let took_ms = t0.elapsed().as_millis() as u64;
        metrics::counter!("kdash_fetch_total", 1, "kind" => kind.to_string());
        metrics::histogram!("kdash_fetch_duration_ms", took_ms as f64, "kind" => kind.to_string());
        match &error {
            None => debug!(%kind, role = ?role, count = items.len(), took_ms, "fetch: list ok"),
            Some(e) => {
                metrics::counter!("kdash_fetch_errors_total", 1, "kind" => kind.to_string(), "reason" => e.reason());
                info!(%kind, role = ?role, count = items.len(), error = %e, took_ms, "fetch: list failed");
            }
        }
        let fetched = Fetched { kind, items, error: error.map(|e| RetrievalError::new(kind, role, e)) };
        // Receiver gone means the request was abandoned.
        let _ = tx.send(fetched);
    });
    ListHandle { kind, role, rx }
}

/// Like [`spawn_list`], but a namespaced kind scoped to several namespaces gets one
/// retrieval per namespace, in namespace order.
pub fn spawn_lists<K>(client: Arc<dyn ClusterClient>, kind: ResourceKind, namespaces: &NamespaceQuery, role: Role) -> Vec<ListHandle<K>>
where
    K: DeserializeOwned + Send + 'static,
{
    if !kind.namespaced() {
        return vec![spawn_list(client, kind, NamespaceQuery::all(), role)];
    }
    namespaces.split().into_iter().map(|ns| spawn_list(client.clone(), kind, ns, role)).collect()
}

/// List and decode. Items that fail to decode are dropped; if some decoded the
/// result is degraded, if none did it is a decode error.
async fn fetch_typed<K: DeserializeOwned>(
    client: &dyn ClusterClient,
    kind: ResourceKind,
    namespaces: &NamespaceQuery,
) -> (Vec<K>, Option<ClusterError>) {
    let raw = match client.list(kind, namespaces.request_namespace()).await {
        Ok(raw) => raw,
        Err(e) => return (Vec::new(), Some(e)),
    };
    let scoped = raw.into_iter().filter(|v| {
        !kind.namespaced() || namespaces.matches(v.pointer("/metadata/namespace").and_then(|n| n.as_str()))
    });
    let mut items = Vec::new();
    let mut failed = 0usize;
    let mut first_err: Option<String> = None;
    for v in scoped {
        match serde_json::from_value::<K>(v) {
            Ok(item) => items.push(item),
            Err(e) => {
                failed += 1;
                first_err.get_or_insert_with(|| e.to_string());
            }
        }
    }
    let error = match (failed, first_err) {
        (0, _) | (_, None) => None,
        (n, Some(msg)) if items.is_empty() => Some(ClusterError::Decode(format!("{n} {kind} item(s): {msg}"))),
        (n, Some(msg)) => Some(ClusterError::Degraded(format!("dropped {n} undecodable {kind} item(s): {msg}"))),
    };
    (items, error)
}

//! Cluster client boundary: one list call per resource kind.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use kdash_core::ResourceKind;
use kube::{
    api::{Api, ListParams},
    core::{ApiResource, DynamicObject, GroupVersionKind},
    Client, Config,
};
use tracing::debug;

/// Failure of a single list call.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ClusterError {
    #[error("unauthorized: {0}")]
    Unauthorized(String),
    #[error("forbidden: {0}")]
    Forbidden(String),
    #[error("not found: {0}")]
    NotFound(String),
    #[error("api error {code}: {message}")]
    Api { code: u16, message: String },
    #[error("transport: {0}")]
    Transport(String),
    #[error("decode: {0}")]
    Decode(String),
    #[error("unsupported: {0}")]
    Unsupported(String),
    /// The list came back, but not all of it was usable.
    #[error("degraded: {0}")]
    Degraded(String),
}

impl ClusterError {
    pub fn from_status(code: u16, message: impl Into<String>) -> Self {
        let message = message.into();
        match code {
            401 => ClusterError::Unauthorized(message),
            403 => ClusterError::Forbidden(message),
            404 => ClusterError::NotFound(message),
            _ => ClusterError::Api { code, message },
        }
    }

    pub fn status(&self) -> Option<u16> {
        match self {
            ClusterError::Unauthorized(_) => Some(401),
            ClusterError::Forbidden(_) => Some(403),
            ClusterError::NotFound(_) => Some(404),
            ClusterError::Api { code, .. } => Some(*code),
            _ => None,
        }
    }

    pub fn reason(&self) -> &'static str {
        match self {
            ClusterError::Unauthorized(_) => "Unauthorized",
            ClusterError::Forbidden(_) => "Forbidden",
            ClusterError::NotFound(_) => "NotFound",
            ClusterError::Api { .. } => "ApiError",
            ClusterError::Transport(_) => "TransportError",
            ClusterError::Decode(_) => "DecodeError",
            ClusterError::Unsupported(_) => "Unsupported",
            ClusterError::Degraded(_) => "Degraded",
        }
    }
}

impl From<kube::Error> for ClusterError {
    fn from(e: kube::Error) -> Self {
        match e {
            kube::Error::Api(resp) => ClusterError::from_status(resp.code, resp.message),
            other => ClusterError::Transport(other.to_string()),
        }
    }
}

/// Namespaces a list is scoped to. Empty means all namespaces.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NamespaceQuery {
    namespaces: Vec<String>,
}

impl NamespaceQuery {
    pub fn all() -> Self { Self::default() }

    pub fn new<I, S>(namespaces: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut namespaces: Vec<String> = namespaces.into_iter().map(Into::into).filter(|s| !s.is_empty()).collect();
        namespaces.sort();
        namespaces.dedup();
        Self { namespaces }
    }

    pub fn is_all(&self) -> bool { self.namespaces.is_empty() }

    /// One query per selected namespace, or `self` when at most one is selected.
    pub fn split(&self) -> Vec<NamespaceQuery> {
        if self.namespaces.len() <= 1 {
            return vec![self.clone()];
        }
        self.namespaces.iter().map(|ns| NamespaceQuery { namespaces: vec![ns.clone()] }).collect()
    }

    /// Namespace to put on the request: only when exactly one is selected.
    pub fn request_namespace(&self) -> Option<&str> {
        match self.namespaces.as_slice() {
            [only] => Some(only.as_str()),
            _ => None,
        }
    }

    pub fn matches(&self, namespace: Option<&str>) -> bool {
        self.is_all() || namespace.map(|ns| self.namespaces.iter().any(|n| n == ns)).unwrap_or(false)
    }
}

/// The only call the list pipeline makes against a cluster.
#[async_trait::async_trait]
pub trait ClusterClient: Send + Sync {
    /// List raw objects of `kind`, in `namespace` when given and the kind is namespaced.
    async fn list(&self, kind: ResourceKind, namespace: Option<&str>) -> Result<Vec<serde_json::Value>, ClusterError>;
}

fn strip_managed_fields(v: &mut serde_json::Value) {
    if let Some(meta) = v.get_mut("metadata") {
        if let Some(obj) = meta.as_object_mut() {
            obj.remove("managedFields");
        }
    }
}

/// [`ClusterClient`] backed by kube-rs.
#[derive(Clone)]
pub struct KubeClient {
    client: Client,
}

impl KubeClient {
    pub fn new(client: Client) -> Self { Self { client } }

    /// Infer config from kubeconfig / in-cluster env. `read_timeout` bounds each call;
    /// without it a hung list blocks its request.
    pub async fn infer(read_timeout: Option<Duration>) -> Result<Self, ClusterError> {
        let mut config = Config::infer().await.map_err(|e| ClusterError::Transport(e.to_string()))?;
        if read_timeout.is_some() {
            config.read_timeout = read_timeout;
        }
        let client = Client::try_from(config)?;
        Ok(Self { client })
    }

    fn api_for(&self, kind: ResourceKind, namespace: Option<&str>) -> Api<DynamicObject> {
        let info = kind.info();
        let gvk = GroupVersionKind::gvk(info.group, info.version, info.kind);
        let ar = ApiResource::from_gvk_with_plural(&gvk, info.plural);
        match (info.namespaced, namespace) {
            (true, Some(ns)) => Api::namespaced_with(self.client.clone(), ns, &ar),
            _ => Api::all_with(self.client.clone(), &ar),
        }
    }
}

#[async_trait::async_trait]
impl ClusterClient for KubeClient {
    async fn list(&self, kind: ResourceKind, namespace: Option<&str>) -> Result<Vec<serde_json::Value>, ClusterError> {
        let api = self.api_for(kind, namespace);
        let list = api.list(&ListParams::default()).await?;
        debug!(%kind, ns = ?namespace, count = list.items.len(), "kube: list");
        list.items
            .iter()
            .map(|o| {
                let mut raw = serde_json::to_value(o).map_err(|e| ClusterError::Decode(e.to_string()))?;
                strip_managed_fields(&mut raw);
                Ok(raw)
            })
            .collect()
    }
}

// ----------------- Mock implementation -----------------

/// In-memory cluster with canned list results per kind, for tests and demos.
/// Kinds without a fixture list as empty.
#[derive(Clone, Default)]
pub struct MockCluster {
    lists: HashMap<ResourceKind, Result<Vec<serde_json::Value>, ClusterError>>,
    delays: HashMap<ResourceKind, Duration>,
    calls: Arc<Mutex<Vec<(ResourceKind, Option<String>)>>>,
}

impl MockCluster {
    pub fn new() -> Self { Self::default() }

    pub fn with_list(mut self, kind: ResourceKind, items: Vec<serde_json::Value>) -> Self {
        self.lists.insert(kind, Ok(items));
        self
    }

    pub fn with_error(mut self, kind: ResourceKind, err: ClusterError) -> Self {
        self.lists.insert(kind, Err(err));
        self
    }

    pub fn with_delay(mut self, kind: ResourceKind, delay: Duration) -> Self {
        self.delays.insert(kind, delay);
        self
    }

    /// `(kind, namespace)` of every list call so far.
    pub fn calls(&self) -> Vec<(ResourceKind, Option<String>)> {
        self.calls.lock().map(|c| c.clone()).unwrap_or_default()
    }
}

#[async_trait::async_trait]
impl ClusterClient for MockCluster {
    async fn list(&self, kind: ResourceKind, namespace: Option<&str>) -> Result<Vec<serde_json::Value>, ClusterError> {
        if let Ok(mut calls) = self.calls.lock() {
            calls.push((kind, namespace.map(str::to_string)));
        }
        if let Some(d) = self.delays.get(&kind) {
            tokio::time::sleep(*d).await;
        }
        match self.lists.get(&kind) {
            Some(Ok(items)) => Ok(items
                .iter()
                .filter(|v| match (kind.namespaced(), namespace) {
                    (true, Some(ns)) => v.pointer("/metadata/namespace").and_then(|n| n.as_str()) == Some(ns),
                    _ => true,
                })
                .cloned()
                .collect()),
            Some(Err(e)) => Err(e.clone()),
            None => Ok(Vec::new()),
        }
    }
}

//! kdash public API façade (in-process).
//!
//! Frontends (the CLI today) depend on [`ListApi`]; [`InProcApi`] answers it by running
//! the per-kind list functions against a [`ClusterClient`].

#![forbid(unsafe_code)]

pub mod error;
pub mod list;
pub mod resource;

use std::sync::Arc;
use std::time::{Duration, Instant};

use kdash_core::ResourceKind;
use kdash_dataselect::DataSelectQuery;
use kdash_kubehub::{ClusterClient, KubeClient, NamespaceQuery};
use serde::Serialize;
use tracing::info;

pub use error::{DashError, DashResult};
pub use list::ResourceList;
pub use resource::configmap::{get_config_map_list, ConfigMap, ConfigMapList};
pub use resource::event::{get_event_list, Event, EventList};
pub use resource::namespace::{get_namespace_list, Namespace, NamespaceList};
pub use resource::pod::{get_pod_list, Pod, PodList};
pub use resource::priorityclass::{get_priority_class_list, PriorityClass, PriorityClassList};
pub use resource::resourcequota::{get_resource_quota_list, ResourceQuota, ResourceQuotaList};

/// One list request: a kind, its namespace scope and the data-select query.
#[derive(Debug, Clone, PartialEq)]
pub struct ListRequest {
    pub kind: ResourceKind,
    pub namespaces: NamespaceQuery,
    pub query: DataSelectQuery,
}

impl ListRequest {
    pub fn new(kind: ResourceKind) -> Self {
        Self { kind, namespaces: NamespaceQuery::all(), query: DataSelectQuery::no_data_select() }
    }

    pub fn namespaces(mut self, namespaces: NamespaceQuery) -> Self {
        self.namespaces = namespaces;
        self
    }

    pub fn query(mut self, query: DataSelectQuery) -> Self {
        self.query = query;
        self
    }
}

/// Declarative kdash API surface.
#[async_trait::async_trait]
pub trait ListApi: Send + Sync {
    /// Kinds that can be listed.
    fn kinds(&self) -> Vec<ResourceKind>;

    /// List one kind as its JSON envelope.
    async fn list(&self, request: ListRequest) -> DashResult<serde_json::Value>;
}

/// In-process implementation that calls the list functions directly.
#[derive(Clone)]
pub struct InProcApi {
    client: Arc<dyn ClusterClient>,
}

impl InProcApi {
    pub fn new(client: Arc<dyn ClusterClient>) -> Self { Self { client } }

    /// Connect to the cluster from kubeconfig or in-cluster env.
    pub async fn connect(read_timeout: Option<Duration>) -> DashResult<Self> {
        let client = KubeClient::infer(read_timeout).await?;
        Ok(Self::new(Arc::new(client)))
    }

    fn envelope<T: Serialize>(list: &ResourceList<T>) -> DashResult<serde_json::Value> {
        serde_json::to_value(list).map_err(|e| DashError::Internal(e.to_string()))
    }
}

#[async_trait::async_trait]
impl ListApi for InProcApi {
    fn kinds(&self) -> Vec<ResourceKind> { ResourceKind::ALL.to_vec() }

    async fn list(&self, request: ListRequest) -> DashResult<serde_json::Value> {
        let kind = request.kind;
        let t0 = Instant::now();
        info!(%kind, ns = ?request.namespaces, "api: list start");
        let client = self.client.clone();
        let (ns, q) = (&request.namespaces, &request.query);
        let (value, total, errors) = match kind {
            ResourceKind::ConfigMap => {
                let l = get_config_map_list(client, ns, q).await?;
                (Self::envelope(&l)?, l.list_meta.total_items, l.errors.len())
            }
            ResourceKind::Event => {
                let l = get_event_list(client, ns, q).await?;
                (Self::envelope(&l)?, l.list_meta.total_items, l.errors.len())
            }
            ResourceKind::Namespace => {
                let l = get_namespace_list(client, q).await?;
                (Self::envelope(&l)?, l.list_meta.total_items, l.errors.len())
            }
            ResourceKind::Pod => {
                let l = get_pod_list(client, ns, q).await?;
                (Self::envelope(&l)?, l.list_meta.total_items, l.errors.len())
            }
            ResourceKind::PriorityClass => {
                let l = get_priority_class_list(client, q).await?;
                (Self::envelope(&l)?, l.list_meta.total_items, l.errors.len())
            }
            ResourceKind::ResourceQuota => {
                let l = get_resource_quota_list(client, ns, q).await?;
                (Self::envelope(&l)?, l.list_meta.total_items, l.errors.len())
            }
        };
        info!(%kind, total, errors, took_ms = %t0.elapsed().as_millis(), "api: list ok");
        Ok(value)
    }
}

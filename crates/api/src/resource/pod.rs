//! Pods joined with their warning events. Events are a secondary retrieval: when they
//! fail the pods are still listed, without warnings, and the failure is reported.

use std::borrow::Cow;
use std::sync::Arc;

use k8s_openapi::api::core::v1 as k8s;
use kdash_core::{ObjectMeta, ResourceKind, TypeMeta};
use kdash_dataselect::{property, ComparableValue, DataCell, DataSelectQuery};
use kdash_kubehub::{spawn_lists, ClusterClient, ErrorAccumulator, ListHandle, NamespaceQuery, Role};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use super::event::{Event, EventChannels};
use crate::error::DashResult;
use crate::list::{join_merged, meta_property, ResourceList};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Pod {
    pub object_meta: ObjectMeta,
    pub type_meta: TypeMeta,
    pub status: String,
    pub restart_count: i32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub node_name: Option<String>,
    pub container_images: Vec<String>,
    pub warnings: Vec<Event>,
}

pub type PodList = ResourceList<Pod>;

impl Pod {
    pub fn from_k8s(pod: &k8s::Pod, warnings: Vec<Event>) -> Self {
        let spec = pod.spec.as_ref();
        let statuses = pod.status.as_ref().and_then(|s| s.container_statuses.as_deref()).unwrap_or_default();
        Self {
            object_meta: ObjectMeta::from_k8s(&pod.metadata),
            type_meta: TypeMeta::new(ResourceKind::Pod),
            status: pod_status(pod),
            restart_count: statuses.iter().map(|c| c.restart_count).sum(),
            node_name: spec.and_then(|s| s.node_name.clone()),
            container_images: spec.map(|s| s.containers.iter().filter_map(|c| c.image.clone()).collect()).unwrap_or_default(),
            warnings,
        }
    }
}

/// Display status: `Terminating` once deletion started, else the first container
/// waiting or terminated reason, else the phase.
pub fn pod_status(pod: &k8s::Pod) -> String {
    if pod.metadata.deletion_timestamp.is_some() {
        return "Terminating".to_string();
    }
    let status = match &pod.status {
        Some(s) => s,
        None => return "Unknown".to_string(),
    };
    let reason = status.container_statuses.iter().flatten().find_map(|c| {
        let state = c.state.as_ref()?;
        state
            .waiting
            .as_ref()
            .and_then(|w| w.reason.clone())
            .or_else(|| state.terminated.as_ref().and_then(|t| t.reason.clone()))
    });
    reason.or_else(|| status.phase.clone()).unwrap_or_else(|| "Unknown".to_string())
}

impl DataCell for Pod {
    fn property(&self, name: &str) -> Option<ComparableValue<'_>> {
        match name {
            property::STATUS => Some(ComparableValue::str(&self.status)),
            property::NODE => self.node_name.as_deref().map(ComparableValue::str),
            property::RESTART_COUNT => Some(ComparableValue::Int(i64::from(self.restart_count))),
            property::WARNINGS => Some(ComparableValue::Int(self.warnings.len() as i64)),
            _ => meta_property(&self.object_meta, name),
        }
    }

    fn identity(&self) -> Cow<'_, str> { self.object_meta.identity() }
}

pub struct PodChannels {
    /// One handle per selected namespace.
    pub list: Vec<ListHandle<k8s::Pod>>,
    pub events: EventChannels,
}

impl PodChannels {
    pub fn spawn(client: Arc<dyn ClusterClient>, namespaces: &NamespaceQuery) -> Self {
        Self {
            list: spawn_lists(client.clone(), ResourceKind::Pod, namespaces, Role::Primary),
            events: EventChannels::spawn(client, namespaces, Role::Secondary),
        }
    }
}

pub async fn get_pod_list(
    client: Arc<dyn ClusterClient>,
    namespaces: &NamespaceQuery,
    query: &DataSelectQuery,
) -> DashResult<PodList> {
    info!(ns = ?namespaces, "api: listing pods");
    get_pod_list_from_channels(PodChannels::spawn(client, namespaces), query).await
}

pub async fn get_pod_list_from_channels(channels: PodChannels, query: &DataSelectQuery) -> DashResult<PodList> {
    let (acc, pods) =
        join_merged(ErrorAccumulator::new(), channels.list, |p: &k8s::Pod| Pod::from_k8s(p, Vec::new())).await?;
    let (acc, events) = join_merged(acc, channels.events.list, Event::from_k8s).await?;
    let warnings: Vec<Event> = events.into_iter().filter(Event::is_warning).collect();
    debug!(pods = pods.len(), warnings = warnings.len(), "api: joining pod warnings");
    let items = pods
        .into_iter()
        .map(|mut pod| {
            pod.warnings = warnings.iter().filter(|e| e.concerns("Pod", &pod.object_meta)).cloned().collect();
            pod
        })
        .collect();
    Ok(ResourceList::select(items, acc.into_errors(), query))
}

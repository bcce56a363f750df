use std::borrow::Cow;
use std::sync::Arc;

use k8s_openapi::api::core::v1 as k8s;
use kdash_core::{ObjectMeta, ResourceKind, TypeMeta};
use kdash_dataselect::{property, ComparableValue, DataCell, DataSelectQuery};
use kdash_kubehub::{spawn_list, ClusterClient, ErrorAccumulator, ListHandle, NamespaceQuery, Role};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::DashResult;
use crate::list::{meta_property, ResourceList};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Namespace {
    pub object_meta: ObjectMeta,
    pub type_meta: TypeMeta,
    /// `Active` or `Terminating`; empty when the server did not report one.
    pub phase: String,
}

pub type NamespaceList = ResourceList<Namespace>;

impl Namespace {
    pub fn from_k8s(ns: &k8s::Namespace) -> Self {
        Self {
            object_meta: ObjectMeta::from_k8s(&ns.metadata),
            type_meta: TypeMeta::new(ResourceKind::Namespace),
            phase: ns.status.as_ref().and_then(|s| s.phase.clone()).unwrap_or_default(),
        }
    }
}

impl DataCell for Namespace {
    fn property(&self, name: &str) -> Option<ComparableValue<'_>> {
        match name {
            property::STATUS => Some(ComparableValue::str(&self.phase)),
            _ => meta_property(&self.object_meta, name),
        }
    }

    fn identity(&self) -> Cow<'_, str> { self.object_meta.identity() }
}

pub struct NamespaceChannels {
    pub list: ListHandle<k8s::Namespace>,
}

impl NamespaceChannels {
    pub fn spawn(client: Arc<dyn ClusterClient>) -> Self {
        Self { list: spawn_list(client, ResourceKind::Namespace, NamespaceQuery::all(), Role::Primary) }
    }
}

pub async fn get_namespace_list(client: Arc<dyn ClusterClient>, query: &DataSelectQuery) -> DashResult<NamespaceList> {
    info!("api: listing namespaces");
    get_namespace_list_from_channels(NamespaceChannels::spawn(client), query).await
}

pub async fn get_namespace_list_from_channels(channels: NamespaceChannels, query: &DataSelectQuery) -> DashResult<NamespaceList> {
    let (acc, raw) = ErrorAccumulator::new().join(channels.list.wait().await)?;
    let items = raw.iter().map(Namespace::from_k8s).collect();
    Ok(ResourceList::select(items, acc.into_errors(), query))
}

use std::borrow::Cow;
use std::sync::Arc;

use k8s_openapi::api::core::v1 as k8s;
use kdash_core::{ObjectMeta, ResourceKind, TypeMeta};
use kdash_dataselect::{property, ComparableValue, DataCell, DataSelectQuery};
use kdash_kubehub::{spawn_lists, ClusterClient, ErrorAccumulator, ListHandle, NamespaceQuery, Role};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::DashResult;
use crate::list::{join_merged, meta_property, ResourceList};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfigMap {
    pub object_meta: ObjectMeta,
    pub type_meta: TypeMeta,
    /// Number of `data` plus `binaryData` keys.
    pub data_keys: usize,
}

pub type ConfigMapList = ResourceList<ConfigMap>;

impl ConfigMap {
    pub fn from_k8s(cm: &k8s::ConfigMap) -> Self {
        let data_keys = cm.data.as_ref().map_or(0, |d| d.len()) + cm.binary_data.as_ref().map_or(0, |d| d.len());
        Self {
            object_meta: ObjectMeta::from_k8s(&cm.metadata),
            type_meta: TypeMeta::new(ResourceKind::ConfigMap),
            data_keys,
        }
    }
}

impl DataCell for ConfigMap {
    fn property(&self, name: &str) -> Option<ComparableValue<'_>> {
        match name {
            property::DATA_KEYS => Some(ComparableValue::Int(self.data_keys as i64)),
            _ => meta_property(&self.object_meta, name),
        }
    }

    fn identity(&self) -> Cow<'_, str> { self.object_meta.identity() }
}

pub struct ConfigMapChannels {
    /// One handle per selected namespace.
    pub list: Vec<ListHandle<k8s::ConfigMap>>,
}

impl ConfigMapChannels {
    pub fn spawn(client: Arc<dyn ClusterClient>, namespaces: &NamespaceQuery) -> Self {
        Self { list: spawn_lists(client, ResourceKind::ConfigMap, namespaces, Role::Primary) }
    }
}

pub async fn get_config_map_list(
    client: Arc<dyn ClusterClient>,
    namespaces: &NamespaceQuery,
    query: &DataSelectQuery,
) -> DashResult<ConfigMapList> {
    info!(ns = ?namespaces, "api: listing config maps");
    get_config_map_list_from_channels(ConfigMapChannels::spawn(client, namespaces), query).await
}

pub async fn get_config_map_list_from_channels(channels: ConfigMapChannels, query: &DataSelectQuery) -> DashResult<ConfigMapList> {
    let (acc, items) = join_merged(ErrorAccumulator::new(), channels.list, ConfigMap::from_k8s).await?;
    Ok(ResourceList::select(items, acc.into_errors(), query))
}

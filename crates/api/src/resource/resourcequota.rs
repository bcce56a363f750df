use std::borrow::Cow;
use std::collections::BTreeMap;
use std::sync::Arc;

use k8s_openapi::api::core::v1 as k8s;
use kdash_core::{ObjectMeta, ResourceKind, TypeMeta};
use kdash_dataselect::{ComparableValue, DataCell, DataSelectQuery};
use kdash_kubehub::{spawn_lists, ClusterClient, ErrorAccumulator, ListHandle, NamespaceQuery, Role};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::DashResult;
use crate::list::{join_merged, meta_property, ResourceList};

/// Used and hard amounts of one quota'd resource, as reported by the server.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuotaStatus {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub used: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hard: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResourceQuota {
    pub object_meta: ObjectMeta,
    pub type_meta: TypeMeta,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub scopes: Vec<String>,
    pub status_list: BTreeMap<String, QuotaStatus>,
}

pub type ResourceQuotaList = ResourceList<ResourceQuota>;

impl ResourceQuota {
    pub fn from_k8s(rq: &k8s::ResourceQuota) -> Self {
        let mut status_list: BTreeMap<String, QuotaStatus> = BTreeMap::new();
        if let Some(status) = &rq.status {
            for (res, q) in status.hard.iter().flatten() {
                status_list.entry(res.clone()).or_default().hard = Some(q.0.clone());
            }
            for (res, q) in status.used.iter().flatten() {
                status_list.entry(res.clone()).or_default().used = Some(q.0.clone());
            }
        }
        Self {
            object_meta: ObjectMeta::from_k8s(&rq.metadata),
            type_meta: TypeMeta::new(ResourceKind::ResourceQuota),
            scopes: rq.spec.as_ref().and_then(|s| s.scopes.clone()).unwrap_or_default(),
            status_list,
        }
    }
}

impl DataCell for ResourceQuota {
    fn property(&self, name: &str) -> Option<ComparableValue<'_>> { meta_property(&self.object_meta, name) }

    fn identity(&self) -> Cow<'_, str> { self.object_meta.identity() }
}

pub struct ResourceQuotaChannels {
    /// One handle per selected namespace.
    pub list: Vec<ListHandle<k8s::ResourceQuota>>,
}

impl ResourceQuotaChannels {
    pub fn spawn(client: Arc<dyn ClusterClient>, namespaces: &NamespaceQuery) -> Self {
        Self { list: spawn_lists(client, ResourceKind::ResourceQuota, namespaces, Role::Primary) }
    }
}

pub async fn get_resource_quota_list(
    client: Arc<dyn ClusterClient>,
    namespaces: &NamespaceQuery,
    query: &DataSelectQuery,
) -> DashResult<ResourceQuotaList> {
    info!(ns = ?namespaces, "api: listing resource quotas");
    get_resource_quota_list_from_channels(ResourceQuotaChannels::spawn(client, namespaces), query).await
}

pub async fn get_resource_quota_list_from_channels(
    channels: ResourceQuotaChannels,
    query: &DataSelectQuery,
) -> DashResult<ResourceQuotaList> {
    let (acc, items) = join_merged(ErrorAccumulator::new(), channels.list, ResourceQuota::from_k8s).await?;
    Ok(ResourceList::select(items, acc.into_errors(), query))
}

#[cfg(test)]
mod tests {
    use super::*;
    use k8s_openapi::apimachinery::pkg::api::resource::Quantity;

    #[test]
    fn status_list_pairs_used_with_hard() {
        let rq = k8s::ResourceQuota {
            status: Some(k8s::ResourceQuotaStatus {
                hard: Some([("pods".to_string(), Quantity("10".into()))].into_iter().collect()),
                used: Some(
                    [("pods".to_string(), Quantity("4".into())), ("cpu".to_string(), Quantity("1".into()))]
                        .into_iter()
                        .collect(),
                ),
            }),
            ..Default::default()
        };
        let rec = ResourceQuota::from_k8s(&rq);
        assert_eq!(rec.status_list["pods"], QuotaStatus { used: Some("4".into()), hard: Some("10".into()) });
        assert_eq!(rec.status_list["cpu"].hard, None);
    }
}

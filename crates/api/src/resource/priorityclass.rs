use std::borrow::Cow;
use std::sync::Arc;

use k8s_openapi::api::scheduling::v1 as k8s;
use kdash_core::{ObjectMeta, ResourceKind, TypeMeta};
use kdash_dataselect::{property, ComparableValue, DataCell, DataSelectQuery};
use kdash_kubehub::{spawn_list, ClusterClient, ErrorAccumulator, ListHandle, NamespaceQuery, Role};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::DashResult;
use crate::list::{meta_property, ResourceList};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PriorityClass {
    pub object_meta: ObjectMeta,
    pub type_meta: TypeMeta,
    pub value: i32,
    pub global_default: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub preemption_policy: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

pub type PriorityClassList = ResourceList<PriorityClass>;

impl PriorityClass {
    pub fn from_k8s(pc: &k8s::PriorityClass) -> Self {
        Self {
            object_meta: ObjectMeta::from_k8s(&pc.metadata),
            type_meta: TypeMeta::new(ResourceKind::PriorityClass),
            value: pc.value,
            global_default: pc.global_default.unwrap_or(false),
            preemption_policy: pc.preemption_policy.clone(),
            description: pc.description.clone(),
        }
    }
}

impl DataCell for PriorityClass {
    fn property(&self, name: &str) -> Option<ComparableValue<'_>> {
        match name {
            property::VALUE => Some(ComparableValue::Int(i64::from(self.value))),
            property::GLOBAL_DEFAULT => Some(ComparableValue::str(if self.global_default { "true" } else { "false" })),
            _ => meta_property(&self.object_meta, name),
        }
    }

    fn identity(&self) -> Cow<'_, str> { self.object_meta.identity() }
}

pub struct PriorityClassChannels {
    pub list: ListHandle<k8s::PriorityClass>,
}

impl PriorityClassChannels {
    pub fn spawn(client: Arc<dyn ClusterClient>) -> Self {
        Self { list: spawn_list(client, ResourceKind::PriorityClass, NamespaceQuery::all(), Role::Primary) }
    }
}

/// Priority classes are cluster-scoped, so no namespace query.
pub async fn get_priority_class_list(client: Arc<dyn ClusterClient>, query: &DataSelectQuery) -> DashResult<PriorityClassList> {
    info!("api: listing priority classes");
    get_priority_class_list_from_channels(PriorityClassChannels::spawn(client), query).await
}

pub async fn get_priority_class_list_from_channels(
    channels: PriorityClassChannels,
    query: &DataSelectQuery,
) -> DashResult<PriorityClassList> {
    let (acc, raw) = ErrorAccumulator::new().join(channels.list.wait().await)?;
    let items = raw.iter().map(PriorityClass::from_k8s).collect();
    Ok(ResourceList::select(items, acc.into_errors(), query))
}

#[cfg(test)]
mod tests {
    use super::*;
    use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta as K8sMeta;

    #[test]
    fn from_k8s_defaults_global_default_to_false() {
        let pc = k8s::PriorityClass {
            metadata: K8sMeta { name: Some("high".into()), ..Default::default() },
            value: 1000,
            ..Default::default()
        };
        let rec = PriorityClass::from_k8s(&pc);
        assert_eq!(rec.value, 1000);
        assert!(!rec.global_default);
        assert_eq!(rec.property(property::VALUE), Some(ComparableValue::Int(1000)));
        assert_eq!(rec.property(property::GLOBAL_DEFAULT), Some(ComparableValue::str("false")));
        assert!(rec.property(property::NAMESPACE).is_none());
    }
}

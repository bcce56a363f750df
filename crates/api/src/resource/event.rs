use std::borrow::Cow;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use k8s_openapi::api::core::v1 as k8s;
use kdash_core::{ObjectMeta, ResourceKind, TypeMeta};
use kdash_dataselect::{property, ComparableValue, DataCell, DataSelectQuery};
use kdash_kubehub::{spawn_lists, ClusterClient, ErrorAccumulator, ListHandle, NamespaceQuery, Role};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::DashResult;
use crate::list::{join_merged, meta_property, ResourceList};

pub const WARNING: &str = "Warning";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Event {
    pub object_meta: ObjectMeta,
    pub type_meta: TypeMeta,
    pub message: String,
    pub reason: String,
    /// `Normal` or `Warning`.
    #[serde(rename = "type")]
    pub event_type: String,
    pub source_component: String,
    pub source_host: String,
    pub object_kind: String,
    pub object_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub object_namespace: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub object_uid: Option<String>,
    pub count: i32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub first_seen: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_seen: Option<DateTime<Utc>>,
}

pub type EventList = ResourceList<Event>;

impl Event {
    pub fn from_k8s(ev: &k8s::Event) -> Self {
        let source = ev.source.as_ref();
        let involved = &ev.involved_object;
        // Newer reporters only set eventTime.
        let first_seen = ev.first_timestamp.as_ref().map(|t| t.0).or_else(|| ev.event_time.as_ref().map(|t| t.0));
        Self {
            object_meta: ObjectMeta::from_k8s(&ev.metadata),
            type_meta: TypeMeta::new(ResourceKind::Event),
            message: ev.message.clone().unwrap_or_default(),
            reason: ev.reason.clone().unwrap_or_default(),
            event_type: ev.type_.clone().unwrap_or_default(),
            source_component: source.and_then(|s| s.component.clone()).unwrap_or_default(),
            source_host: source.and_then(|s| s.host.clone()).unwrap_or_default(),
            object_kind: involved.kind.clone().unwrap_or_default(),
            object_name: involved.name.clone().unwrap_or_default(),
            object_namespace: involved.namespace.clone(),
            object_uid: involved.uid.clone(),
            count: ev.count.unwrap_or(1),
            first_seen,
            last_seen: ev.last_timestamp.as_ref().map(|t| t.0).or(first_seen),
        }
    }

    pub fn is_warning(&self) -> bool { self.event_type == WARNING }

    /// Whether this event is about the object with the given identity.
    pub fn concerns(&self, kind: &str, meta: &ObjectMeta) -> bool {
        match (&self.object_uid, &meta.uid) {
            (Some(a), Some(b)) => a == b,
            _ => self.object_kind == kind && self.object_name == meta.name && self.object_namespace == meta.namespace,
        }
    }
}

impl DataCell for Event {
    fn property(&self, name: &str) -> Option<ComparableValue<'_>> {
        match name {
            property::REASON => Some(ComparableValue::str(&self.reason)),
            property::MESSAGE => Some(ComparableValue::str(&self.message)),
            property::TYPE => Some(ComparableValue::str(&self.event_type)),
            property::KIND => Some(ComparableValue::str(&self.object_kind)),
            property::COUNT => Some(ComparableValue::Int(i64::from(self.count))),
            property::FIRST_SEEN => self.first_seen.map(ComparableValue::Time),
            property::LAST_SEEN => self.last_seen.map(ComparableValue::Time),
            _ => meta_property(&self.object_meta, name),
        }
    }

    fn identity(&self) -> Cow<'_, str> { self.object_meta.identity() }
}

pub struct EventChannels {
    /// One handle per selected namespace.
    pub list: Vec<ListHandle<k8s::Event>>,
}

impl EventChannels {
    pub fn spawn(client: Arc<dyn ClusterClient>, namespaces: &NamespaceQuery, role: Role) -> Self {
        Self { list: spawn_lists(client, ResourceKind::Event, namespaces, role) }
    }
}

pub async fn get_event_list(
    client: Arc<dyn ClusterClient>,
    namespaces: &NamespaceQuery,
    query: &DataSelectQuery,
) -> DashResult<EventList> {
    info!(ns = ?namespaces, "api: listing events");
    get_event_list_from_channels(EventChannels::spawn(client, namespaces, Role::Primary), query).await
}

pub async fn get_event_list_from_channels(channels: EventChannels, query: &DataSelectQuery) -> DashResult<EventList> {
    let (acc, items) = join_merged(ErrorAccumulator::new(), channels.list, Event::from_k8s).await?;
    Ok(ResourceList::select(items, acc.into_errors(), query))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn event(kind: &str, name: &str, ns: &str, uid: Option<&str>) -> Event {
        Event::from_k8s(&k8s::Event {
            type_: Some(WARNING.into()),
            involved_object: k8s::ObjectReference {
                kind: Some(kind.into()),
                name: Some(name.into()),
                namespace: Some(ns.into()),
                uid: uid.map(str::to_string),
                ..Default::default()
            },
            ..Default::default()
        })
    }

    #[test]
    fn concerns_prefers_uid_then_falls_back_to_name() {
        let meta = ObjectMeta { name: "web".into(), namespace: Some("prod".into()), uid: Some("u1".into()), ..Default::default() };
        assert!(event("Pod", "other", "prod", Some("u1")).concerns("Pod", &meta));
        assert!(!event("Pod", "web", "prod", Some("u2")).concerns("Pod", &meta));
        assert!(event("Pod", "web", "prod", None).concerns("Pod", &meta));
        assert!(!event("Node", "web", "prod", None).concerns("Pod", &meta));
        assert!(!event("Pod", "web", "dev", None).concerns("Pod", &meta));
    }

    #[test]
    fn count_defaults_to_one() {
        let e = event("Pod", "web", "prod", None);
        assert!(e.is_warning());
        assert_eq!(e.property(property::COUNT), Some(ComparableValue::Int(1)));
        assert!(e.property(property::LAST_SEEN).is_none());
    }
}

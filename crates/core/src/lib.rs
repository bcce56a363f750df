//! kdash core types: resource kinds and the display records every list shares.

#![forbid(unsafe_code)]

use std::borrow::Cow;
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use k8s_openapi::apimachinery::pkg::apis::meta::v1 as metav1;
use serde::{Deserialize, Serialize};

/// Resource kinds the list pipeline knows how to fetch and adapt.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "lowercase")]
pub enum ResourceKind {
    ConfigMap,
    Event,
    Namespace,
    Pod,
    PriorityClass,
    ResourceQuota,
}

/// Static group/version/kind data for a [`ResourceKind`].
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
pub struct KindInfo {
    pub group: &'static str,
    pub version: &'static str,
    pub kind: &'static str,
    pub plural: &'static str,
    pub namespaced: bool,
}

impl ResourceKind {
    pub const ALL: [ResourceKind; 6] = [
        ResourceKind::ConfigMap,
        ResourceKind::Event,
        ResourceKind::Namespace,
        ResourceKind::Pod,
        ResourceKind::PriorityClass,
        ResourceKind::ResourceQuota,
    ];

    pub fn info(self) -> KindInfo {
        let (group, version, kind, plural, namespaced) = match self {
            ResourceKind::ConfigMap => ("", "v1", "ConfigMap", "configmaps", true),
            ResourceKind::Event => ("", "v1", "Event", "events", true),
            ResourceKind::Namespace => ("", "v1", "Namespace", "namespaces", false),
            ResourceKind::Pod => ("", "v1", "Pod", "pods", true),
            ResourceKind::PriorityClass => ("scheduling.k8s.io", "v1", "PriorityClass", "priorityclasses", false),
            ResourceKind::ResourceQuota => ("", "v1", "ResourceQuota", "resourcequotas", true),
        };
        KindInfo { group, version, kind, plural, namespaced }
    }

    pub fn namespaced(self) -> bool { self.info().namespaced }

    /// `v1/Kind` for the core group, `group/v1/Kind` otherwise.
    pub fn gvk_key(self) -> String {
        let i = self.info();
        if i.group.is_empty() {
            format!("{}/{}", i.version, i.kind)
        } else {
            format!("{}/{}/{}", i.group, i.version, i.kind)
        }
    }
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.info().kind.to_ascii_lowercase())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown resource kind: {0}")]
pub struct UnknownKind(pub String);

impl FromStr for ResourceKind {
    type Err = UnknownKind;

    /// Accepts the kind or its plural, case-insensitively.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let needle = s.trim().to_ascii_lowercase();
        ResourceKind::ALL
            .into_iter()
            .find(|k| {
                let i = k.info();
                i.kind.eq_ignore_ascii_case(&needle) || i.plural == needle
            })
            .ok_or_else(|| UnknownKind(s.to_string()))
    }
}

/// Object metadata trimmed to what list views display.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ObjectMeta {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub namespace: Option<String>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub labels: BTreeMap<String, String>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub annotations: BTreeMap<String, String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub creation_timestamp: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub uid: Option<String>,
}

impl ObjectMeta {
    pub fn from_k8s(meta: &metav1::ObjectMeta) -> Self {
        Self {
            name: meta.name.clone().unwrap_or_default(),
            namespace: meta.namespace.clone(),
            labels: meta.labels.clone().unwrap_or_default(),
            annotations: meta.annotations.clone().unwrap_or_default(),
            creation_timestamp: meta.creation_timestamp.as_ref().map(|t| t.0),
            uid: meta.uid.clone(),
        }
    }

    /// Identity used to recognise the same object across retrievals: the uid when
    /// present, `namespace/name` otherwise.
    pub fn identity(&self) -> Cow<'_, str> {
        match (&self.uid, &self.namespace) {
            (Some(uid), _) => Cow::Borrowed(uid.as_str()),
            (None, Some(ns)) => Cow::Owned(format!("{}/{}", ns, self.name)),
            (None, None) => Cow::Borrowed(self.name.as_str()),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct TypeMeta {
    pub kind: ResourceKind,
}

impl TypeMeta {
    pub fn new(kind: ResourceKind) -> Self { Self { kind } }
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ListMeta {
    /// Items matching the filter, before pagination.
    pub total_items: usize,
}

/// A non-critical error surfaced next to list data.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ErrorInfo {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<ResourceKind>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<u16>,
    pub reason: String,
    pub message: String,
}

impl fmt::Display for ErrorInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.kind {
            Some(k) => write!(f, "{} ({}): {}", self.reason, k, self.message),
            None => write!(f, "{}: {}", self.reason, self.message),
        }
    }
}

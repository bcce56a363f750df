//! The response envelope shared by every list kind.

use kdash_core::{ErrorInfo, ListMeta, ObjectMeta};
use kdash_dataselect::{generic_data_select, merge_unique, property, ComparableValue, DataCell, DataSelectQuery, Metric};
use kdash_kubehub::{ErrorAccumulator, ListHandle, RetrievalError};
use serde::{Deserialize, Serialize};

/// `{listMeta, items, cumulativeMetrics?, errors}`. `errors` is always serialized so
/// clients can tell degraded success from full success.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResourceList<T> {
    pub list_meta: ListMeta,
    pub items: Vec<T>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub cumulative_metrics: Vec<Metric>,
    #[serde(default)]
    pub errors: Vec<ErrorInfo>,
}

impl<T: DataCell + Clone> ResourceList<T> {
    /// Run the data-select pipeline over `records` and assemble the envelope.
    pub fn select(records: Vec<T>, errors: Vec<ErrorInfo>, query: &DataSelectQuery) -> Self {
        let selected = generic_data_select(&records, query);
        Self {
            list_meta: ListMeta { total_items: selected.total_items },
            items: selected.items,
            cumulative_metrics: selected.metrics,
            errors,
        }
    }
}

/// Join every handle of one kind in spawn order, adapt each batch with `adapt` and
/// merge the batches, dropping records already seen in an earlier one.
pub(crate) async fn join_merged<K, T, F>(
    acc: ErrorAccumulator,
    handles: Vec<ListHandle<K>>,
    adapt: F,
) -> Result<(ErrorAccumulator, Vec<T>), RetrievalError>
where
    T: DataCell,
    F: Fn(&K) -> T,
{
    let mut acc = acc;
    let mut batches = Vec::with_capacity(handles.len());
    for handle in handles {
        let (next, raw) = acc.join(handle.wait().await)?;
        acc = next;
        batches.push(raw.iter().map(&adapt).collect());
    }
    Ok((acc, merge_unique(batches)))
}

/// Properties every record derives from its object metadata.
pub(crate) fn meta_property<'a>(meta: &'a ObjectMeta, name: &str) -> Option<ComparableValue<'a>> {
    match name {
        property::NAME => Some(ComparableValue::str(&meta.name)),
        property::NAMESPACE => meta.namespace.as_deref().map(ComparableValue::str),
        property::CREATION_TIMESTAMP => meta.creation_timestamp.map(ComparableValue::Time),
        property::LABEL => Some(ComparableValue::Labels(&meta.labels)),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::borrow::Cow;

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    struct Rec { meta: ObjectMeta }

    impl DataCell for Rec {
        fn property(&self, name: &str) -> Option<ComparableValue<'_>> { meta_property(&self.meta, name) }
        fn identity(&self) -> Cow<'_, str> { self.meta.identity() }
    }

    fn rec(name: &str) -> Rec { Rec { meta: ObjectMeta { name: name.into(), ..Default::default() } } }

    #[test]
    fn envelope_always_carries_errors() {
        let list = ResourceList::select(vec![rec("a")], Vec::new(), &DataSelectQuery::default());
        let v = serde_json::to_value(&list).unwrap();
        assert_eq!(v["listMeta"]["totalItems"], 1);
        assert_eq!(v["errors"], serde_json::json!([]));
        assert!(v.get("cumulativeMetrics").is_none());
    }

    #[test]
    fn namespace_is_absent_for_cluster_scoped_meta() {
        let r = rec("a");
        assert!(meta_property(&r.meta, property::NAMESPACE).is_none());
        assert!(meta_property(&r.meta, property::CREATION_TIMESTAMP).is_none());
        assert!(meta_property(&r.meta, property::LABEL).is_some());
    }
}

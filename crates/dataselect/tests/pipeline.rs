use std::borrow::Cow;

use kdash_dataselect::{
    from_cells, generic_data_select, property, to_cells, ComparableValue, DataCell, DataSelectQuery, SortDirection,
};

#[derive(Debug, Clone, PartialEq)]
struct Item {
    uid: String,
    name: String,
    namespace: String,
    replicas: i64,
}

impl DataCell for Item {
    fn property(&self, name: &str) -> Option<ComparableValue<'_>> {
        match name {
            property::NAME => Some(ComparableValue::str(&self.name)),
            property::NAMESPACE => Some(ComparableValue::str(&self.namespace)),
            "replicas" => Some(ComparableValue::Int(self.replicas)),
            _ => None,
        }
    }

    fn identity(&self) -> Cow<'_, str> { Cow::Borrowed(&self.uid) }
}

fn item(i: usize, name: &str, ns: &str, replicas: i64) -> Item {
    Item { uid: format!("uid-{i}"), name: name.to_string(), namespace: ns.to_string(), replicas }
}

fn items(n: usize) -> Vec<Item> {
    (0..n).map(|i| item(i, &format!("app-{i:02}"), if i % 2 == 0 { "prod" } else { "dev" }, (i % 3) as i64)).collect()
}

#[test]
fn adapter_round_trip_preserves_order() {
    let src = items(7);
    let cells = to_cells(&src);
    assert_eq!(from_cells(&src, &cells), src);
}

#[test]
fn no_query_returns_everything_in_fetch_order() {
    let src = items(12);
    let out = generic_data_select(&src, &DataSelectQuery::no_data_select());
    assert_eq!(out.items, src);
    assert_eq!(out.total_items, 12);
    assert!(out.metrics.is_empty());
}

#[test]
fn filter_is_order_preserving_subset() {
    let src = items(10);
    let q = DataSelectQuery::default().filter(property::NAMESPACE, "PROD");
    let out = generic_data_select(&src, &q);
    let expected: Vec<Item> = src.iter().filter(|i| i.namespace == "prod").cloned().collect();
    assert_eq!(out.items, expected);
    assert_eq!(out.total_items, 5);

    let both = DataSelectQuery::default().filter(property::NAMESPACE, "prod").filter("replicas", "0");
    let out = generic_data_select(&src, &both);
    assert!(out.items.iter().all(|i| i.namespace == "prod" && i.replicas == 0));
    assert_eq!(out.items.iter().map(|i| i.uid.as_str()).collect::<Vec<_>>(), vec!["uid-0", "uid-6"]);
}

#[test]
fn exact_filter_does_not_match_substrings() {
    let src = vec![item(0, "a", "prod", 0), item(1, "b", "prod-eu", 0)];
    let q = DataSelectQuery::default().filter_exact(property::NAMESPACE, "prod");
    let out = generic_data_select(&src, &q);
    assert_eq!(out.items.len(), 1);
    assert_eq!(out.items[0].name, "a");
}

#[test]
fn sort_is_stable_and_idempotent() {
    let src = items(9);
    let q = DataSelectQuery::default().sort("replicas", SortDirection::Ascending);
    let once = generic_data_select(&src, &q).items;
    let twice = generic_data_select(&once, &q).items;
    assert_eq!(once, twice);
    // replicas 0 -> items 0,3,6 in input order
    let zeros: Vec<&str> = once.iter().take(3).map(|i| i.uid.as_str()).collect();
    assert_eq!(zeros, vec!["uid-0", "uid-3", "uid-6"]);
}

#[test]
fn descending_sort_keeps_tie_order() {
    let src = items(6);
    let q = DataSelectQuery::default().sort("replicas", SortDirection::Descending);
    let out = generic_data_select(&src, &q).items;
    let uids: Vec<&str> = out.iter().map(|i| i.uid.as_str()).collect();
    assert_eq!(uids, vec!["uid-2", "uid-5", "uid-1", "uid-4", "uid-0", "uid-3"]);
}

#[test]
fn pagination_bounds() {
    let src = items(25);
    let first = generic_data_select(&src, &DataSelectQuery::default().paginate(10, 1));
    assert_eq!(first.items.len(), 10);
    assert_eq!(first.total_items, 25);
    assert_eq!(first.items[0], src[0]);

    let third = generic_data_select(&src, &DataSelectQuery::default().paginate(10, 3));
    assert_eq!(third.items.len(), 5);
    assert_eq!(third.items[0], src[20]);

    let past = generic_data_select(&src, &DataSelectQuery::default().paginate(10, 10));
    assert!(past.items.is_empty());
    assert_eq!(past.total_items, 25);

    let off = generic_data_select(&src, &DataSelectQuery::default().paginate(0, 3));
    assert_eq!(off.items.len(), 25);
}

#[test]
fn non_positive_page_is_empty() {
    let src = items(25);
    for page in [0, -3] {
        let out = generic_data_select(&src, &DataSelectQuery::default().paginate(10, page));
        assert!(out.items.is_empty());
        assert_eq!(out.total_items, 25);
    }
}

#[test]
fn total_counts_filtered_items_not_the_page() {
    let src = items(25);
    let q = DataSelectQuery::default()
        .filter(property::NAMESPACE, "dev")
        .sort(property::NAME, SortDirection::Descending)
        .paginate(5, 1)
        .metric("replicas");
    let out = generic_data_select(&src, &q);
    assert_eq!(out.total_items, 12);
    assert_eq!(out.items.len(), 5);
    assert_eq!(out.items[0].name, "app-23");
    let expected_sum: i64 = src.iter().filter(|i| i.namespace == "dev").map(|i| i.replicas).sum();
    assert_eq!(out.metrics[0].value, expected_sum as f64);
    assert_eq!(out.metrics[0].data_points, 12);
}

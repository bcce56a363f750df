//! The capability every list record is adapted to before selection.

use std::borrow::Cow;
use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, SecondsFormat, Utc};
use rustc_hash::FxHashSet;

/// Property names understood by filter, sort and metric queries.
/// A record kind exposes whichever subset applies to it.
pub mod property {
    pub const NAME: &str = "name";
    pub const NAMESPACE: &str = "namespace";
    pub const CREATION_TIMESTAMP: &str = "creationTimestamp";
    pub const STATUS: &str = "status";
    pub const TYPE: &str = "type";
    pub const KIND: &str = "kind";
    pub const REASON: &str = "reason";
    pub const MESSAGE: &str = "message";
    pub const FIRST_SEEN: &str = "firstSeen";
    pub const LAST_SEEN: &str = "lastSeen";
    pub const LABEL: &str = "label";
    pub const NODE: &str = "node";
    pub const VALUE: &str = "value";
    pub const COUNT: &str = "count";
    pub const RESTART_COUNT: &str = "restartCount";
    pub const WARNINGS: &str = "warnings";
    pub const GLOBAL_DEFAULT: &str = "globalDefault";
    pub const DATA_KEYS: &str = "dataKeys";
}

/// A property value the engine can compare and match.
#[derive(Debug, Clone, PartialEq)]
pub enum ComparableValue<'a> {
    Str(Cow<'a, str>),
    Int(i64),
    Float(f64),
    Time(DateTime<Utc>),
    Labels(&'a BTreeMap<String, String>),
}

impl<'a> ComparableValue<'a> {
    pub fn str(s: &'a str) -> Self { ComparableValue::Str(Cow::Borrowed(s)) }

    fn rank(&self) -> u8 {
        match self {
            ComparableValue::Int(_) | ComparableValue::Float(_) => 0,
            ComparableValue::Str(_) => 1,
            ComparableValue::Time(_) => 2,
            ComparableValue::Labels(_) => 3,
        }
    }

    /// Total order. Ints and floats compare numerically; values of different
    /// shapes order by shape (numbers, strings, timestamps, labels).
    pub fn compare(&self, other: &ComparableValue<'_>) -> Ordering {
        use ComparableValue::*;
        match (self, other) {
            (Str(a), Str(b)) => (**a).cmp(&**b),
            (Int(a), Int(b)) => a.cmp(b),
            (Float(a), Float(b)) => a.total_cmp(b),
            (Int(a), Float(b)) => (*a as f64).total_cmp(b),
            (Float(a), Int(b)) => a.total_cmp(&(*b as f64)),
            (Time(a), Time(b)) => a.cmp(b),
            (Labels(a), Labels(b)) => a.cmp(b),
            _ => self.rank().cmp(&other.rank()),
        }
    }

    /// Whether this value satisfies a filter needle.
    ///
    /// Strings and timestamps: case-insensitive substring, or exact equality when
    /// `exact`. Numbers: numeric equality. Labels: `key=value` present, or `key`
    /// present when the needle has no `=`.
    pub fn matches(&self, needle: &str, exact: bool) -> bool {
        match self {
            ComparableValue::Str(s) => {
                if exact { **s == *needle } else { contains_ignore_case(s, needle) }
            }
            ComparableValue::Int(v) => needle.trim().parse::<i64>().map(|n| n == *v).unwrap_or(false),
            ComparableValue::Float(v) => needle.trim().parse::<f64>().map(|n| n == *v).unwrap_or(false),
            ComparableValue::Time(t) => {
                let rendered = t.to_rfc3339_opts(SecondsFormat::Secs, true);
                if exact { rendered == needle } else { contains_ignore_case(&rendered, needle) }
            }
            ComparableValue::Labels(m) => match needle.split_once('=') {
                Some((k, v)) => m.get(k.trim()).map(|x| x == v.trim()).unwrap_or(false),
                None => m.contains_key(needle.trim()),
            },
        }
    }

    /// Numeric view used by metric aggregation.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            ComparableValue::Int(v) => Some(*v as f64),
            ComparableValue::Float(v) if v.is_finite() => Some(*v),
            _ => None,
        }
    }
}

fn contains_ignore_case(haystack: &str, needle: &str) -> bool {
    haystack.to_lowercase().contains(&needle.to_lowercase())
}

/// Capability a list record implements so one engine can select over any kind.
pub trait DataCell {
    /// Value of a named property, or `None` when the record does not expose it.
    fn property(&self, name: &str) -> Option<ComparableValue<'_>>;

    /// Stable identity of the record.
    fn identity(&self) -> Cow<'_, str>;
}

/// Type-erased view of one record, remembering where it sat in the source slice.
/// Borrows the record; never outlives the selection call.
#[derive(Clone, Copy)]
pub struct Cell<'a> {
    pos: usize,
    inner: &'a dyn DataCell,
}

impl<'a> Cell<'a> {
    pub fn position(&self) -> usize { self.pos }

    pub fn property(&self, name: &str) -> Option<ComparableValue<'a>> { self.inner.property(name) }

    pub fn identity(&self) -> Cow<'a, str> { self.inner.identity() }
}

impl fmt::Debug for Cell<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Cell").field("pos", &self.pos).field("id", &self.identity()).finish()
    }
}

/// Adapt concrete records to cells, preserving order and count.
pub fn to_cells<T: DataCell>(records: &[T]) -> Vec<Cell<'_>> {
    records
        .iter()
        .enumerate()
        .map(|(pos, r)| Cell { pos, inner: r as &dyn DataCell })
        .collect()
}

/// Re-extract the concrete records behind `cells`, in cell order.
/// `records` must be the slice the cells were built from.
pub fn from_cells<T: Clone>(records: &[T], cells: &[Cell<'_>]) -> Vec<T> {
    cells.iter().filter_map(|c| records.get(c.pos).cloned()).collect()
}

/// Concatenate collections in retrieval order, dropping records whose identity
/// was already seen in an earlier one.
pub fn merge_unique<T: DataCell>(collections: Vec<Vec<T>>) -> Vec<T> {
    let mut seen: FxHashSet<String> = FxHashSet::default();
    let mut out = Vec::with_capacity(collections.iter().map(Vec::len).sum());
    for item in collections.into_iter().flatten() {
        if seen.insert(item.identity().into_owned()) {
            out.push(item);
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[derive(Debug, Clone, PartialEq)]
    struct Rec { id: &'static str, name: &'static str }

    impl DataCell for Rec {
        fn property(&self, name: &str) -> Option<ComparableValue<'_>> {
            match name {
                property::NAME => Some(ComparableValue::str(self.name)),
                _ => None,
            }
        }
        fn identity(&self) -> Cow<'_, str> { Cow::Borrowed(self.id) }
    }

    #[test]
    fn string_match_is_case_insensitive_substring() {
        let v = ComparableValue::str("Kube-System");
        assert!(v.matches("system", false));
        assert!(v.matches("KUBE", false));
        assert!(!v.matches("default", false));
        assert!(!v.matches("kube-system", true));
        assert!(v.matches("Kube-System", true));
    }

    #[test]
    fn numbers_match_by_value_and_compare_across_int_float() {
        assert!(ComparableValue::Int(3).matches(" 3", false));
        assert!(!ComparableValue::Int(3).matches("3x", false));
        assert!(ComparableValue::Float(1.5).matches("1.5", false));
        assert_eq!(ComparableValue::Int(2).compare(&ComparableValue::Float(2.5)), Ordering::Less);
        assert_eq!(ComparableValue::Float(2.0).compare(&ComparableValue::Int(2)), Ordering::Equal);
    }

    #[test]
    fn labels_match_pair_or_key() {
        let mut m = BTreeMap::new();
        m.insert("app".to_string(), "web".to_string());
        let v = ComparableValue::Labels(&m);
        assert!(v.matches("app=web", false));
        assert!(v.matches("app", false));
        assert!(!v.matches("app=api", false));
        assert!(!v.matches("tier", false));
    }

    #[test]
    fn time_matches_rfc3339_rendering() {
        let t = Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap();
        let v = ComparableValue::Time(t);
        assert!(v.matches("2024-03-01", false));
        assert!(v.matches("2024-03-01T12:00:00Z", true));
        assert!(!v.matches("2023", false));
    }

    #[test]
    fn mixed_shapes_order_by_shape() {
        let n = ComparableValue::Int(100);
        let s = ComparableValue::str("a");
        assert_eq!(n.compare(&s), Ordering::Less);
        assert_eq!(s.compare(&n), Ordering::Greater);
    }

    #[test]
    fn cells_round_trip_in_order() {
        let recs = vec![Rec { id: "2", name: "b" }, Rec { id: "1", name: "a" }, Rec { id: "3", name: "c" }];
        let cells = to_cells(&recs);
        assert_eq!(cells.len(), 3);
        assert_eq!(cells[1].position(), 1);
        assert_eq!(from_cells(&recs, &cells), recs);
        assert!(from_cells(&recs, &[]).is_empty());
    }

    #[test]
    fn merge_drops_repeated_identities() {
        let a = vec![Rec { id: "1", name: "a" }, Rec { id: "2", name: "b" }];
        let b = vec![Rec { id: "2", name: "b-again" }, Rec { id: "3", name: "c" }];
        let merged = merge_unique(vec![a, b]);
        let names: Vec<_> = merged.iter().map(|r| r.name).collect();
        assert_eq!(names, vec!["a", "b", "c"]);
    }
}

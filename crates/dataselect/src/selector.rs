//! The fixed selection pipeline: filter, (aggregate), sort, paginate.
//!
//! Stages are encoded in the type so the order cannot be changed: pagination only
//! exists on a sorted selector, which only exists on a filtered one, and metrics
//! can only be taken before pagination.

use std::cmp::Ordering;
use std::marker::PhantomData;

use serde::Serialize;
use tracing::debug;

use crate::aggregate::{aggregate, Metric};
use crate::cell::Cell;
use crate::query::{DataSelectQuery, FilterBy, SortBy};

pub struct Adapted;
pub struct Filtered;
pub struct Sorted;
pub struct Paginated;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SelectDebugInfo {
    pub total: usize,
    pub after_filter: usize,
    pub after_page: usize,
}

/// Cells selected by a finished pipeline.
#[derive(Debug)]
pub struct Selection<'a> {
    pub cells: Vec<Cell<'a>>,
    /// Cell count after filtering, before pagination.
    pub total_items: usize,
    pub metrics: Vec<Metric>,
    pub debug: SelectDebugInfo,
}

pub struct DataSelector<'q, 'a, S> {
    query: &'q DataSelectQuery,
    cells: Vec<Cell<'a>>,
    metrics: Vec<Metric>,
    debug: SelectDebugInfo,
    _stage: PhantomData<S>,
}

impl<'q, 'a, S> DataSelector<'q, 'a, S> {
    fn into_stage<T>(self) -> DataSelector<'q, 'a, T> {
        DataSelector { query: self.query, cells: self.cells, metrics: self.metrics, debug: self.debug, _stage: PhantomData }
    }
}

impl<'q, 'a> DataSelector<'q, 'a, Adapted> {
    pub fn new(cells: Vec<Cell<'a>>, query: &'q DataSelectQuery) -> Self {
        let debug = SelectDebugInfo { total: cells.len(), ..Default::default() };
        DataSelector { query, cells, metrics: Vec::new(), debug, _stage: PhantomData }
    }

    /// Keep cells satisfying every predicate, in input order. A predicate on a
    /// property the cell does not expose is a non-match.
    pub fn filter(mut self) -> DataSelector<'q, 'a, Filtered> {
        let preds = &self.query.filter_by.filter_by;
        if !preds.is_empty() {
            self.cells.retain(|c| preds.iter().all(|p| cell_matches(c, p)));
        }
        self.debug.after_filter = self.cells.len();
        debug!(before = self.debug.total, after = self.debug.after_filter, predicates = preds.len(), "dataselect: filtered");
        self.into_stage()
    }
}

fn cell_matches(cell: &Cell<'_>, pred: &FilterBy) -> bool {
    cell.property(&pred.property)
        .map(|v| v.matches(&pred.value, pred.exact))
        .unwrap_or(false)
}

impl<'q, 'a> DataSelector<'q, 'a, Filtered> {
    /// Compute the query's metrics over the filtered set.
    pub fn aggregate(mut self) -> Self {
        self.metrics = aggregate(&self.cells, &self.query.metrics);
        if !self.metrics.is_empty() {
            debug!(metrics = self.metrics.len(), "dataselect: aggregated");
        }
        self
    }

    /// Stable multi-key sort. Cells missing a key's property go after cells that
    /// have it, whatever the direction; full ties keep input order.
    pub fn sort(mut self) -> DataSelector<'q, 'a, Sorted> {
        let keys = &self.query.sort_by.sort_by;
        if !keys.is_empty() {
            self.cells.sort_by(|a, b| compare_cells(a, b, keys));
            debug!(keys = keys.len(), "dataselect: sorted");
        }
        self.into_stage()
    }
}

fn compare_cells(a: &Cell<'_>, b: &Cell<'_>, keys: &[SortBy]) -> Ordering {
    for key in keys {
        let ord = match (a.property(&key.property), b.property(&key.property)) {
            (Some(x), Some(y)) => key.direction.apply(x.compare(&y)),
            (Some(_), None) => Ordering::Less,
            (None, Some(_)) => Ordering::Greater,
            (None, None) => Ordering::Equal,
        };
        if ord != Ordering::Equal {
            return ord;
        }
    }
    Ordering::Equal
}

impl<'q, 'a> DataSelector<'q, 'a, Sorted> {
    pub fn paginate(mut self) -> DataSelector<'q, 'a, Paginated> {
        if let Some(range) = self.query.pagination.window(self.cells.len()) {
            self.cells.truncate(range.end);
            self.cells.drain(..range.start);
        }
        self.debug.after_page = self.cells.len();
        self.into_stage()
    }
}

impl<'q, 'a> DataSelector<'q, 'a, Paginated> {
    pub fn finish(self) -> Selection<'a> {
        Selection { total_items: self.debug.after_filter, cells: self.cells, metrics: self.metrics, debug: self.debug }
    }
}

/// Run the whole pipeline over already adapted cells.
pub fn select<'a>(cells: Vec<Cell<'a>>, query: &DataSelectQuery) -> Selection<'a> {
    let sel = DataSelector::new(cells, query).filter().aggregate().sort().paginate().finish();
    metrics::histogram!("kdash_select_items", sel.debug.after_filter as f64, "stage" => "filtered");
    metrics::histogram!("kdash_select_items", sel.debug.after_page as f64, "stage" => "page");
    debug!(
        total = sel.debug.total,
        after_filter = sel.debug.after_filter,
        after_page = sel.debug.after_page,
        "dataselect: done"
    );
    sel
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cell::{property, to_cells, ComparableValue, DataCell};
    use crate::query::SortDirection;
    use std::borrow::Cow;

    #[derive(Debug, Clone, PartialEq)]
    struct Row { id: u32, name: &'static str, rank: Option<i64> }

    impl DataCell for Row {
        fn property(&self, name: &str) -> Option<ComparableValue<'_>> {
            match name {
                property::NAME => Some(ComparableValue::str(self.name)),
                "rank" => self.rank.map(ComparableValue::Int),
                _ => None,
            }
        }
        fn identity(&self) -> Cow<'_, str> { Cow::Owned(self.id.to_string()) }
    }

    fn row(id: u32, name: &'static str, rank: Option<i64>) -> Row { Row { id, name, rank } }

    fn ids(sel: &Selection<'_>, rows: &[Row]) -> Vec<u32> {
        sel.cells.iter().map(|c| rows[c.position()].id).collect()
    }

    #[test]
    fn missing_property_sorts_last_in_both_directions() {
        let rows = vec![row(1, "a", None), row(2, "b", Some(2)), row(3, "c", Some(1))];
        let asc = DataSelectQuery::default().sort("rank", SortDirection::Ascending);
        assert_eq!(ids(&select(to_cells(&rows), &asc), &rows), vec![3, 2, 1]);
        let desc = DataSelectQuery::default().sort("rank", SortDirection::Descending);
        assert_eq!(ids(&select(to_cells(&rows), &desc), &rows), vec![2, 3, 1]);
    }

    #[test]
    fn secondary_key_breaks_ties_then_input_order() {
        let rows = vec![
            row(1, "x", Some(1)),
            row(2, "a", Some(2)),
            row(3, "b", Some(1)),
            row(4, "b", Some(1)),
        ];
        let q = DataSelectQuery::default()
            .sort("rank", SortDirection::Ascending)
            .sort(property::NAME, SortDirection::Descending);
        assert_eq!(ids(&select(to_cells(&rows), &q), &rows), vec![1, 3, 4, 2]);
    }

    #[test]
    fn filter_on_missing_property_excludes() {
        let rows = vec![row(1, "a", None), row(2, "ab", Some(1))];
        let q = DataSelectQuery::default().filter("rank", "1");
        let sel = select(to_cells(&rows), &q);
        assert_eq!(ids(&sel, &rows), vec![2]);
        assert_eq!(sel.total_items, 1);
    }

    #[test]
    fn metrics_ignore_pagination() {
        let rows: Vec<Row> = (1..=6).map(|i| row(i, "n", Some(i as i64))).collect();
        let q = DataSelectQuery::default().paginate(2, 1).metric("rank");
        let sel = select(to_cells(&rows), &q);
        assert_eq!(sel.cells.len(), 2);
        assert_eq!(sel.metrics.len(), 1);
        assert_eq!(sel.metrics[0].value, 21.0);
        assert_eq!(sel.metrics[0].data_points, 6);
    }

    #[test]
    fn debug_info_tracks_stage_counts() {
        let rows: Vec<Row> = (1..=5).map(|i| row(i, if i % 2 == 0 { "even" } else { "odd" }, None)).collect();
        let q = DataSelectQuery::default().filter(property::NAME, "odd").paginate(2, 2);
        let sel = select(to_cells(&rows), &q);
        assert_eq!(sel.debug, SelectDebugInfo { total: 5, after_filter: 3, after_page: 1 });
        assert_eq!(ids(&sel, &rows), vec![5]);
    }
}

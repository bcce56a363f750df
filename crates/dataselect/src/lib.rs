//! kdash dataselect: one filter/sort/paginate/aggregate engine for every list kind.
//!
//! Records implement [`DataCell`]; the engine only sees them through that capability,
//! as type-erased [`Cell`]s, and hands back positions the caller re-extracts from.

#![forbid(unsafe_code)]

pub mod aggregate;
pub mod cell;
pub mod query;
pub mod selector;

pub use aggregate::Metric;
pub use cell::{from_cells, merge_unique, property, to_cells, Cell, ComparableValue, DataCell};
pub use query::{
    AggregationMode, DataSelectQuery, FilterBy, FilterQuery, MetricQuery, PaginationQuery, QueryError, SortBy,
    SortDirection, SortQuery,
};
pub use selector::{select, DataSelector, SelectDebugInfo, Selection};

/// Concrete records chosen by [`generic_data_select`].
#[derive(Debug, Clone, PartialEq)]
pub struct Selected<T> {
    pub items: Vec<T>,
    /// Records matching the filter, before pagination.
    pub total_items: usize,
    pub metrics: Vec<Metric>,
}

/// Adapt, select and re-extract in one call.
pub fn generic_data_select<T: DataCell + Clone>(records: &[T], query: &DataSelectQuery) -> Selected<T> {
    let sel = select(to_cells(records), query);
    Selected { items: from_cells(records, &sel.cells), total_items: sel.total_items, metrics: sel.metrics }
}

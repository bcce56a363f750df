//! Data-select query: filter, sort, pagination and metric sub-queries.
//!
//! Every sub-query is optional; an absent one means "no constraint".
//! Queries arrive either as JSON (camelCase, see [`DataSelectQuery`]) or as
//! request parameters (`filterBy=name,web,namespace,prod`, `sortBy=d,creationTimestamp`,
//! `itemsPerPage=10`, `page=2`, `metricNames=restartCount`, `aggregations=sum,max`).

use std::ops::Range;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use smallvec::SmallVec;

use crate::cell::property;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum QueryError {
    #[error("filterBy expects property,value pairs: {0:?}")]
    OddFilterTokens(String),
    #[error("sortBy expects direction,property pairs: {0:?}")]
    OddSortTokens(String),
    #[error("empty property name in {0}")]
    EmptyProperty(&'static str),
    #[error("unknown sort direction {0:?} (expect a or d)")]
    UnknownDirection(String),
    #[error("unknown aggregation {0:?} (expect sum, max, min or average)")]
    UnknownAggregation(String),
    #[error("invalid {param}: {value:?}")]
    InvalidNumber { param: &'static str, value: String },
}

/// One filter predicate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilterBy {
    pub property: String,
    pub value: String,
    /// Exact, case-sensitive equality instead of substring containment.
    #[serde(default)]
    pub exact: bool,
}

/// Conjunction of predicates; a record must satisfy all of them.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FilterQuery {
    pub filter_by: SmallVec<[FilterBy; 4]>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortDirection {
    #[default]
    Ascending,
    Descending,
}

impl SortDirection {
    pub fn apply(self, ord: std::cmp::Ordering) -> std::cmp::Ordering {
        match self {
            SortDirection::Ascending => ord,
            SortDirection::Descending => ord.reverse(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SortBy {
    pub property: String,
    #[serde(default)]
    pub direction: SortDirection,
}

/// Sort keys; the first is primary, later ones break ties.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SortQuery {
    pub sort_by: SmallVec<[SortBy; 4]>,
}

/// 1-indexed page window. Missing or non-positive `items_per_page` disables pagination;
/// a missing `page` means the first page, a non-positive one is empty.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaginationQuery {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub items_per_page: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub page: Option<i64>,
}

impl PaginationQuery {
    pub fn new(items_per_page: i64, page: i64) -> Self {
        Self { items_per_page: Some(items_per_page), page: Some(page) }
    }

    /// Index range of the page within `len` items, or `None` when not paginating.
    /// Pages past the end yield an empty range.
    pub fn window(&self, len: usize) -> Option<Range<usize>> {
        let per_page = match self.items_per_page {
            Some(n) if n > 0 => n as u64,
            _ => return None,
        };
        let page = match self.page {
            None => 1,
            Some(p) if p > 0 => p as u64,
            Some(_) => return Some(0..0),
        };
        let start = (page - 1).saturating_mul(per_page).min(len as u64) as usize;
        let end = page.saturating_mul(per_page).min(len as u64) as usize;
        Some(start..end)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AggregationMode {
    Sum,
    Max,
    Min,
    #[serde(alias = "avg")]
    Average,
}

impl FromStr for AggregationMode {
    type Err = QueryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "sum" => Ok(AggregationMode::Sum),
            "max" => Ok(AggregationMode::Max),
            "min" => Ok(AggregationMode::Min),
            "average" | "avg" => Ok(AggregationMode::Average),
            _ => Err(QueryError::UnknownAggregation(s.to_string())),
        }
    }
}

/// Numeric properties to summarise over the filtered set. Aggregations default to `sum`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MetricQuery {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub metric_names: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub aggregations: Vec<AggregationMode>,
}

impl MetricQuery {
    pub fn is_empty(&self) -> bool { self.metric_names.is_empty() }
}

/// Immutable per-request query.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DataSelectQuery {
    #[serde(default)]
    pub filter_by: FilterQuery,
    #[serde(default)]
    pub sort_by: SortQuery,
    #[serde(flatten)]
    pub pagination: PaginationQuery,
    #[serde(flatten)]
    pub metrics: MetricQuery,
}

impl DataSelectQuery {
    /// Query selecting everything, in fetch order.
    pub fn no_data_select() -> Self { Self::default() }

    pub fn filter(mut self, property: impl Into<String>, value: impl Into<String>) -> Self {
        self.filter_by.filter_by.push(FilterBy { property: property.into(), value: value.into(), exact: false });
        self
    }

    pub fn filter_exact(mut self, property: impl Into<String>, value: impl Into<String>) -> Self {
        self.filter_by.filter_by.push(FilterBy { property: property.into(), value: value.into(), exact: true });
        self
    }

    pub fn sort(mut self, property: impl Into<String>, direction: SortDirection) -> Self {
        self.sort_by.sort_by.push(SortBy { property: property.into(), direction });
        self
    }

    pub fn paginate(mut self, items_per_page: i64, page: i64) -> Self {
        self.pagination = PaginationQuery::new(items_per_page, page);
        self
    }

    pub fn metric(mut self, name: impl Into<String>) -> Self {
        self.metrics.metric_names.push(name.into());
        self
    }

    pub fn aggregate(mut self, mode: AggregationMode) -> Self {
        self.metrics.aggregations.push(mode);
        self
    }

    /// Build a query from request parameters. Unknown keys are ignored; empty values
    /// are the same as absent ones.
    pub fn from_params<'a, I>(params: I) -> Result<Self, QueryError>
    where
        I: IntoIterator<Item = (&'a str, &'a str)>,
    {
        let mut q = Self::default();
        let mut items_per_page = None;
        let mut page = None;
        for (key, value) in params {
            match key {
                "filterBy" => q.filter_by = parse_filter_by(value)?,
                "sortBy" => q.sort_by = parse_sort_by(value)?,
                "itemsPerPage" => items_per_page = Some(value),
                "page" => page = Some(value),
                "metricNames" => q.metrics.metric_names = parse_list(value),
                "aggregations" => {
                    q.metrics.aggregations = parse_list(value)
                        .iter()
                        .map(|s| s.parse::<AggregationMode>())
                        .collect::<Result<Vec<_>, _>>()?;
                }
                _ => {}
            }
        }
        q.pagination = parse_pagination(items_per_page, page)?;
        Ok(q)
    }
}

fn parse_list(raw: &str) -> Vec<String> {
    raw.split(',').map(str::trim).filter(|s| !s.is_empty()).map(str::to_string).collect()
}

/// `prop,value,prop,value`. Namespace predicates match exactly.
pub fn parse_filter_by(raw: &str) -> Result<FilterQuery, QueryError> {
    let mut out = FilterQuery::default();
    if raw.trim().is_empty() {
        return Ok(out);
    }
    let tokens: Vec<&str> = raw.split(',').collect();
    if tokens.len() % 2 != 0 {
        return Err(QueryError::OddFilterTokens(raw.to_string()));
    }
    for pair in tokens.chunks(2) {
        let prop = pair[0].trim();
        if prop.is_empty() {
            return Err(QueryError::EmptyProperty("filterBy"));
        }
        out.filter_by.push(FilterBy {
            property: prop.to_string(),
            value: pair[1].trim().to_string(),
            exact: prop == property::NAMESPACE,
        });
    }
    Ok(out)
}

/// `a,prop,d,prop` where `a` is ascending and `d` descending.
pub fn parse_sort_by(raw: &str) -> Result<SortQuery, QueryError> {
    let mut out = SortQuery::default();
    if raw.trim().is_empty() {
        return Ok(out);
    }
    let tokens: Vec<&str> = raw.split(',').map(str::trim).collect();
    if tokens.len() % 2 != 0 {
        return Err(QueryError::OddSortTokens(raw.to_string()));
    }
    for pair in tokens.chunks(2) {
        let direction = match pair[0] {
            "a" | "asc" => SortDirection::Ascending,
            "d" | "desc" => SortDirection::Descending,
            other => return Err(QueryError::UnknownDirection(other.to_string())),
        };
        if pair[1].is_empty() {
            return Err(QueryError::EmptyProperty("sortBy"));
        }
        out.sort_by.push(SortBy { property: pair[1].to_string(), direction });
    }
    Ok(out)
}

pub fn parse_pagination(items_per_page: Option<&str>, page: Option<&str>) -> Result<PaginationQuery, QueryError> {
    fn num(param: &'static str, raw: Option<&str>) -> Result<Option<i64>, QueryError> {
        match raw.map(str::trim).filter(|s| !s.is_empty()) {
            None => Ok(None),
            Some(s) => s
                .parse::<i64>()
                .map(Some)
                .map_err(|_| QueryError::InvalidNumber { param, value: s.to_string() }),
        }
    }
    Ok(PaginationQuery { items_per_page: num("itemsPerPage", items_per_page)?, page: num("page", page)? })
}

//! Cumulative metrics over the filtered (unpaginated) cell set.

use serde::{Deserialize, Serialize};

use crate::cell::Cell;
use crate::query::{AggregationMode, MetricQuery};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Metric {
    pub metric_name: String,
    pub aggregation: AggregationMode,
    pub value: f64,
    /// Cells that exposed a numeric value for the metric.
    pub data_points: usize,
}

impl AggregationMode {
    fn apply(self, values: &[f64]) -> f64 {
        match self {
            AggregationMode::Sum => values.iter().sum(),
            AggregationMode::Max => values.iter().copied().fold(f64::NEG_INFINITY, f64::max),
            AggregationMode::Min => values.iter().copied().fold(f64::INFINITY, f64::min),
            AggregationMode::Average => values.iter().sum::<f64>() / values.len() as f64,
        }
    }
}

/// One entry per (metric name, aggregation). Names no cell exposes numerically are skipped.
pub fn aggregate(cells: &[Cell<'_>], query: &MetricQuery) -> Vec<Metric> {
    const DEFAULT_MODES: [AggregationMode; 1] = [AggregationMode::Sum];
    if query.is_empty() {
        return Vec::new();
    }
    let modes: &[AggregationMode] = if query.aggregations.is_empty() { &DEFAULT_MODES } else { &query.aggregations };
    let mut out = Vec::with_capacity(query.metric_names.len() * modes.len());
    for name in &query.metric_names {
        let values: Vec<f64> = cells
            .iter()
            .filter_map(|c| c.property(name).and_then(|v| v.as_f64()))
            .collect();
        if values.is_empty() {
            continue;
        }
        for mode in modes {
            out.push(Metric {
                metric_name: name.clone(),
                aggregation: *mode,
                value: mode.apply(&values),
                data_points: values.len(),
            });
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cell::{to_cells, ComparableValue, DataCell};
    use std::borrow::Cow;

    struct N(Option<i64>);

    impl DataCell for N {
        fn property(&self, name: &str) -> Option<ComparableValue<'_>> {
            match name {
                "n" => self.0.map(ComparableValue::Int),
                "label" => Some(ComparableValue::str("not a number")),
                _ => None,
            }
        }
        fn identity(&self) -> Cow<'_, str> { Cow::Owned(format!("{:?}", self.0)) }
    }

    #[test]
    fn computes_each_mode_over_numeric_cells_only() {
        let recs = vec![N(Some(2)), N(None), N(Some(6)), N(Some(1))];
        let cells = to_cells(&recs);
        let q = MetricQuery {
            metric_names: vec!["n".into()],
            aggregations: vec![AggregationMode::Sum, AggregationMode::Max, AggregationMode::Min, AggregationMode::Average],
        };
        let m = aggregate(&cells, &q);
        let values: Vec<f64> = m.iter().map(|m| m.value).collect();
        assert_eq!(values, vec![9.0, 6.0, 1.0, 3.0]);
        assert!(m.iter().all(|m| m.data_points == 3));
    }

    #[test]
    fn defaults_to_sum_and_skips_non_numeric() {
        let recs = vec![N(Some(2)), N(Some(3))];
        let cells = to_cells(&recs);
        let q = MetricQuery { metric_names: vec!["n".into(), "label".into(), "missing".into()], aggregations: vec![] };
        let m = aggregate(&cells, &q);
        assert_eq!(m.len(), 1);
        assert_eq!(m[0].aggregation, AggregationMode::Sum);
        assert_eq!(m[0].value, 5.0);
    }

    #[test]
    fn empty_query_yields_nothing() {
        let recs = vec![N(Some(2))];
        assert!(aggregate(&to_cells(&recs), &MetricQuery::default()).is_empty());
    }
}

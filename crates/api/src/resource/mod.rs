//! One module per list kind: display record, its [`DataCell`](kdash_dataselect::DataCell)
//! adapter, the retrievals it needs and the list function joining them.

pub mod configmap;
pub mod event;
pub mod namespace;
pub mod pod;
pub mod priorityclass;
pub mod resourcequota;

//! kdash kubehub: cluster client boundary, concurrent list retrieval and the
//! critical/non-critical error policy applied when joining retrievals.

#![forbid(unsafe_code)]

pub mod client;
pub mod errors;
pub mod fetch;

pub use client::{ClusterClient, ClusterError, KubeClient, MockCluster, NamespaceQuery};
pub use errors::{append_error, classify, ErrorAccumulator, RetrievalError, Role, Severity};
pub use fetch::{spawn_list, spawn_lists, Fetched, ListHandle};

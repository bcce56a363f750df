//! Request-level errors. Only critical retrieval failures end up here; non-critical
//! ones travel inside the envelope.

use kdash_core::ErrorInfo;
use kdash_dataselect::QueryError;
use kdash_kubehub::{ClusterError, RetrievalError};

#[derive(Debug, thiserror::Error)]
pub enum DashError {
    #[error(transparent)]
    Critical(#[from] RetrievalError),
    #[error("invalid query: {0}")]
    Query(#[from] QueryError),
    #[error("cluster: {0}")]
    Cluster(#[from] ClusterError),
    #[error("internal: {0}")]
    Internal(String),
}

pub type DashResult<T> = Result<T, DashError>;

impl DashError {
    /// HTTP-style status for a front end to answer with.
    pub fn status_code(&self) -> u16 {
        let cluster = |e: &ClusterError| match e {
            ClusterError::Transport(_) => 503,
            ClusterError::Unsupported(_) => 501,
            other => other.status().unwrap_or(500),
        };
        match self {
            DashError::Critical(e) => cluster(&e.source),
            DashError::Cluster(e) => cluster(e),
            DashError::Query(_) => 400,
            DashError::Internal(_) => 500,
        }
    }

    pub fn to_info(&self) -> ErrorInfo {
        match self {
            DashError::Critical(e) => e.to_info(),
            DashError::Cluster(e) => ErrorInfo {
                kind: None,
                status: e.status(),
                reason: e.reason().to_string(),
                message: e.to_string(),
            },
            DashError::Query(e) => ErrorInfo {
                kind: None,
                status: Some(400),
                reason: "BadRequest".to_string(),
                message: e.to_string(),
            },
            DashError::Internal(msg) => ErrorInfo {
                kind: None,
                status: Some(500),
                reason: "InternalError".to_string(),
                message: msg.clone(),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use kdash_core::ResourceKind;
    use kdash_kubehub::Role;

    #[test]
    fn status_codes() {
        let forbidden = RetrievalError::new(ResourceKind::Pod, Role::Primary, ClusterError::Forbidden("x".into()));
        assert_eq!(DashError::from(forbidden).status_code(), 403);
        let down = RetrievalError::new(ResourceKind::Pod, Role::Primary, ClusterError::Transport("eof".into()));
        assert_eq!(DashError::from(down).status_code(), 503);
        assert_eq!(DashError::from(QueryError::UnknownDirection("x".into())).status_code(), 400);
        assert_eq!(DashError::Internal("x".into()).to_info().status, Some(500));
    }
}

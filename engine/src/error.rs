//! Errors a caller can act upon.
//!
//! Broken invariants inside the algorithms panic instead, see the individual modules.

use crate::datastr::graph::NodeId;
use crate::query_graph::QueryGraphError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum RoutingError {
    #[error("weighting '{weighting}' applies turn costs, node based contraction cannot honor them (use edge based contraction)")]
    TurnCostsRequireEdgeBased { weighting: String },
    #[error("{name} must be a percentage in [0, 100], got {value}")]
    InvalidPercentage { name: &'static str, value: u32 },
    #[error("invalid contraction parameter: {0}")]
    InvalidContractionParams(&'static str),
    #[error("fixed node order covers {given} nodes but the graph has {expected}")]
    NodeOrderMismatch { given: usize, expected: usize },
    #[error("fixed node order contains node {0} twice or out of range")]
    InvalidNodeOrder(NodeId),
    #[error("invalid landmark configuration: {0}")]
    InvalidLandmarkConfig(&'static str),
    #[error(transparent)]
    Snap(#[from] QueryGraphError),
    #[error("persisted data is inconsistent: {0}")]
    InconsistentData(String),
}

impl From<RoutingError> for std::io::Error {
    fn from(err: RoutingError) -> Self {
        std::io::Error::new(std::io::ErrorKind::InvalidData, err)
    }
}

//! Playthrough error types.

use story_graph::{ChoiceId, NodeId};
use thiserror::Error;

use crate::gate::GateError;

/// Errors surfaced by the engine and the session serializer.
///
/// Every failing operation leaves the session exactly as it was.
#[derive(Debug, Error)]
pub enum PlaythroughError {
    /// A gate could not be parsed. During play such choices are simply hidden.
    #[error("invalid gate expression {gate:?}: {source}")]
    InvalidGateExpression {
        gate: String,
        #[source]
        source: GateError,
    },

    /// The choice is unknown or currently gated off.
    #[error("choice {choice_id} is not available at node {node_id}")]
    ChoiceNotFound { choice_id: ChoiceId, node_id: NodeId },

    /// The story graph does not contain a node the session needs.
    #[error("node not found: {0}")]
    NodeNotFound(NodeId),

    /// An imported record does not fit the supplied story graph.
    #[error("incompatible record: {0}")]
    IncompatibleRecord(String),
}

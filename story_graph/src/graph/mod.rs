//! Story graph definitions: identifiers, nodes, choices, and the read interface
//! the playthrough engine consumes.

mod node;
mod story;

pub use node::*;
pub use story::*;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Unique identifier for story nodes.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NodeId(pub String);

impl NodeId {
    /// Create a node ID from any string.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Create a fresh random node ID.
    pub fn generate() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for NodeId {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<String> for NodeId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl std::fmt::Display for NodeId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Identifier for a choice, unique within its node.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, Default)]
#[serde(transparent)]
pub struct ChoiceId(pub String);

impl ChoiceId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl From<&str> for ChoiceId {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl std::fmt::Display for ChoiceId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Read-only lookup interface over a story graph.
///
/// The engine only ever reads through this trait, so authoring tools are free
/// to keep their own representation.
pub trait StoryGraph {
    /// Human-readable story title.
    fn title(&self) -> &str;

    /// Node every new session begins at.
    fn start_node_id(&self) -> &NodeId;

    /// Look up a node by ID.
    fn get_node(&self, id: &NodeId) -> Option<&Node>;

    /// Check whether a node exists.
    fn contains_node(&self, id: &NodeId) -> bool {
        self.get_node(id).is_some()
    }
}

impl<T: StoryGraph + ?Sized> StoryGraph for &T {
    fn title(&self) -> &str {
        (**self).title()
    }

    fn start_node_id(&self) -> &NodeId {
        (**self).start_node_id()
    }

    fn get_node(&self, id: &NodeId) -> Option<&Node> {
        (**self).get_node(id)
    }
}

//! In-memory story graph and its file formats.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use thiserror::Error;
use tracing::{debug, warn};

use super::{ChoiceId, Node, NodeId, StoryGraph};

/// Errors raised while loading a story.
#[derive(Debug, Error)]
pub enum StoryError {
    #[error("invalid story JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("invalid story TOML: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("story has no nodes")]
    NoNodes,

    #[error("duplicate node id: {0}")]
    DuplicateNode(NodeId),

    #[error("node key {key} does not match its id {id}")]
    MismatchedKey { key: String, id: NodeId },
}

/// A complete story held in memory.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Story {
    pub title: String,
    pub description: String,
    pub start_node_id: NodeId,
    /// Nodes keyed by ID.
    pub nodes: BTreeMap<NodeId, Node>,
}

impl Story {
    /// Create a story containing just its start node.
    pub fn new(title: impl Into<String>, start: Node) -> Self {
        let start_node_id = start.id.clone();
        let mut nodes = BTreeMap::new();
        nodes.insert(start_node_id.clone(), start);
        Self {
            title: title.into(),
            description: String::new(),
            start_node_id,
            nodes,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    /// Add or replace a node, returning its ID.
    pub fn add_node(&mut self, node: Node) -> NodeId {
        let id = node.id.clone();
        self.nodes.insert(id.clone(), node);
        id
    }

    /// Builder form of [`Story::add_node`].
    pub fn with_node(mut self, node: Node) -> Self {
        self.add_node(node);
        self
    }

    /// Remove a node along with every choice pointing at it.
    ///
    /// Removing the start node moves the start to the first remaining node;
    /// the last node cannot be removed.
    pub fn remove_node(&mut self, id: &NodeId) -> Option<Node> {
        if self.nodes.len() <= 1 {
            return None;
        }
        let removed = self.nodes.remove(id)?;
        for node in self.nodes.values_mut() {
            node.choices.retain(|c| &c.target_node_id != id);
        }
        if &self.start_node_id == id {
            if let Some(first) = self.nodes.keys().next() {
                self.start_node_id = first.clone();
            }
        }
        Some(removed)
    }

    /// Iterate all nodes in ID order.
    pub fn nodes(&self) -> impl Iterator<Item = &Node> {
        self.nodes.values()
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Load a story from JSON.
    ///
    /// Accepts nodes either as a map keyed by ID or as a list.
    pub fn from_json_str(s: &str) -> Result<Self, StoryError> {
        let file: StoryFile = serde_json::from_str(s)?;
        file.into_story()
    }

    /// Load a story from TOML (`[[nodes]]` tables).
    pub fn from_toml_str(s: &str) -> Result<Self, StoryError> {
        let file: StoryFile = toml::from_str(s)?;
        file.into_story()
    }

    /// Serialize the story as pretty JSON.
    pub fn to_json_pretty(&self) -> Result<String, StoryError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Collect NPCs, locations and tags used across the story.
    pub fn summary(&self) -> StorySummary {
        let mut summary = StorySummary::default();
        for node in self.nodes.values() {
            if !node.metadata.npc.is_empty() {
                summary.npcs.insert(node.metadata.npc.clone());
            }
            if !node.metadata.location.is_empty() {
                summary.locations.insert(node.metadata.location.clone());
            }
            summary.tags.extend(node.tags.iter().cloned());
        }
        summary
    }
}

impl StoryGraph for Story {
    fn title(&self) -> &str {
        &self.title
    }

    fn start_node_id(&self) -> &NodeId {
        &self.start_node_id
    }

    fn get_node(&self, id: &NodeId) -> Option<&Node> {
        self.nodes.get(id)
    }
}

/// NPCs, locations and tags across a story, sorted and deduplicated.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StorySummary {
    pub npcs: BTreeSet<String>,
    pub locations: BTreeSet<String>,
    pub tags: BTreeSet<String>,
}

/// On-disk story layout, more permissive than [`Story`].
#[derive(Debug, Deserialize)]
struct StoryFile {
    #[serde(default = "untitled_story")]
    title: String,
    #[serde(default)]
    description: String,
    #[serde(default)]
    start_node_id: Option<NodeId>,
    #[serde(default)]
    nodes: NodeList,
}

fn untitled_story() -> String {
    "Untitled Story".to_string()
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum NodeList {
    Map(BTreeMap<String, Node>),
    List(Vec<Node>),
}

impl Default for NodeList {
    fn default() -> Self {
        NodeList::List(Vec::new())
    }
}

impl StoryFile {
    fn into_story(self) -> Result<Story, StoryError> {
        let listed: Vec<Node> = match self.nodes {
            NodeList::Map(map) => {
                let mut nodes = Vec::with_capacity(map.len());
                for (key, node) in map {
                    if key != node.id.0 {
                        return Err(StoryError::MismatchedKey { key, id: node.id });
                    }
                    nodes.push(node);
                }
                nodes
            }
            NodeList::List(list) => list,
        };

        let first_listed = listed.first().map(|n| n.id.clone());
        let mut nodes = BTreeMap::new();
        for mut node in listed {
            assign_missing_choice_ids(&mut node);
            if nodes.contains_key(&node.id) {
                return Err(StoryError::DuplicateNode(node.id));
            }
            nodes.insert(node.id.clone(), node);
        }

        let Some(first_listed) = first_listed else {
            return Err(StoryError::NoNodes);
        };
        let start_node_id = match self.start_node_id {
            Some(id) if nodes.contains_key(&id) => id,
            Some(id) => {
                warn!(start = %id, fallback = %first_listed, "start node missing; using first node");
                first_listed
            }
            None => first_listed,
        };

        debug!(
            title = %self.title,
            nodes = nodes.len(),
            start = %start_node_id,
            "loaded story"
        );

        Ok(Story {
            title: self.title,
            description: self.description,
            start_node_id,
            nodes,
        })
    }
}

/// Choices without an ID are named after their 1-based position.
fn assign_missing_choice_ids(node: &mut Node) {
    for (index, choice) in node.choices.iter_mut().enumerate() {
        if choice.id.is_empty() {
            choice.id = ChoiceId::new(format!("choice-{}", index + 1));
        }
    }
}

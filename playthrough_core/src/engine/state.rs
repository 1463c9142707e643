//! The mutable root of a playthrough session.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

use story_graph::{Effect, FlagStore, NodeId};

/// Everything a session remembers.
///
/// All collections are ordered so that equal states serialize to identical
/// bytes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoryState {
    pub current_node_id: NodeId,

    /// Nodes traversed, in order.
    pub history: Vec<NodeId>,

    /// Every node ever reached.
    pub visited: BTreeSet<NodeId>,

    pub flags: FlagStore,

    /// Item identifiers in pickup order; duplicates allowed.
    pub inventory: Vec<String>,

    /// Free-form DM notes. Never read by gates.
    pub notes: String,

    /// Set while `history` holds only the start entry seeded at session start.
    /// That entry doubles as the record of the first departure.
    #[serde(default)]
    pub(crate) seeded: bool,
}

impl StoryState {
    /// Fresh state positioned at `start`.
    pub fn new(start: NodeId) -> Self {
        let mut visited = BTreeSet::new();
        visited.insert(start.clone());
        Self {
            history: vec![start.clone()],
            current_node_id: start,
            visited,
            flags: FlagStore::new(),
            inventory: Vec::new(),
            notes: String::new(),
            seeded: true,
        }
    }

    /// Move to `target`, recording the node being left.
    ///
    /// The first move from a fresh session reuses the seeded start entry;
    /// every later move appends the departed node, self-loops included.
    pub(crate) fn move_to(&mut self, target: NodeId) {
        if self.seeded {
            self.seeded = false;
        } else {
            self.history.push(self.current_node_id.clone());
        }
        self.visited.insert(target.clone());
        self.current_node_id = target;
    }

    /// Apply one choice effect.
    pub(crate) fn apply_effect(&mut self, effect: &Effect) {
        match effect {
            Effect::SetFlag { name, value } => {
                self.flags.set(name.clone(), value.clone());
            }
            Effect::AddItem { item } => self.add_item(item.clone()),
            Effect::RemoveItem { item } => {
                self.remove_item(item);
            }
        }
    }

    pub(crate) fn add_item(&mut self, item: String) {
        self.inventory.push(item);
    }

    /// Remove the earliest copy of `item`. Returns `false` if there was none.
    pub(crate) fn remove_item(&mut self, item: &str) -> bool {
        match self.inventory.iter().position(|i| i == item) {
            Some(index) => {
                self.inventory.remove(index);
                true
            }
            None => false,
        }
    }

    /// Whether no move has been made since the session started.
    pub fn is_fresh(&self) -> bool {
        self.seeded
    }
}

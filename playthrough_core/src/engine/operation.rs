//! Recorded session operations, the unit of replay.

use serde::{Deserialize, Serialize};
use story_graph::{ChoiceId, FlagValue};

/// One successful mutation of a session.
///
/// Replaying the same operations from a fresh start over the same story
/// reproduces the same state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum Operation {
    ApplyChoice { choice_id: ChoiceId },
    SetFlag { name: String, value: FlagValue },
    RemoveFlag { name: String },
    AddItem { item: String },
    RemoveItem { item: String },
    SetNotes { text: String },
    Reset,
}

impl Operation {
    /// Operation type name, as logged during replay.
    pub fn kind(&self) -> &'static str {
        match self {
            Operation::ApplyChoice { .. } => "apply_choice",
            Operation::SetFlag { .. } => "set_flag",
            Operation::RemoveFlag { .. } => "remove_flag",
            Operation::AddItem { .. } => "add_item",
            Operation::RemoveItem { .. } => "remove_item",
            Operation::SetNotes { .. } => "set_notes",
            Operation::Reset => "reset",
        }
    }
}

//! Node, choice, and effect definitions.

use serde::{Deserialize, Serialize};

use super::{ChoiceId, NodeId};
use crate::flags::FlagValue;

/// Scene metadata shown alongside a node.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeMetadata {
    #[serde(default)]
    pub npc: String,
    #[serde(default)]
    pub location: String,
    /// Emotional tone of the scene (e.g. "wary", "menacing", "jovial").
    #[serde(default)]
    pub emotion: String,
}

/// A single beat of the story.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Node {
    pub id: NodeId,

    #[serde(default = "untitled")]
    pub title: String,

    #[serde(flatten)]
    pub metadata: NodeMetadata,

    #[serde(default)]
    pub tags: Vec<String>,

    /// Text read or paraphrased to the players.
    #[serde(default, alias = "text")]
    pub body_text: String,

    /// Hidden notes for the DM.
    #[serde(default)]
    pub gm_notes: String,

    /// Outgoing choices, in the order they are presented.
    #[serde(default)]
    pub choices: Vec<Choice>,
}

fn untitled() -> String {
    "(untitled)".to_string()
}

impl Node {
    /// Create a node with the given ID and title.
    pub fn new(id: impl Into<NodeId>, title: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            metadata: NodeMetadata::default(),
            tags: Vec::new(),
            body_text: String::new(),
            gm_notes: String::new(),
            choices: Vec::new(),
        }
    }

    pub fn with_body(mut self, body: impl Into<String>) -> Self {
        self.body_text = body.into();
        self
    }

    pub fn with_npc(mut self, npc: impl Into<String>) -> Self {
        self.metadata.npc = npc.into();
        self
    }

    pub fn with_location(mut self, location: impl Into<String>) -> Self {
        self.metadata.location = location.into();
        self
    }

    pub fn with_emotion(mut self, emotion: impl Into<String>) -> Self {
        self.metadata.emotion = emotion.into();
        self
    }

    pub fn with_tag(mut self, tag: impl Into<String>) -> Self {
        self.tags.push(tag.into());
        self
    }

    pub fn with_gm_notes(mut self, notes: impl Into<String>) -> Self {
        self.gm_notes = notes.into();
        self
    }

    /// Append a choice.
    pub fn with_choice(mut self, choice: Choice) -> Self {
        self.choices.push(choice);
        self
    }

    /// Find a choice by ID.
    pub fn choice(&self, id: &ChoiceId) -> Option<&Choice> {
        self.choices.iter().find(|c| &c.id == id)
    }

    /// A node without choices ends its branch.
    pub fn is_dead_end(&self) -> bool {
        self.choices.is_empty()
    }
}

/// An edge from one node to another.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Choice {
    /// Unique within the owning node. Loaders fill in missing IDs.
    #[serde(default)]
    pub id: ChoiceId,

    #[serde(default, alias = "text")]
    pub label: String,

    #[serde(alias = "target_id")]
    pub target_node_id: NodeId,

    /// Gate expression; `None` or blank means always available.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gate: Option<String>,

    /// Mutations applied, in order, when the choice is taken.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub effects: Vec<Effect>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,
}

impl Choice {
    /// Create an ungated choice.
    pub fn new(
        id: impl Into<ChoiceId>,
        label: impl Into<String>,
        target: impl Into<NodeId>,
    ) -> Self {
        Self {
            id: id.into(),
            label: label.into(),
            target_node_id: target.into(),
            gate: None,
            effects: Vec::new(),
            tags: Vec::new(),
        }
    }

    /// Set the gate expression.
    pub fn with_gate(mut self, gate: impl Into<String>) -> Self {
        self.gate = Some(gate.into());
        self
    }

    /// Append an effect.
    pub fn with_effect(mut self, effect: Effect) -> Self {
        self.effects.push(effect);
        self
    }

    pub fn with_tag(mut self, tag: impl Into<String>) -> Self {
        self.tags.push(tag.into());
        self
    }

    /// The gate source, or `None` if the choice is ungated.
    pub fn gate_source(&self) -> Option<&str> {
        self.gate.as_deref().filter(|g| !g.trim().is_empty())
    }
}

/// A primitive state mutation attached to a choice.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum Effect {
    SetFlag { name: String, value: FlagValue },
    AddItem { item: String },
    /// Removes the earliest matching item; absent items are ignored.
    RemoveItem { item: String },
}

impl Effect {
    pub fn set_flag(name: impl Into<String>, value: impl Into<FlagValue>) -> Self {
        Effect::SetFlag {
            name: name.into(),
            value: value.into(),
        }
    }

    pub fn add_item(item: impl Into<String>) -> Self {
        Effect::AddItem { item: item.into() }
    }

    pub fn remove_item(item: impl Into<String>) -> Self {
        Effect::RemoveItem { item: item.into() }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_node_builder() {
        let node = Node::new("gate", "The Iron Gate")
            .with_npc("Sergeant Thorne")
            .with_location("City Walls")
            .with_emotion("wary")
            .with_tag("guard")
            .with_choice(Choice::new("bribe", "Offer a coin", "inside").with_gate("gold >= 1"));

        assert_eq!(node.metadata.npc, "Sergeant Thorne");
        assert_eq!(node.choices.len(), 1);
        assert!(node.choice(&ChoiceId::from("bribe")).is_some());
        assert!(node.choice(&ChoiceId::from("climb")).is_none());
        assert!(!node.is_dead_end());
    }

    #[test]
    fn test_blank_gate_is_ungated() {
        let choice = Choice::new("a", "A", "b").with_gate("   ");
        assert!(choice.gate_source().is_none());

        let choice = Choice::new("a", "A", "b").with_gate("metB");
        assert_eq!(choice.gate_source(), Some("metB"));
    }

    #[test]
    fn test_effect_json_shape() {
        let effect = Effect::set_flag("metB", true);
        let json = serde_json::to_value(&effect).unwrap();
        assert_eq!(
            json,
            serde_json::json!({"op": "set_flag", "name": "metB", "value": true})
        );

        let parsed: Effect =
            serde_json::from_str(r#"{"op":"remove_item","item":"map"}"#).unwrap();
        assert_eq!(parsed, Effect::remove_item("map"));
    }

    #[test]
    fn test_legacy_field_names() {
        let node: Node = serde_json::from_str(
            r#"{
                "id": "n1",
                "title": "Tavern",
                "text": "The hearth crackles.",
                "npc": "Velka",
                "emotion": "jovial",
                "choices": [{"text": "Leave", "target_id": "n2", "gate": ""}]
            }"#,
        )
        .unwrap();

        assert_eq!(node.body_text, "The hearth crackles.");
        assert_eq!(node.metadata.npc, "Velka");
        assert_eq!(node.choices[0].label, "Leave");
        assert_eq!(node.choices[0].target_node_id, NodeId::from("n2"));
        assert!(node.choices[0].gate_source().is_none());
    }
}

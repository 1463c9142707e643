//! Session Serializer - turns a session into records and back.
//!
//! Two record shapes exist:
//! - [`CanonicalContext`]: the full state, handed to generation steps as context
//! - [`PlaythroughRecord`]: the path taken with node titles, for saving and sharing
//!
//! Exports never fail; a history entry whose node has been deleted gets a
//! placeholder title. Imports are strict and reject any record that refers to
//! nodes the story does not have.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

use story_graph::{FlagStore, NodeId, StoryGraph};
use tracing::{debug, info};

use crate::config::PlaythroughConfig;
use crate::engine::{validate_state, StoryState};
use crate::error::PlaythroughError;

/// Full session state as consumed by generation collaborators.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CanonicalContext {
    pub story_title: String,
    pub current_node: NodeId,
    pub history: Vec<NodeId>,
    pub visited: Vec<NodeId>,
    pub flags: FlagStore,
    pub inventory: Vec<String>,
    pub notes: String,
}

/// The path a session took, for download or save.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlaythroughRecord {
    pub story_title: String,
    pub path_node_ids: Vec<NodeId>,
    pub path_node_titles: Vec<String>,
    pub flags: FlagStore,
    pub inventory: Vec<String>,
    pub notes: String,
}

macro_rules! json_helpers {
    ($record:ty) => {
        impl $record {
            /// Serialize as pretty JSON.
            pub fn to_json_pretty(&self) -> Result<String, serde_json::Error> {
                serde_json::to_string_pretty(self)
            }

            /// Parse from JSON.
            pub fn from_json_str(s: &str) -> Result<Self, serde_json::Error> {
                serde_json::from_str(s)
            }
        }
    };
}

json_helpers!(CanonicalContext);
json_helpers!(PlaythroughRecord);

/// Converts between session state and export records.
pub struct SessionSerializer {
    config: PlaythroughConfig,
}

impl SessionSerializer {
    /// Create a serializer with the given configuration.
    pub fn new(config: PlaythroughConfig) -> Self {
        Self { config }
    }

    /// Create a serializer with default configuration.
    pub fn with_defaults() -> Self {
        Self::new(PlaythroughConfig::default())
    }

    /// Export the full state.
    pub fn export_context<G: StoryGraph + ?Sized>(
        &self,
        state: &StoryState,
        story: &G,
    ) -> CanonicalContext {
        CanonicalContext {
            story_title: story.title().to_string(),
            current_node: state.current_node_id.clone(),
            history: state.history.clone(),
            visited: state.visited.iter().cloned().collect(),
            flags: state.flags.clone(),
            inventory: state.inventory.clone(),
            notes: state.notes.clone(),
        }
    }

    /// Export the path taken, with titles looked up in `story`.
    ///
    /// The path is the history followed by the current node. A session that
    /// has not moved yet exports just its start node.
    pub fn export_playthrough<G: StoryGraph + ?Sized>(
        &self,
        state: &StoryState,
        story: &G,
    ) -> PlaythroughRecord {
        let mut path = state.history.clone();
        if !state.is_fresh() {
            path.push(state.current_node_id.clone());
        }

        let titles = path
            .iter()
            .map(|id| match story.get_node(id) {
                Some(node) => node.title.clone(),
                None => {
                    debug!(node = %id, "exporting placeholder title for missing node");
                    self.config.missing_node_title.clone()
                }
            })
            .collect();

        PlaythroughRecord {
            story_title: story.title().to_string(),
            path_node_ids: path,
            path_node_titles: titles,
            flags: state.flags.clone(),
            inventory: state.inventory.clone(),
            notes: state.notes.clone(),
        }
    }

    /// Rebuild state from a canonical context record.
    pub fn import_context<G: StoryGraph + ?Sized>(
        &self,
        record: &CanonicalContext,
        story: &G,
    ) -> Result<StoryState, PlaythroughError> {
        let visited: BTreeSet<NodeId> = record.visited.iter().cloned().collect();
        if visited.len() != record.visited.len() {
            return Err(PlaythroughError::IncompatibleRecord(
                "visited list contains duplicates".to_string(),
            ));
        }

        // A lone history entry equal to the current node reads as an unmoved session.
        let seeded = record.history.len() == 1 && record.history[0] == record.current_node;
        let state = StoryState {
            current_node_id: record.current_node.clone(),
            history: record.history.clone(),
            visited,
            flags: record.flags.clone(),
            inventory: record.inventory.clone(),
            notes: record.notes.clone(),
            seeded,
        };
        self.finish_import(state, &record.story_title, story)
    }

    /// Rebuild state from a playthrough record.
    ///
    /// The last path entry becomes the current node and the entries before it
    /// become the history; a single-entry path is both.
    pub fn import_playthrough<G: StoryGraph + ?Sized>(
        &self,
        record: &PlaythroughRecord,
        story: &G,
    ) -> Result<StoryState, PlaythroughError> {
        let Some((current, before)) = record.path_node_ids.split_last() else {
            return Err(PlaythroughError::IncompatibleRecord(
                "playthrough path is empty".to_string(),
            ));
        };
        if record.path_node_titles.len() != record.path_node_ids.len() {
            return Err(PlaythroughError::IncompatibleRecord(format!(
                "path has {} ids but {} titles",
                record.path_node_ids.len(),
                record.path_node_titles.len()
            )));
        }

        let seeded = before.is_empty();
        let history = if seeded {
            vec![current.clone()]
        } else {
            before.to_vec()
        };

        let state = StoryState {
            current_node_id: current.clone(),
            history,
            visited: record.path_node_ids.iter().cloned().collect(),
            flags: record.flags.clone(),
            inventory: record.inventory.clone(),
            notes: record.notes.clone(),
            seeded,
        };
        self.finish_import(state, &record.story_title, story)
    }

    fn finish_import<G: StoryGraph + ?Sized>(
        &self,
        state: StoryState,
        record_title: &str,
        story: &G,
    ) -> Result<StoryState, PlaythroughError> {
        validate_state(&state, story)?;
        if record_title != story.title() {
            debug!(
                record = record_title,
                story = story.title(),
                "record title differs from story title"
            );
        }
        info!(
            current = %state.current_node_id,
            history = state.history.len(),
            "session imported"
        );
        Ok(state)
    }
}

impl Default for SessionSerializer {
    fn default() -> Self {
        Self::with_defaults()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::Playthrough;
    use story_graph::{Choice, Effect, FlagValue, Node, Story};

    fn story() -> Story {
        Story::new(
            "The Relic",
            Node::new("A", "Crypt Gate").with_choice(
                Choice::new("enter", "Enter", "B")
                    .with_effect(Effect::set_flag("entered", true))
                    .with_effect(Effect::add_item("torch")),
            ),
        )
        .with_node(Node::new("B", "Ossuary").with_choice(Choice::new("descend", "Descend", "C")))
        .with_node(Node::new("C", "The Relic Hungers").with_choice(Choice::new("flee", "Flee", "A")))
    }

    fn played_state(story: &Story) -> StoryState {
        let mut playthrough = Playthrough::start(story).unwrap();
        playthrough.apply_choice("enter").unwrap();
        playthrough.apply_choice("descend").unwrap();
        playthrough.set_flag("reputation", 2);
        playthrough.set_notes("They took the long way.");
        playthrough.into_state()
    }

    #[test]
    fn test_export_context_shape() {
        let story = story();
        let state = played_state(&story);
        let context = SessionSerializer::with_defaults().export_context(&state, &story);

        let json = serde_json::to_value(&context).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "story_title": "The Relic",
                "current_node": "C",
                "history": ["A", "B"],
                "visited": ["A", "B", "C"],
                "flags": {"entered": true, "reputation": 2},
                "inventory": ["torch"],
                "notes": "They took the long way."
            })
        );
    }

    #[test]
    fn test_export_playthrough_path() {
        let story = story();
        let state = played_state(&story);
        let record = SessionSerializer::with_defaults().export_playthrough(&state, &story);

        assert_eq!(
            record.path_node_ids,
            vec![NodeId::from("A"), NodeId::from("B"), NodeId::from("C")]
        );
        assert_eq!(
            record.path_node_titles,
            vec!["Crypt Gate", "Ossuary", "The Relic Hungers"]
        );
        assert_eq!(record.flags.get("reputation"), Some(&FlagValue::Int(2)));
    }

    #[test]
    fn test_export_at_start_has_single_entry() {
        let story = story();
        let state = Playthrough::start(&story).unwrap().into_state();
        let record = SessionSerializer::default().export_playthrough(&state, &story);
        assert_eq!(record.path_node_ids, vec![NodeId::from("A")]);
    }

    #[test]
    fn test_missing_node_gets_placeholder_title() {
        let full = story();
        let state = played_state(&full);

        let mut edited = full.clone();
        edited.remove_node(&NodeId::from("B"));

        let config = PlaythroughConfig {
            missing_node_title: "[deleted]".to_string(),
            ..PlaythroughConfig::default()
        };
        let record = SessionSerializer::new(config).export_playthrough(&state, &edited);
        assert_eq!(
            record.path_node_titles,
            vec!["Crypt Gate", "[deleted]", "The Relic Hungers"]
        );
    }

    #[test]
    fn test_context_round_trip() {
        let story = story();
        let serializer = SessionSerializer::with_defaults();
        let state = played_state(&story);

        let first = serializer.export_context(&state, &story);
        let imported = serializer.import_context(&first, &story).unwrap();
        let second = serializer.export_context(&imported, &story);

        assert_eq!(imported, state);
        assert_eq!(first.to_json_pretty().unwrap(), second.to_json_pretty().unwrap());
    }

    #[test]
    fn test_playthrough_round_trip() {
        let story = story();
        let serializer = SessionSerializer::with_defaults();
        let state = played_state(&story);

        let first = serializer.export_playthrough(&state, &story);
        let json = first.to_json_pretty().unwrap();
        let parsed = PlaythroughRecord::from_json_str(&json).unwrap();
        let imported = serializer.import_playthrough(&parsed, &story).unwrap();
        let second = serializer.export_playthrough(&imported, &story);

        assert_eq!(first, second);
        assert_eq!(imported.current_node_id, NodeId::from("C"));
        assert_eq!(imported.history, vec![NodeId::from("A"), NodeId::from("B")]);
    }

    #[test]
    fn test_self_loops_survive_playthrough_round_trip() {
        let story = Story::new(
            "Vigil",
            Node::new("A", "Gate").with_choice(Choice::new("go", "Go", "B")),
        )
        .with_node(Node::new("B", "Watch").with_choice(Choice::new("wait", "Wait", "B")));
        let serializer = SessionSerializer::with_defaults();

        let mut playthrough = Playthrough::start(&story).unwrap();
        playthrough.apply_choice("go").unwrap();
        for _ in 0..3 {
            playthrough.apply_choice("wait").unwrap();
        }

        let record = serializer.export_playthrough(playthrough.state(), &story);
        assert_eq!(
            record.path_node_ids,
            ["A", "B", "B", "B", "B"].map(NodeId::from).to_vec()
        );

        let imported = serializer.import_playthrough(&record, &story).unwrap();
        assert_eq!(&imported, playthrough.state());
        assert_eq!(serializer.export_playthrough(&imported, &story), record);
    }

    #[test]
    fn test_single_entry_playthrough_import() {
        let story = story();
        let serializer = SessionSerializer::with_defaults();
        let state = Playthrough::start(&story).unwrap().into_state();

        let record = serializer.export_playthrough(&state, &story);
        let imported = serializer.import_playthrough(&record, &story).unwrap();
        assert_eq!(imported, state);
    }

    #[test]
    fn test_import_rejects_unknown_nodes() {
        let story = story();
        let serializer = SessionSerializer::with_defaults();
        let state = played_state(&story);

        let mut context = serializer.export_context(&state, &story);
        context.current_node = NodeId::from("Z");
        assert!(matches!(
            serializer.import_context(&context, &story),
            Err(PlaythroughError::IncompatibleRecord(_))
        ));

        let mut context = serializer.export_context(&state, &story);
        context.history.insert(0, NodeId::from("Z"));
        assert!(matches!(
            serializer.import_context(&context, &story),
            Err(PlaythroughError::IncompatibleRecord(_))
        ));

        let mut record = serializer.export_playthrough(&state, &story);
        record.path_node_ids[1] = NodeId::from("Z");
        assert!(matches!(
            serializer.import_playthrough(&record, &story),
            Err(PlaythroughError::IncompatibleRecord(_))
        ));
    }

    #[test]
    fn test_import_rejects_malformed_records() {
        let story = story();
        let serializer = SessionSerializer::with_defaults();
        let state = played_state(&story);

        let mut context = serializer.export_context(&state, &story);
        context.visited.retain(|id| id.as_str() != "C");
        assert!(serializer.import_context(&context, &story).is_err());

        let mut context = serializer.export_context(&state, &story);
        context.visited.push(NodeId::from("A"));
        assert!(serializer.import_context(&context, &story).is_err());

        let mut record = serializer.export_playthrough(&state, &story);
        record.path_node_titles.pop();
        assert!(serializer.import_playthrough(&record, &story).is_err());

        let mut record = serializer.export_playthrough(&state, &story);
        record.path_node_ids.clear();
        record.path_node_titles.clear();
        assert!(serializer.import_playthrough(&record, &story).is_err());
    }

    #[test]
    fn test_import_into_edited_story_fails() {
        let full = story();
        let serializer = SessionSerializer::with_defaults();
        let context = serializer.export_context(&played_state(&full), &full);

        let mut edited = full.clone();
        edited.remove_node(&NodeId::from("B"));
        assert!(serializer.import_context(&context, &edited).is_err());
    }
}

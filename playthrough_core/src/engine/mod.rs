//! Playthrough engine - the session state machine.
//!
//! A [`Playthrough`] owns one [`StoryState`] and reads a borrowed story graph.
//! Operations run to completion and either fully succeed or leave the state
//! untouched:
//!
//! 1. **Filter**: the current node's choices are checked against their gates
//! 2. **Validate**: only an offered choice may be taken
//! 3. **Resolve**: the target node must exist before anything changes
//! 4. **Apply**: effects run in order, history and visited are updated
//! 5. **Record**: the operation is appended to the journal for replay

mod operation;
mod state;

pub use operation::*;
pub use state::*;

use story_graph::{Choice, ChoiceId, FlagValue, Node, NodeId, StoryGraph};
use tracing::{debug, info, instrument};
use uuid::Uuid;

use crate::config::PlaythroughConfig;
use crate::error::PlaythroughError;
use crate::gate::{GateCache, GateError};

/// Identifier attached to a session's log lines.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SessionId(pub Uuid);

impl SessionId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for SessionId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for SessionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A choice together with whether it can currently be taken.
#[derive(Debug, Clone, PartialEq)]
pub struct ChoiceStatus<'g> {
    pub choice: &'g Choice,
    pub available: bool,
    /// Set when the gate could not be parsed.
    pub gate_error: Option<GateError>,
}

/// A single reader's session over a story graph.
#[derive(Debug)]
pub struct Playthrough<'g, G: StoryGraph + ?Sized> {
    story: &'g G,
    state: StoryState,
    journal: Vec<Operation>,
    gates: GateCache,
    config: PlaythroughConfig,
    session_id: SessionId,
}

impl<'g, G: StoryGraph + ?Sized> Playthrough<'g, G> {
    /// Start a new session at the story's start node.
    pub fn start(story: &'g G) -> Result<Self, PlaythroughError> {
        Self::start_with_config(story, PlaythroughConfig::default())
    }

    /// Start a new session with explicit configuration.
    pub fn start_with_config(
        story: &'g G,
        config: PlaythroughConfig,
    ) -> Result<Self, PlaythroughError> {
        let state = initial_state(story)?;
        let playthrough = Self::assemble(story, state, config);
        info!(
            session = %playthrough.session_id,
            story = story.title(),
            start = %playthrough.state.current_node_id,
            "playthrough started"
        );
        Ok(playthrough)
    }

    /// Continue a session from a previously exported state.
    ///
    /// The state must only reference nodes that exist in `story`.
    pub fn resume(story: &'g G, state: StoryState) -> Result<Self, PlaythroughError> {
        Self::resume_with_config(story, state, PlaythroughConfig::default())
    }

    pub fn resume_with_config(
        story: &'g G,
        state: StoryState,
        config: PlaythroughConfig,
    ) -> Result<Self, PlaythroughError> {
        validate_state(&state, story)?;
        let playthrough = Self::assemble(story, state, config);
        info!(
            session = %playthrough.session_id,
            current = %playthrough.state.current_node_id,
            "playthrough resumed"
        );
        Ok(playthrough)
    }

    /// Rebuild a session by replaying operations from a fresh start.
    pub fn replay<'o>(
        story: &'g G,
        operations: impl IntoIterator<Item = &'o Operation>,
    ) -> Result<Self, PlaythroughError> {
        Self::replay_with_config(story, operations, PlaythroughConfig::default())
    }

    pub fn replay_with_config<'o>(
        story: &'g G,
        operations: impl IntoIterator<Item = &'o Operation>,
        config: PlaythroughConfig,
    ) -> Result<Self, PlaythroughError> {
        let mut playthrough = Self::start_with_config(story, config)?;
        for operation in operations {
            playthrough.apply(operation)?;
        }
        Ok(playthrough)
    }

    fn assemble(story: &'g G, state: StoryState, config: PlaythroughConfig) -> Self {
        Self {
            story,
            state,
            journal: Vec::new(),
            gates: GateCache::new(config.cache_gates),
            config,
            session_id: SessionId::new(),
        }
    }

    pub fn state(&self) -> &StoryState {
        &self.state
    }

    /// Give up the session, keeping its state.
    pub fn into_state(self) -> StoryState {
        self.state
    }

    pub fn story(&self) -> &'g G {
        self.story
    }

    pub fn session_id(&self) -> SessionId {
        self.session_id
    }

    pub fn config(&self) -> &PlaythroughConfig {
        &self.config
    }

    /// Operations applied since start, resume, or the last reset.
    pub fn journal(&self) -> &[Operation] {
        &self.journal
    }

    /// The node the session is at.
    pub fn current_node(&self) -> Result<&'g Node, PlaythroughError> {
        let story = self.story;
        let id = &self.state.current_node_id;
        story
            .get_node(id)
            .ok_or_else(|| PlaythroughError::NodeNotFound(id.clone()))
    }

    /// Choices of the current node whose gates are open, in story order.
    pub fn available_choices(&self) -> Result<Vec<&'g Choice>, PlaythroughError> {
        let node = self.current_node()?;
        Ok(node
            .choices
            .iter()
            .filter(|choice| self.is_open(choice))
            .collect())
    }

    /// Every choice of the current node with its availability.
    pub fn choice_statuses(&self) -> Result<Vec<ChoiceStatus<'g>>, PlaythroughError> {
        let node = self.current_node()?;
        Ok(node
            .choices
            .iter()
            .map(|choice| ChoiceStatus {
                choice,
                available: self.is_open(choice),
                gate_error: choice
                    .gate_source()
                    .and_then(|source| self.gates.parse_error(source)),
            })
            .collect())
    }

    /// Whether the current node ends its branch.
    pub fn is_terminal(&self) -> Result<bool, PlaythroughError> {
        Ok(self.current_node()?.is_dead_end())
    }

    fn is_open(&self, choice: &Choice) -> bool {
        self.gates.evaluate(choice.gate_source(), &self.state.flags)
    }

    /// Take an available choice and move to its target.
    ///
    /// Fails with `ChoiceNotFound` for unknown or gated-off choices and with
    /// `NodeNotFound` if the target is missing; neither changes the state.
    #[instrument(skip_all, fields(session = %self.session_id))]
    pub fn apply_choice(
        &mut self,
        choice_id: impl Into<ChoiceId>,
    ) -> Result<&'g Node, PlaythroughError> {
        let choice_id = choice_id.into();
        let story = self.story;
        let node = self.current_node()?;

        let choice = node
            .choices
            .iter()
            .find(|choice| choice.id == choice_id && self.is_open(choice))
            .ok_or_else(|| PlaythroughError::ChoiceNotFound {
                choice_id: choice_id.clone(),
                node_id: node.id.clone(),
            })?;

        let target = story
            .get_node(&choice.target_node_id)
            .ok_or_else(|| PlaythroughError::NodeNotFound(choice.target_node_id.clone()))?;

        for effect in &choice.effects {
            self.state.apply_effect(effect);
        }
        self.state.move_to(target.id.clone());
        self.journal.push(Operation::ApplyChoice {
            choice_id: choice_id.clone(),
        });

        debug!(
            choice = %choice_id,
            from = %node.id,
            to = %target.id,
            effects = choice.effects.len(),
            "choice applied"
        );
        Ok(target)
    }

    /// Set a flag directly, outside the choice flow.
    pub fn set_flag(&mut self, name: impl Into<String>, value: impl Into<FlagValue>) {
        let name = name.into();
        let value = value.into();
        debug!(session = %self.session_id, flag = %name, value = %value, "flag set");
        self.state.flags.set(name.clone(), value.clone());
        self.journal.push(Operation::SetFlag { name, value });
    }

    /// Remove a flag, returning its previous value.
    pub fn remove_flag(&mut self, name: &str) -> Option<FlagValue> {
        let previous = self.state.flags.remove(name);
        self.journal.push(Operation::RemoveFlag {
            name: name.to_string(),
        });
        previous
    }

    pub fn add_inventory_item(&mut self, item: impl Into<String>) {
        let item = item.into();
        self.state.add_item(item.clone());
        self.journal.push(Operation::AddItem { item });
    }

    /// Remove the earliest copy of `item`. Removing an absent item is a no-op
    /// and returns `false`.
    pub fn remove_inventory_item(&mut self, item: &str) -> bool {
        let removed = self.state.remove_item(item);
        self.journal.push(Operation::RemoveItem {
            item: item.to_string(),
        });
        removed
    }

    /// Replace the DM notes.
    pub fn set_notes(&mut self, text: impl Into<String>) {
        let text = text.into();
        self.state.notes = text.clone();
        self.journal.push(Operation::SetNotes { text });
    }

    /// Discard everything and return to the story's start.
    pub fn reset(&mut self) -> Result<(), PlaythroughError> {
        self.state = initial_state(self.story)?;
        self.journal.clear();
        info!(session = %self.session_id, "playthrough reset");
        Ok(())
    }

    /// Apply a recorded operation.
    pub fn apply(&mut self, operation: &Operation) -> Result<(), PlaythroughError> {
        debug!(session = %self.session_id, op = operation.kind(), "applying recorded operation");
        match operation {
            Operation::ApplyChoice { choice_id } => {
                self.apply_choice(choice_id.clone())?;
            }
            Operation::SetFlag { name, value } => self.set_flag(name.clone(), value.clone()),
            Operation::RemoveFlag { name } => {
                self.remove_flag(name);
            }
            Operation::AddItem { item } => self.add_inventory_item(item.clone()),
            Operation::RemoveItem { item } => {
                self.remove_inventory_item(item);
            }
            Operation::SetNotes { text } => self.set_notes(text.clone()),
            Operation::Reset => self.reset()?,
        }
        Ok(())
    }
}

fn initial_state<G: StoryGraph + ?Sized>(story: &G) -> Result<StoryState, PlaythroughError> {
    let start = story.start_node_id();
    if !story.contains_node(start) {
        return Err(PlaythroughError::NodeNotFound(start.clone()));
    }
    Ok(StoryState::new(start.clone()))
}

/// Check that every node a state refers to exists in `story`.
pub fn validate_state<G: StoryGraph + ?Sized>(
    state: &StoryState,
    story: &G,
) -> Result<(), PlaythroughError> {
    let missing = |what: &str, id: &NodeId| {
        PlaythroughError::IncompatibleRecord(format!("{} {} is not in the story", what, id))
    };

    if !story.contains_node(&state.current_node_id) {
        return Err(missing("current node", &state.current_node_id));
    }
    if let Some(id) = state.history.iter().find(|id| !story.contains_node(id)) {
        return Err(missing("history entry", id));
    }
    if let Some(id) = state.visited.iter().find(|id| !story.contains_node(id)) {
        return Err(missing("visited node", id));
    }
    if state.seeded && state.history != [state.current_node_id.clone()] {
        return Err(PlaythroughError::IncompatibleRecord(
            "unmoved session must have only its current node in history".to_string(),
        ));
    }
    if !state.visited.contains(&state.current_node_id) {
        return Err(PlaythroughError::IncompatibleRecord(format!(
            "current node {} is not marked visited",
            state.current_node_id
        )));
    }
    Ok(())
}

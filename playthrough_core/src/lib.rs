//! # Playthrough Core
//!
//! Runs a single reader's path through a `story_graph` story. This crate decides
//! which choices are reachable, advances the session, and turns it into records
//! that can be saved, compared, or handed to a generation step.
//!
//! ## Core Components
//!
//! - **gate**: Closed-grammar boolean expressions evaluated against the flag store
//! - **engine**: The playthrough state machine, its operation journal and replay
//! - **serializer**: Canonical-context and playthrough export/import records
//! - **integrity**: Authoring-side checks for broken links and bad gates
//!
//! ## Design Philosophy
//!
//! - **Deterministic**: The same story and the same operations always produce the same state
//! - **Fail closed**: A gate that cannot be understood hides its choice instead of crashing the session
//! - **Owned state**: Every session owns its state; the story is only ever read

pub mod config;
pub mod engine;
pub mod error;
pub mod gate;
pub mod integrity;
pub mod serializer;

pub use config::*;
pub use engine::*;
pub use error::*;
pub use gate::{check, evaluate, Gate, GateError};
pub use integrity::*;
pub use serializer::*;

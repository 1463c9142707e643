//! # Story Graph
//!
//! The data side of BranchWeaver: story nodes, choices, effects, and the flag
//! store that gates read from. This crate holds no playthrough logic; it is the
//! read-only world the engine in `playthrough_core` walks through.

pub mod flags;
pub mod graph;

pub use flags::*;
pub use graph::*;

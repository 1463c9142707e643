//! Integrity inspection - authoring-side checks over a whole story.
//!
//! Play never depends on these checks; a broken link or gate only makes the
//! affected choice unusable. The report is for the author.

use serde::Serialize;
use std::collections::{BTreeSet, VecDeque};

use story_graph::{ChoiceId, NodeId, Story, StoryGraph};
use tracing::debug;

use crate::gate::Gate;

/// A choice pointing at a node that does not exist.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BrokenLink {
    pub node: NodeId,
    pub choice: ChoiceId,
    pub target: NodeId,
}

/// A gate that does not parse.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct InvalidGate {
    pub node: NodeId,
    pub choice: ChoiceId,
    pub gate: String,
    pub error: String,
}

/// Problems found in a story, each list in node order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct IntegrityReport {
    pub missing_start: Option<NodeId>,
    pub broken_targets: Vec<BrokenLink>,
    pub invalid_gates: Vec<InvalidGate>,
    pub unreachable: Vec<NodeId>,
    /// Node and the choice id it repeats.
    pub duplicate_choice_ids: Vec<(NodeId, ChoiceId)>,
    /// Nodes without choices. Informational only.
    pub dead_ends: Vec<NodeId>,
}

impl IntegrityReport {
    /// No problems apart from dead ends.
    pub fn is_clean(&self) -> bool {
        self.missing_start.is_none()
            && self.broken_targets.is_empty()
            && self.invalid_gates.is_empty()
            && self.unreachable.is_empty()
            && self.duplicate_choice_ids.is_empty()
    }
}

/// Inspect every node and choice of `story`.
pub fn inspect(story: &Story) -> IntegrityReport {
    let mut report = IntegrityReport::default();

    if !story.contains_node(story.start_node_id()) {
        report.missing_start = Some(story.start_node_id().clone());
    }

    for node in story.nodes() {
        if node.is_dead_end() {
            report.dead_ends.push(node.id.clone());
        }

        let mut seen = BTreeSet::new();
        for choice in &node.choices {
            if !seen.insert(&choice.id) {
                report
                    .duplicate_choice_ids
                    .push((node.id.clone(), choice.id.clone()));
            }

            if !story.contains_node(&choice.target_node_id) {
                report.broken_targets.push(BrokenLink {
                    node: node.id.clone(),
                    choice: choice.id.clone(),
                    target: choice.target_node_id.clone(),
                });
            }

            if let Some(source) = choice.gate_source() {
                if let Err(err) = Gate::parse(source) {
                    report.invalid_gates.push(InvalidGate {
                        node: node.id.clone(),
                        choice: choice.id.clone(),
                        gate: source.to_string(),
                        error: err.to_string(),
                    });
                }
            }
        }
    }

    let reachable = reachable_from_start(story);
    report.unreachable = story
        .nodes()
        .filter(|node| !reachable.contains(&node.id))
        .map(|node| node.id.clone())
        .collect();

    debug!(
        story = %story.title,
        clean = report.is_clean(),
        broken = report.broken_targets.len(),
        invalid_gates = report.invalid_gates.len(),
        unreachable = report.unreachable.len(),
        "story inspected"
    );
    report
}

/// Nodes reachable through any choice, ignoring gates.
fn reachable_from_start(story: &Story) -> BTreeSet<NodeId> {
    let mut reached = BTreeSet::new();
    let mut frontier = VecDeque::new();

    if story.contains_node(story.start_node_id()) {
        reached.insert(story.start_node_id().clone());
        frontier.push_back(story.start_node_id().clone());
    }

    while let Some(id) = frontier.pop_front() {
        let Some(node) = story.get_node(&id) else {
            continue;
        };
        for choice in &node.choices {
            let target = &choice.target_node_id;
            if story.contains_node(target) && reached.insert(target.clone()) {
                frontier.push_back(target.clone());
            }
        }
    }
    reached
}

#[cfg(test)]
mod tests {
    use super::*;
    use story_graph::{Choice, Node};

    #[test]
    fn test_clean_story() {
        let story = Story::new(
            "Clean",
            Node::new("A", "Start").with_choice(Choice::new("go", "Go", "B").with_gate("metB")),
        )
        .with_node(Node::new("B", "End"));

        let report = inspect(&story);
        assert!(report.is_clean());
        assert_eq!(report.dead_ends, vec![NodeId::from("B")]);
    }

    #[test]
    fn test_reports_every_problem() {
        let story = Story::new(
            "Messy",
            Node::new("A", "Start")
                .with_choice(Choice::new("go", "Go", "B"))
                .with_choice(Choice::new("go", "Go again", "B"))
                .with_choice(Choice::new("void", "Into the void", "nowhere"))
                .with_choice(Choice::new("roll", "Roll", "B").with_gate("Stealth DC12")),
        )
        .with_node(Node::new("B", "Reached"))
        .with_node(Node::new("island", "Island").with_choice(Choice::new("back", "Back", "A")));

        let report = inspect(&story);
        assert!(!report.is_clean());
        assert_eq!(report.missing_start, None);
        assert_eq!(
            report.broken_targets,
            vec![BrokenLink {
                node: NodeId::from("A"),
                choice: ChoiceId::from("void"),
                target: NodeId::from("nowhere"),
            }]
        );
        assert_eq!(report.invalid_gates.len(), 1);
        assert_eq!(report.invalid_gates[0].gate, "Stealth DC12");
        assert!(!report.invalid_gates[0].error.is_empty());
        assert_eq!(report.unreachable, vec![NodeId::from("island")]);
        assert_eq!(
            report.duplicate_choice_ids,
            vec![(NodeId::from("A"), ChoiceId::from("go"))]
        );
    }

    #[test]
    fn test_missing_start_makes_everything_unreachable() {
        let mut story = Story::new("Lost", Node::new("A", "Start"));
        story.start_node_id = NodeId::from("gone");

        let report = inspect(&story);
        assert_eq!(report.missing_start, Some(NodeId::from("gone")));
        assert_eq!(report.unreachable, vec![NodeId::from("A")]);
    }

    #[test]
    fn test_cycles_are_reachable() {
        let story = Story::new(
            "Loop",
            Node::new("A", "Start").with_choice(Choice::new("on", "On", "B")),
        )
        .with_node(Node::new("B", "Middle").with_choice(Choice::new("back", "Back", "A")));

        let report = inspect(&story);
        assert!(report.is_clean());
        assert!(report.dead_ends.is_empty());
    }
}

//! Graph-to-text linearization.

use std::fmt;

use log::warn;

use crate::graph::FlowGraph;
use crate::types::ShapeKind;

/// Diagnostic emitted in place of steps when no start node exists.
pub const NO_START_NODE: &str = "Error: No Start node found.";

/// One line of a generated algorithm.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AlgorithmStep {
    /// A visited symbol, rendered as `"<type>: <text>"`.
    Shape { kind: ShapeKind, text: String },
    /// A non-fatal traversal problem, rendered verbatim.
    Diagnostic(String),
}

impl fmt::Display for AlgorithmStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Shape { kind, text } => write!(f, "{kind}: {text}"),
            Self::Diagnostic(message) => f.write_str(message),
        }
    }
}

/// Depth-first walk from the start node, one step per reachable node.
///
/// The start node is the first node (in detection order) whose label
/// denotes `start`. Successors are visited in edge insertion order and
/// every node at most once, so a cycle cannot stall the walk. Without a
/// start node the result is a single [`AlgorithmStep::Diagnostic`].
#[must_use]
pub fn linearize(graph: &FlowGraph) -> Vec<AlgorithmStep> {
    let Some(start) = graph.start_node() else {
        warn!(nodes = graph.node_count(); "no start node, cannot linearize");
        return vec![AlgorithmStep::Diagnostic(NO_START_NODE.to_string())];
    };

    let mut visited = vec![false; graph.node_count()];
    let mut steps = Vec::with_capacity(graph.node_count());
    let mut stack = vec![start];

    while let Some(node) = stack.pop() {
        if std::mem::replace(&mut visited[node.index()], true) {
            continue;
        }
        let shape = graph.shape_at(node);
        steps.push(AlgorithmStep::Shape {
            kind: shape.kind,
            text: shape.text.clone(),
        });
        // Reversed so the first successor is popped first.
        stack.extend(
            graph
                .successors(node)
                .into_iter()
                .rev()
                .filter(|n| !visited[n.index()]),
        );
    }
    steps
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{BoundingBox, Polyline, ShapeRecord};

    fn shape(id: usize, kind: ShapeKind, text: &str) -> ShapeRecord {
        ShapeRecord {
            id,
            kind,
            bbox: BoundingBox::new(0, 0, 10, 10),
            polygon: Polyline::new(Vec::new()),
            text: text.to_string(),
        }
    }

    fn rendered(steps: &[AlgorithmStep]) -> Vec<String> {
        steps.iter().map(ToString::to_string).collect()
    }

    #[test]
    fn chain_is_walked_in_order() {
        let graph = FlowGraph::from_edges(
            vec![
                shape(0, ShapeKind::StartEnd, "Start"),
                shape(1, ShapeKind::Process, "Do Work"),
                shape(2, ShapeKind::StartEnd, "Stop"),
            ],
            &[(0, 1), (1, 2)],
        );
        assert_eq!(
            rendered(&linearize(&graph)),
            vec!["Start/End: Start", "Process: Do Work", "Start/End: Stop"]
        );
    }

    #[test]
    fn missing_start_yields_single_diagnostic() {
        let graph = FlowGraph::from_edges(vec![shape(0, ShapeKind::Decision, "x > 0")], &[]);
        assert_eq!(
            linearize(&graph),
            vec![AlgorithmStep::Diagnostic(NO_START_NODE.to_string())]
        );
    }

    #[test]
    fn empty_graph_yields_single_diagnostic() {
        let graph = FlowGraph::from_edges(Vec::new(), &[]);
        assert_eq!(rendered(&linearize(&graph)), vec![NO_START_NODE]);
    }

    #[test]
    fn start_need_not_be_the_first_node() {
        let graph = FlowGraph::from_edges(
            vec![
                shape(0, ShapeKind::Process, "orphan"),
                shape(1, ShapeKind::StartEnd, "BEGIN"),
                shape(2, ShapeKind::StartEnd, "End"),
            ],
            &[(1, 2)],
        );
        assert_eq!(
            rendered(&linearize(&graph)),
            vec!["Start/End: BEGIN", "Start/End: End"]
        );
    }

    #[test]
    fn cycle_terminates_and_visits_each_node_once() {
        let graph = FlowGraph::from_edges(
            vec![
                shape(0, ShapeKind::StartEnd, "Start"),
                shape(1, ShapeKind::Process, "a"),
                shape(2, ShapeKind::Decision, "b"),
            ],
            &[(0, 1), (1, 2), (2, 1), (2, 0)],
        );
        assert_eq!(
            rendered(&linearize(&graph)),
            vec!["Start/End: Start", "Process: a", "Decision: b"]
        );
    }

    #[test]
    fn branches_follow_insertion_order_depth_first() {
        let graph = FlowGraph::from_edges(
            vec![
                shape(0, ShapeKind::StartEnd, "Start"),
                shape(1, ShapeKind::Decision, "d"),
                shape(2, ShapeKind::Process, "yes"),
                shape(3, ShapeKind::Process, "no"),
                shape(4, ShapeKind::StartEnd, "Stop"),
            ],
            &[(0, 1), (1, 2), (1, 3), (2, 4), (3, 4)],
        );
        assert_eq!(
            rendered(&linearize(&graph)),
            vec![
                "Start/End: Start",
                "Decision: d",
                "Process: yes",
                "Start/End: Stop",
                "Process: no"
            ]
        );
    }

    #[test]
    fn unreachable_nodes_are_not_emitted() {
        let graph = FlowGraph::from_edges(
            vec![
                shape(0, ShapeKind::StartEnd, "Start"),
                shape(1, ShapeKind::Process, "island"),
            ],
            &[],
        );
        assert_eq!(rendered(&linearize(&graph)).len(), 1);
    }
}

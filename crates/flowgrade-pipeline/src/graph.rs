//! Flow graph construction and structural validation.
//!
//! Arrow geometry in photographed charts is too unreliable to match
//! arrow endpoints to symbols, so edges are inferred from layout
//! instead: each symbol flows into the nearest symbol below it.
//!
//! For every source shape, candidates are the other shapes whose top
//! edge is below the source's bottom edge (allowing a small overlap).
//! The candidate minimizing the Euclidean length of
//! (horizontal center offset, vertical gap) becomes the single outgoing
//! edge, provided that distance is shorter than a fraction of the
//! larger image dimension. Otherwise the source is a sink. Fan-in is
//! unrestricted; fan-out is 0 or 1.
//!
//! The resulting [`FlowGraph`] is a value: built whole by
//! [`GraphBuilder`] and never mutated afterwards.

use log::debug;
use petgraph::Direction;
use petgraph::algo::is_cyclic_directed;
use petgraph::graph::{DiGraph, NodeIndex};
use serde::Serialize;

use crate::text::{denotes_end, denotes_start};
use crate::types::{Dimensions, GraphPolicy, ShapeRecord};

/// Directed graph of labeled symbols with inferred flow edges.
#[derive(Debug, Clone)]
pub struct FlowGraph {
    graph: DiGraph<ShapeRecord, ()>,
}

/// Outcome of the structural checks behind [`FlowGraph::validate_flow`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct FlowValidation {
    pub has_start: bool,
    pub has_end: bool,
    pub acyclic: bool,
}

impl FlowValidation {
    /// All checks passed.
    #[must_use]
    pub const fn is_valid(self) -> bool {
        self.has_start && self.has_end && self.acyclic
    }
}

impl FlowGraph {
    /// Build a graph from explicit edges between shape ids.
    ///
    /// Intended for callers that have verified connectivity by other
    /// means, and for tests. Edges naming unknown ids are ignored.
    #[must_use]
    pub fn from_edges(shapes: Vec<ShapeRecord>, edges: &[(usize, usize)]) -> Self {
        let mut graph = DiGraph::with_capacity(shapes.len(), edges.len());
        let nodes: Vec<(usize, NodeIndex)> = shapes
            .into_iter()
            .map(|shape| (shape.id, graph.add_node(shape)))
            .collect();
        let lookup = |id: usize| nodes.iter().find(|(sid, _)| *sid == id).map(|&(_, n)| n);

        for &(from, to) in edges {
            if let (Some(a), Some(b)) = (lookup(from), lookup(to)) {
                graph.add_edge(a, b, ());
            } else {
                debug!(from, to; "ignoring edge between unknown shapes");
            }
        }
        Self { graph }
    }

    #[must_use]
    pub fn node_count(&self) -> usize {
        self.graph.node_count()
    }

    #[must_use]
    pub fn edge_count(&self) -> usize {
        self.graph.edge_count()
    }

    /// Shapes in node order.
    pub fn shapes(&self) -> impl Iterator<Item = &ShapeRecord> {
        self.graph.node_weights()
    }

    /// Edges as `(source id, target id)` pairs in insertion order.
    #[must_use]
    pub fn edges(&self) -> Vec<(usize, usize)> {
        self.graph
            .raw_edges()
            .iter()
            .map(|e| (self.graph[e.source()].id, self.graph[e.target()].id))
            .collect()
    }

    /// Number of outgoing edges of the shape with the given id.
    #[must_use]
    pub fn out_degree(&self, id: usize) -> usize {
        self.node_of(id)
            .map_or(0, |n| self.graph.neighbors_directed(n, Direction::Outgoing).count())
    }

    pub(crate) fn node_of(&self, id: usize) -> Option<NodeIndex> {
        self.graph.node_indices().find(|&n| self.graph[n].id == id)
    }

    pub(crate) fn shape_at(&self, node: NodeIndex) -> &ShapeRecord {
        &self.graph[node]
    }

    /// Successors of `node` in the order their edges were added.
    pub(crate) fn successors(&self, node: NodeIndex) -> Vec<NodeIndex> {
        // petgraph yields neighbors newest-first.
        let mut next: Vec<NodeIndex> = self
            .graph
            .neighbors_directed(node, Direction::Outgoing)
            .collect();
        next.reverse();
        next
    }

    /// First node, in node order, whose label denotes the start terminal.
    pub(crate) fn start_node(&self) -> Option<NodeIndex> {
        self.graph
            .node_indices()
            .find(|&n| denotes_start(&self.graph[n].text))
    }

    /// Run the structural checks individually.
    #[must_use]
    pub fn validation(&self) -> FlowValidation {
        FlowValidation {
            has_start: self.shapes().any(|s| denotes_start(&s.text)),
            has_end: self.shapes().any(|s| denotes_end(&s.text)),
            acyclic: !is_cyclic_directed(&self.graph),
        }
    }

    /// A chart is well-formed when it has a start label, an end label,
    /// and no directed cycle.
    #[must_use]
    pub fn validate_flow(&self) -> bool {
        self.validation().is_valid()
    }

    /// Human-readable summary of size and failed checks.
    #[must_use]
    pub fn validation_message(&self) -> String {
        let validation = self.validation();
        let mut message = format!(
            "Graph has {} nodes and {} edges",
            self.node_count(),
            self.edge_count()
        );
        let problems: Vec<&str> = [
            (!validation.has_start).then_some("no start node"),
            (!validation.has_end).then_some("no end node"),
            (!validation.acyclic).then_some("contains a cycle"),
        ]
        .into_iter()
        .flatten()
        .collect();
        if !problems.is_empty() {
            message.push_str("; ");
            message.push_str(&problems.join(", "));
        }
        message
    }
}

/// Infers flow edges from symbol layout.
#[derive(Debug, Clone)]
pub struct GraphBuilder {
    dimensions: Dimensions,
    policy: GraphPolicy,
}

impl GraphBuilder {
    #[must_use]
    pub const fn new(dimensions: Dimensions, policy: GraphPolicy) -> Self {
        Self { dimensions, policy }
    }

    /// Build the flow graph. Node order follows `shapes`.
    #[must_use]
    pub fn build(&self, shapes: Vec<ShapeRecord>) -> FlowGraph {
        let max_distance = f64::from(self.dimensions.max_side()) * self.policy.max_edge_fraction;

        let edges: Vec<(usize, usize)> = shapes
            .iter()
            .enumerate()
            .filter_map(|(i, source)| {
                let (j, distance) = self.nearest_below(i, &shapes)?;
                if distance < max_distance {
                    debug!(from = source.id, to = shapes[j].id, distance; "inferred edge");
                    Some((source.id, shapes[j].id))
                } else {
                    debug!(from = source.id, distance; "nearest candidate too far, sink");
                    None
                }
            })
            .collect();

        FlowGraph::from_edges(shapes, &edges)
    }

    /// Index and distance of the nearest shape below `shapes[source]`.
    ///
    /// Ties go to the earlier shape.
    fn nearest_below(&self, source: usize, shapes: &[ShapeRecord]) -> Option<(usize, f64)> {
        let from = shapes[source].bbox;
        let from_center = from.center();
        let floor = from.bottom() - self.policy.overlap_tolerance;

        shapes
            .iter()
            .enumerate()
            .filter(|&(j, candidate)| j != source && candidate.bbox.top() > floor)
            .map(|(j, candidate)| {
                let dx = (from_center.x - candidate.bbox.center().x).abs();
                let dy = candidate.bbox.top() - from.bottom();
                (j, dx.hypot(dy))
            })
            .fold(None, |best: Option<(usize, f64)>, (j, d)| match best {
                Some((_, best_d)) if best_d <= d => best,
                _ => Some((j, d)),
            })
    }
}

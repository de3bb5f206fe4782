//! State machine bodies.
//!
//! States and transitions live in a `petgraph` graph. Node and edge indices are
//! allocated in declaration order and never removed, so iterating them by index
//! reproduces the order in which the machine was written.
use std::collections::BTreeMap;

use petgraph::{
    Direction,
    graph::{DiGraph, EdgeIndex, NodeIndex},
    visit::EdgeRef,
};

use crate::{
    expr::{Assignment, ParseTree, parse_assignments},
    utils::ModelResult,
};

pub type StateId = NodeIndex;
pub type TransitionId = EdgeIndex;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct State {
    pub name: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct Transition {
    /// Boolean expression enabling the transition.
    pub guard: Option<String>,
    /// Assignments to output ports, `port = expression; ...`.
    pub output_actions: Option<String>,
    /// Assignments to attributes committed when the transition is taken.
    pub set_actions: Option<String>,
}

impl Transition {
    pub fn parse_guard(&self) -> ModelResult<Option<ParseTree>> {
        self.guard
            .as_deref()
            .filter(|guard| !guard.trim().is_empty())
            .map(ParseTree::parse)
            .transpose()
    }

    pub fn parse_output_actions(&self) -> ModelResult<Vec<Assignment>> {
        self.output_actions
            .as_deref()
            .map_or(Ok(Vec::new()), parse_assignments)
    }

    pub fn parse_set_actions(&self) -> ModelResult<Vec<Assignment>> {
        self.set_actions
            .as_deref()
            .map_or(Ok(Vec::new()), parse_assignments)
    }
}

#[derive(Debug, Clone, Default)]
pub struct FsmBody {
    graph: DiGraph<State, Transition>,
    index: BTreeMap<String, StateId>,
}

impl FsmBody {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a state, returning `None` when the name is already taken.
    pub fn add_state(&mut self, name: impl Into<String>) -> Option<StateId> {
        let name = name.into();
        if self.index.contains_key(&name) {
            return None;
        }
        let id = self.graph.add_node(State { name: name.clone() });
        self.index.insert(name, id);
        Some(id)
    }

    pub fn add_transition(
        &mut self,
        from: StateId,
        to: StateId,
        transition: Transition,
    ) -> TransitionId {
        self.graph.add_edge(from, to, transition)
    }

    pub fn state_id(&self, name: &str) -> Option<StateId> {
        self.index.get(name).copied()
    }

    pub fn state(&self, id: StateId) -> Option<&State> {
        self.graph.node_weight(id)
    }

    pub fn transition(&self, id: TransitionId) -> Option<&Transition> {
        self.graph.edge_weight(id)
    }

    pub fn endpoints(&self, id: TransitionId) -> Option<(StateId, StateId)> {
        self.graph.edge_endpoints(id)
    }

    /// States in declaration order.
    pub fn states(&self) -> impl Iterator<Item = (StateId, &State)> {
        self.graph
            .node_indices()
            .filter_map(move |id| self.graph.node_weight(id).map(|state| (id, state)))
    }

    /// Outgoing transitions of `state` in declaration order.
    pub fn outgoing(&self, state: StateId) -> Vec<(TransitionId, &Transition)> {
        let mut edges: Vec<_> = self
            .graph
            .edges_directed(state, Direction::Outgoing)
            .map(|edge| (edge.id(), edge.weight()))
            .collect();
        edges.sort_by_key(|(id, _)| *id);
        edges
    }

    /// Every transition, grouped by source state in state declaration order.
    pub fn transitions(&self) -> impl Iterator<Item = (TransitionId, &Transition)> {
        self.states().flat_map(move |(id, _)| self.outgoing(id))
    }

    pub fn state_count(&self) -> usize {
        self.graph.node_count()
    }

    pub fn transition_count(&self) -> usize {
        self.graph.edge_count()
    }
}

//! Graph View Adapter
//!
//! Contract between the store and whatever renders the graph. The two
//! directions are kept apart:
//! - `GraphView` methods: the store pushes model changes into the view
//! - `GraphIntent` messages: the view reports user gestures back to the store
//!
//! A view never edits the model; it only renders it and asks for changes.

mod headless;
mod layout;

use serde::{Deserialize, Serialize};
use thiserror::Error;

pub use headless::{HeadlessGraphView, Size, ViewEdge, ViewNode};
pub use layout::{EdgeCell, LayoutCell, NodeCell, PortRef, VisualLayout};

use crate::graph::{Position, State, StateId, StateKind, Transition, TransitionId};

/// Direction of a connection point on a node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum PortGroup {
    In,
    Out,
}

/// Port groups a node of the given kind exposes.
///
/// Entry and AnyState can only be left, Exit can only be entered.
pub fn ports_for(kind: StateKind) -> &'static [PortGroup] {
    match kind {
        StateKind::Normal => &[PortGroup::In, PortGroup::Out],
        StateKind::Entry | StateKind::AnyState => &[PortGroup::Out],
        StateKind::Exit => &[PortGroup::In],
    }
}

/// Visual shape of a node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum NodeShape {
    State,
    InternalState,
}

impl From<StateKind> for NodeShape {
    fn from(kind: StateKind) -> Self {
        if kind.is_pseudo() {
            NodeShape::InternalState
        } else {
            NodeShape::State
        }
    }
}

/// What a context menu was opened on.
#[derive(Debug, Clone, PartialEq)]
pub enum ContextTarget {
    Blank,
    State(StateId),
    Transition(TransitionId),
}

/// Context menu request forwarded to the host UI.
#[derive(Debug, Clone, PartialEq)]
pub struct ContextMenuInfo {
    pub target: ContextTarget,
    pub position: Position,
}

/// A user gesture the view asks the store to apply.
#[derive(Debug, Clone, PartialEq)]
pub enum GraphIntent {
    StateClicked(StateId),
    TransitionClicked(TransitionId),
    BlankClicked,
    /// Node drag released at its final position.
    StateMoved { id: StateId, position: Position },
    StatesDeleted(Vec<StateId>),
    TransitionsDeleted(Vec<TransitionId>),
    /// A drag finished on a valid inbound port.
    TransitionConnected {
        id: TransitionId,
        source: StateId,
        destination: StateId,
    },
    /// An existing edge's arrow end was dropped on another node.
    TransitionRetargeted {
        id: TransitionId,
        destination: StateId,
    },
    /// `None` closes the menu.
    ContextMenu(Option<ContextMenuInfo>),
}

/// Why a connection gesture was refused by the view.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConnectionRejected {
    #[error("No node '{0}' in the view")]
    UnknownNode(String),

    #[error("No edge '{0}' in the view")]
    UnknownEdge(String),

    #[error("Node '{0}' has no outbound port to drag from")]
    InboundOnly(String),

    #[error("Node '{0}' has no inbound port to connect to")]
    NotInbound(String),

    #[error("An edge from '{source_id}' to '{target_id}' already exists")]
    Duplicate { source_id: String, target_id: String },

    #[error("No connection drag in progress")]
    NoPendingConnection,
}

/// Rendering surface driven by the store.
pub trait GraphView {
    /// Render a node for a newly registered state.
    fn add_state(&mut self, state: &State);

    /// Render an edge for a newly registered transition.
    fn add_transition(&mut self, transition: &Transition);

    /// Refresh a node after its content changed.
    fn sync_state(&mut self, state: &State);

    /// Refresh an edge after its settings or endpoints changed.
    fn sync_transition(&mut self, transition: &Transition);

    fn remove_state(&mut self, id: &StateId);

    fn remove_transition(&mut self, id: &TransitionId);

    /// Drop every node and edge.
    fn reset(&mut self);

    /// Serialize the current view for the layout cache.
    fn export_layout(&self) -> VisualLayout;

    /// Take the gestures recorded since the last call.
    fn drain_intents(&mut self) -> Vec<GraphIntent>;
}

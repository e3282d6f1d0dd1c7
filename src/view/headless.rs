//! Headless Graph View
//!
//! An in-memory rendering surface. It keeps nodes, ports and edges in step
//! with the store, tracks selection, drag and connection gestures, and turns
//! them into `GraphIntent`s. It is also what produces the layout blob.

use indexmap::{IndexMap, IndexSet};
use log::{debug, trace};

use super::{
    ports_for, ConnectionRejected, ContextMenuInfo, ContextTarget, EdgeCell, GraphIntent,
    GraphView, LayoutCell, NodeCell, NodeShape, PortGroup, PortRef, VisualLayout,
};
use crate::asset::{StateData, TransitionData};
use crate::graph::{Position, State, StateId, StateKind, Transition, TransitionId};

/// Size of the view's container.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Size {
    pub width: f64,
    pub height: f64,
}

impl Size {
    pub const fn new(width: f64, height: f64) -> Self {
        Self { width, height }
    }

    /// A container with no area cannot be laid out yet.
    pub fn is_empty(&self) -> bool {
        self.width <= 0.0 || self.height <= 0.0
    }
}

/// A rendered node.
#[derive(Debug, Clone, PartialEq)]
pub struct ViewNode {
    pub id: StateId,
    pub kind: StateKind,
    pub shape: NodeShape,
    pub label: String,
    pub position: Position,
    pub ports: Vec<PortGroup>,
    pub data: StateData,
}

impl ViewNode {
    fn from_state(state: &State) -> Self {
        Self {
            id: state.id().clone(),
            kind: state.kind(),
            shape: NodeShape::from(state.kind()),
            label: state.name().to_string(),
            position: state.position(),
            ports: ports_for(state.kind()).to_vec(),
            data: state.data(),
        }
    }

    pub fn has_port(&self, group: PortGroup) -> bool {
        self.ports.contains(&group)
    }
}

/// A rendered edge.
#[derive(Debug, Clone, PartialEq)]
pub struct ViewEdge {
    pub id: TransitionId,
    pub source: StateId,
    pub target: StateId,
    pub data: TransitionData,
}

impl ViewEdge {
    fn from_transition(transition: &Transition) -> Self {
        Self {
            id: transition.id().clone(),
            source: transition.source().clone(),
            target: transition.destination().clone(),
            data: transition.data(),
        }
    }
}

/// In-memory graph view.
#[derive(Debug, Default)]
pub struct HeadlessGraphView {
    nodes: IndexMap<StateId, ViewNode>,
    edges: IndexMap<TransitionId, ViewEdge>,
    selected_nodes: IndexSet<StateId>,
    selected_edges: IndexSet<TransitionId>,
    dragging: Option<StateId>,
    connecting: Option<StateId>,
    viewport: Size,
    needs_reflow: bool,
    reflow_count: usize,
    context_menu: Option<ContextMenuInfo>,
    intents: Vec<GraphIntent>,
}

impl HeadlessGraphView {
    pub fn new() -> Self {
        Self::default()
    }

    // ========== Container ==========

    /// Attach the view to a container. A zero-sized container is accepted
    /// and laid out once it gets a real size.
    pub fn mount(&mut self, size: Size) {
        self.viewport = size;
        if size.is_empty() {
            debug!("Graph view mounted in a zero-sized container, deferring layout");
            self.needs_reflow = true;
        } else {
            self.reflow();
        }
    }

    /// Observed container size changed. Any new non-empty size re-flows.
    pub fn resize(&mut self, size: Size) {
        let changed = size != self.viewport;
        self.viewport = size;
        if size.is_empty() {
            self.needs_reflow = true;
        } else if self.needs_reflow || changed {
            self.reflow();
        }
    }

    fn reflow(&mut self) {
        self.needs_reflow = false;
        self.reflow_count += 1;
        trace!(
            "Graph view reflow #{} at {}x{}",
            self.reflow_count,
            self.viewport.width,
            self.viewport.height
        );
    }

    // ========== Accessors ==========

    pub fn node(&self, id: &str) -> Option<&ViewNode> {
        self.nodes.get(id)
    }

    pub fn edge(&self, id: &str) -> Option<&ViewEdge> {
        self.edges.get(id)
    }

    pub fn nodes(&self) -> impl Iterator<Item = &ViewNode> {
        self.nodes.values()
    }

    pub fn edges(&self) -> impl Iterator<Item = &ViewEdge> {
        self.edges.values()
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    pub fn selected_nodes(&self) -> impl Iterator<Item = &StateId> {
        self.selected_nodes.iter()
    }

    pub fn selected_edges(&self) -> impl Iterator<Item = &TransitionId> {
        self.selected_edges.iter()
    }

    pub fn viewport(&self) -> Size {
        self.viewport
    }

    pub fn needs_reflow(&self) -> bool {
        self.needs_reflow
    }

    pub fn reflow_count(&self) -> usize {
        self.reflow_count
    }

    pub fn context_menu(&self) -> Option<&ContextMenuInfo> {
        self.context_menu.as_ref()
    }

    pub fn is_connecting(&self) -> bool {
        self.connecting.is_some()
    }

    /// Intents recorded but not yet drained.
    pub fn pending_intents(&self) -> &[GraphIntent] {
        &self.intents
    }

    // ========== Selection ==========

    /// Select a node. Without `additive` the previous selection is replaced.
    pub fn select_node(&mut self, id: &str, additive: bool) -> bool {
        let Some(node) = self.nodes.get(id) else {
            return false;
        };
        if !additive {
            self.selected_nodes.clear();
            self.selected_edges.clear();
        }
        self.selected_nodes.insert(node.id.clone());
        true
    }

    pub fn select_edge(&mut self, id: &str, additive: bool) -> bool {
        let Some(edge) = self.edges.get(id) else {
            return false;
        };
        if !additive {
            self.selected_nodes.clear();
            self.selected_edges.clear();
        }
        self.selected_edges.insert(edge.id.clone());
        true
    }

    pub fn clear_selection(&mut self) {
        self.selected_nodes.clear();
        self.selected_edges.clear();
    }

    /// Ask for the selected cells to be deleted, one request per kind.
    pub fn delete_selection(&mut self) {
        let states: Vec<StateId> = self.selected_nodes.drain(..).collect();
        let transitions: Vec<TransitionId> = self.selected_edges.drain(..).collect();
        if !states.is_empty() {
            self.intents.push(GraphIntent::StatesDeleted(states));
        }
        if !transitions.is_empty() {
            self.intents.push(GraphIntent::TransitionsDeleted(transitions));
        }
    }

    // ========== Gestures ==========

    pub fn click_node(&mut self, id: &str) {
        if self.select_node(id, false) {
            self.intents.push(GraphIntent::StateClicked(StateId::new(id)));
        }
    }

    pub fn click_edge(&mut self, id: &str) {
        if self.select_edge(id, false) {
            self.intents
                .push(GraphIntent::TransitionClicked(TransitionId::new(id)));
        }
    }

    pub fn click_blank(&mut self) {
        self.clear_selection();
        self.close_context_menu();
        self.intents.push(GraphIntent::BlankClicked);
    }

    /// Move a node while dragging. Only the rendering moves; the store hears
    /// about it on release.
    pub fn drag_node(&mut self, id: &str, position: Position) {
        if let Some(node) = self.nodes.get_mut(id) {
            node.position = position;
            self.dragging = Some(node.id.clone());
        }
    }

    /// Finish a drag and forward the final position.
    pub fn release_node(&mut self, id: &str) {
        if self.dragging.as_ref().map(StateId::as_str) == Some(id) {
            self.dragging = None;
        }
        if let Some(node) = self.nodes.get(id) {
            self.intents.push(GraphIntent::StateMoved {
                id: node.id.clone(),
                position: node.position,
            });
        }
    }

    /// Start dragging a new edge out of a node's port.
    pub fn begin_connection(
        &mut self,
        source: &str,
        port: PortGroup,
    ) -> Result<(), ConnectionRejected> {
        let node = self
            .nodes
            .get(source)
            .ok_or_else(|| ConnectionRejected::UnknownNode(source.to_string()))?;
        if port != PortGroup::Out || !node.has_port(PortGroup::Out) {
            return Err(ConnectionRejected::InboundOnly(source.to_string()));
        }
        self.connecting = Some(node.id.clone());
        Ok(())
    }

    /// Drop the dragged edge on a port. On success the store is asked to
    /// create a transition with a freshly generated id.
    pub fn finish_connection(
        &mut self,
        target: &str,
        port: PortGroup,
    ) -> Result<TransitionId, ConnectionRejected> {
        let source = self
            .connecting
            .take()
            .ok_or(ConnectionRejected::NoPendingConnection)?;
        let node = self
            .nodes
            .get(target)
            .ok_or_else(|| ConnectionRejected::UnknownNode(target.to_string()))?;
        if port != PortGroup::In || !node.has_port(PortGroup::In) {
            return Err(ConnectionRejected::NotInbound(target.to_string()));
        }
        if self.has_edge_between(&source, target, None) {
            return Err(ConnectionRejected::Duplicate {
                source_id: source.to_string(),
                target_id: target.to_string(),
            });
        }

        let id = TransitionId::generate();
        self.intents.push(GraphIntent::TransitionConnected {
            id: id.clone(),
            source,
            destination: node.id.clone(),
        });
        Ok(id)
    }

    /// Drag from `source`'s outbound port to `target`'s inbound port.
    pub fn connect(&mut self, source: &str, target: &str) -> Result<TransitionId, ConnectionRejected> {
        self.begin_connection(source, PortGroup::Out)?;
        self.finish_connection(target, PortGroup::In)
    }

    pub fn cancel_connection(&mut self) {
        self.connecting = None;
    }

    /// Drop the arrow end of an existing edge on another node.
    pub fn retarget_edge(&mut self, edge_id: &str, target: &str) -> Result<(), ConnectionRejected> {
        let edge = self
            .edges
            .get(edge_id)
            .ok_or_else(|| ConnectionRejected::UnknownEdge(edge_id.to_string()))?;
        let node = self
            .nodes
            .get(target)
            .ok_or_else(|| ConnectionRejected::UnknownNode(target.to_string()))?;
        if !node.has_port(PortGroup::In) {
            return Err(ConnectionRejected::NotInbound(target.to_string()));
        }
        if self.has_edge_between(&edge.source, target, Some(edge_id)) {
            return Err(ConnectionRejected::Duplicate {
                source_id: edge.source.to_string(),
                target_id: target.to_string(),
            });
        }
        self.intents.push(GraphIntent::TransitionRetargeted {
            id: edge.id.clone(),
            destination: node.id.clone(),
        });
        Ok(())
    }

    fn has_edge_between(&self, source: &StateId, target: &str, skip: Option<&str>) -> bool {
        self.edges.values().any(|edge| {
            Some(edge.id.as_str()) != skip && &edge.source == source && edge.target.as_str() == target
        })
    }

    // ========== Context Menu ==========

    pub fn open_context_menu(&mut self, target: ContextTarget, position: Position) {
        let info = ContextMenuInfo { target, position };
        self.context_menu = Some(info.clone());
        self.intents.push(GraphIntent::ContextMenu(Some(info)));
    }

    pub fn close_context_menu(&mut self) {
        if self.context_menu.take().is_some() {
            self.intents.push(GraphIntent::ContextMenu(None));
        }
    }
}

impl GraphView for HeadlessGraphView {
    fn add_state(&mut self, state: &State) {
        self.nodes
            .insert(state.id().clone(), ViewNode::from_state(state));
    }

    fn add_transition(&mut self, transition: &Transition) {
        self.edges.insert(
            transition.id().clone(),
            ViewEdge::from_transition(transition),
        );
    }

    fn sync_state(&mut self, state: &State) {
        if let Some(node) = self.nodes.get_mut(state.id()) {
            node.label = state.name().to_string();
            node.position = state.position();
            node.data = state.data();
        }
    }

    fn sync_transition(&mut self, transition: &Transition) {
        if let Some(edge) = self.edges.get_mut(transition.id()) {
            *edge = ViewEdge::from_transition(transition);
        }
    }

    fn remove_state(&mut self, id: &StateId) {
        self.nodes.shift_remove(id);
        self.selected_nodes.shift_remove(id);
        self.edges
            .retain(|_, edge| &edge.source != id && &edge.target != id);
        if self.dragging.as_ref() == Some(id) {
            self.dragging = None;
        }
    }

    fn remove_transition(&mut self, id: &TransitionId) {
        self.edges.shift_remove(id);
        self.selected_edges.shift_remove(id);
    }

    fn reset(&mut self) {
        self.nodes.clear();
        self.edges.clear();
        self.clear_selection();
        self.dragging = None;
        self.connecting = None;
        self.context_menu = None;
        self.intents.clear();
    }

    fn export_layout(&self) -> VisualLayout {
        let nodes = self.nodes.values().map(|node| {
            LayoutCell::node(NodeCell {
                id: node.id.clone(),
                kind: node.kind,
                position: node.position,
                data: node.data.clone(),
            })
        });
        let edges = self.edges.values().map(|edge| {
            LayoutCell::Edge(EdgeCell {
                id: edge.id.clone(),
                source: PortRef {
                    cell: edge.source.clone(),
                    port: PortGroup::Out,
                },
                target: PortRef {
                    cell: edge.target.clone(),
                    port: PortGroup::In,
                },
                data: edge.data.clone(),
            })
        });
        VisualLayout {
            cells: nodes.chain(edges).collect(),
        }
    }

    fn drain_intents(&mut self) -> Vec<GraphIntent> {
        std::mem::take(&mut self.intents)
    }
}

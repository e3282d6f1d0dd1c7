//! Graph Rebuild
//!
//! Rebuilding the live graph of the current layer from the host. The source
//! is picked in order: authoritative data flagged as changed, then the cached
//! visual layout, then a bare layer holding only the pseudo-states. Every
//! rebuild ends with one immediate write-back.

use std::collections::HashMap;

use log::{debug, info, warn};

use super::AnimatorControllerStore;
use crate::asset::{StateMachineData, TransitionData};
use crate::graph::{StateId, StateKind, TransitionId};
use crate::host::EditorHost;
use crate::view::{GraphView, VisualLayout};

/// Where a rebuild takes the layer's content from.
enum RebuildSource {
    Data(StateMachineData),
    Layout(VisualLayout),
    Bare,
}

impl<H: EditorHost, V: GraphView> AnimatorControllerStore<H, V> {
    /// Drop every live state and transition and clear the view.
    pub(super) fn reset_graph(&mut self) {
        self.graph.clear();
        self.view.reset();
        self.selection = super::Selection::None;
        self.context_menu = None;
    }

    /// Rebuild the current layer from the host and write it back.
    pub(super) fn rebuild(&mut self) {
        let Some(controller_id) = self.controller_id.clone() else {
            return;
        };
        self.reset_graph();

        let Some(source) = self.pick_source(&controller_id) else {
            warn!("Controller '{}' disappeared before rebuild", controller_id);
            return;
        };
        match source {
            RebuildSource::Data(data) => {
                info!("Rebuilding layer {} from state machine data", self.layer_index);
                self.init_from_data(&data);
            }
            RebuildSource::Layout(layout) => {
                debug!("Importing cached layout of layer {}", self.layer_index);
                self.import_layout(&layout);
            }
            RebuildSource::Bare => {
                debug!("Initializing bare layer {}", self.layer_index);
                self.ensure_pseudo_states();
            }
        }

        self.writer.cancel();
        self.writer.forget_digest();
        if let Err(e) = self.persist_now() {
            warn!("Initial write of layer {} failed: {}", self.layer_index, e);
        }
        self.notify();
    }

    fn pick_source(&mut self, controller_id: &str) -> Option<RebuildSource> {
        let controller = self.host.controller_asset_mut(controller_id)?;
        if controller.layers.is_empty() {
            warn!("Controller '{}' has no layers, adding one", controller_id);
            controller.add_layer();
        }
        if self.layer_index >= controller.layers.len() {
            warn!(
                "Layer {} out of range for '{}', falling back to layer 0",
                self.layer_index, controller_id
            );
            self.layer_index = 0;
        }

        if controller.internal_data_updated {
            controller.internal_data_updated = false;
            let data = controller.layers[self.layer_index].state_machine.clone();
            return Some(RebuildSource::Data(data));
        }
        let layer = &controller.layers[self.layer_index];
        Some(match &layer.visual_layout_cache {
            Some(layout) => RebuildSource::Layout(layout.clone()),
            None => RebuildSource::Bare,
        })
    }

    /// Add whichever pseudo-states are missing at their default positions.
    fn ensure_pseudo_states(&mut self) {
        for kind in StateKind::PSEUDO {
            if self.graph.pseudo_state(kind).is_none() {
                let position = self.default_position(kind);
                self.register_state(kind.display_name(), None, kind, position, None);
            }
        }
    }

    /// Two passes: every state first, then transitions. Ordinary transitions
    /// are created from each state's outgoing list, then any left over by
    /// their recorded source, then Entry and AnyState transitions.
    fn init_from_data(&mut self, data: &StateMachineData) {
        self.ensure_pseudo_states();

        let mut ids: HashMap<StateId, StateId> = HashMap::new();
        for (index, state) in data.states.iter().enumerate() {
            if state.kind.is_pseudo() {
                continue;
            }
            let position = self
                .config
                .state_position
                .staggered(index as f64 * self.config.import_stagger);
            let id = self.register_state(
                &state.name,
                Some(state.id.clone()),
                StateKind::Normal,
                position,
                Some(state),
            );
            ids.insert(state.id.clone(), id);
        }
        let resolve = |id: &StateId| ids.get(id).cloned().unwrap_or_else(|| id.clone());

        let by_id: HashMap<&TransitionId, &TransitionData> =
            data.transitions.iter().map(|t| (&t.id, t)).collect();
        let mut pending: Vec<(StateId, &TransitionData)> = Vec::new();
        for state in data.states.iter().filter(|s| !s.kind.is_pseudo()) {
            for transition_id in &state.outgoing_transition_ids {
                if let Some(transition) = by_id.get(transition_id) {
                    pending.push((resolve(&state.id), transition));
                }
            }
        }
        for transition in &data.transitions {
            if !pending.iter().any(|(_, t)| t.id == transition.id) {
                pending.push((resolve(&transition.source_state_id), transition));
            }
        }
        for (source, transition) in pending {
            let destination = resolve(&transition.destination_state_id);
            self.restore_transition(source.as_str(), destination.as_str(), transition);
        }

        let pseudo_sources = [
            (StateKind::Entry, &data.entry_transitions),
            (StateKind::AnyState, &data.any_transitions),
        ];
        for (kind, transitions) in pseudo_sources {
            let Some(source) = self.graph.pseudo_state(kind).cloned() else {
                continue;
            };
            for transition in transitions {
                let destination = resolve(&transition.destination_state_id);
                self.restore_transition(source.as_str(), destination.as_str(), transition);
            }
        }
    }

    /// Nodes first (pseudo-states included), then missing pseudo-states,
    /// then edges.
    fn import_layout(&mut self, layout: &VisualLayout) {
        for node in layout.nodes() {
            self.register_state(
                &node.data.name,
                Some(node.id.clone()),
                node.kind,
                node.position,
                Some(&node.data),
            );
        }
        self.ensure_pseudo_states();

        for edge in layout.edges() {
            self.restore_transition(edge.source.cell.as_str(), edge.target.cell.as_str(), &edge.data);
        }
    }

    /// Re-create a persisted transition. Persisted data that no longer
    /// matches the graph is dropped with a warning.
    fn restore_transition(&mut self, source: &str, destination: &str, data: &TransitionData) {
        if let Err(e) = self.register_transition(data.id.clone(), source, destination, Some(data)) {
            warn!("Dropping persisted transition {}: {}", data.id, e);
        }
    }
}

//! State Machine Graph
//!
//! Arena owning every live state and transition of one layer, plus the
//! name index used to keep state names unique. All structural edits go
//! through here so that adjacency indices can never drift from the edges.

use std::collections::HashMap;

use indexmap::IndexMap;
use log::{debug, warn};

use super::{Position, State, StateId, StateKind, StateUpdate, Transition, TransitionId};
use crate::asset::StateMachineData;
use crate::error::{EditorError, Endpoint, Result};

/// Result of renaming a state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenameOutcome {
    /// Name that was asked for.
    pub requested: String,
    /// Name the state actually received.
    pub resolved: String,
}

impl RenameOutcome {
    /// True when the requested name was taken and a suffix was added.
    pub fn collided(&self) -> bool {
        self.requested != self.resolved
    }
}

/// Live graph of one layer's state machine.
#[derive(Debug, Clone, Default)]
pub struct StateMachineGraph {
    states: IndexMap<StateId, State>,
    transitions: IndexMap<TransitionId, Transition>,
    /// Name → id for normal states only.
    names: HashMap<String, StateId>,
    pseudo: HashMap<StateKind, StateId>,
}

impl StateMachineGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Drop every state, transition and index.
    pub fn clear(&mut self) {
        self.states.clear();
        self.transitions.clear();
        self.names.clear();
        self.pseudo.clear();
    }

    pub fn is_empty(&self) -> bool {
        self.states.is_empty()
    }

    // ========== Lookup ==========

    pub fn state(&self, id: &str) -> Option<&State> {
        self.states.get(id)
    }

    pub(crate) fn state_mut(&mut self, id: &str) -> Option<&mut State> {
        self.states.get_mut(id)
    }

    pub fn transition(&self, id: &str) -> Option<&Transition> {
        self.transitions.get(id)
    }

    pub(crate) fn transition_mut(&mut self, id: &str) -> Option<&mut Transition> {
        self.transitions.get_mut(id)
    }

    /// All states, pseudo-states included, in insertion order.
    pub fn states(&self) -> impl Iterator<Item = &State> {
        self.states.values()
    }

    /// Normal (persisted) states, in insertion order.
    pub fn normal_states(&self) -> impl Iterator<Item = &State> {
        self.states.values().filter(|s| !s.is_pseudo())
    }

    pub fn transitions(&self) -> impl Iterator<Item = &Transition> {
        self.transitions.values()
    }

    pub fn state_count(&self) -> usize {
        self.states.len()
    }

    pub fn transition_count(&self) -> usize {
        self.transitions.len()
    }

    pub fn state_by_name(&self, name: &str) -> Option<&State> {
        self.names.get(name).and_then(|id| self.states.get(id))
    }

    /// Handle of the pseudo-state of the given kind, if present.
    pub fn pseudo_state(&self, kind: StateKind) -> Option<&StateId> {
        self.pseudo.get(&kind)
    }

    pub fn entry(&self) -> Option<&StateId> {
        self.pseudo_state(StateKind::Entry)
    }

    pub fn exit(&self) -> Option<&StateId> {
        self.pseudo_state(StateKind::Exit)
    }

    pub fn any_state(&self) -> Option<&StateId> {
        self.pseudo_state(StateKind::AnyState)
    }

    // ========== Names ==========

    /// First free name of the form `base`, `base1`, `base2`, ...
    pub fn unique_name(&self, base: &str) -> String {
        let mut name = base.to_string();
        let mut index = 0;
        while self.names.contains_key(&name) {
            index += 1;
            name = format!("{}{}", base, index);
        }
        name
    }

    /// Rename a normal state, suffixing the name if another state holds it.
    ///
    /// Returns `None` for unknown ids and pseudo-states.
    pub fn rename_state(&mut self, id: &str, requested: &str) -> Option<RenameOutcome> {
        let state = self.states.get(id)?;
        if state.is_pseudo() {
            return None;
        }
        let old_name = state.name().to_string();
        self.names.remove(&old_name);

        let resolved = match self.names.get(requested) {
            Some(holder) if holder.as_str() != id => self.unique_name(requested),
            _ => requested.to_string(),
        };

        let state = self.states.get_mut(id)?;
        state.set_name(resolved.clone());
        self.names.insert(resolved.clone(), state.id().clone());

        Some(RenameOutcome {
            requested: requested.to_string(),
            resolved,
        })
    }

    // ========== States ==========

    /// Register a state. Returns its id and whether a new state was created.
    ///
    /// Normal states get a unique name derived from `name` and a fresh id when
    /// none (or a taken one) is given. A pseudo-state kind that already exists
    /// returns the existing handle instead of creating a second one.
    pub fn insert_state(
        &mut self,
        name: &str,
        id: Option<StateId>,
        kind: StateKind,
        position: Position,
    ) -> (StateId, bool) {
        if let Some(existing) = self.pseudo.get(&kind) {
            warn!("{:?} pseudo-state already exists as '{}'", kind, existing);
            return (existing.clone(), false);
        }

        let id = match id {
            Some(id) if self.states.contains_key(&id) => {
                warn!("State id '{}' already in use, generating a new one", id);
                StateId::generate()
            }
            Some(id) => id,
            None => match kind.pseudo_id() {
                Some(pseudo_id) if !self.states.contains_key(pseudo_id) => StateId::new(pseudo_id),
                _ => StateId::generate(),
            },
        };

        let name = if kind.is_pseudo() {
            name.to_string()
        } else {
            let unique = self.unique_name(name);
            self.names.insert(unique.clone(), id.clone());
            unique
        };

        if kind.is_pseudo() {
            self.pseudo.insert(kind, id.clone());
        }

        debug!("Adding state '{}' ({}) kind {:?}", name, id, kind);
        self.states
            .insert(id.clone(), State::new(id.clone(), name, kind, position));
        (id, true)
    }

    /// Remove a normal state and every transition touching it.
    ///
    /// Returns the removed transition ids, or `None` when the id is unknown
    /// or names a pseudo-state (pseudo-states live as long as the layer).
    pub fn remove_state(&mut self, id: &str) -> Option<Vec<Transition>> {
        let state = self.states.get(id)?;
        if state.is_pseudo() {
            debug!("Ignoring delete of pseudo-state '{}'", id);
            return None;
        }

        let touching: Vec<TransitionId> = state
            .incoming()
            .chain(state.outgoing())
            .cloned()
            .collect();

        let mut removed = Vec::with_capacity(touching.len());
        for transition_id in touching {
            if let Some(transition) = self.remove_transition(transition_id.as_str()) {
                removed.push(transition);
            }
        }

        if let Some(state) = self.states.shift_remove(id) {
            self.names.remove(state.name());
            debug!(
                "Removed state '{}' with {} transitions",
                state.name(),
                removed.len()
            );
        }
        Some(removed)
    }

    pub fn set_state_position(&mut self, id: &str, position: Position) -> bool {
        match self.states.get_mut(id) {
            Some(state) => {
                state.set_position(position);
                true
            }
            None => false,
        }
    }

    /// Apply an update to a state. Renames are routed through the name index.
    pub fn update_state(&mut self, id: &str, update: StateUpdate) -> Option<RenameOutcome> {
        match update {
            StateUpdate::Name(name) => self.rename_state(id, &name),
            other => {
                if let Some(state) = self.states.get_mut(id) {
                    state.apply(other);
                }
                None
            }
        }
    }

    // ========== Transitions ==========

    /// Create a transition between two existing states.
    ///
    /// Every check runs before anything is mutated, so a failed call leaves
    /// the graph exactly as it was.
    pub fn insert_transition(
        &mut self,
        id: TransitionId,
        source_id: &str,
        destination_id: &str,
    ) -> Result<&Transition> {
        if self.transitions.contains_key(&id) {
            return Err(EditorError::DuplicateTransition {
                transition_id: id.to_string(),
            });
        }
        let source = self
            .states
            .get(source_id)
            .ok_or_else(|| EditorError::MissingEndpoint {
                transition_id: id.to_string(),
                endpoint: Endpoint::Source,
                state_id: source_id.to_string(),
            })?;
        let destination =
            self.states
                .get(destination_id)
                .ok_or_else(|| EditorError::MissingEndpoint {
                    transition_id: id.to_string(),
                    endpoint: Endpoint::Destination,
                    state_id: destination_id.to_string(),
                })?;
        if !source.kind().can_be_source() {
            return Err(EditorError::InvalidTransition {
                transition_id: id.to_string(),
                reason: format!("{:?} state cannot be a transition source", source.kind()),
            });
        }
        if !destination.kind().can_be_destination() {
            return Err(EditorError::InvalidTransition {
                transition_id: id.to_string(),
                reason: format!(
                    "{:?} state cannot be a transition destination",
                    destination.kind()
                ),
            });
        }

        let transition = Transition::new(id.clone(), source, destination);
        if let Some(source) = self.states.get_mut(source_id) {
            source.register_outgoing(id.clone());
        }
        if let Some(destination) = self.states.get_mut(destination_id) {
            destination.register_incoming(id.clone());
        }

        debug!(
            "Adding transition {}: {} -> {}",
            id, source_id, destination_id
        );
        let index = self.transitions.insert_full(id, transition).0;
        Ok(&self.transitions[index])
    }

    /// Remove a transition and unregister it from both endpoints.
    pub fn remove_transition(&mut self, id: &str) -> Option<Transition> {
        let transition = self.transitions.shift_remove(id)?;
        if let Some(source) = self.states.get_mut(transition.source()) {
            source.unregister_outgoing(transition.id());
        }
        if let Some(destination) = self.states.get_mut(transition.destination()) {
            destination.unregister_incoming(transition.id());
        }
        Some(transition)
    }

    /// Point a transition at a new destination.
    ///
    /// The old destination is unregistered before the new one is registered.
    /// Returns the previous destination, or `None` when either id is unknown
    /// or the new destination cannot be entered.
    pub fn retarget_transition(&mut self, id: &str, destination_id: &str) -> Option<StateId> {
        let new_destination = self.states.get(destination_id)?;
        if !new_destination.kind().can_be_destination() {
            warn!(
                "Cannot retarget transition {} to {:?} state",
                id,
                new_destination.kind()
            );
            return None;
        }
        let new_destination = new_destination.id().clone();

        let transition = self.transitions.get_mut(id)?;
        let old_destination = transition.destination().clone();
        let transition_id = transition.id().clone();
        transition.set_destination(new_destination.clone());

        if let Some(old) = self.states.get_mut(&old_destination) {
            old.unregister_incoming(&transition_id);
        }
        if let Some(new) = self.states.get_mut(&new_destination) {
            new.register_incoming(transition_id);
        }
        Some(old_destination)
    }

    // ========== Export ==========

    /// Serialized form of the graph. Pseudo-states are left out of the state
    /// list; transitions are split by the kind of their source.
    pub fn export(&self) -> StateMachineData {
        let mut data = StateMachineData::default();
        for transition in self.transitions.values() {
            let source_kind = self
                .states
                .get(transition.source())
                .map(State::kind)
                .unwrap_or_default();
            match source_kind {
                StateKind::Entry => data.entry_transitions.push(transition.data()),
                StateKind::AnyState => data.any_transitions.push(transition.data()),
                _ => data.transitions.push(transition.data()),
            }
        }
        data.states = self.normal_states().map(State::data).collect();
        data
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    fn bare() -> StateMachineGraph {
        let mut graph = StateMachineGraph::new();
        for kind in StateKind::PSEUDO {
            graph.insert_state(kind.display_name(), None, kind, Position::default());
        }
        graph
    }

    fn add(graph: &mut StateMachineGraph, name: &str) -> StateId {
        graph
            .insert_state(name, None, StateKind::Normal, Position::default())
            .0
    }

    #[test]
    fn test_pseudo_states_are_unique() {
        let mut graph = bare();
        let (id, created) =
            graph.insert_state("Entry", None, StateKind::Entry, Position::default());
        assert!(!created);
        assert_eq!(id.as_str(), "entry");
        assert_eq!(graph.state_count(), 3);
        assert_eq!(graph.any_state().map(StateId::as_str), Some("any"));
    }

    #[test]
    fn test_duplicate_names_are_suffixed() {
        let mut graph = bare();
        add(&mut graph, "Idle");
        let second = add(&mut graph, "Idle");
        let third = add(&mut graph, "Idle");
        assert_eq!(graph.state(second.as_str()).unwrap().name(), "Idle1");
        assert_eq!(graph.state(third.as_str()).unwrap().name(), "Idle2");
    }

    #[test]
    fn test_rename_to_own_name_does_not_collide() {
        let mut graph = bare();
        let idle = add(&mut graph, "Idle");
        let outcome = graph.rename_state(idle.as_str(), "Idle").unwrap();
        assert!(!outcome.collided());
        assert_eq!(outcome.resolved, "Idle");
    }

    #[test]
    fn test_rename_collision_frees_old_name() {
        let mut graph = bare();
        let idle = add(&mut graph, "Idle");
        let walk = add(&mut graph, "Walk");

        let outcome = graph.rename_state(walk.as_str(), "Idle").unwrap();
        assert!(outcome.collided());
        assert_eq!(outcome.resolved, "Idle1");
        assert!(graph.state_by_name("Walk").is_none());

        // "Walk" is free again.
        let outcome = graph.rename_state(idle.as_str(), "Walk").unwrap();
        assert!(!outcome.collided());
    }

    #[test]
    fn test_names_stay_distinct_under_churn() {
        let mut graph = bare();
        let mut ids = Vec::new();
        for _ in 0..5 {
            ids.push(add(&mut graph, "State"));
        }
        for (i, id) in ids.iter().enumerate() {
            graph.rename_state(id.as_str(), if i % 2 == 0 { "State" } else { "State1" });
        }
        add(&mut graph, "State1");

        let names: Vec<&str> = graph.normal_states().map(State::name).collect();
        let unique: HashSet<&str> = names.iter().copied().collect();
        assert_eq!(names.len(), unique.len());
    }

    #[test]
    fn test_missing_destination_leaves_graph_unchanged() {
        let mut graph = bare();
        let idle = add(&mut graph, "Idle");
        let err = graph
            .insert_transition(TransitionId::new("t1"), idle.as_str(), "ghost")
            .unwrap_err();
        assert!(err.is_contract_violation());
        assert_eq!(graph.transition_count(), 0);
        assert_eq!(graph.state(idle.as_str()).unwrap().outgoing().count(), 0);
    }

    #[test]
    fn test_pseudo_direction_rules() {
        let mut graph = bare();
        let idle = add(&mut graph, "Idle");
        assert!(graph
            .insert_transition(TransitionId::new("t1"), "exit", idle.as_str())
            .is_err());
        assert!(graph
            .insert_transition(TransitionId::new("t2"), idle.as_str(), "entry")
            .is_err());
        assert!(graph
            .insert_transition(TransitionId::new("t3"), "any", idle.as_str())
            .is_ok());
    }

    #[test]
    fn test_duplicate_transition_id_rejected() {
        let mut graph = bare();
        let idle = add(&mut graph, "Idle");
        graph
            .insert_transition(TransitionId::new("t1"), "entry", idle.as_str())
            .unwrap();
        let err = graph
            .insert_transition(TransitionId::new("t1"), "any", idle.as_str())
            .unwrap_err();
        assert_eq!(err.error_code(), "DUPLICATE_TRANSITION");
        assert_eq!(graph.transition_count(), 1);
    }

    #[test]
    fn test_remove_state_cascades() {
        let mut graph = bare();
        let idle = add(&mut graph, "Idle");
        let walk = add(&mut graph, "Walk");
        let run = add(&mut graph, "Run");
        graph
            .insert_transition(TransitionId::new("a"), idle.as_str(), walk.as_str())
            .unwrap();
        graph
            .insert_transition(TransitionId::new("b"), walk.as_str(), run.as_str())
            .unwrap();
        graph
            .insert_transition(TransitionId::new("c"), run.as_str(), walk.as_str())
            .unwrap();
        graph
            .insert_transition(TransitionId::new("d"), run.as_str(), idle.as_str())
            .unwrap();

        let removed = graph.remove_state(walk.as_str()).unwrap();
        let mut removed_ids: Vec<&str> = removed.iter().map(|t| t.id().as_str()).collect();
        removed_ids.sort();
        assert_eq!(removed_ids, vec!["a", "b", "c"]);

        assert!(graph.state(walk.as_str()).is_none());
        assert!(graph.state_by_name("Walk").is_none());
        assert_eq!(graph.transition_count(), 1);
        assert_eq!(graph.state(idle.as_str()).unwrap().outgoing().count(), 0);
        assert_eq!(graph.state(idle.as_str()).unwrap().incoming().count(), 1);
    }

    #[test]
    fn test_pseudo_state_cannot_be_removed() {
        let mut graph = bare();
        assert!(graph.remove_state("entry").is_none());
        assert!(graph.entry().is_some());
    }

    #[test]
    fn test_retarget_moves_incoming_registration() {
        let mut graph = bare();
        let idle = add(&mut graph, "Idle");
        let walk = add(&mut graph, "Walk");
        let run = add(&mut graph, "Run");
        graph
            .insert_transition(TransitionId::new("t"), idle.as_str(), walk.as_str())
            .unwrap();

        let old = graph.retarget_transition("t", run.as_str()).unwrap();
        assert_eq!(old, walk);
        assert_eq!(graph.state(walk.as_str()).unwrap().incoming().count(), 0);
        assert_eq!(graph.state(run.as_str()).unwrap().incoming().count(), 1);
        assert_eq!(graph.transition("t").unwrap().destination(), &run);

        assert!(graph.retarget_transition("t", "entry").is_none());
        assert!(graph.retarget_transition("missing", run.as_str()).is_none());
    }

    #[test]
    fn test_export_partitions_transitions() {
        let mut graph = bare();
        let idle = add(&mut graph, "Idle");
        let walk = add(&mut graph, "Walk");
        graph
            .insert_transition(TransitionId::new("e"), "entry", idle.as_str())
            .unwrap();
        graph
            .insert_transition(TransitionId::new("a"), "any", walk.as_str())
            .unwrap();
        graph
            .insert_transition(TransitionId::new("n"), idle.as_str(), walk.as_str())
            .unwrap();
        graph
            .insert_transition(TransitionId::new("x"), walk.as_str(), "exit")
            .unwrap();

        let data = graph.export();
        assert_eq!(data.states.len(), 2);
        assert_eq!(data.entry_transitions.len(), 1);
        assert_eq!(data.any_transitions.len(), 1);
        assert_eq!(data.transitions.len(), 2);
        assert_eq!(
            data.states[0].outgoing_transition_ids,
            vec![TransitionId::new("n")]
        );
    }
}

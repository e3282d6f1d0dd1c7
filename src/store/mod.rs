//! Animator Controller Store
//!
//! The orchestrator of the editor. It owns the live graph of the active
//! layer and is the only thing that mutates it. Every edit goes through here:
//! - structural edits keep the graph indices and the view in step
//! - selection is exclusive between one state and one transition
//! - each mutation arms the debounced write-back to the host
//!
//! Time-based work (controller activation, the write-back deadline) and the
//! draining of host events and view intents happen in `tick`.

mod lifecycle;
mod persistence;
mod rebuild;
mod selection;
mod subscription;

use std::fmt;
use std::time::Instant;

use log::{debug, warn};

pub use lifecycle::EditorState;
pub use persistence::{snapshot_digest, DebouncedWriter};
pub use selection::{SelectType, Selection};
pub use subscription::{SubscriptionId, Subscribers};

use crate::asset::{ControllerAsset, Parameter, ParameterPatch, ParameterType, ParameterValue, StateData, TransitionData};
use crate::config::EditorConfig;
use crate::error::{EditorError, Result};
use crate::graph::{
    ConditionPatch, Position, RenameOutcome, State, StateId, StateKind, StateMachineGraph,
    StateUpdate, Transition, TransitionId, TransitionUpdate,
};
use crate::host::EditorHost;
use crate::view::{ContextMenuInfo, GraphIntent, GraphView};

/// A recoverable problem that was resolved automatically and should be
/// shown to the user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationNotice {
    StateNameCollision { requested: String, resolved: String },
    ParameterNameCollision { requested: String, resolved: String },
}

impl fmt::Display for ValidationNotice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValidationNotice::StateNameCollision { requested, resolved } => write!(
                f,
                "State name '{}' must be unique, renamed to '{}'",
                requested, resolved
            ),
            ValidationNotice::ParameterNameCollision { requested, resolved } => write!(
                f,
                "Parameter name '{}' must be unique, renamed to '{}'",
                requested, resolved
            ),
        }
    }
}

/// Derived values exposed to subscribers.
#[derive(Debug, Clone, PartialEq)]
pub struct StoreSnapshot {
    pub editor_state: EditorState,
    pub visible: bool,
    pub controller_id: Option<String>,
    pub layer_index: usize,
    pub layer_count: usize,
    pub parameter_count: usize,
    pub selection: Selection,
    pub state_count: usize,
    pub transition_count: usize,
    pub context_menu: Option<ContextMenuInfo>,
}

/// What one `tick` did.
#[derive(Debug, Default)]
pub struct TickReport {
    pub host_events: usize,
    pub intents: usize,
    pub activated: bool,
    pub wrote: bool,
    /// Failures surfaced while applying intents or writing back.
    pub errors: Vec<EditorError>,
}

/// Editing engine for one animator controller at a time.
pub struct AnimatorControllerStore<H: EditorHost, V: GraphView> {
    config: EditorConfig,
    host: H,
    view: V,
    graph: StateMachineGraph,
    editor_state: EditorState,
    visible: bool,
    controller_id: Option<String>,
    /// Entity whose animator bound the current controller, if any.
    bound_entity: Option<String>,
    selected_entity: Option<String>,
    layer_index: usize,
    selection: Selection,
    context_menu: Option<ContextMenuInfo>,
    notices: Vec<ValidationNotice>,
    activation_due: Option<Instant>,
    writer: DebouncedWriter,
    subscribers: Subscribers<StoreSnapshot>,
}

impl<H: EditorHost, V: GraphView> AnimatorControllerStore<H, V> {
    pub fn new(host: H, view: V, config: EditorConfig) -> Self {
        let writer = DebouncedWriter::new(config.persist_debounce());
        Self {
            config,
            host,
            view,
            graph: StateMachineGraph::new(),
            editor_state: EditorState::default(),
            visible: false,
            controller_id: None,
            bound_entity: None,
            selected_entity: None,
            layer_index: 0,
            selection: Selection::None,
            context_menu: None,
            notices: Vec::new(),
            activation_due: None,
            writer,
            subscribers: Subscribers::new(),
        }
    }

    // ========== Accessors ==========

    pub fn config(&self) -> &EditorConfig {
        &self.config
    }

    pub fn host(&self) -> &H {
        &self.host
    }

    pub fn host_mut(&mut self) -> &mut H {
        &mut self.host
    }

    pub fn view(&self) -> &V {
        &self.view
    }

    pub fn view_mut(&mut self) -> &mut V {
        &mut self.view
    }

    pub fn graph(&self) -> &StateMachineGraph {
        &self.graph
    }

    pub fn editor_state(&self) -> EditorState {
        self.editor_state
    }

    pub fn is_visible(&self) -> bool {
        self.visible
    }

    pub fn current_layer_index(&self) -> usize {
        self.layer_index
    }

    pub fn editing_controller_id(&self) -> Option<&str> {
        self.controller_id.as_deref()
    }

    pub fn editing_controller(&self) -> Option<&ControllerAsset> {
        self.controller_id
            .as_deref()
            .and_then(|id| self.host.controller_asset(id))
    }

    pub fn selected_entity_id(&self) -> Option<&str> {
        self.selected_entity.as_deref()
    }

    pub fn selection(&self) -> &Selection {
        &self.selection
    }

    pub fn current_select_type(&self) -> SelectType {
        self.selection.select_type()
    }

    pub fn selected_state(&self) -> Option<&State> {
        self.selection
            .state_id()
            .and_then(|id| self.graph.state(id.as_str()))
    }

    pub fn selected_transition(&self) -> Option<&Transition> {
        self.selection
            .transition_id()
            .and_then(|id| self.graph.transition(id.as_str()))
    }

    pub fn states(&self) -> impl Iterator<Item = &State> {
        self.graph.states()
    }

    pub fn transitions(&self) -> impl Iterator<Item = &Transition> {
        self.graph.transitions()
    }

    pub fn context_menu_info(&self) -> Option<&ContextMenuInfo> {
        self.context_menu.as_ref()
    }

    pub fn notices(&self) -> &[ValidationNotice] {
        &self.notices
    }

    /// Take the notices produced since the last call.
    pub fn take_notices(&mut self) -> Vec<ValidationNotice> {
        std::mem::take(&mut self.notices)
    }

    pub fn has_pending_write(&self) -> bool {
        self.writer.is_pending()
    }

    pub fn writer(&self) -> &DebouncedWriter {
        &self.writer
    }

    pub fn snapshot(&self) -> StoreSnapshot {
        let controller = self.editing_controller();
        StoreSnapshot {
            editor_state: self.editor_state,
            visible: self.visible,
            controller_id: self.controller_id.clone(),
            layer_index: self.layer_index,
            layer_count: controller.map_or(0, |c| c.layers.len()),
            parameter_count: controller.map_or(0, |c| c.parameters.len()),
            selection: self.selection.clone(),
            state_count: self.graph.state_count(),
            transition_count: self.graph.transition_count(),
            context_menu: self.context_menu.clone(),
        }
    }

    // ========== Subscriptions ==========

    /// Watch a value derived from the store. The callback runs whenever the
    /// selected value changes.
    pub fn subscribe<T, F, C>(&mut self, selector: F, callback: C) -> SubscriptionId
    where
        T: PartialEq + 'static,
        F: Fn(&StoreSnapshot) -> T + 'static,
        C: FnMut(&T) + 'static,
    {
        let current = self.snapshot();
        self.subscribers.subscribe(&current, selector, callback)
    }

    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        self.subscribers.unsubscribe(id)
    }

    fn notify(&mut self) {
        if self.subscribers.is_empty() {
            return;
        }
        let snapshot = self.snapshot();
        self.subscribers.notify(&snapshot);
    }

    // ========== States ==========

    /// Add a state. A missing name falls back to the configured default and
    /// is made unique; a missing or taken id is generated.
    pub fn add_state(&mut self, name: Option<&str>, id: Option<StateId>, kind: StateKind) -> StateId {
        let name = name
            .filter(|n| !n.trim().is_empty())
            .map(str::to_string)
            .unwrap_or_else(|| self.config.default_state_name.clone());
        let position = self.default_position(kind);
        let id = self.register_state(&name, id, kind, position, None);
        self.mark_dirty();
        id
    }

    /// Update a property of the selected state. Returns a notice when a
    /// rename had to be suffixed.
    pub fn update_state_data(&mut self, update: StateUpdate) -> Option<ValidationNotice> {
        let id = self.selection.state_id()?.clone();
        self.graph.state(id.as_str())?;

        let outcome = self.graph.update_state(id.as_str(), update);
        self.sync_state_view(id.as_str());
        self.mark_dirty();

        let notice = outcome
            .filter(RenameOutcome::collided)
            .map(|o| ValidationNotice::StateNameCollision {
                requested: o.requested,
                resolved: o.resolved,
            });
        if let Some(notice) = &notice {
            warn!("{}", notice);
            self.notices.push(notice.clone());
        }
        notice
    }

    pub fn add_state_machine_script(&mut self, script_id: &str) {
        let Some(id) = self.selection.state_id().cloned() else {
            return;
        };
        if let Some(state) = self.graph.state_mut(id.as_str()) {
            state.add_script(script_id.to_string());
            self.sync_state_view(id.as_str());
            self.mark_dirty();
        }
    }

    pub fn remove_state_machine_script(&mut self, index: usize) {
        let Some(id) = self.selection.state_id().cloned() else {
            return;
        };
        let removed = self
            .graph
            .state_mut(id.as_str())
            .and_then(|state| state.remove_script(index));
        if removed.is_some() {
            self.sync_state_view(id.as_str());
            self.mark_dirty();
        }
    }

    pub fn update_state_machine_script(&mut self, index: usize, script_id: &str) {
        let Some(id) = self.selection.state_id().cloned() else {
            return;
        };
        let updated = self
            .graph
            .state_mut(id.as_str())
            .is_some_and(|state| state.update_script(index, script_id.to_string()));
        if updated {
            self.sync_state_view(id.as_str());
            self.mark_dirty();
        }
    }

    /// Persist a node's position after a drag.
    pub fn move_state(&mut self, id: &str, position: Position) {
        if self.graph.set_state_position(id, position) {
            self.sync_state_view(id);
            self.mark_dirty();
        }
    }

    /// Delete states and every transition touching them, then clear the
    /// selection. Unknown ids and pseudo-states are skipped.
    pub fn delete_states(&mut self, ids: &[StateId]) {
        for id in ids {
            let Some(removed) = self.graph.remove_state(id.as_str()) else {
                continue;
            };
            for transition in &removed {
                self.view.remove_transition(transition.id());
            }
            self.view.remove_state(id);
            for transition in &removed {
                self.sync_state_view(transition.source().as_str());
            }
        }
        self.clear_select();
        self.mark_dirty();
    }

    // ========== Transitions ==========

    /// Connect two existing states.
    ///
    /// Unknown endpoints are a caller error and are returned as such; the
    /// graph is left untouched.
    pub fn add_transition(
        &mut self,
        id: Option<TransitionId>,
        source: &str,
        destination: &str,
    ) -> Result<TransitionId> {
        let id = id.unwrap_or_else(TransitionId::generate);
        let id = self.register_transition(id, source, destination, None)?;
        self.mark_dirty();
        Ok(id)
    }

    /// Update a setting of the selected transition.
    pub fn update_transition_data(&mut self, update: TransitionUpdate) {
        let Some(id) = self.selection.transition_id().cloned() else {
            return;
        };
        if let Some(transition) = self.graph.transition_mut(id.as_str()) {
            transition.apply(update);
            self.sync_transition_view(id.as_str());
            self.mark_dirty();
        }
    }

    /// Point a transition at another destination. Unknown ids are ignored.
    pub fn retarget_transition(&mut self, id: &str, destination: &str) {
        if self.graph.retarget_transition(id, destination).is_some() {
            self.sync_transition_view(id);
            self.mark_dirty();
        }
    }

    pub fn delete_transitions(&mut self, ids: &[TransitionId]) {
        for id in ids {
            if let Some(transition) = self.graph.remove_transition(id.as_str()) {
                self.view.remove_transition(id);
                self.sync_state_view(transition.source().as_str());
            }
        }
        self.clear_select();
        self.mark_dirty();
    }

    // ========== Conditions ==========

    /// Add a condition on the first controller parameter to the selected
    /// transition. Returns the new condition's id.
    pub fn add_condition(&mut self) -> Option<String> {
        let id = self.selection.transition_id()?.clone();
        let parameter = self
            .editing_controller()
            .and_then(|controller| controller.parameters.first())
            .map(|p| p.name.clone())
            .unwrap_or_default();

        let transition = self.graph.transition_mut(id.as_str())?;
        let condition_id = transition.add_condition(&parameter).id.clone();
        self.sync_transition_view(id.as_str());
        self.mark_dirty();
        Some(condition_id)
    }

    pub fn remove_condition(&mut self, index: usize) {
        let Some(id) = self.selection.transition_id().cloned() else {
            return;
        };
        let removed = self
            .graph
            .transition_mut(id.as_str())
            .and_then(|t| t.remove_condition(index));
        if removed.is_some() {
            self.sync_transition_view(id.as_str());
            self.mark_dirty();
        }
    }

    /// Patch a condition of the selected transition. Thresholds are coerced
    /// to numbers when they read as one.
    pub fn update_condition_data(&mut self, index: usize, patch: ConditionPatch) {
        let Some(id) = self.selection.transition_id().cloned() else {
            return;
        };
        let updated = self
            .graph
            .transition_mut(id.as_str())
            .is_some_and(|t| t.update_condition(index, patch));
        if updated {
            self.sync_transition_view(id.as_str());
            self.mark_dirty();
        }
    }

    // ========== Selection ==========

    /// Select a normal state. Pseudo-states and unknown ids are ignored.
    pub fn select_state(&mut self, id: &str) {
        match self.graph.state(id) {
            Some(state) if !state.is_pseudo() => {
                let id = state.id().clone();
                self.reassert_asset_selection();
                self.set_selection(Selection::State(id));
            }
            _ => {}
        }
    }

    pub fn select_transition(&mut self, id: &str) {
        if let Some(transition) = self.graph.transition(id) {
            let id = transition.id().clone();
            self.reassert_asset_selection();
            self.set_selection(Selection::Transition(id));
        }
    }

    pub fn clear_select(&mut self) {
        self.set_selection(Selection::None);
    }

    fn set_selection(&mut self, selection: Selection) {
        if self.selection != selection {
            self.selection = selection;
            self.notify();
        }
    }

    fn reassert_asset_selection(&mut self) {
        if let Some(id) = &self.controller_id {
            self.host.select_asset(id);
        }
    }

    // ========== Layers ==========

    /// Switch to another layer: flush the current one, then rebuild.
    ///
    /// Returns whether the layer changed. A failed flush aborts the switch
    /// and leaves the current layer and its pending write in place.
    pub fn select_layer(&mut self, index: usize) -> Result<bool> {
        if index == self.layer_index {
            return Ok(false);
        }
        let Some(count) = self.editing_controller().map(|c| c.layers.len()) else {
            return Ok(false);
        };
        if index >= count {
            warn!("Layer {} does not exist ({} layers)", index, count);
            return Ok(false);
        }
        self.flush_before_layer_change()?;
        self.layer_index = index;
        self.clear_select();
        self.rebuild();
        Ok(true)
    }

    /// Append a layer to the editing controller. Returns its index.
    pub fn add_layer(&mut self) -> Option<usize> {
        let id = self.controller_id.clone()?;
        let index = self.host.controller_asset_mut(&id)?.add_layer();
        debug!("Added layer {} to '{}'", index, id);
        self.mark_dirty();
        Some(index)
    }

    /// Remove a layer and go back to layer 0. The last layer is kept.
    ///
    /// Returns whether a layer was removed. If the current layer cannot be
    /// written first, nothing is removed and the error is returned.
    pub fn remove_layer(&mut self, index: usize) -> Result<bool> {
        let Some(id) = self.controller_id.clone() else {
            return Ok(false);
        };
        let removable = self
            .host
            .controller_asset(&id)
            .is_some_and(|c| index < c.layers.len() && c.layers.len() > 1);
        if !removable {
            warn!("Cannot remove layer {} of '{}'", index, id);
            return Ok(false);
        }

        // Indices shift on removal, so the current layer is written first
        // unless it is the one going away.
        if index == self.layer_index {
            self.writer.cancel();
        } else {
            self.flush_before_layer_change()?;
        }
        if let Some(controller) = self.host.controller_asset_mut(&id) {
            controller.remove_layer(index);
        }
        self.layer_index = 0;
        self.clear_select();
        self.rebuild();
        Ok(true)
    }

    // ========== Parameters ==========

    /// Add a parameter to the editing controller. Returns its final name.
    pub fn add_parameter(
        &mut self,
        kind: ParameterType,
        name: Option<&str>,
        default_value: Option<ParameterValue>,
    ) -> Option<String> {
        let id = self.controller_id.clone()?;
        let base = name.unwrap_or(&self.config.default_parameter_name).to_string();
        let name = self
            .host
            .controller_asset_mut(&id)?
            .add_parameter(kind, Some(&base), default_value)
            .name
            .clone();
        self.notify();
        Some(name)
    }

    pub fn remove_parameter(&mut self, index: usize) -> Option<Parameter> {
        let id = self.controller_id.clone()?;
        let removed = self.host.controller_asset_mut(&id)?.remove_parameter(index);
        self.notify();
        removed
    }

    /// Patch a parameter. Renames are made unique; a collision is reported.
    pub fn update_parameter_data(
        &mut self,
        index: usize,
        patch: ParameterPatch,
    ) -> Option<ValidationNotice> {
        let id = self.controller_id.clone()?;
        let collision = self
            .host
            .controller_asset_mut(&id)?
            .update_parameter(index, patch);
        self.notify();

        let (requested, resolved) = collision?;
        let notice = ValidationNotice::ParameterNameCollision { requested, resolved };
        warn!("{}", notice);
        self.notices.push(notice.clone());
        Some(notice)
    }

    // ========== Intents & Tick ==========

    /// Apply one gesture reported by the view.
    pub fn apply_intent(&mut self, intent: GraphIntent) -> Result<()> {
        match intent {
            GraphIntent::StateClicked(id) => self.select_state(id.as_str()),
            GraphIntent::TransitionClicked(id) => self.select_transition(id.as_str()),
            GraphIntent::BlankClicked => self.clear_select(),
            GraphIntent::StateMoved { id, position } => self.move_state(id.as_str(), position),
            GraphIntent::StatesDeleted(ids) => self.delete_states(&ids),
            GraphIntent::TransitionsDeleted(ids) => self.delete_transitions(&ids),
            GraphIntent::TransitionConnected {
                id,
                source,
                destination,
            } => {
                self.add_transition(Some(id), source.as_str(), destination.as_str())?;
            }
            GraphIntent::TransitionRetargeted { id, destination } => {
                self.retarget_transition(id.as_str(), destination.as_str())
            }
            GraphIntent::ContextMenu(info) => {
                self.context_menu = info;
                self.notify();
            }
        }
        Ok(())
    }

    /// Drain the view's pending gestures. Failures are collected rather than
    /// stopping the remaining intents.
    pub fn process_intents(&mut self) -> (usize, Vec<EditorError>) {
        let intents = self.view.drain_intents();
        let count = intents.len();
        let mut errors = Vec::new();
        for intent in intents {
            if let Err(e) = self.apply_intent(intent) {
                warn!("Rejected view intent: {}", e);
                errors.push(e);
            }
        }
        (count, errors)
    }

    /// Service everything that is waiting: host events (while visible), a
    /// due controller activation, view intents, and a due write-back.
    pub fn tick(&mut self, now: Instant) -> TickReport {
        let mut report = TickReport::default();

        if self.visible {
            let events = self.host.poll_events();
            report.host_events = events.len();
            for event in events {
                self.handle_host_event(event);
            }
        }

        report.activated = self.poll_activation(now);

        let (intents, errors) = self.process_intents();
        report.intents = intents;
        report.errors.extend(errors);

        if self.writer.tick(now) {
            match self.persist_now() {
                Ok(wrote) => report.wrote = wrote,
                Err(e) => report.errors.push(e),
            }
        }
        report
    }

    // ========== Persistence ==========

    /// Write the current layer now, bypassing the debounce window.
    /// Returns whether anything was written.
    pub fn flush(&mut self) -> Result<bool> {
        self.writer.cancel();
        self.persist_now()
    }

    fn flush_before_layer_change(&mut self) -> Result<()> {
        if let Err(e) = self.flush() {
            warn!("Layer {} could not be written, staying on it: {}", self.layer_index, e);
            return Err(e);
        }
        Ok(())
    }

    fn mark_dirty(&mut self) {
        self.writer.schedule();
        self.notify();
    }

    /// Export the live graph and hand it to the host. Unchanged snapshots
    /// are skipped; a rejected write is re-armed.
    fn persist_now(&mut self) -> Result<bool> {
        let Some(controller_id) = self.controller_id.clone() else {
            return Ok(false);
        };
        if self.activation_due.is_some() || self.graph.is_empty() {
            return Ok(false);
        }

        let data = self.graph.export();
        let layout = self.view.export_layout();
        let digest = snapshot_digest(&data, &layout)?;
        if self.writer.is_unchanged(&digest) {
            self.writer.record_skip();
            debug!("Layer {} of '{}' unchanged, skipping write", self.layer_index, controller_id);
            return Ok(false);
        }

        match self
            .host
            .update_state_machine_data(&controller_id, self.layer_index, data, layout)
        {
            Ok(()) => {
                self.writer.record_write(digest);
                debug!("Wrote layer {} of '{}'", self.layer_index, controller_id);
                Ok(true)
            }
            Err(e) => {
                warn!(
                    "Write-back of '{}' layer {} failed: {}",
                    controller_id, self.layer_index, e
                );
                self.writer.schedule();
                Err(e)
            }
        }
    }

    // ========== Internals ==========

    fn default_position(&self, kind: StateKind) -> Position {
        match kind {
            StateKind::Normal => self.config.state_position,
            StateKind::Entry => self.config.entry_position,
            StateKind::Exit => self.config.exit_position,
            StateKind::AnyState => self.config.any_state_position,
        }
    }

    /// Insert a state into the graph, load persisted content into it, and
    /// render it.
    fn register_state(
        &mut self,
        name: &str,
        id: Option<StateId>,
        kind: StateKind,
        position: Position,
        content: Option<&StateData>,
    ) -> StateId {
        let (id, created) = self.graph.insert_state(name, id, kind, position);
        if !created {
            return id;
        }
        if let (Some(data), Some(state)) = (content, self.graph.state_mut(id.as_str())) {
            if !state.is_pseudo() {
                state.load_content(data);
            }
        }
        if let Some(state) = self.graph.state(id.as_str()) {
            self.view.add_state(state);
        }
        id
    }

    /// Insert a transition, load persisted settings into it, and render it.
    fn register_transition(
        &mut self,
        id: TransitionId,
        source: &str,
        destination: &str,
        settings: Option<&TransitionData>,
    ) -> Result<TransitionId> {
        let id = self
            .graph
            .insert_transition(id, source, destination)?
            .id()
            .clone();
        if let (Some(data), Some(transition)) = (settings, self.graph.transition_mut(id.as_str())) {
            transition.load_settings(data);
        }
        if let Some(transition) = self.graph.transition(id.as_str()) {
            self.view.add_transition(transition);
        }
        self.sync_state_view(source);
        Ok(id)
    }

    fn sync_state_view(&mut self, id: &str) {
        if let Some(state) = self.graph.state(id) {
            self.view.sync_state(state);
        }
    }

    fn sync_transition_view(&mut self, id: &str) {
        if let Some(transition) = self.graph.transition(id) {
            self.view.sync_transition(transition);
        }
    }
}

impl<H: EditorHost, V: GraphView> fmt::Debug for AnimatorControllerStore<H, V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AnimatorControllerStore")
            .field("editor_state", &self.editor_state)
            .field("controller_id", &self.controller_id)
            .field("layer_index", &self.layer_index)
            .field("states", &self.graph.state_count())
            .field("transitions", &self.graph.transition_count())
            .finish()
    }
}

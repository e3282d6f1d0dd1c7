//! Editor Lifecycle
//!
//! Which controller is being edited and whether it can be edited yet. The
//! state is driven by panel visibility, host selection events and the
//! controller creation flow.

use std::time::Instant;

use log::{debug, info, warn};

use super::AnimatorControllerStore;
use crate::host::{AssetKind, EditorHost, EntityInfo, HostEvent};
use crate::view::GraphView;

/// Lifecycle state of the editor panel.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum EditorState {
    /// Nothing selected that could hold a controller.
    #[default]
    NeedSelect,
    /// The selected entity has no animator or no controller bound.
    NeedCreate,
    /// A controller is bound and waiting to be activated.
    Loading,
    Editable,
    /// The panel was just shown and is re-resolving its target.
    Visible,
    NoVisible,
}

impl<H: EditorHost, V: GraphView> AnimatorControllerStore<H, V> {
    pub(super) fn set_editor_state(&mut self, state: EditorState) {
        if self.editor_state != state {
            debug!("Editor state {:?} -> {:?}", self.editor_state, state);
            self.editor_state = state;
            self.notify();
        }
    }

    /// Show or hide the panel. Host events are only processed while shown.
    pub fn set_visibility(&mut self, visible: bool) {
        if self.visible == visible {
            return;
        }
        self.visible = visible;
        if visible {
            self.set_editor_state(EditorState::Visible);
            self.check_animator_controller_asset();
            if self.controller_id.is_some() {
                if self.activation_due.is_some() {
                    self.set_editor_state(EditorState::Loading);
                } else {
                    self.set_editor_state(EditorState::Editable);
                }
            }
        } else {
            self.set_editor_state(EditorState::NoVisible);
            self.clear_select();
        }
    }

    /// Resolve the controller to edit from the host's selected entity.
    ///
    /// Does nothing while a controller is already bound.
    pub fn check_animator_controller_asset(&mut self) {
        if self.controller_id.is_some() {
            return;
        }
        match self.host.selected_entity().cloned() {
            Some(entity) => self.resolve_entity(entity),
            None => {
                self.selected_entity = None;
                self.set_editor_state(EditorState::NeedSelect);
            }
        }
    }

    pub fn select_entity(&mut self, id: &str) {
        if self.selected_entity.as_deref() == Some(id) {
            return;
        }
        match self.host.entity(id).cloned() {
            Some(entity) => self.resolve_entity(entity),
            None => {
                warn!("Selected entity '{}' is unknown to the host", id);
                self.resolve_entity(EntityInfo::new(id));
            }
        }
    }

    /// The scene selection was cleared. A controller bound through the
    /// deselected entity is flushed and released.
    pub fn unselect_entity(&mut self) {
        self.selected_entity = None;
        if self.bound_entity.is_some() {
            self.release_controller();
            self.set_editor_state(EditorState::NeedSelect);
        } else if self.editor_state == EditorState::NeedCreate {
            self.set_editor_state(EditorState::NeedSelect);
        }
    }

    /// Edit a controller picked in the asset browser.
    pub fn select_controller(&mut self, asset_id: &str) {
        if self.controller_id.as_deref() == Some(asset_id) {
            return;
        }
        match self.host.asset_kind(asset_id) {
            Some(AssetKind::AnimatorController) => self.bind_controller(asset_id.to_string(), None),
            other => debug!(
                "Ignoring selection of '{}': not an animator controller ({:?})",
                asset_id, other
            ),
        }
    }

    /// The user started creating a controller for the selected entity.
    pub fn begin_controller_creation(&mut self) {
        if self.editor_state == EditorState::NeedCreate {
            self.set_editor_state(EditorState::Loading);
        } else {
            warn!(
                "Controller creation started in {:?}, expected NeedCreate",
                self.editor_state
            );
        }
    }

    /// The host finished creating a controller; start editing it.
    pub fn complete_controller_creation(&mut self, asset_id: &str) {
        let via = self.selected_entity.clone();
        self.bind_controller(asset_id.to_string(), via);
    }

    /// React to a host change notification.
    pub fn handle_host_event(&mut self, event: HostEvent) {
        match event {
            HostEvent::EntitySelected(Some(id)) => self.select_entity(&id),
            HostEvent::EntitySelected(None) => self.unselect_entity(),
            HostEvent::AssetSelected(Some(id)) => self.select_controller(&id),
            HostEvent::AssetSelected(None) => {}
            HostEvent::ControllerRefChanged {
                entity_id,
                controller,
            } => {
                if self.selected_entity.as_deref() != Some(entity_id.as_str())
                    || self.editor_state == EditorState::Loading
                {
                    return;
                }
                match controller {
                    Some(reference) => self.bind_controller(reference.asset_id(), Some(entity_id)),
                    None => {
                        if self.bound_entity.as_deref() == Some(entity_id.as_str()) {
                            self.release_controller();
                            self.set_editor_state(EditorState::NeedCreate);
                        }
                    }
                }
            }
            HostEvent::AssetDataChanged { asset_id } => {
                if self.controller_id.as_deref() == Some(asset_id.as_str())
                    && self.activation_due.is_none()
                {
                    info!("Controller '{}' changed outside the editor, rebuilding", asset_id);
                    self.writer.cancel();
                    self.clear_select();
                    self.rebuild();
                }
            }
        }
    }

    fn resolve_entity(&mut self, entity: EntityInfo) {
        self.selected_entity = Some(entity.id.clone());
        match entity.controller_asset_id() {
            Some(asset_id) => self.bind_controller(asset_id, Some(entity.id)),
            None => {
                if entity.animator.is_none() {
                    debug!("Entity '{}' has no animator", entity.id);
                } else {
                    debug!("Entity '{}' has no controller bound", entity.id);
                }
                if self.bound_entity.is_some() {
                    self.release_controller();
                }
                if self.controller_id.is_none() {
                    self.set_editor_state(EditorState::NeedCreate);
                }
            }
        }
    }

    /// Make `asset_id` the editing target. The previous controller is flushed
    /// first; the new one is activated after the configured delay.
    pub(super) fn bind_controller(&mut self, asset_id: String, via_entity: Option<String>) {
        if self.controller_id.as_deref() == Some(asset_id.as_str()) {
            if via_entity.is_some() {
                self.bound_entity = via_entity;
            }
            return;
        }
        if self.controller_id.is_some() {
            self.release_controller();
        }

        info!("Editing controller '{}'", asset_id);
        self.host.select_asset(&asset_id);
        self.controller_id = Some(asset_id);
        self.bound_entity = via_entity;
        self.layer_index = 0;
        self.activation_due = Some(Instant::now() + self.config.activation_delay());
        self.set_editor_state(EditorState::Loading);
    }

    /// Flush and forget the current controller.
    pub(super) fn release_controller(&mut self) {
        if let Err(e) = self.flush() {
            warn!("Unsaved edits of the previous controller were lost: {}", e);
        }
        self.writer.cancel();
        self.writer.forget_digest();
        self.reset_graph();
        self.controller_id = None;
        self.bound_entity = None;
        self.activation_due = None;
        self.layer_index = 0;
    }

    /// Activate the bound controller once its delay has passed.
    pub(super) fn poll_activation(&mut self, now: Instant) -> bool {
        match self.activation_due {
            Some(due) if now >= due => {
                self.activation_due = None;
                self.activate();
                true
            }
            _ => false,
        }
    }

    fn activate(&mut self) {
        let Some(id) = self.controller_id.clone() else {
            return;
        };
        if self.host.controller_asset(&id).is_none() {
            warn!("Controller asset '{}' is not available from the host", id);
            self.controller_id = None;
            self.bound_entity = None;
            let state = if self.selected_entity.is_some() {
                EditorState::NeedCreate
            } else {
                EditorState::NeedSelect
            };
            self.set_editor_state(state);
            return;
        }
        self.rebuild();
        self.set_editor_state(EditorState::Editable);
    }
}

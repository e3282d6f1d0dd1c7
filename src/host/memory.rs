//! In-Memory Host
//!
//! A self-contained host holding controller assets and scene entities in
//! memory. Used by the command-line tool and by tests; every scene change made
//! through its helpers is queued as a `HostEvent`.

use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use log::{debug, info};

use super::{AssetKind, AssetStore, ControllerRef, EntityInfo, HostEvent, SceneHost};
use crate::asset::{ControllerAsset, StateMachineData};
use crate::error::{EditorError, Result};
use crate::view::VisualLayout;

/// One accepted write-back.
#[derive(Debug, Clone, PartialEq)]
pub struct WriteRecord {
    pub controller_id: String,
    pub layer_index: usize,
    pub state_count: usize,
    pub transition_count: usize,
    pub at: DateTime<Utc>,
}

/// Host keeping everything in memory.
#[derive(Debug, Default)]
pub struct MemoryHost {
    assets: IndexMap<String, ControllerAsset>,
    other_assets: IndexMap<String, AssetKind>,
    entities: IndexMap<String, EntityInfo>,
    selected_entity: Option<String>,
    selected_asset: Option<String>,
    events: Vec<HostEvent>,
    writes: Vec<WriteRecord>,
    fail_writes: bool,
}

impl MemoryHost {
    pub fn new() -> Self {
        Self::default()
    }

    /// Host holding a single controller asset.
    pub fn with_asset(asset: ControllerAsset) -> Self {
        let mut host = Self::new();
        host.insert_asset(asset);
        host
    }

    pub fn insert_asset(&mut self, asset: ControllerAsset) {
        self.assets.insert(asset.id.clone(), asset);
    }

    /// Register a non-controller asset, e.g. a clip or script.
    pub fn insert_other_asset(&mut self, id: impl Into<String>, kind: AssetKind) {
        self.other_assets.insert(id.into(), kind);
    }

    pub fn take_asset(&mut self, id: &str) -> Option<ControllerAsset> {
        self.assets.shift_remove(id)
    }

    pub fn insert_entity(&mut self, entity: EntityInfo) {
        self.entities.insert(entity.id.clone(), entity);
    }

    // ========== Scene changes ==========

    /// Change the scene selection and notify the editor.
    pub fn set_selected_entity(&mut self, id: Option<&str>) {
        self.selected_entity = id.map(str::to_string);
        self.events
            .push(HostEvent::EntitySelected(self.selected_entity.clone()));
    }

    /// Change the asset browser selection and notify the editor.
    pub fn set_selected_asset(&mut self, id: Option<&str>) {
        self.selected_asset = id.map(str::to_string);
        self.events
            .push(HostEvent::AssetSelected(self.selected_asset.clone()));
    }

    /// Point an entity's animator at a controller (adding the animator if
    /// needed) and notify the editor.
    pub fn bind_controller(&mut self, entity_id: &str, controller: Option<ControllerRef>) {
        let entity = self
            .entities
            .entry(entity_id.to_string())
            .or_insert_with(|| EntityInfo::new(entity_id));
        let animator = entity.animator.get_or_insert_with(Default::default);
        animator.controller = controller.clone();
        self.events.push(HostEvent::ControllerRefChanged {
            entity_id: entity_id.to_string(),
            controller,
        });
    }

    /// Replace a layer's authoritative graph from outside the editor.
    pub fn replace_state_machine(
        &mut self,
        asset_id: &str,
        layer_index: usize,
        data: StateMachineData,
    ) -> Result<()> {
        let asset = self
            .assets
            .get_mut(asset_id)
            .ok_or_else(|| EditorError::ControllerNotFound {
                controller_id: asset_id.to_string(),
            })?;
        let count = asset.layers.len();
        let layer = asset
            .layers
            .get_mut(layer_index)
            .ok_or(EditorError::LayerOutOfRange {
                index: layer_index,
                count,
            })?;
        layer.state_machine = data;
        self.mark_data_changed(asset_id);
        Ok(())
    }

    /// Flag a controller's data as changed and notify the editor.
    pub fn mark_data_changed(&mut self, asset_id: &str) {
        if let Some(asset) = self.assets.get_mut(asset_id) {
            asset.internal_data_updated = true;
        }
        self.events.push(HostEvent::AssetDataChanged {
            asset_id: asset_id.to_string(),
        });
    }

    // ========== Write log ==========

    /// Make subsequent write-backs fail, simulating a read-only asset.
    pub fn set_fail_writes(&mut self, fail: bool) {
        self.fail_writes = fail;
    }

    pub fn writes(&self) -> &[WriteRecord] {
        &self.writes
    }

    pub fn write_count(&self) -> usize {
        self.writes.len()
    }

    pub fn clear_writes(&mut self) {
        self.writes.clear();
    }
}

impl AssetStore for MemoryHost {
    fn controller_asset(&self, id: &str) -> Option<&ControllerAsset> {
        self.assets.get(id)
    }

    fn controller_asset_mut(&mut self, id: &str) -> Option<&mut ControllerAsset> {
        self.assets.get_mut(id)
    }

    fn update_state_machine_data(
        &mut self,
        controller_id: &str,
        layer_index: usize,
        data: StateMachineData,
        layout: VisualLayout,
    ) -> Result<()> {
        if self.fail_writes {
            return Err(EditorError::WriteBackRejected {
                controller_id: controller_id.to_string(),
                layer_index,
                reason: "host is read-only".to_string(),
            });
        }
        let asset = self
            .assets
            .get_mut(controller_id)
            .ok_or_else(|| EditorError::ControllerNotFound {
                controller_id: controller_id.to_string(),
            })?;

        let record = WriteRecord {
            controller_id: controller_id.to_string(),
            layer_index,
            state_count: data.states.len(),
            transition_count: data.transition_count(),
            at: Utc::now(),
        };
        asset.apply_state_machine(layer_index, data, layout)?;
        debug!(
            "Stored layer {} of '{}': {} states, {} transitions",
            layer_index, controller_id, record.state_count, record.transition_count
        );
        self.writes.push(record);
        Ok(())
    }
}

impl SceneHost for MemoryHost {
    fn selected_entity(&self) -> Option<&EntityInfo> {
        self.selected_entity
            .as_deref()
            .and_then(|id| self.entities.get(id))
    }

    fn entity(&self, id: &str) -> Option<&EntityInfo> {
        self.entities.get(id)
    }

    fn selected_asset_id(&self) -> Option<&str> {
        self.selected_asset.as_deref()
    }

    fn select_asset(&mut self, id: &str) {
        if self.selected_asset.as_deref() != Some(id) {
            info!("Host asset selection -> {}", id);
            self.selected_asset = Some(id.to_string());
        }
    }

    fn asset_kind(&self, id: &str) -> Option<AssetKind> {
        if self.assets.contains_key(id) {
            Some(AssetKind::AnimatorController)
        } else {
            self.other_assets.get(id).copied()
        }
    }

    fn poll_events(&mut self) -> Vec<HostEvent> {
        std::mem::take(&mut self.events)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scene_changes_are_queued() {
        let mut host = MemoryHost::new();
        host.insert_entity(EntityInfo::new("hero"));
        host.set_selected_entity(Some("hero"));
        host.bind_controller("hero", Some(ControllerRef::new("ctrl")));

        let events = host.poll_events();
        assert_eq!(events.len(), 2);
        assert_eq!(events[0], HostEvent::EntitySelected(Some("hero".to_string())));
        assert!(host.poll_events().is_empty());
        assert_eq!(
            host.selected_entity().unwrap().controller_asset_id(),
            Some("ctrl".to_string())
        );
    }

    #[test]
    fn test_select_asset_does_not_echo() {
        let mut host = MemoryHost::new();
        host.select_asset("ctrl");
        assert_eq!(host.selected_asset_id(), Some("ctrl"));
        assert!(host.poll_events().is_empty());
    }

    #[test]
    fn test_asset_kinds() {
        let mut host = MemoryHost::with_asset(ControllerAsset::new("ctrl", "Hero"));
        host.insert_other_asset("clip", AssetKind::AnimationClip);
        assert_eq!(host.asset_kind("ctrl"), Some(AssetKind::AnimatorController));
        assert_eq!(host.asset_kind("clip"), Some(AssetKind::AnimationClip));
        assert_eq!(host.asset_kind("nope"), None);
    }

    #[test]
    fn test_write_back_is_logged() {
        let mut host = MemoryHost::with_asset(ControllerAsset::new("ctrl", "Hero"));
        host.update_state_machine_data("ctrl", 0, StateMachineData::default(), VisualLayout::default())
            .unwrap();
        assert_eq!(host.write_count(), 1);
        assert!(host.controller_asset("ctrl").unwrap().layers[0]
            .visual_layout_cache
            .is_some());

        host.set_fail_writes(true);
        let err = host
            .update_state_machine_data("ctrl", 0, StateMachineData::default(), VisualLayout::default())
            .unwrap_err();
        assert!(err.is_retryable());
        assert_eq!(host.write_count(), 1);
    }

    #[test]
    fn test_replace_state_machine_flags_asset() {
        let mut host = MemoryHost::with_asset(ControllerAsset::new("ctrl", "Hero"));
        host.replace_state_machine("ctrl", 0, StateMachineData::default())
            .unwrap();
        assert!(host.controller_asset("ctrl").unwrap().internal_data_updated);
        assert_eq!(
            host.poll_events(),
            vec![HostEvent::AssetDataChanged {
                asset_id: "ctrl".to_string()
            }]
        );
        assert!(host
            .replace_state_machine("ctrl", 4, StateMachineData::default())
            .is_err());
    }
}

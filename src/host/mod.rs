//! Host Boundary
//!
//! What the editor needs from the application embedding it:
//! - `AssetStore`: the authoritative controller assets and the write-back sink
//! - `SceneHost`: entity/asset selection and change notifications
//!
//! A store is generic over `EditorHost`, so a host missing either capability
//! is rejected at compile time.

mod memory;

use serde::{Deserialize, Serialize};

pub use memory::{MemoryHost, WriteRecord};

use crate::asset::{ControllerAsset, StateMachineData};
use crate::error::Result;
use crate::view::VisualLayout;

/// Reference from an animator component to a controller asset.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ControllerRef {
    pub ref_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub key: Option<String>,
}

impl ControllerRef {
    pub fn new(ref_id: impl Into<String>) -> Self {
        Self {
            ref_id: ref_id.into(),
            key: None,
        }
    }

    pub fn with_key(mut self, key: impl Into<String>) -> Self {
        self.key = Some(key.into());
        self
    }

    /// Asset id this reference resolves to: `refId`, or `refId-key` for
    /// sub-assets.
    pub fn asset_id(&self) -> String {
        match &self.key {
            Some(key) => format!("{}-{}", self.ref_id, key),
            None => self.ref_id.clone(),
        }
    }
}

/// Animator component of an entity.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AnimatorBinding {
    #[serde(default)]
    pub controller: Option<ControllerRef>,
}

/// A scene entity as far as the editor cares.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntityInfo {
    pub id: String,
    #[serde(default)]
    pub animator: Option<AnimatorBinding>,
}

impl EntityInfo {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            animator: None,
        }
    }

    pub fn with_animator(mut self, controller: Option<ControllerRef>) -> Self {
        self.animator = Some(AnimatorBinding { controller });
        self
    }

    /// Asset id of the bound controller, if the entity has one.
    pub fn controller_asset_id(&self) -> Option<String> {
        self.animator
            .as_ref()
            .and_then(|animator| animator.controller.as_ref())
            .map(ControllerRef::asset_id)
    }
}

/// Broad type of a host asset.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssetKind {
    AnimatorController,
    AnimationClip,
    Script,
    Other,
}

/// Change notification from the host.
#[derive(Debug, Clone, PartialEq)]
pub enum HostEvent {
    /// The scene selection changed; `None` means nothing is selected.
    EntitySelected(Option<String>),
    /// The asset browser selection changed.
    AssetSelected(Option<String>),
    /// An entity's animator now points at another controller (or none).
    ControllerRefChanged {
        entity_id: String,
        controller: Option<ControllerRef>,
    },
    /// A controller's authoritative state-machine data was replaced.
    AssetDataChanged { asset_id: String },
}

/// Source of controller assets and sink for the editor's writes.
pub trait AssetStore {
    fn controller_asset(&self, id: &str) -> Option<&ControllerAsset>;

    fn controller_asset_mut(&mut self, id: &str) -> Option<&mut ControllerAsset>;

    /// Replace the persisted graph and layout of one layer. This is the only
    /// way the editor writes to the host.
    fn update_state_machine_data(
        &mut self,
        controller_id: &str,
        layer_index: usize,
        data: StateMachineData,
        layout: VisualLayout,
    ) -> Result<()>;
}

/// Scene and asset selection of the host application.
pub trait SceneHost {
    fn selected_entity(&self) -> Option<&EntityInfo>;

    fn entity(&self, id: &str) -> Option<&EntityInfo>;

    fn selected_asset_id(&self) -> Option<&str>;

    /// Make an asset the host's selected asset. Must not echo an
    /// `AssetSelected` event back to the editor.
    fn select_asset(&mut self, id: &str);

    fn asset_kind(&self, id: &str) -> Option<AssetKind>;

    /// Take the events queued since the last call.
    fn poll_events(&mut self) -> Vec<HostEvent>;
}

/// Everything a store needs from its host.
pub trait EditorHost: AssetStore + SceneHost {}

impl<T: AssetStore + SceneHost> EditorHost for T {}

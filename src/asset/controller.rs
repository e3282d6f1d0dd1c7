//! Animator Controller Asset
//!
//! The host-side document the editor works on: parameters plus an ordered
//! list of layers, each holding its serialized state machine and the cached
//! visual layout of the graph view.

use std::fs;
use std::path::Path;

use log::{debug, warn};
use serde::{Deserialize, Serialize};

use super::{Parameter, ParameterPatch, ParameterType, ParameterValue, StateMachineData};
use crate::config::DEFAULT_PARAMETER_NAME;
use crate::error::{EditorError, Result};
use crate::view::VisualLayout;

/// Name given to layers added from the editor.
pub const DEFAULT_LAYER_NAME: &str = "Layer";

/// Name of the first layer of a new controller.
pub const BASE_LAYER_NAME: &str = "Base Layer";

/// How a layer combines with the layers beneath it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub enum BlendingMode {
    #[default]
    Override,
    Additive,
}

impl TryFrom<u8> for BlendingMode {
    type Error = String;

    fn try_from(code: u8) -> std::result::Result<Self, Self::Error> {
        match code {
            0 => Ok(BlendingMode::Override),
            1 => Ok(BlendingMode::Additive),
            other => Err(format!("unknown blending mode {}", other)),
        }
    }
}

impl From<BlendingMode> for u8 {
    fn from(mode: BlendingMode) -> Self {
        match mode {
            BlendingMode::Override => 0,
            BlendingMode::Additive => 1,
        }
    }
}

/// One independently weighted sub-state-machine of a controller.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LayerData {
    pub name: String,
    #[serde(default = "default_weight")]
    pub weight: f64,
    #[serde(default)]
    pub blending_mode: BlendingMode,
    #[serde(default)]
    pub state_machine: StateMachineData,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub visual_layout_cache: Option<VisualLayout>,
}

fn default_weight() -> f64 {
    1.0
}

impl LayerData {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            weight: default_weight(),
            blending_mode: BlendingMode::default(),
            state_machine: StateMachineData::default(),
            visual_layout_cache: None,
        }
    }
}

/// An animator controller asset.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ControllerAsset {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub parameters: Vec<Parameter>,
    #[serde(default)]
    pub layers: Vec<LayerData>,
    /// Set by the host when `layers[*].state_machine` was changed outside the
    /// editor and must win over any cached layout.
    #[serde(default)]
    pub internal_data_updated: bool,
}

impl ControllerAsset {
    /// Create a controller with a single empty base layer.
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            parameters: Vec::new(),
            layers: vec![LayerData::new(BASE_LAYER_NAME)],
            internal_data_updated: false,
        }
    }

    /// Load a controller from a JSON file.
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path).map_err(|e| EditorError::FileReadError {
            path: path.to_path_buf(),
            source: e,
        })?;
        let asset: ControllerAsset = serde_json::from_str(&content)?;
        Ok(asset)
    }

    /// Save the controller as pretty-printed JSON.
    pub fn save(&self, path: &Path) -> Result<()> {
        let content = serde_json::to_string_pretty(self)?;
        fs::write(path, content).map_err(|e| EditorError::FileWriteError {
            path: path.to_path_buf(),
            source: e,
        })?;
        Ok(())
    }

    pub fn layer(&self, index: usize) -> Option<&LayerData> {
        self.layers.get(index)
    }

    pub fn layer_mut(&mut self, index: usize) -> Option<&mut LayerData> {
        self.layers.get_mut(index)
    }

    // ========== Layers ==========

    /// Append a default layer and return its index.
    pub fn add_layer(&mut self) -> usize {
        self.layers.push(LayerData::new(DEFAULT_LAYER_NAME));
        self.layers.len() - 1
    }

    /// Remove a layer. The last remaining layer cannot be removed.
    pub fn remove_layer(&mut self, index: usize) -> Option<LayerData> {
        if index >= self.layers.len() {
            return None;
        }
        if self.layers.len() == 1 {
            warn!("Refusing to remove the only layer of controller '{}'", self.id);
            return None;
        }
        Some(self.layers.remove(index))
    }

    /// Replace the persisted graph and layout of a layer.
    pub fn apply_state_machine(
        &mut self,
        layer_index: usize,
        data: StateMachineData,
        layout: VisualLayout,
    ) -> Result<()> {
        let count = self.layers.len();
        let layer = self
            .layers
            .get_mut(layer_index)
            .ok_or(EditorError::LayerOutOfRange {
                index: layer_index,
                count,
            })?;
        layer.state_machine = data;
        layer.visual_layout_cache = Some(layout);
        Ok(())
    }

    // ========== Parameters ==========

    pub fn parameter(&self, name: &str) -> Option<&Parameter> {
        self.parameters.iter().find(|p| p.name == name)
    }

    /// First free parameter name of the form `base`, `base1`, `base2`, ...
    pub fn unique_parameter_name(&self, base: &str) -> String {
        self.unique_parameter_name_except(base, None)
    }

    fn unique_parameter_name_except(&self, base: &str, skip: Option<usize>) -> String {
        let taken = |name: &str| {
            self.parameters
                .iter()
                .enumerate()
                .any(|(i, p)| Some(i) != skip && p.name == name)
        };
        let mut name = base.to_string();
        let mut index = 0;
        while taken(&name) {
            index += 1;
            name = format!("{}{}", base, index);
        }
        name
    }

    /// Add a parameter. The name is made unique; the default value falls back
    /// to the type's zero value.
    pub fn add_parameter(
        &mut self,
        kind: ParameterType,
        name: Option<&str>,
        default_value: Option<ParameterValue>,
    ) -> &Parameter {
        let base = name
            .filter(|n| !n.trim().is_empty())
            .unwrap_or(DEFAULT_PARAMETER_NAME);
        let mut parameter = Parameter::new(self.unique_parameter_name(base), kind);
        if let Some(value) = default_value {
            parameter.default_value = value;
        }
        debug!("Adding parameter '{}' ({})", parameter.name, kind);
        self.parameters.push(parameter);
        &self.parameters[self.parameters.len() - 1]
    }

    pub fn remove_parameter(&mut self, index: usize) -> Option<Parameter> {
        if index < self.parameters.len() {
            Some(self.parameters.remove(index))
        } else {
            None
        }
    }

    /// Apply a partial update to a parameter.
    ///
    /// Returns the `(requested, resolved)` names when a rename collided with
    /// another parameter and had to be suffixed.
    pub fn update_parameter(
        &mut self,
        index: usize,
        patch: ParameterPatch,
    ) -> Option<(String, String)> {
        if index >= self.parameters.len() {
            return None;
        }
        let mut collision = None;
        if let Some(requested) = patch.name {
            let resolved = self.unique_parameter_name_except(&requested, Some(index));
            if resolved != requested {
                collision = Some((requested, resolved.clone()));
            }
            self.parameters[index].name = resolved;
        }
        let parameter = &mut self.parameters[index];
        if let Some(kind) = patch.kind {
            parameter.kind = kind;
            parameter.is_trigger = kind == ParameterType::Trigger;
            if patch.default_value.is_none() {
                parameter.default_value = kind.default_value();
            }
        }
        if let Some(value) = patch.default_value {
            parameter.default_value = value;
        }
        collision
    }
}

//! Controller Asset Module
//!
//! Serialized shapes exchanged with the host: the controller asset with its
//! parameters and layers, and the persisted form of a layer's graph.

mod controller;
mod parameter;
mod serial;

pub use controller::{
    BlendingMode, ControllerAsset, LayerData, BASE_LAYER_NAME, DEFAULT_LAYER_NAME,
};
pub use parameter::{Parameter, ParameterPatch, ParameterType, ParameterValue};
pub use serial::{StateData, StateMachineData, TransitionData};

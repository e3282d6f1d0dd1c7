//! Serialized State-Machine Shapes
//!
//! The persisted form of a layer's graph as the host stores it. These are
//! plain data; the live graph produces them on export and consumes them on
//! rebuild.

use serde::{Deserialize, Serialize};

use crate::graph::{ClipRef, Condition, StateId, StateKind, TransitionId, WrapMode};

fn default_speed() -> f64 {
    1.0
}

fn default_clip_end() -> f64 {
    1.0
}

fn default_exit_time() -> f64 {
    0.75
}

/// Persisted state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StateData {
    pub id: StateId,
    pub name: String,
    #[serde(default)]
    pub kind: StateKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub clip_ref: Option<ClipRef>,
    #[serde(default = "default_speed")]
    pub speed: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub loop_mode: Option<WrapMode>,
    #[serde(default)]
    pub clip_start_normalized_time: f64,
    #[serde(default = "default_clip_end")]
    pub clip_end_normalized_time: f64,
    #[serde(default)]
    pub outgoing_transition_ids: Vec<TransitionId>,
    #[serde(default)]
    pub script_refs: Vec<String>,
    #[serde(default)]
    pub is_default: bool,
}

/// Persisted transition.
///
/// `hasExitTime` and `duration` may be absent; the graph then falls back to
/// the defaults for the transition's endpoint kinds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransitionData {
    pub id: TransitionId,
    pub source_state_id: StateId,
    pub destination_state_id: StateId,
    #[serde(default)]
    pub solo: bool,
    #[serde(default)]
    pub mute: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub has_exit_time: Option<bool>,
    #[serde(default)]
    pub is_fixed_duration: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration: Option<f64>,
    #[serde(default = "default_exit_time")]
    pub exit_time: f64,
    #[serde(default)]
    pub offset: f64,
    #[serde(default)]
    pub conditions: Vec<Condition>,
}

/// Persisted graph of one layer.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StateMachineData {
    #[serde(default)]
    pub states: Vec<StateData>,
    #[serde(default)]
    pub transitions: Vec<TransitionData>,
    #[serde(default)]
    pub entry_transitions: Vec<TransitionData>,
    #[serde(default)]
    pub any_transitions: Vec<TransitionData>,
}

impl StateMachineData {
    pub fn is_empty(&self) -> bool {
        self.states.is_empty()
            && self.transitions.is_empty()
            && self.entry_transitions.is_empty()
            && self.any_transitions.is_empty()
    }

    pub fn transition_count(&self) -> usize {
        self.transitions.len() + self.entry_transitions.len() + self.any_transitions.len()
    }

    pub fn state_by_name(&self, name: &str) -> Option<&StateData> {
        self.states.iter().find(|s| s.name == name)
    }
}

//! States
//!
//! A state is a node of the state machine. Normal states play an animation
//! clip; the three pseudo-states (Entry, Exit, AnyState) are structural
//! markers that only exist to anchor transitions.

use indexmap::IndexSet;
use serde::{Deserialize, Serialize};

use super::{Position, StateId, TransitionId};
use crate::asset::StateData;

/// Kind of a state node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum StateKind {
    #[default]
    Normal,
    Entry,
    Exit,
    AnyState,
}

impl StateKind {
    /// The three pseudo-states, in the order a bare layer creates them.
    pub const PSEUDO: [StateKind; 3] = [StateKind::AnyState, StateKind::Entry, StateKind::Exit];

    pub fn is_pseudo(&self) -> bool {
        !matches!(self, StateKind::Normal)
    }

    /// Exit can only be entered.
    pub fn can_be_source(&self) -> bool {
        !matches!(self, StateKind::Exit)
    }

    /// Entry and AnyState can only be left.
    pub fn can_be_destination(&self) -> bool {
        !matches!(self, StateKind::Entry | StateKind::AnyState)
    }

    /// Well-known id of a pseudo-state, shared with persisted layouts.
    pub fn pseudo_id(&self) -> Option<&'static str> {
        match self {
            StateKind::Normal => None,
            StateKind::Entry => Some("entry"),
            StateKind::Exit => Some("exit"),
            StateKind::AnyState => Some("any"),
        }
    }

    /// Name shown for a pseudo-state node.
    pub fn display_name(&self) -> &'static str {
        match self {
            StateKind::Normal => "State",
            StateKind::Entry => "Entry",
            StateKind::Exit => "Exit",
            StateKind::AnyState => "Any State",
        }
    }
}

/// How the clip of a state wraps when it reaches its end.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub enum WrapMode {
    Once,
    Loop,
}

impl TryFrom<u8> for WrapMode {
    type Error = String;

    fn try_from(code: u8) -> Result<Self, Self::Error> {
        match code {
            1 => Ok(WrapMode::Once),
            2 => Ok(WrapMode::Loop),
            other => Err(format!("unknown wrap mode {}", other)),
        }
    }
}

impl From<WrapMode> for u8 {
    fn from(mode: WrapMode) -> Self {
        match mode {
            WrapMode::Once => 1,
            WrapMode::Loop => 2,
        }
    }
}

/// Reference to an animation clip asset.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClipRef {
    pub id: String,
    #[serde(default)]
    pub name: String,
}

/// Editable content of a state.
#[derive(Debug, Clone, PartialEq)]
pub struct StateContent {
    pub clip: Option<ClipRef>,
    pub speed: f64,
    pub wrap_mode: Option<WrapMode>,
    pub clip_start_normalized_time: f64,
    pub clip_end_normalized_time: f64,
    pub scripts: Vec<String>,
    pub is_default: bool,
}

impl Default for StateContent {
    fn default() -> Self {
        Self {
            clip: None,
            speed: 1.0,
            wrap_mode: None,
            clip_start_normalized_time: 0.0,
            clip_end_normalized_time: 1.0,
            scripts: Vec::new(),
            is_default: false,
        }
    }
}

/// Single-property update of a state, as issued by an inspector.
#[derive(Debug, Clone, PartialEq)]
pub enum StateUpdate {
    Name(String),
    Clip(Option<ClipRef>),
    Speed(f64),
    WrapMode(Option<WrapMode>),
    ClipStartNormalizedTime(f64),
    ClipEndNormalizedTime(f64),
    IsDefault(bool),
}

/// A node of the live state machine.
#[derive(Debug, Clone)]
pub struct State {
    id: StateId,
    name: String,
    kind: StateKind,
    position: Position,
    content: StateContent,
    incoming: IndexSet<TransitionId>,
    outgoing: IndexSet<TransitionId>,
}

impl State {
    pub(crate) fn new(id: StateId, name: String, kind: StateKind, position: Position) -> Self {
        Self {
            id,
            name,
            kind,
            position,
            content: StateContent::default(),
            incoming: IndexSet::new(),
            outgoing: IndexSet::new(),
        }
    }

    pub fn id(&self) -> &StateId {
        &self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> StateKind {
        self.kind
    }

    pub fn is_pseudo(&self) -> bool {
        self.kind.is_pseudo()
    }

    pub fn position(&self) -> Position {
        self.position
    }

    pub fn content(&self) -> &StateContent {
        &self.content
    }

    /// Transitions arriving at this state, in registration order.
    pub fn incoming(&self) -> impl Iterator<Item = &TransitionId> {
        self.incoming.iter()
    }

    /// Transitions leaving this state, in registration order.
    pub fn outgoing(&self) -> impl Iterator<Item = &TransitionId> {
        self.outgoing.iter()
    }

    /// Exportable form of this state.
    ///
    /// Recomputed on every call: the outgoing-transition list comes from the
    /// live adjacency index and the current name/id are stamped in.
    pub fn data(&self) -> StateData {
        StateData {
            id: self.id.clone(),
            name: self.name.clone(),
            kind: self.kind,
            clip_ref: self.content.clip.clone(),
            speed: self.content.speed,
            loop_mode: self.content.wrap_mode,
            clip_start_normalized_time: self.content.clip_start_normalized_time,
            clip_end_normalized_time: self.content.clip_end_normalized_time,
            outgoing_transition_ids: self.outgoing.iter().cloned().collect(),
            script_refs: self.content.scripts.clone(),
            is_default: self.content.is_default,
        }
    }

    /// Copy persisted content into this state. Identity, name, kind and
    /// adjacency are owned by the graph and are not touched.
    pub(crate) fn load_content(&mut self, data: &StateData) {
        self.content = StateContent {
            clip: data.clip_ref.clone(),
            speed: data.speed,
            wrap_mode: data.loop_mode,
            clip_start_normalized_time: data.clip_start_normalized_time,
            clip_end_normalized_time: data.clip_end_normalized_time,
            scripts: data.script_refs.clone(),
            is_default: data.is_default,
        };
    }

    pub(crate) fn set_name(&mut self, name: String) {
        self.name = name;
    }

    pub(crate) fn set_position(&mut self, position: Position) {
        self.position = position;
    }

    /// Apply a content update. Renames go through the graph's name index.
    pub(crate) fn apply(&mut self, update: StateUpdate) {
        match update {
            StateUpdate::Name(name) => self.name = name,
            StateUpdate::Clip(clip) => self.content.clip = clip,
            StateUpdate::Speed(speed) => self.content.speed = speed,
            StateUpdate::WrapMode(mode) => self.content.wrap_mode = mode,
            StateUpdate::ClipStartNormalizedTime(t) => self.content.clip_start_normalized_time = t,
            StateUpdate::ClipEndNormalizedTime(t) => self.content.clip_end_normalized_time = t,
            StateUpdate::IsDefault(is_default) => self.content.is_default = is_default,
        }
    }

    pub(crate) fn add_script(&mut self, script_id: String) {
        self.content.scripts.push(script_id);
    }

    pub(crate) fn remove_script(&mut self, index: usize) -> Option<String> {
        if index < self.content.scripts.len() {
            Some(self.content.scripts.remove(index))
        } else {
            None
        }
    }

    pub(crate) fn update_script(&mut self, index: usize, script_id: String) -> bool {
        match self.content.scripts.get_mut(index) {
            Some(slot) => {
                *slot = script_id;
                true
            }
            None => false,
        }
    }

    pub(crate) fn register_incoming(&mut self, id: TransitionId) {
        self.incoming.insert(id);
    }

    pub(crate) fn register_outgoing(&mut self, id: TransitionId) {
        self.outgoing.insert(id);
    }

    pub(crate) fn unregister_incoming(&mut self, id: &TransitionId) {
        self.incoming.shift_remove(id);
    }

    pub(crate) fn unregister_outgoing(&mut self, id: &TransitionId) {
        self.outgoing.shift_remove(id);
    }
}

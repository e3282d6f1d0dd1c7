//! Transitions
//!
//! A transition is a directed edge between two states. It holds typed handles
//! to its endpoints; the owning graph keeps both endpoints' adjacency indices
//! in step with it.

use super::{Condition, ConditionPatch, State, StateId, StateKind, TransitionId};
use crate::asset::TransitionData;

/// Timing and flags of a transition.
#[derive(Debug, Clone, PartialEq)]
pub struct TransitionSettings {
    pub solo: bool,
    pub mute: bool,
    pub has_exit_time: bool,
    pub is_fixed_duration: bool,
    pub duration: f64,
    pub exit_time: f64,
    pub offset: f64,
}

impl Default for TransitionSettings {
    fn default() -> Self {
        Self {
            solo: false,
            mute: false,
            has_exit_time: true,
            is_fixed_duration: false,
            duration: 0.25,
            exit_time: 0.75,
            offset: 0.0,
        }
    }
}

impl TransitionSettings {
    /// Defaults adjusted for the kinds of the two endpoints.
    ///
    /// Entry transitions blend instantly; transitions out of Entry or
    /// AnyState, or into Exit, never wait for an exit time.
    pub fn for_endpoints(source: StateKind, destination: StateKind) -> Self {
        let mut settings = Self::default();
        if source == StateKind::Entry {
            settings.duration = 0.0;
        }
        if matches!(source, StateKind::Entry | StateKind::AnyState)
            || destination == StateKind::Exit
        {
            settings.has_exit_time = false;
        }
        settings
    }
}

/// Single-property update of a transition, as issued by an inspector.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum TransitionUpdate {
    Solo(bool),
    Mute(bool),
    HasExitTime(bool),
    IsFixedDuration(bool),
    Duration(f64),
    ExitTime(f64),
    Offset(f64),
}

/// A directed edge of the live state machine.
#[derive(Debug, Clone)]
pub struct Transition {
    id: TransitionId,
    source: StateId,
    destination: StateId,
    settings: TransitionSettings,
    conditions: Vec<Condition>,
}

impl Transition {
    /// Build a transition between two live states. Registration into the
    /// endpoints' indices is done by the graph.
    pub(crate) fn new(id: TransitionId, source: &State, destination: &State) -> Self {
        Self {
            id,
            source: source.id().clone(),
            destination: destination.id().clone(),
            settings: TransitionSettings::for_endpoints(source.kind(), destination.kind()),
            conditions: Vec::new(),
        }
    }

    pub fn id(&self) -> &TransitionId {
        &self.id
    }

    pub fn source(&self) -> &StateId {
        &self.source
    }

    pub fn destination(&self) -> &StateId {
        &self.destination
    }

    pub fn settings(&self) -> &TransitionSettings {
        &self.settings
    }

    pub fn conditions(&self) -> &[Condition] {
        &self.conditions
    }

    pub fn has_exit_time(&self) -> bool {
        self.settings.has_exit_time
    }

    pub fn duration(&self) -> f64 {
        self.settings.duration
    }

    /// Exportable form, stamped with the current endpoint ids.
    pub fn data(&self) -> TransitionData {
        TransitionData {
            id: self.id.clone(),
            source_state_id: self.source.clone(),
            destination_state_id: self.destination.clone(),
            solo: self.settings.solo,
            mute: self.settings.mute,
            has_exit_time: Some(self.settings.has_exit_time),
            is_fixed_duration: self.settings.is_fixed_duration,
            duration: Some(self.settings.duration),
            exit_time: self.settings.exit_time,
            offset: self.settings.offset,
            conditions: self.conditions.clone(),
        }
    }

    /// Copy persisted settings and conditions. Endpoints stay as constructed,
    /// and timing fields missing from `data` keep their construction values.
    pub(crate) fn load_settings(&mut self, data: &TransitionData) {
        self.settings = TransitionSettings {
            solo: data.solo,
            mute: data.mute,
            has_exit_time: data.has_exit_time.unwrap_or(self.settings.has_exit_time),
            is_fixed_duration: data.is_fixed_duration,
            duration: data.duration.unwrap_or(self.settings.duration),
            exit_time: data.exit_time,
            offset: data.offset,
        };
        self.conditions = data.conditions.clone();
    }

    pub(crate) fn set_destination(&mut self, destination: StateId) {
        self.destination = destination;
    }

    pub(crate) fn apply(&mut self, update: TransitionUpdate) {
        let settings = &mut self.settings;
        match update {
            TransitionUpdate::Solo(v) => settings.solo = v,
            TransitionUpdate::Mute(v) => settings.mute = v,
            TransitionUpdate::HasExitTime(v) => settings.has_exit_time = v,
            TransitionUpdate::IsFixedDuration(v) => settings.is_fixed_duration = v,
            TransitionUpdate::Duration(v) => settings.duration = v,
            TransitionUpdate::ExitTime(v) => settings.exit_time = v,
            TransitionUpdate::Offset(v) => settings.offset = v,
        }
    }

    pub(crate) fn add_condition(&mut self, parameter_name: &str) -> &Condition {
        self.conditions.push(Condition::new(parameter_name));
        &self.conditions[self.conditions.len() - 1]
    }

    pub(crate) fn remove_condition(&mut self, index: usize) -> Option<Condition> {
        if index < self.conditions.len() {
            Some(self.conditions.remove(index))
        } else {
            None
        }
    }

    pub(crate) fn update_condition(&mut self, index: usize, patch: ConditionPatch) -> bool {
        match self.conditions.get_mut(index) {
            Some(condition) => {
                condition.apply(patch);
                true
            }
            None => false,
        }
    }
}

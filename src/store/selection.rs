//! Selection
//!
//! At most one state or one transition is selected at a time; the enum makes
//! holding both unrepresentable.

use crate::graph::{StateId, TransitionId};

/// What the inspector is currently showing.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum Selection {
    #[default]
    None,
    State(StateId),
    Transition(TransitionId),
}

/// Kind of the current selection.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SelectType {
    #[default]
    Null,
    State,
    Transition,
}

impl Selection {
    pub fn select_type(&self) -> SelectType {
        match self {
            Selection::None => SelectType::Null,
            Selection::State(_) => SelectType::State,
            Selection::Transition(_) => SelectType::Transition,
        }
    }

    pub fn state_id(&self) -> Option<&StateId> {
        match self {
            Selection::State(id) => Some(id),
            _ => None,
        }
    }

    pub fn transition_id(&self) -> Option<&TransitionId> {
        match self {
            Selection::Transition(id) => Some(id),
            _ => None,
        }
    }

    pub fn is_none(&self) -> bool {
        matches!(self, Selection::None)
    }
}

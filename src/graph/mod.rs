//! Live State-Machine Graph
//!
//! The in-memory model of one layer's state machine while it is being edited:
//! - `State`: a node with content and adjacency indices
//! - `Transition`: a directed edge with timing settings and conditions
//! - `Condition`: a single parameter comparison gating a transition
//! - `StateMachineGraph`: the arena that owns them and keeps the indices honest

mod condition;
mod machine;
mod state;
mod transition;

use std::borrow::Borrow;
use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub use condition::{ComparisonMode, Condition, ConditionPatch, Threshold};
pub use machine::{RenameOutcome, StateMachineGraph};
pub use state::{ClipRef, State, StateContent, StateKind, StateUpdate, WrapMode};
pub use transition::{Transition, TransitionSettings, TransitionUpdate};

macro_rules! string_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            pub fn new(id: impl Into<String>) -> Self {
                Self(id.into())
            }

            /// Generate a fresh random id.
            pub fn generate() -> Self {
                Self(Uuid::new_v4().to_string())
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl Borrow<str> for $name {
            fn borrow(&self) -> &str {
                &self.0
            }
        }

        impl From<&str> for $name {
            fn from(id: &str) -> Self {
                Self(id.to_string())
            }
        }

        impl From<String> for $name {
            fn from(id: String) -> Self {
                Self(id)
            }
        }
    };
}

string_id!(
    /// Stable identifier of a state within a layer.
    StateId
);

string_id!(
    /// Stable identifier of a transition within a layer.
    TransitionId
);

/// Position of a node on the graph canvas.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Position {
    pub x: f64,
    pub y: f64,
}

impl Position {
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Offset this position by the same amount on both axes.
    pub fn staggered(self, amount: f64) -> Self {
        Self {
            x: self.x + amount,
            y: self.y + amount,
        }
    }
}

//! Transition Conditions
//!
//! A condition compares one controller parameter against a threshold. A
//! transition fires only when all of its conditions hold.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// How a parameter is compared against the threshold.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ComparisonMode {
    /// Boolean parameter is true (or trigger is set)
    If,
    /// Boolean parameter is false
    IfNot,
    #[default]
    Greater,
    Less,
    Equals,
    NotEqual,
}

impl ComparisonMode {
    /// True for modes that ignore the threshold.
    pub fn is_boolean(&self) -> bool {
        matches!(self, ComparisonMode::If | ComparisonMode::IfNot)
    }
}

/// Threshold a parameter is compared against.
///
/// Numbers are preferred; text that does not read as a number is kept as-is.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Threshold {
    Number(f64),
    Bool(bool),
    Text(String),
}

impl Default for Threshold {
    fn default() -> Self {
        Threshold::Number(0.0)
    }
}

impl Threshold {
    /// Convert numeric-looking text into a number, leaving anything else raw.
    pub fn coerce(self) -> Self {
        match self {
            Threshold::Text(text) => {
                let trimmed = text.trim();
                match trimmed.parse::<f64>() {
                    Ok(value) if !trimmed.is_empty() && value.is_finite() => {
                        Threshold::Number(value)
                    }
                    _ => Threshold::Text(text),
                }
            }
            other => other,
        }
    }

    pub fn as_number(&self) -> Option<f64> {
        match self {
            Threshold::Number(value) => Some(*value),
            _ => None,
        }
    }
}

impl From<f64> for Threshold {
    fn from(value: f64) -> Self {
        Threshold::Number(value)
    }
}

impl From<&str> for Threshold {
    fn from(value: &str) -> Self {
        Threshold::Text(value.to_string())
    }
}

/// A single parameter comparison gating a transition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Condition {
    pub id: String,
    pub parameter_name: String,
    pub comparison_mode: ComparisonMode,
    #[serde(default)]
    pub threshold: Threshold,
}

impl Condition {
    /// Create a condition on the given parameter with default mode and threshold.
    pub fn new(parameter_name: impl Into<String>) -> Self {
        Self {
            id: format!("condition_{}", Uuid::new_v4().simple()),
            parameter_name: parameter_name.into(),
            comparison_mode: ComparisonMode::default(),
            threshold: Threshold::default(),
        }
    }

    /// Apply a partial update. Thresholds go through numeric coercion.
    pub fn apply(&mut self, patch: ConditionPatch) {
        if let Some(name) = patch.parameter_name {
            self.parameter_name = name;
        }
        if let Some(mode) = patch.comparison_mode {
            self.comparison_mode = mode;
        }
        if let Some(threshold) = patch.threshold {
            self.threshold = threshold.coerce();
        }
    }
}

/// Partial update for a condition; `None` fields are left untouched.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ConditionPatch {
    pub parameter_name: Option<String>,
    pub comparison_mode: Option<ComparisonMode>,
    pub threshold: Option<Threshold>,
}

impl ConditionPatch {
    pub fn parameter(name: impl Into<String>) -> Self {
        Self {
            parameter_name: Some(name.into()),
            ..Self::default()
        }
    }

    pub fn mode(mode: ComparisonMode) -> Self {
        Self {
            comparison_mode: Some(mode),
            ..Self::default()
        }
    }

    pub fn threshold(threshold: impl Into<Threshold>) -> Self {
        Self {
            threshold: Some(threshold.into()),
            ..Self::default()
        }
    }
}

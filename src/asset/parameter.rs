//! Controller Parameters
//!
//! Named, typed values that transition conditions compare against.

use serde::{Deserialize, Serialize};

/// Value type of a parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ParameterType {
    Number,
    String,
    Boolean,
    Trigger,
}

impl ParameterType {
    /// Value a freshly added parameter of this type starts with.
    pub fn default_value(&self) -> ParameterValue {
        match self {
            ParameterType::Number => ParameterValue::Number(0.0),
            ParameterType::String => ParameterValue::Text(String::new()),
            ParameterType::Boolean | ParameterType::Trigger => ParameterValue::Bool(false),
        }
    }
}

impl std::fmt::Display for ParameterType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ParameterType::Number => write!(f, "Number"),
            ParameterType::String => write!(f, "String"),
            ParameterType::Boolean => write!(f, "Boolean"),
            ParameterType::Trigger => write!(f, "Trigger"),
        }
    }
}

/// Default value of a parameter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ParameterValue {
    Bool(bool),
    Number(f64),
    Text(String),
}

/// A controller parameter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Parameter {
    pub name: String,
    #[serde(rename = "type")]
    pub kind: ParameterType,
    pub default_value: ParameterValue,
    #[serde(default)]
    pub is_trigger: bool,
}

impl Parameter {
    pub fn new(name: impl Into<String>, kind: ParameterType) -> Self {
        Self {
            name: name.into(),
            kind,
            default_value: kind.default_value(),
            is_trigger: kind == ParameterType::Trigger,
        }
    }
}

/// Partial update for a parameter; `None` fields are left untouched.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ParameterPatch {
    pub name: Option<String>,
    pub kind: Option<ParameterType>,
    pub default_value: Option<ParameterValue>,
}

impl ParameterPatch {
    pub fn rename(name: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
            ..Self::default()
        }
    }

    pub fn default_value(value: ParameterValue) -> Self {
        Self {
            default_value: Some(value),
            ..Self::default()
        }
    }
}

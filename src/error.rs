//! Error handling for the animator editor
//!
//! Only caller-contract violations and boundary failures (I/O, serialization,
//! host write-back) are errors. Name collisions and lookups of unknown ids are
//! resolved or ignored by the store and never reach this type.

use std::path::PathBuf;

use thiserror::Error;

/// Result type alias for editor operations
pub type Result<T> = std::result::Result<T, EditorError>;

/// Which end of a transition an id refers to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Endpoint {
    Source,
    Destination,
}

impl std::fmt::Display for Endpoint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Endpoint::Source => write!(f, "source"),
            Endpoint::Destination => write!(f, "destination"),
        }
    }
}

/// Main error type for editor operations
#[derive(Error, Debug)]
pub enum EditorError {
    // Contract Violations
    #[error("Cannot create transition {transition_id}: {endpoint} state '{state_id}' not found")]
    MissingEndpoint {
        transition_id: String,
        endpoint: Endpoint,
        state_id: String,
    },

    #[error("Transition id already in use: {transition_id}")]
    DuplicateTransition { transition_id: String },

    #[error("Invalid transition {transition_id}: {reason}")]
    InvalidTransition {
        transition_id: String,
        reason: String,
    },

    // Host Errors
    #[error("Controller asset not found: {controller_id}")]
    ControllerNotFound { controller_id: String },

    #[error("Layer index {index} out of range (controller has {count} layers)")]
    LayerOutOfRange { index: usize, count: usize },

    #[error("Host rejected state machine write for {controller_id} layer {layer_index}: {reason}")]
    WriteBackRejected {
        controller_id: String,
        layer_index: usize,
        reason: String,
    },

    // File Errors
    #[error("Failed to read file: {path}: {source}")]
    FileReadError {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to write file: {path}: {source}")]
    FileWriteError {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid configuration: {reason}")]
    InvalidConfig { reason: String },

    // I/O Errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    // Serialization Errors
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl EditorError {
    /// Get the error code for this error type
    pub fn error_code(&self) -> &'static str {
        match self {
            EditorError::MissingEndpoint { .. } => "MISSING_ENDPOINT",
            EditorError::DuplicateTransition { .. } => "DUPLICATE_TRANSITION",
            EditorError::InvalidTransition { .. } => "INVALID_TRANSITION",
            EditorError::ControllerNotFound { .. } => "CONTROLLER_NOT_FOUND",
            EditorError::LayerOutOfRange { .. } => "LAYER_OUT_OF_RANGE",
            EditorError::WriteBackRejected { .. } => "WRITE_BACK_REJECTED",
            EditorError::FileReadError { .. } => "FILE_READ_ERROR",
            EditorError::FileWriteError { .. } => "FILE_WRITE_ERROR",
            EditorError::InvalidConfig { .. } => "INVALID_CONFIG",
            EditorError::Io(_) => "IO_ERROR",
            EditorError::Serialization(_) => "SERIALIZATION_ERROR",
        }
    }

    /// True for errors caused by a caller handing the graph inconsistent ids.
    ///
    /// These are bugs in the caller, not bad user input, and must not be
    /// swallowed by the store.
    pub fn is_contract_violation(&self) -> bool {
        matches!(
            self,
            EditorError::MissingEndpoint { .. }
                | EditorError::DuplicateTransition { .. }
                | EditorError::InvalidTransition { .. }
        )
    }

    /// Returns true if this error indicates the operation can be retried.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            EditorError::WriteBackRejected { .. } | EditorError::FileWriteError { .. }
        )
    }

    /// Returns a user-friendly recovery suggestion.
    pub fn recovery_suggestion(&self) -> Option<&'static str> {
        match self {
            EditorError::MissingEndpoint { .. } => {
                Some("Create both states before connecting them.")
            }
            EditorError::ControllerNotFound { .. } => {
                Some("Select an entity with an Animator, or create a new controller.")
            }
            EditorError::LayerOutOfRange { .. } => Some("Pick an existing layer index."),
            EditorError::WriteBackRejected { .. } => {
                Some("The pending edit is kept; it will be written on the next flush.")
            }
            EditorError::FileReadError { .. } => Some("Check the file path and try again."),
            _ => None,
        }
    }
}

//! Animator Editor - Editing Engine for Animation State Machines
//!
//! Keeps a live, editable graph of one animator controller layer in step with
//! the host that owns the asset and with a graph view that renders it.
//!
//! # Architecture
//!
//! - `graph`: the live states, transitions and conditions of one layer
//! - `asset`: persisted controller, layer and parameter shapes
//! - `store`: the orchestrator; lifecycle, selection, rebuild and debounced
//!   write-back
//! - `host`: traits the embedding application implements, plus an
//!   in-memory host
//! - `view`: the graph view seam and a headless implementation

pub mod asset;
pub mod cli;
pub mod config;
pub mod error;
pub mod graph;
pub mod host;
pub mod store;
pub mod view;

pub use config::EditorConfig;
pub use error::{EditorError, Result};
pub use store::{AnimatorControllerStore, EditorState};

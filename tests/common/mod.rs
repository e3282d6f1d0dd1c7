//! Shared fixtures for integration tests.

#![allow(dead_code)]

use std::time::{Duration, Instant};

use animator_editor::asset::{ControllerAsset, StateData, StateMachineData, TransitionData};
use animator_editor::config::EditorConfig;
use animator_editor::host::MemoryHost;
use animator_editor::store::{AnimatorControllerStore, EditorState};
use animator_editor::view::HeadlessGraphView;

pub type TestStore = AnimatorControllerStore<MemoryHost, HeadlessGraphView>;

pub const CONTROLLER_ID: &str = "ctrl";

/// Comfortably past both the activation delay and the debounce window.
pub fn later() -> Instant {
    Instant::now() + Duration::from_secs(5)
}

pub fn config() -> EditorConfig {
    EditorConfig::default()
        .with_activation_delay_ms(100)
        .with_persist_debounce_ms(1000)
}

pub fn state(id: &str, name: &str) -> StateData {
    serde_json::from_value(serde_json::json!({ "id": id, "name": name })).unwrap()
}

pub fn transition(id: &str, source: &str, destination: &str) -> TransitionData {
    serde_json::from_value(serde_json::json!({
        "id": id,
        "sourceStateId": source,
        "destinationStateId": destination,
    }))
    .unwrap()
}

/// Controller whose first layer holds Idle -> Walk and entry -> Idle, flagged
/// as authoritative.
pub fn authored_asset() -> ControllerAsset {
    let mut asset = ControllerAsset::new(CONTROLLER_ID, "Hero");
    asset.layers[0].state_machine = StateMachineData {
        states: vec![state("idle", "Idle"), state("walk", "Walk")],
        transitions: vec![transition("t-walk", "idle", "walk")],
        entry_transitions: vec![transition("t-entry", "entry", "idle")],
        any_transitions: Vec::new(),
    };
    asset.internal_data_updated = true;
    asset
}

/// Store editing `asset`, activated and with the activation write cleared.
pub fn editable_store(asset: ControllerAsset) -> TestStore {
    let id = asset.id.clone();
    let mut store = AnimatorControllerStore::new(
        MemoryHost::with_asset(asset),
        HeadlessGraphView::new(),
        config(),
    );
    store.select_controller(&id);
    assert_eq!(store.editor_state(), EditorState::Loading);
    let report = store.tick(later());
    assert!(report.activated);
    assert_eq!(store.editor_state(), EditorState::Editable);
    store.host_mut().clear_writes();
    store
}

/// Store editing an empty controller.
pub fn bare_store() -> TestStore {
    editable_store(ControllerAsset::new(CONTROLLER_ID, "Hero"))
}

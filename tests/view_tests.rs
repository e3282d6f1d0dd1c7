//! View Tests
//!
//! Gestures on the headless graph view flowing back into the store as
//! intents.

mod common;

use std::time::Instant;

use pretty_assertions::assert_eq;

use animator_editor::graph::{Position, StateId, TransitionId};
use animator_editor::store::SelectType;
use animator_editor::view::{ConnectionRejected, ContextTarget, GraphIntent, PortGroup};

use common::{authored_asset, editable_store};

#[test]
fn test_click_selects_through_tick() {
    let mut store = editable_store(authored_asset());
    store.view_mut().click_node("idle");

    let report = store.tick(Instant::now());
    assert_eq!(report.intents, 1);
    assert_eq!(store.selected_state().unwrap().name(), "Idle");

    store.view_mut().click_edge("t-walk");
    store.tick(Instant::now());
    assert_eq!(store.current_select_type(), SelectType::Transition);

    store.view_mut().click_blank();
    store.tick(Instant::now());
    assert!(store.selection().is_none());
}

#[test]
fn test_drag_persists_on_release() {
    let mut store = editable_store(authored_asset());
    store.view_mut().drag_node("walk", Position::new(300.0, 300.0));
    store.tick(Instant::now());
    assert_eq!(
        store.graph().state("walk").unwrap().position(),
        Position::new(400.0 + 24.0, 50.0 + 24.0)
    );

    store.view_mut().release_node("walk");
    store.tick(Instant::now());
    assert_eq!(
        store.graph().state("walk").unwrap().position(),
        Position::new(300.0, 300.0)
    );
    assert!(store.has_pending_write());
}

#[test]
fn test_connect_creates_transition() {
    let mut store = editable_store(authored_asset());
    let id = store.view_mut().connect("walk", "idle").unwrap();
    store.tick(Instant::now());

    let transition = store.graph().transition(id.as_str()).unwrap();
    assert_eq!(transition.source().as_str(), "walk");
    assert_eq!(transition.destination().as_str(), "idle");
    assert!(store.view().edge(id.as_str()).is_some());
}

#[test]
fn test_view_rejects_invalid_connections() {
    let mut store = editable_store(authored_asset());
    let entry = store.graph().entry().unwrap().to_string();
    let exit = store.graph().exit().unwrap().to_string();

    let view = store.view_mut();
    assert_eq!(
        view.connect("idle", &entry),
        Err(ConnectionRejected::NotInbound(entry.clone()))
    );
    assert_eq!(
        view.connect(&exit, "idle"),
        Err(ConnectionRejected::InboundOnly(exit.clone()))
    );
    assert!(matches!(
        view.connect("idle", "walk"),
        Err(ConnectionRejected::Duplicate { .. })
    ));
    assert_eq!(
        view.finish_connection("idle", PortGroup::In),
        Err(ConnectionRejected::NoPendingConnection)
    );
    assert!(view.pending_intents().is_empty());
}

#[test]
fn test_delete_selection() {
    let mut store = editable_store(authored_asset());
    store.view_mut().select_node("walk", false);
    store.view_mut().delete_selection();
    store.tick(Instant::now());

    assert!(store.graph().state("walk").is_none());
    assert!(store.graph().transition("t-walk").is_none());
    assert_eq!(store.view().edge_count(), 1);
}

#[test]
fn test_retarget_edge() {
    let mut store = editable_store(authored_asset());
    let exit = store.graph().exit().unwrap().to_string();
    store.view_mut().retarget_edge("t-walk", &exit).unwrap();
    store.tick(Instant::now());

    let transition = store.graph().transition("t-walk").unwrap();
    assert_eq!(transition.destination().as_str(), exit);
}

#[test]
fn test_bad_intent_is_reported_and_leaves_graph() {
    let mut store = editable_store(authored_asset());
    let before = store.graph().export();

    let result = store.apply_intent(GraphIntent::TransitionConnected {
        id: TransitionId::new("t-bad"),
        source: StateId::new("idle"),
        destination: StateId::new("ghost"),
    });

    assert!(result.unwrap_err().is_contract_violation());
    assert_eq!(store.graph().export(), before);
}

#[test]
fn test_context_menu_round_trip() {
    let mut store = editable_store(authored_asset());
    store
        .view_mut()
        .open_context_menu(ContextTarget::State(StateId::new("idle")), Position::new(5.0, 6.0));
    store.tick(Instant::now());

    let info = store.context_menu_info().unwrap();
    assert_eq!(info.target, ContextTarget::State(StateId::new("idle")));

    store.view_mut().click_blank();
    store.tick(Instant::now());
    assert!(store.context_menu_info().is_none());
}

#[test]
fn test_exported_layout_matches_graph() {
    let store = editable_store(authored_asset());
    let layout = store
        .editing_controller()
        .unwrap()
        .layers[0]
        .visual_layout_cache
        .clone()
        .unwrap();

    assert_eq!(layout.nodes().count(), store.graph().state_count());
    assert_eq!(layout.edges().count(), store.graph().transition_count());
    let edge = layout.edges().find(|e| e.id.as_str() == "t-walk").unwrap();
    assert_eq!(edge.source.port, PortGroup::Out);
    assert_eq!(edge.target.port, PortGroup::In);
}

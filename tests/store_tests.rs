//! Store Tests
//!
//! Editing operations, rebuild and debounced write-back of the
//! animator controller store.

mod common;

use std::cell::RefCell;
use std::rc::Rc;
use std::time::Instant;

use approx::assert_relative_eq;
use pretty_assertions::assert_eq;

use animator_editor::asset::{ParameterPatch, ParameterType, StateMachineData};
use animator_editor::graph::{
    ComparisonMode, ConditionPatch, Position, StateId, StateKind, StateUpdate, Threshold,
    TransitionUpdate,
};
use animator_editor::host::AssetStore;
use animator_editor::store::{SelectType, Selection, ValidationNotice};

use common::{authored_asset, bare_store, editable_store, later, transition, CONTROLLER_ID};

fn layer_data(store: &common::TestStore, layer: usize) -> StateMachineData {
    store
        .host()
        .controller_asset(CONTROLLER_ID)
        .unwrap()
        .layers[layer]
        .state_machine
        .clone()
}

// === Rebuild ===

#[test]
fn test_bare_layer_has_only_pseudo_states() {
    let store = bare_store();
    let graph = store.graph();
    assert_eq!(graph.state_count(), 3);
    assert_eq!(graph.transition_count(), 0);
    assert!(graph.entry().is_some());
    assert!(graph.exit().is_some());
    assert!(graph.any_state().is_some());
    assert_eq!(store.view().node_count(), 3);
}

#[test]
fn test_activation_writes_once_and_clears_flag() {
    let mut store = common::TestStore::new(
        animator_editor::host::MemoryHost::with_asset(authored_asset()),
        animator_editor::view::HeadlessGraphView::new(),
        common::config(),
    );
    store.select_controller(CONTROLLER_ID);
    store.tick(later());

    assert_eq!(store.host().write_count(), 1);
    let controller = store.editing_controller().unwrap();
    assert!(!controller.internal_data_updated);
    assert!(controller.layers[0].visual_layout_cache.is_some());
}

#[test]
fn test_rebuild_from_data() {
    let store = editable_store(authored_asset());
    let graph = store.graph();

    assert_eq!(graph.state_count(), 5);
    assert_eq!(graph.transition_count(), 2);
    let idle = graph.state_by_name("Idle").unwrap();
    assert_eq!(idle.id().as_str(), "idle");
    assert_eq!(idle.incoming().count(), 1);
    assert_eq!(idle.outgoing().count(), 1);

    let entry = graph.transition("t-entry").unwrap();
    assert_eq!(entry.source(), graph.entry().unwrap());
}

#[test]
fn test_rebuild_drops_dangling_transition() {
    let mut asset = authored_asset();
    asset.layers[0]
        .state_machine
        .transitions
        .push(transition("t-ghost", "idle", "ghost"));

    let store = editable_store(asset);
    assert!(store.graph().transition("t-ghost").is_none());
    assert_eq!(store.graph().transition_count(), 2);
}

#[test]
fn test_export_then_rebuild_is_isomorphic() {
    let mut store = editable_store(authored_asset());
    let idle = store.graph().state_by_name("Idle").unwrap().id().clone();
    store.move_state(idle.as_str(), Position::new(10.0, 20.0));
    store.select_transition("t-walk");
    store.update_transition_data(TransitionUpdate::Duration(0.5));
    store.flush().unwrap();

    let before = store.graph().export();
    store.add_layer().unwrap();
    assert!(store.select_layer(1).unwrap());
    assert!(store.select_layer(0).unwrap());

    assert_eq!(store.graph().export(), before);
    let moved = store.graph().state(idle.as_str()).unwrap().position();
    assert_relative_eq!(moved.x, 10.0);
    assert_relative_eq!(moved.y, 20.0);
}

#[test]
fn test_export_then_rebuild_from_data_is_isomorphic() {
    let mut store = bare_store();
    store.set_visibility(true);
    store.add_parameter(ParameterType::Number, Some("speed"), None).unwrap();
    let idle = store.add_state(Some("Idle"), None, StateKind::Normal);
    let walk = store.add_state(Some("Walk"), None, StateKind::Normal);
    let entry = store.graph().entry().unwrap().clone();
    let exit = store.graph().exit().unwrap().clone();
    let any = store.graph().any_state().unwrap().clone();

    let step = store.add_transition(None, idle.as_str(), walk.as_str()).unwrap();
    store.add_transition(None, walk.as_str(), exit.as_str()).unwrap();
    store.add_transition(None, entry.as_str(), idle.as_str()).unwrap();
    store.add_transition(None, any.as_str(), walk.as_str()).unwrap();
    store.select_transition(step.as_str());
    store.add_condition().unwrap();
    store.update_condition_data(0, ConditionPatch::threshold("0.5"));
    store.flush().unwrap();
    let before = store.graph().export();
    assert_eq!(before.transitions.len(), 2);
    assert_eq!(before.entry_transitions.len(), 1);
    assert_eq!(before.any_transitions.len(), 1);

    let controller = store.host_mut().controller_asset_mut(CONTROLLER_ID).unwrap();
    controller.layers[0].visual_layout_cache = None;
    store.host_mut().mark_data_changed(CONTROLLER_ID);
    let report = store.tick(Instant::now());
    assert_eq!(report.host_events, 1);

    assert!(!store.editing_controller().unwrap().internal_data_updated);
    assert_eq!(store.graph().export(), before);
    let restored = store.graph().transition(step.as_str()).unwrap();
    assert_eq!(restored.conditions()[0].parameter_name, "speed");
    assert_eq!(restored.conditions()[0].threshold, Threshold::Number(0.5));
}

#[test]
fn test_sparse_pseudo_transitions_keep_timing_rules() {
    let mut asset = authored_asset();
    asset.layers[0]
        .state_machine
        .any_transitions
        .push(transition("t-any", "any", "walk"));
    asset.layers[0]
        .state_machine
        .transitions
        .push(transition("t-leave", "walk", "exit"));

    let store = editable_store(asset);
    let graph = store.graph();
    let entry = graph.transition("t-entry").unwrap();
    assert_relative_eq!(entry.duration(), 0.0);
    assert!(!entry.has_exit_time());
    assert!(!graph.transition("t-any").unwrap().has_exit_time());
    assert!(!graph.transition("t-leave").unwrap().has_exit_time());
    assert!(graph.transition("t-walk").unwrap().has_exit_time());
}

// === States ===

#[test]
fn test_duplicate_names_are_suffixed() {
    let mut store = bare_store();
    store.add_state(Some("Idle"), None, StateKind::Normal);
    let second = store.add_state(Some("Idle"), None, StateKind::Normal);
    assert_eq!(store.graph().state(second.as_str()).unwrap().name(), "Idle1");

    store.select_state(second.as_str());
    let notice = store.update_state_data(StateUpdate::Name("Idle".to_string()));
    assert_eq!(
        notice,
        Some(ValidationNotice::StateNameCollision {
            requested: "Idle".to_string(),
            resolved: "Idle1".to_string(),
        })
    );
    assert_eq!(store.take_notices().len(), 1);
    assert!(store.notices().is_empty());
}

#[test]
fn test_unnamed_state_uses_default_name() {
    let mut store = bare_store();
    let first = store.add_state(None, None, StateKind::Normal);
    let second = store.add_state(Some("  "), None, StateKind::Normal);
    assert_eq!(store.graph().state(first.as_str()).unwrap().name(), "New State");
    assert_eq!(store.graph().state(second.as_str()).unwrap().name(), "New State1");
}

#[test]
fn test_second_pseudo_state_is_not_created() {
    let mut store = bare_store();
    let entry = store.graph().entry().unwrap().clone();
    let id = store.add_state(Some("Entry"), None, StateKind::Entry);
    assert_eq!(id, entry);
    assert_eq!(store.graph().state_count(), 3);
}

#[test]
fn test_delete_state_removes_its_transitions() {
    let mut store = bare_store();
    let idle = store.add_state(Some("Idle"), None, StateKind::Normal);
    let walk = store.add_state(Some("Walk"), None, StateKind::Normal);
    store.add_transition(None, idle.as_str(), walk.as_str()).unwrap();
    store.select_state(idle.as_str());

    store.delete_states(&[idle.clone()]);

    assert_eq!(store.graph().normal_states().count(), 1);
    assert_eq!(store.graph().transition_count(), 0);
    assert_eq!(store.graph().state(walk.as_str()).unwrap().incoming().count(), 0);
    assert!(store.view().node(idle.as_str()).is_none());
    assert_eq!(store.current_select_type(), SelectType::Null);
}

#[test]
fn test_delete_pseudo_state_is_ignored() {
    let mut store = bare_store();
    let exit = store.graph().exit().unwrap().clone();
    store.delete_states(&[exit, StateId::new("nope")]);
    assert_eq!(store.graph().state_count(), 3);
}

#[test]
fn test_state_scripts() {
    let mut store = bare_store();
    let idle = store.add_state(Some("Idle"), None, StateKind::Normal);
    store.select_state(idle.as_str());

    store.add_state_machine_script("footsteps");
    store.add_state_machine_script("dust");
    store.update_state_machine_script(1, "sparks");
    store.remove_state_machine_script(0);

    let state = store.selected_state().unwrap();
    assert_eq!(state.content().scripts, vec!["sparks".to_string()]);
}

// === Transitions ===

#[test]
fn test_entry_transition_defaults() {
    let mut store = bare_store();
    let idle = store.add_state(Some("Idle"), None, StateKind::Normal);
    let entry = store.graph().entry().unwrap().clone();

    let id = store.add_transition(None, entry.as_str(), idle.as_str()).unwrap();
    let transition = store.graph().transition(id.as_str()).unwrap();
    assert_relative_eq!(transition.duration(), 0.0);
    assert!(!transition.has_exit_time());

    let data = store.graph().export();
    assert_eq!(data.entry_transitions.len(), 1);
    assert!(data.transitions.is_empty());
}

#[test]
fn test_ordinary_transition_defaults() {
    let mut store = bare_store();
    let idle = store.add_state(Some("Idle"), None, StateKind::Normal);
    let walk = store.add_state(Some("Walk"), None, StateKind::Normal);

    let id = store.add_transition(None, idle.as_str(), walk.as_str()).unwrap();
    let transition = store.graph().transition(id.as_str()).unwrap();
    assert_relative_eq!(transition.duration(), 0.25);
    assert!(transition.has_exit_time());
}

#[test]
fn test_unknown_destination_is_an_error() {
    let mut store = bare_store();
    let idle = store.add_state(Some("Idle"), None, StateKind::Normal);
    let before = store.graph().export();

    let err = store.add_transition(None, idle.as_str(), "ghost").unwrap_err();
    assert!(err.is_contract_violation());
    assert_eq!(err.error_code(), "MISSING_ENDPOINT");
    assert_eq!(store.graph().export(), before);
    assert_eq!(store.view().edge_count(), 0);
}

#[test]
fn test_transition_into_entry_is_rejected() {
    let mut store = bare_store();
    let idle = store.add_state(Some("Idle"), None, StateKind::Normal);
    let entry = store.graph().entry().unwrap().clone();

    let err = store.add_transition(None, idle.as_str(), entry.as_str()).unwrap_err();
    assert_eq!(err.error_code(), "INVALID_TRANSITION");
}

#[test]
fn test_retarget_transition() {
    let mut store = bare_store();
    let idle = store.add_state(Some("Idle"), None, StateKind::Normal);
    let walk = store.add_state(Some("Walk"), None, StateKind::Normal);
    let run = store.add_state(Some("Run"), None, StateKind::Normal);
    let id = store.add_transition(None, idle.as_str(), walk.as_str()).unwrap();

    store.retarget_transition(id.as_str(), run.as_str());

    let graph = store.graph();
    assert_eq!(graph.transition(id.as_str()).unwrap().destination(), &run);
    assert_eq!(graph.state(walk.as_str()).unwrap().incoming().count(), 0);
    assert_eq!(graph.state(run.as_str()).unwrap().incoming().count(), 1);
    assert_eq!(store.view().edge(id.as_str()).unwrap().target, run);
}

#[test]
fn test_transition_settings_and_conditions() {
    let mut store = editable_store(authored_asset());
    store
        .host_mut()
        .controller_asset_mut(CONTROLLER_ID)
        .unwrap()
        .add_parameter(ParameterType::Number, Some("speed"), None);

    store.select_transition("t-walk");
    store.update_transition_data(TransitionUpdate::HasExitTime(false));
    let condition = store.add_condition().unwrap();
    store.update_condition_data(0, ConditionPatch::mode(ComparisonMode::Less));
    store.update_condition_data(0, ConditionPatch::threshold("0.5"));

    let transition = store.selected_transition().unwrap();
    assert!(!transition.has_exit_time());
    let added = &transition.conditions()[0];
    assert_eq!(added.id, condition);
    assert_eq!(added.parameter_name, "speed");
    assert_eq!(added.comparison_mode, ComparisonMode::Less);
    assert_eq!(added.threshold, Threshold::Number(0.5));

    store.remove_condition(0);
    assert!(store.selected_transition().unwrap().conditions().is_empty());
}

#[test]
fn test_condition_without_parameters_uses_empty_name() {
    let mut store = editable_store(authored_asset());
    store.select_transition("t-walk");
    store.add_condition().unwrap();
    assert_eq!(store.selected_transition().unwrap().conditions()[0].parameter_name, "");
}

// === Selection ===

#[test]
fn test_selection_is_exclusive() {
    let mut store = editable_store(authored_asset());
    store.select_state("idle");
    assert_eq!(store.current_select_type(), SelectType::State);

    store.select_transition("t-walk");
    assert_eq!(store.selection(), &Selection::Transition("t-walk".into()));
    assert!(store.selected_state().is_none());

    let entry = store.graph().entry().unwrap().clone();
    store.select_state(entry.as_str());
    assert_eq!(store.current_select_type(), SelectType::Transition);

    store.clear_select();
    assert!(store.selection().is_none());
}

#[test]
fn test_selection_reasserts_host_asset() {
    let mut store = editable_store(authored_asset());
    store.select_state("idle");
    assert_eq!(
        animator_editor::host::SceneHost::selected_asset_id(store.host()),
        Some(CONTROLLER_ID)
    );
}

// === Layers & Parameters ===

#[test]
fn test_layer_switch_flushes_first() {
    let mut store = bare_store();
    store.add_state(Some("Idle"), None, StateKind::Normal);
    store.add_layer().unwrap();
    assert!(store.select_layer(1).unwrap());

    let writes = store.host().writes();
    assert_eq!(writes.len(), 2);
    assert_eq!(writes[0].layer_index, 0);
    assert_eq!(writes[0].state_count, 1);
    assert_eq!(writes[1].layer_index, 1);
    assert_eq!(store.current_layer_index(), 1);
    assert_eq!(store.graph().normal_states().count(), 0);
    assert!(layer_data(&store, 0).state_by_name("Idle").is_some());
}

#[test]
fn test_select_missing_layer_is_ignored() {
    let mut store = bare_store();
    assert!(!store.select_layer(4).unwrap());
    assert_eq!(store.current_layer_index(), 0);
}

#[test]
fn test_failed_flush_keeps_current_layer() {
    let mut store = bare_store();
    store.add_layer().unwrap();
    store.add_state(Some("Idle"), None, StateKind::Normal);
    store.host_mut().set_fail_writes(true);

    let err = store.select_layer(1).unwrap_err();
    assert!(err.is_retryable());
    assert_eq!(store.current_layer_index(), 0);
    assert!(store.has_pending_write());
    assert!(store.graph().state_by_name("Idle").is_some());

    let err = store.remove_layer(1).unwrap_err();
    assert!(err.is_retryable());
    assert_eq!(store.editing_controller().unwrap().layers.len(), 2);

    store.host_mut().set_fail_writes(false);
    assert!(store.select_layer(1).unwrap());
    assert!(layer_data(&store, 0).state_by_name("Idle").is_some());

    assert!(store.select_layer(0).unwrap());
    assert!(store.graph().state_by_name("Idle").is_some());
}

#[test]
fn test_remove_layer() {
    let mut store = bare_store();
    assert!(!store.remove_layer(0).unwrap());

    store.add_layer().unwrap();
    assert!(store.select_layer(1).unwrap());
    assert!(store.remove_layer(1).unwrap());
    assert_eq!(store.current_layer_index(), 0);
    assert_eq!(store.editing_controller().unwrap().layers.len(), 1);
}

#[test]
fn test_parameters() {
    let mut store = bare_store();
    let first = store.add_parameter(ParameterType::Boolean, None, None).unwrap();
    let second = store.add_parameter(ParameterType::Boolean, None, None).unwrap();
    assert_eq!(first, "New Parameter");
    assert_eq!(second, "New Parameter1");

    let notice = store.update_parameter_data(1, ParameterPatch::rename("New Parameter"));
    assert!(matches!(
        notice,
        Some(ValidationNotice::ParameterNameCollision { .. })
    ));

    assert!(store.remove_parameter(0).is_some());
    assert_eq!(store.editing_controller().unwrap().parameters.len(), 1);
    assert!(!store.has_pending_write());
}

// === Persistence ===

#[test]
fn test_rapid_mutations_collapse_into_one_write() {
    let mut store = bare_store();
    for _ in 0..10 {
        store.add_state(Some("Walk"), None, StateKind::Normal);
    }

    let early = store.tick(Instant::now());
    assert!(!early.wrote);
    assert_eq!(store.host().write_count(), 0);

    let report = store.tick(later());
    assert!(report.wrote);
    assert_eq!(store.host().write_count(), 1);
    assert_eq!(store.host().writes()[0].state_count, 10);
    assert_eq!(layer_data(&store, 0).states.len(), 10);
}

#[test]
fn test_unchanged_snapshot_is_not_rewritten() {
    let mut store = bare_store();
    store.add_state(Some("Idle"), None, StateKind::Normal);
    assert!(store.flush().unwrap());
    assert!(!store.flush().unwrap());
    assert_eq!(store.host().write_count(), 1);
    assert!(store.writer().skipped_count() >= 1);
}

#[test]
fn test_failed_write_is_retried() {
    let mut store = bare_store();
    store.host_mut().set_fail_writes(true);
    store.add_state(Some("Idle"), None, StateKind::Normal);

    let report = store.tick(later());
    assert_eq!(report.errors.len(), 1);
    assert!(report.errors[0].is_retryable());
    assert!(store.has_pending_write());

    store.host_mut().set_fail_writes(false);
    let report = store.tick(later());
    assert!(report.wrote);
    assert_eq!(store.host().write_count(), 1);
}

// === Subscriptions ===

#[test]
fn test_subscription_fires_on_selection_change() {
    let mut store = editable_store(authored_asset());
    let seen = Rc::new(RefCell::new(Vec::new()));
    let sink = Rc::clone(&seen);
    let id = store.subscribe(
        |snapshot| snapshot.selection.select_type(),
        move |kind: &SelectType| sink.borrow_mut().push(*kind),
    );

    store.select_state("idle");
    store.select_state("idle");
    store.select_transition("t-walk");
    store.move_state("walk", Position::new(1.0, 1.0));
    assert!(store.unsubscribe(id));
    store.clear_select();

    assert_eq!(*seen.borrow(), vec![SelectType::State, SelectType::Transition]);
}

#[test]
fn test_subscription_tracks_state_count() {
    let mut store = bare_store();
    let counts = Rc::new(RefCell::new(Vec::new()));
    let sink = Rc::clone(&counts);
    store.subscribe(
        |snapshot| snapshot.state_count,
        move |count: &usize| sink.borrow_mut().push(*count),
    );

    let idle = store.add_state(Some("Idle"), None, StateKind::Normal);
    store.delete_states(&[idle]);

    assert_eq!(*counts.borrow(), vec![4, 3]);
}

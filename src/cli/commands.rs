//! CLI Command Implementations
//!
//! Each command loads a controller file into an in-memory host, drives a
//! store through activation exactly as an editor panel would, applies its
//! edit and saves what the host received.

use std::path::Path;
use std::time::Instant;

use anyhow::{bail, Context, Result};
use log::{info, warn};

use crate::asset::{ControllerAsset, LayerData};
use crate::config::EditorConfig;
use crate::graph::{StateId, StateKind};
use crate::host::{AssetStore, MemoryHost};
use crate::store::{AnimatorControllerStore, EditorState};
use crate::view::HeadlessGraphView;

type CliStore = AnimatorControllerStore<MemoryHost, HeadlessGraphView>;

/// Resolve the editor configuration from an optional file and CLI overrides.
pub fn load_config(path: Option<&Path>, debounce_ms: Option<u64>) -> Result<EditorConfig> {
    let mut config = match path {
        Some(path) => EditorConfig::load(path)
            .with_context(|| format!("Failed to load config {}", path.display()))?,
        None => EditorConfig::default(),
    };
    if let Some(ms) = debounce_ms {
        config = config.with_persist_debounce_ms(ms);
    }
    Ok(config)
}

/// Print a summary of one layer.
pub fn inspect(path: &Path, layer: usize, config: &EditorConfig) -> Result<()> {
    info!("Inspecting: {} (layer {})", path.display(), layer);

    let asset = load_asset(path)?;
    let store = open_store(asset, layer, config)?;
    let Some(controller) = store.editing_controller() else {
        bail!("Controller disappeared while loading {}", path.display());
    };

    println!("Controller: {} ({})", controller.name, controller.id);
    for (index, data) in controller.layers.iter().enumerate() {
        let marker = if index == layer { "*" } else { " " };
        println!("{} [{}] {} (weight {})", marker, index, data.name, data.weight);
    }

    println!("Parameters: {}", controller.parameters.len());
    for parameter in &controller.parameters {
        println!("  {} : {}", parameter.name, parameter.kind);
    }

    let graph = store.graph();
    println!("States: {}", graph.state_count());
    for state in graph.states() {
        let position = state.position();
        println!(
            "  {} [{:?}] at ({:.0}, {:.0})",
            state.name(),
            state.kind(),
            position.x,
            position.y
        );
    }

    println!("Transitions: {}", graph.transition_count());
    for transition in graph.transitions() {
        let name_of = |id: &StateId| {
            graph
                .state(id.as_str())
                .map_or_else(|| id.to_string(), |s| s.name().to_string())
        };
        println!(
            "  {} -> {} (duration {}, exit time {}, {} conditions)",
            name_of(transition.source()),
            name_of(transition.destination()),
            transition.duration(),
            transition.has_exit_time(),
            transition.conditions().len()
        );
    }

    Ok(())
}

/// Rebuild a layer and save the normalized asset.
pub fn rebuild(path: &Path, layer: usize, output: Option<&Path>, config: &EditorConfig) -> Result<()> {
    info!("Rebuilding: {} (layer {})", path.display(), layer);

    let asset = load_asset(path)?;
    let mut store = open_store(asset, layer, config)?;
    let target = save_result(&mut store, path, output)?;

    println!(
        "Rebuilt layer {}: {} states, {} transitions",
        layer,
        store.graph().state_count(),
        store.graph().transition_count()
    );
    println!("Saved: {}", target.display());
    Ok(())
}

/// Add a normal state to a layer.
pub fn add_state(
    path: &Path,
    name: &str,
    layer: usize,
    output: Option<&Path>,
    config: &EditorConfig,
) -> Result<()> {
    info!("Adding state '{}' to {} (layer {})", name, path.display(), layer);

    let asset = load_asset(path)?;
    let mut store = open_store(asset, layer, config)?;
    let id = store.add_state(Some(name), None, StateKind::Normal);
    let final_name = store
        .graph()
        .state(id.as_str())
        .map(|s| s.name().to_string())
        .unwrap_or_default();
    if final_name != name {
        warn!("State name '{}' was taken, using '{}'", name, final_name);
    }
    let target = save_result(&mut store, path, output)?;

    println!("Added state: {} ({})", final_name, id);
    println!("Saved: {}", target.display());
    Ok(())
}

/// Connect two states by name.
pub fn add_transition(
    path: &Path,
    from: &str,
    to: &str,
    layer: usize,
    output: Option<&Path>,
    config: &EditorConfig,
) -> Result<()> {
    info!("Adding transition {} -> {} to {}", from, to, path.display());

    let asset = load_asset(path)?;
    let mut store = open_store(asset, layer, config)?;
    let source = resolve_state(&store, from)?;
    let destination = resolve_state(&store, to)?;
    let id = store
        .add_transition(None, source.as_str(), destination.as_str())
        .with_context(|| format!("Cannot connect '{}' to '{}'", from, to))?;
    let target = save_result(&mut store, path, output)?;

    println!("Added transition: {} -> {} ({})", from, to, id);
    println!("Saved: {}", target.display());
    Ok(())
}

/// Remove a normal state and every transition touching it.
pub fn remove_state(
    path: &Path,
    name: &str,
    layer: usize,
    output: Option<&Path>,
    config: &EditorConfig,
) -> Result<()> {
    info!("Removing state '{}' from {} (layer {})", name, path.display(), layer);

    let asset = load_asset(path)?;
    let mut store = open_store(asset, layer, config)?;
    let id = resolve_state(&store, name)?;
    if store.graph().state(id.as_str()).is_some_and(|s| s.is_pseudo()) {
        bail!("'{}' is a pseudo-state and cannot be removed", name);
    }

    let before = store.graph().transition_count();
    store.delete_states(&[id]);
    let dropped = before - store.graph().transition_count();
    let target = save_result(&mut store, path, output)?;

    println!("Removed state: {} ({} transitions dropped)", name, dropped);
    println!("Saved: {}", target.display());
    Ok(())
}

/// Rebuild every layer and report persisted transitions that do not survive.
///
/// Returns the number of problems found.
pub fn validate(path: &Path, config: &EditorConfig) -> Result<usize> {
    info!("Validating: {}", path.display());

    let asset = load_asset(path)?;
    let mut problems = 0;
    for (index, data) in asset.layers.iter().enumerate() {
        let expected = persisted_transition_count(data, asset.internal_data_updated);
        let store = open_store(asset.clone(), index, config)?;
        let rebuilt = store.graph().transition_count();

        if rebuilt == expected {
            println!("[{}] {}: ok ({} transitions)", index, data.name, rebuilt);
        } else {
            problems += expected.saturating_sub(rebuilt);
            println!(
                "[{}] {}: {} of {} transitions dropped",
                index,
                data.name,
                expected.saturating_sub(rebuilt),
                expected
            );
        }
    }

    if problems == 0 {
        println!("Valid: {}", path.display());
    } else {
        println!("Invalid: {} ({} problems)", path.display(), problems);
    }
    Ok(problems)
}

// ========== Helpers ==========

fn load_asset(path: &Path) -> Result<ControllerAsset> {
    ControllerAsset::load(path).with_context(|| format!("Failed to load controller {}", path.display()))
}

/// Bind the asset, wait out the activation delay and switch to `layer`.
fn open_store(asset: ControllerAsset, layer: usize, config: &EditorConfig) -> Result<CliStore> {
    let id = asset.id.clone();
    let authoritative = asset.internal_data_updated;
    let host = MemoryHost::with_asset(asset);
    let mut store = AnimatorControllerStore::new(host, HeadlessGraphView::new(), config.clone());

    store.select_controller(&id);
    store.tick(Instant::now() + config.activation_delay());
    if store.editor_state() != EditorState::Editable {
        bail!("Controller '{}' could not be activated ({:?})", id, store.editor_state());
    }

    if layer != 0 {
        // Activation consumed the flag on layer 0; the file's data stays
        // authoritative for the requested layer too.
        if authoritative {
            if let Some(controller) = store.host_mut().controller_asset_mut(&id) {
                controller.internal_data_updated = true;
            }
        }
        let switched = store
            .select_layer(layer)
            .context("Failed to write back layer 0 before switching")?;
        if !switched {
            bail!("Layer {} does not exist in '{}'", layer, id);
        }
    }
    Ok(store)
}

/// Flush pending edits and save the host's copy of the controller.
fn save_result<'a>(store: &mut CliStore, input: &'a Path, output: Option<&'a Path>) -> Result<&'a Path> {
    store.flush().context("Failed to write back the edited layer")?;

    let Some(controller) = store.editing_controller() else {
        bail!("No controller is being edited");
    };
    let target = output.unwrap_or(input);
    controller
        .save(target)
        .with_context(|| format!("Failed to save {}", target.display()))?;
    Ok(target)
}

/// Find a state by name. `entry`, `any` and `exit` address the pseudo-states.
fn resolve_state(store: &CliStore, name: &str) -> Result<StateId> {
    let graph = store.graph();
    let pseudo = match name.to_ascii_lowercase().as_str() {
        "entry" => graph.entry(),
        "any" | "anystate" => graph.any_state(),
        "exit" => graph.exit(),
        _ => None,
    };
    if let Some(id) = pseudo {
        return Ok(id.clone());
    }
    match graph.state_by_name(name) {
        Some(state) => Ok(state.id().clone()),
        None => bail!("No state named '{}'", name),
    }
}

fn persisted_transition_count(layer: &LayerData, authoritative: bool) -> usize {
    if authoritative {
        return layer.state_machine.transition_count();
    }
    layer
        .visual_layout_cache
        .as_ref()
        .map_or(0, |layout| layout.edges().count())
}

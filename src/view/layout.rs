//! Visual Layout Blob
//!
//! The cached form of a layer's graph view. It carries node positions and
//! the full serialized entity data, so a layer can be restored from it alone.

use serde::{Deserialize, Serialize};

use super::PortGroup;
use crate::asset::{StateData, TransitionData};
use crate::graph::{Position, StateId, StateKind, TransitionId};

/// Endpoint of an edge cell: a node and one of its port groups.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PortRef {
    pub cell: StateId,
    pub port: PortGroup,
}

/// A node cell.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeCell {
    pub id: StateId,
    #[serde(rename = "stateType")]
    pub kind: StateKind,
    pub position: Position,
    pub data: StateData,
}

/// An edge cell.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EdgeCell {
    pub id: TransitionId,
    pub source: PortRef,
    pub target: PortRef,
    pub data: TransitionData,
}

/// One cell of the layout, tagged by its shape.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "shape", rename_all = "camelCase")]
pub enum LayoutCell {
    /// Normal state node.
    State(NodeCell),
    /// Entry, Exit or AnyState node.
    InternalState(NodeCell),
    Edge(EdgeCell),
}

impl LayoutCell {
    /// Node cell with the shape matching its kind.
    pub fn node(cell: NodeCell) -> Self {
        if cell.kind.is_pseudo() {
            LayoutCell::InternalState(cell)
        } else {
            LayoutCell::State(cell)
        }
    }
}

/// Serialized graph view of one layer.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct VisualLayout {
    #[serde(default)]
    pub cells: Vec<LayoutCell>,
}

impl VisualLayout {
    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    /// Node cells, in document order.
    pub fn nodes(&self) -> impl Iterator<Item = &NodeCell> {
        self.cells.iter().filter_map(|cell| match cell {
            LayoutCell::State(node) | LayoutCell::InternalState(node) => Some(node),
            LayoutCell::Edge(_) => None,
        })
    }

    /// Edge cells, in document order.
    pub fn edges(&self) -> impl Iterator<Item = &EdgeCell> {
        self.cells.iter().filter_map(|cell| match cell {
            LayoutCell::Edge(edge) => Some(edge),
            _ => None,
        })
    }

    pub fn node(&self, id: &str) -> Option<&NodeCell> {
        self.nodes().find(|node| node.id.as_str() == id)
    }
}

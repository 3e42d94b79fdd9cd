//! Final per-node state dump.

use bfstree_types::{Layer, NodeId};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Snapshot of one node's parent, children, other links and layer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeReport {
    pub id: NodeId,
    pub parent: Option<NodeId>,
    pub children: Vec<NodeId>,
    pub other: Vec<NodeId>,
    pub layer: Layer,
}

impl fmt::Display for NodeReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let id = self.id;
        writeln!(f, "============{id}============")?;

        match self.parent {
            Some(parent) => writeln!(f, "{id}'s parent node is: {parent}")?,
            None => writeln!(f, "{id} does not have a parent node.")?,
        }

        if self.children.is_empty() {
            writeln!(f, "{id} does not have any children.")?;
        } else {
            writeln!(f, "{id}'s children nodes are:")?;
            for child in &self.children {
                writeln!(f, "\t{child}")?;
            }
        }

        if self.other.is_empty() {
            writeln!(f, "{id} does not have any other node.")?;
        } else {
            writeln!(f, "{id}'s other nodes are:")?;
            for other in &self.other {
                writeln!(f, "\t{other}")?;
            }
        }

        write!(f, "{id}'s layer is: {}", self.layer)
    }
}

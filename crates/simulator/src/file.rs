//! TOML topology files.
//!
//! ```toml
//! root = 0
//! nodes = 5        # optional, adds isolated nodes up to this count
//!
//! [[links]]
//! a = 0
//! b = 1
//! ```

use bfstree_types::{NodeId, StaticTopology, TopologyError};
use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

/// Errors from loading a topology file.
#[derive(Debug, Error)]
pub enum TopologyFileError {
    #[error("failed to read topology file: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse topology file: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("invalid topology: {0}")]
    Topology(#[from] TopologyError),

    #[error("topology file names {requested} nodes, limit is {limit}")]
    TooManyNodes { requested: u64, limit: u64 },
}

/// Largest node count a topology file may describe. Ids are dense from 0, so
/// this also bounds the highest id.
pub const MAX_FILE_NODES: u64 = 1_000_000;

/// One undirected link.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LinkEntry {
    pub a: u64,
    pub b: u64,
}

/// A topology as written on disk.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TopologyFile {
    /// Root node. Defaults to node 0.
    #[serde(default)]
    pub root: u64,

    /// Total node count. Nodes not named by any link are isolated.
    #[serde(default)]
    pub nodes: Option<u64>,

    #[serde(default)]
    pub links: Vec<LinkEntry>,
}

impl TopologyFile {
    /// Read and parse `path`.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, TopologyFileError> {
        let content = std::fs::read_to_string(path)?;
        Self::parse(&content)
    }

    pub fn parse(content: &str) -> Result<Self, TopologyFileError> {
        Ok(toml::from_str(content)?)
    }

    pub fn root(&self) -> NodeId {
        NodeId(self.root)
    }

    /// Build the topology. Node ids run from 0 to the highest id named by a
    /// link, the root or `nodes`, whichever is largest.
    pub fn to_topology(&self) -> Result<StaticTopology, TopologyFileError> {
        let highest = self
            .links
            .iter()
            .flat_map(|link| [link.a, link.b])
            .chain(std::iter::once(self.root))
            .max()
            .unwrap_or(0);
        let requested = self
            .nodes
            .unwrap_or(0)
            .max(highest.saturating_add(1));
        if requested > MAX_FILE_NODES {
            return Err(TopologyFileError::TooManyNodes {
                requested,
                limit: MAX_FILE_NODES,
            });
        }
        let links = self.links.iter().map(|link| (NodeId(link.a), NodeId(link.b)));
        Ok(StaticTopology::from_links(requested, links)?)
    }
}

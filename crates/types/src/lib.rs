//! Core types for the layered spanning tree protocol.
//!
//! - [`NodeId`] / [`LinkId`]: identifiers for graph vertices and raw links
//! - [`Layer`]: hop-distance estimate with an explicit unset sentinel
//! - [`Topology`] / [`StaticTopology`]: the raw link structure handed to bootstrap
//! - [`NeighborRegistry`]: the deduplicated, immutable neighbor set of one node

mod identifiers;
mod layer;
mod topology;

pub use identifiers::{LinkId, NodeId};
pub use layer::Layer;
pub use topology::{NeighborRegistry, RawLink, StaticTopology, Topology, TopologyError};

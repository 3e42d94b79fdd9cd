//! Layered spanning tree simulator.
//!
//! Builds a topology (generated or read from a TOML file), runs the protocol
//! on the deterministic simulation runner until nothing is left in flight,
//! and reports every node's final parent, children, other links and layer.
//!
//! # Example
//!
//! ```ignore
//! use bfstree_simulator::{Simulator, SimulatorConfig, TopologyShape};
//!
//! let config = SimulatorConfig::new(TopologyShape::Grid, 16).with_seed(7);
//! let report = Simulator::new(config).run()?;
//!
//! assert!(report.converged);
//! report.print();
//! ```

pub mod config;
pub mod file;
pub mod runner;
pub mod shapes;

pub use config::SimulatorConfig;
pub use file::{LinkEntry, TopologyFile, TopologyFileError, MAX_FILE_NODES};
pub use runner::{SimulationReport, Simulator};
pub use shapes::TopologyShape;

//! Generated topologies.

use bfstree_types::StaticTopology;
use rand::Rng;
use std::fmt;
use std::str::FromStr;

/// Shape of a generated topology.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum TopologyShape {
    /// `0 - 1 - ... - n-1`
    Path,

    /// A path closed back to node 0.
    Ring,

    /// Node 0 linked to every other node.
    Star,

    /// Every pair linked.
    Complete,

    /// Square-ish grid. Rounds up to whole rows, so it may hold more than the
    /// requested number of nodes.
    #[default]
    Grid,

    /// Random spanning tree plus `extra_links` random extra links.
    Random { extra_links: usize },
}

impl TopologyShape {
    /// Build a topology of roughly `nodes` nodes.
    pub fn build(&self, nodes: u64, rng: &mut impl Rng) -> StaticTopology {
        match *self {
            TopologyShape::Path => StaticTopology::path(nodes),
            TopologyShape::Ring => StaticTopology::ring(nodes),
            TopologyShape::Star => StaticTopology::star(nodes),
            TopologyShape::Complete => StaticTopology::complete(nodes),
            TopologyShape::Grid => {
                let (width, height) = grid_dimensions(nodes);
                StaticTopology::grid(width, height)
            }
            TopologyShape::Random { extra_links } => {
                StaticTopology::random_connected(nodes, extra_links, rng)
            }
        }
    }
}

fn grid_dimensions(nodes: u64) -> (u64, u64) {
    if nodes == 0 {
        return (0, 0);
    }
    let mut width = (nodes as f64).sqrt() as u64;
    while width * width < nodes {
        width += 1;
    }
    (width, nodes.div_ceil(width))
}

impl FromStr for TopologyShape {
    type Err = String;

    /// Accepts `path`, `ring`, `star`, `complete`, `grid`, `random` and
    /// `random:<extra links>`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "path" | "line" => Ok(TopologyShape::Path),
            "ring" => Ok(TopologyShape::Ring),
            "star" => Ok(TopologyShape::Star),
            "complete" | "clique" => Ok(TopologyShape::Complete),
            "grid" => Ok(TopologyShape::Grid),
            "random" => Ok(TopologyShape::Random { extra_links: 0 }),
            s if s.starts_with("random:") => {
                let extra_links = s[7..]
                    .parse()
                    .map_err(|_| format!("Invalid extra link count: {}", &s[7..]))?;
                Ok(TopologyShape::Random { extra_links })
            }
            _ => Err(format!("Unknown topology shape: {}", s)),
        }
    }
}

impl fmt::Display for TopologyShape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TopologyShape::Path => write!(f, "path"),
            TopologyShape::Ring => write!(f, "ring"),
            TopologyShape::Star => write!(f, "star"),
            TopologyShape::Complete => write!(f, "complete"),
            TopologyShape::Grid => write!(f, "grid"),
            TopologyShape::Random { extra_links } => write!(f, "random:{extra_links}"),
        }
    }
}

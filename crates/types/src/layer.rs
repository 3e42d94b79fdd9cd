//! Hop-distance estimate.

use serde::{Deserialize, Serialize};
use std::fmt;

/// A node's hop-distance estimate from the root.
///
/// `Layer::UNSET` stands for +∞ and compares greater than every finite
/// layer, so "accept iff candidate < current" needs no special casing for
/// nodes that have not been reached yet.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct Layer(pub u32);

impl Layer {
    /// The root's layer.
    pub const ROOT: Self = Layer(0);

    /// Unreached sentinel (+∞).
    pub const UNSET: Self = Layer(u32::MAX);

    /// Whether this layer is finite.
    pub fn is_set(self) -> bool {
        self != Self::UNSET
    }

    /// The candidate layer offered to neighbors.
    ///
    /// Returns None for an unset layer, which has nothing to offer.
    pub fn next(self) -> Option<Self> {
        if !self.is_set() {
            return None;
        }
        match self.0.checked_add(1) {
            Some(n) if n != u32::MAX => Some(Layer(n)),
            _ => None,
        }
    }

    /// Get the raw value, or None when unset.
    pub fn get(self) -> Option<u32> {
        self.is_set().then_some(self.0)
    }
}

impl Default for Layer {
    fn default() -> Self {
        Self::UNSET
    }
}

impl fmt::Display for Layer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_set() {
            write!(f, "{}", self.0)
        } else {
            write!(f, "unset")
        }
    }
}

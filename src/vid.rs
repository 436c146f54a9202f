//! Variable positions (used internally by SDD nodes and by the order tree).
//!
//! Grounded on bex's `vid::VID`: a small `Copy` newtype with an explicit
//! ordering relation, rather than a bare `u32`, so that "above"/"below" reads
//! at call sites instead of a raw `<`/`>` whose direction is easy to flip.
use std::cmp::Ordering;
use std::fmt;

/// A dense integer rank assigned to a node of the variable order. Positions
/// are unique across an order and strictly decrease as one descends into
/// nested or next children (spec.md §3 "Variable order").
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Var(pub u32);

impl Var {
    pub const fn new(position: u32) -> Self {
        Var(position)
    }

    pub fn position(&self) -> u32 {
        self.0
    }

    /// Is `self` nearer the root than `other`? (i.e. does `self` branch first?)
    pub fn is_above(&self, other: &Var) -> bool {
        self.0 > other.0
    }

    pub fn is_below(&self, other: &Var) -> bool {
        self.0 < other.0
    }

    pub fn cmp_depth(&self, other: &Var) -> Ordering {
        // Higher position number == nearer the root == "above".
        other.0.cmp(&self.0)
    }
}

impl fmt::Display for Var {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "v{}", self.0)
    }
}

impl fmt::Debug for Var {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ordering_matches_depth() {
        let root = Var::new(5);
        let child = Var::new(2);
        assert!(root.is_above(&child));
        assert!(child.is_below(&root));
        assert_eq!(root.cmp_depth(&child), Ordering::Less);
    }
}

//! The SDD type itself: a canonical, hash-consed, reference-counted DAG
//! representing a set of hierarchically-structured tuples (spec.md §2
//! "SDD"). Grounded on bex's `vhl::Vhl`/`HiLoCache` (hi/lo pairs interned
//! behind canonical handles) generalized from binary hi/lo arcs to
//! n-ary flat and hierarchical alpha lists, and on `sdd::dd::node`/
//! `sdd::dd::alpha` for the two-terminal, variable-tagged-arc-list shape.
pub mod count;
pub mod ops;
pub mod paths;

use std::hash::{Hash, Hasher};
use std::rc::Rc;

use crate::unique_table::UniqueTable;
use crate::values::ValueSet;
use crate::vid::Var;

/// The content of a node, used as the hash-consing key. Successors are
/// already-canonical `Sdd<V>` handles, so structural equality here reduces
/// to comparing variables and successor *pointers* -- the same trick bex's
/// `HiLoCache` uses comparing `NID`s instead of recursing into subtrees.
#[derive(Clone)]
pub enum SddNode<V: ValueSet> {
    Zero,
    One,
    /// A flat node: arcs labeled by value-set valuations, sorted and
    /// deduplicated by successor so the alpha list has one arc per distinct
    /// successor (spec.md §4.4 "square-union").
    Flat { variable: Var, arcs: Vec<(V, Sdd<V>)> },
    /// A hierarchical node: arcs labeled by nested SDD valuations.
    Hier { variable: Var, arcs: Vec<(Sdd<V>, Sdd<V>)> },
}

impl<V: ValueSet> PartialEq for SddNode<V> {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (SddNode::Zero, SddNode::Zero) => true,
            (SddNode::One, SddNode::One) => true,
            (SddNode::Flat { variable: v1, arcs: a1 }, SddNode::Flat { variable: v2, arcs: a2 }) => {
                v1 == v2 && a1 == a2
            }
            (SddNode::Hier { variable: v1, arcs: a1 }, SddNode::Hier { variable: v2, arcs: a2 }) => {
                v1 == v2 && a1 == a2
            }
            _ => false,
        }
    }
}
impl<V: ValueSet> Eq for SddNode<V> {}

impl<V: ValueSet> Hash for SddNode<V> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        match self {
            SddNode::Zero => 0u8.hash(state),
            SddNode::One => 1u8.hash(state),
            SddNode::Flat { variable, arcs } => {
                2u8.hash(state);
                variable.hash(state);
                arcs.hash(state);
            }
            SddNode::Hier { variable, arcs } => {
                3u8.hash(state);
                variable.hash(state);
                arcs.hash(state);
            }
        }
    }
}

/// A canonical handle to an SDD node. Two handles are equal iff they point
/// at the same interned node: the unique table guarantees that structurally
/// identical nodes are always the same `Rc`, so identity comparison here
/// *is* semantic set equality (spec.md §4.2's payoff).
#[derive(Clone)]
pub struct Sdd<V: ValueSet>(pub(crate) Rc<SddNode<V>>);

impl<V: ValueSet> PartialEq for Sdd<V> {
    fn eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }
}
impl<V: ValueSet> Eq for Sdd<V> {}

impl<V: ValueSet> Hash for Sdd<V> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        (Rc::as_ptr(&self.0) as usize).hash(state);
    }
}

impl<V: ValueSet> std::fmt::Debug for Sdd<V> {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match &*self.0 {
            SddNode::Zero => write!(f, "|0|"),
            SddNode::One => write!(f, "|1|"),
            SddNode::Flat { variable, arcs } => {
                write!(f, "Flat({:?}, {} arcs)", variable, arcs.len())
            }
            SddNode::Hier { variable, arcs } => {
                write!(f, "Hier({:?}, {} arcs)", variable, arcs.len())
            }
        }
    }
}

impl<V: ValueSet> Sdd<V> {
    pub fn is_zero(&self) -> bool {
        matches!(&*self.0, SddNode::Zero)
    }

    pub fn is_one(&self) -> bool {
        matches!(&*self.0, SddNode::One)
    }

    pub fn is_terminal(&self) -> bool {
        self.is_zero() || self.is_one()
    }

    pub fn variable(&self) -> Option<Var> {
        match &*self.0 {
            SddNode::Flat { variable, .. } | SddNode::Hier { variable, .. } => Some(*variable),
            _ => None,
        }
    }

    pub fn flat_arcs(&self) -> Option<&[(V, Sdd<V>)]> {
        match &*self.0 {
            SddNode::Flat { arcs, .. } => Some(arcs),
            _ => None,
        }
    }

    pub fn hier_arcs(&self) -> Option<&[(Sdd<V>, Sdd<V>)]> {
        match &*self.0 {
            SddNode::Hier { arcs, .. } => Some(arcs),
            _ => None,
        }
    }
}

/// The home of the two pinned terminals and the interning table shared by
/// every SDD built within one evaluation context.
pub struct SddFactory<V: ValueSet> {
    table: UniqueTable<SddNode<V>>,
    zero: Sdd<V>,
    one: Sdd<V>,
}

impl<V: ValueSet> SddFactory<V> {
    pub fn new() -> Self {
        Self::with_capacity(0)
    }

    /// Pre-size the node interning table (spec.md §6 "sdd_unique_table_size").
    pub fn with_capacity(capacity: usize) -> Self {
        let table = UniqueTable::with_capacity(capacity);
        let zero = Sdd(table.intern(SddNode::Zero));
        let one = Sdd(table.intern(SddNode::One));
        SddFactory { table, zero, one }
    }

    pub fn zero(&self) -> Sdd<V> {
        self.zero.clone()
    }

    pub fn one(&self) -> Sdd<V> {
        self.one.clone()
    }

    /// Intern a flat node. Arcs must already be square-unioned (one entry
    /// per distinct successor) and sorted by successor pointer so that
    /// canonically-equal alphas produce byte-identical keys regardless of
    /// construction order (spec.md §4.4 "canonical arc ordering").
    pub fn flat(&self, variable: Var, mut arcs: Vec<(V, Sdd<V>)>) -> Sdd<V> {
        if arcs.is_empty() {
            return self.zero();
        }
        arcs.sort_by_key(|(_, succ)| Rc::as_ptr(&succ.0) as usize);
        Sdd(self.table.intern(SddNode::Flat { variable, arcs }))
    }

    pub fn hier(&self, variable: Var, mut arcs: Vec<(Sdd<V>, Sdd<V>)>) -> Sdd<V> {
        if arcs.is_empty() {
            return self.zero();
        }
        arcs.sort_by_key(|(_, succ)| Rc::as_ptr(&succ.0) as usize);
        Sdd(self.table.intern(SddNode::Hier { variable, arcs }))
    }

    pub fn unique_table_len(&self) -> usize {
        self.table.len()
    }

    pub fn reclaim(&self) {
        self.table.reclaim();
    }
}

impl<V: ValueSet> Default for SddFactory<V> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::BitSet64;

    #[test]
    fn structurally_identical_flats_are_the_same_pointer() {
        let f: SddFactory<BitSet64> = SddFactory::new();
        let one = f.one();
        let a = f.flat(Var::new(3), vec![(BitSet64::singleton(1), one.clone())]);
        let b = f.flat(Var::new(3), vec![(BitSet64::singleton(1), one.clone())]);
        assert_eq!(a, b);
        assert!(std::rc::Rc::ptr_eq(&a.0, &b.0));
    }

    #[test]
    fn empty_arcs_collapse_to_zero() {
        let f: SddFactory<BitSet64> = SddFactory::new();
        let node = f.flat(Var::new(1), vec![]);
        assert!(node.is_zero());
    }

    #[test]
    fn distinct_valuations_are_distinct_nodes() {
        let f: SddFactory<BitSet64> = SddFactory::new();
        let one = f.one();
        let a = f.flat(Var::new(2), vec![(BitSet64::singleton(1), one.clone())]);
        let b = f.flat(Var::new(2), vec![(BitSet64::singleton(2), one.clone())]);
        assert_ne!(a, b);
    }
}

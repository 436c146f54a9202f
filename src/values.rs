//! External interfaces (spec.md §6): the `Values` contract that a flat node's
//! arc valuations must satisfy, plus the two kinds of user-supplied bodies
//! that drive the `function` and `inductive` homomorphisms. Concrete value
//! sets (a flat sorted set, a bitset) are out of scope for this crate; only
//! the contract is specified here, mirroring `sdd::values::values_traits`
//! and `sdd::hom::values_function`/`sdd::hom::inductive` in the upstream
//! source.
use std::fmt::Debug;
use std::hash::Hash;

use crate::error::Error;
use crate::order::Order;
use crate::sdd::Sdd;

/// The contract a value set must satisfy to be used as an SDD flat-node
/// valuation (spec.md §6 "Value-set contract").
pub trait ValueSet: Clone + Eq + Hash + Debug {
    /// The element type yielded while iterating.
    type Value: Clone + Eq + Hash;

    /// Whether single-value iteration is fast enough that DD operations
    /// should prefer the per-value fast path over partition-based splitting.
    const FAST_ITERABLE: bool = false;

    fn empty() -> Self;
    fn is_empty(&self) -> bool;
    fn size(&self) -> usize;

    fn union(&self, other: &Self) -> Self;
    fn intersection(&self, other: &Self) -> Self;
    fn difference(&self, other: &Self) -> Self;

    fn contains(&self, value: &Self::Value) -> bool;
    fn singleton(value: Self::Value) -> Self;

    /// Iterate the individual values (order unspecified but total, per
    /// spec.md §4.5's note on path-enumeration ordering).
    fn iter(&self) -> Box<dyn Iterator<Item = Self::Value> + '_>;
}

/// A values-to-values transformer (spec.md §6 "Values function").
///
/// `apply` returns a `Result` rather than a bare `V` so that a user body can
/// raise `Error::Interrupt` to abort an in-progress evaluation (spec.md §5
/// "Cancellation"): the evaluator propagates it with `?` straight through
/// the homomorphism cache without storing a partial result.
pub trait ValuesFunction<V: ValueSet>: Debug {
    fn apply(&self, values: &V) -> Result<V, Error<V>>;

    /// This function always returns a subset of its input.
    fn selector(&self) -> bool {
        false
    }

    /// This function never grows the set: `|apply(v)| <= |v|` for all `v`.
    /// A shifter that isn't a selector can still unlock the selector-shaped
    /// evaluation path in `function`/`local` when outputs differ from inputs
    /// but never exceed them in size.
    fn shifter(&self) -> bool {
        false
    }
}

/// An inductive homomorphism body (spec.md §6 "Inductive body").
///
/// Structural recursion driven entirely by the three callbacks below; `Id`
/// is the user identifier type of the order being traversed. Every callback
/// returns a `Result` for the same reason as `ValuesFunction::apply`: it is
/// the user's only way to raise `Error::Interrupt`.
pub trait InductiveBody<V: ValueSet, Id>: Debug {
    /// This body commutes with prepending the given identifier's level.
    fn skip(&self, id: &Id) -> bool;

    fn selector(&self) -> bool {
        false
    }

    /// Base case: the homomorphism applied to `|1|`.
    fn on_terminal(&self) -> Result<Sdd<V>, Error<V>>;

    /// The homomorphism to apply to the successor of a flat arc.
    fn on_flat(&self, order: &Order<Id>, values: &V) -> Result<crate::hom::Homomorphism<V, Id>, Error<V>>;

    /// The homomorphism to apply to the successor of a hierarchical arc.
    fn on_hierarchical(&self, order: &Order<Id>, nested: &Sdd<V>) -> Result<crate::hom::Homomorphism<V, Id>, Error<V>>;
}

//! Union, intersection and difference over SDDs, each backed by its own
//! result cache, plus the `square_union` helper shared by the set-building
//! algorithms that merge arcs by successor (spec.md §4.4 "DD operations").
//! Grounded closely on the upstream `sdd::dd::square_union`, `sdd::dd::sum`
//! and `sdd::dd::difference`: square_union's "group arcs by successor,
//! union the valuations that share one" shape, sum's trivial cases (empty
//! operand list, singleton, else-cache) and difference's residual-then-
//! recurse structure are all carried over, adapted from the variadic n-ary
//! operand lists of the original into this crate's binary-reduction style
//! (n-ary union folds pairwise over a cache-backed binary union, matching
//! how bex's `BddBase::or`/`xor` fold binary `ite`).
//!
//! Union additionally implements the "twist" spec.md §4.4 calls out: arcs
//! from the two operands can carry *partially overlapping* valuations even
//! when their successors differ, so a naive group-by-successor merge would
//! produce a node whose arcs violate the canonicity invariant that
//! valuations are pairwise disjoint. `union_atoms` walks both arc lists and
//! refines them into disjoint atoms first, deferring an overlap's residual
//! back into the working set, exactly as described there.
use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use crate::cache::OpCache;
use crate::error::{Error, Top};
use crate::sdd::{Sdd, SddFactory, SddNode};
use crate::values::ValueSet;

fn ptr_key<V: ValueSet>(s: &Sdd<V>) -> usize {
    Rc::as_ptr(&s.0) as usize
}

/// Merge two arc lists, grouping by successor (spec.md §4.4
/// "square-union"): when both lists carry an arc to the same successor, the
/// merged arc's valuation is `merge(a, b)`; otherwise the arc is carried
/// through unchanged. `merge` may fail (hierarchical valuations are
/// themselves SDDs, merged via a recursive union that can raise `Top`).
fn square_union<V, Val>(
    lhs: &[(Val, Sdd<V>)],
    rhs: &[(Val, Sdd<V>)],
    mut merge: impl FnMut(Val, Val) -> Result<Val, Error<V>>,
) -> Result<Vec<(Val, Sdd<V>)>, Error<V>>
where
    V: ValueSet,
    Val: Clone,
{
    let mut order: Vec<Sdd<V>> = Vec::new();
    let mut index: HashMap<usize, usize> = HashMap::new();
    let mut vals: Vec<Option<Val>> = Vec::new();
    for (val, succ) in lhs.iter().chain(rhs.iter()) {
        let key = ptr_key(succ);
        match index.get(&key) {
            Some(&i) => {
                let prior = vals[i].take().expect("slot populated on first insert");
                vals[i] = Some(merge(prior, val.clone())?);
            }
            None => {
                index.insert(key, order.len());
                order.push(succ.clone());
                vals.push(Some(val.clone()));
            }
        }
    }
    Ok(order.into_iter().zip(vals.into_iter().map(|v| v.expect("every slot filled"))).map(|(s, v)| (v, s)).collect())
}

/// Merge duplicate-successor arcs within a single freshly-built arc list
/// (the same grouping `square_union` does for two lists, applied to one).
pub fn square_union_single<V, Val>(arcs: Vec<(Val, Sdd<V>)>, merge: impl FnMut(Val, Val) -> Result<Val, Error<V>>) -> Result<Vec<(Val, Sdd<V>)>, Error<V>>
where
    V: ValueSet,
    Val: Clone,
{
    square_union(&arcs, &[], merge)
}

/// The three cross-operation caches, bundled so a `Context` can own one
/// instance per evaluation session (spec.md §4.1).
pub struct Caches<V: ValueSet> {
    pub union: OpCache<(Sdd<V>, Sdd<V>), Sdd<V>>,
    pub intersection: OpCache<(Sdd<V>, Sdd<V>), Sdd<V>>,
    pub difference: OpCache<(Sdd<V>, Sdd<V>), Sdd<V>>,
}

impl<V: ValueSet> Caches<V> {
    /// Uniform capacity for all three caches (test/scratch convenience).
    pub fn new(capacity: usize) -> Self {
        Self::with_capacities(capacity, capacity, capacity)
    }

    /// Per-cache capacities (spec.md §6 "sdd_sum_cache_size" /
    /// "sdd_intersection_cache_size" / "sdd_difference_cache_size").
    pub fn with_capacities(sum_capacity: usize, intersection_capacity: usize, difference_capacity: usize) -> Self {
        Caches {
            union: OpCache::new(sum_capacity),
            intersection: OpCache::new(intersection_capacity),
            difference: OpCache::new(difference_capacity),
        }
    }
}

/// Canonical (order-independent) cache key for a commutative binary op.
fn sym_key<V: ValueSet>(a: &Sdd<V>, b: &Sdd<V>) -> (Sdd<V>, Sdd<V>) {
    if ptr_key(a) <= ptr_key(b) {
        (a.clone(), b.clone())
    } else {
        (b.clone(), a.clone())
    }
}

/// Refine `lhs` and `rhs` into a list of disjoint atoms, each tagged with
/// every successor reachable by its valuation (spec.md §4.4 union's "map
/// from each distinct valuation ... to the list of successors", built by
/// "splitting the current valuation into intersection / residuals" as each
/// `rhs` arc is walked against the atoms accumulated so far).
fn union_atoms<V, Val>(
    lhs: &[(Val, Sdd<V>)],
    rhs: &[(Val, Sdd<V>)],
    is_empty: &mut impl FnMut(&Val) -> bool,
    intersect: &mut impl FnMut(&Val, &Val) -> Result<Val, Error<V>>,
    diff: &mut impl FnMut(&Val, &Val) -> Result<Val, Error<V>>,
) -> Result<Vec<(Val, Vec<Sdd<V>>)>, Error<V>>
where
    V: ValueSet,
    Val: Clone,
{
    let mut atoms: Vec<(Val, Vec<Sdd<V>>)> = lhs.iter().map(|(v, s)| (v.clone(), vec![s.clone()])).collect();
    for (v2, s2) in rhs {
        let mut remaining = v2.clone();
        let mut next_atoms = Vec::with_capacity(atoms.len() + 1);
        for (va, succs) in atoms.into_iter() {
            if is_empty(&remaining) {
                next_atoms.push((va, succs));
                continue;
            }
            let overlap = intersect(&va, &remaining)?;
            if is_empty(&overlap) {
                next_atoms.push((va, succs));
                continue;
            }
            let residual = diff(&va, &overlap)?;
            if !is_empty(&residual) {
                next_atoms.push((residual, succs.clone()));
            }
            let mut merged = succs;
            merged.push(s2.clone());
            remaining = diff(&remaining, &overlap)?;
            next_atoms.push((overlap, merged));
        }
        atoms = next_atoms;
        if !is_empty(&remaining) {
            atoms.push((remaining, vec![s2.clone()]));
        }
    }
    Ok(atoms)
}

/// Union two arc lists of the same variable, honoring the overlapping-
/// valuation twist, then square-union the result so atoms that converge on
/// the same (possibly newly-unioned) successor collapse into one arc.
fn union_arcs<V, Val>(
    lhs: &[(Val, Sdd<V>)],
    rhs: &[(Val, Sdd<V>)],
    mut is_empty: impl FnMut(&Val) -> bool,
    mut intersect: impl FnMut(&Val, &Val) -> Result<Val, Error<V>>,
    mut diff: impl FnMut(&Val, &Val) -> Result<Val, Error<V>>,
    union_val: impl FnMut(Val, Val) -> Result<Val, Error<V>>,
    mut union_succ: impl FnMut(&Sdd<V>, &Sdd<V>) -> Result<Sdd<V>, Error<V>>,
) -> Result<Vec<(Val, Sdd<V>)>, Error<V>>
where
    V: ValueSet,
    Val: Clone,
{
    let atoms = union_atoms(lhs, rhs, &mut is_empty, &mut intersect, &mut diff)?;
    let mut arcs = Vec::with_capacity(atoms.len());
    for (val, succs) in atoms {
        let mut iter = succs.into_iter();
        let mut acc = iter.next().expect("an atom always has at least one contributing successor");
        for s in iter {
            acc = union_succ(&acc, &s)?;
        }
        arcs.push((val, acc));
    }
    square_union_single(arcs, union_val)
}

pub fn union<V: ValueSet>(factory: &SddFactory<V>, caches: &mut Caches<V>, a: &Sdd<V>, b: &Sdd<V>) -> Result<Sdd<V>, Error<V>> {
    if a == b {
        return Ok(a.clone());
    }
    if a.is_zero() {
        return Ok(b.clone());
    }
    if b.is_zero() {
        return Ok(a.clone());
    }
    let key = sym_key(a, b);
    if let Some(hit) = caches.union.get(&key) {
        return Ok(hit);
    }
    let result = match (&*a.0, &*b.0) {
        (SddNode::One, SddNode::One) => Ok(factory.one()),
        (SddNode::Flat { variable: v1, arcs: a1 }, SddNode::Flat { variable: v2, arcs: a2 }) if v1 == v2 => {
            let merged = union_arcs(
                a1,
                a2,
                |v: &V| v.is_empty(),
                |x: &V, y: &V| Ok(x.intersection(y)),
                |x: &V, y: &V| Ok(x.difference(y)),
                |x: V, y: V| Ok(x.union(&y)),
                |x: &Sdd<V>, y: &Sdd<V>| union(factory, caches, x, y),
            )?;
            Ok(factory.flat(*v1, merged))
        }
        (SddNode::Hier { variable: v1, arcs: a1 }, SddNode::Hier { variable: v2, arcs: a2 }) if v1 == v2 => {
            let caches = RefCell::new(&mut *caches);
            let merged = union_arcs(
                a1,
                a2,
                |v: &Sdd<V>| v.is_zero(),
                |x: &Sdd<V>, y: &Sdd<V>| intersection(factory, *caches.borrow_mut(), x, y),
                |x: &Sdd<V>, y: &Sdd<V>| difference(factory, *caches.borrow_mut(), x, y),
                |x: Sdd<V>, y: Sdd<V>| union(factory, *caches.borrow_mut(), &x, &y),
                |x: &Sdd<V>, y: &Sdd<V>| union(factory, *caches.borrow_mut(), x, y),
            )?;
            Ok(factory.hier(*v1, merged))
        }
        _ => Err(Error::Top(Top::new(a.clone(), b.clone()))),
    }?;
    caches.union.insert(key, result.clone());
    Ok(result)
}

/// Pairwise intersect every `lhs`/`rhs` arc regardless of whether their
/// successors happen to coincide (spec.md §4.4 intersection: "for each pair
/// of arcs, intersect valuations; if non-empty, recurse on successors").
fn intersect_arcs<V, Val>(
    lhs: &[(Val, Sdd<V>)],
    rhs: &[(Val, Sdd<V>)],
    mut is_empty: impl FnMut(&Val) -> bool,
    mut intersect_val: impl FnMut(&Val, &Val) -> Result<Val, Error<V>>,
    mut intersect_succ: impl FnMut(&Sdd<V>, &Sdd<V>) -> Result<Sdd<V>, Error<V>>,
    union_val: impl FnMut(Val, Val) -> Result<Val, Error<V>>,
) -> Result<Vec<(Val, Sdd<V>)>, Error<V>>
where
    V: ValueSet,
    Val: Clone,
{
    let mut raw = Vec::new();
    for (va, sa) in lhs {
        for (vb, sb) in rhs {
            let v = intersect_val(va, vb)?;
            if is_empty(&v) {
                continue;
            }
            let s = intersect_succ(sa, sb)?;
            if s.is_zero() {
                continue;
            }
            raw.push((v, s));
        }
    }
    square_union_single(raw, union_val)
}

pub fn intersection<V: ValueSet>(factory: &SddFactory<V>, caches: &mut Caches<V>, a: &Sdd<V>, b: &Sdd<V>) -> Result<Sdd<V>, Error<V>> {
    if a == b {
        return Ok(a.clone());
    }
    if a.is_zero() || b.is_zero() {
        return Ok(factory.zero());
    }
    let key = sym_key(a, b);
    if let Some(hit) = caches.intersection.get(&key) {
        return Ok(hit);
    }
    let result = match (&*a.0, &*b.0) {
        (SddNode::One, SddNode::One) => Ok(factory.one()),
        (SddNode::Flat { variable: v1, arcs: a1 }, SddNode::Flat { variable: v2, arcs: a2 }) if v1 == v2 => {
            let merged = intersect_arcs(
                a1,
                a2,
                |v: &V| v.is_empty(),
                |x: &V, y: &V| Ok(x.intersection(y)),
                |x: &Sdd<V>, y: &Sdd<V>| intersection(factory, caches, x, y),
                |x: V, y: V| Ok(x.union(&y)),
            )?;
            Ok(factory.flat(*v1, merged))
        }
        (SddNode::Hier { variable: v1, arcs: a1 }, SddNode::Hier { variable: v2, arcs: a2 }) if v1 == v2 => {
            let caches = RefCell::new(&mut *caches);
            let merged = intersect_arcs(
                a1,
                a2,
                |v: &Sdd<V>| v.is_zero(),
                |x: &Sdd<V>, y: &Sdd<V>| intersection(factory, *caches.borrow_mut(), x, y),
                |x: &Sdd<V>, y: &Sdd<V>| intersection(factory, *caches.borrow_mut(), x, y),
                |x: Sdd<V>, y: Sdd<V>| union(factory, *caches.borrow_mut(), &x, &y),
            )?;
            Ok(factory.hier(*v1, merged))
        }
        _ => Err(Error::Top(Top::new(a.clone(), b.clone()))),
    }?;
    caches.intersection.insert(key, result.clone());
    Ok(result)
}

/// `R = ⋃ rhs.valuations`; each `lhs` arc keeps `lhs.valuation ∖ R` under
/// its original successor untouched, and every overlapping `(lhs, rhs)` pair
/// contributes `lhs.val ∩ rhs.val` under `diff(lhs.succ, rhs.succ)` (spec.md
/// §4.4 difference's general case).
#[allow(clippy::too_many_arguments)]
fn difference_arcs<V, Val>(
    lhs: &[(Val, Sdd<V>)],
    rhs: &[(Val, Sdd<V>)],
    empty_val: Val,
    mut is_empty: impl FnMut(&Val) -> bool,
    mut union_val: impl FnMut(Val, Val) -> Result<Val, Error<V>>,
    mut intersect_val: impl FnMut(&Val, &Val) -> Result<Val, Error<V>>,
    mut diff_val: impl FnMut(&Val, &Val) -> Result<Val, Error<V>>,
    mut diff_succ: impl FnMut(&Sdd<V>, &Sdd<V>) -> Result<Sdd<V>, Error<V>>,
) -> Result<Vec<(Val, Sdd<V>)>, Error<V>>
where
    V: ValueSet,
    Val: Clone,
{
    let mut r = empty_val;
    for (v, _) in rhs {
        r = union_val(r, v.clone())?;
    }
    let mut raw = Vec::new();
    for (va, sa) in lhs {
        let residual = diff_val(va, &r)?;
        if !is_empty(&residual) {
            raw.push((residual, sa.clone()));
        }
    }
    for (va, sa) in lhs {
        for (vb, sb) in rhs {
            let v = intersect_val(va, vb)?;
            if is_empty(&v) {
                continue;
            }
            let s = diff_succ(sa, sb)?;
            if s.is_zero() {
                continue;
            }
            raw.push((v, s));
        }
    }
    square_union_single(raw, union_val)
}

pub fn difference<V: ValueSet>(factory: &SddFactory<V>, caches: &mut Caches<V>, a: &Sdd<V>, b: &Sdd<V>) -> Result<Sdd<V>, Error<V>> {
    if a == b {
        return Ok(factory.zero());
    }
    if b.is_zero() {
        return Ok(a.clone());
    }
    if a.is_zero() {
        return Ok(factory.zero());
    }
    let key = (a.clone(), b.clone());
    if let Some(hit) = caches.difference.get(&key) {
        return Ok(hit);
    }
    let result = match (&*a.0, &*b.0) {
        (SddNode::One, SddNode::One) => Ok(factory.zero()),
        (SddNode::Flat { variable: v1, arcs: a1 }, SddNode::Flat { variable: v2, arcs: a2 }) if v1 == v2 => {
            let merged = difference_arcs(
                a1,
                a2,
                V::empty(),
                |v: &V| v.is_empty(),
                |x: V, y: V| Ok(x.union(&y)),
                |x: &V, y: &V| Ok(x.intersection(y)),
                |x: &V, y: &V| Ok(x.difference(y)),
                |x: &Sdd<V>, y: &Sdd<V>| difference(factory, caches, x, y),
            )?;
            Ok(factory.flat(*v1, merged))
        }
        (SddNode::Hier { variable: v1, arcs: a1 }, SddNode::Hier { variable: v2, arcs: a2 }) if v1 == v2 => {
            let caches = RefCell::new(&mut *caches);
            let merged = difference_arcs(
                a1,
                a2,
                factory.zero(),
                |v: &Sdd<V>| v.is_zero(),
                |x: Sdd<V>, y: Sdd<V>| union(factory, *caches.borrow_mut(), &x, &y),
                |x: &Sdd<V>, y: &Sdd<V>| intersection(factory, *caches.borrow_mut(), x, y),
                |x: &Sdd<V>, y: &Sdd<V>| difference(factory, *caches.borrow_mut(), x, y),
                |x: &Sdd<V>, y: &Sdd<V>| difference(factory, *caches.borrow_mut(), x, y),
            )?;
            Ok(factory.hier(*v1, merged))
        }
        _ => Err(Error::Top(Top::new(a.clone(), b.clone()))),
    }?;
    caches.difference.insert(key, result.clone());
    Ok(result)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::BitSet64;
    use crate::vid::Var;

    fn setup() -> (SddFactory<BitSet64>, Caches<BitSet64>) {
        (SddFactory::new(), Caches::new(64))
    }

    #[test]
    fn union_with_zero_is_identity() {
        let (f, mut c) = setup();
        let node = f.flat(Var::new(1), vec![(BitSet64::singleton(1), f.one())]);
        let result = union(&f, &mut c, &node, &f.zero()).unwrap();
        assert_eq!(result, node);
    }

    #[test]
    fn union_merges_valuations_sharing_a_successor() {
        let (f, mut c) = setup();
        let one = f.one();
        let a = f.flat(Var::new(1), vec![(BitSet64::singleton(1), one.clone())]);
        let b = f.flat(Var::new(1), vec![(BitSet64::singleton(2), one.clone())]);
        let u = union(&f, &mut c, &a, &b).unwrap();
        assert_eq!(u.flat_arcs().unwrap().len(), 1);
        assert_eq!(u.flat_arcs().unwrap()[0].0, BitSet64::from_values([1, 2]));
    }

    #[test]
    fn intersection_with_self_is_identity() {
        let (f, mut c) = setup();
        let node = f.flat(Var::new(1), vec![(BitSet64::singleton(1), f.one())]);
        assert_eq!(intersection(&f, &mut c, &node, &node).unwrap(), node);
    }

    #[test]
    fn difference_with_self_is_zero() {
        let (f, mut c) = setup();
        let node = f.flat(Var::new(1), vec![(BitSet64::singleton(1), f.one())]);
        let d = difference(&f, &mut c, &node, &node).unwrap();
        assert!(d.is_zero());
    }

    #[test]
    fn mismatched_shapes_raise_top() {
        let (f, mut c) = setup();
        let flat = f.flat(Var::new(1), vec![(BitSet64::singleton(1), f.one())]);
        let hier = f.hier(Var::new(1), vec![(flat.clone(), f.one())]);
        let err = union(&f, &mut c, &flat, &hier).unwrap_err();
        assert!(matches!(err, Error::Top(_)));
    }
}

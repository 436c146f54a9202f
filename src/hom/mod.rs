//! The homomorphism algebra: structural transformers over SDDs, interned
//! the same way SDD nodes are so that semantically identical homomorphisms
//! share one cache entry (spec.md §4 "Homomorphism"). Grounded on bex's
//! `ops::Ops` RPN algebra (a small closed set of operator variants dispatch
//! on in one big `match`) generalized to the thirteen variants spec.md §4
//! names, and on `sdd::hom::definition` for the skip/selector predicates
//! that drive the rewriter.
pub mod eval;
pub mod rewrite;

use std::fmt;
use std::hash::{Hash, Hasher};
use std::rc::Rc;

use crate::order::Order;
use crate::sdd::Sdd;
use crate::values::{InductiveBody, ValueSet, ValuesFunction};
use crate::vid::Var;

/// A user-supplied values function or inductive body, compared and hashed
/// by identity: its content isn't structurally comparable in general, so
/// two distinct instances are always distinct homomorphisms even if they'd
/// behave identically (mirrors how `sdd::hom::function`/`inductive` key
/// their cache entries on the wrapped object's address upstream).
pub struct ByAddress<T: ?Sized>(pub Rc<T>);

impl<T: ?Sized> Clone for ByAddress<T> {
    fn clone(&self) -> Self {
        ByAddress(self.0.clone())
    }
}
impl<T: ?Sized> PartialEq for ByAddress<T> {
    fn eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }
}
impl<T: ?Sized> Eq for ByAddress<T> {}
impl<T: ?Sized> Hash for ByAddress<T> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        (Rc::as_ptr(&self.0) as *const () as usize).hash(state);
    }
}
impl<T: fmt::Debug + ?Sized> fmt::Debug for ByAddress<T> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        self.0.fmt(f)
    }
}

#[derive(Clone)]
pub enum HomNode<V: ValueSet, Id> {
    Id,
    Const(Sdd<V>),
    Cons { variable: Var, value: V, body: Homomorphism<V, Id> },
    Comp(Homomorphism<V, Id>, Homomorphism<V, Id>),
    Sum(Vec<Homomorphism<V, Id>>),
    Inter(Vec<Homomorphism<V, Id>>),
    Fixpoint(Homomorphism<V, Id>),
    Local { id: Id, body: Homomorphism<V, Id> },
    Inductive(ByAddress<dyn InductiveBody<V, Id>>),
    Function { id: Id, function: ByAddress<dyn ValuesFunction<V>> },
    Ite { cond: Homomorphism<V, Id>, then_branch: Homomorphism<V, Id>, else_branch: Homomorphism<V, Id> },
    /// Rewritten, level-local saturation fixpoint: `variable` is the level it
    /// is restricted to, `forward` is the skip-compatible (F) part, `global`
    /// is the non-skip-compatible (G) part, `local` is the nested (L) part
    /// (spec.md §4.8 "saturation").
    SatFix { variable: Var, forward: Homomorphism<V, Id>, global: Vec<Homomorphism<V, Id>>, local: Homomorphism<V, Id> },
    SatSum { variable: Var, parts: Vec<Homomorphism<V, Id>> },
    SatInter { variable: Var, parts: Vec<Homomorphism<V, Id>> },
}

impl<V: ValueSet, Id: Eq> PartialEq for HomNode<V, Id> {
    fn eq(&self, other: &Self) -> bool {
        use HomNode::*;
        match (self, other) {
            (Id, Id) => true,
            (Const(a), Const(b)) => a == b,
            (Cons { variable: v1, value: val1, body: b1 }, Cons { variable: v2, value: val2, body: b2 }) => {
                v1 == v2 && val1 == val2 && b1 == b2
            }
            (Comp(a1, b1), Comp(a2, b2)) => a1 == a2 && b1 == b2,
            (Sum(a), Sum(b)) => a == b,
            (Inter(a), Inter(b)) => a == b,
            (Fixpoint(a), Fixpoint(b)) => a == b,
            (Local { id: i1, body: b1 }, Local { id: i2, body: b2 }) => i1 == i2 && b1 == b2,
            (Inductive(a), Inductive(b)) => a == b,
            (Function { id: i1, function: f1 }, Function { id: i2, function: f2 }) => i1 == i2 && f1 == f2,
            (Ite { cond: c1, then_branch: t1, else_branch: e1 }, Ite { cond: c2, then_branch: t2, else_branch: e2 }) => {
                c1 == c2 && t1 == t2 && e1 == e2
            }
            (SatFix { variable: v1, forward: f1, global: g1, local: l1 }, SatFix { variable: v2, forward: f2, global: g2, local: l2 }) => {
                v1 == v2 && f1 == f2 && g1 == g2 && l1 == l2
            }
            (SatSum { variable: v1, parts: p1 }, SatSum { variable: v2, parts: p2 }) => v1 == v2 && p1 == p2,
            (SatInter { variable: v1, parts: p1 }, SatInter { variable: v2, parts: p2 }) => v1 == v2 && p1 == p2,
            _ => false,
        }
    }
}
impl<V: ValueSet, Id: Eq> Eq for HomNode<V, Id> {}

impl<V: ValueSet, Id: Hash> Hash for HomNode<V, Id> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        use HomNode::*;
        match self {
            Id => 0u8.hash(state),
            Const(a) => {
                1u8.hash(state);
                a.hash(state);
            }
            Cons { variable, value, body } => {
                2u8.hash(state);
                variable.hash(state);
                value.hash(state);
                body.hash(state);
            }
            Comp(a, b) => {
                3u8.hash(state);
                a.hash(state);
                b.hash(state);
            }
            Sum(v) => {
                4u8.hash(state);
                v.hash(state);
            }
            Inter(v) => {
                5u8.hash(state);
                v.hash(state);
            }
            Fixpoint(a) => {
                6u8.hash(state);
                a.hash(state);
            }
            Local { id, body } => {
                7u8.hash(state);
                id.hash(state);
                body.hash(state);
            }
            Inductive(a) => {
                8u8.hash(state);
                a.hash(state);
            }
            Function { id, function } => {
                9u8.hash(state);
                id.hash(state);
                function.hash(state);
            }
            Ite { cond, then_branch, else_branch } => {
                10u8.hash(state);
                cond.hash(state);
                then_branch.hash(state);
                else_branch.hash(state);
            }
            SatFix { variable, forward, global, local } => {
                11u8.hash(state);
                variable.hash(state);
                forward.hash(state);
                global.hash(state);
                local.hash(state);
            }
            SatSum { variable, parts } => {
                12u8.hash(state);
                variable.hash(state);
                parts.hash(state);
            }
            SatInter { variable, parts } => {
                13u8.hash(state);
                variable.hash(state);
                parts.hash(state);
            }
        }
    }
}

/// A canonical handle to a homomorphism, compared and hashed by identity
/// exactly like `Sdd<V>` (spec.md §4.2's hash-consing payoff applies to the
/// homomorphism algebra too).
pub struct Homomorphism<V: ValueSet, Id>(pub(crate) Rc<HomNode<V, Id>>);

impl<V: ValueSet, Id> Clone for Homomorphism<V, Id> {
    fn clone(&self) -> Self {
        Homomorphism(self.0.clone())
    }
}
impl<V: ValueSet, Id> PartialEq for Homomorphism<V, Id> {
    fn eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }
}
impl<V: ValueSet, Id> Eq for Homomorphism<V, Id> {}
impl<V: ValueSet, Id> Hash for Homomorphism<V, Id> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        (Rc::as_ptr(&self.0) as usize).hash(state);
    }
}
impl<V: ValueSet, Id> fmt::Debug for Homomorphism<V, Id> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "Homomorphism@{:p}", Rc::as_ptr(&self.0))
    }
}

/// Interns `HomNode`s, handing back canonical `Homomorphism` handles, and
/// owns the one pinned `id` instance every context shares.
pub struct HomFactory<V: ValueSet, Id: Eq + Hash> {
    table: crate::unique_table::UniqueTable<HomNode<V, Id>>,
    id: Homomorphism<V, Id>,
}

impl<V: ValueSet, Id: Eq + Hash + Clone> HomFactory<V, Id> {
    pub fn new() -> Self {
        Self::with_capacity(0)
    }

    /// Pre-size the homomorphism interning table (spec.md §6
    /// "hom_unique_table_size").
    pub fn with_capacity(capacity: usize) -> Self {
        let table = crate::unique_table::UniqueTable::with_capacity(capacity);
        let id = Homomorphism(table.intern(HomNode::Id));
        HomFactory { table, id }
    }

    fn intern(&self, node: HomNode<V, Id>) -> Homomorphism<V, Id> {
        Homomorphism(self.table.intern(node))
    }

    pub fn id(&self) -> Homomorphism<V, Id> {
        self.id.clone()
    }

    pub fn constant(&self, target: Sdd<V>) -> Homomorphism<V, Id> {
        self.intern(HomNode::Const(target))
    }

    pub fn cons(&self, variable: Var, value: V, body: Homomorphism<V, Id>) -> Homomorphism<V, Id> {
        self.intern(HomNode::Cons { variable, value, body })
    }

    /// `comp(outer, inner)` normalizes away an `id` on either side and
    /// merges `local(t,_) ∘ local(t,_)` for a shared target `t` into one
    /// `local` (spec.md §4.7 "Construction normalizes local∘local with same
    /// target, comp with id").
    pub fn comp(&self, outer: Homomorphism<V, Id>, inner: Homomorphism<V, Id>) -> Homomorphism<V, Id> {
        if matches!(&*outer.0, HomNode::Id) {
            return inner;
        }
        if matches!(&*inner.0, HomNode::Id) {
            return outer;
        }
        if let (HomNode::Local { id: id1, body: b1 }, HomNode::Local { id: id2, body: b2 }) = (&*outer.0, &*inner.0) {
            if id1 == id2 {
                return self.local(id1.clone(), self.comp(b1.clone(), b2.clone()));
            }
        }
        self.intern(HomNode::Comp(outer, inner))
    }

    /// Flattens nested sums, merges locals that share a hierarchical target
    /// into one local wrapping an inner sum, and canonicalizes operand order
    /// so that two sums built from the same multiset of parts in different
    /// construction order intern to the same pointer (spec.md §4.7 "sum /
    /// inter").
    pub fn sum(&self, parts: Vec<Homomorphism<V, Id>>) -> Homomorphism<V, Id> {
        let parts = self.flatten_merge(parts, true);
        if parts.len() == 1 {
            return parts.into_iter().next().unwrap();
        }
        self.intern(HomNode::Sum(parts))
    }

    pub fn inter(&self, parts: Vec<Homomorphism<V, Id>>) -> Homomorphism<V, Id> {
        let parts = self.flatten_merge(parts, false);
        if parts.len() == 1 {
            return parts.into_iter().next().unwrap();
        }
        self.intern(HomNode::Inter(parts))
    }

    fn flatten_merge(&self, parts: Vec<Homomorphism<V, Id>>, is_sum: bool) -> Vec<Homomorphism<V, Id>> {
        let mut flat = Vec::with_capacity(parts.len());
        for h in parts {
            let same_kind = if is_sum { matches!(&*h.0, HomNode::Sum(_)) } else { matches!(&*h.0, HomNode::Inter(_)) };
            if same_kind {
                let nested = match &*h.0 {
                    HomNode::Sum(inner) | HomNode::Inter(inner) => inner.clone(),
                    _ => unreachable!(),
                };
                flat.extend(nested);
            } else {
                flat.push(h);
            }
        }
        let mut locals: Vec<(Id, Vec<Homomorphism<V, Id>>)> = Vec::new();
        let mut rest = Vec::new();
        for h in flat {
            if let HomNode::Local { id, body } = &*h.0 {
                if let Some(entry) = locals.iter_mut().find(|(existing, _)| existing == id) {
                    entry.1.push(body.clone());
                    continue;
                }
                locals.push((id.clone(), vec![body.clone()]));
                continue;
            }
            rest.push(h);
        }
        for (id, bodies) in locals {
            let merged_body = if is_sum { self.sum(bodies) } else { self.inter(bodies) };
            rest.push(self.local(id, merged_body));
        }
        rest.sort_by_key(|h| Rc::as_ptr(&h.0) as usize);
        rest.dedup_by(|a, b| Rc::ptr_eq(&a.0, &b.0));
        rest
    }

    /// `fixpoint(id) = id` and `fixpoint(fixpoint(h)) = fixpoint(h)` (spec.md
    /// §8 testable properties).
    pub fn fixpoint(&self, body: Homomorphism<V, Id>) -> Homomorphism<V, Id> {
        if matches!(&*body.0, HomNode::Id | HomNode::Fixpoint(_)) {
            return body;
        }
        self.intern(HomNode::Fixpoint(body))
    }

    pub fn local(&self, id: Id, body: Homomorphism<V, Id>) -> Homomorphism<V, Id> {
        self.intern(HomNode::Local { id, body })
    }

    pub fn inductive(&self, body: Rc<dyn InductiveBody<V, Id>>) -> Homomorphism<V, Id> {
        self.intern(HomNode::Inductive(ByAddress(body)))
    }

    pub fn function(&self, id: Id, function: Rc<dyn ValuesFunction<V>>) -> Homomorphism<V, Id> {
        self.intern(HomNode::Function { id, function: ByAddress(function) })
    }

    /// `ite(p, t, e)` requires `p` a selector -- `apply`'s evaluation relies
    /// on `selected ⊆ sdd` to take `difference(sdd, selected)` as the
    /// else-branch input (spec.md §4.7: "requires `p` a selector
    /// (construction failure otherwise)"). Short-circuits: `p = id` reduces
    /// to `t`; `t = e` reduces to `t`.
    pub fn ite(
        &self,
        cond: Homomorphism<V, Id>,
        then_branch: Homomorphism<V, Id>,
        else_branch: Homomorphism<V, Id>,
    ) -> Result<Homomorphism<V, Id>, crate::error::Error<V>>
    where
        Id: fmt::Debug,
    {
        if !cond.selector() {
            return Err(crate::error::Error::InvalidArgument(format!("ite condition must be a selector: {cond:?}")));
        }
        if matches!(&*cond.0, HomNode::Id) {
            return Ok(then_branch);
        }
        if then_branch == else_branch {
            return Ok(then_branch);
        }
        Ok(self.intern(HomNode::Ite { cond, then_branch, else_branch }))
    }

    pub fn sat_fix(&self, variable: Var, forward: Homomorphism<V, Id>, global: Vec<Homomorphism<V, Id>>, local: Homomorphism<V, Id>) -> Homomorphism<V, Id> {
        self.intern(HomNode::SatFix { variable, forward, global, local })
    }

    pub fn sat_sum(&self, variable: Var, parts: Vec<Homomorphism<V, Id>>) -> Homomorphism<V, Id> {
        self.intern(HomNode::SatSum { variable, parts })
    }

    pub fn sat_inter(&self, variable: Var, parts: Vec<Homomorphism<V, Id>>) -> Homomorphism<V, Id> {
        self.intern(HomNode::SatInter { variable, parts })
    }

    pub fn unique_table_len(&self) -> usize {
        self.table.len()
    }
}

impl<V: ValueSet, Id: Eq + Hash + Clone> Default for HomFactory<V, Id> {
    fn default() -> Self {
        Self::new()
    }
}

impl<V: ValueSet, Id: Clone + Eq + Hash + fmt::Debug> Homomorphism<V, Id> {
    /// Does this homomorphism commute with prepending `id`'s level -- can it
    /// be pushed down past a node for an unrelated identifier unchanged?
    pub fn skip(&self, id: &Id, order: &Order<Id>) -> bool {
        match &*self.0 {
            HomNode::Id => true,
            HomNode::Const(_) => false,
            // Always builds a fresh arc at its own target, never at an
            // unrelated level -- it does not commute with prepending
            // anything (spec.md §4.7: "cons(...): Never skips").
            HomNode::Cons { .. } => false,
            HomNode::Comp(a, b) => a.skip(id, order) && b.skip(id, order),
            HomNode::Sum(parts) => parts.iter().all(|h| h.skip(id, order)),
            HomNode::Inter(parts) => parts.iter().all(|h| h.skip(id, order)),
            HomNode::Fixpoint(h) => h.skip(id, order),
            HomNode::Local { id: target, .. } => target != id,
            HomNode::Inductive(body) => body.0.skip(id),
            HomNode::Function { id: target, .. } => target != id,
            HomNode::Ite { cond, then_branch, else_branch } => {
                cond.skip(id, order) && then_branch.skip(id, order) && else_branch.skip(id, order)
            }
            HomNode::SatFix { .. } | HomNode::SatSum { .. } | HomNode::SatInter { .. } => false,
        }
    }

    /// Does this homomorphism only ever shrink (or leave unchanged) the set
    /// it's applied to -- never introduce values absent from the input?
    pub fn selector(&self) -> bool {
        match &*self.0 {
            HomNode::Id => true,
            HomNode::Const(_) => false,
            HomNode::Cons { .. } => false,
            HomNode::Comp(a, b) => a.selector() && b.selector(),
            HomNode::Sum(parts) => parts.iter().all(|h| h.selector()),
            HomNode::Inter(parts) => parts.iter().any(|h| h.selector()),
            HomNode::Fixpoint(h) => h.selector(),
            HomNode::Local { body, .. } => body.selector(),
            HomNode::Inductive(body) => body.0.selector(),
            HomNode::Function { function, .. } => function.0.selector(),
            HomNode::Ite { .. } => false,
            HomNode::SatFix { .. } | HomNode::SatSum { .. } | HomNode::SatInter { .. } => false,
        }
    }
}

//! The saturation rewriter: turns a level's sum, intersection, or fixpoint
//! of a sum into a level-local saturation schedule, by partitioning the
//! operands into a forwardable part (F, commutes with the level), a local
//! part (L, acts on the nested dimension named by the level's identifier)
//! and a global part (G, everything else) (spec.md §4.9 "Rewriter").
//! Grounded on `sdd::hom::rewrite`'s `partition()` and the three overloads
//! it dispatches to (`_sum`, `_inter`, `_fixpoint`), including
//! `_fixpoint`'s requirement that an identity operand be present before it
//! will produce a saturation homomorphism at all.
use std::fmt::Debug;
use std::hash::Hash;

use crate::hom::{HomFactory, HomNode, Homomorphism};
use crate::order::Order;
use crate::values::ValueSet;
use crate::vid::Var;

/// Split `parts` into (forward, local-at-`id`, global): forward operands
/// skip `id`'s level, local operands are `local(id, body)` wrappers whose
/// `body` becomes the L material, everything else is global.
fn partition_level<V, Id>(parts: Vec<Homomorphism<V, Id>>, id: &Id, order: &Order<Id>) -> (Vec<Homomorphism<V, Id>>, Vec<Homomorphism<V, Id>>, Vec<Homomorphism<V, Id>>)
where
    V: ValueSet,
    Id: Clone + Eq + Hash + Debug,
{
    let mut forward = Vec::new();
    let mut local = Vec::new();
    let mut global = Vec::new();
    for h in parts {
        if let HomNode::Local { id: target, body } = &*h.0 {
            if target == id {
                local.push(body.clone());
                continue;
            }
        }
        if h.skip(id, order) {
            forward.push(h);
        } else {
            global.push(h);
        }
    }
    (forward, local, global)
}

/// Rewrite `fixpoint(sum(parts))` at `variable`, provided `parts` contains
/// the identity operand (the precondition `sdd::hom::rewrite::_fixpoint`
/// checks before it bothers). Returns `unrewritten` otherwise -- still
/// correct, just not level-local.
fn rewrite_fixpoint_of_sum<V, Id>(
    factory: &HomFactory<V, Id>,
    order: &Order<Id>,
    variable: Var,
    id: &Id,
    parts: Vec<Homomorphism<V, Id>>,
    unrewritten: Homomorphism<V, Id>,
) -> Homomorphism<V, Id>
where
    V: ValueSet,
    Id: Clone + Eq + Hash + Debug,
{
    let has_id = parts.iter().any(|h| matches!(&*h.0, HomNode::Id));
    if !has_id {
        log::trace!("fixpoint at {variable:?}: body has no identity operand, left unrewritten");
        return unrewritten;
    }
    log::debug!("fixpoint at {variable:?} rewritten to sat_fix");
    let without_id: Vec<_> = parts.into_iter().filter(|h| !matches!(&*h.0, HomNode::Id)).collect();
    let (forward, local, mut global) = partition_level(without_id, id, order);

    let forward_body = if forward.is_empty() { factory.id() } else { factory.sum(forward) };
    let forward_fix = rewrite(factory, &order.next(), factory.fixpoint(factory.sum(vec![forward_body, factory.id()])));

    let local_hom = if local.is_empty() {
        factory.id()
    } else {
        let local_body = factory.sum(local);
        let nested_fix = rewrite(factory, &order.nested(), factory.fixpoint(factory.sum(vec![local_body, factory.id()])));
        factory.local(id.clone(), nested_fix)
    };

    // Selectors prune paths earlier, so they run first within a G pass.
    global.sort_by_key(|h| !h.selector());
    factory.sat_fix(variable, forward_fix, global, local_hom)
}

/// Rewrite `h` at `order`'s current position (spec.md §4.9). The empty
/// order and any variant other than sum, intersection, or fixpoint-of-sum
/// pass through unchanged; rewriting is semantics-preserving: for any order
/// `o` and DD `x`, `rewrite(o, h)(o, x) = h(o, x)`.
pub fn rewrite<V, Id>(factory: &HomFactory<V, Id>, order: &Order<Id>, hom: Homomorphism<V, Id>) -> Homomorphism<V, Id>
where
    V: ValueSet,
    Id: Clone + Eq + Hash + Debug,
{
    if order.is_empty() {
        return hom;
    }
    let Some(id) = order.id().cloned() else {
        return hom;
    };
    let variable = order.variable();

    match &*hom.0 {
        HomNode::Sum(parts) => {
            let (forward, local, global) = partition_level(parts.clone(), &id, order);
            if forward.is_empty() && local.is_empty() {
                log::trace!("sum at {variable:?}: no forwardable or local operands, left unrewritten");
                return hom;
            }
            log::debug!("sum at {variable:?} rewritten to sat_sum: {} forward, {} local, {} global", forward.len(), local.len(), global.len());
            let forward_hom = rewrite(factory, &order.next(), if forward.is_empty() { factory.id() } else { factory.sum(forward) });
            let local_hom = if local.is_empty() {
                factory.id()
            } else {
                factory.local(id, rewrite(factory, &order.nested(), factory.sum(local)))
            };
            let mut parts = Vec::with_capacity(global.len() + 2);
            if !matches!(&*forward_hom.0, HomNode::Id) {
                parts.push(forward_hom);
            }
            if !matches!(&*local_hom.0, HomNode::Id) {
                parts.push(local_hom);
            }
            parts.extend(global);
            factory.sat_sum(variable, parts)
        }
        HomNode::Inter(parts) => {
            let (forward, local, global) = partition_level(parts.clone(), &id, order);
            if forward.is_empty() && local.is_empty() {
                log::trace!("intersection at {variable:?}: no forwardable or local operands, left unrewritten");
                return hom;
            }
            log::debug!("intersection at {variable:?} rewritten to sat_inter: {} forward, {} local, {} global", forward.len(), local.len(), global.len());
            let forward_hom = rewrite(factory, &order.next(), if forward.is_empty() { factory.id() } else { factory.inter(forward) });
            let local_hom = if local.is_empty() {
                factory.id()
            } else {
                factory.local(id, rewrite(factory, &order.nested(), factory.inter(local)))
            };
            let mut parts = Vec::with_capacity(global.len() + 2);
            if !matches!(&*forward_hom.0, HomNode::Id) {
                parts.push(forward_hom);
            }
            if !matches!(&*local_hom.0, HomNode::Id) {
                parts.push(local_hom);
            }
            parts.extend(global);
            factory.sat_inter(variable, parts)
        }
        HomNode::Fixpoint(body) => {
            if let HomNode::Sum(parts) = &*body.0 {
                let parts = parts.clone();
                rewrite_fixpoint_of_sum(factory, order, variable, &id, parts, hom.clone())
            } else {
                hom
            }
        }
        _ => hom,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::BitSet64;

    #[test]
    fn fixpoint_without_identity_is_left_unrewritten() {
        let factory: HomFactory<BitSet64, &str> = HomFactory::new();
        let order: Order<&str> = Order::flat(vec!["x"]);
        let cons = factory.cons(Var::new(1), BitSet64::singleton(1), factory.id());
        let body = factory.sum(vec![cons]);
        let rewritten = rewrite(&factory, &order, factory.fixpoint(body));
        assert!(matches!(&*rewritten.0, HomNode::Fixpoint(_)));
    }

    #[test]
    fn fixpoint_with_identity_becomes_saturation() {
        let factory: HomFactory<BitSet64, &str> = HomFactory::new();
        let order: Order<&str> = Order::flat(vec!["x"]);
        let id = factory.id();
        let cons = factory.cons(Var::new(1), BitSet64::singleton(1), factory.id());
        let body = factory.sum(vec![id, cons]);
        let rewritten = rewrite(&factory, &order, factory.fixpoint(body));
        assert!(matches!(&*rewritten.0, HomNode::SatFix { .. }));
    }

    #[test]
    fn sum_with_no_forwardable_or_local_operands_is_left_unchanged() {
        let factory: HomFactory<BitSet64, &str> = HomFactory::new();
        let order: Order<&str> = Order::flat(vec!["x"]);
        let cons = factory.cons(Var::new(1), BitSet64::singleton(1), factory.id());
        let sum = factory.sum(vec![cons]);
        let rewritten = rewrite(&factory, &order, sum.clone());
        assert_eq!(rewritten, sum);
    }

    #[test]
    fn sum_with_a_local_operand_becomes_a_saturation_sum() {
        let factory: HomFactory<BitSet64, &str> = HomFactory::new();
        let order: Order<&str> = Order::from_specs(vec![crate::order::Spec::hierarchical("x", vec![crate::order::Spec::var("a")])]);
        let nested = factory.cons(Var::new(0), BitSet64::singleton(1), factory.id());
        let local = factory.local("x", nested);
        let sum = factory.sum(vec![local, factory.cons(Var::new(2), BitSet64::singleton(0), factory.id())]);
        let rewritten = rewrite(&factory, &order, sum);
        assert!(matches!(&*rewritten.0, HomNode::SatSum { .. }));
    }
}

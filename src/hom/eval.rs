//! The evaluator: apply a homomorphism to an SDD, dispatching on its
//! variant, consulting and populating the homomorphism cache, and
//! annotating errors with the chain of enclosing homomorphisms on the way
//! out (spec.md §4.6 "Evaluation context & process-wide state" /
//! §7 "evaluation errors"). Grounded on bex's `WorkState::resolve_nid`
//! memoized-dispatch pattern (look up a pending/finished cache entry before
//! recursing, insert the finished result on the way back out).
use std::fmt::Debug;
use std::hash::Hash;

use crate::context::Context;
use crate::error::Error;
use crate::hom::{HomNode, Homomorphism};
use crate::order::Order;
use crate::sdd::ops;
use crate::values::ValueSet;

fn should_cache<V: ValueSet, Id>(hom: &HomNode<V, Id>) -> bool {
    !matches!(hom, HomNode::Id | HomNode::Const(_))
}

pub fn apply<V, Id>(cxt: &mut Context<V, Id>, order: &Order<Id>, hom: &Homomorphism<V, Id>, sdd: &crate::sdd::Sdd<V>) -> Result<crate::sdd::Sdd<V>, Error<V>>
where
    V: ValueSet,
    Id: Clone + Eq + Hash + Debug,
{
    // Steps 1-2 of spec.md §4.6: `id` is returned before anything else is
    // consulted, and `x = |0|` short-circuits to `|0|` for every variant
    // except `const`, whose entire point is to ignore its input (spec.md §8:
    // "const(S)(x) = S" holds for every `x`, including `|0|`).
    if matches!(&*hom.0, HomNode::Id) {
        return Ok(sdd.clone());
    }
    if sdd.is_zero() && !matches!(&*hom.0, HomNode::Const(_)) {
        return Ok(cxt.sdds.zero());
    }
    let cache_key = (hom.clone(), sdd.clone());
    if should_cache(&hom.0) {
        if let Some(hit) = cxt.hom_cache.get(&cache_key) {
            return Ok(hit);
        }
    }
    let result = apply_uncached(cxt, order, hom, sdd).map_err(|e| e.annotate(format!("{:?}", hom)))?;
    if should_cache(&hom.0) {
        cxt.hom_cache.insert(cache_key, result.clone());
    }
    Ok(result)
}

fn apply_uncached<V, Id>(cxt: &mut Context<V, Id>, order: &Order<Id>, hom: &Homomorphism<V, Id>, sdd: &crate::sdd::Sdd<V>) -> Result<crate::sdd::Sdd<V>, Error<V>>
where
    V: ValueSet,
    Id: Clone + Eq + Hash + Debug,
{
    match &*hom.0 {
        HomNode::Id => Ok(sdd.clone()),
        HomNode::Const(target) => Ok(target.clone()),
        HomNode::Cons { variable, value, body } => {
            let succ = apply(cxt, order, body, sdd)?;
            Ok(cxt.sdds.flat(*variable, vec![(value.clone(), succ)]))
        }
        HomNode::Comp(outer, inner) => {
            let mid = apply(cxt, order, inner, sdd)?;
            apply(cxt, order, outer, &mid)
        }
        HomNode::Sum(parts) => {
            let mut acc = cxt.sdds.zero();
            for part in parts {
                let r = apply(cxt, order, part, sdd)?;
                acc = ops::union(&cxt.sdds, &mut cxt.sdd_caches, &acc, &r)?;
            }
            Ok(acc)
        }
        HomNode::Inter(parts) => {
            let mut iter = parts.iter();
            let first = match iter.next() {
                Some(h) => apply(cxt, order, h, sdd)?,
                None => return Ok(sdd.clone()),
            };
            let mut acc = first;
            for part in iter {
                let r = apply(cxt, order, part, sdd)?;
                acc = ops::intersection(&cxt.sdds, &mut cxt.sdd_caches, &acc, &r)?;
            }
            Ok(acc)
        }
        HomNode::Fixpoint(body) => {
            let mut current = sdd.clone();
            loop {
                let next = apply(cxt, order, body, &current)?;
                if next == current {
                    return Ok(current);
                }
                current = next;
            }
        }
        HomNode::SatFix { forward, global, local, .. } => {
            let mut s2 = sdd.clone();
            loop {
                let s1 = s2.clone();
                s2 = apply(cxt, order, forward, &s1)?;
                s2 = apply(cxt, order, local, &s2)?;
                for g in global {
                    let gr = apply(cxt, order, g, &s2)?;
                    s2 = ops::union(&cxt.sdds, &mut cxt.sdd_caches, &s2, &gr)?;
                }
                if s1 == s2 {
                    return Ok(s2);
                }
            }
        }
        HomNode::SatSum { parts, .. } => {
            let mut acc = cxt.sdds.zero();
            for part in parts {
                let r = apply(cxt, order, part, sdd)?;
                acc = ops::union(&cxt.sdds, &mut cxt.sdd_caches, &acc, &r)?;
            }
            Ok(acc)
        }
        HomNode::SatInter { parts, .. } => {
            let mut iter = parts.iter();
            let first = match iter.next() {
                Some(h) => apply(cxt, order, h, sdd)?,
                None => return Ok(sdd.clone()),
            };
            let mut acc = first;
            for part in iter {
                let r = apply(cxt, order, part, sdd)?;
                acc = ops::intersection(&cxt.sdds, &mut cxt.sdd_caches, &acc, &r)?;
            }
            Ok(acc)
        }
        HomNode::Local { id, body } => {
            let rebuild_alpha = body.selector();
            apply_at(cxt, order, id, sdd, rebuild_alpha, &mut |cxt, nested| apply(cxt, order, body, nested))
        }
        HomNode::Function { id, function } => {
            let f = function.clone();
            let rebuild_alpha = f.0.selector() || f.0.shifter();
            apply_at_flat(cxt, order, id, sdd, rebuild_alpha, &mut |_, values| f.0.apply(values))
        }
        HomNode::Inductive(body) => {
            if sdd.is_one() {
                return body.0.on_terminal();
            }
            if sdd.is_zero() {
                return Ok(cxt.sdds.zero());
            }
            if let Some(arcs) = sdd.flat_arcs() {
                let arcs = arcs.to_vec();
                let mut built = Vec::new();
                for (val, succ) in &arcs {
                    let h = body.0.on_flat(order, val)?;
                    let new_succ = apply(cxt, order, &h, succ)?;
                    built.push((val.clone(), new_succ));
                }
                let merged = ops::square_union_single(built, |a: V, b: V| Ok(a.union(&b)))?;
                Ok(cxt.sdds.flat(sdd.variable().expect("non-terminal has a variable"), merged))
            } else {
                let arcs = sdd.hier_arcs().expect("non-terminal, non-flat node is hierarchical").to_vec();
                let mut built = Vec::new();
                for (nested, succ) in &arcs {
                    let h = body.0.on_hierarchical(order, nested)?;
                    let new_succ = apply(cxt, order, &h, succ)?;
                    built.push((nested.clone(), new_succ));
                }
                let merged = ops::square_union_single(built, |a: crate::sdd::Sdd<V>, b: crate::sdd::Sdd<V>| {
                    ops::union(&cxt.sdds, &mut cxt.sdd_caches, &a, &b)
                })?;
                Ok(cxt.sdds.hier(sdd.variable().expect("non-terminal has a variable"), merged))
            }
        }
        HomNode::Ite { cond, then_branch, else_branch } => {
            let selected = apply(cxt, order, cond, sdd)?;
            if &selected == sdd {
                apply(cxt, order, then_branch, sdd)
            } else if selected.is_zero() {
                apply(cxt, order, else_branch, sdd)
            } else {
                let rest = ops::difference(&cxt.sdds, &mut cxt.sdd_caches, sdd, &selected)?;
                let a = apply(cxt, order, then_branch, &selected)?;
                let b = apply(cxt, order, else_branch, &rest)?;
                ops::union(&cxt.sdds, &mut cxt.sdd_caches, &a, &b)
            }
        }
    }
}

/// Descend to the hierarchical level named by `id`, applying `at_nested` to
/// that level's nested valuations and leaving every other level's arcs
/// structurally unchanged (spec.md §4 "local": "restricts a homomorphism to
/// the nested SDD found at a given identifier"). At the target level, a
/// selector body (`rebuild_alpha`) can only shrink valuations, so a direct
/// square-union rebuild is safe; otherwise `at_nested` may map two distinct
/// nested valuations onto overlapping ones, so each rewritten arc is built
/// as its own one-arc SDD and the results are combined with `ops::union`,
/// which splits overlaps instead of silently duplicating them (spec.md §4.7
/// "local": "if `h` is a selector ... square-union; otherwise it must
/// distribute over a union").
fn apply_at<V, Id>(
    cxt: &mut Context<V, Id>,
    order: &Order<Id>,
    id: &Id,
    sdd: &crate::sdd::Sdd<V>,
    rebuild_alpha: bool,
    at_nested: &mut dyn FnMut(&mut Context<V, Id>, &crate::sdd::Sdd<V>) -> Result<crate::sdd::Sdd<V>, Error<V>>,
) -> Result<crate::sdd::Sdd<V>, Error<V>>
where
    V: ValueSet,
    Id: Clone + Eq + Hash + Debug,
{
    if sdd.is_terminal() {
        return Ok(sdd.clone());
    }
    let target_var = order.find(id).map(|o| o.variable());
    if let Some(arcs) = sdd.hier_arcs() {
        let variable = sdd.variable().expect("non-terminal has a variable");
        if Some(variable) == target_var {
            let arcs = arcs.to_vec();
            if rebuild_alpha {
                let mut built = Vec::new();
                for (nested, succ) in &arcs {
                    built.push((at_nested(cxt, nested)?, succ.clone()));
                }
                return Ok(cxt.sdds.hier(variable, built));
            }
            let mut acc = cxt.sdds.zero();
            for (nested, succ) in &arcs {
                let new_nested = at_nested(cxt, nested)?;
                if new_nested.is_zero() {
                    continue;
                }
                let one_arc = cxt.sdds.hier(variable, vec![(new_nested, succ.clone())]);
                acc = ops::union(&cxt.sdds, &mut cxt.sdd_caches, &acc, &one_arc)?;
            }
            return Ok(acc);
        }
        let arcs = arcs.to_vec();
        let mut built = Vec::new();
        for (nested, succ) in &arcs {
            let new_succ = apply_at(cxt, order, id, succ, rebuild_alpha, at_nested)?;
            built.push((nested.clone(), new_succ));
        }
        return Ok(cxt.sdds.hier(variable, built));
    }
    let arcs = sdd.flat_arcs().expect("non-terminal, non-hier node is flat").to_vec();
    let variable = sdd.variable().expect("non-terminal has a variable");
    let mut built = Vec::new();
    for (val, succ) in &arcs {
        let new_succ = apply_at(cxt, order, id, succ, rebuild_alpha, at_nested)?;
        built.push((val.clone(), new_succ));
    }
    Ok(cxt.sdds.flat(variable, built))
}

/// As `apply_at`, but descending to a flat level and rewriting its
/// valuations directly (`local`'s flat-valued sibling, `function`; spec.md
/// §4.7 "function(v, F): if F.selector=true, rebuild an alpha directly;
/// otherwise, each rewritten arc becomes a new one-arc SDD, all unioned at
/// the end"). `rebuild_alpha` is set from `F.selector() || F.shifter()`:
/// a shifter never grows the set, so it unlocks the same direct-rebuild
/// path as a selector even when its outputs differ from its inputs.
fn apply_at_flat<V, Id>(
    cxt: &mut Context<V, Id>,
    order: &Order<Id>,
    id: &Id,
    sdd: &crate::sdd::Sdd<V>,
    rebuild_alpha: bool,
    at_values: &mut dyn FnMut(&mut Context<V, Id>, &V) -> Result<V, Error<V>>,
) -> Result<crate::sdd::Sdd<V>, Error<V>>
where
    V: ValueSet,
    Id: Clone + Eq + Hash + Debug,
{
    if sdd.is_terminal() {
        return Ok(sdd.clone());
    }
    let target_var = order.find(id).map(|o| o.variable());
    if let Some(arcs) = sdd.flat_arcs() {
        let variable = sdd.variable().expect("non-terminal has a variable");
        if Some(variable) == target_var {
            let arcs = arcs.to_vec();
            if rebuild_alpha {
                let mut built = Vec::new();
                for (val, succ) in &arcs {
                    built.push((at_values(cxt, val)?, succ.clone()));
                }
                let merged = ops::square_union_single(built, |a: V, b: V| Ok(a.union(&b)))?;
                return Ok(cxt.sdds.flat(variable, merged));
            }
            let mut acc = cxt.sdds.zero();
            for (val, succ) in &arcs {
                let new_val = at_values(cxt, val)?;
                if new_val.is_empty() {
                    continue;
                }
                let one_arc = cxt.sdds.flat(variable, vec![(new_val, succ.clone())]);
                acc = ops::union(&cxt.sdds, &mut cxt.sdd_caches, &acc, &one_arc)?;
            }
            return Ok(acc);
        }
        let arcs = arcs.to_vec();
        let mut built = Vec::new();
        for (val, succ) in &arcs {
            let new_succ = apply_at_flat(cxt, order, id, succ, rebuild_alpha, at_values)?;
            built.push((val.clone(), new_succ));
        }
        return Ok(cxt.sdds.flat(variable, built));
    }
    let arcs = sdd.hier_arcs().expect("non-terminal, non-flat node is hierarchical").to_vec();
    let variable = sdd.variable().expect("non-terminal has a variable");
    let mut built = Vec::new();
    for (nested, succ) in &arcs {
        let new_succ = apply_at_flat(cxt, order, id, succ, rebuild_alpha, at_values)?;
        built.push((nested.clone(), new_succ));
    }
    Ok(cxt.sdds.hier(variable, built))
}

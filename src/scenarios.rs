//! End-to-end scenarios exercising the full algebra together (construction,
//! operations, homomorphism application, counting, paths), rather than one
//! module in isolation. Scenarios are lifted from the properties this
//! engine is meant to satisfy: inclusion-exclusion over union, a fixpoint
//! that explores every reachable tuple under a cyclic increment, path
//! enumeration over a union, a hierarchical `local`/`function` combination,
//! and the shape-mismatch error path.
#![cfg(test)]

use std::rc::Rc;

use crate::error::Error;
use crate::order::Order;
use crate::sdd::ops::Caches;
use crate::sdd::paths::paths;
use crate::sdd::{Sdd, SddFactory};
use crate::test_support::BitSet64;
use crate::values::{ValueSet, ValuesFunction};
use crate::vid::Var;

fn chain(factory: &SddFactory<BitSet64>, variables: &[(Var, u8)]) -> Sdd<BitSet64> {
    let mut succ = factory.one();
    for &(var, value) in variables.iter().rev() {
        succ = factory.flat(var, vec![(BitSet64::singleton(value), succ)]);
    }
    succ
}

#[test]
fn union_count_matches_inclusion_exclusion() {
    let f: SddFactory<BitSet64> = SddFactory::new();
    let mut caches = Caches::new(64);
    let (a, b, c) = (Var::new(3), Var::new(2), Var::new(1));
    let x = chain(&f, &[(a, 0), (b, 0), (c, 0)]);
    assert_eq!(crate::sdd::count::count(&x), 1u32.into());

    let y = chain(&f, &[(a, 1), (b, 1), (c, 1)]);
    let u = crate::sdd::ops::union(&f, &mut caches, &x, &y).unwrap();
    assert_eq!(crate::sdd::count::count(&u), 2u32.into());

    let i = crate::sdd::ops::intersection(&f, &mut caches, &x, &y).unwrap();
    assert!(i.is_zero());
    let count_u = crate::sdd::count::count(&u);
    let count_x = crate::sdd::count::count(&x);
    let count_y = crate::sdd::count::count(&y);
    let count_i = crate::sdd::count::count(&i);
    assert_eq!(count_u, count_x + count_y - count_i);
}

#[test]
fn difference_and_intersection_over_a_single_level() {
    let f: SddFactory<BitSet64> = SddFactory::new();
    let mut caches = Caches::new(64);
    let a = Var::new(1);
    let x = f.flat(a, vec![(BitSet64::from_values([0, 1, 2]), f.one())]);
    let y = f.flat(a, vec![(BitSet64::from_values([1]), f.one())]);

    let diff = crate::sdd::ops::difference(&f, &mut caches, &x, &y).unwrap();
    let expected_diff = f.flat(a, vec![(BitSet64::from_values([0, 2]), f.one())]);
    assert_eq!(diff, expected_diff);

    let inter = crate::sdd::ops::intersection(&f, &mut caches, &x, &y).unwrap();
    assert_eq!(inter, y);

    let union = crate::sdd::ops::union(&f, &mut caches, &x, &y).unwrap();
    assert_eq!(union, x);
}

#[derive(Debug)]
struct IncrementMod3;

impl ValuesFunction<BitSet64> for IncrementMod3 {
    fn apply(&self, values: &BitSet64) -> Result<BitSet64, Error<BitSet64>> {
        Ok(BitSet64::from_values(values.iter().map(|v| (v + 1) % 3)))
    }
}

#[test]
fn fixpoint_of_per_variable_increments_reaches_every_tuple() {
    let mut manager = crate::context::Manager::<BitSet64, &str>::init(crate::context::Config::default()).unwrap();
    let ctx = manager.context_mut();

    let order: Order<&str> = Order::flat(vec!["a", "b", "c"]);
    let var_a = order.variable();
    let var_b = order.next().variable();
    let var_c = order.next().next().variable();

    let seed = chain(&ctx.sdds, &[(var_a, 0), (var_b, 0), (var_c, 0)]);

    let h_a = ctx.homs.function("a", Rc::new(IncrementMod3) as Rc<dyn ValuesFunction<BitSet64>>);
    let h_b = ctx.homs.function("b", Rc::new(IncrementMod3) as Rc<dyn ValuesFunction<BitSet64>>);
    let h_c = ctx.homs.function("c", Rc::new(IncrementMod3) as Rc<dyn ValuesFunction<BitSet64>>);
    let id = ctx.homs.id();
    let body = ctx.homs.sum(vec![h_a, h_b, h_c, id]);
    let h = ctx.homs.fixpoint(body);

    let result = crate::hom::eval::apply(ctx, &order, &h, &seed).unwrap();
    assert_eq!(crate::sdd::count::count(&result), 27u32.into());
}

/// Rewriter correctness (spec.md §8): applying `rewrite(o, h)` to a DD must
/// produce the same result as applying the unrewritten `h` directly, even
/// though the rewritten form runs as a level-local saturation fixpoint
/// instead of a global one.
#[test]
fn rewriting_a_fixpoint_preserves_its_result() {
    let mut manager = crate::context::Manager::<BitSet64, &str>::init(crate::context::Config::default()).unwrap();
    let ctx = manager.context_mut();

    let order: Order<&str> = Order::flat(vec!["a", "b", "c"]);
    let var_a = order.variable();
    let var_b = order.next().variable();
    let var_c = order.next().next().variable();

    let seed = chain(&ctx.sdds, &[(var_a, 0), (var_b, 0), (var_c, 0)]);

    let h_a = ctx.homs.function("a", Rc::new(IncrementMod3) as Rc<dyn ValuesFunction<BitSet64>>);
    let h_b = ctx.homs.function("b", Rc::new(IncrementMod3) as Rc<dyn ValuesFunction<BitSet64>>);
    let h_c = ctx.homs.function("c", Rc::new(IncrementMod3) as Rc<dyn ValuesFunction<BitSet64>>);
    let id = ctx.homs.id();
    let body = ctx.homs.sum(vec![h_a, h_b, h_c, id]);
    let h = ctx.homs.fixpoint(body);

    let rewritten = crate::hom::rewrite::rewrite(&ctx.homs, &order, h.clone());
    assert!(matches!(&*rewritten.0, crate::hom::HomNode::SatFix { .. }));

    let direct = crate::hom::eval::apply(ctx, &order, &h, &seed).unwrap();
    let via_rewrite = crate::hom::eval::apply(ctx, &order, &rewritten, &seed).unwrap();
    assert_eq!(direct, via_rewrite);
    assert_eq!(crate::sdd::count::count(&via_rewrite), 27u32.into());
}

#[test]
fn paths_over_a_union_enumerate_both_branches() {
    let f: SddFactory<BitSet64> = SddFactory::new();
    let mut caches = Caches::new(64);
    let a = Var::new(2);
    let b = Var::new(1);

    let left = f.flat(a, vec![(BitSet64::from_values([0, 1]), f.flat(b, vec![(BitSet64::from_values([0, 1]), f.one())]))]);
    let right = f.flat(a, vec![(BitSet64::from_values([2, 3]), f.flat(b, vec![(BitSet64::from_values([2, 3]), f.one())]))]);
    let combined = crate::sdd::ops::union(&f, &mut caches, &left, &right).unwrap();

    let all: Vec<_> = paths(&combined).collect();
    assert_eq!(all.len(), 2);
}

#[derive(Debug)]
struct GrowZeroIntoOne;

impl ValuesFunction<BitSet64> for GrowZeroIntoOne {
    fn apply(&self, values: &BitSet64) -> Result<BitSet64, Error<BitSet64>> {
        if values.contains(&0) {
            Ok(values.union(&BitSet64::singleton(1)))
        } else {
            Ok(values.clone())
        }
    }
}

/// Regression for spec.md §4.7's non-selector `function` rule: `GrowZeroIntoOne`
/// is neither a selector nor a shifter (it grows `{0}` into `{0, 1}`), so
/// rewriting the arc `({0}, s1)` produces a valuation that overlaps the
/// untouched arc `({1}, s2)`. The two must be split and unioned rather than
/// left as two overlapping alphas on one flat node.
#[test]
fn growing_function_splits_overlapping_valuations_instead_of_duplicating_them() {
    let mut manager = crate::context::Manager::<BitSet64, &str>::init(crate::context::Config::default()).unwrap();
    let ctx = manager.context_mut();

    let order: Order<&str> = Order::flat(vec!["a", "m"]);
    let var_a = order.variable();
    let var_m = order.next().variable();

    let one = ctx.sdds.one();
    let s1 = ctx.sdds.flat(var_m, vec![(BitSet64::singleton(9), one.clone())]);
    let s2 = ctx.sdds.flat(var_m, vec![(BitSet64::singleton(8), one.clone())]);
    let node = ctx.sdds.flat(var_a, vec![(BitSet64::singleton(0), s1.clone()), (BitSet64::singleton(1), s2.clone())]);

    let h = ctx.homs.function("a", Rc::new(GrowZeroIntoOne) as Rc<dyn ValuesFunction<BitSet64>>);
    let result = crate::hom::eval::apply(ctx, &order, &h, &node).unwrap();

    let arcs = result.flat_arcs().expect("result is a flat node");
    for i in 0..arcs.len() {
        for j in (i + 1)..arcs.len() {
            assert!(arcs[i].0.intersection(&arcs[j].0).is_empty(), "overlapping valuations in {arcs:?}");
        }
    }

    let merged = crate::sdd::ops::union(&ctx.sdds, &mut ctx.sdd_caches, &s1, &s2).unwrap();
    let expected = ctx.sdds.flat(var_a, vec![(BitSet64::singleton(0), s1.clone()), (BitSet64::singleton(1), merged)]);
    assert_eq!(result, expected);
}

/// Hierarchical sibling of the test above, for spec.md §4.7's non-selector
/// `local` rule. The body unions an extra key into the nested SDD, so the
/// rewritten arc for `n_a` grows to overlap the untouched arc for `n_b`.
#[test]
fn growing_local_splits_overlapping_nested_valuations_instead_of_duplicating_them() {
    use crate::order::Spec;

    let mut manager = crate::context::Manager::<BitSet64, &str>::init(crate::context::Config::default()).unwrap();
    let ctx = manager.context_mut();

    let order: Order<&str> = Order::from_specs(vec![Spec::hierarchical("x", vec![Spec::var("k")]), Spec::var("m")]);
    let var_x = order.variable();
    let var_k = order.nested().variable();
    let var_m = order.next().variable();

    let one = ctx.sdds.one();
    let n_a = ctx.sdds.flat(var_k, vec![(BitSet64::singleton(0), one.clone())]);
    let n_b = ctx.sdds.flat(var_k, vec![(BitSet64::singleton(1), one.clone())]);
    let s1 = ctx.sdds.flat(var_m, vec![(BitSet64::singleton(9), one.clone())]);
    let s2 = ctx.sdds.flat(var_m, vec![(BitSet64::singleton(8), one.clone())]);
    let node = ctx.sdds.hier(var_x, vec![(n_a.clone(), s1.clone()), (n_b.clone(), s2.clone())]);

    let body = ctx.homs.sum(vec![ctx.homs.id(), ctx.homs.constant(n_b.clone())]);
    assert!(!body.selector());
    let h = ctx.homs.local("x", body);
    let result = crate::hom::eval::apply(ctx, &order, &h, &node).unwrap();

    let arcs = result.hier_arcs().expect("result is a hierarchical node");
    for i in 0..arcs.len() {
        for j in (i + 1)..arcs.len() {
            let overlap = crate::sdd::ops::intersection(&ctx.sdds, &mut ctx.sdd_caches, &arcs[i].0, &arcs[j].0).unwrap();
            assert!(overlap.is_zero(), "overlapping nested valuations in {arcs:?}");
        }
    }

    let merged = crate::sdd::ops::union(&ctx.sdds, &mut ctx.sdd_caches, &s1, &s2).unwrap();
    let expected = ctx.sdds.hier(var_x, vec![(n_a.clone(), s1.clone()), (n_b.clone(), merged)]);
    assert_eq!(result, expected);
}

#[test]
fn incompatible_shapes_raise_top_carrying_both_operands() {
    let f: SddFactory<BitSet64> = SddFactory::new();
    let mut caches = Caches::new(64);
    let x = f.flat(Var::new(1), vec![(BitSet64::singleton(0), f.one())]);
    let y = f.flat(Var::new(2), vec![(BitSet64::singleton(0), f.one())]);
    let err = crate::sdd::ops::difference(&f, &mut caches, &x, &y).unwrap_err();
    match err {
        Error::Top(top) => {
            assert_eq!(top.lhs, x);
            assert_eq!(top.rhs, y);
        }
        other => panic!("expected Top, got {other:?}"),
    }
}

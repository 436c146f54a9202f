//! Arbitrary-precision path counting (spec.md §4.5 "count"), memoized per
//! node so a DAG with exponential path count is still counted in time
//! linear in its node count. Grounded on the `num-bigint`/`num-traits`
//! pairing used by OBDDimal (a sibling BDD engine in the retrieval pack) for
//! exactly this purpose: a decision diagram's represented-set size routinely
//! exceeds `u64`.
use std::collections::HashMap;
use std::rc::Rc;

use num_bigint::BigUint;
use num_traits::Zero;

use crate::sdd::{Sdd, SddNode};
use crate::values::ValueSet;

fn ptr_key<V: ValueSet>(s: &Sdd<V>) -> usize {
    Rc::as_ptr(&s.0) as usize
}

/// Number of tuples represented by `sdd`.
pub fn count<V: ValueSet>(sdd: &Sdd<V>) -> BigUint {
    let mut memo = HashMap::new();
    count_memo(sdd, &mut memo)
}

fn count_memo<V: ValueSet>(sdd: &Sdd<V>, memo: &mut HashMap<usize, BigUint>) -> BigUint {
    if let Some(hit) = memo.get(&ptr_key(sdd)) {
        return hit.clone();
    }
    let result = match &*sdd.0 {
        SddNode::Zero => BigUint::zero(),
        SddNode::One => BigUint::from(1u32),
        SddNode::Flat { arcs, .. } => arcs
            .iter()
            .map(|(val, succ)| BigUint::from(val.size()) * count_memo(succ, memo))
            .fold(BigUint::zero(), |acc, n| acc + n),
        SddNode::Hier { arcs, .. } => arcs
            .iter()
            .map(|(val, succ)| count_memo(val, memo) * count_memo(succ, memo))
            .fold(BigUint::zero(), |acc, n| acc + n),
    };
    memo.insert(ptr_key(sdd), result.clone());
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sdd::SddFactory;
    use crate::test_support::BitSet64;
    use crate::vid::Var;

    #[test]
    fn zero_and_one_count_as_zero_and_one() {
        let f: SddFactory<BitSet64> = SddFactory::new();
        assert_eq!(count(&f.zero()), BigUint::zero());
        assert_eq!(count(&f.one()), BigUint::from(1u32));
    }

    #[test]
    fn flat_count_sums_valuation_sizes() {
        let f: SddFactory<BitSet64> = SddFactory::new();
        let one = f.one();
        let node = f.flat(Var::new(1), vec![(BitSet64::from_values([1, 2, 3]), one)]);
        assert_eq!(count(&node), BigUint::from(3u32));
    }

    #[test]
    fn shared_successors_are_not_double_counted_past_memoization() {
        let f: SddFactory<BitSet64> = SddFactory::new();
        let one = f.one();
        let shared = f.flat(Var::new(1), vec![(BitSet64::singleton(1), one)]);
        let top = f.flat(Var::new(2), vec![(BitSet64::from_values([1, 2]), shared.clone())]);
        assert_eq!(count(&top), BigUint::from(2u32));
    }
}

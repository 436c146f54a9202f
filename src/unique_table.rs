//! Hash-consing: a canonical table mapping a node's structural content to
//! the single live instance of that content, so that structural equality
//! collapses to pointer equality everywhere else in the crate (spec.md §4.2
//! "Unique table"). Grounded on bex's `HiLoCache` (a `DashMap` from hi/lo
//! pairs to canonical `NID`s) adapted to single-threaded `Rc` ownership and
//! weak-reference reclamation, since this crate has no concurrent evaluator
//! to share the table across threads.
use std::cell::RefCell;
use std::hash::Hash;
use std::rc::{Rc, Weak};

use fxhash::FxHashMap;

/// Interns values of type `N`, handing back the single live `Rc<N>` for any
/// structurally-equal value. Entries are held weakly: once every `Rc<N>`
/// clone referring to a value is dropped, the table slot becomes dead and is
/// reclaimed lazily, on the next `intern` call that happens to hash into the
/// same bucket (documented in DESIGN.md as the Open Question resolution for
/// stale-slot cleanup).
pub struct UniqueTable<N: Eq + Hash> {
    table: RefCell<FxHashMap<N, Weak<N>>>,
}

impl<N: Eq + Hash + Clone> UniqueTable<N> {
    pub fn new() -> Self {
        UniqueTable { table: RefCell::new(FxHashMap::default()) }
    }

    /// Pre-size the table's bucket count (spec.md §6 "sdd_unique_table_size"
    /// / "hom_unique_table_size").
    pub fn with_capacity(capacity: usize) -> Self {
        UniqueTable { table: RefCell::new(FxHashMap::with_capacity_and_hasher(capacity, Default::default())) }
    }

    /// Return the canonical `Rc<N>` for `value`, creating and interning a
    /// new one if none is currently live.
    pub fn intern(&self, value: N) -> Rc<N> {
        let mut table = self.table.borrow_mut();
        if let Some(weak) = table.get(&value) {
            if let Some(rc) = weak.upgrade() {
                return rc;
            }
        }
        let capacity_before = table.capacity();
        let rc = Rc::new(value.clone());
        table.insert(value, Rc::downgrade(&rc));
        if table.capacity() > capacity_before {
            log::debug!("unique table grew to {} slots ({} entries)", table.capacity(), table.len());
        }
        rc
    }

    /// Number of live entries, including stale (dead) slots not yet reclaimed.
    pub fn len(&self) -> usize {
        self.table.borrow().len()
    }

    /// Drop every slot whose value is no longer referenced elsewhere.
    pub fn reclaim(&self) {
        let mut table = self.table.borrow_mut();
        let before = table.len();
        table.retain(|_, weak| weak.strong_count() > 0);
        let reclaimed = before - table.len();
        if reclaimed > 0 {
            log::debug!("unique table reclaimed {reclaimed} dead slots ({} remain)", table.len());
        }
    }
}

impl<N: Eq + Hash + Clone> Default for UniqueTable<N> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn interning_returns_the_same_pointer() {
        let table: UniqueTable<i32> = UniqueTable::new();
        let a = table.intern(42);
        let b = table.intern(42);
        assert!(Rc::ptr_eq(&a, &b));
    }

    #[test]
    fn dropping_all_references_allows_reclaiming() {
        let table: UniqueTable<i32> = UniqueTable::new();
        let a = table.intern(7);
        drop(a);
        table.reclaim();
        assert_eq!(table.len(), 0);
    }
}

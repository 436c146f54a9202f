//! The evaluation context: the interning tables, operation caches and
//! pinned terminals shared by every SDD and homomorphism built within one
//! session, plus the process-wide double-init guard that keeps at most one
//! configuration live at a time (spec.md §4.6 "Evaluation context &
//! process-wide state", §6 "Manager / Config"). Grounded on bex's
//! thread-local `GBASE` singleton in `int.rs`, adapted from a global to an
//! owned, `Manager`-scoped value: this crate has no implicit global state
//! outside the one `AtomicBool` that rejects a second concurrent `init`.
use std::sync::atomic::{AtomicBool, Ordering};

use crate::arena::Arena;
use crate::cache::OpCache;
use crate::error::{Error, Result};
use crate::hom::{HomFactory, Homomorphism};
use crate::sdd::ops::Caches as SddCaches;
use crate::sdd::{Sdd, SddFactory};
use crate::values::ValueSet;

/// Tunable sizing for the per-context tables, caches and arena (spec.md §6
/// "configuration", enumerated in full rather than collapsed: each cache and
/// table gets its own knob, matching the documented surface).
#[derive(Clone, Copy, Debug)]
pub struct Config {
    /// Initial bucket count for SDD interning.
    pub sdd_unique_table_size: usize,
    /// Fixed capacity for the union ("sum") cache.
    pub sdd_sum_cache_size: usize,
    /// Fixed capacity for the intersection cache.
    pub sdd_intersection_cache_size: usize,
    /// Fixed capacity for the difference cache.
    pub sdd_difference_cache_size: usize,
    /// Bytes of bump-allocator arena (sizes the scratch-buffer pool).
    pub sdd_arena_size: usize,
    /// Initial buckets for homomorphism interning.
    pub hom_unique_table_size: usize,
    /// Capacity of the homomorphism evaluation cache.
    pub hom_cache_size: usize,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            sdd_unique_table_size: 4096,
            sdd_sum_cache_size: 4096,
            sdd_intersection_cache_size: 4096,
            sdd_difference_cache_size: 4096,
            sdd_arena_size: 4096,
            hom_unique_table_size: 4096,
            hom_cache_size: 4096,
        }
    }
}

/// Everything an evaluation needs: the SDD and homomorphism unique tables
/// (held inside `SddFactory`/`HomFactory`), their operation caches, the
/// scratch-buffer arena, and the pinned `|0|`/`|1|` terminals.
pub struct Context<V: ValueSet, Id: Eq + std::hash::Hash> {
    pub sdds: SddFactory<V>,
    pub homs: HomFactory<V, Id>,
    pub sdd_caches: SddCaches<V>,
    pub hom_cache: OpCache<(Homomorphism<V, Id>, Sdd<V>), Sdd<V>>,
    pub arena: Arena<u8>,
}

impl<V: ValueSet, Id: Eq + std::hash::Hash + Clone> Context<V, Id> {
    fn new(config: &Config) -> Self {
        Context {
            sdds: SddFactory::with_capacity(config.sdd_unique_table_size),
            homs: HomFactory::with_capacity(config.hom_unique_table_size),
            sdd_caches: SddCaches::with_capacities(config.sdd_sum_cache_size, config.sdd_intersection_cache_size, config.sdd_difference_cache_size),
            hom_cache: OpCache::new(config.hom_cache_size),
            arena: Arena::with_capacity(config.sdd_arena_size),
        }
    }

    pub fn zero(&self) -> Sdd<V> {
        self.sdds.zero()
    }

    pub fn one(&self) -> Sdd<V> {
        self.sdds.one()
    }
}

static INITIALIZED: AtomicBool = AtomicBool::new(false);

/// Owns the one live `Context` for a configuration. Only one `Manager` may
/// be alive at a time per process (spec.md §6: "double init is an error");
/// dropping it releases the guard so a later `init` can succeed again.
pub struct Manager<V: ValueSet, Id: Eq + std::hash::Hash> {
    context: Context<V, Id>,
}

impl<V: ValueSet, Id: Eq + std::hash::Hash + Clone> Manager<V, Id> {
    pub fn init(config: Config) -> Result<Self, V> {
        if INITIALIZED.swap(true, Ordering::AcqRel) {
            log::warn!("rejected a second concurrent Manager::init");
            return Err(Error::DoubleInit);
        }
        log::debug!("initialized Manager with {config:?}");
        Ok(Manager { context: Context::new(&config) })
    }

    pub fn context(&self) -> &Context<V, Id> {
        &self.context
    }

    pub fn context_mut(&mut self) -> &mut Context<V, Id> {
        &mut self.context
    }
}

impl<V: ValueSet, Id: Eq + std::hash::Hash> Drop for Manager<V, Id> {
    fn drop(&mut self) {
        INITIALIZED.store(false, Ordering::Release);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::BitSet64;

    #[test]
    fn double_init_is_rejected_until_the_first_is_dropped() {
        let first = Manager::<BitSet64, &str>::init(Config::default()).unwrap();
        let second = Manager::<BitSet64, &str>::init(Config::default());
        assert!(matches!(second, Err(Error::DoubleInit)));
        drop(first);
        let third = Manager::<BitSet64, &str>::init(Config::default());
        assert!(third.is_ok());
    }
}

//! Bump allocator for transient per-operation containers (the arc lists
//! built up while a union/intersection/difference is in progress), with a
//! scope guard that rewinds the arena on drop (spec.md §4.3 "Arena and
//! rewinder"). Grounded on the allocation shape of `sdd::mem::arena` /
//! `sdd::dd::alpha_builder`, adapted to stable Rust: there is no
//! allocator-parameterized `Vec` on stable, so the arena hands out owned
//! `Vec`s from a pool instead of placing them in-band; DESIGN.md records
//! this as a deliberate scope reduction (the arena is implemented and
//! tested standalone, not threaded through every hot-path container).
use std::cell::RefCell;

/// A pool of reusable `Vec<T>` buffers. `checkout` hands one out (new or
/// recycled); dropping the returned `Checkout` rewinds it back into the
/// pool, truncated to empty, ready for the next caller.
pub struct Arena<T> {
    pool: RefCell<Vec<Vec<T>>>,
}

impl<T> Arena<T> {
    pub fn new() -> Self {
        Arena { pool: RefCell::new(Vec::new()) }
    }

    /// Reserve room for `capacity` pooled buffers up front (spec.md §6
    /// "sdd_arena_size").
    pub fn with_capacity(capacity: usize) -> Self {
        Arena { pool: RefCell::new(Vec::with_capacity(capacity)) }
    }

    pub fn checkout(&self) -> Checkout<'_, T> {
        let buf = self.pool.borrow_mut().pop().unwrap_or_default();
        Checkout { arena: self, buf: Some(buf) }
    }

    /// Number of buffers currently idle in the pool.
    pub fn idle(&self) -> usize {
        self.pool.borrow().len()
    }
}

impl<T> Default for Arena<T> {
    fn default() -> Self {
        Self::new()
    }
}

/// A scoped loan of a buffer from an `Arena`. Rewinds (returns the emptied
/// buffer to the pool) when dropped.
pub struct Checkout<'a, T> {
    arena: &'a Arena<T>,
    buf: Option<Vec<T>>,
}

impl<'a, T> std::ops::Deref for Checkout<'a, T> {
    type Target = Vec<T>;
    fn deref(&self) -> &Vec<T> {
        self.buf.as_ref().expect("buffer taken before drop")
    }
}

impl<'a, T> std::ops::DerefMut for Checkout<'a, T> {
    fn deref_mut(&mut self) -> &mut Vec<T> {
        self.buf.as_mut().expect("buffer taken before drop")
    }
}

impl<'a, T> Drop for Checkout<'a, T> {
    fn drop(&mut self) {
        if let Some(mut buf) = self.buf.take() {
            buf.clear();
            self.arena.pool.borrow_mut().push(buf);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rewind_returns_buffer_to_pool() {
        let arena: Arena<u32> = Arena::new();
        {
            let mut buf = arena.checkout();
            buf.push(1);
            buf.push(2);
        }
        assert_eq!(arena.idle(), 1);
        let buf = arena.checkout();
        assert!(buf.is_empty());
    }

    #[test]
    fn concurrent_checkouts_do_not_share_storage() {
        let arena: Arena<u32> = Arena::new();
        let mut a = arena.checkout();
        let mut b = arena.checkout();
        a.push(1);
        b.push(2);
        assert_eq!(*a, vec![1]);
        assert_eq!(*b, vec![2]);
    }
}

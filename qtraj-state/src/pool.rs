//! Shape-keyed arena of reusable state buffers
//!
//! ODE steps and unraveling methods need a handful of scratch states per
//! evaluation. Allocating those on the heap every step dominates the cost
//! of small systems, so solvers draw them from a [`StatePool`] instead: a
//! free list of previously allocated buffers, handed out as RAII leases
//! that return the buffer on drop.

use crate::state::State;
use std::cell::RefCell;
use std::ops::{Deref, DerefMut};
use std::rc::Rc;

/// An arena of reusable [`State`] buffers
///
/// `allocate_similar` hands out a buffer matching the reference shape,
/// reusing a pooled one when its total dimension fits and allocating fresh
/// otherwise. The returned [`PooledState`] guard owns the buffer
/// exclusively until it is dropped, at which point the buffer rejoins the
/// free list.
///
/// The pool is cheaply cloneable (clones share the same free list) and
/// deliberately single-threaded: each worker evolving trajectories in
/// parallel owns its own pool.
///
/// # Example
///
/// ```
/// use qtraj_state::{State, StatePool};
///
/// let pool = StatePool::new();
/// let reference = State::basis(&[2, 2], 0).unwrap();
///
/// let mut tmp = pool.allocate_similar(&reference);
/// tmp.assign(&reference);
/// drop(tmp); // buffer returns to the pool
///
/// let again = pool.allocate_similar(&reference); // reuses the buffer
/// assert_eq!(again.total(), 4);
/// ```
#[derive(Clone, Default)]
pub struct StatePool {
    free: Rc<RefCell<Vec<State>>>,
}

impl StatePool {
    /// Create an empty pool
    pub fn new() -> Self {
        Self::default()
    }

    /// Pre-populate the pool with `n` buffers shaped like `reference`
    pub fn reserve(&self, n: usize, reference: &State) {
        let mut free = self.free.borrow_mut();
        for _ in 0..n {
            let mut s = State::basis(&[1], 0).expect("unit state");
            s.make_similar(reference);
            free.push(s);
        }
    }

    /// Number of buffers currently idle in the pool
    pub fn idle(&self) -> usize {
        self.free.borrow().len()
    }

    /// Lease a buffer shaped like `reference`
    ///
    /// Prefers a pooled buffer whose total dimension matches (reshaping its
    /// metadata if the freedom split differs); allocates a fresh buffer
    /// when none fits. Amplitude contents are unspecified; callers
    /// overwrite before reading.
    pub fn allocate_similar(&self, reference: &State) -> PooledState {
        let mut state = {
            let mut free = self.free.borrow_mut();
            match free.iter().position(|s| s.total() == reference.total()) {
                Some(i) => free.swap_remove(i),
                None => {
                    let mut s = State::basis(&[1], 0).expect("unit state");
                    s.make_similar(reference);
                    s
                }
            }
        };
        if state.dims() != reference.dims() {
            state.make_similar(reference);
        }

        PooledState {
            pool: Rc::clone(&self.free),
            state: Some(state),
        }
    }
}

/// RAII lease on a pooled state buffer
///
/// Dereferences to [`State`]; the buffer returns to its pool when the
/// guard drops.
pub struct PooledState {
    pool: Rc<RefCell<Vec<State>>>,
    state: Option<State>,
}

impl Deref for PooledState {
    type Target = State;

    #[inline]
    fn deref(&self) -> &State {
        self.state.as_ref().expect("pooled state taken")
    }
}

impl DerefMut for PooledState {
    #[inline]
    fn deref_mut(&mut self) -> &mut State {
        self.state.as_mut().expect("pooled state taken")
    }
}

impl Drop for PooledState {
    fn drop(&mut self) {
        if let Some(state) = self.state.take() {
            self.pool.borrow_mut().push(state);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_allocate_and_recycle() {
        let pool = StatePool::new();
        let reference = State::basis(&[2, 2], 0).unwrap();

        assert_eq!(pool.idle(), 0);
        {
            let a = pool.allocate_similar(&reference);
            assert_eq!(a.total(), 4);
            assert_eq!(a.dims(), &[2, 2]);
        }
        assert_eq!(pool.idle(), 1);

        // Reuse: no growth of the free list while a lease is out
        {
            let _a = pool.allocate_similar(&reference);
            assert_eq!(pool.idle(), 0);
        }
        assert_eq!(pool.idle(), 1);
    }

    #[test]
    fn test_live_guards_never_alias() {
        let pool = StatePool::new();
        let reference = State::basis(&[2], 0).unwrap();

        let mut a = pool.allocate_similar(&reference);
        let mut b = pool.allocate_similar(&reference);

        a.fill(num_complex::Complex64::new(1.0, 0.0));
        b.fill(num_complex::Complex64::new(2.0, 0.0));
        assert_ne!(a.amplitudes(), b.amplitudes());
    }

    #[test]
    fn test_reserve() {
        let pool = StatePool::new();
        let reference = State::basis(&[2, 2, 2], 0).unwrap();
        pool.reserve(3, &reference);
        assert_eq!(pool.idle(), 3);
    }

    #[test]
    fn test_mismatched_shape_reshapes() {
        let pool = StatePool::new();
        let a = State::basis(&[2, 2], 0).unwrap();
        let b = State::basis(&[4], 0).unwrap();

        drop(pool.allocate_similar(&a));
        // Same total dimension, different freedom split: buffer is reused
        // but reshaped.
        let lease = pool.allocate_similar(&b);
        assert_eq!(lease.dims(), &[4]);
    }

    #[test]
    fn test_shared_free_list_across_clones() {
        let pool = StatePool::new();
        let reference = State::basis(&[2], 0).unwrap();
        let clone = pool.clone();

        drop(pool.allocate_similar(&reference));
        assert_eq!(clone.idle(), 1);
    }
}

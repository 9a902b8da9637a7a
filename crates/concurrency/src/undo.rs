//! Undo buffer with optimistic updates
//!
//! An [`UndoBuffer`] holds the current value plus undo and redo stacks behind
//! one lock. The lock is only held to read or commit, never while caller code
//! runs:
//!
//! 1. [`UndoBuffer::update`] snapshots the current value and its generation
//! 2. The update function runs on the snapshot, outside the lock
//! 3. The result commits only if the generation is unchanged, otherwise the
//!    update starts over from the new value
//!
//! Every commit, undo and redo bumps the generation, so an update computed
//! from a stale value can never overwrite a newer one.
//!
//! The buffer is an ordinary owned value; share it with `Arc` where needed.

use std::collections::VecDeque;

use parking_lot::Mutex;
use tracing::debug;

/// Undo entries kept when no depth is given
pub const DEFAULT_UNDO_DEPTH: usize = 100;

struct UndoState<T> {
    current: T,
    undo: VecDeque<T>,
    redo: Vec<T>,
    generation: u64,
}

impl<T: PartialEq> UndoState<T> {
    fn commit(&mut self, next: T, depth: usize) -> bool {
        if next == self.current {
            return false;
        }
        let previous = std::mem::replace(&mut self.current, next);
        self.undo.push_back(previous);
        if depth > 0 && self.undo.len() > depth {
            self.undo.pop_front();
        }
        self.redo.clear();
        self.generation += 1;
        true
    }
}

/// Current value with bounded undo/redo history
pub struct UndoBuffer<T> {
    state: Mutex<UndoState<T>>,
    depth: usize,
}

impl<T> UndoBuffer<T>
where
    T: Clone + PartialEq,
{
    /// Buffer holding `initial` with the default history depth
    pub fn new(initial: T) -> Self {
        Self::with_depth(initial, DEFAULT_UNDO_DEPTH)
    }

    /// Buffer keeping at most `depth` undo entries (0 = unbounded)
    pub fn with_depth(initial: T, depth: usize) -> Self {
        UndoBuffer {
            state: Mutex::new(UndoState {
                current: initial,
                undo: VecDeque::new(),
                redo: Vec::new(),
                generation: 0,
            }),
            depth,
        }
    }

    /// The current value
    pub fn get(&self) -> T {
        self.state.lock().current.clone()
    }

    /// Replace the current value
    ///
    /// Returns `false` (and records nothing) if `value` equals the current one.
    pub fn set(&self, value: T) -> bool {
        self.state.lock().commit(value, self.depth)
    }

    /// Apply `f` to the current value with compare-and-swap semantics
    ///
    /// `f` may run more than once under contention and must not have side
    /// effects beyond computing its result. Returns the value committed (or
    /// the unchanged current value when `f` returns an equal one).
    pub fn update<F>(&self, mut f: F) -> T
    where
        F: FnMut(&T) -> T,
    {
        let mut retries = 0u32;
        loop {
            let (snapshot, generation) = {
                let state = self.state.lock();
                (state.current.clone(), state.generation)
            };

            let next = f(&snapshot);

            let mut state = self.state.lock();
            if state.generation != generation {
                retries += 1;
                debug!(target: "modelbase::undo", retries, "Value changed during update, retrying");
                continue;
            }
            state.commit(next, self.depth);
            return state.current.clone();
        }
    }

    /// Step back one change; `false` if there is nothing to undo
    pub fn undo(&self) -> bool {
        let mut state = self.state.lock();
        let Some(previous) = state.undo.pop_back() else {
            return false;
        };
        let current = std::mem::replace(&mut state.current, previous);
        state.redo.push(current);
        state.generation += 1;
        true
    }

    /// Re-apply the last undone change; `false` if there is nothing to redo
    pub fn redo(&self) -> bool {
        let mut state = self.state.lock();
        let Some(next) = state.redo.pop() else {
            return false;
        };
        let current = std::mem::replace(&mut state.current, next);
        state.undo.push_back(current);
        if self.depth > 0 && state.undo.len() > self.depth {
            state.undo.pop_front();
        }
        state.generation += 1;
        true
    }

    /// Check if there is a change to undo
    pub fn can_undo(&self) -> bool {
        !self.state.lock().undo.is_empty()
    }

    /// Check if there is a change to redo
    pub fn can_redo(&self) -> bool {
        !self.state.lock().redo.is_empty()
    }

    /// Number of entries on the undo stack
    pub fn undo_len(&self) -> usize {
        self.state.lock().undo.len()
    }

    /// Drop both history stacks, keeping the current value
    pub fn clear_history(&self) {
        let mut state = self.state.lock();
        state.undo.clear();
        state.redo.clear();
    }

    /// Maximum undo entries kept (0 = unbounded)
    pub fn depth(&self) -> usize {
        self.depth
    }
}

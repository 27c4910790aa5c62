//! Fixed-capacity FIFO backed by a preallocated slot array.
//!
//! Producer and consumer are phases of the same single-threaded poll cycle, so
//! the ring is a plain value with head/tail/count indices and no
//! synchronisation. On overflow the newest entry is refused; entries already
//! buffered are never evicted and keep their arrival order.
use crate::error::RingFull;

//==================================================================================Enums and Structs

/// Bounded FIFO ring of `N` slots.
#[derive(Debug, Clone)]
pub struct BoundedRing<T, const N: usize> {
    slots: [Option<T>; N],
    /// Next slot written by `push`.
    head: usize,
    /// Next slot read by `pop`.
    tail: usize,
    count: usize,
}

impl<T, const N: usize> Default for BoundedRing<T, N> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T, const N: usize> BoundedRing<T, N> {
    /// Create an empty ring; every slot is allocated up front.
    pub fn new() -> Self {
        Self {
            slots: core::array::from_fn(|_| None),
            head: 0,
            tail: 0,
            count: 0,
        }
    }

    #[inline]
    pub const fn capacity(&self) -> usize {
        N
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.count
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    #[inline]
    pub fn is_full(&self) -> bool {
        self.count == N
    }

    //==================================================================================Producer
    /// Append `item` at the back.
    ///
    /// When the ring is full the item is dropped and `RingFull` returned;
    /// the buffered entries are left untouched.
    pub fn push(&mut self, item: T) -> Result<(), RingFull> {
        if self.is_full() {
            return Err(RingFull);
        }
        self.slots[self.head] = Some(item);
        self.head = (self.head + 1) % N;
        self.count += 1;
        Ok(())
    }

    //==================================================================================Consumer
    /// Remove and return the oldest entry.
    pub fn pop(&mut self) -> Option<T> {
        if self.is_empty() {
            return None;
        }
        let item = self.slots[self.tail].take();
        self.tail = (self.tail + 1) % N;
        self.count -= 1;
        item
    }

    /// Oldest entry, left in place.
    pub fn peek(&self) -> Option<&T> {
        if self.is_empty() {
            return None;
        }
        self.slots[self.tail].as_ref()
    }

    /// Drop every entry and rewind the indices.
    pub fn clear(&mut self) {
        for slot in self.slots.iter_mut() {
            *slot = None;
        }
        self.head = 0;
        self.tail = 0;
        self.count = 0;
    }

    /// Entries from oldest to newest.
    pub fn iter(&self) -> impl Iterator<Item = &T> + '_ {
        (0..self.count).filter_map(move |offset| self.slots[(self.tail + offset) % N].as_ref())
    }
}

//! Fixed-capacity ring buffer with signed, relative indexing.
//!
//! `SBuffer<T, N>` holds `N` slots addressed relative to a moving head:
//! `buf[0]` is the current slot, `buf[-1]` the previous one, `buf[1]` the
//! next one (indices are taken modulo `N`). `rotate()` advances the head so
//! that the old `buf[0]` becomes `buf[-1]`; the slot falling off the back is
//! recycled as the new front.

use std::ops::{Index, IndexMut};

#[derive(Clone, Debug)]
pub struct SBuffer<T, const N: usize> {
    data: [T; N],
    head: usize,
}

impl<T, const N: usize> SBuffer<T, N> {
    pub fn from_array(data: [T; N]) -> Self {
        Self { data, head: 0 }
    }

    #[inline]
    fn slot(&self, i: isize) -> usize {
        (self.head as isize + i).rem_euclid(N as isize) as usize
    }

    pub fn rotate(&mut self) {
        self.head = (self.head + 1) % N;
    }

    /// Mutable borrows of two distinct slots at once.
    pub fn pair_mut(&mut self, a: isize, b: isize) -> (&mut T, &mut T) {
        let (ia, ib) = (self.slot(a), self.slot(b));
        assert_ne!(ia, ib, "SBuffer::pair_mut: slots alias");
        if ia < ib {
            let (lo, hi) = self.data.split_at_mut(ib);
            (&mut lo[ia], &mut hi[0])
        } else {
            let (lo, hi) = self.data.split_at_mut(ia);
            (&mut hi[0], &mut lo[ib])
        }
    }
}

impl<T: Clone, const N: usize> SBuffer<T, N> {
    pub fn filled(v: T) -> Self {
        Self { data: std::array::from_fn(|_| v.clone()), head: 0 }
    }
}

impl<T, const N: usize> Index<isize> for SBuffer<T, N> {
    type Output = T;
    fn index(&self, i: isize) -> &T {
        &self.data[self.slot(i)]
    }
}

impl<T, const N: usize> IndexMut<isize> for SBuffer<T, N> {
    fn index_mut(&mut self, i: isize) -> &mut T {
        let k = self.slot(i);
        &mut self.data[k]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rotate_shifts_window() {
        let mut b = SBuffer::from_array([10, 20, 30]);
        assert_eq!((b[-1], b[0], b[1]), (30, 10, 20));
        b.rotate();
        assert_eq!((b[-1], b[0], b[1]), (10, 20, 30));
        b[1] = 40;
        b.rotate();
        assert_eq!((b[-2], b[-1], b[0]), (10, 20, 40));
    }

    #[test]
    fn pair_mut_borrows_two_slots() {
        let mut b = SBuffer::from_array([1, 2]);
        let (x, y) = b.pair_mut(0, -1);
        std::mem::swap(x, y);
        assert_eq!((b[0], b[-1]), (2, 1));
    }
}

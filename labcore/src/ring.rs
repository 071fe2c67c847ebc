// -*- coding: utf-8 -*-
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Single producer, single consumer byte ring.
//!
//! The producer only ever writes `wr` and the consumer only ever writes `rd`.
//! Both indices are free running 16 bit counters.
//! The fill level is `wr - rd` in wrapping arithmetic
//! and the storage slot is `index & (SIZE - 1)`.
//!
//! The unchecked operations do not test their precondition.
//! Pushing into a full ring overwrites unread data
//! and popping from an empty ring moves `rd` past `wr`.
//! Check [Producer::is_full] or [Consumer::is_empty] first,
//! or use the checked variants.

use portable_atomic::{AtomicU8, AtomicU16, Ordering};

macro_rules! ring_assert {
    ($cond:expr, $msg:literal) => {
        #[cfg(feature = "debug-asserts")]
        assert!($cond, $msg);
    };
}

pub struct Ring<const SIZE: usize> {
    buf: [AtomicU8; SIZE],
    wr: AtomicU16,
    rd: AtomicU16,
}

impl<const SIZE: usize> Ring<SIZE> {
    const MASK: u16 = {
        assert!(SIZE.is_power_of_two(), "Ring size must be a power of two");
        assert!(SIZE <= 0x8000, "Ring size must fit the 16 bit index");
        (SIZE - 1) as u16
    };

    pub const fn new() -> Self {
        let _ = Self::MASK;
        Self {
            buf: [const { AtomicU8::new(0) }; SIZE],
            wr: AtomicU16::new(0),
            rd: AtomicU16::new(0),
        }
    }

    /// Drop all content and start over at index 0.
    pub fn reset(&mut self) {
        *self.wr.get_mut() = 0;
        *self.rd.get_mut() = 0;
    }

    #[inline]
    pub const fn capacity(&self) -> usize {
        SIZE
    }

    #[inline]
    pub fn len(&self) -> usize {
        let rd = self.rd.load(Ordering::Acquire);
        let wr = self.wr.load(Ordering::Acquire);
        wr.wrapping_sub(rd) as usize
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    #[inline]
    pub fn is_full(&self) -> bool {
        self.len() >= SIZE
    }

    /// Split the ring into its two ends.
    ///
    /// The exclusive borrow guarantees that there is only one of each.
    pub fn split(&mut self) -> (Producer<'_, SIZE>, Consumer<'_, SIZE>) {
        let ring: &Self = self;
        (ring.producer(), ring.consumer())
    }

    /// Writing end of a ring that cannot be borrowed mutably, e.g. a `static`.
    ///
    /// The caller ties each end to a single execution context.
    /// Violating that breaks FIFO order, but not memory safety.
    #[inline(always)]
    pub(crate) fn producer(&self) -> Producer<'_, SIZE> {
        Producer { ring: self }
    }

    /// See [Self::producer].
    #[inline(always)]
    pub(crate) fn consumer(&self) -> Consumer<'_, SIZE> {
        Consumer { ring: self }
    }

    #[inline(always)]
    fn slot(&self, index: u16) -> &AtomicU8 {
        &self.buf[(index & Self::MASK) as usize]
    }
}

impl<const SIZE: usize> Default for Ring<SIZE> {
    fn default() -> Self {
        Self::new()
    }
}

/// The writing end. Owns the `wr` index.
pub struct Producer<'a, const SIZE: usize> {
    ring: &'a Ring<SIZE>,
}

impl<const SIZE: usize> Producer<'_, SIZE> {
    #[inline]
    pub fn len(&self) -> usize {
        self.ring.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.ring.is_empty()
    }

    #[inline]
    pub fn is_full(&self) -> bool {
        self.ring.is_full()
    }

    #[inline]
    pub const fn capacity(&self) -> usize {
        SIZE
    }

    /// Store `value` at the write index.
    ///
    /// Precondition: the ring is not full.
    #[inline]
    pub fn push_unchecked(&mut self, value: u8) {
        ring_assert!(!self.is_full(), "push on full ring");
        let wr = self.ring.wr.load(Ordering::Relaxed);
        self.ring.slot(wr).store(value, Ordering::Relaxed);
        self.ring.wr.store(wr.wrapping_add(1), Ordering::Release);
    }

    /// Store `value`, if there is room.
    #[inline]
    pub fn push(&mut self, value: u8) -> bool {
        if self.is_full() {
            false
        } else {
            self.push_unchecked(value);
            true
        }
    }

    /// Take back the most recently pushed byte.
    ///
    /// Precondition: the ring is not empty.
    ///
    /// This is the one operation that moves `wr` backwards.
    /// If it can run between a consumer's [Consumer::is_empty] check and its
    /// [Consumer::pop_unchecked], `rd` ends up ahead of `wr`.
    /// A consumer that shares the ring with an unpushing producer
    /// must therefore check and pop inside of a critical section.
    #[inline]
    pub fn unpush_unchecked(&mut self) -> u8 {
        ring_assert!(!self.is_empty(), "unpush on empty ring");
        let wr = self.ring.wr.load(Ordering::Relaxed).wrapping_sub(1);
        self.ring.wr.store(wr, Ordering::Release);
        self.ring.slot(wr).load(Ordering::Relaxed)
    }

    #[inline]
    pub fn unpush(&mut self) -> Option<u8> {
        if self.is_empty() {
            None
        } else {
            Some(self.unpush_unchecked())
        }
    }
}

/// The reading end. Owns the `rd` index.
pub struct Consumer<'a, const SIZE: usize> {
    ring: &'a Ring<SIZE>,
}

impl<const SIZE: usize> Consumer<'_, SIZE> {
    #[inline]
    pub fn len(&self) -> usize {
        self.ring.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.ring.is_empty()
    }

    #[inline]
    pub fn is_full(&self) -> bool {
        self.ring.is_full()
    }

    #[inline]
    pub const fn capacity(&self) -> usize {
        SIZE
    }

    /// Remove the byte at the read index.
    ///
    /// Precondition: the ring is not empty.
    #[inline]
    pub fn pop_unchecked(&mut self) -> u8 {
        ring_assert!(!self.is_empty(), "pop on empty ring");
        let rd = self.ring.rd.load(Ordering::Relaxed);
        let value = self.ring.slot(rd).load(Ordering::Relaxed);
        self.ring.rd.store(rd.wrapping_add(1), Ordering::Release);
        value
    }

    #[inline]
    pub fn pop(&mut self) -> Option<u8> {
        if self.is_empty() {
            None
        } else {
            Some(self.pop_unchecked())
        }
    }

    /// Look at the byte `offset` positions after the read index
    /// without consuming anything.
    ///
    /// Only offsets below [Self::len] refer to unread data.
    #[inline]
    pub fn peek_at(&self, offset: usize) -> u8 {
        let rd = self.ring.rd.load(Ordering::Relaxed);
        self.ring.slot(rd.wrapping_add(offset as u16)).load(Ordering::Relaxed)
    }

    /// Iterate over the unread bytes without consuming them.
    pub fn iter(&self) -> impl Iterator<Item = u8> + '_ {
        (0..self.len()).map(move |i| self.peek_at(i))
    }

    /// Discard everything, including bytes that arrive while draining.
    pub fn clear(&mut self) {
        while !self.is_empty() {
            self.pop_unchecked();
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_scenario_capacity_4() {
        let mut ring = Ring::<4>::new();
        let (mut p, mut c) = ring.split();

        assert!(p.push(b'A'));
        assert!(p.push(b'B'));
        assert!(p.push(b'C'));
        assert_eq!(c.len(), 3);
        assert!(!c.is_full());

        assert_eq!(c.pop(), Some(b'A'));
        assert_eq!(c.len(), 2);

        assert!(p.push(b'D'));
        assert!(p.push(b'E'));
        assert!(p.is_full());
        assert_eq!(p.len(), 4);
        assert!(!p.push(b'F'));

        assert_eq!(c.pop(), Some(b'B'));
        assert_eq!(c.pop(), Some(b'C'));
        assert_eq!(c.pop(), Some(b'D'));
        assert_eq!(c.pop(), Some(b'E'));
        assert_eq!(c.pop(), None);
    }

    #[test]
    fn test_fifo_order() {
        let mut ring = Ring::<16>::new();
        let (mut p, mut c) = ring.split();
        let data = b"hello, ring!";
        for &b in data {
            p.push_unchecked(b);
        }
        assert_eq!(c.len(), data.len());
        for &b in data {
            assert_eq!(c.pop_unchecked(), b);
        }
        assert!(c.is_empty());
    }

    #[test]
    fn test_full_empty_exclusive() {
        let mut ring = Ring::<2>::new();
        let (mut p, mut c) = ring.split();
        assert!(c.is_empty() && !c.is_full());
        p.push_unchecked(1);
        assert!(!c.is_empty() && !c.is_full());
        p.push_unchecked(2);
        assert!(!c.is_empty() && c.is_full());
        c.pop_unchecked();
        c.pop_unchecked();
        assert!(c.is_empty() && !c.is_full());
    }

    #[test]
    fn test_unpush_restores_state() {
        let mut ring = Ring::<8>::new();
        let (mut p, mut c) = ring.split();
        p.push_unchecked(b'x');
        p.push_unchecked(b'y');
        let before = p.len();

        p.push_unchecked(b'z');
        assert_eq!(p.unpush_unchecked(), b'z');
        assert_eq!(p.len(), before);

        assert_eq!(c.pop(), Some(b'x'));
        assert_eq!(c.pop(), Some(b'y'));
        assert_eq!(c.pop(), None);
        assert_eq!(p.unpush(), None);
    }

    #[test]
    fn test_wraparound() {
        let mut ring = Ring::<8>::new();
        {
            let (mut p, mut c) = ring.split();
            for i in 0..8 {
                p.push_unchecked(i);
            }
            for i in 0..8 {
                assert_eq!(c.pop_unchecked(), i);
            }
            assert!(c.is_empty());
            p.push_unchecked(0xAA);
        }
        assert_eq!(ring.wr.load(Ordering::Relaxed), 9);
        assert_eq!(ring.buf[0].load(Ordering::Relaxed), 0xAA);
        assert_eq!(ring.len(), 1);
    }

    #[test]
    fn test_index_overflow() {
        let mut ring = Ring::<4>::new();
        *ring.wr.get_mut() = 0xFFFE;
        *ring.rd.get_mut() = 0xFFFE;
        let (mut p, mut c) = ring.split();
        for b in 1..=4 {
            p.push_unchecked(b);
        }
        // wr wrapped to 2, rd still at 0xFFFE.
        assert!(p.is_full());
        for b in 1..=4 {
            assert_eq!(c.pop_unchecked(), b);
        }
        assert!(c.is_empty());
    }

    #[test]
    fn test_peek_and_clear() {
        let mut ring = Ring::<8>::new();
        let (mut p, mut c) = ring.split();
        for &b in b"abc" {
            p.push_unchecked(b);
        }
        assert_eq!(c.peek_at(0), b'a');
        assert_eq!(c.peek_at(2), b'c');
        assert_eq!(c.len(), 3);
        assert!(c.iter().eq(b"abc".iter().copied()));
        c.clear();
        assert!(c.is_empty());
    }

    #[test]
    fn test_reset() {
        let mut ring = Ring::<4>::new();
        {
            let (mut p, _c) = ring.split();
            p.push_unchecked(1);
            p.push_unchecked(2);
        }
        ring.reset();
        assert!(ring.is_empty());
        assert_eq!(ring.capacity(), 4);
    }

    #[cfg(not(feature = "debug-asserts"))]
    #[test]
    fn test_pop_empty_corrupts_length() {
        let mut ring = Ring::<4>::new();
        let (_p, mut c) = ring.split();
        c.pop_unchecked();
        // rd is now ahead of wr.
        assert_eq!(c.len(), 0xFFFF);
        assert!(c.is_full());
    }

    #[cfg(feature = "debug-asserts")]
    #[test]
    #[should_panic(expected = "push on full ring")]
    fn test_push_full_asserts() {
        let mut ring = Ring::<1>::new();
        let (mut p, _c) = ring.split();
        p.push_unchecked(1);
        p.push_unchecked(2);
    }

    proptest! {
        #[test]
        fn prop_len_is_pushes_minus_pops(ops in proptest::collection::vec(any::<bool>(), 0..200)) {
            let mut ring = Ring::<16>::new();
            let (mut p, mut c) = ring.split();
            let mut pushed = 0_usize;
            let mut popped = 0_usize;
            for push in ops {
                if push && !p.is_full() {
                    p.push_unchecked(pushed as u8);
                    pushed += 1;
                } else if !push && !c.is_empty() {
                    prop_assert_eq!(c.pop_unchecked(), popped as u8);
                    popped += 1;
                }
                prop_assert_eq!(c.len(), pushed - popped);
                prop_assert_eq!(c.is_full(), c.len() == 16);
                prop_assert_eq!(c.is_empty(), c.len() == 0);
            }
        }
    }
}

// vim: ts=4 sw=4 expandtab

// -*- coding: utf-8 -*-
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Two channel quadrature decoder.
//!
//! The pin change interrupt samples both channels and feeds them to
//! [QuadDecoder::update]. One valid transition moves the count by one.
//! A sample where both channels changed at once cannot be decoded.
//! It leaves the count alone and latches the error flag.

use crate::{
    mutex::{IrqCtx, Mutex, free},
    periph::Encoder,
};
use core::cell::Cell;

/// Count delta, indexed by `prev << 2 | new` with `state = a << 1 | b`.
/// Forward is 00 -> 01 -> 11 -> 10 -> 00.
const STEP: [i8; 16] = [
    0, 1, -1, 0, //
    -1, 0, 0, 1, //
    1, 0, 0, -1, //
    0, -1, 1, 0, //
];

#[inline]
fn is_double_step(prev: u8, new: u8) -> bool {
    prev ^ new == 0b11
}

#[inline]
fn state(a: bool, b: bool) -> u8 {
    ((a as u8) << 1) | b as u8
}

pub struct QuadDecoder {
    state: Mutex<Cell<u8>>,
    count: Mutex<Cell<i32>>,
    error: Mutex<Cell<bool>>,
}

impl QuadDecoder {
    pub const fn new() -> Self {
        Self {
            state: Mutex::new(Cell::new(0)),
            count: Mutex::new(Cell::new(0)),
            error: Mutex::new(Cell::new(false)),
        }
    }

    /// Take the initial pin state without counting.
    pub fn init(&self, a: bool, b: bool) {
        free(|cs| self.state.borrow(cs).set(state(a, b)));
    }

    /// Pin change interrupt handler body.
    pub fn update(&self, c: &IrqCtx<'_>, a: bool, b: bool) {
        let cs = c.cs();
        let new = state(a, b);
        let prev = self.state.borrow(cs).replace(new);
        if is_double_step(prev, new) {
            self.error.borrow(cs).set(true);
        } else {
            let count = self.count.borrow(cs);
            let delta = STEP[((prev << 2) | new) as usize];
            count.set(count.get().wrapping_add(delta as i32));
        }
    }

    pub fn set_count(&self, count: i32) {
        free(|cs| self.count.borrow(cs).set(count));
    }
}

impl Default for QuadDecoder {
    fn default() -> Self {
        Self::new()
    }
}

impl Encoder for QuadDecoder {
    fn count(&self) -> i32 {
        free(|cs| self.count.borrow(cs).get())
    }

    fn check_error(&self) -> bool {
        free(|cs| self.error.borrow(cs).replace(false))
    }
}


// vim: ts=4 sw=4 expandtab

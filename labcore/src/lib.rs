// -*- coding: utf-8 -*-
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Scheduler, serial rings and control helpers for the Orangutan SVP labs.
//!
//! The crate is hardware independent. The firmware binds the traits
//! [timer::TimerHw], [serial::UsartHw], [periph::DigitalOut], [periph::Motor]
//! and [periph::Encoder] to the real peripherals.

#![cfg_attr(not(test), no_std)]

pub mod debug;
pub mod encoder;
pub mod fixpt;
pub mod line;
pub mod mutex;
pub mod pd;
pub mod periph;
pub mod ring;
pub mod sched;
pub mod serial;
pub mod timer;

pub use crate::{
    debug::Debug,
    mutex::{IrqCtx, IrqGuard, MainCtx},
    ring::Ring,
    sched::{Channel, Release, Scheduler},
};

// vim: ts=4 sw=4 expandtab

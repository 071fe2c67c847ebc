// -*- coding: utf-8 -*-
// SPDX-License-Identifier: Apache-2.0 OR MIT

use labcore::{fixpt, pd::PdParams};

/// CPU clock of the Orangutan SVP.
pub const F_CPU: u32 = 20_000_000;

pub const BAUD: u32 = 9600;

pub const RX_SIZE: usize = 64;
pub const TX_SIZE: usize = 64;

/// Red LED: TC0 ticks, toggled by `main()`.
pub const RED_TICK_HZ: u32 = 1000;
pub const RED_PERIOD_MS: u32 = 1000;

/// Yellow LED on OC1A: toggled by the TC1 compare match in hardware.
/// Green LED: toggled from the TC1 interrupt.
pub const BLINK_TICK_HZ: u32 = 10;
pub const GREEN_PERIOD_MS: u32 = 500;

/// Motor control loop on TC3.
pub const CONTROL_TICK_HZ: u32 = 1000;
pub const CONTROL_PERIOD_MS: u32 = 10;

pub const PD_PARAMS: PdParams = PdParams {
    kp: fixpt!(5 / 2),
    kd: fixpt!(1),
};

/// The motor swings between -TRAVEL and +TRAVEL encoder counts.
pub const TRAVEL: i32 = 64;
/// Distance to the target at which the direction flips.
pub const TRAVEL_HYST: i32 = 8;

// vim: ts=4 sw=4 expandtab

// -*- coding: utf-8 -*-
// SPDX-License-Identifier: Apache-2.0 OR MIT

#![allow(unused_unsafe)]

use crate::{
    hw::{interrupt, mcu},
    mutex::MainInitCtx,
};
use labcore::periph::DigitalOut;

/// An LED on port C. Active high.
///
/// Port C is shared with the motor direction pin.
/// Read-modify-write accesses happen with interrupts disabled.
/// Toggling writes to PINC, which is a single store.
#[derive(Copy, Clone)]
pub struct PortCLed<const BIT: u8>;

pub const RED_LED: PortCLed<1> = PortCLed;
pub const GREEN_LED: PortCLed<4> = PortCLed;

#[inline(always)]
fn portc() -> mcu::PORTC {
    // SAFETY: Port C is only accessed through the functions in this module
    //         and the motor direction pin, following the rules above.
    unsafe { mcu::PORTC::steal() }
}

impl<const BIT: u8> PortCLed<BIT> {
    const MASK: u8 = 1 << BIT;

    pub fn init(&self, _c: &MainInitCtx) {
        let p = portc();
        // SAFETY: Only our pin is changed.
        p.portc().modify(|r, w| unsafe { w.bits(r.bits() & !Self::MASK) });
        // SAFETY: Only our pin is changed.
        p.ddrc().modify(|r, w| unsafe { w.bits(r.bits() | Self::MASK) });
    }
}

impl<const BIT: u8> DigitalOut for PortCLed<BIT> {
    fn set(&mut self, on: bool) {
        interrupt::free(|_| {
            // SAFETY: Only our pin is changed.
            portc().portc().modify(|r, w| unsafe {
                w.bits(if on {
                    r.bits() | Self::MASK
                } else {
                    r.bits() & !Self::MASK
                })
            });
        });
    }

    fn is_set(&self) -> bool {
        portc().portc().read().bits() & Self::MASK != 0
    }

    #[inline(always)]
    fn toggle(&mut self) {
        // SAFETY: Writing a 1 to PINC toggles the pin. Zero bits have no effect.
        portc().pinc().write(|w| unsafe { w.bits(Self::MASK) });
    }
}

/// Drive OC1A (PD5), where the yellow LED sits.
/// TC1 toggles it on every compare match.
pub fn yellow_led_init(portd: &mcu::PORTD) {
    // SAFETY: PD5 is an output. Nothing else uses port D during init.
    portd.ddrd().modify(|r, w| unsafe { w.bits(r.bits() | (1 << 5)) });
}

// vim: ts=4 sw=4 expandtab

// -*- coding: utf-8 -*-
// SPDX-License-Identifier: Apache-2.0 OR MIT

use crate::mutex::{CriticalSection, Mutex, free};
use core::cell::Cell;
use ufmt::{uWrite, uwrite};

#[derive(Copy, Clone, PartialEq, Eq)]
#[repr(u8)]
pub enum Debug {
    RxDropped,
    TxStalled,
    EncoderFault,
    EncoderCount,
    MotorCommand,
    Releases,
}
const NRVALUES: usize = 6;

const NAMES: [&str; NRVALUES] = ["rxdrop", "txstall", "encfault", "enc", "motor", "rel"];

/// Table of debug values.
pub struct DebugValues {
    values: Mutex<[Cell<u16>; NRVALUES]>,
}

impl DebugValues {
    pub const fn new() -> Self {
        Self {
            values: Mutex::new([const { Cell::new(0) }; NRVALUES]),
        }
    }

    fn slot<'cs>(&'cs self, cs: CriticalSection<'cs>, id: Debug) -> &'cs Cell<u16> {
        &self.values.borrow(cs)[id as usize]
    }

    pub fn get(&self, id: Debug) -> u16 {
        free(|cs| self.slot(cs, id).get())
    }

    pub fn set_cs(&self, cs: CriticalSection<'_>, id: Debug, value: u16) {
        self.slot(cs, id).set(value);
    }

    pub fn inc_cs(&self, cs: CriticalSection<'_>, id: Debug) {
        let slot = self.slot(cs, id);
        slot.set(slot.get().wrapping_add(1));
    }

    pub fn clear(&self) {
        free(|cs| {
            for v in self.values.borrow(cs) {
                v.set(0);
            }
        });
    }

    /// Write all values as one line: `name=value` pairs.
    ///
    /// The snapshot is taken atomically. The formatting runs with interrupts enabled.
    pub fn report<W: uWrite + ?Sized>(&self, w: &mut W) -> Result<(), W::Error> {
        let snapshot: [u16; NRVALUES] = free(|cs| {
            let values = self.values.borrow(cs);
            core::array::from_fn(|i| values[i].get())
        });
        for (i, (name, value)) in NAMES.iter().zip(snapshot).enumerate() {
            if i > 0 {
                w.write_char(' ')?;
            }
            uwrite!(*w, "{}={}", *name, value)?;
        }
        w.write_char('\n')
    }
}

impl Default for DebugValues {
    fn default() -> Self {
        Self::new()
    }
}

/// The system wide debug table.
pub static DEBUG: DebugValues = DebugValues::new();

impl Debug {
    pub fn log_u16(&self, value: u16) {
        free(|cs| self.log_u16_cs(cs, value));
    }

    pub fn log_u16_cs(&self, cs: CriticalSection<'_>, value: u16) {
        DEBUG.set_cs(cs, *self, value);
    }

    /// Stored as two's complement.
    pub fn log_i16(&self, value: i16) {
        self.log_u16(value as u16);
    }

    /// Count an event.
    pub fn inc(&self) {
        free(|cs| self.inc_cs(cs));
    }

    pub fn inc_cs(&self, cs: CriticalSection<'_>) {
        DEBUG.inc_cs(cs, *self);
    }

    pub fn get(&self) -> u16 {
        DEBUG.get(*self)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    extern crate std;
    use std::string::String;

    struct Sink(String);

    impl uWrite for Sink {
        type Error = core::convert::Infallible;

        fn write_str(&mut self, s: &str) -> Result<(), Self::Error> {
            self.0.push_str(s);
            Ok(())
        }
    }

    #[test]
    fn test_report() {
        let dv = DebugValues::new();
        free(|cs| {
            dv.inc_cs(cs, Debug::RxDropped);
            dv.inc_cs(cs, Debug::RxDropped);
            dv.set_cs(cs, Debug::MotorCommand, (-20_i16) as u16);
            dv.set_cs(cs, Debug::Releases, 7);
        });
        assert_eq!(dv.get(Debug::RxDropped), 2);

        let mut sink = Sink(String::new());
        dv.report(&mut sink).unwrap();
        assert_eq!(
            sink.0,
            "rxdrop=2 txstall=0 encfault=0 enc=0 motor=65516 rel=7\n"
        );

        dv.clear();
        assert_eq!(dv.get(Debug::Releases), 0);
    }

    #[test]
    fn test_counter_wraps() {
        let dv = DebugValues::new();
        free(|cs| {
            dv.set_cs(cs, Debug::TxStalled, u16::MAX);
            dv.inc_cs(cs, Debug::TxStalled);
        });
        assert_eq!(dv.get(Debug::TxStalled), 0);
    }

    #[test]
    fn test_global_log() {
        Debug::Releases.log_i16(-1);
        assert_eq!(Debug::Releases.get(), 0xFFFF);
    }
}

// vim: ts=4 sw=4 expandtab

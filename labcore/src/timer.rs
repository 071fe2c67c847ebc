// -*- coding: utf-8 -*-
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Compare-match timer configuration.
//!
//! A channel runs in CTC mode: the counter counts prescaled CPU clocks
//! from 0 up to the compare value, raises the compare-match interrupt
//! and starts over.
//! The tick frequency is therefore `f_cpu / (prescale * (top + 1))`.

use ufmt::derive::uDebug;

/// Clock divider in front of the counter.
#[derive(Copy, Clone, PartialEq, Eq, Debug, uDebug)]
#[repr(u16)]
pub enum Prescaler {
    Div1 = 1,
    Div8 = 8,
    Div32 = 32,
    Div64 = 64,
    Div128 = 128,
    Div256 = 256,
    Div1024 = 1024,
}

impl Prescaler {
    #[inline]
    pub const fn divisor(self) -> u32 {
        self as u16 as u32
    }
}

/// The flavours of timer on the ATmega1284P.
#[derive(Copy, Clone, PartialEq, Eq, Debug, uDebug)]
pub enum TimerKind {
    /// TC0
    Sync8,
    /// TC1 and TC3
    Sync16,
    /// TC2
    Async8,
}

const SYNC_PRESCALERS: [Prescaler; 5] = [
    Prescaler::Div1,
    Prescaler::Div8,
    Prescaler::Div64,
    Prescaler::Div256,
    Prescaler::Div1024,
];

const ASYNC_PRESCALERS: [Prescaler; 7] = [
    Prescaler::Div1,
    Prescaler::Div8,
    Prescaler::Div32,
    Prescaler::Div64,
    Prescaler::Div128,
    Prescaler::Div256,
    Prescaler::Div1024,
];

impl TimerKind {
    /// Largest value the compare register can hold.
    pub const fn max_top(self) -> u16 {
        match self {
            TimerKind::Sync8 | TimerKind::Async8 => 0xFF,
            TimerKind::Sync16 => 0xFFFF,
        }
    }

    /// Available dividers, smallest first.
    pub const fn prescalers(self) -> &'static [Prescaler] {
        match self {
            TimerKind::Sync8 | TimerKind::Sync16 => &SYNC_PRESCALERS,
            TimerKind::Async8 => &ASYNC_PRESCALERS,
        }
    }

    /// Clock select field value for the prescaler.
    /// Position 0 of the field is "stopped".
    pub fn clock_select(self, ps: Prescaler) -> Option<u8> {
        self.prescalers()
            .iter()
            .position(|&p| p == ps)
            .map(|pos| pos as u8 + 1)
    }
}

/// What the compare-match event does to the OCnA pin.
#[derive(Copy, Clone, PartialEq, Eq, Debug, uDebug)]
pub enum CompareOutput {
    Disconnected,
    Toggle,
    Clear,
    Set,
}

#[derive(Copy, Clone, PartialEq, Eq, Debug, uDebug)]
pub enum TimerError {
    ZeroFrequency,
    /// Even the smallest divider needs a compare value of 0.
    TooFast,
    /// Even the largest divider does not fit the compare register.
    TooSlow,
}

/// Prescaler and compare value for one tick frequency.
#[derive(Copy, Clone, PartialEq, Eq, Debug, uDebug)]
pub struct TimerConfig {
    pub prescaler: Prescaler,
    pub top: u16,
}

impl TimerConfig {
    /// Pick the smallest prescaler whose compare value fits the timer.
    ///
    /// top = round(f_cpu / (hz * prescale)) - 1
    pub fn for_frequency(kind: TimerKind, f_cpu: u32, hz: u32) -> Result<Self, TimerError> {
        if hz == 0 {
            return Err(TimerError::ZeroFrequency);
        }
        for &prescaler in kind.prescalers() {
            let div = hz as u64 * prescaler.divisor() as u64;
            let counts = (f_cpu as u64 + div / 2) / div;
            if counts < 2 {
                // Larger dividers only make it worse.
                return Err(TimerError::TooFast);
            }
            let top = counts - 1;
            if top <= kind.max_top() as u64 {
                return Ok(Self {
                    prescaler,
                    top: top as u16,
                });
            }
        }
        Err(TimerError::TooSlow)
    }

    /// The tick frequency that this configuration really produces, in mHz.
    pub fn actual_millihertz(&self, f_cpu: u32) -> u64 {
        let div = self.prescaler.divisor() as u64 * (self.top as u64 + 1);
        (f_cpu as u64 * 1000 + div / 2) / div
    }
}

/// Fixed contract of one hardware compare-match timer channel.
pub trait TimerHw {
    const KIND: TimerKind;

    /// Clear Timer on Compare match.
    fn set_ctc_mode(&mut self);
    /// `None` stops the clock.
    fn set_clock(&mut self, prescaler: Option<Prescaler>);
    fn set_compare(&mut self, top: u16);
    fn set_compare_output(&mut self, output: CompareOutput);
    fn set_compare_irq(&mut self, enable: bool);
    fn clear_counter(&mut self);
}

/// Program `hw` for a periodic compare-match interrupt at `hz`.
///
/// The channel interrupt is disabled while the registers are inconsistent.
/// On error the hardware is left untouched.
pub fn timer_setup<T: TimerHw>(
    hw: &mut T,
    f_cpu: u32,
    hz: u32,
    output: CompareOutput,
) -> Result<TimerConfig, TimerError> {
    let conf = TimerConfig::for_frequency(T::KIND, f_cpu, hz)?;

    hw.set_compare_irq(false);
    hw.set_clock(None);
    hw.set_ctc_mode();
    hw.set_compare_output(output);
    hw.set_compare(conf.top);
    hw.clear_counter();
    hw.set_clock(Some(conf.prescaler));
    hw.set_compare_irq(true);

    Ok(conf)
}

#[cfg(test)]
pub mod test {
    use super::*;
    extern crate std;
    use std::vec::Vec;

    #[derive(Debug, PartialEq, Eq, Clone, Copy)]
    pub enum Op {
        Ctc,
        Clock(Option<Prescaler>),
        Compare(u16),
        Output(CompareOutput),
        Irq(bool),
        ClearCounter,
    }

    /// Records every register access.
    #[derive(Default)]
    pub struct MockTimer<const WIDE: bool> {
        pub ops: Vec<Op>,
    }

    impl<const WIDE: bool> TimerHw for MockTimer<WIDE> {
        const KIND: TimerKind = if WIDE {
            TimerKind::Sync16
        } else {
            TimerKind::Sync8
        };

        fn set_ctc_mode(&mut self) {
            self.ops.push(Op::Ctc);
        }
        fn set_clock(&mut self, prescaler: Option<Prescaler>) {
            self.ops.push(Op::Clock(prescaler));
        }
        fn set_compare(&mut self, top: u16) {
            self.ops.push(Op::Compare(top));
        }
        fn set_compare_output(&mut self, output: CompareOutput) {
            self.ops.push(Op::Output(output));
        }
        fn set_compare_irq(&mut self, enable: bool) {
            self.ops.push(Op::Irq(enable));
        }
        fn clear_counter(&mut self) {
            self.ops.push(Op::ClearCounter);
        }
    }

    #[test]
    fn test_1khz_on_8bit() {
        // 20 MHz / 256 / 78 = 1001.6 Hz
        let conf = TimerConfig::for_frequency(TimerKind::Sync8, 20_000_000, 1000).unwrap();
        assert_eq!(conf.prescaler, Prescaler::Div256);
        assert_eq!(conf.top, 77);
        assert_eq!(conf.actual_millihertz(20_000_000), 1_001_603);
    }

    #[test]
    fn test_1khz_on_16bit() {
        let conf = TimerConfig::for_frequency(TimerKind::Sync16, 20_000_000, 1000).unwrap();
        assert_eq!(conf.prescaler, Prescaler::Div1);
        assert_eq!(conf.top, 19_999);
        assert_eq!(conf.actual_millihertz(20_000_000), 1_000_000);
    }

    #[test]
    fn test_10hz_on_16bit() {
        let conf = TimerConfig::for_frequency(TimerKind::Sync16, 20_000_000, 10).unwrap();
        assert_eq!(conf.prescaler, Prescaler::Div64);
        assert_eq!(conf.top, 31_249);
    }

    #[test]
    fn test_async_prescalers() {
        // 20 MHz / 32 / 250 = 2500 Hz. Only TC2 has the /32 divider.
        let conf = TimerConfig::for_frequency(TimerKind::Async8, 20_000_000, 2500).unwrap();
        assert_eq!(conf.prescaler, Prescaler::Div32);
        assert_eq!(conf.top, 249);
        assert_eq!(TimerKind::Async8.clock_select(Prescaler::Div32), Some(3));
        assert_eq!(TimerKind::Sync8.clock_select(Prescaler::Div32), None);
        assert_eq!(TimerKind::Sync8.clock_select(Prescaler::Div1024), Some(5));
    }

    #[test]
    fn test_errors() {
        assert_eq!(
            TimerConfig::for_frequency(TimerKind::Sync8, 20_000_000, 0),
            Err(TimerError::ZeroFrequency)
        );
        assert_eq!(
            TimerConfig::for_frequency(TimerKind::Sync8, 20_000_000, 15_000_000),
            Err(TimerError::TooFast)
        );
        // 20 MHz / 1024 / 256 = 76 Hz is the slowest 8 bit rate.
        assert_eq!(
            TimerConfig::for_frequency(TimerKind::Sync8, 20_000_000, 50),
            Err(TimerError::TooSlow)
        );
        assert!(TimerConfig::for_frequency(TimerKind::Sync8, 20_000_000, 77).is_ok());
    }

    #[test]
    fn test_setup_sequence() {
        let mut hw = MockTimer::<false>::default();
        let conf = timer_setup(&mut hw, 20_000_000, 1000, CompareOutput::Toggle).unwrap();
        assert_eq!(
            hw.ops,
            [
                Op::Irq(false),
                Op::Clock(None),
                Op::Ctc,
                Op::Output(CompareOutput::Toggle),
                Op::Compare(conf.top),
                Op::ClearCounter,
                Op::Clock(Some(Prescaler::Div256)),
                Op::Irq(true),
            ]
        );
    }

    #[test]
    fn test_setup_error_leaves_hw_alone() {
        let mut hw = MockTimer::<false>::default();
        assert_eq!(
            timer_setup(&mut hw, 20_000_000, 10, CompareOutput::Disconnected),
            Err(TimerError::TooSlow)
        );
        assert!(hw.ops.is_empty());
    }
}

// vim: ts=4 sw=4 expandtab

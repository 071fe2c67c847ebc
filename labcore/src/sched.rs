// -*- coding: utf-8 -*-
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Periodic tasks on compare-match timer channels.
//!
//! Every channel interrupt is one tick.
//! A channel releases its task every `threshold` ticks.
//! The release either sets a flag that `main()` polls
//! or calls a function right from the interrupt handler.

use crate::{
    mutex::{IrqCtx, MainCtx, Mutex, MutexCell, free},
    timer::{CompareOutput, TimerConfig, TimerError, TimerHw, timer_setup},
};
use core::cell::Cell;
use portable_atomic::{AtomicBool, AtomicU16, Ordering};
use ufmt::derive::uDebug;

/// What happens when a channel's threshold is reached.
#[derive(Copy, Clone)]
pub enum Release {
    /// Set the due flag. `main()` acts on it at its own pace.
    Flag,
    /// Run a short, non-blocking action in interrupt context.
    Call(fn(&IrqCtx<'_>)),
}

#[derive(Copy, Clone, PartialEq, Eq, Debug, uDebug)]
pub enum PeriodError {
    /// The channel timer has not been configured.
    Unconfigured,
    /// The period does not fit the 16 bit tick threshold.
    TooLong,
}

pub struct Channel {
    ticks: Mutex<Cell<u16>>,
    threshold: AtomicU16,
    release: Mutex<Cell<Release>>,
    releases: Mutex<Cell<u16>>,
    due: AtomicBool,
    tick_hz: MutexCell<u32>,
}

impl Channel {
    /// A threshold of 0 disables the task.
    pub const fn new(release: Release, threshold: u16) -> Self {
        Self {
            ticks: Mutex::new(Cell::new(0)),
            threshold: AtomicU16::new(threshold),
            release: Mutex::new(Cell::new(release)),
            releases: Mutex::new(Cell::new(0)),
            due: AtomicBool::new(false),
            tick_hz: MutexCell::new(0),
        }
    }

    /// Compare-match interrupt handler body.
    ///
    /// Returns true, if the task was released.
    pub fn tick(&self, c: &IrqCtx<'_>) -> bool {
        let cs = c.cs();
        let ticks = self.ticks.borrow(cs);
        let count = ticks.get().wrapping_add(1);
        let threshold = self.threshold.load(Ordering::Relaxed);

        if threshold != 0 && count >= threshold {
            ticks.set(0);
            let releases = self.releases.borrow(cs);
            releases.set(releases.get().wrapping_add(1));
            match self.release.borrow(cs).get() {
                Release::Flag => self.due.store(true, Ordering::Release),
                Release::Call(f) => f(c),
            }
            true
        } else {
            ticks.set(count);
            false
        }
    }

    #[inline]
    pub fn task_is_due(&self) -> bool {
        self.due.load(Ordering::Acquire)
    }

    #[inline]
    pub fn clear_task_due(&self) {
        self.due.store(false, Ordering::Release);
    }

    /// Acknowledge the release, if there was one.
    #[inline]
    pub fn take_due(&self) -> bool {
        self.due.swap(false, Ordering::AcqRel)
    }

    #[inline]
    pub fn threshold(&self) -> u16 {
        self.threshold.load(Ordering::Relaxed)
    }

    /// Ticks per release. Takes effect on the next tick.
    ///
    /// The store is indivisible, so the interrupt does not need to be masked.
    #[inline]
    pub fn set_threshold(&self, threshold: u16) {
        self.threshold.store(threshold, Ordering::Relaxed);
    }

    pub fn set_release(&self, release: Release) {
        free(|cs| self.release.borrow(cs).set(release));
    }

    /// Ticks accumulated since the last release.
    pub fn ticks(&self) -> u16 {
        free(|cs| self.ticks.borrow(cs).get())
    }

    /// Number of releases since start or since [Self::clear_releases].
    pub fn releases(&self) -> u16 {
        free(|cs| self.releases.borrow(cs).get())
    }

    pub fn clear_releases(&self) {
        free(|cs| self.releases.borrow(cs).set(0));
    }

    /// Nominal tick frequency. 0, if not configured.
    pub fn tick_hz(&self, m: &MainCtx<'_>) -> u32 {
        self.tick_hz.get(m)
    }

    /// Program the channel timer for `hz` ticks per second.
    pub fn configure<T: TimerHw>(
        &self,
        m: &MainCtx<'_>,
        hw: &mut T,
        f_cpu: u32,
        hz: u32,
    ) -> Result<TimerConfig, TimerError> {
        self.configure_with_output(m, hw, f_cpu, hz, CompareOutput::Disconnected)
    }

    /// Like [Self::configure], but also let the compare match drive the OCnA pin.
    pub fn configure_with_output<T: TimerHw>(
        &self,
        m: &MainCtx<'_>,
        hw: &mut T,
        f_cpu: u32,
        hz: u32,
        output: CompareOutput,
    ) -> Result<TimerConfig, TimerError> {
        let conf = timer_setup(hw, f_cpu, hz, output)?;
        self.tick_hz.set(m, hz);
        Ok(conf)
    }

    /// Release the task every `period_ms` milliseconds.
    ///
    /// 0 ms disables the task. Periods shorter than one tick are rounded up to one tick.
    /// Returns the new threshold.
    pub fn set_task_period(&self, m: &MainCtx<'_>, period_ms: u32) -> Result<u16, PeriodError> {
        let hz = self.tick_hz(m);
        if hz == 0 {
            return Err(PeriodError::Unconfigured);
        }
        let threshold = if period_ms == 0 {
            0
        } else {
            let ticks = (period_ms as u64 * hz as u64 + 500) / 1000;
            u16::try_from(ticks.max(1)).map_err(|_| PeriodError::TooLong)?
        };
        self.set_threshold(threshold);
        Ok(threshold)
    }
}

/// All task channels of the system.
pub struct Scheduler<const N: usize> {
    channels: [Channel; N],
}

impl<const N: usize> Scheduler<N> {
    pub const fn new(channels: [Channel; N]) -> Self {
        Self { channels }
    }

    #[inline]
    pub fn channel(&self, id: usize) -> &Channel {
        &self.channels[id]
    }

    /// Dispatch one tick from the interrupt handler bound to channel `id`.
    #[inline]
    pub fn tick(&self, c: &IrqCtx<'_>, id: usize) -> bool {
        self.channel(id).tick(c)
    }

    pub fn task_is_due(&self, id: usize) -> bool {
        self.channel(id).task_is_due()
    }

    pub fn clear_task_due(&self, id: usize) {
        self.channel(id).clear_task_due()
    }

    pub fn configure_channel<T: TimerHw>(
        &self,
        m: &MainCtx<'_>,
        id: usize,
        hw: &mut T,
        f_cpu: u32,
        hz: u32,
    ) -> Result<TimerConfig, TimerError> {
        self.channel(id).configure(m, hw, f_cpu, hz)
    }

    pub fn set_task_period(
        &self,
        m: &MainCtx<'_>,
        id: usize,
        period_ms: u32,
    ) -> Result<u16, PeriodError> {
        self.channel(id).set_task_period(m, period_ms)
    }

    /// Channels with a pending release, acknowledging each of them.
    pub fn take_due(&self) -> impl Iterator<Item = usize> + '_ {
        self.channels
            .iter()
            .enumerate()
            .filter_map(|(id, ch)| ch.take_due().then_some(id))
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::timer::test::MockTimer;
    use portable_atomic::AtomicU32;

    const F_CPU: u32 = 20_000_000;

    fn irq() -> IrqCtx<'static> {
        unsafe { IrqCtx::new() }
    }

    fn main_ctx() -> MainCtx<'static> {
        unsafe { MainCtx::new() }
    }

    #[test]
    fn test_fires_at_threshold() {
        let ch = Channel::new(Release::Flag, 3);
        let c = irq();
        assert!(!ch.tick(&c));
        assert!(!ch.tick(&c));
        assert_eq!(ch.ticks(), 2);
        assert!(!ch.task_is_due());
        assert!(ch.tick(&c));
        assert_eq!(ch.ticks(), 0);
        assert!(ch.task_is_due());
        ch.clear_task_due();
        assert!(!ch.task_is_due());
    }

    #[test]
    fn test_1khz_500_ticks() {
        let m = main_ctx();
        let c = irq();
        let ch = Channel::new(Release::Flag, 0);
        let mut hw = MockTimer::<false>::default();
        ch.configure(&m, &mut hw, F_CPU, 1000).unwrap();
        assert_eq!(ch.set_task_period(&m, 500), Ok(500));

        let mut released_at = [0_u32; 4];
        let mut n = 0;
        for t in 1..=2000_u32 {
            if ch.tick(&c) {
                assert!(ch.take_due());
                released_at[n] = t;
                n += 1;
            }
        }
        assert_eq!(released_at, [500, 1000, 1500, 2000]);
        assert_eq!(ch.releases(), 4);

        // Disabled: the interrupt keeps coming, nothing gets released.
        assert_eq!(ch.set_task_period(&m, 0), Ok(0));
        for _ in 0..5000 {
            assert!(!ch.tick(&c));
        }
        assert!(!ch.task_is_due());
        assert_eq!(ch.releases(), 4);
    }

    #[test]
    fn test_lower_threshold_at_runtime() {
        let c = irq();
        let ch = Channel::new(Release::Flag, 500);
        for _ in 0..400 {
            assert!(!ch.tick(&c));
        }
        ch.set_threshold(300);
        assert!(ch.tick(&c));
        for _ in 0..299 {
            assert!(!ch.tick(&c));
        }
        assert!(ch.tick(&c));
    }

    static CALLS: AtomicU32 = AtomicU32::new(0);

    fn count_call(_c: &IrqCtx<'_>) {
        CALLS.fetch_add(1, Ordering::Relaxed);
    }

    #[test]
    fn test_call_release() {
        let c = irq();
        let ch = Channel::new(Release::Call(count_call), 10);
        for _ in 0..100 {
            ch.tick(&c);
        }
        assert_eq!(CALLS.load(Ordering::Relaxed), 10);
        // A call release does not set the flag.
        assert!(!ch.task_is_due());

        ch.set_release(Release::Flag);
        for _ in 0..10 {
            ch.tick(&c);
        }
        assert_eq!(CALLS.load(Ordering::Relaxed), 10);
        assert!(ch.take_due());
        assert_eq!(ch.releases(), 11);
        ch.clear_releases();
        assert_eq!(ch.releases(), 0);
    }

    #[test]
    fn test_period_errors() {
        let m = main_ctx();
        let ch = Channel::new(Release::Flag, 0);
        assert_eq!(ch.set_task_period(&m, 100), Err(PeriodError::Unconfigured));

        let mut hw = MockTimer::<true>::default();
        ch.configure(&m, &mut hw, F_CPU, 1000).unwrap();
        assert_eq!(ch.tick_hz(&m), 1000);
        assert_eq!(ch.set_task_period(&m, 65_535), Ok(65_535));
        assert_eq!(ch.set_task_period(&m, 65_536), Err(PeriodError::TooLong));
        // The old threshold stays in effect.
        assert_eq!(ch.threshold(), 65_535);

        ch.configure(&m, &mut hw, F_CPU, 100).unwrap();
        assert_eq!(ch.set_task_period(&m, 1), Ok(1));
        assert_eq!(ch.set_task_period(&m, 25), Ok(3));
    }

    #[test]
    fn test_configure_error_keeps_rate() {
        let m = main_ctx();
        let ch = Channel::new(Release::Flag, 0);
        let mut hw = MockTimer::<false>::default();
        ch.configure(&m, &mut hw, F_CPU, 1000).unwrap();
        assert_eq!(
            ch.configure(&m, &mut hw, F_CPU, 1),
            Err(TimerError::TooSlow)
        );
        assert_eq!(ch.tick_hz(&m), 1000);
    }

    #[test]
    fn test_runtime_reconfiguration() {
        let m = main_ctx();
        let c = irq();
        let sched = Scheduler::new([Channel::new(Release::Flag, 0)]);
        let mut hw = MockTimer::<true>::default();
        sched.configure_channel(&m, 0, &mut hw, F_CPU, 10).unwrap();

        assert_eq!(sched.set_task_period(&m, 0, 500), Ok(5));
        for _ in 0..20 {
            sched.tick(&c, 0);
        }
        assert_eq!(sched.channel(0).releases(), 4);

        // 125 ms at 10 Hz rounds to one tick.
        assert_eq!(sched.set_task_period(&m, 0, 125), Ok(1));
        sched.channel(0).clear_releases();
        for _ in 0..20 {
            assert!(sched.tick(&c, 0));
        }
        assert_eq!(sched.channel(0).releases(), 20);
        sched.channel(0).clear_releases();

        assert_eq!(sched.set_task_period(&m, 0, 500), Ok(5));
        for _ in 0..10 {
            sched.tick(&c, 0);
        }
        assert_eq!(sched.channel(0).releases(), 2);
        assert_eq!(sched.take_due().count(), 1);
    }

    #[test]
    fn test_scheduler_dispatch() {
        let c = irq();
        let sched = Scheduler::new([
            Channel::new(Release::Flag, 2),
            Channel::new(Release::Flag, 3),
        ]);
        for _ in 0..6 {
            sched.tick(&c, 0);
            sched.tick(&c, 1);
        }
        assert!(sched.task_is_due(0));
        assert!(sched.task_is_due(1));
        sched.clear_task_due(1);
        let mut due = sched.take_due();
        assert_eq!(due.next(), Some(0));
        assert_eq!(due.next(), None);
        assert!(!sched.task_is_due(0));
        assert_eq!(sched.channel(0).releases(), 3);
        assert_eq!(sched.channel(1).releases(), 2);
    }
}

// vim: ts=4 sw=4 expandtab

// -*- coding: utf-8 -*-
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Proportional-derivative position controller.
//!
//! Deviation and terms are [BigFixpt], the gains are [Fixpt].

use crate::{
    debug::Debug,
    fixpt::{BigFixpt, Fixpt},
    mutex::{MainCtx, MutexCell},
    periph::{Encoder, Motor, clamp_motor},
};

#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub struct PdParams {
    pub kp: Fixpt,
    pub kd: Fixpt,
}

pub struct Pd {
    prev_e: MutexCell<BigFixpt>,
}

impl Pd {
    pub const fn new() -> Self {
        Self {
            prev_e: MutexCell::new(BigFixpt::zero()),
        }
    }

    /// Forget the previous deviation.
    pub fn reset(&self, m: &MainCtx<'_>) {
        self.prev_e.set(m, BigFixpt::zero());
    }

    /// Motor command for one control period.
    pub fn run(&self, m: &MainCtx<'_>, params: &PdParams, sp: i32, r: i32) -> i16 {
        // deviation
        let e = BigFixpt::from_int(sp) - BigFixpt::from_int(r);

        // P term
        let p = params.kp * e;

        // D term
        let de = e - self.prev_e.get(m);
        self.prev_e.set(m, e);
        let d = de * params.kd; // assume constant delta-time between calls

        clamp_motor((p + d).to_int())
    }

    /// Read the encoder, run the controller and drive the motor.
    ///
    /// An encoder error is logged. The controller keeps running.
    pub fn step<E: Encoder, M: Motor>(
        &self,
        m: &MainCtx<'_>,
        params: &PdParams,
        sp: i32,
        encoder: &E,
        motor: &mut M,
    ) -> i16 {
        let r = encoder.count();
        if encoder.check_error() {
            Debug::EncoderFault.inc();
        }
        Debug::EncoderCount.log_u16(r as u16);

        let y = self.run(m, params, sp, r);
        Debug::MotorCommand.log_i16(y);
        motor.set_speed(y);
        y
    }
}

impl Default for Pd {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::fixpt;
    use core::cell::Cell;

    fn main_ctx() -> MainCtx<'static> {
        unsafe { MainCtx::new() }
    }

    #[test]
    fn test_p_only() {
        let m = main_ctx();
        let pd = Pd::new();
        let params = PdParams {
            kp: fixpt!(2),
            kd: fixpt!(0),
        };
        assert_eq!(pd.run(&m, &params, 100, 40), 120);
        assert_eq!(pd.run(&m, &params, 40, 100), -120);
        assert_eq!(pd.run(&m, &params, 1000, 0), 255);
        assert_eq!(pd.run(&m, &params, i32::MIN, i32::MAX), -255);
    }

    #[test]
    fn test_fractional_gain() {
        let m = main_ctx();
        let pd = Pd::new();
        let params = PdParams {
            kp: fixpt!(3 / 4),
            kd: fixpt!(0),
        };
        assert_eq!(pd.run(&m, &params, 10, 0), 7);
        // -7.5 rounds down.
        assert_eq!(pd.run(&m, &params, 0, 10), -8);
    }

    #[test]
    fn test_d_term() {
        let m = main_ctx();
        let pd = Pd::new();
        let params = PdParams {
            kp: fixpt!(1),
            kd: fixpt!(1 / 2),
        };
        // e = 10, de = 10: 10 + 5
        assert_eq!(pd.run(&m, &params, 10, 0), 15);
        // e = 10, de = 0
        assert_eq!(pd.run(&m, &params, 10, 0), 10);
        // e = 4, de = -6: 4 - 3
        assert_eq!(pd.run(&m, &params, 10, 6), 1);
        pd.reset(&m);
        assert_eq!(pd.run(&m, &params, 10, 6), 6);
    }

    struct FakeEncoder {
        count: i32,
        error: Cell<bool>,
    }

    impl Encoder for FakeEncoder {
        fn count(&self) -> i32 {
            self.count
        }
        fn check_error(&self) -> bool {
            self.error.replace(false)
        }
    }

    #[derive(Default)]
    struct FakeMotor(Option<i16>);

    impl Motor for FakeMotor {
        fn set_speed(&mut self, speed: i16) {
            self.0 = Some(speed);
        }
    }

    #[test]
    fn test_step_ignores_fault() {
        let m = main_ctx();
        let pd = Pd::new();
        let params = PdParams {
            kp: fixpt!(1),
            kd: fixpt!(0),
        };
        let encoder = FakeEncoder {
            count: -64,
            error: Cell::new(true),
        };
        let mut motor = FakeMotor::default();
        assert_eq!(pd.step(&m, &params, 64, &encoder, &mut motor), 128);
        assert_eq!(motor.0, Some(128));
        assert!(!encoder.error.get());
    }
}

// vim: ts=4 sw=4 expandtab

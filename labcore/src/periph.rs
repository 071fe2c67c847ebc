// -*- coding: utf-8 -*-
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Board peripherals as seen by the control code.

/// Full scale motor command.
pub const MOTOR_MAX: i16 = 255;

/// Saturate a command to the motor range.
#[inline]
pub fn clamp_motor(command: i32) -> i16 {
    command.clamp(-(MOTOR_MAX as i32), MOTOR_MAX as i32) as i16
}

/// A digital output pin, e.g. an LED.
pub trait DigitalOut {
    fn set(&mut self, on: bool);
    fn is_set(&self) -> bool;

    fn toggle(&mut self) {
        let on = self.is_set();
        self.set(!on);
    }
}

/// H-bridge motor driver.
pub trait Motor {
    /// `speed` is within `-MOTOR_MAX..=MOTOR_MAX`. The sign selects the direction.
    fn set_speed(&mut self, speed: i16);
}

/// Quadrature position sensor.
pub trait Encoder {
    /// Signed position in encoder counts.
    fn count(&self) -> i32;
    /// Return and clear the latched decoding error flag.
    fn check_error(&self) -> bool;
}


// vim: ts=4 sw=4 expandtab

#![allow(unused_unsafe)]

use crate::{
    hw::{interrupt, mcu},
    mutex::{IrqCtx, MainInitCtx},
};
use labcore::{encoder::QuadDecoder, periph::Motor};

const PWM_PIN: u8 = 1 << 7; // PD7 = OC2A
const DIR_PIN: u8 = 1 << 6; // PC6
const ENC_A: u8 = 1 << 2; // PA2
const ENC_B: u8 = 1 << 3; // PA3

pub static ENCODER: QuadDecoder = QuadDecoder::new();

/// Motor 2 of the on-board driver.
/// PWM from TC2 on OC2A, direction on PC6.
pub struct MotorPwm {
    tc2: mcu::TC2,
}

impl MotorPwm {
    #[rustfmt::skip]
    pub fn new(_c: &MainInitCtx, tc2: mcu::TC2, portc: &mcu::PORTC, portd: &mcu::PORTD) -> Self {
        // SAFETY: Only the motor pins are changed.
        portd.ddrd().modify(|r, w| unsafe { w.bits(r.bits() | PWM_PIN) });
        // SAFETY: Only the motor pins are changed.
        portc.ddrc().modify(|r, w| unsafe { w.bits(r.bits() | DIR_PIN) });

        tc2.ocr2a().write(|w| w.set(0));
        // Fast PWM, non-inverting OC2A.
        // SAFETY: COM2A = 0b10, WGM2 = 0b011.
        tc2.tccr2a().write(|w| unsafe { w.bits(0b1000_0011) });
        // 20 MHz / 8 / 256 = 9.8 kHz
        // SAFETY: CS2 = 0b010.
        tc2.tccr2b().write(|w| unsafe { w.bits(0b0000_0010) });

        Self { tc2 }
    }
}

impl Motor for &MotorPwm {
    fn set_speed(&mut self, speed: i16) {
        interrupt::free(|_| {
            // SAFETY: Port C is shared with the LEDs. RMW with interrupts disabled.
            let portc = unsafe { mcu::PORTC::steal() };
            // SAFETY: Only the direction pin is changed.
            portc.portc().modify(|r, w| unsafe {
                w.bits(if speed < 0 {
                    r.bits() | DIR_PIN
                } else {
                    r.bits() & !DIR_PIN
                })
            });
        });
        let duty = speed.unsigned_abs().min(u8::MAX.into()) as u8;
        self.tc2.ocr2a().write(|w| w.set(duty));
    }
}

pub fn encoder_init(_c: &MainInitCtx, exint: &mcu::EXINT, porta: &mcu::PORTA) {
    let pins = porta.pina().read().bits();
    ENCODER.init(pins & ENC_A != 0, pins & ENC_B != 0);
    // SAFETY: Pin change interrupts on PA2 and PA3.
    exint.pcmsk0().write(|w| unsafe { w.bits(ENC_A | ENC_B) });
    // SAFETY: Clear the PCIF0 flag.
    exint.pcifr().write(|w| unsafe { w.bits(1) });
    // SAFETY: Enable PCIE0.
    exint.pcicr().modify(|r, w| unsafe { w.bits(r.bits() | 1) });
}

pub fn irq_handler_pcint0(c: &IrqCtx) {
    // SAFETY: PINA is only read.
    let porta = unsafe { mcu::PORTA::steal() };
    let pins = porta.pina().read().bits();
    ENCODER.update(c, pins & ENC_A != 0, pins & ENC_B != 0);
}

// vim: ts=4 sw=4 expandtab

#![allow(unused_unsafe)]

use crate::hw::mcu;
use labcore::timer::{CompareOutput, Prescaler, TimerHw, TimerKind};

const COMA_SHIFT: u8 = 6;
const COMA_MASK: u8 = 0b11 << COMA_SHIFT;
const WGM_A_MASK: u8 = 0b0000_0011;
const WGM_B_MASK: u8 = 0b0001_1000;
const CS_MASK: u8 = 0b0000_0111;
const OCIEA: u8 = 1 << 1;

fn com_bits(output: CompareOutput) -> u8 {
    let com = match output {
        CompareOutput::Disconnected => 0b00,
        CompareOutput::Toggle => 0b01,
        CompareOutput::Clear => 0b10,
        CompareOutput::Set => 0b11,
    };
    com << COMA_SHIFT
}

#[rustfmt::skip]
macro_rules! impl_timer {
    (
        $struct:ident,
        $periph:ident,
        $kind:expr,
        $width:ty,
        $tccra:ident,
        $tccrb:ident,
        $tcnt:ident,
        $ocra:ident,
        $timsk:ident,
        $wgm_a:expr,
        $wgm_b:expr
    ) => {
        pub struct $struct(pub mcu::$periph);

        impl TimerHw for $struct {
            const KIND: TimerKind = $kind;

            fn set_ctc_mode(&mut self) {
                // SAFETY: Only the WGM bits are changed. The values are valid CTC encodings.
                self.0.$tccra().modify(|r, w| unsafe {
                    w.bits((r.bits() & !WGM_A_MASK) | $wgm_a)
                });
                // SAFETY: See above.
                self.0.$tccrb().modify(|r, w| unsafe {
                    w.bits((r.bits() & !WGM_B_MASK) | $wgm_b)
                });
            }

            fn set_clock(&mut self, prescaler: Option<Prescaler>) {
                let cs = prescaler
                    .and_then(|ps| Self::KIND.clock_select(ps))
                    .unwrap_or(0);
                // SAFETY: clock_select() only returns valid CS encodings.
                self.0.$tccrb().modify(|r, w| unsafe {
                    w.bits((r.bits() & !CS_MASK) | cs)
                });
            }

            fn set_compare(&mut self, top: u16) {
                self.0.$ocra().write(|w| w.set(top as $width));
            }

            fn set_compare_output(&mut self, output: CompareOutput) {
                // SAFETY: Only the COMnA bits are changed.
                self.0.$tccra().modify(|r, w| unsafe {
                    w.bits((r.bits() & !COMA_MASK) | com_bits(output))
                });
            }

            fn set_compare_irq(&mut self, enable: bool) {
                // SAFETY: Only the OCIEnA bit is changed.
                self.0.$timsk().modify(|r, w| unsafe {
                    w.bits(if enable { r.bits() | OCIEA } else { r.bits() & !OCIEA })
                });
            }

            fn clear_counter(&mut self) {
                self.0.$tcnt().write(|w| w.set(0));
            }
        }
    };
}

// CTC is WGM = 0b010 on the 8 bit timers and WGM = 0b0100 on the 16 bit timers.
impl_timer!(Tc0, TC0, TimerKind::Sync8, u8, tccr0a, tccr0b, tcnt0, ocr0a, timsk0, 0b10, 0b00000);
impl_timer!(Tc1, TC1, TimerKind::Sync16, u16, tccr1a, tccr1b, tcnt1, ocr1a, timsk1, 0b00, 0b01000);
impl_timer!(Tc3, TC3, TimerKind::Sync16, u16, tccr3a, tccr3b, tcnt3, ocr3a, timsk3, 0b00, 0b01000);

// vim: ts=4 sw=4 expandtab

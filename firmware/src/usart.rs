#![allow(unused_unsafe)]

use crate::{
    config::{RX_SIZE, TX_SIZE},
    hw::{interrupt, mcu},
    mutex::{IrqCtx, MainInitCtx},
};
use labcore::serial::{SerialRx, SerialTx, UsartHw};

const RXCIE: u8 = 1 << 7;
const UDRIE: u8 = 1 << 5;
const RXEN: u8 = 1 << 4;
const TXEN: u8 = 1 << 3;
/// 8 data bits, no parity, 2 stop bits.
const FRAME_8N2: u8 = 0b0000_1110;

pub static RX: SerialRx<RX_SIZE> = SerialRx::new();
pub static TX: SerialTx<TX_SIZE> = SerialTx::new();

pub struct Usart1(mcu::USART1);

impl Usart1 {
    pub fn new(_c: &MainInitCtx, usart: mcu::USART1, ubrr: u16) -> Self {
        usart.ubrr1().write(|w| w.set(ubrr));
        // SAFETY: Normal speed, no multi processor mode.
        usart.ucsr1a().write(|w| unsafe { w.bits(0) });
        // SAFETY: Valid frame format.
        usart.ucsr1c().write(|w| unsafe { w.bits(FRAME_8N2) });
        // SAFETY: Valid control bits.
        usart.ucsr1b().write(|w| unsafe { w.bits(RXCIE | RXEN | TXEN) });
        Self(usart)
    }

    /// # SAFETY
    ///
    /// May only be called from the USART1 interrupt handlers.
    #[inline(always)]
    unsafe fn steal() -> Self {
        // SAFETY: See the function contract.
        Self(unsafe { mcu::USART1::steal() })
    }
}

impl UsartHw for &Usart1 {
    #[inline(always)]
    fn write_data(&mut self, data: u8) {
        self.0.udr1().write(|w| w.set(data));
    }

    #[inline(always)]
    fn read_data(&mut self) -> u8 {
        self.0.udr1().read().bits()
    }

    fn set_udre_irq(&mut self, enable: bool) {
        interrupt::free(|_| {
            // SAFETY: Only the UDRIE bit is changed.
            self.0.ucsr1b().modify(|r, w| unsafe {
                w.bits(if enable { r.bits() | UDRIE } else { r.bits() & !UDRIE })
            });
        });
    }
}

pub fn irq_handler_rx(c: &IrqCtx) {
    // SAFETY: We are the USART1 RX interrupt handler.
    let usart = unsafe { Usart1::steal() };
    RX.on_receive(c, (&usart).read_data());
}

pub fn irq_handler_udre(c: &IrqCtx) {
    // SAFETY: We are the USART1 UDRE interrupt handler.
    let usart = unsafe { Usart1::steal() };
    TX.on_data_register_empty(c, &mut &usart);
}

// vim: ts=4 sw=4 expandtab

// -*- coding: utf-8 -*-
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Interrupt driven USART channel.
//!
//! The receive interrupt pushes into the RX ring and `main()` pops lines from it.
//! `main()` pushes into the TX ring and the data register empty interrupt
//! moves one byte per invocation into the transmitter.

use crate::{
    debug::Debug,
    line::{Line, RxEvent, extract_line, has_complete_line, is_input_ready, receive_byte},
    mutex::{IrqCtx, MainCtx, free},
    ring::{Consumer, Producer, Ring},
};
use core::convert::Infallible;
use ufmt::derive::uDebug;

/// Register level access to one USART.
pub trait UsartHw {
    fn write_data(&mut self, data: u8);
    fn read_data(&mut self) -> u8;
    /// Enable or disable the data register empty interrupt.
    ///
    /// The handler disables it when the TX ring runs empty.
    /// The implementation must tolerate that happening concurrently.
    fn set_udre_irq(&mut self, enable: bool);
}

impl<T: UsartHw> UsartHw for &mut T {
    fn write_data(&mut self, data: u8) {
        (**self).write_data(data);
    }

    fn read_data(&mut self) -> u8 {
        (**self).read_data()
    }

    fn set_udre_irq(&mut self, enable: bool) {
        (**self).set_udre_irq(enable);
    }
}

#[derive(Copy, Clone, PartialEq, Eq, Debug, uDebug)]
pub enum BaudError {
    ZeroBaud,
    /// The divisor does not fit the 12 bit UBRR register.
    OutOfRange,
    /// The achievable rate is more than 2% off.
    Inexact,
}

/// UBRR value for normal speed asynchronous mode.
///
/// UBRR = round(f_cpu / (16 * baud)) - 1
pub fn baud_divisor(f_cpu: u32, baud: u32) -> Result<u16, BaudError> {
    if baud == 0 {
        return Err(BaudError::ZeroBaud);
    }
    let div = 16 * baud as u64;
    let counts = (f_cpu as u64 + div / 2) / div;
    if counts == 0 || counts > 0x1000 {
        return Err(BaudError::OutOfRange);
    }
    let actual = f_cpu as u64 / (16 * counts);
    if actual.abs_diff(baud as u64) * 50 > baud as u64 {
        return Err(BaudError::Inexact);
    }
    Ok((counts - 1) as u16)
}

/// Receive half of a channel.
pub struct SerialRx<const SIZE: usize> {
    ring: Ring<SIZE>,
}

impl<const SIZE: usize> SerialRx<SIZE> {
    pub const fn new() -> Self {
        Self { ring: Ring::new() }
    }

    /// Receive complete interrupt handler body.
    pub fn on_receive(&self, c: &IrqCtx<'_>, byte: u8) -> RxEvent {
        let event = receive_byte(&mut self.ring.producer(), byte);
        if event == RxEvent::Dropped {
            Debug::RxDropped.inc_cs(c.cs());
        }
        event
    }

    /// The interrupt handler may take back the newest byte (DEL) at any time.
    /// Anything that pops must check and pop with interrupts disabled.
    fn consumer(&self, _m: &MainCtx<'_>) -> Consumer<'_, SIZE> {
        self.ring.consumer()
    }

    pub fn byte_available(&self, m: &MainCtx<'_>) -> bool {
        !self.consumer(m).is_empty()
    }

    pub fn read_byte(&self, m: &MainCtx<'_>) -> Option<u8> {
        free(|_| self.consumer(m).pop())
    }

    pub fn has_complete_line(&self, m: &MainCtx<'_>) -> bool {
        has_complete_line(&self.consumer(m))
    }

    /// A complete line is waiting or the ring is full.
    pub fn line_ready(&self, m: &MainCtx<'_>) -> bool {
        is_input_ready(&self.consumer(m))
    }

    /// Take everything that is buffered as one line. See [extract_line].
    ///
    /// Copying and draining run with interrupts disabled.
    pub fn get_line<const N: usize>(&self, m: &MainCtx<'_>) -> Line<N> {
        free(|_| extract_line(&mut self.consumer(m)))
    }
}

impl<const SIZE: usize> Default for SerialRx<SIZE> {
    fn default() -> Self {
        Self::new()
    }
}

/// Transmit half of a channel.
pub struct SerialTx<const SIZE: usize> {
    ring: Ring<SIZE>,
}

impl<const SIZE: usize> SerialTx<SIZE> {
    pub const fn new() -> Self {
        Self { ring: Ring::new() }
    }

    /// Data register empty interrupt handler body.
    pub fn on_data_register_empty<H: UsartHw>(&self, _c: &IrqCtx<'_>, hw: &mut H) {
        match self.ring.consumer().pop() {
            Some(data) => hw.write_data(data),
            None => hw.set_udre_irq(false),
        }
    }

    /// Get the `main()` side writer.
    pub fn writer<'a, H: UsartHw>(&'a self, _m: &MainCtx<'_>, hw: H) -> TxWriter<'a, SIZE, H> {
        TxWriter {
            ring: self.ring.producer(),
            hw,
        }
    }

    /// Bytes not yet handed to the transmitter.
    pub fn pending(&self) -> usize {
        self.ring.len()
    }
}

impl<const SIZE: usize> Default for SerialTx<SIZE> {
    fn default() -> Self {
        Self::new()
    }
}

pub struct TxWriter<'a, const SIZE: usize, H> {
    ring: Producer<'a, SIZE>,
    hw: H,
}

impl<const SIZE: usize, H: UsartHw> TxWriter<'_, SIZE, H> {
    /// Queue a byte, if there is room.
    pub fn try_send_byte(&mut self, data: u8) -> bool {
        let ok = self.ring.push(data);
        if ok {
            self.hw.set_udre_irq(true);
        }
        ok
    }

    fn push_blocking(&mut self, data: u8) {
        if self.ring.is_full() {
            Debug::TxStalled.inc();
            while self.ring.is_full() {}
        }
        self.ring.push_unchecked(data);
        self.hw.set_udre_irq(true);
    }

    /// Queue a byte. Waits for room, if the ring is full.
    ///
    /// `'\n'` is sent as `"\r\n"`.
    pub fn send_byte(&mut self, data: u8) {
        if data == b'\n' {
            self.push_blocking(b'\r');
        }
        self.push_blocking(data);
    }

    pub fn write_bytes(&mut self, data: &[u8]) {
        for &b in data {
            self.send_byte(b);
        }
    }

    /// Wait until the interrupt has taken everything from the ring.
    pub fn flush(&mut self) {
        while !self.ring.is_empty() {}
    }
}

impl<const SIZE: usize, H: UsartHw> ufmt::uWrite for TxWriter<'_, SIZE, H> {
    type Error = Infallible;

    fn write_str(&mut self, s: &str) -> Result<(), Self::Error> {
        self.write_bytes(s.as_bytes());
        Ok(())
    }
}


// vim: ts=4 sw=4 expandtab

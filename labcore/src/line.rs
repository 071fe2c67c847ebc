// -*- coding: utf-8 -*-
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Command line framing on top of the receive ring.

use crate::ring::{Consumer, Producer};
use heapless::Vec;
use ufmt::derive::uDebug;

/// Default maximum length of one command line.
pub const LINE_LEN: usize = 40;

/// Backspace as sent by most terminals.
pub const DEL: u8 = 0x7F;

pub type Line<const N: usize = LINE_LEN> = Vec<u8, N>;

#[inline]
pub fn is_terminator(byte: u8) -> bool {
    byte == b'\r' || byte == b'\n'
}

/// Outcome of one received byte.
#[derive(Copy, Clone, PartialEq, Eq, Debug, uDebug)]
pub enum RxEvent {
    Stored,
    /// DEL took back the previous byte.
    Erased,
    /// The ring was full. The byte is lost.
    Dropped,
}

/// Receive interrupt side of the framing.
///
/// DEL erases the most recent byte. On an empty ring it is stored like any other byte.
pub fn receive_byte<const SIZE: usize>(rx: &mut Producer<'_, SIZE>, byte: u8) -> RxEvent {
    if byte == DEL && !rx.is_empty() {
        rx.unpush_unchecked();
        RxEvent::Erased
    } else if rx.push(byte) {
        RxEvent::Stored
    } else {
        RxEvent::Dropped
    }
}

/// Is there a CR or LF in the unread bytes?
pub fn has_complete_line<const SIZE: usize>(rx: &Consumer<'_, SIZE>) -> bool {
    rx.iter().any(is_terminator)
}

/// A line can be extracted: there is a terminator or the ring is full.
pub fn is_input_ready<const SIZE: usize>(rx: &Consumer<'_, SIZE>) -> bool {
    rx.is_full() || has_complete_line(rx)
}

/// Copy the buffered bytes (at most `N`) with trailing CR/LF stripped
/// and then drain the whole ring.
///
/// Everything pending goes into one line.
/// If two terminated lines are waiting, the result contains both,
/// joined by the inner terminator.
pub fn extract_line<const SIZE: usize, const N: usize>(rx: &mut Consumer<'_, SIZE>) -> Line<N> {
    let mut line = Line::<N>::new();
    line.extend(rx.iter().take(N));
    while line.last().is_some_and(|&b| is_terminator(b)) {
        line.pop();
    }
    rx.clear();
    line
}

/// Byte-wise line accumulator.
///
/// Unlike [extract_line] this splits pending input at every terminator.
pub struct LineBuffer<const N: usize = LINE_LEN> {
    buf: Line<N>,
    after_cr: bool,
    dropped: u16,
}

impl<const N: usize> LineBuffer<N> {
    pub const fn new() -> Self {
        Self {
            buf: Vec::new(),
            after_cr: false,
            dropped: 0,
        }
    }

    /// Feed one byte. Returns the line on CR or LF.
    ///
    /// The LF of a CR LF pair does not produce a second, empty line.
    pub fn feed(&mut self, byte: u8) -> Option<Line<N>> {
        let after_cr = core::mem::replace(&mut self.after_cr, byte == b'\r');
        match byte {
            b'\n' if after_cr => None,
            b'\r' | b'\n' => Some(core::mem::take(&mut self.buf)),
            DEL => {
                self.buf.pop();
                None
            }
            _ => {
                if self.buf.push(byte).is_err() {
                    self.dropped = self.dropped.saturating_add(1);
                }
                None
            }
        }
    }

    /// Pop bytes from `rx` until a line is complete or the ring is empty.
    pub fn feed_from<const SIZE: usize>(&mut self, rx: &mut Consumer<'_, SIZE>) -> Option<Line<N>> {
        while let Some(byte) = rx.pop() {
            if let Some(line) = self.feed(byte) {
                return Some(line);
            }
        }
        None
    }

    /// The incomplete line.
    pub fn pending(&self) -> &[u8] {
        &self.buf
    }

    /// Number of bytes that did not fit into a line.
    pub fn dropped(&self) -> u16 {
        self.dropped
    }
}

impl<const N: usize> Default for LineBuffer<N> {
    fn default() -> Self {
        Self::new()
    }
}


// vim: ts=4 sw=4 expandtab

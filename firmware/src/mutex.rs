//! Context tokens and the fatal error path of the firmware.

pub use labcore::mutex::*;

/// Take the value or reset the board.
///
/// Only used for things that cannot fail once the board has started,
/// such as taking the peripherals. It does not pull in the panic machinery.
#[inline(always)]
pub fn unwrap_option<T>(value: Option<T>) -> T {
    let Some(value) = value else { reset_system() };
    value
}

/// Take the value or reset the board. The error itself is discarded.
///
/// A bad timer or baud rate configuration ends up here.
#[inline(always)]
pub fn unwrap_result<T, E>(value: Result<T, E>) -> T {
    let Ok(value) = value else { reset_system() };
    value
}

/// Stop and let the watchdog reset the board.
///
/// The watchdog runs with a 250 ms timeout and only the main loop retriggers it.
/// Interrupts stay enabled, so the UART keeps draining until the reset hits.
#[inline(always)]
#[allow(clippy::empty_loop)]
pub fn reset_system() -> ! {
    loop {}
}

#[inline(always)]
#[panic_handler]
fn panic(_: &core::panic::PanicInfo) -> ! {
    reset_system();
}

// vim: ts=4 sw=4 expandtab

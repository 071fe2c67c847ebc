pub use atmega::{self as mcu, Peripherals};
pub use avr_device::atmega1284p as atmega;
pub use avr_device::interrupt;

use labcore::mutex::IrqCtx;

/// Bind interrupt vectors to handlers that take an [IrqCtx].
macro_rules! isr_table {
    ($($vector:ident => $handler:path),* $(,)?) => {
        $(
            #[avr_device::interrupt(atmega1284p)]
            fn $vector() {
                // SAFETY: The vector runs with the global interrupt flag cleared by hardware.
                let c = unsafe { IrqCtx::new() };
                $handler(&c);
            }
        )*
    };
}

isr_table! {
    TIMER0_COMPA => crate::tasks::irq_handler_timer0_compa,
    TIMER1_COMPA => crate::tasks::irq_handler_timer1_compa,
    TIMER3_COMPA => crate::tasks::irq_handler_timer3_compa,
    USART1_RX => crate::usart::irq_handler_rx,
    USART1_UDRE => crate::usart::irq_handler_udre,
    PCINT0 => crate::motor::irq_handler_pcint0,
}

// vim: ts=4 sw=4 expandtab

#![no_std]
#![no_main]
#![feature(abi_avr_interrupt)]
#![feature(asm_experimental_arch)]

mod config;
mod hw;
mod leds;
mod motor;
mod mutex;
mod tasks;
mod timers;
mod usart;

use crate::{
    config::{BAUD, F_CPU, GREEN_PERIOD_MS, PD_PARAMS, TRAVEL, TRAVEL_HYST, TX_SIZE},
    hw::{Peripherals, interrupt, mcu},
    leds::{GREEN_LED, RED_LED, yellow_led_init},
    motor::{ENCODER, MotorPwm, encoder_init},
    mutex::{
        LazyMainInit, MainCtx, MainInitCtx, MutexCell, reset_system, unwrap_option, unwrap_result,
    },
    tasks::{BLINK, CONTROL, RED, SCHED, TimerPeriph, tasks_init},
    usart::{RX, TX, Usart1},
};
use labcore::{
    debug::Debug,
    line::Line,
    pd::Pd,
    periph::{DigitalOut, Encoder},
    serial::{TxWriter, baud_divisor},
};
use ufmt::uwrite;

// SAFETY: Is initialized when constructing the MainCtx.
static MOTOR: LazyMainInit<MotorPwm> = unsafe { LazyMainInit::uninit() };
// SAFETY: Is initialized when constructing the MainCtx.
static USART: LazyMainInit<Usart1> = unsafe { LazyMainInit::uninit() };

static PD: Pd = Pd::new();
static SETPOINT: MutexCell<i32> = MutexCell::new(TRAVEL);

fn wdt_init() {
    // SAFETY: The asm code only accesses the WDT registers
    //         which are not accessed from anywhere else in the program.
    unsafe {
        // Enable WDT with timeout 250 ms
        core::arch::asm!(
            "ldi {tmp}, 0x18", // WDCE=1, WDE=1
            "sts {WDTCSR}, {tmp}",
            "ldi {tmp}, 0x0C", // WDE=1, WDP=0b0100
            "sts {WDTCSR}, {tmp}",
            tmp = out(reg_upper) _,
            WDTCSR = const 0x60,
            options(nostack, preserves_flags)
        );
    }
}

fn wdt_poke(_wp: &mcu::WDT) {
    avr_device::asm::wdr();
}

/// Drive the motor back and forth between the travel limits.
fn control_step(m: &MainCtx<'_>) {
    let sp = SETPOINT.get(m);
    if (ENCODER.count() - sp).abs() <= TRAVEL_HYST {
        SETPOINT.set(m, -sp);
    }
    PD.step(m, &PD_PARAMS, SETPOINT.get(m), &ENCODER, &mut MOTOR.deref(m));
}

/// Fixed runtime commands. Anything else is echoed.
///
/// - `fast` / `slow`: green LED period of a quarter / the default.
/// - `rel`: print and clear the release counters.
/// - `reset`: reset through the watchdog.
fn handle_line(m: &MainCtx<'_>, tx: &mut TxWriter<'_, TX_SIZE, &Usart1>, line: &[u8]) {
    match line {
        b"fast" | b"slow" => {
            let ms = if line == b"fast" {
                GREEN_PERIOD_MS / 4
            } else {
                GREEN_PERIOD_MS
            };
            match SCHED.set_task_period(m, BLINK, ms) {
                Ok(threshold) => {
                    let _ = uwrite!(*tx, "green={}ms ticks={}\n", ms, threshold);
                }
                Err(_) => tx.write_bytes(b"period error\n"),
            }
        }
        b"rel" => {
            for (name, id) in [("red", RED), ("blink", BLINK), ("control", CONTROL)] {
                let ch = SCHED.channel(id);
                let _ = uwrite!(*tx, "{}={} ", name, ch.releases());
                ch.clear_releases();
            }
            tx.send_byte(b'\n');
        }
        b"reset" => {
            tx.write_bytes(b"bye\n");
            tx.flush();
            reset_system();
        }
        _ => {
            tx.write_bytes(b"> ");
            tx.write_bytes(line);
            tx.send_byte(b'\n');
        }
    }
}

#[avr_device::entry]
fn main() -> ! {
    wdt_init();

    let dp = unwrap_option(Peripherals::take());

    let tp = TimerPeriph {
        TC0: dp.TC0,
        TC1: dp.TC1,
        TC3: dp.TC3,
    };

    let ubrr = unwrap_result(baud_divisor(F_CPU, BAUD));

    let init_static_vars = |ctx: &MainInitCtx| {
        RED_LED.init(ctx);
        GREEN_LED.init(ctx);
        yellow_led_init(&dp.PORTD);
        MOTOR.init(ctx, MotorPwm::new(ctx, dp.TC2, &dp.PORTC, &dp.PORTD));
        encoder_init(ctx, &dp.EXINT, &dp.PORTA);
        USART.init(ctx, Usart1::new(ctx, dp.USART1, ubrr));
    };

    // # SAFETY
    //
    // This is the context handle for the main() function.
    // Holding a reference to this object proves that the holder
    // is running in main() context.
    let m = unsafe { MainCtx::new_with_init(init_static_vars) };

    tasks_init(&m, tp);

    // SAFETY: This must be after construction of MainCtx
    //         and after initialization of static MainInit variables.
    unsafe { interrupt::enable() };

    let mut tx = TX.writer(&m, USART.deref(&m));
    tx.write_bytes(b"lab ready\n");

    let mut red = RED_LED;
    loop {
        if SCHED.channel(RED).take_due() {
            red.toggle();
            Debug::Releases.log_u16(SCHED.channel(BLINK).releases());
            #[cfg(feature = "debug")]
            {
                let _ = labcore::debug::DEBUG.report(&mut tx);
            }
        }

        if SCHED.channel(CONTROL).take_due() {
            control_step(&m);
        }

        if RX.line_ready(&m) {
            let line: Line = RX.get_line(&m);
            handle_line(&m, &mut tx, &line);
        }

        wdt_poke(&dp.WDT);
    }
}

// vim: ts=4 sw=4 expandtab

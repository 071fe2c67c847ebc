use crate::{
    config::{
        BLINK_TICK_HZ, CONTROL_PERIOD_MS, CONTROL_TICK_HZ, F_CPU, GREEN_PERIOD_MS, RED_PERIOD_MS,
        RED_TICK_HZ,
    },
    hw::mcu,
    leds::GREEN_LED,
    mutex::{IrqCtx, MainCtx, unwrap_result},
    timers::{Tc0, Tc1, Tc3},
};
use labcore::{
    periph::DigitalOut,
    sched::{Channel, Release, Scheduler},
    timer::CompareOutput,
};

/// TC0: red LED, toggled by `main()`.
pub const RED: usize = 0;
/// TC1: yellow LED in hardware, green LED from the interrupt.
pub const BLINK: usize = 1;
/// TC3: motor control loop.
pub const CONTROL: usize = 2;

pub static SCHED: Scheduler<3> = Scheduler::new([
    Channel::new(Release::Flag, 0),
    Channel::new(Release::Call(toggle_green), 0),
    Channel::new(Release::Flag, 0),
]);

fn toggle_green(_c: &IrqCtx<'_>) {
    let mut led = GREEN_LED;
    led.toggle();
}

#[allow(non_snake_case)]
pub struct TimerPeriph {
    pub TC0: mcu::TC0,
    pub TC1: mcu::TC1,
    pub TC3: mcu::TC3,
}

/// Start all channel timers. Any configuration error is fatal.
pub fn tasks_init(m: &MainCtx<'_>, tp: TimerPeriph) {
    unwrap_result(SCHED.configure_channel(m, RED, &mut Tc0(tp.TC0), F_CPU, RED_TICK_HZ));
    unwrap_result(SCHED.set_task_period(m, RED, RED_PERIOD_MS));

    unwrap_result(SCHED.channel(BLINK).configure_with_output(
        m,
        &mut Tc1(tp.TC1),
        F_CPU,
        BLINK_TICK_HZ,
        CompareOutput::Toggle,
    ));
    unwrap_result(SCHED.set_task_period(m, BLINK, GREEN_PERIOD_MS));

    unwrap_result(SCHED.configure_channel(m, CONTROL, &mut Tc3(tp.TC3), F_CPU, CONTROL_TICK_HZ));
    unwrap_result(SCHED.set_task_period(m, CONTROL, CONTROL_PERIOD_MS));
}

pub fn irq_handler_timer0_compa(c: &IrqCtx) {
    SCHED.tick(c, RED);
}

pub fn irq_handler_timer1_compa(c: &IrqCtx) {
    SCHED.tick(c, BLINK);
}

pub fn irq_handler_timer3_compa(c: &IrqCtx) {
    SCHED.tick(c, CONTROL);
}

// vim: ts=4 sw=4 expandtab

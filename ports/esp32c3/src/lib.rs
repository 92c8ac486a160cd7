#![no_std]

//! ESP32-C3 port for the KumoTrail tick subsystem.
//!
//! Owns the one static instance of every tick-path driver and exposes them to
//! the rest of the kernel through C-ABI entry points.

pub mod csr;
mod entry;
pub mod uart;

#[cfg(feature = "rt")]
pub mod runtime;

use core::cell::Cell;

use critical_section::Mutex;
use kumo_hal::Mmio;
use kumo_kernel::trap::TIMER_TICK_ID;
use kumo_kernel::{
    DispatchTable, InterruptMatrix, Kernel, PeriodicTimer, SystemControl, TickCallback,
    TimerConfig, TrapDispatcher,
};
use log::LevelFilter;

pub use csr::MachineCsr;
pub use entry::trap_vector;
pub use uart::{SerialLogger, Uart0};

/// 80 MHz APB, divide by 1600, 100 Hz tick on CPU line 6.
pub const CONFIG: TimerConfig = TimerConfig::new();

const _: () = assert!(CONFIG.is_valid());
const _: () = assert!(CONFIG.cpu_line == TIMER_TICK_ID);

pub type Console = Uart0<Mmio>;
pub type Traps = TrapDispatcher<'static, MachineCsr, &'static Console>;

// SAFETY (all `Mmio::new` below): each handle only addresses its own
// peripheral's register block.
pub static SYSCTL: SystemControl<Mmio> = SystemControl::new(unsafe { Mmio::new() });
pub static MATRIX: InterruptMatrix<Mmio> = InterruptMatrix::new(unsafe { Mmio::new() });
pub static TIMER: PeriodicTimer<Mmio> = PeriodicTimer::new(unsafe { Mmio::new() }, CONFIG);
pub static CONSOLE: Console = Uart0::new(unsafe { Mmio::new() });

pub static TRAPS: Traps = TrapDispatcher::new(
    MachineCsr::new(),
    &CONSOLE,
    DispatchTable::new().with(TIMER_TICK_ID, &TIMER),
);

pub static KERNEL: Kernel<'static, 'static, Mmio, MachineCsr, &'static Console> =
    Kernel::new(&SYSCTL, &MATRIX, &TIMER, &TRAPS);

static LOGGER: SerialLogger<Mmio> =
    SerialLogger::new(Uart0::new(unsafe { Mmio::new() }), LevelFilter::Debug);

/// Route the `log` facade to UART0.
///
/// Call once, before interrupts are enabled.
pub fn install_logger() -> Result<(), log::SetLoggerError> {
    // SAFETY: single hart and interrupts still masked, so nothing else can
    // observe the logger while it is being set.
    unsafe {
        log::set_logger_racy(&LOGGER)?;
        log::set_max_level_racy(LOGGER.level());
    }
    Ok(())
}

/// Tick handler registered from C, run through [`run_c_callback`].
static C_CALLBACK: Mutex<Cell<Option<extern "C" fn()>>> = Mutex::new(Cell::new(None));

fn run_c_callback() {
    let callback = critical_section::with(|cs| C_CALLBACK.borrow(cs).get());
    if let Some(callback) = callback {
        callback();
    }
}

/// Lines arrive signed from C; negative ones name no line.
fn line_from_c(line: i32) -> Option<u32> {
    u32::try_from(line).ok()
}

#[no_mangle]
pub extern "C" fn trap_handler_c() {
    TRAPS.dispatch();
}

#[no_mangle]
pub extern "C" fn sysctl_enable_clock(peripheral: u32) {
    SYSCTL.enable_clock_raw(peripheral);
}

#[no_mangle]
pub extern "C" fn sysctl_reset_peripheral(peripheral: u32) {
    SYSCTL.reset_peripheral_raw(peripheral);
}

#[no_mangle]
pub extern "C" fn interrupt_route(source: u32, line: i32) {
    if let Some(line) = line_from_c(line) {
        MATRIX.route_raw(source, line);
    }
}

#[no_mangle]
pub extern "C" fn interrupt_enable(line: i32) {
    if let Some(line) = line_from_c(line) {
        MATRIX.enable(line);
    }
}

#[no_mangle]
pub extern "C" fn interrupt_disable(line: i32) {
    if let Some(line) = line_from_c(line) {
        MATRIX.disable(line);
    }
}

#[no_mangle]
pub extern "C" fn trap_init() {
    TRAPS.trap_init(trap_vector());
}

#[no_mangle]
pub extern "C" fn enable_interrupts() {
    TRAPS.enable_interrupts();
}

#[no_mangle]
pub extern "C" fn timer_init() {
    if let Err(err) = TIMER.init(&SYSCTL, &MATRIX) {
        log::error!("timer init failed: {}", err);
    }
}

/// A null `callback` empties the slot.
#[no_mangle]
pub extern "C" fn timer_set_callback(callback: Option<extern "C" fn()>) {
    critical_section::with(|cs| C_CALLBACK.borrow(cs).set(callback));
    TIMER.set_callback(callback.map(|_| run_c_callback as TickCallback));
}

#[no_mangle]
pub extern "C" fn timer_handle_interrupt() {
    TIMER.handle_interrupt();
}

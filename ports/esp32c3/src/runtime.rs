//! Reference application: a 100 Hz "Tick!" on the console.

use kumo_hal::LineSink;
use panic_halt as _;

use crate::{install_logger, trap_vector, CONFIG, CONSOLE, KERNEL};

pub const BANNER: &str = "KumoTrail: tick subsystem up\n";

fn on_tick() {
    CONSOLE.write_line("Tick!\n");
}

/// Called by the board's startup code once `.data` and `.bss` are set up.
#[no_mangle]
pub extern "C" fn kernel_main() -> ! {
    // A second install only happens on warm restart; the first logger stays.
    let _ = install_logger();

    match KERNEL.boot(trap_vector(), Some(on_tick)) {
        Ok(()) => CONSOLE.write_line(BANNER),
        Err(err) => log::error!("boot failed at {} Hz: {}", CONFIG.tick_hz, err),
    }

    loop {
        // SAFETY: `wfi` only stalls the hart until the next interrupt.
        unsafe { riscv::asm::wfi() };
    }
}

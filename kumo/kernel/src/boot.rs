//! Bring-up order for the tick subsystem.

use core::ptr;

use kumo_hal::{HalError, HalResult, LineSink, RegisterBus, TrapCsr};

use crate::interrupt::InterruptMatrix;
use crate::sysctl::SystemControl;
use crate::timer::{PeriodicTimer, TickCallback};
use crate::trap::TrapDispatcher;

/// The four tick-path drivers, borrowed together so they come up in the
/// right order.
pub struct Kernel<'k, 'a, B, C, S> {
    sysctl: &'k SystemControl<B>,
    matrix: &'k InterruptMatrix<B>,
    timer: &'k PeriodicTimer<B>,
    traps: &'k TrapDispatcher<'a, C, S>,
}

impl<'k, 'a, B, C, S> Kernel<'k, 'a, B, C, S>
where
    B: RegisterBus,
    C: TrapCsr,
    S: LineSink,
{
    pub const fn new(
        sysctl: &'k SystemControl<B>,
        matrix: &'k InterruptMatrix<B>,
        timer: &'k PeriodicTimer<B>,
        traps: &'k TrapDispatcher<'a, C, S>,
    ) -> Self {
        Self {
            sysctl,
            matrix,
            timer,
            traps,
        }
    }

    /// Arm the timer, install the trap vector, register `callback` and only
    /// then let interrupts in.
    ///
    /// If the timer configuration is rejected, or its CPU line does not
    /// dispatch to this timer, nothing is written and interrupts stay masked.
    pub fn boot(&self, vector: usize, callback: Option<TickCallback>) -> HalResult<()> {
        let line = self.timer.config().cpu_line;
        match self.traps.table().handler(line) {
            Some(handler) if ptr::addr_eq(handler, self.timer) => {}
            _ => return Err(HalError::UnhandledLine(line)),
        }
        self.timer.init(self.sysctl, self.matrix)?;
        self.traps.trap_init(vector);
        self.timer.set_callback(callback);
        self.traps.enable_interrupts();

        log::info!(
            "tick subsystem up: {} Hz on line {}",
            self.timer.config().tick_hz,
            self.timer.config().cpu_line
        );
        Ok(())
    }
}

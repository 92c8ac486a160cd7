//! Machine-mode CSR access through the `riscv` crate.

use kumo_hal::TrapCsr;
use riscv::register::mtvec::TrapMode;
use riscv::register::{mcause, mstatus, mtvec};

/// The hart's own trap CSRs.
#[derive(Debug, Default)]
pub struct MachineCsr {
    _private: (),
}

impl MachineCsr {
    pub const fn new() -> Self {
        Self { _private: () }
    }
}

impl TrapCsr for MachineCsr {
    fn set_trap_vector(&self, vector: usize) {
        // SAFETY: `vector` is the address of the assembly entry stub, which
        // saves and restores the full caller-saved frame around the dispatcher.
        unsafe { mtvec::write(vector, TrapMode::Direct) }
    }

    fn cause(&self) -> u32 {
        mcause::read().bits() as u32
    }

    fn enable_interrupts(&self) {
        // SAFETY: only called once every source is armed and the vector is live.
        unsafe { mstatus::set_mie() }
    }
}

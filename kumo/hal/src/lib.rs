//! Hardware access layer for the KumoTrail kernel
//!
//! This crate provides the seams between the kernel's drivers and the
//! silicon: a register bus for memory-mapped peripherals, a trap CSR
//! interface, the serial line sink used for diagnostics and the handler
//! capability the trap dispatcher routes to. Target ports implement the
//! traits against real hardware; the `sim` feature provides host models.

#![cfg_attr(not(feature = "std"), no_std)]

pub mod csr;
pub mod error;
pub mod interrupt;
pub mod mmio;
pub mod uart;

#[cfg(any(test, feature = "sim"))]
pub mod sim;

// Re-export commonly used types
pub use csr::{Trap, TrapCsr};
pub use error::{HalError, HalResult};
pub use interrupt::InterruptHandler;
pub use mmio::{Mmio, RegisterBus};
pub use uart::LineSink;

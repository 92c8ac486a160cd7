#![no_std]

//! # KumoTrail kernel tick subsystem
//!
//! Drivers that turn a timer-group alarm into a periodic software tick on
//! the ESP32-C3:
//!
//! - [`sysctl`]    – clock gating and reset pulses for peripherals.
//! - [`interrupt`] – interrupt matrix routing and CPU line masking.
//! - [`trap`]      – trap vector installation and cause dispatch.
//! - [`timer`]     – the periodic alarm timer and its tick callback.
//! - [`config`]    – build-time timer configuration.
//! - [`boot`]      – the bring-up order that ties them together.
//!
//! Every driver is a handle over a [`RegisterBus`](kumo_hal::RegisterBus),
//! so the same code runs on the chip and against `kumo_hal::sim` on a host.

pub mod boot;
pub mod config;
pub mod interrupt;
pub mod sysctl;
pub mod timer;
pub mod trap;

pub use boot::Kernel;
pub use config::TimerConfig;
pub use interrupt::{InterruptMatrix, InterruptSource};
pub use sysctl::{Peripheral, SystemControl};
pub use timer::{PeriodicTimer, TickCallback};
pub use trap::{DispatchTable, TrapDispatcher, TrapState};

pub use kumo_hal::{HalError, HalResult};

#[cfg(test)]
extern crate std;

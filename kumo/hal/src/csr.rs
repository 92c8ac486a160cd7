//! Machine-mode trap CSR abstraction

use core::fmt;

/// Bit 31 of `mcause` flags an asynchronous interrupt.
pub const INTERRUPT_FLAG: u32 = 1 << 31;

/// Access to the CSRs the trap dispatcher needs.
pub trait TrapCsr {
    /// Point `mtvec` at `vector` in direct mode.
    fn set_trap_vector(&self, vector: usize);

    /// Raw `mcause` of the trap being handled.
    fn cause(&self) -> u32;

    /// Set `mstatus.MIE`, allowing the core to take interrupts.
    fn enable_interrupts(&self);
}

impl<T: TrapCsr + ?Sized> TrapCsr for &T {
    fn set_trap_vector(&self, vector: usize) {
        (**self).set_trap_vector(vector);
    }

    fn cause(&self) -> u32 {
        (**self).cause()
    }

    fn enable_interrupts(&self) {
        (**self).enable_interrupts();
    }
}

/// Decoded trap cause. Lives only for the duration of one trap.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Trap {
    /// Asynchronous interrupt with its numeric id
    Interrupt(u32),
    /// Synchronous exception with its exception code
    Exception(u32),
}

impl Trap {
    /// Decode a raw `mcause` value.
    pub const fn from_bits(bits: u32) -> Self {
        if bits & INTERRUPT_FLAG != 0 {
            Self::Interrupt(bits & !INTERRUPT_FLAG)
        } else {
            Self::Exception(bits)
        }
    }

    /// Encode back into `mcause` form.
    pub const fn bits(self) -> u32 {
        match self {
            Self::Interrupt(id) => INTERRUPT_FLAG | id,
            Self::Exception(code) => code & !INTERRUPT_FLAG,
        }
    }

    pub const fn is_interrupt(self) -> bool {
        matches!(self, Self::Interrupt(_))
    }
}

impl fmt::Display for Trap {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Interrupt(id) => write!(f, "interrupt {}", id),
            Self::Exception(code) => write!(f, "exception {}", code),
        }
    }
}

#[cfg(feature = "defmt")]
impl defmt::Format for Trap {
    fn format(&self, fmt: defmt::Formatter) {
        match self {
            Self::Interrupt(id) => defmt::write!(fmt, "Interrupt({})", id),
            Self::Exception(code) => defmt::write!(fmt, "Exception({})", code),
        }
    }
}

//! Memory-mapped register access

/// 32-bit register access by absolute address.
///
/// Peripheral handles own their base addresses and compute register
/// addresses internally; a bus only moves words. Implementations must treat
/// every access as having side effects (no caching, no merging).
pub trait RegisterBus {
    /// Read the register at `addr`.
    fn read(&self, addr: usize) -> u32;

    /// Write `value` to the register at `addr`.
    fn write(&self, addr: usize, value: u32);

    /// Read-modify-write the register at `addr`.
    fn modify<F>(&self, addr: usize, f: F)
    where
        F: FnOnce(u32) -> u32,
    {
        let value = self.read(addr);
        self.write(addr, f(value));
    }

    /// Set `mask` bits, leaving the others untouched.
    fn set_bits(&self, addr: usize, mask: u32) {
        self.modify(addr, |value| value | mask);
    }

    /// Clear `mask` bits, leaving the others untouched.
    fn clear_bits(&self, addr: usize, mask: u32) {
        self.modify(addr, |value| value & !mask);
    }
}

impl<T: RegisterBus + ?Sized> RegisterBus for &T {
    fn read(&self, addr: usize) -> u32 {
        (**self).read(addr)
    }

    fn write(&self, addr: usize, value: u32) {
        (**self).write(addr, value);
    }
}

/// Volatile access to the physical address space.
#[derive(Debug)]
pub struct Mmio {
    _private: (),
}

impl Mmio {
    /// Creates the physical bus.
    ///
    /// # Safety
    ///
    /// Every address later passed to [`RegisterBus::read`] or
    /// [`RegisterBus::write`] must be a valid, aligned device register. The
    /// kernel's peripheral handles only ever compute addresses inside their
    /// own register block, so handing this bus to them upholds the contract.
    pub const unsafe fn new() -> Self {
        Self { _private: () }
    }
}

impl RegisterBus for Mmio {
    #[inline(always)]
    fn read(&self, addr: usize) -> u32 {
        // SAFETY: guaranteed by the contract of `Mmio::new`.
        unsafe { (addr as *const u32).read_volatile() }
    }

    #[inline(always)]
    fn write(&self, addr: usize, value: u32) {
        // SAFETY: guaranteed by the contract of `Mmio::new`.
        unsafe { (addr as *mut u32).write_volatile(value) }
    }
}

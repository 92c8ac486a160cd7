//! System register block: peripheral clock gates and reset lines.

use core::fmt;

use kumo_hal::RegisterBus;

/// Base of the ESP32-C3 system register block.
pub const SYSTEM_BASE: usize = 0x600C_0000;

const PERIP_CLK_EN0: usize = 0x0010;
const PERIP_RST_EN0: usize = 0x0018;

/// Peripherals whose clock and reset lines this block controls.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u32)]
pub enum Peripheral {
    Uart0 = 0,
    Uart1 = 1,
    Timg0 = 2,
    Timg1 = 3,
}

impl Peripheral {
    /// Decode a raw identifier. Unknown values yield `None`.
    pub const fn from_raw(raw: u32) -> Option<Self> {
        match raw {
            0 => Some(Self::Uart0),
            1 => Some(Self::Uart1),
            2 => Some(Self::Timg0),
            3 => Some(Self::Timg1),
            _ => None,
        }
    }

    /// Bit in both `PERIP_CLK_EN0` and `PERIP_RST_EN0`.
    const fn mask(self) -> u32 {
        match self {
            Self::Uart0 => 1 << 2,
            Self::Uart1 => 1 << 5,
            Self::Timg0 => 1 << 13,
            Self::Timg1 => 1 << 15,
        }
    }
}

impl fmt::Display for Peripheral {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Uart0 => "UART0",
            Self::Uart1 => "UART1",
            Self::Timg0 => "TIMG0",
            Self::Timg1 => "TIMG1",
        };
        f.write_str(name)
    }
}

#[cfg(feature = "defmt")]
impl defmt::Format for Peripheral {
    fn format(&self, fmt: defmt::Formatter) {
        match self {
            Self::Uart0 => defmt::write!(fmt, "UART0"),
            Self::Uart1 => defmt::write!(fmt, "UART1"),
            Self::Timg0 => defmt::write!(fmt, "TIMG0"),
            Self::Timg1 => defmt::write!(fmt, "TIMG1"),
        }
    }
}

/// Handle over the system register block.
///
/// All operations are fire-and-forget register writes; the hardware gives
/// no acknowledgement and none is polled for.
#[derive(Debug)]
pub struct SystemControl<B> {
    bus: B,
    base: usize,
}

impl<B: RegisterBus> SystemControl<B> {
    /// Handle at the chip's fixed base address.
    pub const fn new(bus: B) -> Self {
        Self::at(bus, SYSTEM_BASE)
    }

    /// Handle at an explicit base address.
    pub const fn at(bus: B, base: usize) -> Self {
        Self { bus, base }
    }

    /// Gate the peripheral's clock on.
    pub fn enable_clock(&self, peripheral: Peripheral) {
        self.bus.set_bits(self.base + PERIP_CLK_EN0, peripheral.mask());
    }

    /// Gate the peripheral's clock off.
    pub fn disable_clock(&self, peripheral: Peripheral) {
        self.bus.clear_bits(self.base + PERIP_CLK_EN0, peripheral.mask());
    }

    pub fn is_clock_enabled(&self, peripheral: Peripheral) -> bool {
        self.bus.read(self.base + PERIP_CLK_EN0) & peripheral.mask() != 0
    }

    /// Pulse the peripheral's reset line: assert, then release at once.
    ///
    /// Afterwards the peripheral's registers hold their power-on values.
    pub fn reset_peripheral(&self, peripheral: Peripheral) {
        let addr = self.base + PERIP_RST_EN0;
        self.bus.set_bits(addr, peripheral.mask());
        self.bus.clear_bits(addr, peripheral.mask());
    }

    /// [`enable_clock`](Self::enable_clock) for a raw identifier; unknown
    /// identifiers are ignored.
    pub fn enable_clock_raw(&self, raw: u32) {
        if let Some(peripheral) = Peripheral::from_raw(raw) {
            self.enable_clock(peripheral);
        }
    }

    /// [`reset_peripheral`](Self::reset_peripheral) for a raw identifier;
    /// unknown identifiers are ignored.
    pub fn reset_peripheral_raw(&self, raw: u32) {
        if let Some(peripheral) = Peripheral::from_raw(raw) {
            self.reset_peripheral(peripheral);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use kumo_hal::sim::SimBus;

    const CLK: usize = SYSTEM_BASE + PERIP_CLK_EN0;
    const RST: usize = SYSTEM_BASE + PERIP_RST_EN0;

    #[test]
    fn enable_clock_sets_only_its_bit() {
        let bus = SimBus::new();
        bus.poke(CLK, 1 << 2);
        let sysctl = SystemControl::new(&bus);

        sysctl.enable_clock(Peripheral::Timg0);

        assert_eq!(bus.peek(CLK), (1 << 2) | (1 << 13));
        assert!(sysctl.is_clock_enabled(Peripheral::Timg0));
        assert!(!sysctl.is_clock_enabled(Peripheral::Timg1));
    }

    #[test]
    fn disable_clock_clears_only_its_bit() {
        let bus = SimBus::new();
        let sysctl = SystemControl::new(&bus);
        sysctl.enable_clock(Peripheral::Uart0);
        sysctl.enable_clock(Peripheral::Uart1);

        sysctl.disable_clock(Peripheral::Uart0);

        assert_eq!(bus.peek(CLK), 1 << 5);
    }

    #[test]
    fn reset_asserts_then_releases() {
        let bus = SimBus::new();
        let sysctl = SystemControl::new(&bus);

        sysctl.reset_peripheral(Peripheral::Timg0);

        assert_eq!(bus.writes_to(RST).as_slice(), &[1 << 13, 0]);
        assert_eq!(bus.peek(RST), 0);
    }

    #[test]
    fn reset_twice_matches_reset_once() {
        let once = SimBus::new();
        let twice = SimBus::new();
        for bus in [&once, &twice] {
            bus.poke(RST, 1 << 2);
            bus.poke(CLK, 1 << 13);
        }

        SystemControl::new(&once).reset_peripheral(Peripheral::Timg0);
        let sysctl = SystemControl::new(&twice);
        sysctl.reset_peripheral(Peripheral::Timg0);
        sysctl.reset_peripheral(Peripheral::Timg0);

        assert_eq!(once.snapshot(), twice.snapshot());
        assert_eq!(once.peek(RST), 1 << 2);
    }

    #[test]
    fn unknown_raw_identifier_is_ignored() {
        let bus = SimBus::new();
        let sysctl = SystemControl::new(&bus);

        sysctl.enable_clock_raw(7);
        sysctl.reset_peripheral_raw(u32::MAX);

        assert_eq!(bus.write_count(), 0);
    }

    #[test]
    fn raw_identifier_decodes() {
        let bus = SimBus::new();
        let sysctl = SystemControl::new(&bus);

        sysctl.enable_clock_raw(Peripheral::Timg1 as u32);

        assert_eq!(bus.peek(CLK), 1 << 15);
    }
}

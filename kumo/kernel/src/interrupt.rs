//! Interrupt matrix: source-to-line routing and CPU line masking.

use core::fmt;

use kumo_hal::interrupt::is_valid_line;
use kumo_hal::RegisterBus;

/// Base of the ESP32-C3 interrupt matrix.
pub const INTERRUPT_MATRIX_BASE: usize = 0x600C_2000;

const CPU_INT_ENABLE: usize = 0x0104;
const CPU_INT_PRI_0: usize = 0x0114;

/// Lowest priority at which the matrix still delivers a line.
pub const MIN_PRIORITY: u8 = 1;
/// Highest line priority.
pub const MAX_PRIORITY: u8 = 15;

/// Peripheral interrupt sources, numbered as in the technical reference.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u32)]
pub enum InterruptSource {
    /// Timer group 0, timer 0 alarm
    Timg0Timer0 = 32,
}

impl InterruptSource {
    /// Decode a raw source number. Unknown values yield `None`.
    pub const fn from_raw(raw: u32) -> Option<Self> {
        match raw {
            32 => Some(Self::Timg0Timer0),
            _ => None,
        }
    }

    pub const fn number(self) -> u32 {
        self as u32
    }
}

impl fmt::Display for InterruptSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Timg0Timer0 => f.write_str("TG0_T0"),
        }
    }
}

#[cfg(feature = "defmt")]
impl defmt::Format for InterruptSource {
    fn format(&self, fmt: defmt::Formatter) {
        match self {
            Self::Timg0Timer0 => defmt::write!(fmt, "TG0_T0"),
        }
    }
}

/// Handle over the interrupt matrix.
///
/// Callers must route a source before enabling the line it feeds; the
/// matrix does not check.
#[derive(Debug)]
pub struct InterruptMatrix<B> {
    bus: B,
    base: usize,
}

impl<B: RegisterBus> InterruptMatrix<B> {
    /// Handle at the chip's fixed base address.
    pub const fn new(bus: B) -> Self {
        Self::at(bus, INTERRUPT_MATRIX_BASE)
    }

    /// Handle at an explicit base address.
    pub const fn at(bus: B, base: usize) -> Self {
        Self { bus, base }
    }

    const fn map_reg(&self, source: InterruptSource) -> usize {
        self.base + source.number() as usize * 4
    }

    /// Map `source` onto CPU `line`, replacing any previous mapping.
    ///
    /// Two active sources routed to one line share it; nothing prevents that.
    pub fn route(&self, source: InterruptSource, line: u32) {
        self.bus.write(self.map_reg(source), line);
    }

    /// [`route`](Self::route) for a raw source number; unknown sources are
    /// ignored.
    pub fn route_raw(&self, source: u32, line: u32) {
        if let Some(source) = InterruptSource::from_raw(source) {
            self.route(source, line);
        }
    }

    /// Line `source` is currently mapped to.
    pub fn mapping(&self, source: InterruptSource) -> u32 {
        self.bus.read(self.map_reg(source))
    }

    /// Unmask `line`. Lines outside 0..32 are ignored.
    pub fn enable(&self, line: u32) {
        if is_valid_line(line) {
            self.bus.set_bits(self.base + CPU_INT_ENABLE, 1 << line);
        }
    }

    /// Mask `line`. Lines outside 0..32 are ignored.
    pub fn disable(&self, line: u32) {
        if is_valid_line(line) {
            self.bus.clear_bits(self.base + CPU_INT_ENABLE, 1 << line);
        }
    }

    pub fn is_enabled(&self, line: u32) -> bool {
        is_valid_line(line) && self.bus.read(self.base + CPU_INT_ENABLE) & (1 << line) != 0
    }

    /// Set the delivery priority of `line`, clamped to
    /// `MIN_PRIORITY..=MAX_PRIORITY`. A line at priority 0 is never
    /// delivered. Lines outside 0..32 are ignored.
    pub fn set_priority(&self, line: u32, priority: u8) {
        if is_valid_line(line) {
            let priority = priority.clamp(MIN_PRIORITY, MAX_PRIORITY);
            self.bus
                .write(self.base + CPU_INT_PRI_0 + line as usize * 4, u32::from(priority));
        }
    }

    pub fn priority(&self, line: u32) -> u8 {
        if !is_valid_line(line) {
            return 0;
        }
        (self.bus.read(self.base + CPU_INT_PRI_0 + line as usize * 4) & 0xF) as u8
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use kumo_hal::sim::SimBus;

    const ENABLE: usize = INTERRUPT_MATRIX_BASE + CPU_INT_ENABLE;

    #[test]
    fn route_writes_source_slot() {
        let bus = SimBus::new();
        let matrix = InterruptMatrix::new(&bus);

        matrix.route(InterruptSource::Timg0Timer0, 6);

        assert_eq!(bus.peek(INTERRUPT_MATRIX_BASE + 32 * 4), 6);
        assert_eq!(matrix.mapping(InterruptSource::Timg0Timer0), 6);
    }

    #[test]
    fn route_overwrites_previous_mapping() {
        let bus = SimBus::new();
        let matrix = InterruptMatrix::new(&bus);

        matrix.route(InterruptSource::Timg0Timer0, 6);
        matrix.route(InterruptSource::Timg0Timer0, 9);

        assert_eq!(matrix.mapping(InterruptSource::Timg0Timer0), 9);
    }

    #[test]
    fn unknown_raw_source_is_ignored() {
        let bus = SimBus::new();
        let matrix = InterruptMatrix::new(&bus);

        matrix.route_raw(5, 6);

        assert_eq!(bus.write_count(), 0);
    }

    #[test]
    fn enable_and_disable_touch_one_bit() {
        let bus = SimBus::new();
        bus.poke(ENABLE, 1 << 3);
        let matrix = InterruptMatrix::new(&bus);

        matrix.enable(6);
        assert_eq!(bus.peek(ENABLE), (1 << 3) | (1 << 6));
        assert!(matrix.is_enabled(6));

        matrix.disable(6);
        assert_eq!(bus.peek(ENABLE), 1 << 3);
        assert!(!matrix.is_enabled(6));
    }

    #[test]
    fn out_of_range_line_is_ignored() {
        let bus = SimBus::new();
        let matrix = InterruptMatrix::new(&bus);

        matrix.enable(32);
        matrix.disable(40);
        matrix.set_priority(99, 3);

        assert_eq!(bus.write_count(), 0);
        assert!(!matrix.is_enabled(32));
    }

    #[test]
    fn priority_is_clamped() {
        let bus = SimBus::new();
        let matrix = InterruptMatrix::new(&bus);

        matrix.set_priority(6, 0);
        assert_eq!(matrix.priority(6), MIN_PRIORITY);

        matrix.set_priority(6, 200);
        assert_eq!(matrix.priority(6), MAX_PRIORITY);
        assert_eq!(bus.peek(INTERRUPT_MATRIX_BASE + CPU_INT_PRI_0 + 6 * 4), 15);
    }
}

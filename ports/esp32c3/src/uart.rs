//! UART0 console: the trap dispatcher's sink and the `log` backend.

use core::convert::Infallible;
use core::fmt::Write as _;

use heapless::String;
use kumo_hal::{LineSink, RegisterBus};
use log::{LevelFilter, Log, Metadata, Record};

pub const UART0_BASE: usize = 0x6000_0000;

const FIFO: usize = 0x00;
const STATUS: usize = 0x1C;

const TXFIFO_CNT_SHIFT: u32 = 16;
const TXFIFO_CNT_MASK: u32 = 0x3FF << TXFIFO_CNT_SHIFT;
/// The TX FIFO holds 128 bytes; keep one slot of headroom.
const TXFIFO_LIMIT: u32 = 127;

/// Longest formatted log line; longer records are cut short.
pub const LOG_LINE: usize = 128;

/// Polled transmitter on UART0. Assumes the ROM bootloader left the baud
/// rate and frame format configured.
#[derive(Debug)]
pub struct Uart0<B> {
    bus: B,
    base: usize,
}

impl<B: RegisterBus> Uart0<B> {
    pub const fn new(bus: B) -> Self {
        Self::at(bus, UART0_BASE)
    }

    pub const fn at(bus: B, base: usize) -> Self {
        Self { bus, base }
    }

    fn tx_fifo_count(&self) -> u32 {
        (self.bus.read(self.base + STATUS) & TXFIFO_CNT_MASK) >> TXFIFO_CNT_SHIFT
    }

    /// Queue one byte, or report `WouldBlock` while the FIFO is full.
    pub fn try_write_byte(&self, byte: u8) -> nb::Result<(), Infallible> {
        if self.tx_fifo_count() >= TXFIFO_LIMIT {
            return Err(nb::Error::WouldBlock);
        }
        self.bus.write(self.base + FIFO, u32::from(byte));
        Ok(())
    }

    /// Spin until every byte of `bytes` has been queued.
    pub fn write_bytes(&self, bytes: &[u8]) {
        for &byte in bytes {
            nb::block!(self.try_write_byte(byte)).unwrap_or_else(|never| match never {});
        }
    }
}

impl<B: RegisterBus + Sync> LineSink for Uart0<B> {
    fn write_line(&self, text: &str) {
        self.write_bytes(text.as_bytes());
    }
}

/// `log` backend printing `[LEVEL] target: message` lines on UART0.
pub struct SerialLogger<B> {
    uart: Uart0<B>,
    level: LevelFilter,
}

impl<B: RegisterBus> SerialLogger<B> {
    pub const fn new(uart: Uart0<B>, level: LevelFilter) -> Self {
        Self { uart, level }
    }

    pub fn level(&self) -> LevelFilter {
        self.level
    }
}

impl<B: RegisterBus + Send + Sync> Log for SerialLogger<B> {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= self.level
    }

    fn log(&self, record: &Record) {
        if !self.enabled(record.metadata()) {
            return;
        }
        let mut line: String<LOG_LINE> = String::new();
        // Overflow only truncates the line.
        let _ = write!(line, "[{}] {}: {}", record.level(), record.target(), record.args());
        self.uart.write_bytes(line.as_bytes());
        self.uart.write_bytes(b"\n");
    }

    fn flush(&self) {}
}

#[cfg(test)]
mod tests {
    extern crate std;

    use super::*;
    use kumo_hal::sim::SimBus;
    use log::Level;

    fn fifo_bytes(bus: &SimBus) -> std::vec::Vec<u8> {
        bus.writes_to(UART0_BASE + FIFO)
            .iter()
            .map(|&word| word as u8)
            .collect()
    }

    #[test]
    fn line_goes_out_byte_by_byte() {
        let bus = SimBus::new();
        let uart = Uart0::new(&bus);

        uart.write_line("Tick!\n");

        assert_eq!(fifo_bytes(&bus), b"Tick!\n");
    }

    #[test]
    fn full_fifo_would_block() {
        let bus = SimBus::new();
        bus.poke(UART0_BASE + STATUS, TXFIFO_LIMIT << TXFIFO_CNT_SHIFT);
        let uart = Uart0::new(&bus);

        assert_eq!(uart.try_write_byte(b'x'), Err(nb::Error::WouldBlock));
        assert_eq!(bus.write_count(), 0);

        bus.poke(UART0_BASE + STATUS, 126 << TXFIFO_CNT_SHIFT);
        assert_eq!(uart.try_write_byte(b'x'), Ok(()));
    }

    #[test]
    fn logger_prefixes_level_and_target() {
        let bus = SimBus::new();
        let logger = SerialLogger::new(Uart0::new(&bus), LevelFilter::Info);

        logger.log(
            &Record::builder()
                .level(Level::Info)
                .target("kumo_kernel::boot")
                .args(format_args!("up"))
                .build(),
        );
        logger.log(
            &Record::builder()
                .level(Level::Trace)
                .target("kumo_kernel::timer")
                .args(format_args!("tick"))
                .build(),
        );

        assert_eq!(fifo_bytes(&bus), b"[INFO] kumo_kernel::boot: up\n");
    }
}

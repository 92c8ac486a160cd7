//! Host-side models of the hardware seams.
//!
//! [`SimBus`] is a sparse register file that logs every write made through
//! the [`RegisterBus`] interface, [`SimCsr`] models the three trap CSRs and
//! [`RecordingSink`] captures serial output. All three are `const`
//! constructible so tests can place them in statics where a plain `fn()`
//! callback needs to reach them.

use core::cell::{Cell, RefCell};

use critical_section::Mutex;
use heapless::{FnvIndexMap, String, Vec};

use crate::csr::{Trap, TrapCsr};
use crate::mmio::RegisterBus;
use crate::uart::LineSink;

/// Distinct registers a [`SimBus`] can hold.
pub const SIM_REGISTERS: usize = 64;
/// Writes a [`SimBus`] logs before it starts dropping entries.
pub const SIM_WRITE_LOG: usize = 1024;

/// Register values keyed by absolute address.
pub type RegisterSnapshot = FnvIndexMap<usize, u32, SIM_REGISTERS>;

/// One logged register write.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RegisterWrite {
    pub addr: usize,
    pub value: u32,
}

struct BusState {
    regs: RegisterSnapshot,
    writes: Vec<RegisterWrite, SIM_WRITE_LOG>,
}

/// Simulated register file. Unwritten registers read as zero.
pub struct SimBus {
    state: Mutex<RefCell<BusState>>,
}

impl SimBus {
    pub const fn new() -> Self {
        Self {
            state: Mutex::new(RefCell::new(BusState {
                regs: FnvIndexMap::new(),
                writes: Vec::new(),
            })),
        }
    }

    /// Reads a register without going through the bus interface.
    pub fn peek(&self, addr: usize) -> u32 {
        critical_section::with(|cs| {
            self.state
                .borrow_ref(cs)
                .regs
                .get(&addr)
                .copied()
                .unwrap_or(0)
        })
    }

    /// Hardware-side update: changes a register without logging a write.
    pub fn poke(&self, addr: usize, value: u32) {
        let stored = critical_section::with(|cs| {
            self.state.borrow_ref_mut(cs).regs.insert(addr, value).is_ok()
        });
        assert!(stored, "sim register file full");
    }

    /// Every write made through the bus, oldest first.
    pub fn writes(&self) -> Vec<RegisterWrite, SIM_WRITE_LOG> {
        critical_section::with(|cs| self.state.borrow_ref(cs).writes.clone())
    }

    /// Writes made through the bus to `addr`, oldest first.
    pub fn writes_to(&self, addr: usize) -> Vec<u32, SIM_WRITE_LOG> {
        critical_section::with(|cs| {
            self.state
                .borrow_ref(cs)
                .writes
                .iter()
                .filter(|w| w.addr == addr)
                .map(|w| w.value)
                .collect()
        })
    }

    pub fn write_count(&self) -> usize {
        critical_section::with(|cs| self.state.borrow_ref(cs).writes.len())
    }

    pub fn clear_writes(&self) {
        critical_section::with(|cs| self.state.borrow_ref_mut(cs).writes.clear());
    }

    /// Copy of the whole register file.
    pub fn snapshot(&self) -> RegisterSnapshot {
        critical_section::with(|cs| self.state.borrow_ref(cs).regs.clone())
    }
}

impl Default for SimBus {
    fn default() -> Self {
        Self::new()
    }
}

impl RegisterBus for SimBus {
    fn read(&self, addr: usize) -> u32 {
        self.peek(addr)
    }

    fn write(&self, addr: usize, value: u32) {
        let (stored, logged) = critical_section::with(|cs| {
            let mut state = self.state.borrow_ref_mut(cs);
            let stored = state.regs.insert(addr, value).is_ok();
            let logged = state.writes.push(RegisterWrite { addr, value }).is_ok();
            (stored, logged)
        });
        assert!(stored, "sim register file full");
        assert!(logged, "sim write log full");
    }
}

/// Simulated `mtvec`, `mcause` and `mstatus.MIE`.
pub struct SimCsr {
    vector: Mutex<Cell<Option<usize>>>,
    cause: Mutex<Cell<u32>>,
    mie: Mutex<Cell<bool>>,
}

impl SimCsr {
    pub const fn new() -> Self {
        Self {
            vector: Mutex::new(Cell::new(None)),
            cause: Mutex::new(Cell::new(0)),
            mie: Mutex::new(Cell::new(false)),
        }
    }

    /// Latch `trap` into `mcause` as the hardware would on trap entry.
    pub fn raise(&self, trap: Trap) {
        self.raise_bits(trap.bits());
    }

    pub fn raise_bits(&self, bits: u32) {
        critical_section::with(|cs| self.cause.borrow(cs).set(bits));
    }

    pub fn vector(&self) -> Option<usize> {
        critical_section::with(|cs| self.vector.borrow(cs).get())
    }

    pub fn interrupts_enabled(&self) -> bool {
        critical_section::with(|cs| self.mie.borrow(cs).get())
    }
}

impl Default for SimCsr {
    fn default() -> Self {
        Self::new()
    }
}

impl TrapCsr for SimCsr {
    fn set_trap_vector(&self, vector: usize) {
        critical_section::with(|cs| self.vector.borrow(cs).set(Some(vector)));
    }

    fn cause(&self) -> u32 {
        critical_section::with(|cs| self.cause.borrow(cs).get())
    }

    fn enable_interrupts(&self) {
        critical_section::with(|cs| self.mie.borrow(cs).set(true));
    }
}

/// Longest line a [`RecordingSink`] keeps; longer lines are truncated.
pub const SINK_LINE: usize = 96;
/// Lines a [`RecordingSink`] keeps before dropping new ones.
pub const SINK_DEPTH: usize = 32;

/// Line sink that remembers what was written.
pub struct RecordingSink {
    lines: Mutex<RefCell<Vec<String<SINK_LINE>, SINK_DEPTH>>>,
}

impl RecordingSink {
    pub const fn new() -> Self {
        Self {
            lines: Mutex::new(RefCell::new(Vec::new())),
        }
    }

    pub fn len(&self) -> usize {
        critical_section::with(|cs| self.lines.borrow_ref(cs).len())
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn line(&self, index: usize) -> Option<String<SINK_LINE>> {
        critical_section::with(|cs| self.lines.borrow_ref(cs).get(index).cloned())
    }

    pub fn contains(&self, text: &str) -> bool {
        critical_section::with(|cs| {
            self.lines
                .borrow_ref(cs)
                .iter()
                .any(|line| line.as_str() == text)
        })
    }

    pub fn clear(&self) {
        critical_section::with(|cs| self.lines.borrow_ref_mut(cs).clear());
    }
}

impl Default for RecordingSink {
    fn default() -> Self {
        Self::new()
    }
}

impl LineSink for RecordingSink {
    fn write_line(&self, text: &str) {
        let mut line = String::new();
        for ch in text.chars() {
            if line.push(ch).is_err() {
                break;
            }
        }
        critical_section::with(|cs| {
            let _ = self.lines.borrow_ref_mut(cs).push(line);
        });
    }
}

//! Trap vector installation and cause dispatch.
//!
//! The assembly entry stub saves context and calls into
//! [`TrapDispatcher::dispatch`]; when that returns, the stub restores the
//! interrupted context. Nothing here inspects or modifies the saved frame.

use core::cell::Cell;
use core::fmt;

use critical_section::Mutex;
use kumo_hal::interrupt::{is_valid_line, CPU_LINES};
use kumo_hal::{InterruptHandler, LineSink, Trap, TrapCsr};

/// Interrupt id the periodic timer's line arrives as.
pub const TIMER_TICK_ID: u32 = 6;

/// Reported for an interrupt id with no handler.
pub const UNKNOWN_INTERRUPT_MSG: &str = "Unknown interrupt occurred\n";
/// Reported for any synchronous exception.
pub const EXCEPTION_MSG: &str = "An exception occurred\n";

/// Dispatcher lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrapState {
    Uninitialized,
    VectorInstalled,
    /// Vector installed and `mstatus.MIE` set
    Live,
}

impl fmt::Display for TrapState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Uninitialized => "uninitialized",
            Self::VectorInstalled => "vector-installed",
            Self::Live => "live",
        };
        f.write_str(name)
    }
}

/// Fixed map from interrupt id to the driver that owns it.
///
/// Built once at compile time; adding a source means adding an entry.
#[derive(Clone, Copy)]
pub struct DispatchTable<'a> {
    handlers: [Option<&'a dyn InterruptHandler>; CPU_LINES as usize],
}

impl<'a> DispatchTable<'a> {
    pub const fn new() -> Self {
        Self {
            handlers: [None; CPU_LINES as usize],
        }
    }

    /// Route interrupt `id` to `handler`. Ids outside 0..32 are ignored.
    pub const fn with(mut self, id: u32, handler: &'a dyn InterruptHandler) -> Self {
        if is_valid_line(id) {
            self.handlers[id as usize] = Some(handler);
        }
        self
    }

    pub fn handler(&self, id: u32) -> Option<&'a dyn InterruptHandler> {
        if is_valid_line(id) {
            self.handlers[id as usize]
        } else {
            None
        }
    }
}

impl Default for DispatchTable<'_> {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for DispatchTable<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut list = f.debug_list();
        for (id, slot) in self.handlers.iter().enumerate() {
            if slot.is_some() {
                list.entry(&id);
            }
        }
        list.finish()
    }
}

/// Owns the trap vector and the decision of what each trap means.
pub struct TrapDispatcher<'a, C, S> {
    csr: C,
    sink: S,
    table: DispatchTable<'a>,
    state: Mutex<Cell<TrapState>>,
}

impl<'a, C: TrapCsr, S: LineSink> TrapDispatcher<'a, C, S> {
    pub const fn new(csr: C, sink: S, table: DispatchTable<'a>) -> Self {
        Self {
            csr,
            sink,
            table,
            state: Mutex::new(Cell::new(TrapState::Uninitialized)),
        }
    }

    pub fn state(&self) -> TrapState {
        critical_section::with(|cs| self.state.borrow(cs).get())
    }

    pub fn table(&self) -> &DispatchTable<'a> {
        &self.table
    }

    /// Point the trap vector at the assembly entry stub at `vector`.
    pub fn trap_init(&self, vector: usize) {
        self.csr.set_trap_vector(vector);
        critical_section::with(|cs| {
            let state = self.state.borrow(cs);
            if state.get() == TrapState::Uninitialized {
                state.set(TrapState::VectorInstalled);
            }
        });
        log::debug!("trap vector at {:#010x}", vector);
    }

    /// Let the core take interrupts. Call last in bring-up, once every
    /// interrupt source has been armed.
    ///
    /// Without an installed vector the request is refused and interrupts
    /// stay masked.
    pub fn enable_interrupts(&self) {
        let accepted = critical_section::with(|cs| {
            let state = self.state.borrow(cs);
            match state.get() {
                TrapState::Uninitialized => false,
                TrapState::VectorInstalled | TrapState::Live => {
                    state.set(TrapState::Live);
                    true
                }
            }
        });
        if accepted {
            self.csr.enable_interrupts();
            log::debug!("interrupts live");
        } else {
            log::warn!("interrupts left masked: no trap vector installed");
        }
    }

    /// Handle the trap currently latched in `mcause`.
    ///
    /// Interrupts with a table entry go to their handler. Anything else is
    /// reported on the sink and control returns to the interrupted code;
    /// exceptions are not resolved.
    pub fn dispatch(&self) {
        let trap = Trap::from_bits(self.csr.cause());
        match trap {
            Trap::Interrupt(id) => match self.table.handler(id) {
                Some(handler) => handler.handle_interrupt(),
                None => {
                    log::debug!("unexpected {}", trap);
                    self.sink.write_line(UNKNOWN_INTERRUPT_MSG);
                }
            },
            Trap::Exception(_) => {
                log::debug!("unexpected {}", trap);
                self.sink.write_line(EXCEPTION_MSG);
            }
        }
    }
}

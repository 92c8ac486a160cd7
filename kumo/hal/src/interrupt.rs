//! Interrupt handler abstraction

/// Number of processor interrupt lines on the core.
pub const CPU_LINES: u32 = 32;

/// A driver that services one processor interrupt line.
///
/// Handlers run in trap context with interrupts masked. They must be short
/// and must not block.
pub trait InterruptHandler: Sync {
    /// Service the interrupt.
    fn handle_interrupt(&self);
}

/// Returns true when `line` names an existing processor line.
pub const fn is_valid_line(line: u32) -> bool {
    line < CPU_LINES
}

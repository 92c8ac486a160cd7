//! Periodic alarm timer on timer group 0, timer 0.
//!
//! The timer counts up from zero at `apb_clock / prescale`, raises its
//! interrupt when the counter reaches the alarm threshold and reloads the
//! counter to zero in the same cycle. The hardware drops `ALARM_EN` when the
//! alarm fires, so the handler re-arms it after every tick.

use core::cell::Cell;

use critical_section::Mutex;
use kumo_hal::{HalResult, InterruptHandler, RegisterBus};

use crate::config::TimerConfig;
use crate::interrupt::{InterruptMatrix, InterruptSource};
use crate::sysctl::{Peripheral, SystemControl};

/// Base of timer group 0.
pub const TIMG0_BASE: usize = 0x6001_F000;

pub(crate) const T0CONFIG: usize = 0x0000;
pub(crate) const T0ALARMLO: usize = 0x0010;
pub(crate) const T0ALARMHI: usize = 0x0014;
pub(crate) const T0LOADLO: usize = 0x0018;
pub(crate) const T0LOADHI: usize = 0x001C;
pub(crate) const T0LOAD: usize = 0x0020;
pub(crate) const WDTFEED: usize = 0x0060;
pub(crate) const WDTWPROTECT: usize = 0x0064;
pub(crate) const INT_ENA: usize = 0x0070;
pub(crate) const INT_ST: usize = 0x0078;
pub(crate) const INT_CLR: usize = 0x007C;

pub(crate) const T0_EN: u32 = 1 << 31;
pub(crate) const T0_INCREASE: u32 = 1 << 30;
pub(crate) const T0_AUTORELOAD: u32 = 1 << 29;
pub(crate) const T0_DIVIDER_SHIFT: u32 = 13;
pub(crate) const T0_DIVIDER_MASK: u32 = 0xFFFF << T0_DIVIDER_SHIFT;
pub(crate) const T0_ALARM_EN: u32 = 1 << 10;

/// T0 bit in `INT_ENA`/`INT_RAW`/`INT_ST`/`INT_CLR`.
pub(crate) const T0_INT: u32 = 1 << 0;

/// Unlocks the watchdog registers for one write.
pub(crate) const WDT_WKEY: u32 = 0x50D8_3AA1;

/// Function run once per tick, in trap context.
///
/// It must return well within the watchdog timeout: the handler feeds the
/// watchdog before calling it, and a callback that blocks lets the
/// watchdog reset the chip.
pub type TickCallback = fn();

/// Periodic tick timer with a single callback slot.
///
/// The slot can be written from the foreground at any time; the handler
/// reads it inside a critical section so it sees either the old or the new
/// callback, never a torn value. Set it before interrupts go live for a
/// deterministic first tick.
pub struct PeriodicTimer<B> {
    bus: B,
    base: usize,
    config: TimerConfig,
    callback: Mutex<Cell<Option<TickCallback>>>,
    ticks: Mutex<Cell<u32>>,
}

impl<B: RegisterBus> PeriodicTimer<B> {
    /// Timer group 0 at its fixed base address.
    pub const fn new(bus: B, config: TimerConfig) -> Self {
        Self::at(bus, TIMG0_BASE, config)
    }

    /// Timer group at an explicit base address.
    pub const fn at(bus: B, base: usize, config: TimerConfig) -> Self {
        Self {
            bus,
            base,
            config,
            callback: Mutex::new(Cell::new(None)),
            ticks: Mutex::new(Cell::new(0)),
        }
    }

    pub const fn config(&self) -> &TimerConfig {
        &self.config
    }

    /// Interrupt source this timer raises.
    pub const fn source(&self) -> InterruptSource {
        InterruptSource::Timg0Timer0
    }

    /// Power the timer group, program it for the configured tick and arm it.
    ///
    /// The configuration is validated before any register is touched; on
    /// error the hardware is left as it was. Counter, divider and alarm are
    /// written while the timer is stopped, and the CPU line is routed and
    /// unmasked before the peripheral's own interrupt enable, so the first
    /// alarm is neither spurious nor lost.
    pub fn init<R: RegisterBus, M: RegisterBus>(
        &self,
        sysctl: &SystemControl<R>,
        matrix: &InterruptMatrix<M>,
    ) -> HalResult<()> {
        let threshold = self.config.alarm_threshold()?;
        let line = self.config.cpu_line;

        sysctl.enable_clock(Peripheral::Timg0);
        sysctl.reset_peripheral(Peripheral::Timg0);

        self.bus.clear_bits(self.reg(T0CONFIG), T0_EN);
        self.bus.write(
            self.reg(T0CONFIG),
            ((self.config.prescale << T0_DIVIDER_SHIFT) & T0_DIVIDER_MASK)
                | T0_INCREASE
                | T0_AUTORELOAD,
        );
        self.bus.write(self.reg(T0ALARMLO), threshold as u32);
        self.bus.write(self.reg(T0ALARMHI), (threshold >> 32) as u32);

        matrix.route(self.source(), line);
        matrix.set_priority(line, self.config.priority);
        matrix.enable(line);
        self.bus.set_bits(self.reg(INT_ENA), T0_INT);

        self.bus.write(self.reg(T0LOADLO), 0);
        self.bus.write(self.reg(T0LOADHI), 0);
        self.bus.write(self.reg(T0LOAD), 1);

        self.bus.set_bits(self.reg(T0CONFIG), T0_EN | T0_ALARM_EN);

        log::debug!(
            "timer armed: {} Hz, divider {}, alarm {}, {} -> line {}",
            self.config.tick_hz,
            self.config.prescale,
            threshold,
            self.source(),
            line
        );
        Ok(())
    }

    /// Install `callback`, replacing whatever was there. `None` empties the
    /// slot and subsequent ticks are dropped.
    pub fn set_callback(&self, callback: Option<TickCallback>) {
        critical_section::with(|cs| self.callback.borrow(cs).set(callback));
    }

    pub fn callback(&self) -> Option<TickCallback> {
        critical_section::with(|cs| self.callback.borrow(cs).get())
    }

    /// Alarms handled since boot, wrapping.
    pub fn ticks(&self) -> u32 {
        critical_section::with(|cs| self.ticks.borrow(cs).get())
    }

    pub fn is_armed(&self) -> bool {
        self.bus.read(self.reg(T0CONFIG)) & T0_ALARM_EN != 0
    }

    pub fn is_pending(&self) -> bool {
        self.bus.read(self.reg(INT_ST)) & T0_INT != 0
    }

    /// Service one alarm: feed the watchdog, acknowledge, run the callback,
    /// re-arm.
    pub fn handle_interrupt(&self) {
        self.feed_watchdog();
        self.bus.write(self.reg(INT_CLR), T0_INT);

        let (tick, callback) = critical_section::with(|cs| {
            let ticks = self.ticks.borrow(cs);
            ticks.set(ticks.get().wrapping_add(1));
            (ticks.get(), self.callback.borrow(cs).get())
        });
        log::trace!("tick {}", tick);
        if let Some(callback) = callback {
            callback();
        }

        self.bus.set_bits(self.reg(T0CONFIG), T0_ALARM_EN);
    }

    fn feed_watchdog(&self) {
        self.bus.write(self.reg(WDTWPROTECT), WDT_WKEY);
        self.bus.write(self.reg(WDTFEED), 1);
        self.bus.write(self.reg(WDTWPROTECT), 0);
    }

    const fn reg(&self, offset: usize) -> usize {
        self.base + offset
    }
}

impl<B: RegisterBus + Sync> InterruptHandler for PeriodicTimer<B> {
    fn handle_interrupt(&self) {
        PeriodicTimer::handle_interrupt(self);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::interrupt::INTERRUPT_MATRIX_BASE;
    use crate::sysctl::SYSTEM_BASE;
    use core::sync::atomic::{AtomicUsize, Ordering};
    use kumo_hal::sim::{RegisterWrite, SimBus};
    use kumo_hal::HalError;

    const CONFIG: usize = TIMG0_BASE + T0CONFIG;

    /// What the hardware does when the counter reaches the alarm.
    fn fire(bus: &SimBus) {
        bus.poke(CONFIG, bus.peek(CONFIG) & !T0_ALARM_EN);
        bus.poke(TIMG0_BASE + INT_ST, T0_INT);
    }

    fn first_write(writes: &[RegisterWrite], pred: impl Fn(&RegisterWrite) -> bool) -> usize {
        writes.iter().position(pred).unwrap()
    }

    fn armed(bus: &SimBus) -> PeriodicTimer<&SimBus> {
        let timer = PeriodicTimer::new(bus, TimerConfig::new());
        timer
            .init(&SystemControl::new(bus), &InterruptMatrix::new(bus))
            .unwrap();
        bus.clear_writes();
        timer
    }

    #[test]
    fn init_programs_divider_alarm_and_mode() {
        let bus = SimBus::new();
        let _timer = armed(&bus);

        let config = bus.peek(CONFIG);
        assert_eq!((config & T0_DIVIDER_MASK) >> T0_DIVIDER_SHIFT, 1600);
        assert_ne!(config & T0_INCREASE, 0);
        assert_ne!(config & T0_AUTORELOAD, 0);
        assert_ne!(config & T0_EN, 0);
        assert_ne!(config & T0_ALARM_EN, 0);
        assert_eq!(bus.peek(TIMG0_BASE + T0ALARMLO), 500);
        assert_eq!(bus.peek(TIMG0_BASE + T0ALARMHI), 0);
        assert_eq!(bus.peek(TIMG0_BASE + INT_ENA), T0_INT);
        assert_eq!(bus.peek(TIMG0_BASE + T0LOADLO), 0);
        assert_eq!(bus.peek(TIMG0_BASE + T0LOAD), 1);
    }

    #[test]
    fn init_powers_and_routes() {
        let bus = SimBus::new();
        let _timer = armed(&bus);

        assert_ne!(bus.peek(SYSTEM_BASE + 0x10) & (1 << 13), 0);
        assert_eq!(bus.peek(SYSTEM_BASE + 0x18), 0);
        assert_eq!(bus.peek(INTERRUPT_MATRIX_BASE + 32 * 4), 6);
        assert_ne!(bus.peek(INTERRUPT_MATRIX_BASE + 0x104) & (1 << 6), 0);
        assert_eq!(bus.peek(INTERRUPT_MATRIX_BASE + 0x114 + 6 * 4), 1);
    }

    #[test]
    fn init_orders_register_writes() {
        let bus = SimBus::new();
        let timer = PeriodicTimer::new(&bus, TimerConfig::new());
        timer
            .init(&SystemControl::new(&bus), &InterruptMatrix::new(&bus))
            .unwrap();

        let writes = bus.writes();
        let stopped = first_write(&writes, |w| w.addr == CONFIG && w.value & T0_EN == 0);
        let alarm = first_write(&writes, |w| w.addr == TIMG0_BASE + T0ALARMLO);
        let line_on = first_write(&writes, |w| w.addr == INTERRUPT_MATRIX_BASE + 0x104);
        let int_ena = first_write(&writes, |w| w.addr == TIMG0_BASE + INT_ENA);
        let load = first_write(&writes, |w| w.addr == TIMG0_BASE + T0LOAD);
        let started = writes
            .iter()
            .rposition(|w| w.addr == CONFIG && w.value & T0_EN != 0)
            .unwrap();

        assert!(stopped < alarm);
        assert!(alarm < started);
        assert!(load < started);
        assert!(line_on < int_ena);
        assert_eq!(started, writes.len() - 1);
    }

    #[test]
    fn invalid_config_touches_nothing() {
        let bus = SimBus::new();
        let timer = PeriodicTimer::new(&bus, TimerConfig::new().with_tick_hz(0));

        let result = timer.init(&SystemControl::new(&bus), &InterruptMatrix::new(&bus));

        assert_eq!(result, Err(HalError::ZeroFrequency));
        assert_eq!(bus.write_count(), 0);
    }

    static COUNTED: AtomicUsize = AtomicUsize::new(0);

    fn count_tick() {
        COUNTED.fetch_add(1, Ordering::SeqCst);
    }

    #[test]
    fn callback_runs_once_per_alarm_and_rearms() {
        let bus = SimBus::new();
        let timer = armed(&bus);
        timer.set_callback(Some(count_tick));

        for n in 1..=5 {
            fire(&bus);
            assert!(!timer.is_armed());
            timer.handle_interrupt();
            assert!(timer.is_armed());
            assert_eq!(COUNTED.load(Ordering::SeqCst), n);
        }
        assert_eq!(timer.ticks(), 5);
    }

    #[test]
    fn handler_feeds_then_clears_then_rearms() {
        let bus = SimBus::new();
        let timer = armed(&bus);

        fire(&bus);
        timer.handle_interrupt();

        let writes = bus.writes();
        let addrs: std::vec::Vec<usize> = writes.iter().map(|w| w.addr).collect();
        assert_eq!(
            addrs,
            [
                TIMG0_BASE + WDTWPROTECT,
                TIMG0_BASE + WDTFEED,
                TIMG0_BASE + WDTWPROTECT,
                TIMG0_BASE + INT_CLR,
                CONFIG,
            ]
        );
        assert_eq!(writes[0].value, WDT_WKEY);
        assert_eq!(writes[2].value, 0);
        assert_eq!(writes[3].value, T0_INT);
    }

    #[test]
    fn empty_slot_still_feeds_and_clears() {
        let bus = SimBus::new();
        let timer = armed(&bus);
        assert!(timer.callback().is_none());

        fire(&bus);
        timer.handle_interrupt();

        assert_eq!(bus.writes_to(TIMG0_BASE + WDTFEED).as_slice(), &[1]);
        assert_eq!(bus.writes_to(TIMG0_BASE + INT_CLR).as_slice(), &[T0_INT]);
        assert!(timer.is_armed());
        assert_eq!(timer.ticks(), 1);
    }

    static FIRST: AtomicUsize = AtomicUsize::new(0);
    static SECOND: AtomicUsize = AtomicUsize::new(0);

    fn first() {
        FIRST.fetch_add(1, Ordering::SeqCst);
    }

    fn second() {
        SECOND.fetch_add(1, Ordering::SeqCst);
    }

    #[test]
    fn last_callback_wins() {
        let bus = SimBus::new();
        let timer = armed(&bus);

        timer.set_callback(Some(first));
        timer.set_callback(Some(second));
        fire(&bus);
        timer.handle_interrupt();

        timer.set_callback(None);
        fire(&bus);
        timer.handle_interrupt();

        assert_eq!(FIRST.load(Ordering::SeqCst), 0);
        assert_eq!(SECOND.load(Ordering::SeqCst), 1);
        assert_eq!(timer.ticks(), 2);
    }
}

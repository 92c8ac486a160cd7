//! Build-time configuration of the periodic tick.

use kumo_hal::interrupt::is_valid_line;
use kumo_hal::{HalError, HalResult};

/// APB clock feeding the timer groups after reset.
pub const APB_CLOCK_HZ: u32 = 80_000_000;

/// Widest alarm the 54-bit timer-group counter can hold.
pub const MAX_ALARM: u64 = (1 << 54) - 1;

/// Smallest and largest values of the 16-bit clock divider.
pub const MIN_PRESCALE: u32 = 2;
pub const MAX_PRESCALE: u32 = 0xFFFF;

/// Periodic timer configuration.
///
/// tick frequency = `apb_clock_hz / prescale / alarm_threshold`. The
/// frequency is fixed once the timer is armed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimerConfig {
    pub apb_clock_hz: u32,
    pub prescale: u32,
    pub tick_hz: u32,
    /// CPU line the alarm is routed to; also the `mcause` interrupt id.
    pub cpu_line: u32,
    pub priority: u8,
}

impl TimerConfig {
    /// 100 Hz from the 80 MHz APB clock through a 1600 divider, on line 6.
    pub const fn new() -> Self {
        Self {
            apb_clock_hz: APB_CLOCK_HZ,
            prescale: 1600,
            tick_hz: 100,
            cpu_line: 6,
            priority: 1,
        }
    }

    pub const fn with_tick_hz(mut self, tick_hz: u32) -> Self {
        self.tick_hz = tick_hz;
        self
    }

    pub const fn with_prescale(mut self, prescale: u32) -> Self {
        self.prescale = prescale;
        self
    }

    pub const fn with_clock(mut self, apb_clock_hz: u32) -> Self {
        self.apb_clock_hz = apb_clock_hz;
        self
    }

    pub const fn with_line(mut self, cpu_line: u32) -> Self {
        self.cpu_line = cpu_line;
        self
    }

    pub const fn with_priority(mut self, priority: u8) -> Self {
        self.priority = priority;
        self
    }

    /// Counter rate after the divider.
    pub const fn counter_hz(&self) -> u32 {
        self.apb_clock_hz / self.prescale
    }

    /// Alarm value that yields exactly `tick_hz`.
    pub const fn alarm_threshold(&self) -> HalResult<u64> {
        if self.tick_hz == 0 {
            return Err(HalError::ZeroFrequency);
        }
        if self.prescale < MIN_PRESCALE || self.prescale > MAX_PRESCALE {
            return Err(HalError::PrescaleOutOfRange(self.prescale));
        }
        if !is_valid_line(self.cpu_line) {
            return Err(HalError::InvalidLine(self.cpu_line));
        }
        if self.apb_clock_hz % self.prescale != 0 {
            return Err(HalError::InexactFrequency);
        }
        let counter_hz = self.counter_hz();
        if counter_hz % self.tick_hz != 0 {
            return Err(HalError::InexactFrequency);
        }
        let threshold = (counter_hz / self.tick_hz) as u64;
        if threshold == 0 || threshold > MAX_ALARM {
            return Err(HalError::ThresholdOutOfRange(threshold));
        }
        Ok(threshold)
    }

    pub const fn is_valid(&self) -> bool {
        self.alarm_threshold().is_ok()
    }
}

impl Default for TimerConfig {
    fn default() -> Self {
        Self::new()
    }
}

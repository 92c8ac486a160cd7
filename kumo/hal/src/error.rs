//! Common error types for HAL operations

use core::fmt;

/// HAL configuration errors
///
/// Register writes never fail; the only thing that can go wrong is asking a
/// peripheral for a configuration it cannot produce.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HalError {
    /// Requested tick frequency is zero
    ZeroFrequency,
    /// Prescale divisor outside the hardware divider range
    PrescaleOutOfRange(u32),
    /// Clock does not divide evenly into the requested frequency
    InexactFrequency,
    /// Alarm threshold does not fit the counter
    ThresholdOutOfRange(u64),
    /// Processor interrupt line outside 0..32
    InvalidLine(u32),
    /// Interrupt line has no handler to service it
    UnhandledLine(u32),
}

impl fmt::Display for HalError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ZeroFrequency => write!(f, "tick frequency must be non-zero"),
            Self::PrescaleOutOfRange(div) => write!(f, "prescale divisor {} out of range", div),
            Self::InexactFrequency => write!(f, "clock does not divide evenly into tick frequency"),
            Self::ThresholdOutOfRange(value) => write!(f, "alarm threshold {} out of range", value),
            Self::InvalidLine(line) => write!(f, "interrupt line {} out of range", line),
            Self::UnhandledLine(line) => write!(f, "interrupt line {} has no handler", line),
        }
    }
}

#[cfg(feature = "std")]
impl std::error::Error for HalError {}

#[cfg(feature = "defmt")]
impl defmt::Format for HalError {
    fn format(&self, fmt: defmt::Formatter) {
        match self {
            Self::ZeroFrequency => defmt::write!(fmt, "ZeroFrequency"),
            Self::PrescaleOutOfRange(div) => defmt::write!(fmt, "PrescaleOutOfRange({})", div),
            Self::InexactFrequency => defmt::write!(fmt, "InexactFrequency"),
            Self::ThresholdOutOfRange(value) => defmt::write!(fmt, "ThresholdOutOfRange({})", value),
            Self::InvalidLine(line) => defmt::write!(fmt, "InvalidLine({})", line),
            Self::UnhandledLine(line) => defmt::write!(fmt, "UnhandledLine({})", line),
        }
    }
}

/// Result type for HAL operations
pub type HalResult<T> = Result<T, HalError>;

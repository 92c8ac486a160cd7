//! Serial output abstraction

/// Byte-oriented text sink, usually a UART transmitter.
///
/// There is no error signaling: a saturated transport shows up only as
/// latency in the caller.
pub trait LineSink: Sync {
    /// Write `text` as-is. Callers include their own line terminators.
    fn write_line(&self, text: &str);
}

impl<T: LineSink + ?Sized> LineSink for &T {
    fn write_line(&self, text: &str) {
        (**self).write_line(text);
    }
}

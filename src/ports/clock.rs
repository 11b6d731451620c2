//! Monotonic time source port

/// A monotonic microsecond counter. Only differences between readings matter.
pub trait Clock: Send {
    fn now_micros(&self) -> u64;
}

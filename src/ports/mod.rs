//! Port traits (interfaces)
//!
//! These traits define the boundaries between the driver core and the
//! outside world. Adapters implement them for real hardware, the host
//! clock and the logging stack.

pub mod clock;
pub mod diagnostics;
pub mod serial;

pub use clock::*;
pub use diagnostics::*;
pub use serial::*;

//! Core domain types
//!
//! Pure types with no I/O dependencies: what the driver knows about the
//! stage, how it is configured, and what can go wrong.

pub mod config;
pub mod error;
pub mod types;

pub use config::*;
pub use error::*;
pub use types::*;

#![no_std]
#![forbid(unsafe_code)]

//! # Framework Core
//!
//! Core types for the module framework runtime: typed identifiers, events,
//! signals and status codes. Everything in this crate is a plain value type;
//! no operation here allocates or touches framework state.

#[cfg(any(test, feature = "std"))]
extern crate std;

use core::fmt;

pub mod event;
pub mod id;
pub mod macros;
pub mod signal;

pub use event::*;
pub use id::*;
pub use signal::*;

#[cfg(feature = "defmt")]
pub use defmt;

/// Framework version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Result type used throughout the framework
pub type FwkResult<T> = Result<T, FwkError>;

/// Status codes for framework operations
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FwkError {
    /// One or more parameters were invalid
    Param,
    /// A fixed-capacity table or queue is exhausted
    Nomem,
    /// The operation is not allowed in the current state
    State,
    /// The component has not been initialized
    Init,
    /// Access to the requested resource was denied
    Access,
    /// The requested feature is not supported by the target
    Support,
    /// The operation is not allowed from the calling context
    Handler,
    /// The target is busy servicing another request
    Busy,
    /// Malformed configuration data
    Data,
    /// The operation timed out
    Timeout,
}

impl fmt::Display for FwkError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FwkError::Param => write!(f, "Invalid parameter"),
            FwkError::Nomem => write!(f, "Table or queue exhausted"),
            FwkError::State => write!(f, "Invalid state"),
            FwkError::Init => write!(f, "Not initialized"),
            FwkError::Access => write!(f, "Access denied"),
            FwkError::Support => write!(f, "Not supported"),
            FwkError::Handler => write!(f, "Invalid calling context"),
            FwkError::Busy => write!(f, "Target busy"),
            FwkError::Data => write!(f, "Malformed configuration data"),
            FwkError::Timeout => write!(f, "Timed out"),
        }
    }
}

#[cfg(feature = "std")]
impl std::error::Error for FwkError {}

#[cfg(feature = "defmt")]
impl defmt::Format for FwkError {
    fn format(&self, fmt: defmt::Formatter) {
        match self {
            FwkError::Param => defmt::write!(fmt, "Param"),
            FwkError::Nomem => defmt::write!(fmt, "Nomem"),
            FwkError::State => defmt::write!(fmt, "State"),
            FwkError::Init => defmt::write!(fmt, "Init"),
            FwkError::Access => defmt::write!(fmt, "Access"),
            FwkError::Support => defmt::write!(fmt, "Support"),
            FwkError::Handler => defmt::write!(fmt, "Handler"),
            FwkError::Busy => defmt::write!(fmt, "Busy"),
            FwkError::Data => defmt::write!(fmt, "Data"),
            FwkError::Timeout => defmt::write!(fmt, "Timeout"),
        }
    }
}

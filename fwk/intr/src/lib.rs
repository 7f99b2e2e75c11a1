#![no_std]
#![forbid(unsafe_code)]

//! # Framework Interrupt Boundary
//!
//! The single sanctioned path between interrupt context and the
//! dispatcher. Interrupt handlers never touch module state directly: they
//! post events into an [`EventChannel`] or raise signals into a
//! [`SignalChannel`], and the dispatcher drains both from thread context.
//! Signals are always drained ahead of events.
//!
//! The [`InterruptControl`] wrapper adds a nesting count on top of the
//! architecture driver's global mask, so nested critical sections compose
//! and an unbalanced enable cannot re-enable interrupts early.

pub mod channel;
pub mod control;
pub mod driver;

pub use channel::*;
pub use control::*;
pub use driver::*;

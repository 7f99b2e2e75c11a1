#![no_std]
#![forbid(unsafe_code)]

//! # Framework Executor
//!
//! The run-time engine of the module framework: a single-owner [`Runtime`]
//! holding the module registry, the FIFO event queue, the notification
//! subscription table and the delayed-response tracker.
//!
//! All inter-module communication flows through the queue. Events are
//! delivered strictly one at a time in arrival order, so every module may
//! treat its own state as single-threaded even when interrupt sources feed
//! events concurrently through the interrupt boundary. Signals outrank
//! events and are drained first; ISR-staged events are funneled into the
//! main queue between dispatches.

pub mod delayed;
pub mod runtime;

pub use delayed::*;
pub use runtime::*;

pub use fwk_core::*;
pub use fwk_intr::*;
pub use fwk_module::*;
pub use fwk_notif::*;

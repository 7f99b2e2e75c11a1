#![no_std]
#![forbid(unsafe_code)]

//! # Framework Modules
//!
//! The module registry and the capability interface every module
//! implements. A module is a statically configured unit of functionality
//! (driver, service or hardware abstraction) with zero or more elements.
//! The registry owns every module context, drives the initialization and
//! binding phases in declared order, and answers all identifier-validity
//! and API-lookup queries afterwards.

pub mod config;
pub mod module;
pub mod registry;

pub use config::*;
pub use module::*;
pub use registry::*;

/// Maximum number of modules in a configuration
pub const MODULE_COUNT_MAX: usize = 16;

/// Maximum number of elements per module
pub const ELEMENT_COUNT_MAX: usize = 16;

/// Maximum number of API grants recorded per module
pub const GRANTED_API_COUNT_MAX: usize = 8;

/// Highest bind round; binding runs rounds `0..=BIND_ROUND_MAX`
pub const BIND_ROUND_MAX: u32 = 1;

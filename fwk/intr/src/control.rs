//! Nesting-counted global interrupt control

use core::sync::atomic::{AtomicU32, Ordering};

use fwk_core::{fwk_expect, FwkError, FwkResult};

use crate::InterruptDriver;

/// Nesting-counted global interrupt mask over an architecture driver.
///
/// `global_disable` calls nest: interrupts are masked on the first call
/// and only unmasked when the matching number of `global_enable` calls has
/// been made. An enable with no outstanding disable is an error and does
/// not touch the hardware mask.
pub struct InterruptControl {
    driver: &'static dyn InterruptDriver,
    disable_depth: AtomicU32,
}

impl InterruptControl {
    /// Create a new control wrapper over an architecture driver
    pub const fn new(driver: &'static dyn InterruptDriver) -> Self {
        Self { driver, disable_depth: AtomicU32::new(0) }
    }

    /// Mask interrupts globally, incrementing the nesting count
    pub fn global_disable(&self) {
        if self.disable_depth.fetch_add(1, Ordering::AcqRel) == 0 {
            self.driver.global_disable();
        }
    }

    /// Decrement the nesting count, unmasking interrupts only when the
    /// count returns to zero
    pub fn global_enable(&self) -> FwkResult<()> {
        let depth = self.disable_depth.load(Ordering::Acquire);
        if depth == 0 {
            return Err(FwkError::State);
        }

        if self.disable_depth.fetch_sub(1, Ordering::AcqRel) == 1 {
            self.driver.global_enable();
        }
        Ok(())
    }

    /// Current disable nesting depth
    pub fn disable_depth(&self) -> u32 {
        self.disable_depth.load(Ordering::Acquire)
    }

    /// Run a closure with interrupts masked
    pub fn with_disabled<R>(&self, f: impl FnOnce() -> R) -> R {
        self.global_disable();
        let result = f();
        // Balanced by the disable above.
        fwk_expect!(self.global_enable().is_ok());
        result
    }

    /// Check whether the caller is executing in interrupt context
    pub fn is_interrupt_context(&self) -> bool {
        self.driver.get_current().is_some()
    }

    /// Get the interrupt line currently being serviced
    pub fn current_interrupt(&self) -> Option<u32> {
        self.driver.get_current()
    }

    /// Enable an interrupt line
    pub fn enable(&self, interrupt: u32) -> FwkResult<()> {
        self.driver.enable(interrupt)
    }

    /// Disable an interrupt line
    pub fn disable(&self, interrupt: u32) -> FwkResult<()> {
        self.driver.disable(interrupt)
    }

    /// Test whether an interrupt line is enabled
    pub fn is_enabled(&self, interrupt: u32) -> FwkResult<bool> {
        self.driver.is_enabled(interrupt)
    }

    /// Register the service routine for an interrupt line
    pub fn set_isr(&self, interrupt: u32, isr: fn()) -> FwkResult<()> {
        self.driver.set_isr(interrupt, isr)
    }
}

//! Architecture driver traits

use fwk_core::FwkResult;

/// Non-maskable interrupt identifier
pub const INTERRUPT_NMI: u32 = u32::MAX;

/// Non-existing interrupt identifier, used by configuration data when an
/// interrupt number is expected but the system does not provide one
pub const INTERRUPT_NONE: u32 = u32::MAX - 1;

/// Exception identifier
pub const INTERRUPT_EXCEPTION: u32 = u32::MAX - 2;

/// Interrupt controller driver supplied by the architecture layer.
///
/// The framework only drives the controller through this trait; register
/// programming is the architecture's business.
pub trait InterruptDriver: Sync {
    /// Unmask interrupts globally
    fn global_enable(&self);

    /// Mask interrupts globally
    fn global_disable(&self);

    /// Test whether an interrupt line is enabled
    fn is_enabled(&self, interrupt: u32) -> FwkResult<bool>;

    /// Enable an interrupt line
    fn enable(&self, interrupt: u32) -> FwkResult<()>;

    /// Disable an interrupt line
    fn disable(&self, interrupt: u32) -> FwkResult<()>;

    /// Register the service routine for an interrupt line
    fn set_isr(&self, interrupt: u32, isr: fn()) -> FwkResult<()>;

    /// Get the interrupt line currently being serviced, or `None` when
    /// executing in thread context
    fn get_current(&self) -> Option<u32>;
}

/// Architecture services supplied once by the product entry point.
pub trait ArchDriver: Sync {
    /// The interrupt controller driver
    fn interrupts(&'static self) -> &'static dyn InterruptDriver;

    /// Park the core until the next interrupt
    fn suspend(&self);
}

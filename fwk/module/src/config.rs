//! Static configuration input

use core::any::Any;

use fwk_core::FwkId;

use crate::Module;

/// Opaque configuration blob attached to a module or element.
///
/// The framework only carries the reference; the owning module downcasts
/// it to its concrete configuration type.
pub type ConfigData = &'static (dyn Any + Send + Sync);

/// Static per-element configuration entry
pub struct ElementDesc {
    /// Element name, for diagnostics
    pub name: &'static str,
    /// Number of sub-elements this element subdivides into
    pub sub_element_count: usize,
    /// Element-specific configuration data; required
    pub data: Option<ConfigData>,
}

impl ElementDesc {
    /// Create an element entry with configuration data and no
    /// sub-elements
    pub const fn new(name: &'static str, data: ConfigData) -> Self {
        Self { name, sub_element_count: 0, data: Some(data) }
    }

    /// Set the sub-element count
    pub const fn with_sub_elements(mut self, count: usize) -> Self {
        self.sub_element_count = count;
        self
    }
}

/// Where a module's element table comes from
pub enum ElementTable {
    /// The module has no elements
    None,
    /// A static table
    Static(&'static [ElementDesc]),
    /// A generator invoked once during initialization
    Generate(fn(FwkId) -> &'static [ElementDesc]),
}

/// Per-module configuration
pub struct ModuleConfig {
    /// Module-level configuration data
    pub data: Option<ConfigData>,
    /// The module's elements
    pub elements: ElementTable,
}

impl ModuleConfig {
    /// Create an empty configuration
    pub const fn new() -> Self {
        Self { data: None, elements: ElementTable::None }
    }

    /// Attach module-level configuration data
    pub const fn with_data(mut self, data: ConfigData) -> Self {
        self.data = Some(data);
        self
    }

    /// Attach an element table
    pub const fn with_elements(mut self, elements: ElementTable) -> Self {
        self.elements = elements;
        self
    }
}

impl Default for ModuleConfig {
    fn default() -> Self {
        Self::new()
    }
}

/// One row of the static module table handed to the registry.
///
/// The table is fully formed before initialization begins; the position
/// of a row determines the module's index.
pub struct ModuleEntry {
    pub module: &'static mut dyn Module,
    pub config: ModuleConfig,
}

impl ModuleEntry {
    /// Create a table row
    pub fn new(module: &'static mut dyn Module, config: ModuleConfig) -> Self {
        Self { module, config }
    }
}

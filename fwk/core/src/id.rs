//! Typed identifiers for modules, elements and the objects they expose

use core::fmt;

use crate::fwk_assert;

/// Identifier type tag
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IdType {
    None,
    Module,
    Element,
    SubElement,
    Api,
    Event,
    Notification,
}

/// Compact tagged identifier naming a module, an element within a module,
/// a sub-element within an element, or an API, event or notification type
/// exposed by a module.
///
/// Identifiers are immutable value types produced at configuration time.
/// Two identifiers are equal iff every tag and index field matches. An
/// identifier is only *valid* relative to a registry snapshot; validity is
/// checked at lookup time, never here.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FwkId {
    None,
    Module { module: u8 },
    Element { module: u8, element: u16 },
    SubElement { module: u8, element: u16, sub_element: u16 },
    Api { module: u8, api: u8 },
    Event { module: u8, event: u8 },
    Notification { module: u8, notification: u8 },
}

impl FwkId {
    /// Build a module identifier
    pub const fn module(module: u8) -> Self {
        FwkId::Module { module }
    }

    /// Build an element identifier
    pub const fn element(module: u8, element: u16) -> Self {
        FwkId::Element { module, element }
    }

    /// Build a sub-element identifier
    pub const fn sub_element(module: u8, element: u16, sub_element: u16) -> Self {
        FwkId::SubElement { module, element, sub_element }
    }

    /// Build an API identifier
    pub const fn api(module: u8, api: u8) -> Self {
        FwkId::Api { module, api }
    }

    /// Build an event type identifier
    pub const fn event(module: u8, event: u8) -> Self {
        FwkId::Event { module, event }
    }

    /// Build a notification type identifier
    pub const fn notification(module: u8, notification: u8) -> Self {
        FwkId::Notification { module, notification }
    }

    /// Get the type tag of this identifier
    pub const fn id_type(self) -> IdType {
        match self {
            FwkId::None => IdType::None,
            FwkId::Module { .. } => IdType::Module,
            FwkId::Element { .. } => IdType::Element,
            FwkId::SubElement { .. } => IdType::SubElement,
            FwkId::Api { .. } => IdType::Api,
            FwkId::Event { .. } => IdType::Event,
            FwkId::Notification { .. } => IdType::Notification,
        }
    }

    /// Check the type tag of this identifier
    pub const fn is_type(self, id_type: IdType) -> bool {
        self.id_type() as u8 == id_type as u8
    }

    /// Check whether this identifier names an entity (a module, element or
    /// sub-element) rather than an object type
    pub const fn is_entity(self) -> bool {
        matches!(
            self,
            FwkId::Module { .. } | FwkId::Element { .. } | FwkId::SubElement { .. }
        )
    }

    /// Extract the module index. Valid for every tag except `None`.
    pub fn module_idx(self) -> usize {
        match self {
            FwkId::None => {
                fwk_assert!(false);
                0
            }
            FwkId::Module { module }
            | FwkId::Element { module, .. }
            | FwkId::SubElement { module, .. }
            | FwkId::Api { module, .. }
            | FwkId::Event { module, .. }
            | FwkId::Notification { module, .. } => module as usize,
        }
    }

    /// Extract the element index of an element or sub-element identifier
    pub fn element_idx(self) -> usize {
        match self {
            FwkId::Element { element, .. } | FwkId::SubElement { element, .. } => element as usize,
            _ => {
                fwk_assert!(false);
                0
            }
        }
    }

    /// Extract the sub-element index of a sub-element identifier
    pub fn sub_element_idx(self) -> usize {
        match self {
            FwkId::SubElement { sub_element, .. } => sub_element as usize,
            _ => {
                fwk_assert!(false);
                0
            }
        }
    }

    /// Extract the API index of an API identifier
    pub fn api_idx(self) -> usize {
        match self {
            FwkId::Api { api, .. } => api as usize,
            _ => {
                fwk_assert!(false);
                0
            }
        }
    }

    /// Extract the event index of an event type identifier
    pub fn event_idx(self) -> usize {
        match self {
            FwkId::Event { event, .. } => event as usize,
            _ => {
                fwk_assert!(false);
                0
            }
        }
    }

    /// Extract the notification index of a notification type identifier
    pub fn notification_idx(self) -> usize {
        match self {
            FwkId::Notification { notification, .. } => notification as usize,
            _ => {
                fwk_assert!(false);
                0
            }
        }
    }

    /// Build the identifier of the module owning this identifier
    pub const fn owning_module(self) -> FwkId {
        match self {
            FwkId::None => FwkId::None,
            FwkId::Module { module }
            | FwkId::Element { module, .. }
            | FwkId::SubElement { module, .. }
            | FwkId::Api { module, .. }
            | FwkId::Event { module, .. }
            | FwkId::Notification { module, .. } => FwkId::Module { module },
        }
    }
}

impl fmt::Display for FwkId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FwkId::None => write!(f, "[NON]"),
            FwkId::Module { module } => write!(f, "[MOD {}]", module),
            FwkId::Element { module, element } => write!(f, "[ELM {}:{}]", module, element),
            FwkId::SubElement { module, element, sub_element } => {
                write!(f, "[SUB {}:{}:{}]", module, element, sub_element)
            }
            FwkId::Api { module, api } => write!(f, "[API {}:{}]", module, api),
            FwkId::Event { module, event } => write!(f, "[EVT {}:{}]", module, event),
            FwkId::Notification { module, notification } => {
                write!(f, "[NOT {}:{}]", module, notification)
            }
        }
    }
}

#[cfg(feature = "defmt")]
impl defmt::Format for FwkId {
    fn format(&self, fmt: defmt::Formatter) {
        match self {
            FwkId::None => defmt::write!(fmt, "[NON]"),
            FwkId::Module { module } => defmt::write!(fmt, "[MOD {}]", module),
            FwkId::Element { module, element } => defmt::write!(fmt, "[ELM {}:{}]", module, element),
            FwkId::SubElement { module, element, sub_element } => {
                defmt::write!(fmt, "[SUB {}:{}:{}]", module, element, sub_element)
            }
            FwkId::Api { module, api } => defmt::write!(fmt, "[API {}:{}]", module, api),
            FwkId::Event { module, event } => defmt::write!(fmt, "[EVT {}:{}]", module, event),
            FwkId::Notification { module, notification } => {
                defmt::write!(fmt, "[NOT {}:{}]", module, notification)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_equality_is_structural() {
        let a = FwkId::element(4, 2);
        let b = FwkId::element(4, 2);
        let c = FwkId::element(4, 3);

        assert_eq!(a, a);
        assert_eq!(a, b);
        assert_eq!(b, a);
        assert_ne!(a, c);

        // Same indices under a different tag never compare equal
        assert_ne!(FwkId::api(4, 2), FwkId::event(4, 2));
        assert_ne!(FwkId::module(4), FwkId::element(4, 0));
    }

    #[test]
    fn test_type_predicates() {
        let id = FwkId::sub_element(1, 2, 3);
        assert!(id.is_type(IdType::SubElement));
        assert!(!id.is_type(IdType::Element));
        assert!(id.is_entity());
        assert!(!FwkId::api(1, 0).is_entity());
        assert!(!FwkId::None.is_entity());
    }

    #[test]
    fn test_index_accessors() {
        let id = FwkId::sub_element(7, 3, 1);
        assert_eq!(id.module_idx(), 7);
        assert_eq!(id.element_idx(), 3);
        assert_eq!(id.sub_element_idx(), 1);

        assert_eq!(FwkId::api(2, 5).api_idx(), 5);
        assert_eq!(FwkId::event(2, 1).event_idx(), 1);
        assert_eq!(FwkId::notification(2, 0).notification_idx(), 0);
    }

    #[test]
    fn test_owning_module() {
        assert_eq!(FwkId::element(6, 4).owning_module(), FwkId::module(6));
        assert_eq!(FwkId::notification(6, 1).owning_module(), FwkId::module(6));
        assert_eq!(FwkId::None.owning_module(), FwkId::None);
    }

    #[test]
    fn test_display() {
        use std::string::ToString;

        assert_eq!(FwkId::module(3).to_string(), "[MOD 3]");
        assert_eq!(FwkId::element(3, 1).to_string(), "[ELM 3:1]");
        assert_eq!(FwkId::sub_element(3, 1, 0).to_string(), "[SUB 3:1:0]");
        assert_eq!(FwkId::None.to_string(), "[NON]");
    }
}

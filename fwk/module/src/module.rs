//! The module capability interface and its framework-service seams

use core::any::Any;
use core::fmt;

use fwk_core::{Event, EventOutcome, FwkError, FwkId, FwkResult, LightEvent, Signal};

use crate::ConfigData;

/// A pointer to a statically allocated API table.
///
/// Modules expose APIs as `static` structs and hand out references from
/// [`Module::process_bind_request`]; requesters downcast to the concrete
/// API type they asked for. API tables are never heap-allocated and never
/// freed.
pub type ApiRef = &'static (dyn Any + Send + Sync);

/// Category of functionality a module provides
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ModuleKind {
    /// A driver for a specific hardware block
    Driver,
    /// A hardware-independent service
    Service,
    /// A hardware abstraction layer
    Hal,
}

/// Lifecycle state of a module or element
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ModuleState {
    Uninitialized,
    Initialized,
    Bound,
    Started,
}

impl fmt::Display for ModuleState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ModuleState::Uninitialized => write!(f, "Uninitialized"),
            ModuleState::Initialized => write!(f, "Initialized"),
            ModuleState::Bound => write!(f, "Bound"),
            ModuleState::Started => write!(f, "Started"),
        }
    }
}

/// Framework services available while binding.
///
/// Handed to [`Module::bind`] so a module can acquire the APIs it needs
/// from other modules, regardless of declaration order.
pub trait BindPort {
    /// Request an API from another module.
    ///
    /// Resolves the target, forwards to its `process_bind_request`, and
    /// records the grant. A module may tolerate a failure in round 0 and
    /// retry in a later round.
    fn request_api(&mut self, target_id: FwkId, api_id: FwkId) -> FwkResult<ApiRef>;

    /// Number of elements owned by a module
    fn element_count(&self, id: FwkId) -> FwkResult<usize>;

    /// Configuration data attached to a module or element
    fn config_data(&self, id: FwkId) -> FwkResult<Option<ConfigData>>;
}

/// Framework services available at run time.
///
/// Handed to `start`, `process_event`, `process_notification` and
/// `process_signal`. This is the only legal way for module code to reach
/// the rest of the system.
pub trait FrameworkPort {
    /// Queue a standard event; the framework stamps a fresh cookie into
    /// the caller's buffer
    fn put_event(&mut self, event: &mut Event) -> FwkResult<()>;

    /// Queue a light event
    fn put_event_light(&mut self, event: LightEvent) -> FwkResult<()>;

    /// Queue a request and pump the dispatch loop until its response
    /// arrives, returning it synchronously
    fn put_event_and_wait(&mut self, event: &mut Event) -> FwkResult<Event>;

    /// Broadcast a notification to every subscriber; returns the number
    /// of deliveries
    fn notify(&mut self, event: &mut Event) -> FwkResult<usize>;

    /// Subscribe a target to a notification emitted by a source
    fn subscribe(
        &mut self,
        notification_id: FwkId,
        source_id: FwkId,
        target_id: FwkId,
    ) -> FwkResult<()>;

    /// Remove one matching subscription
    fn unsubscribe(
        &mut self,
        notification_id: FwkId,
        source_id: FwkId,
        target_id: FwkId,
    ) -> FwkResult<()>;

    /// Look up an API granted during binding
    fn lookup_api(
        &self,
        requester_id: FwkId,
        target_id: FwkId,
        api_id: FwkId,
    ) -> FwkResult<ApiRef>;

    /// Number of elements owned by a module
    fn element_count(&self, id: FwkId) -> FwkResult<usize>;

    /// Configuration data attached to a module or element
    fn config_data(&self, id: FwkId) -> FwkResult<Option<ConfigData>>;

    /// The event currently being dispatched, if any
    fn current_event(&self) -> Option<&Event>;
}

/// Capability interface implemented by every module.
///
/// The framework invokes the lifecycle callbacks in a fixed order:
/// `init` (with the element count and module data), `element_init` per
/// element, `post_init`, then `bind` once per round, then `start`. After
/// start, all interaction happens through the process callbacks, one
/// event at a time.
///
/// A module declares the identifier spaces it owns through the count
/// methods; an event or notification index at or above the declared count
/// is rejected at enqueue time.
pub trait Module {
    /// Module name, for diagnostics
    fn name(&self) -> &'static str;

    /// Category of functionality
    fn kind(&self) -> ModuleKind;

    /// Number of APIs this module exposes
    fn api_count(&self) -> usize {
        0
    }

    /// Number of event types this module processes
    fn event_count(&self) -> usize {
        0
    }

    /// Number of notification types this module emits
    fn notification_count(&self) -> usize {
        0
    }

    /// Initialize the module. A failure here is a fatal configuration
    /// error.
    fn init(
        &mut self,
        id: FwkId,
        element_count: usize,
        data: Option<ConfigData>,
    ) -> FwkResult<()>;

    /// Initialize one element. Required whenever the configuration
    /// declares elements.
    fn element_init(
        &mut self,
        _element_id: FwkId,
        _sub_element_count: usize,
        _data: Option<ConfigData>,
    ) -> FwkResult<()> {
        Err(FwkError::Support)
    }

    /// Called once after the module and all its elements initialized
    fn post_init(&mut self, _id: FwkId) -> FwkResult<()> {
        Ok(())
    }

    /// Acquire APIs from other modules. Called once per bind round for
    /// the module itself and once per element.
    fn bind(&mut self, _id: FwkId, _round: u32, _fwk: &mut dyn BindPort) -> FwkResult<()> {
        Ok(())
    }

    /// Grant or refuse an API to a requester
    fn process_bind_request(
        &self,
        _requester_id: FwkId,
        _target_id: FwkId,
        _api_id: FwkId,
    ) -> FwkResult<ApiRef> {
        Err(FwkError::Access)
    }

    /// Called once for the module and once per element after binding
    /// completes
    fn start(&mut self, _id: FwkId, _fwk: &mut dyn FrameworkPort) -> FwkResult<()> {
        Ok(())
    }

    /// Handle one event. When the inbound event requested a response, the
    /// handler fills `response` and returns `Completed`, or returns
    /// `Pending` to complete the response later with the request cookie.
    fn process_event(
        &mut self,
        _event: &Event,
        _response: &mut Event,
        _fwk: &mut dyn FrameworkPort,
    ) -> FwkResult<EventOutcome> {
        Err(FwkError::Support)
    }

    /// Handle one notification delivery
    fn process_notification(
        &mut self,
        _event: &Event,
        _response: &mut Event,
        _fwk: &mut dyn FrameworkPort,
    ) -> FwkResult<EventOutcome> {
        Err(FwkError::Support)
    }

    /// Handle one signal
    fn process_signal(&mut self, _signal: Signal, _fwk: &mut dyn FrameworkPort) -> FwkResult<()> {
        Err(FwkError::Support)
    }
}

//! Event types carried by the framework queue

use core::fmt;

use crate::FwkId;

/// Size in bytes of the opaque payload carried by every standard event
pub const EVENT_PARAMS_SIZE: usize = 16;

/// Cookie correlating a request with its (possibly delayed) response
pub type Cookie = u32;

/// Fixed-capacity opaque payload.
///
/// Payloads are copied wholesale between requests, responses and
/// notification deliveries; producers and consumers agree on the layout
/// out of band.
#[derive(Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct EventParams {
    bytes: [u8; EVENT_PARAMS_SIZE],
}

impl Default for EventParams {
    fn default() -> Self {
        Self::new()
    }
}

impl EventParams {
    /// Create a zeroed payload
    pub const fn new() -> Self {
        Self { bytes: [0; EVENT_PARAMS_SIZE] }
    }

    /// Create a payload from raw bytes, zero-padded; excess bytes are
    /// truncated
    pub fn from_bytes(bytes: &[u8]) -> Self {
        let mut params = Self::new();
        params.write(bytes);
        params
    }

    /// Copy raw bytes into the payload, zero-padding the remainder
    pub fn write(&mut self, bytes: &[u8]) {
        let len = bytes.len().min(EVENT_PARAMS_SIZE);
        self.bytes = [0; EVENT_PARAMS_SIZE];
        self.bytes[..len].copy_from_slice(&bytes[..len]);
    }

    /// Get the raw payload bytes
    pub const fn bytes(&self) -> &[u8; EVENT_PARAMS_SIZE] {
        &self.bytes
    }

    /// Read the leading four payload bytes as a little-endian `u32`
    pub fn as_u32(&self) -> u32 {
        u32::from_le_bytes([self.bytes[0], self.bytes[1], self.bytes[2], self.bytes[3]])
    }
}

impl From<u32> for EventParams {
    fn from(value: u32) -> Self {
        Self::from_bytes(&value.to_le_bytes())
    }
}

impl fmt::Debug for EventParams {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "EventParams({:02x?})", self.bytes)
    }
}

/// Outcome reported by an event or notification handler.
///
/// `Pending` is only meaningful for events that requested a response: the
/// handler could not respond synchronously and will complete the response
/// later with the request cookie.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum EventOutcome {
    /// The event was fully handled
    Completed,
    /// The response will be delivered later via a delayed completion
    Pending,
}

/// Standard event.
///
/// Events are value types: they are copied into queue-owned storage on
/// enqueue, so the producer's buffer can be reused as soon as the call
/// returns.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Event {
    /// Event type identifier (or notification type identifier)
    pub id: FwkId,
    /// Entity that produced the event
    pub source_id: FwkId,
    /// Entity the event is addressed to
    pub target_id: FwkId,
    /// The event is a response to an earlier request
    pub is_response: bool,
    /// The producer expects a response event
    pub response_requested: bool,
    /// The event is a notification delivery
    pub is_notification: bool,
    /// The event completes a previously parked delayed response
    pub is_delayed_response: bool,
    /// Request/response correlation cookie, stamped by the framework on
    /// enqueue
    pub cookie: Cookie,
    /// Opaque payload
    pub params: EventParams,
}

impl Event {
    /// Create an event with all flags clear and a zeroed payload
    pub const fn new(id: FwkId, source_id: FwkId, target_id: FwkId) -> Self {
        Self {
            id,
            source_id,
            target_id,
            is_response: false,
            response_requested: false,
            is_notification: false,
            is_delayed_response: false,
            cookie: 0,
            params: EventParams::new(),
        }
    }

    /// Set the payload
    pub const fn with_params(mut self, params: EventParams) -> Self {
        self.params = params;
        self
    }

    /// Request a response from the target
    pub const fn requesting_response(mut self) -> Self {
        self.response_requested = true;
        self
    }

    /// Build the completion for a response parked earlier under `cookie`
    pub const fn delayed_completion(source_id: FwkId, cookie: Cookie, params: EventParams) -> Self {
        Self {
            id: FwkId::None,
            source_id,
            target_id: FwkId::None,
            is_response: false,
            response_requested: false,
            is_notification: false,
            is_delayed_response: true,
            cookie,
            params,
        }
    }
}

/// Light event: directional, no payload.
///
/// Converted to a standard event when it enters the queue.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct LightEvent {
    pub id: FwkId,
    pub source_id: FwkId,
    pub target_id: FwkId,
    pub response_requested: bool,
}

impl LightEvent {
    /// Create a light event
    pub const fn new(id: FwkId, source_id: FwkId, target_id: FwkId) -> Self {
        Self { id, source_id, target_id, response_requested: false }
    }
}

impl From<LightEvent> for Event {
    fn from(light: LightEvent) -> Self {
        let mut event = Event::new(light.id, light.source_id, light.target_id);
        event.response_requested = light.response_requested;
        event
    }
}

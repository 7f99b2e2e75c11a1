//! Delayed-response tracking

use fwk_core::{Cookie, Event, FwkId, FwkResult};
use fwk_mem::{PoolStats, Slab};

/// Maximum number of responses parked at once
pub const DELAYED_RESPONSE_COUNT_MAX: usize = 16;

struct Record {
    owner: FwkId,
    cookie: Cookie,
    response: Event,
}

/// In-flight requests that could not be answered synchronously.
///
/// When a handler returns `Pending`, the dispatcher parks the prepared
/// response here, keyed by the responding entity and the request cookie.
/// A later completion with the same key consumes the record exactly once;
/// a second completion finds nothing and is rejected by the caller.
/// Cookies are stamped by the dispatcher and unique among outstanding
/// requests; this tracker never generates them.
pub struct DelayedResponses {
    records: Slab<Record, DELAYED_RESPONSE_COUNT_MAX>,
}

impl DelayedResponses {
    /// Create an empty tracker
    pub const fn new() -> Self {
        Self { records: Slab::new() }
    }

    /// Park a prepared response under the responder's id and the request
    /// cookie
    pub fn park(&mut self, response: Event, cookie: Cookie) -> FwkResult<()> {
        let owner = response.source_id;
        self.records.insert(Record { owner, cookie, response }).map(|_| ())
    }

    /// Consume the parked response matching `(owner, cookie)`, if any
    pub fn take(&mut self, owner: FwkId, cookie: Cookie) -> Option<Event> {
        let handle = self
            .records
            .find(|record| record.owner == owner && record.cookie == cookie)?;
        self.records.remove(handle).map(|record| record.response)
    }

    /// Linear scan for the parked response matching `(owner, cookie)`
    pub fn search(&self, owner: FwkId, cookie: Cookie) -> Option<&Event> {
        self.records
            .iter()
            .find(|(_, record)| record.owner == owner && record.cookie == cookie)
            .map(|(_, record)| &record.response)
    }

    /// Iterate over the responses an entity still owes
    pub fn pending_for(&self, owner: FwkId) -> impl Iterator<Item = &Event> + '_ {
        self.records
            .iter()
            .filter(move |(_, record)| record.owner == owner)
            .map(|(_, record)| &record.response)
    }

    /// Number of parked responses
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Check whether no responses are parked
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Occupancy statistics
    pub fn stats(&self) -> PoolStats {
        self.records.stats()
    }
}

impl Default for DelayedResponses {
    fn default() -> Self {
        Self::new()
    }
}

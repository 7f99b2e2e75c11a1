#![no_std]
#![forbid(unsafe_code)]

//! # Framework Notifications
//!
//! Subscription storage for the notification subsystem. A subscription
//! records that a target entity wants every broadcast of a given
//! notification type from a given source. Records live in a bounded arena;
//! the runtime walks them at `notify` time to fan the notification out as
//! independent events.
//!
//! Subscribing twice with the same (source, notification, target) triple
//! is not deduplicated: each record produces its own delivery. Callers
//! that subscribe from multiple paths must unsubscribe symmetrically.

use fwk_core::{FwkError, FwkId, FwkResult};
use fwk_mem::{PoolStats, Slab};

/// Maximum number of live subscriptions across the system
pub const SUBSCRIPTION_COUNT_MAX: usize = 64;

/// A single subscription record
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Subscription {
    /// Entity whose notifications are wanted
    pub source_id: FwkId,
    /// Notification type subscribed to
    pub notification_id: FwkId,
    /// Entity the deliveries are addressed to
    pub target_id: FwkId,
}

/// Arena-backed table of notification subscriptions
pub struct SubscriptionTable {
    records: Slab<Subscription, SUBSCRIPTION_COUNT_MAX>,
}

impl SubscriptionTable {
    /// Create an empty table
    pub const fn new() -> Self {
        Self { records: Slab::new() }
    }

    /// Add a subscription record. Duplicates are permitted and each
    /// produces its own delivery.
    pub fn subscribe(
        &mut self,
        notification_id: FwkId,
        source_id: FwkId,
        target_id: FwkId,
    ) -> FwkResult<()> {
        self.records
            .insert(Subscription { source_id, notification_id, target_id })
            .map(|_| ())
    }

    /// Remove the first record matching the triple.
    ///
    /// Reports `State` when no record matches; the caller treats this as
    /// non-fatal.
    pub fn unsubscribe(
        &mut self,
        notification_id: FwkId,
        source_id: FwkId,
        target_id: FwkId,
    ) -> FwkResult<()> {
        let handle = self
            .records
            .find(|record| {
                record.notification_id == notification_id
                    && record.source_id == source_id
                    && record.target_id == target_id
            })
            .ok_or(FwkError::State)?;

        self.records.remove(handle);
        Ok(())
    }

    /// Iterate over the targets subscribed to a (source, notification)
    /// pair, in subscription order
    pub fn targets(
        &self,
        notification_id: FwkId,
        source_id: FwkId,
    ) -> impl Iterator<Item = FwkId> + '_ {
        self.records
            .iter()
            .filter(move |(_, record)| {
                record.notification_id == notification_id && record.source_id == source_id
            })
            .map(|(_, record)| record.target_id)
    }

    /// Number of subscribers for a (source, notification) pair
    pub fn subscriber_count(&self, notification_id: FwkId, source_id: FwkId) -> usize {
        self.targets(notification_id, source_id).count()
    }

    /// Total number of live subscriptions
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Check whether the table holds no subscriptions
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Occupancy statistics
    pub fn stats(&self) -> PoolStats {
        self.records.stats()
    }
}

impl Default for SubscriptionTable {
    fn default() -> Self {
        Self::new()
    }
}

#![no_std]
#![forbid(unsafe_code)]

//! # Framework Memory
//!
//! Bounded arena storage for framework tables. All framework collections
//! are sized at compile time; there is no global allocator and no
//! steady-state allocation. The [`Slab`] arena hands out generational
//! handles instead of pointers, so a stale handle is detected rather than
//! dereferenced.

#[cfg(test)]
extern crate std;

pub mod slab;

pub use slab::*;

/// Occupancy statistics for a bounded arena
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PoolStats {
    /// Total number of slots
    pub capacity: usize,
    /// Number of slots currently in use
    pub used: usize,
    /// Highest number of slots ever in use at once
    pub peak: usize,
}

impl PoolStats {
    /// Create statistics for an empty pool
    pub const fn new(capacity: usize) -> Self {
        Self { capacity, used: 0, peak: 0 }
    }

    /// Update statistics after an allocation
    pub fn on_alloc(&mut self) {
        self.used += 1;
        if self.used > self.peak {
            self.peak = self.used;
        }
    }

    /// Update statistics after a release
    pub fn on_free(&mut self) {
        if self.used > 0 {
            self.used -= 1;
        }
    }

    /// Check if every slot is in use
    pub const fn is_full(&self) -> bool {
        self.used == self.capacity
    }

    /// Get utilization as a percentage (0-100)
    pub fn utilization(&self) -> u8 {
        if self.capacity == 0 {
            0
        } else {
            ((self.used * 100) / self.capacity) as u8
        }
    }
}

#[cfg(feature = "defmt")]
impl defmt::Format for PoolStats {
    fn format(&self, fmt: defmt::Formatter) {
        defmt::write!(
            fmt,
            "PoolStats{{ capacity: {}, used: {}, peak: {} }}",
            self.capacity,
            self.used,
            self.peak
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pool_stats() {
        let mut stats = PoolStats::new(4);
        assert_eq!(stats.used, 0);
        assert_eq!(stats.peak, 0);
        assert!(!stats.is_full());

        stats.on_alloc();
        stats.on_alloc();
        assert_eq!(stats.used, 2);
        assert_eq!(stats.peak, 2);
        assert_eq!(stats.utilization(), 50);

        stats.on_free();
        assert_eq!(stats.used, 1);
        assert_eq!(stats.peak, 2);
    }
}

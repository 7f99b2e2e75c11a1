//! Generational-handle slab arena

use fwk_core::{FwkError, FwkResult};

use crate::PoolStats;

/// Handle into a [`Slab`].
///
/// Handles carry the generation of the slot they were issued for; once the
/// slot is released and reused, old handles stop resolving.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Handle {
    index: u16,
    generation: u16,
}

impl Handle {
    /// Get the slot index this handle refers to
    pub const fn index(self) -> usize {
        self.index as usize
    }
}

struct Slot<T> {
    generation: u16,
    value: Option<T>,
}

/// Bounded arena with O(1) insert and remove.
///
/// Replaces pointer-threaded lists for queue nodes and subscription
/// records: a flat table of slots plus a free list, addressed by
/// generational handles.
pub struct Slab<T, const N: usize> {
    slots: heapless::Vec<Slot<T>, N>,
    free: heapless::Vec<u16, N>,
    stats: PoolStats,
}

impl<T, const N: usize> Slab<T, N> {
    /// Create a new empty slab
    pub const fn new() -> Self {
        Self {
            slots: heapless::Vec::new(),
            free: heapless::Vec::new(),
            stats: PoolStats::new(N),
        }
    }

    /// Insert a value, returning its handle
    pub fn insert(&mut self, value: T) -> FwkResult<Handle> {
        let handle = if let Some(index) = self.free.pop() {
            let slot = &mut self.slots[index as usize];
            slot.value = Some(value);
            Handle { index, generation: slot.generation }
        } else {
            let index = self.slots.len() as u16;
            self.slots
                .push(Slot { generation: 0, value: Some(value) })
                .map_err(|_| FwkError::Nomem)?;
            Handle { index, generation: 0 }
        };

        self.stats.on_alloc();
        Ok(handle)
    }

    /// Resolve a handle to a shared reference, if still live
    pub fn get(&self, handle: Handle) -> Option<&T> {
        let slot = self.slots.get(handle.index())?;
        if slot.generation != handle.generation {
            return None;
        }
        slot.value.as_ref()
    }

    /// Resolve a handle to an exclusive reference, if still live
    pub fn get_mut(&mut self, handle: Handle) -> Option<&mut T> {
        let slot = self.slots.get_mut(handle.index())?;
        if slot.generation != handle.generation {
            return None;
        }
        slot.value.as_mut()
    }

    /// Remove the value a handle refers to, invalidating the handle
    pub fn remove(&mut self, handle: Handle) -> Option<T> {
        let slot = self.slots.get_mut(handle.index())?;
        if slot.generation != handle.generation {
            return None;
        }
        let value = slot.value.take()?;

        slot.generation = slot.generation.wrapping_add(1);
        // The free list mirrors vacant slots, so the push cannot overflow.
        let _ = self.free.push(handle.index);
        self.stats.on_free();
        Some(value)
    }

    /// Iterate over the live entries with their handles
    pub fn iter(&self) -> impl Iterator<Item = (Handle, &T)> {
        self.slots.iter().enumerate().filter_map(|(index, slot)| {
            slot.value.as_ref().map(|value| {
                (Handle { index: index as u16, generation: slot.generation }, value)
            })
        })
    }

    /// Find the handle of the first entry matching a predicate
    pub fn find(&self, mut predicate: impl FnMut(&T) -> bool) -> Option<Handle> {
        self.iter().find(|(_, value)| predicate(value)).map(|(handle, _)| handle)
    }

    /// Number of live entries
    pub fn len(&self) -> usize {
        self.stats.used
    }

    /// Check whether the slab holds no entries
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Total slot capacity
    pub const fn capacity(&self) -> usize {
        N
    }

    /// Occupancy statistics
    pub const fn stats(&self) -> PoolStats {
        self.stats
    }

    /// Remove every entry
    pub fn clear(&mut self) {
        for (index, slot) in self.slots.iter_mut().enumerate() {
            if slot.value.take().is_some() {
                slot.generation = slot.generation.wrapping_add(1);
                let _ = self.free.push(index as u16);
                self.stats.on_free();
            }
        }
    }
}

impl<T, const N: usize> Default for Slab<T, N> {
    fn default() -> Self {
        Self::new()
    }
}

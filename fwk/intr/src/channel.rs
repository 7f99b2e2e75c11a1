//! Bounded channels from interrupt context to the dispatcher

use core::cell::RefCell;

use critical_section::Mutex;
use heapless::Deque;

use fwk_core::{Event, FwkError, FwkResult, Signal};

/// Default capacity of an [`EventChannel`]
pub const EVENT_CHANNEL_DEPTH: usize = 16;

/// Default capacity of a [`SignalChannel`]
pub const SIGNAL_CHANNEL_DEPTH: usize = 8;

/// Bounded FIFO channel carrying events raised from interrupt context.
///
/// The dispatcher pulls staged events into the main queue from thread
/// context; arrival order is preserved per channel.
pub struct EventChannel<const N: usize = EVENT_CHANNEL_DEPTH> {
    queue: Mutex<RefCell<Deque<Event, N>>>,
}

impl<const N: usize> EventChannel<N> {
    /// Create a new empty channel
    pub const fn new() -> Self {
        Self { queue: Mutex::new(RefCell::new(Deque::new())) }
    }

    /// Post an event from interrupt context; the event is copied into
    /// channel-owned storage
    pub fn post(&self, event: Event) -> FwkResult<()> {
        critical_section::with(|cs| {
            self.queue
                .borrow_ref_mut(cs)
                .push_back(event)
                .map_err(|_| FwkError::Nomem)
        })
    }

    /// Pull the oldest staged event
    pub fn pop(&self) -> Option<Event> {
        critical_section::with(|cs| self.queue.borrow_ref_mut(cs).pop_front())
    }

    /// Check whether any events are staged
    pub fn is_empty(&self) -> bool {
        critical_section::with(|cs| self.queue.borrow_ref(cs).is_empty())
    }

    /// Number of staged events
    pub fn len(&self) -> usize {
        critical_section::with(|cs| self.queue.borrow_ref(cs).len())
    }
}

impl<const N: usize> Default for EventChannel<N> {
    fn default() -> Self {
        Self::new()
    }
}

/// Bounded channel carrying signals.
///
/// Signals outrank events: the dispatcher drains this channel completely
/// before servicing the event queue.
pub struct SignalChannel<const N: usize = SIGNAL_CHANNEL_DEPTH> {
    pending: Mutex<RefCell<Deque<Signal, N>>>,
}

impl<const N: usize> SignalChannel<N> {
    /// Create a new empty channel
    pub const fn new() -> Self {
        Self { pending: Mutex::new(RefCell::new(Deque::new())) }
    }

    /// Raise a signal; usable from interrupt and thread context
    pub fn raise(&self, signal: Signal) -> FwkResult<()> {
        critical_section::with(|cs| {
            self.pending
                .borrow_ref_mut(cs)
                .push_back(signal)
                .map_err(|_| FwkError::Nomem)
        })
    }

    /// Pull the oldest pending signal
    pub fn pop(&self) -> Option<Signal> {
        critical_section::with(|cs| self.pending.borrow_ref_mut(cs).pop_front())
    }

    /// Check whether any signals are pending
    pub fn is_empty(&self) -> bool {
        critical_section::with(|cs| self.pending.borrow_ref(cs).is_empty())
    }

    /// Number of pending signals
    pub fn len(&self) -> usize {
        critical_section::with(|cs| self.pending.borrow_ref(cs).len())
    }
}

impl<const N: usize> Default for SignalChannel<N> {
    fn default() -> Self {
        Self::new()
    }
}

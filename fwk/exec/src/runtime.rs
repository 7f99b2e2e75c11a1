//! The single-owner runtime driving dispatch

use heapless::Deque;

use fwk_core::{
    fwk_assert, fwk_log_debug, fwk_log_error, Cookie, Event, EventOutcome, FwkError, FwkId,
    FwkResult, LightEvent, Signal,
};
use fwk_intr::{ArchDriver, EventChannel, InterruptControl, SignalChannel};
use fwk_module::{ApiRef, ConfigData, FrameworkPort, ModuleEntry, Registry};
use fwk_notif::{SubscriptionTable, SUBSCRIPTION_COUNT_MAX};

use crate::DelayedResponses;

/// Capacity of the main event queue
pub const EVENT_QUEUE_DEPTH: usize = 64;

/// Maximum nesting depth of `put_event_and_wait`
pub const WAIT_DEPTH_MAX: usize = 4;

/// Progress made by one dispatch step
enum Step {
    /// A signal batch, an event or an ISR pull was serviced
    Dispatched,
    /// The queue head belongs to an outer waiter and was re-queued
    Rotated,
    /// The queue head is the response the innermost waiter is pumping for
    Awaited(Event),
    /// Nothing left to do
    Idle,
}

/// The framework runtime.
///
/// Owns the module registry, the event queue and every run-time table.
/// Constructed once by the product entry point after the architecture
/// layer is up; there is no global framework state.
///
/// Events are dispatched strictly one at a time, in FIFO arrival order,
/// from thread context only. Interrupt handlers reach the runtime solely
/// through the event and signal channels supplied at construction.
pub struct Runtime {
    registry: Registry,
    queue: Deque<Event, EVENT_QUEUE_DEPTH>,
    isr_events: &'static EventChannel,
    signals: &'static SignalChannel,
    subscriptions: SubscriptionTable,
    delayed: DelayedResponses,
    intr: InterruptControl,
    arch: &'static dyn ArchDriver,
    current: Option<Event>,
    cookie_counter: Cookie,
    waiters: heapless::Vec<(FwkId, Cookie), WAIT_DEPTH_MAX>,
}

impl Runtime {
    /// Initialize the framework from the static module table.
    ///
    /// Runs the initialization and binding phases for every configured
    /// module, in declared order. Any failure here is a malformed
    /// configuration with no supervisor to recover to, so this traps
    /// rather than returning an error.
    pub fn new(
        entries: impl IntoIterator<Item = ModuleEntry>,
        arch: &'static dyn ArchDriver,
        isr_events: &'static EventChannel,
        signals: &'static SignalChannel,
    ) -> Self {
        let mut registry = match Registry::init(entries) {
            Ok(registry) => registry,
            Err(error) => panic!("module initialization failed: {}", error),
        };
        if let Err(error) = registry.bind_all() {
            panic!("module binding failed: {}", error);
        }

        Self {
            registry,
            queue: Deque::new(),
            isr_events,
            signals,
            subscriptions: SubscriptionTable::new(),
            delayed: DelayedResponses::new(),
            intr: InterruptControl::new(arch.interrupts()),
            arch,
            current: None,
            cookie_counter: 0,
            waiters: heapless::Vec::new(),
        }
    }

    /// Run every module's and element's `start` callback, then mark the
    /// registry running. Traps on failure, like the earlier phases.
    pub fn start(&mut self) {
        if let Err(error) = self.registry.begin_start() {
            panic!("start out of sequence: {}", error);
        }

        for index in 0..self.registry.module_count() {
            let module_id = FwkId::module(index as u8);
            let element_count = self.registry.element_count(module_id).unwrap_or(0);

            let Some(module) = self.registry.take_module(index) else {
                panic!("module {} missing at start", index);
            };

            let mut result = module.start(module_id, self);
            for element_idx in 0..element_count {
                if result.is_err() {
                    break;
                }
                let element_id = FwkId::element(index as u8, element_idx as u16);
                result = module.start(element_id, self);
            }

            self.registry.restore_module(index, module);

            if let Err(error) = result {
                panic!("start of module {} failed: {}", index, error);
            }
            self.registry.mark_started(index);
        }

        self.registry.finish_start();
    }

    /// Access the registry for validity and configuration queries
    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// Access the nesting-counted interrupt control
    pub fn interrupts(&self) -> &InterruptControl {
        &self.intr
    }

    /// Inspect the delayed-response tracker
    pub fn delayed_responses(&self) -> &DelayedResponses {
        &self.delayed
    }

    /// Inspect the subscription table
    pub fn subscriptions(&self) -> &SubscriptionTable {
        &self.subscriptions
    }

    /// Number of events waiting in the main queue
    pub fn queue_len(&self) -> usize {
        self.queue.len()
    }

    /// Queue a standard event.
    ///
    /// The event is copied into queue-owned storage and a fresh cookie is
    /// stamped into the caller's buffer; the call never blocks. With
    /// `is_delayed_response` set, the event instead completes the response
    /// parked under `(source_id, cookie)`.
    pub fn put_event(&mut self, event: &mut Event) -> FwkResult<()> {
        let in_isr = self.intr.is_interrupt_context();

        // Events raised while dispatching inherit the current target as
        // their source, so handlers need not know their own id.
        if !in_isr && self.current.is_some() {
            if let Some(current) = &self.current {
                event.source_id = current.target_id;
            }
        } else if !self.registry.is_valid_entity_id(event.source_id) {
            fwk_log_error!("[FWK] invalid event source {}", event.source_id);
            return Err(FwkError::Param);
        }

        // A completion is matched against its parked response; only the
        // source needed validating.
        if event.is_delayed_response {
            return self.complete_delayed(event);
        }

        self.validate_event(event)?;

        event.cookie = self.next_cookie();
        fwk_log_debug!(
            "[FWK] sent {}: {} @ {} -> {}",
            event.cookie,
            event.id,
            event.source_id,
            event.target_id
        );
        self.queue_event(*event)
    }

    /// Queue a light event, converting it to a standard event
    pub fn put_event_light(&mut self, light: LightEvent) -> FwkResult<()> {
        let mut event = Event::from(light);
        self.put_event(&mut event)
    }

    /// Queue a request and pump the dispatch loop until its response
    /// arrives, returning the response synchronously.
    ///
    /// Only legal from thread context. Interleaved events keep being
    /// dispatched while waiting, so forward progress depends on queued
    /// work eventually producing the response; a response that never
    /// arrives is a permanent hang. Nested waits from inside a handler
    /// are bounded by [`WAIT_DEPTH_MAX`].
    pub fn put_event_and_wait(&mut self, event: &mut Event) -> FwkResult<Event> {
        if self.intr.is_interrupt_context() {
            fwk_log_error!("[FWK] put_event_and_wait from interrupt context");
            return Err(FwkError::Handler);
        }
        if self.waiters.is_full() {
            fwk_log_error!("[FWK] wait nesting limit reached");
            return Err(FwkError::Busy);
        }

        event.response_requested = true;
        self.put_event(event)?;

        // put_event resolved the source and stamped the cookie.
        let _ = self.waiters.push((event.source_id, event.cookie));

        let mut rotations = 0;
        loop {
            match self.step() {
                Step::Dispatched => rotations = 0,
                Step::Rotated => {
                    rotations += 1;
                    if rotations > self.queue.len() {
                        // Only outer waiters' responses remain queued:
                        // this wait can never complete.
                        self.waiters.pop();
                        fwk_log_error!("[FWK] wait cannot make progress");
                        return Err(FwkError::State);
                    }
                }
                Step::Awaited(response) => {
                    self.waiters.pop();
                    return Ok(response);
                }
                Step::Idle => self.arch.suspend(),
            }
        }
    }

    /// Broadcast a notification to every subscriber of the (source,
    /// notification) pair.
    ///
    /// Each delivery is an independent, fire-and-forget event carrying a
    /// copy of the payload; the notifier does not block on or aggregate
    /// subscriber responses. Returns the number of deliveries queued.
    pub fn notify(&mut self, event: &mut Event) -> FwkResult<usize> {
        let in_isr = self.intr.is_interrupt_context();

        if !in_isr && self.current.is_some() {
            if !self.registry.is_valid_entity_id(event.source_id) {
                if let Some(current) = &self.current {
                    event.source_id = current.target_id;
                }
            }
        } else if !self.registry.is_valid_entity_id(event.source_id) {
            fwk_log_error!("[FWK] invalid notification source {}", event.source_id);
            return Err(FwkError::Param);
        }

        if !self.registry.is_valid_notification_id(event.id)
            || event.id.module_idx() != event.source_id.module_idx()
        {
            fwk_log_error!("[FWK] invalid notification {}", event.id);
            return Err(FwkError::Param);
        }

        event.is_response = false;
        event.is_notification = true;

        let targets: heapless::Vec<FwkId, SUBSCRIPTION_COUNT_MAX> =
            self.subscriptions.targets(event.id, event.source_id).collect();

        let mut count = 0;
        for target_id in targets {
            let mut delivery = *event;
            delivery.target_id = target_id;
            delivery.cookie = self.next_cookie();
            if self.queue_event(delivery).is_ok() {
                count += 1;
            }
        }
        Ok(count)
    }

    /// Subscribe a target to a notification emitted by a source.
    ///
    /// Subscriptions are not deduplicated: subscribing twice produces two
    /// deliveries per broadcast.
    pub fn subscribe(
        &mut self,
        notification_id: FwkId,
        source_id: FwkId,
        target_id: FwkId,
    ) -> FwkResult<()> {
        self.check_subscription(notification_id, source_id, target_id)?;
        self.subscriptions.subscribe(notification_id, source_id, target_id)
    }

    /// Remove one subscription matching the triple; reported but
    /// non-fatal when none matches
    pub fn unsubscribe(
        &mut self,
        notification_id: FwkId,
        source_id: FwkId,
        target_id: FwkId,
    ) -> FwkResult<()> {
        self.check_subscription(notification_id, source_id, target_id)?;
        let result = self.subscriptions.unsubscribe(notification_id, source_id, target_id);
        if result.is_err() {
            fwk_log_error!(
                "[FWK] no subscription {} @ {} -> {}",
                notification_id,
                source_id,
                target_id
            );
        }
        result
    }

    fn check_subscription(
        &self,
        notification_id: FwkId,
        source_id: FwkId,
        target_id: FwkId,
    ) -> FwkResult<()> {
        if self.intr.is_interrupt_context() {
            return Err(FwkError::Handler);
        }
        if !self.registry.is_valid_notification_id(notification_id)
            || !self.registry.is_valid_entity_id(source_id)
            || !self.registry.is_valid_entity_id(target_id)
            || notification_id.module_idx() != source_id.module_idx()
        {
            return Err(FwkError::Param);
        }
        Ok(())
    }

    /// Raise a signal. Signals carry no payload and are delivered ahead
    /// of all queued events.
    pub fn put_signal(&mut self, signal: Signal) -> FwkResult<()> {
        if !self.registry.is_valid_entity_id(signal.source_id)
            || !self.registry.is_valid_entity_id(signal.target_id)
        {
            return Err(FwkError::Param);
        }
        self.signals.raise(signal)
    }

    /// Drain pending signals, queued events and ISR-staged events until
    /// the system is idle.
    pub fn process_event_queue(&mut self) {
        debug_assert!(self.waiters.is_empty());
        loop {
            if matches!(self.step(), Step::Idle) {
                break;
            }
        }
    }

    /// Run the main loop: dispatch until idle, then park the core until
    /// the next interrupt.
    pub fn run(&mut self) -> ! {
        fwk_assert!(self.registry.is_running());
        loop {
            self.process_event_queue();
            self.arch.suspend();
        }
    }

    /// Drop every queued event; returns the number dropped
    pub fn reset_queue(&mut self) -> usize {
        let mut dropped = 0;
        while self.queue.pop_front().is_some() {
            dropped += 1;
        }
        dropped
    }

    fn next_cookie(&mut self) -> Cookie {
        let cookie = self.cookie_counter;
        self.cookie_counter = self.cookie_counter.wrapping_add(1);
        cookie
    }

    /// Route an event to the queue matching the calling context
    fn queue_event(&mut self, event: Event) -> FwkResult<()> {
        if self.intr.is_interrupt_context() {
            self.isr_events.post(event)
        } else {
            self.queue.push_back(event).map_err(|_| {
                fwk_log_error!("[FWK] event queue full");
                FwkError::Nomem
            })
        }
    }

    fn validate_event(&self, event: &Event) -> FwkResult<()> {
        if !self.registry.is_valid_entity_id(event.target_id) {
            fwk_log_error!("[FWK] invalid event target {}", event.target_id);
            return Err(FwkError::Param);
        }

        if event.is_notification {
            // Notifications are queued directly only as responses; the
            // deliveries themselves go through notify().
            if !self.registry.is_valid_notification_id(event.id)
                || !event.is_response
                || event.response_requested
                || event.id.module_idx() != event.target_id.module_idx()
            {
                fwk_log_error!("[FWK] invalid notification response {}", event.id);
                return Err(FwkError::Param);
            }
        } else {
            if !self.registry.is_valid_event_id(event.id) {
                fwk_log_error!("[FWK] invalid event id {}", event.id);
                return Err(FwkError::Param);
            }
            if event.is_response {
                if event.id.module_idx() != event.source_id.module_idx()
                    || event.response_requested
                {
                    return Err(FwkError::Param);
                }
            } else if event.id.module_idx() != event.target_id.module_idx() {
                fwk_log_error!("[FWK] event {} not owned by target {}", event.id, event.target_id);
                return Err(FwkError::Param);
            }
        }
        Ok(())
    }

    /// Route a completion to the response parked under
    /// `(source, cookie)`
    fn complete_delayed(&mut self, event: &Event) -> FwkResult<()> {
        let Some(mut response) = self.delayed.take(event.source_id, event.cookie) else {
            // Stale or duplicate completion.
            fwk_log_error!(
                "[FWK] no delayed response for {} cookie {}",
                event.source_id,
                event.cookie
            );
            return Err(FwkError::Param);
        };

        response.params = event.params;
        self.queue_event(response)
    }

    /// One dispatch step: signals first, then the queue head, then an
    /// ISR pull
    fn step(&mut self) -> Step {
        self.dispatch_signals();

        let Some(event) = self.queue.pop_front() else {
            let mut pulled = false;
            while let Some(staged) = self.isr_events.pop() {
                pulled = true;
                fwk_log_debug!("[FWK] pulled ISR event {} -> {}", staged.source_id, staged.target_id);
                if self.queue.push_back(staged).is_err() {
                    fwk_log_error!("[FWK] event queue full, ISR event dropped");
                    break;
                }
            }
            return if pulled { Step::Dispatched } else { Step::Idle };
        };

        if event.is_response && !self.waiters.is_empty() {
            if let Some(&(waiter, cookie)) = self.waiters.last() {
                if event.target_id == waiter && event.cookie == cookie {
                    return Step::Awaited(event);
                }
            }
            let belongs_to_outer_waiter = self
                .waiters
                .iter()
                .any(|&(waiter, cookie)| event.target_id == waiter && event.cookie == cookie);
            if belongs_to_outer_waiter {
                // Hold the response until that wait resumes pumping.
                let _ = self.queue.push_back(event);
                return Step::Rotated;
            }
        }

        self.deliver(event);
        Step::Dispatched
    }

    /// Deliver all pending signals, ahead of any queued event
    fn dispatch_signals(&mut self) {
        while let Some(signal) = self.signals.pop() {
            if !self.registry.is_valid_entity_id(signal.target_id) {
                fwk_log_error!("[FWK] invalid signal target {}", signal.target_id);
                continue;
            }

            let index = signal.target_id.module_idx();
            let Some(module) = self.registry.take_module(index) else {
                fwk_log_error!("[FWK] signal target {} busy", signal.target_id);
                continue;
            };

            let result = module.process_signal(signal, self);
            self.registry.restore_module(index, module);

            if let Err(error) = result {
                fwk_log_error!("[FWK] signal to {} failed: {}", signal.target_id, error);
            }
        }
    }

    /// Deliver one event to its target's handler and route the response
    fn deliver(&mut self, event: Event) {
        fwk_log_debug!(
            "[FWK] processing {}: {} @ {} -> {}",
            event.cookie,
            event.id,
            event.source_id,
            event.target_id
        );

        if !self.registry.is_valid_entity_id(event.target_id) {
            fwk_log_error!("[FWK] unknown event target {}", event.target_id);
            return;
        }

        let index = event.target_id.module_idx();
        let Some(module) = self.registry.take_module(index) else {
            // The target is itself mid-callback (nested wait); one event
            // must not take the system down.
            fwk_log_error!("[FWK] target {} busy, event dropped", event.target_id);
            return;
        };

        // Nested dispatch from a waiting handler must see its own event
        // restored afterwards.
        let previous = self.current.replace(event);

        let mut response = event;
        response.source_id = event.target_id;
        response.target_id = event.source_id;
        response.is_delayed_response = false;

        let result = if event.is_notification {
            module.process_notification(&event, &mut response, self)
        } else {
            module.process_event(&event, &mut response, self)
        };

        self.registry.restore_module(index, module);
        self.current = previous;

        if event.response_requested {
            response.is_response = true;
            response.response_requested = false;

            match result {
                Ok(EventOutcome::Pending) => {
                    response.is_delayed_response = true;
                    if self.delayed.park(response, event.cookie).is_err() {
                        fwk_log_error!("[FWK] delayed response table full");
                    }
                }
                Ok(EventOutcome::Completed) => {
                    let _ = self.queue_event(response);
                }
                Err(error) => {
                    // The handler failed; the requester still gets its
                    // response so it can observe the failure.
                    fwk_log_error!(
                        "[FWK] process event ({}: {} -> {}) failed: {}",
                        event.id,
                        event.source_id,
                        event.target_id,
                        error
                    );
                    let _ = self.queue_event(response);
                }
            }
        } else if let Err(error) = result {
            fwk_log_error!(
                "[FWK] process event ({}: {} -> {}) failed: {}",
                event.id,
                event.source_id,
                event.target_id,
                error
            );
        }
    }
}

impl FrameworkPort for Runtime {
    fn put_event(&mut self, event: &mut Event) -> FwkResult<()> {
        Runtime::put_event(self, event)
    }

    fn put_event_light(&mut self, event: LightEvent) -> FwkResult<()> {
        Runtime::put_event_light(self, event)
    }

    fn put_event_and_wait(&mut self, event: &mut Event) -> FwkResult<Event> {
        Runtime::put_event_and_wait(self, event)
    }

    fn notify(&mut self, event: &mut Event) -> FwkResult<usize> {
        Runtime::notify(self, event)
    }

    fn subscribe(
        &mut self,
        notification_id: FwkId,
        source_id: FwkId,
        target_id: FwkId,
    ) -> FwkResult<()> {
        Runtime::subscribe(self, notification_id, source_id, target_id)
    }

    fn unsubscribe(
        &mut self,
        notification_id: FwkId,
        source_id: FwkId,
        target_id: FwkId,
    ) -> FwkResult<()> {
        Runtime::unsubscribe(self, notification_id, source_id, target_id)
    }

    fn lookup_api(
        &self,
        requester_id: FwkId,
        target_id: FwkId,
        api_id: FwkId,
    ) -> FwkResult<ApiRef> {
        self.registry.lookup_api(requester_id, target_id, api_id)
    }

    fn element_count(&self, id: FwkId) -> FwkResult<usize> {
        self.registry.element_count(id)
    }

    fn config_data(&self, id: FwkId) -> FwkResult<Option<ConfigData>> {
        self.registry.data(id)
    }

    fn current_event(&self) -> Option<&Event> {
        self.current.as_ref()
    }
}

//! Event dispatcher.
//!
//! Dispatcher is the single reader of a target event channel. Each event set is
//! dispatched inside the target mutation domain: events bound to a subscription token
//! go to a registered listener, others are routed to fixed handlers of the target model.
//! After the whole set is routed, the set is resumed if at least one listener voted
//! and all voters agree to resume.

use crate::config::{Config, DispatcherConfig};
use crate::debugger::error::Error;
use crate::debugger::event::{Event, EventChannel, EventKind, EventRequestId, EventSet};
use crate::debugger::target::DebugTarget;
use crate::log::Reporter;
use log::debug;
use std::collections::HashMap;
use std::io;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};
use strum_macros::Display;

/// Subscriber of events produced by a single event request.
pub trait EventListener: Send + Sync {
    /// Handle an event, return `true` to vote for resuming the event set.
    ///
    /// Called inside the target mutation domain, so control operations
    /// of [`DebugTarget`] must not be called from here.
    fn handle_event(&self, event: &Event, target: &DebugTarget) -> bool;
}

impl<F> EventListener for F
where
    F: Fn(&Event, &DebugTarget) -> bool + Send + Sync,
{
    fn handle_event(&self, event: &Event, target: &DebugTarget) -> bool {
        self(event, target)
    }
}

/// Mapping from a subscription token to its listener.
///
/// Guarded by its own lock, independent of the target mutation domain, so listeners may
/// be added and removed while a set is dispatched (even from the listener code itself).
#[derive(Clone, Default)]
pub struct ListenerRegistry {
    listeners: Arc<Mutex<HashMap<EventRequestId, Arc<dyn EventListener>>>>,
}

impl ListenerRegistry {
    /// Bind a listener to a token, return previous listener of this token.
    pub fn add(
        &self,
        token: EventRequestId,
        listener: Arc<dyn EventListener>,
    ) -> Option<Arc<dyn EventListener>> {
        self.listeners.lock().unwrap().insert(token, listener)
    }

    pub fn remove(&self, token: EventRequestId) -> Option<Arc<dyn EventListener>> {
        self.listeners.lock().unwrap().remove(&token)
    }

    pub fn get(&self, token: EventRequestId) -> Option<Arc<dyn EventListener>> {
        self.listeners.lock().unwrap().get(&token).cloned()
    }

    pub fn contains(&self, token: EventRequestId) -> bool {
        self.listeners.lock().unwrap().contains_key(&token)
    }

    pub fn len(&self) -> usize {
        self.listeners.lock().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn clear(&self) {
        self.listeners.lock().unwrap().clear();
    }
}

/// Dispatcher state.
///
/// Worker goes `Reading -> Dispatching -> Idle -> Reading ...`, `Idle` is a state between
/// the end of a set dispatch and the next channel read (or a state before the first read).
#[derive(Clone, Copy, PartialEq, Eq, Debug, Display)]
#[strum(serialize_all = "lowercase")]
pub enum DispatcherState {
    /// No set is read or dispatched.
    Idle,
    /// Blocked on the channel.
    Reading,
    Dispatching,
    /// Terminal state.
    Stopped,
}

/// Summary of a single event set dispatch.
#[derive(Clone, Copy, PartialEq, Eq, Debug, Default)]
pub struct DispatchOutcome {
    /// At least one event voted for resume or against it.
    pub voted: bool,
    /// Event set was resumed.
    pub resumed: bool,
    /// Number of events that reached a listener or a fixed handler.
    pub dispatched: usize,
    /// Number of events left undispatched (shutdown or handler failure).
    pub skipped: usize,
}

pub struct EventDispatcher {
    target: Arc<DebugTarget>,
    listeners: ListenerRegistry,
    keep_reading: AtomicBool,
    state: Mutex<DispatcherState>,
    pending: AtomicUsize,
    reporter: Arc<dyn Reporter>,
    config: DispatcherConfig,
}

impl EventDispatcher {
    pub fn new(target: Arc<DebugTarget>) -> Self {
        Self {
            reporter: target.reporter(),
            target,
            listeners: ListenerRegistry::default(),
            keep_reading: AtomicBool::new(true),
            state: Mutex::new(DispatcherState::Idle),
            pending: AtomicUsize::new(0),
            config: Config::global_default().dispatcher.clone(),
        }
    }

    pub fn with_config(self, config: DispatcherConfig) -> Self {
        Self { config, ..self }
    }

    pub fn with_reporter(self, reporter: Arc<dyn Reporter>) -> Self {
        Self { reporter, ..self }
    }

    pub fn target(&self) -> &Arc<DebugTarget> {
        &self.target
    }

    /// Return a registry handle, it may be shared with code that creates event requests.
    pub fn listeners(&self) -> &ListenerRegistry {
        &self.listeners
    }

    /// Subscribe a listener to events of a request. Only one listener per request,
    /// previous listener is replaced.
    pub fn add_listener(&self, token: EventRequestId, listener: Arc<dyn EventListener>) {
        if self.listeners.add(token, listener).is_some() {
            self.reporter.report_warning(
                "dispatcher",
                &format!("listener of {token} replaced"),
            );
        }
    }

    pub fn remove_listener(&self, token: EventRequestId) -> bool {
        self.listeners.remove(token).is_some()
    }

    pub fn has_listener(&self, token: EventRequestId) -> bool {
        self.listeners.contains(token)
    }

    pub fn state(&self) -> DispatcherState {
        *self.state.lock().unwrap()
    }

    fn set_state(&self, state: DispatcherState) {
        let mut current = self.state.lock().unwrap();
        if *current != DispatcherState::Stopped {
            *current = state;
        }
    }

    /// True if events of a currently dispatched set are still waiting for dispatch.
    pub fn has_pending_events(&self) -> bool {
        self.pending.load(Ordering::SeqCst) > 0
    }

    fn keep_reading(&self) -> bool {
        self.keep_reading.load(Ordering::SeqCst)
    }

    /// Ask dispatcher to stop. Current event is dispatched till the end, remaining events
    /// of the current set are skipped. A read already blocked on the channel returns
    /// when the channel delivers a set or disconnects.
    pub fn shutdown(&self) {
        debug!(target: "dispatcher", "shutdown requested");
        self.keep_reading.store(false, Ordering::SeqCst);
    }

    /// Read and dispatch event sets until channel disconnects or dispatcher stops.
    pub fn run(&self, channel: &mut dyn EventChannel) {
        while self.keep_reading() {
            self.set_state(DispatcherState::Reading);
            let set = match channel.next_set() {
                Ok(set) => set,
                Err(e) => {
                    debug!(target: "dispatcher", "stop reading: {e}");
                    break;
                }
            };
            self.dispatch(&set);
        }
        self.stop();
    }

    fn stop(&self) {
        self.keep_reading.store(false, Ordering::SeqCst);
        self.pending.store(0, Ordering::SeqCst);
        self.listeners.clear();
        *self.state.lock().unwrap() = DispatcherState::Stopped;
        debug!(target: "dispatcher", "{} dispatcher stopped", self.target.name());
    }

    /// Dispatch a single event set inside the target mutation domain.
    pub fn dispatch(&self, set: &EventSet) -> DispatchOutcome {
        let _guard = self.target.lock_domain();
        self.set_state(DispatcherState::Dispatching);
        debug!(target: "dispatcher", "dispatch {set}");

        self.pending.store(set.len(), Ordering::SeqCst);
        let mut outcome = DispatchOutcome::default();
        let mut vote = false;
        let mut resume = true;
        let mut failed = false;

        for event in set.iter() {
            if !self.keep_reading() {
                break;
            }
            self.pending.fetch_sub(1, Ordering::SeqCst);
            outcome.dispatched += 1;

            let listener = event
                .request
                .and_then(|token| self.listeners.get(token).map(|l| (token, l)));
            if let Some((token, listener)) = listener {
                vote = true;
                // listener is called even if the set is already voted against
                let handled = panic::catch_unwind(AssertUnwindSafe(|| {
                    listener.handle_event(event, &self.target)
                }));
                match handled {
                    Ok(listener_vote) => resume = listener_vote && resume,
                    Err(_) => {
                        self.reporter
                            .report_error("dispatcher", &Error::ListenerPanicked(token));
                        failed = true;
                        break;
                    }
                }
                continue;
            }

            match self.route(event) {
                Ok(true) => vote = true,
                Ok(false) => {}
                Err(e) => {
                    self.reporter.report_error("dispatcher", &e);
                    if e.is_fatal() {
                        self.keep_reading.store(false, Ordering::SeqCst);
                    }
                    failed = true;
                    break;
                }
            }
        }

        outcome.skipped = self.pending.swap(0, Ordering::SeqCst);
        outcome.voted = vote;

        if vote && resume && !failed && self.keep_reading() {
            match self.target.remote().resume_set(set) {
                Ok(()) => outcome.resumed = true,
                Err(e) => {
                    let e = Error::from(e);
                    self.reporter.report_error("dispatcher", &e);
                    if e.is_fatal() {
                        self.keep_reading.store(false, Ordering::SeqCst);
                    }
                }
            }
        }

        debug!(
            target: "dispatcher",
            "dispatched {} event(s), skipped {}, resumed: {}",
            outcome.dispatched, outcome.skipped, outcome.resumed
        );
        self.set_state(DispatcherState::Idle);
        outcome
    }

    /// Route an event without listener to the target model.
    /// Return `true` if the handler votes for resuming the set.
    fn route(&self, event: &Event) -> Result<bool, Error> {
        let target = &self.target;
        match &event.kind {
            EventKind::Step { thread, location } => match target.find_thread(*thread) {
                Some(_) => target.handle_step(*thread, *location)?,
                None => {
                    debug!(target: "dispatcher", "stale step in {thread}, resume it");
                    target.resume_thread(*thread)?;
                }
            },
            EventKind::ThreadStart { thread } => target.handle_thread_start(*thread),
            EventKind::ThreadDeath { thread } => target.handle_thread_death(*thread),
            EventKind::ClassPrepare {
                thread,
                type_ref,
                name,
            } => {
                target.handle_class_load(*thread, *type_ref, name);
                return Ok(self.config.class_prepare_resumes);
            }
            EventKind::VmStart { thread } => target.handle_vm_start(*thread)?,
            EventKind::VmDeath => {
                self.keep_reading.store(false, Ordering::SeqCst);
                target.handle_vm_death();
            }
            EventKind::VmDisconnect => {
                self.keep_reading.store(false, Ordering::SeqCst);
                target.handle_vm_disconnect();
            }
            EventKind::Breakpoint { .. }
            | EventKind::Exception { .. }
            | EventKind::MethodEntry { .. }
            | EventKind::MethodExit { .. }
            | EventKind::Other { .. } => {
                debug!(target: "dispatcher", "no handler for {event}, ignored");
            }
        }
        Ok(false)
    }

    /// Start a dedicated worker that reads the channel.
    pub fn spawn(
        self: Arc<Self>,
        channel: impl EventChannel + 'static,
    ) -> io::Result<DispatcherHandle> {
        let worker = thread::Builder::new()
            .name(self.config.thread_name.clone())
            .spawn({
                let dispatcher = self.clone();
                let mut channel = channel;
                move || dispatcher.run(&mut channel)
            })?;

        Ok(DispatcherHandle {
            dispatcher: self,
            worker,
        })
    }
}

/// Handle of a running dispatcher worker.
pub struct DispatcherHandle {
    dispatcher: Arc<EventDispatcher>,
    worker: JoinHandle<()>,
}

impl DispatcherHandle {
    pub fn dispatcher(&self) -> &Arc<EventDispatcher> {
        &self.dispatcher
    }

    pub fn state(&self) -> DispatcherState {
        self.dispatcher.state()
    }

    pub fn shutdown(&self) {
        self.dispatcher.shutdown();
    }

    pub fn is_finished(&self) -> bool {
        self.worker.is_finished()
    }

    /// Wait for the worker, return `Err` if worker panicked.
    pub fn join(self) -> thread::Result<()> {
        self.worker.join()
    }
}

use crate::debugger::remote::{ObjectRef, ThreadRef, TypeRef};
use itertools::Itertools;
use std::fmt::{Display, Formatter};
use std::sync::mpsc;

/// Subscription token, represents a standing request to be notified about matching events.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EventRequestId(pub u64);

impl Display for EventRequestId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "request#{}", self.0)
    }
}

/// Code position in a target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Location {
    pub type_ref: TypeRef,
    pub method: u64,
    pub code_index: u64,
}

impl Location {
    pub fn new(type_ref: TypeRef, method: u64, code_index: u64) -> Self {
        Self {
            type_ref,
            method,
            code_index,
        }
    }
}

/// Category of a target event with category specific data.
#[derive(Debug, Clone, PartialEq)]
pub enum EventKind {
    /// Target process initialized.
    VmStart { thread: ThreadRef },
    /// Target process terminated.
    VmDeath,
    /// Connection with the target closed.
    VmDisconnect,
    ThreadStart { thread: ThreadRef },
    ThreadDeath { thread: ThreadRef },
    /// A type is loaded and prepared.
    ClassPrepare {
        thread: ThreadRef,
        type_ref: TypeRef,
        name: String,
    },
    /// A step requested for a thread completed.
    Step {
        thread: ThreadRef,
        location: Location,
    },
    Breakpoint {
        thread: ThreadRef,
        location: Location,
    },
    Exception {
        thread: ThreadRef,
        location: Location,
        exception: ObjectRef,
    },
    MethodEntry {
        thread: ThreadRef,
        location: Location,
    },
    MethodExit {
        thread: ThreadRef,
        location: Location,
    },
    /// Event of a category that remora does not know about.
    Other { name: String },
}

impl EventKind {
    /// Return short category name.
    pub fn name(&self) -> &str {
        match self {
            EventKind::VmStart { .. } => "vm-start",
            EventKind::VmDeath => "vm-death",
            EventKind::VmDisconnect => "vm-disconnect",
            EventKind::ThreadStart { .. } => "thread-start",
            EventKind::ThreadDeath { .. } => "thread-death",
            EventKind::ClassPrepare { .. } => "class-prepare",
            EventKind::Step { .. } => "step",
            EventKind::Breakpoint { .. } => "breakpoint",
            EventKind::Exception { .. } => "exception",
            EventKind::MethodEntry { .. } => "method-entry",
            EventKind::MethodExit { .. } => "method-exit",
            EventKind::Other { name } => name,
        }
    }
}

/// Single notification from a target.
#[derive(Debug, Clone, PartialEq)]
pub struct Event {
    /// Request that caused this event, `None` for events that target sends unconditionally
    /// (like vm-death).
    pub request: Option<EventRequestId>,
    pub kind: EventKind,
}

impl Event {
    pub fn new(kind: EventKind) -> Self {
        Self {
            request: None,
            kind,
        }
    }

    pub fn requested(request: EventRequestId, kind: EventKind) -> Self {
        Self {
            request: Some(request),
            kind,
        }
    }

    /// Return a thread in which event occurred.
    pub fn thread(&self) -> Option<ThreadRef> {
        match &self.kind {
            EventKind::VmStart { thread }
            | EventKind::ThreadStart { thread }
            | EventKind::ThreadDeath { thread }
            | EventKind::ClassPrepare { thread, .. }
            | EventKind::Step { thread, .. }
            | EventKind::Breakpoint { thread, .. }
            | EventKind::Exception { thread, .. }
            | EventKind::MethodEntry { thread, .. }
            | EventKind::MethodExit { thread, .. } => Some(*thread),
            EventKind::VmDeath | EventKind::VmDisconnect | EventKind::Other { .. } => None,
        }
    }
}

impl Display for Event {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.kind.name())?;
        if let Some(thread) = self.thread() {
            write!(f, "({thread})")?;
        }
        if let Some(request) = self.request {
            write!(f, " by {request}")?;
        }
        Ok(())
    }
}

/// Which threads a target suspended before delivering an event set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SuspendPolicy {
    None,
    EventThread,
    #[default]
    All,
}

/// Ordered group of causally related events, dispatched and resumed as a unit.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct EventSet {
    pub policy: SuspendPolicy,
    pub events: Vec<Event>,
}

impl EventSet {
    pub fn new(policy: SuspendPolicy, events: Vec<Event>) -> Self {
        Self { policy, events }
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Event> {
        self.events.iter()
    }
}

impl Display for EventSet {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}]", self.events.iter().join(", "))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum ChannelError {
    #[error("event channel disconnected")]
    Disconnected,
    #[error("event channel read interrupted")]
    Interrupted,
}

/// Blocking source of event sets.
///
/// A channel has exactly one reader, the dispatcher takes it by value.
pub trait EventChannel: Send {
    /// Block until the next event set arrives.
    fn next_set(&mut self) -> Result<EventSet, ChannelError>;
}

impl EventChannel for mpsc::Receiver<EventSet> {
    fn next_set(&mut self) -> Result<EventSet, ChannelError> {
        self.recv().map_err(|_| ChannelError::Disconnected)
    }
}

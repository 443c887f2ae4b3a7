use crate::debugger::event::{EventRequestId, Location};
use crate::debugger::remote::ThreadRef;
use indexmap::IndexMap;
use strum_macros::Display;

#[derive(Clone, Copy, PartialEq, Eq, Debug, Display)]
#[strum(serialize_all = "lowercase")]
pub enum ThreadStatus {
    Running,
    Suspended,
    /// A step is requested, thread runs until step completion.
    Stepping,
    Terminated,
}

#[derive(Clone, Copy, PartialEq, Eq, Debug, Display)]
#[strum(serialize_all = "lowercase")]
pub enum StepKind {
    Into,
    Over,
    Out,
}

/// A step operation that waits for completion.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct PendingStep {
    pub kind: StepKind,
    pub request: EventRequestId,
}

/// Model of a target thread.
#[derive(Clone, Debug, PartialEq)]
pub struct Thread {
    /// Thread number in order of appearance, starts from 1.
    pub num: u64,
    pub handle: ThreadRef,
    pub status: ThreadStatus,
    pub pending_step: Option<PendingStep>,
    /// Last known stop location.
    pub location: Option<Location>,
}

impl Thread {
    fn new(num: u64, handle: ThreadRef) -> Self {
        Self {
            num,
            handle,
            status: ThreadStatus::Running,
            pending_step: None,
            location: None,
        }
    }

    pub fn is_suspended(&self) -> bool {
        self.status == ThreadStatus::Suspended
    }

    pub fn is_stepping(&self) -> bool {
        self.pending_step.is_some()
    }

    /// Mark a step operation as started.
    pub fn start_step(&mut self, step: PendingStep) {
        self.pending_step = Some(step);
        self.status = ThreadStatus::Stepping;
    }

    /// Complete a pending step (if any), thread stays suspended at `location`.
    /// Return completed step.
    pub fn handle_step(&mut self, location: Location) -> Option<PendingStep> {
        self.status = ThreadStatus::Suspended;
        self.location = Some(location);
        self.pending_step.take()
    }
}

/// Registry of known target threads.
#[derive(Default)]
pub struct ThreadRegistry {
    in_focus: Option<ThreadRef>,
    state: IndexMap<ThreadRef, Thread>,
    last_thread_num: u64,
}

impl ThreadRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add thread in `running` status. Registration of already known thread is a no-op.
    /// Return thread record.
    pub fn register(&mut self, handle: ThreadRef) -> &Thread {
        let next_num = self.last_thread_num + 1;
        let thread = self
            .state
            .entry(handle)
            .or_insert_with(|| Thread::new(next_num, handle));
        if thread.num == next_num {
            self.last_thread_num = next_num;
        }
        thread
    }

    /// Remove thread from registry, focus is lost if the thread was in focus.
    pub fn remove(&mut self, handle: ThreadRef) -> Option<Thread> {
        if self.in_focus == Some(handle) {
            self.in_focus = None;
        }
        self.state.shift_remove(&handle)
    }

    pub fn get(&self, handle: ThreadRef) -> Option<&Thread> {
        self.state.get(&handle)
    }

    pub fn get_mut(&mut self, handle: ThreadRef) -> Option<&mut Thread> {
        self.state.get_mut(&handle)
    }

    /// Set thread into focus. Return `false` if thread is unknown.
    pub fn set_in_focus(&mut self, handle: ThreadRef) -> bool {
        if self.state.contains_key(&handle) {
            self.in_focus = Some(handle);
            true
        } else {
            false
        }
    }

    /// Return current focused thread.
    pub fn in_focus(&self) -> Option<ThreadRef> {
        self.in_focus
    }

    /// Set status for all threads except stepping ones.
    pub fn set_status_all(&mut self, status: ThreadStatus) {
        self.state
            .values_mut()
            .filter(|t| t.pending_step.is_none())
            .for_each(|t| t.status = status);
    }

    /// Return first suspended thread in order of appearance.
    pub fn first_suspended(&self) -> Option<ThreadRef> {
        self.state
            .values()
            .find(|t| t.is_suspended())
            .map(|t| t.handle)
    }

    /// Remove all threads, return removed threads.
    pub fn clear(&mut self) -> Vec<Thread> {
        self.in_focus = None;
        self.state.drain(..).map(|(_, t)| t).collect()
    }

    pub fn len(&self) -> usize {
        self.state.len()
    }

    pub fn is_empty(&self) -> bool {
        self.state.is_empty()
    }

    pub fn snapshot(&self) -> Vec<Thread> {
        self.state.values().cloned().collect()
    }
}

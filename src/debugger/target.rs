use crate::debugger::error::Error;
use crate::debugger::event::Location;
use crate::debugger::remote::{RemoteProcess, ThreadRef, TypeRef};
use crate::debugger::thread::{PendingStep, StepKind, Thread, ThreadRegistry, ThreadStatus};
use crate::log::{default_reporter, Reporter};
use log::debug;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use strum_macros::Display;

/// Presentation layer notifications about target model changes.
///
/// Hooks are called from the dispatcher worker while a batch of events is applied to the model.
pub trait TargetHook: Send + Sync {
    /// Called when target reports its start.
    fn on_start(&self, _thread: ThreadRef) -> anyhow::Result<()> {
        Ok(())
    }

    fn on_thread_start(&self, _thread: &Thread) -> anyhow::Result<()> {
        Ok(())
    }

    fn on_thread_death(&self, _thread: &Thread) -> anyhow::Result<()> {
        Ok(())
    }

    /// Called when a new type is loaded and prepared in target.
    fn on_class_prepare(&self, _type_ref: TypeRef, _name: &str) -> anyhow::Result<()> {
        Ok(())
    }

    /// Called when a step completed, thread is suspended.
    fn on_step(&self, _thread: &Thread) -> anyhow::Result<()> {
        Ok(())
    }

    fn on_exit(&self) {}

    fn on_disconnect(&self) {}
}

/// Hook that ignores all notifications.
#[derive(Default, Clone, Copy)]
pub struct NopHook;

impl TargetHook for NopHook {}

#[derive(Clone, Copy, PartialEq, Eq, Debug, Display)]
#[strum(serialize_all = "lowercase")]
pub enum TargetStatus {
    /// Target start is not reported yet.
    NotStarted,
    Running,
    Suspended,
    Terminated,
    Disconnected,
}

/// Type loaded by a target since the start of debugging.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PreparedType {
    pub type_ref: TypeRef,
    pub name: String,
    pub thread: ThreadRef,
}

/// Target builder.
pub struct DebugTargetBuilder {
    name: String,
    remote: Arc<dyn RemoteProcess>,
    hook: Arc<dyn TargetHook>,
    reporter: Arc<dyn Reporter>,
}

impl DebugTargetBuilder {
    /// Set presentation layer hook.
    pub fn with_hook(self, hook: impl TargetHook + 'static) -> Self {
        Self {
            hook: Arc::new(hook),
            ..self
        }
    }

    /// Set error reporter.
    pub fn with_reporter(self, reporter: Arc<dyn Reporter>) -> Self {
        Self { reporter, ..self }
    }

    pub fn build(self) -> Arc<DebugTarget> {
        Arc::new(DebugTarget {
            name: self.name,
            remote: self.remote,
            hook: self.hook,
            reporter: self.reporter,
            domain: Mutex::new(()),
            status: Mutex::new(TargetStatus::NotStarted),
            threads: Mutex::new(ThreadRegistry::new()),
            prepared: Mutex::new(vec![]),
        })
    }
}

/// Model of a single target process.
///
/// Structural mutations (dispatch of an event set and control operations) are serialized
/// by the mutation domain, see [`DebugTarget::exclusive`]. Readers (like the interpreter)
/// observe model state through short living locks and never wait for a whole batch.
pub struct DebugTarget {
    name: String,
    remote: Arc<dyn RemoteProcess>,
    hook: Arc<dyn TargetHook>,
    reporter: Arc<dyn Reporter>,

    domain: Mutex<()>,
    status: Mutex<TargetStatus>,
    threads: Mutex<ThreadRegistry>,
    prepared: Mutex<Vec<PreparedType>>,
}

impl DebugTarget {
    pub fn builder(name: impl Into<String>, remote: Arc<dyn RemoteProcess>) -> DebugTargetBuilder {
        DebugTargetBuilder {
            name: name.into(),
            remote,
            hook: Arc::new(NopHook),
            reporter: default_reporter(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn remote(&self) -> &dyn RemoteProcess {
        self.remote.as_ref()
    }

    pub fn reporter(&self) -> Arc<dyn Reporter> {
        self.reporter.clone()
    }

    /// Enter the mutation domain. Guard must be held for the whole structural mutation.
    ///
    /// Domain is not reentrant: control operations of this type enter it themselves
    /// and must not be called from an event listener.
    /// Domain guards no data, so a guard poisoned by a panicked holder is taken as is.
    pub fn lock_domain(&self) -> MutexGuard<'_, ()> {
        self.domain.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Run a closure inside the mutation domain.
    pub fn exclusive<T>(&self, f: impl FnOnce(&Self) -> T) -> T {
        let _guard = self.lock_domain();
        f(self)
    }

    pub fn status(&self) -> TargetStatus {
        *self.status.lock().unwrap()
    }

    fn set_status(&self, status: TargetStatus) {
        debug!(target: "target", "{} status: {status}", self.name);
        *self.status.lock().unwrap() = status;
    }

    pub fn is_suspended(&self) -> bool {
        self.status() == TargetStatus::Suspended
    }

    pub fn is_terminated(&self) -> bool {
        matches!(
            self.status(),
            TargetStatus::Terminated | TargetStatus::Disconnected
        )
    }

    /// Find model thread by a target thread handle.
    pub fn find_thread(&self, handle: ThreadRef) -> Option<Thread> {
        self.threads.lock().unwrap().get(handle).cloned()
    }

    pub fn threads(&self) -> Vec<Thread> {
        self.threads.lock().unwrap().snapshot()
    }

    /// Return types prepared since the start of debugging.
    pub fn prepared_types(&self) -> Vec<PreparedType> {
        self.prepared.lock().unwrap().clone()
    }

    /// Return a thread for evaluation: thread in focus if it is suspended,
    /// first suspended thread otherwise.
    pub fn current_thread(&self) -> Option<ThreadRef> {
        let threads = self.threads.lock().unwrap();
        threads
            .in_focus()
            .filter(|&t| threads.get(t).map(Thread::is_suspended).unwrap_or(false))
            .or_else(|| threads.first_suspended())
    }

    /// Set thread into focus.
    pub fn set_focus(&self, handle: ThreadRef) -> Result<(), Error> {
        if self.threads.lock().unwrap().set_in_focus(handle) {
            Ok(())
        } else {
            Err(Error::ThreadNotFound(handle))
        }
    }

    fn report_hook_error(&self, result: anyhow::Result<()>) {
        if let Err(e) = result {
            self.reporter.report_error("target", &Error::Hook(e));
        }
    }

    // --------------------------------- event handlers --------------------------------------------
    // called by the dispatcher inside the mutation domain

    pub fn handle_vm_start(&self, thread: ThreadRef) -> Result<(), Error> {
        let existing = self.remote.threads()?;
        {
            let mut threads = self.threads.lock().unwrap();
            for handle in existing.into_iter().chain(std::iter::once(thread)) {
                threads.register(handle);
            }
            // target is suspended until the controller resumes it
            threads.set_status_all(ThreadStatus::Suspended);
            threads.set_in_focus(thread);
        }
        self.set_status(TargetStatus::Suspended);
        self.report_hook_error(self.hook.on_start(thread));
        Ok(())
    }

    pub fn handle_vm_death(&self) {
        self.terminate_model(TargetStatus::Terminated);
        self.hook.on_exit();
    }

    pub fn handle_vm_disconnect(&self) {
        self.terminate_model(TargetStatus::Disconnected);
        self.hook.on_disconnect();
    }

    fn terminate_model(&self, status: TargetStatus) {
        let threads = self.threads.lock().unwrap().clear();
        debug!(target: "target", "{} {status}, {} threads released", self.name, threads.len());
        self.set_status(status);
    }

    pub fn handle_thread_start(&self, handle: ThreadRef) {
        let thread = self.threads.lock().unwrap().register(handle).clone();
        debug!(target: "target", "thread {} started (num {})", handle, thread.num);
        self.report_hook_error(self.hook.on_thread_start(&thread));
    }

    pub fn handle_thread_death(&self, handle: ThreadRef) {
        let thread = self.threads.lock().unwrap().remove(handle);
        match thread {
            Some(mut thread) => {
                thread.status = ThreadStatus::Terminated;
                debug!(target: "target", "thread {} died (num {})", handle, thread.num);
                self.report_hook_error(self.hook.on_thread_death(&thread));
            }
            None => debug!(target: "target", "death of unknown thread {handle}"),
        }
    }

    pub fn handle_class_load(&self, thread: ThreadRef, type_ref: TypeRef, name: &str) {
        debug!(target: "target", "type {name} ({type_ref}) prepared");
        self.prepared.lock().unwrap().push(PreparedType {
            type_ref,
            name: name.to_string(),
            thread,
        });
        self.report_hook_error(self.hook.on_class_prepare(type_ref, name));
    }

    /// Complete a step of a known thread, thread stays suspended and gets focus.
    pub fn handle_step(&self, handle: ThreadRef, location: Location) -> Result<(), Error> {
        let (thread, completed) = {
            let mut threads = self.threads.lock().unwrap();
            let thread = threads
                .get_mut(handle)
                .ok_or(Error::ThreadNotFound(handle))?;
            let completed = thread.handle_step(location);
            let thread = thread.clone();
            threads.set_in_focus(handle);
            (thread, completed)
        };

        if let Some(step) = completed {
            self.remote.delete_request(step.request)?;
        }
        self.report_hook_error(self.hook.on_step(&thread));
        Ok(())
    }

    /// Resume a single thread.
    pub fn resume_thread(&self, handle: ThreadRef) -> Result<(), Error> {
        self.remote.resume(handle)?;
        if let Some(thread) = self.threads.lock().unwrap().get_mut(handle) {
            if thread.pending_step.is_none() {
                thread.status = ThreadStatus::Running;
            }
        }
        Ok(())
    }

    // --------------------------------- control operations ----------------------------------------
    // issued by surrounding system, each one enters the mutation domain

    fn ensure_alive(&self) -> Result<(), Error> {
        if self.is_terminated() {
            return Err(Error::TargetTerminated);
        }
        Ok(())
    }

    /// Resume all target threads.
    pub fn resume(&self) -> Result<(), Error> {
        let _guard = self.lock_domain();
        self.ensure_alive()?;
        self.remote.resume_all()?;
        self.threads
            .lock()
            .unwrap()
            .set_status_all(ThreadStatus::Running);
        self.set_status(TargetStatus::Running);
        Ok(())
    }

    /// Suspend all target threads.
    pub fn suspend(&self) -> Result<(), Error> {
        let _guard = self.lock_domain();
        self.ensure_alive()?;
        self.remote.suspend_all()?;
        self.threads
            .lock()
            .unwrap()
            .set_status_all(ThreadStatus::Suspended);
        self.set_status(TargetStatus::Suspended);
        Ok(())
    }

    /// Start a step in a suspended thread. Step completes asynchronously with a step event.
    pub fn step(&self, handle: ThreadRef, kind: StepKind) -> Result<(), Error> {
        let _guard = self.lock_domain();
        self.ensure_alive()?;

        match self.find_thread(handle) {
            None => return Err(Error::ThreadNotFound(handle)),
            Some(thread) if thread.is_stepping() => return Err(Error::AlreadyStepping(handle)),
            Some(_) => {}
        }

        let request = self.remote.request_step(handle, kind)?;
        if let Some(thread) = self.threads.lock().unwrap().get_mut(handle) {
            thread.start_step(PendingStep { kind, request });
        }
        debug!(target: "target", "step {kind} in {handle} by {request}");

        if let Err(e) = self.remote.resume(handle) {
            if let Some(thread) = self.threads.lock().unwrap().get_mut(handle) {
                thread.pending_step = None;
                thread.status = ThreadStatus::Suspended;
            }
            crate::weak_error!(self.remote.delete_request(request), "step rollback:");
            return Err(e.into());
        }
        self.set_status(TargetStatus::Running);
        Ok(())
    }

    /// Terminate target process.
    pub fn terminate(&self, exit_code: i32) -> Result<(), Error> {
        let _guard = self.lock_domain();
        self.ensure_alive()?;
        self.remote.terminate(exit_code)?;
        Ok(())
    }
}

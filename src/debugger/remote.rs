//! Remote process facade.
//!
//! The facade is an interface to the transport that serializes single requests to a target
//! process and deserializes replies. Remora never implements the wire protocol itself,
//! it only consumes this contract.

use crate::debugger::event::{EventRequestId, EventSet};
use crate::debugger::thread::StepKind;
use crate::debugger::value::Value;
use std::fmt::{Display, Formatter};

macro_rules! handle {
    ($name: ident, $prefix: literal) => {
        /// Opaque handle into a target process.
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
        pub struct $name(pub u64);

        impl Display for $name {
            fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
                write!(f, concat!($prefix, "#{}"), self.0)
            }
        }
    };
}

handle!(ObjectRef, "object");
handle!(TypeRef, "type");
handle!(ThreadRef, "thread");

/// Category of a loaded type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TypeCategory {
    Class,
    Interface,
    Array,
    Primitive,
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum RemoteError {
    /// An application exception was raised inside the target during an invocation.
    #[error("exception `{exception_type}` ({exception}) raised in target")]
    Invocation {
        exception: ObjectRef,
        exception_type: String,
    },
    #[error("target disconnected")]
    Disconnected,
    #[error("invalid handle: {0}")]
    InvalidHandle(String),
    #[error("operation `{0}` not supported by target")]
    NotSupported(&'static str),
    #[error("thread {0} is not suspended")]
    ThreadNotSuspended(ThreadRef),
    #[error("protocol error: {0}")]
    Protocol(String),
}

impl RemoteError {
    /// True if connection with target is lost, no further requests are possible.
    pub fn is_disconnect(&self) -> bool {
        matches!(self, RemoteError::Disconnected)
    }

    /// True if error is an application exception of a given type.
    pub fn is_exception_of(&self, type_name: &str) -> bool {
        matches!(self, RemoteError::Invocation { exception_type, .. } if exception_type == type_name)
    }
}

/// Typed client of a target process.
///
/// Every call is synchronous and may cause the target to run (for example, an invocation),
/// so events produced by a call are delivered through the event channel concurrently.
pub trait RemoteProcess: Send + Sync {
    // --------------------------------- types -----------------------------------------------------

    /// Return all loaded types with a qualified name, there may be more than one type
    /// with the same name loaded by different class loaders.
    fn all_types(&self, name: &str) -> Result<Vec<TypeRef>, RemoteError>;

    fn type_category(&self, ty: TypeRef) -> Result<TypeCategory, RemoteError>;

    /// Return an object that represents the type in the target.
    /// `None` for types that are not classes or interfaces.
    fn class_object(&self, ty: TypeRef) -> Result<Option<ObjectRef>, RemoteError>;

    /// Return a runtime type of an object.
    fn type_of(&self, object: ObjectRef) -> Result<TypeRef, RemoteError>;

    /// True if values of type `from` can be assigned to variables of type `to`.
    fn is_assignable(&self, from: TypeRef, to: TypeRef) -> Result<bool, RemoteError>;

    // --------------------------------- invocations -----------------------------------------------

    fn invoke_static(
        &self,
        ty: TypeRef,
        method: &str,
        signature: &str,
        args: &[Value],
        thread: ThreadRef,
    ) -> Result<Value, RemoteError>;

    /// Invoke an instance method, `non_virtual` disables virtual lookup (`super` calls).
    fn invoke_method(
        &self,
        receiver: ObjectRef,
        method: &str,
        signature: &str,
        args: &[Value],
        thread: ThreadRef,
        non_virtual: bool,
    ) -> Result<Value, RemoteError>;

    fn new_instance(
        &self,
        ty: TypeRef,
        signature: &str,
        args: &[Value],
        thread: ThreadRef,
    ) -> Result<Value, RemoteError>;

    // --------------------------------- values ----------------------------------------------------

    /// Create a string in the target.
    fn new_string(&self, value: &str) -> Result<Value, RemoteError>;

    /// Read a content of target string.
    fn string_value(&self, string: ObjectRef) -> Result<String, RemoteError>;

    fn new_array(&self, array_type: TypeRef, length: i32) -> Result<Value, RemoteError>;

    fn array_length(&self, array: ObjectRef) -> Result<i32, RemoteError>;

    fn array_element(&self, array: ObjectRef, index: i32) -> Result<Value, RemoteError>;

    fn set_array_element(
        &self,
        array: ObjectRef,
        index: i32,
        value: Value,
    ) -> Result<(), RemoteError>;

    // --------------------------------- variables -------------------------------------------------

    fn field_value(&self, object: ObjectRef, name: &str) -> Result<Value, RemoteError>;

    fn set_field_value(&self, object: ObjectRef, name: &str, value: Value)
        -> Result<(), RemoteError>;

    fn static_field_value(&self, ty: TypeRef, name: &str) -> Result<Value, RemoteError>;

    fn set_static_field_value(
        &self,
        ty: TypeRef,
        name: &str,
        value: Value,
    ) -> Result<(), RemoteError>;

    /// Read local variable visible in a frame of a suspended thread.
    fn local_value(&self, thread: ThreadRef, frame: usize, name: &str)
        -> Result<Value, RemoteError>;

    fn set_local_value(
        &self,
        thread: ThreadRef,
        frame: usize,
        name: &str,
        value: Value,
    ) -> Result<(), RemoteError>;

    /// Return receiver of a frame method, `null` for static frames.
    fn this_object(&self, thread: ThreadRef, frame: usize) -> Result<Value, RemoteError>;

    // --------------------------------- execution control -----------------------------------------

    fn threads(&self) -> Result<Vec<ThreadRef>, RemoteError>;

    fn suspend(&self, thread: ThreadRef) -> Result<(), RemoteError>;

    fn resume(&self, thread: ThreadRef) -> Result<(), RemoteError>;

    fn suspend_all(&self) -> Result<(), RemoteError>;

    fn resume_all(&self) -> Result<(), RemoteError>;

    /// Resume threads suspended by delivering an event set (according to its suspend policy).
    fn resume_set(&self, set: &EventSet) -> Result<(), RemoteError>;

    /// Create a request for a step in a thread, returns a subscription token of the request.
    fn request_step(&self, thread: ThreadRef, kind: StepKind)
        -> Result<EventRequestId, RemoteError>;

    /// Delete a standing event request.
    fn delete_request(&self, request: EventRequestId) -> Result<(), RemoteError>;

    fn terminate(&self, exit_code: i32) -> Result<(), RemoteError>;
}

pub mod dispatcher;
pub mod error;
pub mod eval;
pub mod event;
pub mod remote;
pub mod target;
pub mod thread;
pub mod value;

pub use dispatcher::{
    DispatchOutcome, DispatcherHandle, DispatcherState, EventDispatcher, EventListener,
    ListenerRegistry,
};
pub use error::Error;
pub use eval::{EvalContext, EvalOutcome, Interpreter, StopHandle};
pub use event::{
    ChannelError, Event, EventChannel, EventKind, EventRequestId, EventSet, Location,
    SuspendPolicy,
};
pub use remote::{ObjectRef, RemoteError, RemoteProcess, ThreadRef, TypeCategory, TypeRef};
pub use target::{DebugTarget, NopHook, PreparedType, TargetHook, TargetStatus};
pub use thread::{StepKind, Thread, ThreadStatus};
pub use value::{promote, unary_promote, TypeKind, Value};

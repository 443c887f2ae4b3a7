use crate::debugger::eval::{BinaryOp, UnaryOp};
use crate::debugger::event::{ChannelError, EventRequestId};
use crate::debugger::remote::{RemoteError, ThreadRef};
use crate::debugger::value::TypeKind;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    // --------------------------------- generic errors --------------------------------------------
    #[error(transparent)]
    IO(#[from] std::io::Error),
    #[error("configuration: {0}")]
    Config(#[from] toml::de::Error),

    // --------------------------------- remote errors ---------------------------------------------
    #[error("remote call: {0}")]
    Remote(#[from] RemoteError),
    #[error(transparent)]
    Channel(#[from] ChannelError),

    // --------------------------------- target model errors ---------------------------------------
    #[error("no suspended thread for evaluation")]
    NoCurrentThread,
    #[error("thread {0} not found")]
    ThreadNotFound(ThreadRef),
    #[error("thread {0} is already stepping")]
    AlreadyStepping(ThreadRef),
    #[error("target is terminated or disconnected")]
    TargetTerminated,

    // --------------------------------- evaluation errors -----------------------------------------
    #[error("unable to resolve type `{0}`")]
    UnresolvableType(String),
    #[error("operator `{op}` can not be applied to `{left}` and `{right}`")]
    IllegalPromotion {
        op: BinaryOp,
        left: TypeKind,
        right: TypeKind,
    },
    #[error("operator `{op}` can not be applied to `{kind}`")]
    IllegalUnaryOperand { op: UnaryOp, kind: TypeKind },
    #[error("can not cast `{from}` to `{to}`")]
    InvalidCast { from: TypeKind, to: String },
    #[error("division by zero")]
    DivisionByZero,
    #[error("evaluation stack underflow")]
    StackUnderflow,
    #[error("invalid operand: {0}")]
    InvalidOperand(&'static str),
    #[error("null receiver")]
    NullReceiver,
    #[error("internal variable `{0}` not found")]
    InternalVariableNotFound(String),
    #[error("internal variable `{0}` already exists")]
    InternalVariableExists(String),
    #[error("jump to instruction {0} is out of program")]
    JumpOutOfRange(isize),

    // --------------------------------- third party errors ----------------------------------------
    #[error("listener of {0} panicked")]
    ListenerPanicked(EventRequestId),
    #[error("hook: {0}")]
    Hook(anyhow::Error),
}

impl Error {
    /// Return a hint to the dispatcher - continue reading events after error or stop.
    pub fn is_fatal(&self) -> bool {
        match self {
            Error::Remote(e) => e.is_disconnect(),
            Error::Channel(_) => true,
            Error::TargetTerminated => true,

            Error::IO(_) => false,
            Error::Config(_) => false,
            Error::NoCurrentThread => false,
            Error::ThreadNotFound(_) => false,
            Error::AlreadyStepping(_) => false,
            Error::UnresolvableType(_) => false,
            Error::IllegalPromotion { .. } => false,
            Error::IllegalUnaryOperand { .. } => false,
            Error::InvalidCast { .. } => false,
            Error::DivisionByZero => false,
            Error::StackUnderflow => false,
            Error::InvalidOperand(_) => false,
            Error::NullReceiver => false,
            Error::InternalVariableNotFound(_) => false,
            Error::InternalVariableExists(_) => false,
            Error::JumpOutOfRange(_) => false,
            Error::ListenerPanicked(_) => false,
            Error::Hook(_) => false,
        }
    }
}

#[macro_export]
macro_rules! _error {
    ($log_fn: path, $res: expr) => {
        match $res {
            Ok(value) => Some(value),
            Err(e) => {
                $log_fn!(target: "remora", "{:#}", e);
                None
            }
        }
    };
    ($log_fn: path, $res: expr, $msg: tt) => {
        match $res {
            Ok(value) => Some(value),
            Err(e) => {
                $log_fn!(target: "remora", concat!($msg, " {:#}"), e);
                None
            }
        }
    };
}

/// Transforms `Result` into `Option` and logs an error if it occurs.
#[macro_export]
macro_rules! weak_error {
    ($res: expr) => {
        $crate::_error!(log::warn, $res)
    };
    ($res: expr, $msg: tt) => {
        $crate::_error!(log::warn, $res, $msg)
    };
}

/// Transforms `Result` into `Option` and put error into debug logs if it occurs.
#[macro_export]
macro_rules! muted_error {
    ($res: expr) => {
        $crate::_error!(log::debug, $res)
    };
    ($res: expr, $msg: tt) => {
        $crate::_error!(log::debug, $res, $msg)
    };
}

//! Remora observes and drives an already running debug target.
//!
//! Two engines live in [`debugger`]:
//! - [`debugger::EventDispatcher`] drains the target event channel and routes every event
//!   either to a registered listener or to the [`debugger::DebugTarget`] model,
//! - [`debugger::eval::Interpreter`] executes a compiled instruction sequence against a
//!   suspended target thread.

pub mod config;
pub mod debugger;
pub mod log;

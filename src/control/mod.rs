// src/control/mod.rs

//! Reactive execution of a job.
//!
//! - [`agent`] is one worker: its queue, the task it is executing and the
//!   tasks it has declined.
//! - [`core`] is the synchronous tick loop that polls the workers, hands out
//!   tasks, reassigns declined ones and lets an idle worker take over the
//!   coworker's tasks when that shortens the plan.
//! - [`runtime`] is the async shell (blocking thread, Ctrl-C, artifact IO).

pub mod agent;
pub mod core;
pub mod runtime;

pub use agent::{Agent, Selection};
pub use core::{ControlLoop, TickEvent, TickReport};
pub use runtime::Runtime;

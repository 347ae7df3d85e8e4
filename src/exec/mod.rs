// src/exec/mod.rs

//! Process execution layer.
//!
//! Everything that touches an OS process lives here; the queue logic above it
//! only sees [`ProcessHandle`]s and drained log text.
//!
//! - [`invocation`] resolves a task into the commandlet command line.
//! - [`launcher`] provides the `ProcessLauncher` trait, the production
//!   `CommandletLauncher`, and [`launch`] which spawns a child whose stdout
//!   and stderr share one pipe.
//! - [`log_pump`] owns the background task that moves raw output chunks into
//!   the shared [`PendingLog`].
//! - [`process`] wraps the child and its pump in a [`ProcessHandle`].

pub mod invocation;
pub mod launcher;
pub mod log_pump;
pub mod process;

pub use invocation::{Invocation, InvocationBuilder, InvocationKind};
pub use launcher::{launch, CommandletLauncher, ProcessLauncher};
pub use log_pump::{spawn_log_pump, PendingLog, PumpSummary};
pub use process::{ProcessExit, ProcessHandle};

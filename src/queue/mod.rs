// src/queue/mod.rs

//! Task queue: descriptors, per-task run records and the sequencer.
//!
//! - [`task`] holds the immutable [`Task`] descriptor and the mutable
//!   [`TaskRun`] record.
//! - [`sequencer`] is the synchronous state machine that walks the queue
//!   with halt-on-failure semantics.

pub mod sequencer;
pub mod task;

pub use sequencer::{Sequencer, SequencerCommand};
pub use task::{Task, TaskFailure, TaskRun};

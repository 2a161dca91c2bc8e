//! Run-soon scheduling for watchtree.
//!
//! Provides [`TaskQueue`], an implementation of the
//! [`Scheduler`](watchtree_core::Scheduler) trait with the semantics of a
//! host "set immediate" primitive, and [`EventLoop`], the single-threaded
//! driver that runs queued tasks in turns.
//!
//! # Turns
//!
//! A turn runs every task that was queued when the turn started, in
//! FIFO order. Tasks scheduled during a turn run in a later turn, so a
//! task that reschedules itself (the reconciliation loop does exactly
//! that) never recurses and never starves the turn boundary.

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

pub mod config;
pub mod event_loop;
pub mod queue;

pub use config::{ConfigError, LoopConfig};
pub use event_loop::{EventLoop, RunSummary, TurnReport};
pub use queue::{RunOutcome, TaskQueue};

//! Seams between the engine, its callers, and the host scheduler.

use crate::event::ChangeEvent;
use crate::id::TaskHandle;

/// Receives change events.
///
/// Called synchronously: updated events fire inside the `set` call that
/// caused them, new/delete events fire inside a reconciliation tick.
/// Implemented for every `Fn(&ChangeEvent)` closure.
pub trait Observer {
    /// Handle one change.
    fn on_change(&self, event: &ChangeEvent);
}

impl<F> Observer for F
where
    F: Fn(&ChangeEvent),
{
    fn on_change(&self, event: &ChangeEvent) {
        self(event)
    }
}

/// A unit of deferred work.
pub type Task = Box<dyn FnOnce()>;

/// "Run this soon, asynchronously, exactly once."
///
/// Implementations must run tasks in FIFO order of scheduling, never
/// run a task from inside `schedule`, and never run a cancelled task.
pub trait Scheduler {
    /// Queue `task` and return a handle that can cancel it.
    fn schedule(&self, task: Task) -> TaskHandle;

    /// Cancel a queued task. Returns `true` if the task was still pending.
    fn cancel(&self, handle: TaskHandle) -> bool;
}

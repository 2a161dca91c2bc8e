//! Handle-addressed FIFO task queue.
//!
//! [`TaskQueue`] stores each scheduled task under a fresh handle and
//! posts the handle to an unbounded crossbeam channel. The event loop
//! pulls handles off the channel and calls
//! [`run_if_present`](TaskQueue::run_if_present): a task runs only if
//! its handle is still in the table, so cancelling is just removing the
//! table entry. The stale handle drains harmlessly later.

use std::cell::{Cell, RefCell};

use crossbeam_channel::{Receiver, Sender};
use indexmap::IndexMap;
use tracing::trace;

use watchtree_core::{Scheduler, Task, TaskHandle};

/// What happened when a posted handle was processed.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RunOutcome {
    /// The task ran to completion.
    Ran,
    /// The handle had been cancelled (or already ran).
    Skipped,
    /// Another task was running; the handle was re-posted.
    Deferred,
}

/// Resets the running flag even if a task panics.
struct RunningGuard<'a>(&'a Cell<bool>);

impl Drop for RunningGuard<'_> {
    fn drop(&mut self) {
        self.0.set(false);
    }
}

/// FIFO run-soon queue implementing [`Scheduler`].
///
/// Single-threaded: tasks are `!Send` closures and the queue is meant to
/// be shared through an `Rc`.
pub struct TaskQueue {
    tasks: RefCell<IndexMap<TaskHandle, Task>>,
    next_handle: Cell<u64>,
    tx: Sender<TaskHandle>,
    rx: Receiver<TaskHandle>,
    running: Cell<bool>,
}

impl TaskQueue {
    /// Create an empty queue. The first handle issued is `TaskHandle(1)`.
    pub fn new() -> Self {
        let (tx, rx) = crossbeam_channel::unbounded();
        Self {
            tasks: RefCell::new(IndexMap::new()),
            next_handle: Cell::new(1),
            tx,
            rx,
            running: Cell::new(false),
        }
    }

    /// Number of tasks scheduled and neither run nor cancelled.
    pub fn pending(&self) -> usize {
        self.tasks.borrow().len()
    }

    /// Number of handles waiting on the channel, cancelled ones included.
    pub fn posted(&self) -> usize {
        self.rx.len()
    }

    /// Returns `true` while a task is executing.
    pub fn is_running(&self) -> bool {
        self.running.get()
    }

    /// Pop the oldest posted handle, if any.
    pub(crate) fn next_posted(&self) -> Option<TaskHandle> {
        self.rx.try_recv().ok()
    }

    /// Run the task behind `handle` if it is still scheduled.
    ///
    /// If another task is currently running (a task drove the queue
    /// from inside itself), the handle is posted again instead so tasks
    /// never nest.
    pub fn run_if_present(&self, handle: TaskHandle) -> RunOutcome {
        if self.running.get() {
            self.post(handle);
            return RunOutcome::Deferred;
        }

        // Release the table borrow before running: tasks schedule more tasks.
        let task = self.tasks.borrow_mut().shift_remove(&handle);
        match task {
            Some(task) => {
                self.running.set(true);
                let _guard = RunningGuard(&self.running);
                trace!(handle = handle.0, "running task");
                task();
                RunOutcome::Ran
            }
            None => RunOutcome::Skipped,
        }
    }

    fn post(&self, handle: TaskHandle) {
        // Both channel ends live in self, so the send cannot fail.
        let _ = self.tx.send(handle);
    }
}

impl Default for TaskQueue {
    fn default() -> Self {
        Self::new()
    }
}

impl Scheduler for TaskQueue {
    fn schedule(&self, task: Task) -> TaskHandle {
        let handle = TaskHandle(self.next_handle.get());
        self.next_handle.set(handle.0 + 1);
        self.tasks.borrow_mut().insert(handle, task);
        self.post(handle);
        handle
    }

    fn cancel(&self, handle: TaskHandle) -> bool {
        self.tasks.borrow_mut().shift_remove(&handle).is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::rc::Rc;

    fn drain(queue: &TaskQueue) -> Vec<RunOutcome> {
        let mut out = Vec::new();
        while let Some(h) = queue.next_posted() {
            out.push(queue.run_if_present(h));
        }
        out
    }

    #[test]
    fn handles_start_at_one_and_increase() {
        let q = TaskQueue::new();
        assert_eq!(q.schedule(Box::new(|| {})), TaskHandle(1));
        assert_eq!(q.schedule(Box::new(|| {})), TaskHandle(2));
        assert_eq!(q.pending(), 2);
        assert_eq!(q.posted(), 2);
    }

    #[test]
    fn schedule_never_runs_inline() {
        let q = TaskQueue::new();
        let ran = Rc::new(Cell::new(false));
        let r = Rc::clone(&ran);
        q.schedule(Box::new(move || r.set(true)));
        assert!(!ran.get());
        drain(&q);
        assert!(ran.get());
    }

    #[test]
    fn runs_in_fifo_order() {
        let q = TaskQueue::new();
        let log = Rc::new(RefCell::new(Vec::new()));
        for i in 0..5 {
            let log = Rc::clone(&log);
            q.schedule(Box::new(move || log.borrow_mut().push(i)));
        }
        drain(&q);
        assert_eq!(*log.borrow(), vec![0, 1, 2, 3, 4]);
    }

    #[test]
    fn cancelled_task_is_skipped() {
        let q = TaskQueue::new();
        let ran = Rc::new(Cell::new(0));
        let r = Rc::clone(&ran);
        let h = q.schedule(Box::new(move || r.set(r.get() + 1)));
        assert!(q.cancel(h));
        assert!(!q.cancel(h));
        assert_eq!(q.pending(), 0);
        assert_eq!(drain(&q), vec![RunOutcome::Skipped]);
        assert_eq!(ran.get(), 0);
    }

    #[test]
    fn task_runs_exactly_once() {
        let q = TaskQueue::new();
        let count = Rc::new(Cell::new(0));
        let c = Rc::clone(&count);
        let h = q.schedule(Box::new(move || c.set(c.get() + 1)));
        assert_eq!(q.run_if_present(h), RunOutcome::Ran);
        assert_eq!(q.run_if_present(h), RunOutcome::Skipped);
        assert_eq!(count.get(), 1);
    }

    #[test]
    fn nested_run_is_deferred() {
        let q = Rc::new(TaskQueue::new());
        let inner_ran = Rc::new(Cell::new(false));

        let flag = Rc::clone(&inner_ran);
        let inner = q.schedule(Box::new(move || flag.set(true)));
        // Discard the inner handle's first posting; the outer task drives it.
        assert_eq!(q.next_posted(), Some(inner));

        let nested = Rc::clone(&q);
        let outer = q.schedule(Box::new(move || {
            assert_eq!(nested.run_if_present(inner), RunOutcome::Deferred);
        }));
        assert_eq!(q.next_posted(), Some(outer));
        assert_eq!(q.run_if_present(outer), RunOutcome::Ran);
        assert!(!inner_ran.get());
        assert!(!q.is_running());

        assert_eq!(drain(&q), vec![RunOutcome::Ran]);
        assert!(inner_ran.get());
    }

    #[test]
    fn task_may_schedule_more_tasks() {
        let q = Rc::new(TaskQueue::new());
        let log = Rc::new(RefCell::new(Vec::new()));
        let (q2, log2) = (Rc::clone(&q), Rc::clone(&log));
        q.schedule(Box::new(move || {
            log2.borrow_mut().push("first");
            let log3 = Rc::clone(&log2);
            q2.schedule(Box::new(move || log3.borrow_mut().push("second")));
        }));
        drain(&q);
        assert_eq!(*log.borrow(), vec!["first", "second"]);
    }
}

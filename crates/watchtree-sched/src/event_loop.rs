//! Single-threaded event loop driving a [`TaskQueue`].
//!
//! The loop owns the queue and hands out `Rc<dyn Scheduler>` handles to
//! whoever needs to schedule work (observation sessions, user code).
//! [`turn()`](EventLoop::turn) is the unit of progress; the `run_*`
//! helpers are thin loops over it.

use std::rc::Rc;
use std::time::{Duration, Instant};

use tracing::{debug, trace};

use watchtree_core::Scheduler;

use crate::config::{ConfigError, LoopConfig};
use crate::queue::{RunOutcome, TaskQueue};

// ── TurnReport ───────────────────────────────────────────────────

/// Counts from one or more turns.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct TurnReport {
    /// Tasks that ran.
    pub ran: usize,
    /// Handles whose task had been cancelled.
    pub skipped: usize,
    /// Handles re-posted because a task was already running.
    pub deferred: usize,
}

impl TurnReport {
    fn record(&mut self, outcome: RunOutcome) {
        match outcome {
            RunOutcome::Ran => self.ran += 1,
            RunOutcome::Skipped => self.skipped += 1,
            RunOutcome::Deferred => self.deferred += 1,
        }
    }

    fn merge(&mut self, other: TurnReport) {
        self.ran += other.ran;
        self.skipped += other.skipped;
        self.deferred += other.deferred;
    }
}

/// Result of a multi-turn run.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct RunSummary {
    /// Turns executed.
    pub turns: u64,
    /// Totals over all turns.
    pub report: TurnReport,
    /// `true` if the run ended because nothing was left to do.
    pub idle: bool,
}

// ── EventLoop ────────────────────────────────────────────────────

/// Drives scheduled tasks in FIFO turns on the current thread.
pub struct EventLoop {
    queue: Rc<TaskQueue>,
    config: LoopConfig,
    turns: u64,
}

impl EventLoop {
    /// Create a loop with a validated configuration.
    pub fn new(config: LoopConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self {
            queue: Rc::new(TaskQueue::new()),
            config,
            turns: 0,
        })
    }

    /// Scheduler handle for this loop's queue.
    pub fn scheduler(&self) -> Rc<dyn Scheduler> {
        Rc::clone(&self.queue) as Rc<dyn Scheduler>
    }

    /// The underlying queue.
    pub fn queue(&self) -> &Rc<TaskQueue> {
        &self.queue
    }

    /// Turns executed so far.
    pub fn turns(&self) -> u64 {
        self.turns
    }

    /// Returns `true` if no task is waiting to run.
    pub fn is_idle(&self) -> bool {
        self.queue.pending() == 0
    }

    /// Run every task that was posted before this call, in FIFO order,
    /// up to `max_tasks_per_turn`.
    pub fn turn(&mut self) -> TurnReport {
        let mut budget = self.queue.posted();
        if let Some(max) = self.config.max_tasks_per_turn {
            budget = budget.min(max);
        }

        let mut report = TurnReport::default();
        for _ in 0..budget {
            let Some(handle) = self.queue.next_posted() else {
                break;
            };
            report.record(self.queue.run_if_present(handle));
        }

        self.turns += 1;
        trace!(
            turn = self.turns,
            ran = report.ran,
            skipped = report.skipped,
            "turn complete"
        );
        report
    }

    /// Run exactly `n` turns.
    pub fn run_turns(&mut self, n: u64) -> RunSummary {
        let mut summary = RunSummary::default();
        for _ in 0..n {
            summary.report.merge(self.turn());
            summary.turns += 1;
        }
        summary.idle = self.is_idle();
        summary
    }

    /// Run turns until no task is pending, or `max_turns` is reached.
    ///
    /// A live observation session reschedules itself every turn and so
    /// never lets the loop go idle; `max_turns` bounds the run.
    pub fn run_until_idle(&mut self, max_turns: u64) -> RunSummary {
        let mut summary = RunSummary::default();
        while summary.turns < max_turns {
            if self.is_idle() {
                break;
            }
            summary.report.merge(self.turn());
            summary.turns += 1;
        }
        summary.idle = self.is_idle();
        debug!(
            turns = summary.turns,
            ran = summary.report.ran,
            idle = summary.idle,
            "run_until_idle finished"
        );
        summary
    }

    /// Run turns for `duration` of wall-clock time.
    ///
    /// With a turn rate configured, each turn sleeps off whatever is
    /// left of its budget. Without one, an idle loop yields the thread
    /// between turns instead of spinning hot.
    pub fn run_for(&mut self, duration: Duration) -> RunSummary {
        let deadline = Instant::now() + duration;
        let budget = self.config.turn_budget();
        let mut summary = RunSummary::default();

        while Instant::now() < deadline {
            let turn_start = Instant::now();
            summary.report.merge(self.turn());
            summary.turns += 1;

            match budget {
                Some(budget) => {
                    let remaining = budget.saturating_sub(turn_start.elapsed());
                    let until_deadline = deadline.saturating_duration_since(Instant::now());
                    std::thread::sleep(remaining.min(until_deadline));
                }
                None if self.is_idle() => std::thread::yield_now(),
                None => {}
            }
        }

        summary.idle = self.is_idle();
        debug!(turns = summary.turns, ran = summary.report.ran, "run_for finished");
        summary
    }
}

impl Default for EventLoop {
    fn default() -> Self {
        Self {
            queue: Rc::new(TaskQueue::new()),
            config: LoopConfig::default(),
            turns: 0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::{Cell, RefCell};

    #[test]
    fn new_rejects_invalid_config() {
        let config = LoopConfig {
            turn_rate_hz: Some(-5.0),
            ..Default::default()
        };
        assert!(EventLoop::new(config).is_err());
    }

    #[test]
    fn turn_runs_only_previously_posted_tasks() {
        let mut el = EventLoop::default();
        let sched = el.scheduler();
        let log = Rc::new(RefCell::new(Vec::new()));

        let (s2, log2) = (Rc::clone(&sched), Rc::clone(&log));
        sched.schedule(Box::new(move || {
            log2.borrow_mut().push(1);
            let log3 = Rc::clone(&log2);
            s2.schedule(Box::new(move || log3.borrow_mut().push(2)));
        }));

        let first = el.turn();
        assert_eq!(first.ran, 1);
        assert_eq!(*log.borrow(), vec![1]);

        let second = el.turn();
        assert_eq!(second.ran, 1);
        assert_eq!(*log.borrow(), vec![1, 2]);
        assert!(el.is_idle());
        assert_eq!(el.turns(), 2);
    }

    #[test]
    fn task_budget_spills_to_next_turn() {
        let mut el = EventLoop::new(LoopConfig {
            max_tasks_per_turn: Some(2),
            ..Default::default()
        })
        .unwrap();
        let count = Rc::new(Cell::new(0));
        for _ in 0..5 {
            let c = Rc::clone(&count);
            el.scheduler().schedule(Box::new(move || c.set(c.get() + 1)));
        }
        assert_eq!(el.turn().ran, 2);
        assert_eq!(el.turn().ran, 2);
        assert_eq!(el.turn().ran, 1);
        assert_eq!(count.get(), 5);
    }

    #[test]
    fn cancelled_tasks_count_as_skipped() {
        let mut el = EventLoop::default();
        let sched = el.scheduler();
        let h = sched.schedule(Box::new(|| {}));
        sched.schedule(Box::new(|| {}));
        sched.cancel(h);
        let report = el.turn();
        assert_eq!(report, TurnReport { ran: 1, skipped: 1, deferred: 0 });
    }

    #[test]
    fn run_until_idle_stops_when_empty() {
        let mut el = EventLoop::default();
        el.scheduler().schedule(Box::new(|| {}));
        let summary = el.run_until_idle(10);
        assert_eq!(summary.turns, 1);
        assert!(summary.idle);
    }

    #[test]
    fn run_until_idle_bounded_by_max_turns() {
        fn forever(sched: Rc<dyn Scheduler>, count: Rc<Cell<u32>>) {
            let next = Rc::clone(&sched);
            sched.schedule(Box::new(move || {
                count.set(count.get() + 1);
                forever(next, count);
            }));
        }

        let mut el = EventLoop::default();
        let count = Rc::new(Cell::new(0));
        forever(el.scheduler(), Rc::clone(&count));
        let summary = el.run_until_idle(7);
        assert_eq!(summary.turns, 7);
        assert!(!summary.idle);
        assert_eq!(count.get(), 7);
    }

    #[test]
    fn run_for_respects_duration() {
        let mut el = EventLoop::new(LoopConfig {
            turn_rate_hz: Some(1000.0),
            ..Default::default()
        })
        .unwrap();
        let start = Instant::now();
        let summary = el.run_for(Duration::from_millis(20));
        assert!(start.elapsed() >= Duration::from_millis(20));
        assert!(summary.turns >= 1);
        assert!(summary.idle);
    }

    mod proptests {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #[test]
            fn fifo_order_survives_cancellation(cancel in proptest::collection::vec(any::<bool>(), 0..32)) {
                let mut el = EventLoop::default();
                let sched = el.scheduler();
                let log = Rc::new(RefCell::new(Vec::new()));

                let mut expected = Vec::new();
                let mut handles = Vec::new();
                for (i, _) in cancel.iter().enumerate() {
                    let log = Rc::clone(&log);
                    handles.push(sched.schedule(Box::new(move || log.borrow_mut().push(i))));
                }
                for (i, (&c, h)) in cancel.iter().zip(&handles).enumerate() {
                    if c {
                        prop_assert!(sched.cancel(*h));
                    } else {
                        expected.push(i);
                    }
                }

                let report = el.turn();
                prop_assert_eq!(report.ran, expected.len());
                prop_assert_eq!(report.skipped, cancel.len() - expected.len());
                prop_assert_eq!(&*log.borrow(), &expected);
            }
        }
    }
}

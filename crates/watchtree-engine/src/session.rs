//! Observation sessions.
//!
//! [`Session::observe`] intercepts every property of a tree and
//! schedules a reconciliation tick on the given [`Scheduler`]. Each tick
//! reschedules the next one, so a session keeps running until
//! [`stop`](Session::stop) is called or a tick faults. The scheduled
//! task owns the session state: dropping every [`Session`] handle does
//! not end observation.
//!
//! # Lifecycle
//!
//! ```text
//!   observe ──► Running ──stop()──► Stopped
//!                  │
//!                  └──tick error──► Faulted(err)
//! ```
//!
//! Leaving `Running` cancels the pending tick, silences the observer,
//! and releases every accessor the session installed. When `stop()` is
//! called from inside an observer during a tick, the release waits for
//! the tick to return.
//!
//! A container that leaves the tree, because the property holding it
//! was replaced or deleted, has its accessors released on later ticks
//! without `delete` events. The live node list follows what is
//! reachable from the root, so replacing subtrees does not grow it.

use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::Rc;
use std::time::Instant;

use tracing::{debug, warn};

use watchtree_core::{
    ChangeEvent, ChangeKind, ObserveError, Observer, Scheduler, SessionId, TaskHandle, Value,
};

use crate::flatten::flatten;
use crate::intercept::Interceptor;
use crate::metrics::{SessionMetrics, TickReport};
use crate::reconcile::Reconciler;

// ── SessionState ─────────────────────────────────────────────────

/// Where a session is in its lifecycle.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SessionState {
    /// Intercepting writes and reconciling on every tick.
    Running,
    /// Stopped by the caller.
    Stopped,
    /// Stopped by a failed reconciliation tick.
    Faulted(ObserveError),
}

impl SessionState {
    /// Returns `true` for [`SessionState::Running`].
    pub fn is_running(&self) -> bool {
        matches!(self, Self::Running)
    }
}

// ── Dispatch ─────────────────────────────────────────────────────

/// Observer wrapper: counts events and drops them once the session has
/// left `Running`.
struct Dispatch {
    observer: Box<dyn Observer>,
    active: Cell<bool>,
    metrics: RefCell<SessionMetrics>,
}

impl Observer for Dispatch {
    fn on_change(&self, event: &ChangeEvent) {
        if !self.active.get() {
            return;
        }
        {
            let mut m = self.metrics.borrow_mut();
            match event.kind {
                ChangeKind::Updated => m.updated_events += 1,
                ChangeKind::New => m.new_events += 1,
                ChangeKind::Delete => m.delete_events += 1,
            }
        }
        self.observer.on_change(event);
    }
}

// ── Shared ───────────────────────────────────────────────────────

struct Shared {
    id: SessionId,
    scheduler: Rc<dyn Scheduler>,
    reconciler: RefCell<Reconciler>,
    state: RefCell<SessionState>,
    pending: Cell<Option<TaskHandle>>,
    release_pending: Cell<bool>,
    dispatch: Rc<Dispatch>,
}

impl Shared {
    fn is_running(&self) -> bool {
        self.state.borrow().is_running()
    }

    fn schedule_tick(shared: &Rc<Shared>) {
        let task_shared = Rc::clone(shared);
        let handle = shared
            .scheduler
            .schedule(Box::new(move || Shared::run_scheduled(&task_shared)));
        shared.pending.set(Some(handle));
    }

    fn run_scheduled(shared: &Rc<Shared>) {
        shared.pending.set(None);
        if !shared.is_running() {
            return;
        }
        if let Err(err) = shared.tick() {
            shared.fault(err);
        }
        if shared.is_running() {
            Shared::schedule_tick(shared);
        }
    }

    /// One reconciliation pass plus bookkeeping.
    fn tick(&self) -> Result<TickReport, ObserveError> {
        let started = Instant::now();
        let result = {
            let mut reconciler = self
                .reconciler
                .try_borrow_mut()
                .map_err(|_| ObserveError::ReconcileInProgress)?;
            reconciler.tick()
        };

        if let Ok(report) = &result {
            let elapsed_us = u64::try_from(started.elapsed().as_micros()).unwrap_or(u64::MAX);
            let mut m = self.dispatch.metrics.borrow_mut();
            m.ticks += 1;
            m.pruned_nodes += report.pruned as u64;
            m.live_nodes = report.live;
            m.last_tick_us = elapsed_us;
            debug!(
                session = %self.id,
                tick = m.ticks,
                scanned = report.scanned,
                added = report.added,
                deleted = report.deleted,
                pruned = report.pruned,
                live = report.live,
                "tick complete"
            );
        }

        if self.release_pending.get() {
            self.release();
        }
        result
    }

    fn fault(&self, err: ObserveError) {
        warn!(session = %self.id, error = %err, "reconciliation failed, session faulted");
        self.dispatch.metrics.borrow_mut().faults += 1;
        *self.state.borrow_mut() = SessionState::Faulted(err);
        self.shutdown();
    }

    /// Silence the observer, cancel the pending tick, release accessors.
    fn shutdown(&self) {
        self.dispatch.active.set(false);
        if let Some(handle) = self.pending.take() {
            self.scheduler.cancel(handle);
        }
        self.release();
    }

    /// Release accessors now, or after the running tick returns.
    fn release(&self) {
        match self.reconciler.try_borrow_mut() {
            Ok(mut reconciler) => {
                let released = reconciler.detach_all();
                self.release_pending.set(false);
                self.dispatch.metrics.borrow_mut().live_nodes = 0;
                debug!(session = %self.id, released, "accessors released");
            }
            Err(_) => self.release_pending.set(true),
        }
    }
}

// ── Session ──────────────────────────────────────────────────────

/// Handle to a running observation.
///
/// Clones share the same session.
#[derive(Clone)]
pub struct Session {
    shared: Rc<Shared>,
}

impl Session {
    /// Start observing `root`.
    ///
    /// Every property reachable from `root` is intercepted before this
    /// returns; additions and deletions are reported from the first
    /// scheduled tick on.
    ///
    /// # Errors
    ///
    /// - [`ObserveError::NotAContainer`] if `root` is a leaf.
    /// - [`ObserveError::CyclicStructure`] if the tree contains a cycle.
    /// - [`ObserveError::AlreadyObserved`] if any property in the tree
    ///   is already intercepted, by this or another session.
    ///
    /// On error the tree is left untouched.
    pub fn observe<O>(
        scheduler: Rc<dyn Scheduler>,
        root: impl Into<Value>,
        observer: O,
    ) -> Result<Session, ObserveError>
    where
        O: Observer + 'static,
    {
        let root = root.into();
        if !root.is_container() {
            return Err(ObserveError::NotAContainer {
                found: root.type_name(),
            });
        }

        let nodes = flatten(&root, None, None)?;
        let id = SessionId::next();
        let dispatch = Rc::new(Dispatch {
            observer: Box::new(observer),
            active: Cell::new(true),
            metrics: RefCell::new(SessionMetrics::default()),
        });
        let interceptor = Interceptor::new(id, Rc::clone(&dispatch) as Rc<dyn Observer>);
        let reconciler = Reconciler::attach(interceptor, nodes)?;
        let live = reconciler.len();
        dispatch.metrics.borrow_mut().live_nodes = live;

        let shared = Rc::new(Shared {
            id,
            scheduler,
            reconciler: RefCell::new(reconciler),
            state: RefCell::new(SessionState::Running),
            pending: Cell::new(None),
            release_pending: Cell::new(false),
            dispatch,
        });
        Shared::schedule_tick(&shared);
        debug!(session = %id, nodes = live, "observation started");

        Ok(Session { shared })
    }

    /// Identifier tagging this session's accessors.
    pub fn id(&self) -> SessionId {
        self.shared.id
    }

    /// Current lifecycle state.
    pub fn state(&self) -> SessionState {
        self.shared.state.borrow().clone()
    }

    /// Returns `true` while the session is running.
    pub fn is_running(&self) -> bool {
        self.shared.is_running()
    }

    /// Stop observing. Idempotent.
    ///
    /// No event is delivered after this returns. Accessors turn back
    /// into plain data properties holding their current values; when
    /// called from an observer during a tick, that happens as soon as
    /// the tick returns.
    pub fn stop(&self) {
        {
            let mut state = self.shared.state.borrow_mut();
            if !state.is_running() {
                return;
            }
            *state = SessionState::Stopped;
        }
        debug!(session = %self.shared.id, "observation stopped");
        self.shared.shutdown();
    }

    /// Snapshot of the session's counters.
    pub fn metrics(&self) -> SessionMetrics {
        self.shared.dispatch.metrics.borrow().clone()
    }

    /// Number of nodes currently tracked.
    pub fn live_nodes(&self) -> usize {
        self.shared.dispatch.metrics.borrow().live_nodes
    }

    /// Run one reconciliation pass now, outside the scheduler.
    ///
    /// The scheduled tick still runs as usual.
    ///
    /// # Errors
    ///
    /// - [`ObserveError::SessionStopped`] if the session is not running.
    /// - [`ObserveError::ReconcileInProgress`] if called from an
    ///   observer during a tick.
    /// - [`ObserveError::CyclicStructure`] if the pass finds a cycle;
    ///   the session is faulted as if a scheduled tick had failed.
    pub fn reconcile_now(&self) -> Result<TickReport, ObserveError> {
        if !self.is_running() {
            return Err(ObserveError::SessionStopped);
        }
        match self.shared.tick() {
            Err(ObserveError::ReconcileInProgress) => Err(ObserveError::ReconcileInProgress),
            Err(err) => {
                self.shared.fault(err.clone());
                Err(err)
            }
            ok => ok,
        }
    }
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("id", &self.shared.id)
            .field("state", &*self.shared.state.borrow())
            .finish()
    }
}

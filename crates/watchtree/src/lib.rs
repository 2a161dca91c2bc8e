//! Watchtree: change detection for nested maps and sequences.
//!
//! This is the top-level facade crate that re-exports the public API from
//! all watchtree sub-crates. For most users, adding `watchtree` as a single
//! dependency is sufficient.
//!
//! Writes to observed properties are reported synchronously as
//! `updated` events. Properties added or deleted behind the accessors'
//! backs are found by a reconciliation pass that runs once per scheduler
//! tick and reports `new` and `delete` events.
//!
//! # Quick start
//!
//! ```rust
//! use std::cell::RefCell;
//! use std::rc::Rc;
//! use watchtree::prelude::*;
//!
//! let root = Container::map_from([("a", 1)]);
//! let mut event_loop = EventLoop::new(LoopConfig::default()).unwrap();
//!
//! let log = Rc::new(RefCell::new(Vec::new()));
//! let sink = Rc::clone(&log);
//! let session = Session::observe(event_loop.scheduler(), root.clone(), move |e: &ChangeEvent| {
//!     sink.borrow_mut().push((e.kind, e.name.clone()));
//! })
//! .unwrap();
//!
//! root.set("a", 2); // reported immediately
//! root.set("b", 5); // reported on the next tick
//! assert_eq!(log.borrow().len(), 1);
//!
//! event_loop.turn();
//! assert_eq!(
//!     *log.borrow(),
//!     vec![(ChangeKind::Updated, "a".to_string()), (ChangeKind::New, "b".to_string())]
//! );
//!
//! session.stop();
//! assert!(!root.is_intercepted("a"));
//! ```
//!
//! # Modules
//!
//! Each module corresponds to a sub-crate. Use them for types not in the prelude:
//!
//! | Module | Sub-crate | Contents |
//! |--------|-----------|----------|
//! | [`types`] | `watchtree-core` | Values, containers, events, errors, core traits |
//! | [`sched`] | `watchtree-sched` | Task queue and single-threaded event loop |
//! | [`engine`] | `watchtree-engine` | Flattening, interception, reconciliation, sessions |

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

/// Core types, traits, and IDs (`watchtree-core`).
///
/// Contains the value model ([`types::Value`], [`types::Container`]),
/// change events, [`types::ObserveError`], and the [`types::Observer`]
/// and [`types::Scheduler`] traits.
pub use watchtree_core as types;

/// Scheduling (`watchtree-sched`).
///
/// [`sched::TaskQueue`] implements the run-soon primitive;
/// [`sched::EventLoop`] drives it in turns.
pub use watchtree_sched as sched;

/// Observation engine (`watchtree-engine`).
///
/// [`engine::Session`] is the entry point; the lower-level pieces
/// ([`engine::flatten()`], [`engine::observe_property`],
/// [`engine::Reconciler`]) are public for custom drivers.
pub use watchtree_engine as engine;

/// Common imports for typical watchtree usage.
///
/// ```rust
/// use watchtree::prelude::*;
/// ```
///
/// This imports the value model, events, errors, the session, and the
/// event loop.
pub mod prelude {
    // Values and containers
    pub use watchtree_core::{Container, ContainerKind, Function, Key, PropertyKind, Value};

    // Events and errors
    pub use watchtree_core::{ChangeEvent, ChangeKind, ObserveError};

    // Traits
    pub use watchtree_core::{Observer, Scheduler};

    // Scheduling
    pub use watchtree_sched::{EventLoop, LoopConfig, TaskQueue};

    // Engine
    pub use watchtree_engine::{Session, SessionMetrics, SessionState, TickReport};
}

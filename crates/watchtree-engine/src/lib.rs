//! Observation engine for nested containers.
//!
//! Watches a tree of [`Container`](watchtree_core::Container)s and
//! reports every write, addition and deletion to an
//! [`Observer`](watchtree_core::Observer):
//!
//! - [`flatten`] walks a tree into an ordered list of node descriptors.
//! - [`intercept`] turns one property into an accessor whose writes
//!   produce `updated` events synchronously.
//! - [`reconcile`] re-scans the tracked nodes once per scheduled tick to
//!   find properties that were added or deleted behind the accessors'
//!   backs, producing `new` and `delete` events.
//! - [`session`] ties the three together behind [`Session::observe`].

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

pub mod flatten;
pub mod intercept;
pub mod metrics;
pub mod reconcile;
pub mod session;

pub use flatten::{flatten, node_path, KeyPath, NodeDescriptor};
pub use intercept::{detach_property, observe_property, Interceptor};
pub use metrics::{SessionMetrics, TickReport};
pub use reconcile::{LiveNode, Reconciler};
pub use session::{Session, SessionState};

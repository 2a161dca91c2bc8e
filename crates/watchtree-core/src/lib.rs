//! Core types and traits for the watchtree change-detection workspace.
//!
//! This is the leaf crate with zero internal dependencies. It defines
//! the value model that observed trees are built from, the accessor
//! primitive that turns a plain property into a trapped one, change
//! events, error types, and the traits the engine and the scheduler
//! meet at.

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

pub mod container;
pub mod error;
pub mod event;
pub mod id;
pub mod traits;
pub mod value;

pub use container::{Accessor, Container, ContainerKind, PropertyKind, SetHook, ValueSlot};
pub use error::ObserveError;
pub use event::{ChangeEvent, ChangeKind};
pub use id::{SessionId, TaskHandle};
pub use traits::{Observer, Scheduler, Task};
pub use value::{Function, Key, Value};

//! Test utilities and fixtures for watchtree development.
//!
//! Provides [`EventRecorder`], an [`Observer`] that keeps every event it
//! sees, and the tree builders in [`fixtures`].

#![forbid(unsafe_code)]
#![allow(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]

pub mod fixtures;

use std::cell::RefCell;
use std::rc::Rc;

use watchtree_core::{ChangeEvent, ChangeKind, Observer, Value};

/// Observer that records every event, in delivery order.
///
/// Clones share the same log, so a clone can be handed to a session
/// while the test keeps the original for assertions.
#[derive(Clone, Default)]
pub struct EventRecorder {
    events: Rc<RefCell<Vec<ChangeEvent>>>,
}

impl EventRecorder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of events recorded and not yet taken.
    pub fn len(&self) -> usize {
        self.events.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.borrow().is_empty()
    }

    /// Remove and return everything recorded so far.
    pub fn take(&self) -> Vec<ChangeEvent> {
        std::mem::take(&mut *self.events.borrow_mut())
    }

    /// Copy of everything recorded so far.
    pub fn events(&self) -> Vec<ChangeEvent> {
        self.events.borrow().clone()
    }

    /// `(kind, name)` pairs, for compact ordering assertions.
    pub fn summary(&self) -> Vec<(ChangeKind, String)> {
        self.events
            .borrow()
            .iter()
            .map(|e| (e.kind, e.name.clone()))
            .collect()
    }

    /// Count of recorded events of one kind.
    pub fn count(&self, kind: ChangeKind) -> usize {
        self.events.borrow().iter().filter(|e| e.kind == kind).count()
    }
}

impl Observer for EventRecorder {
    fn on_change(&self, event: &ChangeEvent) {
        self.events.borrow_mut().push(event.clone());
    }
}

/// Assert an event's kind, name and values in one line.
///
/// `value` of `None` means the event must carry no value (deletes).
pub fn assert_event(
    event: &ChangeEvent,
    kind: ChangeKind,
    name: &str,
    old_value: impl Into<Value>,
    value: Option<Value>,
) {
    assert_eq!(event.kind, kind, "kind of {event}");
    assert_eq!(event.name, name, "name of {event}");
    assert_eq!(event.old_value, old_value.into(), "old_value of {event}");
    assert_eq!(event.value, value, "value of {event}");
}

//! Per-property interception.
//!
//! [`observe_property`] replaces a data property with an accessor whose
//! slot holds the captured value. Reads return the slot unchanged;
//! every write builds an `updated` [`ChangeEvent`] and hands it to the
//! session's observer before the writing `set` call returns.
//!
//! One [`Interceptor`] serves every property of a session: it is the
//! shared [`SetHook`] behind all of the session's accessors.

use std::cell::RefCell;
use std::rc::Rc;

use watchtree_core::{
    Accessor, ChangeEvent, Container, ObserveError, Observer, PropertyKind, SessionId, SetHook,
    Value, ValueSlot,
};

/// Write hook shared by all accessors of one session.
pub struct Interceptor {
    session: SessionId,
    observer: Rc<dyn Observer>,
}

impl Interceptor {
    /// Create the hook for `session`, delivering to `observer`.
    pub fn new(session: SessionId, observer: Rc<dyn Observer>) -> Rc<Self> {
        Rc::new(Self { session, observer })
    }

    /// Session whose accessors this hook serves.
    pub fn session(&self) -> SessionId {
        self.session
    }

    /// Deliver an event to the session's observer.
    pub fn emit(&self, event: &ChangeEvent) {
        self.observer.on_change(event);
    }
}

impl SetHook for Interceptor {
    fn on_set(&self, owner: &Container, key: &str, old_value: Value, value: &Value) {
        let event = ChangeEvent::updated(key, owner.clone(), old_value, value.clone());
        self.emit(&event);
    }
}

/// Install an accessor on `owner[key]` and return its slot.
///
/// # Errors
///
/// - [`ObserveError::MissingProperty`] if `key` is not an own property.
/// - [`ObserveError::AlreadyObserved`] if `key` already holds an
///   accessor, whichever session installed it.
pub fn observe_property(
    owner: &Container,
    key: &str,
    interceptor: &Rc<Interceptor>,
) -> Result<ValueSlot, ObserveError> {
    match owner.descriptor(key) {
        None => {
            return Err(ObserveError::MissingProperty {
                key: key.to_string(),
            })
        }
        Some(PropertyKind::Accessor { .. }) => {
            return Err(ObserveError::AlreadyObserved {
                key: key.to_string(),
            })
        }
        Some(PropertyKind::Data) => {}
    }

    let captured = owner.get(key).unwrap_or_default();
    let slot: ValueSlot = Rc::new(RefCell::new(captured));
    let hook: Rc<dyn SetHook> = Rc::clone(interceptor) as Rc<dyn SetHook>;
    owner.define_accessor(key, Accessor::new(Rc::clone(&slot), hook, interceptor.session));
    Ok(slot)
}

/// Turn `owner[key]` back into a data property if `session` installed
/// its accessor. Returns `true` if something was detached.
pub fn detach_property(owner: &Container, key: &str, session: SessionId) -> bool {
    owner.release_accessor(key, session)
}

#[cfg(test)]
mod tests {
    use super::*;
    use watchtree_core::ChangeKind;
    use watchtree_test_utils::{assert_event, EventRecorder};

    fn setup() -> (Container, EventRecorder, Rc<Interceptor>) {
        let owner = Container::map_from([("a", 1)]);
        let rec = EventRecorder::new();
        let interceptor = Interceptor::new(SessionId::next(), Rc::new(rec.clone()));
        (owner, rec, interceptor)
    }

    #[test]
    fn write_fires_once_synchronously() {
        let (owner, rec, interceptor) = setup();
        observe_property(&owner, "a", &interceptor).unwrap();

        owner.set("a", 2);
        let events = rec.take();
        assert_eq!(events.len(), 1);
        assert_event(&events[0], ChangeKind::Updated, "a", 1, Some(Value::from(2)));
        assert!(events[0].object.ptr_eq(&owner));
    }

    #[test]
    fn every_write_fires_even_if_unchanged() {
        let (owner, rec, interceptor) = setup();
        observe_property(&owner, "a", &interceptor).unwrap();
        owner.set("a", 1);
        owner.set("a", 1);
        assert_eq!(rec.count(ChangeKind::Updated), 2);
    }

    #[test]
    fn reads_are_passthrough() {
        let (owner, rec, interceptor) = setup();
        let slot = observe_property(&owner, "a", &interceptor).unwrap();
        assert_eq!(owner.get("a"), Some(Value::from(1)));
        assert_eq!(*slot.borrow(), Value::from(1));
        owner.set("a", 3);
        assert_eq!(owner.get("a"), Some(Value::from(3)));
        assert_eq!(*slot.borrow(), Value::from(3));
        assert_eq!(rec.len(), 1);
    }

    #[test]
    fn events_are_snapshots() {
        let (owner, rec, interceptor) = setup();
        observe_property(&owner, "a", &interceptor).unwrap();
        owner.set("a", 2);
        owner.set("a", 3);
        let events = rec.take();
        assert_eq!(events[0].value, Some(Value::from(2)));
        assert_eq!(events[1].old_value, Value::from(2));
    }

    #[test]
    fn second_install_is_rejected() {
        let (owner, _rec, interceptor) = setup();
        observe_property(&owner, "a", &interceptor).unwrap();
        let err = observe_property(&owner, "a", &interceptor).unwrap_err();
        assert_eq!(err, ObserveError::AlreadyObserved { key: "a".into() });

        let other = Interceptor::new(SessionId::next(), Rc::new(EventRecorder::new()));
        assert!(observe_property(&owner, "a", &other).is_err());
    }

    #[test]
    fn missing_key_is_rejected() {
        let (owner, _rec, interceptor) = setup();
        let err = observe_property(&owner, "nope", &interceptor).unwrap_err();
        assert_eq!(err, ObserveError::MissingProperty { key: "nope".into() });
    }

    #[test]
    fn detach_makes_writes_silent() {
        let (owner, rec, interceptor) = setup();
        observe_property(&owner, "a", &interceptor).unwrap();
        owner.set("a", 2);

        assert!(!detach_property(&owner, "a", SessionId::next()));
        assert!(detach_property(&owner, "a", interceptor.session()));
        owner.set("a", 9);

        assert_eq!(rec.len(), 1);
        assert_eq!(owner.get("a"), Some(Value::from(9)));
    }

    #[test]
    fn observer_may_read_and_write_the_tree() {
        let owner = Container::map_from([("a", 1), ("seen", 0)]);
        let watched = owner.clone();
        let observer = move |event: &ChangeEvent| {
            let current = watched.get(&event.name).unwrap();
            watched.set("seen", current);
        };
        let interceptor = Interceptor::new(SessionId::next(), Rc::new(observer));
        observe_property(&owner, "a", &interceptor).unwrap();

        owner.set("a", 42);
        assert_eq!(owner.get("seen"), Some(Value::from(42)));
    }
}

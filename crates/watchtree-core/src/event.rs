//! Change events delivered to observers.

use std::fmt;

use crate::container::Container;
use crate::value::{Key, Value};

/// What happened to a property.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ChangeKind {
    /// An intercepted property was written.
    Updated,
    /// A property appeared that was not intercepted before.
    New,
    /// A tracked property is no longer an own property of its owner.
    Delete,
}

impl ChangeKind {
    /// Wire name: `"updated"`, `"new"` or `"delete"`.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Updated => "updated",
            Self::New => "new",
            Self::Delete => "delete",
        }
    }
}

impl fmt::Display for ChangeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One detected mutation.
///
/// Events are snapshots: `value` is the value at the moment the change
/// was detected and does not follow later writes.
#[derive(Clone, Debug, PartialEq)]
pub struct ChangeEvent {
    /// Property key.
    pub name: Key,
    /// Container that owns (or owned) the property.
    pub object: Container,
    /// Kind of change.
    pub kind: ChangeKind,
    /// Value before the change. Empty string for [`ChangeKind::New`].
    pub old_value: Value,
    /// Value after the change. `None` for [`ChangeKind::Delete`].
    pub value: Option<Value>,
}

impl ChangeEvent {
    /// An intercepted write.
    pub fn updated(name: impl Into<Key>, object: Container, old_value: Value, value: Value) -> Self {
        Self {
            name: name.into(),
            object,
            kind: ChangeKind::Updated,
            old_value,
            value: Some(value),
        }
    }

    /// A newly discovered property.
    pub fn new_property(name: impl Into<Key>, object: Container, value: Value) -> Self {
        Self {
            name: name.into(),
            object,
            kind: ChangeKind::New,
            old_value: Value::String(String::new()),
            value: Some(value),
        }
    }

    /// A property that disappeared from its owner.
    pub fn deleted(name: impl Into<Key>, object: Container, old_value: Value) -> Self {
        Self {
            name: name.into(),
            object,
            kind: ChangeKind::Delete,
            old_value,
            value: None,
        }
    }
}

impl fmt::Display for ChangeEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} '{}': {:?}", self.kind, self.name, self.old_value)?;
        if let Some(value) = &self.value {
            write!(f, " -> {value:?}")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn constructors_fill_kind_and_value() {
        let owner = Container::map();
        let up = ChangeEvent::updated("a", owner.clone(), Value::from(1), Value::from(2));
        assert_eq!(up.kind, ChangeKind::Updated);
        assert_eq!(up.value, Some(Value::from(2)));

        let new = ChangeEvent::new_property("b", owner.clone(), Value::from(5));
        assert_eq!(new.old_value, Value::from(""));
        assert_eq!(new.kind.as_str(), "new");

        let del = ChangeEvent::deleted("a", owner, Value::from(2));
        assert_eq!(del.value, None);
        assert_eq!(del.kind.to_string(), "delete");
    }

    #[test]
    fn display_includes_values() {
        let ev = ChangeEvent::updated("a", Container::map(), Value::from(1), Value::from(2));
        assert_eq!(ev.to_string(), "updated 'a': Number(1) -> Number(2)");
        let del = ChangeEvent::deleted("a", Container::map(), Value::from("x"));
        assert_eq!(del.to_string(), "delete 'a': String(\"x\")");
    }
}

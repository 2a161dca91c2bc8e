//! Error types for the observation engine.

use std::error::Error;
use std::fmt;

use crate::value::Key;

/// Errors from flattening, interception and session control.
///
/// Initial `observe` calls return these directly. Errors raised during
/// a reconciliation tick have no caller to return to; they fault the
/// session instead (see `SessionState::Faulted` in the engine crate).
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ObserveError {
    /// The flattener reached a container that is already on its own
    /// ancestor chain.
    CyclicStructure {
        /// Key under which the repeated container was found.
        key: Key,
    },
    /// Interception was requested on a property that already has an
    /// accessor installed.
    AlreadyObserved {
        /// The intercepted key.
        key: Key,
    },
    /// Interception was requested on a key the owner does not have.
    MissingProperty {
        /// The missing key.
        key: Key,
    },
    /// The observation root is a leaf value.
    NotAContainer {
        /// Type name of the offending value.
        found: &'static str,
    },
    /// The session has been stopped or has faulted.
    SessionStopped,
    /// A reconciliation pass was requested while one is already running.
    ReconcileInProgress,
}

impl fmt::Display for ObserveError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::CyclicStructure { key } => {
                write!(f, "cyclic structure: '{key}' refers back to an ancestor")
            }
            Self::AlreadyObserved { key } => write!(f, "property '{key}' is already observed"),
            Self::MissingProperty { key } => write!(f, "no own property '{key}'"),
            Self::NotAContainer { found } => {
                write!(f, "observation root must be a container, got {found}")
            }
            Self::SessionStopped => write!(f, "session is stopped"),
            Self::ReconcileInProgress => write!(f, "reconciliation already in progress"),
        }
    }
}

impl Error for ObserveError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_messages() {
        let e = ObserveError::CyclicStructure { key: "self".into() };
        assert_eq!(e.to_string(), "cyclic structure: 'self' refers back to an ancestor");
        let e = ObserveError::AlreadyObserved { key: "a".into() };
        assert_eq!(e.to_string(), "property 'a' is already observed");
        let e = ObserveError::NotAContainer { found: "number" };
        assert_eq!(e.to_string(), "observation root must be a container, got number");
    }
}

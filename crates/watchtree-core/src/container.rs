//! Shared mappings and sequences, and the accessor primitive.
//!
//! A [`Container`] owns an insertion-ordered table of own properties.
//! Each property is either a plain data slot or an [`Accessor`]: a
//! trapped property whose value lives in a shared [`ValueSlot`] and
//! whose writes are reported to a [`SetHook`]. Installing an accessor
//! is the only way a property becomes observable; reads through an
//! accessor always return the slot contents unchanged.
//!
//! # Borrowing
//!
//! Property tables sit behind a `RefCell`. No borrow is held while a
//! [`SetHook`] runs, so hooks (and the observers behind them) may read
//! and mutate any container, including the one being written.

use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::Rc;

use indexmap::IndexMap;
use smallvec::SmallVec;

use crate::id::SessionId;
use crate::value::{Key, Value};

/// Shared storage behind an accessor property.
///
/// The accessor reads and writes this slot; whoever else holds the slot
/// (the reconciliation loop's live list) sees the current value.
pub type ValueSlot = Rc<RefCell<Value>>;

/// Receives every write made through an accessor property.
pub trait SetHook {
    /// Called after `owner[key]` changed from `old_value` to `value`.
    ///
    /// The slot already holds `value` when this runs.
    fn on_set(&self, owner: &Container, key: &str, old_value: Value, value: &Value);
}

/// A trapped property: shared slot plus write hook.
#[derive(Clone)]
pub struct Accessor {
    slot: ValueSlot,
    hook: Rc<dyn SetHook>,
    tag: SessionId,
}

impl Accessor {
    /// Build an accessor over `slot`, tagged with the installing session.
    pub fn new(slot: ValueSlot, hook: Rc<dyn SetHook>, tag: SessionId) -> Self {
        Self { slot, hook, tag }
    }

    /// The slot this accessor reads and writes.
    pub fn slot(&self) -> &ValueSlot {
        &self.slot
    }

    /// Session that installed this accessor.
    pub fn tag(&self) -> SessionId {
        self.tag
    }
}

impl fmt::Debug for Accessor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Accessor")
            .field("value", &*self.slot.borrow())
            .field("tag", &self.tag)
            .finish()
    }
}

/// Storage for one own property.
#[derive(Clone, Debug)]
enum Property {
    Data(Value),
    Accessor(Accessor),
}

impl Property {
    fn value(&self) -> Value {
        match self {
            Self::Data(v) => v.clone(),
            Self::Accessor(acc) => acc.slot.borrow().clone(),
        }
    }
}

/// What kind of property sits at a key.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PropertyKind {
    /// Plain value, writes are silent.
    Data,
    /// Trapped property installed by the given session.
    Accessor {
        /// Installing session.
        tag: SessionId,
    },
}

/// Whether a container behaves as a mapping or a sequence.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ContainerKind {
    /// String-keyed mapping.
    Map,
    /// Index-keyed sequence with a tracked length.
    Seq,
}

impl ContainerKind {
    /// Lowercase name, for diagnostics.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Map => "map",
            Self::Seq => "seq",
        }
    }
}

struct Inner {
    kind: ContainerKind,
    props: RefCell<IndexMap<Key, Property>>,
    /// Sequence length: one past the highest index ever assigned.
    /// Deleting an index leaves a hole and does not shrink it.
    seq_len: Cell<usize>,
}

/// Shared handle to a mapping or sequence.
///
/// Cloning the handle shares the contents. Equality and hashing in the
/// rest of the workspace go through [`ptr_eq`](Container::ptr_eq).
#[derive(Clone)]
pub struct Container(Rc<Inner>);

impl Container {
    fn with_kind(kind: ContainerKind) -> Self {
        Self(Rc::new(Inner {
            kind,
            props: RefCell::new(IndexMap::new()),
            seq_len: Cell::new(0),
        }))
    }

    /// Create an empty mapping.
    pub fn map() -> Self {
        Self::with_kind(ContainerKind::Map)
    }

    /// Create an empty sequence.
    pub fn seq() -> Self {
        Self::with_kind(ContainerKind::Seq)
    }

    /// Create a mapping from key/value pairs, in order.
    pub fn map_from<K, V, I>(entries: I) -> Self
    where
        K: Into<Key>,
        V: Into<Value>,
        I: IntoIterator<Item = (K, V)>,
    {
        let map = Self::map();
        for (k, v) in entries {
            map.set(k.into(), v.into());
        }
        map
    }

    /// Create a sequence from items, in order.
    pub fn seq_from<V, I>(items: I) -> Self
    where
        V: Into<Value>,
        I: IntoIterator<Item = V>,
    {
        let seq = Self::seq();
        for v in items {
            seq.push(v.into());
        }
        seq
    }

    /// Mapping or sequence.
    pub fn kind(&self) -> ContainerKind {
        self.0.kind
    }

    /// Returns `true` if both handles point at the same container.
    pub fn ptr_eq(&self, other: &Container) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }

    /// Number of own properties.
    pub fn len(&self) -> usize {
        self.0.props.borrow().len()
    }

    /// Returns `true` if the container has no own properties.
    pub fn is_empty(&self) -> bool {
        self.0.props.borrow().is_empty()
    }

    /// Sequence length (one past the highest index assigned). Zero for maps.
    pub fn seq_len(&self) -> usize {
        self.0.seq_len.get()
    }

    /// Returns `true` if `key` is an own property.
    pub fn contains_key(&self, key: &str) -> bool {
        self.0.props.borrow().contains_key(key)
    }

    /// Own property keys, in insertion order.
    pub fn keys(&self) -> Vec<Key> {
        self.0.props.borrow().keys().cloned().collect()
    }

    /// Snapshot of every own property, in insertion order.
    pub fn entries(&self) -> Vec<(Key, Value)> {
        self.0
            .props
            .borrow()
            .iter()
            .map(|(k, p)| (k.clone(), p.value()))
            .collect()
    }

    /// Snapshot of the own properties that are still plain data slots.
    pub fn data_properties(&self) -> SmallVec<[(Key, Value); 8]> {
        self.0
            .props
            .borrow()
            .iter()
            .filter_map(|(k, p)| match p {
                Property::Data(v) => Some((k.clone(), v.clone())),
                Property::Accessor(_) => None,
            })
            .collect()
    }

    /// Read an own property. Accessors return their slot contents.
    pub fn get(&self, key: &str) -> Option<Value> {
        self.0.props.borrow().get(key).map(Property::value)
    }

    /// Write an own property.
    ///
    /// Writing a data property (or a missing key) is silent. Writing an
    /// accessor stores into its slot and then calls its hook, after the
    /// property table borrow has been released.
    pub fn set(&self, key: impl Into<Key>, value: impl Into<Value>) {
        let key = key.into();
        let value = value.into();

        let trapped = {
            let mut props = self.0.props.borrow_mut();
            match props.get_mut(&key) {
                Some(Property::Accessor(acc)) => {
                    let old = acc.slot.replace(value.clone());
                    Some((Rc::clone(&acc.hook), old))
                }
                Some(Property::Data(v)) => {
                    *v = value.clone();
                    None
                }
                None => {
                    self.bump_seq_len(&key);
                    props.insert(key.clone(), Property::Data(value.clone()));
                    None
                }
            }
        };

        if let Some((hook, old)) = trapped {
            hook.on_set(self, &key, old, &value);
        }
    }

    /// Append to a sequence at index [`seq_len`](Container::seq_len).
    ///
    /// On a mapping this inserts under the first free decimal key at or
    /// above [`len`](Container::len), so earlier entries are never
    /// overwritten.
    pub fn push(&self, value: impl Into<Value>) {
        let key = match self.0.kind {
            ContainerKind::Seq => self.0.seq_len.get().to_string(),
            ContainerKind::Map => {
                let props = self.0.props.borrow();
                let mut index = props.len();
                while props.contains_key(index.to_string().as_str()) {
                    index += 1;
                }
                index.to_string()
            }
        };
        self.set(key, value);
    }

    /// Delete an own property, returning its last value.
    ///
    /// Accessors are removed as well; their slot keeps the last value for
    /// anyone still holding it. Sequence length is unchanged.
    pub fn remove(&self, key: &str) -> Option<Value> {
        self.0
            .props
            .borrow_mut()
            .shift_remove(key)
            .map(|p| p.value())
    }

    /// Kind of property at `key`, or `None` if there is no such property.
    pub fn descriptor(&self, key: &str) -> Option<PropertyKind> {
        self.0.props.borrow().get(key).map(|p| match p {
            Property::Data(_) => PropertyKind::Data,
            Property::Accessor(acc) => PropertyKind::Accessor { tag: acc.tag },
        })
    }

    /// Returns `true` if `key` holds an accessor.
    pub fn is_intercepted(&self, key: &str) -> bool {
        matches!(self.descriptor(key), Some(PropertyKind::Accessor { .. }))
    }

    /// Returns `true` if `key` holds an accessor backed by `slot`.
    pub fn holds_slot(&self, key: &str, slot: &ValueSlot) -> bool {
        match self.0.props.borrow().get(key) {
            Some(Property::Accessor(acc)) => Rc::ptr_eq(&acc.slot, slot),
            _ => false,
        }
    }

    /// Install `accessor` at `key`, replacing whatever was there.
    ///
    /// This is the raw primitive: last install wins. Callers that need
    /// to refuse double installation check [`descriptor`](Container::descriptor)
    /// first.
    pub fn define_accessor(&self, key: impl Into<Key>, accessor: Accessor) {
        let key = key.into();
        let mut props = self.0.props.borrow_mut();
        if !props.contains_key(&key) {
            self.bump_seq_len(&key);
        }
        props.insert(key, Property::Accessor(accessor));
    }

    /// Turn the accessor at `key` back into a data property holding its
    /// current value, but only if it was installed by `tag`.
    ///
    /// Returns `true` if an accessor was released.
    pub fn release_accessor(&self, key: &str, tag: SessionId) -> bool {
        let mut props = self.0.props.borrow_mut();
        let Some(prop) = props.get_mut(key) else {
            return false;
        };
        let value = match prop {
            Property::Accessor(acc) if acc.tag == tag => acc.slot.borrow().clone(),
            _ => return false,
        };
        *prop = Property::Data(value);
        true
    }

    fn bump_seq_len(&self, key: &str) {
        if self.0.kind != ContainerKind::Seq {
            return;
        }
        // An index with no representable successor is an ordinary key.
        let Some(next) = key.parse::<usize>().ok().and_then(|i| i.checked_add(1)) else {
            return;
        };
        if next > self.0.seq_len.get() {
            self.0.seq_len.set(next);
        }
    }
}

impl fmt::Debug for Container {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let len = self.0.props.try_borrow().map(|p| p.len()).ok();
        match len {
            Some(len) => write!(f, "{}(len={len})", self.kind().as_str()),
            None => write!(f, "{}(borrowed)", self.kind().as_str()),
        }
    }
}

impl PartialEq for Container {
    fn eq(&self, other: &Self) -> bool {
        self.ptr_eq(other)
    }
}

impl Eq for Container {}

impl<K: Into<Key>, V: Into<Value>> FromIterator<(K, V)> for Container {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self::map_from(iter)
    }
}

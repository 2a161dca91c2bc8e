//! Polling reconciliation of additions and deletions.
//!
//! Accessors only see writes to properties that already exist. The
//! [`Reconciler`] closes the gap: each [`tick`](Reconciler::tick) walks
//! the live node list from last to first and
//!
//! 1. silently releases every node that is no longer part of the tree:
//!    its parent node was deleted or released, or the parent property
//!    now holds a different container;
//! 2. reports a `delete` for every node whose key is no longer an own
//!    property of its owner, dropping the node for good. A key that
//!    was removed and re-added since the last tick no longer holds the
//!    node's accessor and counts as deleted too;
//! 3. reports a `new` for every data property (no accessor yet) found
//!    on a live container, flattening and intercepting its whole
//!    subtree and appending the new nodes.
//!
//! Nodes appended during a tick are first scanned on the next tick.
//! Release spreads down a detached subtree one level per scan, so a
//! deep subtree may take more than one tick to be fully released.

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use tracing::trace;

use watchtree_core::{ChangeEvent, Container, Key, ObserveError, Value, ValueSlot};

use crate::flatten::{flatten, node_path, NodeDescriptor};
use crate::intercept::{detach_property, observe_property, Interceptor};
use crate::metrics::TickReport;

/// The node whose value owns a tracked property.
#[derive(Clone, Debug)]
struct ParentLink {
    slot: ValueSlot,
    alive: Rc<Cell<bool>>,
}

/// A tracked property slot.
///
/// Holds the same slot as the property's accessor, so the node's value
/// is whatever the last intercepted write stored.
#[derive(Clone, Debug)]
pub struct LiveNode {
    key: Option<Key>,
    owner: Option<Container>,
    slot: ValueSlot,
    alive: Rc<Cell<bool>>,
    parent: Option<ParentLink>,
}

impl LiveNode {
    fn new(key: Option<Key>, owner: Option<Container>, slot: ValueSlot) -> Self {
        Self {
            key,
            owner,
            slot,
            alive: Rc::new(Cell::new(true)),
            parent: None,
        }
    }

    /// Property key; `None` for the session root.
    pub fn key(&self) -> Option<&str> {
        self.key.as_deref()
    }

    /// Container holding the key; `None` for the session root.
    pub fn owner(&self) -> Option<&Container> {
        self.owner.as_ref()
    }

    /// Current value of the slot.
    pub fn value(&self) -> Value {
        self.slot.borrow().clone()
    }

    fn link(&self) -> ParentLink {
        ParentLink {
            slot: Rc::clone(&self.slot),
            alive: Rc::clone(&self.alive),
        }
    }

    /// Returns `true` if the parent node is gone or no longer holds
    /// this node's owner.
    fn is_orphaned(&self) -> bool {
        let (Some(parent), Some(owner)) = (&self.parent, &self.owner) else {
            return false;
        };
        if !parent.alive.get() {
            return true;
        }
        !matches!(&*parent.slot.borrow(), Value::Container(c) if c.ptr_eq(owner))
    }
}

/// Wire parent links for nodes built from one flatten list.
///
/// `built[i]` is the node for descriptor `i`, if one was created. The
/// first descriptor links to `root_parent`.
fn link_parents(
    descriptors: &[NodeDescriptor],
    built: &mut [Option<LiveNode>],
    root_parent: Option<ParentLink>,
) {
    let links: Vec<Option<ParentLink>> = built
        .iter()
        .map(|n| n.as_ref().map(LiveNode::link))
        .collect();
    for (i, node) in built.iter_mut().enumerate() {
        let Some(node) = node else {
            continue;
        };
        node.parent = match descriptors[i].parent {
            Some(p) => links[p].clone(),
            None => root_parent.clone(),
        };
    }
}

/// What the scan decided for one node.
enum Step {
    Orphaned,
    Deleted(ChangeEvent),
    Scan(Option<Container>),
}

/// Owner of the live node list.
pub struct Reconciler {
    interceptor: Rc<Interceptor>,
    live: Vec<Option<LiveNode>>,
}

impl Reconciler {
    /// Intercept every keyed node of a flattened tree and start tracking
    /// the result.
    ///
    /// Nothing is installed unless every keyed node is still a plain
    /// data property. A property reachable along two paths (a shared
    /// container) is intercepted once and tracked once.
    ///
    /// # Errors
    ///
    /// [`ObserveError::AlreadyObserved`] if any property in the tree
    /// already has an accessor.
    pub fn attach(
        interceptor: Rc<Interceptor>,
        nodes: Vec<NodeDescriptor>,
    ) -> Result<Self, ObserveError> {
        for node in &nodes {
            if let (Some(owner), Some(key)) = (&node.owner, &node.key) {
                if owner.is_intercepted(key) {
                    return Err(ObserveError::AlreadyObserved { key: key.clone() });
                }
            }
        }

        let mut live: Vec<Option<LiveNode>> = (0..nodes.len()).map(|_| None).collect();
        for (i, node) in nodes.iter().enumerate().rev() {
            match (&node.owner, &node.key) {
                (Some(owner), Some(key)) => {
                    if owner.is_intercepted(key) {
                        continue;
                    }
                    let slot = observe_property(owner, key, &interceptor)?;
                    live[i] = Some(LiveNode::new(Some(key.clone()), Some(owner.clone()), slot));
                }
                (owner, key) => {
                    let slot = Rc::new(RefCell::new(node.value.clone()));
                    live[i] = Some(LiveNode::new(key.clone(), owner.clone(), slot));
                }
            }
        }
        link_parents(&nodes, &mut live, None);
        live.retain(Option::is_some);

        Ok(Self { interceptor, live })
    }

    /// Number of tracked nodes.
    pub fn len(&self) -> usize {
        self.live.iter().filter(|n| n.is_some()).count()
    }

    /// Returns `true` if nothing is tracked.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Tracked nodes, in list order.
    pub fn nodes(&self) -> impl Iterator<Item = &LiveNode> {
        self.live.iter().flatten()
    }

    /// Run one reconciliation pass.
    ///
    /// # Errors
    ///
    /// [`ObserveError::CyclicStructure`] if a newly added property makes
    /// the tree cyclic. Nodes discovered before the error stay tracked.
    pub fn tick(&mut self) -> Result<TickReport, ObserveError> {
        let mut report = TickReport::default();

        for i in (0..self.live.len()).rev() {
            let (step, link) = {
                let Some(node) = &self.live[i] else {
                    continue;
                };
                report.scanned += 1;
                let step = if node.is_orphaned() {
                    Step::Orphaned
                } else {
                    match (&node.owner, &node.key) {
                        (Some(owner), Some(key)) if !owner.holds_slot(key, &node.slot) => {
                            Step::Deleted(ChangeEvent::deleted(
                                key.clone(),
                                owner.clone(),
                                node.value(),
                            ))
                        }
                        _ => Step::Scan(node.value().as_container().cloned()),
                    }
                };
                (step, node.link())
            };

            match step {
                Step::Orphaned => {
                    if let Some(node) = self.live[i].take() {
                        node.alive.set(false);
                        if let (Some(owner), Some(key)) = (&node.owner, &node.key) {
                            detach_property(owner, key, self.interceptor.session());
                            trace!(key = %key, "detached property released");
                        }
                    }
                    report.pruned += 1;
                }
                Step::Deleted(event) => {
                    if let Some(node) = self.live[i].take() {
                        node.alive.set(false);
                    }
                    report.deleted += 1;
                    trace!(key = %event.name, "property deleted");
                    self.interceptor.emit(&event);
                }
                Step::Scan(Some(container)) => self.discover(&container, link, &mut report)?,
                Step::Scan(None) => {}
            }
        }

        self.live.retain(Option::is_some);
        report.live = self.live.len();
        Ok(report)
    }

    /// Intercept and report every data property on `container`, the
    /// value of the node behind `parent`.
    fn discover(
        &mut self,
        container: &Container,
        parent: ParentLink,
        report: &mut TickReport,
    ) -> Result<(), ObserveError> {
        for (key, _) in container.data_properties() {
            // Observers run between iterations and may have changed the
            // container since the snapshot was taken.
            if container.is_intercepted(&key) {
                continue;
            }
            let Some(value) = container.get(&key) else {
                continue;
            };

            let found = flatten(&value, Some(container), Some(&key))?;
            let mut built: Vec<Option<LiveNode>> = (0..found.len()).map(|_| None).collect();
            for (i, desc) in found.iter().enumerate().rev() {
                let (Some(owner), Some(k)) = (&desc.owner, &desc.key) else {
                    continue;
                };
                // Shared reference into an already observed region.
                if owner.is_intercepted(k) {
                    continue;
                }
                let slot = match observe_property(owner, k, &self.interceptor) {
                    Ok(slot) => slot,
                    Err(ObserveError::MissingProperty { .. }) => continue,
                    Err(e) => return Err(e),
                };
                built[i] = Some(LiveNode::new(Some(k.clone()), Some(owner.clone()), slot));
            }
            link_parents(&found, &mut built, Some(parent.clone()));

            for (i, node) in built.into_iter().enumerate().rev() {
                let Some(node) = node else {
                    continue;
                };
                let (Some(owner), Some(k)) = (node.owner.clone(), node.key.clone()) else {
                    continue;
                };
                let current = node.value();
                self.live.push(Some(node));
                report.added += 1;
                trace!(
                    path = ?node_path(&found, i),
                    children = found[i].children,
                    "property added"
                );
                self.interceptor.emit(&ChangeEvent::new_property(k, owner, current));
            }
        }
        Ok(())
    }

    /// Release every accessor this reconciler's session installed and
    /// stop tracking all nodes. Returns how many accessors were released.
    pub fn detach_all(&mut self) -> usize {
        let session = self.interceptor.session();
        let mut released = 0;
        for node in self.live.drain(..).flatten() {
            node.alive.set(false);
            if let (Some(owner), Some(key)) = (&node.owner, &node.key) {
                if detach_property(owner, key, session) {
                    released += 1;
                }
            }
        }
        released
    }
}

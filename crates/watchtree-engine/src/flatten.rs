//! Tree-to-list flattening.
//!
//! [`flatten`] walks a value depth-first with an explicit work stack and
//! emits one [`NodeDescriptor`] per visited property. Children are
//! pushed in key order and popped last-first, so the output visits the
//! last key of each container before the first.
//!
//! Cycles are rejected: before a child container is pushed, the
//! ancestor chain of its parent is checked by pointer identity. Shared
//! but acyclic references are fine and are walked once per path.

use smallvec::SmallVec;

use watchtree_core::{Container, Key, ObserveError, Value};

/// Key path from the flatten root to a node.
pub type KeyPath = SmallVec<[Key; 8]>;

/// One property slot in a flattened tree.
#[derive(Clone, Debug)]
pub struct NodeDescriptor {
    /// Property key. `None` only for a root flattened without a key.
    pub key: Option<Key>,
    /// Value at flatten time.
    pub value: Value,
    /// Index of the parent descriptor in the same list.
    pub parent: Option<usize>,
    /// Container holding `key`. For the root, the owner passed to
    /// [`flatten`], if any.
    pub owner: Option<Container>,
    /// Number of own keys pushed for this node (zero for leaves).
    pub children: usize,
}

struct Pending {
    key: Option<Key>,
    value: Value,
    parent: Option<usize>,
    owner: Option<Container>,
}

/// Flatten `value` (stored at `owner[key]`) into a depth-first list.
///
/// The first descriptor is always the input itself. Leaves, including
/// `Null` and functions, produce exactly one descriptor.
///
/// # Errors
///
/// [`ObserveError::CyclicStructure`] if a container is reachable from
/// itself.
pub fn flatten(
    value: &Value,
    owner: Option<&Container>,
    key: Option<&str>,
) -> Result<Vec<NodeDescriptor>, ObserveError> {
    let mut stack = vec![Pending {
        key: key.map(str::to_string),
        value: value.clone(),
        parent: None,
        owner: owner.cloned(),
    }];
    let mut nodes: Vec<NodeDescriptor> = Vec::new();

    while let Some(pending) = stack.pop() {
        let index = nodes.len();
        let container = pending.value.as_container().cloned();
        nodes.push(NodeDescriptor {
            key: pending.key,
            value: pending.value,
            parent: pending.parent,
            owner: pending.owner,
            children: 0,
        });

        let Some(container) = container else {
            continue;
        };
        let entries = container.entries();
        nodes[index].children = entries.len();

        for (child_key, child) in entries {
            if let Value::Container(inner) = &child {
                if on_ancestor_chain(&nodes, index, inner) {
                    return Err(ObserveError::CyclicStructure { key: child_key });
                }
            }
            stack.push(Pending {
                key: Some(child_key),
                value: child,
                parent: Some(index),
                owner: Some(container.clone()),
            });
        }
    }

    Ok(nodes)
}

fn on_ancestor_chain(nodes: &[NodeDescriptor], from: usize, target: &Container) -> bool {
    let mut cursor = Some(from);
    while let Some(i) = cursor {
        if let Value::Container(c) = &nodes[i].value {
            if c.ptr_eq(target) {
                return true;
            }
        }
        cursor = nodes[i].parent;
    }
    false
}

/// Keys from the flatten root down to `nodes[index]`.
///
/// A root flattened without a key contributes nothing to the path.
pub fn node_path(nodes: &[NodeDescriptor], index: usize) -> KeyPath {
    let mut path = KeyPath::new();
    let mut cursor = Some(index);
    while let Some(i) = cursor {
        if let Some(key) = &nodes[i].key {
            path.push(key.clone());
        }
        cursor = nodes[i].parent;
    }
    path.reverse();
    path
}

#[cfg(test)]
mod tests {
    use super::*;
    use watchtree_test_utils::fixtures::{count_properties, nested_fixture, random_tree};

    fn keys(nodes: &[NodeDescriptor]) -> Vec<Option<&str>> {
        nodes.iter().map(|n| n.key.as_deref()).collect()
    }

    #[test]
    fn leaf_produces_single_node() {
        for value in [
            Value::Null,
            Value::from(1),
            Value::from("s"),
            Value::from(watchtree_core::Function::new("f", |_| Value::Null)),
        ] {
            let nodes = flatten(&value, None, Some("x")).unwrap();
            assert_eq!(nodes.len(), 1);
            assert_eq!(nodes[0].key.as_deref(), Some("x"));
            assert_eq!(nodes[0].children, 0);
            assert!(nodes[0].parent.is_none());
        }
    }

    #[test]
    fn visits_last_pushed_first() {
        let b = Container::map_from([("c", 2)]);
        let root = Container::map_from([
            ("a", Value::from(1)),
            ("b", Value::from(b.clone())),
            ("d", Value::from(3)),
        ]);
        let nodes = flatten(&Value::from(root.clone()), None, None).unwrap();
        assert_eq!(keys(&nodes), vec![None, Some("d"), Some("b"), Some("c"), Some("a")]);

        assert_eq!(nodes[0].children, 3);
        assert_eq!(nodes[2].children, 1);
        assert_eq!(nodes[3].parent, Some(2));
        assert!(nodes[3].owner.as_ref().unwrap().ptr_eq(&b));
        assert!(nodes[1].owner.as_ref().unwrap().ptr_eq(&root));
    }

    #[test]
    fn root_owner_is_recorded() {
        let owner = Container::map();
        let nodes = flatten(&Value::from(5), Some(&owner), Some("k")).unwrap();
        assert!(nodes[0].owner.as_ref().unwrap().ptr_eq(&owner));
    }

    #[test]
    fn nested_fixture_counts_every_property() {
        let root = nested_fixture();
        let nodes = flatten(&Value::from(root.clone()), None, None).unwrap();
        assert_eq!(nodes.len(), count_properties(&root) + 1);
    }

    #[test]
    fn functions_are_not_traversed() {
        let root = nested_fixture();
        let nodes = flatten(&Value::from(root), None, None).unwrap();
        let func = nodes
            .iter()
            .find(|n| matches!(n.value, Value::Function(_)))
            .unwrap();
        assert_eq!(func.children, 0);
    }

    #[test]
    fn sequences_use_index_keys() {
        let seq = Container::seq_from(["x", "y"]);
        let nodes = flatten(&Value::from(seq), None, None).unwrap();
        assert_eq!(keys(&nodes), vec![None, Some("1"), Some("0")]);
    }

    #[test]
    fn self_reference_is_rejected() {
        let root = Container::map_from([("a", 1)]);
        root.set("me", root.clone());
        let err = flatten(&Value::from(root), None, None).unwrap_err();
        assert_eq!(err, ObserveError::CyclicStructure { key: "me".into() });
    }

    #[test]
    fn indirect_cycle_is_rejected() {
        let a = Container::map();
        let b = Container::map();
        a.set("b", b.clone());
        b.set("back", a.clone());
        let root = Container::map_from([("a", Value::from(a))]);
        let err = flatten(&Value::from(root), None, None).unwrap_err();
        assert_eq!(err, ObserveError::CyclicStructure { key: "back".into() });
    }

    #[test]
    fn shared_reference_is_walked_per_path() {
        let shared = Container::map_from([("x", 1)]);
        let root = Container::map_from([
            ("l", Value::from(shared.clone())),
            ("r", Value::from(shared)),
        ]);
        let nodes = flatten(&Value::from(root), None, None).unwrap();
        // root, r, r.x, l, l.x
        assert_eq!(nodes.len(), 5);
    }

    #[test]
    fn paths_follow_parents() {
        let root = Container::map_from([("a", Value::from(Container::map_from([("b", 1)])))]);
        let nodes = flatten(&Value::from(root), None, Some("root")).unwrap();
        let leaf = nodes.iter().position(|n| n.key.as_deref() == Some("b")).unwrap();
        let path = node_path(&nodes, leaf);
        assert_eq!(path.as_slice(), ["root", "a", "b"]);
    }

    mod proptests {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #[test]
            fn one_descriptor_per_property_plus_root(seed in any::<u64>(), depth in 0u32..5, width in 0usize..5) {
                let root = random_tree(seed, depth, width);
                let nodes = flatten(&Value::from(root.clone()), None, None).unwrap();
                prop_assert_eq!(nodes.len(), count_properties(&root) + 1);
            }

            #[test]
            fn every_parent_precedes_its_children(seed in any::<u64>(), depth in 0u32..5, width in 0usize..5) {
                let root = random_tree(seed, depth, width);
                let nodes = flatten(&Value::from(root), None, None).unwrap();
                for (i, node) in nodes.iter().enumerate() {
                    if let Some(p) = node.parent {
                        prop_assert!(p < i);
                        prop_assert!(nodes[p].value.is_container());
                    }
                }
            }
        }
    }
}

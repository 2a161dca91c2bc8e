//! Reusable tree fixtures.
//!
//! - [`nested_fixture`]: a hand-written tree covering every value kind.
//! - [`random_tree`]: seeded random trees for property tests and benches.
//! - [`wide_map`] / [`deep_chain`]: shape extremes.
//! - [`count_properties`]: reference property count for acyclic trees.

use rand::Rng;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

use watchtree_core::{Container, Function, Value};

/// Mixed tree with maps, sequences, null, numbers, empty strings, a
/// function, and empty containers.
///
/// ```text
/// {
///   a: {
///     b: {
///       c: [ {d: ""}, {d1: true}, {d2: "", d3: "string"} ],
///       c1: {}, c2: null, c3: null, c4: 1, c5: 0
///     },
///     b1: [],
///     b2: <function>
///   },
///   a1: ""
/// }
/// ```
pub fn nested_fixture() -> Container {
    let c = Container::seq_from([
        Container::map_from([("d", "")]),
        Container::map_from([("d1", true)]),
        Container::map_from([("d2", ""), ("d3", "string")]),
    ]);
    let b = Container::map_from([
        ("c", Value::from(c)),
        ("c1", Value::from(Container::map())),
        ("c2", Value::Null),
        ("c3", Value::Null),
        ("c4", Value::from(1)),
        ("c5", Value::from(0)),
    ]);
    let a = Container::map_from([
        ("b", Value::from(b)),
        ("b1", Value::from(Container::seq())),
        ("b2", Value::from(Function::new("b2", |_| Value::Null))),
    ]);
    Container::map_from([("a", Value::from(a)), ("a1", Value::from(""))])
}

/// Total own properties reachable from `root`, excluding `root` itself.
///
/// Recursive; only call on acyclic trees.
pub fn count_properties(root: &Container) -> usize {
    root.entries()
        .iter()
        .map(|(_, v)| 1 + v.as_container().map_or(0, count_properties))
        .sum()
}

/// Seeded random tree: up to `width` keys per container, containers
/// nested at most `depth` levels. Leaves are numbers, booleans, strings
/// or null. Same seed, same tree.
pub fn random_tree(seed: u64, depth: u32, width: usize) -> Container {
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    random_container(&mut rng, depth, width)
}

fn random_container(rng: &mut ChaCha8Rng, depth: u32, width: usize) -> Container {
    let container = if rng.gen_bool(0.25) {
        Container::seq()
    } else {
        Container::map()
    };
    let count = if width == 0 { 0 } else { rng.gen_range(0..=width) };
    for i in 0..count {
        let value = if depth > 0 && rng.gen_bool(0.4) {
            Value::from(random_container(rng, depth - 1, width))
        } else {
            random_leaf(rng)
        };
        match container.kind() {
            watchtree_core::ContainerKind::Seq => container.push(value),
            watchtree_core::ContainerKind::Map => container.set(format!("k{i}"), value),
        }
    }
    container
}

fn random_leaf(rng: &mut ChaCha8Rng) -> Value {
    match rng.gen_range(0..4) {
        0 => Value::Null,
        1 => Value::from(rng.gen_bool(0.5)),
        2 => Value::from(rng.gen_range(-1000..1000)),
        _ => Value::from(format!("s{}", rng.gen_range(0..100u32))),
    }
}

/// Flat mapping `{k0: 0, k1: 1, ...}` with `width` keys.
pub fn wide_map(width: usize) -> Container {
    let map = Container::map();
    for i in 0..width {
        map.set(format!("k{i}"), i as f64);
    }
    map
}

/// Chain of `depth` nested mappings, each `{next: {...}, v: depth}`.
/// The innermost mapping is `{v: 0}`.
pub fn deep_chain(depth: u32) -> Container {
    let mut inner = Container::map_from([("v", 0)]);
    for level in 1..=depth {
        inner = Container::map_from([
            ("next", Value::from(inner)),
            ("v", Value::from(level)),
        ]);
    }
    inner
}

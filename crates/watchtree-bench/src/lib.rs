//! Benchmark profiles for the watchtree change-detection workspace.
//!
//! Provides pre-built trees for benchmarking and examples:
//!
//! - [`reference_tree`]: a few thousand properties of mixed shape
//! - [`stress_tree`]: roughly ten times the reference size
//! - [`wide_profile`] / [`deep_profile`]: shape extremes
//! - [`churn_keys`]: deterministic key choices for mutation benches

#![forbid(unsafe_code)]
#![deny(rustdoc::broken_intra_doc_links)]

use watchtree_core::Container;
use watchtree_test_utils::fixtures::{deep_chain, random_tree, wide_map};

/// Seeded random tree, depth 4, up to 8 keys per container.
pub fn reference_tree(seed: u64) -> Container {
    random_tree(seed, 4, 8)
}

/// Seeded random tree, depth 5, up to 12 keys per container.
pub fn stress_tree(seed: u64) -> Container {
    random_tree(seed, 5, 12)
}

/// Flat mapping with 10K keys.
pub fn wide_profile() -> Container {
    wide_map(10_000)
}

/// Chain of 500 nested mappings.
pub fn deep_profile() -> Container {
    deep_chain(500)
}

/// Generate `n` deterministic key indices below `width`.
///
/// Uses a multiplicative hash of the seed so benches touch a spread of
/// keys without pulling in an RNG.
pub fn churn_keys(width: usize, n: usize, seed: u64) -> Vec<usize> {
    if width == 0 {
        return Vec::new();
    }
    (0..n as u64)
        .map(|i| {
            (seed
                .wrapping_mul(6364136223846793005)
                .wrapping_add(i.wrapping_mul(1442695040888963407))
                % width as u64) as usize
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use watchtree_test_utils::fixtures::count_properties;

    #[test]
    fn profiles_are_deterministic() {
        assert_eq!(
            count_properties(&reference_tree(42)),
            count_properties(&reference_tree(42))
        );
        assert_eq!(count_properties(&wide_profile()), 10_000);
        assert_eq!(count_properties(&deep_profile()), 1001);
    }

    #[test]
    fn churn_keys_in_bounds() {
        let keys = churn_keys(100, 1000, 7);
        assert_eq!(keys.len(), 1000);
        assert!(keys.iter().all(|&k| k < 100));
        assert_eq!(keys, churn_keys(100, 1000, 7));
        assert!(churn_keys(0, 10, 7).is_empty());
    }
}

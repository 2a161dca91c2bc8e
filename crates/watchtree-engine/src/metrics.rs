//! Per-tick and per-session counters.
//!
//! [`TickReport`] describes one reconciliation pass; [`SessionMetrics`]
//! accumulates over the lifetime of a session.

/// Outcome of a single reconciliation pass.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct TickReport {
    /// Live nodes examined this pass.
    pub scanned: usize,
    /// Nodes discovered and intercepted this pass.
    pub added: usize,
    /// Nodes whose key disappeared this pass.
    pub deleted: usize,
    /// Nodes released because their subtree left the tree.
    pub pruned: usize,
    /// Live nodes after the pass.
    pub live: usize,
}

/// Cumulative counters for one observation session.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SessionMetrics {
    /// Reconciliation passes completed.
    pub ticks: u64,
    /// `updated` events delivered.
    pub updated_events: u64,
    /// `new` events delivered.
    pub new_events: u64,
    /// `delete` events delivered.
    pub delete_events: u64,
    /// Nodes released because their subtree left the tree.
    pub pruned_nodes: u64,
    /// Nodes tracked after the most recent pass.
    pub live_nodes: usize,
    /// Wall-clock time of the most recent pass, in microseconds.
    pub last_tick_us: u64,
    /// Passes that failed and faulted the session.
    pub faults: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_metrics_are_zero() {
        let m = SessionMetrics::default();
        assert_eq!(m.ticks, 0);
        assert_eq!(m.updated_events, 0);
        assert_eq!(m.new_events, 0);
        assert_eq!(m.delete_events, 0);
        assert_eq!(m.live_nodes, 0);
        assert_eq!(m.last_tick_us, 0);
        assert_eq!(m.faults, 0);
        assert_eq!(m.pruned_nodes, 0);
        assert_eq!(TickReport::default().scanned, 0);
    }
}

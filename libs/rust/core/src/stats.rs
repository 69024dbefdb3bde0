//! Operator counters owned by the caller and threaded through each call.
//!
//! Purely observational: nothing in the operators reads them back.

use std::ops::AddAssign;

use serde::{Deserialize, Serialize};

use crate::prim::IMPROVEMENT_EPSILON;
use crate::tree::RootedTree;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OperatorStats {
    pub invocations: u64,
    /// Calls that returned their input because the probability draw failed.
    pub skipped: u64,
    pub rebuilds: u64,
    pub improved: u64,
    /// Valid rebuilds that did not lower the bottleneck energy.
    pub not_improved: u64,
    /// Rebuilds that left at least one node unreachable.
    pub infeasible: u64,
    /// Rebuilds discarded by the acceptance policy.
    pub rejected: u64,
}

impl OperatorStats {
    pub(crate) fn record_rebuild(&mut self, original: &RootedTree, rebuilt: &RootedTree, accepted: bool) {
        self.rebuilds += 1;
        if !rebuilt.is_valid() {
            self.infeasible += 1;
        } else if rebuilt.max_energy() < original.max_energy() - IMPROVEMENT_EPSILON {
            self.improved += 1;
        } else {
            self.not_improved += 1;
        }
        if !accepted { self.rejected += 1; }
    }

    pub fn merge(&mut self, other: &OperatorStats) {
        self.invocations += other.invocations;
        self.skipped += other.skipped;
        self.rebuilds += other.rebuilds;
        self.improved += other.improved;
        self.not_improved += other.not_improved;
        self.infeasible += other.infeasible;
        self.rejected += other.rejected;
    }

    /// Share of rebuilds that produced a valid tree.
    pub fn feasibility_ratio(&self) -> f64 {
        if self.rebuilds == 0 { return 1.0; }
        (self.rebuilds - self.infeasible) as f64 / self.rebuilds as f64
    }
}

impl AddAssign for OperatorStats {
    fn add_assign(&mut self, rhs: Self) { self.merge(&rhs); }
}

/// Counters for one crossover + mutation pipeline.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BreedingStats {
    pub crossover: OperatorStats,
    pub mutation: OperatorStats,
}

impl AddAssign for BreedingStats {
    fn add_assign(&mut self, rhs: Self) {
        self.crossover += rhs.crossover;
        self.mutation += rhs.mutation;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn merge_adds_fields() {
        let mut a = OperatorStats { invocations: 2, rebuilds: 2, infeasible: 1, ..Default::default() };
        a += OperatorStats { invocations: 1, skipped: 1, ..Default::default() };
        assert_eq!(a.invocations, 3);
        assert_eq!(a.skipped, 1);
        assert!((a.feasibility_ratio() - 0.5).abs() < 1e-12);
        assert_eq!(OperatorStats::default().feasibility_ratio(), 1.0);
    }
}

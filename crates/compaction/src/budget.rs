//! Worker budget derived from CPU topology

use crate::types::AlgorithmTier;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Source of CPU topology
pub trait CpuTopology {
    fn physical_cores(&self) -> usize;
    fn logical_cores(&self) -> usize;
}

/// Topology of the machine we are running on
pub struct SystemTopology;

impl CpuTopology for SystemTopology {
    fn physical_cores(&self) -> usize {
        num_cpus::get_physical()
    }

    fn logical_cores(&self) -> usize {
        num_cpus::get()
    }
}

/// Worker counts for every parallel stage of a run
///
/// Computed once and passed by reference to each stage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkerBudget {
    pub entropy_workers: usize,
    pub execution_workers: BTreeMap<AlgorithmTier, usize>,
    pub forced_single_worker: bool,
}

impl WorkerBudget {
    /// Derive a budget from core counts
    ///
    /// `forced_single` pins every stage to one worker, which keeps a
    /// rotational disk from seeking between concurrent readers.
    pub fn compute(physical_cores: usize, logical_cores: usize, forced_single: bool) -> Self {
        if forced_single {
            return Self::single();
        }

        let logical = logical_cores.max(physical_cores).max(1);
        let physical = physical_cores.max(1);

        let execution_workers = AlgorithmTier::ALL
            .into_iter()
            .map(|tier| {
                let workers = match tier {
                    // LZX saturates a core per file, hyperthreads don't help
                    AlgorithmTier::Lzx => physical,
                    _ => logical,
                };
                (tier, workers)
            })
            .collect();

        Self {
            entropy_workers: logical,
            execution_workers,
            forced_single_worker: false,
        }
    }

    /// Budget for the current machine
    pub fn detect(topology: &impl CpuTopology, forced_single: bool) -> Self {
        Self::compute(
            topology.physical_cores(),
            topology.logical_cores(),
            forced_single,
        )
    }

    /// One worker everywhere
    pub fn single() -> Self {
        Self {
            entropy_workers: 1,
            execution_workers: AlgorithmTier::ALL.into_iter().map(|t| (t, 1)).collect(),
            forced_single_worker: true,
        }
    }

    /// Workers for compressing one tier
    pub fn execution_workers(&self, tier: AlgorithmTier) -> usize {
        self.execution_workers.get(&tier).copied().unwrap_or(1).max(1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct FixedTopology(usize, usize);

    impl CpuTopology for FixedTopology {
        fn physical_cores(&self) -> usize {
            self.0
        }
        fn logical_cores(&self) -> usize {
            self.1
        }
    }

    #[test]
    fn test_forced_single_ignores_topology() {
        let budget = WorkerBudget::compute(16, 32, true);
        assert_eq!(budget.entropy_workers, 1);
        assert!(budget.forced_single_worker);
        for tier in AlgorithmTier::ALL {
            assert_eq!(budget.execution_workers(tier), 1);
        }
    }

    #[test]
    fn test_compute_from_topology() {
        let budget = WorkerBudget::detect(&FixedTopology(4, 8), false);
        assert_eq!(budget.entropy_workers, 8);
        assert_eq!(budget.execution_workers(AlgorithmTier::Xpress4k), 8);
        assert_eq!(budget.execution_workers(AlgorithmTier::Lzx), 4);
        assert!(!budget.forced_single_worker);
    }

    #[test]
    fn test_zero_cores_floor_to_one() {
        let budget = WorkerBudget::compute(0, 0, false);
        assert_eq!(budget.entropy_workers, 1);
        for tier in AlgorithmTier::ALL {
            assert_eq!(budget.execution_workers(tier), 1);
        }
    }

    #[test]
    fn test_system_topology_is_positive() {
        let budget = WorkerBudget::detect(&SystemTopology, false);
        assert!(budget.entropy_workers >= 1);
    }
}

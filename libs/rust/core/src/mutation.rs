//! Detach-and-regrow mutation.
//!
//! A mutation frees part of a tree picked by its [`PerturbationTarget`] and
//! reconnects everything left disconnected with the Prim builder, floored at
//! the original bottleneck.

use rand::Rng;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{config_err, Result};
use crate::individual::{EdgeSetIndividual, TreeCodec};
use crate::network::NodeId;
use crate::prim::{build, Acceptance, EdgePool, RestrictedPool};
use crate::stats::OperatorStats;
use crate::tree::RootedTree;

/// Which part of the tree gets freed before the rebuild.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum PerturbationTarget {
    /// A uniform connected node and its subtree.
    #[default]
    RandomSubtree,
    /// A single uniform leaf.
    Leaf,
    /// A bottleneck node with `probability`, a uniform node otherwise; its
    /// subtree goes with it.
    Bottleneck { probability: f64 },
    /// `count` successive random subtrees.
    MultiSubtree { count: usize },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum PoolPolicy {
    #[default]
    Full,
    /// Only the `k` shortest potential edges of every freed node.
    Nearest { k: usize },
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct MutationStrategy {
    pub target: PerturbationTarget,
    pub pool: PoolPolicy,
}

impl MutationStrategy {
    pub fn random_oriented() -> Self { Self { target: PerturbationTarget::RandomSubtree, pool: PoolPolicy::Full } }
    pub fn adaptive(probability: f64) -> Self { Self { target: PerturbationTarget::Bottleneck { probability }, pool: PoolPolicy::Full } }
    pub fn extended(count: usize) -> Self { Self { target: PerturbationTarget::MultiSubtree { count }, pool: PoolPolicy::Full } }
    pub fn leaf() -> Self { Self { target: PerturbationTarget::Leaf, pool: PoolPolicy::Full } }
    pub fn nearest(k: usize) -> Self { Self { target: PerturbationTarget::RandomSubtree, pool: PoolPolicy::Nearest { k } } }

    pub fn with_pool(mut self, pool: PoolPolicy) -> Self {
        self.pool = pool;
        self
    }

    pub fn validate(&self) -> Result<()> {
        match self.target {
            PerturbationTarget::Bottleneck { probability } if !(0.0..=1.0).contains(&probability) => {
                return Err(config_err(format!("bottleneck probability {probability} outside [0, 1]")));
            }
            PerturbationTarget::MultiSubtree { count: 0 } => return Err(config_err("multi_subtree count must be at least 1")),
            _ => {}
        }
        if self.pool == (PoolPolicy::Nearest { k: 0 }) { return Err(config_err("nearest pool needs k >= 1")); }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Mutation {
    pub probability: f64,
    pub strategy: MutationStrategy,
    pub acceptance: Acceptance,
}

impl Default for Mutation {
    fn default() -> Self { Self { probability: 0.1, strategy: MutationStrategy::default(), acceptance: Acceptance::AlwaysKeep } }
}

impl Mutation {
    pub fn new(probability: f64, strategy: MutationStrategy) -> Result<Self> {
        let op = Self { probability, strategy, ..Default::default() };
        op.validate()?;
        Ok(op)
    }

    pub fn with_acceptance(mut self, acceptance: Acceptance) -> Self {
        self.acceptance = acceptance;
        self
    }

    pub fn validate(&self) -> Result<()> {
        if !(0.0..=1.0).contains(&self.probability) {
            return Err(config_err(format!("mutation probability {} outside [0, 1]", self.probability)));
        }
        if let Acceptance::RejectWorse { tolerance } = self.acceptance {
            if !(tolerance >= 0.0) { return Err(config_err("acceptance tolerance must be non-negative")); }
        }
        self.strategy.validate()
    }

    pub fn mutate<R: Rng + ?Sized>(&self, tree: &RootedTree, rng: &mut R, stats: &mut OperatorStats) -> RootedTree {
        stats.invocations += 1;
        if tree.is_sink_only() || rng.gen::<f64>() >= self.probability {
            stats.skipped += 1;
            return tree.clone();
        }
        let mut child = tree.clone();
        let freed = self.perturb(&mut child, rng);
        let outcome = match self.strategy.pool {
            PoolPolicy::Full => build(&mut child, EdgePool::Full, tree.max_energy(), rng),
            PoolPolicy::Nearest { k } => {
                let pool = RestrictedPool::nearest(child.network(), &child.disconnected_nodes(), k);
                build(&mut child, EdgePool::Restricted(&pool), tree.max_energy(), rng)
            }
        };
        let accepted = self.acceptance.accepts(tree, &child);
        stats.record_rebuild(tree, &child, accepted);
        if accepted {
            child
        } else {
            debug!(freed = freed.len(), stranded = outcome.stranded.len(), energy = outcome.energy, "mutation rebuild rejected");
            tree.clone()
        }
    }

    // Detaches the target's nodes and returns them in detach order.
    fn perturb<R: Rng + ?Sized>(&self, tree: &mut RootedTree, rng: &mut R) -> Vec<NodeId> {
        let picked: Vec<NodeId> = match self.strategy.target {
            PerturbationTarget::RandomSubtree => pick(&tree.connected_non_root(), rng).into_iter().collect(),
            PerturbationTarget::Leaf => pick(&tree.leaves(), rng).into_iter().collect(),
            PerturbationTarget::Bottleneck { probability } => {
                let hot = tree.bottleneck_nodes();
                let node = if !hot.is_empty() && rng.gen::<f64>() < probability { pick(&hot, rng) } else { pick(&tree.connected_non_root(), rng) };
                node.into_iter().collect()
            }
            PerturbationTarget::MultiSubtree { count } => {
                let mut picked = Vec::with_capacity(count);
                for _ in 0..count {
                    let Some(node) = pick(&tree.connected_non_root(), rng) else { break };
                    detach_into(tree, node, &mut picked);
                }
                return picked;
            }
        };
        let mut freed = Vec::new();
        for node in picked { detach_into(tree, node, &mut freed); }
        freed
    }

    pub fn mutate_encoded<R: Rng + ?Sized>(
        &self,
        codec: &TreeCodec,
        individual: &EdgeSetIndividual,
        rng: &mut R,
        stats: &mut OperatorStats,
    ) -> Result<EdgeSetIndividual> {
        let tree = codec.decode(individual)?;
        codec.encode(&self.mutate(&tree, rng, stats))
    }
}

fn pick<R: Rng + ?Sized>(nodes: &[NodeId], rng: &mut R) -> Option<NodeId> {
    match nodes.len() {
        0 => None,
        1 => Some(nodes[0]),
        n => Some(nodes[rng.gen_range(0..n)]),
    }
}

// `node` is always connected and non-root here, so detach cannot fail.
fn detach_into(tree: &mut RootedTree, node: NodeId, freed: &mut Vec<NodeId>) {
    if let Ok(nodes) = tree.detach(node) { freed.extend(nodes); }
}

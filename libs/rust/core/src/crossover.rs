//! Edge-set recombination over the union of both parents' edges.
//!
//! Children are regrown from the sink using only parental edges, so offspring
//! never contain an edge absent from both parents.

use std::sync::Arc;

use rand::Rng;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{config_err, Result};
use crate::individual::{EdgeSetIndividual, TreeCodec};
use crate::prim::{build, Acceptance, EdgePool, RestrictedPool};
use crate::stats::OperatorStats;
use crate::tree::RootedTree;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CrossoverStrategy {
    /// Greedy rebuild that tries to stay at or under each parent's bottleneck.
    #[default]
    Xprim,
    /// Random breadth-first spanning tree over the union pool.
    RandomPrim,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Crossover {
    pub probability: f64,
    pub strategy: CrossoverStrategy,
    pub acceptance: Acceptance,
}

impl Default for Crossover {
    fn default() -> Self { Self { probability: 0.9, strategy: CrossoverStrategy::Xprim, acceptance: Acceptance::AlwaysKeep } }
}

impl Crossover {
    pub fn new(probability: f64, strategy: CrossoverStrategy) -> Result<Self> {
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
            return Err(config_err(format!("crossover probability {} outside [0, 1]", self.probability)));
        }
        if let Acceptance::RejectWorse { tolerance } = self.acceptance {
            if !(tolerance >= 0.0) { return Err(config_err("acceptance tolerance must be non-negative")); }
        }
        Ok(())
    }

    pub fn cross<R: Rng + ?Sized>(&self, a: &RootedTree, b: &RootedTree, rng: &mut R, stats: &mut OperatorStats) -> Result<(RootedTree, RootedTree)> {
        if a.len() != b.len() || a.max_hop() != b.max_hop() {
            return Err(config_err(format!(
                "parents differ: {} nodes / max_hop {} vs {} nodes / max_hop {}",
                a.len(), a.max_hop(), b.len(), b.max_hop()
            )));
        }
        stats.invocations += 1;
        if rng.gen::<f64>() >= self.probability {
            stats.skipped += 1;
            return Ok((a.clone(), b.clone()));
        }
        let union = RestrictedPool::from_edges(a.network(), a.undirected_edges().chain(b.undirected_edges()))?;
        let child_a = self.rebuild(a, &union, rng, stats);
        let child_b = self.rebuild(b, &union, rng, stats);
        Ok((child_a, child_b))
    }

    fn rebuild<R: Rng + ?Sized>(&self, parent: &RootedTree, union: &RestrictedPool, rng: &mut R, stats: &mut OperatorStats) -> RootedTree {
        let incumbent = match self.strategy {
            CrossoverStrategy::Xprim => parent.max_energy(),
            CrossoverStrategy::RandomPrim => f64::INFINITY,
        };
        let mut child = RootedTree::new(Arc::clone(parent.network()), parent.max_hop());
        build(&mut child, EdgePool::Restricted(union), incumbent, rng);
        let accepted = self.acceptance.accepts(parent, &child);
        stats.record_rebuild(parent, &child, accepted);
        if accepted {
            child
        } else {
            debug!(parent_energy = parent.max_energy(), child_energy = child.max_energy(), "crossover rebuild rejected");
            parent.clone()
        }
    }

    /// Decodes both chromosomes, crosses them and re-encodes the children.
    pub fn cross_encoded<R: Rng + ?Sized>(
        &self,
        codec: &TreeCodec,
        a: &EdgeSetIndividual,
        b: &EdgeSetIndividual,
        rng: &mut R,
        stats: &mut OperatorStats,
    ) -> Result<(EdgeSetIndividual, EdgeSetIndividual)> {
        let (ta, tb) = (codec.decode(a)?, codec.decode(b)?);
        let (ca, cb) = self.cross(&ta, &tb, rng, stats)?;
        Ok((codec.encode(&ca)?, codec.encode(&cb)?))
    }
}

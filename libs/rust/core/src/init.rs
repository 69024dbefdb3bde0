//! Population seeding with the Prim builder over the full potential graph.

use std::sync::Arc;

use rand::Rng;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{config_err, Result};
use crate::network::Network;
use crate::prim::{build, EdgePool};
use crate::tree::RootedTree;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum InitMethod {
    /// Uniform random spanning trees.
    RandomPrim,
    /// Greedy bottleneck minimisation with random tie-breaks.
    GreedyPrim,
    /// The first `greedy_ratio` share of the population greedy, the rest random.
    Mixed { greedy_ratio: f64 },
}

impl Default for InitMethod {
    fn default() -> Self { InitMethod::Mixed { greedy_ratio: 0.1 } }
}

impl InitMethod {
    pub fn validate(&self) -> Result<()> {
        match *self {
            InitMethod::Mixed { greedy_ratio } if !(0.0..=1.0).contains(&greedy_ratio) => {
                Err(config_err(format!("greedy_ratio {greedy_ratio} outside [0, 1]")))
            }
            _ => Ok(()),
        }
    }

    fn greedy_count(&self, size: usize) -> usize {
        match *self {
            InitMethod::RandomPrim => 0,
            InitMethod::GreedyPrim => size,
            InitMethod::Mixed { greedy_ratio } => ((size as f64) * greedy_ratio).round() as usize,
        }
    }
}

pub fn initialize_population<R: Rng + ?Sized>(network: &Arc<Network>, max_hop: usize, size: usize, method: InitMethod, rng: &mut R) -> Result<Vec<RootedTree>> {
    method.validate()?;
    if max_hop == 0 { return Err(config_err("max_hop must be at least 1")); }
    let greedy = method.greedy_count(size).min(size);
    let mut population = Vec::with_capacity(size);
    let mut invalid = 0usize;
    for i in 0..size {
        let incumbent = if i < greedy { 0.0 } else { f64::INFINITY };
        let mut tree = RootedTree::new(Arc::clone(network), max_hop);
        if !build(&mut tree, EdgePool::Full, incumbent, rng).is_complete() { invalid += 1; }
        population.push(tree);
    }
    debug!(size, greedy, invalid, "population initialized");
    Ok(population)
}

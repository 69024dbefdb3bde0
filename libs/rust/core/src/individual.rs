//! Edge-set chromosome used by the evolutionary engine.
//!
//! A chromosome is the sorted list of gene ids (indices into the network's
//! potential-edge list) of a tree's edges. Decoding orients the edges away from
//! the sink breadth-first.

use std::collections::VecDeque;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::error::{config_err, Result, TopologyError};
use crate::network::{Network, NodeRole};
use crate::tree::RootedTree;

#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct EdgeSetIndividual { genes: Vec<usize> }

impl EdgeSetIndividual {
    /// Genes are kept sorted, so equal edge sets compare equal.
    pub fn new(mut genes: Vec<usize>) -> Self {
        genes.sort_unstable();
        Self { genes }
    }

    pub fn genes(&self) -> &[usize] { &self.genes }
}

/// Objectives handed back to the engine.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Objectives {
    pub num_used_relays: usize,
    pub max_energy_consumption: f64,
    pub is_valid: bool,
}

impl Objectives {
    pub fn of(tree: &RootedTree) -> Self {
        Self { num_used_relays: tree.num_used_relays(), max_energy_consumption: tree.max_energy(), is_valid: tree.is_valid() }
    }

    /// `[relays, energy]` to minimise; invalid trees score infinity on both.
    pub fn minimization_vector(&self) -> [f64; 2] {
        if self.is_valid { [self.num_used_relays as f64, self.max_energy_consumption] } else { [f64::INFINITY; 2] }
    }
}

#[derive(Debug, Clone)]
pub struct TreeCodec {
    network: Arc<Network>,
    max_hop: usize,
}

impl TreeCodec {
    pub fn new(network: Arc<Network>, max_hop: usize) -> Result<Self> {
        if max_hop == 0 { return Err(config_err("max_hop must be at least 1")); }
        Ok(Self { network, max_hop })
    }

    pub fn network(&self) -> &Arc<Network> { &self.network }
    pub fn max_hop(&self) -> usize { self.max_hop }

    pub fn encode(&self, tree: &RootedTree) -> Result<EdgeSetIndividual> {
        if tree.len() != self.network.len() {
            return Err(config_err(format!("tree has {} nodes, network has {}", tree.len(), self.network.len())));
        }
        let genes = tree.undirected_edges()
            .map(|e| self.network.edge_id(e.0, e.1).ok_or(TopologyError::EdgeNotInPool(e.0, e.1)))
            .collect::<Result<Vec<_>>>()?;
        Ok(EdgeSetIndividual::new(genes))
    }

    pub fn decode(&self, individual: &EdgeSetIndividual) -> Result<RootedTree> {
        let n = self.network.len();
        let genes = individual.genes();
        if genes.len() >= n {
            return Err(TopologyError::NotTreeShaped(format!("{} edges for {} nodes", genes.len(), n)));
        }
        if let Some(w) = genes.windows(2).find(|w| w[0] == w[1]) {
            return Err(TopologyError::NotTreeShaped(format!("duplicate gene {}", w[0])));
        }
        let mut adjacency = vec![Vec::new(); n];
        for &g in genes {
            let e = self.network.edge(g).ok_or_else(|| TopologyError::NotTreeShaped(format!("unknown gene {g}")))?;
            adjacency[e.0].push(e.1);
            adjacency[e.1].push(e.0);
        }

        let mut tree = RootedTree::new(Arc::clone(&self.network), self.max_hop);
        let mut queue = VecDeque::from([0]);
        while let Some(u) = queue.pop_front() {
            for &v in &adjacency[u] {
                if tree.parent(u) == Some(v) { continue; }
                if tree.is_connected(v) {
                    return Err(TopologyError::NotTreeShaped(format!("cycle through node {v}")));
                }
                if self.network.role(u) == NodeRole::Sensor {
                    return Err(TopologyError::NotTreeShaped(format!("sensor {u} would forward for node {v}")));
                }
                tree.attach(v, u)?;
                queue.push_back(v);
            }
        }
        if tree.connected_count() - 1 != genes.len() {
            return Err(TopologyError::NotTreeShaped("some edges are not reachable from the sink".into()));
        }
        Ok(tree)
    }

    pub fn evaluate(&self, individual: &EdgeSetIndividual) -> Result<Objectives> { Ok(Objectives::of(&self.decode(individual)?)) }
}

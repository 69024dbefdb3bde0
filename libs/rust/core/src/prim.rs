//! Constrained Prim builder shared by every crossover and mutation operator.
//!
//! The builder grows the connected part of a tree over its disconnected nodes,
//! one pool edge at a time. Each step scores every frontier candidate by the
//! bottleneck the tree would have after the attachment, floored at the current
//! bottleneck and at the caller's incumbent, and picks among the lowest-scoring
//! candidates uniformly at random. The random source is only touched when more
//! than one candidate ties.
//!
//! * `incumbent = f64::INFINITY` makes every candidate tie: a uniform random
//!   spanning tree (PrimRST).
//! * `incumbent = parent energy` keeps the rebuild at or under the parent's
//!   bottleneck whenever the pool allows it (X-Prim).
//! * `incumbent = 0.0` is plain greedy bottleneck minimisation.

use std::sync::Arc;

use rand::Rng;
use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

use crate::error::{Result, TopologyError};
use crate::network::{Edge, Network, Neighbor, NodeId};
use crate::tree::RootedTree;

/// Scores closer than this are treated as equal.
pub const TIE_EPSILON: f64 = 1e-12;
/// Minimum drop in bottleneck energy that counts as an improvement.
pub const IMPROVEMENT_EPSILON: f64 = 1e-10;

/// Explicit edge set, e.g. the union of two parents' edges.
#[derive(Debug, Clone)]
pub struct RestrictedPool {
    adjacency: Vec<Vec<Neighbor>>,
    edges: Vec<Edge>,
}

impl RestrictedPool {
    /// Deduplicates `edges`; every edge must belong to the potential graph.
    pub fn from_edges<I>(network: &Network, edges: I) -> Result<Self>
    where I: IntoIterator<Item = Edge> {
        let mut edges: Vec<Edge> = edges.into_iter().map(|e| Edge::new(e.0, e.1)).collect();
        edges.sort_unstable();
        edges.dedup();
        let mut adjacency = vec![Vec::new(); network.len()];
        for e in &edges {
            let distance = network.distance(e.0, e.1).ok_or(TopologyError::EdgeNotInPool(e.0, e.1))?;
            adjacency[e.0].push(Neighbor { node: e.1, distance });
            adjacency[e.1].push(Neighbor { node: e.0, distance });
        }
        for list in adjacency.iter_mut() {
            list.sort_by(|a, b| a.distance.total_cmp(&b.distance).then(a.node.cmp(&b.node)));
        }
        Ok(Self { adjacency, edges })
    }

    /// The `k` shortest potential edges of each listed node.
    pub fn nearest(network: &Network, nodes: &[NodeId], k: usize) -> Self {
        let edges: Vec<Edge> = nodes.iter()
            .flat_map(|&v| network.neighbors(v).iter().take(k).map(move |nb| Edge::new(v, nb.node)))
            .collect();
        // every edge comes from the network's own adjacency
        match Self::from_edges(network, edges) {
            Ok(pool) => pool,
            Err(_) => Self { adjacency: vec![Vec::new(); network.len()], edges: Vec::new() },
        }
    }

    pub fn edges(&self) -> &[Edge] { &self.edges }
    pub fn len(&self) -> usize { self.edges.len() }
    pub fn is_empty(&self) -> bool { self.edges.is_empty() }
    pub fn contains(&self, u: NodeId, v: NodeId) -> bool { self.edges.binary_search(&Edge::new(u, v)).is_ok() }
}

/// Edges a single build may use.
#[derive(Debug, Clone, Copy)]
pub enum EdgePool<'a> {
    Full,
    Restricted(&'a RestrictedPool),
}

impl<'a> EdgePool<'a> {
    fn neighbors<'n>(&self, network: &'n Network, node: NodeId) -> &'n [Neighbor]
    where 'a: 'n {
        match *self {
            EdgePool::Full => network.neighbors(node),
            EdgePool::Restricted(pool) => &pool.adjacency[node],
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct BuildOutcome {
    pub attached: usize,
    /// Nodes that could not be reconnected within the hop limit and pool.
    pub stranded: Vec<NodeId>,
    pub incumbent: f64,
    pub energy: f64,
}

impl BuildOutcome {
    pub fn is_complete(&self) -> bool { self.stranded.is_empty() }
}

#[derive(Debug, Clone, Copy)]
struct Candidate { parent: NodeId, child: NodeId, distance: f64 }

/// Reconnects every disconnected node of `tree` using edges from `pool`.
pub fn build<R: Rng + ?Sized>(tree: &mut RootedTree, pool: EdgePool<'_>, incumbent: f64, rng: &mut R) -> BuildOutcome {
    let network = Arc::clone(tree.network());
    let mut frontier: Vec<Candidate> = Vec::new();
    for v in tree.disconnected_nodes() {
        for nb in pool.neighbors(&network, v) {
            if tree.can_adopt(nb.node) {
                frontier.push(Candidate { parent: nb.node, child: v, distance: nb.distance });
            }
        }
    }

    let mut ties: Vec<usize> = Vec::new();
    let mut attached = 0;
    loop {
        frontier.retain(|c| !tree.is_connected(c.child));
        if frontier.is_empty() { break; }

        let floor = tree.max_energy().max(incumbent);
        let (mut best, mut best_depth) = (f64::INFINITY, usize::MAX);
        ties.clear();
        for (i, c) in frontier.iter().enumerate() {
            let score = tree.projected_max_energy(c.child, c.parent, c.distance).max(floor);
            let depth = tree.depth(c.parent).map_or(usize::MAX, |d| d + 1);
            let level = score <= best + TIE_EPSILON;
            if score < best - TIE_EPSILON || (level && depth < best_depth) {
                best = score;
                best_depth = depth;
                ties.clear();
                ties.push(i);
            } else if level && depth == best_depth {
                ties.push(i);
            }
        }
        let pick = if ties.len() == 1 { ties[0] } else { ties[rng.gen_range(0..ties.len())] };
        let chosen = frontier.swap_remove(pick);
        tree.link(chosen.child, chosen.parent, chosen.distance);
        attached += 1;

        if tree.can_adopt(chosen.child) {
            for nb in pool.neighbors(&network, chosen.child) {
                if !tree.is_connected(nb.node) {
                    frontier.push(Candidate { parent: chosen.child, child: nb.node, distance: nb.distance });
                }
            }
        }
    }

    let stranded = tree.disconnected_nodes();
    if !stranded.is_empty() {
        debug!(stranded = stranded.len(), max_hop = tree.max_hop(), "rebuild left nodes unreachable");
    }
    trace!(attached, energy = tree.max_energy(), incumbent, "prim build finished");
    BuildOutcome { attached, stranded, incumbent, energy: tree.max_energy() }
}

/// Whether an operator keeps a rebuilt tree or falls back to the original.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(tag = "policy", rename_all = "snake_case")]
pub enum Acceptance {
    #[default]
    AlwaysKeep,
    /// Keep only valid rebuilds whose bottleneck stays within `tolerance` of the
    /// original's (any valid rebuild replaces an invalid original).
    RejectWorse { tolerance: f64 },
}

impl Acceptance {
    pub fn accepts(&self, original: &RootedTree, rebuilt: &RootedTree) -> bool {
        match *self {
            Acceptance::AlwaysKeep => true,
            Acceptance::RejectWorse { tolerance } => {
                rebuilt.is_valid() && (!original.is_valid() || rebuilt.max_energy() <= original.max_energy() + tolerance)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::energy::EnergyModel;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    fn scenario() -> Arc<Network> {
        Arc::new(Network::from_edges(2, 2, [(0, 1, 10.0), (0, 2, 12.0), (1, 3, 5.0), (2, 3, 6.0), (1, 4, 7.0), (2, 4, 4.0)], EnergyModel::default()).unwrap())
    }

    #[test]
    fn greedy_spreads_sensors_over_relays() {
        let net = scenario();
        for seed in 0..20 {
            let mut tree = RootedTree::new(Arc::clone(&net), 2);
            let outcome = build(&mut tree, EdgePool::Full, 0.0, &mut ChaCha8Rng::seed_from_u64(seed));
            assert!(outcome.is_complete());
            assert!(tree.is_valid());
            assert_eq!(tree.children(1).len(), 1, "seed {seed}: relay 1 keeps one sensor");
            assert_eq!(tree.num_used_relays(), 2);
            let expected = net.energy().node_energy(crate::network::NodeRole::Relay, 12.0, 1);
            assert!((tree.max_energy() - expected).abs() < 1e-15);
        }
    }

    #[test]
    fn hop_limit_strands_sensors() {
        let mut tree = RootedTree::new(scenario(), 1);
        let outcome = build(&mut tree, EdgePool::Full, f64::INFINITY, &mut ChaCha8Rng::seed_from_u64(7));
        assert_eq!(outcome.stranded, vec![3, 4]);
        assert_eq!(outcome.attached, 2);
        assert!(!tree.is_valid());
    }

    #[test]
    fn restricted_pool_limits_reach() {
        let net = scenario();
        let pool = RestrictedPool::from_edges(&net, [Edge(0, 1), Edge(3, 1), Edge(1, 3)]).unwrap();
        assert_eq!(pool.len(), 2);
        assert!(pool.contains(3, 1));
        let mut tree = RootedTree::new(net, 2);
        let outcome = build(&mut tree, EdgePool::Restricted(&pool), 0.0, &mut ChaCha8Rng::seed_from_u64(1));
        assert_eq!(outcome.stranded, vec![2, 4]);
    }

    #[test]
    fn restricted_pool_rejects_foreign_edges() {
        let net = scenario();
        assert!(matches!(RestrictedPool::from_edges(&net, [Edge(3, 4)]), Err(TopologyError::EdgeNotInPool(3, 4))));
    }

    #[test]
    fn single_candidate_steps_do_not_draw() {
        // a path leaves exactly one candidate per step
        let net = Arc::new(Network::from_edges(2, 1, [(0, 1, 3.0), (1, 2, 3.0), (2, 3, 3.0)], EnergyModel::default()).unwrap());
        let mut rng = ChaCha8Rng::seed_from_u64(99);
        let mut untouched = rng.clone();
        let mut tree = RootedTree::new(net, 3);
        build(&mut tree, EdgePool::Full, 0.0, &mut rng);
        assert!(tree.is_valid());
        assert_eq!(rng.gen::<u64>(), untouched.gen::<u64>());
    }

    #[test]
    fn tied_relays_are_placed_breadth_first() {
        // relay 2 under relay 1 would sit at the hop limit and strand sensor 3
        let net = Arc::new(Network::from_edges(2, 1, [(0, 1, 5.0), (0, 2, 5.0), (1, 2, 5.0), (2, 3, 5.0)], EnergyModel::default()).unwrap());
        for incumbent in [0.0, f64::INFINITY] {
            for seed in 0..200 {
                let mut tree = RootedTree::new(Arc::clone(&net), 2);
                let outcome = build(&mut tree, EdgePool::Full, incumbent, &mut ChaCha8Rng::seed_from_u64(seed));
                assert!(outcome.is_complete(), "incumbent {incumbent} seed {seed}");
                assert_eq!((tree.depth(1), tree.depth(2), tree.depth(3)), (Some(1), Some(1), Some(2)));
            }
        }
    }

    #[test]
    fn nearest_pool_keeps_k_edges_per_node() {
        let net = scenario();
        let pool = RestrictedPool::nearest(&net, &[4], 1);
        assert_eq!(pool.edges(), &[Edge(2, 4)]);
    }

    #[test]
    fn reject_worse_policy() {
        let net = scenario();
        let mut good = RootedTree::new(Arc::clone(&net), 2);
        build(&mut good, EdgePool::Full, 0.0, &mut ChaCha8Rng::seed_from_u64(3));
        let mut worse = RootedTree::new(Arc::clone(&net), 2);
        for (c, p) in [(1, 0), (2, 0), (3, 1), (4, 1)] { worse.attach(c, p).unwrap(); }
        assert!(worse.max_energy() > good.max_energy());
        let policy = Acceptance::RejectWorse { tolerance: 0.0 };
        assert!(!policy.accepts(&good, &worse));
        assert!(policy.accepts(&worse, &good));
        assert!(Acceptance::AlwaysKeep.accepts(&good, &worse));
        assert!(!policy.accepts(&good, &RootedTree::new(net, 2)));
    }
}

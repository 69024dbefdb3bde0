//! Rooted spanning tree over sink, relays and sensors.
//!
//! Nodes outside the tree have no parent and no children. Each connected node
//! caches its depth, its active-child load and its energy; the bottleneck (max
//! node energy) is cached as well and only ever grows on `attach`.

use std::sync::Arc;

use crate::error::{Result, TopologyError};
use crate::network::{Edge, Network, NodeId, NodeRole};

#[derive(Debug, Clone)]
pub struct RootedTree {
    network: Arc<Network>,
    max_hop: usize,
    parent: Vec<Option<NodeId>>,
    parent_distance: Vec<f64>,
    depth: Vec<Option<usize>>,
    children: Vec<Vec<NodeId>>,
    load: Vec<usize>,
    energy: Vec<f64>,
    max_energy: f64,
    connected: usize,
}

impl PartialEq for RootedTree {
    fn eq(&self, other: &Self) -> bool { self.max_hop == other.max_hop && self.parent == other.parent }
}

impl RootedTree {
    /// A tree holding only the sink.
    pub fn new(network: Arc<Network>, max_hop: usize) -> Self {
        let n = network.len();
        let mut depth = vec![None; n];
        depth[0] = Some(0);
        Self {
            network,
            max_hop,
            parent: vec![None; n],
            parent_distance: vec![0.0; n],
            depth,
            children: vec![Vec::new(); n],
            load: vec![0; n],
            energy: vec![0.0; n],
            max_energy: 0.0,
            connected: 1,
        }
    }

    pub fn network(&self) -> &Arc<Network> { &self.network }
    pub fn max_hop(&self) -> usize { self.max_hop }
    pub fn len(&self) -> usize { self.parent.len() }
    /// Only the sink is connected.
    pub fn is_sink_only(&self) -> bool { self.connected == 1 }
    pub fn connected_count(&self) -> usize { self.connected }

    pub fn parent(&self, node: NodeId) -> Option<NodeId> { self.parent[node] }
    pub fn depth(&self, node: NodeId) -> Option<usize> { self.depth[node] }
    pub fn children(&self, node: NodeId) -> &[NodeId] { &self.children[node] }
    pub fn is_connected(&self, node: NodeId) -> bool { self.depth[node].is_some() }
    pub fn node_energy(&self, node: NodeId) -> f64 { self.energy[node] }
    pub fn max_energy(&self) -> f64 { self.max_energy }

    fn is_active(&self, node: NodeId) -> bool { self.network.role(node) == NodeRole::Sensor || self.load[node] > 0 }

    /// Connected, not a sensor, and still below the hop limit.
    pub fn can_adopt(&self, node: NodeId) -> bool {
        match self.depth[node] {
            Some(d) => d < self.max_hop && self.network.role(node) != NodeRole::Sensor,
            None => false,
        }
    }

    pub fn is_valid(&self) -> bool {
        self.connected == self.len() && self.depth.iter().all(|d| matches!(d, Some(d) if *d <= self.max_hop))
    }

    /// Relays currently forwarding sensor traffic.
    pub fn num_used_relays(&self) -> usize { self.network.relays().filter(|&r| self.load[r] > 0).count() }

    /// Parent->child pairs ordered by child id.
    pub fn edges(&self) -> Vec<(NodeId, NodeId)> {
        self.parent.iter().enumerate().filter_map(|(c, p)| p.map(|p| (p, c))).collect()
    }

    pub fn undirected_edges(&self) -> impl Iterator<Item = Edge> + '_ {
        self.parent.iter().enumerate().filter_map(|(c, p)| p.map(|p| Edge::new(p, c)))
    }

    pub fn disconnected_nodes(&self) -> Vec<NodeId> { (0..self.len()).filter(|&v| !self.is_connected(v)).collect() }

    pub fn connected_non_root(&self) -> Vec<NodeId> { (1..self.len()).filter(|&v| self.is_connected(v)).collect() }

    pub fn leaves(&self) -> Vec<NodeId> {
        (1..self.len()).filter(|&v| self.is_connected(v) && self.children[v].is_empty()).collect()
    }

    /// Nodes whose energy equals the bottleneck; empty while nothing is active.
    pub fn bottleneck_nodes(&self) -> Vec<NodeId> {
        if self.max_energy <= 0.0 { return Vec::new(); }
        (1..self.len()).filter(|&v| self.energy[v] == self.max_energy).collect()
    }

    pub fn attach(&mut self, child: NodeId, parent: NodeId) -> Result<()> {
        let n = self.len();
        for node in [child, parent] {
            if node >= n { return Err(TopologyError::NodeOutOfRange { node, len: n }); }
        }
        if child == 0 { return Err(TopologyError::RootMutation); }
        if self.is_connected(child) { return Err(TopologyError::AlreadyConnected(child)); }
        if !self.is_connected(parent) { return Err(TopologyError::Disconnected(parent)); }
        if self.network.role(parent) == NodeRole::Sensor { return Err(TopologyError::SensorParent(parent)); }
        let distance = self.network.distance(child, parent).ok_or(TopologyError::EdgeNotInPool(parent, child))?;
        self.link(child, parent, distance);
        Ok(())
    }

    /// Unchecked attach used by the builder, which only proposes legal pool edges.
    pub(crate) fn link(&mut self, child: NodeId, parent: NodeId, distance: f64) {
        debug_assert!(!self.is_connected(child) && self.is_connected(parent));
        self.parent[child] = Some(parent);
        self.parent_distance[child] = distance;
        self.depth[child] = self.depth[parent].map(|d| d + 1);
        self.children[parent].push(child);
        self.connected += 1;
        if self.network.role(child) == NodeRole::Sensor {
            self.refresh(child);
            self.bump_load(parent);
        }
    }

    fn refresh(&mut self, node: NodeId) {
        let e = self.network.energy().node_energy(self.network.role(node), self.parent_distance[node], self.load[node]);
        self.energy[node] = e;
        self.max_energy = self.max_energy.max(e);
    }

    // A newly active child raises the load of each ancestor up to the first one
    // that was already active.
    fn bump_load(&mut self, mut node: NodeId) {
        loop {
            let was_active = self.is_active(node);
            self.load[node] += 1;
            self.refresh(node);
            if was_active || node == 0 { break; }
            match self.parent[node] { Some(p) => node = p, None => break }
        }
    }

    fn drop_load(&mut self, mut node: NodeId) {
        loop {
            self.load[node] -= 1;
            self.energy[node] = self.network.energy().node_energy(self.network.role(node), self.parent_distance[node], self.load[node]);
            if self.is_active(node) || node == 0 { break; }
            match self.parent[node] { Some(p) => node = p, None => break }
        }
    }

    /// Bottleneck the tree would have after `link(child, parent, distance)`.
    pub fn projected_max_energy(&self, child: NodeId, parent: NodeId, distance: f64) -> f64 {
        let model = self.network.energy();
        if self.network.role(child) != NodeRole::Sensor { return self.max_energy; }
        let mut peak = model.node_energy(NodeRole::Sensor, distance, 0);
        let mut node = parent;
        while node != 0 {
            peak = peak.max(model.node_energy(self.network.role(node), self.parent_distance[node], self.load[node] + 1));
            if self.is_active(node) { break; }
            match self.parent[node] { Some(p) => node = p, None => break }
        }
        self.max_energy.max(peak)
    }

    /// Disconnects `node` and its whole subtree; returns the freed nodes
    /// breadth-first, starting with `node`.
    pub fn detach(&mut self, node: NodeId) -> Result<Vec<NodeId>> {
        if node >= self.len() { return Err(TopologyError::NodeOutOfRange { node, len: self.len() }); }
        if node == 0 { return Err(TopologyError::RootMutation); }
        let Some(parent) = self.parent[node] else { return Ok(Vec::new()) };
        let was_active = self.is_active(node);
        self.children[parent].retain(|&c| c != node);

        let mut freed = vec![node];
        let mut head = 0;
        while head < freed.len() {
            let u = freed[head];
            head += 1;
            freed.extend_from_slice(&self.children[u]);
        }
        for &u in &freed {
            self.parent[u] = None;
            self.parent_distance[u] = 0.0;
            self.depth[u] = None;
            self.children[u].clear();
            self.load[u] = 0;
            self.energy[u] = 0.0;
        }
        self.connected -= freed.len();
        if was_active { self.drop_load(parent); }
        self.max_energy = self.energy.iter().copied().fold(0.0, f64::max);
        Ok(freed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::energy::EnergyModel;

    // relays 1, 2 (2 hangs off 1 or the sink), sensors 3, 4
    fn chain_network() -> Arc<Network> {
        Arc::new(Network::from_edges(2, 2, [(0, 1, 10.0), (1, 2, 8.0), (0, 2, 12.0), (2, 3, 5.0), (1, 4, 7.0)], EnergyModel::default()).unwrap())
    }

    fn chain_tree() -> RootedTree {
        let mut t = RootedTree::new(chain_network(), 3);
        t.attach(1, 0).unwrap();
        t.attach(2, 1).unwrap();
        t.attach(3, 2).unwrap();
        t
    }

    #[test]
    fn sensor_activates_idle_ancestors() {
        let mut t = RootedTree::new(chain_network(), 3);
        t.attach(1, 0).unwrap();
        t.attach(2, 1).unwrap();
        assert_eq!(t.max_energy(), 0.0);
        assert_eq!(t.num_used_relays(), 0);
        t.attach(3, 2).unwrap();
        assert_eq!(t.num_used_relays(), 2);
        assert_eq!(t.depth(3), Some(3));
        let m = EnergyModel::default();
        assert!((t.node_energy(1) - m.node_energy(NodeRole::Relay, 10.0, 1)).abs() < 1e-15);
        assert!((t.max_energy() - m.max_energy_consumption(&t)).abs() < 1e-15);
    }

    #[test]
    fn projection_matches_attach() {
        let mut t = chain_tree();
        let projected = t.projected_max_energy(4, 1, 7.0);
        t.attach(4, 1).unwrap();
        assert!((projected - t.max_energy()).abs() < 1e-15);
        assert!(t.is_valid());
    }

    #[test]
    fn detach_frees_subtree_and_deactivates() {
        let mut t = chain_tree();
        t.attach(4, 1).unwrap();
        let freed = t.detach(2).unwrap();
        assert_eq!(freed, vec![2, 3]);
        assert!(!t.is_connected(3));
        assert!(t.children(2).is_empty());
        assert_eq!(t.num_used_relays(), 1);
        assert!((t.max_energy() - EnergyModel::default().max_energy_consumption(&t)).abs() < 1e-15);
        assert!(!t.is_valid());
        assert_eq!(t.disconnected_nodes(), vec![2, 3]);
        assert!(t.detach(3).unwrap().is_empty());
    }

    #[test]
    fn rejects_illegal_attachments() {
        let mut t = chain_tree();
        assert!(matches!(t.attach(0, 1), Err(TopologyError::RootMutation)));
        assert!(matches!(t.attach(2, 0), Err(TopologyError::AlreadyConnected(2))));
        assert!(matches!(t.attach(4, 3), Err(TopologyError::SensorParent(3))));
        assert!(matches!(t.attach(4, 2), Err(TopologyError::EdgeNotInPool(2, 4))));
        assert!(matches!(t.detach(0), Err(TopologyError::RootMutation)));
        let mut fresh = RootedTree::new(chain_network(), 3);
        assert!(matches!(fresh.attach(3, 2), Err(TopologyError::Disconnected(2))));
    }

    #[test]
    fn edges_ordered_by_child() {
        let t = chain_tree();
        assert_eq!(t.edges(), vec![(0, 1), (1, 2), (2, 3)]);
        assert_eq!(t.leaves(), vec![3]);
        let copy = t.clone();
        assert_eq!(copy, t);
    }
}

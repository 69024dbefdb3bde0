//! Network description and the potential-edge graph.
//!
//! Node 0 is the sink, ids `1..=relays` are relays and the rest are sensors. The
//! pool never contains sensor-sensor edges, so a sensor can only ever be a leaf.

use std::collections::HashMap;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::energy::EnergyModel;
use crate::error::{config_err, Result, TopologyError};

pub type NodeId = usize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeRole { Sink, Relay, Sensor }

/// Undirected edge, always stored with the smaller id first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Edge(pub NodeId, pub NodeId);

impl Edge {
    pub fn new(u: NodeId, v: NodeId) -> Self { if u <= v { Edge(u, v) } else { Edge(v, u) } }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Neighbor { pub node: NodeId, pub distance: f64 }

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
    #[serde(default)]
    pub z: f64,
}

impl Point {
    pub fn distance(&self, other: &Point) -> f64 {
        ((self.x - other.x).powi(2) + (self.y - other.y).powi(2) + (self.z - other.z).powi(2)).sqrt()
    }
}

/// On-disk network description (JSON).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NetworkInput {
    /// Transmission range; pairs farther apart are not linkable.
    pub radius: f64,
    pub sink: Point,
    pub relays: Vec<Point>,
    pub sensors: Vec<Point>,
    #[serde(default)]
    pub energy: EnergyModel,
}

impl NetworkInput {
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&text)?)
    }
}

#[derive(Debug, Clone)]
pub struct Network {
    num_relays: usize,
    num_sensors: usize,
    energy: EnergyModel,
    edges: Vec<Edge>,
    distances: Vec<f64>,
    edge_ids: HashMap<Edge, usize>,
    adjacency: Vec<Vec<Neighbor>>,
}

impl Network {
    /// Builds the potential graph from explicit `(u, v, distance)` triples.
    ///
    /// Duplicates (in either orientation) collapse to the shortest distance.
    pub fn from_edges<I>(num_relays: usize, num_sensors: usize, edges: I, energy: EnergyModel) -> Result<Self>
    where I: IntoIterator<Item = (NodeId, NodeId, f64)> {
        let n = 1 + num_relays + num_sensors;
        let sensor_start = 1 + num_relays;
        let mut raw: Vec<(Edge, f64)> = Vec::new();
        for (u, v, d) in edges {
            for node in [u, v] {
                if node >= n { return Err(TopologyError::NodeOutOfRange { node, len: n }); }
            }
            if u == v { return Err(config_err(format!("self loop on node {u}"))); }
            if u >= sensor_start && v >= sensor_start {
                return Err(config_err(format!("sensor-sensor edge ({u}, {v}) is not allowed")));
            }
            if !d.is_finite() || d < 0.0 { return Err(config_err(format!("edge ({u}, {v}) has invalid distance {d}"))); }
            raw.push((Edge::new(u, v), d));
        }
        raw.sort_by(|a, b| a.0.cmp(&b.0).then(a.1.total_cmp(&b.1)));
        raw.dedup_by(|later, first| later.0 == first.0);

        let mut adjacency = vec![Vec::new(); n];
        let mut edge_ids = HashMap::with_capacity(raw.len());
        for (id, (e, d)) in raw.iter().enumerate() {
            edge_ids.insert(*e, id);
            adjacency[e.0].push(Neighbor { node: e.1, distance: *d });
            adjacency[e.1].push(Neighbor { node: e.0, distance: *d });
        }
        for list in adjacency.iter_mut() {
            list.sort_by(|a, b| a.distance.total_cmp(&b.distance).then(a.node.cmp(&b.node)));
        }
        let (edges, distances) = raw.into_iter().unzip();
        Ok(Self { num_relays, num_sensors, energy, edges, distances, edge_ids, adjacency })
    }

    /// Links every non sensor-sensor pair within `input.radius`.
    pub fn from_input(input: &NetworkInput) -> Result<Self> {
        if !(input.radius.is_finite() && input.radius > 0.0) {
            return Err(config_err(format!("radius must be positive, got {}", input.radius)));
        }
        let mut points = Vec::with_capacity(1 + input.relays.len() + input.sensors.len());
        points.push(input.sink);
        points.extend_from_slice(&input.relays);
        points.extend_from_slice(&input.sensors);
        let sensor_start = 1 + input.relays.len();

        let mut edges = Vec::new();
        for u in 0..points.len() {
            for v in (u + 1)..points.len() {
                if u >= sensor_start { break; }
                let d = points[u].distance(&points[v]);
                if d <= input.radius { edges.push((u, v, d)); }
            }
        }
        let network = Self::from_edges(input.relays.len(), input.sensors.len(), edges, input.energy)?;
        debug!(nodes = network.len(), edges = network.edge_count(), "potential-edge graph built");
        Ok(network)
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> { Self::from_input(&NetworkInput::from_file(path)?) }

    pub fn len(&self) -> usize { 1 + self.num_relays + self.num_sensors }
    pub fn num_relays(&self) -> usize { self.num_relays }
    pub fn num_sensors(&self) -> usize { self.num_sensors }
    pub fn energy(&self) -> &EnergyModel { &self.energy }

    pub fn role(&self, node: NodeId) -> NodeRole {
        if node == 0 { NodeRole::Sink } else if node <= self.num_relays { NodeRole::Relay } else { NodeRole::Sensor }
    }

    pub fn relays(&self) -> std::ops::RangeInclusive<NodeId> { 1..=self.num_relays }
    pub fn sensors(&self) -> std::ops::Range<NodeId> { (1 + self.num_relays)..self.len() }

    /// Potential edges in gene-id order.
    pub fn edges(&self) -> &[Edge] { &self.edges }
    pub fn edge_count(&self) -> usize { self.edges.len() }
    pub fn edge(&self, id: usize) -> Option<Edge> { self.edges.get(id).copied() }
    pub fn edge_id(&self, u: NodeId, v: NodeId) -> Option<usize> { self.edge_ids.get(&Edge::new(u, v)).copied() }
    pub fn distance(&self, u: NodeId, v: NodeId) -> Option<f64> { self.edge_id(u, v).map(|id| self.distances[id]) }

    /// Pool neighbours of `node`, nearest first.
    pub fn neighbors(&self, node: NodeId) -> &[Neighbor] { &self.adjacency[node] }

    /// Smallest hop limit under which every node can reach the sink.
    ///
    /// Breadth-first from the sink without expanding sensors; `None` when some
    /// node is unreachable.
    pub fn min_feasible_hop(&self) -> Option<usize> {
        let mut depth: Vec<Option<usize>> = vec![None; self.len()];
        depth[0] = Some(0);
        let mut queue = std::collections::VecDeque::from([0]);
        let mut deepest = 0;
        while let Some(u) = queue.pop_front() {
            let du = depth[u]?;
            deepest = deepest.max(du);
            if self.role(u) == NodeRole::Sensor { continue; }
            for nb in self.neighbors(u) {
                if depth[nb.node].is_none() {
                    depth[nb.node] = Some(du + 1);
                    queue.push_back(nb.node);
                }
            }
        }
        if depth.iter().all(Option::is_some) { Some(deepest.max(1)) } else { None }
    }

    /// Uses `configured` when set, otherwise derives the tightest feasible bound.
    pub fn resolve_max_hop(&self, configured: Option<usize>) -> Result<usize> {
        match configured {
            Some(0) => Err(config_err("max_hop must be at least 1")),
            Some(h) => Ok(h),
            None => self.min_feasible_hop()
                .ok_or_else(|| config_err("cannot derive max_hop: some node cannot reach the sink")),
        }
    }
}

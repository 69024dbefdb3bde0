//! First-order radio energy model with in-network aggregation.
//!
//! A node is *active* when it is a sensor or when at least one of its children is
//! active. Active nodes receive one packet per active child, aggregate, and send a
//! single packet to their parent. Idle relays and the sink cost nothing.

use serde::{Deserialize, Serialize};

use crate::network::{NodeId, NodeRole};
use crate::tree::RootedTree;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EnergyModel {
    /// Bits per packet (k).
    pub packet_bits: f64,
    /// Electronics energy, J/bit.
    pub e_elec: f64,
    /// Data aggregation energy, J/bit.
    pub e_da: f64,
    /// Free-space amplifier energy, J/bit/m^2.
    pub e_fs: f64,
    /// Multipath amplifier energy, J/bit/m^4.
    pub e_mp: f64,
}

impl Default for EnergyModel {
    fn default() -> Self { Self { packet_bits: 4000.0, e_elec: 50e-9, e_da: 5e-9, e_fs: 10e-12, e_mp: 0.0013e-12 } }
}

impl EnergyModel {
    /// Distance at which the amplifier switches from free-space to multipath loss.
    pub fn crossover_distance(&self) -> f64 { (self.e_fs / self.e_mp).sqrt() }

    pub fn transmit_energy(&self, distance: f64) -> f64 {
        let amp = if distance < self.crossover_distance() {
            self.e_fs * distance.powi(2)
        } else {
            self.e_mp * distance.powi(4)
        };
        self.packet_bits * (self.e_elec + amp)
    }

    pub fn receive_energy(&self, load: usize) -> f64 { load as f64 * self.packet_bits * (self.e_elec + self.e_da) }

    /// Energy attributable to one node. `load` counts active children only.
    pub fn node_energy(&self, role: NodeRole, parent_distance: f64, load: usize) -> f64 {
        match role {
            NodeRole::Sink => 0.0,
            NodeRole::Relay if load == 0 => 0.0,
            _ => self.receive_energy(load) + self.transmit_energy(parent_distance),
        }
    }

    /// Bottleneck energy of `tree`, recomputed from its structure alone.
    ///
    /// Disconnected nodes contribute nothing; the cached value kept by the tree
    /// must always agree with this.
    pub fn max_energy_consumption(&self, tree: &RootedTree) -> f64 {
        let n = tree.len();
        let mut order: Vec<NodeId> = Vec::with_capacity(n);
        order.push(0);
        let mut head = 0;
        while head < order.len() {
            let u = order[head];
            head += 1;
            order.extend_from_slice(tree.children(u));
        }
        let network = tree.network();
        let mut active = vec![false; n];
        let mut load = vec![0usize; n];
        let mut peak = 0.0f64;
        for &v in order.iter().rev() {
            let role = network.role(v);
            active[v] = role == NodeRole::Sensor || load[v] > 0;
            if v == 0 { continue; }
            if active[v] {
                if let Some(p) = tree.parent(v) { load[p] += 1; }
            }
            let d = tree.parent(v).and_then(|p| network.distance(v, p)).unwrap_or(0.0);
            peak = peak.max(self.node_energy(role, d, load[v]));
        }
        peak
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn idle_relay_and_sink_cost_nothing() {
        let m = EnergyModel::default();
        assert_eq!(m.node_energy(NodeRole::Sink, 10.0, 3), 0.0);
        assert_eq!(m.node_energy(NodeRole::Relay, 10.0, 0), 0.0);
        assert!(m.node_energy(NodeRole::Relay, 10.0, 1) > 0.0);
    }

    #[test]
    fn relay_energy_grows_with_load() {
        let m = EnergyModel::default();
        let one = m.node_energy(NodeRole::Relay, 20.0, 1);
        let two = m.node_energy(NodeRole::Relay, 20.0, 2);
        assert!((two - one - m.receive_energy(1)).abs() < 1e-15);
    }

    #[test]
    fn multipath_beyond_crossover_distance() {
        let m = EnergyModel::default();
        let d0 = m.crossover_distance();
        let far = 2.0 * d0;
        let expected = m.packet_bits * (m.e_elec + m.e_mp * far.powi(4));
        assert!((m.transmit_energy(far) - expected).abs() < 1e-15);
        assert!(m.transmit_energy(far) > m.transmit_energy(d0 * 0.5));
    }
}

#![allow(dead_code)]

use std::sync::Arc;

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use wsn_core::{EnergyModel, Network, NetworkInput, Point};

/// Sink, relays 1 and 2, sensors 3 and 4 with every relay-sensor link.
pub fn scenario_network() -> Arc<Network> {
    Arc::new(Network::from_edges(2, 2, [(0, 1, 10.0), (0, 2, 12.0), (1, 3, 5.0), (2, 3, 6.0), (1, 4, 7.0), (2, 4, 4.0)], EnergyModel::default()).unwrap())
}

/// Relays on a ring around the sink, sensors scattered over an 80x80 field.
/// The radius covers the whole field, so any node can reach the sink directly.
pub fn geometric_network(seed: u64, relays: usize, sensors: usize) -> Arc<Network> {
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    let relays: Vec<Point> = (0..relays)
        .map(|i| {
            let angle = i as f64 / relays as f64 * std::f64::consts::TAU;
            Point { x: 25.0 * angle.cos(), y: 25.0 * angle.sin(), z: 0.0 }
        })
        .collect();
    let sensors: Vec<Point> = (0..sensors)
        .map(|_| Point { x: rng.gen_range(-40.0..40.0), y: rng.gen_range(-40.0..40.0), z: 0.0 })
        .collect();
    let input = NetworkInput { radius: 60.0, sink: Point { x: 0.0, y: 0.0, z: 0.0 }, relays, sensors, energy: EnergyModel::default() };
    Arc::new(Network::from_input(&input).unwrap())
}

/// Relays on three rings (radius 20, 40, 60) around the sink, each sensor
/// within 10 of a random relay. With a range of 25 only the inner ring reaches
/// the sink, so the outer ring is three hops out.
pub fn sparse_network(seed: u64, sensors: usize) -> Arc<Network> {
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    let mut relays = Vec::new();
    for (ring, count) in [(20.0, 6), (40.0, 12), (60.0, 18)] {
        for i in 0..count {
            let angle = i as f64 / count as f64 * std::f64::consts::TAU;
            relays.push(Point { x: ring * angle.cos(), y: ring * angle.sin(), z: 0.0 });
        }
    }
    let sensors: Vec<Point> = (0..sensors)
        .map(|_| {
            let anchor = relays[rng.gen_range(0..relays.len())];
            let (angle, offset) = (rng.gen_range(0.0..std::f64::consts::TAU), rng.gen_range(0.0..10.0));
            Point { x: anchor.x + offset * angle.cos(), y: anchor.y + offset * angle.sin(), z: 0.0 }
        })
        .collect();
    let input = NetworkInput { radius: 25.0, sink: Point { x: 0.0, y: 0.0, z: 0.0 }, relays, sensors, energy: EnergyModel::default() };
    Arc::new(Network::from_input(&input).unwrap())
}

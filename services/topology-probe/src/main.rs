use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use rand::seq::SliceRandom;
use serde::Serialize;
use tracing::{info, warn};
use wsn_core::{init_tracing_with_level, initialize_population, load_config, stream_rng, BreedingStats, Network, Objectives, RootedTree};

#[derive(Debug, Serialize)]
struct ProbeSummary {
    nodes: usize,
    potential_edges: usize,
    max_hop: usize,
    rounds: usize,
    best: Objectives,
    invalid_in_population: usize,
    stats: BreedingStats,
}

fn main() -> Result<()> {
    let cfg = load_config().context("loading probe configuration")?;
    init_tracing_with_level("topology-probe", &cfg.log_level)?;
    let path = std::env::args().nth(1).map(PathBuf::from).or_else(|| cfg.network_file.clone())
        .unwrap_or_else(|| PathBuf::from("services/topology-probe/data/tiny_network.json"));
    let network = Arc::new(Network::from_file(&path).with_context(|| format!("reading network {}", path.display()))?);
    let max_hop = network.resolve_max_hop(cfg.max_hop)?;
    info!(target: "topology-probe", nodes = network.len(), edges = network.edge_count(), max_hop, "network loaded");

    let mut rng = stream_rng(cfg.seed, u64::MAX);
    let size = cfg.probe.population_size;
    let mut population = initialize_population(&network, max_hop, size, cfg.init, &mut rng)?;
    let breeder = cfg.breeder()?;
    let mut totals = BreedingStats::default();

    for round in 0..cfg.probe.rounds {
        let mut order: Vec<usize> = (0..population.len()).collect();
        order.shuffle(&mut rng);
        let pairs: Vec<(usize, usize)> = order.chunks_exact(2).map(|c| (c[0], c[1])).collect();
        let (children, stats) = breeder.breed(&population, &pairs, cfg.seed.wrapping_add(round as u64 + 1))?;
        totals += stats;
        population.extend(children);
        population.sort_by(|a, b| rank(a).partial_cmp(&rank(b)).unwrap_or(std::cmp::Ordering::Equal));
        population.truncate(size);
        let best = Objectives::of(&population[0]);
        info!(
            target: "topology-probe",
            round,
            best_energy = best.max_energy_consumption,
            best_relays = best.num_used_relays,
            improved = stats.crossover.improved + stats.mutation.improved,
            infeasible = stats.crossover.infeasible + stats.mutation.infeasible,
            "round finished"
        );
    }

    let invalid = population.iter().filter(|t| !t.is_valid()).count();
    if invalid > 0 { warn!(target: "topology-probe", invalid, "population still holds invalid trees"); }
    let summary = ProbeSummary {
        nodes: network.len(),
        potential_edges: network.edge_count(),
        max_hop,
        rounds: cfg.probe.rounds,
        best: Objectives::of(&population[0]),
        invalid_in_population: invalid,
        stats: totals,
    };
    println!("{}", serde_json::to_string_pretty(&summary)?);
    Ok(())
}

// Valid trees first, then lower bottleneck energy, then fewer relays.
fn rank(tree: &RootedTree) -> (bool, f64, usize) { (!tree.is_valid(), tree.max_energy(), tree.num_used_relays()) }

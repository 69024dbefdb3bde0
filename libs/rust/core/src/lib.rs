//! Repair and construction of two-tier WSN routing trees.
//!
//! A sink, a set of relays and a set of sensors form a potential-edge graph;
//! the operators here grow, recombine and perturb hop-limited spanning trees
//! over it while keeping the most loaded node's energy low.

use anyhow::Result;
use once_cell::sync::OnceCell;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

pub mod breeding;
pub mod config;
pub mod crossover;
pub mod energy;
pub mod error;
pub mod individual;
pub mod init;
pub mod mutation;
pub mod network;
pub mod prim;
pub mod stats;
pub mod tree;

pub use breeding::{stream_rng, Breeder};
pub use crate::config::{load_config, ProbeConfig, TopologyConfig};
pub use crossover::{Crossover, CrossoverStrategy};
pub use energy::EnergyModel;
pub use error::{Result as TopologyResult, TopologyError};
pub use individual::{EdgeSetIndividual, Objectives, TreeCodec};
pub use init::{initialize_population, InitMethod};
pub use mutation::{Mutation, MutationStrategy, PerturbationTarget, PoolPolicy};
pub use network::{Edge, Network, NetworkInput, NodeId, NodeRole, Point};
pub use prim::{build, Acceptance, BuildOutcome, EdgePool, RestrictedPool};
pub use stats::{BreedingStats, OperatorStats};
pub use tree::RootedTree;

static TRACING_INIT: OnceCell<()> = OnceCell::new();

/// Installs the global subscriber once with an `info` fallback filter.
pub fn init_tracing(service: &str) -> Result<()> { init_tracing_with_level(service, "info") }

/// Installs the global subscriber once; later calls are no-ops.
///
/// `RUST_LOG` drives the filter and `default_directive` applies when it is
/// unset. `WSN_JSON_LOG=1|true` switches to JSON lines.
pub fn init_tracing_with_level(service: &str, default_directive: &str) -> Result<()> {
    TRACING_INIT.get_or_try_init(|| -> Result<()> {
        let json = std::env::var("WSN_JSON_LOG").ok().map(|v| v == "1" || v.eq_ignore_ascii_case("true")).unwrap_or(false);
        let env_filter = match EnvFilter::try_from_default_env() {
            Ok(filter) => filter,
            Err(_) => EnvFilter::try_new(default_directive)?,
        };
        let registry = tracing_subscriber::registry().with(env_filter);
        if json {
            registry
                .with(tracing_subscriber::fmt::layer().json().flatten_event(true).with_current_span(true).with_span_list(false))
                .try_init()?;
        } else {
            registry
                .with(tracing_subscriber::fmt::layer().with_target(true).with_thread_ids(false).with_line_number(true))
                .try_init()?;
        }
        Ok(())
    })?;
    info!(target: "wsn_core", service, "tracing initialized");
    Ok(())
}

//! Layered run configuration: optional YAML file, then `WSN__*` environment
//! overrides.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use tracing_subscriber::EnvFilter;

use crate::breeding::Breeder;
use crate::crossover::Crossover;
use crate::error::{config_err, Result};
use crate::init::InitMethod;
use crate::mutation::Mutation;

pub const CONFIG_FILE_ENV: &str = "WSN_CONFIG_FILE";
pub const ENV_PREFIX: &str = "WSN";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProbeConfig {
    pub population_size: usize,
    pub rounds: usize,
}

impl Default for ProbeConfig {
    fn default() -> Self { Self { population_size: 40, rounds: 20 } }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TopologyConfig {
    pub network_file: Option<PathBuf>,
    /// Derived from the network when unset.
    pub max_hop: Option<usize>,
    pub seed: u64,
    pub crossover: Crossover,
    pub mutation: Mutation,
    pub init: InitMethod,
    pub probe: ProbeConfig,
    /// Fallback filter directive when `RUST_LOG` is unset.
    pub log_level: String,
}

impl Default for TopologyConfig {
    fn default() -> Self {
        Self {
            network_file: None,
            max_hop: None,
            seed: 42,
            crossover: Crossover::default(),
            mutation: Mutation::default(),
            init: InitMethod::default(),
            probe: ProbeConfig::default(),
            log_level: "info".into(),
        }
    }
}

impl TopologyConfig {
    pub fn from_yaml_str(text: &str) -> Result<Self> {
        let cfg = config::Config::builder()
            .add_source(config::File::from_str(text, config::FileFormat::Yaml))
            .build()?;
        let parsed: TopologyConfig = cfg.try_deserialize()?;
        parsed.validate()?;
        Ok(parsed)
    }

    pub fn to_yaml(&self) -> Result<String> { Ok(serde_yaml::to_string(self)?) }

    pub fn validate(&self) -> Result<()> {
        if self.max_hop == Some(0) { return Err(config_err("max_hop must be at least 1")); }
        if self.probe.population_size < 2 { return Err(config_err("probe.population_size must be at least 2")); }
        if let Err(e) = EnvFilter::try_new(&self.log_level) {
            return Err(config_err(format!("log_level {:?}: {e}", self.log_level)));
        }
        self.crossover.validate()?;
        self.mutation.validate()?;
        self.init.validate()
    }

    pub fn breeder(&self) -> Result<Breeder> { Breeder::new(self.crossover, self.mutation) }
}

/// Reads `$WSN_CONFIG_FILE` (if set) and applies `WSN__SECTION__KEY` overrides.
pub fn load_config() -> Result<TopologyConfig> {
    let mut builder = config::Config::builder();
    if let Ok(file) = std::env::var(CONFIG_FILE_ENV) {
        builder = builder.add_source(config::File::with_name(&file).required(false));
    }
    builder = builder.add_source(config::Environment::with_prefix(ENV_PREFIX).prefix_separator("__").separator("__").try_parsing(true));
    let cfg: TopologyConfig = builder.build()?.try_deserialize()?;
    cfg.validate()?;
    Ok(cfg)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crossover::CrossoverStrategy;
    use crate::mutation::{PerturbationTarget, PoolPolicy};
    use crate::prim::Acceptance;

    #[test]
    fn parses_full_document() {
        let cfg = TopologyConfig::from_yaml_str(
            r#"
network_file: data/tiny_network.json
max_hop: 4
seed: 7
crossover: { probability: 0.8, strategy: random_prim, acceptance: { policy: reject_worse, tolerance: 0.0 } }
mutation:
  probability: 0.2
  strategy: { target: { kind: bottleneck, probability: 0.5 }, pool: { kind: nearest, k: 3 } }
init: { kind: mixed, greedy_ratio: 0.25 }
probe: { population_size: 10, rounds: 3 }
"#,
        )
        .unwrap();
        assert_eq!(cfg.max_hop, Some(4));
        assert_eq!(cfg.seed, 7);
        assert_eq!(cfg.crossover.strategy, CrossoverStrategy::RandomPrim);
        assert_eq!(cfg.crossover.acceptance, Acceptance::RejectWorse { tolerance: 0.0 });
        assert_eq!(cfg.mutation.strategy.target, PerturbationTarget::Bottleneck { probability: 0.5 });
        assert_eq!(cfg.mutation.strategy.pool, PoolPolicy::Nearest { k: 3 });
        assert_eq!(cfg.init, InitMethod::Mixed { greedy_ratio: 0.25 });
        assert_eq!(cfg.probe, ProbeConfig { population_size: 10, rounds: 3 });
        assert_eq!(cfg.log_level, "info");
    }

    #[test]
    fn empty_document_uses_defaults() {
        let cfg = TopologyConfig::from_yaml_str("seed: 42").unwrap();
        assert_eq!(cfg, TopologyConfig::default());
        assert!(cfg.to_yaml().unwrap().contains("probability"));
    }

    #[test]
    fn validation_rejects_out_of_range_values() {
        assert!(TopologyConfig::from_yaml_str("max_hop: 0").is_err());
        assert!(TopologyConfig::from_yaml_str("crossover: { probability: 1.5 }").is_err());
        assert!(TopologyConfig::from_yaml_str("probe: { population_size: 1 }").is_err());
        assert!(TopologyConfig::from_yaml_str("init: { kind: mixed, greedy_ratio: 2.0 }").is_err());
        assert!(TopologyConfig::from_yaml_str("log_level: wsn_core=loud").is_err());
    }

    #[test]
    fn log_level_accepts_filter_directives() {
        let cfg = TopologyConfig::from_yaml_str("log_level: warn,wsn_core=debug").unwrap();
        assert_eq!(cfg.log_level, "warn,wsn_core=debug");
    }
}

//! Error taxonomy for topology operators.
//!
//! Only configuration-class failures are errors. A rebuild that cannot reach every
//! node is reported through `BuildOutcome::stranded` and `RootedTree::is_valid`.

use thiserror::Error;

use crate::network::NodeId;

#[derive(Debug, Error)]
pub enum TopologyError {
    #[error("configuration error: {0}")] Configuration(String),
    #[error("node {node} out of range for a network of {len} nodes")] NodeOutOfRange { node: NodeId, len: usize },
    #[error("edge ({0}, {1}) is not in the potential-edge pool")] EdgeNotInPool(NodeId, NodeId),
    #[error("sensor {0} cannot adopt children")] SensorParent(NodeId),
    #[error("node {0} is already connected")] AlreadyConnected(NodeId),
    #[error("node {0} is not connected to the sink")] Disconnected(NodeId),
    #[error("the sink cannot be attached or detached")] RootMutation,
    #[error("individual does not decode to a tree: {0}")] NotTreeShaped(String),
    #[error("io error: {0}")] Io(#[from] std::io::Error),
    #[error("network parse error: {0}")] Json(#[from] serde_json::Error),
    #[error("config error: {0}")] Config(#[from] config::ConfigError),
    #[error("yaml error: {0}")] Yaml(#[from] serde_yaml::Error),
}

pub type Result<T> = std::result::Result<T, TopologyError>;

pub(crate) fn config_err(msg: impl Into<String>) -> TopologyError { TopologyError::Configuration(msg.into()) }

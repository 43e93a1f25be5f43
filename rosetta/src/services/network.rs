//! Network identification, capability advertisement and status.

use std::sync::Arc;

use serde_json::Value;

use crate::chain::reader::ChainReader;
use crate::common::{OperationStatus, OperationType};
use crate::config::{RosettaConfig, BLOCKCHAIN_NAME, ROSETTA_VERSION};
use crate::error::{ErrorKind, Result, RosettaError};
use crate::types::{
    Allow, Metadata, NetworkIdentifier, NetworkListResponse, NetworkOptionsResponse,
    NetworkStatusResponse, SubNetworkIdentifier, Version,
};

use super::{block_identifier, timestamp_ms};

/// Builds this node's network identifier and rejects requests aimed elsewhere.
#[derive(Debug, Clone)]
pub struct NetworkGuard {
    network: String,
    sub_network: String,
    is_beacon: bool,
}

impl NetworkGuard {
    pub fn new(config: &RosettaConfig) -> Self {
        Self {
            network: config.network().name().to_string(),
            sub_network: format!("shard {}", config.shard_id()),
            is_beacon: config.is_beacon(),
        }
    }

    pub fn identifier(&self) -> NetworkIdentifier {
        let mut metadata = Metadata::new();
        metadata.insert("is_beacon".to_string(), Value::Bool(self.is_beacon));
        NetworkIdentifier {
            blockchain: BLOCKCHAIN_NAME.to_string(),
            network: self.network.clone(),
            sub_network_identifier: Some(SubNetworkIdentifier {
                network: self.sub_network.clone(),
                metadata: Some(metadata),
            }),
        }
    }

    /// Blockchain, network name and shard must all match.
    pub fn check(&self, requested: &NetworkIdentifier) -> Result<()> {
        let shard = requested
            .sub_network_identifier
            .as_ref()
            .map(|s| s.network.as_str());
        if requested.blockchain != BLOCKCHAIN_NAME
            || requested.network != self.network
            || shard != Some(self.sub_network.as_str())
        {
            return Err(RosettaError::invalid_input(format!(
                "network {}/{}/{} is not served here, expected {}/{}/{}",
                requested.blockchain,
                requested.network,
                shard.unwrap_or("-"),
                BLOCKCHAIN_NAME,
                self.network,
                self.sub_network
            )));
        }
        Ok(())
    }
}

pub struct NetworkService<C> {
    config: RosettaConfig,
    guard: NetworkGuard,
    chain: Arc<C>,
}

impl<C: ChainReader> NetworkService<C> {
    pub fn new(config: &RosettaConfig, chain: Arc<C>) -> Self {
        Self {
            config: config.clone(),
            guard: NetworkGuard::new(config),
            chain,
        }
    }

    pub fn network_list(&self) -> NetworkListResponse {
        NetworkListResponse {
            network_identifiers: vec![self.guard.identifier()],
        }
    }

    pub async fn network_status(&self, network: &NetworkIdentifier) -> Result<NetworkStatusResponse> {
        self.guard.check(network)?;
        let current = self
            .chain
            .latest_block()
            .await
            .map_err(|e| RosettaError::upstream("reading latest block", e))?
            .ok_or_else(|| RosettaError::not_found("chain has no blocks"))?;
        let genesis = self
            .chain
            .block_by_number(0)
            .await
            .map_err(|e| RosettaError::upstream("reading genesis block", e))?
            .ok_or_else(|| RosettaError::not_found("genesis block missing"))?;

        Ok(NetworkStatusResponse {
            current_block_identifier: block_identifier(&current.header),
            current_block_timestamp: timestamp_ms(&current.header)?,
            genesis_block_identifier: block_identifier(&genesis.header),
        })
    }

    /// Statuses, types and errors this node can emit. Staking types are
    /// only advertised on the beacon shard.
    pub fn network_options(&self, network: &NetworkIdentifier) -> Result<NetworkOptionsResponse> {
        self.guard.check(network)?;

        let mut operation_types: Vec<String> =
            OperationType::PLAIN.iter().map(|t| t.to_string()).collect();
        if self.config.is_beacon() {
            operation_types.extend(OperationType::staking().map(|t| t.to_string()));
        }

        let mut version_metadata = Metadata::new();
        version_metadata.insert(
            "total_supply".to_string(),
            Value::String(self.config.total_supply().to_string()),
        );

        Ok(NetworkOptionsResponse {
            version: Version {
                rosetta_version: ROSETTA_VERSION.to_string(),
                node_version: self.config.node_version().to_string(),
                middleware_version: None,
                metadata: Some(version_metadata),
            },
            allow: Allow {
                operation_statuses: OperationStatus::ALL.iter().map(|s| s.to_wire()).collect(),
                operation_types,
                errors: ErrorKind::ALL.iter().map(|k| k.to_wire()).collect(),
                historical_balance_lookup: self.config.archival(),
            },
        })
    }
}

//! Request-level services built on the codec.
//!
//! Each service is constructed once from a [`RosettaConfig`](crate::RosettaConfig)
//! and holds no mutable state, so a single instance can serve concurrent
//! requests.

pub mod block;
pub mod construction;
pub mod network;
pub mod operations;
pub mod synthetic;
pub mod transaction;

pub use block::BlockService;
pub use construction::{ConstructionService, OperationComponents, OperationParser};
pub use network::{NetworkGuard, NetworkService};
pub use operations::OperationEncoder;
pub use synthetic::SyntheticFormatter;
pub use transaction::TransactionFormatter;

use crate::chain::types::{hash_hex, Header};
use crate::error::{Result, RosettaError};
use crate::types::BlockIdentifier;

pub(crate) fn block_identifier(header: &Header) -> BlockIdentifier {
    BlockIdentifier {
        index: header.number,
        hash: hash_hex(&header.hash),
    }
}

/// Header time in milliseconds since the unix epoch.
pub(crate) fn timestamp_ms(header: &Header) -> Result<i64> {
    i64::try_from(header.timestamp)
        .ok()
        .and_then(|secs| secs.checked_mul(1000))
        .ok_or_else(|| {
            RosettaError::sanity(format!(
                "block {} timestamp {} out of range",
                header.number, header.timestamp
            ))
        })
}

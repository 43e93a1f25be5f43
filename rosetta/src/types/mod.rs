//! Rosetta wire model.
//!
//! Plain serde structs mirroring the Rosetta JSON schema. Field names follow
//! the schema exactly, so nothing here carries chain semantics.

pub mod block;
pub mod identifiers;
pub mod network;
pub mod operation;

pub use block::*;
pub use identifiers::*;
pub use network::*;
pub use operation::*;

/// Free-form JSON object used for every `metadata` field.
pub type Metadata = serde_json::Map<String, serde_json::Value>;

//! Building blocks shared by the forward and reverse codecs.

pub mod amount;
pub mod identifier;
pub mod metadata;
pub mod taxonomy;

pub use identifier::{SyntheticPurpose, SyntheticTxId};
pub use taxonomy::{OperationStatus, OperationType};

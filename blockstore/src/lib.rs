//! Content-addressed block storage.
//!
//! The share layer persists merkle tree nodes keyed by their [`CidGeneric`].
//! Everything above this crate depends only on the [`Blockstore`] trait, so
//! the backing store can be swapped without touching the tree or protocol
//! code. [`InMemoryBlockstore`] is the implementation used by tests and
//! short-lived nodes.

use async_trait::async_trait;
use cid::CidGeneric;

pub use crate::block::{Block, CidError};
pub use crate::in_memory_blockstore::InMemoryBlockstore;

mod block;
mod in_memory_blockstore;

/// Error returned by [`Blockstore`] operations.
#[derive(Debug, PartialEq, thiserror::Error)]
pub enum BlockstoreError {
    /// Requested CID is not present in the store.
    #[error("CID not found in blockstore")]
    NotFound,

    /// CID longer than the largest CID the store can hold.
    #[error("CID too long")]
    CidTooLong,

    /// Stored data is inconsistent with what the caller expects.
    #[error("Invalid stored data: {0}")]
    InvalidData(String),
}

pub type Result<T, E = BlockstoreError> = std::result::Result<T, E>;

/// A store of CID-addressed binary blobs.
///
/// Implementations must be safe to use concurrently for independent CIDs.
/// Blocks are immutable; putting a CID that is already present is a no-op.
#[async_trait]
pub trait Blockstore: Send + Sync {
    /// Get a block by its CID.
    async fn get<const S: usize>(&self, cid: &CidGeneric<S>) -> Result<Vec<u8>>;

    /// Check for the presence of a block.
    async fn has<const S: usize>(&self, cid: &CidGeneric<S>) -> Result<bool>;

    /// Insert a batch of blocks atomically.
    ///
    /// Either every block of the batch becomes visible or none does.
    /// Already present CIDs are skipped.
    async fn put_many<const S: usize>(&self, blocks: Vec<(CidGeneric<S>, Vec<u8>)>) -> Result<()>;

    /// Remove a block from the store.
    ///
    /// Removing an absent CID is not an error.
    async fn remove<const S: usize>(&self, cid: &CidGeneric<S>) -> Result<()>;
}

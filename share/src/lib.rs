//! Share retrieval for the tessera data availability layer.
//!
//! The crate wires the core types to a content-addressed block store and a
//! peer transport:
//!
//! - [`ipld`] persists the row and column trees of a square as a binary
//!   DAG and walks them back by CID,
//! - [`getter`] answers share and namespace queries against the store,
//! - [`shrexnd`] is the streaming request/response protocol serving
//!   namespaced shares with proofs to remote peers.

use tessera_blockstore::BlockstoreError;

pub mod getter;
pub mod ipld;
pub mod shrexnd;

pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// A referenced node is absent from the store, or the peer answered
    /// `NOT_FOUND`.
    #[error("share: not found")]
    NotFound,

    /// The queried namespace is outside the `[min, max]` range of the row.
    #[error("share: namespace is outside the range of the row")]
    NamespaceOutsideRange,

    /// The queried namespace has no shares in any row of the square.
    #[error("share: namespace not found in the square")]
    NamespaceNotFound,

    /// Peer response was malformed or carried an unknown status.
    #[error("share: invalid response")]
    InvalidResponse,

    /// The operation did not finish before its deadline.
    #[error("share: request timed out")]
    Timeout,

    /// The operation was canceled.
    #[error("share: operation canceled")]
    Canceled,

    /// Requested leaf index does not exist in the tree.
    #[error("share: leaf index {index} out of range of {total} leaves")]
    IndexOutOfRange { index: usize, total: usize },

    /// Trees span a power-of-two amount of leaves.
    #[error("share: amount of leaves must be a power of two, got {0}")]
    InvalidAmountOfLeaves(usize),

    /// A fetched node has a size that is neither a leaf nor an inner node.
    #[error("share: invalid stored node of {0} bytes")]
    InvalidNodeSize(usize),

    /// Protocol configuration is invalid.
    #[error("share: invalid parameters: {0}")]
    InvalidParameters(&'static str),

    #[error(transparent)]
    Types(#[from] tessera_types::Error),

    #[error("share: blockstore: {0}")]
    Blockstore(BlockstoreError),

    #[error("share: io: {0}")]
    Io(#[from] std::io::Error),
}

impl From<BlockstoreError> for Error {
    fn from(e: BlockstoreError) -> Self {
        match e {
            BlockstoreError::NotFound => Error::NotFound,
            e => Error::Blockstore(e),
        }
    }
}

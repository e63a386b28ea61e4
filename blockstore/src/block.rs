use cid::CidGeneric;
use thiserror::Error;

/// Error returned when computing or parsing a CID. Variants here can be
/// specific to a particular [`Block`] impl and don't necessarily indicate an
/// invalid CID in general.
#[derive(Debug, Error, PartialEq)]
pub enum CidError {
    /// Codec specified in the CID is not supported in this context.
    #[error("Invalid CID codec {0}")]
    InvalidCidCodec(u64),

    /// CID's multihash length is different from the expected one.
    #[error("Invalid multihash length {0}")]
    InvalidMultihashLength(usize),

    /// Encountered multihash code is not supported in this context.
    #[error("Invalid multihash code {0} expected {1}")]
    InvalidMultihashCode(u64, u64),

    /// CID is well-formed but carries invalid data.
    #[error("Invalid CID: {0}")]
    InvalidCid(String),
}

/// A blob of data that can compute its own CID.
pub trait Block<const S: usize>: Sync + Send {
    /// CID of the block.
    fn cid(&self) -> Result<CidGeneric<S>, CidError>;

    /// Raw bytes stored under the CID.
    fn data(&self) -> &[u8];
}

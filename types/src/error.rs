use crate::consts::appconsts;
use crate::nmt::NS_SIZE;

pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Invalid namespace size: {0}, expected {}", NS_SIZE)]
    InvalidNamespaceSize(usize),

    #[error("Invalid share size: {0}, expected {}", appconsts::SHARE_SIZE)]
    InvalidShareSize(usize),

    #[error("Invalid nmt leaf size: {0}")]
    InvalidNmtLeafSize(usize),

    #[error("Invalid nmt node order")]
    InvalidNmtNodeOrder,

    #[error("Nmt leaves pushed out of namespace order")]
    UnorderedLeaves,

    #[error("Shares of {axis} {index} are not sorted by their namespace")]
    UnorderedShares { axis: &'static str, index: usize },

    #[error("Invalid namespaced hash size: {0}")]
    InvalidNamespacedHash(usize),

    #[error("Invalid axis type: {0}")]
    InvalidAxis(i32),

    #[error("Invalid dimensions of the data square")]
    EdsInvalidDimensions,

    #[error("Data square index out of range: row {0}, column {1}")]
    EdsIndexOutOfRange(usize, usize),

    #[error("Share at row {0}, column {1} is not available")]
    ShareNotAvailable(usize, usize),

    #[error("Failed to solve data square")]
    FailedToSolve,

    #[error("Computed {axis} {index} root doesn't match the provided one")]
    RootMismatch { axis: &'static str, index: usize },

    #[error("Range proof verification failed: {0}")]
    RangeProofError(&'static str),

    #[error("Wrong proof type")]
    WrongProofType,

    #[error(transparent)]
    CidError(#[from] tessera_blockstore::CidError),

    #[error("Reed-Solomon codec error: {0}")]
    Codec(String),
}

impl From<reed_solomon_erasure::Error> for Error {
    fn from(e: reed_solomon_erasure::Error) -> Self {
        Error::Codec(e.to_string())
    }
}

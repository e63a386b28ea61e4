use sha2::{Digest, Sha256};

use crate::nmt::{Namespace, NS_SIZE};
use crate::{Error, Result};

/// Size of the Sha256 hash in the [`NamespacedHash`] in bytes.
pub const HASH_SIZE: usize = 32;

/// Size of the [`NamespacedHash`] in bytes.
pub const NAMESPACED_HASH_SIZE: usize = 2 * NS_SIZE + HASH_SIZE;

/// Byte representation of the [`NamespacedHash`].
pub type RawNamespacedHash = [u8; NAMESPACED_HASH_SIZE];

/// Digest of a tree node together with the namespace range it commits to.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct NamespacedHash {
    min_namespace: Namespace,
    max_namespace: Namespace,
    hash: [u8; HASH_SIZE],
}

impl NamespacedHash {
    /// Create a new [`NamespacedHash`].
    pub fn new(min_namespace: Namespace, max_namespace: Namespace, hash: [u8; HASH_SIZE]) -> Self {
        NamespacedHash {
            min_namespace,
            max_namespace,
            hash,
        }
    }

    /// Create a hash with the given namespace range and a zeroed digest.
    pub fn with_min_and_max_ns(min_namespace: Namespace, max_namespace: Namespace) -> Self {
        NamespacedHash::new(min_namespace, max_namespace, [0; HASH_SIZE])
    }

    /// The root of an empty tree.
    pub fn empty_root() -> Self {
        NamespacedHash::new(Namespace::MIN, Namespace::MIN, Sha256::digest([]).into())
    }

    /// The smallest namespace of the subtree below this node.
    pub fn min_namespace(&self) -> Namespace {
        self.min_namespace
    }

    /// The largest namespace of the subtree below this node.
    pub fn max_namespace(&self) -> Namespace {
        self.max_namespace
    }

    /// Sha256 digest of the node.
    pub fn hash(&self) -> [u8; HASH_SIZE] {
        self.hash
    }

    /// Whether the given namespace falls into the range of this node.
    pub fn contains(&self, namespace: Namespace) -> bool {
        self.min_namespace <= namespace && namespace <= self.max_namespace
    }

    /// Decode a [`NamespacedHash`] from its raw bytes.
    pub fn from_raw(bytes: &[u8]) -> Result<Self> {
        let bytes: &RawNamespacedHash = bytes
            .try_into()
            .map_err(|_| Error::InvalidNamespacedHash(bytes.len()))?;

        let min_namespace = Namespace::from_raw(&bytes[..NS_SIZE])?;
        let max_namespace = Namespace::from_raw(&bytes[NS_SIZE..2 * NS_SIZE])?;
        let hash = bytes[2 * NS_SIZE..].try_into().expect("size checked above");

        Ok(NamespacedHash::new(min_namespace, max_namespace, hash))
    }

    /// Encode into `min ‖ max ‖ hash` array.
    pub fn to_array(&self) -> RawNamespacedHash {
        let mut out = [0; NAMESPACED_HASH_SIZE];
        out[..NS_SIZE].copy_from_slice(self.min_namespace.as_bytes());
        out[NS_SIZE..2 * NS_SIZE].copy_from_slice(self.max_namespace.as_bytes());
        out[2 * NS_SIZE..].copy_from_slice(&self.hash);
        out
    }

    /// Encode into a `Vec`.
    pub fn to_vec(&self) -> Vec<u8> {
        self.to_array().to_vec()
    }

    /// Validate that the namespace range of this hash is ordered.
    pub fn validate_namespace_order(&self) -> Result<()> {
        if self.min_namespace > self.max_namespace {
            return Err(Error::InvalidNmtNodeOrder);
        }

        Ok(())
    }
}

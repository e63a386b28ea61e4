use crate::consts::appconsts::SHARE_SIZE;
use crate::nmt::{Namespace, NamespaceProof, NS_SIZE};
use crate::{Error, Result};

/// Tag byte prepended to an original share before it is hashed into a tree.
pub const ORIGINAL_LEAF_TAG: u8 = 0x00;

/// Tag byte prepended to a parity share before it is hashed into a tree.
///
/// The tag keeps leaves of the two kinds from ever hashing to the same
/// digest, even if their payload bytes collide.
pub const PARITY_LEAF_TAG: u8 = 0xFF;

/// Size of the tag prefix of a serialized leaf.
pub const LEAF_TAG_SIZE: usize = 1;

/// A single cell of the extended data square.
///
/// All shares have the fixed size of [`SHARE_SIZE`] bytes. For an original
/// share the first [`NS_SIZE`] bytes name its namespace; a parity share is
/// opaque codec output and belongs to [`Namespace::PARITY_SHARE`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Share {
    data: [u8; SHARE_SIZE],
    parity: bool,
}

impl Share {
    /// Create an original share from its raw bytes.
    pub fn from_raw(data: &[u8]) -> Result<Self> {
        let data: [u8; SHARE_SIZE] = data
            .try_into()
            .map_err(|_| Error::InvalidShareSize(data.len()))?;

        Ok(Share {
            data,
            parity: false,
        })
    }

    /// Create a parity share from its raw bytes.
    pub fn parity(data: &[u8]) -> Result<Self> {
        let data: [u8; SHARE_SIZE] = data
            .try_into()
            .map_err(|_| Error::InvalidShareSize(data.len()))?;

        Ok(Share { data, parity: true })
    }

    /// Decode a share from serialized leaf bytes, i.e. `tag ‖ share`.
    pub fn from_leaf_bytes(bytes: &[u8]) -> Result<Self> {
        if bytes.len() != LEAF_TAG_SIZE + SHARE_SIZE {
            return Err(Error::InvalidNmtLeafSize(bytes.len()));
        }

        match bytes[0] {
            ORIGINAL_LEAF_TAG => Share::from_raw(&bytes[LEAF_TAG_SIZE..]),
            PARITY_LEAF_TAG => Share::parity(&bytes[LEAF_TAG_SIZE..]),
            _ => Err(Error::InvalidNmtLeafSize(bytes.len())),
        }
    }

    /// The [`Namespace`] the share belongs to.
    pub fn namespace(&self) -> Namespace {
        if self.parity {
            Namespace::PARITY_SHARE
        } else {
            Namespace::new_unchecked(self.data[..NS_SIZE].try_into().expect("fixed size"))
        }
    }

    /// The data that follows the namespace prefix.
    pub fn data(&self) -> &[u8] {
        &self.data[NS_SIZE..]
    }

    /// Whether this is a parity share.
    pub fn is_parity(&self) -> bool {
        self.parity
    }

    /// The namespace and the tagged leaf bytes this share hashes into a
    /// tree as.
    pub fn to_leaf(&self) -> (Namespace, Vec<u8>) {
        let tag = if self.parity {
            PARITY_LEAF_TAG
        } else {
            ORIGINAL_LEAF_TAG
        };

        let mut leaf_bytes = Vec::with_capacity(LEAF_TAG_SIZE + SHARE_SIZE);
        leaf_bytes.push(tag);
        leaf_bytes.extend_from_slice(&self.data);

        (self.namespace(), leaf_bytes)
    }

    /// The raw bytes of the share.
    pub fn to_vec(&self) -> Vec<u8> {
        self.data.to_vec()
    }
}

impl AsRef<[u8]> for Share {
    fn as_ref(&self) -> &[u8] {
        &self.data
    }
}

/// A collection of rows of [`Share`]s from a particular [`Namespace`].
#[derive(Debug, Clone, PartialEq)]
pub struct NamespacedShares {
    /// All rows containing shares within some namespace.
    pub rows: Vec<NamespacedRow>,
}

/// [`Share`]s of a single row of the data square from a particular
/// [`Namespace`], together with the proof of their inclusion or absence.
#[derive(Debug, Clone, PartialEq)]
pub struct NamespacedRow {
    /// All shares within some namespace in the given row.
    pub shares: Vec<Share>,
    /// A merkle proof of inclusion or absence of the shares in this row.
    pub proof: NamespaceProof,
}

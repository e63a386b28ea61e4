//! Namespaced Merkle Tree.
//!
//! Every node of the tree commits, next to its hash, to the range of
//! namespaces `[min, max]` found in the subtree below it. This is what
//! allows a verifier to check that a response contains *all* shares of a
//! namespace, and to accept proofs that a namespace is absent from a row
//! even though it falls inside the row's range.

use sha2::{Digest, Sha256};

use crate::{Error, Result};

mod namespaced_hash;
mod proof;

pub use namespaced_hash::{NamespacedHash, RawNamespacedHash, HASH_SIZE, NAMESPACED_HASH_SIZE};
pub use proof::{NamespaceProof, EMPTY_LEAVES};

/// Size of the [`Namespace`] in bytes.
pub const NS_SIZE: usize = 8;

const LEAF_DOMAIN_SEPARATOR: [u8; 1] = [0x00];
const INNER_DOMAIN_SEPARATOR: [u8; 1] = [0x01];

/// Namespace of a [`Share`], ordered lexicographically.
///
/// [`Share`]: crate::Share
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Namespace([u8; NS_SIZE]);

impl Namespace {
    /// The smallest namespace.
    pub const MIN: Namespace = Namespace([0; NS_SIZE]);

    /// The largest namespace, reserved for parity shares.
    ///
    /// Parity leaves always carry this namespace, so every real namespace
    /// sorts before them and range pruning needs no special-casing for the
    /// parity quadrants.
    pub const PARITY_SHARE: Namespace = Namespace([0xFF; NS_SIZE]);

    /// Create a namespace from exactly [`NS_SIZE`] raw bytes.
    pub fn from_raw(bytes: &[u8]) -> Result<Self> {
        let bytes: [u8; NS_SIZE] = bytes
            .try_into()
            .map_err(|_| Error::InvalidNamespaceSize(bytes.len()))?;
        Ok(Namespace(bytes))
    }

    /// Create a namespace without validating the input length.
    pub fn new_unchecked(bytes: [u8; NS_SIZE]) -> Self {
        Namespace(bytes)
    }

    /// Raw bytes of the namespace.
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }
}

impl AsRef<[u8]> for Namespace {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

/// Namespace aware Sha256 hasher.
#[derive(Clone, Copy, Debug)]
pub struct NamespacedSha2Hasher {
    ignore_max_ns: bool,
}

impl NamespacedSha2Hasher {
    /// Create a hasher, choosing whether the parity namespace is ignored
    /// when ranges of inner nodes are aggregated.
    pub fn with_ignore_max_ns(ignore_max_ns: bool) -> Self {
        NamespacedSha2Hasher { ignore_max_ns }
    }

    /// Whether the parity namespace is ignored by this hasher.
    pub fn ignores_max_ns(&self) -> bool {
        self.ignore_max_ns
    }

    /// Digest of a leaf holding `leaf_bytes` under `namespace`.
    pub fn hash_leaf(&self, namespace: Namespace, leaf_bytes: &[u8]) -> NamespacedHash {
        let mut hasher = Sha256::new();
        hasher.update(LEAF_DOMAIN_SEPARATOR);
        hasher.update(namespace.as_bytes());
        hasher.update(namespace.as_bytes());
        hasher.update(leaf_bytes);

        NamespacedHash::new(namespace, namespace, hasher.finalize().into())
    }

    /// Digest of an inner node with children `left` and `right`.
    ///
    /// The parent range is part of the preimage, so namespace bounds are
    /// binding and cannot be stripped from a proof.
    pub fn hash_nodes(
        &self,
        left: &NamespacedHash,
        right: &NamespacedHash,
    ) -> Result<NamespacedHash> {
        left.validate_namespace_order()?;
        right.validate_namespace_order()?;

        if left.max_namespace() > right.min_namespace() {
            return Err(Error::InvalidNmtNodeOrder);
        }

        let min_ns = left.min_namespace().min(right.min_namespace());
        let max_ns = if self.ignore_max_ns && left.min_namespace() == Namespace::PARITY_SHARE {
            Namespace::PARITY_SHARE
        } else if self.ignore_max_ns && right.min_namespace() == Namespace::PARITY_SHARE {
            left.max_namespace()
        } else {
            left.max_namespace().max(right.max_namespace())
        };

        let mut hasher = Sha256::new();
        hasher.update(INNER_DOMAIN_SEPARATOR);
        hasher.update(min_ns.as_bytes());
        hasher.update(max_ns.as_bytes());
        hasher.update(left.to_array());
        hasher.update(right.to_array());

        Ok(NamespacedHash::new(min_ns, max_ns, hasher.finalize().into()))
    }
}

impl Default for NamespacedSha2Hasher {
    fn default() -> Self {
        NamespacedSha2Hasher::with_ignore_max_ns(true)
    }
}

/// A leaf pushed into the [`Nmt`].
#[derive(Debug, Clone)]
pub struct NmtLeaf {
    hash: NamespacedHash,
    data: Vec<u8>,
}

impl NmtLeaf {
    /// Digest of the leaf.
    pub fn hash(&self) -> &NamespacedHash {
        &self.hash
    }

    /// Raw bytes the leaf was created from.
    pub fn data(&self) -> &[u8] {
        &self.data
    }
}

/// Namespace aware merkle tree over a power-of-two amount of leaves.
///
/// Leaves must be pushed in non-decreasing namespace order. The tree is
/// built bottom-up in layers; [`Nmt::layers`] exposes every level so the
/// nodes can be serialized into a content-addressed store.
#[derive(Debug, Clone)]
pub struct Nmt {
    hasher: NamespacedSha2Hasher,
    leaves: Vec<NmtLeaf>,
}

impl Nmt {
    /// Create a tree with the given hasher.
    pub fn with_hasher(hasher: NamespacedSha2Hasher) -> Self {
        Nmt {
            hasher,
            leaves: Vec::new(),
        }
    }

    /// Append a leaf to the tree.
    ///
    /// Returns an error if the namespace is smaller than the namespace of
    /// the previously pushed leaf.
    pub fn push_leaf(&mut self, namespace: Namespace, leaf_bytes: Vec<u8>) -> Result<()> {
        if let Some(last) = self.leaves.last() {
            if namespace < last.hash.min_namespace() {
                return Err(Error::UnorderedLeaves);
            }
        }

        let hash = self.hasher.hash_leaf(namespace, &leaf_bytes);
        self.leaves.push(NmtLeaf {
            hash,
            data: leaf_bytes,
        });

        Ok(())
    }

    /// Leaves pushed so far.
    pub fn leaves(&self) -> &[NmtLeaf] {
        &self.leaves
    }

    /// Amount of leaves in the tree.
    pub fn num_leaves(&self) -> usize {
        self.leaves.len()
    }

    /// All layers of the tree, leaf digests first, root layer last.
    pub fn layers(&self) -> Vec<Vec<NamespacedHash>> {
        let mut layers = Vec::new();
        let mut current: Vec<NamespacedHash> = self.leaves.iter().map(|leaf| leaf.hash).collect();

        if current.is_empty() {
            return layers;
        }

        while current.len() > 1 {
            layers.push(current.clone());

            let mut next = Vec::with_capacity(current.len().div_ceil(2));
            let mut chunks = current.chunks_exact(2);

            for pair in &mut chunks {
                let parent = self
                    .hasher
                    .hash_nodes(&pair[0], &pair[1])
                    .expect("push_leaf enforces namespace order");
                next.push(parent);
            }
            // odd tail carried up unchanged
            next.extend(chunks.remainder().iter().copied());

            current = next;
        }

        layers.push(current);
        layers
    }

    /// Root of the tree.
    pub fn root(&self) -> NamespacedHash {
        self.layers()
            .last()
            .and_then(|layer| layer.first().copied())
            .unwrap_or_else(NamespacedHash::empty_root)
    }
}

impl Default for Nmt {
    fn default() -> Self {
        Nmt::with_hasher(NamespacedSha2Hasher::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ns(n: u8) -> Namespace {
        let mut bytes = [0; NS_SIZE];
        bytes[NS_SIZE - 1] = n;
        Namespace(bytes)
    }

    #[test]
    fn namespace_from_raw() {
        Namespace::from_raw(&[1; NS_SIZE]).unwrap();
        Namespace::from_raw(&[1; NS_SIZE - 1]).unwrap_err();
        Namespace::from_raw(&[1; NS_SIZE + 1]).unwrap_err();
        Namespace::from_raw(&[]).unwrap_err();
    }

    #[test]
    fn namespace_ordering_is_lexicographic() {
        let low = Namespace::from_raw(&[0, 0, 0, 0, 0, 0, 1, 0]).unwrap();
        let high = Namespace::from_raw(&[0, 0, 0, 0, 0, 0, 2, 0]).unwrap();

        assert!(low < high);
        assert!(high < Namespace::PARITY_SHARE);
        assert!(Namespace::MIN < low);
    }

    #[test]
    fn leaf_digest_commits_to_namespace() {
        let hasher = NamespacedSha2Hasher::default();

        let h1 = hasher.hash_leaf(ns(1), b"payload");
        let h2 = hasher.hash_leaf(ns(2), b"payload");

        assert_ne!(h1.hash(), h2.hash());
        assert_eq!(h1.min_namespace(), ns(1));
        assert_eq!(h1.max_namespace(), ns(1));
    }

    #[test]
    fn leaf_and_inner_domains_are_separated() {
        let hasher = NamespacedSha2Hasher::default();

        let left = hasher.hash_leaf(ns(1), b"a");
        let right = hasher.hash_leaf(ns(2), b"b");
        let parent = hasher.hash_nodes(&left, &right).unwrap();

        // hashing the concatenated child arrays as a leaf must not collide
        // with the inner digest
        let mut payload = left.to_vec();
        payload.extend_from_slice(&right.to_array());
        let as_leaf = hasher.hash_leaf(parent.min_namespace(), &payload);

        assert_ne!(parent.hash(), as_leaf.hash());
    }

    #[test]
    fn inner_digest_commits_to_order() {
        let hasher = NamespacedSha2Hasher::default();

        let left = hasher.hash_leaf(ns(1), b"a");
        let right = hasher.hash_leaf(ns(1), b"b");

        let p1 = hasher.hash_nodes(&left, &right).unwrap();
        let p2 = hasher.hash_nodes(&right, &left).unwrap();

        assert_ne!(p1.hash(), p2.hash());
    }

    #[test]
    fn unordered_children_rejected() {
        let hasher = NamespacedSha2Hasher::default();

        let left = hasher.hash_leaf(ns(5), b"a");
        let right = hasher.hash_leaf(ns(1), b"b");

        let err = hasher.hash_nodes(&left, &right).unwrap_err();
        assert!(matches!(err, Error::InvalidNmtNodeOrder));
    }

    #[test]
    fn parity_namespace_is_ignored_in_ranges() {
        let hasher = NamespacedSha2Hasher::default();

        let real = hasher.hash_leaf(ns(3), b"data");
        let parity = hasher.hash_leaf(Namespace::PARITY_SHARE, b"parity");

        let parent = hasher.hash_nodes(&real, &parity).unwrap();
        assert_eq!(parent.min_namespace(), ns(3));
        assert_eq!(parent.max_namespace(), ns(3));

        let all_parity = hasher.hash_nodes(&parity, &parity).unwrap();
        assert_eq!(all_parity.min_namespace(), Namespace::PARITY_SHARE);
        assert_eq!(all_parity.max_namespace(), Namespace::PARITY_SHARE);
    }

    #[test]
    fn parity_namespace_kept_without_ignore_mode() {
        let hasher = NamespacedSha2Hasher::with_ignore_max_ns(false);

        let real = hasher.hash_leaf(ns(3), b"data");
        let parity = hasher.hash_leaf(Namespace::PARITY_SHARE, b"parity");

        let parent = hasher.hash_nodes(&real, &parity).unwrap();
        assert_eq!(parent.max_namespace(), Namespace::PARITY_SHARE);
    }

    #[test]
    fn tree_root_aggregates_ranges() {
        let mut tree = Nmt::default();
        tree.push_leaf(ns(1), b"a".to_vec()).unwrap();
        tree.push_leaf(ns(2), b"b".to_vec()).unwrap();
        tree.push_leaf(ns(2), b"c".to_vec()).unwrap();
        tree.push_leaf(ns(9), b"d".to_vec()).unwrap();

        let root = tree.root();
        assert_eq!(root.min_namespace(), ns(1));
        assert_eq!(root.max_namespace(), ns(9));

        let layers = tree.layers();
        assert_eq!(layers.len(), 3);
        assert_eq!(layers[0].len(), 4);
        assert_eq!(layers[1].len(), 2);
        assert_eq!(layers[2].len(), 1);
        assert_eq!(layers[2][0], root);
    }

    #[test]
    fn tree_rejects_unordered_leaves() {
        let mut tree = Nmt::default();
        tree.push_leaf(ns(5), b"a".to_vec()).unwrap();
        let err = tree.push_leaf(ns(1), b"b".to_vec()).unwrap_err();
        assert!(matches!(err, Error::UnorderedLeaves));
    }

    #[test]
    fn root_is_deterministic() {
        let build = || {
            let mut tree = Nmt::default();
            for i in 0..8 {
                tree.push_leaf(ns(i), vec![i]).unwrap();
            }
            tree.root()
        };

        assert_eq!(build(), build());
    }
}

use crate::nmt::{Namespace, NamespacedHash, NamespacedSha2Hasher};
use crate::{Error, Result};

/// A helper constant to be used as leaves when verifying a proof of absence.
pub const EMPTY_LEAVES: &[&[u8]] = &[];

/// Merkle proof of inclusion or absence of a namespace in a row.
///
/// A presence proof covers the contiguous leaf range `[start, end)` holding
/// the namespace; `nodes` are the sibling digests needed to recompute the
/// row root together with the leaves. An absence proof is an inclusion
/// proof of the single leaf before which the namespace would sort, carried
/// in `leaf_hash`.
#[derive(Debug, Clone, PartialEq)]
pub struct NamespaceProof {
    start: u64,
    end: u64,
    nodes: Vec<NamespacedHash>,
    leaf_hash: Option<NamespacedHash>,
    max_ns_ignored: bool,
}

impl NamespaceProof {
    /// Create a proof of inclusion for the leaf range `[start, end)`.
    pub fn new_inclusion(start: u64, end: u64, nodes: Vec<NamespacedHash>) -> Self {
        NamespaceProof {
            start,
            end,
            nodes,
            leaf_hash: None,
            max_ns_ignored: true,
        }
    }

    /// Create a proof of absence anchored at the leaf with index `start`.
    ///
    /// `leaf_hash` is the digest of the leaf which would directly follow
    /// the proven namespace in the row.
    pub fn new_absence(start: u64, nodes: Vec<NamespacedHash>, leaf_hash: NamespacedHash) -> Self {
        NamespaceProof {
            start,
            end: start + 1,
            nodes,
            leaf_hash: Some(leaf_hash),
            max_ns_ignored: true,
        }
    }

    /// Whether this is a proof of absence.
    pub fn is_of_absence(&self) -> bool {
        self.leaf_hash.is_some()
    }

    /// Index of the first leaf covered by the proof.
    pub fn start_idx(&self) -> u64 {
        self.start
    }

    /// Index after the last leaf covered by the proof.
    pub fn end_idx(&self) -> u64 {
        self.end
    }

    /// Sibling digests of the proof.
    pub fn siblings(&self) -> &[NamespacedHash] {
        &self.nodes
    }

    /// Digest of the leaf following the absent namespace, if this is a
    /// proof of absence.
    pub fn leaf(&self) -> Option<&NamespacedHash> {
        self.leaf_hash.as_ref()
    }

    /// Whether the parity namespace was ignored when ranges were hashed.
    pub fn max_ns_ignored(&self) -> bool {
        self.max_ns_ignored
    }

    /// Verify that `leaves` are all the shares of `namespace` in the row
    /// committed by `root`.
    ///
    /// For an absence proof `leaves` must be empty (see [`EMPTY_LEAVES`]).
    pub fn verify_complete_namespace(
        &self,
        root: &NamespacedHash,
        leaves: &[impl AsRef<[u8]>],
        namespace: Namespace,
    ) -> Result<()> {
        if self.is_of_absence() {
            if !leaves.is_empty() {
                return Err(Error::WrongProofType);
            }

            let leaf_hash = self.leaf_hash.expect("checked by is_of_absence");
            leaf_hash.validate_namespace_order()?;

            // the leaf right after the insertion point must sort strictly
            // above the proven namespace
            if leaf_hash.min_namespace() <= namespace {
                return Err(Error::RangeProofError(
                    "absence proof leaf does not follow the namespace",
                ));
            }

            let computed = self.compute_root(&[leaf_hash], Some(namespace))?;
            if computed != *root {
                return Err(Error::RangeProofError("computed root differs from the root"));
            }

            return Ok(());
        }

        if leaves.is_empty() {
            return Err(Error::WrongProofType);
        }

        let leaf_hashes = self.hash_leaves(leaves, namespace)?;
        let computed = self.compute_root(&leaf_hashes, Some(namespace))?;

        if computed != *root {
            return Err(Error::RangeProofError("computed root differs from the root"));
        }

        Ok(())
    }

    /// Verify that `leaves` are committed at `[start, end)` of the row,
    /// without checking that they are all the leaves of the namespace.
    pub fn verify_inclusion(
        &self,
        root: &NamespacedHash,
        leaves: &[impl AsRef<[u8]>],
        namespace: Namespace,
    ) -> Result<()> {
        if self.is_of_absence() || leaves.is_empty() {
            return Err(Error::WrongProofType);
        }

        let leaf_hashes = self.hash_leaves(leaves, namespace)?;
        let computed = self.compute_root(&leaf_hashes, None)?;

        if computed != *root {
            return Err(Error::RangeProofError("computed root differs from the root"));
        }

        Ok(())
    }

    fn hash_leaves(
        &self,
        leaves: &[impl AsRef<[u8]>],
        namespace: Namespace,
    ) -> Result<Vec<NamespacedHash>> {
        if leaves.len() as u64 != self.end.saturating_sub(self.start) {
            return Err(Error::RangeProofError(
                "amount of leaves differs from the proven range",
            ));
        }

        let hasher = NamespacedSha2Hasher::with_ignore_max_ns(self.max_ns_ignored);

        Ok(leaves
            .iter()
            .map(|share| {
                // reconstruct the leaf exactly as it was pushed into the
                // tree: an original share prefixed with its tag byte
                let mut leaf_bytes = Vec::with_capacity(share.as_ref().len() + 1);
                leaf_bytes.push(crate::share::ORIGINAL_LEAF_TAG);
                leaf_bytes.extend_from_slice(share.as_ref());
                hasher.hash_leaf(namespace, &leaf_bytes)
            })
            .collect())
    }

    /// Recompute the row root from the proven range and the siblings.
    ///
    /// Entries are merged on a stack of `(digest, position, size)`
    /// subtrees: siblings left of the range come first, widest subtree
    /// first (one per set bit of `start`), then the range itself leaf by
    /// leaf, then the right siblings whose widths follow from the
    /// alignment of the running position. With `completeness` set, every
    /// left sibling must stay below the namespace and every right sibling
    /// above it.
    fn compute_root(
        &self,
        leaf_hashes: &[NamespacedHash],
        completeness: Option<Namespace>,
    ) -> Result<NamespacedHash> {
        struct Entry {
            hash: NamespacedHash,
            pos: u64,
            size: u64,
        }

        let hasher = NamespacedSha2Hasher::with_ignore_max_ns(self.max_ns_ignored);

        let push = |stack: &mut Vec<Entry>, mut entry: Entry| -> Result<()> {
            while let Some(top) = stack.last() {
                let mergeable = top.size == entry.size
                    && top.pos + top.size == entry.pos
                    && top.pos % (2 * top.size) == 0;
                if !mergeable {
                    break;
                }

                let left = stack.pop().expect("last() checked above");
                entry = Entry {
                    hash: hasher.hash_nodes(&left.hash, &entry.hash)?,
                    pos: left.pos,
                    size: left.size * 2,
                };
            }
            stack.push(entry);
            Ok(())
        };

        let mut stack: Vec<Entry> = Vec::new();
        let mut nodes = self.nodes.iter();
        let mut pos = 0u64;

        for bit in (0..u64::BITS).rev() {
            let size = 1u64 << bit;
            if self.start & size == 0 {
                continue;
            }

            let node = nodes
                .next()
                .ok_or(Error::RangeProofError("not enough proof nodes"))?;

            if let Some(namespace) = completeness {
                if node.max_namespace() >= namespace {
                    return Err(Error::RangeProofError(
                        "proof is not complete: left sibling reaches into the namespace",
                    ));
                }
            }

            push(&mut stack, Entry { hash: *node, pos, size })?;
            pos += size;
        }

        for leaf_hash in leaf_hashes {
            push(
                &mut stack,
                Entry {
                    hash: *leaf_hash,
                    pos,
                    size: 1,
                },
            )?;
            pos += 1;
        }

        for node in nodes {
            if pos == 0 {
                return Err(Error::RangeProofError("malformed proof"));
            }
            let size = 1u64 << pos.trailing_zeros();

            if let Some(namespace) = completeness {
                if node.min_namespace() <= namespace {
                    return Err(Error::RangeProofError(
                        "proof is not complete: right sibling reaches into the namespace",
                    ));
                }
            }

            push(&mut stack, Entry { hash: *node, pos, size })?;
            pos += size;
        }

        match stack.as_slice() {
            [entry] => Ok(entry.hash),
            _ => Err(Error::RangeProofError("proof does not form a single tree")),
        }
    }
}

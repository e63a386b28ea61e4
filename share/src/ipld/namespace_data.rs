use tessera_blockstore::Blockstore;
use tessera_types::multihash::cid_from_namespaced_hash;
use tessera_types::nmt::{Namespace, NamespaceProof, NamespacedHash};
use tessera_types::Share;
use tokio_util::sync::CancellationToken;

use crate::ipld::{decode_node, NmtNode};
use crate::{Error, Result};

/// Collector of all leaves of a namespace in a single row, together with
/// the proof of their inclusion or absence.
///
/// The descent prunes every subtree whose namespace range cannot contain
/// the queried namespace; the digests of the pruned subtrees, recorded in
/// visit order, are exactly the sibling set of the resulting proof.
///
/// A node missing from the store does not abort the collection: the error
/// is remembered, the span of the missing node is recorded as holes, and
/// every other leaf is still collected at its position.
pub struct NamespaceData {
    max_shares: usize,
    namespace: Namespace,
    with_leaves: bool,
    with_proofs: bool,
    leaves: Vec<Option<Share>>,
    first_leaf_pos: Option<usize>,
    range: Option<(usize, usize)>,
    proof_nodes: Vec<NamespacedHash>,
    absence_proof: Option<NamespaceProof>,
}

impl NamespaceData {
    /// Create a collector for a row of `max_shares` leaves.
    pub fn new(max_shares: usize, namespace: Namespace) -> Self {
        NamespaceData {
            max_shares,
            namespace,
            with_leaves: false,
            with_proofs: false,
            leaves: Vec::new(),
            first_leaf_pos: None,
            range: None,
            proof_nodes: Vec::new(),
            absence_proof: None,
        }
    }

    /// Collect the shares of the namespace.
    pub fn with_leaves(mut self) -> Self {
        self.with_leaves = true;
        self
    }

    /// Assemble a proof of inclusion or absence of the namespace.
    pub fn with_proofs(mut self) -> Self {
        self.with_proofs = true;
        self
    }

    /// Collected leaves, indexable by their position relative to the first
    /// collected one. A leaf that could not be fetched is `None`.
    pub fn leaves(&self) -> &[Option<Share>] {
        &self.leaves
    }

    /// Absolute row index of the first collected leaf.
    pub fn first_leaf_index(&self) -> Option<usize> {
        self.first_leaf_pos
    }

    /// The assembled proof, if proofs were requested and the collection
    /// completed.
    pub fn proof(&self) -> Option<NamespaceProof> {
        if let Some(absence) = &self.absence_proof {
            return Some(absence.clone());
        }

        if !self.with_proofs {
            return None;
        }

        self.range.map(|(start, end)| {
            NamespaceProof::new_inclusion(start as u64, end as u64, self.proof_nodes.clone())
        })
    }

    /// Walk the tree under `root`, collecting leaves and proof nodes.
    ///
    /// Returns [`Error::NamespaceOutsideRange`] when the namespace cannot
    /// be in the row at all. A store miss is returned as
    /// [`Error::NotFound`] after the rest of the row was collected.
    pub async fn collect_leaves_by_namespace<'a, B>(
        &'a mut self,
        token: &'a CancellationToken,
        store: &'a B,
        root: &'a NamespacedHash,
    ) -> Result<()>
    where
        B: Blockstore,
    {
        if !self.max_shares.is_power_of_two() {
            return Err(Error::InvalidAmountOfLeaves(self.max_shares));
        }

        if !root.contains(self.namespace) {
            return Err(Error::NamespaceOutsideRange);
        }

        let mut fetch_error = None;

        // in-order descent; pruning is decided on the child digests, so a
        // node is only ever fetched when its range contains the namespace
        let mut stack = vec![(*root, 0usize, self.max_shares)];

        while let Some((hash, pos, span)) = stack.pop() {
            if token.is_cancelled() {
                return Err(Error::Canceled);
            }

            if !hash.contains(self.namespace) {
                if self.with_proofs {
                    self.proof_nodes.push(hash);
                }
                continue;
            }

            if span == 1 {
                // an in-range leaf holds exactly the queried namespace
                self.record_range(pos, 1);

                if self.with_leaves {
                    match store.get(&cid_from_namespaced_hash(&hash)).await {
                        Ok(data) => match decode_node(&data)? {
                            NmtNode::Leaf { share } => self.record_leaf(pos, Some(share)),
                            NmtNode::Inner { .. } => {
                                return Err(Error::InvalidNodeSize(data.len()))
                            }
                        },
                        Err(tessera_blockstore::BlockstoreError::NotFound) => {
                            self.record_leaf(pos, None);
                            fetch_error.get_or_insert(Error::NotFound);
                        }
                        Err(e) => return Err(e.into()),
                    }
                }
                continue;
            }

            match store.get(&cid_from_namespaced_hash(&hash)).await {
                Ok(data) => match decode_node(&data)? {
                    NmtNode::Inner { left, right } => {
                        stack.push((right, pos + span / 2, span / 2));
                        stack.push((left, pos, span / 2));
                    }
                    NmtNode::Leaf { .. } => return Err(Error::InvalidNodeSize(data.len())),
                },
                Err(tessera_blockstore::BlockstoreError::NotFound) => {
                    // everything under the missing node becomes a hole
                    self.record_range(pos, span);
                    if self.with_leaves {
                        for hole in pos..pos + span {
                            self.record_leaf(hole, None);
                        }
                    }
                    fetch_error.get_or_insert(Error::NotFound);
                }
                Err(e) => return Err(e.into()),
            }
        }

        if let Some(err) = fetch_error {
            return Err(err);
        }

        if self.with_proofs && self.range.is_none() {
            // in range but nothing matched: prove the absence instead
            self.proof_nodes.clear();
            self.absence_proof = Some(self.collect_absence_proof(token, store, root).await?);
        }

        Ok(())
    }

    fn record_range(&mut self, pos: usize, span: usize) {
        let (start, end) = self.range.unwrap_or((pos, pos + span));
        self.range = Some((start.min(pos), end.max(pos + span)));
    }

    fn record_leaf(&mut self, pos: usize, share: Option<Share>) {
        let first = *self.first_leaf_pos.get_or_insert(pos);
        let rel = pos - first;

        if rel < self.leaves.len() {
            self.leaves[rel] = share;
        } else {
            self.leaves.resize(rel, None);
            self.leaves.push(share);
        }
    }

    /// Walk to the leaf before which the namespace would sort and collect
    /// its sibling path.
    async fn collect_absence_proof<'a, B>(
        &'a self,
        token: &'a CancellationToken,
        store: &'a B,
        root: &'a NamespacedHash,
    ) -> Result<NamespaceProof>
    where
        B: Blockstore,
    {
        let mut hash = *root;
        let mut pos = 0usize;
        let mut span = self.max_shares;

        let mut left_siblings = Vec::new();
        let mut right_siblings = Vec::new();

        while span > 1 {
            if token.is_cancelled() {
                return Err(Error::Canceled);
            }

            let data = store.get(&cid_from_namespaced_hash(&hash)).await?;
            let NmtNode::Inner { left, right } = decode_node(&data)? else {
                return Err(Error::InvalidNodeSize(data.len()));
            };

            if left.max_namespace() > self.namespace {
                // the first leaf above the namespace is on the left
                right_siblings.push(right);
                hash = left;
            } else {
                left_siblings.push(left);
                hash = right;
                pos += span / 2;
            }
            span /= 2;
        }

        // siblings right of the leaf were collected top-down, the
        // verification consumes them bottom-up
        let mut nodes = left_siblings;
        nodes.extend(right_siblings.into_iter().rev());

        Ok(NamespaceProof::new_absence(pos as u64, nodes, hash))
    }
}

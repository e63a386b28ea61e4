//! The NMT node DAG resident in the block store.
//!
//! Trees are stored node by node, keyed by the CID of the node's
//! namespaced hash. A stored leaf is `min ‖ max ‖ tag ‖ share`, a stored
//! inner node is `min ‖ max ‖ left ‖ right` with both children encoded as
//! 48-byte namespaced hashes; the two are told apart by their size.
//! Traversal never follows pointers, only CIDs recovered from child
//! digests.

use tessera_types::nmt::{NamespacedHash, NAMESPACED_HASH_SIZE, NS_SIZE};
use tessera_types::{Share, LEAF_TAG_SIZE};

use crate::{Error, Result};

mod add;
mod get;
mod namespace_data;

pub use add::{add_eds, add_shares};
pub use get::get_share;
pub use namespace_data::NamespaceData;

/// Size of a stored inner node.
const INNER_NODE_SIZE: usize = 2 * NS_SIZE + 2 * NAMESPACED_HASH_SIZE;

/// Size of a stored leaf node.
const LEAF_NODE_SIZE: usize =
    2 * NS_SIZE + LEAF_TAG_SIZE + tessera_types::consts::appconsts::SHARE_SIZE;

/// Amount of unique nodes the block store gains when a square of the given
/// extended width is added.
///
/// Every tree over `w` leaves has `2w - 1` nodes and there are `2w` trees
/// for rows and columns; each leaf is shared between its row tree and its
/// column tree and stored once.
pub fn batch_size(extended_width: usize) -> usize {
    (2 * extended_width - 1) * 2 * extended_width - extended_width * extended_width
}

/// A decoded node of a stored tree.
#[derive(Debug)]
pub(crate) enum NmtNode {
    Leaf { share: Share },
    Inner { left: NamespacedHash, right: NamespacedHash },
}

pub(crate) fn leaf_node_bytes(hash: &NamespacedHash, leaf_bytes: &[u8]) -> Vec<u8> {
    let mut bytes = Vec::with_capacity(LEAF_NODE_SIZE);
    bytes.extend_from_slice(hash.min_namespace().as_bytes());
    bytes.extend_from_slice(hash.max_namespace().as_bytes());
    bytes.extend_from_slice(leaf_bytes);
    bytes
}

pub(crate) fn inner_node_bytes(
    parent: &NamespacedHash,
    left: &NamespacedHash,
    right: &NamespacedHash,
) -> Vec<u8> {
    let mut bytes = Vec::with_capacity(INNER_NODE_SIZE);
    bytes.extend_from_slice(parent.min_namespace().as_bytes());
    bytes.extend_from_slice(parent.max_namespace().as_bytes());
    bytes.extend_from_slice(&left.to_array());
    bytes.extend_from_slice(&right.to_array());
    bytes
}

pub(crate) fn decode_node(data: &[u8]) -> Result<NmtNode> {
    match data.len() {
        INNER_NODE_SIZE => {
            let left = NamespacedHash::from_raw(&data[2 * NS_SIZE..2 * NS_SIZE + NAMESPACED_HASH_SIZE])?;
            let right = NamespacedHash::from_raw(&data[2 * NS_SIZE + NAMESPACED_HASH_SIZE..])?;
            Ok(NmtNode::Inner { left, right })
        }
        LEAF_NODE_SIZE => {
            let share = Share::from_leaf_bytes(&data[2 * NS_SIZE..])?;
            Ok(NmtNode::Leaf { share })
        }
        n => Err(Error::InvalidNodeSize(n)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tessera_types::nmt::{Namespace, NamespacedSha2Hasher};
    use tessera_types::test_utils::share_with_namespace;

    #[test]
    fn batch_sizes() {
        // w^2 unique leaves plus 2w(w - 1) inner nodes
        assert_eq!(batch_size(2), 8);
        assert_eq!(batch_size(4), 40);
        assert_eq!(batch_size(8), 176);
        assert_eq!(batch_size(16), 736);
    }

    #[test]
    fn node_encoding_round_trip() {
        let share = Share::from_raw(&share_with_namespace(&[0, 0, 0, 0, 0, 0, 0, 3])).unwrap();
        let (namespace, leaf_bytes) = share.to_leaf();

        let hasher = NamespacedSha2Hasher::default();
        let leaf_hash = hasher.hash_leaf(namespace, &leaf_bytes);

        let encoded = leaf_node_bytes(&leaf_hash, &leaf_bytes);
        assert_eq!(encoded.len(), LEAF_NODE_SIZE);
        match decode_node(&encoded).unwrap() {
            NmtNode::Leaf { share: decoded } => assert_eq!(decoded, share),
            NmtNode::Inner { .. } => panic!("decoded a leaf as an inner node"),
        }

        let other = hasher.hash_leaf(Namespace::PARITY_SHARE, b"parity");
        let parent = hasher.hash_nodes(&leaf_hash, &other).unwrap();

        let encoded = inner_node_bytes(&parent, &leaf_hash, &other);
        assert_eq!(encoded.len(), INNER_NODE_SIZE);
        match decode_node(&encoded).unwrap() {
            NmtNode::Inner { left, right } => {
                assert_eq!(left, leaf_hash);
                assert_eq!(right, other);
            }
            NmtNode::Leaf { .. } => panic!("decoded an inner node as a leaf"),
        }
    }

    #[test]
    fn decode_rejects_other_sizes() {
        decode_node(&[]).unwrap_err();
        decode_node(&[0; INNER_NODE_SIZE - 1]).unwrap_err();
        decode_node(&[0; LEAF_NODE_SIZE + 1]).unwrap_err();
    }
}

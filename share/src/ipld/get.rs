use tessera_blockstore::Blockstore;
use tessera_types::multihash::cid_from_namespaced_hash;
use tessera_types::nmt::NamespacedHash;
use tessera_types::Share;
use tokio_util::sync::CancellationToken;

use crate::ipld::{decode_node, NmtNode};
use crate::{Error, Result};

/// Fetch a single leaf of the tree with the given root.
///
/// `total_leaves` is the width of the tree, i.e. the width of the square
/// the root was computed over.
pub async fn get_share<B>(
    token: &CancellationToken,
    store: &B,
    root: &NamespacedHash,
    index: usize,
    total_leaves: usize,
) -> Result<Share>
where
    B: Blockstore,
{
    if !total_leaves.is_power_of_two() {
        return Err(Error::InvalidAmountOfLeaves(total_leaves));
    }
    if index >= total_leaves {
        return Err(Error::IndexOutOfRange {
            index,
            total: total_leaves,
        });
    }

    let mut hash = *root;
    let mut offset = index;
    let mut span = total_leaves;

    loop {
        if token.is_cancelled() {
            return Err(Error::Canceled);
        }

        let data = store.get(&cid_from_namespaced_hash(&hash)).await?;

        match decode_node(&data)? {
            NmtNode::Leaf { share } => {
                if span != 1 {
                    return Err(Error::InvalidNodeSize(data.len()));
                }
                return Ok(share);
            }
            NmtNode::Inner { left, right } => {
                if span == 1 {
                    return Err(Error::InvalidNodeSize(data.len()));
                }

                span /= 2;
                if offset < span {
                    hash = left;
                } else {
                    offset -= span;
                    hash = right;
                }
            }
        }
    }
}

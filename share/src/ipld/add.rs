use tessera_blockstore::Blockstore;
use tessera_types::multihash::{cid_from_namespaced_hash, Cid};
use tessera_types::{AxisType, DataAvailabilityHeader, ExtendedDataSquare};
use tokio_util::sync::CancellationToken;

use crate::ipld::{batch_size, inner_node_bytes, leaf_node_bytes};
use crate::{Error, Result};

/// Extend the given original shares and write the resulting square's trees
/// to the store.
pub async fn add_shares<B>(
    token: &CancellationToken,
    store: &B,
    shares: Vec<Vec<u8>>,
) -> Result<(ExtendedDataSquare, DataAvailabilityHeader)>
where
    B: Blockstore,
{
    let eds = ExtendedDataSquare::from_ods(shares)?;
    let dah = add_eds(token, store, &eds).await?;
    Ok((eds, dah))
}

/// Write all row and column tree nodes of the square to the store in a
/// single batch and return the published roots.
///
/// Leaves sit in one row tree and one column tree with identical bytes, so
/// they are serialized only once; the whole batch is
/// [`batch_size`]`(width)` nodes.
pub async fn add_eds<B>(
    token: &CancellationToken,
    store: &B,
    eds: &ExtendedDataSquare,
) -> Result<DataAvailabilityHeader>
where
    B: Blockstore,
{
    let width = eds.square_width();

    let mut batch: Vec<(Cid, Vec<u8>)> = Vec::with_capacity(batch_size(width));
    let mut row_roots = Vec::with_capacity(width);
    let mut column_roots = Vec::with_capacity(width);

    for axis in [AxisType::Row, AxisType::Col] {
        for index in 0..width {
            let tree = eds.axis_nmt(axis, index)?;

            // row and column trees share their leaves
            if axis == AxisType::Row {
                for leaf in tree.leaves() {
                    let cid = cid_from_namespaced_hash(leaf.hash());
                    batch.push((cid, leaf_node_bytes(leaf.hash(), leaf.data())));
                }
            }

            let layers = tree.layers();
            for (children, parents) in layers.iter().zip(layers.iter().skip(1)) {
                for (i, parent) in parents.iter().enumerate() {
                    let cid = cid_from_namespaced_hash(parent);
                    batch.push((cid, inner_node_bytes(parent, &children[2 * i], &children[2 * i + 1])));
                }
            }

            let root = tree.root();
            match axis {
                AxisType::Row => row_roots.push(root),
                AxisType::Col => column_roots.push(root),
            }
        }
    }

    if token.is_cancelled() {
        return Err(Error::Canceled);
    }

    store.put_many(batch).await?;

    Ok(DataAvailabilityHeader::new(row_roots, column_roots)?)
}

//! Share and namespace queries answered from the block store.

use futures::stream::{self, StreamExt, TryStreamExt};
use tessera_blockstore::Blockstore;
use tessera_types::nmt::{Namespace, NamespaceProof, NamespacedHash};
use tessera_types::{DataAvailabilityHeader, NamespacedRow, NamespacedShares, Share};
use tokio_util::sync::CancellationToken;

use crate::ipld::NamespaceData;
use crate::{Error, Result};

pub use crate::ipld::get_share;

/// Get all shares of the namespace in the row committed by `root`,
/// together with the proof of their inclusion or absence.
///
/// Returns [`Error::NamespaceOutsideRange`] when the namespace cannot be
/// present in the row at all.
pub async fn get_shares_by_namespace<B>(
    token: &CancellationToken,
    store: &B,
    root: &NamespacedHash,
    namespace: Namespace,
    total_leaves: usize,
) -> Result<(Vec<Share>, Option<NamespaceProof>)>
where
    B: Blockstore,
{
    let mut data = NamespaceData::new(total_leaves, namespace)
        .with_leaves()
        .with_proofs();

    data.collect_leaves_by_namespace(token, store, root).await?;

    let shares = data.leaves().iter().flatten().cloned().collect();
    Ok((shares, data.proof()))
}

/// Get the shares of the namespace from every row of the square, with
/// their proofs, fetching up to `concurrency` rows at a time.
///
/// Rows whose range cannot contain the namespace are skipped. If no row
/// of the square can contain it, [`Error::NamespaceNotFound`] is
/// returned.
pub async fn get_namespaced_shares<'a, B>(
    token: &'a CancellationToken,
    store: &'a B,
    dah: &'a DataAvailabilityHeader,
    namespace: Namespace,
    concurrency: usize,
) -> Result<NamespacedShares>
where
    B: Blockstore,
{
    let width = dah.square_width();

    let row_futs: Vec<_> = dah
        .row_roots()
        .iter()
        .map(|root| async move {
            if !root.contains(namespace) {
                return Ok(None);
            }

            let mut data = NamespaceData::new(width, namespace)
                .with_leaves()
                .with_proofs();
            data.collect_leaves_by_namespace(token, store, root).await?;

            let shares: Vec<Share> = data.leaves().iter().flatten().cloned().collect();
            let proof = data.proof().ok_or(Error::NamespaceNotFound)?;

            Result::<_, Error>::Ok(Some(NamespacedRow { shares, proof }))
        })
        .collect();

    let rows: Vec<Option<NamespacedRow>> = stream::iter(row_futs)
        .buffered(concurrency.max(1))
        .try_collect()
        .await?;

    let rows: Vec<NamespacedRow> = rows.into_iter().flatten().collect();

    if rows.is_empty() {
        return Err(Error::NamespaceNotFound);
    }

    Ok(NamespacedShares { rows })
}

use std::collections::HashMap;
use std::sync::RwLock;

use async_trait::async_trait;
use cid::CidGeneric;
use multihash::Multihash;

use crate::{Blockstore, BlockstoreError, Result};

/// A [`Blockstore`] holding all blocks in memory.
///
/// A single lock over the map makes `put_many` an atomic batch. Reads take
/// the lock shared, so independent lookups don't serialize on each other.
pub struct InMemoryBlockstore<const S: usize> {
    map: RwLock<HashMap<CidGeneric<S>, Vec<u8>>>,
}

impl<const S: usize> InMemoryBlockstore<S> {
    /// Create a new empty store.
    pub fn new() -> Self {
        InMemoryBlockstore {
            map: RwLock::new(HashMap::new()),
        }
    }

    /// Amount of blocks currently stored.
    pub fn len(&self) -> usize {
        self.map.read().expect("lock poisoned").len()
    }

    /// Whether the store holds no blocks.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// All CIDs currently present. Test helper, the live code never
    /// enumerates the store.
    pub fn keys(&self) -> Vec<CidGeneric<S>> {
        self.map
            .read()
            .expect("lock poisoned")
            .keys()
            .cloned()
            .collect()
    }

    fn rewrap_cid<const SS: usize>(cid: &CidGeneric<SS>) -> Result<CidGeneric<S>> {
        let hash = cid.hash();
        let hash = Multihash::<S>::wrap(hash.code(), hash.digest())
            .map_err(|_| BlockstoreError::CidTooLong)?;
        Ok(CidGeneric::new_v1(cid.codec(), hash))
    }
}

#[async_trait]
impl<const S: usize> Blockstore for InMemoryBlockstore<S> {
    async fn get<const SS: usize>(&self, cid: &CidGeneric<SS>) -> Result<Vec<u8>> {
        let cid = Self::rewrap_cid(cid)?;

        self.map
            .read()
            .expect("lock poisoned")
            .get(&cid)
            .cloned()
            .ok_or(BlockstoreError::NotFound)
    }

    async fn has<const SS: usize>(&self, cid: &CidGeneric<SS>) -> Result<bool> {
        let cid = Self::rewrap_cid(cid)?;
        Ok(self.map.read().expect("lock poisoned").contains_key(&cid))
    }

    async fn put_many<const SS: usize>(
        &self,
        blocks: Vec<(CidGeneric<SS>, Vec<u8>)>,
    ) -> Result<()> {
        // Rewrap before taking the lock so a bad CID fails the whole batch
        // without partial inserts.
        let blocks = blocks
            .into_iter()
            .map(|(cid, data)| Ok((Self::rewrap_cid(&cid)?, data)))
            .collect::<Result<Vec<_>>>()?;

        let mut map = self.map.write().expect("lock poisoned");

        for (cid, data) in blocks {
            map.entry(cid).or_insert(data);
        }

        Ok(())
    }

    async fn remove<const SS: usize>(&self, cid: &CidGeneric<SS>) -> Result<()> {
        let cid = Self::rewrap_cid(cid)?;
        self.map.write().expect("lock poisoned").remove(&cid);
        Ok(())
    }
}

impl<const S: usize> Default for InMemoryBlockstore<S> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cid_v1<const S: usize>(codec: u64, code: u64, digest: &[u8]) -> CidGeneric<S> {
        let mh = Multihash::<S>::wrap(code, digest).unwrap();
        CidGeneric::new_v1(codec, mh)
    }

    #[tokio::test]
    async fn insert_get() {
        let store = InMemoryBlockstore::<64>::new();
        let cid = cid_v1::<64>(0x11, 0x22, &[1, 2, 3]);
        let data = [0xCD; 512];

        store.put_many(vec![(cid, data.to_vec())]).await.unwrap();

        let retrieved = store.get(&cid).await.unwrap();
        assert_eq!(data.as_ref(), retrieved);

        let another_cid = CidGeneric::<64>::default();
        let err = store.get(&another_cid).await.unwrap_err();
        assert_eq!(err, BlockstoreError::NotFound);
    }

    #[tokio::test]
    async fn duplicate_insert_is_noop() {
        let store = InMemoryBlockstore::<64>::new();
        let cid = cid_v1::<64>(0x11, 0x22, &[0, 0]);

        store.put_many(vec![(cid, vec![0x01])]).await.unwrap();
        store.put_many(vec![(cid, vec![0x02])]).await.unwrap();

        // first write wins, blocks are immutable
        assert_eq!(store.get(&cid).await.unwrap(), vec![0x01]);
        assert_eq!(store.len(), 1);
    }

    #[tokio::test]
    async fn batch_counts_unique_keys() {
        let store = InMemoryBlockstore::<64>::new();
        let cid0 = cid_v1::<64>(0x11, 0x22, &[0]);
        let cid1 = cid_v1::<64>(0x11, 0x22, &[1]);

        store
            .put_many(vec![
                (cid0, vec![0]),
                (cid1, vec![1]),
                (cid0, vec![2]), // duplicate within the batch
            ])
            .await
            .unwrap();

        assert_eq!(store.len(), 2);
        assert_eq!(store.keys().len(), 2);
    }

    #[tokio::test]
    async fn remove() {
        let store = InMemoryBlockstore::<64>::new();
        let cid = cid_v1::<64>(0x11, 0x22, &[7]);

        store.put_many(vec![(cid, vec![7])]).await.unwrap();
        assert!(store.has(&cid).await.unwrap());

        store.remove(&cid).await.unwrap();
        assert!(!store.has(&cid).await.unwrap());
        assert_eq!(store.get(&cid).await.unwrap_err(), BlockstoreError::NotFound);

        // removing again is fine
        store.remove(&cid).await.unwrap();
    }

    #[tokio::test]
    async fn different_cid_size() {
        let cid_bytes = [
            0x01, // CIDv1
            0x11, // CID codec
            0x22, // multihash code
            0x02, // len = 2
            0, 0, // hash
        ];
        let cid0 = CidGeneric::<6>::read_bytes(cid_bytes.as_ref()).unwrap();
        let cid1 = CidGeneric::<64>::read_bytes(cid_bytes.as_ref()).unwrap();

        let store = InMemoryBlockstore::<32>::new();
        store.put_many(vec![(cid0, vec![0x99; 5])]).await.unwrap();

        assert_eq!(store.get(&cid1).await.unwrap(), vec![0x99; 5]);
    }

    #[tokio::test]
    async fn too_large_cid() {
        let store = InMemoryBlockstore::<8>::new();
        let cid = cid_v1::<32>(0x11, 0x22, &[0; 16]);

        let err = store.put_many(vec![(cid, vec![0x00])]).await.unwrap_err();
        assert_eq!(err, BlockstoreError::CidTooLong);

        let err = store.get(&cid).await.unwrap_err();
        assert_eq!(err, BlockstoreError::CidTooLong);
    }
}

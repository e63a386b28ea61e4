//! Content identifiers for NMT nodes.
//!
//! Tree nodes are addressed by their [`NamespacedHash`]: the 48-byte
//! `min ‖ max ‖ hash` encoding is wrapped into a multihash and a CIDv1
//! under the project multicodec. The wrapping is deterministic and
//! reversible, so a CID can always be validated back into the hash it
//! names.

use cid::CidGeneric;
use multihash::Multihash;
use tessera_blockstore::CidError;

use crate::nmt::{NamespacedHash, NAMESPACED_HASH_SIZE};

/// The code of the namespaced Sha256 hashing algorithm in `multihash`.
pub const NMT_MULTIHASH_CODE: u64 = 0x7B01;

/// The id of the codec used for NMT node CIDs.
pub const NMT_CODEC: u64 = 0x7B00;

/// Size of the digest in NMT node CIDs.
pub const NMT_ID_SIZE: usize = NAMESPACED_HASH_SIZE;

/// CID of an NMT node.
pub type Cid = CidGeneric<NMT_ID_SIZE>;

/// Build the CID naming the node with the given [`NamespacedHash`].
pub fn cid_from_namespaced_hash(hash: &NamespacedHash) -> Cid {
    let mh = Multihash::wrap(NMT_MULTIHASH_CODE, &hash.to_array())
        .expect("digest has exactly NMT_ID_SIZE bytes");

    CidGeneric::new_v1(NMT_CODEC, mh)
}

/// Recover the [`NamespacedHash`] a CID names, validating the envelope.
pub fn namespaced_hash_from_cid(cid: &Cid) -> Result<NamespacedHash, CidError> {
    let codec = cid.codec();
    if codec != NMT_CODEC {
        return Err(CidError::InvalidCidCodec(codec));
    }

    let hash = cid.hash();

    let code = hash.code();
    if code != NMT_MULTIHASH_CODE {
        return Err(CidError::InvalidMultihashCode(code, NMT_MULTIHASH_CODE));
    }

    let size = hash.size() as usize;
    if size != NMT_ID_SIZE {
        return Err(CidError::InvalidMultihashLength(size));
    }

    NamespacedHash::from_raw(hash.digest()).map_err(|e| CidError::InvalidCid(e.to_string()))
}

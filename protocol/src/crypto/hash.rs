//! # Hashing Utilities
//!
//! One hash function rules them all here: Keccak-256, the pre-standard
//! variant of SHA-3 (original `0x01` padding, not FIPS-202's `0x06`). It is
//! what CryptoNote calls `cn_fast_hash`, and it is what every transaction
//! id, block id and merkle root in the chain is built from.
//!
//! ## Tree hash
//!
//! Block ids commit to their transactions through [`tree_hash`], the
//! CryptoNote merkle construction. It is *not* a textbook balanced binary
//! tree: when the leaf count is not a power of two, only the rightmost
//! leaves are paired in the first round so the next layer is a power of two.

use sha3::{Digest, Keccak256};

fixed_bytes!(
    /// A 32-byte Keccak digest.
    Hash,
    32
);

fixed_bytes!(
    /// An 8-byte value: the short (encryptable) payment id.
    Hash8,
    8
);

/// Keccak-256 of `data`.
///
/// ```
/// use graft_rta_core::crypto::cn_fast_hash;
///
/// let h = cn_fast_hash(b"");
/// assert_eq!(
///     h.to_hex(),
///     "c5d2460186f7233c927e7db2dcc703c0e500b653ca82273b7bfad8045d85a470"
/// );
/// ```
pub fn cn_fast_hash(data: &[u8]) -> Hash {
    let digest = Keccak256::digest(data);
    let mut out = [0u8; 32];
    out.copy_from_slice(&digest);
    Hash(out)
}

/// Keccak-256 over the concatenation of several slices, without building
/// the concatenation.
pub fn cn_fast_hash_parts(parts: &[&[u8]]) -> Hash {
    let mut hasher = Keccak256::new();
    for part in parts {
        hasher.update(part);
    }
    let mut out = [0u8; 32];
    out.copy_from_slice(&hasher.finalize());
    Hash(out)
}

fn hash_pair(left: &Hash, right: &Hash) -> Hash {
    cn_fast_hash_parts(&[&left.0, &right.0])
}

/// Largest power of two strictly below `count` (for `count >= 3`).
fn tree_hash_cnt(count: usize) -> usize {
    let mut pow = 2;
    while pow < count {
        pow <<= 1;
    }
    pow >> 1
}

/// CryptoNote merkle root of `hashes`.
///
/// One leaf is its own root; two leaves hash together. An empty slice has
/// no meaningful root and yields the zero hash (a block always has at least
/// its miner transaction, so consensus code never hits that case).
pub fn tree_hash(hashes: &[Hash]) -> Hash {
    match hashes.len() {
        0 => Hash::default(),
        1 => hashes[0],
        2 => hash_pair(&hashes[0], &hashes[1]),
        count => {
            let mut cnt = tree_hash_cnt(count);
            let direct = 2 * cnt - count;
            let mut layer: Vec<Hash> = Vec::with_capacity(cnt);
            layer.extend_from_slice(&hashes[..direct]);
            for pair in hashes[direct..].chunks_exact(2) {
                layer.push(hash_pair(&pair[0], &pair[1]));
            }
            debug_assert_eq!(layer.len(), cnt);

            while cnt > 2 {
                cnt >>= 1;
                for j in 0..cnt {
                    layer[j] = hash_pair(&layer[2 * j], &layer[2 * j + 1]);
                }
            }
            hash_pair(&layer[0], &layer[1])
        }
    }
}

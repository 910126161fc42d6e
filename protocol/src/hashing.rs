//! # Hash Cache & Hashing Engine
//!
//! Identity hashes for transactions and blocks, and the memoization that
//! keeps us from re-hashing the same transaction a dozen times while a
//! block is validated.
//!
//! ## What gets hashed
//!
//! - **Prefix hash**: Keccak of the prefix blob (version, unlock time,
//!   inputs, outputs, extra). Signatures and `extra2` are excluded. This is
//!   the message RTA supernodes sign, so adding their signatures never
//!   changes what they signed.
//! - **Transaction hash**: Keccak of the full blob.
//! - **Block hash**: Keccak of `varint(len) ‖ hashing_blob`, where the
//!   hashing blob is the header, the tree hash of `[miner_tx] ++ tx_hashes`
//!   and the transaction count. Transaction bodies never enter it directly.
//!
//! ## Caching
//!
//! Each [`Transaction`] and [`Block`] owns its cache cells. Hash queries
//! take `&self` and are safe to run from many threads at once; every
//! `*_mut` accessor takes `&mut self` and clears the cells first, so a stale
//! hash cannot be observed. Process-wide counters ([`hash_stats`]) record
//! hits and misses.
//!
//! With the `hash-integrity-check` feature every cache hit is recomputed
//! and compared, and a mismatch panics. That is a debugging aid for
//! invalidation bugs, not something to ship.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::OnceLock;

use serde::Serialize;
use tracing::trace;

use crate::block::Block;
use crate::codec::{from_blob, to_blob, varint_len, BlobEncode, BlobWriter, CodecError};
use crate::crypto::{cn_fast_hash, tree_hash, Hash};
use crate::transaction::Transaction;

// ---------------------------------------------------------------------------
// Counters
// ---------------------------------------------------------------------------

static TX_PREFIX_CALCULATED: AtomicU64 = AtomicU64::new(0);
static TX_PREFIX_CACHED: AtomicU64 = AtomicU64::new(0);
static TX_CALCULATED: AtomicU64 = AtomicU64::new(0);
static TX_CACHED: AtomicU64 = AtomicU64::new(0);
static BLOCK_CALCULATED: AtomicU64 = AtomicU64::new(0);
static BLOCK_CACHED: AtomicU64 = AtomicU64::new(0);

/// Which counter pair a cache cell reports to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum HashKind {
    TxPrefix,
    Transaction,
    Block,
}

impl HashKind {
    fn name(self) -> &'static str {
        match self {
            HashKind::TxPrefix => "tx_prefix",
            HashKind::Transaction => "transaction",
            HashKind::Block => "block",
        }
    }

    fn counters(self) -> (&'static AtomicU64, &'static AtomicU64) {
        match self {
            HashKind::TxPrefix => (&TX_PREFIX_CALCULATED, &TX_PREFIX_CACHED),
            HashKind::Transaction => (&TX_CALCULATED, &TX_CACHED),
            HashKind::Block => (&BLOCK_CALCULATED, &BLOCK_CACHED),
        }
    }
}

/// Snapshot of the process-wide hash counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct HashStats {
    pub tx_prefix_hashes_calculated: u64,
    pub tx_prefix_hashes_cached: u64,
    pub tx_hashes_calculated: u64,
    pub tx_hashes_cached: u64,
    pub block_hashes_calculated: u64,
    pub block_hashes_cached: u64,
}

/// Current counter values. Counters only ever grow.
pub fn hash_stats() -> HashStats {
    HashStats {
        tx_prefix_hashes_calculated: TX_PREFIX_CALCULATED.load(Ordering::Relaxed),
        tx_prefix_hashes_cached: TX_PREFIX_CACHED.load(Ordering::Relaxed),
        tx_hashes_calculated: TX_CALCULATED.load(Ordering::Relaxed),
        tx_hashes_cached: TX_CACHED.load(Ordering::Relaxed),
        block_hashes_calculated: BLOCK_CALCULATED.load(Ordering::Relaxed),
        block_hashes_cached: BLOCK_CACHED.load(Ordering::Relaxed),
    }
}

// ---------------------------------------------------------------------------
// Cache cell
// ---------------------------------------------------------------------------

/// A write-once memo slot owned by the value it describes.
pub(crate) struct HashCell<T>(OnceLock<T>);

impl<T> Default for HashCell<T> {
    fn default() -> Self {
        Self(OnceLock::new())
    }
}

impl<T: Clone> Clone for HashCell<T> {
    fn clone(&self) -> Self {
        Self(self.0.clone())
    }
}

impl<T: fmt::Debug> fmt::Debug for HashCell<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.0.get() {
            Some(v) => write!(f, "Cached({v:?})"),
            None => f.write_str("Empty"),
        }
    }
}

impl<T: Copy + PartialEq + fmt::Debug> HashCell<T> {
    pub(crate) fn get_or_compute(&self, kind: HashKind, compute: impl FnOnce() -> T) -> T {
        let (calculated, cached) = kind.counters();
        if let Some(value) = self.0.get() {
            cached.fetch_add(1, Ordering::Relaxed);
            trace!(kind = kind.name(), "hash cache hit");
            #[cfg(feature = "hash-integrity-check")]
            {
                let fresh = compute();
                assert_eq!(
                    *value,
                    fresh,
                    "stale {} hash in cache: invalidation was skipped",
                    kind.name()
                );
            }
            return *value;
        }
        let value = compute();
        calculated.fetch_add(1, Ordering::Relaxed);
        trace!(kind = kind.name(), "hash cache miss");
        // A concurrent reader may have won the race; both computed the same
        // value from the same bytes.
        let _ = self.0.set(value);
        value
    }

    /// Pre-fill the slot with a value known to be correct.
    pub(crate) fn seed(&self, value: T) {
        let _ = self.0.set(value);
    }

    pub(crate) fn clear(&mut self) {
        self.0 = OnceLock::new();
    }

    #[cfg(test)]
    pub(crate) fn is_filled(&self) -> bool {
        self.0.get().is_some()
    }
}

/// Per-transaction cache: prefix hash plus full hash and blob size.
#[derive(Debug, Clone, Default)]
pub(crate) struct TxHashCache {
    pub(crate) prefix: HashCell<Hash>,
    pub(crate) full: HashCell<(Hash, usize)>,
}

impl TxHashCache {
    pub(crate) fn invalidate(&mut self) {
        self.prefix.clear();
        self.full.clear();
    }
}

// ---------------------------------------------------------------------------
// Generic helpers
// ---------------------------------------------------------------------------

/// Keccak of an arbitrary blob.
pub fn get_blob_hash(blob: &[u8]) -> Hash {
    cn_fast_hash(blob)
}

/// Hash and size of a value's canonical encoding.
pub fn get_object_hash<T: BlobEncode + ?Sized>(value: &T) -> (Hash, usize) {
    let blob = to_blob(value);
    (cn_fast_hash(&blob), blob.len())
}

// ---------------------------------------------------------------------------
// Transactions
// ---------------------------------------------------------------------------

/// Prefix hash computed from scratch, bypassing the cache.
pub fn calculate_transaction_prefix_hash(tx: &Transaction) -> Hash {
    cn_fast_hash(&tx.prefix_blob())
}

/// Full hash and blob size computed from scratch, bypassing the cache.
pub fn calculate_transaction_hash(tx: &Transaction) -> (Hash, usize) {
    get_object_hash(tx)
}

/// Prefix hash with `extra` swapped for another buffer. Used to sign a
/// transaction over everything except the records the signature lives in.
pub fn transaction_prefix_hash_with_extra(tx: &Transaction, extra: &[u8]) -> Hash {
    let mut w = BlobWriter::new();
    tx.encode_prefix_with_extra(&mut w, extra);
    cn_fast_hash(&w.into_inner())
}

pub fn transaction_prefix_hash(tx: &Transaction) -> Hash {
    tx.prefix_hash()
}

pub fn transaction_hash(tx: &Transaction) -> Hash {
    tx.hash()
}

pub fn transaction_hash_and_size(tx: &Transaction) -> (Hash, usize) {
    tx.hash_and_size()
}

/// Decode a transaction and return it with its hash and prefix hash.
///
/// The full-hash cache is seeded from the received bytes, which are the
/// canonical encoding since decoding is strict.
pub fn parse_and_validate_tx_from_blob(blob: &[u8]) -> Result<(Transaction, Hash, Hash), CodecError> {
    let tx: Transaction = from_blob(blob)?;
    let hash = cn_fast_hash(blob);
    tx.seed_hash(hash, blob.len());
    let prefix_hash = tx.prefix_hash();
    Ok((tx, hash, prefix_hash))
}

// ---------------------------------------------------------------------------
// Blocks
// ---------------------------------------------------------------------------

/// Merkle root over transaction hashes.
pub fn tx_tree_hash(hashes: &[Hash]) -> Hash {
    tree_hash(hashes)
}

/// Merkle root over `[miner_tx_hash] ++ tx_hashes`.
pub fn block_tx_tree_hash(block: &Block) -> Hash {
    let mut leaves = Vec::with_capacity(block.tx_hashes().len() + 1);
    leaves.push(block.miner_tx().hash());
    leaves.extend_from_slice(block.tx_hashes());
    tree_hash(&leaves)
}

/// Header blob, merkle root, then the transaction count (miner tx
/// included) as a varint.
pub fn block_hashing_blob(block: &Block) -> Vec<u8> {
    let mut w = BlobWriter::new();
    w.put(block.header());
    w.put(&block_tx_tree_hash(block));
    w.put_varint(block.tx_hashes().len() as u64 + 1);
    w.into_inner()
}

/// Block id computed from scratch, bypassing the cache.
pub fn calculate_block_hash(block: &Block) -> Hash {
    let blob = block_hashing_blob(block);
    let mut framed = Vec::with_capacity(varint_len(blob.len() as u64) + blob.len());
    crate::codec::write_varint(&mut framed, blob.len() as u64);
    framed.extend_from_slice(&blob);
    cn_fast_hash(&framed)
}

pub fn block_hash(block: &Block) -> Hash {
    block.hash()
}

/// Decode a block and return it with its id.
pub fn parse_and_validate_block_from_blob(blob: &[u8]) -> Result<(Block, Hash), CodecError> {
    let block: Block = from_blob(blob)?;
    let id = block.hash();
    Ok((block, id))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::block::BlockHeader;
    use crate::crypto::{PublicKey, Signature};
    use crate::transaction::{TransactionBuilder, TxIn, TxOut};

    fn coinbase(height: u64) -> Transaction {
        let mut extra = vec![0x01];
        extra.extend_from_slice(&[4; 32]);
        TransactionBuilder::new()
            .unlock_time(height + 60)
            .input(TxIn::Gen { height })
            .output(TxOut::to_key(17_592_186_044_415, PublicKey([3; 32])))
            .extra(extra)
            .build()
    }

    fn sample_block() -> Block {
        let header = BlockHeader {
            major_version: 1,
            minor_version: 0,
            timestamp: 1_520_000_000,
            prev_id: Hash([0x11; 32]),
            nonce: 42,
        };
        Block::new(header, coinbase(10), vec![Hash([0x22; 32]), Hash([0x33; 32])])
    }

    #[test]
    fn prefix_hash_excludes_signatures_and_extra2() {
        let mut tx = coinbase(5);
        let before_prefix = tx.prefix_hash();
        let before_full = tx.hash();

        tx.signatures_mut().push(vec![Signature([1; 64])]);
        tx.extra2_mut().extend_from_slice(&[0x84, 0x01, 0x00]);

        assert_eq!(tx.prefix_hash(), before_prefix);
        assert_ne!(tx.hash(), before_full);
    }

    #[test]
    fn cached_equals_fresh() {
        let tx = coinbase(7);
        assert_eq!(tx.hash_and_size(), calculate_transaction_hash(&tx));
        assert_eq!(tx.prefix_hash(), calculate_transaction_prefix_hash(&tx));
        // Second query served from cache, same answer.
        assert_eq!(tx.hash_and_size(), calculate_transaction_hash(&tx));
    }

    #[test]
    fn mutation_invalidates_cache() {
        let mut tx = coinbase(7);
        let h1 = tx.hash();
        tx.set_unlock_time(999);
        let h2 = tx.hash();
        assert_ne!(h1, h2);
        assert_eq!(h2, calculate_transaction_hash(&tx).0);
    }

    #[test]
    fn counters_track_hits_and_misses() {
        let tx = coinbase(8);
        let before = hash_stats();
        tx.hash();
        tx.hash();
        tx.hash();
        let after = hash_stats();
        // Other tests run concurrently and also bump the counters.
        assert!(after.tx_hashes_calculated >= before.tx_hashes_calculated + 1);
        assert!(after.tx_hashes_cached >= before.tx_hashes_cached + 2);
    }

    #[test]
    fn parse_seeds_cache_with_blob_hash() {
        let tx = coinbase(9);
        let blob = to_blob(&tx);
        let (parsed, hash, prefix) = parse_and_validate_tx_from_blob(&blob).unwrap();
        assert_eq!(parsed, tx);
        assert_eq!(hash, cn_fast_hash(&blob));
        assert_eq!(prefix, tx.prefix_hash());
        assert_eq!(parsed.blob_size(), blob.len());
    }

    #[test]
    fn block_hash_is_framed_hashing_blob() {
        let block = sample_block();
        let hb = block_hashing_blob(&block);
        let mut framed = Vec::new();
        crate::codec::write_varint(&mut framed, hb.len() as u64);
        framed.extend_from_slice(&hb);
        assert_eq!(block.hash(), cn_fast_hash(&framed));
        assert_eq!(block_hash(&block), calculate_block_hash(&block));
    }

    #[test]
    fn hashing_blob_ends_with_tx_count() {
        let block = sample_block();
        let hb = block_hashing_blob(&block);
        // header: 1 + 1 + 5 (timestamp varint) + 32 + 4 = 43, root 32, count 1.
        assert_eq!(hb.len(), 43 + 32 + 1);
        assert_eq!(*hb.last().unwrap(), 3);
    }

    #[test]
    fn block_hash_ignores_nothing_in_header() {
        let mut block = sample_block();
        let h1 = block.hash();
        block.header_mut().nonce += 1;
        assert_ne!(block.hash(), h1);
    }

    #[test]
    fn miner_tx_mutation_changes_block_hash() {
        let mut block = sample_block();
        let h1 = block.hash();
        block.miner_tx_mut().set_unlock_time(1);
        assert_ne!(block.hash(), h1);
        assert_eq!(block.hash(), calculate_block_hash(&block));
    }

    #[test]
    fn block_round_trip_through_blob() {
        let block = sample_block();
        let blob = to_blob(&block);
        let (parsed, id) = parse_and_validate_block_from_blob(&blob).unwrap();
        assert_eq!(parsed, block);
        assert_eq!(id, block.hash());
    }
}

//! # Block Structure
//!
//! A block is a header, the miner (coinbase) transaction and the hashes of
//! the ordinary transactions it includes. The bodies of those transactions
//! travel separately; the block only commits to them by hash.
//!
//! ## Block Layout
//!
//! ```text
//! ┌─────────────────────────────────────────────┐
//! │  BlockHeader                                │
//! │  ├── major_version: varint                  │
//! │  ├── minor_version: varint                  │
//! │  ├── timestamp: varint                      │
//! │  ├── prev_id: [u8; 32]                      │
//! │  └── nonce: u32 (little endian)             │
//! ├─────────────────────────────────────────────┤
//! │  miner_tx: Transaction                      │
//! │  tx_hashes: vec<[u8; 32]>                   │
//! └─────────────────────────────────────────────┘
//! ```
//!
//! ## Hash Computation
//!
//! See [`crate::hashing`]: the id covers the header, the tree hash of
//! `[miner_tx_hash] ++ tx_hashes` and the transaction count. The id is
//! cached in the block and dropped by every `*_mut` accessor.

use serde::{Deserialize, Serialize};

use crate::codec::{BlobDecode, BlobEncode, BlobReader, BlobWriter, CodecError};
use crate::crypto::Hash;
use crate::hashing::{calculate_block_hash, HashCell, HashKind};
use crate::transaction::Transaction;

// ---------------------------------------------------------------------------
// BlockHeader
// ---------------------------------------------------------------------------

/// Everything that precedes the transactions.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockHeader {
    pub major_version: u8,
    pub minor_version: u8,
    /// Unix timestamp in seconds.
    pub timestamp: u64,
    /// Id of the parent block. All zeros for genesis.
    pub prev_id: Hash,
    pub nonce: u32,
}

fn get_version_byte(r: &mut BlobReader<'_>, what: &str) -> Result<u8, CodecError> {
    let v = r.get_varint()?;
    u8::try_from(v).map_err(|_| CodecError::malformed(format!("{what} {v} does not fit in a byte")))
}

impl BlobEncode for BlockHeader {
    fn encode(&self, w: &mut BlobWriter) {
        w.put_varint(u64::from(self.major_version));
        w.put_varint(u64::from(self.minor_version));
        w.put_varint(self.timestamp);
        w.put(&self.prev_id);
        w.put_u32_le(self.nonce);
    }
}

impl BlobDecode for BlockHeader {
    const MIN_ENCODED_LEN: usize = 3 + Hash::LEN + 4;

    fn decode(r: &mut BlobReader<'_>) -> Result<Self, CodecError> {
        Ok(BlockHeader {
            major_version: get_version_byte(r, "major version")?,
            minor_version: get_version_byte(r, "minor version")?,
            timestamp: r.get_varint()?,
            prev_id: r.get()?,
            nonce: r.get_u32_le()?,
        })
    }
}

// ---------------------------------------------------------------------------
// Block
// ---------------------------------------------------------------------------

/// A full block: header, miner transaction and included transaction hashes.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Block {
    header: BlockHeader,
    miner_tx: Transaction,
    tx_hashes: Vec<Hash>,
    #[serde(skip)]
    cache: HashCell<Hash>,
}

impl PartialEq for Block {
    fn eq(&self, other: &Self) -> bool {
        self.header == other.header
            && self.miner_tx == other.miner_tx
            && self.tx_hashes == other.tx_hashes
    }
}

impl Eq for Block {}

impl Block {
    pub fn new(header: BlockHeader, miner_tx: Transaction, tx_hashes: Vec<Hash>) -> Self {
        Self {
            header,
            miner_tx,
            tx_hashes,
            cache: HashCell::default(),
        }
    }

    pub fn header(&self) -> &BlockHeader {
        &self.header
    }

    pub fn miner_tx(&self) -> &Transaction {
        &self.miner_tx
    }

    pub fn tx_hashes(&self) -> &[Hash] {
        &self.tx_hashes
    }

    pub fn header_mut(&mut self) -> &mut BlockHeader {
        self.cache.clear();
        &mut self.header
    }

    pub fn miner_tx_mut(&mut self) -> &mut Transaction {
        self.cache.clear();
        &mut self.miner_tx
    }

    pub fn tx_hashes_mut(&mut self) -> &mut Vec<Hash> {
        self.cache.clear();
        &mut self.tx_hashes
    }

    /// The block id.
    pub fn hash(&self) -> Hash {
        self.cache
            .get_or_compute(HashKind::Block, || calculate_block_hash(self))
    }

    /// Height from the miner transaction's `Gen` input.
    pub fn height(&self) -> Option<u64> {
        crate::transaction::amount::get_block_height(self)
    }
}

impl BlobEncode for Block {
    fn encode(&self, w: &mut BlobWriter) {
        w.put(&self.header);
        w.put(&self.miner_tx);
        w.put_vec(&self.tx_hashes);
    }
}

impl BlobDecode for Block {
    fn decode(r: &mut BlobReader<'_>) -> Result<Self, CodecError> {
        Ok(Block::new(r.get()?, r.get()?, r.get_vec()?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::{from_blob, to_blob};
    use crate::transaction::{TransactionBuilder, TxIn};

    fn genesis_like() -> Block {
        let miner_tx = TransactionBuilder::new()
            .unlock_time(60)
            .input(TxIn::Gen { height: 0 })
            .build();
        Block::new(BlockHeader::default(), miner_tx, Vec::new())
    }

    #[test]
    fn header_layout() {
        let header = BlockHeader {
            major_version: 7,
            minor_version: 7,
            timestamp: 0,
            prev_id: Hash([0xee; 32]),
            nonce: 0x0a0b0c0d,
        };
        let blob = to_blob(&header);
        assert_eq!(blob.len(), 3 + 32 + 4);
        assert_eq!(&blob[..3], &[7, 7, 0]);
        assert_eq!(&blob[35..], &[0x0d, 0x0c, 0x0b, 0x0a]);
    }

    #[test]
    fn oversized_version_rejected() {
        let mut blob = Vec::new();
        crate::codec::write_varint(&mut blob, 256);
        blob.extend_from_slice(&[0; 38]);
        assert!(from_blob::<BlockHeader>(&blob).is_err());
    }

    #[test]
    fn height_comes_from_miner_tx() {
        assert_eq!(genesis_like().height(), Some(0));
    }

    #[test]
    fn block_blob_round_trip() {
        let mut block = genesis_like();
        block.tx_hashes_mut().push(Hash([1; 32]));
        let blob = to_blob(&block);
        let back: Block = from_blob(&blob).unwrap();
        assert_eq!(back, block);
        assert_eq!(back.hash(), block.hash());
    }

    #[test]
    fn tx_hash_list_changes_id() {
        let mut block = genesis_like();
        let id = block.hash();
        block.tx_hashes_mut().push(Hash([9; 32]));
        assert_ne!(block.hash(), id);
    }
}

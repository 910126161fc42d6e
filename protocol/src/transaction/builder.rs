//! The [`Transaction`] value and its [`TransactionBuilder`].
//!
//! Fields are private on purpose. Every hash the transaction has ever
//! reported is memoized inside it, and the only way to change a field is
//! through a setter or `*_mut` accessor that drops those memos first. If
//! the fields were public, one forgotten invalidation would hand out a
//! stale transaction id.

use serde::{Deserialize, Serialize};

use super::types::{hex_bytes, TxIn, TxOut};
use crate::codec::{to_blob, BlobDecode, BlobEncode, BlobReader, BlobWriter, CodecError};
use crate::config::CURRENT_TRANSACTION_VERSION;
use crate::crypto::{cn_fast_hash, Hash, Signature};
use crate::hashing::{HashKind, TxHashCache};

// ---------------------------------------------------------------------------
// Transaction
// ---------------------------------------------------------------------------

/// A transaction: the prefix (version, unlock time, inputs, outputs,
/// `extra`), then per-input signature groups and the `extra2` buffer.
///
/// # Canonical byte format
///
/// ```text
/// varint version ‖ varint unlock_time ‖ vec<TxIn> ‖ vec<TxOut> ‖ blob extra   (prefix)
/// ‖ vec<vec<Signature>> ‖ blob extra2
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Transaction {
    version: u64,
    unlock_time: u64,
    inputs: Vec<TxIn>,
    outputs: Vec<TxOut>,
    #[serde(with = "hex_bytes")]
    extra: Vec<u8>,
    signatures: Vec<Vec<Signature>>,
    #[serde(with = "hex_bytes")]
    extra2: Vec<u8>,
    #[serde(skip)]
    cache: TxHashCache,
}

impl PartialEq for Transaction {
    fn eq(&self, other: &Self) -> bool {
        self.version == other.version
            && self.unlock_time == other.unlock_time
            && self.inputs == other.inputs
            && self.outputs == other.outputs
            && self.extra == other.extra
            && self.signatures == other.signatures
            && self.extra2 == other.extra2
    }
}

impl Eq for Transaction {}

impl Default for Transaction {
    fn default() -> Self {
        TransactionBuilder::new().build()
    }
}

impl Transaction {
    pub fn version(&self) -> u64 {
        self.version
    }

    pub fn unlock_time(&self) -> u64 {
        self.unlock_time
    }

    pub fn inputs(&self) -> &[TxIn] {
        &self.inputs
    }

    pub fn outputs(&self) -> &[TxOut] {
        &self.outputs
    }

    pub fn extra(&self) -> &[u8] {
        &self.extra
    }

    pub fn signatures(&self) -> &[Vec<Signature>] {
        &self.signatures
    }

    pub fn extra2(&self) -> &[u8] {
        &self.extra2
    }

    pub fn is_coinbase(&self) -> bool {
        matches!(self.inputs.as_slice(), [TxIn::Gen { .. }])
    }

    // -- mutation: every path clears the cache ------------------------------

    pub fn set_version(&mut self, version: u64) {
        self.cache.invalidate();
        self.version = version;
    }

    pub fn set_unlock_time(&mut self, unlock_time: u64) {
        self.cache.invalidate();
        self.unlock_time = unlock_time;
    }

    pub fn inputs_mut(&mut self) -> &mut Vec<TxIn> {
        self.cache.invalidate();
        &mut self.inputs
    }

    pub fn outputs_mut(&mut self) -> &mut Vec<TxOut> {
        self.cache.invalidate();
        &mut self.outputs
    }

    pub fn extra_mut(&mut self) -> &mut Vec<u8> {
        self.cache.invalidate();
        &mut self.extra
    }

    /// Signatures sit outside the prefix, so only the full hash is dropped.
    pub fn signatures_mut(&mut self) -> &mut Vec<Vec<Signature>> {
        self.cache.full.clear();
        &mut self.signatures
    }

    /// `extra2` sits outside the prefix, so only the full hash is dropped.
    pub fn extra2_mut(&mut self) -> &mut Vec<u8> {
        self.cache.full.clear();
        &mut self.extra2
    }

    /// Forget every memoized hash.
    pub fn invalidate_hashes(&mut self) {
        self.cache.invalidate();
    }

    // -- encoding & hashing -------------------------------------------------

    pub(crate) fn encode_prefix_with_extra(&self, w: &mut BlobWriter, extra: &[u8]) {
        w.put_varint(self.version);
        w.put_varint(self.unlock_time);
        w.put_vec(&self.inputs);
        w.put_vec(&self.outputs);
        w.put_blob(extra);
    }

    /// Canonical encoding of the prefix only.
    pub fn prefix_blob(&self) -> Vec<u8> {
        let mut w = BlobWriter::new();
        self.encode_prefix_with_extra(&mut w, &self.extra);
        w.into_inner()
    }

    /// Canonical encoding of the whole transaction.
    pub fn to_blob(&self) -> Vec<u8> {
        to_blob(self)
    }

    /// Keccak of the prefix blob; the message supernodes sign.
    pub fn prefix_hash(&self) -> Hash {
        self.cache
            .prefix
            .get_or_compute(HashKind::TxPrefix, || cn_fast_hash(&self.prefix_blob()))
    }

    /// Keccak of the full blob together with the blob's length.
    pub fn hash_and_size(&self) -> (Hash, usize) {
        self.cache.full.get_or_compute(HashKind::Transaction, || {
            let blob = self.to_blob();
            (cn_fast_hash(&blob), blob.len())
        })
    }

    /// The transaction id.
    pub fn hash(&self) -> Hash {
        self.hash_and_size().0
    }

    pub fn blob_size(&self) -> usize {
        self.hash_and_size().1
    }

    pub(crate) fn seed_hash(&self, hash: Hash, blob_size: usize) {
        self.cache.full.seed((hash, blob_size));
    }

    #[cfg(test)]
    pub(crate) fn has_cached_hashes(&self) -> (bool, bool) {
        (self.cache.prefix.is_filled(), self.cache.full.is_filled())
    }
}

impl BlobEncode for Transaction {
    fn encode(&self, w: &mut BlobWriter) {
        self.encode_prefix_with_extra(w, &self.extra);
        w.put_vec(&self.signatures);
        w.put_blob(&self.extra2);
    }
}

impl BlobDecode for Transaction {
    // version, unlock_time, two empty vecs, empty extra, empty sigs, empty extra2
    const MIN_ENCODED_LEN: usize = 7;

    fn decode(r: &mut BlobReader<'_>) -> Result<Self, CodecError> {
        Ok(Transaction {
            version: r.get_varint()?,
            unlock_time: r.get_varint()?,
            inputs: r.get_vec()?,
            outputs: r.get_vec()?,
            extra: r.get_blob()?.to_vec(),
            signatures: r.get_vec()?,
            extra2: r.get_blob()?.to_vec(),
            cache: TxHashCache::default(),
        })
    }
}

// ---------------------------------------------------------------------------
// TransactionBuilder
// ---------------------------------------------------------------------------

/// Fluent builder for [`Transaction`] values.
///
/// ```
/// use graft_rta_core::crypto::PublicKey;
/// use graft_rta_core::transaction::{TransactionBuilder, TxIn, TxOut};
///
/// let tx = TransactionBuilder::new()
///     .input(TxIn::Gen { height: 100 })
///     .output(TxOut::to_key(1_000, PublicKey([1; 32])))
///     .build();
/// assert!(tx.is_coinbase());
/// ```
#[derive(Debug, Clone)]
pub struct TransactionBuilder {
    version: u64,
    unlock_time: u64,
    inputs: Vec<TxIn>,
    outputs: Vec<TxOut>,
    extra: Vec<u8>,
    signatures: Vec<Vec<Signature>>,
    extra2: Vec<u8>,
}

impl Default for TransactionBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl TransactionBuilder {
    /// Empty transaction at the current version.
    pub fn new() -> Self {
        Self {
            version: CURRENT_TRANSACTION_VERSION,
            unlock_time: 0,
            inputs: Vec::new(),
            outputs: Vec::new(),
            extra: Vec::new(),
            signatures: Vec::new(),
            extra2: Vec::new(),
        }
    }

    pub fn version(mut self, version: u64) -> Self {
        self.version = version;
        self
    }

    pub fn unlock_time(mut self, unlock_time: u64) -> Self {
        self.unlock_time = unlock_time;
        self
    }

    pub fn input(mut self, input: TxIn) -> Self {
        self.inputs.push(input);
        self
    }

    pub fn inputs(mut self, inputs: Vec<TxIn>) -> Self {
        self.inputs = inputs;
        self
    }

    pub fn output(mut self, output: TxOut) -> Self {
        self.outputs.push(output);
        self
    }

    pub fn outputs(mut self, outputs: Vec<TxOut>) -> Self {
        self.outputs = outputs;
        self
    }

    pub fn extra(mut self, extra: Vec<u8>) -> Self {
        self.extra = extra;
        self
    }

    pub fn signatures(mut self, signatures: Vec<Vec<Signature>>) -> Self {
        self.signatures = signatures;
        self
    }

    pub fn extra2(mut self, extra2: Vec<u8>) -> Self {
        self.extra2 = extra2;
        self
    }

    pub fn build(self) -> Transaction {
        Transaction {
            version: self.version,
            unlock_time: self.unlock_time,
            inputs: self.inputs,
            outputs: self.outputs,
            extra: self.extra,
            signatures: self.signatures,
            extra2: self.extra2,
            cache: TxHashCache::default(),
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::from_blob;
    use crate::crypto::{KeyImage, PublicKey};

    fn sample_tx() -> Transaction {
        TransactionBuilder::new()
            .unlock_time(1_000)
            .input(TxIn::ToKey {
                amount: 90_000,
                key_offsets: vec![5, 2, 9],
                key_image: KeyImage([0xaa; 32]),
            })
            .output(TxOut::to_key(80_000, PublicKey([1; 32])))
            .output(TxOut::to_key(9_000, PublicKey([2; 32])))
            .extra(vec![0x02, 0x03, 0xde, 0xad, 0x00])
            .signatures(vec![vec![Signature([0x5a; 64]); 3]])
            .build()
    }

    #[test]
    fn builder_produces_deterministic_hash() {
        assert_eq!(sample_tx().hash(), sample_tx().hash());
    }

    #[test]
    fn blob_round_trip_preserves_everything() {
        let tx = sample_tx();
        let blob = tx.to_blob();
        let back: Transaction = from_blob(&blob).unwrap();
        assert_eq!(back, tx);
        assert_eq!(back.to_blob(), blob);
    }

    #[test]
    fn prefix_blob_is_a_prefix_of_full_blob() {
        let tx = sample_tx();
        let prefix = tx.prefix_blob();
        let full = tx.to_blob();
        assert!(full.starts_with(&prefix));
        assert!(full.len() > prefix.len() + 3 * 64);
    }

    #[test]
    fn truncated_blob_rejected() {
        let blob = sample_tx().to_blob();
        for cut in [1, 10, blob.len() / 2, blob.len() - 1] {
            assert!(from_blob::<Transaction>(&blob[..cut]).is_err(), "cut at {cut}");
        }
    }

    #[test]
    fn equality_ignores_cache_state() {
        let a = sample_tx();
        let b = sample_tx();
        a.hash();
        assert_eq!(a, b);
        assert_eq!(a.has_cached_hashes(), (false, true));
        assert_eq!(b.has_cached_hashes(), (false, false));
    }

    #[test]
    fn mutators_clear_the_cache() {
        let mut tx = sample_tx();
        tx.prefix_hash();
        tx.hash();
        assert_eq!(tx.has_cached_hashes(), (true, true));

        tx.extra2_mut().push(0);
        assert_eq!(tx.has_cached_hashes(), (true, false));

        tx.hash();
        tx.outputs_mut().clear();
        assert_eq!(tx.has_cached_hashes(), (false, false));
    }

    #[test]
    fn coinbase_detection() {
        let cb = TransactionBuilder::new().input(TxIn::Gen { height: 1 }).build();
        assert!(cb.is_coinbase());
        assert!(!sample_tx().is_coinbase());
    }

    #[test]
    fn transaction_json_roundtrip() {
        let tx = sample_tx();
        let json = serde_json::to_string(&tx).unwrap();
        assert!(json.contains("\"extra\":\"0203dead00\""));
        let recovered: Transaction = serde_json::from_str(&json).unwrap();
        assert_eq!(tx, recovered);
    }
}

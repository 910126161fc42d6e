//! Record payload types and their canonical encodings.
//!
//! Only the payload lives here; the tag byte and the outer length prefix
//! are written by [`super::codec`].

use serde::{Deserialize, Serialize};

use crate::codec::{BlobDecode, BlobEncode, BlobReader, BlobWriter, CodecError};
use crate::crypto::{AccountPublicAddress, Hash, PublicKey, SecretKey, Signature, SupernodeKey};
use crate::transaction::types::hex_bytes;

/// Trailing zero padding. `size` counts the tag byte.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtraPadding {
    pub size: usize,
}

/// Free-form nonce bytes (payment ids live in here).
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ExtraNonce(#[serde(with = "hex_bytes")] pub Vec<u8>);

/// Merge-mining commitment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MergeMiningTag {
    pub depth: u64,
    pub merkle_root: Hash,
}

impl BlobEncode for MergeMiningTag {
    fn encode(&self, w: &mut BlobWriter) {
        w.put_varint(self.depth);
        w.put(&self.merkle_root);
    }
}

impl BlobDecode for MergeMiningTag {
    fn decode(r: &mut BlobReader<'_>) -> Result<Self, CodecError> {
        Ok(Self {
            depth: r.get_varint()?,
            merkle_root: r.get()?,
        })
    }
}

/// Per-output public keys for transactions paying subaddresses.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct AdditionalPublicKeys(pub Vec<PublicKey>);

/// A supernode's stake declaration.
///
/// The signature is made by the supernode's Ed25519 key (whose hex form is
/// `supernode_public_id`) over the stake signing hash of the transaction;
/// see [`crate::rta::stake_signing_hash`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StakeDeclaration {
    pub supernode_public_id: String,
    pub supernode_public_address: AccountPublicAddress,
    pub supernode_signature: Signature,
}

impl BlobEncode for StakeDeclaration {
    fn encode(&self, w: &mut BlobWriter) {
        w.put_string(&self.supernode_public_id);
        w.put(&self.supernode_public_address);
        w.put(&self.supernode_signature);
    }
}

impl BlobDecode for StakeDeclaration {
    fn decode(r: &mut BlobReader<'_>) -> Result<Self, CodecError> {
        Ok(Self {
            supernode_public_id: r.get_string()?,
            supernode_public_address: r.get()?,
            supernode_signature: r.get()?,
        })
    }
}

/// The one-time secret key of a stake transaction, published so anyone can
/// check which outputs belong to the stake.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StakeSecretKey(pub SecretKey);

/// Quorum binding for an RTA payment.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct RtaHeader {
    pub payment_id: String,
    /// Block height the auth sample was selected at.
    pub auth_sample_height: u64,
    /// Supernodes expected to sign, indexed by `RtaSignature::key_index`.
    pub keys: Vec<SupernodeKey>,
}

impl BlobEncode for RtaHeader {
    fn encode(&self, w: &mut BlobWriter) {
        w.put_string(&self.payment_id);
        w.put_varint(self.auth_sample_height);
        w.put_vec(&self.keys);
    }
}

impl BlobDecode for RtaHeader {
    fn decode(r: &mut BlobReader<'_>) -> Result<Self, CodecError> {
        Ok(Self {
            payment_id: r.get_string()?,
            auth_sample_height: r.get_varint()?,
            keys: r.get_vec()?,
        })
    }
}

/// One quorum member's signature over the transaction prefix hash.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RtaSignature {
    pub key_index: u64,
    pub signature: Signature,
}

impl BlobEncode for RtaSignature {
    fn encode(&self, w: &mut BlobWriter) {
        w.put_varint(self.key_index);
        w.put(&self.signature);
    }
}

impl BlobDecode for RtaSignature {
    const MIN_ENCODED_LEN: usize = 1 + Signature::LEN;

    fn decode(r: &mut BlobReader<'_>) -> Result<Self, CodecError> {
        Ok(Self {
            key_index: r.get_varint()?,
            signature: r.get()?,
        })
    }
}

/// The signature set record kept in `extra2`.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct RtaSignatureSet(pub Vec<RtaSignature>);

/// Opaque bytes some pool software writes under tag `0xDE`.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct MinergateData(#[serde(with = "hex_bytes")] pub Vec<u8>);

/// A record with a tag this build does not know, kept byte for byte.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnknownField {
    pub tag: u8,
    #[serde(with = "hex_bytes")]
    pub payload: Vec<u8>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::{from_blob, to_blob};

    #[test]
    fn rta_header_layout() {
        let header = RtaHeader {
            payment_id: "pay-1".into(),
            auth_sample_height: 300,
            keys: vec![SupernodeKey([1; 32]), SupernodeKey([2; 32])],
        };
        let blob = to_blob(&header);
        // len + "pay-1", varint 300 (2 bytes), count, 2 keys
        assert_eq!(blob.len(), 1 + 5 + 2 + 1 + 64);
        assert_eq!(&blob[..6], b"\x05pay-1");
        assert_eq!(from_blob::<RtaHeader>(&blob).unwrap(), header);
    }

    #[test]
    fn stake_declaration_layout() {
        let decl = StakeDeclaration {
            supernode_public_id: "ab".repeat(32),
            supernode_public_address: AccountPublicAddress::default(),
            supernode_signature: Signature([7; 64]),
        };
        let blob = to_blob(&decl);
        assert_eq!(blob.len(), 1 + 64 + 64 + 64);
        assert_eq!(from_blob::<StakeDeclaration>(&blob).unwrap(), decl);
    }

    #[test]
    fn rta_signature_set_rejects_implausible_count() {
        // Claims 3 signatures but carries bytes for one.
        let mut blob = vec![3u8];
        blob.extend_from_slice(&to_blob(&RtaSignature {
            key_index: 0,
            signature: Signature([1; 64]),
        }));
        assert!(from_blob::<Vec<RtaSignature>>(&blob).is_err());
    }
}

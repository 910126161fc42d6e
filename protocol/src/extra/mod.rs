//! # Extra-Field Registry
//!
//! A transaction's `extra` buffer (and the second-stage `extra2`) is a run
//! of tagged records. The set of record types is closed: each tag maps to
//! one [`ExtraField`] variant, and tags nobody registered come back as
//! [`ExtraField::Unknown`] with their payload intact, so re-composing a
//! parsed buffer never loses data.
//!
//! Records keep the order they were written in and duplicates are legal;
//! [`find_field`] picks the Nth occurrence of a type. Whether duplicates
//! *mean* anything is up to the caller (the RTA layer, for example, treats
//! two RTA headers as a structural violation).

pub mod codec;
pub mod fields;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::codec::{BlobWriter, CodecError};
use crate::config::{
    MAX_TX_EXTRA_SIZE, TX_EXTRA_GRAFT_RTA_HEADER_TAG, TX_EXTRA_GRAFT_RTA_SIGNATURES_TAG,
    TX_EXTRA_GRAFT_STAKE_SECRET_KEY_TAG, TX_EXTRA_GRAFT_STAKE_TX_TAG, TX_EXTRA_MERGE_MINING_TAG,
    TX_EXTRA_MYSTERIOUS_MINERGATE_TAG, TX_EXTRA_NONCE, TX_EXTRA_NONCE_MAX_COUNT,
    TX_EXTRA_TAG_ADDITIONAL_PUBKEYS, TX_EXTRA_TAG_PADDING, TX_EXTRA_TAG_PUBKEY,
};
use crate::crypto::PublicKey;

pub use codec::{compose_extra, encode_field, parse_extra, remove_field_from_extra};
pub use fields::{
    AdditionalPublicKeys, ExtraNonce, ExtraPadding, MergeMiningTag, MinergateData, RtaHeader,
    RtaSignature, RtaSignatureSet, StakeDeclaration, StakeSecretKey, UnknownField,
};

// ---------------------------------------------------------------------------
// Registry
// ---------------------------------------------------------------------------

/// One parsed record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum ExtraField {
    Padding(ExtraPadding),
    TxPublicKey(PublicKey),
    Nonce(ExtraNonce),
    MergeMining(MergeMiningTag),
    AdditionalPublicKeys(AdditionalPublicKeys),
    StakeDeclaration(StakeDeclaration),
    StakeSecretKey(StakeSecretKey),
    RtaHeader(RtaHeader),
    RtaSignatures(RtaSignatureSet),
    MysteriousMinergate(MinergateData),
    Unknown(UnknownField),
}

/// Record type without its payload, for lookups and removal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ExtraFieldKind {
    Padding,
    TxPublicKey,
    Nonce,
    MergeMining,
    AdditionalPublicKeys,
    StakeDeclaration,
    StakeSecretKey,
    RtaHeader,
    RtaSignatures,
    MysteriousMinergate,
    Unknown(u8),
}

impl ExtraFieldKind {
    pub fn from_tag(tag: u8) -> Self {
        match tag {
            TX_EXTRA_TAG_PADDING => Self::Padding,
            TX_EXTRA_TAG_PUBKEY => Self::TxPublicKey,
            TX_EXTRA_NONCE => Self::Nonce,
            TX_EXTRA_MERGE_MINING_TAG => Self::MergeMining,
            TX_EXTRA_TAG_ADDITIONAL_PUBKEYS => Self::AdditionalPublicKeys,
            TX_EXTRA_GRAFT_STAKE_TX_TAG => Self::StakeDeclaration,
            TX_EXTRA_GRAFT_STAKE_SECRET_KEY_TAG => Self::StakeSecretKey,
            TX_EXTRA_GRAFT_RTA_HEADER_TAG => Self::RtaHeader,
            TX_EXTRA_GRAFT_RTA_SIGNATURES_TAG => Self::RtaSignatures,
            TX_EXTRA_MYSTERIOUS_MINERGATE_TAG => Self::MysteriousMinergate,
            other => Self::Unknown(other),
        }
    }

    pub fn tag(self) -> u8 {
        match self {
            Self::Padding => TX_EXTRA_TAG_PADDING,
            Self::TxPublicKey => TX_EXTRA_TAG_PUBKEY,
            Self::Nonce => TX_EXTRA_NONCE,
            Self::MergeMining => TX_EXTRA_MERGE_MINING_TAG,
            Self::AdditionalPublicKeys => TX_EXTRA_TAG_ADDITIONAL_PUBKEYS,
            Self::StakeDeclaration => TX_EXTRA_GRAFT_STAKE_TX_TAG,
            Self::StakeSecretKey => TX_EXTRA_GRAFT_STAKE_SECRET_KEY_TAG,
            Self::RtaHeader => TX_EXTRA_GRAFT_RTA_HEADER_TAG,
            Self::RtaSignatures => TX_EXTRA_GRAFT_RTA_SIGNATURES_TAG,
            Self::MysteriousMinergate => TX_EXTRA_MYSTERIOUS_MINERGATE_TAG,
            Self::Unknown(tag) => tag,
        }
    }
}

impl ExtraField {
    pub fn kind(&self) -> ExtraFieldKind {
        match self {
            ExtraField::Padding(_) => ExtraFieldKind::Padding,
            ExtraField::TxPublicKey(_) => ExtraFieldKind::TxPublicKey,
            ExtraField::Nonce(_) => ExtraFieldKind::Nonce,
            ExtraField::MergeMining(_) => ExtraFieldKind::MergeMining,
            ExtraField::AdditionalPublicKeys(_) => ExtraFieldKind::AdditionalPublicKeys,
            ExtraField::StakeDeclaration(_) => ExtraFieldKind::StakeDeclaration,
            ExtraField::StakeSecretKey(_) => ExtraFieldKind::StakeSecretKey,
            ExtraField::RtaHeader(_) => ExtraFieldKind::RtaHeader,
            ExtraField::RtaSignatures(_) => ExtraFieldKind::RtaSignatures,
            ExtraField::MysteriousMinergate(_) => ExtraFieldKind::MysteriousMinergate,
            ExtraField::Unknown(u) => ExtraFieldKind::Unknown(u.tag),
        }
    }
}

/// Payload types that can be pulled out of an [`ExtraField`] by type.
pub trait ExtraFieldType: Clone {
    fn from_field(field: &ExtraField) -> Option<&Self>;
}

macro_rules! extra_field_type {
    ($($variant:ident => $ty:ty),* $(,)?) => {
        $(
            impl ExtraFieldType for $ty {
                fn from_field(field: &ExtraField) -> Option<&Self> {
                    match field {
                        ExtraField::$variant(inner) => Some(inner),
                        _ => None,
                    }
                }
            }
        )*
    };
}

extra_field_type! {
    Padding => ExtraPadding,
    TxPublicKey => PublicKey,
    Nonce => ExtraNonce,
    MergeMining => MergeMiningTag,
    AdditionalPublicKeys => AdditionalPublicKeys,
    StakeDeclaration => StakeDeclaration,
    StakeSecretKey => StakeSecretKey,
    RtaHeader => RtaHeader,
    RtaSignatures => RtaSignatureSet,
    MysteriousMinergate => MinergateData,
    Unknown => UnknownField,
}

/// The `index`-th record of type `T`, if there is one.
pub fn find_field<T: ExtraFieldType>(fields: &[ExtraField], index: usize) -> Option<T> {
    fields.iter().filter_map(T::from_field).nth(index).cloned()
}

/// Number of records of type `T`.
pub fn count_fields<T: ExtraFieldType>(fields: &[ExtraField]) -> usize {
    fields.iter().filter_map(T::from_field).count()
}

// ---------------------------------------------------------------------------
// Append helpers
// ---------------------------------------------------------------------------

/// Append one record to a raw buffer.
pub fn add_field_to_extra(extra: &mut Vec<u8>, field: &ExtraField) -> Result<(), CodecError> {
    let mut w = BlobWriter::new();
    codec::write_field(&mut w, field)?;
    if extra.len() + w.len() > MAX_TX_EXTRA_SIZE {
        return Err(CodecError::invalid(format!(
            "appending {} bytes would exceed extra limit {MAX_TX_EXTRA_SIZE}",
            w.len()
        )));
    }
    extra.extend_from_slice(&w.into_inner());
    Ok(())
}

pub fn add_tx_pub_key_to_extra(extra: &mut Vec<u8>, key: &PublicKey) {
    extra.push(TX_EXTRA_TAG_PUBKEY);
    extra.extend_from_slice(key.as_bytes());
}

pub fn add_additional_tx_pub_keys_to_extra(
    extra: &mut Vec<u8>,
    keys: &[PublicKey],
) -> Result<(), CodecError> {
    add_field_to_extra(
        extra,
        &ExtraField::AdditionalPublicKeys(AdditionalPublicKeys(keys.to_vec())),
    )
}

/// Append a nonce record. Nonces longer than 255 bytes are refused.
pub fn add_extra_nonce_to_tx_extra(extra: &mut Vec<u8>, nonce: &[u8]) -> Result<(), CodecError> {
    if nonce.len() > TX_EXTRA_NONCE_MAX_COUNT {
        return Err(CodecError::invalid(format!(
            "nonce of {} bytes exceeds {TX_EXTRA_NONCE_MAX_COUNT}",
            nonce.len()
        )));
    }
    add_field_to_extra(extra, &ExtraField::Nonce(ExtraNonce(nonce.to_vec())))
}

/// The `index`-th transaction public key, or `None` if absent or if the
/// buffer does not parse.
pub fn get_tx_pub_key_from_extra(extra: &[u8], index: usize) -> Option<PublicKey> {
    match parse_extra(extra) {
        Ok(fields) => find_field(&fields, index),
        Err(e) => {
            debug!(error = %e, "tx extra unparseable, no public key");
            None
        }
    }
}

/// All additional per-output public keys (empty if none).
pub fn get_additional_tx_pub_keys_from_extra(extra: &[u8]) -> Result<Vec<PublicKey>, CodecError> {
    let fields = parse_extra(extra)?;
    Ok(find_field::<AdditionalPublicKeys>(&fields, 0)
        .map(|k| k.0)
        .unwrap_or_default())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tag_mapping_is_a_bijection_on_registered_tags() {
        for tag in 0..=255u8 {
            assert_eq!(ExtraFieldKind::from_tag(tag).tag(), tag);
        }
        assert_eq!(ExtraFieldKind::from_tag(0x83), ExtraFieldKind::RtaHeader);
        assert_eq!(ExtraFieldKind::from_tag(0x85), ExtraFieldKind::Unknown(0x85));
    }

    #[test]
    fn find_field_picks_nth_occurrence() {
        let fields = vec![
            ExtraField::TxPublicKey(PublicKey([1; 32])),
            ExtraField::Nonce(ExtraNonce(vec![0xaa])),
            ExtraField::TxPublicKey(PublicKey([2; 32])),
        ];
        assert_eq!(find_field::<PublicKey>(&fields, 0), Some(PublicKey([1; 32])));
        assert_eq!(find_field::<PublicKey>(&fields, 1), Some(PublicKey([2; 32])));
        assert_eq!(find_field::<PublicKey>(&fields, 2), None);
        assert_eq!(find_field::<RtaHeader>(&fields, 0), None);
        assert_eq!(count_fields::<PublicKey>(&fields), 2);
    }

    #[test]
    fn tx_pub_key_helpers() {
        let mut extra = Vec::new();
        add_tx_pub_key_to_extra(&mut extra, &PublicKey([3; 32]));
        add_tx_pub_key_to_extra(&mut extra, &PublicKey([4; 32]));
        assert_eq!(extra.len(), 66);
        assert_eq!(get_tx_pub_key_from_extra(&extra, 0), Some(PublicKey([3; 32])));
        assert_eq!(get_tx_pub_key_from_extra(&extra, 1), Some(PublicKey([4; 32])));
        assert_eq!(get_tx_pub_key_from_extra(&[0x01, 0x00], 0), None);
    }

    #[test]
    fn additional_keys_helpers() {
        let keys = vec![PublicKey([5; 32]), PublicKey([6; 32])];
        let mut extra = Vec::new();
        add_additional_tx_pub_keys_to_extra(&mut extra, &keys).unwrap();
        assert_eq!(extra[..2], [0x04, 0x02]);
        assert_eq!(get_additional_tx_pub_keys_from_extra(&extra).unwrap(), keys);
        assert!(get_additional_tx_pub_keys_from_extra(&[]).unwrap().is_empty());
    }

    #[test]
    fn nonce_length_limit() {
        let mut extra = Vec::new();
        add_extra_nonce_to_tx_extra(&mut extra, &[7; 255]).unwrap();
        assert!(add_extra_nonce_to_tx_extra(&mut extra, &[7; 256]).is_err());
        assert_eq!(parse_extra(&extra).unwrap().len(), 1);
    }

    #[test]
    fn extra_field_json_shape() {
        let json = serde_json::to_value(ExtraField::Nonce(ExtraNonce(vec![1, 2]))).unwrap();
        assert_eq!(json["type"], "nonce");
        assert_eq!(json["value"], "0102");
    }
}

//! # RTA Stake & Quorum Binding
//!
//! Graft's supernodes hook into ordinary transactions through four extra
//! records:
//!
//! | Record            | Buffer   | Purpose                                      |
//! |-------------------|----------|----------------------------------------------|
//! | stake declaration | `extra`  | supernode id, wallet address, signature      |
//! | stake secret key  | `extra`  | lets anyone see which outputs are the stake  |
//! | RTA header        | `extra`  | payment id, auth sample height, quorum keys  |
//! | RTA signatures    | `extra2` | quorum signatures over the prefix hash       |
//!
//! Signatures live in `extra2` because that buffer is outside the prefix:
//! attaching them does not change the hash they are made over.
//!
//! ## States
//!
//! ```text
//! Unbound ──declare_stake──▶ StakeDeclared
//!    │
//!    └──add_rta_header──▶ RtaBound ──sign_rta──▶ Signed
//! ```
//!
//! [`rta_state`] derives the state from the records present. Combinations
//! that cannot arise from those transitions (two headers, signatures with
//! no header) are reported as [`StructuralViolation`]s, never as "absent".

pub mod error;
pub mod quorum;
pub mod stake;

use serde::{Deserialize, Serialize};

use crate::codec::CodecError;
use crate::config::{MAX_RTA_HEADER_KEYS, MAX_RTA_SIGNATURES};
use crate::crypto::{AccountPublicAddress, SecretKey, Signature};
use crate::extra::{
    add_field_to_extra, count_fields, find_field, parse_extra, ExtraField, ExtraFieldType,
    RtaHeader, RtaSignature, RtaSignatureSet, StakeDeclaration, StakeSecretKey,
};
use crate::transaction::Transaction;

pub use error::{QuorumFailure, RtaError, StakeFailure, StructuralViolation};
pub use quorum::{sign_rta, verify_rta_signatures, QuorumMembership, StaticQuorum};
pub use stake::{
    check_unlock_window, declare_stake, stake_signing_hash, stake_tier, stake_unlock_duration,
    validate_stake_transaction, verify_stake_signature, StakeTier, UnlockPolicy,
};

/// Where a transaction stands in the RTA lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RtaState {
    /// No RTA records at all.
    Unbound,
    /// Carries a stake declaration.
    StakeDeclared,
    /// Carries an RTA header, no signatures yet.
    RtaBound,
    /// Carries an RTA header and a non-empty signature set.
    Signed,
}

/// Stake records read back from a transaction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StakeTxFields {
    pub declaration: StakeDeclaration,
    pub secret_key: SecretKey,
}

/// The single record of type `T`, `None` if absent, `dup` if repeated.
fn unique_field<T: ExtraFieldType>(
    fields: &[ExtraField],
    dup: StructuralViolation,
) -> Result<Option<T>, StructuralViolation> {
    match count_fields::<T>(fields) {
        0 => Ok(None),
        1 => Ok(find_field::<T>(fields, 0)),
        _ => Err(dup),
    }
}

// ---------------------------------------------------------------------------
// Stake records
// ---------------------------------------------------------------------------

/// Append a stake declaration record.
pub fn add_stake_tx_extra_to_extra(
    extra: &mut Vec<u8>,
    supernode_public_id: &str,
    supernode_public_address: &AccountPublicAddress,
    supernode_signature: &Signature,
) -> Result<(), CodecError> {
    let decl = StakeDeclaration {
        supernode_public_id: supernode_public_id.to_string(),
        supernode_public_address: *supernode_public_address,
        supernode_signature: *supernode_signature,
    };
    add_field_to_extra(extra, &ExtraField::StakeDeclaration(decl))
}

/// Append the stake transaction's one-time secret key.
pub fn add_stake_secret_key_to_extra(extra: &mut Vec<u8>, key: &SecretKey) -> Result<(), CodecError> {
    add_field_to_extra(extra, &ExtraField::StakeSecretKey(StakeSecretKey(*key)))
}

/// Both stake records, or `None` if the transaction declares no stake.
///
/// Having exactly one of the two records is a structural violation.
pub fn get_stake_tx_extra_from_extra(tx: &Transaction) -> Result<Option<StakeTxFields>, RtaError> {
    let fields = parse_extra(tx.extra())?;
    let decl = unique_field::<StakeDeclaration>(&fields, StructuralViolation::DuplicateStakeDeclaration)?;
    let key = unique_field::<StakeSecretKey>(&fields, StructuralViolation::DuplicateStakeSecretKey)?;
    match (decl, key) {
        (None, None) => Ok(None),
        (Some(declaration), Some(StakeSecretKey(secret_key))) => Ok(Some(StakeTxFields {
            declaration,
            secret_key,
        })),
        (Some(_), None) => Err(StructuralViolation::MissingField("stake secret key").into()),
        (None, Some(_)) => Err(StructuralViolation::MissingField("stake declaration").into()),
    }
}

// ---------------------------------------------------------------------------
// RTA header & signatures
// ---------------------------------------------------------------------------

/// Append an RTA header, refusing a second one or an oversized key list.
pub fn add_rta_header_to_extra(extra: &mut Vec<u8>, header: &RtaHeader) -> Result<(), RtaError> {
    if header.keys.len() > MAX_RTA_HEADER_KEYS {
        return Err(StructuralViolation::TooManyEntries {
            what: "RTA header keys",
            count: header.keys.len(),
            limit: MAX_RTA_HEADER_KEYS,
        }
        .into());
    }
    let fields = parse_extra(extra)?;
    if count_fields::<RtaHeader>(&fields) > 0 {
        return Err(StructuralViolation::DuplicateRtaHeader.into());
    }
    add_field_to_extra(extra, &ExtraField::RtaHeader(header.clone()))?;
    Ok(())
}

pub fn get_rta_header_from_extra(tx: &Transaction) -> Result<Option<RtaHeader>, RtaError> {
    let fields = parse_extra(tx.extra())?;
    Ok(unique_field::<RtaHeader>(&fields, StructuralViolation::DuplicateRtaHeader)?)
}

/// Append an RTA signature set to `extra2`, refusing a second set.
pub fn add_rta_signatures_to_extra2(
    extra2: &mut Vec<u8>,
    signatures: &[RtaSignature],
) -> Result<(), RtaError> {
    if signatures.len() > MAX_RTA_SIGNATURES {
        return Err(StructuralViolation::TooManyEntries {
            what: "RTA signatures",
            count: signatures.len(),
            limit: MAX_RTA_SIGNATURES,
        }
        .into());
    }
    let fields = parse_extra(extra2)?;
    if count_fields::<RtaSignatureSet>(&fields) > 0 {
        return Err(StructuralViolation::DuplicateSignatureSet.into());
    }
    add_field_to_extra(
        extra2,
        &ExtraField::RtaSignatures(RtaSignatureSet(signatures.to_vec())),
    )?;
    Ok(())
}

/// The RTA signatures in `extra2`; empty if there is no signature set.
pub fn get_rta_signatures_from_extra2(tx: &Transaction) -> Result<Vec<RtaSignature>, RtaError> {
    let fields = parse_extra(tx.extra2())?;
    Ok(
        unique_field::<RtaSignatureSet>(&fields, StructuralViolation::DuplicateSignatureSet)?
            .map(|set| set.0)
            .unwrap_or_default(),
    )
}

// ---------------------------------------------------------------------------
// State machine
// ---------------------------------------------------------------------------

/// Classify `tx` by the RTA records it carries.
pub fn rta_state(tx: &Transaction) -> Result<RtaState, RtaError> {
    let extra = parse_extra(tx.extra())?;
    let header = unique_field::<RtaHeader>(&extra, StructuralViolation::DuplicateRtaHeader)?;
    let decl = unique_field::<StakeDeclaration>(&extra, StructuralViolation::DuplicateStakeDeclaration)?;
    let signatures = get_rta_signatures_from_extra2(tx)?;

    let state = match (header.is_some(), signatures.is_empty(), decl.is_some()) {
        (false, false, _) => return Err(StructuralViolation::SignaturesWithoutHeader.into()),
        (true, false, _) => RtaState::Signed,
        (true, true, _) => RtaState::RtaBound,
        (false, true, true) => RtaState::StakeDeclared,
        (false, true, false) => RtaState::Unbound,
    };
    Ok(state)
}

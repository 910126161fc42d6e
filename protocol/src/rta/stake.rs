//! Supernode stake declarations: tiers, unlock windows and the stake
//! signature.
//!
//! ## What the supernode signs
//!
//! The declaration record carries a signature over the transaction, yet it
//! sits inside the prefix that the transaction hash covers. To break the
//! cycle the prefix hash is computed with every stake declaration and stake
//! secret key record stripped from `extra`. The supernode id and wallet
//! address being declared are then appended, so the signed message is
//!
//! ```text
//! keccak(stripped_prefix_hash || string(id) || blob(address))
//! ```
//!
//! ([`stake_signing_hash`]). Verification rebuilds it from the declaration
//! found in the transaction, so neither field can be swapped after signing.
//! The secret key may be added before or after signing.

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use super::error::{RtaError, StakeFailure, StructuralViolation};
use super::{get_stake_tx_extra_from_extra, unique_field};
use crate::config::StakeConfig;
use crate::codec::BlobWriter;
use crate::crypto::{
    cn_fast_hash, verify_raw, AccountPublicAddress, Hash, SupernodeKey, SupernodeKeypair,
};
use crate::extra::{compose_extra, parse_extra, ExtraField, StakeDeclaration};
use crate::hashing::transaction_prefix_hash_with_extra;
use crate::transaction::Transaction;

/// Supernode tier, from smallest to largest stake.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum StakeTier {
    Tier1,
    Tier2,
    Tier3,
    Tier4,
}

impl StakeTier {
    const ALL: [StakeTier; 4] = [StakeTier::Tier1, StakeTier::Tier2, StakeTier::Tier3, StakeTier::Tier4];

    /// 1-based tier number.
    pub fn number(self) -> usize {
        self as usize + 1
    }
}

/// Highest tier whose threshold `amount` reaches.
pub fn stake_tier(amount: u64, cfg: &StakeConfig) -> Result<StakeTier, StakeFailure> {
    cfg.tier_amounts
        .iter()
        .zip(StakeTier::ALL)
        .rev()
        .find(|(threshold, _)| amount >= **threshold)
        .map(|(_, tier)| tier)
        .ok_or(StakeFailure::TierMismatch {
            amount,
            minimum: cfg.tier_amounts[0],
        })
}

/// Which unlock window applies. Nodes and wallets disagree on the lower
/// bound; the caller says which side it is on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UnlockPolicy {
    /// Consensus rule before hard fork 15.
    Node,
    /// Consensus rule from hard fork 15 on (shorter maximum).
    NodeV15,
    /// What a wallet lets its user create (longer minimum).
    Wallet,
}

impl UnlockPolicy {
    /// Inclusive `(min, max)` window in blocks.
    pub fn bounds(self, cfg: &StakeConfig) -> (u64, u64) {
        match self {
            UnlockPolicy::Node => (cfg.stake_min_unlock_time, cfg.stake_max_unlock_time),
            UnlockPolicy::NodeV15 => (cfg.stake_min_unlock_time, cfg.stake_max_unlock_time_v15),
            UnlockPolicy::Wallet => (
                cfg.stake_min_unlock_time_for_wallet,
                cfg.stake_max_unlock_time,
            ),
        }
    }
}

/// Blocks between inclusion and unlock. An unlock time in the past is a
/// zero-length window.
pub fn stake_unlock_duration(unlock_time: u64, block_height: u64) -> u64 {
    unlock_time.saturating_sub(block_height)
}

pub fn check_unlock_window(
    duration: u64,
    policy: UnlockPolicy,
    cfg: &StakeConfig,
) -> Result<(), StakeFailure> {
    let (min, max) = policy.bounds(cfg);
    if (min..=max).contains(&duration) {
        Ok(())
    } else {
        Err(StakeFailure::WindowViolation { duration, min, max })
    }
}

/// The message a supernode signs to declare `tx` as its stake paying
/// out to `address`.
///
/// Covers the prefix hash of `tx` with all stake records removed from
/// `extra`, followed by the declared id and address.
pub fn stake_signing_hash(
    tx: &Transaction,
    supernode_public_id: &str,
    address: &AccountPublicAddress,
) -> Result<Hash, RtaError> {
    let fields = parse_extra(tx.extra())?;
    let stripped: Vec<ExtraField> = fields
        .into_iter()
        .filter(|f| !matches!(f, ExtraField::StakeDeclaration(_) | ExtraField::StakeSecretKey(_)))
        .collect();
    let extra = compose_extra(&stripped)?;
    let prefix = transaction_prefix_hash_with_extra(tx, &extra);

    let mut w = BlobWriter::new();
    w.put_bytes(prefix.as_bytes());
    w.put_string(supernode_public_id);
    w.put(address);
    Ok(cn_fast_hash(&w.into_inner()))
}

/// Sign `tx` as a stake by `keypair` and append the declaration.
pub fn declare_stake(
    tx: &mut Transaction,
    keypair: &SupernodeKeypair,
    address: &AccountPublicAddress,
) -> Result<(), RtaError> {
    let fields = parse_extra(tx.extra())?;
    if unique_field::<StakeDeclaration>(&fields, StructuralViolation::DuplicateStakeDeclaration)?
        .is_some()
    {
        return Err(StructuralViolation::DuplicateStakeDeclaration.into());
    }

    let id = keypair.public_key().id();
    let message = stake_signing_hash(tx, &id, address)?;
    let signature = keypair.sign(message.as_bytes());
    super::add_stake_tx_extra_to_extra(tx.extra_mut(), &id, address, &signature)?;
    debug!(supernode = %id, "stake declared");
    Ok(())
}

/// Check the declaration's signature against the transaction it sits in.
pub fn verify_stake_signature(tx: &Transaction, decl: &StakeDeclaration) -> Result<(), RtaError> {
    let key = SupernodeKey::from_id(&decl.supernode_public_id).map_err(|e| {
        StakeFailure::Structural(StructuralViolation::InvalidSupernodeId(e.to_string()))
    })?;
    let message = stake_signing_hash(
        tx,
        &decl.supernode_public_id,
        &decl.supernode_public_address,
    )?;
    verify_raw(&key, message.as_bytes(), &decl.supernode_signature)
        .map_err(|_| StakeFailure::SignatureMismatch)?;
    Ok(())
}

/// Full check of a stake transaction included at `block_height` and
/// paying `amount` into the stake.
///
/// Order: records present and unique, tier, unlock window, signature.
pub fn validate_stake_transaction(
    tx: &Transaction,
    amount: u64,
    block_height: u64,
    policy: UnlockPolicy,
    cfg: &StakeConfig,
) -> Result<StakeTier, RtaError> {
    let result = (|| -> Result<StakeTier, RtaError> {
        let fields = match get_stake_tx_extra_from_extra(tx) {
            Ok(Some(fields)) => fields,
            Ok(None) => {
                return Err(StakeFailure::Structural(StructuralViolation::MissingField(
                    "stake declaration",
                ))
                .into())
            }
            Err(RtaError::Structural(v)) => return Err(StakeFailure::Structural(v).into()),
            Err(e) => return Err(e),
        };

        let tier = stake_tier(amount, cfg)?;
        let duration = stake_unlock_duration(tx.unlock_time(), block_height);
        check_unlock_window(duration, policy, cfg)?;
        verify_stake_signature(tx, &fields.declaration)?;
        Ok(tier)
    })();

    if let Err(e) = &result {
        warn!(
            tx = %tx.hash(),
            amount,
            block_height,
            error = %e,
            "stake transaction rejected"
        );
    }
    result
}

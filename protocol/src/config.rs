//! # Protocol Configuration & Constants
//!
//! Every magic number the canonicalization layer depends on lives here.
//! Most of them are consensus rules: change one and your node silently
//! forks off the network, so treat this file with suspicion.
//!
//! Compile-time constants cover the wire format (extra tags, size caps,
//! decimal point). The stake rules are bundled into [`StakeConfig`], which
//! can be loaded from JSON once per process and is immutable afterwards.

use serde::{Deserialize, Serialize};
use std::sync::OnceLock;
use thiserror::Error;

// ---------------------------------------------------------------------------
// Monetary Units
// ---------------------------------------------------------------------------

/// Number of decimal places shown when formatting amounts.
pub const CRYPTONOTE_DISPLAY_DECIMAL_POINT: u32 = 10;

/// One whole coin in atomic units (10^10).
pub const COIN: u64 = 10_000_000_000;

// ---------------------------------------------------------------------------
// Transaction & Block Format
// ---------------------------------------------------------------------------

/// Version written by the builder when the caller does not pick one.
pub const CURRENT_TRANSACTION_VERSION: u64 = 2;

/// Wire tag of a coinbase (`Gen`) input.
pub const TXIN_GEN_TAG: u8 = 0xff;

/// Wire tag of a key-spending input.
pub const TXIN_TO_KEY_TAG: u8 = 0x02;

/// Wire tag of a one-time-key output target.
pub const TXOUT_TO_KEY_TAG: u8 = 0x02;

/// Upper bound on the count prefix of any decoded collection.
///
/// This is a cheap first gate; the decoder additionally checks that the
/// remaining input could hold `count` minimally sized items before it
/// allocates anything.
pub const MAX_BLOB_ITEMS: u64 = 1 << 20;

// ---------------------------------------------------------------------------
// Extra Field Registry
// ---------------------------------------------------------------------------

pub const TX_EXTRA_TAG_PADDING: u8 = 0x00;
pub const TX_EXTRA_TAG_PUBKEY: u8 = 0x01;
pub const TX_EXTRA_NONCE: u8 = 0x02;
pub const TX_EXTRA_MERGE_MINING_TAG: u8 = 0x03;
pub const TX_EXTRA_TAG_ADDITIONAL_PUBKEYS: u8 = 0x04;
pub const TX_EXTRA_GRAFT_STAKE_TX_TAG: u8 = 0x81;
pub const TX_EXTRA_GRAFT_STAKE_SECRET_KEY_TAG: u8 = 0x82;
pub const TX_EXTRA_GRAFT_RTA_HEADER_TAG: u8 = 0x83;
pub const TX_EXTRA_GRAFT_RTA_SIGNATURES_TAG: u8 = 0x84;
pub const TX_EXTRA_MYSTERIOUS_MINERGATE_TAG: u8 = 0xDE;

/// Padding may not exceed this many bytes, tag included.
pub const TX_EXTRA_PADDING_MAX_COUNT: usize = 255;

/// Longest payload a nonce record may carry.
pub const TX_EXTRA_NONCE_MAX_COUNT: usize = 255;

/// Nonce sub-tag announcing a 32-byte plaintext payment id.
pub const TX_EXTRA_NONCE_PAYMENT_ID: u8 = 0x00;

/// Nonce sub-tag announcing an 8-byte encrypted payment id.
pub const TX_EXTRA_NONCE_ENCRYPTED_PAYMENT_ID: u8 = 0x01;

/// Largest `extra` (or `extra2`) buffer the parser will look at.
pub const MAX_TX_EXTRA_SIZE: usize = 64 * 1024;

/// Largest number of records a single buffer may hold.
pub const MAX_TX_EXTRA_FIELDS: usize = 512;

/// Domain separator appended to the key derivation before hashing it into
/// the payment-id keystream.
pub const ENCRYPTED_PAYMENT_ID_TAIL: u8 = 0x8d;

// ---------------------------------------------------------------------------
// RTA Quorum
// ---------------------------------------------------------------------------

/// Maximum supernode keys listed in one RTA header.
pub const MAX_RTA_HEADER_KEYS: usize = 32;

/// Maximum signatures in one RTA signature set.
pub const MAX_RTA_SIGNATURES: usize = 32;

// ---------------------------------------------------------------------------
// Stake Rules
// ---------------------------------------------------------------------------

/// Number of supernode stake tiers.
pub const TIERS_COUNT: usize = 4;

/// Mainnet tier thresholds in atomic units.
pub const TIER_AMOUNTS: [u64; TIERS_COUNT] = [
    50_000 * COIN,
    90_000 * COIN,
    150_000 * COIN,
    250_000 * COIN,
];

pub const STAKE_MIN_UNLOCK_TIME: u64 = 10;
pub const STAKE_MAX_UNLOCK_TIME: u64 = 23_040;
/// Tighter maximum used from hard fork 15 onwards.
pub const STAKE_MAX_UNLOCK_TIME_V15: u64 = 5_000;
pub const STAKE_MIN_UNLOCK_TIME_FOR_WALLET: u64 = 60;
pub const STAKE_VALIDATION_PERIOD: u64 = 6;
pub const TRUSTED_RESTAKING_PERIOD: u64 = 6;
pub const SUPERNODE_HISTORY_SIZE: u64 = 100;
pub const STAKE_TRANSACTION_PROCESSING_DB_VERSION: u32 = 13;

/// Errors raised while loading or validating a [`StakeConfig`].
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to parse stake config: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("invalid stake config: {0}")]
    Invalid(String),

    #[error("stake config already installed for this process")]
    AlreadyInstalled,
}

/// Stake rules governing supernode registration.
///
/// Loaded once per process and never mutated afterwards. Fields missing
/// from a JSON document fall back to the mainnet values.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StakeConfig {
    /// Ascending tier thresholds in atomic units.
    pub tier_amounts: [u64; TIERS_COUNT],
    /// Shortest unlock window (blocks) accepted by a node.
    pub stake_min_unlock_time: u64,
    /// Longest unlock window (blocks).
    pub stake_max_unlock_time: u64,
    /// Longest unlock window after hard fork 15.
    pub stake_max_unlock_time_v15: u64,
    /// Shortest unlock window a wallet lets its user pick.
    pub stake_min_unlock_time_for_wallet: u64,
    pub stake_validation_period: u64,
    pub trusted_restaking_period: u64,
    pub supernode_history_size: u64,
    pub processing_db_version: u32,
}

impl Default for StakeConfig {
    fn default() -> Self {
        Self {
            tier_amounts: TIER_AMOUNTS,
            stake_min_unlock_time: STAKE_MIN_UNLOCK_TIME,
            stake_max_unlock_time: STAKE_MAX_UNLOCK_TIME,
            stake_max_unlock_time_v15: STAKE_MAX_UNLOCK_TIME_V15,
            stake_min_unlock_time_for_wallet: STAKE_MIN_UNLOCK_TIME_FOR_WALLET,
            stake_validation_period: STAKE_VALIDATION_PERIOD,
            trusted_restaking_period: TRUSTED_RESTAKING_PERIOD,
            supernode_history_size: SUPERNODE_HISTORY_SIZE,
            processing_db_version: STAKE_TRANSACTION_PROCESSING_DB_VERSION,
        }
    }
}

static STAKE_CONFIG: OnceLock<StakeConfig> = OnceLock::new();

impl StakeConfig {
    /// The mainnet rule set.
    pub fn mainnet() -> Self {
        Self::default()
    }

    /// Parse and validate a JSON document.
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let cfg: StakeConfig = serde_json::from_str(json)?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Check internal consistency: tiers strictly ascending and non-zero,
    /// unlock windows non-empty.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.tier_amounts[0] == 0 {
            return Err(ConfigError::Invalid("tier 1 threshold must be non-zero".into()));
        }
        if self.tier_amounts.windows(2).any(|w| w[0] >= w[1]) {
            return Err(ConfigError::Invalid(format!(
                "tier thresholds must be strictly ascending: {:?}",
                self.tier_amounts
            )));
        }
        if self.stake_min_unlock_time > self.stake_max_unlock_time {
            return Err(ConfigError::Invalid(format!(
                "min unlock time {} exceeds max {}",
                self.stake_min_unlock_time, self.stake_max_unlock_time
            )));
        }
        if self.stake_min_unlock_time > self.stake_max_unlock_time_v15 {
            return Err(ConfigError::Invalid(format!(
                "min unlock time {} exceeds v15 max {}",
                self.stake_min_unlock_time, self.stake_max_unlock_time_v15
            )));
        }
        if self.stake_min_unlock_time_for_wallet > self.stake_max_unlock_time {
            return Err(ConfigError::Invalid(format!(
                "wallet min unlock time {} exceeds max {}",
                self.stake_min_unlock_time_for_wallet, self.stake_max_unlock_time
            )));
        }
        Ok(())
    }

    /// Install this config as the process-wide rule set.
    ///
    /// Fails if a config was already installed or if [`StakeConfig::global`]
    /// was called first (which pins the mainnet defaults).
    pub fn install(self) -> Result<(), ConfigError> {
        self.validate()?;
        STAKE_CONFIG.set(self).map_err(|_| ConfigError::AlreadyInstalled)
    }

    /// The process-wide rule set, mainnet unless something was installed.
    pub fn global() -> &'static StakeConfig {
        STAKE_CONFIG.get_or_init(StakeConfig::mainnet)
    }
}

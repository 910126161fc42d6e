//! Error types for the RTA layer.

use thiserror::Error;

use crate::codec::CodecError;
use crate::crypto::SupernodeKey;

/// The records are individually well formed but do not fit together.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StructuralViolation {
    #[error("more than one RTA header")]
    DuplicateRtaHeader,

    #[error("more than one stake declaration")]
    DuplicateStakeDeclaration,

    #[error("more than one stake secret key")]
    DuplicateStakeSecretKey,

    #[error("more than one RTA signature set")]
    DuplicateSignatureSet,

    #[error("RTA signatures present without an RTA header")]
    SignaturesWithoutHeader,

    #[error("missing {0}")]
    MissingField(&'static str),

    #[error("key index {0} signed more than once")]
    DuplicateSigner(u64),

    #[error("key index {index} out of range for a header with {keys} key(s)")]
    SignerIndexOutOfRange { index: u64, keys: usize },

    #[error("{what}: {count} entries exceed limit {limit}")]
    TooManyEntries {
        what: &'static str,
        count: usize,
        limit: usize,
    },

    #[error("invalid supernode id: {0}")]
    InvalidSupernodeId(String),

    #[error("signing key is not listed in the RTA header")]
    SignerNotInHeader,
}

/// Why a stake transaction was refused.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StakeFailure {
    #[error("stake amount {amount} is below the tier 1 threshold {minimum}")]
    TierMismatch { amount: u64, minimum: u64 },

    #[error("unlock window of {duration} block(s) is outside {min}..={max}")]
    WindowViolation { duration: u64, min: u64, max: u64 },

    #[error("stake declaration signature does not verify")]
    SignatureMismatch,

    #[error(transparent)]
    Structural(StructuralViolation),
}

/// Why the quorum signatures were refused.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum QuorumFailure {
    #[error("signer {0} is not a quorum member")]
    UnknownSigner(SupernodeKey),

    #[error("signature for key index {key_index} does not verify")]
    InvalidSignature { key_index: u64 },

    #[error("{valid} valid signature(s), {required} required")]
    InsufficientSignatures { valid: usize, required: usize },
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RtaError {
    #[error(transparent)]
    Codec(#[from] CodecError),

    #[error("stake validation failed: {0}")]
    StakeValidationFailed(#[from] StakeFailure),

    #[error("structural violation: {0}")]
    Structural(#[from] StructuralViolation),

    #[error("quorum rejected: {0}")]
    QuorumRejected(#[from] QuorumFailure),
}

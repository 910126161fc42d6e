//! # One-time Keys & Key Derivation
//!
//! CryptoNote-style keys over the Ed25519 curve: a secret key is a scalar,
//! a public key is the compressed point `s·G`. Two parties that each hold
//! one secret and the other's public key can agree on the same
//! *derivation* `8·a·B = 8·b·A` without talking to each other. That shared
//! point is what payment ids are encrypted with.
//!
//! The curve arithmetic itself is `curve25519-dalek`'s problem. This module
//! only deals with byte layouts and rejecting inputs that are not valid
//! points or canonical scalars.

use curve25519_dalek::edwards::{CompressedEdwardsY, EdwardsPoint};
use curve25519_dalek::scalar::Scalar;
use rand::rngs::OsRng;
use rand::RngCore;
use serde::{Deserialize, Serialize};
use thiserror::Error;

fixed_bytes!(
    /// A compressed Ed25519 point.
    PublicKey,
    32
);

fixed_bytes!(redacted
    /// A canonical Ed25519 scalar.
    SecretKey,
    32
);

fixed_bytes!(
    /// Shared point `8·s·P`, compressed.
    KeyDerivation,
    32
);

fixed_bytes!(
    /// Key image of a spent output.
    KeyImage,
    32
);

/// Errors that can occur during key operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum KeyError {
    #[error("invalid secret key: not a canonical scalar")]
    InvalidSecretKey,

    #[error("invalid public key: not a valid curve point")]
    InvalidPublicKey,
}

/// A wallet's public address: spend and view public keys.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct AccountPublicAddress {
    pub spend_public_key: PublicKey,
    pub view_public_key: PublicKey,
}

impl crate::codec::BlobEncode for AccountPublicAddress {
    fn encode(&self, w: &mut crate::codec::BlobWriter) {
        w.put(&self.spend_public_key);
        w.put(&self.view_public_key);
    }
}

impl crate::codec::BlobDecode for AccountPublicAddress {
    const MIN_ENCODED_LEN: usize = 64;

    fn decode(r: &mut crate::codec::BlobReader<'_>) -> Result<Self, crate::codec::CodecError> {
        Ok(Self {
            spend_public_key: r.get()?,
            view_public_key: r.get()?,
        })
    }
}

/// A secret/public key pair.
#[derive(Debug, Clone)]
pub struct KeyPair {
    pub public: PublicKey,
    pub secret: SecretKey,
}

impl KeyPair {
    /// Generate a fresh pair from the OS RNG.
    pub fn generate() -> Self {
        let mut wide = [0u8; 64];
        OsRng.fill_bytes(&mut wide);
        let scalar = Scalar::from_bytes_mod_order_wide(&wide);
        Self::from_scalar(scalar)
    }

    /// Rebuild the pair from a secret key.
    pub fn from_secret(secret: SecretKey) -> Result<Self, KeyError> {
        let scalar = to_scalar(&secret)?;
        Ok(Self::from_scalar(scalar))
    }

    fn from_scalar(scalar: Scalar) -> Self {
        Self {
            public: PublicKey(EdwardsPoint::mul_base(&scalar).compress().to_bytes()),
            secret: SecretKey(scalar.to_bytes()),
        }
    }
}

fn to_scalar(secret: &SecretKey) -> Result<Scalar, KeyError> {
    Option::<Scalar>::from(Scalar::from_canonical_bytes(secret.0)).ok_or(KeyError::InvalidSecretKey)
}

fn to_point(public: &PublicKey) -> Result<EdwardsPoint, KeyError> {
    CompressedEdwardsY(public.0)
        .decompress()
        .ok_or(KeyError::InvalidPublicKey)
}

/// `true` if `key` decodes to a curve point.
pub fn check_key(key: &PublicKey) -> bool {
    to_point(key).is_ok()
}

/// Derive the public key belonging to `secret`.
pub fn secret_key_to_public_key(secret: &SecretKey) -> Result<PublicKey, KeyError> {
    Ok(KeyPair::from_secret(*secret)?.public)
}

/// Shared derivation `8·secret·public`.
pub fn generate_key_derivation(
    public: &PublicKey,
    secret: &SecretKey,
) -> Result<KeyDerivation, KeyError> {
    let point = to_point(public)?;
    let scalar = to_scalar(secret)?;
    let shared = (point * scalar).mul_by_cofactor();
    Ok(KeyDerivation(shared.compress().to_bytes()))
}

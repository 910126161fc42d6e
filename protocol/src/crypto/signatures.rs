//! # Supernode Signatures
//!
//! Supernodes authenticate themselves with plain Ed25519 (RFC 8032) keys.
//! Their public key, hex encoded, doubles as the supernode's public
//! identity string in stake declarations.
//!
//! Wrapping `ed25519-dalek` keeps every signing call in one auditable place
//! and lets the rest of the crate deal with fixed-width byte types that
//! already know how to go on the wire.

use ed25519_dalek::{Signature as DalekSignature, Signer, SigningKey, Verifier, VerifyingKey};
use rand::rngs::OsRng;
use thiserror::Error;

fixed_bytes!(
    /// A 64-byte signature as it appears on the wire.
    Signature,
    64
);

fixed_bytes!(
    /// A supernode's Ed25519 verifying key.
    SupernodeKey,
    32
);

/// Errors during signature operations.
///
/// Intentionally vague: we don't tell attackers why verification failed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SignatureError {
    #[error("signature verification failed")]
    VerificationFailed,

    #[error("invalid public key")]
    InvalidPublicKey,

    #[error("invalid supernode id: {0}")]
    InvalidSupernodeId(String),
}

impl SupernodeKey {
    /// Parse a supernode public identity string (64 hex chars).
    pub fn from_id(id: &str) -> Result<Self, SignatureError> {
        Self::from_hex(id).map_err(|e| SignatureError::InvalidSupernodeId(e.to_string()))
    }

    /// The public identity string for this key.
    pub fn id(&self) -> String {
        self.to_hex()
    }
}

/// A supernode signing keypair.
///
/// Deliberately not `Serialize`: writing a private key somewhere should be
/// an explicit call to [`SupernodeKeypair::to_bytes`].
pub struct SupernodeKeypair {
    signing_key: SigningKey,
}

impl SupernodeKeypair {
    pub fn generate() -> Self {
        Self {
            signing_key: SigningKey::generate(&mut OsRng),
        }
    }

    pub fn from_bytes(secret: &[u8; 32]) -> Self {
        Self {
            signing_key: SigningKey::from_bytes(secret),
        }
    }

    pub fn to_bytes(&self) -> [u8; 32] {
        self.signing_key.to_bytes()
    }

    pub fn public_key(&self) -> SupernodeKey {
        SupernodeKey(self.signing_key.verifying_key().to_bytes())
    }

    pub fn sign(&self, message: &[u8]) -> Signature {
        Signature(self.signing_key.sign(message).to_bytes())
    }
}

impl std::fmt::Debug for SupernodeKeypair {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SupernodeKeypair")
            .field("public", &self.public_key())
            .finish_non_exhaustive()
    }
}

/// Verify `signature` over `message` under `key`.
pub fn verify_raw(
    key: &SupernodeKey,
    message: &[u8],
    signature: &Signature,
) -> Result<(), SignatureError> {
    let verifying_key =
        VerifyingKey::from_bytes(&key.0).map_err(|_| SignatureError::InvalidPublicKey)?;
    let signature = DalekSignature::from_bytes(&signature.0);
    verifying_key
        .verify(message, &signature)
        .map_err(|_| SignatureError::VerificationFailed)
}

/// Boolean form of [`verify_raw`].
pub fn verify(key: &SupernodeKey, message: &[u8], signature: &Signature) -> bool {
    verify_raw(key, message, signature).is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sign_and_verify() {
        let kp = SupernodeKeypair::generate();
        let sig = kp.sign(b"hello, quorum");
        assert!(verify(&kp.public_key(), b"hello, quorum", &sig));
    }

    #[test]
    fn test_wrong_message_fails() {
        let kp = SupernodeKeypair::generate();
        let sig = kp.sign(b"correct message");
        assert_eq!(
            verify_raw(&kp.public_key(), b"wrong message", &sig),
            Err(SignatureError::VerificationFailed)
        );
    }

    #[test]
    fn test_wrong_key_fails() {
        let kp1 = SupernodeKeypair::generate();
        let kp2 = SupernodeKeypair::generate();
        let sig = kp1.sign(b"msg");
        assert!(!verify(&kp2.public_key(), b"msg", &sig));
    }

    #[test]
    fn test_keypair_bytes_roundtrip() {
        let kp = SupernodeKeypair::generate();
        let restored = SupernodeKeypair::from_bytes(&kp.to_bytes());
        assert_eq!(kp.public_key(), restored.public_key());
    }

    #[test]
    fn supernode_id_round_trip() {
        let kp = SupernodeKeypair::generate();
        let id = kp.public_key().id();
        assert_eq!(id.len(), 64);
        assert_eq!(SupernodeKey::from_id(&id).unwrap(), kp.public_key());
        assert!(matches!(
            SupernodeKey::from_id("not-hex"),
            Err(SignatureError::InvalidSupernodeId(_))
        ));
    }
}

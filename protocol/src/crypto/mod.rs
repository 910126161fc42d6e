//! # Cryptographic Primitives
//!
//! Everything that touches a curve or a hash function goes through here:
//!
//! - **Keccak-256** (`cn_fast_hash`) for every id and merkle root.
//! - **CryptoNote keys** over Ed25519 points for one-time keys and the
//!   shared derivation used to encrypt payment ids.
//! - **Ed25519 signatures** for supernode stake declarations and RTA
//!   quorum approvals.
//!
//! ## A note on "rolling your own crypto"
//!
//! We don't. Everything here is a thin, type-safe wrapper around audited
//! implementations (`sha3`, `curve25519-dalek`, `ed25519-dalek`).

pub mod hash;
pub mod keys;
pub mod signatures;

pub use hash::{cn_fast_hash, cn_fast_hash_parts, tree_hash, Hash, Hash8};
pub use keys::{
    check_key, generate_key_derivation, secret_key_to_public_key, AccountPublicAddress,
    KeyDerivation, KeyError, KeyImage, KeyPair, PublicKey, SecretKey,
};
pub use signatures::{verify, verify_raw, Signature, SignatureError, SupernodeKey, SupernodeKeypair};

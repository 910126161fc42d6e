// Copyright (c) 2026 ALAS Technology. MIT License.
// See LICENSE for details.

//! # Graft RTA Core
//!
//! The canonicalization layer of a Graft node: the part that decides which
//! bytes a transaction or block *is*, and therefore which hash it has.
//! Every other component (wallet, RPC, supernode) goes through here before
//! it signs, stores or relays anything.
//!
//! ## Architecture
//!
//! - **codec**: Canonical blob encoding. Varints, length prefixes, no
//!   second way to spell the same value.
//! - **crypto**: Keccak-256, CryptoNote key derivation, supernode Ed25519
//!   signatures. Thin wrappers, nothing clever.
//! - **transaction**: The transaction model, its builder, and amount
//!   decomposition into denomination-friendly chunks.
//! - **block**: Block header and body.
//! - **hashing**: Prefix hash, full hash, tree hash, block hash. Results
//!   are cached on the value and dropped on every mutation.
//! - **extra**: The tagged-record registry living in `tx.extra`.
//! - **payment_id**: Long and short (encrypted) payment ids in the nonce.
//! - **rta**: Supernode stake declarations, RTA headers and quorum
//!   signatures.
//! - **config**: Consensus constants and the stake rule set.
//!
//! ## Design Philosophy
//!
//! 1. Byte-exact or nothing. A decoder that accepts two encodings of one
//!    value is a consensus bug waiting for an attacker.
//! 2. Parse untrusted input with hard limits before allocating.
//! 3. No I/O. Everything here is a pure function or a cached one.
//! 4. If it changes a hash, it has tests. Plural.

#[macro_use]
mod macros;

pub mod block;
pub mod codec;
pub mod config;
pub mod crypto;
pub mod extra;
pub mod hashing;
pub mod payment_id;
pub mod rta;
pub mod transaction;

pub use block::{Block, BlockHeader};
pub use codec::{from_blob, to_blob, BlobDecode, BlobEncode, CodecError};
pub use config::StakeConfig;
pub use crypto::Hash;
pub use extra::{ExtraField, ExtraFieldKind};
pub use payment_id::{PaymentId, PaymentIdError};
pub use rta::{RtaError, RtaState};
pub use transaction::{Transaction, TransactionBuilder};

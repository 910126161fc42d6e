//! # Transaction Module
//!
//! The transaction value, its canonical encoding and the amount helpers
//! that go with it.
//!
//! ## Architecture
//!
//! ```text
//! types.rs   : inputs and outputs (TxIn, TxOut, TxOutTarget)
//! builder.rs : Transaction (private fields + hash cache) and TransactionBuilder
//! amount.rs  : decomposition, money formatting, input/output sums
//! ```
//!
//! ## Design Decisions
//!
//! - Ids are Keccak-256 of the canonical blob. The prefix hash leaves out
//!   signatures and `extra2` so quorum signatures can be attached after the
//!   fact without moving the thing they sign.
//! - All amounts are `u64` atomic units. No floating point anywhere near
//!   monetary values.
//! - `extra`/`extra2` are stored as opaque bytes; the [`crate::extra`]
//!   module gives them structure on demand.

pub mod amount;
pub mod builder;
pub mod types;

pub use amount::{
    decompose_amount, decompose_amount_into_digits, is_valid_decomposed_amount, parse_amount,
    print_money, AmountError, Decomposition,
};
pub use builder::{Transaction, TransactionBuilder};
pub use types::{TxIn, TxOut, TxOutTarget};

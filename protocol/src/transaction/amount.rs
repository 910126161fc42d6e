//! # Amounts
//!
//! Splitting amounts into canonical denominations, formatting them for
//! humans and the arithmetic checks run over a transaction's inputs and
//! outputs.
//!
//! ## Decomposition
//!
//! An amount is split into one chunk per non-zero decimal digit
//! (`d × 10^k`). Digits that fit under the dust threshold are pooled into a
//! single dust output instead, so `decompose_amount(62_387_455_827, 500)`
//! yields chunks `[800, 5_000, …, 60_000_000_000]` and a dust of `27`.

use thiserror::Error;

use super::builder::Transaction;
use super::types::TxIn;
use crate::crypto::check_key;

/// Errors from amount parsing.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AmountError {
    #[error("invalid amount format: {0}")]
    InvalidFormat(String),

    #[error("amount overflows u64")]
    Overflow,
}

// ---------------------------------------------------------------------------
// Decomposition
// ---------------------------------------------------------------------------

/// Chunks and dust produced by [`decompose_amount`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Decomposition {
    /// Canonical `d × 10^k` pieces, lowest digit position first.
    pub chunks: Vec<u64>,
    /// Pooled small digits, if any.
    pub dust: Option<u64>,
}

impl Decomposition {
    pub fn total(&self) -> u128 {
        self.chunks.iter().map(|&c| c as u128).sum::<u128>() + self.dust.unwrap_or(0) as u128
    }
}

/// Split `amount` into digit chunks, routing small ones to dust.
///
/// Low digits accumulate into dust while `dust + chunk <= dust_threshold`.
/// The first chunk that would push dust over the threshold flushes the
/// pending dust (if non-zero) and from then on every non-zero chunk goes to
/// `chunk_handler`. A dust left pending at the end is flushed last. A zero
/// amount produces no calls at all.
pub fn decompose_amount_into_digits<C, D>(
    mut amount: u64,
    dust_threshold: u64,
    mut chunk_handler: C,
    mut dust_handler: D,
) where
    C: FnMut(u64),
    D: FnMut(u64),
{
    if amount == 0 {
        return;
    }

    let mut is_dust_handled = false;
    let mut dust: u64 = 0;
    let mut order: u64 = 1;
    while amount != 0 {
        let chunk = (amount % 10).saturating_mul(order);
        amount /= 10;
        // Once amount hits zero the next order is never used; saturating
        // keeps the 10^19 -> 10^20 step from overflowing.
        order = order.saturating_mul(10);

        if dust.saturating_add(chunk) <= dust_threshold {
            dust += chunk;
        } else {
            if !is_dust_handled && dust != 0 {
                dust_handler(dust);
                is_dust_handled = true;
            }
            if chunk != 0 {
                chunk_handler(chunk);
            }
        }
    }

    if !is_dust_handled && dust != 0 {
        dust_handler(dust);
    }
}

/// Collecting form of [`decompose_amount_into_digits`].
pub fn decompose_amount(amount: u64, dust_threshold: u64) -> Decomposition {
    let mut out = Decomposition::default();
    decompose_amount_into_digits(
        amount,
        dust_threshold,
        |chunk| out.chunks.push(chunk),
        |dust| out.dust = Some(dust),
    );
    out
}

/// `true` iff `amount` is a single non-zero digit times a power of ten.
pub fn is_valid_decomposed_amount(amount: u64) -> bool {
    if amount == 0 {
        return false;
    }
    let mut a = amount;
    while a % 10 == 0 {
        a /= 10;
    }
    a < 10
}

// ---------------------------------------------------------------------------
// Formatting
// ---------------------------------------------------------------------------

/// Render atomic units with `decimal_point` fractional digits.
pub fn print_money(amount: u64, decimal_point: u32) -> String {
    let dp = decimal_point as usize;
    let mut s = amount.to_string();
    if dp == 0 {
        return s;
    }
    if s.len() < dp + 1 {
        s = format!("{}{}", "0".repeat(dp + 1 - s.len()), s);
    }
    s.insert(s.len() - dp, '.');
    s
}

/// Parse a decimal string into atomic units.
///
/// Trailing zeros past `decimal_point` are tolerated; any other extra
/// precision is an error rather than a silent truncation.
pub fn parse_amount(input: &str, decimal_point: u32) -> Result<u64, AmountError> {
    let dp = decimal_point as usize;
    let s = input.trim();
    let (int_part, frac_part) = match s.split_once('.') {
        Some((i, f)) => (i, f.trim_end_matches('0')),
        None => (s, ""),
    };
    if int_part.is_empty() && frac_part.is_empty() && !s.contains('0') {
        return Err(AmountError::InvalidFormat(input.to_string()));
    }
    let all_digits = |p: &str| p.bytes().all(|b| b.is_ascii_digit());
    if !all_digits(int_part) || !all_digits(frac_part) {
        return Err(AmountError::InvalidFormat(input.to_string()));
    }
    if frac_part.len() > dp {
        return Err(AmountError::InvalidFormat(format!(
            "{input}: more than {dp} fractional digits"
        )));
    }

    let digits = format!("{int_part}{frac_part}{}", "0".repeat(dp - frac_part.len()));
    let digits = digits.trim_start_matches('0');
    if digits.is_empty() {
        return Ok(0);
    }
    digits.parse::<u64>().map_err(|_| AmountError::Overflow)
}

// ---------------------------------------------------------------------------
// Transaction money checks
// ---------------------------------------------------------------------------

/// Sum of output amounts, `None` on overflow.
pub fn get_outs_money_amount(tx: &Transaction) -> Option<u64> {
    tx.outputs()
        .iter()
        .try_fold(0u64, |acc, out| acc.checked_add(out.amount))
}

/// Sum of `ToKey` input amounts; `None` on overflow or if any input is not
/// a key input.
pub fn get_inputs_money_amount(tx: &Transaction) -> Option<u64> {
    tx.inputs().iter().try_fold(0u64, |acc, input| match input {
        TxIn::ToKey { amount, .. } => acc.checked_add(*amount),
        TxIn::Gen { .. } => None,
    })
}

/// Inputs minus outputs; `None` for coinbase, overflow or outputs
/// exceeding inputs.
pub fn get_tx_fee(tx: &Transaction) -> Option<u64> {
    let ins = get_inputs_money_amount(tx)?;
    let outs = get_outs_money_amount(tx)?;
    ins.checked_sub(outs)
}

/// Neither the input sum nor the output sum overflows.
pub fn check_money_overflow(tx: &Transaction) -> bool {
    let inputs_ok = tx
        .inputs()
        .iter()
        .try_fold(0u64, |acc, input| match input {
            TxIn::ToKey { amount, .. } => acc.checked_add(*amount),
            TxIn::Gen { .. } => Some(acc),
        })
        .is_some();
    inputs_ok && get_outs_money_amount(tx).is_some()
}

/// Every input is a key input.
pub fn check_inputs_types_supported(tx: &Transaction) -> bool {
    tx.inputs()
        .iter()
        .all(|input| matches!(input, TxIn::ToKey { .. }))
}

/// Every output has a non-zero amount and a key that is a curve point.
pub fn check_outs_valid(tx: &Transaction) -> bool {
    tx.outputs()
        .iter()
        .all(|out| out.amount != 0 && check_key(out.key()))
}

/// Turn relative ring offsets into absolute output indices.
pub fn relative_output_offsets_to_absolute(offsets: &[u64]) -> Vec<u64> {
    let mut acc = 0u64;
    offsets
        .iter()
        .map(|&o| {
            acc = acc.wrapping_add(o);
            acc
        })
        .collect()
}

/// Inverse of [`relative_output_offsets_to_absolute`] for sorted input.
pub fn absolute_output_offsets_to_relative(offsets: &[u64]) -> Vec<u64> {
    let mut prev = 0u64;
    offsets
        .iter()
        .map(|&o| {
            let rel = o.wrapping_sub(prev);
            prev = o;
            rel
        })
        .collect()
}

/// Height recorded in a block's miner transaction, if it has a `Gen` input.
pub fn get_block_height(block: &crate::block::Block) -> Option<u64> {
    match block.miner_tx().inputs() {
        [TxIn::Gen { height }] => Some(*height),
        _ => None,
    }
}

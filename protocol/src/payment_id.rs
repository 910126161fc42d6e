//! # Payment IDs
//!
//! A payment id lets a merchant match incoming payments to invoices. It
//! rides in the nonce record of `extra` in one of two shapes:
//!
//! ```text
//! 0x00 ‖ 32 bytes   long id, in the clear
//! 0x01 ‖  8 bytes   short id, encrypted to the recipient
//! ```
//!
//! Short ids are XORed with `Keccak(8·s·P ‖ 0x8d)[..8]`, where `8·s·P` is
//! the shared derivation between the transaction key and the recipient's
//! view key. XOR makes encryption its own inverse.

use thiserror::Error;

use crate::codec::CodecError;
use crate::config::{
    ENCRYPTED_PAYMENT_ID_TAIL, TX_EXTRA_NONCE_ENCRYPTED_PAYMENT_ID, TX_EXTRA_NONCE_PAYMENT_ID,
};
use crate::crypto::{cn_fast_hash_parts, generate_key_derivation, Hash, Hash8, PublicKey, SecretKey};
use crate::extra::{
    add_extra_nonce_to_tx_extra, compose_extra, find_field, parse_extra, ExtraField, ExtraFieldKind,
    ExtraNonce,
};

/// Errors from payment-id handling.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PaymentIdError {
    #[error("key derivation failed: {0}")]
    DerivationFailed(String),

    #[error("invalid payment id: {0}")]
    InvalidFormat(String),

    #[error(transparent)]
    Codec(#[from] CodecError),
}

/// A payment id of either length.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PaymentId {
    Long(Hash),
    Short(Hash8),
}

/// Parse a payment id from hex: 64 chars for a long id, 16 for a short one.
pub fn parse_payment_id(s: &str) -> Result<PaymentId, PaymentIdError> {
    let s = s.trim();
    match s.len() {
        64 => Hash::from_hex(s)
            .map(PaymentId::Long)
            .map_err(|e| PaymentIdError::InvalidFormat(e.to_string())),
        16 => Hash8::from_hex(s)
            .map(PaymentId::Short)
            .map_err(|e| PaymentIdError::InvalidFormat(e.to_string())),
        n => Err(PaymentIdError::InvalidFormat(format!(
            "expected 16 or 64 hex characters, got {n}"
        ))),
    }
}

// ---------------------------------------------------------------------------
// Encryption
// ---------------------------------------------------------------------------

/// XOR `payment_id` with the keystream derived from `public_key` and
/// `secret_key`.
pub fn encrypt_payment_id(
    payment_id: &Hash8,
    public_key: &PublicKey,
    secret_key: &SecretKey,
) -> Result<Hash8, PaymentIdError> {
    let derivation = generate_key_derivation(public_key, secret_key)
        .map_err(|e| PaymentIdError::DerivationFailed(e.to_string()))?;
    let keystream = cn_fast_hash_parts(&[derivation.as_bytes(), &[ENCRYPTED_PAYMENT_ID_TAIL]]);
    let mut out = payment_id.0;
    for (b, k) in out.iter_mut().zip(keystream.0.iter()) {
        *b ^= k;
    }
    Ok(Hash8(out))
}

/// Same operation as [`encrypt_payment_id`].
pub fn decrypt_payment_id(
    payment_id: &Hash8,
    public_key: &PublicKey,
    secret_key: &SecretKey,
) -> Result<Hash8, PaymentIdError> {
    encrypt_payment_id(payment_id, public_key, secret_key)
}

// ---------------------------------------------------------------------------
// Nonce layout
// ---------------------------------------------------------------------------

pub fn set_payment_id_to_tx_extra_nonce(payment_id: &Hash) -> Vec<u8> {
    let mut nonce = Vec::with_capacity(1 + Hash::LEN);
    nonce.push(TX_EXTRA_NONCE_PAYMENT_ID);
    nonce.extend_from_slice(payment_id.as_bytes());
    nonce
}

pub fn set_encrypted_payment_id_to_tx_extra_nonce(payment_id: &Hash8) -> Vec<u8> {
    let mut nonce = Vec::with_capacity(1 + Hash8::LEN);
    nonce.push(TX_EXTRA_NONCE_ENCRYPTED_PAYMENT_ID);
    nonce.extend_from_slice(payment_id.as_bytes());
    nonce
}

pub fn get_payment_id_from_tx_extra_nonce(nonce: &[u8]) -> Option<Hash> {
    match nonce.split_first() {
        Some((&TX_EXTRA_NONCE_PAYMENT_ID, rest)) => Hash::try_from_slice(rest),
        _ => None,
    }
}

pub fn get_encrypted_payment_id_from_tx_extra_nonce(nonce: &[u8]) -> Option<Hash8> {
    match nonce.split_first() {
        Some((&TX_EXTRA_NONCE_ENCRYPTED_PAYMENT_ID, rest)) => Hash8::try_from_slice(rest),
        _ => None,
    }
}

// ---------------------------------------------------------------------------
// Extra helpers
// ---------------------------------------------------------------------------

/// Append a nonce carrying `payment_id` to `extra`.
///
/// Short ids are written into the encrypted slot in the clear; run
/// [`encrypt_payment_id_in_extra`] once the transaction keys are known.
pub fn add_payment_id_to_extra(extra: &mut Vec<u8>, payment_id: &PaymentId) -> Result<(), PaymentIdError> {
    let nonce = match payment_id {
        PaymentId::Long(id) => set_payment_id_to_tx_extra_nonce(id),
        PaymentId::Short(id) => set_encrypted_payment_id_to_tx_extra_nonce(id),
    };
    add_extra_nonce_to_tx_extra(extra, &nonce)?;
    Ok(())
}

/// The payment id in the first nonce record, if any.
pub fn get_payment_id_from_extra(extra: &[u8]) -> Result<Option<PaymentId>, PaymentIdError> {
    let fields = parse_extra(extra)?;
    let Some(ExtraNonce(nonce)) = find_field::<ExtraNonce>(&fields, 0) else {
        return Ok(None);
    };
    if let Some(id) = get_payment_id_from_tx_extra_nonce(&nonce) {
        return Ok(Some(PaymentId::Long(id)));
    }
    Ok(get_encrypted_payment_id_from_tx_extra_nonce(&nonce).map(PaymentId::Short))
}

/// Encrypt a short payment id already present in `extra`.
///
/// Returns `Ok(false)` if the first nonce does not hold a short id (nothing
/// changes). Otherwise that nonce is replaced in place by its encrypted
/// form; every other record keeps its position.
pub fn encrypt_payment_id_in_extra(
    extra: &mut Vec<u8>,
    public_key: &PublicKey,
    secret_key: &SecretKey,
) -> Result<bool, PaymentIdError> {
    let mut fields = parse_extra(extra)?;
    let Some(i) = fields.iter().position(|f| f.kind() == ExtraFieldKind::Nonce) else {
        return Ok(false);
    };
    let short_id = match &fields[i] {
        ExtraField::Nonce(nonce) => get_encrypted_payment_id_from_tx_extra_nonce(&nonce.0),
        _ => None,
    };
    let Some(plain) = short_id else {
        return Ok(false);
    };
    let encrypted = encrypt_payment_id(&plain, public_key, secret_key)?;

    fields[i] = ExtraField::Nonce(ExtraNonce(set_encrypted_payment_id_to_tx_extra_nonce(&encrypted)));
    *extra = compose_extra(&fields)?;
    Ok(true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::KeyPair;
    use crate::extra::add_tx_pub_key_to_extra;

    #[test]
    fn encrypt_decrypt_is_identity() {
        let view = KeyPair::generate();
        let tx_key = KeyPair::generate();
        let id = Hash8([1, 2, 3, 4, 5, 6, 7, 8]);

        let enc = encrypt_payment_id(&id, &view.public, &tx_key.secret).unwrap();
        assert_ne!(enc, id);
        // Recipient side uses the other half of each pair.
        let dec = decrypt_payment_id(&enc, &tx_key.public, &view.secret).unwrap();
        assert_eq!(dec, id);
    }

    #[test]
    fn invalid_point_fails_derivation() {
        let kp = KeyPair::generate();
        let mut bad = [0u8; 32];
        bad[0] = 2;
        let err = encrypt_payment_id(&Hash8::default(), &PublicKey(bad), &kp.secret).unwrap_err();
        assert!(matches!(err, PaymentIdError::DerivationFailed(_)));
    }

    #[test]
    fn nonce_layouts() {
        let long = Hash([0xab; 32]);
        let nonce = set_payment_id_to_tx_extra_nonce(&long);
        assert_eq!(nonce.len(), 33);
        assert_eq!(nonce[0], 0x00);
        assert_eq!(get_payment_id_from_tx_extra_nonce(&nonce), Some(long));
        assert_eq!(get_encrypted_payment_id_from_tx_extra_nonce(&nonce), None);

        let short = Hash8([0xcd; 8]);
        let nonce = set_encrypted_payment_id_to_tx_extra_nonce(&short);
        assert_eq!(nonce.len(), 9);
        assert_eq!(nonce[0], 0x01);
        assert_eq!(get_encrypted_payment_id_from_tx_extra_nonce(&nonce), Some(short));
        assert_eq!(get_payment_id_from_tx_extra_nonce(&nonce), None);
    }

    #[test]
    fn wrong_length_nonce_is_not_a_payment_id() {
        assert_eq!(get_payment_id_from_tx_extra_nonce(&[0x00, 1, 2]), None);
        assert_eq!(get_encrypted_payment_id_from_tx_extra_nonce(&[0x01; 10]), None);
        assert_eq!(get_payment_id_from_tx_extra_nonce(&[]), None);
    }

    #[test]
    fn parse_payment_id_lengths() {
        assert!(matches!(parse_payment_id(&"11".repeat(32)), Ok(PaymentId::Long(_))));
        assert!(matches!(parse_payment_id(&"22".repeat(8)), Ok(PaymentId::Short(_))));
        assert!(matches!(
            parse_payment_id("1234"),
            Err(PaymentIdError::InvalidFormat(_))
        ));
        assert!(matches!(
            parse_payment_id(&"zz".repeat(8)),
            Err(PaymentIdError::InvalidFormat(_))
        ));
    }

    #[test]
    fn short_id_encrypted_in_place() {
        let view = KeyPair::generate();
        let tx_key = KeyPair::generate();
        let id = Hash8([9; 8]);

        let mut extra = Vec::new();
        add_tx_pub_key_to_extra(&mut extra, &tx_key.public);
        add_payment_id_to_extra(&mut extra, &PaymentId::Short(id)).unwrap();

        assert!(encrypt_payment_id_in_extra(&mut extra, &view.public, &tx_key.secret).unwrap());
        let Some(PaymentId::Short(stored)) = get_payment_id_from_extra(&extra).unwrap() else {
            panic!("short payment id missing after encryption");
        };
        assert_ne!(stored, id);
        assert_eq!(decrypt_payment_id(&stored, &tx_key.public, &view.secret).unwrap(), id);
        // Public key record untouched and still first.
        assert_eq!(crate::extra::get_tx_pub_key_from_extra(&extra, 0), Some(tx_key.public));
    }

    #[test]
    fn later_nonce_survives_encryption() {
        let view = KeyPair::generate();
        let tx_key = KeyPair::generate();
        let id = Hash8([4; 8]);
        let memo = b"merchant-memo".to_vec();

        let mut extra = Vec::new();
        add_payment_id_to_extra(&mut extra, &PaymentId::Short(id)).unwrap();
        add_tx_pub_key_to_extra(&mut extra, &tx_key.public);
        add_extra_nonce_to_tx_extra(&mut extra, &memo).unwrap();

        assert!(encrypt_payment_id_in_extra(&mut extra, &view.public, &tx_key.secret).unwrap());
        let fields = parse_extra(&extra).unwrap();
        assert_eq!(fields.len(), 3);
        assert_eq!(fields[1], ExtraField::TxPublicKey(tx_key.public));
        assert_eq!(fields[2], ExtraField::Nonce(ExtraNonce(memo)));
        let Some(PaymentId::Short(stored)) = get_payment_id_from_extra(&extra).unwrap() else {
            panic!("short payment id no longer in the first nonce");
        };
        assert_eq!(decrypt_payment_id(&stored, &tx_key.public, &view.secret).unwrap(), id);
    }

    #[test]
    fn long_id_is_left_alone() {
        let kp = KeyPair::generate();
        let mut extra = Vec::new();
        add_payment_id_to_extra(&mut extra, &PaymentId::Long(Hash([1; 32]))).unwrap();
        let before = extra.clone();
        assert!(!encrypt_payment_id_in_extra(&mut extra, &kp.public, &kp.secret).unwrap());
        assert_eq!(extra, before);
    }
}

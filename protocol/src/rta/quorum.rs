//! Quorum signatures over an RTA transaction.
//!
//! Each supernode listed in the RTA header signs the transaction prefix
//! hash and stores `(key_index, signature)` in `extra2`. Because `extra2`
//! is outside the prefix, signatures can be added one at a time without
//! invalidating the ones already there.
//!
//! Who counts as a quorum member is not something a transaction can tell
//! us: the auth sample is chosen from chain state. The caller supplies that
//! knowledge through [`QuorumMembership`].

use std::collections::HashSet;

use tracing::{debug, warn};

use super::error::{QuorumFailure, RtaError, StructuralViolation};
use super::{add_rta_signatures_to_extra2, get_rta_header_from_extra, get_rta_signatures_from_extra2};
use crate::config::{MAX_RTA_HEADER_KEYS, MAX_RTA_SIGNATURES};
use crate::crypto::{verify, SupernodeKey, SupernodeKeypair};
use crate::extra::{remove_field_from_extra, ExtraFieldKind, RtaSignature};
use crate::transaction::Transaction;

/// Membership data for the auth sample a transaction was signed by.
pub trait QuorumMembership {
    /// Whether `key` belongs to the sample.
    fn is_member(&self, key: &SupernodeKey) -> bool;

    /// Valid signatures needed for a header listing `header_keys` keys.
    /// Everyone in the header, unless the implementation says otherwise.
    fn required_signatures(&self, header_keys: usize) -> usize {
        header_keys
    }
}

impl QuorumMembership for [SupernodeKey] {
    fn is_member(&self, key: &SupernodeKey) -> bool {
        self.contains(key)
    }
}

/// A fixed member list with an optional signature threshold.
#[derive(Debug, Clone, Default)]
pub struct StaticQuorum {
    members: HashSet<SupernodeKey>,
    threshold: Option<usize>,
}

impl StaticQuorum {
    pub fn new(members: impl IntoIterator<Item = SupernodeKey>) -> Self {
        Self {
            members: members.into_iter().collect(),
            threshold: None,
        }
    }

    /// Accept as soon as `threshold` valid signatures are present.
    pub fn with_threshold(mut self, threshold: usize) -> Self {
        self.threshold = Some(threshold);
        self
    }

    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }
}

impl QuorumMembership for StaticQuorum {
    fn is_member(&self, key: &SupernodeKey) -> bool {
        self.members.contains(key)
    }

    fn required_signatures(&self, header_keys: usize) -> usize {
        self.threshold.unwrap_or(header_keys)
    }
}

/// Sign `tx` with `keypair` and store the signature in `extra2`.
///
/// The key must be listed in the RTA header. A previous signature under the
/// same key index is replaced.
pub fn sign_rta(tx: &mut Transaction, keypair: &SupernodeKeypair) -> Result<RtaSignature, RtaError> {
    let header = get_rta_header_from_extra(tx)?
        .ok_or(StructuralViolation::MissingField("RTA header"))?;
    let public = keypair.public_key();
    let key_index = header
        .keys
        .iter()
        .position(|k| *k == public)
        .ok_or(StructuralViolation::SignerNotInHeader)? as u64;

    let message = tx.prefix_hash();
    let entry = RtaSignature {
        key_index,
        signature: keypair.sign(message.as_bytes()),
    };

    let mut signatures = get_rta_signatures_from_extra2(tx)?;
    signatures.retain(|s| s.key_index != key_index);
    signatures.push(entry);

    let mut extra2 = tx.extra2().to_vec();
    remove_field_from_extra(&mut extra2, ExtraFieldKind::RtaSignatures)?;
    add_rta_signatures_to_extra2(&mut extra2, &signatures)?;
    *tx.extra2_mut() = extra2;

    debug!(%public, key_index, signatures = signatures.len(), "RTA signature attached");
    Ok(entry)
}

/// Check the RTA signatures of `tx` against `quorum`.
///
/// Every entry must name a distinct in-range header key that is a quorum
/// member and must verify over the prefix hash. The number of entries must
/// reach `quorum.required_signatures(header keys)`.
pub fn verify_rta_signatures<Q: QuorumMembership + ?Sized>(
    tx: &Transaction,
    quorum: &Q,
) -> Result<(), RtaError> {
    let result = check_signatures(tx, quorum);
    if let Err(e) = &result {
        warn!(tx = %tx.hash(), error = %e, "RTA signatures rejected");
    }
    result
}

fn check_signatures<Q: QuorumMembership + ?Sized>(tx: &Transaction, quorum: &Q) -> Result<(), RtaError> {
    let header = get_rta_header_from_extra(tx)?
        .ok_or(StructuralViolation::MissingField("RTA header"))?;
    let signatures = get_rta_signatures_from_extra2(tx)?;

    if header.keys.len() > MAX_RTA_HEADER_KEYS {
        return Err(StructuralViolation::TooManyEntries {
            what: "RTA header keys",
            count: header.keys.len(),
            limit: MAX_RTA_HEADER_KEYS,
        }
        .into());
    }
    if signatures.len() > MAX_RTA_SIGNATURES {
        return Err(StructuralViolation::TooManyEntries {
            what: "RTA signatures",
            count: signatures.len(),
            limit: MAX_RTA_SIGNATURES,
        }
        .into());
    }

    let required = quorum.required_signatures(header.keys.len());
    if signatures.is_empty() {
        return Err(QuorumFailure::InsufficientSignatures { valid: 0, required }.into());
    }

    // Every entry is checked for structure and membership before any
    // signature is verified.
    let mut seen = HashSet::with_capacity(signatures.len());
    let mut signers = Vec::with_capacity(signatures.len());
    for entry in &signatures {
        if !seen.insert(entry.key_index) {
            return Err(StructuralViolation::DuplicateSigner(entry.key_index).into());
        }
        let key = usize::try_from(entry.key_index)
            .ok()
            .and_then(|i| header.keys.get(i))
            .ok_or(StructuralViolation::SignerIndexOutOfRange {
                index: entry.key_index,
                keys: header.keys.len(),
            })?;
        if !quorum.is_member(key) {
            return Err(QuorumFailure::UnknownSigner(*key).into());
        }
        signers.push((key, entry));
    }

    let message = tx.prefix_hash();
    for (key, entry) in signers {
        if !verify(key, message.as_bytes(), &entry.signature) {
            return Err(QuorumFailure::InvalidSignature {
                key_index: entry.key_index,
            }
            .into());
        }
    }

    if seen.len() < required {
        return Err(QuorumFailure::InsufficientSignatures {
            valid: seen.len(),
            required,
        }
        .into());
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::Signature;
    use crate::extra::RtaHeader;
    use crate::rta::add_rta_header_to_extra;
    use crate::transaction::TransactionBuilder;

    fn setup(n: usize) -> (Transaction, Vec<SupernodeKeypair>) {
        let sample: Vec<SupernodeKeypair> = (0..n).map(|_| SupernodeKeypair::generate()).collect();
        let header = RtaHeader {
            payment_id: "order-991".into(),
            auth_sample_height: 1_200,
            keys: sample.iter().map(|kp| kp.public_key()).collect(),
        };
        let mut tx = TransactionBuilder::new().unlock_time(7).build();
        add_rta_header_to_extra(tx.extra_mut(), &header).unwrap();
        (tx, sample)
    }

    fn keys(sample: &[SupernodeKeypair]) -> Vec<SupernodeKey> {
        sample.iter().map(|kp| kp.public_key()).collect()
    }

    #[test]
    fn full_sample_verifies() {
        let (mut tx, sample) = setup(3);
        let prefix = tx.prefix_hash();
        for kp in &sample {
            sign_rta(&mut tx, kp).unwrap();
        }
        assert_eq!(tx.prefix_hash(), prefix);
        verify_rta_signatures(&tx, keys(&sample).as_slice()).unwrap();
    }

    #[test]
    fn missing_signature_is_insufficient() {
        let (mut tx, sample) = setup(3);
        sign_rta(&mut tx, &sample[0]).unwrap();
        sign_rta(&mut tx, &sample[2]).unwrap();
        assert_eq!(
            verify_rta_signatures(&tx, keys(&sample).as_slice()),
            Err(RtaError::QuorumRejected(QuorumFailure::InsufficientSignatures {
                valid: 2,
                required: 3
            }))
        );

        let quorum = StaticQuorum::new(keys(&sample)).with_threshold(2);
        verify_rta_signatures(&tx, &quorum).unwrap();
    }

    #[test]
    fn resigning_replaces_entry() {
        let (mut tx, sample) = setup(2);
        sign_rta(&mut tx, &sample[1]).unwrap();
        sign_rta(&mut tx, &sample[1]).unwrap();
        let sigs = get_rta_signatures_from_extra2(&tx).unwrap();
        assert_eq!(sigs.len(), 1);
        assert_eq!(sigs[0].key_index, 1);
    }

    #[test]
    fn outsider_cannot_sign() {
        let (mut tx, _) = setup(2);
        let outsider = SupernodeKeypair::generate();
        assert_eq!(
            sign_rta(&mut tx, &outsider),
            Err(RtaError::Structural(StructuralViolation::SignerNotInHeader))
        );
    }

    #[test]
    fn signing_needs_a_header() {
        let mut tx = TransactionBuilder::new().build();
        assert_eq!(
            sign_rta(&mut tx, &SupernodeKeypair::generate()),
            Err(RtaError::Structural(StructuralViolation::MissingField("RTA header")))
        );
    }

    #[test]
    fn non_member_rejected() {
        let (mut tx, sample) = setup(2);
        for kp in &sample {
            sign_rta(&mut tx, kp).unwrap();
        }
        let quorum = StaticQuorum::new([sample[0].public_key()]);
        assert_eq!(
            verify_rta_signatures(&tx, &quorum),
            Err(RtaError::QuorumRejected(QuorumFailure::UnknownSigner(
                sample[1].public_key()
            )))
        );
    }

    #[test]
    fn prefix_change_breaks_signatures() {
        let (mut tx, sample) = setup(1);
        sign_rta(&mut tx, &sample[0]).unwrap();
        tx.set_unlock_time(8);
        assert_eq!(
            verify_rta_signatures(&tx, keys(&sample).as_slice()),
            Err(RtaError::QuorumRejected(QuorumFailure::InvalidSignature { key_index: 0 }))
        );
    }

    #[test]
    fn duplicate_and_out_of_range_indices() {
        let (tx, sample) = setup(2);
        let bogus = RtaSignature {
            key_index: 0,
            signature: Signature([0; 64]),
        };

        let mut dup = tx.clone();
        add_rta_signatures_to_extra2(dup.extra2_mut(), &[bogus, bogus]).unwrap();
        assert_eq!(
            verify_rta_signatures(&dup, keys(&sample).as_slice()),
            Err(RtaError::Structural(StructuralViolation::DuplicateSigner(0)))
        );

        let mut far = tx;
        let entry = RtaSignature { key_index: 5, ..bogus };
        add_rta_signatures_to_extra2(far.extra2_mut(), &[entry]).unwrap();
        assert_eq!(
            verify_rta_signatures(&far, keys(&sample).as_slice()),
            Err(RtaError::Structural(StructuralViolation::SignerIndexOutOfRange {
                index: 5,
                keys: 2
            }))
        );
    }

    #[test]
    fn structural_faults_win_over_bad_signatures() {
        let (tx, sample) = setup(2);
        let forged = RtaSignature {
            key_index: 0,
            signature: Signature([7; 64]),
        };

        let mut far = tx.clone();
        let entries = [forged, RtaSignature { key_index: 9, ..forged }];
        add_rta_signatures_to_extra2(far.extra2_mut(), &entries).unwrap();
        assert_eq!(
            verify_rta_signatures(&far, keys(&sample).as_slice()),
            Err(RtaError::Structural(StructuralViolation::SignerIndexOutOfRange {
                index: 9,
                keys: 2
            }))
        );

        let mut stranger = tx;
        let entries = [forged, RtaSignature { key_index: 1, ..forged }];
        add_rta_signatures_to_extra2(stranger.extra2_mut(), &entries).unwrap();
        let quorum = StaticQuorum::new([sample[0].public_key()]);
        assert_eq!(
            verify_rta_signatures(&stranger, &quorum),
            Err(RtaError::QuorumRejected(QuorumFailure::UnknownSigner(
                sample[1].public_key()
            )))
        );
    }

    #[test]
    fn unsigned_transaction_is_insufficient() {
        let (tx, sample) = setup(1);
        assert!(matches!(
            verify_rta_signatures(&tx, keys(&sample).as_slice()),
            Err(RtaError::QuorumRejected(QuorumFailure::InsufficientSignatures { valid: 0, .. }))
        ));
    }
}

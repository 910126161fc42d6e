//! Property-based tests for the canonical encodings.

use graft_rta_core::codec::{from_blob, read_varint, to_blob, write_varint};
use graft_rta_core::crypto::{
    AccountPublicAddress, Hash, Hash8, KeyImage, KeyPair, PublicKey, SecretKey, Signature,
    SupernodeKey,
};
use graft_rta_core::extra::{
    compose_extra, parse_extra, AdditionalPublicKeys, ExtraField, ExtraNonce, ExtraPadding,
    MergeMiningTag, MinergateData, RtaHeader, RtaSignature, RtaSignatureSet, StakeDeclaration,
    StakeSecretKey, UnknownField,
};
use graft_rta_core::payment_id::encrypt_payment_id;
use graft_rta_core::transaction::{
    decompose_amount, is_valid_decomposed_amount, Transaction, TransactionBuilder, TxIn, TxOut,
};
use proptest::prelude::*;

fn arb_key() -> impl Strategy<Value = [u8; 32]> {
    prop::array::uniform32(any::<u8>())
}

fn arb_signature() -> impl Strategy<Value = Signature> {
    prop::collection::vec(any::<u8>(), 64..=64).prop_map(|bytes| {
        let mut raw = [0u8; 64];
        raw.copy_from_slice(&bytes);
        Signature(raw)
    })
}

fn arb_field() -> impl Strategy<Value = ExtraField> {
    prop_oneof![
        arb_key().prop_map(|k| ExtraField::TxPublicKey(PublicKey(k))),
        prop::collection::vec(any::<u8>(), 0..=255).prop_map(|n| ExtraField::Nonce(ExtraNonce(n))),
        (any::<u64>(), arb_key()).prop_map(|(depth, root)| {
            ExtraField::MergeMining(MergeMiningTag {
                depth,
                merkle_root: Hash(root),
            })
        }),
        prop::collection::vec(arb_key(), 0..4).prop_map(|keys| {
            ExtraField::AdditionalPublicKeys(AdditionalPublicKeys(
                keys.into_iter().map(PublicKey).collect(),
            ))
        }),
        ("[0-9a-f]{64}", arb_key(), arb_key(), arb_signature()).prop_map(
            |(id, spend, view, signature)| {
                ExtraField::StakeDeclaration(StakeDeclaration {
                    supernode_public_id: id,
                    supernode_public_address: AccountPublicAddress {
                        spend_public_key: PublicKey(spend),
                        view_public_key: PublicKey(view),
                    },
                    supernode_signature: signature,
                })
            }
        ),
        arb_key().prop_map(|k| ExtraField::StakeSecretKey(StakeSecretKey(SecretKey(k)))),
        ("[a-z0-9-]{0,20}", any::<u64>(), prop::collection::vec(arb_key(), 0..4)).prop_map(
            |(payment_id, auth_sample_height, keys)| {
                ExtraField::RtaHeader(RtaHeader {
                    payment_id,
                    auth_sample_height,
                    keys: keys.into_iter().map(SupernodeKey).collect(),
                })
            }
        ),
        prop::collection::vec((any::<u64>(), arb_signature()), 0..4).prop_map(|entries| {
            ExtraField::RtaSignatures(RtaSignatureSet(
                entries
                    .into_iter()
                    .map(|(key_index, signature)| RtaSignature { key_index, signature })
                    .collect(),
            ))
        }),
        prop::collection::vec(any::<u8>(), 0..64)
            .prop_map(|d| ExtraField::MysteriousMinergate(MinergateData(d))),
        (0x05u8..=0x80, prop::collection::vec(any::<u8>(), 0..64))
            .prop_map(|(tag, payload)| ExtraField::Unknown(UnknownField { tag, payload })),
    ]
}

/// Any run of records, optionally closed by padding.
fn arb_fields() -> impl Strategy<Value = Vec<ExtraField>> {
    (
        prop::collection::vec(arb_field(), 0..12),
        prop::option::of(1usize..=255),
    )
        .prop_map(|(mut fields, padding)| {
            if let Some(size) = padding {
                fields.push(ExtraField::Padding(ExtraPadding { size }));
            }
            fields
        })
}

fn arb_input() -> impl Strategy<Value = TxIn> {
    prop_oneof![
        any::<u64>().prop_map(|height| TxIn::Gen { height }),
        (
            any::<u64>(),
            prop::collection::vec(any::<u64>(), 0..8),
            prop::array::uniform32(any::<u8>())
        )
            .prop_map(|(amount, key_offsets, image)| TxIn::ToKey {
                amount,
                key_offsets,
                key_image: KeyImage(image),
            }),
    ]
}

fn arb_tx() -> impl Strategy<Value = Transaction> {
    (
        1u64..4,
        any::<u64>(),
        prop::collection::vec(arb_input(), 0..4),
        prop::collection::vec((any::<u64>(), prop::array::uniform32(any::<u8>())), 0..4),
        prop::collection::vec(any::<u8>(), 0..64),
    )
        .prop_map(|(version, unlock_time, inputs, outs, extra)| {
            TransactionBuilder::new()
                .version(version)
                .unlock_time(unlock_time)
                .inputs(inputs)
                .outputs(
                    outs.into_iter()
                        .map(|(amount, key)| TxOut::to_key(amount, PublicKey(key)))
                        .collect(),
                )
                .extra(extra)
                .build()
        })
}

proptest! {
    #[test]
    fn varint_round_trips_at_minimal_length(value in any::<u64>()) {
        let mut buf = Vec::new();
        write_varint(&mut buf, value);
        let (decoded, used) = read_varint(&buf).unwrap();
        prop_assert_eq!(decoded, value);
        prop_assert_eq!(used, buf.len());
        // Only the last byte lacks the continuation bit.
        prop_assert!(buf[..buf.len() - 1].iter().all(|b| b & 0x80 != 0));
        prop_assert!(buf.len() == 1 || *buf.last().unwrap() != 0);
    }
}

proptest! {
    #[test]
    fn decomposition_preserves_amount(amount in any::<u64>(), threshold in any::<u64>()) {
        let d = decompose_amount(amount, threshold);
        prop_assert_eq!(d.total(), u128::from(amount));
        prop_assert!(d.chunks.iter().all(|&c| is_valid_decomposed_amount(c)));
        prop_assert!(d.chunks.windows(2).all(|w| w[0] < w[1]));
        if let Some(dust) = d.dust {
            prop_assert!(dust > 0 && dust <= threshold);
        }
    }
}

proptest! {
    #[test]
    fn composed_extra_parses_back(fields in arb_fields()) {
        let extra = compose_extra(&fields).unwrap();
        prop_assert_eq!(parse_extra(&extra).unwrap(), fields.clone());
        prop_assert_eq!(compose_extra(&fields).unwrap(), extra);
    }
}

proptest! {
    #[test]
    fn transaction_blob_is_canonical(tx in arb_tx()) {
        let blob = to_blob(&tx);
        let decoded: Transaction = from_blob(&blob).unwrap();
        prop_assert_eq!(to_blob(&decoded), blob);
        prop_assert_eq!(decoded.hash(), tx.hash());
        prop_assert_eq!(decoded.prefix_hash(), tx.prefix_hash());
    }
}

proptest! {
    #[test]
    fn prefix_hash_ignores_signatures(tx in arb_tx(), sig in prop::collection::vec(any::<u8>(), 64..=64)) {
        let before_prefix = tx.prefix_hash();
        let before_full = tx.hash();
        let mut signed = tx.clone();
        let mut raw = [0u8; 64];
        raw.copy_from_slice(&sig);
        signed.signatures_mut().push(vec![Signature(raw)]);
        prop_assert_eq!(signed.prefix_hash(), before_prefix);
        prop_assert_ne!(signed.hash(), before_full);
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]
    #[test]
    fn payment_id_encryption_is_an_involution(id in prop::array::uniform8(any::<u8>())) {
        let view = KeyPair::generate();
        let tx_key = KeyPair::generate();
        let plain = Hash8(id);
        let once = encrypt_payment_id(&plain, &view.public, &tx_key.secret).unwrap();
        let twice = encrypt_payment_id(&once, &view.public, &tx_key.secret).unwrap();
        prop_assert_eq!(twice, plain);
    }
}

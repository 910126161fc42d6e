//! Core value types that make up a transaction: inputs and outputs.
//!
//! Both are closed, tagged variants on the wire. The tag bytes are shared
//! with every other CryptoNote chain, which is why `Gen` is `0xff` and not
//! something sensible like `0x00`.

use serde::{Deserialize, Serialize};

use crate::codec::{BlobDecode, BlobEncode, BlobReader, BlobWriter, CodecError};
use crate::config::{TXIN_GEN_TAG, TXIN_TO_KEY_TAG, TXOUT_TO_KEY_TAG};
use crate::crypto::{KeyImage, PublicKey};

// ---------------------------------------------------------------------------
// Inputs
// ---------------------------------------------------------------------------

/// A transaction input.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TxIn {
    /// Coinbase input: mints the block reward at `height`.
    Gen { height: u64 },

    /// Spends one of the outputs referenced by `key_offsets` (relative
    /// offsets into the global output index for `amount`).
    ToKey {
        amount: u64,
        key_offsets: Vec<u64>,
        key_image: KeyImage,
    },
}

impl BlobEncode for TxIn {
    fn encode(&self, w: &mut BlobWriter) {
        match self {
            TxIn::Gen { height } => {
                w.put_u8(TXIN_GEN_TAG);
                w.put_varint(*height);
            }
            TxIn::ToKey {
                amount,
                key_offsets,
                key_image,
            } => {
                w.put_u8(TXIN_TO_KEY_TAG);
                w.put_varint(*amount);
                w.put_vec(key_offsets);
                w.put(key_image);
            }
        }
    }
}

impl BlobDecode for TxIn {
    const MIN_ENCODED_LEN: usize = 2;

    fn decode(r: &mut BlobReader<'_>) -> Result<Self, CodecError> {
        match r.get_u8()? {
            TXIN_GEN_TAG => Ok(TxIn::Gen {
                height: r.get_varint()?,
            }),
            TXIN_TO_KEY_TAG => Ok(TxIn::ToKey {
                amount: r.get_varint()?,
                key_offsets: r.get_vec()?,
                key_image: r.get()?,
            }),
            tag => Err(CodecError::malformed(format!("unknown input tag {tag:#04x}"))),
        }
    }
}

// ---------------------------------------------------------------------------
// Outputs
// ---------------------------------------------------------------------------

/// Where an output's funds go.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TxOutTarget {
    /// A one-time public key only the recipient can recognise.
    ToKey { key: PublicKey },
}

/// A transaction output.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TxOut {
    pub amount: u64,
    pub target: TxOutTarget,
}

impl TxOut {
    pub fn to_key(amount: u64, key: PublicKey) -> Self {
        Self {
            amount,
            target: TxOutTarget::ToKey { key },
        }
    }

    pub fn key(&self) -> &PublicKey {
        match &self.target {
            TxOutTarget::ToKey { key } => key,
        }
    }
}

impl BlobEncode for TxOut {
    fn encode(&self, w: &mut BlobWriter) {
        w.put_varint(self.amount);
        match &self.target {
            TxOutTarget::ToKey { key } => {
                w.put_u8(TXOUT_TO_KEY_TAG);
                w.put(key);
            }
        }
    }
}

impl BlobDecode for TxOut {
    const MIN_ENCODED_LEN: usize = 2 + PublicKey::LEN;

    fn decode(r: &mut BlobReader<'_>) -> Result<Self, CodecError> {
        let amount = r.get_varint()?;
        let target = match r.get_u8()? {
            TXOUT_TO_KEY_TAG => TxOutTarget::ToKey { key: r.get()? },
            tag => return Err(CodecError::malformed(format!("unknown output tag {tag:#04x}"))),
        };
        Ok(Self { amount, target })
    }
}

// ---------------------------------------------------------------------------
// Hex serde for opaque byte buffers
// ---------------------------------------------------------------------------

/// Serialize `Vec<u8>` fields as hex strings instead of number arrays.
pub(crate) mod hex_bytes {
    use serde::{de, Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(bytes: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&hex::encode(bytes))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<u8>, D::Error> {
        let s = String::deserialize(deserializer)?;
        hex::decode(s).map_err(de::Error::custom)
    }
}

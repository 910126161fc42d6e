//! Parsing and composing `extra` buffers.
//!
//! ```text
//! 0x00 padding     zeros to the end of the buffer (<= 255 bytes incl. tag)
//! 0x01 pubkey      32 bytes
//! 0x02 nonce       varint len (<= 255) ‖ bytes
//! 0x04 add. keys   varint count ‖ 32 × count
//! anything else    varint len ‖ payload
//! ```
//!
//! The first four layouts are inherited from CryptoNote and cannot change.
//! Every newer record is length-prefixed so an old parser can step over a
//! tag it has never heard of.

use tracing::debug;

use super::fields::{
    AdditionalPublicKeys, ExtraNonce, ExtraPadding, MinergateData, RtaSignatureSet, StakeSecretKey,
    UnknownField,
};
use super::{ExtraField, ExtraFieldKind};
use crate::codec::{from_blob, to_blob, BlobReader, BlobWriter, CodecError};
use crate::config::{
    MAX_TX_EXTRA_FIELDS, MAX_TX_EXTRA_SIZE, TX_EXTRA_NONCE_MAX_COUNT, TX_EXTRA_PADDING_MAX_COUNT,
};

/// Parse a whole buffer into records, in order.
///
/// Fails on the first malformed record: truncation, a bad length prefix,
/// trailing bytes inside a length-prefixed record, non-zero padding, or
/// size/count limits exceeded.
pub fn parse_extra(extra: &[u8]) -> Result<Vec<ExtraField>, CodecError> {
    if extra.len() > MAX_TX_EXTRA_SIZE {
        debug!(size = extra.len(), limit = MAX_TX_EXTRA_SIZE, "tx extra too large");
        return Err(CodecError::malformed(format!(
            "extra is {} bytes, limit is {MAX_TX_EXTRA_SIZE}",
            extra.len()
        )));
    }

    let mut r = BlobReader::new(extra);
    let mut fields = Vec::new();
    while !r.is_empty() {
        if fields.len() >= MAX_TX_EXTRA_FIELDS {
            debug!(limit = MAX_TX_EXTRA_FIELDS, "tx extra has too many fields");
            return Err(CodecError::malformed(format!(
                "more than {MAX_TX_EXTRA_FIELDS} extra fields"
            )));
        }
        let offset = r.position();
        let field = read_field(&mut r).map_err(|e| {
            debug!(offset, error = %e, "rejecting tx extra");
            e
        })?;
        fields.push(field);
    }
    Ok(fields)
}

fn read_field(r: &mut BlobReader<'_>) -> Result<ExtraField, CodecError> {
    let tag = r.get_u8()?;
    let field = match ExtraFieldKind::from_tag(tag) {
        ExtraFieldKind::Padding => {
            let rest = r.get_bytes(r.remaining())?;
            let size = rest.len() + 1;
            if size > TX_EXTRA_PADDING_MAX_COUNT {
                return Err(CodecError::malformed(format!(
                    "padding of {size} bytes exceeds {TX_EXTRA_PADDING_MAX_COUNT}"
                )));
            }
            if rest.iter().any(|&b| b != 0) {
                return Err(CodecError::malformed("non-zero byte in padding"));
            }
            ExtraField::Padding(ExtraPadding { size })
        }
        ExtraFieldKind::TxPublicKey => ExtraField::TxPublicKey(r.get()?),
        ExtraFieldKind::Nonce => {
            let bytes = r.get_blob()?;
            if bytes.len() > TX_EXTRA_NONCE_MAX_COUNT {
                return Err(CodecError::malformed(format!(
                    "nonce of {} bytes exceeds {TX_EXTRA_NONCE_MAX_COUNT}",
                    bytes.len()
                )));
            }
            ExtraField::Nonce(ExtraNonce(bytes.to_vec()))
        }
        ExtraFieldKind::AdditionalPublicKeys => {
            ExtraField::AdditionalPublicKeys(AdditionalPublicKeys(r.get_vec()?))
        }
        ExtraFieldKind::MergeMining => ExtraField::MergeMining(from_blob(r.get_blob()?)?),
        ExtraFieldKind::StakeDeclaration => ExtraField::StakeDeclaration(from_blob(r.get_blob()?)?),
        ExtraFieldKind::StakeSecretKey => {
            ExtraField::StakeSecretKey(StakeSecretKey(from_blob(r.get_blob()?)?))
        }
        ExtraFieldKind::RtaHeader => ExtraField::RtaHeader(from_blob(r.get_blob()?)?),
        ExtraFieldKind::RtaSignatures => {
            ExtraField::RtaSignatures(RtaSignatureSet(from_blob(r.get_blob()?)?))
        }
        ExtraFieldKind::MysteriousMinergate => {
            ExtraField::MysteriousMinergate(MinergateData(r.get_blob()?.to_vec()))
        }
        ExtraFieldKind::Unknown(tag) => ExtraField::Unknown(UnknownField {
            tag,
            payload: r.get_blob()?.to_vec(),
        }),
    };
    Ok(field)
}

/// Append one record to `w`, refusing values the parser would not give back.
pub(crate) fn write_field(w: &mut BlobWriter, field: &ExtraField) -> Result<(), CodecError> {
    w.put_u8(field.kind().tag());
    match field {
        ExtraField::Padding(p) => {
            if p.size == 0 || p.size > TX_EXTRA_PADDING_MAX_COUNT {
                return Err(CodecError::invalid(format!(
                    "padding size {} outside 1..={TX_EXTRA_PADDING_MAX_COUNT}",
                    p.size
                )));
            }
            w.put_bytes(&vec![0u8; p.size - 1]);
        }
        ExtraField::TxPublicKey(key) => w.put(key),
        ExtraField::Nonce(nonce) => {
            if nonce.0.len() > TX_EXTRA_NONCE_MAX_COUNT {
                return Err(CodecError::invalid(format!(
                    "nonce of {} bytes exceeds {TX_EXTRA_NONCE_MAX_COUNT}",
                    nonce.0.len()
                )));
            }
            w.put_blob(&nonce.0);
        }
        ExtraField::AdditionalPublicKeys(keys) => w.put_vec(&keys.0),
        ExtraField::MergeMining(tag) => w.put_blob(&to_blob(tag)),
        ExtraField::StakeDeclaration(decl) => w.put_blob(&to_blob(decl)),
        ExtraField::StakeSecretKey(key) => w.put_blob(&to_blob(&key.0)),
        ExtraField::RtaHeader(header) => w.put_blob(&to_blob(header)),
        ExtraField::RtaSignatures(set) => w.put_blob(&to_blob(&set.0)),
        ExtraField::MysteriousMinergate(data) => w.put_blob(&data.0),
        ExtraField::Unknown(unknown) => {
            if !matches!(ExtraFieldKind::from_tag(unknown.tag), ExtraFieldKind::Unknown(_)) {
                return Err(CodecError::invalid(format!(
                    "tag {:#04x} is registered and cannot be stored as unknown",
                    unknown.tag
                )));
            }
            w.put_blob(&unknown.payload);
        }
    }
    Ok(())
}

/// Encode a single record.
pub fn encode_field(field: &ExtraField) -> Result<Vec<u8>, CodecError> {
    let mut w = BlobWriter::new();
    write_field(&mut w, field)?;
    Ok(w.into_inner())
}

/// Serialize records back into a buffer.
///
/// `parse_extra(&compose_extra(fields)?)? == fields` for every sequence
/// this accepts.
pub fn compose_extra(fields: &[ExtraField]) -> Result<Vec<u8>, CodecError> {
    if fields.len() > MAX_TX_EXTRA_FIELDS {
        return Err(CodecError::invalid(format!(
            "{} fields exceed limit {MAX_TX_EXTRA_FIELDS}",
            fields.len()
        )));
    }
    let mut w = BlobWriter::new();
    for (i, field) in fields.iter().enumerate() {
        if matches!(field, ExtraField::Padding(_)) && i + 1 != fields.len() {
            return Err(CodecError::invalid("padding must be the last field"));
        }
        write_field(&mut w, field)?;
    }
    if w.len() > MAX_TX_EXTRA_SIZE {
        return Err(CodecError::invalid(format!(
            "composed extra is {} bytes, limit is {MAX_TX_EXTRA_SIZE}",
            w.len()
        )));
    }
    Ok(w.into_inner())
}

/// Drop the first record of `kind` from `extra`.
///
/// Later records of the same kind stay where they are. Returns `Ok(true)`
/// if something was removed, `Ok(false)` if the buffer had no such record
/// (it is then left untouched). A buffer that does not parse is an error
/// and is also left untouched.
pub fn remove_field_from_extra(extra: &mut Vec<u8>, kind: ExtraFieldKind) -> Result<bool, CodecError> {
    let mut fields = parse_extra(extra)?;
    let Some(i) = fields.iter().position(|f| f.kind() == kind) else {
        return Ok(false);
    };
    fields.remove(i);
    *extra = compose_extra(&fields)?;
    Ok(true)
}

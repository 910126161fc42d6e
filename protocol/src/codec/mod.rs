//! # Canonical Blob Codec
//!
//! The byte format every hash in the system is computed over. If two nodes
//! disagree on a single byte here, they disagree on every transaction id,
//! so the rules are deliberately boring:
//!
//! - integers are canonical LEB128 varints (see [`varint`]),
//! - fixed-width values (hashes, keys, signatures) are raw bytes,
//! - collections and byte strings carry a varint count prefix.
//!
//! Encoding is infallible. Decoding treats its input as hostile: every
//! count is checked against [`MAX_BLOB_ITEMS`] and against what the
//! remaining input could possibly hold *before* anything is allocated, and
//! [`from_blob`] refuses input with bytes left over.

pub mod varint;

use crate::config::MAX_BLOB_ITEMS;
use thiserror::Error;

pub use varint::{read_varint, varint_len, write_varint};

/// Errors produced while decoding a blob.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CodecError {
    #[error("malformed encoding: {0}")]
    MalformedEncoding(String),

    #[error("unexpected trailing data: {remaining} byte(s) left after decoding")]
    UnexpectedTrailingData { remaining: usize },

    #[error("invalid field: {0}")]
    InvalidField(String),
}

impl CodecError {
    pub(crate) fn malformed(reason: impl Into<String>) -> Self {
        CodecError::MalformedEncoding(reason.into())
    }

    pub(crate) fn invalid(reason: impl Into<String>) -> Self {
        CodecError::InvalidField(reason.into())
    }
}

/// A value with a canonical byte encoding.
pub trait BlobEncode {
    fn encode(&self, w: &mut BlobWriter);
}

/// A value that can be read back from its canonical encoding.
pub trait BlobDecode: Sized {
    /// Fewest bytes any encoding of `Self` can occupy. Used to reject
    /// absurd collection counts before allocating.
    const MIN_ENCODED_LEN: usize = 1;

    fn decode(r: &mut BlobReader<'_>) -> Result<Self, CodecError>;
}

/// Serialize a value to its canonical blob.
pub fn to_blob<T: BlobEncode + ?Sized>(value: &T) -> Vec<u8> {
    let mut w = BlobWriter::new();
    value.encode(&mut w);
    w.into_inner()
}

/// Deserialize a value, requiring the input to be consumed exactly.
pub fn from_blob<T: BlobDecode>(bytes: &[u8]) -> Result<T, CodecError> {
    let mut r = BlobReader::new(bytes);
    let value = T::decode(&mut r)?;
    r.finish()?;
    Ok(value)
}

// ---------------------------------------------------------------------------
// Writer
// ---------------------------------------------------------------------------

/// Append-only output buffer.
#[derive(Debug, Default, Clone)]
pub struct BlobWriter {
    buf: Vec<u8>,
}

impl BlobWriter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            buf: Vec::with_capacity(capacity),
        }
    }

    pub fn len(&self) -> usize {
        self.buf.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    pub fn put_u8(&mut self, byte: u8) {
        self.buf.push(byte);
    }

    pub fn put_bytes(&mut self, bytes: &[u8]) {
        self.buf.extend_from_slice(bytes);
    }

    pub fn put_varint(&mut self, value: u64) {
        write_varint(&mut self.buf, value);
    }

    pub fn put_u32_le(&mut self, value: u32) {
        self.buf.extend_from_slice(&value.to_le_bytes());
    }

    /// Varint length followed by the raw bytes.
    pub fn put_blob(&mut self, bytes: &[u8]) {
        self.put_varint(bytes.len() as u64);
        self.put_bytes(bytes);
    }

    pub fn put_string(&mut self, s: &str) {
        self.put_blob(s.as_bytes());
    }

    pub fn put<T: BlobEncode + ?Sized>(&mut self, value: &T) {
        value.encode(self);
    }

    /// Varint count followed by each item.
    pub fn put_vec<T: BlobEncode>(&mut self, items: &[T]) {
        self.put_varint(items.len() as u64);
        for item in items {
            item.encode(self);
        }
    }

    pub fn into_inner(self) -> Vec<u8> {
        self.buf
    }
}

// ---------------------------------------------------------------------------
// Reader
// ---------------------------------------------------------------------------

/// Cursor over an untrusted input buffer.
#[derive(Debug, Clone)]
pub struct BlobReader<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> BlobReader<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        Self { data, pos: 0 }
    }

    pub fn position(&self) -> usize {
        self.pos
    }

    pub fn remaining(&self) -> usize {
        self.data.len() - self.pos
    }

    pub fn is_empty(&self) -> bool {
        self.remaining() == 0
    }

    /// The unread tail, without consuming it.
    pub fn rest(&self) -> &'a [u8] {
        &self.data[self.pos..]
    }

    pub fn get_u8(&mut self) -> Result<u8, CodecError> {
        let byte = *self
            .data
            .get(self.pos)
            .ok_or_else(|| CodecError::malformed("unexpected end of input"))?;
        self.pos += 1;
        Ok(byte)
    }

    pub fn peek_u8(&self) -> Option<u8> {
        self.data.get(self.pos).copied()
    }

    pub fn get_bytes(&mut self, n: usize) -> Result<&'a [u8], CodecError> {
        if n > self.remaining() {
            return Err(CodecError::malformed(format!(
                "need {n} byte(s), only {} left",
                self.remaining()
            )));
        }
        let out = &self.data[self.pos..self.pos + n];
        self.pos += n;
        Ok(out)
    }

    pub fn get_array<const N: usize>(&mut self) -> Result<[u8; N], CodecError> {
        let bytes = self.get_bytes(N)?;
        let mut out = [0u8; N];
        out.copy_from_slice(bytes);
        Ok(out)
    }

    pub fn get_varint(&mut self) -> Result<u64, CodecError> {
        let (value, used) = read_varint(self.rest())?;
        self.pos += used;
        Ok(value)
    }

    pub fn get_u32_le(&mut self) -> Result<u32, CodecError> {
        Ok(u32::from_le_bytes(self.get_array::<4>()?))
    }

    /// Varint length followed by that many bytes.
    pub fn get_blob(&mut self) -> Result<&'a [u8], CodecError> {
        let len = self.get_varint()?;
        let len = usize::try_from(len)
            .ok()
            .filter(|&n| n <= self.remaining())
            .ok_or_else(|| {
                CodecError::malformed(format!(
                    "declared length {len} exceeds remaining {} byte(s)",
                    self.remaining()
                ))
            })?;
        self.get_bytes(len)
    }

    pub fn get_string(&mut self) -> Result<String, CodecError> {
        let bytes = self.get_blob()?;
        String::from_utf8(bytes.to_vec()).map_err(|_| CodecError::malformed("string is not valid UTF-8"))
    }

    pub fn get<T: BlobDecode>(&mut self) -> Result<T, CodecError> {
        T::decode(self)
    }

    /// Read a collection count and check it is plausible for items of at
    /// least `min_item_len` bytes.
    pub fn get_count(&mut self, min_item_len: usize) -> Result<usize, CodecError> {
        let count = self.get_varint()?;
        if count > MAX_BLOB_ITEMS {
            return Err(CodecError::malformed(format!(
                "collection count {count} exceeds limit {MAX_BLOB_ITEMS}"
            )));
        }
        // Bounded by MAX_BLOB_ITEMS, so this cannot truncate.
        let count = count as usize;
        if count.saturating_mul(min_item_len.max(1)) > self.remaining() {
            return Err(CodecError::malformed(format!(
                "collection count {count} cannot fit in remaining {} byte(s)",
                self.remaining()
            )));
        }
        Ok(count)
    }

    pub fn get_vec<T: BlobDecode>(&mut self) -> Result<Vec<T>, CodecError> {
        let count = self.get_count(T::MIN_ENCODED_LEN)?;
        let mut items = Vec::with_capacity(count);
        for _ in 0..count {
            items.push(T::decode(self)?);
        }
        Ok(items)
    }

    /// Fail unless every byte has been consumed.
    pub fn finish(&self) -> Result<(), CodecError> {
        match self.remaining() {
            0 => Ok(()),
            remaining => Err(CodecError::UnexpectedTrailingData { remaining }),
        }
    }
}

// ---------------------------------------------------------------------------
// Primitive impls
// ---------------------------------------------------------------------------

impl BlobEncode for u64 {
    fn encode(&self, w: &mut BlobWriter) {
        w.put_varint(*self);
    }
}

impl BlobDecode for u64 {
    fn decode(r: &mut BlobReader<'_>) -> Result<Self, CodecError> {
        r.get_varint()
    }
}

impl<T: BlobEncode> BlobEncode for Vec<T> {
    fn encode(&self, w: &mut BlobWriter) {
        w.put_vec(self);
    }
}

impl<T: BlobDecode> BlobDecode for Vec<T> {
    fn decode(r: &mut BlobReader<'_>) -> Result<Self, CodecError> {
        r.get_vec()
    }
}

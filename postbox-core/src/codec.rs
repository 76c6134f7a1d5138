//! Argument serialization for mailbox messages.
//!
//! The [`MessageCodec`] trait turns one value into bytes and back. Mailbox
//! messages carry several values, so [`ArgWriter`] and [`ArgReader`] apply
//! the codec once per argument, strictly in order, and prefix each encoded
//! value with its length (`u32`, little-endian). The resulting payload is the
//! plain concatenation of those records; the reader rejects short and
//! over-long payloads.
//!
//! # Example
//!
//! ```rust
//! use postbox_core::{ArgReader, ArgWriter};
//!
//! let mut payload = Vec::new();
//! let mut writer = ArgWriter::new(&mut payload);
//! writer.write(&7u32).expect("encode should succeed");
//! writer.write(&"seven".to_string()).expect("encode should succeed");
//!
//! let mut reader = ArgReader::new(&payload);
//! let n: u32 = reader.read().expect("decode should succeed");
//! let s: String = reader.read().expect("decode should succeed");
//! reader.finish().expect("payload fully consumed");
//!
//! assert_eq!((n, s.as_str()), (7, "seven"));
//! ```

use serde::Serialize;
use serde::de::DeserializeOwned;

/// Width of the length prefix in front of every encoded argument.
pub const LENGTH_PREFIX_SIZE: usize = 4;

/// Error type for codec operations.
#[derive(Debug, thiserror::Error)]
pub enum CodecError {
    /// Failed to encode a value to bytes.
    #[error("encode error: {0}")]
    Encode(#[source] Box<dyn std::error::Error + Send + Sync>),

    /// Failed to decode bytes to a value.
    #[error("decode error: {0}")]
    Decode(#[source] Box<dyn std::error::Error + Send + Sync>),

    /// The payload ended before the next argument was complete.
    #[error("truncated payload: need {needed} bytes, have {have}")]
    Truncated {
        /// Bytes required by the next record.
        needed: usize,
        /// Bytes left in the payload.
        have: usize,
    },

    /// Bytes were left over after the last argument.
    #[error("{count} trailing bytes after the last argument")]
    TrailingBytes {
        /// Number of unread bytes.
        count: usize,
    },
}

/// Pluggable value serialization format.
///
/// Requires `Clone + 'static` so a codec can be stored inside writers,
/// readers and receive callbacks.
pub trait MessageCodec: Clone + 'static {
    /// Encode a serializable value to bytes.
    ///
    /// # Errors
    ///
    /// Returns `CodecError::Encode` if serialization fails.
    fn encode<T: Serialize>(&self, value: &T) -> Result<Vec<u8>, CodecError>;

    /// Decode bytes to a deserializable value.
    ///
    /// # Errors
    ///
    /// Returns `CodecError::Decode` if deserialization fails.
    fn decode<T: DeserializeOwned>(&self, buf: &[u8]) -> Result<T, CodecError>;
}

/// JSON codec using serde_json.
///
/// The default codec. Human-readable on the wire, which keeps packet dumps
/// debuggable.
#[derive(Clone, Default, Debug, Copy)]
pub struct JsonCodec;

impl MessageCodec for JsonCodec {
    fn encode<T: Serialize>(&self, value: &T) -> Result<Vec<u8>, CodecError> {
        serde_json::to_vec(value).map_err(|e| CodecError::Encode(Box::new(e)))
    }

    fn decode<T: DeserializeOwned>(&self, buf: &[u8]) -> Result<T, CodecError> {
        serde_json::from_slice(buf).map_err(|e| CodecError::Decode(Box::new(e)))
    }
}

/// Appends length-prefixed arguments to an output buffer.
pub struct ArgWriter<'a, C: MessageCodec = JsonCodec> {
    out: &'a mut Vec<u8>,
    codec: C,
    written: usize,
}

impl<'a> ArgWriter<'a, JsonCodec> {
    /// Create a writer using the default [`JsonCodec`].
    pub fn new(out: &'a mut Vec<u8>) -> Self {
        Self::with_codec(out, JsonCodec)
    }
}

impl<'a, C: MessageCodec> ArgWriter<'a, C> {
    /// Create a writer using `codec`.
    pub fn with_codec(out: &'a mut Vec<u8>, codec: C) -> Self {
        Self {
            out,
            codec,
            written: 0,
        }
    }

    /// Encode the next argument.
    ///
    /// # Errors
    ///
    /// Returns `CodecError::Encode` if the codec fails or the encoded value
    /// does not fit the `u32` length prefix.
    pub fn write<T: Serialize>(&mut self, value: &T) -> Result<(), CodecError> {
        let bytes = self.codec.encode(value)?;
        let len = u32::try_from(bytes.len()).map_err(|e| CodecError::Encode(Box::new(e)))?;
        self.out.extend_from_slice(&len.to_le_bytes());
        self.out.extend_from_slice(&bytes);
        self.written += 1;
        Ok(())
    }

    /// Number of arguments written so far.
    pub fn written(&self) -> usize {
        self.written
    }
}

/// Reads length-prefixed arguments back, in the order they were written.
pub struct ArgReader<'a, C: MessageCodec = JsonCodec> {
    input: &'a [u8],
    codec: C,
    read: usize,
}

impl<'a> ArgReader<'a, JsonCodec> {
    /// Create a reader using the default [`JsonCodec`].
    pub fn new(input: &'a [u8]) -> Self {
        Self::with_codec(input, JsonCodec)
    }
}

impl<'a, C: MessageCodec> ArgReader<'a, C> {
    /// Create a reader using `codec`.
    pub fn with_codec(input: &'a [u8], codec: C) -> Self {
        Self {
            input,
            codec,
            read: 0,
        }
    }

    /// Decode the next argument.
    ///
    /// # Errors
    ///
    /// Returns `CodecError::Truncated` if the record is incomplete and
    /// `CodecError::Decode` if its bytes do not decode to `T`.
    pub fn read<T: DeserializeOwned>(&mut self) -> Result<T, CodecError> {
        let (prefix, rest) =
            self.input
                .split_first_chunk::<LENGTH_PREFIX_SIZE>()
                .ok_or(CodecError::Truncated {
                    needed: LENGTH_PREFIX_SIZE,
                    have: self.input.len(),
                })?;
        let len = u32::from_le_bytes(*prefix) as usize;
        if rest.len() < len {
            return Err(CodecError::Truncated {
                needed: len,
                have: rest.len(),
            });
        }

        let (record, rest) = rest.split_at(len);
        let value = self.codec.decode(record)?;
        self.input = rest;
        self.read += 1;
        Ok(value)
    }

    /// Number of arguments read so far.
    pub fn read_count(&self) -> usize {
        self.read
    }

    /// Check that every byte of the payload was consumed.
    ///
    /// # Errors
    ///
    /// Returns `CodecError::TrailingBytes` if input remains.
    pub fn finish(self) -> Result<(), CodecError> {
        if self.input.is_empty() {
            Ok(())
        } else {
            Err(CodecError::TrailingBytes {
                count: self.input.len(),
            })
        }
    }
}

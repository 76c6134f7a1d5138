//! Packet framing between transports.
//!
//! Packet format: `[length:4][checksum:4][sequence:8][token:16][payload:N]`
//!
//! - **length**: total packet size including header (little-endian u32)
//! - **checksum**: CRC32C of (sequence + token + payload)
//! - **sequence**: per-sender packet counter (little-endian u64)
//! - **token**: destination mailbox UID (two little-endian u64)
//! - **payload**: the message bytes, opaque to the transport
//!
//! The payload is whatever the sending mailbox layer produced. Framing is
//! owned here so the typed layer never has to delimit its own messages.

use crate::UID;

/// Header size: 4 (length) + 4 (checksum) + 8 (sequence) + 16 (token).
pub const HEADER_SIZE: usize = 32;

/// Hard upper bound on payload size (1 MiB).
pub const MAX_PAYLOAD_SIZE: usize = 1024 * 1024;

/// Byte range of the header covered by the checksum.
const CHECKSUMMED_HEADER: std::ops::Range<usize> = 8..HEADER_SIZE;

/// Wire format error types.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum WireError {
    /// Not enough data to parse the packet.
    #[error("insufficient data: need {needed} bytes, have {have}")]
    InsufficientData {
        /// Minimum bytes required to parse.
        needed: usize,
        /// Actual bytes available.
        have: usize,
    },

    /// Checksum verification failed.
    #[error("checksum mismatch: expected {expected:#010x}, got {actual:#010x}")]
    ChecksumMismatch {
        /// Checksum carried in the header.
        expected: u32,
        /// Checksum computed over the received bytes.
        actual: u32,
    },

    /// Payload exceeds the allowed size.
    #[error("packet too large: {size} bytes (max {max})")]
    PacketTooLarge {
        /// Payload size in bytes.
        size: usize,
        /// Limit that was exceeded.
        max: usize,
    },

    /// Length field disagrees with the packet.
    #[error("invalid packet length: {length}")]
    InvalidLength {
        /// The length value from the header.
        length: u32,
    },
}

/// A decoded packet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Packet {
    /// Sender-assigned sequence number.
    pub sequence: u64,
    /// Destination mailbox token.
    pub token: UID,
    /// Message bytes.
    pub payload: Vec<u8>,
}

fn write_header(buf: &mut [u8], length: u32, sequence: u64, token: UID) {
    buf[0..4].copy_from_slice(&length.to_le_bytes());
    buf[8..16].copy_from_slice(&sequence.to_le_bytes());
    buf[16..24].copy_from_slice(&token.first.to_le_bytes());
    buf[24..32].copy_from_slice(&token.second.to_le_bytes());
}

fn read_u32(buf: &[u8], at: usize) -> u32 {
    let mut bytes = [0u8; 4];
    bytes.copy_from_slice(&buf[at..at + 4]);
    u32::from_le_bytes(bytes)
}

fn read_u64(buf: &[u8], at: usize) -> u64 {
    let mut bytes = [0u8; 8];
    bytes.copy_from_slice(&buf[at..at + 8]);
    u64::from_le_bytes(bytes)
}

fn checksum(header: &[u8], payload: &[u8]) -> u32 {
    let crc = crc32c::crc32c(&header[CHECKSUMMED_HEADER]);
    crc32c::crc32c_append(crc, payload)
}

/// Frame `payload` for delivery to `token`.
///
/// # Errors
///
/// Returns `PacketTooLarge` if the payload exceeds `max_payload` or
/// [`MAX_PAYLOAD_SIZE`].
///
/// # Examples
///
/// ```
/// use postbox_transport::UID;
/// use postbox_transport::wire::{MAX_PAYLOAD_SIZE, deserialize_packet, serialize_packet};
///
/// let packet = serialize_packet(9, UID::new(1, 2), b"hello", MAX_PAYLOAD_SIZE).expect("serialize");
/// let decoded = deserialize_packet(&packet).expect("deserialize");
///
/// assert_eq!(decoded.sequence, 9);
/// assert_eq!(decoded.token, UID::new(1, 2));
/// assert_eq!(decoded.payload, b"hello");
/// ```
pub fn serialize_packet(
    sequence: u64,
    token: UID,
    payload: &[u8],
    max_payload: usize,
) -> Result<Vec<u8>, WireError> {
    let max = max_payload.min(MAX_PAYLOAD_SIZE);
    if payload.len() > max {
        return Err(WireError::PacketTooLarge {
            size: payload.len(),
            max,
        });
    }

    let total_length = HEADER_SIZE + payload.len();
    let mut data = Vec::with_capacity(total_length);
    data.resize(HEADER_SIZE, 0);
    // Fits: payload is capped at 1 MiB.
    write_header(&mut data, total_length as u32, sequence, token);
    let crc = checksum(&data, payload);
    data[4..8].copy_from_slice(&crc.to_le_bytes());
    data.extend_from_slice(payload);
    Ok(data)
}

/// Parse and verify a framed packet.
///
/// # Errors
///
/// - `InsufficientData`: the buffer is shorter than the header or the length field
/// - `InvalidLength`: the length field is below the header size or the buffer is longer
/// - `ChecksumMismatch`: the bytes were corrupted
pub fn deserialize_packet(data: &[u8]) -> Result<Packet, WireError> {
    if data.len() < HEADER_SIZE {
        return Err(WireError::InsufficientData {
            needed: HEADER_SIZE,
            have: data.len(),
        });
    }

    let length = read_u32(data, 0);
    let expected_len = length as usize;
    if expected_len < HEADER_SIZE || data.len() > expected_len {
        return Err(WireError::InvalidLength { length });
    }
    if data.len() < expected_len {
        return Err(WireError::InsufficientData {
            needed: expected_len,
            have: data.len(),
        });
    }

    let (header, payload) = data.split_at(HEADER_SIZE);
    let expected = read_u32(header, 4);
    let actual = checksum(header, payload);
    if expected != actual {
        return Err(WireError::ChecksumMismatch { expected, actual });
    }

    Ok(Packet {
        sequence: read_u64(header, 8),
        token: UID::new(read_u64(header, 16), read_u64(header, 24)),
        payload: payload.to_vec(),
    })
}

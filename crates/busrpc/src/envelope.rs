// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Wire envelope for request and reply frames.
//!
//! A request frame is the encoded payload itself; the reply destination and
//! the deadline hint travel out of band (transport reply subject and
//! [`TIMEOUT_HEADER`]).
//!
//! A reply frame leads with a one-byte discriminant so that success and
//! failure are told apart without touching the application payload, and
//! ends with a CRC-32 so that corruption never decodes as a success:
//!
//! ```text
//! +------+--------------------------------------+------------+
//! | u8   | body                                 | u32 LE     |
//! | 0x00 | Success: payload bytes               | CRC-32 of  |
//! | 0x01 | Failure: i32 LE code, u32 LE length, | disc + body|
//! |      |          UTF-8 message               |            |
//! +------+--------------------------------------+------------+
//! ```

use crate::error::ErrorCode;
use bytes::{BufMut, Bytes, BytesMut};
use thiserror::Error;

/// Header carrying the caller's remaining time budget in milliseconds.
pub const TIMEOUT_HEADER: &str = "busrpc-timeout-ms";

const DISC_SUCCESS: u8 = 0x00;
const DISC_FAILURE: u8 = 0x01;
const DISC_LEN: usize = 1;
const CHECKSUM_LEN: usize = 4;
const FAILURE_HEADER_LEN: usize = 8;

/// Failure messages longer than this are truncated on encode.
pub const MAX_FAILURE_MESSAGE_LEN: usize = 64 * 1024;

/// A frame (or the payload inside it) could not be decoded.
#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("empty frame")]
    Empty,

    #[error("truncated frame: need {needed} bytes, got {available}")]
    Truncated { needed: usize, available: usize },

    #[error("checksum mismatch: frame says {expected:#010x}, computed {actual:#010x}")]
    ChecksumMismatch { expected: u32, actual: u32 },

    #[error("unknown reply discriminant {0:#04x}")]
    UnknownDiscriminant(u8),

    #[error("unknown error code {0}")]
    UnknownErrorCode(i32),

    #[error("failure message is not valid UTF-8")]
    InvalidUtf8,

    #[error("{0} trailing bytes after failure message")]
    TrailingBytes(usize),

    #[error("payload: {0}")]
    Payload(#[from] crate::message::CodecError),
}

/// Outcome of one call as carried on the wire.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReplyEnvelope {
    /// The call succeeded; the encoded response follows
    Success(Bytes),
    /// The call failed with a code and a human-readable message
    Failure { code: ErrorCode, message: String },
}

impl ReplyEnvelope {
    pub fn success(payload: impl Into<Bytes>) -> Self {
        Self::Success(payload.into())
    }

    pub fn failure(code: ErrorCode, message: impl Into<String>) -> Self {
        Self::Failure {
            code,
            message: message.into(),
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success(_))
    }

    /// Failure code, `None` for a success.
    pub fn error_code(&self) -> Option<ErrorCode> {
        match self {
            Self::Success(_) => None,
            Self::Failure { code, .. } => Some(*code),
        }
    }
}

/// Encode a request frame.
pub fn encode_request(payload: Bytes) -> Bytes {
    payload
}

/// Decode a request frame into the payload it carries.
pub fn decode_request(frame: &Bytes) -> Result<Bytes, DecodeError> {
    Ok(frame.clone())
}

/// Encode a reply frame.
pub fn encode_reply(reply: &ReplyEnvelope) -> Bytes {
    let mut buf = match reply {
        ReplyEnvelope::Success(payload) => {
            let mut buf = BytesMut::with_capacity(DISC_LEN + payload.len() + CHECKSUM_LEN);
            buf.put_u8(DISC_SUCCESS);
            buf.put_slice(payload);
            buf
        }
        ReplyEnvelope::Failure { code, message } => {
            let message = truncate_utf8(message, MAX_FAILURE_MESSAGE_LEN);
            let mut buf = BytesMut::with_capacity(
                DISC_LEN + FAILURE_HEADER_LEN + message.len() + CHECKSUM_LEN,
            );
            buf.put_u8(DISC_FAILURE);
            buf.put_i32_le(code.as_i32());
            // Bounded by MAX_FAILURE_MESSAGE_LEN.
            buf.put_u32_le(message.len() as u32);
            buf.put_slice(message.as_bytes());
            buf
        }
    };

    let checksum = crc32fast::hash(&buf);
    buf.put_u32_le(checksum);
    buf.freeze()
}

/// Decode a reply frame.
///
/// Anything that is not exactly one well-formed variant is an error.
pub fn decode_reply(frame: &Bytes) -> Result<ReplyEnvelope, DecodeError> {
    if frame.is_empty() {
        return Err(DecodeError::Empty);
    }
    if frame.len() < DISC_LEN + CHECKSUM_LEN {
        return Err(DecodeError::Truncated {
            needed: DISC_LEN + CHECKSUM_LEN,
            available: frame.len(),
        });
    }

    let body_end = frame.len() - CHECKSUM_LEN;
    let expected = read_u32_le(&frame[body_end..]);
    let actual = crc32fast::hash(&frame[..body_end]);
    if expected != actual {
        return Err(DecodeError::ChecksumMismatch { expected, actual });
    }

    match frame[0] {
        DISC_SUCCESS => Ok(ReplyEnvelope::Success(frame.slice(DISC_LEN..body_end))),
        DISC_FAILURE => decode_failure(&frame[DISC_LEN..body_end]),
        other => Err(DecodeError::UnknownDiscriminant(other)),
    }
}

fn decode_failure(body: &[u8]) -> Result<ReplyEnvelope, DecodeError> {
    if body.len() < FAILURE_HEADER_LEN {
        return Err(DecodeError::Truncated {
            needed: FAILURE_HEADER_LEN,
            available: body.len(),
        });
    }

    let raw_code = read_u32_le(&body[0..4]) as i32;
    let code = ErrorCode::from_i32(raw_code).ok_or(DecodeError::UnknownErrorCode(raw_code))?;

    let len = read_u32_le(&body[4..8]) as usize;
    let text = &body[FAILURE_HEADER_LEN..];
    if text.len() < len {
        return Err(DecodeError::Truncated {
            needed: FAILURE_HEADER_LEN + len,
            available: body.len(),
        });
    }
    if text.len() > len {
        return Err(DecodeError::TrailingBytes(text.len() - len));
    }

    let message = std::str::from_utf8(text).map_err(|_| DecodeError::InvalidUtf8)?;
    Ok(ReplyEnvelope::Failure {
        code,
        message: message.to_string(),
    })
}

fn read_u32_le(bytes: &[u8]) -> u32 {
    u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]])
}

fn truncate_utf8(s: &str, max: usize) -> &str {
    if s.len() <= max {
        return s;
    }
    let mut end = max;
    while !s.is_char_boundary(end) {
        end -= 1;
    }
    &s[..end]
}

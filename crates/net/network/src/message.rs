//! Request and response types of the range protocol.

use alloy_rlp::{RlpDecodable, RlpEncodable};
use bytes::Bytes;
use ember_primitives::{BlobsSidecar, Slot};

/// Message of the error chunk sent when the failure is on our side.
pub const GENERIC_ERROR_MESSAGE: &str = "internal service error";

/// Message of the error chunk sent when a peer exceeded its quota.
pub const RATE_LIMITED_MESSAGE: &str = "rate limited";

/// Maximum length in bytes of an error chunk message.
pub const MAX_ERROR_MESSAGE_LEN: usize = 256;

/// Requests the sidecars of all slots in `[start_slot, start_slot + count)`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, RlpEncodable, RlpDecodable)]
pub struct RangeRequest {
    /// First slot of the range.
    pub start_slot: Slot,
    /// Number of slots in the range.
    pub count: u64,
}

impl RangeRequest {
    /// Creates a new request.
    pub const fn new(start_slot: Slot, count: u64) -> Self {
        Self { start_slot, count }
    }

    /// First slot after the range, saturating at the maximum slot.
    pub const fn end_slot(&self) -> Slot {
        self.start_slot.saturating_add(self.count)
    }
}

/// The result byte leading every response chunk.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum ResponseCode {
    /// The chunk carries a payload.
    Success = 0,
    /// The request was malformed or not allowed, the peer is at fault.
    InvalidRequest = 1,
    /// Something failed on the responding side.
    ServerError = 2,
    /// The requested data is not available.
    ResourceUnavailable = 3,
}

impl ResponseCode {
    /// Returns `true` for [`ResponseCode::Success`].
    pub const fn is_success(self) -> bool {
        matches!(self, Self::Success)
    }
}

impl From<ResponseCode> for u8 {
    fn from(code: ResponseCode) -> Self {
        code as Self
    }
}

impl TryFrom<u8> for ResponseCode {
    type Error = u8;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        Ok(match value {
            0 => Self::Success,
            1 => Self::InvalidRequest,
            2 => Self::ServerError,
            3 => Self::ResourceUnavailable,
            other => return Err(other),
        })
    }
}

/// A single chunk of a response stream.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ResponseChunk {
    /// The result code.
    pub code: ResponseCode,
    /// RLP encoded item for successful chunks, the error message otherwise.
    pub payload: Bytes,
}

impl ResponseChunk {
    /// A successful chunk carrying the sidecar.
    pub fn success(sidecar: &BlobsSidecar) -> Self {
        Self { code: ResponseCode::Success, payload: alloy_rlp::encode(sidecar).into() }
    }

    /// An error chunk. The message is cut to [`MAX_ERROR_MESSAGE_LEN`] bytes.
    pub fn error(code: ResponseCode, message: &str) -> Self {
        let mut bytes = message.as_bytes();
        if bytes.len() > MAX_ERROR_MESSAGE_LEN {
            bytes = &bytes[..MAX_ERROR_MESSAGE_LEN];
        }
        Self { code, payload: Bytes::copy_from_slice(bytes) }
    }

    /// Decodes the sidecar of a successful chunk.
    ///
    /// Returns `None` for error chunks.
    pub fn decode_sidecar(&self) -> Option<Result<BlobsSidecar, alloy_rlp::Error>> {
        self.code
            .is_success()
            .then(|| alloy_rlp::Decodable::decode(&mut self.payload.as_ref()))
    }

    /// The error message of an error chunk.
    ///
    /// Returns `None` for successful chunks.
    pub fn error_message(&self) -> Option<String> {
        (!self.code.is_success()).then(|| String::from_utf8_lossy(&self.payload).into_owned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn end_slot_saturates() {
        assert_eq!(RangeRequest::new(10, 5).end_slot(), 15);
        assert_eq!(RangeRequest::new(u64::MAX - 1, 5).end_slot(), u64::MAX);
    }

    #[test]
    fn response_code_byte() {
        for code in [
            ResponseCode::Success,
            ResponseCode::InvalidRequest,
            ResponseCode::ServerError,
            ResponseCode::ResourceUnavailable,
        ] {
            assert_eq!(ResponseCode::try_from(u8::from(code)), Ok(code));
        }
        assert_eq!(ResponseCode::try_from(4), Err(4));
    }

    #[test]
    fn error_message_is_truncated() {
        let chunk = ResponseChunk::error(ResponseCode::InvalidRequest, &"x".repeat(1000));
        assert_eq!(chunk.payload.len(), MAX_ERROR_MESSAGE_LEN);
        assert!(chunk.decode_sidecar().is_none());

        let chunk = ResponseChunk::error(ResponseCode::ServerError, GENERIC_ERROR_MESSAGE);
        assert_eq!(chunk.error_message().as_deref(), Some(GENERIC_ERROR_MESSAGE));
    }
}

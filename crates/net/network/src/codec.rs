//! Framing of range protocol messages.
//!
//! A request is a single length-delimited RLP [`RangeRequest`]. Every response chunk starts
//! with its [`ResponseCode`] byte followed by a length-delimited payload. Lengths are 4 byte big
//! endian.

use crate::message::{RangeRequest, ResponseChunk, ResponseCode};
use alloy_rlp::Decodable;
use bytes::{Buf, BufMut, Bytes, BytesMut};
use std::io;
use tokio_util::codec::{Decoder, Encoder, LengthDelimitedCodec};

/// Maximum payload length of a single frame.
pub const MAX_FRAME_LENGTH: usize = 10 * 1024 * 1024;

/// Length of the length prefix.
const LENGTH_FIELD_LENGTH: usize = 4;

/// Errors that can occur while framing messages.
#[derive(Debug, thiserror::Error)]
pub enum CodecError {
    /// IO error on the underlying stream.
    #[error(transparent)]
    Io(#[from] io::Error),
    /// The payload is not valid RLP.
    #[error("invalid rlp payload: {0}")]
    Rlp(#[from] alloy_rlp::Error),
    /// Unknown leading result byte.
    #[error("unknown response code {0}")]
    UnknownResponseCode(u8),
    /// Frame exceeds [`MAX_FRAME_LENGTH`].
    #[error("frame of {0} bytes exceeds the maximum frame length")]
    FrameTooLarge(usize),
}

fn length_delimited() -> LengthDelimitedCodec {
    LengthDelimitedCodec::builder()
        .length_field_length(LENGTH_FIELD_LENGTH)
        .max_frame_length(MAX_FRAME_LENGTH)
        .new_codec()
}

/// Codec of the serving side: decodes requests and encodes response chunks.
#[derive(Debug)]
pub struct RpcCodec {
    inner: LengthDelimitedCodec,
}

impl Default for RpcCodec {
    fn default() -> Self {
        Self { inner: length_delimited() }
    }
}

impl Decoder for RpcCodec {
    type Item = RangeRequest;
    type Error = CodecError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        let Some(frame) = self.inner.decode(src)? else { return Ok(None) };
        Ok(Some(RangeRequest::decode(&mut frame.as_ref())?))
    }
}

impl Encoder<ResponseChunk> for RpcCodec {
    type Error = CodecError;

    fn encode(&mut self, chunk: ResponseChunk, dst: &mut BytesMut) -> Result<(), Self::Error> {
        if chunk.payload.len() > MAX_FRAME_LENGTH {
            return Err(CodecError::FrameTooLarge(chunk.payload.len()))
        }
        dst.reserve(1 + LENGTH_FIELD_LENGTH + chunk.payload.len());
        dst.put_u8(chunk.code.into());
        self.inner.encode(chunk.payload, dst)?;
        Ok(())
    }
}

/// Codec of the requesting side: encodes requests and decodes response chunks.
#[derive(Debug)]
pub struct RpcClientCodec {
    inner: LengthDelimitedCodec,
}

impl Default for RpcClientCodec {
    fn default() -> Self {
        Self { inner: length_delimited() }
    }
}

impl Encoder<RangeRequest> for RpcClientCodec {
    type Error = CodecError;

    fn encode(&mut self, request: RangeRequest, dst: &mut BytesMut) -> Result<(), Self::Error> {
        self.inner.encode(Bytes::from(alloy_rlp::encode(request)), dst)?;
        Ok(())
    }
}

impl Decoder for RpcClientCodec {
    type Item = ResponseChunk;
    type Error = CodecError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        let header = 1 + LENGTH_FIELD_LENGTH;
        if src.len() < header {
            return Ok(None)
        }
        let code = ResponseCode::try_from(src[0]).map_err(CodecError::UnknownResponseCode)?;
        let len = (&src[1..header]).get_u32() as usize;
        if len > MAX_FRAME_LENGTH {
            return Err(CodecError::FrameTooLarge(len))
        }
        if src.len() < header + len {
            src.reserve(header + len - src.len());
            return Ok(None)
        }
        src.advance(header);
        let payload = src.split_to(len).freeze();
        Ok(Some(ResponseChunk { code, payload }))
    }
}

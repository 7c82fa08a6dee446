use bytes::{BufMut, BytesMut};
use std::fmt;
use thiserror::Error;
use tokio_util::codec::{Decoder, Encoder, LinesCodec, LinesCodecError};

/// Longest request line accepted before the peer is cut off.
pub const DEFAULT_MAX_LINE_LENGTH: usize = 64 * 1024;

#[derive(Debug, Error)]
pub enum CodecError {
    #[error("line too long")]
    LineTooLong,

    #[error("io error {0}")]
    Io(#[from] std::io::Error),
}

impl From<LinesCodecError> for CodecError {
    fn from(err: LinesCodecError) -> Self {
        match err {
            LinesCodecError::MaxLineLengthExceeded => CodecError::LineTooLong,
            LinesCodecError::Io(e) => CodecError::Io(e),
        }
    }
}

/// Newline-delimited UTF-8 framing.
///
/// Decodes into raw lines (a trailing `\r` is stripped) and encodes anything
/// `Display` as one line, so the server writes `Response`s and the client
/// writes the text typed by the user through the same codec.
#[derive(Debug, Clone)]
pub struct TextCodec {
    lines: LinesCodec,
}

impl TextCodec {
    pub fn new() -> Self {
        Self::with_max_length(DEFAULT_MAX_LINE_LENGTH)
    }

    pub fn with_max_length(max_length: usize) -> Self {
        Self {
            lines: LinesCodec::new_with_max_length(max_length),
        }
    }

    pub fn max_length(&self) -> usize {
        self.lines.max_length()
    }
}

impl Default for TextCodec {
    fn default() -> Self {
        Self::new()
    }
}

impl Decoder for TextCodec {
    type Item = String;
    type Error = CodecError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<String>, CodecError> {
        self.lines.decode(src).map_err(CodecError::from)
    }

    fn decode_eof(&mut self, src: &mut BytesMut) -> Result<Option<String>, CodecError> {
        self.lines.decode_eof(src).map_err(CodecError::from)
    }
}

impl<T: fmt::Display> Encoder<T> for TextCodec {
    type Error = CodecError;

    fn encode(&mut self, item: T, dst: &mut BytesMut) -> Result<(), CodecError> {
        let line = item.to_string();
        dst.reserve(line.len() + 1);
        dst.put_slice(line.as_bytes());
        dst.put_u8(b'\n');
        Ok(())
    }
}

use bytes::{Buf, BytesMut};
use std::convert::TryInto;
use std::env;
use std::io::Cursor;
use tokio_util::codec::{Decoder, Encoder};
use tracing::debug;

use crate::frame::{self, Frame, CRLF};
use crate::Error;

/// A decoded request. Malformed input is not fatal for the connection, the codec reports it
/// and skips ahead to the next frame.
pub type Request = Result<Frame, frame::Error>;

pub struct FrameCodec {
    max_frame_size: usize,
}

impl FrameCodec {
    pub fn new() -> FrameCodec {
        FrameCodec {
            max_frame_size: FrameCodec::max_frame_size(),
        }
    }

    fn max_frame_size() -> usize {
        env::var("MAX_FRAME_SIZE")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(512 * 1024 * 1024)
    }
}

impl Default for FrameCodec {
    fn default() -> Self {
        Self::new()
    }
}

impl Decoder for FrameCodec {
    type Item = Request;
    type Error = Error;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        // Check if the frame size exceeds a certain limit to prevent DoS attacks
        if src.len() > self.max_frame_size {
            return Err("frame size exceeds limit".into());
        }

        loop {
            // Blank lines between frames carry no command.
            if src.starts_with(CRLF) {
                src.advance(CRLF.len());
                continue;
            }

            let Some(&first_byte) = src.first() else {
                return Ok(None);
            };

            let mut cursor = Cursor::new(&src[..]);
            let parsed = if first_byte == b'*' {
                Frame::parse(&mut cursor).and_then(validate_request)
            } else {
                Frame::parse_inline(&mut cursor)
            };
            let position: usize = cursor
                .position()
                .try_into()
                .expect("Cursor position is too large");

            match parsed {
                // Whitespace only inline line, nothing to run.
                Ok(Frame::Array(parts)) if parts.is_empty() && first_byte != b'*' => {
                    src.advance(position);
                }
                Ok(frame) => {
                    src.advance(position);
                    return Ok(Some(Ok(frame)));
                }
                // Not enough data to parse a frame.
                Err(frame::Error::Incomplete) => return Ok(None),
                // The whole frame was read but is not a valid command.
                Err(err @ (frame::Error::EmptyCommand | frame::Error::ExpectedBulk(_))) => {
                    src.advance(position);
                    return Ok(Some(Err(err)));
                }
                Err(err) => {
                    skip_to_next_frame(src);
                    return Ok(Some(Err(err)));
                }
            }
        }
    }

    fn decode_eof(&mut self, buf: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        match self.decode(buf)? {
            Some(frame) => Ok(Some(frame)),
            None => {
                if !buf.is_empty() {
                    debug!("Dropping {} bytes of an incomplete frame", buf.len());
                    buf.clear();
                }
                Ok(None)
            }
        }
    }
}

impl Encoder<Frame> for FrameCodec {
    type Error = Error;

    fn encode(&mut self, frame: Frame, dst: &mut BytesMut) -> Result<(), Self::Error> {
        dst.extend_from_slice(&frame.serialize());
        Ok(())
    }
}

/// Commands are sent as a non-empty array of bulk strings.
fn validate_request(frame: Frame) -> Result<Frame, frame::Error> {
    let parts = match frame {
        Frame::Array(parts) => parts,
        _ => return Err(frame::Error::InvalidMultibulkLength),
    };

    if parts.is_empty() {
        return Err(frame::Error::EmptyCommand);
    }

    if let Some(part) = parts.iter().find(|part| !matches!(part, Frame::Bulk(_))) {
        return Err(frame::Error::ExpectedBulk(part.marker()));
    }

    Ok(Frame::Array(parts))
}

/// Discards input up to the start of the next line beginning with `*`, or everything that has
/// been buffered when there is no such line.
fn skip_to_next_frame(src: &mut BytesMut) {
    let next_frame = src
        .windows(3)
        .skip(1)
        .position(|window| &window[..2] == CRLF && window[2] == b'*')
        .map(|index| index + 1 + CRLF.len());

    match next_frame {
        Some(position) => src.advance(position),
        None => src.clear(),
    }
}

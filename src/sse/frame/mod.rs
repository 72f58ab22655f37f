//! Server-sent event wire format decoding.
//!
//! The event server sends lines of either `:<comment>` (keep-alive) or `data:<json>` (payload),
//! conventionally separated by blank lines. Every other line is ignored.

mod buffer;
mod stream;

pub use stream::FrameStream;

use bytes::Bytes;
use snafu::prelude::*;

static COMMENT_PREFIX: &str = ":";

static DATA_PREFIX: &str = "data:";

/// Error when decode a single line
#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)), module(decode_error), context(suffix(false)))]
pub enum DecodeError {
    /// line is not valid utf-8 text
    #[snafu(display("line {line:?} is not valid utf-8: {source}"))]
    InvalidUtf8 {
        /// raw line
        line: Bytes,
        /// source error
        source: std::str::Utf8Error,
    },

    /// data line holds invalid json
    #[snafu(display("data {data:?} is not valid json: {source}"))]
    InvalidJson {
        /// text after the `data:` prefix
        data: String,
        /// source error
        source: serde_json::Error,
    },
}

/// Error when read frames from a byte stream
#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)), module(frame_error), context(suffix(false)))]
pub enum FrameError {
    /// underlying byte stream broken
    #[snafu(display("read event stream failed: {source}"))]
    Transport {
        /// source error
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// a line could not be decoded
    #[snafu(display("decode frame failed: {source}"))]
    Decode {
        /// source error
        source: DecodeError,
    },
}

/// One decoded line of the event stream
#[derive(Debug, Clone, PartialEq)]
pub enum Frame {
    /// keep-alive comment, carries the comment text
    Heartbeat(String),
    /// parsed json payload of a `data:` line
    Data(serde_json::Value),
}

/// Decode one line (terminator already stripped).
///
/// Returns `Ok(None)` for lines which carry nothing, like blank lines or other SSE fields.
pub fn decode_line(line: &[u8]) -> Result<Option<Frame>, DecodeError> {
    let text = std::str::from_utf8(line).with_context(|_| decode_error::InvalidUtf8 {
        line: Bytes::copy_from_slice(line),
    })?;

    if let Some(comment) = text.strip_prefix(COMMENT_PREFIX) {
        return Ok(Some(Frame::Heartbeat(comment.trim().to_string())));
    }

    if let Some(data) = text.strip_prefix(DATA_PREFIX) {
        let value = serde_json::from_str(data).context(decode_error::InvalidJson { data })?;
        return Ok(Some(Frame::Data(value)));
    }

    if !text.is_empty() {
        log::trace!("Ignore non-data line: {}", text);
    }

    Ok(None)
}

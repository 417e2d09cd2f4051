//! SSE wire framing
//!
//! Every relayed message becomes one event:
//!
//! ```text
//! data: {"data":"<message>"} \n\n
//! ```
//!
//! The space before the terminating blank line is part of the format that
//! existing clients expect. Keep-alive frames are SSE comments, which
//! clients discard.

use bytes::{Bytes, BytesMut};
use serde::{Deserialize, Serialize};

use crate::registry::Message;

const DATA_PREFIX: &str = "data: ";
const EVENT_TERMINATOR: &str = " \n\n";
const KEEP_ALIVE: &[u8] = b": keep-alive\n\n";

/// JSON body carried in each event
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventPayload {
    pub data: String,
}

#[derive(Serialize)]
struct EventPayloadRef<'a> {
    data: &'a str,
}

/// Encode a message as one SSE event
pub fn encode_event(message: &Message) -> Result<Bytes, serde_json::Error> {
    let json = serde_json::to_vec(&EventPayloadRef {
        data: message.as_str(),
    })?;

    let mut buf = BytesMut::with_capacity(DATA_PREFIX.len() + json.len() + EVENT_TERMINATOR.len());
    buf.extend_from_slice(DATA_PREFIX.as_bytes());
    buf.extend_from_slice(&json);
    buf.extend_from_slice(EVENT_TERMINATOR.as_bytes());
    Ok(buf.freeze())
}

/// SSE comment used to probe idle connections
pub fn keep_alive() -> Bytes {
    Bytes::from_static(KEEP_ALIVE)
}

/// Decode a single event block (without its blank-line terminator)
///
/// Returns `None` for comments and blocks without a parseable `data:` line.
pub fn decode_event(block: &str) -> Option<EventPayload> {
    block
        .lines()
        .find_map(|line| line.strip_prefix("data:"))
        .and_then(|data| serde_json::from_str(data.trim()).ok())
}

/// Incremental decoder for a chunked SSE byte stream
///
/// Understands the frames this relay emits: `data:` lines carrying the JSON
/// payload, comments, and LF or CRLF line endings. Multi-line `data`
/// fields, `event:`/`id:` fields and bare CR line endings are not supported.
#[derive(Debug, Default)]
pub struct EventDecoder {
    buf: Vec<u8>,
    /// Bytes of `buf` already searched for a terminator
    scanned: usize,
}

impl EventDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed a chunk and collect every event completed by it
    pub fn push(&mut self, chunk: &[u8]) -> Vec<EventPayload> {
        self.buf
            .extend(chunk.iter().copied().filter(|&byte| byte != b'\r'));

        let mut events = Vec::new();
        let mut start = 0;
        let mut pos = self.scanned;
        while pos + 1 < self.buf.len() {
            if self.buf[pos] == b'\n' && self.buf[pos + 1] == b'\n' {
                if let Some(event) = decode_event(&String::from_utf8_lossy(&self.buf[start..pos])) {
                    events.push(event);
                }
                start = pos + 2;
                pos = start;
            } else {
                pos += 1;
            }
        }

        self.buf.drain(..start);
        self.scanned = pos - start;
        events
    }
}

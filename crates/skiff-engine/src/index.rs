//! The on-remote index format: one lowercase hex key per line.
//!
//! No header, no checksum, no versioning. An empty line terminates
//! decoding. Duplicate keys may appear when the stream repeats content.

use std::fmt::Write;

use skiff_types::Key;

use crate::error::EngineError;

/// Serialize an ordered key sequence to newline-terminated lowercase hex.
pub fn encode_index(keys: &[Key]) -> String {
    let mut out = String::with_capacity(keys.len() * 65);
    for key in keys {
        writeln!(out, "{key}").expect("writing to a String cannot fail");
    }
    out
}

/// Decode an index body into its ordered key sequence.
///
/// Order and duplicates are preserved. A line that is not exactly 64 hex
/// characters is an error; nothing before it is acted upon by callers.
pub fn decode_index(body: &[u8]) -> Result<Vec<Key>, EngineError> {
    let mut keys = Vec::new();

    for (number, line) in body.split(|b| *b == b'\n').enumerate() {
        if line.is_empty() {
            break;
        }
        let key = std::str::from_utf8(line)
            .ok()
            .and_then(|text| text.parse::<Key>().ok())
            .ok_or_else(|| EngineError::BadIndexLine {
                line: number + 1,
                text: String::from_utf8_lossy(line).into_owned(),
            })?;
        keys.push(key);
    }

    Ok(keys)
}

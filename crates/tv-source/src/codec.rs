//! Path-safe token encoding.
//!
//! Tokens are standard base64 with `/` swapped for `_` and the trailing `=`
//! padding stripped, so an arbitrary URL fits in a single path segment of
//! `<proxy>/resolve/<token>`. The format must stay byte-compatible with the
//! resolve proxy on the other side.

use base64::{Engine, engine::general_purpose::STANDARD};
use std::string::FromUtf8Error;
use thiserror::Error;

const SPECIAL: char = '/';
const ESCAPE: char = '_';
const PAD: char = '=';

#[derive(Error, Debug)]
pub enum CodecError {
    #[error("invalid base64 token: {0}")]
    Base64(#[from] base64::DecodeError),
    #[error("token does not decode to utf-8: {0}")]
    Utf8(#[from] FromUtf8Error),
}

/// Encodes `text` into a path-safe token.
pub fn encode(text: &str) -> String {
    STANDARD
        .encode(text)
        .replace(SPECIAL, &ESCAPE.to_string())
        .trim_end_matches(PAD)
        .to_string()
}

/// Decodes a token produced by [`encode`], returning `None` for anything
/// malformed.
pub fn decode(token: &str) -> Option<String> {
    try_decode(token).ok()
}

/// Decodes a token, reporting why it failed.
///
/// Padding is derived as `4 - len % 4` from the token length, which appends
/// a full `====` quad to tokens that are already aligned. That surplus quad
/// is dropped before decoding; any other padding is passed through and
/// validated by the base64 engine.
pub fn try_decode(token: &str) -> Result<String, CodecError> {
    let padding = 4 - token.len() % 4;
    let mut padded = token.replace(ESCAPE, &SPECIAL.to_string());
    padded.extend(std::iter::repeat_n(PAD, padding));

    if padding == 4 {
        padded.truncate(padded.len() - 4);
    }

    let bytes = STANDARD.decode(padded.as_bytes())?;
    Ok(String::from_utf8(bytes)?)
}

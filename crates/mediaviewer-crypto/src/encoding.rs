use base64::Engine as _;
use base64::engine::general_purpose::{STANDARD_NO_PAD, URL_SAFE_NO_PAD};

pub use base64::DecodeError;

/// Encode bytes as unpadded standard base64 (the wire format for hashes,
/// IVs, signatures, tokens and ciphertext).
pub fn encode(bytes: &[u8]) -> String {
    STANDARD_NO_PAD.encode(bytes)
}

/// Decode unpadded standard base64.
pub fn decode(encoded: &str) -> Result<Vec<u8>, DecodeError> {
    STANDARD_NO_PAD.decode(encoded)
}

/// Encode bytes as unpadded URL-safe base64 (shortcut ids, one-time keys).
pub fn encode_url(bytes: &[u8]) -> String {
    URL_SAFE_NO_PAD.encode(bytes)
}

/// Decode unpadded URL-safe base64.
pub fn decode_url(encoded: &str) -> Result<Vec<u8>, DecodeError> {
    URL_SAFE_NO_PAD.decode(encoded)
}

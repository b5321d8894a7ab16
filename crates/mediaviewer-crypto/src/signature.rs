use hmac::{Hmac, Mac};
use sha2::{Digest, Sha256};

type HmacSha256 = Hmac<Sha256>;

/// Values derived from a one-time media key. The key itself is not kept.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DerivedKeyMaterial {
    /// HMAC-SHA256 over `url ‖ sha256 ‖ iv`, keyed by the raw key.
    pub signature: [u8; 32],
    /// Plain SHA-256 of the raw key.
    pub key_sha256: [u8; 32],
}

/// Sign the textual content locator, hash and IV fields with `key`.
///
/// The fields are signed exactly as the client sent them (base64 text),
/// not their decoded bytes, so the viewer can recompute the signature
/// from the same JSON it receives.
pub fn derive(key: &[u8], url: &str, sha256: &str, iv: &str) -> DerivedKeyMaterial {
    let mut mac =
        <HmacSha256 as Mac>::new_from_slice(key).expect("HMAC accepts keys of any length");
    mac.update(url.as_bytes());
    mac.update(sha256.as_bytes());
    mac.update(iv.as_bytes());

    DerivedKeyMaterial {
        signature: mac.finalize().into_bytes().into(),
        key_sha256: key_sha256(key),
    }
}

pub fn key_sha256(key: &[u8]) -> [u8; 32] {
    Sha256::digest(key).into()
}

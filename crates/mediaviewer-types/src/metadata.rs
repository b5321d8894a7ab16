//! Decoding, validation and redaction of the two metadata shapes clients
//! exchange with the server: media references and auth bundles.
//!
//! Wire structs ([`MediaReference`], [`AuthBundle`]) are what serde reads.
//! Only their decoded counterparts can be stored or resolved, so a bundle
//! that failed validation never reaches the database.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;

use mediaviewer_crypto::{encoding, signature};

use crate::server_name::{is_valid_server_name, parse_content_uri};

#[derive(Debug, Error)]
pub enum MetadataError {
    #[error("invalid Matrix content URI")]
    InvalidContentUri,
    #[error("invalid Matrix server name")]
    InvalidServerName,
    #[error("invalid base64 in {field} field: {source}")]
    InvalidBase64 {
        field: &'static str,
        source: encoding::DecodeError,
    },
    #[error("failed to marshal JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("missing key or key_sha256")]
    MissingKey,
}

fn decode_field(field: &'static str, value: &str) -> Result<Vec<u8>, MetadataError> {
    encoding::decode(value).map_err(|source| MetadataError::InvalidBase64 { field, source })
}

/// Anything the homeserver resolver can work on: it may already carry a
/// resolved base URL, and may name the domain to discover one for.
pub trait HomeserverTarget {
    fn homeserver_url(&self) -> Option<&str>;
    fn homeserver_domain(&self) -> Option<&str>;
}

fn non_empty(s: &str) -> Option<&str> {
    if s.is_empty() { None } else { Some(s) }
}

// -- Media references --

/// Media reference as sent by a client.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MediaReference {
    pub url: String,
    pub sha256: String,
    pub iv: String,
    /// One-time key, URL-safe base64. Inbound only.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub key: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub key_sha256: String,
    #[serde(default)]
    pub signature: String,
    #[serde(default)]
    pub homeserver_url: String,
    #[serde(default)]
    pub info: Option<Map<String, Value>>,
}

/// A validated media reference. The raw key is gone; `key_sha256` and
/// `signature` hold whatever it produced.
#[derive(Debug, Clone)]
pub struct DecodedMediaReference {
    reference: MediaReference,
    server_name: String,
    pub sha256_bytes: Vec<u8>,
    pub iv_bytes: Vec<u8>,
    pub key_sha256_bytes: Vec<u8>,
    pub signature_bytes: Vec<u8>,
}

/// Media reference with every field that must not leave the server removed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MediaReferenceView {
    pub url: String,
    pub sha256: String,
    pub iv: String,
    pub signature: String,
    pub homeserver_url: String,
    pub info: Option<Map<String, Value>>,
}

impl MediaReference {
    /// Validate every field and derive the signature and key hash from the
    /// one-time key, if one was sent. Consumes `self` so the raw key cannot
    /// outlive decoding.
    pub fn decode(mut self) -> Result<DecodedMediaReference, MetadataError> {
        let server_name = parse_content_uri(&self.url)
            .ok_or(MetadataError::InvalidContentUri)?
            .server_name
            .to_string();
        if !is_valid_server_name(&server_name) {
            return Err(MetadataError::InvalidServerName);
        }

        let sha256_bytes = decode_field("sha256", &self.sha256)?;
        let iv_bytes = decode_field("iv", &self.iv)?;

        let key = std::mem::take(&mut self.key);
        if !key.is_empty() {
            let key_bytes = encoding::decode_url(&key)
                .map_err(|source| MetadataError::InvalidBase64 { field: "key", source })?;
            let derived = signature::derive(&key_bytes, &self.url, &self.sha256, &self.iv);
            self.signature = encoding::encode(&derived.signature);
            self.key_sha256 = encoding::encode(&derived.key_sha256);
        }

        let key_sha256_bytes = decode_field("key_sha256", &self.key_sha256)?;
        let signature_bytes = decode_field("signature", &self.signature)?;
        serde_json::to_vec(&self.info)?;

        Ok(DecodedMediaReference {
            reference: self,
            server_name,
            sha256_bytes,
            iv_bytes,
            key_sha256_bytes,
            signature_bytes,
        })
    }
}

impl DecodedMediaReference {
    pub fn reference(&self) -> &MediaReference {
        &self.reference
    }

    pub fn server_name(&self) -> &str {
        &self.server_name
    }

    pub fn set_homeserver_url(&mut self, url: String) {
        self.reference.homeserver_url = url;
    }

    pub fn public_view(&self) -> MediaReferenceView {
        let r = &self.reference;
        MediaReferenceView {
            url: r.url.clone(),
            sha256: r.sha256.clone(),
            iv: r.iv.clone(),
            signature: r.signature.clone(),
            homeserver_url: r.homeserver_url.clone(),
            info: r.info.clone(),
        }
    }

    /// Turn the reference into a storable bundle. The key hash becomes the
    /// authorization token and the public view becomes the stored blob.
    pub fn into_auth_bundle(self) -> Result<DecodedAuthBundle, MetadataError> {
        if self.key_sha256_bytes.is_empty() {
            return Err(MetadataError::MissingKey);
        }
        let ciphertext = serde_json::to_vec(&self.public_view())?;
        Ok(DecodedAuthBundle {
            homeserver: Some(self.server_name),
            homeserver_url: self.reference.homeserver_url,
            auth_token: self.key_sha256_bytes,
            ciphertext,
        })
    }
}

impl HomeserverTarget for DecodedMediaReference {
    fn homeserver_url(&self) -> Option<&str> {
        non_empty(&self.reference.homeserver_url)
    }

    fn homeserver_domain(&self) -> Option<&str> {
        Some(&self.server_name)
    }
}

// -- Auth bundles --

/// Auth bundle as sent by a client.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AuthBundle {
    pub ciphertext: String,
    pub auth_token: String,
    /// Server name of the homeserver, resolved via well-known discovery.
    #[serde(default)]
    pub homeserver: String,
    #[serde(default)]
    pub homeserver_url: String,
}

/// A fully decoded auth bundle; both binary fields are populated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedAuthBundle {
    pub homeserver: Option<String>,
    pub homeserver_url: String,
    pub auth_token: Vec<u8>,
    pub ciphertext: Vec<u8>,
}

/// The only part of an auth bundle returned to callers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthBundleView {
    pub ciphertext: String,
    pub homeserver_url: String,
}

impl AuthBundle {
    pub fn decode(self) -> Result<DecodedAuthBundle, MetadataError> {
        let homeserver = non_empty(&self.homeserver).map(str::to_string);
        if let Some(name) = &homeserver {
            if !is_valid_server_name(name) {
                return Err(MetadataError::InvalidServerName);
            }
        }

        let auth_token = decode_field("auth_token", &self.auth_token)?;
        let ciphertext = decode_field("ciphertext", &self.ciphertext)?;

        Ok(DecodedAuthBundle {
            homeserver,
            homeserver_url: self.homeserver_url,
            auth_token,
            ciphertext,
        })
    }
}

impl DecodedAuthBundle {
    /// Token in the form callers present it (`X-Derived-Key <token>`).
    pub fn encoded_auth_token(&self) -> String {
        encoding::encode(&self.auth_token)
    }

    pub fn public_view(&self) -> AuthBundleView {
        AuthBundleView {
            ciphertext: encoding::encode(&self.ciphertext),
            homeserver_url: self.homeserver_url.clone(),
        }
    }
}

impl HomeserverTarget for DecodedAuthBundle {
    fn homeserver_url(&self) -> Option<&str> {
        non_empty(&self.homeserver_url)
    }

    fn homeserver_domain(&self) -> Option<&str> {
        self.homeserver.as_deref()
    }
}

use serde::{Deserialize, Serialize};

use crate::metadata::{
    AuthBundle, DecodedAuthBundle, DecodedMediaReference, HomeserverTarget, MediaReference,
    MetadataError,
};

// -- Create --

/// Body of `POST /create`. A body carrying `ciphertext` and `auth_token` is
/// an auth bundle; anything else must be a media reference.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum CreateShortcutRequest {
    AuthBundle(AuthBundle),
    MediaReference(MediaReference),
}

/// A create request that passed validation.
#[derive(Debug)]
pub enum DecodedShortcut {
    AuthBundle(DecodedAuthBundle),
    MediaReference(DecodedMediaReference),
}

impl CreateShortcutRequest {
    /// Validate the request. A media reference must carry a key (or its
    /// hash), since that is what later authorizes fetching it.
    pub fn decode(self) -> Result<DecodedShortcut, MetadataError> {
        Ok(match self {
            Self::AuthBundle(bundle) => DecodedShortcut::AuthBundle(bundle.decode()?),
            Self::MediaReference(reference) => {
                let decoded = reference.decode()?;
                if decoded.key_sha256_bytes.is_empty() {
                    return Err(MetadataError::MissingKey);
                }
                DecodedShortcut::MediaReference(decoded)
            }
        })
    }
}

impl DecodedShortcut {
    pub fn set_homeserver_url(&mut self, url: String) {
        match self {
            Self::AuthBundle(bundle) => bundle.homeserver_url = url,
            Self::MediaReference(reference) => reference.set_homeserver_url(url),
        }
    }

    pub fn into_auth_bundle(self) -> Result<DecodedAuthBundle, MetadataError> {
        match self {
            Self::AuthBundle(bundle) => Ok(bundle),
            Self::MediaReference(reference) => reference.into_auth_bundle(),
        }
    }
}

impl HomeserverTarget for DecodedShortcut {
    fn homeserver_url(&self) -> Option<&str> {
        match self {
            Self::AuthBundle(bundle) => bundle.homeserver_url(),
            Self::MediaReference(reference) => reference.homeserver_url(),
        }
    }

    fn homeserver_domain(&self) -> Option<&str> {
        match self {
            Self::AuthBundle(bundle) => bundle.homeserver_domain(),
            Self::MediaReference(reference) => reference.homeserver_domain(),
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct CreateShortcutResponse {
    pub file_id: String,
}

// -- Errors --

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub message: String,
}

// -- Well-known discovery --

/// `/.well-known/matrix/client` response; only the homeserver is read.
#[derive(Debug, Default, Deserialize)]
pub struct WellKnownResponse {
    #[serde(rename = "m.homeserver", default)]
    pub homeserver: WellKnownHomeserver,
}

#[derive(Debug, Default, Deserialize)]
pub struct WellKnownHomeserver {
    #[serde(default)]
    pub base_url: String,
}

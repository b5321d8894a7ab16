//! Mediaviewer Crypto Library
//!
//! Server-side helpers only. The server never sees decrypted media: it
//! derives an integrity signature from the one-time key a client sends with
//! a media reference, keeps the key's hash, and forgets the key.

pub mod encoding;
pub mod signature;

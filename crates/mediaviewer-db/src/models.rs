//! Row shapes stored by the shortcut store.
//! Distinct from the mediaviewer-types wire models to keep the DB layer independent.

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShortcutRow {
    pub shortcut: String,
    pub homeserver: String,
    pub auth_token: Vec<u8>,
    pub ciphertext: Vec<u8>,
}

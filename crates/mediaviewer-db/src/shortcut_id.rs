//! Snowflake-ish shortcut identifiers.
//!
//! Layout of the 64-bit value, most significant first:
//!
//! | bits | field                     |
//! |------|---------------------------|
//! | 40   | Unix timestamp (seconds)  |
//! | 10   | node id                   |
//! | 14   | counter                   |
//!
//! rendered as unpadded URL-safe base64 (11 characters). Within one node and
//! one second, ids are unique for 16384 calls; after that the counter wraps.

use std::sync::atomic::{AtomicU32, Ordering};

use thiserror::Error;
use tracing::info;

use mediaviewer_crypto::encoding;

pub const TIMESTAMP_BITS: u32 = 40;
pub const COUNTER_BITS: u32 = 14;
pub const NODE_ID_BITS: u32 = 64 - TIMESTAMP_BITS - COUNTER_BITS;

pub const MAX_NODE_ID: u16 = (1 << NODE_ID_BITS) - 1;
pub const SHORTCUT_LEN: usize = 11;

const COUNTER_MASK: u32 = (1 << COUNTER_BITS) - 1;
const TIMESTAMP_MASK: u64 = (1 << TIMESTAMP_BITS) - 1;

#[derive(Debug, Error, PartialEq, Eq)]
#[error("too large node ID {0} (maximum is {max})", max = MAX_NODE_ID)]
pub struct NodeIdError(pub u64);

/// Range-check a configured node id.
pub fn validate_node_id(node_id: u64) -> Result<u16, NodeIdError> {
    u16::try_from(node_id)
        .ok()
        .filter(|id| *id <= MAX_NODE_ID)
        .ok_or(NodeIdError(node_id))
}

/// Mints shortcut ids. One instance per process, shared by reference.
#[derive(Debug)]
pub struct ShortcutMinter {
    node_id: u16,
    counter: AtomicU32,
}

impl ShortcutMinter {
    pub fn new(node_id: u64) -> Result<Self, NodeIdError> {
        Self::with_counter(node_id, 0)
    }

    /// Minter with a node id drawn at random.
    pub fn random() -> Self {
        let node_id = rand::random::<u16>() & MAX_NODE_ID;
        info!("No node ID configured, generated {}", node_id);
        Self {
            node_id,
            counter: AtomicU32::new(0),
        }
    }

    /// Minter whose counter starts at `counter`; the next id uses `counter + 1`.
    pub fn with_counter(node_id: u64, counter: u32) -> Result<Self, NodeIdError> {
        Ok(Self {
            node_id: validate_node_id(node_id)?,
            counter: AtomicU32::new(counter),
        })
    }

    pub fn node_id(&self) -> u16 {
        self.node_id
    }

    pub fn mint(&self) -> String {
        self.mint_at(chrono::Utc::now().timestamp())
    }

    pub fn mint_at(&self, unix_secs: i64) -> String {
        let counter = self.counter.fetch_add(1, Ordering::Relaxed).wrapping_add(1) & COUNTER_MASK;
        let value = ((unix_secs as u64) & TIMESTAMP_MASK) << (NODE_ID_BITS + COUNTER_BITS)
            | (self.node_id as u64) << COUNTER_BITS
            | counter as u64;
        encoding::encode_url(&value.to_be_bytes())
    }
}

/// Whether `s` has the shape of a minted id.
pub fn is_valid_shortcut(s: &str) -> bool {
    s.len() == SHORTCUT_LEN
        && s.bytes()
            .all(|b| b.is_ascii_alphanumeric() || b == b'-' || b == b'_')
}

//! # Storage Layout
//!
//! Fixed slot schema of every wallet account. Proxies, singletons and
//! libraries executed by delegate call all read the same slots, so these
//! numbers must never move between implementation versions.
//!
//! | Slot | Field |
//! |------|-------|
//! | 0 | implementation pointer |
//! | 1 | owner links `mapping(address => address)` |
//! | 2 | owner count |
//! | 3 | threshold |
//! | 4 | executed operation hashes `mapping(bytes32 => bool)` |
//! | 5 | used nonces `mapping(uint256 => bool)` |
//! | 6 | approved message hashes `mapping(bytes32 => uint256)` |
//! | `keccak256("fallback_manager.handler.address")` | fallback handler |

use crate::domain::services::keccak256_concat;
use crate::domain::value_objects::{u256_to_word, Address, Hash, StorageKey, U256};

/// Implementation pointer (singleton) slot.
pub const SINGLETON_SLOT: StorageKey = StorageKey::slot(0);
/// Base slot of the owner link mapping.
pub const OWNERS_SLOT: StorageKey = StorageKey::slot(1);
/// Owner count slot.
pub const OWNER_COUNT_SLOT: StorageKey = StorageKey::slot(2);
/// Threshold slot.
pub const THRESHOLD_SLOT: StorageKey = StorageKey::slot(3);
/// Base slot of the executed operation hash mapping.
pub const EXECUTED_TX_SLOT: StorageKey = StorageKey::slot(4);
/// Base slot of the used nonce mapping.
pub const NONCES_SLOT: StorageKey = StorageKey::slot(5);
/// Base slot of the approved message mapping.
pub const SIGNED_MESSAGES_SLOT: StorageKey = StorageKey::slot(6);

/// `keccak256("fallback_manager.handler.address")`
pub const FALLBACK_HANDLER_SLOT: StorageKey = StorageKey([
    0x6c, 0x9a, 0x6c, 0x4a, 0x39, 0x28, 0x4e, 0x37, 0xed, 0x1c, 0xf5, 0x3d, 0x33, 0x75, 0x77, 0xd1,
    0x42, 0x12, 0xa4, 0x87, 0x0f, 0xb9, 0x76, 0xa4, 0x36, 0x6c, 0x69, 0x3b, 0x93, 0x99, 0x18, 0xd5,
]);

/// Slots that hold scalar fields. Mapping entries live at hashed keys.
pub const FIXED_SLOTS: [StorageKey; 7] = [
    SINGLETON_SLOT,
    OWNERS_SLOT,
    OWNER_COUNT_SLOT,
    THRESHOLD_SLOT,
    EXECUTED_TX_SLOT,
    NONCES_SLOT,
    SIGNED_MESSAGES_SLOT,
];

/// Slot of `mapping[key]` for a mapping rooted at `base`.
#[must_use]
pub fn mapping_slot(key: &[u8; 32], base: StorageKey) -> StorageKey {
    StorageKey(keccak256_concat(&[key, base.as_bytes()]).0)
}

/// Slot of `owners[owner]`.
#[must_use]
pub fn owner_slot(owner: Address) -> StorageKey {
    mapping_slot(&owner.to_word(), OWNERS_SLOT)
}

/// Slot of `txNonces[nonce]`.
#[must_use]
pub fn nonce_slot(nonce: U256) -> StorageKey {
    mapping_slot(&u256_to_word(nonce), NONCES_SLOT)
}

/// Slot of `txExists[hash]`.
#[must_use]
pub fn executed_tx_slot(tx_hash: Hash) -> StorageKey {
    mapping_slot(&tx_hash.0, EXECUTED_TX_SLOT)
}

/// Slot of `signedMessages[hash]`.
#[must_use]
pub fn signed_message_slot(message_hash: Hash) -> StorageKey {
    mapping_slot(&message_hash.0, SIGNED_MESSAGES_SLOT)
}

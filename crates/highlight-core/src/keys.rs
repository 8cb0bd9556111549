//! The persisted keyspace.
//!
//! All values are JSON encoded by the storage adapter.
//!
//! | key                     | value                          |
//! |-------------------------|--------------------------------|
//! | `units:id`              | id of the latest committed unit |
//! | `unit:{id}`             | the [`Unit`](crate::Unit)       |
//! | `unit_events:{id}`      | the unit's events, in order     |
//! | `salts:{salt}`          | `true` once the salt is consumed |
//!
//! `{salt}` is the signed salt word as lowercase `0x` hex, never the raw
//! text a client sent.
//! | `state:{agent}:{key}`   | agent world state               |

/// Key holding the most-committed-index.
pub const MCI_KEY: &str = "units:id";

/// Key of a committed unit.
pub fn unit_key(id: u64) -> String {
    format!("unit:{id}")
}

/// Key of a committed unit's events.
pub fn unit_events_key(id: u64) -> String {
    format!("unit_events:{id}")
}

/// Key marking a salt as consumed.
pub fn salt_key(salt: &str) -> String {
    format!("salts:{salt}")
}

/// Namespaced key of an agent's world state.
pub fn state_key(agent: &str, key: &str) -> String {
    format!("state:{agent}:{key}")
}

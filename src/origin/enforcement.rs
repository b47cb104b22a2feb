//! L2 enforcement state machine
//!
//! ```text
//!              enforce                    enforce
//!  NoIntent ───────────► Intent(1) ───────────────► Intent(n+1)
//!     ▲                      │  consume               │ consume
//!     └──────────────────────┘◄───────── Intent(n-1) ◄┘
//! ```
//!
//! An object with pending intents is forced into L2 on its next fetch,
//! regardless of what the client asked for.

use parking_lot::Mutex;
use std::collections::HashMap;

/// `object id → pending forced-L2 placements`, under one lock
#[derive(Debug, Default)]
pub struct L2EnforcementMap {
    pending: Mutex<HashMap<String, u64>>,
}

impl L2EnforcementMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register one more intent; returns the new pending count
    pub fn enforce(&self, object_id: &str) -> u64 {
        let mut pending = self.pending.lock();
        let count = pending.entry(object_id.to_string()).or_insert(0);
        *count += 1;
        *count
    }

    /// Consume one intent if present
    ///
    /// Returns `true` when the object must be stored in L2. The entry is
    /// removed once its count reaches zero.
    pub fn consume(&self, object_id: &str) -> bool {
        let mut pending = self.pending.lock();
        match pending.get_mut(object_id) {
            Some(count) => {
                *count -= 1;
                if *count == 0 {
                    pending.remove(object_id);
                }
                true
            }
            None => false,
        }
    }

    /// Pending intents for an object; 0 means `NoIntent`
    pub fn pending(&self, object_id: &str) -> u64 {
        self.pending.lock().get(object_id).copied().unwrap_or(0)
    }

    /// Objects with at least one pending intent
    pub fn len(&self) -> usize {
        self.pending.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

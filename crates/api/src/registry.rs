// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright (c) 2024 Zaparoo Project contributors

//! Bookkeeping for connected WebSocket peers, backing the `clients` method.
//! Carries no protocol meaning of its own — notifications still fan out
//! through [`zt_state::State`]'s bus, which every connection subscribes to
//! independently.

use std::collections::HashMap;

use parking_lot::RwLock;
use uuid::Uuid;

#[derive(Default)]
pub struct ClientRegistry {
    peers: RwLock<HashMap<Uuid, String>>,
}

impl ClientRegistry {
    pub fn add(&self, id: Uuid, address: String) {
        self.peers.write().insert(id, address);
    }

    pub fn remove(&self, id: Uuid) {
        self.peers.write().remove(&id);
    }

    pub fn snapshot(&self) -> Vec<(Uuid, String)> {
        self.peers
            .read()
            .iter()
            .map(|(id, addr)| (*id, addr.clone()))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tracks_added_and_removed_peers() {
        let registry = ClientRegistry::default();
        let id = Uuid::new_v4();
        registry.add(id, "127.0.0.1:1234".to_string());
        assert_eq!(registry.snapshot().len(), 1);
        registry.remove(id);
        assert!(registry.snapshot().is_empty());
    }
}

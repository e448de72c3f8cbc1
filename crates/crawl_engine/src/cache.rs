use std::collections::{BTreeMap, HashMap};
use std::sync::{Mutex, PoisonError};

use sha2::{Digest, Sha256};

use crate::http::{Request, Response};

/// Canonical identity of a request: method, url, body, and the sorted header
/// and cookie maps, hashed with SHA-256.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RequestKey([u8; 32]);

impl RequestKey {
    pub fn of(request: &Request) -> Self {
        let mut hasher = Sha256::new();
        update_field(&mut hasher, request.method.as_str().as_bytes());
        update_field(&mut hasher, request.url.as_bytes());
        update_field(&mut hasher, request.body.as_deref().unwrap_or_default());
        update_map(&mut hasher, &request.headers);
        update_map(&mut hasher, &request.cookies);
        Self(hasher.finalize().into())
    }
}

// Length prefixes keep ("ab", "c") and ("a", "bc") apart.
fn update_field(hasher: &mut Sha256, bytes: &[u8]) {
    hasher.update((bytes.len() as u64).to_le_bytes());
    hasher.update(bytes);
}

fn update_map(hasher: &mut Sha256, map: &BTreeMap<String, String>) {
    hasher.update((map.len() as u64).to_le_bytes());
    for (name, value) in map {
        update_field(hasher, name.as_bytes());
        update_field(hasher, value.as_bytes());
    }
}

/// Responses remembered by one client for the lifetime of that client.
#[derive(Debug, Default)]
pub struct RequestCache {
    entries: Mutex<HashMap<RequestKey, Response>>,
}

impl RequestCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &RequestKey) -> Option<Response> {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(key)
            .cloned()
    }

    pub fn insert(&self, key: RequestKey, response: Response) {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(key, response);
    }

    pub fn len(&self) -> usize {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

//! Per-target hit cooldowns.

use std::collections::HashMap;

use crate::physics::BodyId;

/// Set of recently hit bodies, each with its own expiry time.
#[derive(Debug, Default, Clone)]
pub struct HitDeduplicationSet {
    expiries: HashMap<BodyId, f64>,
}

impl HitDeduplicationSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a hit on `body` that blocks further hits until `expires_at`.
    pub fn insert(&mut self, body: BodyId, expires_at: f64) {
        self.expiries.insert(body, expires_at);
    }

    pub fn contains(&self, body: BodyId) -> bool {
        self.expiries.contains_key(&body)
    }

    /// Drop every entry whose expiry is at or before `now`. Returns how many were dropped.
    pub fn expire(&mut self, now: f64) -> usize {
        let before = self.expiries.len();
        self.expiries.retain(|_, expires_at| *expires_at > now);
        before - self.expiries.len()
    }

    pub fn remove(&mut self, body: BodyId) -> bool {
        self.expiries.remove(&body).is_some()
    }

    pub fn clear(&mut self) {
        self.expiries.clear();
    }

    pub fn len(&self) -> usize {
        self.expiries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.expiries.is_empty()
    }
}

use dashmap::DashMap;

/// Seen-event cache for the Events API: Slack retries deliveries, so the
/// same `event_id` can arrive more than once within the retry window.
pub struct EventDedup {
    seen: DashMap<String, i64>,
    ttl_seconds: i64,
}

impl EventDedup {
    pub fn new(ttl_seconds: i64) -> Self {
        Self {
            seen: DashMap::new(),
            ttl_seconds,
        }
    }

    /// Record the event and report whether it was already seen recently.
    /// Empty ids are never treated as duplicates.
    pub fn is_duplicate(&self, event_id: &str) -> bool {
        self.is_duplicate_at(event_id, nudge_common::now_epoch())
    }

    fn is_duplicate_at(&self, event_id: &str, now: i64) -> bool {
        if event_id.is_empty() {
            return false;
        }

        let duplicate = self
            .seen
            .get(event_id)
            .map(|last_seen| now - *last_seen < self.ttl_seconds)
            .unwrap_or(false);

        if !duplicate {
            self.seen.insert(event_id.to_string(), now);
        }

        self.seen.retain(|_, last_seen| now - *last_seen <= self.ttl_seconds);
        duplicate
    }
}

impl Default for EventDedup {
    fn default() -> Self {
        Self::new(300)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn repeat_within_ttl_is_duplicate() {
        let dedup = EventDedup::new(300);
        assert!(!dedup.is_duplicate_at("Ev123", 1000));
        assert!(dedup.is_duplicate_at("Ev123", 1100));
    }

    #[test]
    fn repeat_after_ttl_is_fresh() {
        let dedup = EventDedup::new(300);
        assert!(!dedup.is_duplicate_at("Ev123", 1000));
        assert!(!dedup.is_duplicate_at("Ev123", 1400));
    }

    #[test]
    fn empty_id_is_never_duplicate() {
        let dedup = EventDedup::new(300);
        assert!(!dedup.is_duplicate_at("", 1000));
        assert!(!dedup.is_duplicate_at("", 1000));
    }

    #[test]
    fn stale_entries_are_pruned() {
        let dedup = EventDedup::new(300);
        dedup.is_duplicate_at("old", 1000);
        dedup.is_duplicate_at("new", 2000);
        assert!(!dedup.seen.contains_key("old"));
        assert!(dedup.seen.contains_key("new"));
    }
}

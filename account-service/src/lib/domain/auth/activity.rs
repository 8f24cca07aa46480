use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;
use std::time::Instant;

use crate::domain::account::models::UserId;
use crate::domain::session::models::SessionId;

/// Suppresses redundant last-activity writes.
///
/// Remembers when each session was last written and lets a new write through
/// only once `window` has elapsed. Entries older than the window are pruned
/// whenever the map grows past `PRUNE_THRESHOLD`. Shared between the services
/// that revoke sessions, so one instance sees every revocation.
pub struct ActivityDebouncer {
    window: Duration,
    last_touch: Mutex<HashMap<SessionId, (UserId, Instant)>>,
}

impl ActivityDebouncer {
    const PRUNE_THRESHOLD: usize = 10_000;

    pub fn new(window: Duration) -> Self {
        Self {
            window,
            last_touch: Mutex::new(HashMap::new()),
        }
    }

    /// Whether the caller should write activity for `id` now.
    ///
    /// A `true` answer is recorded as a write at `now`.
    pub fn should_touch(&self, id: &SessionId, owner: UserId, now: Instant) -> bool {
        if self.window.is_zero() {
            return true;
        }

        // A poisoned map only costs us an extra write
        let Ok(mut last_touch) = self.last_touch.lock() else {
            return true;
        };

        if let Some((_, previous)) = last_touch.get(id) {
            if now.saturating_duration_since(*previous) < self.window {
                return false;
            }
        }

        if last_touch.len() >= Self::PRUNE_THRESHOLD {
            let window = self.window;
            last_touch.retain(|_, (_, at)| now.saturating_duration_since(*at) < window);
        }

        last_touch.insert(id.clone(), (owner, now));
        true
    }

    /// Drop the entry for a revoked session.
    pub fn forget(&self, id: &SessionId) {
        if let Ok(mut last_touch) = self.last_touch.lock() {
            last_touch.remove(id);
        }
    }

    /// Drop every entry owned by `user_id`, after a bulk revocation.
    pub fn forget_user(&self, user_id: UserId) {
        if let Ok(mut last_touch) = self.last_touch.lock() {
            last_touch.retain(|_, (owner, _)| *owner != user_id);
        }
    }

    #[cfg(test)]
    fn len(&self) -> usize {
        self.last_touch.lock().map(|m| m.len()).unwrap_or(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_second_touch_within_window_is_suppressed() {
        let debouncer = ActivityDebouncer::new(Duration::from_secs(5));
        let id = SessionId::from_string("session-a");
        let start = Instant::now();

        assert!(debouncer.should_touch(&id, UserId(1), start));
        assert!(!debouncer.should_touch(&id, UserId(1), start + Duration::from_secs(1)));
        assert!(debouncer.should_touch(&id, UserId(1), start + Duration::from_secs(6)));
    }

    #[test]
    fn test_sessions_are_independent() {
        let debouncer = ActivityDebouncer::new(Duration::from_secs(5));
        let now = Instant::now();

        assert!(debouncer.should_touch(&SessionId::from_string("a"), UserId(1), now));
        assert!(debouncer.should_touch(&SessionId::from_string("b"), UserId(1), now));
    }

    #[test]
    fn test_zero_window_always_touches() {
        let debouncer = ActivityDebouncer::new(Duration::ZERO);
        let id = SessionId::from_string("a");
        let now = Instant::now();

        assert!(debouncer.should_touch(&id, UserId(1), now));
        assert!(debouncer.should_touch(&id, UserId(1), now));
        assert_eq!(debouncer.len(), 0);
    }

    #[test]
    fn test_forget_allows_immediate_touch() {
        let debouncer = ActivityDebouncer::new(Duration::from_secs(5));
        let id = SessionId::from_string("a");
        let now = Instant::now();

        assert!(debouncer.should_touch(&id, UserId(1), now));
        debouncer.forget(&id);
        assert!(debouncer.should_touch(&id, UserId(1), now));
    }

    #[test]
    fn test_forget_user_drops_only_that_users_sessions() {
        let debouncer = ActivityDebouncer::new(Duration::from_secs(5));
        let now = Instant::now();
        let first = SessionId::from_string("alice-laptop");
        let second = SessionId::from_string("alice-phone");
        let other = SessionId::from_string("bob-laptop");

        assert!(debouncer.should_touch(&first, UserId(1), now));
        assert!(debouncer.should_touch(&second, UserId(1), now));
        assert!(debouncer.should_touch(&other, UserId(2), now));

        debouncer.forget_user(UserId(1));

        assert_eq!(debouncer.len(), 1);
        assert!(debouncer.should_touch(&first, UserId(1), now));
        assert!(!debouncer.should_touch(&other, UserId(2), now));
    }

    #[test]
    fn test_stale_entries_are_pruned() {
        let debouncer = ActivityDebouncer::new(Duration::from_secs(1));
        let start = Instant::now();

        for i in 0..ActivityDebouncer::PRUNE_THRESHOLD {
            debouncer.should_touch(&SessionId::from_string(i.to_string()), UserId(1), start);
        }
        assert_eq!(debouncer.len(), ActivityDebouncer::PRUNE_THRESHOLD);

        debouncer.should_touch(
            &SessionId::from_string("fresh"),
            UserId(1),
            start + Duration::from_secs(2),
        );
        assert_eq!(debouncer.len(), 1);
    }
}

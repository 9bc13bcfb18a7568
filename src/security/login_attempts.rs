use std::collections::HashMap;
use std::sync::Mutex;
use std::time::{Duration, Instant};

#[derive(Debug, Clone, Copy)]
struct AttemptState {
    failures: u32,
    last_failure: Instant,
    locked_until: Option<Instant>,
}

/// Penghitung gagal login per kunci (NIS / alamat klien). Setelah
/// `max_attempts` kegagalan kunci dikunci selama `lockout`. Kegagalan yang
/// lebih lama dari `lockout` tidak dihitung lagi.
pub struct LoginAttemptTracker {
    max_attempts: u32,
    lockout: Duration,
    state: Mutex<HashMap<String, AttemptState>>,
}

impl LoginAttemptTracker {
    pub fn new(max_attempts: u32, lockout: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            lockout,
            state: Mutex::new(HashMap::new()),
        }
    }

    /// Sisa waktu kunci, `None` jika boleh mencoba.
    pub fn locked_for(&self, key: &str) -> Option<Duration> {
        self.locked_for_at(key, Instant::now())
    }

    pub fn locked_for_at(&self, key: &str, now: Instant) -> Option<Duration> {
        let mut state = self.state.lock().unwrap_or_else(|e| e.into_inner());
        let entry = state.get(key).copied()?;
        match entry.locked_until {
            Some(until) if until > now => Some(until - now),
            Some(_) => {
                // masa kunci habis, mulai dari nol
                state.remove(key);
                None
            }
            None => None,
        }
    }

    /// Mencatat kegagalan; mengembalikan `true` bila kunci kini terkunci.
    pub fn record_failure(&self, key: &str) -> bool {
        self.record_failure_at(key, Instant::now())
    }

    pub fn record_failure_at(&self, key: &str, now: Instant) -> bool {
        let mut state = self.state.lock().unwrap_or_else(|e| e.into_inner());
        let entry = state.entry(key.to_string()).or_insert(AttemptState {
            failures: 0,
            last_failure: now,
            locked_until: None,
        });
        if now.duration_since(entry.last_failure) >= self.lockout {
            entry.failures = 0;
        }
        entry.failures += 1;
        entry.last_failure = now;
        if entry.failures >= self.max_attempts {
            entry.locked_until = Some(now + self.lockout);
            log::warn!("Login locked for key {key} after {} failures", entry.failures);
            return true;
        }
        false
    }

    pub fn reset(&self, key: &str) {
        let mut state = self.state.lock().unwrap_or_else(|e| e.into_inner());
        state.remove(key);
    }

    /// Membuang kunci yang masa kuncinya habis atau kegagalannya sudah basi.
    pub fn prune(&self) {
        self.prune_at(Instant::now());
    }

    pub fn prune_at(&self, now: Instant) {
        let mut state = self.state.lock().unwrap_or_else(|e| e.into_inner());
        state.retain(|_, s| match s.locked_until {
            Some(until) => until > now,
            None => now.duration_since(s.last_failure) < self.lockout,
        });
    }

    #[cfg(test)]
    fn tracked_keys(&self) -> usize {
        self.state.lock().unwrap_or_else(|e| e.into_inner()).len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lockout_after_max_attempts() {
        let tracker = LoginAttemptTracker::new(3, Duration::from_secs(60));
        let now = Instant::now();
        assert!(!tracker.record_failure_at("1001", now));
        assert!(!tracker.record_failure_at("1001", now));
        assert!(tracker.locked_for_at("1001", now).is_none());
        assert!(tracker.record_failure_at("1001", now));
        assert!(tracker.locked_for_at("1001", now).is_some());
        assert!(tracker.locked_for_at("2002", now).is_none());
    }

    #[test]
    fn test_lock_expires_and_reset() {
        let tracker = LoginAttemptTracker::new(1, Duration::from_secs(60));
        let now = Instant::now();
        tracker.record_failure_at("1001", now);
        assert!(tracker.locked_for_at("1001", now + Duration::from_secs(61)).is_none());
        assert_eq!(tracker.tracked_keys(), 0);

        tracker.record_failure_at("1001", now);
        tracker.reset("1001");
        assert!(tracker.locked_for_at("1001", now).is_none());
    }

    #[test]
    fn test_prune_drops_stale_and_expired_keys() {
        let tracker = LoginAttemptTracker::new(3, Duration::from_secs(60));
        let now = Instant::now();
        tracker.record_failure_at("sekali", now);
        for _ in 0..3 {
            tracker.record_failure_at("terkunci", now);
        }
        tracker.record_failure_at("baru", now + Duration::from_secs(50));

        tracker.prune_at(now + Duration::from_secs(30));
        assert_eq!(tracker.tracked_keys(), 3);

        tracker.prune_at(now + Duration::from_secs(61));
        assert_eq!(tracker.tracked_keys(), 1);
        assert!(tracker.locked_for_at("terkunci", now + Duration::from_secs(61)).is_none());
    }

    #[test]
    fn test_old_failures_do_not_count() {
        let tracker = LoginAttemptTracker::new(2, Duration::from_secs(60));
        let now = Instant::now();
        tracker.record_failure_at("ip", now);
        assert!(!tracker.record_failure_at("ip", now + Duration::from_secs(120)));
    }
}

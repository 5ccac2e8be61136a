use chrono::{DateTime, Duration, Utc};
use log::debug;
use serenity::model::id::UserId;
use std::collections::HashMap;
use std::sync::{Mutex, PoisonError};

/// Fixed cooldown gate per user. Only the last accepted time is kept, a
/// rejected attempt doesn't push the window out.
#[derive(Debug)]
pub struct RateLimiter {
    cooldown: Duration,
    last_accepted: Mutex<HashMap<UserId, DateTime<Utc>>>,
}

impl RateLimiter {
    pub fn new(cooldown: Duration) -> RateLimiter {
        RateLimiter {
            cooldown,
            last_accepted: Mutex::new(HashMap::new()),
        }
    }

    /// Returns false and records `now` if `user` may act, true if they acted
    /// within the cooldown.
    pub fn is_limited(&self, user: UserId, now: DateTime<Utc>) -> bool {
        let mut last_accepted = self
            .last_accepted
            .lock()
            .unwrap_or_else(PoisonError::into_inner);

        match last_accepted.get(&user) {
            Some(last) if now.signed_duration_since(*last) <= self.cooldown => {
                debug!(
                    "rate limited {user}, last accepted {}ms ago",
                    now.signed_duration_since(*last).num_milliseconds()
                );
                true
            }
            _ => {
                last_accepted.insert(user, now);
                false
            }
        }
    }

    /// Forgets users whose cooldown is over, they'd be accepted anyway.
    pub fn prune(&self, now: DateTime<Utc>) -> usize {
        let cooldown = self.cooldown;
        let mut last_accepted = self
            .last_accepted
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        let before = last_accepted.len();
        last_accepted.retain(|_, last| now.signed_duration_since(*last) <= cooldown);
        before - last_accepted.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(ms: i64) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2023, 1, 1, 0, 0, 0).unwrap() + Duration::milliseconds(ms)
    }

    #[test]
    fn test_second_call_in_window_limited() {
        let limiter = RateLimiter::new(Duration::milliseconds(1000));
        assert!(!limiter.is_limited(UserId(1), at(0)));
        assert!(limiter.is_limited(UserId(1), at(500)));
        assert!(!limiter.is_limited(UserId(1), at(1001)));
    }

    #[test]
    fn test_rejection_does_not_extend_window() {
        let limiter = RateLimiter::new(Duration::milliseconds(1000));
        assert!(!limiter.is_limited(UserId(1), at(0)));
        assert!(limiter.is_limited(UserId(1), at(999)));
        // measured from the accepted call at 0, not the rejected one at 999
        assert!(!limiter.is_limited(UserId(1), at(1500)));
    }

    #[test]
    fn test_prune_only_expired() {
        let limiter = RateLimiter::new(Duration::milliseconds(1000));
        assert!(!limiter.is_limited(UserId(1), at(0)));
        assert!(!limiter.is_limited(UserId(2), at(800)));

        assert_eq!(limiter.prune(at(1500)), 1);
        // user 2 is still cooling down
        assert!(limiter.is_limited(UserId(2), at(1500)));
        assert!(!limiter.is_limited(UserId(1), at(1500)));
        assert_eq!(limiter.prune(at(1500)), 0);
    }

    #[test]
    fn test_users_are_independent() {
        let limiter = RateLimiter::new(Duration::milliseconds(1000));
        assert!(!limiter.is_limited(UserId(1), at(0)));
        assert!(!limiter.is_limited(UserId(2), at(10)));
        assert!(limiter.is_limited(UserId(1), at(20)));
    }
}

//! Wire-facing age/TTL rendering. `spec.md` §4.2's message view reports an
//! `age` in whole seconds rather than the creation timestamp itself.

use chrono::{DateTime, Utc};

/// Whole seconds elapsed since `created_at`, saturating at zero so clock
/// skew between a driver's `now()` and the wall clock never produces a
/// negative age.
#[must_use]
pub fn age_seconds(created_at: DateTime<Utc>, now: DateTime<Utc>) -> i64 {
    (now - created_at).num_seconds().max(0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn age_saturates_at_zero_for_future_timestamps() {
        let now = Utc::now();
        let created_at = now + chrono::Duration::seconds(5);
        assert_eq!(age_seconds(created_at, now), 0);
    }
}

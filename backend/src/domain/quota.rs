//! Daily query-quota ledger for AI-assisted decision creation.
//!
//! Pure functions over [`Subscription`] so the calendar date is always an
//! input: the store adapter applies them under its write lock, and tests
//! drive date rollover without touching a clock.

use chrono::NaiveDate;

use super::user::Subscription;

/// Result of an atomic check-and-consume.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QuotaOutcome {
    /// A unit of quota was consumed (or the account is premium).
    Allowed,
    /// The daily allowance is spent; nothing was consumed.
    Exhausted,
}

/// Reset the used counter when the calendar date has rolled over.
pub fn roll_over(subscription: &mut Subscription, today: NaiveDate) {
    if subscription.last_query_date != Some(today) {
        subscription.queries_used_today = 0;
    }
}

/// Whether one more query fits in today's allowance. Premium always passes.
pub fn can_consume(subscription: &Subscription, today: NaiveDate) -> bool {
    if subscription.is_premium {
        return true;
    }
    let used = if subscription.last_query_date == Some(today) {
        subscription.queries_used_today
    } else {
        0
    };
    used < subscription.daily_queries
}

/// Atomically check and consume one unit of today's allowance.
///
/// Premium accounts are untouched. For free accounts the counter is reset on
/// date rollover, checked against the allowance, and incremented only when
/// the check passes.
pub fn check_and_consume(subscription: &mut Subscription, today: NaiveDate) -> QuotaOutcome {
    if subscription.is_premium {
        return QuotaOutcome::Allowed;
    }
    roll_over(subscription, today);
    if subscription.queries_used_today >= subscription.daily_queries {
        return QuotaOutcome::Exhausted;
    }
    subscription.queries_used_today += 1;
    subscription.last_query_date = Some(today);
    QuotaOutcome::Allowed
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn day(n: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 6, n).expect("valid date")
    }

    #[test]
    fn premium_is_never_counted() {
        let mut sub = Subscription {
            is_premium: true,
            ..Subscription::default()
        };
        for _ in 0..10 {
            assert_eq!(check_and_consume(&mut sub, day(1)), QuotaOutcome::Allowed);
        }
        assert_eq!(sub.queries_used_today, 0);
        assert_eq!(sub.last_query_date, None);
    }

    #[test]
    fn free_accounts_exhaust_after_the_daily_allowance() {
        let mut sub = Subscription::free(3);
        for _ in 0..3 {
            assert_eq!(check_and_consume(&mut sub, day(1)), QuotaOutcome::Allowed);
        }
        assert_eq!(check_and_consume(&mut sub, day(1)), QuotaOutcome::Exhausted);
        // Exhausted attempts must not advance the counter.
        assert_eq!(sub.queries_used_today, 3);
    }

    #[test]
    fn allowance_resets_when_the_date_rolls_over() {
        let mut sub = Subscription::free(3);
        for _ in 0..3 {
            check_and_consume(&mut sub, day(1));
        }
        assert_eq!(check_and_consume(&mut sub, day(1)), QuotaOutcome::Exhausted);
        assert_eq!(check_and_consume(&mut sub, day(2)), QuotaOutcome::Allowed);
        assert_eq!(sub.queries_used_today, 1);
        assert_eq!(sub.last_query_date, Some(day(2)));
    }

    #[rstest]
    #[case(0, true)]
    #[case(2, true)]
    #[case(3, false)]
    fn can_consume_compares_against_the_allowance(#[case] used: u32, #[case] expected: bool) {
        let mut sub = Subscription::free(3);
        sub.queries_used_today = used;
        sub.last_query_date = Some(day(1));
        assert_eq!(can_consume(&sub, day(1)), expected);
    }

    #[test]
    fn can_consume_ignores_stale_usage_from_a_previous_day() {
        let mut sub = Subscription::free(3);
        sub.queries_used_today = 3;
        sub.last_query_date = Some(day(1));
        assert!(can_consume(&sub, day(2)));
    }
}

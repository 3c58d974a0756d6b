//! Streak engine.
//!
//! Derives the current streak from the set of local calendar days that have
//! activity. The walk is a day-by-day simulation from the first active day to
//! `max(today, last active day)`, because the freeze rule depends on what was
//! seen on every preceding day:
//!
//! - an active day extends the streak and the rolling maximum;
//! - an inactive day is bridged by a freeze when the rolling maximum is at
//!   least [`FREEZE_MIN_STREAK`] and no freeze was used in the previous
//!   [`FREEZE_COOLDOWN_DAYS`] days;
//! - otherwise an inactive day resets the streak, except today, which is not
//!   over yet.
//!
//! Everything here is pure; "today" is always an argument so callers (and
//! tests) control the clock.

use std::collections::BTreeSet;

use chrono::{DateTime, Local, NaiveDate, TimeZone};
use serde::{Deserialize, Serialize};

use crate::models::ActivityRecord;

/// Rolling maximum streak required before a gap day can be frozen.
pub const FREEZE_MIN_STREAK: u32 = 14;

/// Days that must pass after a freeze before the next one is available.
pub const FREEZE_COOLDOWN_DAYS: i64 = 30;

/// Derived streak state. Recomputed on demand, never stored.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StreakState {
    pub streak: u32,
    /// Today is bridged by a freeze and has no activity yet
    pub is_frozen: bool,
    pub frozen_dates: BTreeSet<NaiveDate>,
}

/// Reduce activity timestamps (Unix ms) to the set of calendar days they fall
/// on in `tz`. Many entries on one day count once.
pub fn activity_days<Tz: TimeZone>(
    timestamps: impl IntoIterator<Item = i64>,
    tz: &Tz,
) -> BTreeSet<NaiveDate> {
    timestamps
        .into_iter()
        .filter_map(DateTime::from_timestamp_millis)
        .map(|utc| utc.with_timezone(tz).date_naive())
        .collect()
}

/// Compute the streak for `days` as seen on `today`.
///
/// `prior_max_streak` is the persisted high-water mark. It seeds the rolling
/// maximum, so history that has since been deleted still counts toward freeze
/// eligibility.
pub fn compute_streak(
    days: &BTreeSet<NaiveDate>,
    prior_max_streak: u32,
    today: NaiveDate,
) -> StreakState {
    let (Some(&first_day), Some(&last_day)) = (days.first(), days.last()) else {
        return StreakState::default();
    };
    let scan_end = today.max(last_day);

    let mut current_streak = 0u32;
    let mut rolling_max = prior_max_streak;
    let mut last_freeze: Option<NaiveDate> = None;
    let mut frozen_dates = BTreeSet::new();

    for day in first_day.iter_days().take_while(|day| *day <= scan_end) {
        if days.contains(&day) {
            current_streak += 1;
            rolling_max = rolling_max.max(current_streak);
            continue;
        }

        let cooled_down =
            last_freeze.map_or(true, |used| (day - used).num_days() >= FREEZE_COOLDOWN_DAYS);
        if rolling_max >= FREEZE_MIN_STREAK && cooled_down {
            frozen_dates.insert(day);
            last_freeze = Some(day);
        } else if day != today {
            current_streak = 0;
        }
    }

    let is_frozen =
        current_streak > 0 && !days.contains(&today) && frozen_dates.contains(&today);

    StreakState {
        streak: current_streak,
        is_frozen,
        frozen_dates,
    }
}

/// Compute the streak for activity records as seen at `now`, using the
/// calendar of `now`'s time zone.
pub fn compute_streak_at<Tz: TimeZone>(
    records: &[ActivityRecord],
    prior_max_streak: u32,
    now: &DateTime<Tz>,
) -> StreakState {
    let days = activity_days(records.iter().map(|record| record.created_at), &now.timezone());
    compute_streak(&days, prior_max_streak, now.date_naive())
}

/// Compute the streak in the user's local time zone right now.
pub fn compute_streak_now(records: &[ActivityRecord], prior_max_streak: u32) -> StreakState {
    compute_streak_at(records, prior_max_streak, &Local::now())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, FixedOffset};
    use pretty_assertions::assert_eq;

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 6, 15).unwrap()
    }

    fn day(offset: i64) -> NaiveDate {
        today() + Duration::days(offset)
    }

    fn range(from: i64, to: i64) -> BTreeSet<NaiveDate> {
        (from..=to).map(day).collect()
    }

    fn dates(offsets: &[i64]) -> BTreeSet<NaiveDate> {
        offsets.iter().copied().map(day).collect()
    }

    #[test]
    fn test_empty_history_has_no_streak() {
        assert_eq!(
            compute_streak(&BTreeSet::new(), 40, today()),
            StreakState::default()
        );
    }

    #[test]
    fn test_activity_only_today_is_a_one_day_streak() {
        let state = compute_streak(&dates(&[0]), 0, today());
        assert_eq!(state.streak, 1);
        assert!(!state.is_frozen);
        assert!(state.frozen_dates.is_empty());
    }

    #[test]
    fn test_same_input_gives_same_output() {
        let days = dates(&[-40, -25, -12, -11, -3, 0]);
        let first = compute_streak(&days, 15, today());
        for _ in 0..5 {
            assert_eq!(compute_streak(&days, 15, today()), first);
        }
    }

    #[test]
    fn test_consecutive_days_count_up_to_today() {
        let state = compute_streak(&range(-4, 0), 0, today());
        assert_eq!(state.streak, 5);
    }

    #[test]
    fn test_gap_before_earning_a_freeze_breaks_the_streak() {
        let mut days = range(-10, -5);
        days.extend(range(-3, 0));
        let state = compute_streak(&days, 0, today());
        assert_eq!(state.streak, 4);
        assert!(state.frozen_dates.is_empty());
    }

    #[test]
    fn test_single_gap_after_fourteen_days_is_bridged() {
        let mut days = range(-16, -2);
        days.insert(day(0));
        let state = compute_streak(&days, 0, today());

        assert_eq!(state.frozen_dates, dates(&[-1]));
        assert_eq!(state.streak, 16);
        assert!(!state.is_frozen);
    }

    #[test]
    fn test_second_gap_inside_cooldown_breaks_the_streak() {
        let mut days = range(-30, -15);
        days.extend(range(-13, -6));
        days.extend(range(-4, 0));
        let state = compute_streak(&days, 0, today());

        assert_eq!(state.frozen_dates, dates(&[-14]));
        assert_eq!(state.streak, 5);
    }

    #[test]
    fn test_freeze_is_available_again_exactly_thirty_days_later() {
        let mut days = range(-50, -36);
        days.extend(range(-34, -6));
        days.extend(range(-4, 0));
        let state = compute_streak(&days, 0, today());

        assert_eq!(state.frozen_dates, dates(&[-35, -5]));
        assert_eq!(state.streak, 15 + 29 + 5);
    }

    #[test]
    fn test_unfinished_today_does_not_break_the_streak_yet() {
        let days = range(-3, -1);

        let state = compute_streak(&days, 0, today());
        assert_eq!(state.streak, 3);
        assert!(!state.is_frozen);

        let tomorrow = compute_streak(&days, 0, day(1));
        assert_eq!(tomorrow.streak, 0);
    }

    #[test]
    fn test_inactive_today_is_frozen_when_a_freeze_is_available() {
        let state = compute_streak(&range(-15, -1), 0, today());
        assert_eq!(state.streak, 15);
        assert!(state.is_frozen);
        assert_eq!(state.frozen_dates, dates(&[0]));
    }

    #[test]
    fn test_prior_max_streak_seeds_freeze_eligibility() {
        let days = dates(&[-2, 0]);

        let without_history = compute_streak(&days, 0, today());
        assert_eq!(without_history.streak, 1);

        let with_history = compute_streak(&days, 20, today());
        assert_eq!(with_history.streak, 2);
        assert_eq!(with_history.frozen_dates, dates(&[-1]));
    }

    // Sparse history: a freeze bridges one day only, so a multi-day gap still
    // breaks the streak after the first bridged day. The cooldown counts from
    // the bridged day (D-39), which makes D-9 the next freezable gap.
    #[test]
    fn test_sparse_history_freezes_one_day_per_cooldown() {
        let days = dates(&[-40, -25, -10, 0]);

        let state = compute_streak(&days, FREEZE_MIN_STREAK, today());
        assert_eq!(state.frozen_dates, dates(&[-39, -9]));
        assert_eq!(state.streak, 1);
        assert!(!state.is_frozen);

        let fresh = compute_streak(&days, 0, today());
        assert!(fresh.frozen_dates.is_empty());
        assert_eq!(fresh.streak, 1);
    }

    #[test]
    fn test_activity_after_today_extends_the_scan() {
        let state = compute_streak(&range(0, 2), 0, today());
        assert_eq!(state.streak, 3);
    }

    #[test]
    fn test_activity_days_use_the_local_calendar() {
        let utc_late_evening = DateTime::parse_from_rfc3339("2024-03-10T23:30:00Z")
            .unwrap()
            .timestamp_millis();
        let same_day_earlier = DateTime::parse_from_rfc3339("2024-03-10T09:00:00Z")
            .unwrap()
            .timestamp_millis();

        let utc_days = activity_days([utc_late_evening, same_day_earlier], &chrono::Utc);
        assert_eq!(utc_days.len(), 1);

        let plus_two = FixedOffset::east_opt(2 * 3600).unwrap();
        let local_days = activity_days([utc_late_evening, same_day_earlier], &plus_two);
        assert_eq!(
            local_days,
            [
                NaiveDate::from_ymd_opt(2024, 3, 10).unwrap(),
                NaiveDate::from_ymd_opt(2024, 3, 11).unwrap(),
            ]
            .into_iter()
            .collect::<BTreeSet<_>>()
        );
    }

    #[test]
    fn test_compute_streak_at_reads_today_from_now() {
        let now = DateTime::parse_from_rfc3339("2024-06-15T08:00:00+02:00").unwrap();
        let records: Vec<ActivityRecord> = [
            "2024-06-13T10:00:00+02:00",
            "2024-06-14T21:00:00+02:00",
            "2024-06-15T07:30:00+02:00",
            "2024-06-15T07:45:00+02:00",
        ]
        .iter()
        .map(|stamp| ActivityRecord {
            id: crate::models::EntryId::new(),
            created_at: DateTime::parse_from_rfc3339(stamp).unwrap().timestamp_millis(),
        })
        .collect();

        let state = compute_streak_at(&records, 0, &now);
        assert_eq!(state.streak, 3);
    }
}

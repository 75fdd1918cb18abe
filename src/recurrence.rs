// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use crate::models::Frequency;
use crate::utils::add_months;
use chrono::{Datelike, NaiveDate};

/// First occurrence of the series `anchor + k * period` that is on or after
/// `today`. Each candidate is computed from the anchor, not from the
/// previous candidate, so a 31st anchor does not drift to the 28th after
/// passing through February.
///
/// One-time frequencies return the anchor unchanged. `None` only when the
/// date arithmetic overflows.
pub fn next_occurrence(anchor: NaiveDate, frequency: Frequency, today: NaiveDate) -> Option<NaiveDate> {
    let Some(period) = frequency.months() else {
        return Some(anchor);
    };
    if anchor >= today {
        return Some(anchor);
    }

    // Jump close to today, then walk forward period by period.
    let gap = (today.year() - anchor.year()) * 12 + today.month() as i32 - anchor.month() as i32;
    let mut k = (gap.max(0) as u32 / period).saturating_sub(1);
    loop {
        let candidate = add_months(anchor, k.checked_mul(period)?)?;
        if candidate >= today {
            return Some(candidate);
        }
        k = k.checked_add(1)?;
    }
}

/// Projected date for a dependent record. Non-recurring sources keep their
/// stored date even when it is in the past.
pub fn project(anchor: NaiveDate, frequency: Option<Frequency>, today: NaiveDate) -> NaiveDate {
    match frequency {
        Some(f) => next_occurrence(anchor, f, today).unwrap_or(anchor),
        None => anchor,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn monthly_keeps_day_of_month() {
        let today = date(2026, 10, 17);
        assert_eq!(
            next_occurrence(date(2026, 9, 20), Frequency::Monthly, today),
            Some(date(2026, 10, 20))
        );
        assert_eq!(
            next_occurrence(date(2026, 9, 5), Frequency::Monthly, today),
            Some(date(2026, 11, 5))
        );
    }

    #[test]
    fn stale_anchor_far_in_the_past_still_lands_after_today() {
        let today = date(2026, 10, 17);
        let next = next_occurrence(date(2019, 1, 31), Frequency::Monthly, today).unwrap();
        assert_eq!(next, date(2026, 10, 31));
        let next = next_occurrence(date(2020, 2, 29), Frequency::Yearly, today).unwrap();
        assert_eq!(next, date(2027, 2, 28));
        let next = next_occurrence(date(2024, 1, 10), Frequency::Quarterly, today).unwrap();
        assert_eq!(next, date(2027, 1, 10));
    }

    #[test]
    fn today_counts_as_upcoming() {
        let today = date(2026, 10, 17);
        assert_eq!(
            next_occurrence(date(2026, 7, 17), Frequency::Quarterly, today),
            Some(today)
        );
    }

    #[test]
    fn future_and_one_time_anchors_are_untouched() {
        let today = date(2026, 10, 17);
        assert_eq!(
            next_occurrence(date(2027, 3, 1), Frequency::Monthly, today),
            Some(date(2027, 3, 1))
        );
        assert_eq!(project(date(2020, 3, 1), Some(Frequency::OneTime), today), date(2020, 3, 1));
        assert_eq!(project(date(2020, 3, 1), None, today), date(2020, 3, 1));
    }

    #[test]
    fn projection_is_never_before_today() {
        let today = date(2026, 10, 17);
        for f in [Frequency::Monthly, Frequency::Quarterly, Frequency::Yearly] {
            for offset in 0..800 {
                let anchor = today - chrono::Duration::days(offset);
                let next = project(anchor, Some(f), today);
                assert!(next >= today, "{:?} from {} gave {}", f, anchor, next);
            }
        }
    }
}

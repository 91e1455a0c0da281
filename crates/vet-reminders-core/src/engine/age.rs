//! Pet age in whole weeks.

use chrono::{DateTime, NaiveDate, Utc};

/// Whole 7-day periods from `dob` to the UTC date of `reference`.
///
/// Floors toward negative infinity, so a date of birth in the future yields a
/// negative age that never matches a week-count condition.
pub fn age_in_weeks(dob: NaiveDate, reference: DateTime<Utc>) -> i64 {
    age_in_weeks_on(dob, reference.date_naive())
}

/// Same as [`age_in_weeks`] for a calendar date.
pub fn age_in_weeks_on(dob: NaiveDate, on: NaiveDate) -> i64 {
    (on - dob).num_days().div_euclid(7)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use proptest::prelude::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_exact_weeks() {
        let dob = date(2026, 1, 1);
        assert_eq!(age_in_weeks_on(dob, dob), 0);
        assert_eq!(age_in_weeks_on(dob, date(2026, 1, 7)), 0);
        assert_eq!(age_in_weeks_on(dob, date(2026, 1, 8)), 1);
        assert_eq!(age_in_weeks_on(dob, dob + Duration::days(70)), 10);
        assert_eq!(age_in_weeks_on(dob, dob + Duration::days(76)), 10);
        assert_eq!(age_in_weeks_on(dob, dob + Duration::days(77)), 11);
    }

    #[test]
    fn test_future_dob_is_negative() {
        let dob = date(2026, 1, 8);
        assert_eq!(age_in_weeks_on(dob, date(2026, 1, 7)), -1);
    }

    #[test]
    fn test_time_of_day_ignored() {
        let dob = date(2026, 1, 1);
        let late = "2026-03-12T23:59:59Z".parse::<DateTime<Utc>>().unwrap();
        let early = "2026-03-12T00:00:00Z".parse::<DateTime<Utc>>().unwrap();
        assert_eq!(age_in_weeks(dob, late), age_in_weeks(dob, early));
        assert_eq!(age_in_weeks(dob, early), 10);
    }

    proptest! {
        #[test]
        fn prop_age_matches_days_over_seven(days in 0i64..20_000) {
            let dob = date(2000, 1, 1);
            prop_assert_eq!(age_in_weeks_on(dob, dob + Duration::days(days)), days / 7);
        }

        #[test]
        fn prop_age_is_monotonic(days in 0i64..20_000, extra in 0i64..400) {
            let dob = date(2000, 1, 1);
            let earlier = age_in_weeks_on(dob, dob + Duration::days(days));
            let later = age_in_weeks_on(dob, dob + Duration::days(days + extra));
            prop_assert!(later >= earlier);
        }
    }
}

//! Weekly expiration date selection.

use chrono::{Datelike, NaiveDate, Utc};
use chrono_tz::Tz;

/// The Friday contracts are sold against.
///
/// Monday through Thursday pick the coming Friday. Friday, Saturday and
/// Sunday pick the Friday of the following week.
pub fn expiration_date(today: NaiveDate) -> NaiveDate {
    let weekday = i64::from(today.weekday().num_days_from_monday());
    let days = match (4 - weekday).rem_euclid(7) {
        0 => 7,
        d => d,
    };
    today + chrono::Duration::days(days)
}

/// Today's calendar date in `tz`.
pub fn today_in(tz: Tz) -> NaiveDate {
    Utc::now().with_timezone(&tz).date_naive()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Weekday;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn monday_picks_same_week_friday() {
        assert_eq!(expiration_date(date(2025, 9, 22)), date(2025, 9, 26));
    }

    #[test]
    fn thursday_picks_next_day() {
        assert_eq!(expiration_date(date(2025, 9, 25)), date(2025, 9, 26));
    }

    #[test]
    fn friday_skips_to_next_week() {
        assert_eq!(expiration_date(date(2025, 9, 26)), date(2025, 10, 3));
    }

    #[test]
    fn weekend_picks_following_friday() {
        assert_eq!(expiration_date(date(2025, 9, 27)), date(2025, 10, 3));
        assert_eq!(expiration_date(date(2025, 9, 28)), date(2025, 10, 3));
    }

    #[test]
    fn always_a_friday_within_a_week() {
        let start = date(2024, 12, 25);
        for offset in 0..14 {
            let today = start + chrono::Duration::days(offset);
            let exp = expiration_date(today);
            assert_eq!(exp.weekday(), Weekday::Fri);
            let gap = (exp - today).num_days();
            assert!((1..=7).contains(&gap), "{today} -> {exp}");
        }
    }
}

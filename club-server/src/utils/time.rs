//! Time helpers for the business timezone
//!
//! Storage keeps `i64` Unix millis and `NaiveDate`s; "today" is always
//! evaluated in the club's timezone, never in UTC.

use chrono::{Datelike, Months, NaiveDate};
use chrono_tz::Tz;

use super::{AppError, AppResult, ErrorCode};

/// Today's date in the business timezone
pub fn today(tz: Tz) -> NaiveDate {
    chrono::Utc::now().with_timezone(&tz).date_naive()
}

/// Parse a date string (YYYY-MM-DD)
pub fn parse_date(date: &str) -> AppResult<NaiveDate> {
    NaiveDate::parse_from_str(date, "%Y-%m-%d")
        .map_err(|_| AppError::validation(format!("Invalid date format: {}", date)))
}

/// Parse a billing period (`YYYY-MM`) into year and month
pub fn parse_period(period: &str) -> AppResult<(i32, u32)> {
    let invalid = || {
        AppError::with_message(
            ErrorCode::ChargePeriodInvalid,
            format!("Invalid period '{}', expected YYYY-MM", period),
        )
    };
    let (year, month) = period.split_once('-').ok_or_else(invalid)?;
    if year.len() != 4 || month.len() != 2 {
        return Err(invalid());
    }
    let year: i32 = year.parse().map_err(|_| invalid())?;
    let month: u32 = month.parse().map_err(|_| invalid())?;
    if !(1..=12).contains(&month) {
        return Err(invalid());
    }
    Ok((year, month))
}

/// Date for `day` of the given month, clamped to the month's last day
pub fn clamped_date(year: i32, month: u32, day: u32) -> Option<NaiveDate> {
    let first = NaiveDate::from_ymd_opt(year, month, 1)?;
    let last_day = first
        .checked_add_months(Months::new(1))
        .and_then(|next| next.pred_opt())
        .map(|last| last.day())
        .unwrap_or(28);
    NaiveDate::from_ymd_opt(year, month, day.clamp(1, last_day))
}

/// `date` shifted by `months`, day clamped to the target month's end
pub fn add_months(date: NaiveDate, months: u32) -> Option<NaiveDate> {
    date.checked_add_months(Months::new(months))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_parse_period() {
        assert_eq!(parse_period("2025-03").unwrap(), (2025, 3));
        for bad in ["2025-13", "2025-3", "25-03", "2025/03", "abcd-ef", ""] {
            let err = parse_period(bad).unwrap_err();
            assert_eq!(err.code, ErrorCode::ChargePeriodInvalid, "{bad}");
        }
    }

    #[test]
    fn test_clamped_date() {
        assert_eq!(clamped_date(2025, 2, 31), Some(date(2025, 2, 28)));
        assert_eq!(clamped_date(2024, 2, 31), Some(date(2024, 2, 29)));
        assert_eq!(clamped_date(2025, 12, 10), Some(date(2025, 12, 10)));
        assert_eq!(clamped_date(2025, 13, 10), None);
    }

    #[test]
    fn test_add_months_clamps_to_month_end() {
        assert_eq!(add_months(date(2025, 1, 31), 1), Some(date(2025, 2, 28)));
        assert_eq!(add_months(date(2025, 1, 31), 2), Some(date(2025, 3, 31)));
        assert_eq!(add_months(date(2025, 11, 15), 3), Some(date(2026, 2, 15)));
    }

    #[test]
    fn test_parse_date() {
        assert_eq!(parse_date("2025-06-01").unwrap(), date(2025, 6, 1));
        assert!(parse_date("01/06/2025").is_err());
    }
}

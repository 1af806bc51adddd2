use crate::error::{Result, SalesLedgerError};
use crate::schema::ViewMode;
use chrono::{Datelike, Days, NaiveDate};

pub fn last_day_of_month(year: i32, month: u32) -> NaiveDate {
    let next_month = if month == 12 { 1 } else { month + 1 };
    let next_year = if month == 12 { year + 1 } else { year };

    NaiveDate::from_ymd_opt(next_year, next_month, 1)
        .and_then(|first| first.checked_sub_days(Days::new(1)))
        .unwrap_or(NaiveDate::MAX)
}

/// Monday of the week containing `date`.
pub fn week_start(date: NaiveDate) -> NaiveDate {
    let offset = date.weekday().num_days_from_monday() as u64;
    date.checked_sub_days(Days::new(offset)).unwrap_or(date)
}

/// First day of the bucket that `date` falls into.
pub fn period_start(date: NaiveDate, mode: ViewMode) -> NaiveDate {
    match mode {
        ViewMode::Daily => date,
        ViewMode::Weekly => week_start(date),
        ViewMode::Monthly => date.with_day(1).unwrap_or(date),
    }
}

/// Label of the bucket that `date` falls into.
///
/// - Daily: `YYYY-MM-DD`
/// - Weekly: `YYYY-MM-DD` of the Monday opening the week
/// - Monthly: `YYYY-MM`
pub fn period_label(date: NaiveDate, mode: ViewMode) -> String {
    match mode {
        ViewMode::Monthly => date.format("%Y-%m").to_string(),
        _ => period_start(date, mode).format("%Y-%m-%d").to_string(),
    }
}

pub fn parse_iso_date(value: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(value.trim(), "%Y-%m-%d").map_err(|_| {
        SalesLedgerError::DateError(format!("Invalid date: {}. Expected YYYY-MM-DD", value))
    })
}

/// Parses a period string in the format "YYYY-MM" or "YYYY-MM:YYYY-MM"
/// Returns (start_date, end_date)
pub fn parse_period_string(period: &str) -> Result<(NaiveDate, NaiveDate)> {
    let parts: Vec<&str> = period.split(':').collect();

    let month_start = |part: &str, role: &str| -> Result<NaiveDate> {
        let start_str = format!("{}-01", part.trim());
        NaiveDate::parse_from_str(&start_str, "%Y-%m-%d").map_err(|_| {
            SalesLedgerError::DateError(format!(
                "Invalid {}date format in period: {}. Expected YYYY-MM",
                role, part
            ))
        })
    };

    match parts.len() {
        1 => {
            let start_date = month_start(parts[0], "")?;
            let end_date = last_day_of_month(start_date.year(), start_date.month());
            Ok((start_date, end_date))
        }
        2 => {
            let start_date = month_start(parts[0], "start ")?;
            let end_ref = month_start(parts[1], "end ")?;
            let end_date = last_day_of_month(end_ref.year(), end_ref.month());
            if end_date < start_date {
                return Err(SalesLedgerError::DateError(format!(
                    "Period {} ends before it starts",
                    period
                )));
            }
            Ok((start_date, end_date))
        }
        _ => Err(SalesLedgerError::DateError(format!(
            "Invalid period format: {}. Expected 'YYYY-MM' or 'YYYY-MM:YYYY-MM'",
            period
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_last_day_of_month() {
        assert_eq!(
            last_day_of_month(2023, 2),
            NaiveDate::from_ymd_opt(2023, 2, 28).unwrap()
        );
        assert_eq!(
            last_day_of_month(2024, 2),
            NaiveDate::from_ymd_opt(2024, 2, 29).unwrap()
        );
        assert_eq!(
            last_day_of_month(2023, 12),
            NaiveDate::from_ymd_opt(2023, 12, 31).unwrap()
        );
    }

    #[test]
    fn test_week_start_is_monday() {
        // 2024-01-01 is a Monday
        let monday = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        for day in 1..=7 {
            let date = NaiveDate::from_ymd_opt(2024, 1, day).unwrap();
            assert_eq!(week_start(date), monday, "day {} should bucket to Monday", day);
        }
        let next = NaiveDate::from_ymd_opt(2024, 1, 8).unwrap();
        assert_eq!(week_start(next), next);
    }

    #[test]
    fn test_period_labels() {
        let date = NaiveDate::from_ymd_opt(2024, 3, 14).unwrap();
        assert_eq!(period_label(date, ViewMode::Daily), "2024-03-14");
        assert_eq!(period_label(date, ViewMode::Weekly), "2024-03-11");
        assert_eq!(period_label(date, ViewMode::Monthly), "2024-03");
    }

    #[test]
    fn test_weekly_bucket_crosses_year_boundary() {
        let date = NaiveDate::from_ymd_opt(2025, 1, 2).unwrap();
        assert_eq!(period_label(date, ViewMode::Weekly), "2024-12-30");
    }

    #[test]
    fn test_parse_period_string_month_and_range() {
        let (start, end) = parse_period_string("2023-02").unwrap();
        assert_eq!(start, NaiveDate::from_ymd_opt(2023, 2, 1).unwrap());
        assert_eq!(end, NaiveDate::from_ymd_opt(2023, 2, 28).unwrap());

        let (start, end) = parse_period_string("2023-01:2023-03").unwrap();
        assert_eq!(start, NaiveDate::from_ymd_opt(2023, 1, 1).unwrap());
        assert_eq!(end, NaiveDate::from_ymd_opt(2023, 3, 31).unwrap());

        assert!(parse_period_string("2023-05:2023-01").is_err());
        assert!(parse_period_string("enero").is_err());
    }

    #[test]
    fn test_parse_iso_date() {
        assert_eq!(
            parse_iso_date("2024-01-07").unwrap(),
            NaiveDate::from_ymd_opt(2024, 1, 7).unwrap()
        );
        assert!(parse_iso_date("07/01/2024").is_err());
    }
}

//! Injected clock for date-derived request defaults

use chrono::{Datelike, Duration, Months, NaiveDate, Utc};

/// Source of "today" for default years/months and status calculations
pub trait Clock: Send + Sync {
    fn today(&self) -> NaiveDate;

    fn current_year(&self) -> String {
        self.today().year().to_string()
    }

    /// Current month, zero padded ("01".."12")
    fn current_month(&self) -> String {
        format!("{:02}", self.today().month())
    }

    /// Current `YYYYMM`
    fn current_year_month(&self) -> String {
        self.today().format("%Y%m").to_string()
    }

    /// `YYYYMM` of the previous calendar month
    fn previous_year_month(&self) -> String {
        let today = self.today();
        today
            .checked_sub_months(Months::new(1))
            .unwrap_or(today)
            .format("%Y%m")
            .to_string()
    }

    /// Today as `YYYYMMDD`
    fn compact_today(&self) -> String {
        self.today().format("%Y%m%d").to_string()
    }
}

/// Wall clock in Korea Standard Time (UTC+9), which is what every upstream
/// API uses for its monthly partitions
#[derive(Debug, Clone, Copy, Default)]
pub struct SeoulClock;

impl Clock for SeoulClock {
    fn today(&self) -> NaiveDate {
        (Utc::now() + Duration::hours(9)).date_naive()
    }
}

/// Clock pinned to one date
#[derive(Debug, Clone, Copy)]
pub struct FixedClock(pub NaiveDate);

impl Clock for FixedClock {
    fn today(&self) -> NaiveDate {
        self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn clock(y: i32, m: u32, d: u32) -> FixedClock {
        FixedClock(NaiveDate::from_ymd_opt(y, m, d).unwrap())
    }

    #[test]
    fn test_defaults() {
        let c = clock(2024, 3, 15);
        assert_eq!(c.current_year(), "2024");
        assert_eq!(c.current_month(), "03");
        assert_eq!(c.current_year_month(), "202403");
        assert_eq!(c.compact_today(), "20240315");
    }

    #[test]
    fn test_previous_month_crosses_year() {
        assert_eq!(clock(2024, 1, 10).previous_year_month(), "202312");
        assert_eq!(clock(2024, 3, 31).previous_year_month(), "202402");
    }
}

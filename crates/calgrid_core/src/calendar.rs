use chrono::{Datelike, Local, NaiveDate, Weekday};
use serde::{Deserialize, Serialize};

/// A displayed month. `month` is zero-based (January = 0) and always in 0..=11.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct CalendarMonth {
    year: i32,
    month: u32,
}

impl CalendarMonth {
    pub fn new(year: i32, month: u32) -> Option<Self> {
        (month <= 11).then_some(Self { year, month })
    }

    /// Builds a month from an arbitrary month index, carrying whole years into `year`.
    pub fn normalized(year: i32, month: i64) -> Self {
        let carry = month.div_euclid(12);
        let month = month.rem_euclid(12) as u32;
        Self {
            year: year.saturating_add(carry as i32),
            month,
        }
    }

    pub fn of(date: NaiveDate) -> Self {
        Self {
            year: date.year(),
            month: date.month0(),
        }
    }

    pub fn year(&self) -> i32 {
        self.year
    }

    pub fn month0(&self) -> u32 {
        self.month
    }

    /// One-based month number, as used in file names and titles.
    pub fn number(&self) -> u32 {
        self.month + 1
    }

    pub fn first_day(&self) -> NaiveDate {
        NaiveDate::from_ymd_opt(self.year, self.number(), 1).unwrap_or(NaiveDate::MIN)
    }

    pub fn date(&self, day: u32) -> Option<NaiveDate> {
        NaiveDate::from_ymd_opt(self.year, self.number(), day)
    }

    pub fn weekday_of_first(&self) -> Weekday {
        self.first_day().weekday()
    }

    /// Number of blank leading grid slots before day 1 in a Sunday-first grid.
    pub fn weekday_offset(&self) -> u32 {
        self.weekday_of_first().num_days_from_sunday()
    }

    /// Whether every day of this month is a representable calendar date.
    pub fn is_representable(&self) -> bool {
        self.date(1).is_some() && self.date(28).is_some()
    }

    /// Zero for months outside the supported date range.
    pub fn days_in(&self) -> u32 {
        (28..=31)
            .rev()
            .find(|day| self.date(*day).is_some())
            .unwrap_or(0)
    }

    pub fn advance(&self) -> Self {
        if self.month == 11 {
            Self {
                year: self.year.saturating_add(1),
                month: 0,
            }
        } else {
            Self {
                year: self.year,
                month: self.month + 1,
            }
        }
    }

    pub fn retreat(&self) -> Self {
        if self.month == 0 {
            Self {
                year: self.year.saturating_sub(1),
                month: 11,
            }
        } else {
            Self {
                year: self.year,
                month: self.month - 1,
            }
        }
    }
}

pub trait Clock: Send + Sync {
    fn today(&self) -> NaiveDate;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn today(&self) -> NaiveDate {
        Local::now().date_naive()
    }
}

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

    fn month(year: i32, month: u32) -> CalendarMonth {
        CalendarMonth::new(year, month).unwrap()
    }

    #[test]
    fn april_2024_starts_on_monday() {
        let april = month(2024, 3);
        assert_eq!(april.weekday_of_first(), Weekday::Mon);
        assert_eq!(april.weekday_offset(), 1);
        assert_eq!(april.days_in(), 30);
    }

    #[test]
    fn february_respects_leap_years() {
        assert_eq!(month(2024, 1).days_in(), 29);
        assert_eq!(month(2023, 1).days_in(), 28);
        assert_eq!(month(1900, 1).days_in(), 28);
        assert_eq!(month(2000, 1).days_in(), 29);
    }

    #[test]
    fn navigation_rolls_over_year_boundaries() {
        assert_eq!(month(2024, 11).advance(), month(2025, 0));
        assert_eq!(month(2025, 0).retreat(), month(2024, 11));
        assert_eq!(month(2024, 5).advance(), month(2024, 6));
    }

    #[test]
    fn normalized_carries_years_both_ways() {
        assert_eq!(CalendarMonth::normalized(2024, 12), month(2025, 0));
        assert_eq!(CalendarMonth::normalized(2024, -1), month(2023, 11));
        assert_eq!(CalendarMonth::normalized(2024, 27), month(2026, 3));
    }

    #[test]
    fn months_beyond_the_date_range_are_empty() {
        assert_eq!(month(262_142, 11).days_in(), 31);
        let far = month(262_143, 0);
        assert!(!far.is_representable());
        assert_eq!(far.days_in(), 0);
        assert_eq!(month(i32::MIN, 0).days_in(), 0);
        assert!(month(2024, 11).is_representable());
    }

    #[test]
    fn stepping_past_the_largest_year_saturates() {
        let last = CalendarMonth::normalized(i32::MAX, 11);
        assert_eq!(last.advance(), month(i32::MAX, 0));
        assert_eq!(month(i32::MIN, 0).retreat(), month(i32::MIN, 11));
    }

    #[test]
    fn rejects_out_of_range_month() {
        assert!(CalendarMonth::new(2024, 12).is_none());
    }
}

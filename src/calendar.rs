use crate::error::{FinancePlannerError, Result};
use chrono::{Datelike, Days, NaiveDate, Weekday};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;

/// ISO-8601 week number together with the ISO week-based year it belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct IsoWeekData {
    pub week: u32,
    pub year: i32,
}

/// The week-based year can differ from the calendar year near January 1st:
/// 2022-01-01 is a Saturday and belongs to week 52 of 2021.
pub fn iso_week_data(date: NaiveDate) -> IsoWeekData {
    let iso = date.iso_week();
    IsoWeekData {
        week: iso.week(),
        year: iso.year(),
    }
}

/// December 28th always falls in the last ISO week of its year.
pub fn weeks_in_iso_year(year: i32) -> u32 {
    NaiveDate::from_ymd_opt(year, 12, 28)
        .map(|d| d.iso_week().week())
        .unwrap_or(52)
}

/// Monday and Sunday of the given ISO week.
pub fn iso_week_bounds(year: i32, week: u32) -> Result<(NaiveDate, NaiveDate)> {
    let monday = NaiveDate::from_isoywd_opt(year, week, Weekday::Mon).ok_or_else(|| {
        FinancePlannerError::DateError(format!(
            "Week {} does not exist in ISO year {} ({} weeks)",
            week,
            year,
            weeks_in_iso_year(year)
        ))
    })?;
    let sunday = monday
        .checked_add_days(Days::new(6))
        .ok_or_else(|| FinancePlannerError::DateError(format!("Week {}/{} overflows", week, year)))?;
    Ok((monday, sunday))
}

impl IsoWeekData {
    pub fn new(year: i32, week: u32) -> Result<Self> {
        if week == 0 || week > weeks_in_iso_year(year) {
            return Err(FinancePlannerError::DateError(format!(
                "Week {} does not exist in ISO year {}",
                week, year
            )));
        }
        Ok(Self { week, year })
    }

    pub fn bounds(&self) -> Result<(NaiveDate, NaiveDate)> {
        iso_week_bounds(self.year, self.week)
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        iso_week_data(date) == *self
    }

    pub fn next(&self) -> Self {
        if self.week >= weeks_in_iso_year(self.year) {
            Self {
                week: 1,
                year: self.year + 1,
            }
        } else {
            Self {
                week: self.week + 1,
                year: self.year,
            }
        }
    }

    pub fn previous(&self) -> Self {
        if self.week <= 1 {
            let year = self.year - 1;
            Self {
                week: weeks_in_iso_year(year),
                year,
            }
        } else {
            Self {
                week: self.week - 1,
                year: self.year,
            }
        }
    }
}

impl fmt::Display for IsoWeekData {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-W{:02}", self.year, self.week)
    }
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, JsonSchema,
)]
pub enum Quarter {
    Q1,
    Q2,
    Q3,
    Q4,
}

impl Quarter {
    pub const ALL: [Quarter; 4] = [Quarter::Q1, Quarter::Q2, Quarter::Q3, Quarter::Q4];

    pub fn from_month(month: u32) -> Result<Self> {
        match month {
            1..=3 => Ok(Quarter::Q1),
            4..=6 => Ok(Quarter::Q2),
            7..=9 => Ok(Quarter::Q3),
            10..=12 => Ok(Quarter::Q4),
            _ => Err(FinancePlannerError::DateError(format!(
                "Invalid month {}: must be between 1 and 12",
                month
            ))),
        }
    }

    pub fn of(date: NaiveDate) -> Self {
        Self::ALL[date.month0() as usize / 3]
    }

    pub fn index(&self) -> usize {
        match self {
            Quarter::Q1 => 0,
            Quarter::Q2 => 1,
            Quarter::Q3 => 2,
            Quarter::Q4 => 3,
        }
    }

    pub fn first_month(&self) -> u32 {
        self.index() as u32 * 3 + 1
    }

    pub fn months(&self) -> [u32; 3] {
        let first = self.first_month();
        [first, first + 1, first + 2]
    }

    pub fn bounds(&self, year: i32) -> Result<(NaiveDate, NaiveDate)> {
        let start = NaiveDate::from_ymd_opt(year, self.first_month(), 1).ok_or_else(|| {
            FinancePlannerError::DateError(format!("Year {} is out of range", year))
        })?;
        Ok((start, last_day_of_month(year, self.first_month() + 2)?))
    }

    pub fn label(&self, year: i32) -> String {
        format!("{}-{}", year, self)
    }
}

impl fmt::Display for Quarter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Q{}", self.index() + 1)
    }
}

/// Parses labels such as `2024-Q3`.
pub fn parse_quarter_label(label: &str) -> Result<(i32, Quarter)> {
    let invalid = || {
        FinancePlannerError::DateError(format!(
            "Invalid quarter label '{}'. Expected YYYY-QN",
            label
        ))
    };

    let (year, quarter) = label.trim().split_once('-').ok_or_else(invalid)?;
    let year: i32 = year.parse().map_err(|_| invalid())?;
    let quarter = match quarter.to_uppercase().as_str() {
        "Q1" => Quarter::Q1,
        "Q2" => Quarter::Q2,
        "Q3" => Quarter::Q3,
        "Q4" => Quarter::Q4,
        _ => return Err(invalid()),
    };
    Ok((year, quarter))
}

pub fn last_day_of_month(year: i32, month: u32) -> Result<NaiveDate> {
    let next_month = if month == 12 { 1 } else { month + 1 };
    let next_year = if month == 12 { year + 1 } else { year };

    NaiveDate::from_ymd_opt(next_year, next_month, 1)
        .and_then(|d| d.checked_sub_days(Days::new(1)))
        .ok_or_else(|| FinancePlannerError::DateError(format!("Invalid month {}/{}", month, year)))
}

pub fn months_between(start: NaiveDate, end: NaiveDate) -> i32 {
    let year_diff = end.year() - start.year();
    let month_diff = end.month() as i32 - start.month() as i32;
    year_diff * 12 + month_diff
}

pub fn month_ends_in_period(start: NaiveDate, end: NaiveDate) -> Result<Vec<NaiveDate>> {
    let mut dates = Vec::new();
    let mut current = last_day_of_month(start.year(), start.month())?;

    while current <= end {
        dates.push(current);
        let (year, month) = if current.month() == 12 {
            (current.year() + 1, 1)
        } else {
            (current.year(), current.month() + 1)
        };
        current = last_day_of_month(year, month)?;
    }

    Ok(dates)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    #[test]
    fn test_iso_week_data() {
        assert_eq!(iso_week_data(d(2024, 1, 4)), IsoWeekData { week: 1, year: 2024 });
        assert_eq!(iso_week_data(d(2022, 1, 1)), IsoWeekData { week: 52, year: 2021 });
        // 2020 has 53 ISO weeks; Jan 1st 2021 (a Friday) still belongs to it.
        assert_eq!(iso_week_data(d(2020, 12, 31)), IsoWeekData { week: 53, year: 2020 });
        assert_eq!(iso_week_data(d(2021, 1, 1)), IsoWeekData { week: 53, year: 2020 });
        // 2024-12-30 is a Monday in week 1 of 2025.
        assert_eq!(iso_week_data(d(2024, 12, 30)), IsoWeekData { week: 1, year: 2025 });
    }

    #[test]
    fn test_weeks_in_iso_year() {
        assert_eq!(weeks_in_iso_year(2020), 53);
        assert_eq!(weeks_in_iso_year(2015), 53);
        assert_eq!(weeks_in_iso_year(2021), 52);
        assert_eq!(weeks_in_iso_year(2024), 52);
    }

    #[test]
    fn test_week_navigation_across_years() {
        let last_2020 = IsoWeekData::new(2020, 53).unwrap();
        assert_eq!(last_2020.next(), IsoWeekData { week: 1, year: 2021 });
        assert_eq!(IsoWeekData { week: 1, year: 2021 }.previous(), last_2020);
        assert_eq!(
            IsoWeekData { week: 1, year: 2022 }.previous(),
            IsoWeekData { week: 52, year: 2021 }
        );
        assert!(IsoWeekData::new(2021, 53).is_err());
        assert!(IsoWeekData::new(2021, 0).is_err());
    }

    #[test]
    fn test_iso_week_bounds() {
        let (mon, sun) = iso_week_bounds(2024, 1).unwrap();
        assert_eq!(mon, d(2024, 1, 1));
        assert_eq!(sun, d(2024, 1, 7));

        let (mon, sun) = iso_week_bounds(2020, 53).unwrap();
        assert_eq!(mon, d(2020, 12, 28));
        assert_eq!(sun, d(2021, 1, 3));

        assert!(iso_week_bounds(2021, 53).is_err());
    }

    #[test]
    fn test_quarters() {
        assert_eq!(Quarter::of(d(2024, 2, 29)), Quarter::Q1);
        assert_eq!(Quarter::of(d(2024, 10, 1)), Quarter::Q4);
        assert_eq!(Quarter::from_month(6).unwrap(), Quarter::Q2);
        assert!(Quarter::from_month(13).is_err());
        assert_eq!(Quarter::Q3.months(), [7, 8, 9]);

        let (start, end) = Quarter::Q1.bounds(2024).unwrap();
        assert_eq!(start, d(2024, 1, 1));
        assert_eq!(end, d(2024, 3, 31));

        assert_eq!(Quarter::Q2.label(2024), "2024-Q2");
        assert_eq!(parse_quarter_label("2023-q4").unwrap(), (2023, Quarter::Q4));
        assert!(parse_quarter_label("2023-Q5").is_err());
        assert!(parse_quarter_label("Q1").is_err());
    }

    #[test]
    fn test_month_helpers() {
        assert_eq!(last_day_of_month(2024, 2).unwrap(), d(2024, 2, 29));
        assert_eq!(last_day_of_month(2023, 12).unwrap(), d(2023, 12, 31));
        assert_eq!(months_between(d(2023, 11, 1), d(2024, 2, 1)), 3);

        let ends = month_ends_in_period(d(2023, 11, 15), d(2024, 2, 29)).unwrap();
        assert_eq!(
            ends,
            vec![d(2023, 11, 30), d(2023, 12, 31), d(2024, 1, 31), d(2024, 2, 29)]
        );
    }
}

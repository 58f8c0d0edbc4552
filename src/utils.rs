use crate::error::{ReconciliationError, Result};
use chrono::{Datelike, Days, NaiveDate};
use rust_decimal::Decimal;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// A calendar month, labeled `YYYY-MM`.
///
/// Ordering compares the year first and then the month, which is calendar
/// order. Labels are never compared as text: `"2024-09" < "2025-01"` happens to
/// hold lexically, but the key does not rely on that.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct MonthKey {
    year: i32,
    month: u32,
}

impl MonthKey {
    pub fn new(year: i32, month: u32) -> Result<Self> {
        if !(1..=12).contains(&month) {
            return Err(ReconciliationError::InvalidMonthLabel(format!(
                "{:04}-{:02}",
                year, month
            )));
        }
        Ok(Self { year, month })
    }

    pub fn from_date(date: NaiveDate) -> Self {
        Self {
            year: date.year(),
            month: date.month(),
        }
    }

    /// Moves `offset` months forward (or back when negative), rolling the year.
    pub fn add_months(&self, offset: i32) -> Self {
        let index = self.year * 12 + self.month as i32 - 1 + offset;
        Self {
            year: index.div_euclid(12),
            month: index.rem_euclid(12) as u32 + 1,
        }
    }

    pub fn next(&self) -> Self {
        self.add_months(1)
    }

    pub fn label(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for MonthKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04}-{:02}", self.year, self.month)
    }
}

impl FromStr for MonthKey {
    type Err = ReconciliationError;

    fn from_str(label: &str) -> Result<Self> {
        parse_month_label(label)
    }
}

impl TryFrom<String> for MonthKey {
    type Error = ReconciliationError;

    fn try_from(label: String) -> Result<Self> {
        parse_month_label(&label)
    }
}

impl From<MonthKey> for String {
    fn from(key: MonthKey) -> Self {
        key.to_string()
    }
}

impl JsonSchema for MonthKey {
    fn schema_name() -> String {
        "MonthKey".to_string()
    }

    fn json_schema(gen: &mut schemars::gen::SchemaGenerator) -> schemars::schema::Schema {
        String::json_schema(gen)
    }
}

/// The Sunday that starts the week containing `date`.
pub fn week_start(date: NaiveDate) -> NaiveDate {
    let offset = date.weekday().num_days_from_sunday() as u64;
    date.checked_sub_days(Days::new(offset)).unwrap_or(date)
}

/// Sums `values`, or `None` if the total leaves the `Decimal` range.
pub fn checked_sum<I>(values: I) -> Option<Decimal>
where
    I: IntoIterator<Item = Decimal>,
{
    values
        .into_iter()
        .try_fold(Decimal::ZERO, |total, value| total.checked_add(value))
}

/// Parses a month label in the format "YYYY-MM".
pub fn parse_month_label(label: &str) -> Result<MonthKey> {
    let trimmed = label.trim();
    let date = NaiveDate::parse_from_str(&format!("{}-01", trimmed), "%Y-%m-%d")
        .map_err(|_| ReconciliationError::InvalidMonthLabel(label.to_string()))?;
    Ok(MonthKey::from_date(date))
}

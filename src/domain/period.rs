//! Calendar-month evaluation windows.

use chrono::{DateTime, Datelike, Months, NaiveDate, Utc};
use serde::Serialize;
use utoipa::ToSchema;

use crate::error::GatewayError;

/// A calendar month in UTC. `month0` is zero-based (January = 0).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Period {
    year: i32,
    month0: u32,
}

impl Period {
    /// Creates a period from a year and a zero-based month.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::InvalidMonth`] if `month0 > 11` and
    /// [`GatewayError::InvalidRequest`] if the year is out of range.
    pub fn new(year: i32, month0: u32) -> Result<Self, GatewayError> {
        if month0 > 11 {
            return Err(GatewayError::InvalidMonth(i64::from(month0)));
        }
        let period = Self { year, month0 };
        period.first_day()?;
        Ok(period)
    }

    /// Resolves caller input into a period, defaulting to the month and
    /// year of `now`.
    ///
    /// # Errors
    ///
    /// Propagates [`Period::normalize_month`] and [`Period::new`] errors.
    pub fn resolve(
        year: Option<i32>,
        month: Option<i64>,
        now: DateTime<Utc>,
    ) -> Result<Self, GatewayError> {
        let year = year.unwrap_or_else(|| now.year());
        let month0 = match month {
            Some(raw) => Self::normalize_month(raw)?,
            None => now.month0(),
        };
        Self::new(year, month0)
    }

    /// Maps caller month input onto a zero-based month.
    ///
    /// `1..=12` is read as one-based and shifted down; `0` is January.
    /// Everything else is rejected.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::InvalidMonth`] for values outside `0..=12`.
    pub fn normalize_month(raw: i64) -> Result<u32, GatewayError> {
        match raw {
            0 => Ok(0),
            1..=12 => u32::try_from(raw - 1).map_err(|_| GatewayError::InvalidMonth(raw)),
            _ => Err(GatewayError::InvalidMonth(raw)),
        }
    }

    /// Returns the calendar year.
    #[must_use]
    pub const fn year(&self) -> i32 {
        self.year
    }

    /// Returns the zero-based month.
    #[must_use]
    pub const fn month0(&self) -> u32 {
        self.month0
    }

    /// Inclusive start: day 1 at 00:00:00.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::InvalidRequest`] if the date is not
    /// representable.
    pub fn start(&self) -> Result<DateTime<Utc>, GatewayError> {
        let day = self.first_day()?;
        day.and_hms_opt(0, 0, 0)
            .map(|dt| dt.and_utc())
            .ok_or_else(|| self.out_of_range())
    }

    /// Inclusive end: the month's last day at 23:59:59.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::InvalidRequest`] if the date is not
    /// representable.
    pub fn end(&self) -> Result<DateTime<Utc>, GatewayError> {
        let last_day = self
            .first_day()?
            .checked_add_months(Months::new(1))
            .and_then(|next| next.pred_opt())
            .ok_or_else(|| self.out_of_range())?;
        last_day
            .and_hms_opt(23, 59, 59)
            .map(|dt| dt.and_utc())
            .ok_or_else(|| self.out_of_range())
    }

    fn first_day(&self) -> Result<NaiveDate, GatewayError> {
        NaiveDate::from_ymd_opt(self.year, self.month0 + 1, 1).ok_or_else(|| self.out_of_range())
    }

    fn out_of_range(&self) -> GatewayError {
        GatewayError::InvalidRequest(format!("year {} is out of range", self.year))
    }
}

//! Shared DTO types and input parsing used across multiple endpoints.

use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use serde::Deserialize;
use utoipa::{IntoParams, ToSchema};

use crate::error::GatewayError;

/// An integer that clients may send either as a JSON number or a string.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, ToSchema)]
#[serde(untagged)]
pub enum IntegerInput {
    /// `3`
    Number(i64),
    /// `"3"`
    Text(String),
}

impl IntegerInput {
    /// Returns the integer value.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::InvalidRequest`] naming `field` if the text
    /// form is not an integer.
    pub fn value(&self, field: &str) -> Result<i64, GatewayError> {
        match self {
            Self::Number(n) => Ok(*n),
            Self::Text(s) => s
                .trim()
                .parse()
                .map_err(|_| GatewayError::InvalidRequest(format!("{field} must be an integer"))),
        }
    }
}

/// Optional inclusive date bounds for list endpoints.
#[derive(Debug, Clone, Default, Deserialize, IntoParams)]
pub struct DateRangeQuery {
    /// Earliest date (`YYYY-MM-DD` or RFC 3339).
    #[serde(default)]
    pub from: Option<String>,
    /// Latest date (`YYYY-MM-DD` means end of that day).
    #[serde(default)]
    pub to: Option<String>,
}

impl DateRangeQuery {
    /// Parses both bounds.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::InvalidRequest`] if either bound is malformed.
    pub fn bounds(&self) -> Result<(Option<DateTime<Utc>>, Option<DateTime<Utc>>), GatewayError> {
        Ok((
            parse_optional_bound(self.from.as_deref(), "from", false)?,
            parse_optional_bound(self.to.as_deref(), "to", true)?,
        ))
    }
}

/// Parses a timestamp bound, treating a blank value as absent.
///
/// A bare date is expanded to the start of the day, or its last second
/// when `end_of_day` is set.
///
/// # Errors
///
/// Returns [`GatewayError::InvalidRequest`] naming `field` if the value is
/// neither RFC 3339 nor `YYYY-MM-DD`.
pub fn parse_optional_bound(
    raw: Option<&str>,
    field: &str,
    end_of_day: bool,
) -> Result<Option<DateTime<Utc>>, GatewayError> {
    let Some(raw) = raw.map(str::trim).filter(|s| !s.is_empty()) else {
        return Ok(None);
    };
    if let Ok(ts) = DateTime::parse_from_rfc3339(raw) {
        return Ok(Some(ts.with_timezone(&Utc)));
    }
    let date = parse_date(raw, field)?;
    let time = if end_of_day {
        NaiveTime::from_hms_opt(23, 59, 59)
    } else {
        Some(NaiveTime::MIN)
    };
    let time = time.ok_or_else(|| GatewayError::Internal("invalid end-of-day time".to_string()))?;
    Ok(Some(date.and_time(time).and_utc()))
}

/// Parses a calendar date from `YYYY-MM-DD` or the date part of an
/// RFC 3339 timestamp.
///
/// # Errors
///
/// Returns [`GatewayError::InvalidRequest`] naming `field` on bad input.
pub fn parse_date(raw: &str, field: &str) -> Result<NaiveDate, GatewayError> {
    let raw = raw.trim();
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .or_else(|_| DateTime::parse_from_rfc3339(raw).map(|ts| ts.date_naive()))
        .map_err(|_| {
            GatewayError::InvalidRequest(format!(
                "{field} must be YYYY-MM-DD or an RFC 3339 timestamp"
            ))
        })
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;
    use chrono::Timelike;

    #[test]
    fn integer_input_accepts_both_forms() {
        let n: IntegerInput = serde_json::from_str("3").unwrap_or(IntegerInput::Number(-1));
        let s: IntegerInput = serde_json::from_str("\" 3 \"").unwrap_or(IntegerInput::Number(-1));
        assert_eq!(n.value("month").ok(), Some(3));
        assert_eq!(s.value("month").ok(), Some(3));
        assert!(IntegerInput::Text("March".into()).value("month").is_err());
    }

    #[test]
    fn bare_dates_expand_to_day_bounds() {
        let Ok(Some(from)) = parse_optional_bound(Some("2025-03-01"), "from", false) else {
            panic!("from should parse");
        };
        let Ok(Some(to)) = parse_optional_bound(Some("2025-03-31"), "to", true) else {
            panic!("to should parse");
        };
        assert_eq!(from.hour(), 0);
        assert_eq!((to.hour(), to.minute(), to.second()), (23, 59, 59));
    }

    #[test]
    fn blank_bound_is_absent_and_garbage_is_rejected() {
        assert!(matches!(parse_optional_bound(Some("  "), "from", false), Ok(None)));
        assert!(matches!(
            parse_optional_bound(Some("yesterday"), "from", false),
            Err(GatewayError::InvalidRequest(_))
        ));
    }

    #[test]
    fn rfc3339_dates_keep_their_day() {
        let parsed = parse_date("2025-10-20T18:30:00Z", "festivalDate").ok();
        assert_eq!(parsed, NaiveDate::from_ymd_opt(2025, 10, 20));
    }
}

// Calendar window expansion: check-in/check-out pair -> one entry per night

use chrono::{Datelike, Days, NaiveDate, Weekday};
use serde::Serialize;

use crate::error::PricingError;

pub const ISO_DATE_FORMAT: &str = "%Y-%m-%d";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct StayWindow {
    check_in: NaiveDate,
    check_out: NaiveDate,
}

impl StayWindow {
    // Check-out must be strictly after check-in
    pub fn new(check_in: NaiveDate, check_out: NaiveDate) -> Result<Self, PricingError> {
        if check_out <= check_in {
            return Err(PricingError::IncompleteInput(format!(
                "check-out {} is not after check-in {}",
                check_out, check_in
            )));
        }
        Ok(Self {
            check_in,
            check_out,
        })
    }

    /// Builds a window from possibly-unset picker values.
    ///
    /// Returns `None` when either date is missing or the stay is shorter than one night.
    pub fn from_dates(check_in: Option<NaiveDate>, check_out: Option<NaiveDate>) -> Option<Self> {
        match (check_in, check_out) {
            (Some(check_in), Some(check_out)) => Self::new(check_in, check_out).ok(),
            _ => None,
        }
    }

    pub fn check_in(&self) -> NaiveDate {
        self.check_in
    }

    pub fn check_out(&self) -> NaiveDate {
        self.check_out
    }

    pub fn nights(&self) -> u32 {
        (self.check_out - self.check_in).num_days() as u32
    }

    // Every night in [check_in, check_out)
    pub fn dates(&self) -> impl Iterator<Item = NaiveDate> + '_ {
        (0..self.nights() as u64).filter_map(move |offset| {
            self.check_in.checked_add_days(Days::new(offset))
        })
    }
}

// Friday, Saturday and Sunday nights are charged at the weekend rate
pub fn is_weekend_night(date: NaiveDate) -> bool {
    matches!(date.weekday(), Weekday::Fri | Weekday::Sat | Weekday::Sun)
}

/// Parses a zero-padded `YYYY-MM-DD` date.
///
/// chrono alone accepts `2025-6-1`; seasonal lookups rely on dates that
/// order lexicographically, so the padded width is enforced here.
pub fn parse_iso_date(value: &str) -> Result<NaiveDate, PricingError> {
    let invalid = || PricingError::InvalidDate {
        value: value.to_string(),
    };

    if value.len() != 10 {
        return Err(invalid());
    }
    NaiveDate::parse_from_str(value, ISO_DATE_FORMAT).map_err(|_| invalid())
}

// serde adapter for store rows, `#[serde(with = "iso_date")]`
pub mod iso_date {
    use chrono::NaiveDate;
    use serde::{de, Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(date: &NaiveDate, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(&date.format(super::ISO_DATE_FORMAT))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<NaiveDate, D::Error> {
        let value = String::deserialize(deserializer)?;
        super::parse_iso_date(&value).map_err(de::Error::custom)
    }
}

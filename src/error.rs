use chrono::NaiveDate;
use thiserror::Error;

// Errors raised while preparing or submitting a quote.
// Resolving a price itself never fails: missing input just yields no breakdown.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PricingError {
    // Missing dates or check-out not after check-in
    #[error("Incomplete input: {0}")]
    IncompleteInput(String),

    #[error("Invalid date '{value}': expected YYYY-MM-DD")]
    InvalidDate { value: String },

    #[error("Invalid rate sheet: {0}")]
    InvalidRateSheet(String),

    #[error("{requested} guests exceeds the limit of {max}")]
    GuestLimitExceeded { requested: u32, max: u32 },

    #[error("Stay includes unavailable nights: {}", format_dates(.0))]
    UnavailableNights(Vec<NaiveDate>),
}

fn format_dates(dates: &[NaiveDate]) -> String {
    dates
        .iter()
        .map(|d| d.format("%Y-%m-%d").to_string())
        .collect::<Vec<_>>()
        .join(", ")
}

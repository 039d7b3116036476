// Currency-rate refresh: ECB daily reference rates (EUR base)

use async_trait::async_trait;
use chrono::NaiveDate;
use rand::Rng;
use quick_xml::events::{BytesStart, Event};
use quick_xml::reader::Reader;
use std::collections::BTreeMap;
use std::time::Duration;
use thiserror::Error;
use tracing::{info, warn};

use crate::calendar::parse_iso_date;
use crate::money::Money;

pub const ECB_DAILY_URL: &str = "https://www.ecb.europa.eu/stats/eurofxref/eurofxref-daily.xml";
pub const BASE_CURRENCY: &str = "EUR";

#[derive(Error, Debug)]
pub enum FxError {
    #[error("Network error: {0}")]
    NetworkError(String),

    #[error("Rate feed returned HTTP {0}")]
    HttpStatus(u16),

    #[error("Rate feed is throttling requests (retry after {retry_after:?})")]
    RateLimited { retry_after: Option<Duration> },

    #[error("XML parse error: {0}")]
    XmlParseError(String),

    #[error("Rate feed has no rates")]
    EmptyFeed,

    #[error("Invalid rate for {currency}: {value}")]
    InvalidRate { currency: String, value: String },

    #[error("No rate for currency {0}")]
    UnknownCurrency(String),

    #[error("Client error: {0}")]
    ClientError(String),
}

/// Retry schedule for one refresh of the daily feed.
///
/// The feed changes once per working day and the previous table stays valid
/// meanwhile, so a refresh gives up once `attempts` requests have failed or
/// the next wait would push total waiting past `give_up_after`.
#[derive(Debug, Clone)]
pub struct RetryConfig {
    pub attempts: u32,
    pub first_delay: Duration,
    pub give_up_after: Duration,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            attempts: 4,
            first_delay: Duration::from_secs(2),
            give_up_after: Duration::from_secs(60),
        }
    }
}

impl RetryConfig {
    // Doubling delay, jittered into [half, full] so parallel refreshes spread out
    pub fn delay_for(&self, retry: u32) -> Duration {
        let full = self
            .first_delay
            .saturating_mul(1u32 << retry.min(16))
            .min(self.give_up_after);
        let full_ms = full.as_millis() as u64;
        Duration::from_millis(rand::thread_rng().gen_range(full_ms / 2..=full_ms))
    }

    /// Wait before the next request, or `None` when the refresh should stop.
    ///
    /// `attempt` counts requests made so far (1 after the first failure) and
    /// `waited` is the time already spent sleeping between them.
    pub fn next_delay(&self, attempt: u32, waited: Duration, error: &FxError) -> Option<Duration> {
        if attempt >= self.attempts || !is_retryable(error) {
            return None;
        }
        let delay = match error {
            FxError::RateLimited {
                retry_after: Some(retry_after),
            } => *retry_after,
            _ => self.delay_for(attempt - 1),
        };
        (waited + delay <= self.give_up_after).then_some(delay)
    }
}

#[derive(Debug, Clone)]
pub struct FxConfig {
    pub url: String,
    pub timeout_ms: u64,
    pub retry: RetryConfig,
}

impl Default for FxConfig {
    fn default() -> Self {
        Self {
            url: ECB_DAILY_URL.to_string(),
            timeout_ms: 5000,
            retry: RetryConfig::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct RateTable {
    pub as_of: Option<NaiveDate>,
    // Units of each currency per one EUR
    pub rates: BTreeMap<String, f64>,
}

impl RateTable {
    pub fn rate(&self, currency: &str) -> Result<f64, FxError> {
        if currency == BASE_CURRENCY {
            return Ok(1.0);
        }
        self.rates
            .get(currency)
            .copied()
            .ok_or_else(|| FxError::UnknownCurrency(currency.to_string()))
    }

    // Rounded to the nearest minor unit
    pub fn convert(&self, amount: Money, from: &str, to: &str) -> Result<Money, FxError> {
        if from == to {
            return Ok(amount);
        }
        let factor = self.rate(to)? / self.rate(from)?;
        Ok(Money::from_cents(
            (amount.cents() as f64 * factor).round() as i64,
        ))
    }
}

/// Parses the ECB `eurofxref-daily.xml` document.
///
/// Rates live on `<Cube currency=".." rate=".."/>` elements nested under a
/// `<Cube time="YYYY-MM-DD">` element.
pub fn parse_ecb_daily(xml: &str) -> Result<RateTable, FxError> {
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(true);

    let mut table = RateTable {
        as_of: None,
        rates: BTreeMap::new(),
    };

    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) | Ok(Event::Empty(e)) if e.local_name().as_ref() == b"Cube" => {
                read_cube(&e, &mut table)?;
            }
            Ok(Event::Eof) => break,
            Err(e) => {
                return Err(FxError::XmlParseError(format!(
                    "at position {}: {}",
                    reader.error_position(),
                    e
                )))
            }
            _ => (),
        }
    }

    if table.rates.is_empty() {
        return Err(FxError::EmptyFeed);
    }
    Ok(table)
}

fn read_cube(element: &BytesStart, table: &mut RateTable) -> Result<(), FxError> {
    let mut currency = None;
    let mut rate = None;

    for attr in element.attributes() {
        let attr = attr.map_err(|e| FxError::XmlParseError(e.to_string()))?;
        let value = String::from_utf8_lossy(&attr.value).into_owned();
        match attr.key.as_ref() {
            b"time" => {
                let date = parse_iso_date(&value)
                    .map_err(|e| FxError::XmlParseError(e.to_string()))?;
                table.as_of = Some(date);
            }
            b"currency" => currency = Some(value),
            b"rate" => rate = Some(value),
            _ => (),
        }
    }

    if let (Some(currency), Some(rate)) = (currency, rate) {
        let parsed = rate
            .parse::<f64>()
            .ok()
            .filter(|r| r.is_finite() && *r > 0.0)
            .ok_or_else(|| FxError::InvalidRate {
                currency: currency.clone(),
                value: rate.clone(),
            })?;
        table.rates.insert(currency, parsed);
    }
    Ok(())
}

#[async_trait]
pub trait RateSource: Send + Sync {
    async fn latest(&self) -> Result<RateTable, FxError>;
}

// Fixed table, for offline use
pub struct StaticRateSource {
    table: RateTable,
}

impl StaticRateSource {
    pub fn new(table: RateTable) -> Self {
        Self { table }
    }
}

#[async_trait]
impl RateSource for StaticRateSource {
    async fn latest(&self) -> Result<RateTable, FxError> {
        Ok(self.table.clone())
    }
}

pub struct EcbRateSource {
    client: reqwest::Client,
    config: FxConfig,
}

impl EcbRateSource {
    pub fn new(config: FxConfig) -> Result<Self, FxError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_millis(config.timeout_ms))
            .build()
            .map_err(|e| FxError::ClientError(e.to_string()))?;
        Ok(Self { client, config })
    }

    async fn fetch_once(&self) -> Result<RateTable, FxError> {
        let response = self
            .client
            .get(&self.config.url)
            .send()
            .await
            .map_err(|e| FxError::NetworkError(e.to_string()))?;

        let status = response.status();
        if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
            return Err(FxError::RateLimited {
                retry_after: retry_after_seconds(response.headers()),
            });
        }
        if !status.is_success() {
            return Err(FxError::HttpStatus(status.as_u16()));
        }

        let body = response
            .text()
            .await
            .map_err(|e| FxError::NetworkError(e.to_string()))?;
        parse_ecb_daily(&body)
    }
}

// Only the delta-seconds form of Retry-After; an HTTP date falls back to the schedule
fn retry_after_seconds(headers: &reqwest::header::HeaderMap) -> Option<Duration> {
    headers
        .get(reqwest::header::RETRY_AFTER)?
        .to_str()
        .ok()?
        .trim()
        .parse::<u64>()
        .ok()
        .map(Duration::from_secs)
}

fn is_retryable(error: &FxError) -> bool {
    match error {
        FxError::NetworkError(_) | FxError::RateLimited { .. } => true,
        FxError::HttpStatus(status) => *status >= 500,
        _ => false,
    }
}

#[async_trait]
impl RateSource for EcbRateSource {
    async fn latest(&self) -> Result<RateTable, FxError> {
        let retry = &self.config.retry;
        let mut attempt = 0;
        let mut waited = Duration::ZERO;

        loop {
            attempt += 1;
            match self.fetch_once().await {
                Ok(table) => {
                    info!(
                        as_of = ?table.as_of,
                        currencies = table.rates.len(),
                        "refreshed currency rates"
                    );
                    return Ok(table);
                }
                Err(e) => match retry.next_delay(attempt, waited, &e) {
                    Some(delay) => {
                        warn!(attempt, ?delay, error = %e, "rate refresh failed, retrying");
                        tokio::time::sleep(delay).await;
                        waited += delay;
                    }
                    None => {
                        warn!(attempt, ?waited, error = %e, "rate refresh failed, keeping previous rates");
                        return Err(e);
                    }
                },
            }
        }
    }
}

pub const SAMPLE_ECB_PATH: &str = "samples/eurofxref-daily.xml";

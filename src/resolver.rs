// Nightly price resolver: per-night rate selection plus totals

use chrono::NaiveDate;
use serde::Serialize;
use tracing::debug;

use crate::calendar::{is_weekend_night, iso_date, StayWindow};
use crate::money::{major_units, Money};
use crate::rates::RateSheet;

// Which rule produced a night's price
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PriceSource {
    Override,
    Season,
    Weekend,
    Default,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct NightlyRate {
    #[serde(with = "iso_date")]
    pub date: NaiveDate,
    #[serde(with = "major_units")]
    pub price: Money,
    pub source: PriceSource,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct PriceBreakdown {
    pub nights: u32,
    pub nightly: Vec<NightlyRate>,
    #[serde(with = "major_units")]
    pub average_nightly_rate: Money,
    #[serde(with = "major_units")]
    pub subtotal: Money,
    #[serde(with = "major_units")]
    pub cleaning_fee: Money,
    #[serde(with = "major_units")]
    pub tourist_tax: Money,
    #[serde(with = "major_units")]
    pub promo_discount: Money,
    #[serde(with = "major_units")]
    pub total: Money,
}

pub struct NightlyPriceResolver<'a> {
    sheet: &'a RateSheet,
}

impl<'a> NightlyPriceResolver<'a> {
    pub fn new(sheet: &'a RateSheet) -> Self {
        Self { sheet }
    }

    /// Prices a stay from the raw picker values.
    ///
    /// `None` means the input is not yet complete (a date is missing or the
    /// stay is shorter than one night). Callers hide the booking summary and
    /// keep submission disabled until a breakdown is available.
    pub fn resolve(
        &self,
        check_in: Option<NaiveDate>,
        check_out: Option<NaiveDate>,
        guests: u32,
    ) -> Option<PriceBreakdown> {
        match StayWindow::from_dates(check_in, check_out) {
            Some(window) => Some(self.resolve_window(&window, guests)),
            None => {
                debug!(?check_in, ?check_out, "stay window not computable");
                None
            }
        }
    }

    pub fn resolve_window(&self, window: &StayWindow, guests: u32) -> PriceBreakdown {
        let config = &self.sheet.config;
        let nightly: Vec<NightlyRate> = window.dates().map(|date| self.rate_for(date)).collect();

        let nights = window.nights();
        let subtotal: Money = nightly.iter().map(|night| night.price).sum();
        let average_nightly_rate = subtotal.div_round_major(nights as i64);
        let tourist_tax = config.tourist_tax_per_guest_per_night * guests as i64 * nights as i64;
        let promo_discount = self
            .sheet
            .promotion
            .as_ref()
            .map_or(Money::zero(), |promotion| {
                self.sheet.promotion_policy.discount(promotion, subtotal)
            });
        let total = (subtotal + config.cleaning_fee + tourist_tax - promo_discount).floor_zero();

        debug!(
            check_in = %window.check_in(),
            nights,
            guests,
            subtotal = %subtotal,
            total = %total,
            "resolved stay price"
        );

        PriceBreakdown {
            nights,
            nightly,
            average_nightly_rate,
            subtotal,
            cleaning_fee: config.cleaning_fee,
            tourist_tax,
            promo_discount,
            total,
        }
    }

    // Override -> season -> weekend -> default, first match wins
    pub fn rate_for(&self, date: NaiveDate) -> NightlyRate {
        let config = &self.sheet.config;

        let (price, source) = if let Some(price) = self
            .sheet
            .override_for(date)
            .and_then(|entry| entry.effective_price())
        {
            (price, PriceSource::Override)
        } else if let Some(season) = self.sheet.season_for(date) {
            (season.price, PriceSource::Season)
        } else if let Some(price) = config
            .effective_weekend_price()
            .filter(|_| is_weekend_night(date))
        {
            (price, PriceSource::Weekend)
        } else {
            (config.default_price, PriceSource::Default)
        };

        NightlyRate {
            date,
            price,
            source,
        }
    }
}

// Booking session: explicit per-visitor context (locale, property, stay inputs).
// Passed to whatever renders the booking sidebar instead of living in globals.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use tracing::{debug, warn};

use crate::cache::{PriceCache, QuoteKey};
use crate::calendar::{iso_date, StayWindow};
use crate::error::PricingError;
use crate::money::Money;
use crate::property::{PropertyProfile, PropertySlug};
use crate::resolver::PriceBreakdown;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Locale {
    #[default]
    En,
    Fr,
    Ru,
}

impl Locale {
    pub fn as_str(&self) -> &'static str {
        match self {
            Locale::En => "en",
            Locale::Fr => "fr",
            Locale::Ru => "ru",
        }
    }
}

impl fmt::Display for Locale {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Locale {
    type Err = String;

    // Accepts browser-style tags such as "fr-FR"
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let language = s.split(|c: char| c == '-' || c == '_').next().unwrap_or_default();
        match language.to_lowercase().as_str() {
            "en" => Ok(Locale::En),
            "fr" => Ok(Locale::Fr),
            "ru" => Ok(Locale::Ru),
            _ => Err(format!("unsupported locale: {}", s)),
        }
    }
}

pub fn currency_symbol(code: &str) -> &str {
    match code {
        "EUR" => "€",
        "USD" => "$",
        "GBP" => "£",
        "RUB" => "₽",
        "CHF" => "CHF",
        other => other,
    }
}

/// Payload handed to the payment provider integration.
///
/// `amount` is in minor units, which is what checkout APIs expect.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CheckoutRequest {
    pub property: PropertySlug,
    #[serde(with = "iso_date")]
    pub check_in: NaiveDate,
    #[serde(with = "iso_date")]
    pub check_out: NaiveDate,
    pub guests: u32,
    pub nights: u32,
    pub amount: Money,
    pub currency: String,
    pub locale: Locale,
}

pub struct BookingSession {
    locale: Locale,
    property: Arc<PropertyProfile>,
    check_in: Option<NaiveDate>,
    check_out: Option<NaiveDate>,
    guests: u32,
    cache: Arc<dyn PriceCache>,
}

impl BookingSession {
    pub fn new(property: Arc<PropertyProfile>, cache: Arc<dyn PriceCache>) -> Self {
        Self {
            locale: Locale::default(),
            property,
            check_in: None,
            check_out: None,
            guests: 1,
            cache,
        }
    }

    pub fn with_locale(mut self, locale: Locale) -> Self {
        self.locale = locale;
        self
    }

    pub fn locale(&self) -> Locale {
        self.locale
    }

    pub fn set_locale(&mut self, locale: Locale) {
        self.locale = locale;
    }

    pub fn property(&self) -> &PropertyProfile {
        &self.property
    }

    // Switching listing keeps the chosen dates and guests
    pub fn set_property(&mut self, property: Arc<PropertyProfile>) {
        self.property = property;
    }

    pub fn set_dates(&mut self, check_in: Option<NaiveDate>, check_out: Option<NaiveDate>) {
        self.check_in = check_in;
        self.check_out = check_out;
    }

    pub fn guests(&self) -> u32 {
        self.guests
    }

    pub fn set_guests(&mut self, guests: u32) {
        self.guests = guests;
    }

    pub fn window(&self) -> Option<StayWindow> {
        StayWindow::from_dates(self.check_in, self.check_out)
    }

    /// Current price for the session inputs; `None` until the stay is complete.
    ///
    /// Re-run after any input change. Identical inputs are answered from the cache.
    pub fn quote(&self) -> Option<PriceBreakdown> {
        let window = self.window()?;
        let key = QuoteKey::new(
            self.property.slug,
            window,
            self.guests,
            Arc::clone(&self.property.rates),
        );
        Some(self.cache.quote(key))
    }

    // Grand total formatted for the sidebar, e.g. "€332.00"
    pub fn display_total(&self) -> Option<String> {
        let breakdown = self.quote()?;
        Some(
            breakdown
                .total
                .format(currency_symbol(&self.property.currency), self.locale),
        )
    }

    pub fn checkout_request(&self) -> Result<CheckoutRequest, PricingError> {
        let window = self.window().ok_or_else(|| {
            PricingError::IncompleteInput("check-in and check-out dates are required".to_string())
        })?;

        if self.guests == 0 {
            return Err(PricingError::IncompleteInput(
                "at least one guest is required".to_string(),
            ));
        }
        if self.guests > self.property.max_guests {
            warn!(
                property = %self.property.slug,
                guests = self.guests,
                max = self.property.max_guests,
                "guest count over property limit"
            );
            return Err(PricingError::GuestLimitExceeded {
                requested: self.guests,
                max: self.property.max_guests,
            });
        }

        let unavailable = self.property.rates.unavailable_nights(&window);
        if !unavailable.is_empty() {
            warn!(property = %self.property.slug, ?unavailable, "stay overlaps closed nights");
            return Err(PricingError::UnavailableNights(unavailable));
        }

        let breakdown = self
            .quote()
            .ok_or_else(|| PricingError::IncompleteInput("stay is not computable".to_string()))?;

        debug!(
            property = %self.property.slug,
            amount = %breakdown.total,
            currency = %self.property.currency,
            "prepared checkout request"
        );

        Ok(CheckoutRequest {
            property: self.property.slug,
            check_in: window.check_in(),
            check_out: window.check_out(),
            guests: self.guests,
            nights: breakdown.nights,
            amount: breakdown.total,
            currency: self.property.currency.clone(),
            locale: self.locale,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::{CacheConfig, NoCache, QuoteCache};
    use crate::calendar::parse_iso_date;
    use crate::money::Percent;
    use crate::rates::{AvailabilityOverride, Promotion, RateConfig, RateSheet};
    use test_case::test_case;

    fn date(value: &str) -> NaiveDate {
        parse_iso_date(value).unwrap()
    }

    fn georgia() -> Arc<PropertyProfile> {
        let mut sheet = RateSheet::new(RateConfig {
            default_price: Money::from_major(100),
            weekend_price: Some(Money::from_major(150)),
            cleaning_fee: Money::from_major(50),
            tourist_tax_per_guest_per_night: Money::from_major(2),
        });
        sheet.promotion = Some(Promotion::percent(Percent::whole(10)));
        sheet.availability.push(AvailabilityOverride {
            date: date("2025-06-20"),
            price_override: None,
            is_available: Some(false),
        });

        Arc::new(PropertyProfile {
            slug: PropertySlug::Georgia,
            name: "Georgia".to_string(),
            currency: "EUR".to_string(),
            max_guests: 4,
            amenities: vec![],
            rates: Arc::new(sheet),
        })
    }

    fn session() -> BookingSession {
        BookingSession::new(georgia(), Arc::new(QuoteCache::new(CacheConfig::default())))
    }

    #[test_case("en", Locale::En; "#1 plain")]
    #[test_case("fr-FR", Locale::Fr; "#2 region tag")]
    #[test_case("ru_RU", Locale::Ru; "#3 underscore tag")]
    #[test_case("FR", Locale::Fr; "#4 uppercase")]
    fn test_parse_locale(value: &str, expected: Locale) {
        assert_eq!(value.parse::<Locale>().unwrap(), expected);
    }

    #[test]
    fn test_unsupported_locale() {
        assert!("de-DE".parse::<Locale>().is_err());
    }

    #[test]
    fn test_quote_follows_input_changes() {
        let mut session = session();
        assert!(session.quote().is_none());
        assert!(session.display_total().is_none());

        session.set_dates(Some(date("2025-06-13")), None);
        assert!(session.quote().is_none());

        session.set_dates(Some(date("2025-06-13")), Some(date("2025-06-15")));
        session.set_guests(3);
        let breakdown = session.quote().unwrap();
        assert_eq!(breakdown.subtotal, Money::from_major(300));
        assert_eq!(breakdown.total, Money::from_major(332));

        session.set_guests(1);
        let breakdown = session.quote().unwrap();
        assert_eq!(breakdown.tourist_tax, Money::from_major(4));
        assert_eq!(breakdown.total, Money::from_major(324));
    }

    #[test]
    fn test_repeated_quotes_hit_cache() {
        let cache = Arc::new(QuoteCache::default());
        let mut session = BookingSession::new(georgia(), cache.clone());
        session.set_dates(Some(date("2025-06-13")), Some(date("2025-06-15")));

        let first = session.quote();
        let second = session.quote();
        assert_eq!(first, second);
        assert_eq!(cache.stats().hit_count, 1);
        assert_eq!(cache.stats().miss_count, 1);
    }

    #[test]
    fn test_cache_choice_does_not_change_result() {
        let mut cached = session();
        let mut uncached = BookingSession::new(georgia(), Arc::new(NoCache::default()));
        for s in [&mut cached, &mut uncached] {
            s.set_dates(Some(date("2025-06-10")), Some(date("2025-06-19")));
            s.set_guests(2);
        }
        assert_eq!(cached.quote(), uncached.quote());
        assert_eq!(cached.quote(), uncached.quote());
    }

    #[test_case(Locale::En, "€332.00"; "#1 english")]
    #[test_case(Locale::Fr, "332,00 €"; "#2 french")]
    fn test_display_total(locale: Locale, expected: &str) {
        let mut session = session().with_locale(locale);
        session.set_dates(Some(date("2025-06-13")), Some(date("2025-06-15")));
        session.set_guests(3);
        assert_eq!(session.display_total().as_deref(), Some(expected));
    }

    #[test]
    fn test_checkout_request() {
        let mut session = session().with_locale(Locale::Ru);
        session.set_dates(Some(date("2025-06-13")), Some(date("2025-06-15")));
        session.set_guests(3);

        let request = session.checkout_request().unwrap();
        assert_eq!(request.property, PropertySlug::Georgia);
        assert_eq!(request.nights, 2);
        assert_eq!(request.amount, Money::from_major(332));
        assert_eq!(request.currency, "EUR");

        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["amount"], 33200);
        assert_eq!(json["check_in"], "2025-06-13");
        assert_eq!(json["property"], "georgia");
        assert_eq!(json["locale"], "ru");
    }

    #[test]
    fn test_checkout_requires_complete_input() {
        let mut session = session();
        assert!(matches!(
            session.checkout_request(),
            Err(PricingError::IncompleteInput(_))
        ));

        session.set_dates(Some(date("2025-06-13")), Some(date("2025-06-15")));
        session.set_guests(0);
        assert!(matches!(
            session.checkout_request(),
            Err(PricingError::IncompleteInput(_))
        ));
    }

    #[test]
    fn test_checkout_rejects_too_many_guests() {
        let mut session = session();
        session.set_dates(Some(date("2025-06-13")), Some(date("2025-06-15")));
        session.set_guests(5);
        assert_eq!(
            session.checkout_request(),
            Err(PricingError::GuestLimitExceeded {
                requested: 5,
                max: 4
            })
        );
    }

    #[test]
    fn test_checkout_rejects_closed_nights() {
        let mut session = session();
        session.set_dates(Some(date("2025-06-18")), Some(date("2025-06-22")));
        assert_eq!(
            session.checkout_request(),
            Err(PricingError::UnavailableNights(vec![date("2025-06-20")]))
        );

        // Leaving on the closed date is fine
        session.set_dates(Some(date("2025-06-18")), Some(date("2025-06-20")));
        assert!(session.checkout_request().is_ok());
    }
}

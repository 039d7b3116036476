// Rate inputs exported by the property-management store.
// All of these are read-only for the duration of a calculation.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::calendar::{iso_date, StayWindow};
use crate::error::PricingError;
use crate::money::{major_units, Money, Percent};

// Manually edited price/availability for a single date
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AvailabilityOverride {
    #[serde(with = "iso_date")]
    pub date: NaiveDate,
    #[serde(default, with = "major_units::option")]
    pub price_override: Option<Money>,
    #[serde(default)]
    pub is_available: Option<bool>,
}

impl AvailabilityOverride {
    // A zero override is treated the same as no override
    pub fn effective_price(&self) -> Option<Money> {
        self.price_override.filter(|price| !price.is_zero())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SeasonalRate {
    #[serde(with = "iso_date")]
    pub start_date: NaiveDate,
    #[serde(with = "iso_date")]
    pub end_date: NaiveDate,
    #[serde(with = "major_units")]
    pub price: Money,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
}

impl SeasonalRate {
    // Inclusive on both ends
    pub fn contains(&self, date: NaiveDate) -> bool {
        self.start_date <= date && date <= self.end_date
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RateConfig {
    #[serde(with = "major_units")]
    pub default_price: Money,
    #[serde(default, with = "major_units::option")]
    pub weekend_price: Option<Money>,
    #[serde(default, with = "major_units")]
    pub cleaning_fee: Money,
    #[serde(default, with = "major_units")]
    pub tourist_tax_per_guest_per_night: Money,
}

impl RateConfig {
    pub fn new(default_price: Money) -> Self {
        Self {
            default_price,
            weekend_price: None,
            cleaning_fee: Money::zero(),
            tourist_tax_per_guest_per_night: Money::zero(),
        }
    }

    pub fn effective_weekend_price(&self) -> Option<Money> {
        self.weekend_price.filter(|price| !price.is_zero())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Promotion {
    #[serde(default)]
    pub percent_off: Option<Percent>,
    #[serde(default, with = "major_units::option")]
    pub amount_off: Option<Money>,
}

impl Promotion {
    pub fn percent(percent_off: Percent) -> Self {
        Self {
            percent_off: Some(percent_off),
            amount_off: None,
        }
    }

    pub fn amount(amount_off: Money) -> Self {
        Self {
            percent_off: None,
            amount_off: Some(amount_off),
        }
    }

    pub fn effective_percent(&self) -> Option<Percent> {
        self.percent_off.filter(|p| !p.is_zero())
    }

    pub fn effective_amount(&self) -> Option<Money> {
        self.amount_off.filter(|a| !a.is_zero())
    }
}

/// How a promotion carrying both a percentage and a fixed amount is applied.
///
/// The booking widget has always let the fixed amount replace the percentage,
/// so that stays the default. `LargestDiscount` gives the guest whichever of
/// the two is worth more. The two are never combined.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PromotionPolicy {
    #[default]
    AmountOverridesPercent,
    LargestDiscount,
}

impl PromotionPolicy {
    pub fn discount(&self, promotion: &Promotion, subtotal: Money) -> Money {
        let by_percent = promotion
            .effective_percent()
            .map(|percent| subtotal.percent_round_major(percent));
        let by_amount = promotion.effective_amount();

        match (self, by_percent, by_amount) {
            (_, None, None) => Money::zero(),
            (_, Some(percent), None) => percent,
            (_, None, Some(amount)) => amount,
            (PromotionPolicy::AmountOverridesPercent, Some(_), Some(amount)) => amount,
            (PromotionPolicy::LargestDiscount, Some(percent), Some(amount)) => percent.max(amount),
        }
    }
}

// Everything the resolver needs for one property
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RateSheet {
    pub config: RateConfig,
    #[serde(default)]
    pub availability: Vec<AvailabilityOverride>,
    #[serde(default)]
    pub seasons: Vec<SeasonalRate>,
    #[serde(default)]
    pub promotion: Option<Promotion>,
    #[serde(default)]
    pub promotion_policy: PromotionPolicy,
}

impl RateSheet {
    pub fn new(config: RateConfig) -> Self {
        Self {
            config,
            availability: Vec::new(),
            seasons: Vec::new(),
            promotion: None,
            promotion_policy: PromotionPolicy::default(),
        }
    }

    pub fn from_json(json: &str) -> Result<Self, PricingError> {
        serde_json::from_str(json).map_err(|e| PricingError::InvalidRateSheet(e.to_string()))
    }

    // First entry for the date wins when the store holds duplicates
    pub fn override_for(&self, date: NaiveDate) -> Option<&AvailabilityOverride> {
        self.availability.iter().find(|entry| entry.date == date)
    }

    // Seasons may overlap; list order decides
    pub fn season_for(&self, date: NaiveDate) -> Option<&SeasonalRate> {
        self.seasons.iter().find(|season| season.contains(date))
    }

    /// Nights of the stay the manager has explicitly closed.
    pub fn unavailable_nights(&self, window: &StayWindow) -> Vec<NaiveDate> {
        window
            .dates()
            .filter(|date| {
                self.override_for(*date)
                    .map_or(false, |entry| entry.is_available == Some(false))
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::calendar::parse_iso_date;
    use test_case::test_case;

    fn date(value: &str) -> NaiveDate {
        parse_iso_date(value).unwrap()
    }

    const SAMPLE_SHEET: &str = r#"{
        "config": {
            "default_price": 100,
            "weekend_price": 150,
            "cleaning_fee": 50,
            "tourist_tax_per_guest_per_night": 2
        },
        "availability": [
            { "date": "2025-06-14", "price_override": 120 },
            { "date": "2025-06-15", "is_available": false },
            { "date": "2025-06-16", "price_override": 0, "is_available": true }
        ],
        "seasons": [
            { "start_date": "2025-07-01", "end_date": "2025-08-31", "price": 180, "label": "summer" }
        ],
        "promotion": { "percent_off": 10 }
    }"#;

    #[test]
    fn test_load_rate_sheet_from_json() {
        let sheet = RateSheet::from_json(SAMPLE_SHEET).unwrap();

        assert_eq!(sheet.config.default_price, Money::from_major(100));
        assert_eq!(sheet.config.weekend_price, Some(Money::from_major(150)));
        assert_eq!(sheet.config.cleaning_fee, Money::from_major(50));
        assert_eq!(sheet.availability.len(), 3);
        assert_eq!(sheet.availability[1].price_override, None);
        assert_eq!(sheet.seasons[0].label.as_deref(), Some("summer"));
        assert_eq!(sheet.promotion, Some(Promotion::percent(Percent::whole(10))));
        assert_eq!(
            sheet.promotion_policy,
            PromotionPolicy::AmountOverridesPercent
        );
    }

    #[test]
    fn test_rate_sheet_rejects_unpadded_dates() {
        let json = r#"{
            "config": { "default_price": 100 },
            "seasons": [{ "start_date": "2025-7-1", "end_date": "2025-08-31", "price": 180 }]
        }"#;
        let err = RateSheet::from_json(json).unwrap_err();
        assert!(
            matches!(err, PricingError::InvalidRateSheet(ref msg) if msg.contains("2025-7-1")),
            "unexpected error: {:?}",
            err
        );
    }

    #[test]
    fn test_zero_override_is_not_effective() {
        let sheet = RateSheet::from_json(SAMPLE_SHEET).unwrap();
        let entry = sheet.override_for(date("2025-06-16")).unwrap();
        assert_eq!(entry.price_override, Some(Money::zero()));
        assert_eq!(entry.effective_price(), None);
    }

    #[test]
    fn test_season_range_is_inclusive() {
        let season = SeasonalRate {
            start_date: date("2025-07-01"),
            end_date: date("2025-07-31"),
            price: Money::from_major(80),
            label: None,
        };
        assert!(!season.contains(date("2025-06-30")));
        assert!(season.contains(date("2025-07-01")));
        assert!(season.contains(date("2025-07-31")));
        assert!(!season.contains(date("2025-08-01")));
    }

    #[test]
    fn test_first_overlapping_season_wins() {
        let mut sheet = RateSheet::new(RateConfig::new(Money::from_major(100)));
        sheet.seasons = vec![
            SeasonalRate {
                start_date: date("2025-07-01"),
                end_date: date("2025-08-31"),
                price: Money::from_major(180),
                label: None,
            },
            SeasonalRate {
                start_date: date("2025-07-14"),
                end_date: date("2025-07-14"),
                price: Money::from_major(250),
                label: None,
            },
        ];
        let season = sheet.season_for(date("2025-07-14")).unwrap();
        assert_eq!(season.price, Money::from_major(180));
    }

    #[test]
    fn test_unavailable_nights() {
        let sheet = RateSheet::from_json(SAMPLE_SHEET).unwrap();
        let window = StayWindow::new(date("2025-06-13"), date("2025-06-18")).unwrap();
        assert_eq!(sheet.unavailable_nights(&window), vec![date("2025-06-15")]);

        // Check-out day itself is not a night of the stay
        let window = StayWindow::new(date("2025-06-13"), date("2025-06-15")).unwrap();
        assert!(sheet.unavailable_nights(&window).is_empty());
    }

    #[test_case(None, None, PromotionPolicy::AmountOverridesPercent, 0; "#1 no promotion values")]
    #[test_case(Some(10), None, PromotionPolicy::AmountOverridesPercent, 30; "#2 percent only")]
    #[test_case(None, Some(40), PromotionPolicy::AmountOverridesPercent, 40; "#3 amount only")]
    #[test_case(Some(10), Some(400), PromotionPolicy::AmountOverridesPercent, 400; "#4 amount replaces percent")]
    #[test_case(Some(50), Some(20), PromotionPolicy::AmountOverridesPercent, 20; "#5 amount replaces larger percent")]
    #[test_case(Some(50), Some(20), PromotionPolicy::LargestDiscount, 150; "#6 largest picks percent")]
    #[test_case(Some(10), Some(40), PromotionPolicy::LargestDiscount, 40; "#7 largest picks amount")]
    #[test_case(Some(0), Some(0), PromotionPolicy::AmountOverridesPercent, 0; "#8 zeros are absent")]
    #[test_case(Some(10), Some(0), PromotionPolicy::AmountOverridesPercent, 30; "#9 zero amount falls back to percent")]
    fn test_promotion_policy_discount(
        percent_off: Option<u32>,
        amount_off: Option<i64>,
        policy: PromotionPolicy,
        expected: i64,
    ) {
        let promotion = Promotion {
            percent_off: percent_off.map(Percent::whole),
            amount_off: amount_off.map(Money::from_major),
        };
        assert_eq!(
            policy.discount(&promotion, Money::from_major(300)),
            Money::from_major(expected)
        );
    }

    #[test_case("12.5", 38; "#1 fractional percent")]
    #[test_case("10", 30; "#2 whole percent")]
    #[test_case("0.5", 2; "#3 half a percent of 300 rounds half up")]
    fn test_fractional_percent_from_json(percent: &str, expected: i64) {
        let json = format!(
            r#"{{"config":{{"default_price":100}},"promotion":{{"percent_off":{}}}}}"#,
            percent
        );
        let sheet = RateSheet::from_json(&json).unwrap();
        let promotion = sheet.promotion.as_ref().unwrap();
        assert_eq!(
            sheet.promotion_policy.discount(promotion, Money::from_major(300)),
            Money::from_major(expected)
        );
    }

    #[test]
    fn test_negative_percent_rejects_sheet() {
        let json = r#"{"config":{"default_price":100},"promotion":{"percent_off":-10}}"#;
        let err = RateSheet::from_json(json).unwrap_err();
        assert!(
            matches!(err, PricingError::InvalidRateSheet(ref msg) if msg.contains("percentage")),
            "unexpected error: {:?}",
            err
        );
    }
}

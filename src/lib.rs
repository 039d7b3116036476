// Pricing core for the vacation-rental booking site

pub mod cache;
pub mod calendar;
pub mod error;
pub mod fx;
pub mod money;
pub mod property;
pub mod rates;
pub mod resolver;
pub mod session;

// Re-export key types for convenience
pub use cache::{CacheConfig, CacheStatsReport, EvictionPolicy, NoCache, PriceCache, QuoteCache, QuoteKey};
pub use calendar::{is_weekend_night, parse_iso_date, StayWindow};
pub use error::PricingError;
pub use fx::{EcbRateSource, FxConfig, FxError, RateSource, RateTable, RetryConfig};
pub use money::{Money, Percent};
pub use property::{AmenityTag, Catalog, CatalogError, PropertyProfile, PropertySlug};
pub use rates::{
    AvailabilityOverride, Promotion, PromotionPolicy, RateConfig, RateSheet, SeasonalRate,
};
pub use resolver::{NightlyPriceResolver, NightlyRate, PriceBreakdown, PriceSource};
pub use session::{BookingSession, CheckoutRequest, Locale};

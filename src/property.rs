// Property catalog: the three rentals, their amenities and rate sheets

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use thiserror::Error;
use tracing::info;

use crate::rates::RateSheet;

#[derive(Error, Debug)]
pub enum CatalogError {
    #[error("Unknown property: {0}")]
    UnknownProperty(String),

    #[error("Unknown amenity tag: {0}")]
    UnknownAmenity(String),

    #[error("Duplicate property in catalog: {0}")]
    DuplicateProperty(PropertySlug),

    #[error("Catalog parse error: {0}")]
    ParseError(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PropertySlug {
    Georgia,
    Atlantique,
    Arabia,
}

impl PropertySlug {
    pub const ALL: [PropertySlug; 3] = [
        PropertySlug::Georgia,
        PropertySlug::Atlantique,
        PropertySlug::Arabia,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            PropertySlug::Georgia => "georgia",
            PropertySlug::Atlantique => "atlantique",
            PropertySlug::Arabia => "arabia",
        }
    }
}

impl fmt::Display for PropertySlug {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PropertySlug {
    type Err = CatalogError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "georgia" => Ok(PropertySlug::Georgia),
            "atlantique" => Ok(PropertySlug::Atlantique),
            "arabia" => Ok(PropertySlug::Arabia),
            _ => Err(CatalogError::UnknownProperty(s.to_string())),
        }
    }
}

/// Amenity tags a manager can attach to a listing.
///
/// The set is closed: a listing carrying an unknown tag fails to load
/// instead of rendering a missing icon.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AmenityTag {
    Wifi,
    Pool,
    AirConditioning,
    Heating,
    Kitchen,
    Parking,
    Washer,
    Tv,
    Garden,
    Terrace,
    Bbq,
    SeaView,
    MountainView,
    BeachAccess,
    Fireplace,
    PetFriendly,
    Workspace,
}

impl AmenityTag {
    // Icon identifier used by the front end's icon set
    pub fn icon(&self) -> &'static str {
        match self {
            AmenityTag::Wifi => "wifi",
            AmenityTag::Pool => "waves",
            AmenityTag::AirConditioning => "air-vent",
            AmenityTag::Heating => "thermometer",
            AmenityTag::Kitchen => "chef-hat",
            AmenityTag::Parking => "car",
            AmenityTag::Washer => "washing-machine",
            AmenityTag::Tv => "tv",
            AmenityTag::Garden => "trees",
            AmenityTag::Terrace => "sun",
            AmenityTag::Bbq => "flame",
            AmenityTag::SeaView => "sailboat",
            AmenityTag::MountainView => "mountain",
            AmenityTag::BeachAccess => "umbrella",
            AmenityTag::Fireplace => "flame-kindling",
            AmenityTag::PetFriendly => "paw-print",
            AmenityTag::Workspace => "laptop",
        }
    }
}

impl FromStr for AmenityTag {
    type Err = CatalogError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        serde_json::from_value(serde_json::Value::String(s.trim().to_string()))
            .map_err(|_| CatalogError::UnknownAmenity(s.to_string()))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PropertyProfile {
    pub slug: PropertySlug,
    pub name: String,
    pub currency: String,
    pub max_guests: u32,
    #[serde(default)]
    pub amenities: Vec<AmenityTag>,
    pub rates: Arc<RateSheet>,
}

impl PropertyProfile {
    pub fn amenity_icons(&self) -> Vec<(AmenityTag, &'static str)> {
        self.amenities.iter().map(|tag| (*tag, tag.icon())).collect()
    }
}

#[derive(Debug, Clone, Default)]
pub struct Catalog {
    properties: BTreeMap<PropertySlug, Arc<PropertyProfile>>,
}

impl Catalog {
    pub fn from_profiles(profiles: Vec<PropertyProfile>) -> Result<Self, CatalogError> {
        let mut properties = BTreeMap::new();
        for profile in profiles {
            let slug = profile.slug;
            if properties.insert(slug, Arc::new(profile)).is_some() {
                return Err(CatalogError::DuplicateProperty(slug));
            }
        }
        Ok(Self { properties })
    }

    pub fn from_json(json: &str) -> Result<Self, CatalogError> {
        let profiles: Vec<PropertyProfile> = serde_json::from_str(json)?;
        let catalog = Self::from_profiles(profiles)?;
        info!(properties = catalog.properties.len(), "loaded property catalog");
        Ok(catalog)
    }

    pub fn load(path: &str) -> Result<Self, CatalogError> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json(&json)
    }

    pub fn get(&self, slug: PropertySlug) -> Result<Arc<PropertyProfile>, CatalogError> {
        self.properties
            .get(&slug)
            .cloned()
            .ok_or_else(|| CatalogError::UnknownProperty(slug.to_string()))
    }

    pub fn properties(&self) -> impl Iterator<Item = &Arc<PropertyProfile>> {
        self.properties.values()
    }
}

// Bundled catalog used by the quote binary and tests
pub const SAMPLE_CATALOG_PATH: &str = "samples/catalog.json";

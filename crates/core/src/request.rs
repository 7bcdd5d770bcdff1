//! Index request model
//!
//! The request arrives as one JSON document:
//! `{"geometry": [<Feature-like object>, ...], "years": [2020, 2021]}`.
//! Only the first feature is consulted; its `geometry` member must be a
//! GeoJSON geometry.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// A parsed index request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexRequest {
    /// Feature-like objects. Kept raw so that entries after the first are
    /// never validated.
    pub geometry: Vec<serde_json::Value>,

    #[serde(default)]
    pub years: Vec<i32>,
}

impl IndexRequest {
    /// Parse a request from its JSON text.
    pub fn from_json(text: &str) -> Result<Self> {
        Ok(serde_json::from_str(text)?)
    }

    /// The area of interest: `geometry[0].geometry`.
    pub fn aoi(&self) -> Result<geojson::Geometry> {
        let feature = self.geometry.first().ok_or(Error::MissingGeometry)?;
        let inner = feature.get("geometry").ok_or_else(|| {
            Error::InvalidGeometry("first feature has no `geometry` member".into())
        })?;
        serde_json::from_value(inner.clone()).map_err(|e| Error::InvalidGeometry(e.to_string()))
    }

    /// Requested years with duplicates removed, in first-seen order.
    pub fn unique_years(&self) -> Vec<i32> {
        let mut years = Vec::with_capacity(self.years.len());
        for &y in &self.years {
            if !years.contains(&y) {
                years.push(y);
            }
        }
        years
    }
}

/// Calendar-year acquisition window `YYYY-01-01` .. `YYYY-12-31`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct YearRange {
    pub year: i32,
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl YearRange {
    pub const MIN_YEAR: i32 = 1;
    pub const MAX_YEAR: i32 = 9999;

    pub fn for_year(year: i32) -> Result<Self> {
        if !(Self::MIN_YEAR..=Self::MAX_YEAR).contains(&year) {
            return Err(Error::InvalidYear(year));
        }
        let start = NaiveDate::from_ymd_opt(year, 1, 1).ok_or(Error::InvalidYear(year))?;
        let end = NaiveDate::from_ymd_opt(year, 12, 31).ok_or(Error::InvalidYear(year))?;
        Ok(Self { year, start, end })
    }

    pub fn start_str(&self) -> String {
        self.start.format("%Y-%m-%d").to_string()
    }

    pub fn end_str(&self) -> String {
        self.end.format("%Y-%m-%d").to_string()
    }
}

/// Per-run knobs for the composite and the reduction.
#[derive(Debug, Clone, PartialEq)]
pub struct IndexParams {
    /// Image collection the composite is built from.
    pub collection: String,
    /// Scene property holding the cloudy-pixel percentage.
    pub cloud_property: String,
    /// Scenes at or above this cloud percentage are dropped.
    pub max_cloud_pct: f64,
    /// Nominal reduction scale in meters.
    pub scale_m: f64,
}

impl Default for IndexParams {
    fn default() -> Self {
        Self {
            collection: "COPERNICUS/S2_SR".to_string(),
            cloud_property: "CLOUDY_PIXEL_PERCENTAGE".to_string(),
            max_cloud_pct: 20.0,
            scale_m: 10.0,
        }
    }
}

impl IndexParams {
    pub fn validate(&self) -> Result<()> {
        if !(self.scale_m.is_finite() && self.scale_m > 0.0) {
            return Err(Error::InvalidParameter {
                name: "scale",
                value: self.scale_m.to_string(),
                reason: "must be a positive number of meters".into(),
            });
        }
        if !(self.max_cloud_pct > 0.0 && self.max_cloud_pct <= 100.0) {
            return Err(Error::InvalidParameter {
                name: "max_cloud",
                value: self.max_cloud_pct.to_string(),
                reason: "must be in (0, 100]".into(),
            });
        }
        if self.collection.trim().is_empty() {
            return Err(Error::InvalidParameter {
                name: "collection",
                value: self.collection.clone(),
                reason: "must not be empty".into(),
            });
        }
        Ok(())
    }
}

//! Spectral vegetation and water indices
//!
//! The six indices reported per year, each defined either as a two-band
//! normalized difference or as a band-algebra formula over Sentinel-2
//! surface-reflectance bands.

use std::collections::{BTreeMap, HashMap};
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::formula::Formula;

/// Sentinel-2 MSI bands used by the index catalogue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Band {
    /// Blue, 490 nm
    B2,
    /// Green, 560 nm
    B3,
    /// Red, 665 nm
    B4,
    /// Near infrared, 842 nm
    B8,
    /// Shortwave infrared 1, 1610 nm
    B11,
    /// Shortwave infrared 2, 2190 nm
    B12,
}

impl Band {
    /// Bands kept in the yearly composite.
    pub const COMPOSITE: [Band; 6] = [
        Band::B2,
        Band::B3,
        Band::B4,
        Band::B8,
        Band::B11,
        Band::B12,
    ];

    /// Band name as used in the image collection.
    pub fn name(self) -> &'static str {
        match self {
            Band::B2 => "B2",
            Band::B3 => "B3",
            Band::B4 => "B4",
            Band::B8 => "B8",
            Band::B11 => "B11",
            Band::B12 => "B12",
        }
    }
}

impl fmt::Display for Band {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Enumeration of reported spectral indices.
///
/// Declaration order is the output order of every bundle.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
pub enum SpectralIndex {
    /// Normalized Difference Vegetation Index
    NDVI,
    /// Normalized Difference Moisture Index
    NDMI,
    /// Normalized Difference Snow Index
    NDSI,
    /// Green Chlorophyll Index
    GCI,
    /// Enhanced Vegetation Index
    EVI,
    /// Automated Water Extraction Index
    AWEI,
}

/// How an index is derived from the composite bands.
#[derive(Debug, Clone)]
pub enum IndexDefinition {
    /// `(a - b) / (a + b)`
    NormalizedDifference { a: Band, b: Band },
    /// Formula over named variables, each bound to a band.
    Expression {
        formula: Formula,
        bindings: Vec<(String, Band)>,
    },
}

impl SpectralIndex {
    pub const ALL: [SpectralIndex; 6] = [
        SpectralIndex::NDVI,
        SpectralIndex::NDMI,
        SpectralIndex::NDSI,
        SpectralIndex::GCI,
        SpectralIndex::EVI,
        SpectralIndex::AWEI,
    ];

    pub fn name(self) -> &'static str {
        match self {
            SpectralIndex::NDVI => "NDVI",
            SpectralIndex::NDMI => "NDMI",
            SpectralIndex::NDSI => "NDSI",
            SpectralIndex::GCI => "GCI",
            SpectralIndex::EVI => "EVI",
            SpectralIndex::AWEI => "AWEI",
        }
    }

    /// Build the definition of this index.
    ///
    /// Formula bindings are checked against the parsed formula, so a typo
    /// in a variable name fails here rather than on the remote service.
    pub fn definition(self) -> Result<IndexDefinition> {
        let (source, bindings): (&str, &[(&str, Band)]) = match self {
            SpectralIndex::NDVI => {
                return Ok(IndexDefinition::NormalizedDifference {
                    a: Band::B8,
                    b: Band::B4,
                })
            }
            SpectralIndex::NDMI => {
                return Ok(IndexDefinition::NormalizedDifference {
                    a: Band::B8,
                    b: Band::B11,
                })
            }
            SpectralIndex::NDSI => {
                return Ok(IndexDefinition::NormalizedDifference {
                    a: Band::B3,
                    b: Band::B11,
                })
            }
            SpectralIndex::GCI => (
                "NIR / GREEN - 1",
                &[("NIR", Band::B8), ("GREEN", Band::B3)][..],
            ),
            SpectralIndex::EVI => (
                "2.5 * ((NIR - RED) / (NIR + 6 * RED - 7.5 * BLUE + 1))",
                &[("NIR", Band::B8), ("RED", Band::B4), ("BLUE", Band::B2)][..],
            ),
            SpectralIndex::AWEI => (
                "4 * (GREEN - SWIR1) - (0.25 * NIR + 2.75 * SWIR2)",
                &[
                    ("GREEN", Band::B3),
                    ("SWIR1", Band::B11),
                    ("NIR", Band::B8),
                    ("SWIR2", Band::B12),
                ][..],
            ),
        };

        let formula = Formula::parse(source)?;
        for band in formula.bands() {
            if !bindings.iter().any(|(var, _)| *var == band) {
                return Err(Error::UnboundBand {
                    index: self.name().to_string(),
                    band,
                });
            }
        }

        Ok(IndexDefinition::Expression {
            formula,
            bindings: bindings
                .iter()
                .map(|(var, band)| (var.to_string(), *band))
                .collect(),
        })
    }

    /// Evaluate this index on scalar band values.
    ///
    /// Returns `None` when a required band is missing or the result is not
    /// finite (zero denominator).
    pub fn evaluate(self, bands: &HashMap<Band, f64>) -> Result<Option<f64>> {
        let value = match self.definition()? {
            IndexDefinition::NormalizedDifference { a, b } => {
                match (bands.get(&a), bands.get(&b)) {
                    (Some(a), Some(b)) => {
                        let sum = a + b;
                        if sum.abs() < 1e-10 {
                            return Ok(None);
                        }
                        (a - b) / sum
                    }
                    _ => return Ok(None),
                }
            }
            IndexDefinition::Expression { formula, bindings } => {
                let vars: HashMap<String, f64> = bindings
                    .iter()
                    .filter_map(|(var, band)| bands.get(band).map(|v| (var.clone(), *v)))
                    .collect();
                formula.eval(&vars)
            }
        };
        Ok(value.is_finite().then_some(value))
    }
}

impl fmt::Display for SpectralIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Mean value of every index for one year; `None` means no valid pixels.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct IndexBundle {
    values: BTreeMap<SpectralIndex, Option<f64>>,
}

impl IndexBundle {
    /// A bundle with every index set to `None`.
    pub fn empty() -> Self {
        Self {
            values: SpectralIndex::ALL.into_iter().map(|i| (i, None)).collect(),
        }
    }

    pub fn set(&mut self, index: SpectralIndex, value: Option<f64>) {
        self.values.insert(index, value.filter(|v| v.is_finite()));
    }

    pub fn get(&self, index: SpectralIndex) -> Option<f64> {
        self.values.get(&index).copied().flatten()
    }

    /// Iterate `(index, value)` in output order.
    pub fn iter(&self) -> impl Iterator<Item = (SpectralIndex, Option<f64>)> + '_ {
        self.values.iter().map(|(k, v)| (*k, *v))
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

impl Default for IndexBundle {
    fn default() -> Self {
        Self::empty()
    }
}

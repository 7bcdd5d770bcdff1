//! Yearly index requests.
//!
//! Builds, for one AOI and one year, the Earth Engine graph of the
//! Sentinel-2 median composite and the six index means over it. Building
//! is pure; evaluation is left to the caller.

use std::collections::BTreeMap;

use spectra_core::formula::{BinOp, Expr};
use spectra_core::{Band, IndexDefinition, IndexParams, SpectralIndex, YearRange};

use crate::ee::{Deferred, Filter, Geometry, Image, ImageCollection};
use crate::error::{CloudError, Result};
use crate::graph::ValueNode;

/// Deferred index means for one year.
#[derive(Debug, Clone)]
pub struct DeferredBundle {
    pub year: i32,
    pub values: BTreeMap<SpectralIndex, Deferred>,
}

impl DeferredBundle {
    /// All six values combined into one dictionary, so a single round
    /// trip evaluates them together.
    pub fn combined(&self) -> Deferred {
        Deferred::from_node(ValueNode::dictionary(
            self.values
                .iter()
                .map(|(idx, value)| (idx.name(), value.node().clone())),
        ))
    }
}

/// Cloud-filtered median composite of the index bands, clipped to `aoi`.
pub fn composite(aoi: &Geometry, range: &YearRange, params: &IndexParams) -> Image {
    let bands: Vec<&str> = Band::COMPOSITE.iter().map(|b| b.name()).collect();
    ImageCollection::load(&params.collection)
        .filter_date(&range.start_str(), &range.end_str())
        .filter_bounds(aoi)
        .filter(Filter::lt(&params.cloud_property, params.max_cloud_pct))
        .median()
        .select(&bands)
        .clip(aoi)
}

/// Per-pixel image of `index` computed from `composite`.
pub fn index_image(composite: &Image, index: SpectralIndex) -> Result<Image> {
    let image = match index.definition()? {
        IndexDefinition::NormalizedDifference { a, b } => {
            composite.normalized_difference(a.name(), b.name())
        }
        IndexDefinition::Expression { formula, bindings } => {
            Lowering {
                index,
                composite,
                bindings: &bindings,
            }
            .lower(formula.expr())?
        }
    };
    Ok(image.rename(index.name()))
}

/// Lowers a formula AST of one index into image arithmetic.
struct Lowering<'a> {
    index: SpectralIndex,
    composite: &'a Image,
    bindings: &'a [(String, Band)],
}

impl Lowering<'_> {
    fn lower(&self, expr: &Expr) -> Result<Image> {
        Ok(match expr {
            Expr::Num(n) => Image::constant(*n),
            Expr::Band(var) => {
                let band = self
                    .bindings
                    .iter()
                    .find(|(name, _)| name == var)
                    .map(|(_, band)| *band)
                    .ok_or_else(|| {
                        CloudError::Core(spectra_core::Error::UnboundBand {
                            index: self.index.name().to_string(),
                            band: var.clone(),
                        })
                    })?;
                self.composite.select(&[band.name()]).to_float()
            }
            Expr::BinOp { op, left, right } => {
                let l = self.lower(left)?;
                let r = self.lower(right)?;
                match op {
                    BinOp::Add => l.add(&r),
                    BinOp::Sub => l.subtract(&r),
                    BinOp::Mul => l.multiply(&r),
                    BinOp::Div => l.divide(&r),
                }
            }
            Expr::Neg(inner) => self.lower(inner)?.multiply(&Image::constant(-1.0)),
        })
    }
}

/// Describe the six index means for `aoi` in `year`.
///
/// No network I/O happens here.
pub fn build_index_bundle(
    aoi: &geojson::Geometry,
    year: i32,
    params: &IndexParams,
) -> Result<DeferredBundle> {
    let range = YearRange::for_year(year)?;
    let aoi = Geometry::from_geojson(aoi);
    let composite = composite(&aoi, &range, params);

    let mut values = BTreeMap::new();
    for index in SpectralIndex::ALL {
        let image = index_image(&composite, index)?;
        let mean = image
            .reduce_region_mean(&aoi, params.scale_m)
            .get(index.name());
        values.insert(index, mean);
    }

    Ok(DeferredBundle { year, values })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::{Expression, FunctionInvocation};
    use serde_json::json;

    fn aoi() -> geojson::Geometry {
        geojson::Geometry::new(geojson::Value::Polygon(vec![vec![
            vec![0.0, 0.0],
            vec![1.0, 0.0],
            vec![1.0, 1.0],
            vec![0.0, 0.0],
        ]]))
    }

    fn invocation(node: &ValueNode) -> &FunctionInvocation {
        match node {
            ValueNode::FunctionInvocationValue(f) => f,
            other => panic!("expected invocation, got {:?}", other),
        }
    }

    #[test]
    fn bundle_has_all_six_indices() {
        let bundle = build_index_bundle(&aoi(), 2021, &IndexParams::default()).unwrap();
        assert_eq!(bundle.year, 2021);
        assert_eq!(
            bundle.values.keys().copied().collect::<Vec<_>>(),
            SpectralIndex::ALL.to_vec()
        );
    }

    #[test]
    fn each_value_is_a_mean_at_ten_meters() {
        let bundle = build_index_bundle(&aoi(), 2021, &IndexParams::default()).unwrap();
        for (idx, value) in &bundle.values {
            let get = invocation(value.node());
            assert_eq!(get.arguments["key"], ValueNode::constant(idx.name()));
            let reduce = invocation(&get.arguments["dictionary"]);
            assert_eq!(reduce.arguments["scale"], ValueNode::constant(10.0));
            let rename = invocation(&reduce.arguments["image"]);
            assert_eq!(rename.function_name, "Image.rename");
            assert_eq!(rename.arguments["names"], ValueNode::constant(json!([idx.name()])));
        }
    }

    #[test]
    fn composite_is_shared_across_indices() {
        let bundle = build_index_bundle(&aoi(), 2021, &IndexParams::default()).unwrap();
        let expr = Expression::new(bundle.combined().into_node()).unwrap();
        let names = expr.function_names();

        assert_eq!(names.iter().filter(|n| **n == "ImageCollection.load").count(), 1);
        assert_eq!(names.iter().filter(|n| **n == "reduce.median").count(), 1);
        assert_eq!(names.iter().filter(|n| **n == "GeometryConstructors.Polygon").count(), 1);
        assert_eq!(names.iter().filter(|n| **n == "Image.normalizedDifference").count(), 3);
        // one reduceRegion per index
        assert_eq!(names.iter().filter(|n| **n == "Image.reduceRegion").count(), 6);
        // no thermal collection
        assert!(!serde_json::to_string(&expr).unwrap().contains("LANDSAT"));
    }

    #[test]
    fn composite_uses_collection_dates_and_cloud_threshold() {
        let bundle = build_index_bundle(&aoi(), 2019, &IndexParams::default()).unwrap();
        let wire = serde_json::to_string(&Expression::new(bundle.combined().into_node()).unwrap())
            .unwrap();
        assert!(wire.contains("COPERNICUS/S2_SR"));
        assert!(wire.contains("2019-01-01"));
        assert!(wire.contains("2019-12-31"));
        assert!(wire.contains("CLOUDY_PIXEL_PERCENTAGE"));
        assert!(wire.contains(r#"["B2","B3","B4","B8","B11","B12"]"#));
    }

    #[test]
    fn gci_lowers_to_divide_then_subtract() {
        let composite = Image::constant(0.0);
        let gci = index_image(&composite, SpectralIndex::GCI).unwrap();

        let rename = invocation(gci.node());
        let sub = invocation(&rename.arguments["input"]);
        assert_eq!(sub.function_name, "Image.subtract");
        let div = invocation(&sub.arguments["image1"]);
        assert_eq!(div.function_name, "Image.divide");
        let one = invocation(&sub.arguments["image2"]);
        assert_eq!(one.function_name, "Image.constant");
        assert_eq!(one.arguments["value"], ValueNode::constant(1.0));

        let nir = invocation(&div.arguments["image1"]);
        assert_eq!(nir.function_name, "Image.toFloat");
        let select = invocation(&nir.arguments["value"]);
        assert_eq!(select.arguments["bandSelectors"], ValueNode::constant(json!(["B8"])));
    }

    #[test]
    fn ndvi_uses_normalized_difference() {
        let composite = Image::constant(0.0);
        let ndvi = index_image(&composite, SpectralIndex::NDVI).unwrap();
        let rename = invocation(ndvi.node());
        let nd = invocation(&rename.arguments["input"]);
        assert_eq!(nd.function_name, "Image.normalizedDifference");
        assert_eq!(nd.arguments["bandNames"], ValueNode::constant(json!(["B8", "B4"])));
    }

    #[test]
    fn invalid_year_is_rejected_before_building() {
        let err = build_index_bundle(&aoi(), 0, &IndexParams::default()).unwrap_err();
        assert!(matches!(err, CloudError::Core(spectra_core::Error::InvalidYear(0))));
    }

    #[test]
    fn params_flow_into_graph() {
        let params = IndexParams {
            max_cloud_pct: 35.0,
            scale_m: 30.0,
            ..IndexParams::default()
        };
        let bundle = build_index_bundle(&aoi(), 2021, &params).unwrap();
        let get = invocation(bundle.values[&SpectralIndex::EVI].node());
        let reduce = invocation(&get.arguments["dictionary"]);
        assert_eq!(reduce.arguments["scale"], ValueNode::constant(30.0));

        let wire = serde_json::to_string(&Expression::new(bundle.combined().into_node()).unwrap())
            .unwrap();
        assert!(wire.contains("35.0"));
    }

    #[test]
    fn unbound_variable_names_the_index() {
        let composite = Image::constant(0.0);
        let lowering = Lowering {
            index: SpectralIndex::GCI,
            composite: &composite,
            bindings: &[("NIR".to_string(), Band::B8)],
        };
        let formula = spectra_core::Formula::parse("NIR / GREEN - 1").unwrap();

        match lowering.lower(formula.expr()) {
            Err(CloudError::Core(spectra_core::Error::UnboundBand { index, band })) => {
                assert_eq!(index, "GCI");
                assert_eq!(band, "GREEN");
            }
            other => panic!("unexpected result: {other:?}"),
        }
    }
}

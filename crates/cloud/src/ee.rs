//! Typed handles over Earth Engine algorithms.
//!
//! Each handle wraps the [`ValueNode`] that computes it. Methods only
//! extend the graph; nothing is sent until a [`Deferred`] is resolved
//! through a [`ComputeService`](crate::session::ComputeService).

use geojson::{Geometry as GeoJsonGeometry, Value as GeoJsonValue};
use serde_json::json;

use crate::graph::ValueNode;

/// A server-side geometry.
#[derive(Debug, Clone)]
pub struct Geometry(ValueNode);

impl Geometry {
    /// Build from a GeoJSON geometry.
    pub fn from_geojson(geometry: &GeoJsonGeometry) -> Self {
        Self(geometry_node(&geometry.value))
    }

    pub fn node(&self) -> &ValueNode {
        &self.0
    }
}

fn geometry_node(value: &GeoJsonValue) -> ValueNode {
    let (constructor, coordinates) = match value {
        GeoJsonValue::Point(c) => ("GeometryConstructors.Point", json!(c)),
        GeoJsonValue::MultiPoint(c) => ("GeometryConstructors.MultiPoint", json!(c)),
        GeoJsonValue::LineString(c) => ("GeometryConstructors.LineString", json!(c)),
        GeoJsonValue::MultiLineString(c) => ("GeometryConstructors.MultiLineString", json!(c)),
        GeoJsonValue::Polygon(c) => ("GeometryConstructors.Polygon", json!(c)),
        GeoJsonValue::MultiPolygon(c) => ("GeometryConstructors.MultiPolygon", json!(c)),
        GeoJsonValue::GeometryCollection(parts) => {
            let geometries = parts.iter().map(|g| geometry_node(&g.value)).collect();
            return ValueNode::invoke(
                "GeometryConstructors.MultiGeometry",
                [("geometries", ValueNode::array(geometries))],
            );
        }
    };
    ValueNode::invoke(constructor, [("coordinates", ValueNode::ConstantValue(coordinates))])
}

/// A server-side collection filter.
#[derive(Debug, Clone)]
pub struct Filter(ValueNode);

impl Filter {
    /// Scenes whose `system:time_start` falls in `[start, end)`.
    pub fn date(start: &str, end: &str) -> Self {
        let range = ValueNode::invoke(
            "DateRange",
            [("start", date_node(start)), ("end", date_node(end))],
        );
        Self(ValueNode::invoke(
            "Filter.dateRangeContains",
            [
                ("leftValue", range),
                ("rightField", ValueNode::constant("system:time_start")),
            ],
        ))
    }

    /// Scenes whose footprint intersects `geometry`.
    pub fn bounds(geometry: &Geometry) -> Self {
        Self(ValueNode::invoke(
            "Filter.intersects",
            [
                ("leftField", ValueNode::constant(".all")),
                ("rightValue", geometry.node().clone()),
            ],
        ))
    }

    /// Scenes whose `property` is strictly less than `value`.
    pub fn lt(property: &str, value: f64) -> Self {
        Self(ValueNode::invoke(
            "Filter.lessThan",
            [
                ("leftField", ValueNode::constant(property)),
                ("rightValue", ValueNode::constant(value)),
            ],
        ))
    }
}

fn date_node(date: &str) -> ValueNode {
    ValueNode::invoke("Date", [("value", ValueNode::constant(date))])
}

/// A server-side image collection.
#[derive(Debug, Clone)]
pub struct ImageCollection(ValueNode);

impl ImageCollection {
    pub fn load(id: &str) -> Self {
        Self(ValueNode::invoke(
            "ImageCollection.load",
            [("id", ValueNode::constant(id))],
        ))
    }

    pub fn filter(self, filter: Filter) -> Self {
        Self(ValueNode::invoke(
            "Collection.filter",
            [("collection", self.0), ("filter", filter.0)],
        ))
    }

    pub fn filter_date(self, start: &str, end: &str) -> Self {
        self.filter(Filter::date(start, end))
    }

    pub fn filter_bounds(self, geometry: &Geometry) -> Self {
        self.filter(Filter::bounds(geometry))
    }

    /// Per-pixel median composite, keeping band names.
    pub fn median(self) -> Image {
        Image(ValueNode::invoke("reduce.median", [("collection", self.0)]))
    }
}

/// A server-side image.
#[derive(Debug, Clone)]
pub struct Image(ValueNode);

impl Image {
    pub fn constant(value: f64) -> Self {
        Self(ValueNode::invoke(
            "Image.constant",
            [("value", ValueNode::constant(value))],
        ))
    }

    pub fn node(&self) -> &ValueNode {
        &self.0
    }

    pub fn select(&self, bands: &[&str]) -> Self {
        Self(ValueNode::invoke(
            "Image.select",
            [
                ("input", self.0.clone()),
                ("bandSelectors", ValueNode::constant(json!(bands))),
            ],
        ))
    }

    pub fn clip(&self, geometry: &Geometry) -> Self {
        Self(ValueNode::invoke(
            "Image.clip",
            [("input", self.0.clone()), ("geometry", geometry.node().clone())],
        ))
    }

    pub fn to_float(&self) -> Self {
        Self(ValueNode::invoke("Image.toFloat", [("value", self.0.clone())]))
    }

    pub fn rename(&self, name: &str) -> Self {
        Self(ValueNode::invoke(
            "Image.rename",
            [
                ("input", self.0.clone()),
                ("names", ValueNode::constant(json!([name]))),
            ],
        ))
    }

    /// `(a - b) / (a + b)` over two bands of this image.
    pub fn normalized_difference(&self, a: &str, b: &str) -> Self {
        Self(ValueNode::invoke(
            "Image.normalizedDifference",
            [
                ("input", self.0.clone()),
                ("bandNames", ValueNode::constant(json!([a, b]))),
            ],
        ))
    }

    fn binary(&self, function: &str, other: &Image) -> Self {
        Self(ValueNode::invoke(
            function,
            [("image1", self.0.clone()), ("image2", other.0.clone())],
        ))
    }

    pub fn add(&self, other: &Image) -> Self {
        self.binary("Image.add", other)
    }

    pub fn subtract(&self, other: &Image) -> Self {
        self.binary("Image.subtract", other)
    }

    pub fn multiply(&self, other: &Image) -> Self {
        self.binary("Image.multiply", other)
    }

    pub fn divide(&self, other: &Image) -> Self {
        self.binary("Image.divide", other)
    }

    /// Mean of every band over `geometry` at `scale` meters; yields a
    /// dictionary keyed by band name.
    pub fn reduce_region_mean(&self, geometry: &Geometry, scale: f64) -> Dictionary {
        Dictionary(ValueNode::invoke(
            "Image.reduceRegion",
            [
                ("image", self.0.clone()),
                ("reducer", ValueNode::invoke("Reducer.mean", Vec::<(&str, ValueNode)>::new())),
                ("geometry", geometry.node().clone()),
                ("scale", ValueNode::constant(scale)),
            ],
        ))
    }
}

/// A server-side dictionary.
#[derive(Debug, Clone)]
pub struct Dictionary(ValueNode);

impl Dictionary {
    /// Value stored under `key`, evaluated later.
    pub fn get(&self, key: &str) -> Deferred {
        Deferred(ValueNode::invoke(
            "Dictionary.get",
            [
                ("dictionary", self.0.clone()),
                ("key", ValueNode::constant(key)),
            ],
        ))
    }
}

/// A value that has been described but not yet computed.
///
/// Resolving it is a blocking round trip; see
/// [`ComputeService::resolve`](crate::session::ComputeService::resolve).
#[derive(Debug, Clone)]
pub struct Deferred(ValueNode);

impl Deferred {
    pub fn from_node(node: ValueNode) -> Self {
        Self(node)
    }

    pub fn node(&self) -> &ValueNode {
        &self.0
    }

    pub fn into_node(self) -> ValueNode {
        self.0
    }
}

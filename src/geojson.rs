//! Reads the coverage area a search client draws on the map.
//!
//! Clients send GeoJSON: a bare geometry, a Feature, or a FeatureCollection
//! holding exactly one feature, optionally tagged with a top-level `crs`
//! member. The `crs` member may be a plain identifier string or the legacy
//! named-CRS object.

use geo_types::{Coord, Geometry, LineString, MultiLineString, MultiPoint, MultiPolygon, Point, Polygon};
use serde_json::Value;
use tracing::debug;

use crate::error::{CswError, Result};

/// A geometry together with the system it was drawn in, when stated.
#[derive(Debug, Clone, PartialEq)]
pub struct Coverage {
    pub geometry: Geometry<f64>,
    pub crs: Option<String>,
}

pub fn read_coverage(json: &str) -> Result<Coverage> {
    let value: Value = serde_json::from_str(json).map_err(|e| CswError::GeoJson(e.to_string()))?;
    coverage_from_value(&value)
}

pub fn coverage_from_value(value: &Value) -> Result<Coverage> {
    let crs = read_crs(value)?;
    let geometry = match type_of(value)? {
        "FeatureCollection" => {
            let features = value
                .get("features")
                .and_then(Value::as_array)
                .ok_or_else(|| invalid("FeatureCollection without a features array"))?;
            if features.len() != 1 {
                return Err(invalid(format!(
                    "expected exactly one feature, found {}",
                    features.len()
                )));
            }
            feature_geometry(&features[0])?
        }
        "Feature" => feature_geometry(value)?,
        _ => geometry_from_value(value)?,
    };
    debug!("Read coverage geometry (crs {:?})", crs);
    Ok(Coverage { geometry, crs })
}

pub fn geometry_from_value(value: &Value) -> Result<Geometry<f64>> {
    let kind = type_of(value)?;
    let coordinates = value
        .get("coordinates")
        .ok_or_else(|| invalid(format!("{} without coordinates", kind)))?;

    let geometry = match kind {
        "Point" => Geometry::Point(Point::from(position(coordinates)?)),
        "LineString" => Geometry::LineString(line_string(coordinates)?),
        "Polygon" => Geometry::Polygon(polygon(coordinates)?),
        "MultiPoint" => Geometry::MultiPoint(MultiPoint(
            array(coordinates)?
                .iter()
                .map(|p| position(p).map(Point::from))
                .collect::<Result<Vec<_>>>()?,
        )),
        "MultiLineString" => Geometry::MultiLineString(MultiLineString(
            array(coordinates)?
                .iter()
                .map(line_string)
                .collect::<Result<Vec<_>>>()?,
        )),
        "MultiPolygon" => Geometry::MultiPolygon(MultiPolygon(
            array(coordinates)?
                .iter()
                .map(polygon)
                .collect::<Result<Vec<_>>>()?,
        )),
        other => return Err(invalid(format!("unsupported geometry type '{}'", other))),
    };
    Ok(geometry)
}

fn feature_geometry(feature: &Value) -> Result<Geometry<f64>> {
    match feature.get("geometry") {
        Some(geometry) if !geometry.is_null() => geometry_from_value(geometry),
        _ => Err(invalid("feature has no geometry")),
    }
}

fn read_crs(value: &Value) -> Result<Option<String>> {
    match value.get("crs") {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(name)) => Ok(Some(name.clone())),
        Some(named) => named
            .pointer("/properties/name")
            .and_then(Value::as_str)
            .map(|name| Some(name.to_string()))
            .ok_or_else(|| invalid("crs member must be a string or a named crs object")),
    }
}

fn type_of(value: &Value) -> Result<&str> {
    value
        .get("type")
        .and_then(Value::as_str)
        .ok_or_else(|| invalid("object without a type member"))
}

fn array(value: &Value) -> Result<&Vec<Value>> {
    value
        .as_array()
        .ok_or_else(|| invalid(format!("expected an array, found {}", value)))
}

fn position(value: &Value) -> Result<Coord<f64>> {
    let items = array(value)?;
    if items.len() < 2 {
        return Err(invalid("position needs at least two numbers"));
    }
    let number = |v: &Value| {
        v.as_f64()
            .ok_or_else(|| invalid(format!("coordinate '{}' is not a number", v)))
    };
    Ok(Coord {
        x: number(&items[0])?,
        y: number(&items[1])?,
    })
}

fn line_string(value: &Value) -> Result<LineString<f64>> {
    Ok(LineString(
        array(value)?.iter().map(position).collect::<Result<Vec<_>>>()?,
    ))
}

fn polygon(value: &Value) -> Result<Polygon<f64>> {
    let mut rings = array(value)?.iter().map(line_string);
    let exterior = rings
        .next()
        .ok_or_else(|| invalid("polygon without rings"))??;
    let interiors = rings.collect::<Result<Vec<_>>>()?;
    Ok(Polygon::new(exterior, interiors))
}

fn invalid(message: impl Into<String>) -> CswError {
    CswError::GeoJson(message.into())
}

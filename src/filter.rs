//! Filter algebra for catalogue queries.
//!
//! A [`Filter`] is an immutable tree. The smart constructors return
//! [`Filter::Empty`] when the search criterion itself is empty, so callers
//! can assemble optional clauses and combine them with [`Filter::and`]
//! without checking each one. Structurally invalid input (an empty property
//! name, clashing pattern characters) is an error instead.

use geo_types::{Geometry, Polygon};
use serde::{Deserialize, Serialize};

use crate::crs::Crs;
use crate::error::{CswError, Result};

/// Pattern control characters of a `PropertyIsLike` operator. They are
/// emitted verbatim, so each catalogue profile may pick its own.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct LikeOptions {
    pub wildcard: char,
    pub single_char: char,
    pub escape: char,
    pub match_case: bool,
}

impl Default for LikeOptions {
    fn default() -> Self {
        LikeOptions {
            wildcard: '*',
            single_char: '?',
            escape: '\\',
            match_case: false,
        }
    }
}

impl LikeOptions {
    pub fn new(wildcard: char, single_char: char, escape: char, match_case: bool) -> Self {
        LikeOptions {
            wildcard,
            single_char,
            escape,
            match_case,
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.wildcard == self.single_char
            || self.wildcard == self.escape
            || self.single_char == self.escape
        {
            return Err(CswError::InvalidArgument(format!(
                "like pattern characters must be distinct (wildCard '{}', singleChar '{}', escapeChar '{}')",
                self.wildcard, self.single_char, self.escape
            )));
        }
        Ok(())
    }

    /// Escapes `text` so that it matches literally inside a pattern.
    pub fn escape_literal(&self, text: &str) -> String {
        let mut escaped = String::with_capacity(text.len());
        for c in text.chars() {
            if c == self.wildcard || c == self.single_char || c == self.escape {
                escaped.push(self.escape);
            }
            escaped.push(c);
        }
        escaped
    }

    /// Pattern matching any value that contains `text`.
    pub fn contains_pattern(&self, text: &str) -> String {
        format!("{w}{}{w}", self.escape_literal(text), w = self.wildcard)
    }
}

/// Geometry operand of a spatial operator, already expressed in the
/// catalogue's coordinate system.
#[derive(Debug, Clone, PartialEq)]
pub struct SpatialOperand {
    geometry: Geometry<f64>,
    srs_name: String,
    precision: usize,
}

impl SpatialOperand {
    /// Tags `geometry` as being in `crs`. Lines and triangles are widened to
    /// line strings and polygons, which GML can express directly.
    pub fn new(geometry: Geometry<f64>, crs: &Crs) -> Self {
        Self::with_srs_name(geometry, crs.srs_name(), crs.coordinate_precision())
    }

    pub fn with_srs_name(geometry: Geometry<f64>, srs_name: impl Into<String>, precision: usize) -> Self {
        let geometry = match geometry {
            Geometry::Line(line) => Geometry::LineString(line.into()),
            Geometry::Triangle(triangle) => Geometry::Polygon(triangle.to_polygon()),
            other => other,
        };
        SpatialOperand {
            geometry,
            srs_name: srs_name.into(),
            precision,
        }
    }

    pub fn geometry(&self) -> &Geometry<f64> {
        &self.geometry
    }

    pub fn srs_name(&self) -> &str {
        &self.srs_name
    }

    /// Decimal places used when writing coordinates.
    pub fn precision(&self) -> usize {
        self.precision
    }

    fn validate(&self) -> Result<()> {
        let has_coords = match &self.geometry {
            Geometry::Point(_) | Geometry::Rect(_) => true,
            Geometry::LineString(ls) => !ls.0.is_empty(),
            Geometry::Polygon(p) => polygon_has_coords(p),
            Geometry::MultiPoint(mp) => !mp.0.is_empty(),
            Geometry::MultiLineString(mls) => mls.0.iter().any(|ls| !ls.0.is_empty()),
            Geometry::MultiPolygon(mp) => mp.0.iter().any(polygon_has_coords),
            Geometry::GeometryCollection(_) => {
                return Err(CswError::InvalidArgument(
                    "geometry collections cannot be used as a spatial operand".to_string(),
                ))
            }
            Geometry::Line(_) | Geometry::Triangle(_) => true,
        };
        if !has_coords {
            return Err(CswError::InvalidArgument(
                "spatial operand geometry has no coordinates".to_string(),
            ));
        }
        let has_empty_interior = match &self.geometry {
            Geometry::Polygon(p) => has_empty_interior(p),
            Geometry::MultiPolygon(mp) => mp.0.iter().any(has_empty_interior),
            _ => false,
        };
        if has_empty_interior {
            return Err(CswError::InvalidArgument(
                "polygon ring has no coordinates".to_string(),
            ));
        }
        if self.srs_name.trim().is_empty() {
            return Err(CswError::InvalidArgument(
                "spatial operand needs an srsName".to_string(),
            ));
        }
        Ok(())
    }
}

fn polygon_has_coords(polygon: &Polygon<f64>) -> bool {
    !polygon.exterior().0.is_empty()
}

fn has_empty_interior(polygon: &Polygon<f64>) -> bool {
    polygon.interiors().iter().any(|ring| ring.0.is_empty())
}

#[derive(Debug, Clone, PartialEq)]
pub struct PropertyIsEqualTo {
    property: String,
    literal: String,
}

impl PropertyIsEqualTo {
    pub fn property(&self) -> &str {
        &self.property
    }

    pub fn literal(&self) -> &str {
        &self.literal
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct PropertyIsLike {
    property: String,
    pattern: String,
    options: LikeOptions,
}

impl PropertyIsLike {
    pub fn property(&self) -> &str {
        &self.property
    }

    pub fn pattern(&self) -> &str {
        &self.pattern
    }

    pub fn options(&self) -> &LikeOptions {
        &self.options
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Intersects {
    property: String,
    operand: SpatialOperand,
}

impl Intersects {
    pub fn property(&self) -> &str {
        &self.property
    }

    pub fn operand(&self) -> &SpatialOperand {
        &self.operand
    }
}

/// Binary logical node. Both children are non-empty.
#[derive(Debug, Clone, PartialEq)]
pub struct Logical {
    left: Box<Filter>,
    right: Box<Filter>,
}

impl Logical {
    pub fn left(&self) -> &Filter {
        &self.left
    }

    pub fn right(&self) -> &Filter {
        &self.right
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub enum Filter {
    /// No constraint. Identity element of [`Filter::and`] and [`Filter::or`].
    #[default]
    Empty,
    Equals(PropertyIsEqualTo),
    Like(PropertyIsLike),
    Intersects(Intersects),
    And(Logical),
    Or(Logical),
}

impl Filter {
    pub fn empty() -> Filter {
        Filter::Empty
    }

    /// `property = value`; empty when `value` is empty.
    pub fn equals(property: impl Into<String>, value: impl Into<String>) -> Result<Filter> {
        let property = checked_property(property.into())?;
        let literal = value.into();
        if literal.is_empty() {
            return Ok(Filter::Empty);
        }
        Ok(Filter::Equals(PropertyIsEqualTo { property, literal }))
    }

    /// `property LIKE pattern`; empty when `pattern` is empty. The pattern is
    /// kept verbatim with its control characters.
    pub fn like(
        property: impl Into<String>,
        pattern: impl Into<String>,
        options: LikeOptions,
    ) -> Result<Filter> {
        let property = checked_property(property.into())?;
        let pattern = pattern.into();
        if pattern.is_empty() {
            return Ok(Filter::Empty);
        }
        options.validate()?;
        Ok(Filter::Like(PropertyIsLike {
            property,
            pattern,
            options,
        }))
    }

    /// Spatial intersection of `property` with an already reprojected
    /// geometry.
    pub fn intersects(property: impl Into<String>, operand: SpatialOperand) -> Result<Filter> {
        let property = checked_property(property.into())?;
        operand.validate()?;
        Ok(Filter::Intersects(Intersects { property, operand }))
    }

    /// Conjunction; an empty operand yields the other one unchanged.
    pub fn and(self, other: Filter) -> Filter {
        match (self, other) {
            (Filter::Empty, other) => other,
            (this, Filter::Empty) => this,
            (left, right) => Filter::And(Logical {
                left: Box::new(left),
                right: Box::new(right),
            }),
        }
    }

    /// Disjunction; an empty operand yields the other one unchanged.
    pub fn or(self, other: Filter) -> Filter {
        match (self, other) {
            (Filter::Empty, other) => other,
            (this, Filter::Empty) => this,
            (left, right) => Filter::Or(Logical {
                left: Box::new(left),
                right: Box::new(right),
            }),
        }
    }

    /// Left-nested conjunction of every non-empty filter in order.
    pub fn all<I>(filters: I) -> Filter
    where
        I: IntoIterator<Item = Filter>,
    {
        filters.into_iter().fold(Filter::Empty, Filter::and)
    }

    pub fn is_empty(&self) -> bool {
        matches!(self, Filter::Empty)
    }

    /// Height of the tree; leaves count as one, the empty filter as zero.
    pub fn depth(&self) -> usize {
        match self {
            Filter::Empty => 0,
            Filter::Equals(_) | Filter::Like(_) | Filter::Intersects(_) => 1,
            Filter::And(node) | Filter::Or(node) => 1 + node.left.depth().max(node.right.depth()),
        }
    }
}

fn checked_property(property: String) -> Result<String> {
    if property.trim().is_empty() {
        return Err(CswError::InvalidArgument(
            "property name must not be empty".to_string(),
        ));
    }
    Ok(property)
}

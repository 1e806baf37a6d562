//! Geometry reprojection into the catalogue's coordinate system.
//!
//! Reprojection is copy-on-transform: the input geometry is only read and a
//! new geometry is returned. [`Reprojector`] hands the coordinates to GDAL
//! (PROJ underneath) and holds nothing but its axis conventions, so one
//! instance can be shared freely between threads. The GDAL handles are
//! created per call.

use gdal::spatial_ref::CoordTransform;
use geo_types::{
    Coord, Geometry, GeometryCollection, LineString, MultiLineString, MultiPoint, MultiPolygon,
    Point, Polygon,
};
use tracing::{debug, warn};

use crate::crs::{AxisConvention, Crs};
use crate::error::{CswError, Result};
use crate::filter::SpatialOperand;

/// A backend able to move geometries between coordinate systems.
pub trait Reproject: Send + Sync {
    /// Returns `geometry`, given in `source`, expressed in `target`.
    fn reproject(&self, geometry: &Geometry<f64>, source: &str, target: &str) -> Result<Geometry<f64>>;

    /// Axis convention applied to the target system.
    fn target_convention(&self) -> AxisConvention;

    /// Reprojects and wraps the result as the operand of a spatial filter,
    /// tagged with the target system's `srsName` and precision.
    fn reproject_operand(
        &self,
        geometry: &Geometry<f64>,
        source: &str,
        target: &str,
    ) -> Result<SpatialOperand> {
        let target_crs = Crs::resolve(target, self.target_convention())?;
        let transformed = self.reproject(geometry, source, target)?;
        Ok(SpatialOperand::new(transformed, &target_crs))
    }
}

/// Reprojection through GDAL/OGR coordinate transformations.
#[derive(Debug, Clone, Copy, Default)]
pub struct Reprojector {
    source_convention: AxisConvention,
    target_convention: AxisConvention,
}

impl Reprojector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_source_convention(mut self, convention: AxisConvention) -> Self {
        self.source_convention = convention;
        self
    }

    pub fn with_target_convention(mut self, convention: AxisConvention) -> Self {
        self.target_convention = convention;
        self
    }

    /// Reprojects between two already resolved systems.
    pub fn reproject_between(
        &self,
        geometry: &Geometry<f64>,
        source: &Crs,
        target: &Crs,
    ) -> Result<Geometry<f64>> {
        if source == target {
            return try_map_coords(geometry, &|c| Ok(c));
        }

        let source_srs = source.spatial_ref()?;
        let target_srs = target.spatial_ref()?;
        let transform = CoordTransform::new(&source_srs, &target_srs).map_err(|e| {
            warn!("GDAL could not build a transform {} -> {}: {}", source, target, e);
            CswError::TransformUnavailable {
                from: source.id().to_string(),
                to: target.id().to_string(),
            }
        })?;
        debug!("Reprojecting geometry from {} to {}", source, target);

        try_map_coords(geometry, &|coord| {
            let out_of_domain = || CswError::OutOfDomain {
                crs: source.id().to_string(),
                x: coord.x,
                y: coord.y,
            };
            let mut x = [coord.x];
            let mut y = [coord.y];
            transform
                .transform_coords(&mut x, &mut y, &mut [])
                .map_err(|_| out_of_domain())?;
            if !x[0].is_finite() || !y[0].is_finite() {
                return Err(out_of_domain());
            }
            Ok(Coord { x: x[0], y: y[0] })
        })
    }
}

impl Reproject for Reprojector {
    fn reproject(&self, geometry: &Geometry<f64>, source: &str, target: &str) -> Result<Geometry<f64>> {
        let source_crs = Crs::resolve(source, self.source_convention)?;
        let target_crs = Crs::resolve(target, self.target_convention)?;
        self.reproject_between(geometry, &source_crs, &target_crs)
    }

    fn target_convention(&self) -> AxisConvention {
        self.target_convention
    }
}

/// Reprojects with authority axis order on both sides.
pub fn reproject(geometry: &Geometry<f64>, source: &str, target: &str) -> Result<Geometry<f64>> {
    Reprojector::new().reproject(geometry, source, target)
}

/// Applies a fallible coordinate function to every vertex, building a new
/// geometry. Rectangles and triangles become polygons since their corners
/// do not stay axis-aligned after a transform.
pub(crate) fn try_map_coords<F>(geometry: &Geometry<f64>, f: &F) -> Result<Geometry<f64>>
where
    F: Fn(Coord<f64>) -> Result<Coord<f64>>,
{
    let mapped = match geometry {
        Geometry::Point(p) => Geometry::Point(Point::from(f(p.0)?)),
        Geometry::Line(line) => Geometry::LineString(LineString(vec![f(line.start)?, f(line.end)?])),
        Geometry::LineString(ls) => Geometry::LineString(map_line_string(ls, f)?),
        Geometry::Polygon(poly) => Geometry::Polygon(map_polygon(poly, f)?),
        Geometry::MultiPoint(mp) => Geometry::MultiPoint(MultiPoint(
            mp.0.iter()
                .map(|p| f(p.0).map(Point::from))
                .collect::<Result<Vec<_>>>()?,
        )),
        Geometry::MultiLineString(mls) => Geometry::MultiLineString(MultiLineString(
            mls.0.iter()
                .map(|ls| map_line_string(ls, f))
                .collect::<Result<Vec<_>>>()?,
        )),
        Geometry::MultiPolygon(mp) => Geometry::MultiPolygon(MultiPolygon(
            mp.0.iter()
                .map(|poly| map_polygon(poly, f))
                .collect::<Result<Vec<_>>>()?,
        )),
        Geometry::GeometryCollection(gc) => Geometry::GeometryCollection(GeometryCollection(
            gc.0.iter()
                .map(|g| try_map_coords(g, f))
                .collect::<Result<Vec<_>>>()?,
        )),
        Geometry::Rect(rect) => Geometry::Polygon(map_polygon(&rect.to_polygon(), f)?),
        Geometry::Triangle(triangle) => Geometry::Polygon(map_polygon(&triangle.to_polygon(), f)?),
    };
    Ok(mapped)
}

fn map_line_string<F>(ls: &LineString<f64>, f: &F) -> Result<LineString<f64>>
where
    F: Fn(Coord<f64>) -> Result<Coord<f64>>,
{
    Ok(LineString(
        ls.0.iter().map(|c| f(*c)).collect::<Result<Vec<_>>>()?,
    ))
}

fn map_polygon<F>(poly: &Polygon<f64>, f: &F) -> Result<Polygon<f64>>
where
    F: Fn(Coord<f64>) -> Result<Coord<f64>>,
{
    let exterior = map_line_string(poly.exterior(), f)?;
    let interiors = poly
        .interiors()
        .iter()
        .map(|ring| map_line_string(ring, f))
        .collect::<Result<Vec<_>>>()?;
    Ok(Polygon::new(exterior, interiors))
}

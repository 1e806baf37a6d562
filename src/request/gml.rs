use geo_types::{Coord, Geometry, LineString, Point, Polygon};

use super::Names;
use crate::error::{CswError, Result};
use crate::filter::SpatialOperand;
use crate::writer::XmlWriter;

const COORDINATE_ATTRIBUTES: [(&str, &str); 3] = [("decimal", "."), ("cs", ","), ("ts", " ")];

/// Writes the operand as a GML geometry. Only the outermost element carries
/// `srsName`.
pub(super) fn write_geometry(w: &mut XmlWriter, names: &Names, operand: &SpatialOperand) -> Result<()> {
    let gml = GmlWriter {
        names,
        precision: operand.precision(),
    };
    let srs = Some(operand.srs_name());

    match operand.geometry() {
        Geometry::Point(point) => gml.point(w, point, srs),
        Geometry::LineString(ls) => gml.line_string(w, ls, srs),
        Geometry::Polygon(polygon) => gml.polygon(w, polygon, srs),
        Geometry::MultiPoint(mp) => gml.multi(w, "MultiPoint", "pointMember", srs, &mp.0, |w, p| {
            gml.point(w, p, None)
        }),
        Geometry::MultiLineString(mls) => {
            gml.multi(w, "MultiLineString", "lineStringMember", srs, &mls.0, |w, ls| {
                gml.line_string(w, ls, None)
            })
        }
        Geometry::MultiPolygon(mp) => gml.multi(w, "MultiPolygon", "polygonMember", srs, &mp.0, |w, p| {
            gml.polygon(w, p, None)
        }),
        Geometry::Rect(rect) => {
            let envelope = names.gml("Envelope");
            w.start(&envelope, &srs_attribute(srs))?;
            w.leaf(&names.gml("lowerCorner"), &[], &gml.position(rect.min()))?;
            w.leaf(&names.gml("upperCorner"), &[], &gml.position(rect.max()))?;
            w.end(&envelope)
        }
        Geometry::Line(_) | Geometry::Triangle(_) | Geometry::GeometryCollection(_) => Err(
            CswError::InvalidArgument("geometry type has no GML encoding here".to_string()),
        ),
    }
}

struct GmlWriter<'a> {
    names: &'a Names,
    precision: usize,
}

impl GmlWriter<'_> {
    fn point(&self, w: &mut XmlWriter, point: &Point<f64>, srs: Option<&str>) -> Result<()> {
        let element = self.names.gml("Point");
        w.start(&element, &srs_attribute(srs))?;
        self.coordinates(w, std::slice::from_ref(&point.0))?;
        w.end(&element)
    }

    fn line_string(&self, w: &mut XmlWriter, ls: &LineString<f64>, srs: Option<&str>) -> Result<()> {
        let element = self.names.gml("LineString");
        w.start(&element, &srs_attribute(srs))?;
        self.coordinates(w, &ls.0)?;
        w.end(&element)
    }

    /// Exterior ring first, then interiors in their original order.
    fn polygon(&self, w: &mut XmlWriter, polygon: &Polygon<f64>, srs: Option<&str>) -> Result<()> {
        let element = self.names.gml("Polygon");
        w.start(&element, &srs_attribute(srs))?;
        self.ring(w, "exterior", polygon.exterior())?;
        for interior in polygon.interiors() {
            self.ring(w, "interior", interior)?;
        }
        w.end(&element)
    }

    fn ring(&self, w: &mut XmlWriter, boundary: &str, ring: &LineString<f64>) -> Result<()> {
        let boundary = self.names.gml(boundary);
        let linear_ring = self.names.gml("LinearRing");
        w.start(&boundary, &[])?;
        w.start(&linear_ring, &[])?;
        self.coordinates(w, &ring.0)?;
        w.end(&linear_ring)?;
        w.end(&boundary)
    }

    fn multi<T, F>(
        &self,
        w: &mut XmlWriter,
        collection: &str,
        member: &str,
        srs: Option<&str>,
        items: &[T],
        write_item: F,
    ) -> Result<()>
    where
        F: Fn(&mut XmlWriter, &T) -> Result<()>,
    {
        let collection = self.names.gml(collection);
        let member = self.names.gml(member);
        w.start(&collection, &srs_attribute(srs))?;
        for item in items {
            w.start(&member, &[])?;
            write_item(w, item)?;
            w.end(&member)?;
        }
        w.end(&collection)
    }

    fn coordinates(&self, w: &mut XmlWriter, coords: &[Coord<f64>]) -> Result<()> {
        let text = coords
            .iter()
            .map(|c| {
                format!(
                    "{},{}",
                    format_coordinate(c.x, self.precision),
                    format_coordinate(c.y, self.precision)
                )
            })
            .collect::<Vec<_>>()
            .join(" ");
        w.leaf(&self.names.gml("coordinates"), &COORDINATE_ATTRIBUTES, &text)
    }

    fn position(&self, c: Coord<f64>) -> String {
        format!(
            "{} {}",
            format_coordinate(c.x, self.precision),
            format_coordinate(c.y, self.precision)
        )
    }
}

fn srs_attribute(srs: Option<&str>) -> Vec<(&str, &str)> {
    srs.map(|name| vec![("srsName", name)]).unwrap_or_default()
}

/// Formats a coordinate value with at most `precision` decimals, dropping
/// trailing zeros. Negative zero prints as `0`.
pub fn format_coordinate(value: f64, precision: usize) -> String {
    let mut text = format!("{:.*}", precision, value);
    if text.contains('.') {
        let trimmed = text.trim_end_matches('0').trim_end_matches('.').len();
        text.truncate(trimmed);
    }
    if text == "-0" {
        text = "0".to_string();
    }
    text
}

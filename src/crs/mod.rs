//! Coordinate reference systems known to the catalogue client.
//!
//! A [`Crs`] is resolved from an authority identifier through GDAL's EPSG
//! database. Only what the request compiler needs is kept from the resolved
//! `SpatialRef`: whether the system is geographic and which axis comes
//! first. The `SpatialRef` itself is rebuilt for each transform, so a
//! `Crs` is plain data that can be shared between threads.

use std::fmt;

use gdal::spatial_ref::{AxisMappingStrategy, SpatialRef};
use tracing::debug;

use crate::error::{CswError, Result};

/// Legacy code for Web Mercator still sent by older map clients.
const GOOGLE_MERCATOR: u32 = 900_913;
const WEB_MERCATOR: u32 = 3857;

/// Order of the two axes in a coordinate tuple.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AxisOrder {
    /// Easting/longitude first.
    EastNorth,
    /// Northing/latitude first.
    NorthEast,
}

/// How the axis order of a resolved system is chosen.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AxisConvention {
    /// The order defined by the authority (EPSG:4326 is latitude first).
    #[default]
    Authority,
    /// Easting/longitude first regardless of the authority definition.
    EastingFirst,
}

/// Authority identifier of a system.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CrsId {
    Epsg(u32),
    /// OGC `CRS:84`, WGS 84 with longitude first.
    Crs84,
}

impl CrsId {
    /// Parses the identifier forms found in OGC requests and GeoJSON.
    pub fn parse(identifier: &str) -> Result<CrsId> {
        let trimmed = identifier.trim();
        let upper = trimmed.to_ascii_uppercase();

        if upper == "CRS:84" || upper == "URN:OGC:DEF:CRS:OGC:1.3:CRS84" || upper == "OGC:CRS84" {
            return Ok(CrsId::Crs84);
        }

        let code = if let Some(rest) = upper.strip_prefix("EPSG:") {
            Some(rest)
        } else if let Some(rest) = upper.strip_prefix("URN:OGC:DEF:CRS:EPSG:") {
            // Optional version segment: `EPSG::3067` or `EPSG:6.18:3067`.
            rest.rsplit(':').next()
        } else if let Some(rest) = upper.strip_prefix("HTTP://WWW.OPENGIS.NET/GML/SRS/EPSG.XML#") {
            Some(rest)
        } else if let Some(rest) = upper.strip_prefix("HTTP://WWW.OPENGIS.NET/DEF/CRS/EPSG/") {
            rest.rsplit('/').next()
        } else {
            None
        };

        code.and_then(|c| c.parse::<u32>().ok())
            .map(|code| match code {
                GOOGLE_MERCATOR => CrsId::Epsg(WEB_MERCATOR),
                code => CrsId::Epsg(code),
            })
            .ok_or_else(|| CswError::UnknownCrs(trimmed.to_string()))
    }

    fn spatial_ref(self) -> gdal::errors::Result<SpatialRef> {
        match self {
            CrsId::Epsg(code) => SpatialRef::from_epsg(code),
            CrsId::Crs84 => SpatialRef::from_definition("OGC:CRS84"),
        }
    }
}

impl fmt::Display for CrsId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CrsId::Epsg(code) => write!(f, "EPSG:{}", code),
            CrsId::Crs84 => f.write_str("CRS:84"),
        }
    }
}

/// A resolved coordinate reference system.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Crs {
    id: CrsId,
    geographic: bool,
    authority_order: AxisOrder,
    axis_order: AxisOrder,
}

impl Crs {
    /// Resolves `identifier` using the authority-defined axis order.
    pub fn decode(identifier: &str) -> Result<Crs> {
        Self::resolve(identifier, AxisConvention::Authority)
    }

    pub fn resolve(identifier: &str, convention: AxisConvention) -> Result<Crs> {
        let id = CrsId::parse(identifier)?;
        let srs = id.spatial_ref().map_err(|e| {
            debug!("GDAL cannot resolve {}: {}", identifier.trim(), e);
            CswError::UnknownCrs(identifier.trim().to_string())
        })?;

        let authority_order = authority_axis_order(&srs, id);
        let axis_order = match convention {
            AxisConvention::Authority => authority_order,
            AxisConvention::EastingFirst => AxisOrder::EastNorth,
        };
        let crs = Crs {
            id,
            geographic: srs.is_geographic(),
            authority_order,
            axis_order,
        };
        debug!("Resolved {} with {:?} axes", crs.id, crs.axis_order);
        Ok(crs)
    }

    pub fn id(&self) -> CrsId {
        self.id
    }

    pub fn axis_order(&self) -> AxisOrder {
        self.axis_order
    }

    pub fn is_geographic(&self) -> bool {
        self.geographic
    }

    /// Decimal places worth emitting for a coordinate in this system:
    /// roughly a millimetre on the ground.
    pub fn coordinate_precision(&self) -> usize {
        if self.geographic {
            8
        } else {
            3
        }
    }

    /// Name for the `srsName` attribute. Easting-first coordinates use the
    /// plain `EPSG:` form which catalogues read as longitude first; the URN
    /// form promises the authority axis order.
    pub fn srs_name(&self) -> String {
        match (self.id, self.axis_order) {
            (CrsId::Crs84, _) => "CRS:84".to_string(),
            (CrsId::Epsg(code), AxisOrder::NorthEast) => format!("urn:ogc:def:crs:EPSG::{}", code),
            (CrsId::Epsg(code), AxisOrder::EastNorth) => format!("EPSG:{}", code),
        }
    }

    /// Builds the GDAL spatial reference with a data axis mapping that
    /// matches this system's axis order.
    pub fn spatial_ref(&self) -> Result<SpatialRef> {
        let mut srs = self
            .id
            .spatial_ref()
            .map_err(|_| CswError::UnknownCrs(self.id.to_string()))?;
        let strategy = if self.axis_order == self.authority_order {
            AxisMappingStrategy::AuthorityCompliant
        } else {
            AxisMappingStrategy::TraditionalGisOrder
        };
        srs.set_axis_mapping_strategy(strategy);
        Ok(srs)
    }
}

impl fmt::Display for Crs {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.id)
    }
}

/// Reads the first axis of the system definition. Northing and latitude
/// first means the authority puts the north axis first.
fn authority_axis_order(srs: &SpatialRef, id: CrsId) -> AxisOrder {
    if id == CrsId::Crs84 {
        return AxisOrder::EastNorth;
    }
    let key = if srs.is_projected() { "PROJCS" } else { "GEOGCS" };
    match srs.axis_name(key, 0) {
        Ok(name) => {
            let name = name.to_ascii_lowercase();
            if name.contains("lat") || name.contains("north") || name.contains("south") {
                AxisOrder::NorthEast
            } else {
                AxisOrder::EastNorth
            }
        }
        Err(e) => {
            debug!("No axis information for {} ({}), assuming the EPSG default", id, e);
            if srs.is_geographic() {
                AxisOrder::NorthEast
            } else {
                AxisOrder::EastNorth
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_identifier_forms() {
        let forms = [
            "EPSG:3067",
            "epsg:3067",
            "urn:ogc:def:crs:EPSG::3067",
            "urn:ogc:def:crs:EPSG:6.18:3067",
            "http://www.opengis.net/gml/srs/epsg.xml#3067",
            "http://www.opengis.net/def/crs/EPSG/0/3067",
        ];
        for form in forms {
            assert_eq!(CrsId::parse(form).unwrap(), CrsId::Epsg(3067), "{}", form);
        }
        assert_eq!(CrsId::parse("CRS:84").unwrap(), CrsId::Crs84);
        assert_eq!(CrsId::parse("EPSG:900913").unwrap(), CrsId::Epsg(3857));
    }

    #[test]
    fn test_unknown_identifiers() {
        assert!(matches!(CrsId::parse("foo:1"), Err(CswError::UnknownCrs(_))));
        assert!(matches!(CrsId::parse("EPSG:abc"), Err(CswError::UnknownCrs(_))));
        assert_eq!(
            Crs::decode("EPSG:999999"),
            Err(CswError::UnknownCrs("EPSG:999999".to_string()))
        );
    }

    #[test]
    fn test_authority_axis_order() {
        let wgs84 = Crs::decode("EPSG:4326").unwrap();
        assert_eq!(wgs84.axis_order(), AxisOrder::NorthEast);
        assert_eq!(wgs84.srs_name(), "urn:ogc:def:crs:EPSG::4326");

        let lon_first = Crs::resolve("EPSG:4326", AxisConvention::EastingFirst).unwrap();
        assert_eq!(lon_first.axis_order(), AxisOrder::EastNorth);
        assert_eq!(lon_first.srs_name(), "EPSG:4326");

        assert_eq!(Crs::decode("CRS:84").unwrap().axis_order(), AxisOrder::EastNorth);
        assert_eq!(Crs::decode("EPSG:3067").unwrap().axis_order(), AxisOrder::EastNorth);
        assert_eq!(Crs::decode("EPSG:3006").unwrap().axis_order(), AxisOrder::NorthEast);
    }

    #[test]
    fn test_systems_outside_the_nordic_region() {
        for code in ["EPSG:3035", "EPSG:2154", "EPSG:3395", "EPSG:4937", "EPSG:32633"] {
            let crs = Crs::decode(code).unwrap_or_else(|e| panic!("{}: {}", code, e));
            assert_eq!(crs.id().to_string(), code);
        }
    }

    #[test]
    fn test_precision_depends_on_units() {
        assert!(Crs::decode("EPSG:4326").unwrap().is_geographic());
        assert_eq!(Crs::decode("EPSG:4326").unwrap().coordinate_precision(), 8);
        assert_eq!(Crs::decode("EPSG:4258").unwrap().coordinate_precision(), 8);
        assert_eq!(Crs::decode("EPSG:3067").unwrap().coordinate_precision(), 3);
        assert_eq!(Crs::decode("EPSG:3857").unwrap().coordinate_precision(), 3);
    }

    #[test]
    fn test_spatial_ref_mapping_strategy() {
        let authority = Crs::decode("EPSG:4326").unwrap().spatial_ref().unwrap();
        assert_eq!(authority.axis_mapping_strategy(), AxisMappingStrategy::AuthorityCompliant);

        let lon_first = Crs::resolve("EPSG:4326", AxisConvention::EastingFirst)
            .unwrap()
            .spatial_ref()
            .unwrap();
        assert_eq!(lon_first.axis_mapping_strategy(), AxisMappingStrategy::TraditionalGisOrder);
    }
}

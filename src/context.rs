//! Request-level parameters of a `GetRecords` call.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{CswError, Result};

pub const CSW_NAMESPACE: &str = "http://www.opengis.net/cat/csw/2.0.2";
pub const OGC_NAMESPACE: &str = "http://www.opengis.net/ogc";
pub const GML_NAMESPACE: &str = "http://www.opengis.net/gml";
pub const GMD_NAMESPACE: &str = "http://www.isotc211.org/2005/gmd";
pub const OWS_NAMESPACE: &str = "http://www.opengis.net/ows";
pub const APISO_NAMESPACE: &str = "http://www.opengis.net/cat/csw/apiso/1.0";

/// How many records the catalogue returns, and in what form.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResultType {
    Hits,
    #[default]
    Results,
    Validate,
}

impl ResultType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ResultType::Hits => "hits",
            ResultType::Results => "results",
            ResultType::Validate => "validate",
        }
    }
}

impl FromStr for ResultType {
    type Err = CswError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "hits" => Ok(ResultType::Hits),
            "results" => Ok(ResultType::Results),
            "validate" => Ok(ResultType::Validate),
            other => Err(CswError::InvalidArgument(format!("unknown result type '{}'", other))),
        }
    }
}

impl fmt::Display for ResultType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Which metadata fields each returned record carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ElementSetName {
    Brief,
    Summary,
    #[default]
    Full,
}

impl ElementSetName {
    pub fn as_str(&self) -> &'static str {
        match self {
            ElementSetName::Brief => "brief",
            ElementSetName::Summary => "summary",
            ElementSetName::Full => "full",
        }
    }
}

impl FromStr for ElementSetName {
    type Err = CswError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "brief" => Ok(ElementSetName::Brief),
            "summary" => Ok(ElementSetName::Summary),
            "full" => Ok(ElementSetName::Full),
            other => Err(CswError::InvalidArgument(format!("unknown element set '{}'", other))),
        }
    }
}

impl fmt::Display for ElementSetName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Prefix to URI bindings, kept in insertion order so the declarations a
/// document carries are reproducible.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Namespaces {
    bindings: Vec<(String, String)>,
}

impl Default for Namespaces {
    fn default() -> Self {
        let mut namespaces = Namespaces::empty();
        for (prefix, uri) in [
            ("csw", CSW_NAMESPACE),
            ("ogc", OGC_NAMESPACE),
            ("gml", GML_NAMESPACE),
            ("gmd", GMD_NAMESPACE),
            ("ows", OWS_NAMESPACE),
            ("apiso", APISO_NAMESPACE),
        ] {
            namespaces.bind(prefix, uri);
        }
        namespaces
    }
}

impl Namespaces {
    pub fn empty() -> Self {
        Namespaces { bindings: Vec::new() }
    }

    /// Binds `prefix`, replacing an earlier binding in place.
    pub fn bind(&mut self, prefix: impl Into<String>, uri: impl Into<String>) {
        let prefix = prefix.into();
        let uri = uri.into();
        match self.bindings.iter_mut().find(|(p, _)| *p == prefix) {
            Some(binding) => binding.1 = uri,
            None => self.bindings.push((prefix, uri)),
        }
    }

    pub fn unbind(&mut self, prefix: &str) {
        self.bindings.retain(|(p, _)| p != prefix);
    }

    pub fn uri(&self, prefix: &str) -> Option<&str> {
        self.bindings
            .iter()
            .find(|(p, _)| p == prefix)
            .map(|(_, uri)| uri.as_str())
    }

    /// First prefix bound to `uri`.
    pub fn prefix_for(&self, uri: &str) -> Option<&str> {
        self.bindings
            .iter()
            .find(|(_, u)| u == uri)
            .map(|(p, _)| p.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.bindings.iter().map(|(p, u)| (p.as_str(), u.as_str()))
    }
}

/// Non-filter parameters of one outgoing `GetRecords` request.
#[derive(Debug, Clone, PartialEq)]
pub struct RequestContext {
    pub result_type: ResultType,
    pub element_set: ElementSetName,
    pub output_schema: String,
    pub output_format: String,
    pub type_names: Vec<String>,
    pub namespaces: Namespaces,
    /// Queryable the spatial operand is compared against.
    pub spatial_property: String,
    /// Queryable used for free-text search.
    pub text_property: String,
    /// Catalogue's coordinate system for spatial operands. The axis order
    /// is chosen by the reprojector that produces the operands.
    pub target_crs: String,
    pub max_records: u32,
    pub start_position: u32,
    pub constraint_version: String,
    /// Indent the generated document.
    pub indent: bool,
}

impl Default for RequestContext {
    fn default() -> Self {
        RequestContext {
            result_type: ResultType::default(),
            element_set: ElementSetName::default(),
            output_schema: GMD_NAMESPACE.to_string(),
            output_format: "application/xml".to_string(),
            type_names: vec!["gmd:MD_Metadata".to_string()],
            namespaces: Namespaces::default(),
            spatial_property: "ows:BoundingBox".to_string(),
            text_property: "csw:AnyText".to_string(),
            target_crs: "EPSG:4326".to_string(),
            max_records: 10_000,
            start_position: 1,
            constraint_version: "1.1.0".to_string(),
            indent: true,
        }
    }
}

impl RequestContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_result_type(mut self, result_type: ResultType) -> Self {
        self.result_type = result_type;
        self
    }

    pub fn with_element_set(mut self, element_set: ElementSetName) -> Self {
        self.element_set = element_set;
        self
    }

    pub fn with_output_schema(mut self, output_schema: impl Into<String>) -> Self {
        self.output_schema = output_schema.into();
        self
    }

    pub fn with_type_names<I, S>(mut self, type_names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.type_names = type_names.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_namespace(mut self, prefix: impl Into<String>, uri: impl Into<String>) -> Self {
        self.namespaces.bind(prefix, uri);
        self
    }

    pub fn with_spatial_property(mut self, property: impl Into<String>) -> Self {
        self.spatial_property = property.into();
        self
    }

    pub fn with_target_crs(mut self, crs: impl Into<String>) -> Self {
        self.target_crs = crs.into();
        self
    }

    pub fn with_paging(mut self, start_position: u32, max_records: u32) -> Self {
        self.start_position = start_position;
        self.max_records = max_records;
        self
    }

    pub fn with_indent(mut self, indent: bool) -> Self {
        self.indent = indent;
        self
    }

    /// Checks the parameters that do not depend on the filter.
    pub fn validate(&self) -> Result<()> {
        if self.type_names.is_empty() {
            return Err(CswError::InvalidArgument(
                "at least one type name is required".to_string(),
            ));
        }
        if self.type_names.iter().any(|t| t.trim().is_empty()) {
            return Err(CswError::InvalidArgument("type names must not be empty".to_string()));
        }
        if self.start_position == 0 {
            return Err(CswError::InvalidArgument(
                "startPosition is 1-based".to_string(),
            ));
        }
        Ok(())
    }
}

use thiserror::Error;

/// Errors raised while building filters, reprojecting geometries or
/// compiling a `GetRecords` request.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum CswError {
    /// Malformed or empty required input at construction time.
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Unknown coordinate reference system: {0}")]
    UnknownCrs(String),

    #[error("No transform available from {from} to {to}")]
    TransformUnavailable { from: String, to: String },

    /// The coordinate lies outside the area the projection can represent.
    #[error("Coordinate ({x}, {y}) is outside the domain of {crs}")]
    OutOfDomain { crs: String, x: f64, y: f64 },

    #[error("GetRecords request requires a filter; pass an empty filter to request all records")]
    MissingFilter,

    /// Element nesting was violated while writing; always a compiler bug.
    #[error("Malformed document: {0}")]
    MalformedDocument(String),

    #[error("Invalid GeoJSON: {0}")]
    GeoJson(String),
}

pub type Result<T> = std::result::Result<T, CswError>;

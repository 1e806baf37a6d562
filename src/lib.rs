pub mod context;
pub mod criteria;
pub mod crs;
pub mod error;
pub mod filter;
pub mod geojson;
pub mod reproject;
pub mod request;
pub mod writer;

pub use context::{ElementSetName, Namespaces, RequestContext, ResultType};
pub use criteria::{FieldValue, SearchCriteria};
pub use crs::{AxisConvention, Crs, CrsId};
pub use error::{CswError, Result};
pub use filter::{Filter, LikeOptions, SpatialOperand};
pub use reproject::{reproject, Reproject, Reprojector};
pub use request::{compile, compile_bytes};

//! Catalogue search criteria as sent by a search form.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

use crate::context::RequestContext;
use crate::error::{CswError, Result};
use crate::filter::{Filter, LikeOptions};
use crate::geojson;
use crate::reproject::Reproject;

/// An `equals` clause of a search.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldValue {
    pub property: String,
    #[serde(default)]
    pub value: String,
}

/// The criteria of one catalogue search. Every part is optional; blank
/// parts add no clause.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct SearchCriteria {
    /// Free text matched anywhere in the record.
    pub text: Option<String>,
    pub equals: Vec<FieldValue>,
    /// Coverage area as GeoJSON.
    pub coverage: Option<Value>,
    /// System of `coverage` when the GeoJSON does not state one.
    pub coverage_crs: Option<String>,
}

impl SearchCriteria {
    /// Builds the filter: free text first, then the field clauses in order,
    /// then the coverage area reprojected to the catalogue's system.
    pub fn to_filter(
        &self,
        context: &RequestContext,
        like: &LikeOptions,
        reprojector: &dyn Reproject,
    ) -> Result<Filter> {
        let mut clauses = Vec::new();

        if let Some(text) = self.text.as_deref().map(str::trim).filter(|t| !t.is_empty()) {
            clauses.push(Filter::like(
                context.text_property.as_str(),
                like.contains_pattern(text),
                *like,
            )?);
        }

        for field in &self.equals {
            clauses.push(Filter::equals(field.property.as_str(), field.value.trim())?);
        }

        if let Some(coverage) = &self.coverage {
            clauses.push(self.coverage_filter(coverage, context, reprojector)?);
        }

        let filter = Filter::all(clauses);
        debug!("Search criteria produced a filter of depth {}", filter.depth());
        Ok(filter)
    }

    fn coverage_filter(
        &self,
        coverage: &Value,
        context: &RequestContext,
        reprojector: &dyn Reproject,
    ) -> Result<Filter> {
        let coverage = geojson::coverage_from_value(coverage)?;
        let source = coverage
            .crs
            .or_else(|| self.coverage_crs.clone())
            .ok_or_else(|| {
                CswError::InvalidArgument("coverage geometry has no coordinate reference system".to_string())
            })?;

        let operand = reprojector.reproject_operand(&coverage.geometry, &source, &context.target_crs)?;
        Filter::intersects(context.spatial_property.as_str(), operand)
    }
}

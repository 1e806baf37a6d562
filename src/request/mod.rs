//! `GetRecords` request compiler.
//!
//! [`compile`] is a pure function of a [`RequestContext`] and a [`Filter`]:
//! it either returns the complete document or an error, never a partial
//! document. Element prefixes are taken from the context's bindings by
//! namespace URI, and the root declares exactly the bindings the document
//! refers to.

mod filter_encoding;
mod gml;

use tracing::{debug, info};

use crate::context::{RequestContext, CSW_NAMESPACE, GML_NAMESPACE, OGC_NAMESPACE};
use crate::error::{CswError, Result};
use crate::filter::Filter;
use crate::writer::XmlWriter;

pub use gml::format_coordinate;

/// Qualified names for the three namespaces the compiler writes elements in.
pub(crate) struct Names {
    csw: String,
    ogc: String,
    gml: String,
}

impl Names {
    pub(crate) fn csw(&self, local: &str) -> String {
        format!("{}:{}", self.csw, local)
    }

    pub(crate) fn ogc(&self, local: &str) -> String {
        format!("{}:{}", self.ogc, local)
    }

    pub(crate) fn gml(&self, local: &str) -> String {
        format!("{}:{}", self.gml, local)
    }
}

/// Compiles a `GetRecords` request.
///
/// `filter` must be given; pass [`Filter::Empty`] to request every record.
/// A missing filter is reported as [`CswError::MissingFilter`] rather than
/// silently widening the query.
pub fn compile(context: &RequestContext, filter: Option<&Filter>) -> Result<String> {
    let filter = filter.ok_or(CswError::MissingFilter)?;
    context.validate()?;

    let (names, used_prefixes) = resolve_prefixes(context, filter)?;

    let mut w = XmlWriter::new(context.indent);
    for (prefix, uri) in context.namespaces.iter() {
        if used_prefixes.iter().any(|p| p == prefix) {
            w.declare(prefix, uri)?;
        }
    }

    let root = names.csw("GetRecords");
    let max_records = context.max_records.to_string();
    let start_position = context.start_position.to_string();
    w.start(
        &root,
        &[
            ("service", "CSW"),
            ("version", "2.0.2"),
            ("resultType", context.result_type.as_str()),
            ("outputFormat", context.output_format.as_str()),
            ("outputSchema", context.output_schema.as_str()),
            ("startPosition", start_position.as_str()),
            ("maxRecords", max_records.as_str()),
        ],
    )?;

    let query = names.csw("Query");
    let type_names = context.type_names.join(" ");
    w.start(&query, &[("typeNames", type_names.as_str())])?;
    w.leaf(&names.csw("ElementSetName"), &[], context.element_set.as_str())?;

    if !filter.is_empty() {
        let constraint = names.csw("Constraint");
        let ogc_filter = names.ogc("Filter");
        w.start(&constraint, &[("version", context.constraint_version.as_str())])?;
        w.start(&ogc_filter, &[])?;
        filter_encoding::write_filter(&mut w, &names, filter)?;
        w.end(&ogc_filter)?;
        w.end(&constraint)?;
    }

    w.end(&query)?;
    w.end(&root)?;
    let document = w.finish()?;

    info!(
        "Compiled GetRecords request ({} bytes, filter depth {})",
        document.len(),
        filter.depth()
    );
    Ok(document)
}

/// Same as [`compile`], as UTF-8 bytes ready for a request body.
pub fn compile_bytes(context: &RequestContext, filter: Option<&Filter>) -> Result<Vec<u8>> {
    compile(context, filter).map(String::into_bytes)
}

/// Finds the element prefixes and every prefix the document will refer to,
/// in element names or in QName values.
fn resolve_prefixes(context: &RequestContext, filter: &Filter) -> Result<(Names, Vec<String>)> {
    let namespaces = &context.namespaces;
    let lookup = |uri: &str, what: &str| -> Result<String> {
        namespaces
            .prefix_for(uri)
            .map(str::to_string)
            .ok_or_else(|| CswError::InvalidArgument(format!("no prefix bound to the {} namespace {}", what, uri)))
    };

    let mut used = Vec::new();
    let csw = lookup(CSW_NAMESPACE, "CSW")?;
    used.push(csw.clone());

    let mut ogc = String::new();
    let mut gml = String::new();
    if !filter.is_empty() {
        ogc = lookup(OGC_NAMESPACE, "OGC filter")?;
        used.push(ogc.clone());
    }
    if contains_spatial(filter) {
        gml = lookup(GML_NAMESPACE, "GML")?;
        used.push(gml.clone());
    }

    let mut qnames: Vec<&str> = context.type_names.iter().map(String::as_str).collect();
    collect_property_names(filter, &mut qnames);
    for qname in qnames {
        if let Some((prefix, _)) = qname.split_once(':') {
            if namespaces.uri(prefix).is_none() {
                return Err(CswError::InvalidArgument(format!(
                    "prefix '{}' of '{}' is not bound in the request context",
                    prefix, qname
                )));
            }
            if !used.iter().any(|p| p == prefix) {
                used.push(prefix.to_string());
            }
        }
    }

    debug!("Namespace prefixes referenced by the request: {:?}", used);
    Ok((Names { csw, ogc, gml }, used))
}

fn contains_spatial(filter: &Filter) -> bool {
    match filter {
        Filter::Intersects(_) => true,
        Filter::And(node) | Filter::Or(node) => contains_spatial(node.left()) || contains_spatial(node.right()),
        Filter::Empty | Filter::Equals(_) | Filter::Like(_) => false,
    }
}

fn collect_property_names<'a>(filter: &'a Filter, out: &mut Vec<&'a str>) {
    match filter {
        Filter::Empty => {}
        Filter::Equals(eq) => out.push(eq.property()),
        Filter::Like(like) => out.push(like.property()),
        Filter::Intersects(intersects) => out.push(intersects.property()),
        Filter::And(node) | Filter::Or(node) => {
            collect_property_names(node.left(), out);
            collect_property_names(node.right(), out);
        }
    }
}

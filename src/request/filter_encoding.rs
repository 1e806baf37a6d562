use super::{gml, Names};
use crate::error::Result;
use crate::filter::Filter;
use crate::writer::XmlWriter;

/// Writes `filter` in the OGC Filter Encoding 1.1 grammar. Logical nodes
/// are nested exactly as in the tree, left child first.
pub(super) fn write_filter(w: &mut XmlWriter, names: &Names, filter: &Filter) -> Result<()> {
    match filter {
        Filter::Empty => Ok(()),
        Filter::Equals(eq) => {
            let element = names.ogc("PropertyIsEqualTo");
            w.start(&element, &[])?;
            w.leaf(&names.ogc("PropertyName"), &[], eq.property())?;
            w.leaf(&names.ogc("Literal"), &[], eq.literal())?;
            w.end(&element)
        }
        Filter::Like(like) => {
            let options = like.options();
            let wildcard = options.wildcard.to_string();
            let single_char = options.single_char.to_string();
            let escape = options.escape.to_string();
            let match_case = options.match_case.to_string();

            let element = names.ogc("PropertyIsLike");
            w.start(
                &element,
                &[
                    ("wildCard", wildcard.as_str()),
                    ("singleChar", single_char.as_str()),
                    ("escapeChar", escape.as_str()),
                    ("matchCase", match_case.as_str()),
                ],
            )?;
            w.leaf(&names.ogc("PropertyName"), &[], like.property())?;
            w.leaf(&names.ogc("Literal"), &[], like.pattern())?;
            w.end(&element)
        }
        Filter::Intersects(intersects) => {
            let element = names.ogc("Intersects");
            w.start(&element, &[])?;
            w.leaf(&names.ogc("PropertyName"), &[], intersects.property())?;
            gml::write_geometry(w, names, intersects.operand())?;
            w.end(&element)
        }
        Filter::And(node) | Filter::Or(node) => {
            let element = if matches!(filter, Filter::And(_)) {
                names.ogc("And")
            } else {
                names.ogc("Or")
            };
            w.start(&element, &[])?;
            write_filter(w, names, node.left())?;
            write_filter(w, names, node.right())?;
            w.end(&element)
        }
    }
}

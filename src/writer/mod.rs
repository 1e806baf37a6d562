//! Namespace-aware XML writer on top of `quick-xml`.
//!
//! The writer keeps a stack of open elements and refuses to close anything
//! but the innermost one. Namespace declarations are collected before the
//! root element is written and attached to it; every prefixed element or
//! attribute name written afterwards must use one of them. Text and
//! attribute values are escaped by `quick-xml`.

use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use quick_xml::Writer;

use crate::error::{CswError, Result};

pub struct XmlWriter {
    writer: Writer<Vec<u8>>,
    stack: Vec<String>,
    declarations: Vec<(String, String)>,
    root_written: bool,
}

impl XmlWriter {
    pub fn new(indent: bool) -> Self {
        let writer = if indent {
            Writer::new_with_indent(Vec::new(), b' ', 2)
        } else {
            Writer::new(Vec::new())
        };
        XmlWriter {
            writer,
            stack: Vec::new(),
            declarations: Vec::new(),
            root_written: false,
        }
    }

    /// Declares `prefix` on the root element. Only allowed before the root
    /// is started.
    pub fn declare(&mut self, prefix: &str, uri: &str) -> Result<()> {
        if self.root_written {
            return Err(CswError::MalformedDocument(format!(
                "namespace '{}' declared after the root element",
                prefix
            )));
        }
        if let Some((_, existing)) = self.declarations.iter().find(|(p, _)| p == prefix) {
            if existing != uri {
                return Err(CswError::MalformedDocument(format!(
                    "prefix '{}' declared for both {} and {}",
                    prefix, existing, uri
                )));
            }
            return Ok(());
        }
        self.declarations.push((prefix.to_string(), uri.to_string()));
        Ok(())
    }

    pub fn start(&mut self, name: &str, attributes: &[(&str, &str)]) -> Result<()> {
        if self.root_written && self.stack.is_empty() {
            return Err(CswError::MalformedDocument(format!(
                "element <{}> after the root element was closed",
                name
            )));
        }
        self.check_prefix(name)?;
        for (key, _) in attributes {
            self.check_prefix(key)?;
        }

        let mut start = BytesStart::new(name);
        if !self.root_written {
            self.emit(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)))?;
            for (prefix, uri) in &self.declarations {
                let key = format!("xmlns:{}", prefix);
                start.push_attribute((key.as_str(), uri.as_str()));
            }
            self.root_written = true;
        }
        for attribute in attributes {
            start.push_attribute(*attribute);
        }

        self.emit(Event::Start(start))?;
        self.stack.push(name.to_string());
        Ok(())
    }

    pub fn text(&mut self, text: &str) -> Result<()> {
        if self.stack.is_empty() {
            return Err(CswError::MalformedDocument(
                "text outside of an element".to_string(),
            ));
        }
        self.emit(Event::Text(BytesText::new(text)))
    }

    /// Closes the innermost open element, which must be `name`.
    pub fn end(&mut self, name: &str) -> Result<()> {
        match self.stack.last() {
            Some(open) if open == name => {}
            Some(open) => {
                return Err(CswError::MalformedDocument(format!(
                    "cannot close <{}> while <{}> is open",
                    name, open
                )))
            }
            None => {
                return Err(CswError::MalformedDocument(format!(
                    "cannot close <{}>: no element is open",
                    name
                )))
            }
        }
        self.emit(Event::End(BytesEnd::new(name)))?;
        self.stack.pop();
        Ok(())
    }

    /// Writes an element holding only text.
    pub fn leaf(&mut self, name: &str, attributes: &[(&str, &str)], text: &str) -> Result<()> {
        self.start(name, attributes)?;
        self.text(text)?;
        self.end(name)
    }

    pub fn depth(&self) -> usize {
        self.stack.len()
    }

    /// Returns the finished document. Fails if no root was written or an
    /// element is still open.
    pub fn finish(self) -> Result<String> {
        if !self.root_written {
            return Err(CswError::MalformedDocument("document has no root element".to_string()));
        }
        if let Some(open) = self.stack.last() {
            return Err(CswError::MalformedDocument(format!(
                "{} element(s) left open, innermost <{}>",
                self.stack.len(),
                open
            )));
        }
        String::from_utf8(self.writer.into_inner())
            .map_err(|e| CswError::MalformedDocument(format!("document is not UTF-8: {}", e)))
    }

    fn check_prefix(&self, name: &str) -> Result<()> {
        let Some((prefix, _)) = name.split_once(':') else {
            return Ok(());
        };
        if prefix == "xmlns" || prefix == "xml" || self.declarations.iter().any(|(p, _)| p == prefix) {
            return Ok(());
        }
        Err(CswError::MalformedDocument(format!(
            "prefix '{}' of <{}> is not declared",
            prefix, name
        )))
    }

    fn emit(&mut self, event: Event<'_>) -> Result<()> {
        self.writer
            .write_event(event)
            .map_err(|e| CswError::MalformedDocument(format!("failed to write XML: {}", e)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn writer() -> XmlWriter {
        let mut w = XmlWriter::new(false);
        w.declare("a", "urn:a").unwrap();
        w
    }

    #[test]
    fn test_root_carries_declarations() {
        let mut w = writer();
        w.declare("b", "urn:b").unwrap();
        w.start("a:root", &[("version", "1")]).unwrap();
        w.leaf("b:child", &[], "x").unwrap();
        w.end("a:root").unwrap();
        let xml = w.finish().unwrap();
        assert_eq!(
            xml,
            r#"<?xml version="1.0" encoding="UTF-8"?><a:root xmlns:a="urn:a" xmlns:b="urn:b" version="1"><b:child>x</b:child></a:root>"#
        );
    }

    #[test]
    fn test_escapes_text_and_attributes() {
        let mut w = writer();
        w.start("a:root", &[("q", r#"1 < 2 & "3""#)]).unwrap();
        w.text("<tag> & 'quote'").unwrap();
        w.end("a:root").unwrap();
        let xml = w.finish().unwrap();
        assert!(xml.contains("&lt;tag&gt; &amp;"), "{}", xml);
        assert!(xml.contains(r#"q="1 &lt; 2 &amp; &quot;3&quot;""#), "{}", xml);
    }

    #[test]
    fn test_mismatched_end_is_rejected() {
        let mut w = writer();
        w.start("a:root", &[]).unwrap();
        w.start("a:child", &[]).unwrap();
        assert!(matches!(w.end("a:root"), Err(CswError::MalformedDocument(_))));
        assert_eq!(w.depth(), 2);
    }

    #[test]
    fn test_unbalanced_document_fails_to_finish() {
        let mut w = writer();
        w.start("a:root", &[]).unwrap();
        w.start("a:child", &[]).unwrap();
        w.end("a:child").unwrap();
        assert!(matches!(w.finish(), Err(CswError::MalformedDocument(_))));

        assert!(matches!(writer().finish(), Err(CswError::MalformedDocument(_))));
    }

    #[test]
    fn test_undeclared_prefix_is_rejected() {
        let mut w = writer();
        assert!(matches!(w.start("z:root", &[]), Err(CswError::MalformedDocument(_))));
        w.start("a:root", &[]).unwrap();
        assert!(matches!(
            w.start("a:child", &[("z:attr", "1")]),
            Err(CswError::MalformedDocument(_))
        ));
    }

    #[test]
    fn test_declarations_are_root_only() {
        let mut w = writer();
        w.start("a:root", &[]).unwrap();
        assert!(matches!(w.declare("b", "urn:b"), Err(CswError::MalformedDocument(_))));
    }

    #[test]
    fn test_conflicting_declaration() {
        let mut w = writer();
        assert!(w.declare("a", "urn:a").is_ok());
        assert!(matches!(w.declare("a", "urn:other"), Err(CswError::MalformedDocument(_))));
    }

    #[test]
    fn test_single_root() {
        let mut w = writer();
        w.leaf("a:root", &[], "1").unwrap();
        assert!(matches!(w.start("a:root", &[]), Err(CswError::MalformedDocument(_))));
        assert!(matches!(w.text("x"), Err(CswError::MalformedDocument(_))));
    }
}

//! Structural comparison of XML documents for the golden-file tests.
//!
//! Whitespace between elements and the order of attributes are ignored.
//! Element order is significant. The text of `gml:coordinates` is compared
//! number by number within a tolerance.

use std::collections::BTreeMap;
use std::fs;
use std::path::PathBuf;

use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;

const COORDINATE_TOLERANCE: f64 = 1e-6;

#[derive(Debug, Clone, PartialEq)]
pub struct Node {
    pub name: String,
    pub attributes: BTreeMap<String, String>,
    pub text: String,
    pub children: Vec<Node>,
}

pub fn fixture(name: &str) -> String {
    let path = PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("fixtures")
        .join(name);
    fs::read_to_string(&path).unwrap_or_else(|e| panic!("cannot read {}: {}", path.display(), e))
}

pub fn parse(xml: &str) -> Node {
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(true);

    let mut stack: Vec<Node> = Vec::new();
    let mut root = None;
    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) => stack.push(node(&e)),
            Ok(Event::Empty(e)) => close(node(&e), &mut stack, &mut root),
            Ok(Event::Text(t)) => {
                let text = t.unescape().expect("text should unescape");
                if let Some(open) = stack.last_mut() {
                    open.text.push_str(&text);
                }
            }
            Ok(Event::End(_)) => {
                let finished = stack.pop().expect("end tag without start tag");
                close(finished, &mut stack, &mut root);
            }
            Ok(Event::Eof) => break,
            Ok(_) => {}
            Err(e) => panic!("invalid XML at {}: {}", reader.buffer_position(), e),
        }
    }
    assert!(stack.is_empty(), "unclosed elements: {:?}", stack);
    root.expect("document has no root element")
}

fn node(start: &BytesStart) -> Node {
    let name = String::from_utf8_lossy(start.name().as_ref()).into_owned();
    let attributes = start
        .attributes()
        .map(|a| {
            let a = a.expect("attribute should parse");
            let key = String::from_utf8_lossy(a.key.as_ref()).into_owned();
            let value = a.unescape_value().expect("attribute should unescape").into_owned();
            (key, value)
        })
        .collect();
    Node {
        name,
        attributes,
        text: String::new(),
        children: Vec::new(),
    }
}

fn close(finished: Node, stack: &mut [Node], root: &mut Option<Node>) {
    match stack.last_mut() {
        Some(parent) => parent.children.push(finished),
        None => *root = Some(finished),
    }
}

/// Panics with the path of the first difference between the two documents.
pub fn assert_similar(actual: &str, expected: &str) {
    let actual_tree = parse(actual);
    let expected_tree = parse(expected);
    if let Err(difference) = compare(&actual_tree, &expected_tree, "") {
        panic!("{}\n--- actual ---\n{}", difference, actual);
    }
}

fn compare(actual: &Node, expected: &Node, path: &str) -> Result<(), String> {
    let path = format!("{}/{}", path, expected.name);
    if actual.name != expected.name {
        return Err(format!("{}: found <{}>", path, actual.name));
    }
    if actual.attributes != expected.attributes {
        return Err(format!(
            "{}: attributes differ\n  actual:   {:?}\n  expected: {:?}",
            path, actual.attributes, expected.attributes
        ));
    }

    let same_text = if expected.name.ends_with(":coordinates") {
        coordinates_match(&actual.text, &expected.text)
    } else {
        actual.text == expected.text
    };
    if !same_text {
        return Err(format!(
            "{}: text differs\n  actual:   {:?}\n  expected: {:?}",
            path, actual.text, expected.text
        ));
    }

    if actual.children.len() != expected.children.len() {
        return Err(format!(
            "{}: {} children, expected {}",
            path,
            actual.children.len(),
            expected.children.len()
        ));
    }
    for (a, e) in actual.children.iter().zip(&expected.children) {
        compare(a, e, &path)?;
    }
    Ok(())
}

/// Parses a `cs="," ts=" "` coordinate list.
pub fn coordinate_values(text: &str) -> Vec<f64> {
    text.split(|c: char| c == ',' || c.is_whitespace())
        .filter(|s| !s.is_empty())
        .map(|s| s.parse::<f64>().unwrap_or(f64::NAN))
        .collect()
}

fn coordinates_match(actual: &str, expected: &str) -> bool {
    let actual = coordinate_values(actual);
    let expected = coordinate_values(expected);
    actual.len() == expected.len()
        && actual
            .iter()
            .zip(&expected)
            .all(|(a, e)| (a - e).abs() <= COORDINATE_TOLERANCE)
}

/// Text of every element named `name`, in document order.
pub fn texts_of(node: &Node, name: &str) -> Vec<String> {
    let mut found = Vec::new();
    collect_texts(node, name, &mut found);
    found
}

fn collect_texts(node: &Node, name: &str, found: &mut Vec<String>) {
    if node.name == name {
        found.push(node.text.clone());
    }
    for child in &node.children {
        collect_texts(child, name, found);
    }
}

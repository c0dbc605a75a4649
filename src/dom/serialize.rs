//! XHTML serialization for ArenaDom.
//!
//! Output is well-formed XML: void elements are self-closed, text and
//! attribute values are escaped, and the document always starts with an XML
//! declaration. The HTML parser turns an input `<?xml ...?>` declaration into
//! a bogus comment; that comment is dropped so the declaration is not doubled.

use quick_xml::escape::{escape, partial_escape};

use super::arena::{ArenaDom, ArenaNodeData, ArenaNodeId};

const XML_DECLARATION: &str = r#"<?xml version="1.0" encoding="UTF-8"?>"#;
const XHTML_NAMESPACE: &str = "http://www.w3.org/1999/xhtml";

/// Elements that never have content.
const VOID_ELEMENTS: &[&str] = &[
    "area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta", "source",
    "track", "wbr",
];

/// Serialize a whole document, XML declaration included.
pub fn serialize_document(dom: &ArenaDom) -> String {
    let mut output = String::with_capacity(dom.len() * 16);
    output.push_str(XML_DECLARATION);
    output.push('\n');
    for child in dom.children(dom.document()) {
        let before = output.len();
        serialize_node(dom, child, &mut output);
        if output.len() > before && !dom.is_text(child) {
            output.push('\n');
        }
    }
    output
}

/// Serialize the children of a node: its markup-preserving inner content.
pub fn serialize_children(dom: &ArenaDom, id: ArenaNodeId) -> String {
    let mut output = String::new();
    for child in dom.children(id) {
        serialize_node(dom, child, &mut output);
    }
    output
}

/// Serialize a node and its subtree onto `output`.
pub fn serialize_node(dom: &ArenaDom, id: ArenaNodeId, output: &mut String) {
    let Some(node) = dom.get(id) else {
        return;
    };

    match &node.data {
        ArenaNodeData::Document => {
            for child in dom.children(id) {
                serialize_node(dom, child, output);
            }
        }
        ArenaNodeData::Element(element) => {
            let tag = element.local_name().as_ref();
            let attrs = element.attrs();
            output.push('<');
            output.push_str(tag);

            for attr in attrs {
                output.push(' ');
                if let Some(prefix) = &attr.name.prefix {
                    output.push_str(prefix.as_ref());
                    output.push(':');
                }
                output.push_str(attr.name.local.as_ref());
                output.push_str("=\"");
                output.push_str(&escape(attr.value.as_str()));
                output.push('"');
            }

            if tag == "html" && !attrs.iter().any(|a| a.name.local.as_ref() == "xmlns") {
                output.push_str(" xmlns=\"");
                output.push_str(XHTML_NAMESPACE);
                output.push('"');
            }

            if VOID_ELEMENTS.contains(&tag) {
                output.push_str("/>");
                return;
            }

            output.push('>');
            for child in dom.children(id) {
                serialize_node(dom, child, output);
            }
            output.push_str("</");
            output.push_str(tag);
            output.push('>');
        }
        ArenaNodeData::Text(text) => output.push_str(&partial_escape(text.as_str())),
        ArenaNodeData::Comment(text) => {
            if text.is_empty() || text.starts_with("?xml") {
                return;
            }
            output.push_str("<!--");
            output.push_str(text);
            output.push_str("-->");
        }
        ArenaNodeData::Doctype {
            name,
            public_id,
            system_id,
        } => {
            output.push_str("<!DOCTYPE ");
            output.push_str(name);
            if !public_id.is_empty() {
                output.push_str(" PUBLIC \"");
                output.push_str(public_id);
                output.push('"');
                if !system_id.is_empty() {
                    output.push_str(" \"");
                    output.push_str(system_id);
                    output.push('"');
                }
            } else if !system_id.is_empty() {
                output.push_str(" SYSTEM \"");
                output.push_str(system_id);
                output.push('"');
            }
            output.push('>');
        }
    }
}

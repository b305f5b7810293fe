//! Shared DOM plumbing for the HTML and XML backed formats
//!
//! Parsing goes through html5ever/xml5ever into an `RcDom`; emission builds
//! an `RcDom` tree and serializes it. The helpers here are the only place
//! that touches rcdom node internals, so the format adapters read as tree
//! walks rather than reference-counting ceremony.

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use html5ever::tendril::TendrilSink;
use html5ever::{
    ns, serialize, serialize::SerializeOpts, serialize::TraversalScope, Attribute, LocalName,
    QualName,
};
use markup5ever_rcdom::{Handle, Node, NodeData, RcDom, SerializableHandle};
use once_cell::sync::Lazy;
use regex::Regex;

use crate::error::ConvertError;

static HTML_TAG_OR_ENTITY_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"<[a-zA-Z/!][^>]*>|&#?[a-zA-Z0-9]+;").unwrap());

/// Sniff whether a content string carries HTML markup rather than plain text.
pub fn looks_like_html(content: &str) -> bool {
    HTML_TAG_OR_ENTITY_RE.is_match(content)
}

/// Parse an HTML document. html5ever recovers from anything, so this never
/// fails; emptiness checks belong to the caller.
pub fn parse_html(doc: &str) -> RcDom {
    html5ever::parse_document(RcDom::default(), Default::default()).one(doc)
}

/// Parse an XML document. Fails with a parse error when no root element
/// survives, which is as close to well-formedness as the recovering parser
/// reports.
pub fn parse_xml(doc: &str) -> Result<RcDom, ConvertError> {
    let dom = xml5ever::driver::parse_document(RcDom::default(), Default::default()).one(doc);
    if root_element(&dom).is_none() {
        return Err(ConvertError::Parse(
            "document has no root element".to_string(),
        ));
    }
    Ok(dom)
}

/// The document's root element.
pub fn root_element(dom: &RcDom) -> Option<Handle> {
    dom.document
        .children
        .borrow()
        .iter()
        .find(|child| is_element(child))
        .cloned()
}

pub fn is_element(node: &Handle) -> bool {
    matches!(node.data, NodeData::Element { .. })
}

/// Element's local tag name, lowercased.
pub fn tag_name(node: &Handle) -> Option<String> {
    match &node.data {
        NodeData::Element { name, .. } => Some(name.local.to_string().to_lowercase()),
        _ => None,
    }
}

/// An attribute value by local name.
pub fn attr(node: &Handle, attr_name: &str) -> Option<String> {
    match &node.data {
        NodeData::Element { attrs, .. } => attrs
            .borrow()
            .iter()
            .find(|a| &*a.name.local == attr_name)
            .map(|a| a.value.to_string()),
        _ => None,
    }
}

/// The element's class names.
pub fn classes(node: &Handle) -> Vec<String> {
    attr(node, "class")
        .map(|c| c.split_whitespace().map(str::to_string).collect())
        .unwrap_or_default()
}

/// Depth-first child elements matching a predicate, not descending into
/// matches themselves.
pub fn find_elements(node: &Handle, pred: &dyn Fn(&Handle) -> bool) -> Vec<Handle> {
    let mut found = Vec::new();
    for child in node.children.borrow().iter() {
        if is_element(child) && pred(child) {
            found.push(child.clone());
        } else {
            found.extend(find_elements(child, pred));
        }
    }
    found
}

/// First descendant element with the given tag name.
pub fn find_first(node: &Handle, tag: &str) -> Option<Handle> {
    for child in node.children.borrow().iter() {
        if tag_name(child).as_deref() == Some(tag) {
            return Some(child.clone());
        }
        if let Some(found) = find_first(child, tag) {
            return Some(found);
        }
    }
    None
}

/// Direct child elements with the given tag name.
pub fn children_named(node: &Handle, tag: &str) -> Vec<Handle> {
    node.children
        .borrow()
        .iter()
        .filter(|c| tag_name(c).as_deref() == Some(tag))
        .cloned()
        .collect()
}

/// Concatenated text of a node and its descendants. CDATA sections parse as
/// text nodes, so this covers them too.
pub fn text_content(node: &Handle) -> String {
    let mut out = String::new();
    collect_text(node, &mut out);
    out
}

fn collect_text(node: &Handle, out: &mut String) {
    match &node.data {
        NodeData::Text { contents } => out.push_str(&contents.borrow()),
        _ => {
            for child in node.children.borrow().iter() {
                collect_text(child, out);
            }
        }
    }
}

/// Render HTML content to plain text: block elements and `<br>` become
/// newlines, tags are dropped, entities were already decoded by the parser.
pub fn html_to_text(html: &str) -> String {
    let dom = parse_html(html);
    let mut out = String::new();
    render_text(&dom.document, &mut out);
    // collapse the blank-line runs block stacking produces
    let mut lines: Vec<&str> = out.lines().map(str::trim_end).collect();
    while lines.first() == Some(&"") {
        lines.remove(0);
    }
    while lines.last() == Some(&"") {
        lines.pop();
    }
    let mut collapsed = String::new();
    let mut blank_run = 0;
    for line in lines {
        if line.is_empty() {
            blank_run += 1;
            if blank_run > 1 {
                continue;
            }
        } else {
            blank_run = 0;
        }
        if !collapsed.is_empty() {
            collapsed.push('\n');
        }
        collapsed.push_str(line);
    }
    collapsed
}

fn render_text(node: &Handle, out: &mut String) {
    match &node.data {
        NodeData::Text { contents } => out.push_str(&contents.borrow()),
        NodeData::Element { name, .. } => {
            let tag = name.local.to_string();
            match tag.as_str() {
                "script" | "style" => return,
                "br" => {
                    out.push('\n');
                    return;
                }
                _ => {}
            }
            let block = matches!(
                tag.as_str(),
                "p" | "div" | "blockquote" | "li" | "h1" | "h2" | "h3" | "h4" | "h5" | "h6"
            );
            if block && !out.is_empty() && !out.ends_with('\n') {
                out.push('\n');
            }
            for child in node.children.borrow().iter() {
                render_text(child, out);
            }
            if block && !out.ends_with('\n') {
                out.push('\n');
            }
        }
        _ => {
            for child in node.children.borrow().iter() {
                render_text(child, out);
            }
        }
    }
}

/// Create an element node with attributes.
pub fn create_element(tag: &str, attrs: Vec<(&str, &str)>) -> Handle {
    let qual_name = QualName::new(None, ns!(html), LocalName::from(tag));
    let attributes = attrs
        .into_iter()
        .map(|(name, value)| Attribute {
            name: QualName::new(None, ns!(), LocalName::from(name)),
            value: value.to_string().into(),
        })
        .collect();

    Rc::new(Node {
        parent: Cell::new(None),
        children: RefCell::new(Vec::new()),
        data: NodeData::Element {
            name: qual_name,
            attrs: RefCell::new(attributes),
            template_contents: Default::default(),
            mathml_annotation_xml_integration_point: false,
        },
    })
}

/// Create a text node.
pub fn create_text(text: &str) -> Handle {
    Rc::new(Node {
        parent: Cell::new(None),
        children: RefCell::new(Vec::new()),
        data: NodeData::Text {
            contents: RefCell::new(text.to_string().into()),
        },
    })
}

pub fn append(parent: &Handle, child: Handle) {
    parent.children.borrow_mut().push(child);
}

/// Append already-parsed HTML markup as children of `parent`, so rich
/// content survives instead of being re-escaped as text.
pub fn append_html(parent: &Handle, html: &str) {
    let dom = parse_html(html);
    // html5ever wraps fragments in html > head/body; lift body's children
    let body = find_first(&dom.document, "body");
    let source = body.unwrap_or_else(|| dom.document.clone());
    for child in source.children.borrow().iter() {
        append(parent, child.clone());
    }
}

/// Serialize an element (and its subtree) to an HTML string.
pub fn serialize_node(node: &Handle) -> Result<String, ConvertError> {
    let mut output = Vec::new();
    let opts = SerializeOpts {
        traversal_scope: TraversalScope::IncludeNode,
        ..Default::default()
    };
    let serializable = SerializableHandle::from(node.clone());
    serialize(&mut output, &serializable, opts)
        .map_err(|e| ConvertError::Parse(format!("HTML serialization failed: {e}")))?;
    String::from_utf8(output)
        .map_err(|e| ConvertError::Parse(format!("UTF-8 conversion failed: {e}")))
}

/// Serialize only a node's children, for content fields that hold markup
/// without a wrapper element.
pub fn serialize_children(node: &Handle) -> Result<String, ConvertError> {
    let mut out = String::new();
    for child in node.children.borrow().iter() {
        match &child.data {
            NodeData::Text { contents } => out.push_str(&contents.borrow()),
            _ => out.push_str(&serialize_node(child)?),
        }
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_looks_like_html() {
        assert!(looks_like_html("<p>hi</p>"));
        assert!(looks_like_html("a &amp; b"));
        assert!(!looks_like_html("plain text, 1 < 2"));
    }

    #[test]
    fn test_text_content_includes_cdata() {
        let dom = parse_xml("<root><a><![CDATA[<b>raw</b>]]></a></root>").unwrap();
        let root = root_element(&dom).unwrap();
        let a = find_first(&root, "a").unwrap();
        assert_eq!(text_content(&a), "<b>raw</b>");
    }

    #[test]
    fn test_html_to_text_blocks_and_breaks() {
        let text = html_to_text("<p>one</p><p>two<br>three</p>");
        assert_eq!(text, "one\ntwo\nthree");
    }

    #[test]
    fn test_find_elements_by_class() {
        let dom = parse_html(r#"<div class="h-entry"><p class="p-name">hi</p></div>"#);
        let entries = find_elements(&dom.document, &|n| {
            classes(n).iter().any(|c| c == "h-entry")
        });
        assert_eq!(entries.len(), 1);
        let names = find_elements(&entries[0], &|n| classes(n).iter().any(|c| c == "p-name"));
        assert_eq!(text_content(&names[0]), "hi");
    }

    #[test]
    fn test_build_and_serialize_round_trip() {
        let div = create_element("div", vec![("class", "h-entry")]);
        let p = create_element("p", vec![("class", "p-name")]);
        append(&p, create_text("hi"));
        append(&div, p);

        let html = serialize_node(&div).unwrap();
        assert_eq!(html, r#"<div class="h-entry"><p class="p-name">hi</p></div>"#);
    }

    #[test]
    fn test_parse_xml_rejects_empty() {
        assert!(parse_xml("").is_err());
        assert!(parse_xml("just text").is_err());
    }
}

//! Plain XML passthrough
//!
//! A generic element-per-field rendering of the canonical object tree, for
//! consumers that want activity data but can't read JSON. List-valued
//! fields render as repeated elements; nested objects nest. The mapping is
//! mechanical in both directions, so whatever the canonical model holds is
//! what the XML says.

use activity_model::Object;
use markup5ever_rcdom::Handle;
use serde_json::{Map, Value};

use crate::dom;
use crate::error::ConvertError;
use crate::format::{Format, Options};
use crate::warnings::{Conversion, Report};
use crate::xml_writer::XmlWriter;

/// Fields that must deserialize as lists even from a single XML element.
const LIST_FIELDS: &[&str] = &["attachments", "items", "tags", "urls"];

pub struct XmlFormat;

impl Format for XmlFormat {
    fn name(&self) -> &str {
        "xml"
    }

    fn description(&self) -> &str {
        "Canonical activity data as plain XML"
    }

    fn supports_to_canonical(&self) -> bool {
        true
    }

    fn supports_from_canonical(&self) -> bool {
        true
    }

    fn to_canonical(
        &self,
        doc: &str,
        _options: &Options,
    ) -> Result<Conversion<Vec<Object>>, ConvertError> {
        let tree = dom::parse_xml(doc)?;
        let root = dom::root_element(&tree)
            .ok_or_else(|| ConvertError::Parse("empty XML document".to_string()))?;
        let report = Report::new("xml");

        let objects = match dom::tag_name(&root).as_deref() {
            Some("items") => dom::children_named(&root, "object")
                .iter()
                .map(element_to_value)
                .collect::<Vec<_>>(),
            Some("object") => vec![element_to_value(&root)],
            other => {
                return Err(ConvertError::Parse(format!(
                    "expected <object> or <items> root, got {other:?}"
                )))
            }
        };

        let mut parsed = Vec::new();
        for value in objects {
            let obj: Object = serde_json::from_value(value).map_err(|e| {
                ConvertError::Shape(activity_model::ShapeError::new("object", e.to_string()))
            })?;
            parsed.push(obj);
        }
        Ok(report.finish(parsed))
    }

    fn from_canonical(
        &self,
        objects: &[Object],
        _options: &Options,
    ) -> Result<Conversion<String>, ConvertError> {
        let mut report = Report::new("xml");
        let mut w = XmlWriter::new();

        match objects {
            [] => {
                return Err(ConvertError::Validation(
                    "nothing to serialize: no canonical objects given".to_string(),
                ))
            }
            [single] => {
                let value = serde_json::to_value(single)?;
                value_to_xml(&mut w, "object", &value, &mut report);
            }
            many => {
                w.open("items", &[]);
                for obj in many {
                    let value = serde_json::to_value(obj)?;
                    value_to_xml(&mut w, "object", &value, &mut report);
                }
                w.close();
            }
        }

        Ok(report.finish(w.finish()))
    }
}

fn value_to_xml(w: &mut XmlWriter, tag: &str, value: &Value, report: &mut Report) {
    if !is_valid_element_name(tag) {
        report.warn(tag, "field name is not a valid XML element name, dropped");
        return;
    }
    match value {
        Value::Null => {}
        Value::Bool(b) => w.element(tag, &[], if *b { "true" } else { "false" }),
        Value::Number(n) => w.element(tag, &[], &n.to_string()),
        Value::String(s) => w.element(tag, &[], s),
        Value::Array(items) => {
            for item in items {
                value_to_xml(w, tag, item, report);
            }
        }
        Value::Object(map) => {
            w.open(tag, &[]);
            for (key, val) in map {
                value_to_xml(w, key, val, report);
            }
            w.close();
        }
    }
}

fn element_to_value(node: &Handle) -> Value {
    let children: Vec<Handle> = node
        .children
        .borrow()
        .iter()
        .filter(|c| dom::is_element(c))
        .cloned()
        .collect();

    if children.is_empty() {
        return leaf_value(&dom::text_content(node));
    }

    let mut map: Map<String, Value> = Map::new();
    for child in &children {
        let Some(name) = dom::tag_name(child) else {
            continue;
        };
        let value = element_to_value(child);
        match map.get_mut(&name) {
            Some(Value::Array(existing)) => existing.push(value),
            Some(existing) => {
                let first = existing.take();
                *existing = Value::Array(vec![first, value]);
            }
            None => {
                map.insert(name, value);
            }
        }
    }

    // single elements of list-typed fields still need to be lists
    for field in LIST_FIELDS {
        if let Some(value) = map.get_mut(*field) {
            if !value.is_array() {
                let single = value.take();
                *value = Value::Array(vec![single]);
            }
        }
    }

    Value::Object(map)
}

/// Leaf text with JSON scalar types recovered.
fn leaf_value(text: &str) -> Value {
    let text = text.trim();
    match text {
        "true" => return Value::Bool(true),
        "false" => return Value::Bool(false),
        _ => {}
    }
    if let Ok(n) = text.parse::<i64>() {
        return Value::Number(n.into());
    }
    if let Ok(f) = text.parse::<f64>() {
        if let Some(n) = serde_json::Number::from_f64(f) {
            return Value::Number(n);
        }
    }
    Value::String(text.to_string())
}

fn is_valid_element_name(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(first) if first.is_ascii_alphabetic() || first == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | '.'))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn canonical(value: serde_json::Value) -> Vec<Object> {
        vec![serde_json::from_value(value).unwrap()]
    }

    #[test]
    fn test_round_trip_note_with_tags() {
        let objs = canonical(json!({
            "objectType": "note",
            "id": "tag:x,1",
            "content": "hi @ann",
            "tags": [{"objectType": "mention", "url": "https://x/ann",
                      "startIndex": 3, "length": 4}],
        }));

        let out = XmlFormat.from_canonical(&objs, &Options::new()).unwrap();
        assert!(out.value.contains("<objectType>note</objectType>"));
        assert!(out.value.contains("<startIndex>3</startIndex>"));

        let back = XmlFormat.to_canonical(&out.value, &Options::new()).unwrap();
        assert_eq!(back.value, objs);
    }

    #[test]
    fn test_multiple_objects_wrap_in_items() {
        let mut objs = canonical(json!({"objectType": "note", "content": "one"}));
        objs.extend(canonical(json!({"objectType": "note", "content": "two"})));

        let out = XmlFormat.from_canonical(&objs, &Options::new()).unwrap();
        assert!(out.value.contains("<items>"));

        let back = XmlFormat.to_canonical(&out.value, &Options::new()).unwrap();
        assert_eq!(back.value.len(), 2);
        assert_eq!(back.value, objs);
    }

    #[test]
    fn test_escaped_markup_survives() {
        let objs = canonical(json!({
            "objectType": "note",
            "content": "a <b>bold</b> claim & more",
        }));
        let out = XmlFormat.from_canonical(&objs, &Options::new()).unwrap();
        assert!(out.value.contains("a &lt;b&gt;bold&lt;/b&gt; claim &amp; more"));

        let back = XmlFormat.to_canonical(&out.value, &Options::new()).unwrap();
        assert_eq!(
            back.value[0].content.as_deref(),
            Some("a <b>bold</b> claim & more")
        );
    }
}

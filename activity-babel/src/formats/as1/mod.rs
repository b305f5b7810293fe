//! Canonical JSON passthrough
//!
//! The canonical model serializes as a JSON dialect of its own, and exposing
//! that as a format gives every other adapter a debugging target and callers
//! a stable storage representation. Parsing validates the model invariants,
//! so this is also where a malformed canonical document surfaces as a shape
//! error.

use activity_model::Object;
use serde_json::Value;

use crate::error::ConvertError;
use crate::format::{Format, Options};
use crate::warnings::Conversion;

pub struct As1Format;

impl Format for As1Format {
    fn name(&self) -> &str {
        "as1"
    }

    fn description(&self) -> &str {
        "Canonical activity JSON"
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
        let value: Value = serde_json::from_str(doc)?;

        // accept a single object, a bare list, or an items-wrapped response
        let items: Vec<Value> = match value {
            Value::Array(items) => items,
            Value::Object(ref map) if map.contains_key("items") => map
                .get("items")
                .and_then(Value::as_array)
                .cloned()
                .unwrap_or_default(),
            other => vec![other],
        };

        let mut objects = Vec::new();
        for item in items {
            let obj: Object = serde_json::from_value(item)
                .map_err(|e| ConvertError::Shape(activity_model::ShapeError::new("item", e.to_string())))?;
            obj.validate()?;
            objects.push(obj);
        }
        Ok(Conversion::clean(objects))
    }

    fn from_canonical(
        &self,
        objects: &[Object],
        _options: &Options,
    ) -> Result<Conversion<String>, ConvertError> {
        let doc = if objects.len() == 1 {
            serde_json::to_string_pretty(&objects[0])?
        } else {
            serde_json::to_string_pretty(objects)?
        };
        Ok(Conversion::clean(doc))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_round_trip_single_object() {
        let doc = r#"{"objectType": "note", "content": "hi", "fooExtra": 1}"#;
        let parsed = As1Format.to_canonical(doc, &Options::new()).unwrap();
        assert_eq!(parsed.value.len(), 1);

        let out = As1Format
            .from_canonical(&parsed.value, &Options::new())
            .unwrap();
        let reparsed = As1Format.to_canonical(&out.value, &Options::new()).unwrap();
        assert_eq!(reparsed.value, parsed.value);
    }

    #[test]
    fn test_items_wrapper_accepted() {
        let doc = r#"{"items": [{"objectType": "note"}, {"objectType": "article"}]}"#;
        let parsed = As1Format.to_canonical(doc, &Options::new()).unwrap();
        assert_eq!(parsed.value.len(), 2);
    }

    #[test]
    fn test_invalid_json_is_parse_error() {
        let result = As1Format.to_canonical("{not json", &Options::new());
        assert!(matches!(result, Err(ConvertError::Parse(_))));
    }

    #[test]
    fn test_invalid_span_is_shape_error() {
        let doc = r#"{"objectType": "note", "content": "hi",
                      "tags": [{"startIndex": 0, "length": 99}]}"#;
        let result = As1Format.to_canonical(doc, &Options::new());
        assert!(matches!(result, Err(ConvertError::Shape(_))));
    }
}

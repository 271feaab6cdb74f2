//! Turn nested feedback items into one-level records fit for tabular export.
//!
//! A feedback item embeds its replies under `replies_all`, keyed by reply id, each wrapped as
//! `{"self": {...reply...}}`. Flattening lifts those replies out into their own records and
//! serializes whatever nesting remains on the item. Nothing is flattened recursively.
use std::cmp::Ordering;

use serde_json::{Number, Value};
use thiserror::Error;

use crate::page::Record;

pub const REPLIES_FIELD: &str = "replies_all";
pub const IMAGES_FIELD: &str = "images";
const REPLY_BODY_FIELD: &str = "self";

#[derive(Error, Debug, PartialEq, Eq)]
pub enum FlattenError {
    #[error("feedback {item_id}: replies_all is a {kind}, expected an object or an array")]
    InvalidReplies { item_id: String, kind: &'static str },
    #[error("feedback {item_id}: reply {reply_key} does not hold a `self` object")]
    MalformedReply { item_id: String, reply_key: String },
}

/// One feedback item after flattening, with the replies lifted out of it.
#[derive(Debug, Clone, PartialEq)]
pub struct Flattened {
    pub feedback: Record,
    pub replies: Vec<Record>,
}

/// Flatten a single feedback item.
///
/// The returned feedback record has no `replies_all` field, and every other object or array
/// value is replaced by its compact JSON text. Scalars, `null` included, pass through unchanged.
/// The input is left untouched so callers can keep the raw item.
pub fn flatten(item: &Record) -> Result<Flattened, FlattenError> {
    let mut feedback = Record::new();
    let mut replies = Vec::new();

    for (key, value) in item {
        if key == REPLIES_FIELD {
            replies = extract_replies(item, value)?;
            continue;
        }

        let value = match value {
            Value::Object(_) | Value::Array(_) => Value::String(value.to_string()),
            scalar => scalar.clone(),
        };
        feedback.insert(key.clone(), value);
    }

    Ok(Flattened { feedback, replies })
}

/// Coerce every field of a reply to a string.
///
/// An `images` array is joined with newlines. `null` becomes the empty string, and any other
/// nested value becomes its compact JSON text.
pub fn flatten_reply(reply: &Record) -> Record {
    reply
        .iter()
        .map(|(key, value)| {
            let text = match value {
                Value::Array(images) if key == IMAGES_FIELD => images
                    .iter()
                    .map(coerce_to_string)
                    .collect::<Vec<_>>()
                    .join("\n"),
                other => coerce_to_string(other),
            };
            (key.clone(), Value::String(text))
        })
        .collect()
}

/// Text form of a value. `null` is empty, strings are verbatim, nested values are compact JSON.
pub fn coerce_to_string(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(text) => text.clone(),
        Value::Number(number) => number_text(number),
        Value::Bool(_) | Value::Array(_) | Value::Object(_) => value.to_string(),
    }
}

/// Integral floats drop their fraction, so `1.0` reads as `1`.
fn number_text(number: &Number) -> String {
    match number.as_f64() {
        Some(float) if number.is_f64() && float.fract() == 0.0 && float.abs() < 1e21 => {
            if float == 0.0 {
                "0".to_owned()
            } else {
                format!("{:.0}", float)
            }
        }
        _ => number.to_string(),
    }
}

fn extract_replies(item: &Record, replies_all: &Value) -> Result<Vec<Record>, FlattenError> {
    let item_id = || {
        item.get("id")
            .map(Value::to_string)
            .unwrap_or_else(|| "<no id>".to_owned())
    };

    let to_reply = |reply_key: &str, wrapper: &Value| {
        wrapper
            .get(REPLY_BODY_FIELD)
            .and_then(Value::as_object)
            .map(flatten_reply)
            .ok_or_else(|| FlattenError::MalformedReply {
                item_id: item_id(),
                reply_key: reply_key.to_owned(),
            })
    };

    match replies_all {
        Value::Null => Ok(Vec::new()),
        Value::Array(wrappers) => wrappers
            .iter()
            .enumerate()
            .map(|(index, wrapper)| to_reply(&index.to_string(), wrapper))
            .collect(),
        Value::Object(wrappers) => {
            let mut keyed: Vec<(&String, &Value)> = wrappers.iter().collect();
            // Numeric reply keys go first, ascending; the stable sort keeps the rest in order.
            keyed.sort_by(|(a, _), (b, _)| compare_reply_keys(a, b));
            keyed
                .into_iter()
                .map(|(key, wrapper)| to_reply(key, wrapper))
                .collect()
        }
        Value::Bool(_) => Err(invalid_replies(item_id(), "bool")),
        Value::Number(_) => Err(invalid_replies(item_id(), "number")),
        Value::String(_) => Err(invalid_replies(item_id(), "string")),
    }
}

fn invalid_replies(item_id: String, kind: &'static str) -> FlattenError {
    FlattenError::InvalidReplies { item_id, kind }
}

fn compare_reply_keys(a: &str, b: &str) -> Ordering {
    match (numeric_key(a), numeric_key(b)) {
        (Some(a), Some(b)) => a.cmp(&b),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

/// A canonical unsigned integer key: digits only, no leading zero unless it is "0".
fn numeric_key(key: &str) -> Option<u32> {
    if key.is_empty() || (key.len() > 1 && key.starts_with('0')) {
        return None;
    }
    if !key.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    key.parse::<u32>().ok().filter(|n| *n != u32::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_json_diff::assert_json_eq;
    use serde_json::json;

    fn record(value: Value) -> Record {
        match value {
            Value::Object(record) => record,
            _ => panic!("test fixture must be an object"),
        }
    }

    #[test]
    fn test_reply_images_are_joined() {
        let reply = flatten_reply(&record(json!({"id": 5, "images": ["u1", "u2"]})));

        assert_json_eq!(Value::Object(reply), json!({"id": "5", "images": "u1\nu2"}));
    }

    #[test]
    fn test_reply_fields_are_coerced_to_strings() {
        let reply = flatten_reply(&record(json!({
            "id": 10,
            "content": "thanks!",
            "is_admin": true,
            "deleted_at": null,
            "score": 1.5,
            "user": {"nickname": "ops"},
            "tags": ["a", "b"],
            "images": []
        })));

        assert_json_eq!(
            Value::Object(reply),
            json!({
                "id": "10",
                "content": "thanks!",
                "is_admin": "true",
                "deleted_at": "",
                "score": "1.5",
                "user": "{\"nickname\":\"ops\"}",
                "tags": "[\"a\",\"b\"]",
                "images": ""
            })
        );
    }

    #[test]
    fn test_integral_floats_lose_their_fraction() {
        let reply = flatten_reply(&record(json!({
            "id": 1.0,
            "zero": -0.0,
            "score": 2.5,
            "big": 1e20,
            "count": 7
        })));

        assert_json_eq!(
            Value::Object(reply),
            json!({
                "id": "1",
                "zero": "0",
                "score": "2.5",
                "big": "100000000000000000000",
                "count": "7"
            })
        );
    }

    #[test]
    fn test_reply_images_that_are_not_an_array_are_coerced() {
        let reply = flatten_reply(&record(json!({"id": 1, "images": "single.png"})));
        assert_eq!(reply["images"], json!("single.png"));

        let reply = flatten_reply(&record(json!({"id": 1, "images": null})));
        assert_eq!(reply["images"], json!(""));
    }

    #[test]
    fn test_feedback_nested_values_become_json() {
        let flattened = flatten(&record(json!({"id": 1, "meta": {"a": 1}}))).unwrap();

        assert_json_eq!(
            Value::Object(flattened.feedback),
            json!({"id": 1, "meta": "{\"a\":1}"})
        );
        assert!(flattened.replies.is_empty());
    }

    #[test]
    fn test_feedback_scalars_pass_through() {
        let flattened = flatten(&record(json!({
            "id": "abc",
            "likes": 3,
            "is_top": false,
            "avatar": null,
            "images": ["x.png"]
        })))
        .unwrap();

        assert_json_eq!(
            Value::Object(flattened.feedback),
            json!({
                "id": "abc",
                "likes": 3,
                "is_top": false,
                "avatar": null,
                "images": "[\"x.png\"]"
            })
        );
    }

    #[test]
    fn test_replies_are_extracted() {
        let item = record(json!({
            "id": 1,
            "replies_all": {
                "r1": {"self": {"id": 10}},
                "r2": {"self": {"id": 11}}
            }
        }));

        let flattened = flatten(&item).unwrap();

        assert_json_eq!(Value::Object(flattened.feedback), json!({"id": 1}));
        let ids: Vec<&Value> = flattened.replies.iter().map(|r| &r["id"]).collect();
        assert_eq!(ids, vec![&json!("10"), &json!("11")]);
        // The raw item keeps its replies.
        assert!(item.contains_key(REPLIES_FIELD));
    }

    #[test]
    fn test_numeric_reply_keys_come_first_in_ascending_order() {
        let flattened = flatten(&record(json!({
            "id": 1,
            "replies_all": {
                "latest": {"self": {"id": "c"}},
                "300": {"self": {"id": "b"}},
                "20": {"self": {"id": "a"}},
                "007": {"self": {"id": "d"}}
            }
        })))
        .unwrap();

        let ids: Vec<&Value> = flattened.replies.iter().map(|r| &r["id"]).collect();
        assert_eq!(ids, vec![&json!("a"), &json!("b"), &json!("c"), &json!("d")]);
    }

    #[test]
    fn test_replies_as_array_or_null() {
        let flattened = flatten(&record(json!({
            "id": 1,
            "replies_all": [{"self": {"id": 10}}, {"self": {"id": 11, "images": ["i"]}}]
        })))
        .unwrap();
        assert_eq!(flattened.replies.len(), 2);
        assert_eq!(flattened.replies[1]["images"], json!("i"));

        let flattened = flatten(&record(json!({"id": 1, "replies_all": null}))).unwrap();
        assert!(flattened.replies.is_empty());
        assert!(!flattened.feedback.contains_key(REPLIES_FIELD));
    }

    #[test]
    fn test_malformed_replies_are_rejected() {
        let missing_self = flatten(&record(json!({
            "id": 7,
            "replies_all": {"r1": {"self": {"id": 1}}, "r2": {"other": {}}}
        })));
        assert_eq!(
            missing_self,
            Err(FlattenError::MalformedReply {
                item_id: "7".to_owned(),
                reply_key: "r2".to_owned(),
            })
        );

        let scalar_wrapper = flatten(&record(json!({"replies_all": {"r1": 3}})));
        assert_eq!(
            scalar_wrapper,
            Err(FlattenError::MalformedReply {
                item_id: "<no id>".to_owned(),
                reply_key: "r1".to_owned(),
            })
        );

        let not_a_collection = flatten(&record(json!({"id": "x", "replies_all": "none"})));
        assert_eq!(
            not_a_collection,
            Err(FlattenError::InvalidReplies {
                item_id: "\"x\"".to_owned(),
                kind: "string",
            })
        );
    }

    #[test]
    fn test_field_order_is_kept() {
        let flattened = flatten(&record(json!({
            "id": 1,
            "replies_all": {},
            "content": "c",
            "meta": {}
        })))
        .unwrap();

        let keys: Vec<&str> = flattened.feedback.keys().map(String::as_str).collect();
        assert_eq!(keys, vec!["id", "content", "meta"]);
    }
}

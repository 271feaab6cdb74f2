//! The shape of one response from the feedback listing endpoint.
//!
//! ```json
//! { "data": [ {...}, ... ], "pagination": { "next_page_url": "/api/v1/1/posts?..." } }
//! ```
//!
//! Pages are validated here, at the boundary, so that the rest of the pipeline can work with
//! typed values instead of trusting ambient structure.
use serde_json::{Map, Value};
use thiserror::Error;
use tracing::warn;

/// A one-level JSON object, with fields kept in the order the upstream sent them.
pub type Record = Map<String, Value>;

#[derive(Error, Debug, PartialEq, Eq)]
pub enum ShapeError {
    #[error("response body is not a JSON object")]
    NotAnObject,
    #[error("item {index} of page data is not a JSON object")]
    ItemNotAnObject { index: usize },
    #[error("pagination is not a JSON object")]
    InvalidPagination,
    #[error("pagination.next_page_url is neither a string nor null")]
    InvalidCursor,
}

/// The `data` member of a page.
#[derive(Debug, Clone, PartialEq)]
pub enum PageData {
    Items(Vec<Record>),
    /// `data` was missing or not an array. Counts as a page with no items.
    Malformed,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Page {
    pub data: PageData,
    /// Relative URL of the next page. `None` once the listing is exhausted.
    pub next_page_url: Option<String>,
}

impl Page {
    /// Validate a decoded response body.
    pub fn from_value(body: Value) -> Result<Page, ShapeError> {
        let mut body = match body {
            Value::Object(body) => body,
            _ => return Err(ShapeError::NotAnObject),
        };

        let next_page_url = match body.remove("pagination") {
            None | Some(Value::Null) => None,
            Some(Value::Object(pagination)) => match pagination.get("next_page_url") {
                None | Some(Value::Null) => None,
                Some(Value::String(url)) if url.is_empty() => None,
                Some(Value::String(url)) => Some(url.to_owned()),
                Some(_) => return Err(ShapeError::InvalidCursor),
            },
            Some(_) => return Err(ShapeError::InvalidPagination),
        };

        let data = match body.remove("data") {
            Some(Value::Array(items)) => {
                let mut records = Vec::with_capacity(items.len());
                for (index, item) in items.into_iter().enumerate() {
                    match item {
                        Value::Object(record) => records.push(record),
                        _ => return Err(ShapeError::ItemNotAnObject { index }),
                    }
                }
                PageData::Items(records)
            }
            other => {
                warn!(
                    data = ?other.as_ref().map(value_kind),
                    "page data is missing or not an array, treating it as empty"
                );
                PageData::Malformed
            }
        };

        Ok(Page {
            data,
            next_page_url,
        })
    }

    pub fn items(&self) -> &[Record] {
        match &self.data {
            PageData::Items(items) => items,
            PageData::Malformed => &[],
        }
    }

    pub fn into_items(self) -> Vec<Record> {
        match self.data {
            PageData::Items(items) => items,
            PageData::Malformed => Vec::new(),
        }
    }

    pub fn is_last(&self) -> bool {
        self.next_page_url.is_none()
    }
}

fn value_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

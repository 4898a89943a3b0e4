//! Extracted records.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// Ordered mapping from output field name to extracted values.
///
/// Fields may repeat (several paragraphs feeding one field), so every field
/// holds a list.
pub type FieldMap = IndexMap<String, Vec<FieldValue>>;

/// One extracted value: flat text, or a nested sub-item for
/// item-in-item relationships.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FieldValue {
    Text(String),
    Item(ExtractedItem),
}

impl FieldValue {
    /// Whether the value carries no usable content.
    pub fn is_blank(&self) -> bool {
        matches!(self, FieldValue::Text(text) if text.trim().is_empty())
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            FieldValue::Text(text) => Some(text),
            FieldValue::Item(_) => None,
        }
    }

    pub fn as_item(&self) -> Option<&ExtractedItem> {
        match self {
            FieldValue::Item(item) => Some(item),
            FieldValue::Text(_) => None,
        }
    }
}

impl From<&str> for FieldValue {
    fn from(text: &str) -> Self {
        FieldValue::Text(text.to_string())
    }
}

/// One structured record extracted from a page.
///
/// Serializes flat: bookkeeping keys (`_index`, `_template`, `_type`) sit
/// alongside the extracted fields, mirroring the shape the authoring tool
/// round-trips.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExtractedItem {
    /// 1-based occurrence of the producing container within the page,
    /// counted per container in document order.
    #[serde(rename = "_index")]
    pub index: usize,

    /// Id of the template that produced this record.
    #[serde(rename = "_template")]
    pub template: String,

    /// Schema chosen during validation; absent for unvalidated records.
    #[serde(rename = "_type", default, skip_serializing_if = "Option::is_none")]
    pub item_type: Option<String>,

    /// Extracted field values in extraction order.
    #[serde(flatten)]
    pub fields: FieldMap,
}

impl ExtractedItem {
    pub fn get(&self, field: &str) -> Option<&[FieldValue]> {
        self.fields.get(field).map(Vec::as_slice)
    }

    /// The field's text values, skipping nested items.
    pub fn texts(&self, field: &str) -> Vec<&str> {
        self.get(field)
            .map(|values| values.iter().filter_map(FieldValue::as_text).collect())
            .unwrap_or_default()
    }

    /// The field's nested sub-items.
    pub fn items(&self, field: &str) -> Vec<&ExtractedItem> {
        self.get(field)
            .map(|values| values.iter().filter_map(FieldValue::as_item).collect())
            .unwrap_or_default()
    }

    /// Whether the field holds at least one non-blank value.
    pub fn has_value(&self, field: &str) -> bool {
        self.get(field)
            .is_some_and(|values| values.iter().any(|v| !v.is_blank()))
    }

    pub fn field_names(&self) -> impl Iterator<Item = &str> + '_ {
        self.fields.keys().map(String::as_str)
    }
}

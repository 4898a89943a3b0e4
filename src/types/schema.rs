//! Schemas (item descriptors) and field-type coercions.
//!
//! A descriptor names a record shape: which fields it requires and how raw
//! extracted strings are coerced into field values. Multiple descriptors can
//! be registered per template; validation picks the first one, in declared
//! order, whose requirements a raw record satisfies.

use indexmap::IndexMap;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::html::{normalize_space, strip_tags};

static PRICE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(\d[\d.,]*)").expect("price regex is valid"));

static NUMBER_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(-?\d+(?:\.\d+)?)").expect("number regex is valid"));

/// Validator kind for one schema field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldType {
    /// Markup stripped, entities decoded, whitespace normalized.
    #[default]
    Text,
    /// The extracted region untouched.
    RawHtml,
    Url,
    Price,
    Number,
}

impl FieldType {
    /// Coerce a raw extracted value, or reject it as incompatible.
    pub fn adapt(self, raw: &str) -> Option<String> {
        match self {
            FieldType::Text => {
                let text = normalize_space(&strip_tags(raw));
                (!text.is_empty()).then_some(text)
            }
            FieldType::RawHtml => (!raw.trim().is_empty()).then(|| raw.to_string()),
            FieldType::Url => {
                let url = normalize_space(&strip_tags(raw));
                (!url.is_empty()).then_some(url)
            }
            FieldType::Price => PRICE_RE
                .captures(raw)
                .map(|caps| caps[1].to_string()),
            FieldType::Number => NUMBER_RE
                .captures(raw)
                .map(|caps| caps[1].to_string()),
        }
    }
}

/// Requirements and typing for one schema field.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FieldDescriptor {
    #[serde(default)]
    pub required: bool,

    #[serde(rename = "type", default)]
    pub field_type: FieldType,

    /// Display name: renames the field in accepted output.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

impl FieldDescriptor {
    pub fn new(field_type: FieldType) -> Self {
        Self {
            required: false,
            field_type,
            name: None,
        }
    }

    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    pub fn renamed(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }
}

/// A named record shape.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ItemDescriptor {
    #[serde(default)]
    pub name: String,

    #[serde(default)]
    pub fields: IndexMap<String, FieldDescriptor>,
}

impl ItemDescriptor {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            fields: IndexMap::new(),
        }
    }

    pub fn with_field(mut self, field: impl Into<String>, descriptor: FieldDescriptor) -> Self {
        self.fields.insert(field.into(), descriptor);
        self
    }

    /// The `_type` value stamped on records accepted under this schema,
    /// registered under `key`.
    pub fn type_name(&self, key: &str) -> String {
        if self.name.is_empty() {
            key.trim_start_matches('#').to_string()
        } else {
            self.name.clone()
        }
    }

    /// Names of the schema's required fields.
    pub fn required_fields(&self) -> impl Iterator<Item = &str> + '_ {
        self.fields
            .iter()
            .filter(|(_, d)| d.required)
            .map(|(name, _)| name.as_str())
    }
}

/// Ordered collection of schemas keyed by schema id.
///
/// Declaration order is the TypeSelection order, except that the
/// [`DescriptorSet::DEFAULT_KEY`] catch-all is always tried last no matter
/// where it was inserted.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DescriptorSet {
    schemas: IndexMap<String, ItemDescriptor>,
}

impl DescriptorSet {
    pub const DEFAULT_KEY: &'static str = "#default";

    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_schema(mut self, key: impl Into<String>, descriptor: ItemDescriptor) -> Self {
        self.insert(key, descriptor);
        self
    }

    pub fn insert(&mut self, key: impl Into<String>, descriptor: ItemDescriptor) {
        self.schemas.insert(key.into(), descriptor);
    }

    pub fn get(&self, key: &str) -> Option<&ItemDescriptor> {
        self.schemas.get(key)
    }

    pub fn is_empty(&self) -> bool {
        self.schemas.is_empty()
    }

    pub fn len(&self) -> usize {
        self.schemas.len()
    }

    /// Schemas in TypeSelection order: declared order, `#default` last.
    pub fn selection_order(&self) -> impl Iterator<Item = (&String, &ItemDescriptor)> + '_ {
        self.schemas
            .iter()
            .filter(|(key, _)| key.as_str() != Self::DEFAULT_KEY)
            .chain(
                self.schemas
                    .iter()
                    .filter(|(key, _)| key.as_str() == Self::DEFAULT_KEY),
            )
    }
}

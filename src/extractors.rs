//! Post-processing extractor chains.
//!
//! Annotations reference extractors by id. At template-compile time every
//! referenced id must resolve against a registry built from authoring-tool
//! specs; at extraction time the chain is applied left to right, each stage
//! consuming the previous stage's output. A stage that fails to match drops
//! the value, and extraction carries on with the other fields.

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::error::{CompileError, Result};
use crate::types::FieldType;

/// Serialized form of one registered extractor.
///
/// Exactly one of the two families applies: a regular expression whose
/// capture groups become the output, or a field-type coercion.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ExtractorSpec {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub regular_expression: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub type_extractor: Option<FieldType>,
}

#[derive(Debug, Clone)]
enum Handle {
    Pattern(Regex),
    Coerce(FieldType),
}

impl Handle {
    fn apply(&self, value: &str) -> Option<String> {
        match self {
            Handle::Pattern(re) => {
                let caps = re.captures(value)?;
                let out: String = if caps.len() > 1 {
                    caps.iter()
                        .skip(1)
                        .flatten()
                        .map(|group| group.as_str())
                        .collect()
                } else {
                    caps.get(0)?.as_str().to_string()
                };
                (!out.is_empty()).then_some(out)
            }
            Handle::Coerce(field_type) => field_type.adapt(value),
        }
    }
}

/// Registry of pure string-transform stages, resolved from ids at
/// template-compile time.
#[derive(Debug, Clone, Default)]
pub struct ExtractorRegistry {
    handles: HashMap<String, Handle>,
}

impl ExtractorRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Resolve a set of authoring-tool specs into callable handles.
    ///
    /// An invalid regular expression aborts the whole registry: a template
    /// referencing it could never run.
    pub fn compile(specs: &HashMap<String, ExtractorSpec>) -> Result<Self> {
        let mut registry = Self::new();
        for (id, spec) in specs {
            if let Some(pattern) = &spec.regular_expression {
                registry = registry.with_regex(id.clone(), pattern)?;
            } else if let Some(field_type) = spec.type_extractor {
                registry = registry.with_type(id.clone(), field_type);
            }
        }
        Ok(registry)
    }

    /// Register a regular-expression stage.
    pub fn with_regex(mut self, id: impl Into<String>, pattern: &str) -> Result<Self> {
        let id = id.into();
        let re = Regex::new(pattern).map_err(|source| CompileError::InvalidExtractor {
            id: id.clone(),
            source,
        })?;
        self.handles.insert(id, Handle::Pattern(re));
        Ok(self)
    }

    /// Register a field-type coercion stage.
    pub fn with_type(mut self, id: impl Into<String>, field_type: FieldType) -> Self {
        self.handles.insert(id.into(), Handle::Coerce(field_type));
        self
    }

    pub fn contains(&self, id: &str) -> bool {
        self.handles.contains_key(id)
    }

    /// Apply a chain of stages left to right.
    ///
    /// `None` when any stage fails to produce output; the empty chain passes
    /// the value through unchanged.
    pub fn apply_chain(&self, ids: &[String], value: &str) -> Option<String> {
        let mut current = value.to_string();
        for id in ids {
            current = self.handles.get(id)?.apply(&current)?;
        }
        Some(current)
    }
}

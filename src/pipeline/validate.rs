//! Record validation: schema selection and field-type adaptation.
//!
//! A candidate record moves through extra-requirement gating, then
//! TypeSelection over the registered schemas in declared order (the
//! `#default` catch-all last). Rejected records are dropped silently;
//! they simply do not appear in the output.

use tracing::trace;

use crate::pipeline::extract::StickyContext;
use crate::types::{DescriptorSet, FieldMap, FieldValue, ItemDescriptor};

/// Validate and adapt a raw field map.
///
/// Returns the chosen schema's type name and the adapted fields, or `None`
/// when the record fails `extra_requires` or no schema's requirements are
/// met. With no schemas registered every record passes through unadapted
/// and untyped.
pub fn validate_item(
    fields: FieldMap,
    descriptors: &DescriptorSet,
    extra_requires: &[String],
    sticky: &StickyContext,
) -> Option<(Option<String>, FieldMap)> {
    for name in extra_requires {
        let extracted = fields
            .get(name)
            .is_some_and(|values| values.iter().any(|v| !v.is_blank()));
        if !extracted && !sticky.contains(name) {
            trace!(field = %name, "record rejected: unmet extra requirement");
            return None;
        }
    }

    if descriptors.is_empty() {
        return Some((None, fields));
    }

    for (key, descriptor) in descriptors.selection_order() {
        if !requirements_met(descriptor, &fields) {
            continue;
        }
        let type_name = descriptor.type_name(key);
        return adapt(descriptor, fields).map(|adapted| (Some(type_name), adapted));
    }
    trace!("record rejected: no schema requirements met");
    None
}

/// Whether every required field of the schema has a non-blank value.
fn requirements_met(descriptor: &ItemDescriptor, fields: &FieldMap) -> bool {
    descriptor.required_fields().all(|name| {
        fields
            .get(name)
            .is_some_and(|values| values.iter().any(|v| !v.is_blank()))
    })
}

/// Run declared fields through their type coercions and display renames.
///
/// Values failing coercion are dropped; emptying a schema-required field
/// rejects the record. Fields outside the schema pass through untouched,
/// as do nested sub-items.
fn adapt(descriptor: &ItemDescriptor, fields: FieldMap) -> Option<FieldMap> {
    let mut adapted = FieldMap::new();
    for (name, values) in fields {
        let Some(field_descriptor) = descriptor.fields.get(&name) else {
            adapted.insert(name, values);
            continue;
        };
        let coerced: Vec<FieldValue> = values
            .into_iter()
            .filter_map(|value| match value {
                FieldValue::Text(text) => field_descriptor
                    .field_type
                    .adapt(&text)
                    .map(FieldValue::Text),
                item @ FieldValue::Item(_) => Some(item),
            })
            .collect();
        if coerced.is_empty() {
            if field_descriptor.required {
                return None;
            }
            continue;
        }
        let key = field_descriptor.name.clone().unwrap_or(name);
        adapted.entry(key).or_default().extend(coerced);
    }
    Some(adapted)
}

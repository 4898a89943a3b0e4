//! Per-template extraction: walk the container tree over a target page,
//! extract leaf fields per matched instance, and assemble candidate records.

use std::collections::HashMap;
use std::ops::Range;
use tracing::trace;

use crate::html::{HtmlPage, HtmlToken};
use crate::pipeline::matcher::{balanced_close, match_container, TokenRange};
use crate::pipeline::validate::validate_item;
use crate::template::{AnnotationGroup, Template};
use crate::types::{
    Annotation, AnnotationKind, AttributeSource, DescriptorSet, ExtractedItem, FieldMap,
    FieldValue,
};

/// Ambient values inherited from enclosing containers.
///
/// Sticky values travel down the recursive match/extract calls as an
/// explicit, immutable context; child containers receive an extended copy,
/// never a shared mutable map. The page-level call may seed ambient values.
#[derive(Debug, Clone, Default)]
pub struct StickyContext {
    values: HashMap<String, String>,
}

impl StickyContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed an ambient value.
    pub fn with_value(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.values.insert(name.into(), value.into());
        self
    }

    pub fn contains(&self, name: &str) -> bool {
        self.values.contains_key(name)
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.values.get(name).map(String::as_str)
    }

    fn extended(&self, additions: &[(String, String)]) -> Self {
        if additions.is_empty() {
            return self.clone();
        }
        let mut child = self.clone();
        for (name, value) in additions {
            child.values.insert(name.clone(), value.clone());
        }
        child
    }
}

/// Runs one compiled template against target pages.
pub struct TemplateExtractor<'a> {
    template: &'a Template,
    descriptors: &'a DescriptorSet,
}

impl<'a> TemplateExtractor<'a> {
    pub fn new(template: &'a Template, descriptors: &'a DescriptorSet) -> Self {
        Self {
            template,
            descriptors,
        }
    }

    /// Extract every record the template yields for this page, in document
    /// order per container. An unmatched page yields an empty list.
    pub fn extract(&self, page: &HtmlPage) -> Vec<ExtractedItem> {
        self.extract_with_context(page, &StickyContext::new())
    }

    /// Extract with seeded ambient sticky values.
    pub fn extract_with_context(
        &self,
        page: &HtmlPage,
        sticky: &StickyContext,
    ) -> Vec<ExtractedItem> {
        let mut counters: HashMap<String, usize> = HashMap::new();
        let mut out = Vec::new();
        let stream = 0..page.tokens().len();

        // uncontained annotations form at most one page-level record
        let remaining: Vec<&Annotation> = self.template.remaining().iter().collect();
        if !remaining.is_empty() {
            let (fields, _) = self.extract_fields(page, stream.clone(), None, &remaining);
            if !fields.is_empty() && required_satisfied(&remaining, &fields) {
                if let Some((item_type, fields)) =
                    validate_item(fields, self.descriptors, &[], sticky)
                {
                    out.push(self.finish(1, item_type, fields));
                }
            }
        }

        for (root, group) in self.template.grouped() {
            let records =
                self.container(page, root, group, stream.clone(), sticky, &mut counters, &mut out);
            out.extend(records);
        }
        out
    }

    /// Match one container inside `search` and assemble its records.
    ///
    /// The grouped annotation map drives recursion: a container whose group
    /// holds nested sub-groups recurses into each child container, confined
    /// to the instance's own range. Returns the container's own accepted
    /// records; records of descendant containers that do not nest under a
    /// field are flattened into `out`.
    #[allow(clippy::too_many_arguments)]
    fn container(
        &self,
        page: &HtmlPage,
        container_id: &str,
        group: &AnnotationGroup,
        search: Range<usize>,
        sticky: &StickyContext,
        counters: &mut HashMap<String, usize>,
        out: &mut Vec<ExtractedItem>,
    ) -> Vec<ExtractedItem> {
        let mut records = Vec::new();
        let Some(container) = self.template.container(container_id) else {
            return records;
        };
        let Some(locator) = self.template.locator(container) else {
            return records;
        };

        let leaves: Vec<&Annotation> = self
            .template
            .children_of(container_id)
            .iter()
            .filter(|a| !a.is_container())
            .collect();
        let subgroups: Vec<(&String, &AnnotationGroup)> = match group {
            AnnotationGroup::Containers(map) => map.iter().collect(),
            AnnotationGroup::Annotations(_) => Vec::new(),
        };
        let extra_requires = container.extra_requires();

        for instance in match_container(container, locator, page.tokens(), search) {
            let occurrence = {
                let counter = counters.entry(container_id.to_string()).or_insert(0);
                *counter += 1;
                *counter
            };

            let (mut fields, sticky_additions) =
                self.extract_fields(page, instance.interior(), Some(instance), &leaves);
            let child_sticky = sticky.extended(&sticky_additions);

            for (sub_id, sub_group) in subgroups.iter().copied() {
                let Some(subcontainer) = self.template.container(sub_id) else {
                    continue;
                };
                let sub_records = self.container(
                    page,
                    sub_id,
                    sub_group,
                    instance.interior(),
                    &child_sticky,
                    counters,
                    out,
                );
                match subcontainer.nesting_field() {
                    Some(field) if !sub_records.is_empty() => {
                        fields
                            .entry(field.to_string())
                            .or_default()
                            .extend(sub_records.into_iter().map(FieldValue::Item));
                    }
                    _ => out.extend(sub_records),
                }
            }

            if fields.is_empty() {
                continue;
            }
            if !required_satisfied(&leaves, &fields) {
                trace!(container = container_id, occurrence, "record dropped: required field missing");
                continue;
            }
            if let Some((item_type, fields)) =
                validate_item(fields, self.descriptors, extra_requires, &child_sticky)
            {
                records.push(self.finish(occurrence, item_type, fields));
            }
        }
        records
    }

    /// Extract the leaf annotations' values inside one matched range.
    ///
    /// Returns the raw field map plus the values of sticky-marked leaves,
    /// to be inherited by child containers.
    fn extract_fields(
        &self,
        page: &HtmlPage,
        search: Range<usize>,
        instance: Option<TokenRange>,
        leaves: &[&Annotation],
    ) -> (FieldMap, Vec<(String, String)>) {
        let tokens = page.tokens();
        let mut fields = FieldMap::new();
        let mut sticky_additions = Vec::new();

        for annotation in leaves {
            let AnnotationKind::Field(leaf) = &annotation.kind else {
                continue;
            };
            let Some(locator) = self.template.locator(annotation) else {
                continue;
            };

            let elements: Vec<TokenRange> = if locator.container_element {
                instance.into_iter().collect()
            } else {
                let starts = element_starts(tokens, search.clone(), &locator.tag);
                if locator.occurrences > 1 {
                    // the sample held several same-tag elements: match positionally
                    starts
                        .get(locator.ordinal)
                        .map(|&open| element_at(tokens, open, search.end))
                        .into_iter()
                        .collect()
                } else {
                    starts
                        .into_iter()
                        .map(|open| element_at(tokens, open, search.end))
                        .collect()
                }
            };

            for element in elements {
                let raw = match &leaf.attribute {
                    AttributeSource::Content => {
                        (element.end > element.start)
                            .then(|| page.text_between(element.start, element.end).to_string())
                    }
                    AttributeSource::Attribute(name) => tokens[element.start]
                        .attribute(name)
                        .map(str::to_string),
                };
                let Some(raw) = raw else { continue };
                let Some(value) = self
                    .template
                    .extractors()
                    .apply_chain(&leaf.extractors, &raw)
                else {
                    continue;
                };
                if value.trim().is_empty() {
                    continue;
                }
                if leaf.sticky {
                    sticky_additions.push((leaf.field.clone(), value.clone()));
                }
                fields
                    .entry(leaf.field.clone())
                    .or_default()
                    .push(FieldValue::Text(value));
            }
        }
        (fields, sticky_additions)
    }

    fn finish(&self, index: usize, item_type: Option<String>, fields: FieldMap) -> ExtractedItem {
        ExtractedItem {
            index,
            template: self.template.id().to_string(),
            item_type,
            fields,
        }
    }
}

/// Opening positions of elements with `tag` inside a search range.
fn element_starts(tokens: &[HtmlToken], range: Range<usize>, tag: &str) -> Vec<usize> {
    let limit = range.end.min(tokens.len());
    (range.start..limit)
        .filter(|&i| tokens[i].is_element_start() && tokens[i].has_tag(tag))
        .collect()
}

/// The element starting at `open`, bounded by its balanced close.
///
/// Unpaired and unterminated elements collapse to a zero-width range: their
/// content is empty but attributes stay readable.
fn element_at(tokens: &[HtmlToken], open: usize, limit: usize) -> TokenRange {
    match balanced_close(tokens, open, limit) {
        Some(close) => TokenRange { start: open, end: close },
        None => TokenRange { start: open, end: open },
    }
}

/// Whether every required leaf annotation extracted a non-blank value.
fn required_satisfied(leaves: &[&Annotation], fields: &FieldMap) -> bool {
    leaves.iter().all(|annotation| match &annotation.kind {
        AnnotationKind::Field(leaf) if leaf.required => fields
            .get(&leaf.field)
            .is_some_and(|values| values.iter().any(|v| !v.is_blank())),
        _ => true,
    })
}

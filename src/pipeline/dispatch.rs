//! Multi-template dispatch.
//!
//! A page may have been annotated under several layouts. The dispatcher
//! holds every compiled template, runs each one against the shared token
//! stream and unions the accepted records: templates are never ranked or
//! short-circuited, so a page matching only the last registered template
//! still yields its records.

use tracing::debug;

use crate::html::HtmlPage;
use crate::pipeline::extract::{StickyContext, TemplateExtractor};
use crate::template::Template;
use crate::types::{DescriptorSet, ExtractedItem};

/// One registered template with its schema set and the annotation-format
/// version it was authored under.
#[derive(Debug)]
pub struct TemplateEntry {
    pub template: Template,
    pub descriptors: DescriptorSet,
    pub version: String,
}

impl TemplateEntry {
    pub fn new(template: Template, descriptors: DescriptorSet) -> Self {
        Self {
            template,
            descriptors,
            version: String::new(),
        }
    }

    pub fn with_version(mut self, version: impl Into<String>) -> Self {
        self.version = version.into();
        self
    }
}

/// Everything extracted from one page, with the templates that produced it.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ExtractionOutcome {
    /// Accepted records across all templates, in registration order.
    pub items: Vec<ExtractedItem>,
    /// Ids of the templates that contributed at least one record.
    pub matched_templates: Vec<String>,
}

impl ExtractionOutcome {
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

/// An ordered collection of compiled templates applied per page.
#[derive(Debug, Default)]
pub struct TemplateSet {
    entries: Vec<TemplateEntry>,
}

impl TemplateSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_entry(mut self, entry: TemplateEntry) -> Self {
        self.entries.push(entry);
        self
    }

    pub fn push(&mut self, entry: TemplateEntry) {
        self.entries.push(entry);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Run every registered template over the page and union the results.
    pub fn extract(&self, page: &HtmlPage) -> ExtractionOutcome {
        self.extract_with_context(page, &StickyContext::new())
    }

    /// As [`TemplateSet::extract`], with seeded ambient sticky values.
    pub fn extract_with_context(
        &self,
        page: &HtmlPage,
        sticky: &StickyContext,
    ) -> ExtractionOutcome {
        let mut outcome = ExtractionOutcome::default();
        for entry in &self.entries {
            let items = TemplateExtractor::new(&entry.template, &entry.descriptors)
                .extract_with_context(page, sticky);
            debug!(
                template = entry.template.id(),
                version = %entry.version,
                url = %page.url,
                count = items.len(),
                "template extraction finished"
            );
            if !items.is_empty() {
                outcome
                    .matched_templates
                    .push(entry.template.id().to_string());
            }
            outcome.items.extend(items);
        }
        outcome
    }
}

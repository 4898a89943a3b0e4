//! Template-Driven Structured Data Extraction
//!
//! Extracts structured records from HTML pages by matching a previously
//! annotated sample page ("template") against new pages that share the same
//! structure. An operator annotates one sample page, marking which elements
//! feed which output fields and which elements delimit repeating or nested
//! item groups; the compiled template is then applied to arbitrary
//! pages of the same site.
//!
//! # Design
//!
//! - Annotation compilation builds a strict rooted forest of containers;
//!   structural defects (unknown container references, cycles) abort
//!   compilation, while imperfect page matches are routine and absorbed.
//! - Matching is purely computational over a token stream: no I/O, no
//!   blocking, no shared mutable state. Templates are immutable and can be
//!   shared across threads.
//! - Repetition has no markers in HTML, so repeated containers are found by
//!   balanced-tag boundary detection over tag signatures.
//!
//! # Usage
//!
//! ```rust,ignore
//! use template_extraction::{
//!     Annotation, DescriptorSet, ExtractorRegistry, HtmlPage, Template,
//!     TemplateEntry, TemplateSet,
//! };
//!
//! // Compile the annotated sample page once, at load time
//! let sample = HtmlPage::parse("https://example.com/list", sample_body);
//! let template = Template::compile(
//!     Some("list-layout".into()),
//!     sample,
//!     annotations,
//!     ExtractorRegistry::new(),
//! )?;
//!
//! // Apply it to any page of the same site
//! let set = TemplateSet::new().with_entry(TemplateEntry::new(template, schemas));
//! let page = HtmlPage::parse("https://example.com/list?page=2", page_body);
//! let outcome = set.extract(&page);
//! for item in &outcome.items {
//!     println!("{:?} -> {:?}", item.index, item.texts("title"));
//! }
//! ```
//!
//! # Modules
//!
//! - [`html`] - Pages and their token streams
//! - [`types`] - Annotations, schemas and extracted items
//! - [`extractors`] - Post-processing extractor chains
//! - [`template`] - Template compilation
//! - [`pipeline`] - Matching, extraction, validation and dispatch
//! - [`testing`] - Deterministic fixtures for tests

pub mod error;
pub mod extractors;
pub mod html;
pub mod pipeline;
pub mod template;
pub mod testing;
pub mod types;

// Re-export core types at crate root
pub use error::{CompileError, Result};
pub use extractors::{ExtractorRegistry, ExtractorSpec};
pub use html::{HtmlPage, HtmlToken, TokenKind};
pub use template::{
    container_data, extraction_tree, group_tree, AnnotationGroup, ContainerData, ElementLocator,
    Template, TemplateSpec,
};
pub use types::{
    Annotation, AnnotationKind, AttributeSource, DescriptorSet, ExtractedItem, FieldAnnotation,
    FieldBinding, FieldDescriptor, FieldMap, FieldType, FieldValue, ItemDescriptor, RawAnnotation,
};

// Re-export pipeline components
pub use pipeline::{
    ExtractionOutcome, StickyContext, TemplateEntry, TemplateExtractor, TemplateSet, TokenRange,
};

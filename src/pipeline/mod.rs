//! The extraction pipeline: container matching, field extraction, record
//! validation and multi-template dispatch.
//!
//! The pipeline runs once per incoming page, driven by the compiled
//! template tree:
//! - match container instances top-down ([`matcher`])
//! - extract per-field values inside each instance ([`extract`])
//! - select a schema and adapt each candidate record ([`validate`])
//! - aggregate across templates ([`dispatch`])

pub mod dispatch;
pub mod extract;
pub mod matcher;
pub mod validate;

pub use dispatch::{ExtractionOutcome, TemplateEntry, TemplateSet};
pub use extract::{StickyContext, TemplateExtractor};
pub use matcher::{balanced_close, find_elements, find_tokens, match_container, TokenRange};
pub use validate::validate_item;

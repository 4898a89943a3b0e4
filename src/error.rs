//! Typed errors for template compilation.
//!
//! Uses `thiserror` for library errors (not `anyhow`) to provide
//! strongly-typed, composable error handling.
//!
//! Only structural problems in a template abort compilation. Per-page
//! conditions (a container with no match, an empty field, a non-matching
//! extractor stage) are routine and surface as zero instances or absent
//! values, never as errors.

use thiserror::Error;

/// Errors that can occur while compiling an annotated template.
#[derive(Debug, Error)]
pub enum CompileError {
    /// An annotation references a container id that is not defined
    #[error("annotation `{annotation}` references unknown container `{container}`")]
    UnknownContainer {
        annotation: String,
        container: String,
    },

    /// The container parent chain revisits itself
    #[error("container `{container}` is part of a cycle in the container tree")]
    ContainerCycle { container: String },

    /// An annotation does not point at an element opening tag
    #[error("annotation `{annotation}` does not mark an element open tag (token {index})")]
    InvalidElement { annotation: String, index: usize },

    /// An annotation references an extractor id that is not registered
    #[error("unknown extractor `{id}`")]
    UnknownExtractor { id: String },

    /// An extractor's regular expression failed to compile
    #[error("invalid regular expression in extractor `{id}`")]
    InvalidExtractor {
        id: String,
        #[source]
        source: regex::Error,
    },

    /// A template spec could not be parsed from JSON
    #[error("template spec parse error: {0}")]
    SpecParse(#[from] serde_json::Error),
}

/// Result type alias for template compilation.
pub type Result<T> = std::result::Result<T, CompileError>;

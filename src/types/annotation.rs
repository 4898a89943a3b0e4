//! Annotations: rules binding sample-page elements to output fields.
//!
//! An annotation references one element occurrence in the sample page by the
//! token indices of its opening and balanced closing tags. Leaf annotations
//! read a value off the element; container annotations delimit an item or a
//! group of items and form a tree through their `container_id` links.

use serde::{Deserialize, Serialize};

/// What to read off a matched element.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum AttributeSource {
    /// The raw content between the element's open and close tags.
    #[default]
    Content,
    /// A named HTML attribute of the open tag.
    Attribute(String),
}

impl From<String> for AttributeSource {
    fn from(value: String) -> Self {
        if value == "content" {
            AttributeSource::Content
        } else {
            AttributeSource::Attribute(value)
        }
    }
}

impl From<AttributeSource> for String {
    fn from(value: AttributeSource) -> Self {
        match value {
            AttributeSource::Content => "content".to_string(),
            AttributeSource::Attribute(name) => name,
        }
    }
}

/// Leaf payload: which attribute feeds which output field, and how.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldAnnotation {
    pub attribute: AttributeSource,
    pub field: String,
    pub required: bool,
    /// Sticky values are inherited by descendant containers through the
    /// extraction context instead of (only) landing in the record.
    pub sticky: bool,
    pub extractors: Vec<String>,
}

/// The two annotation shapes, switched on explicitly by the pipeline.
#[derive(Debug, Clone, PartialEq)]
pub enum AnnotationKind {
    Field(FieldAnnotation),
    Container {
        repeated: bool,
        /// When set, the container's records nest under this field of the
        /// parent record instead of being emitted as page-level siblings.
        field: Option<String>,
        /// Field names that must be satisfied (extracted or sticky) for any
        /// record of this container to be accepted.
        extra_requires: Vec<String>,
    },
}

/// One extraction rule bound to one element occurrence of the sample page.
#[derive(Debug, Clone, PartialEq)]
pub struct Annotation {
    pub id: String,
    pub container_id: Option<String>,
    /// Token index of the element's opening tag in the sample page.
    pub start_index: usize,
    /// Token index of the element's balanced closing tag (equal to
    /// `start_index` for unpaired elements).
    pub end_index: usize,
    /// Disambiguates multiple field bindings on the same element.
    pub variant_id: u32,
    pub kind: AnnotationKind,
}

impl Annotation {
    /// A leaf annotation reading the element's content into `field`.
    pub fn field(
        id: impl Into<String>,
        element: (usize, usize),
        field: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            container_id: None,
            start_index: element.0,
            end_index: element.1,
            variant_id: 1,
            kind: AnnotationKind::Field(FieldAnnotation {
                attribute: AttributeSource::Content,
                field: field.into(),
                required: false,
                sticky: false,
                extractors: Vec::new(),
            }),
        }
    }

    /// A container annotation delimiting an item or group of items.
    pub fn container(id: impl Into<String>, element: (usize, usize)) -> Self {
        Self {
            id: id.into(),
            container_id: None,
            start_index: element.0,
            end_index: element.1,
            variant_id: 0,
            kind: AnnotationKind::Container {
                repeated: false,
                field: None,
                extra_requires: Vec::new(),
            },
        }
    }

    /// Place this annotation inside a container.
    pub fn in_container(mut self, container_id: impl Into<String>) -> Self {
        self.container_id = Some(container_id.into());
        self
    }

    pub fn with_variant(mut self, variant_id: u32) -> Self {
        self.variant_id = variant_id;
        self
    }

    /// Read a named HTML attribute instead of the element content.
    pub fn from_attribute(mut self, name: impl Into<String>) -> Self {
        if let AnnotationKind::Field(f) = &mut self.kind {
            f.attribute = AttributeSource::Attribute(name.into());
        }
        self
    }

    /// Require a non-empty value for this field in every record.
    pub fn required(mut self) -> Self {
        if let AnnotationKind::Field(f) = &mut self.kind {
            f.required = true;
        }
        self
    }

    /// Mark the extracted value as inherited by descendant containers.
    pub fn sticky(mut self) -> Self {
        if let AnnotationKind::Field(f) = &mut self.kind {
            f.sticky = true;
        }
        self
    }

    /// Attach a post-processing extractor chain, applied left to right.
    pub fn with_extractors(
        mut self,
        ids: impl IntoIterator<Item = impl Into<String>>,
    ) -> Self {
        if let AnnotationKind::Field(f) = &mut self.kind {
            f.extractors = ids.into_iter().map(Into::into).collect();
        }
        self
    }

    /// Mark a container as matching every occurrence of its element.
    pub fn repeated(mut self) -> Self {
        if let AnnotationKind::Container { repeated, .. } = &mut self.kind {
            *repeated = true;
        }
        self
    }

    /// Nest this container's records under a field of the parent record.
    pub fn nested_under_field(mut self, name: impl Into<String>) -> Self {
        if let AnnotationKind::Container { field, .. } = &mut self.kind {
            *field = Some(name.into());
        }
        self
    }

    /// Fields that must be satisfied for any record of this container.
    pub fn with_extra_requires(
        mut self,
        names: impl IntoIterator<Item = impl Into<String>>,
    ) -> Self {
        if let AnnotationKind::Container { extra_requires, .. } = &mut self.kind {
            *extra_requires = names.into_iter().map(Into::into).collect();
        }
        self
    }

    pub fn is_container(&self) -> bool {
        matches!(self.kind, AnnotationKind::Container { .. })
    }

    pub fn is_repeated(&self) -> bool {
        matches!(self.kind, AnnotationKind::Container { repeated: true, .. })
    }

    /// The parent-record field this container nests under, if any.
    pub fn nesting_field(&self) -> Option<&str> {
        match &self.kind {
            AnnotationKind::Container { field, .. } => field.as_deref(),
            AnnotationKind::Field(_) => None,
        }
    }

    pub fn extra_requires(&self) -> &[String] {
        match &self.kind {
            AnnotationKind::Container { extra_requires, .. } => extra_requires,
            AnnotationKind::Field(_) => &[],
        }
    }

    /// The output field a leaf annotation writes to.
    pub fn field_name(&self) -> Option<&str> {
        match &self.kind {
            AnnotationKind::Field(f) => Some(&f.field),
            AnnotationKind::Container { .. } => None,
        }
    }
}

/// One per-variant field binding of an authoring-tool annotation record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FieldBinding {
    #[serde(default)]
    pub attribute: AttributeSource,
    pub field: String,
    #[serde(default)]
    pub required: bool,
    #[serde(default)]
    pub sticky: bool,
    #[serde(default)]
    pub extractors: Vec<String>,
}

/// Flat annotation record as produced by the authoring tool.
///
/// One record marks one sample-page element (by token index) and carries
/// either container flags, field bindings, or both (a container element can
/// itself feed fields). [`RawAnnotation::into_annotations`] flattens a record
/// into one [`Annotation`] per binding plus the container annotation.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RawAnnotation {
    pub id: String,
    #[serde(default)]
    pub container_id: Option<String>,
    pub start_index: usize,
    pub end_index: usize,
    #[serde(default)]
    pub item_container: bool,
    #[serde(default)]
    pub repeated: bool,
    #[serde(default)]
    pub field: Option<String>,
    #[serde(default)]
    pub extra_requires: Vec<String>,
    #[serde(default)]
    pub data: Vec<FieldBinding>,
}

impl RawAnnotation {
    /// Flatten into compiled annotations.
    ///
    /// Field bindings on a container become leaf annotations contained in
    /// that container, reading the container element itself.
    pub fn into_annotations(self) -> Vec<Annotation> {
        let element = (self.start_index, self.end_index);
        let mut out = Vec::new();

        if self.item_container {
            let mut container = Annotation::container(self.id.clone(), element)
                .with_extra_requires(self.extra_requires.clone());
            if let Some(parent) = &self.container_id {
                container = container.in_container(parent.clone());
            }
            if self.repeated {
                container = container.repeated();
            }
            if let Some(field) = &self.field {
                container = container.nested_under_field(field.clone());
            }
            out.push(container);
        }

        let leaf_container = if self.item_container {
            Some(self.id.clone())
        } else {
            self.container_id.clone()
        };
        for (position, binding) in self.data.into_iter().enumerate() {
            out.push(Annotation {
                id: self.id.clone(),
                container_id: leaf_container.clone(),
                start_index: element.0,
                end_index: element.1,
                variant_id: (position + 1) as u32,
                kind: AnnotationKind::Field(FieldAnnotation {
                    attribute: binding.attribute,
                    field: binding.field,
                    required: binding.required,
                    sticky: binding.sticky,
                    extractors: binding.extractors,
                }),
            });
        }
        out
    }
}

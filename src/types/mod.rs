//! Domain data types: annotations, schemas and extracted items.

pub mod annotation;
pub mod item;
pub mod schema;

pub use annotation::{
    Annotation, AnnotationKind, AttributeSource, FieldAnnotation, FieldBinding, RawAnnotation,
};
pub use item::{ExtractedItem, FieldMap, FieldValue};
pub use schema::{DescriptorSet, FieldDescriptor, FieldType, ItemDescriptor};

//! Template compilation.
//!
//! A template is the compiled extraction plan derived from one annotated
//! sample page: the page's token stream, the container registry, the
//! extraction tree (root-to-node container paths), the grouped annotation
//! map mirroring that tree, and per-annotation element locators. Templates
//! are immutable after compilation and shared read-only across extractions.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};

use crate::error::{CompileError, Result};
use crate::extractors::{ExtractorRegistry, ExtractorSpec};
use crate::html::HtmlPage;
use crate::types::{Annotation, AnnotationKind, RawAnnotation};

/// Partition of a template's annotations around its containers.
#[derive(Debug, Clone, Default)]
pub struct ContainerData {
    /// Container annotations by container id.
    pub containers: IndexMap<String, Annotation>,
    /// Direct children (leaf annotations and sub-containers) per container.
    pub children: IndexMap<String, Vec<Annotation>>,
    /// Annotations contained by nothing; extracted against the whole page.
    pub remaining: Vec<Annotation>,
}

/// Recursive annotation grouping mirroring the extraction tree.
///
/// A container id maps to the plain list of its direct children, or, once
/// it has child containers, to a nested mapping keyed by child id.
#[derive(Debug, Clone, PartialEq)]
pub enum AnnotationGroup {
    Annotations(Vec<Annotation>),
    Containers(IndexMap<String, AnnotationGroup>),
}

/// Where an annotation's element sits among same-signature elements of its
/// container in the sample page.
///
/// The compiled residue of the authoring tool's positional selectors: when
/// the sample container held several elements of this tag, the ordinal picks
/// the corresponding element in a matched target instance.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ElementLocator {
    pub tag: String,
    /// 0-based position among same-tag elements in the container range.
    pub ordinal: usize,
    /// How many same-tag elements the sample container held.
    pub occurrences: usize,
    /// The annotation reads the container element itself.
    pub container_element: bool,
}

/// Partition annotations into containers, per-container children and
/// uncontained remainder.
///
/// Every annotation lands in exactly one bucket. A `container_id` that does
/// not resolve to a known container aborts compilation.
pub fn container_data(annotations: &[Annotation]) -> Result<ContainerData> {
    let mut data = ContainerData::default();
    for annotation in annotations.iter().filter(|a| a.is_container()) {
        data.containers
            .insert(annotation.id.clone(), annotation.clone());
        data.children.entry(annotation.id.clone()).or_default();
    }
    for annotation in annotations {
        match &annotation.container_id {
            Some(container_id) => match data.children.get_mut(container_id) {
                Some(children) => children.push(annotation.clone()),
                None => {
                    return Err(CompileError::UnknownContainer {
                        annotation: annotation.id.clone(),
                        container: container_id.clone(),
                    })
                }
            },
            None if !annotation.is_container() => data.remaining.push(annotation.clone()),
            None => {}
        }
    }
    Ok(data)
}

/// Root-to-node id paths through the container parent links, preorder.
///
/// Rejects cyclic parent chains: every container must be reachable from a
/// root (a container with no parent).
pub fn extraction_tree(containers: &IndexMap<String, Annotation>) -> Result<Vec<Vec<String>>> {
    let mut child_ids: IndexMap<&str, Vec<&str>> = IndexMap::new();
    let mut roots: Vec<&str> = Vec::new();
    for (id, container) in containers {
        match container.container_id.as_deref() {
            None => roots.push(id),
            Some(parent) => child_ids.entry(parent).or_default().push(id),
        }
    }

    let mut paths = Vec::new();
    let mut reached = HashSet::new();
    let mut path = Vec::new();
    for root in roots {
        walk(root, &child_ids, &mut path, &mut paths, &mut reached);
    }

    if reached.len() != containers.len() {
        if let Some(stray) = containers.keys().find(|id| !reached.contains(id.as_str())) {
            return Err(CompileError::ContainerCycle {
                container: stray.clone(),
            });
        }
    }
    Ok(paths)
}

fn walk(
    id: &str,
    child_ids: &IndexMap<&str, Vec<&str>>,
    path: &mut Vec<String>,
    paths: &mut Vec<Vec<String>>,
    reached: &mut HashSet<String>,
) {
    if !reached.insert(id.to_string()) {
        return;
    }
    path.push(id.to_string());
    paths.push(path.clone());
    if let Some(children) = child_ids.get(id) {
        for child in children {
            walk(child, child_ids, path, paths, reached);
        }
    }
    path.pop();
}

/// Fold root-to-node paths into the recursive grouped annotation map.
pub fn group_tree(
    tree: &[Vec<String>],
    children: &IndexMap<String, Vec<Annotation>>,
) -> IndexMap<String, AnnotationGroup> {
    let mut grouped = IndexMap::new();
    for path in tree {
        insert_path(&mut grouped, path, children);
    }
    grouped
}

fn insert_path(
    map: &mut IndexMap<String, AnnotationGroup>,
    path: &[String],
    children: &IndexMap<String, Vec<Annotation>>,
) {
    let Some((head, rest)) = path.split_first() else {
        return;
    };
    if rest.is_empty() {
        map.insert(
            head.clone(),
            AnnotationGroup::Annotations(children.get(head).cloned().unwrap_or_default()),
        );
        return;
    }
    let entry = map
        .entry(head.clone())
        .or_insert_with(|| AnnotationGroup::Containers(IndexMap::new()));
    if !matches!(entry, AnnotationGroup::Containers(_)) {
        *entry = AnnotationGroup::Containers(IndexMap::new());
    }
    if let AnnotationGroup::Containers(inner) = entry {
        insert_path(inner, rest, children);
    }
}

/// Full template input as produced by the authoring tool.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TemplateSpec {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub url: String,
    pub body: String,
    #[serde(default)]
    pub annotations: Vec<RawAnnotation>,
    #[serde(default)]
    pub extractors: HashMap<String, ExtractorSpec>,
}

impl TemplateSpec {
    /// Parse a template spec from its JSON form.
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }
}

/// A compiled extraction plan derived from one annotated sample page.
#[derive(Debug, Clone)]
pub struct Template {
    id: String,
    page: HtmlPage,
    containers: IndexMap<String, Annotation>,
    children: IndexMap<String, Vec<Annotation>>,
    tree: Vec<Vec<String>>,
    grouped: IndexMap<String, AnnotationGroup>,
    remaining: Vec<Annotation>,
    locators: HashMap<(String, u32), ElementLocator>,
    extractors: ExtractorRegistry,
}

impl Template {
    /// Compile a template from a sample page and its annotations.
    ///
    /// With no explicit id the page fingerprint identifies the template.
    pub fn compile(
        id: Option<String>,
        page: HtmlPage,
        annotations: Vec<Annotation>,
        extractors: ExtractorRegistry,
    ) -> Result<Self> {
        let token_count = page.tokens().len();
        for annotation in &annotations {
            let starts_element = page
                .token(annotation.start_index)
                .is_some_and(|t| t.is_element_start());
            let bounded =
                annotation.end_index >= annotation.start_index && annotation.end_index < token_count;
            if !starts_element || !bounded {
                return Err(CompileError::InvalidElement {
                    annotation: annotation.id.clone(),
                    index: annotation.start_index,
                });
            }
            if let AnnotationKind::Field(f) = &annotation.kind {
                for extractor in &f.extractors {
                    if !extractors.contains(extractor) {
                        return Err(CompileError::UnknownExtractor {
                            id: extractor.clone(),
                        });
                    }
                }
            }
        }

        let data = container_data(&annotations)?;
        let tree = extraction_tree(&data.containers)?;
        let grouped = group_tree(&tree, &data.children);
        let locators = build_locators(&page, &annotations, &data.containers);
        let id = id.unwrap_or_else(|| page.fingerprint.clone());
        Ok(Self {
            id,
            page,
            containers: data.containers,
            children: data.children,
            tree,
            grouped,
            remaining: data.remaining,
            locators,
            extractors,
        })
    }

    /// Compile from a full authoring-tool spec.
    pub fn from_spec(spec: TemplateSpec) -> Result<Self> {
        let registry = ExtractorRegistry::compile(&spec.extractors)?;
        let page = HtmlPage::parse(spec.url, spec.body);
        let annotations = spec
            .annotations
            .into_iter()
            .flat_map(RawAnnotation::into_annotations)
            .collect();
        Self::compile(spec.id, page, annotations, registry)
    }

    /// Compile straight from a JSON template spec.
    pub fn from_json(json: &str) -> Result<Self> {
        Self::from_spec(TemplateSpec::from_json(json)?)
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn page(&self) -> &HtmlPage {
        &self.page
    }

    pub fn containers(&self) -> &IndexMap<String, Annotation> {
        &self.containers
    }

    pub fn container(&self, id: &str) -> Option<&Annotation> {
        self.containers.get(id)
    }

    /// Direct children of a container, in annotation order.
    pub fn children_of(&self, id: &str) -> &[Annotation] {
        self.children.get(id).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Root-to-node container paths, preorder.
    pub fn tree(&self) -> &[Vec<String>] {
        &self.tree
    }

    pub fn grouped(&self) -> &IndexMap<String, AnnotationGroup> {
        &self.grouped
    }

    /// Annotations contained by nothing, extracted against the whole page.
    pub fn remaining(&self) -> &[Annotation] {
        &self.remaining
    }

    /// The compiled element locator for an annotation.
    pub fn locator(&self, annotation: &Annotation) -> Option<&ElementLocator> {
        self.locators
            .get(&(annotation.id.clone(), annotation.variant_id))
    }

    pub fn extractors(&self) -> &ExtractorRegistry {
        &self.extractors
    }

    /// Look up any annotation of the template by id.
    pub fn find_annotation(&self, id: &str) -> Option<&Annotation> {
        self.containers
            .get(id)
            .or_else(|| {
                self.children
                    .values()
                    .flatten()
                    .find(|annotation| annotation.id == id)
            })
            .or_else(|| self.remaining.iter().find(|annotation| annotation.id == id))
    }
}

fn build_locators(
    page: &HtmlPage,
    annotations: &[Annotation],
    containers: &IndexMap<String, Annotation>,
) -> HashMap<(String, u32), ElementLocator> {
    let tokens = page.tokens();
    let mut locators = HashMap::new();
    for annotation in annotations {
        let key = (annotation.id.clone(), annotation.variant_id);
        if locators.contains_key(&key) {
            continue;
        }
        let Some(tag) = tokens[annotation.start_index].tag.clone() else {
            continue;
        };

        let parent = annotation
            .container_id
            .as_ref()
            .and_then(|id| containers.get(id));
        let container_element =
            parent.is_some_and(|c| c.start_index == annotation.start_index);
        let range = match parent {
            Some(container) => container.start_index + 1..container.end_index,
            None => 0..tokens.len(),
        };

        let (ordinal, occurrences) = if container_element {
            (0, 1)
        } else {
            let positions: Vec<usize> = range
                .filter(|&i| tokens[i].is_element_start() && tokens[i].has_tag(&tag))
                .collect();
            let ordinal = positions
                .iter()
                .position(|&i| i == annotation.start_index)
                .unwrap_or(0);
            (ordinal, positions.len().max(1))
        };

        locators.insert(
            key,
            ElementLocator {
                tag,
                ordinal,
                occurrences,
                container_element,
            },
        );
    }
    locators
}

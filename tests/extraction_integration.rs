//! Integration tests for the full extraction pipeline.
//!
//! These tests walk the whole path: annotate a sample page, compile the
//! template, run it against target pages and check the accepted records.

use template_extraction::testing::{list_page, nth_element};
use template_extraction::{
    Annotation, CompileError, DescriptorSet, ExtractorRegistry, FieldDescriptor, FieldType,
    HtmlPage, ItemDescriptor, StickyContext, Template, TemplateEntry, TemplateSet,
};

const URL: &str = "http://www.test.com/a";

fn half_ranks(n: usize) -> Vec<Option<u32>> {
    (1..=n)
        .map(|i| (i % 2 == 1).then_some(i as u32))
        .collect()
}

fn full_ranks(n: usize) -> Vec<Option<u32>> {
    (1..=n).map(|_| Some(1)).collect()
}

/// Annotate the sample list page: a repeated `<li>` container inside the
/// `<ul>`, with title/url off the link, a required rank and a required
/// description (the second `<div>` of each entry).
fn list_annotations(page: &HtmlPage) -> Vec<Annotation> {
    let ul = nth_element(page, "ul", 0).unwrap();
    let li = nth_element(page, "li", 0).unwrap();
    let a = nth_element(page, "a", 0).unwrap();
    let span = nth_element(page, "span", 0).unwrap();
    let div2 = nth_element(page, "div", 1).unwrap();
    vec![
        Annotation::container("parent", ul),
        Annotation::container("repeated_parent", li)
            .in_container("parent")
            .repeated(),
        Annotation::field("annotation1", a, "title").in_container("repeated_parent"),
        Annotation::field("annotation1", a, "url")
            .with_variant(2)
            .from_attribute("href")
            .in_container("repeated_parent"),
        Annotation::field("annotation2", span, "rank")
            .in_container("repeated_parent")
            .required(),
        Annotation::field("annotation3", div2, "description")
            .in_container("repeated_parent")
            .required(),
    ]
}

fn list_descriptors() -> DescriptorSet {
    DescriptorSet::new()
        .with_schema("#default", ItemDescriptor::new("default_item"))
        .with_schema(
            "data",
            ItemDescriptor::new("data_item")
                .with_field("title", FieldDescriptor::new(FieldType::Text))
                .with_field("url", FieldDescriptor::new(FieldType::Url))
                .with_field("description", FieldDescriptor::new(FieldType::Text))
                .with_field("rank", FieldDescriptor::new(FieldType::Price)),
        )
}

fn list_template() -> Template {
    let sample = HtmlPage::parse(URL, list_page(&half_ranks(10)));
    let annotations = list_annotations(&sample);
    Template::compile(
        Some("simple".into()),
        sample,
        annotations,
        ExtractorRegistry::new(),
    )
    .unwrap()
}

#[test]
fn test_required_annotation_gates_items() {
    let set = TemplateSet::new().with_entry(
        TemplateEntry::new(list_template(), list_descriptors()).with_version("0.13.0"),
    );

    // every rank populated: all ten entries survive
    let target = HtmlPage::parse(URL, list_page(&full_ranks(10)));
    let outcome = set.extract(&target);
    assert_eq!(outcome.items.len(), 10);
    assert_eq!(outcome.matched_templates, vec!["simple"]);
    assert!(outcome
        .items
        .iter()
        .all(|item| item.has_value("rank") && item.has_value("description")));
    assert_eq!(
        outcome.items.iter().map(|i| i.index).collect::<Vec<_>>(),
        (1..=10).collect::<Vec<_>>()
    );

    // blank even ranks: exactly the five ranked entries survive
    let target = HtmlPage::parse(URL, list_page(&half_ranks(10)));
    let outcome = set.extract(&target);
    assert_eq!(outcome.items.len(), 5);
    assert!(outcome
        .items
        .iter()
        .all(|item| item.has_value("rank") && item.has_value("description")));
}

#[test]
fn test_extracted_fields_are_typed_and_adapted() {
    let set = TemplateSet::new().with_entry(TemplateEntry::new(list_template(), list_descriptors()));
    let target = HtmlPage::parse(URL, list_page(&full_ranks(10)));
    let outcome = set.extract(&target);

    let first = &outcome.items[0];
    assert_eq!(first.item_type.as_deref(), Some("data_item"));
    assert_eq!(first.template, "simple");
    assert_eq!(first.index, 1);
    assert_eq!(
        first.field_names().collect::<Vec<_>>(),
        vec!["title", "url", "rank", "description"]
    );
    assert_eq!(first.texts("title"), vec!["Item 1"]);
    assert_eq!(first.texts("url"), vec!["/item/1"]);
    assert_eq!(first.texts("rank"), vec!["1"]);
    // both description paragraphs feed one value, markup stripped
    assert_eq!(first.texts("description"), vec!["Text 1 Text 1 Text 1 Text 1"]);

    let last = &outcome.items[9];
    assert_eq!(last.texts("title"), vec!["Item 10"]);
    assert_eq!(last.texts("url"), vec!["/item/10"]);
}

#[test]
fn test_extraction_is_idempotent() {
    let set = TemplateSet::new().with_entry(TemplateEntry::new(list_template(), list_descriptors()));
    let target = HtmlPage::parse(URL, list_page(&half_ranks(10)));
    assert_eq!(set.extract(&target), set.extract(&target));
}

#[test]
fn test_repeated_container_with_self_nested_signature() {
    // every outer <li> carries a nested <ul><li> of the same signature;
    // instance boundaries must reach the balanced close, not the inner one
    let body = "<html><body>\
                <ul><li>Outer A<ul><li>Inner A</li></ul></li>\
                <li>Outer B<ul><li>Inner B</li></ul></li></ul>\
                </body></html>";
    let sample = HtmlPage::parse(URL, body);
    let ul = nth_element(&sample, "ul", 0).unwrap();
    let li = nth_element(&sample, "li", 0).unwrap();
    let annotations = vec![
        Annotation::container("list", ul),
        Annotation::container("entry", li).in_container("list").repeated(),
        // the container element itself feeds the field
        Annotation::field("entry", li, "entry").in_container("entry"),
    ];
    let template = Template::compile(
        Some("nested".into()),
        sample,
        annotations,
        ExtractorRegistry::new(),
    )
    .unwrap();

    let target = HtmlPage::parse(URL, body);
    let set = TemplateSet::new().with_entry(TemplateEntry::new(template, DescriptorSet::new()));
    let outcome = set.extract(&target);

    assert_eq!(outcome.items.len(), 2);
    assert_eq!(
        outcome.items[0].texts("entry"),
        vec!["Outer A<ul><li>Inner A</li></ul>"]
    );
    assert_eq!(
        outcome.items[1].texts("entry"),
        vec!["Outer B<ul><li>Inner B</li></ul>"]
    );
    assert_eq!(outcome.items[0].index, 1);
    assert_eq!(outcome.items[1].index, 2);
}

#[test]
fn test_multi_template_aggregation() {
    // first template annotates an article layout the target does not have
    let article_body = "<html><body><section>\
                        <article><h2>T</h2></article>\
                        <article><h2>U</h2></article>\
                        </section></body></html>";
    let article_sample = HtmlPage::parse("http://www.test.com/articles", article_body);
    let section = nth_element(&article_sample, "section", 0).unwrap();
    let article = nth_element(&article_sample, "article", 0).unwrap();
    let h2 = nth_element(&article_sample, "h2", 0).unwrap();
    let first = Template::compile(
        Some("first".into()),
        article_sample,
        vec![
            Annotation::container("feed", section),
            Annotation::container("post", article).in_container("feed").repeated(),
            Annotation::field("headline", h2, "headline").in_container("post"),
        ],
        ExtractorRegistry::new(),
    )
    .unwrap();

    let set = TemplateSet::new()
        .with_entry(TemplateEntry::new(first, DescriptorSet::new()))
        .with_entry(TemplateEntry::new(list_template(), list_descriptors()));
    assert_eq!(set.len(), 2);

    let target = HtmlPage::parse(URL, list_page(&full_ranks(4)));
    let outcome = set.extract(&target);

    assert_eq!(outcome.matched_templates, vec!["simple"]);
    assert_eq!(outcome.items.len(), 4);
    assert!(outcome.items.iter().all(|item| item.template == "simple"));
}

#[test]
fn test_sticky_value_satisfies_child_extra_requires() {
    let body = "<html><body><div id=\"box\"><h2>News</h2>\
                <ul><li><a href='/1'>one</a></li><li><a href='/2'>two</a></li></ul>\
                </div></body></html>";
    let sample = HtmlPage::parse(URL, body);
    let div = nth_element(&sample, "div", 0).unwrap();
    let h2 = nth_element(&sample, "h2", 0).unwrap();
    let li = nth_element(&sample, "li", 0).unwrap();
    let a = nth_element(&sample, "a", 0).unwrap();
    let annotations = vec![
        Annotation::container("box", div),
        Annotation::field("head", h2, "section").sticky().in_container("box"),
        Annotation::container("item", li)
            .in_container("box")
            .repeated()
            .with_extra_requires(["section"]),
        Annotation::field("link", a, "title").in_container("item"),
    ];
    let template = Template::compile(
        Some("sticky".into()),
        sample,
        annotations,
        ExtractorRegistry::new(),
    )
    .unwrap();
    let set = TemplateSet::new().with_entry(TemplateEntry::new(template, DescriptorSet::new()));

    // the sticky section value is inherited by the items: they are accepted
    // without carrying a literal `section` field themselves
    let target = HtmlPage::parse(URL, body);
    let outcome = set.extract(&target);
    let titled: Vec<_> = outcome.items.iter().filter(|i| i.has_value("title")).collect();
    assert_eq!(titled.len(), 2);
    assert!(titled.iter().all(|item| !item.has_value("section")));

    // without the heading there is no sticky value and the requirement
    // rejects every item
    let bare = "<html><body><div id=\"box\">\
                <ul><li><a href='/1'>one</a></li></ul>\
                </div></body></html>";
    let target = HtmlPage::parse(URL, bare);
    assert!(set.extract(&target).items.is_empty());
}

#[test]
fn test_seeded_sticky_context() {
    let body = "<html><body><div id=\"box\">\
                <ul><li><a href='/1'>one</a></li></ul>\
                </div></body></html>";
    let sample = HtmlPage::parse(URL, body);
    let div = nth_element(&sample, "div", 0).unwrap();
    let li = nth_element(&sample, "li", 0).unwrap();
    let a = nth_element(&sample, "a", 0).unwrap();
    let annotations = vec![
        Annotation::container("box", div),
        Annotation::container("item", li)
            .in_container("box")
            .repeated()
            .with_extra_requires(["_sticky1"]),
        Annotation::field("link", a, "title").in_container("item"),
    ];
    let template = Template::compile(
        Some("seeded".into()),
        sample,
        annotations,
        ExtractorRegistry::new(),
    )
    .unwrap();
    let set = TemplateSet::new().with_entry(TemplateEntry::new(template, DescriptorSet::new()));

    let target = HtmlPage::parse(URL, body);
    assert!(set.extract(&target).items.is_empty());

    let seeded = StickyContext::new().with_value("_sticky1", "1");
    let outcome = set.extract_with_context(&target, &seeded);
    assert_eq!(outcome.items.len(), 1);
}

#[test]
fn test_single_attribute_feeds_multiple_fields() {
    let body = "<html><body>\
                <span itemprop=\"name\"><span itemprop=\"givenName\">Joe</span> \
                <span itemprop=\"familyName\">Smith</span></span>\
                <p>123 Main St</p>\
                </body></html>";
    let sample = HtmlPage::parse("http://www.test.com/411", body);
    let name = nth_element(&sample, "span", 0).unwrap();
    let address = nth_element(&sample, "p", 0).unwrap();
    let registry = ExtractorRegistry::new()
        .with_type("text", FieldType::Text)
        .with_regex("first", r"(.*)\s")
        .unwrap()
        .with_regex("last", r"\s(.*)")
        .unwrap();
    let annotations = vec![
        Annotation::field("name", name, "full_name"),
        Annotation::field("name", name, "first_name")
            .with_variant(2)
            .with_extractors(["text", "first"]),
        Annotation::field("name", name, "last_name")
            .with_variant(3)
            .with_extractors(["text", "last"]),
        Annotation::field("addr", address, "address"),
    ];
    let template =
        Template::compile(Some("411".into()), sample, annotations, registry).unwrap();

    let descriptors = DescriptorSet::new().with_schema(
        "#default",
        ItemDescriptor::new("default")
            .with_field("full_name", FieldDescriptor::new(FieldType::Text))
            .with_field("first_name", FieldDescriptor::new(FieldType::Text).renamed("prénom"))
            .with_field("last_name", FieldDescriptor::new(FieldType::Text).renamed("nom"))
            .with_field("address", FieldDescriptor::new(FieldType::Text)),
    );
    let set = TemplateSet::new().with_entry(TemplateEntry::new(template, descriptors));

    let target = HtmlPage::parse("http://www.test.com/411", body);
    let outcome = set.extract(&target);
    assert_eq!(outcome.items.len(), 1);
    let item = &outcome.items[0];
    assert_eq!(item.texts("full_name"), vec!["Joe Smith"]);
    assert_eq!(item.texts("prénom"), vec!["Joe"]);
    assert_eq!(item.texts("nom"), vec!["Smith"]);
    assert_eq!(item.texts("address"), vec!["123 Main St"]);
}

#[test]
fn test_missing_schema_passes_raw_values_through() {
    let body = "<html><body>\
                <span itemprop=\"name\"><span itemprop=\"givenName\">Joe</span> \
                <span itemprop=\"familyName\">Smith</span></span>\
                </body></html>";
    let sample = HtmlPage::parse("http://www.test.com/411", body);
    let name = nth_element(&sample, "span", 0).unwrap();
    let annotations = vec![Annotation::field("name", name, "full_name")];
    let template = Template::compile(
        Some("411".into()),
        sample,
        annotations,
        ExtractorRegistry::new(),
    )
    .unwrap();
    let set = TemplateSet::new().with_entry(TemplateEntry::new(template, DescriptorSet::new()));

    let outcome = set.extract(&HtmlPage::parse("http://www.test.com/411", body));
    assert_eq!(outcome.items.len(), 1);
    let item = &outcome.items[0];
    assert!(item.item_type.is_none());
    // without a schema the raw markup region is preserved untouched
    assert!(item.texts("full_name")[0].contains("itemprop=\"givenName\""));
}

#[test]
fn test_nested_containers_attach_sub_items_under_field() {
    let body = "<html><body><div class=\"event\"><h2>Gig</h2>\
                <ul><li><span>20</span></li><li><span>30</span></li></ul>\
                </div></body></html>";
    let sample = HtmlPage::parse(URL, body);
    let div = nth_element(&sample, "div", 0).unwrap();
    let h2 = nth_element(&sample, "h2", 0).unwrap();
    let li = nth_element(&sample, "li", 0).unwrap();
    let span = nth_element(&sample, "span", 0).unwrap();
    let annotations = vec![
        Annotation::container("event", div),
        Annotation::field("title", h2, "title").in_container("event"),
        Annotation::container("tickets", li)
            .in_container("event")
            .repeated()
            .nested_under_field("tickets"),
        Annotation::field("price", span, "price").in_container("tickets"),
    ];
    let template = Template::compile(
        Some("events".into()),
        sample,
        annotations,
        ExtractorRegistry::new(),
    )
    .unwrap();
    let set = TemplateSet::new().with_entry(TemplateEntry::new(template, DescriptorSet::new()));

    let outcome = set.extract(&HtmlPage::parse(URL, body));
    assert_eq!(outcome.items.len(), 1);
    let event = &outcome.items[0];
    assert_eq!(event.texts("title"), vec!["Gig"]);
    let tickets = event.items("tickets");
    assert_eq!(tickets.len(), 2);
    assert_eq!(tickets[0].texts("price"), vec!["20"]);
    assert_eq!(tickets[1].texts("price"), vec!["30"]);
    assert_eq!(tickets[1].index, 2);
}

#[test]
fn test_template_compiles_from_json_spec() {
    let body = list_page(&full_ranks(2));
    let page = HtmlPage::parse(URL, body.clone());
    let ul = nth_element(&page, "ul", 0).unwrap();
    let li = nth_element(&page, "li", 0).unwrap();
    let a = nth_element(&page, "a", 0).unwrap();
    let json = format!(
        r#"{{
            "id": "from-json",
            "url": "{URL}",
            "body": {body},
            "annotations": [
                {{"id": "parent", "start_index": {}, "end_index": {}, "item_container": true}},
                {{"id": "item", "container_id": "parent", "start_index": {}, "end_index": {},
                  "item_container": true, "repeated": true}},
                {{"id": "link", "container_id": "item", "start_index": {}, "end_index": {},
                  "data": [
                    {{"attribute": "content", "field": "title"}},
                    {{"attribute": "href", "field": "url"}}
                  ]}}
            ]
        }}"#,
        ul.0,
        ul.1,
        li.0,
        li.1,
        a.0,
        a.1,
        body = serde_json::to_string(&body).unwrap(),
    );
    let template = Template::from_json(&json).unwrap();
    assert_eq!(template.id(), "from-json");

    let set = TemplateSet::new().with_entry(TemplateEntry::new(template, DescriptorSet::new()));
    let outcome = set.extract(&page);
    assert_eq!(outcome.items.len(), 2);
    assert_eq!(outcome.items[0].texts("title"), vec!["Item 1"]);
    assert_eq!(outcome.items[0].texts("url"), vec!["/item/1"]);
    assert_eq!(outcome.items[0].template, "from-json");
}

#[test]
fn test_malformed_spec_json_is_a_compile_error() {
    assert!(matches!(
        Template::from_json("{ not json"),
        Err(CompileError::SpecParse(_))
    ));
}

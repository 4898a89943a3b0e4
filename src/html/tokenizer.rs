//! Regex-based HTML tokenization.
//!
//! Produces the flat token stream the matcher operates on. This is a
//! lexer, not a parser: no tree is built and malformed markup degrades to
//! text tokens instead of failing.

use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::HashMap;

use super::{HtmlToken, TokenKind};

/// Elements that never take a closing tag.
const VOID_ELEMENTS: &[&str] = &[
    "area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta", "param", "source",
    "track", "wbr",
];

static TAG_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(concat!(
        r"(?s)<!--.*?-->",
        r"|<!\[CDATA\[.*?\]\]>",
        r"|<![^>]*>",
        r"|<\?.*?\?>",
        r#"|<(/?)([a-zA-Z][a-zA-Z0-9:_-]*)((?:[^>"']|"[^"]*"|'[^']*')*?)(/?)>"#,
    ))
    .expect("tag regex is valid")
});

static ATTR_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"([^=<>\s/]+)(?:\s*=\s*(?:"([^"]*)"|'([^']*)'|([^\s>]+)))?"#)
        .expect("attribute regex is valid")
});

/// Tokenize a page body into document-ordered tokens.
pub(super) fn tokenize(body: &str) -> Vec<HtmlToken> {
    let lower = body.to_ascii_lowercase();
    let mut tokens = Vec::new();
    let mut pos = 0;

    while let Some(caps) = TAG_RE.captures_at(body, pos) {
        let matched = caps.get(0).expect("whole match");
        push_text(&mut tokens, pos, matched.start());
        pos = matched.end();

        let Some(name) = caps.get(2) else {
            if body[matched.range()].starts_with("<!--") {
                tokens.push(HtmlToken {
                    kind: TokenKind::Comment,
                    tag: None,
                    span: matched.range(),
                    attributes: HashMap::new(),
                });
            }
            // doctype declarations, CDATA and processing instructions
            // carry no tag signature and produce no token
            continue;
        };

        let tag = name.as_str().to_ascii_lowercase();
        let closing = caps.get(1).is_some_and(|g| g.as_str() == "/");
        if closing {
            tokens.push(HtmlToken {
                kind: TokenKind::CloseTag,
                tag: Some(tag),
                span: matched.range(),
                attributes: HashMap::new(),
            });
            continue;
        }

        let self_closed = caps.get(4).is_some_and(|g| g.as_str() == "/");
        let kind = if self_closed || VOID_ELEMENTS.contains(&tag.as_str()) {
            TokenKind::UnpairedTag
        } else {
            TokenKind::OpenTag
        };
        let attributes = parse_attributes(caps.get(3).map_or("", |g| g.as_str()));
        let swallow_raw = kind == TokenKind::OpenTag && (tag == "script" || tag == "style");
        tokens.push(HtmlToken {
            kind,
            tag: Some(tag.clone()),
            span: matched.range(),
            attributes,
        });

        // script and style bodies are raw text up to their closing tag;
        // anything tag-shaped inside them must not become a token
        if swallow_raw {
            if let Some(offset) = lower[pos..].find(&format!("</{tag}")) {
                push_text(&mut tokens, pos, pos + offset);
                pos += offset;
            }
        }
    }

    push_text(&mut tokens, pos, body.len());
    tokens
}

fn push_text(tokens: &mut Vec<HtmlToken>, start: usize, end: usize) {
    if start < end {
        tokens.push(HtmlToken {
            kind: TokenKind::Text,
            tag: None,
            span: start..end,
            attributes: HashMap::new(),
        });
    }
}

fn parse_attributes(raw: &str) -> HashMap<String, String> {
    let mut attributes = HashMap::new();
    for caps in ATTR_RE.captures_iter(raw) {
        let name = caps[1].to_ascii_lowercase();
        let value = caps
            .get(2)
            .or_else(|| caps.get(3))
            .or_else(|| caps.get(4))
            .map_or_else(String::new, |m| m.as_str().to_string());
        attributes.entry(name).or_insert(value);
    }
    attributes
}

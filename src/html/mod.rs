//! HTML pages and their token streams.
//!
//! Pattern matching operates on a tokenized view of a page: an ordered,
//! indexed sequence of typed tokens. The annotated sample page and every
//! target page must be tokenized by the same scheme for tag signatures to
//! compare equal, so [`HtmlPage::parse`] is the single entry point.

mod tokenizer;

use once_cell::sync::Lazy;
use regex::Regex;
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::ops::Range;

/// Kind of a lexical unit in a page's token stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TokenKind {
    OpenTag,
    CloseTag,
    /// A tag with no closing counterpart: void elements and self-closed tags.
    UnpairedTag,
    Text,
    Comment,
}

/// One token of a parsed page.
///
/// Tag tokens carry their lowercase tag name; open and unpaired tags also
/// carry their attributes. The span addresses the token's bytes in the
/// page body, so raw content between two tokens can be recovered exactly.
#[derive(Debug, Clone, PartialEq)]
pub struct HtmlToken {
    pub kind: TokenKind,
    pub tag: Option<String>,
    pub span: Range<usize>,
    pub attributes: HashMap<String, String>,
}

impl HtmlToken {
    /// Whether this token starts an element (open or unpaired tag).
    pub fn is_element_start(&self) -> bool {
        matches!(self.kind, TokenKind::OpenTag | TokenKind::UnpairedTag)
    }

    /// Whether this token carries the given tag signature.
    pub fn has_tag(&self, tag: &str) -> bool {
        self.tag.as_deref() == Some(tag)
    }

    /// Attribute value by lowercase name, if present.
    pub fn attribute(&self, name: &str) -> Option<&str> {
        self.attributes.get(name).map(String::as_str)
    }
}

/// A parsed HTML page: raw body plus its token stream.
///
/// Immutable once parsed. The fingerprint is the SHA-256 hash of the body
/// and doubles as a stable page identity when the caller supplies none.
#[derive(Debug, Clone)]
pub struct HtmlPage {
    pub url: String,
    pub body: String,
    pub fingerprint: String,
    tokens: Vec<HtmlToken>,
}

impl HtmlPage {
    /// Parse a page body into its token stream.
    pub fn parse(url: impl Into<String>, body: impl Into<String>) -> Self {
        let body = body.into();
        let tokens = tokenizer::tokenize(&body);
        let fingerprint = Self::hash_body(&body);
        Self {
            url: url.into(),
            body,
            fingerprint,
            tokens,
        }
    }

    /// Calculate the SHA-256 hash of a page body.
    pub fn hash_body(body: &str) -> String {
        let mut hasher = Sha256::new();
        hasher.update(body.as_bytes());
        format!("{:x}", hasher.finalize())
    }

    /// The page's token stream in document order.
    pub fn tokens(&self) -> &[HtmlToken] {
        &self.tokens
    }

    /// Token at a stream position.
    pub fn token(&self, index: usize) -> Option<&HtmlToken> {
        self.tokens.get(index)
    }

    /// Raw body between two tokens: everything after the first token and
    /// before the second. Empty when the tokens do not bound a region.
    pub fn text_between(&self, open: usize, close: usize) -> &str {
        match (self.tokens.get(open), self.tokens.get(close)) {
            (Some(a), Some(b)) if a.span.end <= b.span.start => {
                &self.body[a.span.end..b.span.start]
            }
            _ => "",
        }
    }
}

static MARKUP_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?s)<!--.*?-->|<[^>]*>").expect("markup regex is valid"));

static ENTITY_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"&(#x?[0-9a-fA-F]+|[a-zA-Z][a-zA-Z0-9]*);").expect("entity regex is valid")
});

/// Remove markup from an HTML fragment, decoding character entities.
///
/// Tags are replaced with a space so text separated only by markup does not
/// run together; callers normally follow up with [`normalize_space`].
pub fn strip_tags(fragment: &str) -> String {
    decode_entities(&MARKUP_RE.replace_all(fragment, " "))
}

/// Decode common named and numeric character entities.
pub fn decode_entities(text: &str) -> String {
    ENTITY_RE
        .replace_all(text, |caps: &regex::Captures| {
            let name = &caps[1];
            match name {
                "amp" => "&".to_string(),
                "lt" => "<".to_string(),
                "gt" => ">".to_string(),
                "quot" => "\"".to_string(),
                "apos" => "'".to_string(),
                "nbsp" => " ".to_string(),
                _ if name.starts_with("#x") => u32::from_str_radix(&name[2..], 16)
                    .ok()
                    .and_then(char::from_u32)
                    .map(String::from)
                    .unwrap_or_else(|| caps[0].to_string()),
                _ if name.starts_with('#') => name[1..]
                    .parse::<u32>()
                    .ok()
                    .and_then(char::from_u32)
                    .map(String::from)
                    .unwrap_or_else(|| caps[0].to_string()),
                _ => caps[0].to_string(),
            }
        })
        .into_owned()
}

/// Collapse whitespace runs to single spaces and trim the ends.
pub fn normalize_space(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

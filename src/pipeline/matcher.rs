//! Locating container instances in a target token stream.
//!
//! Containers are matched top-down: roots against the whole stream, each
//! child against the range its parent matched. HTML has no explicit
//! repetition markers, so repeated containers are found by pairing each
//! candidate opening tag with its balanced closing tag: nesting of the same
//! signature is counted so an item containing an element of its own tag does
//! not terminate the match early.

use std::ops::Range;
use tracing::trace;

use crate::html::{HtmlToken, TokenKind};
use crate::template::ElementLocator;
use crate::types::Annotation;

/// One concrete occurrence of a container in a target page: the inclusive
/// token indices of its opening and closing tags.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TokenRange {
    pub start: usize,
    pub end: usize,
}

impl TokenRange {
    /// The token positions strictly inside the instance.
    pub fn interior(&self) -> Range<usize> {
        self.start + 1..self.end
    }
}

/// Scan a range of a token stream for tokens of one kind and tag signature.
///
/// Positions come back in the order encountered; a reversed scan runs from
/// the far boundary inward.
pub fn find_tokens(
    tokens: &[HtmlToken],
    range: Range<usize>,
    kind: TokenKind,
    tag: &str,
    reverse: bool,
) -> Vec<usize> {
    let range = range.start..range.end.min(tokens.len());
    let matches = |i: &usize| tokens[*i].kind == kind && tokens[*i].has_tag(tag);
    if reverse {
        range.rev().filter(matches).collect()
    } else {
        range.filter(matches).collect()
    }
}

/// The closing tag balancing `open`, scanning no further than `limit`.
///
/// Opening tags of the same signature increment a nesting counter and
/// closing tags decrement it; the true closing tag returns it to zero.
/// Unpaired tags never affect the count.
pub fn balanced_close(tokens: &[HtmlToken], open: usize, limit: usize) -> Option<usize> {
    let first = tokens.get(open)?;
    if first.kind != TokenKind::OpenTag {
        return None;
    }
    let tag = first.tag.as_deref()?;
    let limit = limit.min(tokens.len());
    if open + 1 > limit {
        return None;
    }
    let mut depth = 1usize;
    for (offset, token) in tokens[open + 1..limit].iter().enumerate() {
        if !token.has_tag(tag) {
            continue;
        }
        match token.kind {
            TokenKind::OpenTag => depth += 1,
            TokenKind::CloseTag => {
                depth -= 1;
                if depth == 0 {
                    return Some(open + 1 + offset);
                }
            }
            _ => {}
        }
    }
    None
}

/// Disjoint balanced elements of one tag signature inside `range`, in
/// document order. Elements nested inside an already-found element of the
/// same signature are not reported separately.
pub fn find_elements(tokens: &[HtmlToken], range: Range<usize>, tag: &str) -> Vec<TokenRange> {
    let limit = range.end.min(tokens.len());
    let mut elements = Vec::new();
    let mut i = range.start;
    while i < limit {
        if tokens[i].kind == TokenKind::OpenTag && tokens[i].has_tag(tag) {
            if let Some(close) = balanced_close(tokens, i, limit) {
                elements.push(TokenRange { start: i, end: close });
                i = close + 1;
                continue;
            }
        }
        i += 1;
    }
    elements
}

/// Match one container against a search range of the target stream.
///
/// A repeated container yields every disjoint balanced element of its
/// signature; a non-repeated container yields the single region bounded by
/// the first compatible opening tag and the last compatible closing tag.
/// No compatible boundary means zero instances, never an error.
pub fn match_container(
    container: &Annotation,
    locator: &ElementLocator,
    tokens: &[HtmlToken],
    range: Range<usize>,
) -> Vec<TokenRange> {
    let instances = if container.is_repeated() {
        find_elements(tokens, range, &locator.tag)
    } else {
        let starts = find_tokens(tokens, range.clone(), TokenKind::OpenTag, &locator.tag, false);
        let ends = find_tokens(tokens, range, TokenKind::CloseTag, &locator.tag, true);
        match (starts.first(), ends.first()) {
            (Some(&start), Some(&end)) if start < end => vec![TokenRange { start, end }],
            _ => Vec::new(),
        }
    };
    trace!(
        container = %container.id,
        tag = %locator.tag,
        instances = instances.len(),
        "matched container"
    );
    instances
}

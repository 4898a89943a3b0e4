//! Deterministic fixtures for tests and downstream consumers.
//!
//! Annotations reference sample-page elements by token index; these helpers
//! look elements up by tag occurrence so tests can build annotation sets
//! against parsed pages without a selector engine.

use crate::html::HtmlPage;
use crate::pipeline::matcher::balanced_close;

/// Render a sample list page: one `<ul>` of `<li>` entries, each carrying a
/// rank cell, a linked title and a two-paragraph description. A rank of
/// `None` renders an empty cell.
pub fn list_page(ranks: &[Option<u32>]) -> String {
    let items: String = ranks
        .iter()
        .enumerate()
        .map(|(i, rank)| list_item(i + 1, *rank))
        .collect();
    format!("<html><body>\n    <ul>{items}</ul>\n</body></html>")
}

/// One entry of the sample list page.
pub fn list_item(idx: usize, rank: Option<u32>) -> String {
    let rank = rank.map_or_else(String::new, |r| r.to_string());
    format!(
        "\n    <li>\n        <div><span>{rank}</span><h3><a href='/item/{idx}'>Item {idx}</a></h3></div>\n        <div><p>Text {idx} Text {idx}</p><p>Text {idx} Text {idx}</p></div>\n    </li>\n"
    )
}

/// Token indices of the `n`-th (0-based, document order) element with `tag`,
/// paired with its balanced closing tag. Unpaired elements close on
/// themselves.
pub fn nth_element(page: &HtmlPage, tag: &str, n: usize) -> Option<(usize, usize)> {
    let tokens = page.tokens();
    let open = tokens
        .iter()
        .enumerate()
        .filter(|(_, token)| token.is_element_start() && token.has_tag(tag))
        .map(|(i, _)| i)
        .nth(n)?;
    let close = balanced_close(tokens, open, tokens.len()).unwrap_or(open);
    Some((open, close))
}

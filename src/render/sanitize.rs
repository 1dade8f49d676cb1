//! HTML repair.
//!
//! Input goes through ammonia's html5ever tree builder, which balances tags
//! and fills in implicit structure. Elements outside the allowlist are
//! unwrapped (their text survives), `script` and `style` are dropped with
//! their content.
//!
//! Tree building costs grow with nesting depth, so `nesting_depth` gives a
//! cheap estimate that runs before the parser ever sees the input.

use ammonia::Builder as AmmoniaBuilder;
use std::collections::HashSet;

/// Elements the layout pass knows how to place.
const LAYOUT_TAGS: [&str; 43] = [
    "a",
    "abbr",
    "b",
    "blockquote",
    "br",
    "code",
    "dd",
    "del",
    "div",
    "dl",
    "dt",
    "em",
    "figcaption",
    "figure",
    "h1",
    "h2",
    "h3",
    "h4",
    "h5",
    "h6",
    "hr",
    "i",
    "img",
    "ins",
    "kbd",
    "li",
    "ol",
    "p",
    "pre",
    "s",
    "section",
    "span",
    "strong",
    "sub",
    "sup",
    "table",
    "tbody",
    "td",
    "th",
    "thead",
    "tr",
    "u",
    "ul",
];

pub(crate) fn build_sanitizer() -> AmmoniaBuilder<'static> {
    let mut builder = AmmoniaBuilder::default();

    builder.tags(HashSet::from(LAYOUT_TAGS));
    builder.generic_attributes(HashSet::new());
    builder.tag_attributes(Default::default());
    builder.add_tag_attributes("img", &["alt"]);
    builder.add_tag_attributes("ol", &["start"]);
    builder.link_rel(None);
    builder.url_schemes(HashSet::new());

    builder
}

/// Repair `html` into balanced markup restricted to the layout allowlist.
pub(crate) fn repair(sanitizer: &AmmoniaBuilder<'static>, html: &str) -> String {
    sanitizer.clean(html).to_string()
}

/// Elements that never take children.
const VOID_TAGS: [&str; 14] = [
    "area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta", "param",
    "source", "track", "wbr",
];

/// Elements a parser closes implicitly when a sibling of the same name opens.
const SELF_SIBLING_TAGS: [&str; 9] = ["p", "li", "dt", "dd", "tr", "td", "th", "option", "a"];

/// Estimate the deepest element nesting in `html` with a single tag scan.
///
/// Scanning stops as soon as the depth passes `limit`, so the open-element
/// stack never grows beyond `limit + 1` entries. End tags with no matching
/// open element are ignored, like a parser would.
pub(crate) fn nesting_depth(html: &str, limit: usize) -> usize {
    let bytes = html.as_bytes();
    let mut open: Vec<String> = Vec::new();
    let mut deepest = 0usize;
    let mut pos = 0usize;

    while let Some(offset) = bytes[pos..].iter().position(|&b| b == b'<') {
        let start = pos + offset + 1;
        if bytes[start..].starts_with(b"!--") {
            pos = find(bytes, start + 3, b"-->").map_or(bytes.len(), |i| i + 3);
            continue;
        }
        let closing = bytes.get(start) == Some(&b'/');
        let name_start = if closing { start + 1 } else { start };

        let name_len = bytes[name_start..]
            .iter()
            .take_while(|b| b.is_ascii_alphanumeric())
            .count();
        if name_len == 0 || !bytes[name_start].is_ascii_alphabetic() {
            // Comment, doctype, processing instruction or a bare `<` in text.
            pos = start;
            continue;
        }
        let name = html[name_start..name_start + name_len].to_ascii_lowercase();
        let (end, self_closed) = tag_end(bytes, name_start + name_len);
        pos = end;

        if closing {
            if let Some(at) = open.iter().rposition(|n| *n == name) {
                open.truncate(at);
            }
            continue;
        }
        if self_closed || VOID_TAGS.contains(&name.as_str()) {
            continue;
        }
        if SELF_SIBLING_TAGS.contains(&name.as_str()) && open.last() == Some(&name) {
            open.pop();
        }

        open.push(name);
        deepest = deepest.max(open.len());
        if deepest > limit {
            break;
        }
    }

    deepest
}

fn find(bytes: &[u8], from: usize, needle: &[u8]) -> Option<usize> {
    bytes[from.min(bytes.len())..]
        .windows(needle.len())
        .position(|w| w == needle)
        .map(|i| from + i)
}

/// Position just past the `>` ending a tag whose name ends at `from`, and
/// whether the tag closed itself with `/>`. Quoted attribute values may
/// contain `>`.
fn tag_end(bytes: &[u8], from: usize) -> (usize, bool) {
    let mut quote = None;
    let mut prev = 0u8;
    for (i, &b) in bytes.iter().enumerate().skip(from) {
        match quote {
            Some(q) if b == q => quote = None,
            Some(_) => {}
            None if b == b'"' || b == b'\'' => quote = Some(b),
            None if b == b'>' => return (i + 1, prev == b'/'),
            None => {}
        }
        prev = b;
    }
    (bytes.len(), false)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn clean(html: &str) -> String {
        repair(&build_sanitizer(), html)
    }

    #[test]
    fn balances_unclosed_tags() {
        assert_eq!(clean("<p>one<p>two"), "<p>one</p><p>two</p>");
        assert_eq!(clean("<b>bold <i>both</b> tail"), "<b>bold <i>both</i></b><i> tail</i>");
    }

    #[test]
    fn drops_scripts_and_unwraps_unknown_tags() {
        assert_eq!(
            clean("<p>a<script>alert(1)</script><blink>b</blink></p>"),
            "<p>ab</p>"
        );
        assert_eq!(clean("<style>p{}</style><p>x</p>"), "<p>x</p>");
    }

    #[test]
    fn keeps_only_layout_attributes() {
        assert_eq!(
            clean(r#"<p class="x" style="color:red">t</p><img src="a.png" alt="chart">"#),
            r#"<p>t</p><img alt="chart">"#
        );
    }

    #[test]
    fn nesting_depth_follows_open_elements() {
        assert_eq!(nesting_depth("", 64), 0);
        assert_eq!(nesting_depth("<p>a</p><p>b</p>", 64), 1);
        assert_eq!(nesting_depth("<div><ul><li><b>x</b></li></ul></div>", 64), 4);
        assert_eq!(nesting_depth("a < b <!-- <div> --> <br><img/><hr />", 64), 0);
        assert_eq!(nesting_depth(r#"<p title="a>b"><span>x</span></p>"#, 64), 2);
    }

    #[test]
    fn implicitly_closed_siblings_do_not_nest() {
        assert_eq!(nesting_depth(&"<p>para".repeat(1_000), 64), 1);
        assert_eq!(nesting_depth(&format!("<ul>{}</ul>", "<li>x".repeat(1_000)), 64), 2);
        assert_eq!(nesting_depth(&"</div>".repeat(10), 64), 0);
    }

    #[test]
    fn deep_nesting_stops_past_the_limit() {
        let html = "<div>".repeat(400_000);
        assert_eq!(nesting_depth(&html, 512), 513);
    }
}

//! Markup stripping for ad message text.
//!
//! Pure functions over `&str`. Tags are removed with a tolerant regex rather
//! than a parser, so unbalanced or truncated markup never fails a row.

use std::sync::OnceLock;

use regex::{Captures, Regex};

/// Tags whose boundaries separate words, so they become a space.
const BLOCK_TAGS: &[&str] = &[
    "p", "br", "div", "li", "ul", "ol", "h1", "h2", "h3", "h4", "h5", "h6", "tr", "td",
    "blockquote",
];

fn comment_re() -> &'static Regex {
    static COMMENT_RE: OnceLock<Regex> = OnceLock::new();
    COMMENT_RE.get_or_init(|| Regex::new(r"(?s)<!--.*?(?:-->|$)").expect("valid comment regex"))
}

fn tag_re() -> &'static Regex {
    static TAG_RE: OnceLock<Regex> = OnceLock::new();
    // The second alternative catches a tag cut off at the end of the text.
    TAG_RE.get_or_init(|| {
        Regex::new(r"</?([A-Za-z][A-Za-z0-9]*)[^<>]*(?:>|$)").expect("valid tag regex")
    })
}

fn entity_re() -> &'static Regex {
    static ENTITY_RE: OnceLock<Regex> = OnceLock::new();
    ENTITY_RE.get_or_init(|| {
        Regex::new(r"&(?:#([0-9]{1,7})|#[xX]([0-9A-Fa-f]{1,6})|([A-Za-z][A-Za-z0-9]{1,15}));")
            .expect("valid entity regex")
    })
}

/// Produce plain, single-line text from a markup-bearing message.
///
/// Repeats the strip/decode/normalize pass until the text stops changing:
/// decoding can expose new markup (`&lt;b&gt;`), and the fixed point is what
/// makes cleaning already-clean text a no-op. Every pass after the first
/// either leaves the text alone or shortens it, so the loop terminates.
pub fn clean_message(raw: &str) -> String {
    let mut current = clean_once(raw);
    loop {
        let next = clean_once(&current);
        if next == current {
            return current;
        }
        current = next;
    }
}

fn clean_once(text: &str) -> String {
    let without_comments = comment_re().replace_all(text, " ");
    let without_tags = strip_tags(&without_comments);
    let decoded = decode_entities(&without_tags);
    normalize_whitespace(&unescape_quotes(&decoded))
}

/// Remove tags, keeping their text content.
pub fn strip_tags(text: &str) -> String {
    tag_re()
        .replace_all(text, |caps: &Captures| {
            let name = caps
                .get(1)
                .map(|m| m.as_str().to_ascii_lowercase())
                .unwrap_or_default();
            if BLOCK_TAGS.contains(&name.as_str()) {
                " "
            } else {
                ""
            }
        })
        .into_owned()
}

/// Decode named and numeric character references.
///
/// Unknown names and invalid code points are left as written.
pub fn decode_entities(text: &str) -> String {
    entity_re()
        .replace_all(text, |caps: &Captures| {
            let whole = caps.get(0).map(|m| m.as_str()).unwrap_or_default();
            let decoded = if let Some(dec) = caps.get(1) {
                dec.as_str().parse::<u32>().ok().and_then(char::from_u32)
            } else if let Some(hex) = caps.get(2) {
                u32::from_str_radix(hex.as_str(), 16)
                    .ok()
                    .and_then(char::from_u32)
            } else {
                caps.get(3).and_then(|name| named_entity(name.as_str()))
            };
            match decoded {
                Some(c) => c.to_string(),
                None => whole.to_string(),
            }
        })
        .into_owned()
}

fn named_entity(name: &str) -> Option<char> {
    let c = match name {
        "amp" => '&',
        "lt" => '<',
        "gt" => '>',
        "quot" => '"',
        "apos" => '\'',
        "nbsp" => '\u{a0}',
        "lsquo" => '\u{2018}',
        "rsquo" => '\u{2019}',
        "ldquo" => '\u{201c}',
        "rdquo" => '\u{201d}',
        "ndash" => '\u{2013}',
        "mdash" => '\u{2014}',
        "hellip" => '\u{2026}',
        "bull" => '\u{2022}',
        "middot" => '\u{b7}',
        "copy" => '\u{a9}',
        "reg" => '\u{ae}',
        "trade" => '\u{2122}',
        "euro" => '\u{20ac}',
        "pound" => '\u{a3}',
        "cent" => '\u{a2}',
        "deg" => '\u{b0}',
        "laquo" => '\u{ab}',
        "raquo" => '\u{bb}',
        "eacute" => '\u{e9}',
        "aacute" => '\u{e1}',
        "iacute" => '\u{ed}',
        "oacute" => '\u{f3}',
        "uacute" => '\u{fa}',
        "ntilde" => '\u{f1}',
        _ => return None,
    };
    Some(c)
}

fn unescape_quotes(text: &str) -> String {
    text.replace("\\\"", "\"").replace("\\'", "'")
}

/// Collapse every whitespace run (newlines included) to one space, drop
/// control characters, and trim.
fn normalize_whitespace(text: &str) -> String {
    let spaced: String = text
        .chars()
        .filter_map(|c| {
            if c.is_whitespace() {
                Some(' ')
            } else if c.is_control() {
                None
            } else {
                Some(c)
            }
        })
        .collect();
    spaced.split_whitespace().collect::<Vec<_>>().join(" ")
}

//! Parser for exported browser bookmark files (the `NETSCAPE-Bookmark-file-1`
//! format written by every major browser).
//!
//! The document is a nested definition list: each `<DT>` holds either an
//! `<A HREF ...>` link or a folder heading followed by its own `<DL>`.
//! Parsing is best-effort: entries that do not fit the shape are skipped and
//! never fail the whole document. The result is a plain forest with no side
//! effects, so the import pass can be tested separately from the parser.

use std::iter::Peekable;
use std::path::Path;

use crate::types::errors::BookmarkError;

/// One entry of a parsed bookmark document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParsedNode {
    Folder {
        name: String,
        /// `ADD_DATE` in milliseconds, when present and valid.
        created_at: Option<i64>,
        children: Vec<ParsedNode>,
    },
    Link {
        name: String,
        url: String,
        icon: String,
        created_at: Option<i64>,
    },
}

impl ParsedNode {
    pub fn name(&self) -> &str {
        match self {
            ParsedNode::Folder { name, .. } | ParsedNode::Link { name, .. } => name,
        }
    }

    pub fn is_folder(&self) -> bool {
        matches!(self, ParsedNode::Folder { .. })
    }
}

/// Depth-first, pre-order walk over a parsed forest.
pub struct DepthFirst<'a> {
    stack: Vec<std::slice::Iter<'a, ParsedNode>>,
}

impl<'a> Iterator for DepthFirst<'a> {
    type Item = &'a ParsedNode;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let level = self.stack.last_mut()?;
            match level.next() {
                Some(node) => {
                    if let ParsedNode::Folder { children, .. } = node {
                        self.stack.push(children.iter());
                    }
                    return Some(node);
                }
                None => {
                    self.stack.pop();
                }
            }
        }
    }
}

/// Walks every node of the forest, parents before their children.
pub fn walk(forest: &[ParsedNode]) -> DepthFirst<'_> {
    DepthFirst {
        stack: vec![forest.iter()],
    }
}

/// Reads and parses a bookmark file from disk.
///
/// # Errors
/// Returns `BookmarkError::ParseError` if the file cannot be read as UTF-8.
pub fn parse_file<P: AsRef<Path>>(path: P) -> Result<Vec<ParsedNode>, BookmarkError> {
    let content = std::fs::read_to_string(path.as_ref()).map_err(|e| {
        BookmarkError::ParseError(format!(
            "Failed to read {}: {}",
            path.as_ref().display(),
            e
        ))
    })?;
    Ok(parse_document(&content))
}

/// Parses an exported bookmark document into a forest.
///
/// Exports wrap everything in one top-level container (the browser's
/// "Bookmarks bar"). When the first top-level entry is a folder, its
/// children are lifted to the top level in its place.
pub fn parse_document(html: &str) -> Vec<ParsedNode> {
    let mut tokens = tokenize(html).into_iter().peekable();
    while let Some(token) = tokens.next() {
        if matches!(&token, Token::Open { name, .. } if name == "dl") {
            let entries = parse_list(&mut tokens);
            tracing::debug!(top_level = entries.len(), "parsed bookmark document");
            return flatten_first(entries);
        }
    }
    Vec::new()
}

fn flatten_first(entries: Vec<ParsedNode>) -> Vec<ParsedNode> {
    let mut entries = entries.into_iter();
    match entries.next() {
        Some(ParsedNode::Folder { children, .. }) => children.into_iter().chain(entries).collect(),
        Some(first) => std::iter::once(first).chain(entries).collect(),
        None => Vec::new(),
    }
}

// ─── Tree building ───

type Tokens = Peekable<std::vec::IntoIter<Token>>;

/// Parses the entries of a `<DL>` whose opening tag was already consumed,
/// up to and including the matching `</DL>`.
fn parse_list(tokens: &mut Tokens) -> Vec<ParsedNode> {
    let mut entries = Vec::new();
    while let Some(token) = tokens.next() {
        match token {
            Token::Close(name) if name == "dl" => break,
            Token::Open { name, .. } if name == "dt" => {
                if let Some(entry) = parse_entry(tokens) {
                    entries.push(entry);
                }
            }
            // a list that no folder heading owns: skip its whole subtree
            Token::Open { name, .. } if name == "dl" => {
                parse_list(tokens);
            }
            _ => {}
        }
    }
    entries
}

/// Parses the content of one `<DT>`. Returns `None` for entries that carry
/// no element or a link without a target.
fn parse_entry(tokens: &mut Tokens) -> Option<ParsedNode> {
    loop {
        if tokens.peek().is_none() || peek_open(tokens, &["dt", "dl"]) || peek_close(tokens, "dl") {
            return None;
        }
        if matches!(tokens.peek(), Some(Token::Open { .. })) {
            break;
        }
        tokens.next();
    }
    let Some(Token::Open { name: tag, attrs }) = tokens.next() else {
        return None;
    };

    let name = read_text(tokens, &tag);
    let created_at = attribute(&attrs, "add_date").and_then(|v| parse_add_date(&v));

    if tag == "a" {
        let url = attribute(&attrs, "href")?;
        return Some(ParsedNode::Link {
            name,
            url,
            icon: attribute(&attrs, "icon").unwrap_or_default(),
            created_at,
        });
    }

    let children = if enter_child_list(tokens) {
        parse_list(tokens)
    } else {
        Vec::new()
    };
    Some(ParsedNode::Folder {
        name,
        created_at,
        children,
    })
}

/// Collects the text of an element up to its closing tag, with whitespace
/// runs collapsed. Stops early at list structure when the tag is unclosed.
fn read_text(tokens: &mut Tokens, tag: &str) -> String {
    let mut text = String::new();
    loop {
        if peek_close(tokens, tag) {
            tokens.next();
            break;
        }
        if tokens.peek().is_none() || peek_open(tokens, &["dt", "dl"]) || peek_close(tokens, "dl") {
            break;
        }
        if let Some(Token::Text(chunk)) = tokens.next() {
            text.push_str(&chunk);
        }
    }
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Advances to the `<DL>` that follows a folder heading and consumes it.
/// Returns false, consuming nothing structural, when the next entry or the
/// end of the enclosing list comes first.
fn enter_child_list(tokens: &mut Tokens) -> bool {
    loop {
        if peek_open(tokens, &["dl"]) {
            tokens.next();
            return true;
        }
        if tokens.peek().is_none() || peek_open(tokens, &["dt"]) || peek_close(tokens, "dl") {
            return false;
        }
        tokens.next();
    }
}

fn peek_open(tokens: &mut Tokens, names: &[&str]) -> bool {
    matches!(tokens.peek(), Some(Token::Open { name, .. }) if names.contains(&name.as_str()))
}

fn peek_close(tokens: &mut Tokens, tag: &str) -> bool {
    matches!(tokens.peek(), Some(Token::Close(name)) if name == tag)
}

fn attribute(attrs: &[(String, String)], key: &str) -> Option<String> {
    attrs
        .iter()
        .find(|(name, _)| name == key)
        .map(|(_, value)| value.clone())
}

/// `ADD_DATE` is in seconds since the epoch.
fn parse_add_date(value: &str) -> Option<i64> {
    value.trim().parse::<i64>().ok()?.checked_mul(1000)
}

// ─── Tokenizer ───

#[derive(Debug, Clone, PartialEq, Eq)]
enum Token {
    /// Opening tag with lowercased name and attribute keys.
    Open {
        name: String,
        attrs: Vec<(String, String)>,
    },
    Close(String),
    Text(String),
}

fn tokenize(input: &str) -> Vec<Token> {
    let mut tokens = Vec::new();
    let mut rest = input;
    while !rest.is_empty() {
        if let Some(after) = rest.strip_prefix("<!--") {
            rest = match after.find("-->") {
                Some(end) => &after[end + 3..],
                None => "",
            };
            continue;
        }
        if rest.starts_with('<') && starts_tag(rest) {
            match find_tag_end(rest) {
                Some(end) => {
                    if let Some(token) = parse_tag(&rest[1..end]) {
                        tokens.push(token);
                    }
                    rest = &rest[end + 1..];
                }
                None => break,
            }
            continue;
        }
        // text runs up to the next '<' that opens a tag
        let mut end = rest.len();
        for (idx, _) in rest.match_indices('<').filter(|(idx, _)| *idx > 0) {
            if starts_tag(&rest[idx..]) {
                end = idx;
                break;
            }
        }
        tokens.push(Token::Text(decode_entities(&rest[..end])));
        rest = &rest[end..];
    }
    tokens
}

fn starts_tag(s: &str) -> bool {
    matches!(
        s[1..].chars().next(),
        Some(c) if c.is_ascii_alphabetic() || c == '/' || c == '!' || c == '?'
    )
}

/// Byte index of the `>` closing the tag at the start of `s`, skipping
/// quoted attribute values. A quote only opens a value right after `=`;
/// elsewhere it is an ordinary character of an unquoted value.
fn find_tag_end(s: &str) -> Option<usize> {
    let mut quote: Option<char> = None;
    let mut after_eq = false;
    for (idx, ch) in s.char_indices().skip(1) {
        match quote {
            Some(q) if ch == q => quote = None,
            Some(_) => {}
            None if after_eq && (ch == '"' || ch == '\'') => quote = Some(ch),
            None if ch == '>' => return Some(idx),
            None => {}
        }
        if quote.is_none() && !ch.is_whitespace() {
            after_eq = ch == '=';
        }
    }
    None
}

fn parse_tag(inner: &str) -> Option<Token> {
    if inner.starts_with('!') || inner.starts_with('?') {
        return None;
    }
    if let Some(name) = inner.strip_prefix('/') {
        return Some(Token::Close(name.trim().to_ascii_lowercase()));
    }
    let split = inner
        .find(|c: char| c.is_whitespace() || c == '/')
        .unwrap_or(inner.len());
    let name = inner[..split].to_ascii_lowercase();
    if name.is_empty() {
        return None;
    }
    Some(Token::Open {
        name,
        attrs: parse_attributes(&inner[split..]),
    })
}

fn parse_attributes(source: &str) -> Vec<(String, String)> {
    let mut attrs = Vec::new();
    let mut chars = source.chars().peekable();
    loop {
        while chars.peek().is_some_and(|c| c.is_whitespace() || *c == '/') {
            chars.next();
        }
        let mut key = String::new();
        while let Some(&c) = chars.peek() {
            if c.is_whitespace() || c == '=' || c == '/' {
                break;
            }
            key.push(c);
            chars.next();
        }
        if key.is_empty() {
            // stray '=' or end of input
            if chars.next().is_none() {
                break;
            }
            continue;
        }
        while chars.peek().is_some_and(|c| c.is_whitespace()) {
            chars.next();
        }
        let mut value = String::new();
        if chars.peek() == Some(&'=') {
            chars.next();
            while chars.peek().is_some_and(|c| c.is_whitespace()) {
                chars.next();
            }
            match chars.peek().copied() {
                Some(q) if q == '"' || q == '\'' => {
                    chars.next();
                    for c in chars.by_ref() {
                        if c == q {
                            break;
                        }
                        value.push(c);
                    }
                }
                _ => {
                    while let Some(&c) = chars.peek() {
                        if c.is_whitespace() {
                            break;
                        }
                        value.push(c);
                        chars.next();
                    }
                }
            }
        }
        attrs.push((key.to_ascii_lowercase(), decode_entities(&value)));
    }
    attrs
}

/// Decodes the named entities browsers emit plus numeric references.
/// Unknown entities are left as written.
fn decode_entities(text: &str) -> String {
    if !text.contains('&') {
        return text.to_string();
    }
    let mut out = String::with_capacity(text.len());
    let mut rest = text;
    while let Some(start) = rest.find('&') {
        out.push_str(&rest[..start]);
        let candidate = &rest[start..];
        let decoded = candidate
            .find(';')
            .filter(|&end| end <= 10)
            .and_then(|end| decode_entity(&candidate[1..end]).map(|ch| (ch, end)));
        match decoded {
            Some((ch, end)) => {
                out.push(ch);
                rest = &candidate[end + 1..];
            }
            None => {
                out.push('&');
                rest = &candidate[1..];
            }
        }
    }
    out.push_str(rest);
    out
}

fn decode_entity(entity: &str) -> Option<char> {
    match entity {
        "amp" => Some('&'),
        "lt" => Some('<'),
        "gt" => Some('>'),
        "quot" => Some('"'),
        "apos" => Some('\''),
        "nbsp" => Some('\u{a0}'),
        _ => {
            let number = entity.strip_prefix('#')?;
            let code = match number.strip_prefix('x').or_else(|| number.strip_prefix('X')) {
                Some(hex) => u32::from_str_radix(hex, 16).ok()?,
                None => number.parse().ok()?,
            };
            char::from_u32(code)
        }
    }
}

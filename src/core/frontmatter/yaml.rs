//! Minimal YAML concrete syntax tree for front-matter blocks.
//!
//! Only what tag and alias fields need is modelled: a top-level block
//! mapping whose values are scalars (plain, quoted, literal, folded), block
//! or flow sequences of scalars, and alias references. Anything else becomes
//! `Node::Opaque` and is never edited. Every scalar keeps the byte span of its
//! source text, so rendering copies untouched regions verbatim and only
//! splices the scalars that were explicitly set.

use regex::Regex;
use std::collections::BTreeMap;
use std::iter::Peekable;
use std::ops::Range;
use std::str::Chars;
use std::sync::LazyLock;

/// Plain scalars that YAML would resolve to something other than a string.
static NON_STRING_PLAIN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"^(?:~|null|Null|NULL|true|True|TRUE|false|False|FALSE|yes|Yes|YES|no|No|NO|on|On|ON|off|Off|OFF|y|Y|n|N|[-+]?\.(?:inf|Inf|INF)|\.(?:nan|NaN|NAN)|[-+]?[0-9][0-9_]*(?:\.[0-9_]*)?(?:[eE][-+]?[0-9]+)?|[-+]?\.[0-9]+(?:[eE][-+]?[0-9]+)?|0x[0-9a-fA-F_]+|0o[0-7_]+|0b[01_]+|[0-9]{4}-[0-9]{1,2}-[0-9]{1,2}.*)$",
    )
    .expect("non-string plain pattern is valid")
});

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScalarStyle {
    Plain,
    SingleQuoted,
    DoubleQuoted,
    Literal,
    Folded,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Chomping {
    Clip,
    Strip,
    Keep,
}

/// Header of a `|` or `>` block scalar.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlockHeader {
    /// The indicator characters, e.g. `|-`.
    pub span: Range<usize>,
    pub chomping: Chomping,
    /// Column the content lines are indented to.
    pub indent: usize,
    /// Blank lines after the content kept by `+` chomping.
    pub trailing_blank_lines: usize,
    /// `"\n"` or `"\r\n"`, as used after the header line.
    pub line_break: &'static str,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Scalar {
    pub style: ScalarStyle,
    /// Source text of the value. Quotes are included; for block scalars this
    /// covers the content lines only.
    pub span: Range<usize>,
    /// Decoded value.
    pub value: String,
    pub anchor: Option<String>,
    pub in_flow: bool,
    pub block: Option<BlockHeader>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Sequence {
    pub flow: bool,
    pub anchor: Option<String>,
    pub items: Vec<Node>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Node {
    Empty,
    Scalar(Scalar),
    Sequence(Sequence),
    /// `*name` reference to an anchored node.
    Alias(String),
    /// Structure this tree does not model; left exactly as written.
    Opaque,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Entry {
    pub key: String,
    pub key_span: Range<usize>,
    pub value: Node,
}

#[derive(Debug, Clone)]
pub struct Document<'a> {
    source: &'a str,
    entries: Vec<Entry>,
}

impl<'a> Document<'a> {
    pub fn parse(source: &'a str) -> Self {
        let entries = Parser::new(source).parse_entries();
        Document { source, entries }
    }

    pub fn entries(&self) -> &[Entry] {
        &self.entries
    }

    /// Value node of the first top-level entry named `key`.
    pub fn get(&self, key: &str) -> Option<&Node> {
        self.entries
            .iter()
            .find(|entry| entry.key == key)
            .map(|entry| &entry.value)
    }

    /// Source text with every edit spliced in.
    pub fn render(&self, edits: &Edits) -> String {
        let mut out = String::with_capacity(self.source.len());
        let mut pos = 0;
        for (&start, splice) in &edits.splices {
            if start < pos {
                continue;
            }
            out.push_str(&self.source[pos..start]);
            out.push_str(&splice.text);
            pos = splice.end;
        }
        out.push_str(&self.source[pos..]);
        out
    }
}

#[derive(Debug, Clone)]
struct Splice {
    end: usize,
    text: String,
}

/// Pending scalar rewrites for one document, keyed by source position.
#[derive(Debug, Clone, Default)]
pub struct Edits {
    splices: BTreeMap<usize, Splice>,
}

impl Edits {
    /// Replace `scalar`'s value, keeping its quoting or block style when the
    /// new value can be expressed in it.
    pub fn set_scalar(&mut self, scalar: &Scalar, value: &str) {
        let (range, text) = scalar.render(value);
        self.splices.insert(
            range.start,
            Splice {
                end: range.end,
                text,
            },
        );
    }

    pub fn is_empty(&self) -> bool {
        self.splices.is_empty()
    }

    pub fn len(&self) -> usize {
        self.splices.len()
    }
}

impl Scalar {
    fn render(&self, value: &str) -> (Range<usize>, String) {
        match self.style {
            ScalarStyle::Plain => {
                if is_safe_plain(value, self.in_flow) {
                    (self.span.clone(), value.to_string())
                } else {
                    (self.span.clone(), double_quoted(value))
                }
            }
            ScalarStyle::SingleQuoted => (
                self.span.clone(),
                single_quoted(value).unwrap_or_else(|| double_quoted(value)),
            ),
            ScalarStyle::DoubleQuoted => (self.span.clone(), double_quoted(value)),
            ScalarStyle::Literal | ScalarStyle::Folded => self.render_block(value),
        }
    }

    fn render_block(&self, value: &str) -> (Range<usize>, String) {
        let Some(header) = &self.block else {
            return (self.span.clone(), double_quoted(value));
        };

        let body = match header.chomping {
            Chomping::Strip => Some(value),
            Chomping::Clip => value.strip_suffix('\n'),
            Chomping::Keep => value
                .strip_suffix(&"\n".repeat(header.trailing_blank_lines + 1))
                .filter(|_| !self.span.is_empty()),
        };

        let expressible = body.filter(|body| {
            !body.is_empty()
                && !body.ends_with('\n')
                && !body.starts_with([' ', '\t'])
                && !body.chars().any(|c| c.is_control() && c != '\n' && c != '\t')
                && (self.style == ScalarStyle::Literal || !body.contains('\n'))
        });

        match expressible {
            Some(body) if !self.span.is_empty() => {
                let indent = " ".repeat(header.indent);
                let text = body
                    .split('\n')
                    .map(|line| {
                        if line.is_empty() {
                            String::new()
                        } else {
                            format!("{}{}", indent, line)
                        }
                    })
                    .collect::<Vec<_>>()
                    .join(header.line_break);
                (self.span.clone(), text)
            }
            _ => {
                let end = if self.span.is_empty() {
                    header.span.end
                } else {
                    self.span.end
                };
                (header.span.start..end, double_quoted(value))
            }
        }
    }
}

fn is_safe_plain(value: &str, in_flow: bool) -> bool {
    let Some(first) = value.chars().next() else {
        return false;
    };
    if value.trim() != value || NON_STRING_PLAIN.is_match(value) {
        return false;
    }
    if matches!(
        first,
        '#' | ',' | '[' | ']' | '{' | '}' | '&' | '*' | '!' | '|' | '>' | '\'' | '"' | '%' | '@' | '`'
    ) {
        return false;
    }
    if matches!(first, '-' | '?' | ':') {
        let second = value[first.len_utf8()..].chars().next();
        if second.is_none_or(char::is_whitespace) {
            return false;
        }
    }
    if value.contains(": ") || value.contains(" #") || value.ends_with(':') {
        return false;
    }
    if value.chars().any(char::is_control) {
        return false;
    }
    !(in_flow && value.contains([',', '[', ']', '{', '}']))
}

fn single_quoted(value: &str) -> Option<String> {
    if value.chars().any(char::is_control) {
        return None;
    }
    Some(format!("'{}'", value.replace('\'', "''")))
}

fn double_quoted(value: &str) -> String {
    let mut out = String::with_capacity(value.len() + 2);
    out.push('"');
    for c in value.chars() {
        match c {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\t' => out.push_str("\\t"),
            '\r' => out.push_str("\\r"),
            '\0' => out.push_str("\\0"),
            c if c.is_control() => {
                let code = c as u32;
                if code <= 0xFF {
                    out.push_str(&format!("\\x{:02X}", code));
                } else {
                    out.push_str(&format!("\\u{:04X}", code));
                }
            }
            c => out.push(c),
        }
    }
    out.push('"');
    out
}

// ============================================================================
// Parser
// ============================================================================

#[derive(Debug, Clone, Copy)]
struct Line {
    start: usize,
    /// End of content, excluding `\n` and a trailing `\r`.
    end: usize,
}

struct KeyInfo {
    name: String,
    span: Range<usize>,
    value_start: usize,
}

struct Parser<'a> {
    src: &'a str,
    bytes: &'a [u8],
    lines: Vec<Line>,
}

impl<'a> Parser<'a> {
    fn new(src: &'a str) -> Self {
        let mut lines = Vec::new();
        let mut start = 0;
        while start < src.len() {
            let newline = src[start..].find('\n').map(|i| start + i);
            let stop = newline.unwrap_or(src.len());
            let end = if stop > start && src.as_bytes()[stop - 1] == b'\r' {
                stop - 1
            } else {
                stop
            };
            lines.push(Line { start, end });
            start = match newline {
                Some(nl) => nl + 1,
                None => src.len(),
            };
        }

        Parser {
            src,
            bytes: src.as_bytes(),
            lines,
        }
    }

    fn parse_entries(&self) -> Vec<Entry> {
        let Some(first) = self.next_content_line(0, self.src.len()) else {
            return Vec::new();
        };
        let base = self.indent(first);

        let keys: Vec<KeyInfo> = (first..self.lines.len())
            .filter(|&i| !self.is_blank_or_comment(i) && self.indent(i) == base)
            .filter_map(|i| self.parse_key(i, base))
            .collect();

        let mut entries = Vec::with_capacity(keys.len());
        for (n, key) in keys.iter().enumerate() {
            let region_end = keys
                .get(n + 1)
                .map(|next| self.line_start_of(next.span.start))
                .unwrap_or(self.src.len());
            let value = self.parse_value(key.value_start, region_end, base);
            entries.push(Entry {
                key: key.name.clone(),
                key_span: key.span.clone(),
                value,
            });
        }
        entries
    }

    // ------------------------------------------------------------------
    // Line helpers
    // ------------------------------------------------------------------

    fn text(&self, i: usize) -> &'a str {
        &self.src[self.lines[i].start..self.lines[i].end]
    }

    fn indent(&self, i: usize) -> usize {
        self.text(i).bytes().take_while(|&b| b == b' ').count()
    }

    fn is_blank(&self, i: usize) -> bool {
        self.text(i).trim().is_empty()
    }

    fn is_blank_or_comment(&self, i: usize) -> bool {
        let trimmed = self.text(i).trim_start();
        trimmed.is_empty() || trimmed.starts_with('#')
    }

    fn line_of(&self, pos: usize) -> usize {
        self.lines
            .partition_point(|line| line.start <= pos)
            .saturating_sub(1)
    }

    fn line_start_of(&self, pos: usize) -> usize {
        self.lines
            .get(self.line_of(pos))
            .map(|line| line.start)
            .unwrap_or(pos)
    }

    fn next_content_line(&self, from: usize, limit: usize) -> Option<usize> {
        (from..self.lines.len())
            .take_while(|&i| self.lines[i].start < limit)
            .find(|&i| !self.is_blank_or_comment(i))
    }

    fn skip_inline_ws(&self, mut pos: usize, line_end: usize) -> usize {
        while pos < line_end && matches!(self.bytes[pos], b' ' | b'\t') {
            pos += 1;
        }
        pos
    }

    /// True if nothing but whitespace or a comment follows `pos` on its line.
    fn rest_is_blank(&self, pos: usize, line_end: usize) -> bool {
        let pos = self.skip_inline_ws(pos, line_end);
        pos >= line_end || self.bytes[pos] == b'#'
    }

    /// Skip blank lines and lines indented deeper than `indent`.
    fn skip_indented(&self, from: usize, end: usize, indent: usize) -> usize {
        let mut i = from;
        while i < self.lines.len()
            && self.lines[i].start < end
            && (self.is_blank(i) || self.indent(i) > indent)
        {
            i += 1;
        }
        i
    }

    fn is_dash_item(&self, i: usize, indent: usize) -> bool {
        let text = self.text(i);
        let rest = &text[indent.min(text.len())..];
        rest == "-" || rest.starts_with("- ") || rest.starts_with("-\t")
    }

    // ------------------------------------------------------------------
    // Keys and properties
    // ------------------------------------------------------------------

    fn parse_key(&self, i: usize, base: usize) -> Option<KeyInfo> {
        let start = self.lines[i].start + base;
        let line_end = self.lines[i].end;
        let first = *self.bytes.get(start)?;

        if first == b'"' || first == b'\'' {
            let close = self.find_closing_quote(start, line_end)?;
            let raw = &self.src[start + 1..close];
            let name = if first == b'"' {
                decode_double(raw)
            } else {
                decode_single(raw)
            };
            let colon = self.skip_inline_ws(close + 1, line_end);
            if self.bytes.get(colon) != Some(&b':') {
                return None;
            }
            let after = colon + 1;
            if after < line_end && !matches!(self.bytes[after], b' ' | b'\t') {
                return None;
            }
            return Some(KeyInfo {
                name,
                span: start..close + 1,
                value_start: after,
            });
        }

        if matches!(
            first,
            b'#' | b'[' | b'{' | b'?' | b'&' | b'*' | b'!' | b'|' | b'>' | b'%' | b'@' | b'`' | b','
        ) || self.is_dash_item(i, base)
        {
            return None;
        }

        let text = &self.src[start..line_end];
        let mut prev_ws = false;
        for (j, c) in text.char_indices() {
            if c == '#' && prev_ws {
                return None;
            }
            if c == ':' {
                let next = text[j + 1..].chars().next();
                if next.is_none_or(|n| n == ' ' || n == '\t') {
                    let name = text[..j].trim_end();
                    if name.is_empty() {
                        return None;
                    }
                    return Some(KeyInfo {
                        name: name.to_string(),
                        span: start..start + name.len(),
                        value_start: start + j + 1,
                    });
                }
            }
            prev_ws = c == ' ' || c == '\t';
        }
        None
    }

    /// Parse `&anchor` and `!tag` properties; returns the anchor and the
    /// position after them.
    fn parse_properties(&self, mut pos: usize, line_end: usize) -> (Option<String>, usize) {
        let mut anchor = None;
        loop {
            pos = self.skip_inline_ws(pos, line_end);
            match self.bytes.get(pos) {
                Some(b'&') if pos < line_end => {
                    let end = self.name_end(pos + 1, line_end);
                    anchor = Some(self.src[pos + 1..end].to_string());
                    pos = end;
                }
                Some(b'!') if pos < line_end => {
                    pos = self.name_end(pos + 1, line_end);
                }
                _ => return (anchor, pos),
            }
        }
    }

    fn name_end(&self, mut pos: usize, line_end: usize) -> usize {
        while pos < line_end
            && !matches!(
                self.bytes[pos],
                b' ' | b'\t' | b',' | b'[' | b']' | b'{' | b'}'
            )
        {
            pos += 1;
        }
        pos
    }

    // ------------------------------------------------------------------
    // Values
    // ------------------------------------------------------------------

    fn parse_value(&self, pos: usize, end: usize, parent_indent: usize) -> Node {
        let line = self.line_of(pos);
        let line_end = self.lines[line].end;
        let (anchor, p) = self.parse_properties(pos, line_end);

        if self.rest_is_blank(p, line_end) {
            let Some(k) = self.next_content_line(line + 1, end) else {
                return Node::Empty;
            };
            let indent = self.indent(k);
            if self.is_dash_item(k, indent) && indent >= parent_indent {
                return self.parse_block_sequence(k, indent, end, anchor);
            }
            if indent > parent_indent {
                return self.parse_node(self.lines[k].start + indent, end, parent_indent, anchor);
            }
            return Node::Empty;
        }

        self.parse_node(p, end, parent_indent, anchor)
    }

    fn parse_node(&self, p: usize, end: usize, parent_indent: usize, anchor: Option<String>) -> Node {
        let line = self.line_of(p);
        let line_end = self.lines[line].end;

        match self.bytes[p] {
            b'*' => Node::Alias(self.src[p + 1..self.name_end(p + 1, line_end)].to_string()),
            b'[' => match self.parse_flow_sequence(p, end, anchor) {
                Some((node, close)) if self.rest_is_blank(close, self.lines[self.line_of(close)].end) => {
                    node
                }
                _ => Node::Opaque,
            },
            b'{' => Node::Opaque,
            b'|' | b'>' => self
                .parse_block_scalar(p, end, parent_indent, anchor)
                .map(Node::Scalar)
                .unwrap_or(Node::Opaque),
            b'"' | b'\'' => match self.parse_quoted(p, end, false, anchor) {
                Some(scalar) if self.rest_is_blank(scalar.span.end, self.lines[self.line_of(scalar.span.end - 1)].end) => {
                    Node::Scalar(scalar)
                }
                _ => Node::Opaque,
            },
            _ if self.looks_like_mapping(p, line_end) || self.is_dash_item(line, p - self.lines[line].start) => {
                Node::Opaque
            }
            _ => Node::Scalar(self.parse_plain(p, end, parent_indent, anchor).0),
        }
    }

    fn looks_like_mapping(&self, p: usize, line_end: usize) -> bool {
        let content_end = self.plain_line_end(p, line_end);
        let text = &self.src[p..content_end];
        text.contains(": ") || text.contains(":\t") || text.ends_with(':')
    }

    fn parse_block_sequence(&self, first: usize, indent: usize, end: usize, anchor: Option<String>) -> Node {
        let mut items = Vec::new();
        let mut i = first;

        while i < self.lines.len() && self.lines[i].start < end {
            if self.is_blank_or_comment(i) {
                i += 1;
                continue;
            }
            if self.indent(i) != indent || !self.is_dash_item(i, indent) {
                break;
            }
            let dash = self.lines[i].start + indent;
            let (node, next) = self.parse_sequence_item(dash + 1, end, indent);
            items.push(node);
            i = next.max(i + 1);
        }

        Node::Sequence(Sequence {
            flow: false,
            anchor,
            items,
        })
    }

    /// Parse one `- item`; returns the node and the index of the first line
    /// after it.
    fn parse_sequence_item(&self, pos: usize, end: usize, dash_indent: usize) -> (Node, usize) {
        let line = self.line_of(pos);
        let line_end = self.lines[line].end;
        let (anchor, p) = self.parse_properties(pos, line_end);

        if self.rest_is_blank(p, line_end) {
            return match self.next_content_line(line + 1, end) {
                Some(k) if self.indent(k) > dash_indent => {
                    (Node::Opaque, self.skip_indented(k, end, dash_indent))
                }
                _ => (Node::Empty, line + 1),
            };
        }

        let opaque = || (Node::Opaque, self.skip_indented(line + 1, end, dash_indent));

        match self.bytes[p] {
            b'*' => (
                Node::Alias(self.src[p + 1..self.name_end(p + 1, line_end)].to_string()),
                line + 1,
            ),
            b'"' | b'\'' => match self.parse_quoted(p, end, false, anchor) {
                Some(scalar) => {
                    let close_line = self.line_of(scalar.span.end - 1);
                    if self.rest_is_blank(scalar.span.end, self.lines[close_line].end) {
                        (Node::Scalar(scalar), close_line + 1)
                    } else {
                        opaque()
                    }
                }
                None => opaque(),
            },
            b'[' | b'{' | b'|' | b'>' => opaque(),
            b'-' if self.is_dash_item(line, p - self.lines[line].start) => opaque(),
            _ if self.looks_like_mapping(p, line_end) => opaque(),
            _ => {
                let (scalar, last) = self.parse_plain(p, end, dash_indent, anchor);
                (Node::Scalar(scalar), last + 1)
            }
        }
    }

    /// End of a plain scalar's text on one line: before a ` #` comment,
    /// with trailing whitespace trimmed.
    fn plain_line_end(&self, p: usize, line_end: usize) -> usize {
        let text = &self.src[p..line_end];
        let mut cut = text.len();
        let mut prev_ws = false;
        for (j, c) in text.char_indices() {
            if c == '#' && prev_ws {
                cut = j;
                break;
            }
            prev_ws = c == ' ' || c == '\t';
        }
        p + text[..cut].trim_end().len()
    }

    /// Block-context plain scalar, possibly continued on deeper-indented
    /// lines. Returns the scalar and its last line.
    fn parse_plain(&self, p: usize, end: usize, parent_indent: usize, anchor: Option<String>) -> (Scalar, usize) {
        let line = self.line_of(p);
        let first_end = self.plain_line_end(p, self.lines[line].end);
        let mut value = self.src[p..first_end].to_string();
        let mut span_end = first_end;
        let mut last = line;
        let mut blanks = 0;

        let mut i = line + 1;
        while i < self.lines.len() && self.lines[i].start < end {
            if self.is_blank(i) {
                blanks += 1;
                i += 1;
                continue;
            }
            let indent = self.text(i).len() - self.text(i).trim_start().len();
            if self.indent(i) <= parent_indent {
                break;
            }
            let content_start = self.lines[i].start + indent;
            if self.bytes[content_start] == b'#' {
                break;
            }
            let content_end = self.plain_line_end(content_start, self.lines[i].end);
            if self.looks_like_mapping(content_start, self.lines[i].end) {
                break;
            }
            if blanks == 0 {
                value.push(' ');
            } else {
                value.push_str(&"\n".repeat(blanks));
            }
            value.push_str(&self.src[content_start..content_end]);
            span_end = content_end;
            last = i;
            blanks = 0;
            i += 1;
        }

        let scalar = Scalar {
            style: ScalarStyle::Plain,
            span: p..span_end,
            value,
            anchor,
            in_flow: false,
            block: None,
        };
        (scalar, last)
    }

    fn find_closing_quote(&self, open: usize, limit: usize) -> Option<usize> {
        let quote = self.bytes[open];
        let mut i = open + 1;
        while i < limit {
            let b = self.bytes[i];
            if quote == b'"' {
                if b == b'\\' {
                    i += 2;
                    continue;
                }
                if b == b'"' {
                    return Some(i);
                }
            } else if b == b'\'' {
                if self.bytes.get(i + 1) == Some(&b'\'') && i + 1 < limit {
                    i += 2;
                    continue;
                }
                return Some(i);
            }
            i += 1;
        }
        None
    }

    fn parse_quoted(&self, p: usize, end: usize, in_flow: bool, anchor: Option<String>) -> Option<Scalar> {
        let close = self.find_closing_quote(p, end)?;
        let raw = &self.src[p + 1..close];
        let (style, value) = if self.bytes[p] == b'"' {
            (ScalarStyle::DoubleQuoted, decode_double(raw))
        } else {
            (ScalarStyle::SingleQuoted, decode_single(raw))
        };

        Some(Scalar {
            style,
            span: p..close + 1,
            value,
            anchor,
            in_flow,
            block: None,
        })
    }

    fn parse_block_scalar(&self, p: usize, end: usize, parent_indent: usize, anchor: Option<String>) -> Option<Scalar> {
        let line = self.line_of(p);
        let line_end = self.lines[line].end;
        let style = if self.bytes[p] == b'|' {
            ScalarStyle::Literal
        } else {
            ScalarStyle::Folded
        };

        let mut q = p + 1;
        let mut chomping = Chomping::Clip;
        let mut explicit = None;
        while q < line_end {
            match self.bytes[q] {
                b'-' => chomping = Chomping::Strip,
                b'+' => chomping = Chomping::Keep,
                d @ b'1'..=b'9' => explicit = Some(usize::from(d - b'0')),
                _ => break,
            }
            q += 1;
        }
        if !self.rest_is_blank(q, line_end) {
            return None;
        }
        let line_break = if self.src[line_end..].starts_with("\r\n") {
            "\r\n"
        } else {
            "\n"
        };

        let content_indent = match explicit {
            Some(d) => parent_indent + d,
            None => match self.next_nonblank_line(line + 1, end) {
                Some(k) if self.indent(k) > parent_indent => self.indent(k),
                _ => parent_indent + 1,
            },
        };

        let mut last_content = None;
        let mut k = line + 1;
        while k < self.lines.len() && self.lines[k].start < end {
            if !self.is_blank(k) {
                if self.indent(k) < content_indent {
                    break;
                }
                last_content = Some(k);
            }
            k += 1;
        }

        let content_start = self
            .lines
            .get(line + 1)
            .map(|l| l.start)
            .unwrap_or(self.src.len())
            .min(end);

        let Some(last) = last_content else {
            return Some(Scalar {
                style,
                span: content_start..content_start,
                value: String::new(),
                anchor,
                in_flow: false,
                block: Some(BlockHeader {
                    span: p..q,
                    chomping,
                    indent: content_indent,
                    trailing_blank_lines: 0,
                    line_break,
                }),
            });
        };

        let body: Vec<&str> = (line + 1..=last)
            .map(|i| {
                let text = self.text(i);
                if text.len() >= content_indent && self.indent(i) >= content_indent {
                    &text[content_indent..]
                } else if self.is_blank(i) && text.len() > content_indent {
                    &text[content_indent..]
                } else {
                    ""
                }
            })
            .collect();

        let trailing_blank_lines = (last + 1..self.lines.len())
            .take_while(|&i| self.lines[i].start < end && self.is_blank(i))
            .count();

        let mut value = match style {
            ScalarStyle::Literal => body.join("\n"),
            _ => fold_lines(&body),
        };
        match chomping {
            Chomping::Strip => {}
            Chomping::Clip => value.push('\n'),
            Chomping::Keep => value.push_str(&"\n".repeat(trailing_blank_lines + 1)),
        }

        Some(Scalar {
            style,
            span: content_start..self.lines[last].end,
            value,
            anchor,
            in_flow: false,
            block: Some(BlockHeader {
                span: p..q,
                chomping,
                indent: content_indent,
                trailing_blank_lines,
                line_break,
            }),
        })
    }

    fn next_nonblank_line(&self, from: usize, limit: usize) -> Option<usize> {
        (from..self.lines.len())
            .take_while(|&i| self.lines[i].start < limit)
            .find(|&i| !self.is_blank(i))
    }

    // ------------------------------------------------------------------
    // Flow sequences
    // ------------------------------------------------------------------

    /// Parse `[a, "b", c]`; returns the node and the position after `]`.
    fn parse_flow_sequence(&self, p: usize, end: usize, anchor: Option<String>) -> Option<(Node, usize)> {
        let mut items = Vec::new();
        let mut q = p + 1;

        loop {
            q = self.skip_flow_ws(q, end)?;
            if self.bytes[q] == b']' {
                break;
            }

            let line_end = self.lines[self.line_of(q)].end;
            let (item_anchor, start) = self.parse_properties(q, line_end);
            q = self.skip_flow_ws(start, end)?;

            let item = match self.bytes[q] {
                b'"' | b'\'' => {
                    let scalar = self.parse_quoted(q, end, true, item_anchor)?;
                    q = scalar.span.end;
                    Node::Scalar(scalar)
                }
                b'[' | b'{' => {
                    q = self.skip_balanced(q, end)?;
                    Node::Opaque
                }
                b'*' => {
                    let name_end = self.name_end(q + 1, line_end);
                    let name = self.src[q + 1..name_end].to_string();
                    q = name_end;
                    Node::Alias(name)
                }
                b',' | b']' | b'}' => return None,
                _ => {
                    let stop = self.flow_plain_end(q, end);
                    let value = self.src[q..stop].trim_end();
                    if value.is_empty() || self.bytes.get(stop) == Some(&b':') {
                        return None;
                    }
                    let span = q..q + value.len();
                    q = stop;
                    Node::Scalar(Scalar {
                        style: ScalarStyle::Plain,
                        span,
                        value: value.to_string(),
                        anchor: item_anchor,
                        in_flow: true,
                        block: None,
                    })
                }
            };
            items.push(item);

            q = self.skip_flow_ws(q, end)?;
            match self.bytes[q] {
                b',' => q += 1,
                b']' => break,
                _ => return None,
            }
        }

        let node = Node::Sequence(Sequence {
            flow: true,
            anchor,
            items,
        });
        Some((node, q + 1))
    }

    fn skip_flow_ws(&self, mut q: usize, end: usize) -> Option<usize> {
        loop {
            while q < end && matches!(self.bytes[q], b' ' | b'\t' | b'\r' | b'\n') {
                q += 1;
            }
            if q < end && self.bytes[q] == b'#' {
                while q < end && self.bytes[q] != b'\n' {
                    q += 1;
                }
                continue;
            }
            return (q < end).then_some(q);
        }
    }

    fn flow_plain_end(&self, q: usize, end: usize) -> usize {
        let mut i = q;
        while i < end {
            match self.bytes[i] {
                b',' | b'[' | b']' | b'{' | b'}' | b'\n' | b'\r' => break,
                b':' if matches!(
                    self.bytes.get(i + 1),
                    None | Some(b' ' | b'\t' | b',' | b']' | b'}' | b'\n' | b'\r')
                ) =>
                {
                    break
                }
                b'#' if i > q && matches!(self.bytes[i - 1], b' ' | b'\t') => break,
                _ => i += 1,
            }
        }
        i
    }

    fn skip_balanced(&self, q: usize, end: usize) -> Option<usize> {
        let mut depth = 0usize;
        let mut i = q;
        while i < end {
            match self.bytes[i] {
                b'[' | b'{' => depth += 1,
                b']' | b'}' => {
                    depth = depth.checked_sub(1)?;
                    if depth == 0 {
                        return Some(i + 1);
                    }
                }
                b'"' | b'\'' => i = self.find_closing_quote(i, end)?,
                _ => {}
            }
            i += 1;
        }
        None
    }
}

// ============================================================================
// Scalar decoding
// ============================================================================

fn fold_lines(lines: &[&str]) -> String {
    let mut out = String::new();
    let mut blanks = 0;
    let mut prev_more_indented = false;
    let mut started = false;

    for line in lines {
        if line.is_empty() {
            blanks += 1;
            continue;
        }
        let more_indented = line.starts_with([' ', '\t']);
        if started {
            if prev_more_indented || more_indented {
                out.push_str(&"\n".repeat(blanks + 1));
            } else if blanks == 0 {
                out.push(' ');
            } else {
                out.push_str(&"\n".repeat(blanks));
            }
        } else {
            out.push_str(&"\n".repeat(blanks));
        }
        out.push_str(line);
        prev_more_indented = more_indented;
        started = true;
        blanks = 0;
    }
    out
}

/// Fold a line break inside a quoted scalar: one break becomes a space,
/// `n + 1` breaks become `n` newlines.
fn fold_break(chars: &mut Peekable<Chars<'_>>, out: &mut String) {
    let mut breaks = 0;
    loop {
        while matches!(chars.peek(), Some(' ' | '\t')) {
            chars.next();
        }
        match chars.peek() {
            Some('\r') => {
                chars.next();
            }
            Some('\n') => {
                chars.next();
                breaks += 1;
            }
            _ => break,
        }
    }
    if breaks == 0 {
        out.push(' ');
    } else {
        out.push_str(&"\n".repeat(breaks));
    }
}

fn decode_single(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    let mut pending = String::new();
    let mut chars = raw.chars().peekable();

    while let Some(c) = chars.next() {
        match c {
            '\'' => {
                out.push_str(&pending);
                pending.clear();
                chars.next();
                out.push('\'');
            }
            ' ' | '\t' => pending.push(c),
            '\r' if chars.peek() == Some(&'\n') => {}
            '\n' => {
                pending.clear();
                fold_break(&mut chars, &mut out);
            }
            _ => {
                out.push_str(&pending);
                pending.clear();
                out.push(c);
            }
        }
    }
    out.push_str(&pending);
    out
}

fn decode_double(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    let mut pending = String::new();
    let mut chars = raw.chars().peekable();

    while let Some(c) = chars.next() {
        match c {
            '\\' => {
                out.push_str(&pending);
                pending.clear();
                match chars.next() {
                    Some('n') => out.push('\n'),
                    Some('t' | '\t') => out.push('\t'),
                    Some('r') => out.push('\r'),
                    Some('0') => out.push('\0'),
                    Some('a') => out.push('\u{07}'),
                    Some('b') => out.push('\u{08}'),
                    Some('e') => out.push('\u{1B}'),
                    Some('f') => out.push('\u{0C}'),
                    Some('v') => out.push('\u{0B}'),
                    Some('N') => out.push('\u{85}'),
                    Some('_') => out.push('\u{A0}'),
                    Some('L') => out.push('\u{2028}'),
                    Some('P') => out.push('\u{2029}'),
                    Some('x') => out.push(decode_hex(&mut chars, 2)),
                    Some('u') => out.push(decode_hex(&mut chars, 4)),
                    Some('U') => out.push(decode_hex(&mut chars, 8)),
                    Some('\r' | '\n') => {
                        if chars.peek() == Some(&'\n') {
                            chars.next();
                        }
                        while matches!(chars.peek(), Some(' ' | '\t')) {
                            chars.next();
                        }
                    }
                    Some(other) => out.push(other),
                    None => out.push('\\'),
                }
            }
            ' ' | '\t' => pending.push(c),
            '\r' if chars.peek() == Some(&'\n') => {}
            '\n' => {
                pending.clear();
                fold_break(&mut chars, &mut out);
            }
            _ => {
                out.push_str(&pending);
                pending.clear();
                out.push(c);
            }
        }
    }
    out.push_str(&pending);
    out
}

fn decode_hex(chars: &mut Peekable<Chars<'_>>, digits: usize) -> char {
    let hex: String = chars.by_ref().take(digits).collect();
    u32::from_str_radix(&hex, 16)
        .ok()
        .and_then(char::from_u32)
        .unwrap_or('\u{FFFD}')
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scalar<'d>(doc: &'d Document<'_>, key: &str) -> &'d Scalar {
        match doc.get(key) {
            Some(Node::Scalar(s)) => s,
            other => panic!("expected scalar for {}, got {:?}", key, other),
        }
    }

    fn sequence<'d>(doc: &'d Document<'_>, key: &str) -> &'d Sequence {
        match doc.get(key) {
            Some(Node::Sequence(s)) => s,
            other => panic!("expected sequence for {}, got {:?}", key, other),
        }
    }

    fn item(seq: &Sequence, index: usize) -> &Scalar {
        match &seq.items[index] {
            Node::Scalar(s) => s,
            other => panic!("expected scalar item, got {:?}", other),
        }
    }

    #[test]
    fn parses_top_level_keys_in_order() {
        let src = "title: Hello\n# comment\ntags: foo\n\"aliases\": x\n";
        let doc = Document::parse(src);
        let keys: Vec<&str> = doc.entries().iter().map(|e| e.key.as_str()).collect();
        assert_eq!(keys, vec!["title", "tags", "aliases"]);
    }

    #[test]
    fn plain_scalar_ignores_trailing_comment() {
        let src = "tags: foo, bar # note\n";
        let doc = Document::parse(src);
        let s = scalar(&doc, "tags");
        assert_eq!(s.style, ScalarStyle::Plain);
        assert_eq!(s.value, "foo, bar");
        assert_eq!(&src[s.span.clone()], "foo, bar");
    }

    #[test]
    fn multi_line_plain_scalar_folds() {
        let src = "aliases: one,\n  two\ntitle: t\n";
        let doc = Document::parse(src);
        assert_eq!(scalar(&doc, "aliases").value, "one, two");
    }

    #[test]
    fn quoted_scalars_decode() {
        let src = "a: \"x\\ty \\\"q\\\" \\u00e9\"\nb: 'it''s'\n";
        let doc = Document::parse(src);
        assert_eq!(scalar(&doc, "a").value, "x\ty \"q\" é");
        assert_eq!(scalar(&doc, "a").style, ScalarStyle::DoubleQuoted);
        assert_eq!(scalar(&doc, "b").value, "it's");
    }

    #[test]
    fn flow_sequence_items_have_spans() {
        let src = "tags: [foo, \"foo/bar\" , 'baz'] # trailing\n";
        let doc = Document::parse(src);
        let seq = sequence(&doc, "tags");
        assert!(seq.flow);
        assert_eq!(seq.items.len(), 3);
        assert_eq!(item(seq, 0).value, "foo");
        assert_eq!(&src[item(seq, 1).span.clone()], "\"foo/bar\"");
        assert_eq!(item(seq, 2).value, "baz");
        assert!(item(seq, 0).in_flow);
    }

    #[test]
    fn multi_line_flow_sequence() {
        let src = "tags: [\n  foo, # first\n  bar,\n]\n";
        let doc = Document::parse(src);
        let seq = sequence(&doc, "tags");
        assert_eq!(seq.items.len(), 2);
        assert_eq!(item(seq, 1).value, "bar");
    }

    #[test]
    fn block_sequence_with_anchor_and_alias() {
        let src = "tags: &t\n  - foo\n  # between\n  - \"foo/bar\"\naliases: *t\n";
        let doc = Document::parse(src);
        let seq = sequence(&doc, "tags");
        assert_eq!(seq.anchor.as_deref(), Some("t"));
        assert_eq!(seq.items.len(), 2);
        assert_eq!(item(seq, 1).value, "foo/bar");
        assert_eq!(doc.get("aliases"), Some(&Node::Alias("t".to_string())));
    }

    #[test]
    fn block_sequence_at_key_indent() {
        let src = "tags:\n- a\n- b\ntitle: x\n";
        let doc = Document::parse(src);
        let seq = sequence(&doc, "tags");
        assert_eq!(seq.items.len(), 2);
        assert_eq!(item(seq, 1).value, "b");
        assert_eq!(doc.entries().len(), 2);
    }

    #[test]
    fn nested_structures_are_opaque() {
        let src = "meta:\n  tags: foo\ntags:\n  - [a, b]\n  - key: v\n  - plain\n";
        let doc = Document::parse(src);
        assert_eq!(doc.get("meta"), Some(&Node::Opaque));
        let seq = sequence(&doc, "tags");
        assert_eq!(seq.items[0], Node::Opaque);
        assert_eq!(seq.items[1], Node::Opaque);
        assert_eq!(item(seq, 2).value, "plain");
    }

    #[test]
    fn literal_block_scalar() {
        let src = "tags: |\n  foo\n  foo/bar\naliases: x\n";
        let doc = Document::parse(src);
        let s = scalar(&doc, "tags");
        assert_eq!(s.style, ScalarStyle::Literal);
        assert_eq!(s.value, "foo\nfoo/bar\n");
        assert_eq!(&src[s.span.clone()], "  foo\n  foo/bar");
    }

    #[test]
    fn folded_and_chomped_block_scalars() {
        let src = "a: >-\n  one\n  two\nb: |+\n  x\n\nc: y\n";
        let doc = Document::parse(src);
        assert_eq!(scalar(&doc, "a").value, "one two");
        assert_eq!(scalar(&doc, "b").value, "x\n\n");
    }

    #[test]
    fn empty_values() {
        let src = "tags:\naliases: # nothing\ntitle: x\n";
        let doc = Document::parse(src);
        assert_eq!(doc.get("tags"), Some(&Node::Empty));
        assert_eq!(doc.get("aliases"), Some(&Node::Empty));
    }

    #[test]
    fn render_without_edits_is_identity() {
        let src = "tags: [a, b] # c\naliases: &x\n  - 'q'\n";
        let doc = Document::parse(src);
        assert_eq!(doc.render(&Edits::default()), src);
    }

    #[test]
    fn set_scalar_keeps_plain_style() {
        let src = "tags: [foo, other] # keep\n";
        let doc = Document::parse(src);
        let mut edits = Edits::default();
        edits.set_scalar(item(sequence(&doc, "tags"), 0), "bar/baz");
        assert_eq!(doc.render(&edits), "tags: [bar/baz, other] # keep\n");
    }

    #[test]
    fn set_scalar_quotes_when_plain_is_unsafe() {
        let src = "tags: foo\naliases: [x]\n";
        let doc = Document::parse(src);
        let mut edits = Edits::default();
        edits.set_scalar(scalar(&doc, "tags"), "#bar");
        edits.set_scalar(item(sequence(&doc, "aliases"), 0), "a, b");
        assert_eq!(doc.render(&edits), "tags: \"#bar\"\naliases: [\"a, b\"]\n");

        let mut edits = Edits::default();
        edits.set_scalar(scalar(&doc, "tags"), "2024");
        assert_eq!(doc.render(&edits), "tags: \"2024\"\naliases: [x]\n");
    }

    #[test]
    fn set_scalar_keeps_quote_style() {
        let src = "a: 'foo'\nb: \"foo\"\n";
        let doc = Document::parse(src);
        let mut edits = Edits::default();
        edits.set_scalar(scalar(&doc, "a"), "it's");
        edits.set_scalar(scalar(&doc, "b"), "say \"hi\"");
        assert_eq!(doc.render(&edits), "a: 'it''s'\nb: \"say \\\"hi\\\"\"\n");
    }

    #[test]
    fn set_scalar_rewrites_literal_block_content() {
        let src = "tags: | # list\n  foo\n  foo/bar\nnext: 1\n";
        let doc = Document::parse(src);
        let mut edits = Edits::default();
        edits.set_scalar(scalar(&doc, "tags"), "bar\nbar/bar\n");
        assert_eq!(doc.render(&edits), "tags: | # list\n  bar\n  bar/bar\nnext: 1\n");
    }

    #[test]
    fn set_scalar_keeps_crlf_inside_block_content() {
        let src = "tags: |\r\n  foo\r\n  foo/x\r\n";
        let doc = Document::parse(src);
        let mut edits = Edits::default();
        edits.set_scalar(scalar(&doc, "tags"), "bar\nbar/x\n");
        assert_eq!(doc.render(&edits), "tags: |\r\n  bar\r\n  bar/x\r\n");
    }

    #[test]
    fn set_scalar_falls_back_to_double_quotes_for_blocks() {
        let src = "tags: >\n  foo\n";
        let doc = Document::parse(src);
        let mut edits = Edits::default();
        edits.set_scalar(scalar(&doc, "tags"), "a\nb\n");
        assert_eq!(doc.render(&edits), "tags: \"a\\nb\\n\"\n");
    }

    #[test]
    fn safe_plain_rules() {
        assert!(is_safe_plain("foo/bar", false));
        assert!(is_safe_plain("-dash", false));
        assert!(is_safe_plain("🧠", true));
        assert!(!is_safe_plain("#tag", false));
        assert!(!is_safe_plain("a, b", true));
        assert!(is_safe_plain("a, b", false));
        assert!(!is_safe_plain("true", false));
        assert!(!is_safe_plain("1.5", false));
        assert!(!is_safe_plain(" padded", false));
        assert!(!is_safe_plain("key: value", false));
        assert!(!is_safe_plain("", false));
    }
}

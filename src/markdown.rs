//! Markdown tokenizer and inline span extractor
//!
//! Only the subset of markdown that maps onto Google Docs paragraph and text
//! styles is recognised: `#`/`##`/`###` headings, `-`/`*` bullets, `1.`
//! numbered items, `**bold**`, `*italic*`, blank lines and `---` rules.
//! Everything else is passed through as literal text.
//!
//! All offsets are UTF-16 code units, the unit the Docs API addresses text in.

use serde::Serialize;

/// Paragraph-level style of a segment
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BlockStyle {
    Plain,
    #[serde(rename = "HEADING_1")]
    Heading1,
    #[serde(rename = "HEADING_2")]
    Heading2,
    #[serde(rename = "HEADING_3")]
    Heading3,
}

impl BlockStyle {
    /// Docs API `namedStyleType` for this block
    pub fn named_style_type(&self) -> &'static str {
        match self {
            BlockStyle::Plain => "NORMAL_TEXT",
            BlockStyle::Heading1 => "HEADING_1",
            BlockStyle::Heading2 => "HEADING_2",
            BlockStyle::Heading3 => "HEADING_3",
        }
    }
}

/// List membership of a segment
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ListKind {
    None,
    Bullet,
    Numbered,
}

impl ListKind {
    /// Docs API bullet preset, `None` for non-list paragraphs
    pub fn bullet_preset(&self) -> Option<&'static str> {
        match self {
            ListKind::None => None,
            ListKind::Bullet => Some("BULLET_DISC_CIRCLE_SQUARE"),
            ListKind::Numbered => Some("NUMBERED_DECIMAL_NESTED"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Emphasis {
    Bold,
    Italic,
}

/// Emphasised span, relative to the start of its segment's text
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct EmphasisRange {
    pub start: i64,
    pub end: i64,
    pub emphasis: Emphasis,
}

/// One converted markdown line
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Segment {
    /// Plain text with markers stripped, always ending in `\n`
    pub text: String,
    pub block_style: BlockStyle,
    pub list_kind: ListKind,
    pub emphasis: Vec<EmphasisRange>,
}

impl Segment {
    fn blank() -> Self {
        Self {
            text: "\n".to_string(),
            block_style: BlockStyle::Plain,
            list_kind: ListKind::None,
            emphasis: Vec::new(),
        }
    }

    /// Length of the segment text in UTF-16 code units
    pub fn utf16_len(&self) -> i64 {
        utf16_len(&self.text)
    }
}

/// Block-level classification of a single line
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TokenizedLine<'a> {
    pub block_style: BlockStyle,
    pub list_kind: ListKind,
    /// Line text with the block prefix removed; `None` for blank lines and rules
    pub text: Option<&'a str>,
}

/// Number of UTF-16 code units in `s`
///
/// Characters outside the Basic Multilingual Plane (most emoji) are encoded
/// as surrogate pairs and count as 2.
pub fn utf16_len(s: &str) -> i64 {
    s.encode_utf16().count() as i64
}

/// Classify one line of markdown
///
/// Prefixes are matched against the trimmed line but stripped from the
/// untrimmed one, so indented markers stay in the output text.
pub fn tokenize_line(line: &str) -> TokenizedLine<'_> {
    let line = line.trim_end_matches('\r');
    let trimmed = line.trim();

    if trimmed.is_empty() || trimmed == "---" {
        return TokenizedLine {
            block_style: BlockStyle::Plain,
            list_kind: ListKind::None,
            text: None,
        };
    }

    let (block_style, text) = if trimmed.starts_with("### ") {
        (BlockStyle::Heading3, line.strip_prefix("### ").unwrap_or(line))
    } else if trimmed.starts_with("## ") {
        (BlockStyle::Heading2, line.strip_prefix("## ").unwrap_or(line))
    } else if trimmed.starts_with("# ") {
        (BlockStyle::Heading1, line.strip_prefix("# ").unwrap_or(line))
    } else {
        (BlockStyle::Plain, line)
    };

    // Lists only apply to body paragraphs
    let (list_kind, text) = if block_style != BlockStyle::Plain {
        (ListKind::None, text)
    } else if let Some(rest) = text
        .strip_prefix("- ")
        .or_else(|| text.strip_prefix("* "))
    {
        (ListKind::Bullet, rest)
    } else if is_numbered_marker(text) {
        (ListKind::Numbered, &text[3..])
    } else {
        (ListKind::None, text)
    };

    TokenizedLine {
        block_style,
        list_kind,
        text: Some(text),
    }
}

/// `<digit>. ` with exactly one digit
fn is_numbered_marker(text: &str) -> bool {
    let bytes = text.as_bytes();
    bytes.len() >= 3 && bytes[0].is_ascii_digit() && bytes[1] == b'.' && bytes[2] == b' '
}

/// Strip `**bold**` and `*italic*` markers, recording where the spans land
///
/// The first `*` found decides the marker: if it starts a `**` run the span
/// is bold, otherwise italic. A marker without a matching close is kept as
/// literal text. Empty spans (`****`) are stripped but not recorded.
pub fn extract_spans(text: &str) -> (String, Vec<EmphasisRange>) {
    let mut plain = String::with_capacity(text.len());
    let mut ranges = Vec::new();
    let mut offset: i64 = 0;
    let mut rest = text;

    loop {
        let Some(at) = rest.find('*') else {
            plain.push_str(rest);
            break;
        };

        let (marker, emphasis) = if rest[at..].starts_with("**") {
            ("**", Emphasis::Bold)
        } else {
            ("*", Emphasis::Italic)
        };

        let before = &rest[..at];
        plain.push_str(before);
        offset += utf16_len(before);
        rest = &rest[at + marker.len()..];

        match rest.find(marker) {
            Some(close) => {
                let inner = &rest[..close];
                let inner_len = utf16_len(inner);
                if inner_len > 0 {
                    ranges.push(EmphasisRange {
                        start: offset,
                        end: offset + inner_len,
                        emphasis,
                    });
                }
                plain.push_str(inner);
                offset += inner_len;
                rest = &rest[close + marker.len()..];
            }
            None => {
                plain.push_str(marker);
                offset += utf16_len(marker);
            }
        }
    }

    (plain, ranges)
}

/// Convert one line into a segment
pub fn parse_line(line: &str) -> Segment {
    let token = tokenize_line(line);
    let Some(text) = token.text else {
        return Segment::blank();
    };

    let (mut plain, emphasis) = extract_spans(text);
    plain.push('\n');

    Segment {
        text: plain,
        block_style: token.block_style,
        list_kind: token.list_kind,
        emphasis,
    }
}

/// Convert a markdown document into segments, one per `\n`-separated line
pub fn parse_markdown(markdown: &str) -> Vec<Segment> {
    markdown.split('\n').map(parse_line).collect()
}

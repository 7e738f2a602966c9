//! Span types produced by the classifier.

use serde::{Deserialize, Serialize};

use routemap_core::errors::ScanError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SpanKind {
    Code,
    Comment,
    String,
}

impl SpanKind {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Code => "code",
            Self::Comment => "comment",
            Self::String => "string",
        }
    }
}

impl std::fmt::Display for SpanKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CommentStyle {
    Line,
    Block,
    Doc,
}

/// A half-open byte range `[start, end)` of one kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Span {
    pub start: usize,
    pub end: usize,
    pub kind: SpanKind,
    pub comment_style: Option<CommentStyle>,
    /// Index of the delimiter in the profile list it was opened by.
    pub delimiter: Option<u16>,
    /// False when input ended (or the line ended) before the closing delimiter.
    pub terminated: bool,
}

impl Span {
    pub fn code(start: usize, end: usize) -> Self {
        Self {
            start,
            end,
            kind: SpanKind::Code,
            comment_style: None,
            delimiter: None,
            terminated: true,
        }
    }

    pub fn comment(start: usize, end: usize, style: CommentStyle, delimiter: Option<u16>) -> Self {
        Self {
            start,
            end,
            kind: SpanKind::Comment,
            comment_style: Some(style),
            delimiter,
            terminated: true,
        }
    }

    pub fn string(start: usize, end: usize, delimiter: u16) -> Self {
        Self {
            start,
            end,
            kind: SpanKind::String,
            comment_style: None,
            delimiter: Some(delimiter),
            terminated: true,
        }
    }

    pub fn len(&self) -> usize {
        self.end - self.start
    }

    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }

    pub fn contains(&self, offset: usize) -> bool {
        self.start <= offset && offset < self.end
    }

    pub fn is_comment(&self) -> bool {
        self.kind == SpanKind::Comment
    }

    pub fn is_doc(&self) -> bool {
        self.comment_style == Some(CommentStyle::Doc)
    }
}

/// Classifier output for one file.
#[derive(Debug, Clone, Default)]
pub struct Classification {
    pub spans: Vec<Span>,
    /// One entry per span left open at end of line or input.
    pub malformed: Vec<ScanError>,
}

impl Classification {
    pub fn span_at(&self, offset: usize) -> Option<&Span> {
        let i = self.spans.partition_point(|s| s.end <= offset);
        self.spans.get(i).filter(|s| s.contains(offset))
    }

    pub fn kind_at(&self, offset: usize) -> Option<SpanKind> {
        self.span_at(offset).map(|s| s.kind)
    }

    /// Whether any comment span intersects `[start, end)`.
    pub fn overlaps_comment(&self, start: usize, end: usize) -> bool {
        let first = self.spans.partition_point(|s| s.end <= start);
        self.spans[first..]
            .iter()
            .take_while(|s| s.start < end)
            .any(Span::is_comment)
    }

    /// Spans are contiguous, non-empty, and cover exactly `len` bytes.
    pub fn tiles(&self, len: usize) -> bool {
        let mut expected = 0;
        for span in &self.spans {
            if span.start != expected || span.is_empty() {
                return false;
            }
            expected = span.end;
        }
        expected == len
    }
}

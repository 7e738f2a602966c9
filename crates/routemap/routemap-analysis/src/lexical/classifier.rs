//! Single-pass state machine over a source file.
//!
//! Openers are matched longest-first; on equal length a documentation
//! comment beats a block comment, which beats a line comment, which beats a
//! string. Content inside a comment or string never opens anything else.

use routemap_core::errors::ScanError;

use super::lines::{is_line_start, LineIndex};
use super::span::{Classification, CommentStyle, Span};
use crate::profiles::{Delimiter, LexicalSyntax, StringDelimiter};

#[derive(Debug, Clone, Copy)]
enum Opening<'p> {
    Line,
    Block(usize, &'p Delimiter),
    Doc(usize, &'p Delimiter),
    Str(usize, &'p StringDelimiter),
}

impl Opening<'_> {
    fn rank(&self) -> u8 {
        match self {
            Self::Doc(..) => 4,
            Self::Block(..) => 3,
            Self::Line => 2,
            Self::Str(..) => 1,
        }
    }

    fn state(&self) -> &'static str {
        match self {
            Self::Line => "line comment",
            Self::Block(..) => "block comment",
            Self::Doc(..) => "doc comment",
            Self::Str(..) => "string",
        }
    }
}

/// Classifier bound to one profile's lexical syntax.
pub struct LexicalClassifier<'p> {
    syntax: &'p LexicalSyntax,
    /// First bytes of every opener, for a cheap pre-check.
    first_bytes: [bool; 256],
}

impl<'p> LexicalClassifier<'p> {
    pub fn new(syntax: &'p LexicalSyntax) -> Self {
        let mut first_bytes = [false; 256];
        let openers = syntax
            .line_comments
            .iter()
            .map(String::as_str)
            .chain(syntax.block_comments.iter().map(|d| d.open.as_str()))
            .chain(syntax.doc_comments.iter().map(|d| d.open.as_str()))
            .chain(syntax.strings.iter().map(|d| d.open.as_str()));
        for open in openers {
            if let Some(&b) = open.as_bytes().first() {
                first_bytes[b as usize] = true;
            }
        }
        Self {
            syntax,
            first_bytes,
        }
    }

    /// Classify a whole file.
    pub fn classify(&self, text: &str, lines: &LineIndex) -> Classification {
        self.classify_range(text, 0, text.len(), false, lines)
    }

    /// Classify `text[start..end]` recognising strings only. Used for the
    /// bodies of documentation comments, where annotations quote their
    /// arguments but comment markers are just text.
    pub fn classify_strings(
        &self,
        text: &str,
        start: usize,
        end: usize,
        lines: &LineIndex,
    ) -> Classification {
        self.classify_range(text, start, end, true, lines)
    }

    fn classify_range(
        &self,
        text: &str,
        start: usize,
        end: usize,
        strings_only: bool,
        lines: &LineIndex,
    ) -> Classification {
        let text = &text[..end];
        let mut out = Classification::default();
        let mut code_start = start;
        let mut i = start;

        while i < end {
            let opening = if self.first_bytes[text.as_bytes()[i] as usize] {
                self.opening_at(text, i, strings_only)
            } else {
                None
            };
            let Some((opening, open_len)) = opening else {
                i += char_len(text, i);
                continue;
            };

            if code_start < i {
                out.spans.push(Span::code(code_start, i));
            }

            let mut span = match opening {
                Opening::Line => {
                    let stop = text[i..].find('\n').map_or(end, |p| i + p);
                    Span::comment(i, stop, CommentStyle::Line, None)
                }
                Opening::Block(idx, delim) => {
                    let (stop, closed) = find_close(text, i + open_len, delim);
                    let mut s = Span::comment(i, stop, CommentStyle::Block, Some(idx as u16));
                    s.terminated = closed;
                    s
                }
                Opening::Doc(idx, delim) => {
                    let (stop, closed) = find_close(text, i + open_len, delim);
                    let mut s = Span::comment(i, stop, CommentStyle::Doc, Some(idx as u16));
                    s.terminated = closed;
                    s
                }
                Opening::Str(idx, delim) => {
                    let (stop, closed) = scan_string(text, i + open_len, delim);
                    let mut s = Span::string(i, stop, idx as u16);
                    s.terminated = closed;
                    s
                }
            };
            // A string cut at a newline could otherwise end before it began.
            span.end = span.end.max(i + open_len);

            if !span.terminated {
                let line = lines.line_of(i);
                tracing::debug!(offset = i, line, state = opening.state(), "unterminated span");
                out.malformed.push(ScanError::MalformedSpan {
                    offset: i,
                    line,
                    state: opening.state().to_string(),
                });
            }

            i = span.end;
            code_start = span.end;
            out.spans.push(span);
        }

        if code_start < end {
            out.spans.push(Span::code(code_start, end));
        }
        out
    }

    fn opening_at(&self, text: &str, i: usize, strings_only: bool) -> Option<(Opening<'p>, usize)> {
        let rest = &text[i..];
        let mut best: Option<(Opening<'p>, usize)> = None;
        let mut consider = |candidate: Opening<'p>, len: usize| {
            let better = match &best {
                None => true,
                Some((current, current_len)) => {
                    len > *current_len || (len == *current_len && candidate.rank() > current.rank())
                }
            };
            if better {
                best = Some((candidate, len));
            }
        };

        if !strings_only {
            let at_line_start = is_line_start(text, i);
            for (idx, delim) in self.syntax.doc_comments.iter().enumerate() {
                if rest.starts_with(delim.open.as_str())
                    && (!delim.line_start || at_line_start)
                    && !self.is_empty_block_comment(rest)
                {
                    consider(Opening::Doc(idx, delim), delim.open.len());
                }
            }
            for (idx, delim) in self.syntax.block_comments.iter().enumerate() {
                if rest.starts_with(delim.open.as_str()) && (!delim.line_start || at_line_start) {
                    consider(Opening::Block(idx, delim), delim.open.len());
                }
            }
            let excluded = self
                .syntax
                .line_comment_exclusions
                .iter()
                .any(|e| rest.starts_with(e.as_str()));
            if !excluded {
                for marker in &self.syntax.line_comments {
                    if rest.starts_with(marker.as_str()) {
                        consider(Opening::Line, marker.len());
                    }
                }
            }
        }
        for (idx, delim) in self.syntax.strings.iter().enumerate() {
            if rest.starts_with(delim.open.as_str()) {
                consider(Opening::Str(idx, delim), delim.open.len());
            }
        }
        best
    }

    /// `/**/` is an empty block comment, not a doc comment.
    fn is_empty_block_comment(&self, rest: &str) -> bool {
        self.syntax.block_comments.iter().any(|b| {
            rest.strip_prefix(b.open.as_str())
                .is_some_and(|after| after.starts_with(b.close.as_str()))
        })
    }
}

fn char_len(text: &str, i: usize) -> usize {
    text[i..].chars().next().map_or(1, char::len_utf8)
}

/// End offset of a comment opened before `from`, and whether it closed.
fn find_close(text: &str, from: usize, delim: &Delimiter) -> (usize, bool) {
    for (pos, _) in text[from..].match_indices(delim.close.as_str()) {
        let at = from + pos;
        if delim.line_start && !is_line_start(text, at) {
            continue;
        }
        let mut stop = at + delim.close.len();
        if delim.line_start {
            // The rest of a closing marker's line belongs to the comment.
            stop = text[stop..].find('\n').map_or(text.len(), |p| stop + p);
        }
        return (stop, true);
    }
    (text.len(), false)
}

/// End offset of a string whose content starts at `from`, and whether it closed.
fn scan_string(text: &str, from: usize, delim: &StringDelimiter) -> (usize, bool) {
    let mut j = from;
    while j < text.len() {
        let rest = &text[j..];
        if let Some(esc) = delim.escape {
            if rest.starts_with(esc) {
                j += esc.len_utf8();
                if j < text.len() {
                    j += char_len(text, j);
                }
                continue;
            }
        }
        if rest.starts_with(delim.close.as_str()) {
            return (j + delim.close.len(), true);
        }
        if !delim.multiline && rest.starts_with('\n') {
            return (j, false);
        }
        j += char_len(text, j);
    }
    (text.len(), false)
}

//! Tokens over live code. Comment spans produce nothing; string spans become
//! a single literal token carrying their decoded content.

use crate::lexical::{Classification, LexicalClassifier, LineIndex, Span, SpanKind};
use crate::profiles::LexicalSyntax;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TokenKind {
    Word,
    Punct(char),
    Str(Literal),
    /// `:name` in languages with symbol literals.
    Symbol,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Literal {
    pub value: String,
    /// Byte index into `value` where the first interpolation starts.
    pub dynamic_at: Option<usize>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    pub kind: TokenKind,
    pub start: usize,
    pub end: usize,
    pub line: u32,
    /// A newline separates this token from the previous one.
    pub newline_before: bool,
}

impl Token {
    pub fn text<'s>(&self, source: &'s str) -> &'s str {
        &source[self.start..self.end]
    }

    pub fn is_word(&self) -> bool {
        self.kind == TokenKind::Word
    }

    pub fn is_punct(&self, c: char) -> bool {
        self.kind == TokenKind::Punct(c)
    }

    pub fn is_open_bracket(&self) -> bool {
        matches!(self.kind, TokenKind::Punct('(' | '[' | '{'))
    }

    pub fn is_close_bracket(&self) -> bool {
        matches!(self.kind, TokenKind::Punct(')' | ']' | '}'))
    }

    pub fn literal(&self) -> Option<&Literal> {
        match &self.kind {
            TokenKind::Str(lit) => Some(lit),
            _ => None,
        }
    }

    /// Symbol name without its leading colon.
    pub fn symbol<'s>(&self, source: &'s str) -> Option<&'s str> {
        match self.kind {
            TokenKind::Symbol => Some(&source[self.start + 1..self.end]),
            _ => None,
        }
    }

    /// Literal value, symbol name, or word text.
    pub fn value<'a>(&'a self, source: &'a str) -> &'a str {
        match &self.kind {
            TokenKind::Str(lit) => &lit.value,
            TokenKind::Symbol => &source[self.start + 1..self.end],
            _ => self.text(source),
        }
    }
}

fn is_word_start(c: char) -> bool {
    c.is_alphanumeric() || c == '_' || c == '$'
}

fn is_word_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_' || c == '$'
}

pub struct Tokenizer<'p> {
    syntax: &'p LexicalSyntax,
}

impl<'p> Tokenizer<'p> {
    pub fn new(syntax: &'p LexicalSyntax) -> Self {
        Self { syntax }
    }

    /// Tokens of every code and string span, in source order.
    pub fn tokenize(&self, text: &str, classification: &Classification, lines: &LineIndex) -> Vec<Token> {
        let mut out = Vec::new();
        for span in &classification.spans {
            match span.kind {
                SpanKind::Code => self.lex_code(text, span.start, span.end, lines, &mut out),
                SpanKind::String => self.push_string(text, span, lines, &mut out),
                SpanKind::Comment => {}
            }
        }
        out
    }

    /// Tokens inside a documentation comment body, with the leading `*`
    /// gutter of each line dropped.
    pub fn tokenize_doc(
        &self,
        text: &str,
        span: &Span,
        open_len: usize,
        close_len: usize,
        lines: &LineIndex,
    ) -> Vec<Token> {
        let start = (span.start + open_len).min(span.end);
        let end = if span.terminated {
            span.end.saturating_sub(close_len).max(start)
        } else {
            span.end
        };
        let inner = LexicalClassifier::new(self.syntax).classify_strings(text, start, end, lines);
        let mut raw = Vec::new();
        for s in &inner.spans {
            match s.kind {
                SpanKind::String => self.push_string(text, s, lines, &mut raw),
                _ => self.lex_code(text, s.start, s.end, lines, &mut raw),
            }
        }
        if let Some(first) = raw.first_mut() {
            first.newline_before = true;
        }

        let mut out: Vec<Token> = Vec::with_capacity(raw.len());
        let mut carry = false;
        for mut token in raw {
            if token.newline_before && token.is_punct('*') {
                carry = true;
                continue;
            }
            if carry {
                token.newline_before = true;
                carry = false;
            }
            out.push(token);
        }
        out
    }

    fn push(&self, text: &str, out: &mut Vec<Token>, mut token: Token) {
        token.newline_before = match out.last() {
            None => true,
            Some(prev) => text[prev.end..token.start].contains('\n'),
        };
        out.push(token);
    }

    fn lex_code(&self, text: &str, start: usize, end: usize, lines: &LineIndex, out: &mut Vec<Token>) {
        let slice = &text[start..end];
        let mut iter = slice.char_indices().peekable();
        while let Some((rel, c)) = iter.next() {
            let at = start + rel;
            if c.is_whitespace() {
                continue;
            }
            if is_word_start(c) {
                let mut stop = at + c.len_utf8();
                while let Some(&(r, n)) = iter.peek() {
                    if !is_word_char(n) {
                        break;
                    }
                    stop = start + r + n.len_utf8();
                    iter.next();
                }
                self.push(text, out, Token {
                    kind: TokenKind::Word,
                    start: at,
                    end: stop,
                    line: lines.line_of(at),
                    newline_before: false,
                });
                continue;
            }
            if c == ':' && self.syntax.symbols && self.symbol_can_start(text, at) {
                if let Some(&(r, n)) = iter.peek() {
                    if n.is_alphabetic() || n == '_' {
                        let mut stop = start + r + n.len_utf8();
                        iter.next();
                        while let Some(&(r, n)) = iter.peek() {
                            if !(is_word_char(n) || n == '?' || n == '!') {
                                break;
                            }
                            stop = start + r + n.len_utf8();
                            iter.next();
                        }
                        self.push(text, out, Token {
                            kind: TokenKind::Symbol,
                            start: at,
                            end: stop,
                            line: lines.line_of(at),
                            newline_before: false,
                        });
                        continue;
                    }
                }
            }
            self.push(text, out, Token {
                kind: TokenKind::Punct(c),
                start: at,
                end: at + c.len_utf8(),
                line: lines.line_of(at),
                newline_before: false,
            });
        }
    }

    fn symbol_can_start(&self, text: &str, at: usize) -> bool {
        match text[..at].chars().next_back() {
            None => true,
            Some(prev) => prev != ':' && !is_word_char(prev),
        }
    }

    fn push_string(&self, text: &str, span: &Span, lines: &LineIndex, out: &mut Vec<Token>) {
        let Some(delim) = span
            .delimiter
            .and_then(|d| self.syntax.strings.get(d as usize))
        else {
            return;
        };
        let content_start = (span.start + delim.open.len()).min(span.end);
        let content_end = if span.terminated {
            span.end.saturating_sub(delim.close.len()).max(content_start)
        } else {
            span.end
        };
        let value = text[content_start..content_end].to_string();

        let mut start = span.start;
        let mut markers: Vec<&str> = delim.interpolation.iter().map(String::as_str).collect();
        if let Some(prev) = out.last() {
            if prev.is_word() && prev.end == span.start {
                let word = prev.text(text);
                if let Some(prefix) = self.syntax.string_prefixes.iter().find(|p| p.prefix == word) {
                    start = prev.start;
                    markers.extend(prefix.interpolation.iter().map(String::as_str));
                    out.pop();
                }
            }
        }
        let dynamic_at = markers
            .iter()
            .filter_map(|m| find_unescaped(&value, m, delim.escape))
            .min();

        self.push(text, out, Token {
            kind: TokenKind::Str(Literal { value, dynamic_at }),
            start,
            end: span.end,
            line: lines.line_of(start),
            newline_before: false,
        });
    }
}

fn find_unescaped(value: &str, marker: &str, escape: Option<char>) -> Option<usize> {
    let mut from = 0;
    while let Some(pos) = value[from..].find(marker) {
        let at = from + pos;
        let escaped = escape.is_some_and(|e| value[..at].ends_with(e));
        if !escaped {
            return Some(at);
        }
        from = at + marker.len();
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::profiles::{StringDelimiter, StringPrefix};

    fn python() -> LexicalSyntax {
        LexicalSyntax {
            line_comments: vec!["#".into()],
            strings: vec![StringDelimiter {
                open: "'".into(),
                close: "'".into(),
                escape: Some('\\'),
                multiline: false,
                interpolation: vec![],
            }],
            string_prefixes: vec![
                StringPrefix {
                    prefix: "r".into(),
                    interpolation: vec![],
                },
                StringPrefix {
                    prefix: "f".into(),
                    interpolation: vec!["{".into()],
                },
            ],
            ..Default::default()
        }
    }

    fn tokens(text: &str, syntax: &LexicalSyntax) -> Vec<Token> {
        let lines = LineIndex::new(text);
        let c = LexicalClassifier::new(syntax).classify(text, &lines);
        Tokenizer::new(syntax).tokenize(text, &c, &lines)
    }

    #[test]
    fn test_words_puncts_and_literals() {
        let syntax = python();
        let text = "router.get('/a') # get('/b')\nx";
        let toks = tokens(text, &syntax);
        let shapes: Vec<String> = toks
            .iter()
            .map(|t| match &t.kind {
                TokenKind::Word => t.text(text).to_string(),
                TokenKind::Punct(c) => c.to_string(),
                TokenKind::Str(l) => format!("<{}>", l.value),
                TokenKind::Symbol => format!("sym {}", t.text(text)),
            })
            .collect();
        assert_eq!(shapes, vec!["router", ".", "get", "(", "</a>", ")", "x"]);
        assert!(toks[0].newline_before);
        assert!(!toks[1].newline_before);
        assert!(toks[6].newline_before);
        assert_eq!(toks[6].line, 2);
    }

    #[test]
    fn test_string_prefix_merges_and_marks_interpolation() {
        let syntax = python();
        let toks = tokens("r'^a$' f'/u/{id}'", &syntax);
        assert_eq!(toks.len(), 2);
        assert_eq!(toks[0].literal().unwrap().value, "^a$");
        assert_eq!(toks[0].literal().unwrap().dynamic_at, None);
        assert_eq!(toks[0].start, 0);
        let f = toks[1].literal().unwrap();
        assert_eq!(f.value, "/u/{id}");
        assert_eq!(f.dynamic_at, Some(3));
    }

    #[test]
    fn test_symbols() {
        let syntax = LexicalSyntax {
            symbols: true,
            ..python()
        };
        let text = "resources :users, only: [:index]\nA::B";
        let toks = tokens(text, &syntax);
        let syms: Vec<&str> = toks.iter().filter_map(|t| t.symbol(text)).collect();
        assert_eq!(syms, vec!["users", "index"]);
        assert!(toks.iter().any(|t| t.text(text) == "only"));
        assert!(toks.iter().filter(|t| t.is_punct(':')).count() >= 3);
    }

    #[test]
    fn test_doc_tokens_drop_gutter() {
        let syntax = LexicalSyntax {
            doc_comments: vec![crate::profiles::Delimiter {
                open: "/**".into(),
                close: "*/".into(),
                line_start: false,
            }],
            strings: vec![StringDelimiter {
                open: "\"".into(),
                close: "\"".into(),
                escape: Some('\\'),
                multiline: false,
                interpolation: vec![],
            }],
            ..Default::default()
        };
        let text = "/**\n * Lists.\n * @Route(\"/a\")\n */";
        let lines = LineIndex::new(text);
        let c = LexicalClassifier::new(&syntax).classify(text, &lines);
        let toks = Tokenizer::new(&syntax).tokenize_doc(text, &c.spans[0], 3, 2, &lines);
        let at = toks.iter().position(|t| t.is_punct('@')).unwrap();
        assert!(toks[at].newline_before);
        assert_eq!(toks[at].line, 3);
        assert_eq!(toks[at + 3].literal().unwrap().value, "/a");
        assert!(!toks.iter().any(|t| t.is_punct('*')));
    }
}

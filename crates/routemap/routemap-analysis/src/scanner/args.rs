//! Argument lists: bracket-balanced extent, top-level splitting, keyword
//! detection, and static literal extraction.

use smallvec::SmallVec;

use super::token::{Token, TokenKind};
use crate::http::canonical_method;
use crate::profiles::LexicalSyntax;

/// Why assembly of a declaration stopped early.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Abort {
    /// Per-declaration ceiling or unbalanced brackets; skip this declaration.
    Declaration,
    /// File-level iteration budget exhausted; stop scanning.
    File,
}

/// Step accounting shared by everything that walks tokens.
#[derive(Debug, Clone)]
pub struct Budget {
    pub steps: u64,
    pub limit: u64,
    pub per_declaration: u32,
    pub max_depth: u32,
}

impl Budget {
    pub fn new(limit: u64, per_declaration: u32, max_depth: u32) -> Self {
        Self {
            steps: 0,
            limit,
            per_declaration,
            max_depth,
        }
    }

    pub fn exhausted(&self) -> bool {
        self.steps > self.limit
    }

    /// Charge one step to the file and to the current declaration.
    pub fn tick(&mut self, local: &mut u32) -> Result<(), Abort> {
        self.steps += 1;
        *local += 1;
        if self.steps > self.limit {
            return Err(Abort::File);
        }
        if *local > self.per_declaration {
            return Err(Abort::Declaration);
        }
        Ok(())
    }
}

/// One top-level argument: token range `[start, end)` of its value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Arg {
    pub key: Option<String>,
    /// Token holding the key, when there is one.
    pub key_token: Option<usize>,
    pub start: usize,
    pub end: usize,
}

impl Arg {
    pub fn is_empty(&self) -> bool {
        self.start >= self.end
    }
}

/// Statically extracted value of an argument.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PathValue {
    Static(String),
    /// Literal prefix of an expression whose tail is dynamic.
    Partial(String),
    /// Nothing literal; carries the source text.
    Dynamic(String),
}

/// Read-only view used by the parsing helpers.
#[derive(Clone, Copy)]
pub struct ArgReader<'t> {
    pub tokens: &'t [Token],
    pub text: &'t str,
    pub syntax: &'t LexicalSyntax,
}

impl<'t> ArgReader<'t> {
    pub fn new(tokens: &'t [Token], text: &'t str, syntax: &'t LexicalSyntax) -> Self {
        Self {
            tokens,
            text,
            syntax,
        }
    }

    /// Index of the bracket matching the opener at `open`, walking nested
    /// brackets of any shape.
    pub fn matching(&self, open: usize, budget: &mut Budget, local: &mut u32) -> Result<usize, Abort> {
        let mut depth: u32 = 0;
        let mut idx = open;
        while idx < self.tokens.len() {
            budget.tick(local)?;
            let token = &self.tokens[idx];
            if token.is_open_bracket() {
                depth += 1;
                if depth > budget.max_depth {
                    return Err(Abort::Declaration);
                }
            } else if token.is_close_bracket() {
                depth = depth.saturating_sub(1);
                if depth == 0 {
                    return Ok(idx);
                }
            }
            idx += 1;
        }
        Err(Abort::Declaration)
    }

    /// Parenthesized argument list starting at `open`. Returns the closing
    /// token index and the arguments.
    pub fn parse_parens(
        &self,
        open: usize,
        budget: &mut Budget,
        local: &mut u32,
    ) -> Result<(usize, Vec<Arg>), Abort> {
        let close = self.matching(open, budget, local)?;
        Ok((close, self.split(open + 1, close)))
    }

    /// Paren-less arguments from `from` to the end of the statement: a
    /// newline not preceded by a comma, `;`, a block opener, or an unmatched
    /// closer. Returns the last token index consumed (or `from - 1`).
    pub fn parse_bare(
        &self,
        from: usize,
        budget: &mut Budget,
        local: &mut u32,
        block_openers: &dyn Fn(usize) -> bool,
    ) -> Result<(Option<usize>, Vec<Arg>), Abort> {
        let mut depth: u32 = 0;
        let mut idx = from;
        let mut last = None;
        while idx < self.tokens.len() {
            budget.tick(local)?;
            let token = &self.tokens[idx];
            if depth == 0 {
                if token.newline_before {
                    let continued = last.is_some_and(|l: usize| {
                        matches!(self.tokens[l].kind, TokenKind::Punct(',' | '\\'))
                    });
                    if !continued {
                        break;
                    }
                }
                if token.is_punct(';') || token.is_close_bracket() {
                    break;
                }
                if block_openers(idx) {
                    let hash_literal = token.is_punct('{')
                        && last.is_some_and(|l: usize| {
                            matches!(
                                self.tokens[l].kind,
                                TokenKind::Punct(',' | ':' | '(' | '[' | '=' | '>')
                            )
                        });
                    if !hash_literal {
                        break;
                    }
                }
            }
            if token.is_open_bracket() {
                depth += 1;
                if depth > budget.max_depth {
                    return Err(Abort::Declaration);
                }
            } else if token.is_close_bracket() {
                depth = depth.saturating_sub(1);
            }
            last = Some(idx);
            idx += 1;
        }
        let args = match last {
            Some(l) => self.split(from, l + 1),
            None => Vec::new(),
        };
        Ok((last, args))
    }

    /// Attributes of a markup element from `from` up to its closing `>`:
    /// `name="value"` and `name={expression}` pairs, the latter without the
    /// braces. Valueless attributes are skipped. Returns the index of the
    /// `>` and the attributes as keyed arguments.
    pub fn parse_element(
        &self,
        from: usize,
        budget: &mut Budget,
        local: &mut u32,
    ) -> Result<(usize, Vec<Arg>), Abort> {
        let mut args = Vec::new();
        let mut idx = from;
        while idx < self.tokens.len() {
            budget.tick(local)?;
            let token = &self.tokens[idx];
            if token.is_punct('>') {
                return Ok((idx, args));
            }
            if token.is_punct('<') {
                break;
            }
            if token.is_word() && self.punct_at(idx + 1, '=') && idx + 2 < self.tokens.len() {
                let value = idx + 2;
                let (start, end, next) = if self.tokens[value].is_punct('{') {
                    let close = self.matching(value, budget, local)?;
                    (value + 1, close, close + 1)
                } else {
                    (value, value + 1, value + 1)
                };
                args.push(Arg {
                    key: Some(token.text(self.text).to_string()),
                    key_token: Some(idx),
                    start,
                    end,
                });
                idx = next;
                continue;
            }
            idx += 1;
        }
        Err(Abort::Declaration)
    }

    /// Split `[start, end)` at top-level commas.
    pub fn split(&self, start: usize, end: usize) -> Vec<Arg> {
        let mut args = Vec::new();
        let mut depth: u32 = 0;
        let mut piece = start;
        for idx in start..end {
            let token = &self.tokens[idx];
            if token.is_open_bracket() {
                depth += 1;
            } else if token.is_close_bracket() {
                depth = depth.saturating_sub(1);
            } else if depth == 0 && token.is_punct(',') {
                if piece < idx {
                    args.push(self.keyed(piece, idx));
                }
                piece = idx + 1;
            }
        }
        if piece < end {
            args.push(self.keyed(piece, end));
        }
        args
    }

    fn adjacent(&self, a: usize, b: usize) -> bool {
        self.tokens[a].end == self.tokens[b].start
    }

    fn punct_at(&self, idx: usize, c: char) -> bool {
        idx < self.tokens.len() && self.tokens[idx].is_punct(c)
    }

    /// Detect `key=`, `key:`, `'key' =>`, `:key =>` at the head of an argument.
    fn keyed(&self, start: usize, end: usize) -> Arg {
        let first = &self.tokens[start];
        if end >= start + 2 {
            let arrow = self.punct_at(start + 1, '=')
                && self.punct_at(start + 2, '>')
                && self.adjacent(start + 1, start + 2);
            match &first.kind {
                TokenKind::Word if self.punct_at(start + 1, '=') && !arrow => {
                    let doubled = self.punct_at(start + 2, '=') && self.adjacent(start + 1, start + 2);
                    if !doubled {
                        return Arg {
                            key: Some(first.text(self.text).to_string()),
                            key_token: Some(start),
                            start: start + 2,
                            end,
                        };
                    }
                }
                TokenKind::Word if self.punct_at(start + 1, ':') && self.adjacent(start, start + 1) => {
                    let path_sep = self.punct_at(start + 2, ':') && self.adjacent(start + 1, start + 2);
                    if !path_sep {
                        return Arg {
                            key: Some(first.text(self.text).to_string()),
                            key_token: Some(start),
                            start: start + 2,
                            end,
                        };
                    }
                }
                TokenKind::Str(_) | TokenKind::Symbol if arrow => {
                    return Arg {
                        key: Some(first.value(self.text).to_string()),
                        key_token: Some(start),
                        start: start + 3,
                        end,
                    };
                }
                _ => {}
            }
        }
        Arg {
            key: None,
            key_token: None,
            start,
            end,
        }
    }

    pub fn positional<'a>(&self, args: &'a [Arg], position: usize) -> Option<&'a Arg> {
        args.iter().filter(|a| a.key.is_none()).nth(position)
    }

    /// Keyword arguments named in `keys`, including those nested one level
    /// inside a positional array or object (`['prefix' => 'admin']`).
    pub fn keyed_args(&self, args: &[Arg], keys: &[String]) -> Vec<Arg> {
        if keys.is_empty() {
            return Vec::new();
        }
        let wanted = |a: &Arg| a.key.as_ref().is_some_and(|k| keys.iter().any(|w| w == k));
        let mut found: Vec<Arg> = args.iter().filter(|a| wanted(a)).cloned().collect();
        if found.is_empty() {
            for arg in args.iter().filter(|a| a.key.is_none()) {
                if let Some((open, close)) = self.wrapped(arg) {
                    found.extend(self.split(open + 1, close).into_iter().filter(|a| wanted(a)));
                }
            }
        }
        found
    }

    /// Bracket pair enclosing the whole argument, if any.
    fn wrapped(&self, arg: &Arg) -> Option<(usize, usize)> {
        if arg.is_empty() {
            return None;
        }
        let open = &self.tokens[arg.start];
        if !matches!(open.kind, TokenKind::Punct('[' | '{')) {
            return None;
        }
        let mut depth: u32 = 0;
        for idx in arg.start..arg.end {
            let token = &self.tokens[idx];
            if token.is_open_bracket() {
                depth += 1;
            } else if token.is_close_bracket() {
                depth = depth.saturating_sub(1);
                if depth == 0 {
                    return (idx + 1 == arg.end).then_some((arg.start, idx));
                }
            }
        }
        None
    }

    /// Values of an argument; an array or object literal yields one value
    /// per element.
    pub fn values(&self, arg: &Arg) -> SmallVec<[PathValue; 1]> {
        let mut out = SmallVec::new();
        if let Some((open, close)) = self.wrapped(arg) {
            for element in self.split(open + 1, close) {
                out.push(self.literal(element.start, element.end));
            }
            if out.is_empty() {
                out.push(PathValue::Dynamic(self.source(arg.start, arg.end)));
            }
        } else {
            out.push(self.literal(arg.start, arg.end));
        }
        out
    }

    /// Fold literals joined by concatenation into a static value, keeping
    /// the literal prefix when a dynamic operand appears.
    pub fn literal(&self, start: usize, end: usize) -> PathValue {
        let mut acc = String::new();
        let mut any = false;
        let mut expect_operand = true;
        let mut idx = start;
        while idx < end {
            let token = &self.tokens[idx];
            match &token.kind {
                TokenKind::Str(lit) if expect_operand || self.syntax.implicit_concat => {
                    if let Some(at) = lit.dynamic_at {
                        acc.push_str(&lit.value[..at]);
                        return self.partial(acc, start, end);
                    }
                    acc.push_str(&lit.value);
                    any = true;
                    expect_operand = false;
                    idx += 1;
                }
                TokenKind::Symbol if expect_operand => {
                    acc.push_str(token.value(self.text));
                    any = true;
                    expect_operand = false;
                    idx += 1;
                }
                TokenKind::Punct(_) if !expect_operand => match self.concat_operator(idx, end) {
                    Some(len) => {
                        expect_operand = true;
                        idx += len;
                    }
                    None => return self.partial(acc, start, end),
                },
                _ => return self.partial(acc, start, end),
            }
        }
        if any && !expect_operand {
            PathValue::Static(acc)
        } else {
            self.partial(acc, start, end)
        }
    }

    fn partial(&self, acc: String, start: usize, end: usize) -> PathValue {
        if acc.is_empty() {
            PathValue::Dynamic(self.source(start, end))
        } else {
            PathValue::Partial(acc)
        }
    }

    /// Length in tokens of a concatenation operator at `idx`.
    fn concat_operator(&self, idx: usize, end: usize) -> Option<usize> {
        'ops: for op in &self.syntax.concat_operators {
            let mut k = idx;
            for (n, c) in op.chars().enumerate() {
                if k >= end || !self.tokens[k].is_punct(c) || (n > 0 && !self.adjacent(k - 1, k)) {
                    continue 'ops;
                }
                k += 1;
            }
            return Some(k - idx);
        }
        None
    }

    /// Source text of `[start, end)`, shortened for diagnostics.
    pub fn source(&self, start: usize, end: usize) -> String {
        if start >= end {
            return String::new();
        }
        let text = &self.text[self.tokens[start].start..self.tokens[end - 1].end];
        let mut out: String = text.split_whitespace().collect::<Vec<_>>().join(" ");
        if out.len() > 80 {
            let mut cut = 77;
            while !out.is_char_boundary(cut) {
                cut -= 1;
            }
            out.truncate(cut);
            out.push_str("...");
        }
        out
    }

    /// Every method named anywhere inside the argument.
    pub fn methods(&self, arg: &Arg, out: &mut Vec<&'static str>) {
        for token in &self.tokens[arg.start..arg.end] {
            let word = match &token.kind {
                TokenKind::Word | TokenKind::Symbol => token.value(self.text),
                TokenKind::Str(lit) => lit.value.as_str(),
                TokenKind::Punct(_) => continue,
            };
            if let Some(method) = canonical_method(word) {
                if !out.contains(&method) {
                    out.push(method);
                }
            }
        }
    }

    /// Words and literal values inside the argument (`only: [:index, :show]`).
    pub fn names(&self, arg: &Arg) -> Vec<String> {
        self.tokens[arg.start..arg.end]
            .iter()
            .filter(|t| !matches!(t.kind, TokenKind::Punct(_)))
            .map(|t| t.value(self.text).to_string())
            .collect()
    }

    /// Tag name of a markup element value (`<Home />`).
    pub fn element_name(&self, arg: &Arg) -> Option<String> {
        let open = self.tokens.get(arg.start)?;
        let name = self.tokens.get(arg.start + 1)?;
        (arg.end > arg.start + 1 && open.is_punct('<') && name.is_word() && open.end == name.start)
            .then(|| name.text(self.text).to_string())
    }

    /// Text of a plain reference (`views.detail`, `Users::index`, `show`).
    pub fn reference(&self, arg: &Arg) -> Option<String> {
        if arg.is_empty() {
            return None;
        }
        let tokens = &self.tokens[arg.start..arg.end];
        let plain = tokens.iter().enumerate().all(|(n, t)| match t.kind {
            TokenKind::Word => true,
            TokenKind::Punct('.' | ':' | '#') => n > 0 && n + 1 < tokens.len(),
            TokenKind::Punct('>') | TokenKind::Punct('-') => n > 0 && n + 1 < tokens.len(),
            _ => false,
        });
        let first_is_word = tokens.first().is_some_and(Token::is_word);
        (plain && first_is_word).then(|| self.source(arg.start, arg.end).replace(' ', ""))
    }
}

//! Local names bound to route registrars, tracked per lexical block.
//!
//! A binding is visible from its declaration to the end of its block. A
//! later non-routing declaration of the same name in an inner block shadows
//! it there without affecting the outer block.

use smallvec::SmallVec;

use routemap_core::types::collections::FxHashMap;

use crate::profiles::{EcosystemProfile, Role};
use crate::scanner::blocks::{BlockId, BlockTree};
use crate::scanner::token::{Token, TokenKind};

/// Words that take a parenthesized head but declare no parameters.
const CONTROL_KEYWORDS: &[&str] = &["if", "while", "for", "switch", "with"];

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AliasRole {
    /// Calls register an endpoint with this method through `pattern`.
    Verb { method: String, pattern: usize },
    /// Calls create a router through `pattern`.
    RouterFactory { pattern: usize },
    /// Bound to something unrelated; hides outer bindings.
    Shadowed,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AliasBinding {
    pub local_name: String,
    pub original: String,
    pub role: AliasRole,
    pub block: BlockId,
    /// Token index of the declaration.
    pub token: usize,
}

#[derive(Debug, Clone, Default)]
pub struct AliasResolver {
    bindings: Vec<AliasBinding>,
    by_name: FxHashMap<String, SmallVec<[usize; 2]>>,
}

/// Inputs the resolver needs while observing declarations.
pub struct BindingContext<'a> {
    pub tokens: &'a [Token],
    pub text: &'a str,
    pub blocks: &'a BlockTree,
    pub profile: &'a EcosystemProfile,
}

impl AliasResolver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn bind(&mut self, binding: AliasBinding) {
        let id = self.bindings.len();
        self.by_name
            .entry(binding.local_name.clone())
            .or_default()
            .push(id);
        self.bindings.push(binding);
    }

    /// Routing binding visible for `name` at token `at`, if any.
    pub fn resolve(&self, name: &str, at: usize, blocks: &BlockTree) -> Option<&AliasBinding> {
        let ids = self.by_name.get(name)?;
        for block in blocks.ancestors(blocks.enclosing(at)) {
            let hit = ids
                .iter()
                .rev()
                .map(|&id| &self.bindings[id])
                .find(|b| b.block == block && b.token < at);
            if let Some(binding) = hit {
                return match binding.role {
                    AliasRole::Shadowed => None,
                    _ => Some(binding),
                };
            }
        }
        None
    }

    /// Record bindings introduced by a declaration starting at token `i`.
    /// `is_source` says whether an identifier yields registrars when
    /// destructured (a receiver, router variable, or module import).
    pub fn observe(&mut self, cx: &BindingContext<'_>, i: usize, is_source: &dyn Fn(&str) -> bool) {
        let tokens = cx.tokens;
        let Some(token) = tokens.get(i) else {
            return;
        };
        let syntax = &cx.profile.bindings;
        if let Some(body) = cx.blocks.opened_at(i) {
            if token.is_punct('{') && !syntax.declaration_keywords.is_empty() {
                self.observe_params(cx, i, body);
            }
        }
        if !token.is_word() {
            return;
        }
        let word = token.text(cx.text);
        let keyword = syntax.declaration_keywords.iter().any(|k| k == word);

        if keyword {
            if let (Some(open), Some(close)) = (syntax.destructure_open, syntax.destructure_close) {
                if tokens.get(i + 1).is_some_and(|t| t.is_punct(open)) {
                    self.observe_destructure(cx, i, i + 1, open, close, is_source);
                    return;
                }
            }
            if tokens.get(i + 1).is_some_and(Token::is_word) {
                self.observe_simple(cx, i, i + 1, is_source);
            }
        } else if syntax.declaration_keywords.is_empty() && token.newline_before {
            self.observe_simple(cx, i, i, is_source);
        }
    }

    /// Parameters of `function f(a, b) {`, `(a, b) => {` and `a => {` hide
    /// outer bindings of the same names inside the body opened at `brace`.
    fn observe_params(&mut self, cx: &BindingContext<'_>, brace: usize, body: BlockId) {
        let tokens = cx.tokens;
        if brace < 2 {
            return;
        }
        let arrow = tokens[brace - 1].is_punct('>')
            && tokens[brace - 2].is_punct('=')
            && tokens[brace - 2].end == tokens[brace - 1].start;
        let last = if arrow { brace.wrapping_sub(3) } else { brace - 1 };
        let Some(end) = tokens.get(last) else {
            return;
        };
        let mut names: SmallVec<[&str; 4]> = SmallVec::new();
        if end.is_punct(')') {
            let mut depth = 0u32;
            let mut open = None;
            for k in (0..=last).rev() {
                if tokens[k].is_punct(')') {
                    depth += 1;
                } else if tokens[k].is_punct('(') {
                    depth = depth.saturating_sub(1);
                    if depth == 0 {
                        open = Some(k);
                        break;
                    }
                }
            }
            let Some(open) = open else {
                return;
            };
            let control = open > 0
                && tokens[open - 1].is_word()
                && CONTROL_KEYWORDS.contains(&tokens[open - 1].text(cx.text));
            if control {
                return;
            }
            let mut depth = 0u32;
            let mut entry_start = true;
            for token in &tokens[open + 1..last] {
                if token.is_open_bracket() {
                    depth += 1;
                } else if token.is_close_bracket() {
                    depth = depth.saturating_sub(1);
                } else if depth == 0 && token.is_punct(',') {
                    entry_start = true;
                    continue;
                }
                if depth == 0 && entry_start && token.is_word() {
                    names.push(token.text(cx.text));
                    entry_start = false;
                } else if !token.is_punct('.') {
                    entry_start = false;
                }
            }
        } else if arrow && end.is_word() {
            names.push(end.text(cx.text));
        }
        for name in names {
            // Only a name that is already bound can be hidden.
            if !self.by_name.contains_key(name) {
                continue;
            }
            self.bind(AliasBinding {
                local_name: name.to_string(),
                original: name.to_string(),
                role: AliasRole::Shadowed,
                block: body,
                token: brace,
            });
        }
    }

    fn observe_simple(&mut self, cx: &BindingContext<'_>, decl: usize, name: usize, is_source: &dyn Fn(&str) -> bool) {
        let tokens = cx.tokens;
        let Some(rhs) = assignment_end(cx, name + 1) else {
            return;
        };
        let local = tokens[name].text(cx.text).to_string();
        // `recv.verb` without a call, optionally followed by `.bind(...)`.
        let role = match (tokens.get(rhs), tokens.get(rhs + 1), tokens.get(rhs + 2)) {
            (Some(recv), Some(dot), Some(member))
                if recv.is_word() && dot.is_punct('.') && member.is_word() && is_source(recv.text(cx.text)) =>
            {
                let called = tokens.get(rhs + 3).is_some_and(|t| t.is_punct('('));
                if called {
                    AliasRole::Shadowed
                } else {
                    self.role_of(cx, member.text(cx.text))
                }
            }
            _ => AliasRole::Shadowed,
        };
        let original = match role {
            AliasRole::Shadowed => local.clone(),
            _ => tokens[rhs + 2].text(cx.text).to_string(),
        };
        self.bind(AliasBinding {
            local_name: local,
            original,
            role,
            block: cx.blocks.enclosing(decl),
            token: decl,
        });
    }

    fn observe_destructure(
        &mut self,
        cx: &BindingContext<'_>,
        decl: usize,
        open_idx: usize,
        open: char,
        close: char,
        is_source: &dyn Fn(&str) -> bool,
    ) {
        let tokens = cx.tokens;
        let mut depth = 0u32;
        let mut close_idx = None;
        for (k, token) in tokens.iter().enumerate().skip(open_idx) {
            if token.is_punct(open) {
                depth += 1;
            } else if token.is_punct(close) {
                depth = depth.saturating_sub(1);
                if depth == 0 {
                    close_idx = Some(k);
                    break;
                }
            }
        }
        let Some(close_idx) = close_idx else {
            return;
        };
        let Some(rhs) = assignment_end(cx, close_idx + 1) else {
            return;
        };
        let routing = self.rhs_is_source(cx, rhs, is_source);
        let block = cx.blocks.enclosing(decl);

        for (original, local) in destructured_names(cx, open_idx + 1, close_idx, open, close) {
            let role = if routing {
                self.role_of(cx, &original)
            } else {
                AliasRole::Shadowed
            };
            self.bind(AliasBinding {
                local_name: local,
                original,
                role,
                block,
                token: decl,
            });
        }
    }

    /// `router`, `this.app`, `require('express')`, `express`.
    fn rhs_is_source(&self, cx: &BindingContext<'_>, rhs: usize, is_source: &dyn Fn(&str) -> bool) -> bool {
        let tokens = cx.tokens;
        let mut k = rhs;
        while let Some(token) = tokens.get(k) {
            if !token.is_word() {
                return false;
            }
            let word = token.text(cx.text);
            if is_source(word) || cx.profile.bindings.alias_sources.iter().any(|s| s == word) {
                return true;
            }
            if tokens.get(k + 1).is_some_and(|t| t.is_punct('.')) {
                k += 2;
            } else {
                return false;
            }
        }
        false
    }

    fn role_of(&self, cx: &BindingContext<'_>, original: &str) -> AliasRole {
        let profile = cx.profile;
        let Some(&pattern) = profile.index.aliasable.get(original) else {
            return AliasRole::Shadowed;
        };
        let route = &profile.routes[pattern];
        match route.role {
            Role::RouterFactory => AliasRole::RouterFactory { pattern },
            Role::Endpoint => match profile.verb_for_token(route, original) {
                Some(method) => AliasRole::Verb {
                    method: method.to_string(),
                    pattern,
                },
                None => AliasRole::Shadowed,
            },
            _ => AliasRole::Shadowed,
        }
    }
}

/// Index of the first right-hand-side token when an assignment operator
/// follows at `at`.
fn assignment_end(cx: &BindingContext<'_>, at: usize) -> Option<usize> {
    let tokens = cx.tokens;
    for op in &cx.profile.bindings.assignment_operators {
        let mut k = at;
        let mut ok = true;
        for (n, c) in op.chars().enumerate() {
            let adjacent = n == 0 || tokens.get(k).zip(tokens.get(k.wrapping_sub(1))).is_some_and(|(t, p)| p.end == t.start);
            if !tokens.get(k).is_some_and(|t| t.is_punct(c)) || !adjacent {
                ok = false;
                break;
            }
            k += 1;
        }
        if !ok {
            continue;
        }
        // Reject `==` and `=>`.
        let follow = tokens.get(k);
        let glued = follow.is_some_and(|t| {
            matches!(t.kind, TokenKind::Punct('=' | '>')) && tokens[k - 1].end == t.start
        });
        if !glued {
            return Some(k);
        }
    }
    None
}

/// `(original, local)` pairs inside a destructuring pattern. Nested
/// patterns are skipped; `...rest` binds `rest` to nothing routable.
fn destructured_names(
    cx: &BindingContext<'_>,
    start: usize,
    end: usize,
    open: char,
    close: char,
) -> Vec<(String, String)> {
    let tokens = cx.tokens;
    let mut out = Vec::new();
    let mut k = start;
    while k < end {
        // One entry runs to the next top-level comma.
        let mut stop = k;
        let mut depth = 0u32;
        while stop < end {
            let t = &tokens[stop];
            if t.is_punct(open) || t.is_open_bracket() {
                depth += 1;
            } else if t.is_punct(close) || t.is_close_bracket() {
                depth = depth.saturating_sub(1);
            } else if depth == 0 && t.is_punct(',') {
                break;
            }
            stop += 1;
        }
        let entry = &tokens[k..stop];
        let words: Vec<&Token> = entry.iter().take_while(|t| !t.is_punct('=')).collect();
        let spread = entry.first().is_some_and(|t| t.is_punct('.'));
        match words.as_slice() {
            [name] if name.is_word() => {
                let n = name.text(cx.text).to_string();
                out.push((n.clone(), n));
            }
            [orig, sep @ .., local]
                if orig.is_word() && local.is_word() && !spread && is_rename(cx, sep) =>
            {
                out.push((orig.text(cx.text).to_string(), local.text(cx.text).to_string()));
            }
            _ if spread => {
                if let Some(last) = entry.iter().rev().find(|t| t.is_word()) {
                    let n = last.text(cx.text).to_string();
                    out.push((n.clone(), n));
                }
            }
            _ => {}
        }
        k = stop + 1;
    }
    out
}

fn is_rename(cx: &BindingContext<'_>, sep: &[&Token]) -> bool {
    let text: String = sep.iter().map(|t| t.text(cx.text)).collect();
    cx.profile
        .bindings
        .rename_separators
        .iter()
        .any(|s| *s == text)
}

//! Pattern matching over the token stream.
//!
//! Tokens are visited in order. At each one the scanner tries, in turn, an
//! attribute sigil, a member call, a bare or aliased call, and a verb-named
//! method definition. A match assembles the full declaration (balanced
//! argument list, or a paren-less statement) and hands it to the handler
//! for the pattern's role. Scanning resumes at the next token, so a
//! declaration nested inside another's arguments is still found.

use smallvec::{smallvec, SmallVec};

use routemap_core::config::ScanConfig;
use routemap_core::errors::ScanError;
use routemap_core::types::collections::{FxHashMap, VerbList};

use super::args::{Abort, Arg, ArgReader, Budget, PathValue};
use super::blocks::BlockId;
use super::token::{Token, TokenKind};
use super::types::{
    ContainerRef, DeclarationCandidate, DiscardedCandidate, RawPath, ScanOutput, ScopeConstruct,
    ScopeKind,
};
use super::{DocBlock, SourceView};
use crate::alias::{AliasResolver, AliasRole, BindingContext};
use crate::http::{canonical_method, canonical_verb, ANY};
use crate::profiles::{
    CallStyle, EcosystemProfile, HandlerSource, Role, RoutePattern, Surface, VerbSource,
};
use crate::types::Confidence;

/// Ceilings applied while scanning one file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScanLimits {
    pub iteration_budget: u64,
    pub max_declaration_tokens: u32,
    pub max_bracket_depth: u32,
    pub wildcard: String,
}

impl ScanLimits {
    pub fn from_config(config: &ScanConfig) -> Self {
        Self {
            iteration_budget: config.effective_iteration_budget(),
            max_declaration_tokens: config.effective_max_declaration_tokens(),
            max_bracket_depth: config.effective_max_bracket_depth(),
            wildcard: config.effective_wildcard().to_string(),
        }
    }
}

impl Default for ScanLimits {
    fn default() -> Self {
        Self::from_config(&ScanConfig::default())
    }
}

/// Finds declaration candidates and scope constructs in one file.
pub struct DeclarationScanner<'p> {
    profile: &'p EcosystemProfile,
    limits: ScanLimits,
}

impl<'p> DeclarationScanner<'p> {
    /// Scanner for files of `profile`'s ecosystem under `limits`.
    pub fn new(profile: &'p EcosystemProfile, limits: ScanLimits) -> Self {
        Self { profile, limits }
    }

    /// Walk the code tokens, then the doc comments, of `view`.
    ///
    /// Candidates come back sorted by start offset. When the file budget
    /// runs out the output covers the tokens scanned so far and is marked
    /// partial.
    pub fn scan(&self, view: &SourceView<'_>) -> ScanOutput {
        let mut scan = Scan::new(view, self.profile, &self.limits);
        for i in 0..view.tokens.len() {
            if !scan.charge_token(i) {
                break;
            }
            scan.observe(i);
            scan.match_at(i);
            if scan.exhausted {
                break;
            }
        }
        if !scan.exhausted {
            for doc in &view.doc_blocks {
                scan.match_doc(doc);
                if scan.exhausted {
                    break;
                }
            }
        }
        scan.finish()
    }
}

/// A pattern head found at a token.
#[derive(Debug, Clone)]
struct Matched {
    pattern: usize,
    /// First token of the construct (sigil or receiver).
    head: usize,
    /// Token carrying the pattern name.
    name: usize,
    receiver: Option<usize>,
    /// Method forced by an alias binding.
    verb: Option<String>,
    /// Attribute closes with `]`.
    bracket: bool,
}

#[derive(Debug, Clone)]
struct Invocation {
    args: Vec<Arg>,
    /// Last token of the construct.
    end: usize,
}

struct ContainerInfo {
    name: Option<String>,
    body: BlockId,
    keyword: usize,
}

struct Scan<'s> {
    view: &'s SourceView<'s>,
    profile: &'s EcosystemProfile,
    limits: &'s ScanLimits,
    reader: ArgReader<'s>,
    budget: Budget,
    aliases: AliasResolver,
    /// Router variable name to the construct that created it.
    routers: FxHashMap<String, usize>,
    /// Declarations started so far.
    declarations: u32,
    /// Index of the declaration being assembled.
    current: u32,
    /// The file budget ran out.
    exhausted: bool,
    out: ScanOutput,
}

impl<'s> Scan<'s> {
    fn new(view: &'s SourceView<'s>, profile: &'s EcosystemProfile, limits: &'s ScanLimits) -> Self {
        Self {
            view,
            profile,
            limits,
            reader: ArgReader::new(&view.tokens, view.text, &profile.lexical),
            budget: Budget::new(
                limits.iteration_budget,
                limits.max_declaration_tokens,
                limits.max_bracket_depth,
            ),
            aliases: AliasResolver::new(),
            routers: FxHashMap::default(),
            declarations: 0,
            current: 0,
            exhausted: false,
            out: ScanOutput::default(),
        }
    }

    fn charge_token(&mut self, i: usize) -> bool {
        self.budget.steps += 1;
        if self.budget.exhausted() {
            self.exhaust(self.view.tokens[i].line);
            return false;
        }
        true
    }

    fn begin_declaration(&mut self) -> u32 {
        let id = self.declarations;
        self.declarations += 1;
        id
    }

    fn exhaust(&mut self, line: u32) {
        if self.exhausted {
            return;
        }
        self.exhausted = true;
        self.out.partial = true;
        tracing::warn!(
            line,
            limit = self.limits.iteration_budget,
            "iteration budget exhausted, returning partial results"
        );
        self.out.diagnostics.push(ScanError::AssemblyBudgetExceeded {
            line,
            limit: self.limits.iteration_budget,
        });
    }

    fn discard(&mut self, line: u32, offset: usize, pattern: &RoutePattern, reason: ScanError, confidence: Confidence) {
        tracing::debug!(line, pattern = %pattern.name, error = %reason, "declaration discarded");
        self.out.diagnostics.push(reason.clone());
        self.out.discarded.push(DiscardedCandidate {
            line,
            offset,
            pattern: pattern.name.clone(),
            reason,
            confidence,
        });
    }

    fn abort(&mut self, abort: Abort, line: u32, offset: usize, pattern: &RoutePattern) {
        match abort {
            Abort::Declaration => {
                let limit = u64::from(self.limits.max_declaration_tokens);
                tracing::warn!(line, limit, pattern = %pattern.name, "declaration abandoned at its ceiling");
                self.out.partial = true;
                let reason = ScanError::AssemblyBudgetExceeded { line, limit };
                self.discard(line, offset, pattern, reason, Confidence::BudgetExceeded);
            }
            Abort::File => self.exhaust(line),
        }
    }

    fn finish(mut self) -> ScanOutput {
        self.merge_clusters();
        self.out
            .candidates
            .sort_by_key(|c| c.start_offset);
        self.out.steps = self.budget.steps;
        self.out
    }

    // ---- bindings ----

    fn observe(&mut self, i: usize) {
        let view = self.view;
        let profile = self.profile;
        let cx = BindingContext {
            tokens: &view.tokens,
            text: view.text,
            blocks: &view.blocks,
            profile,
        };
        let routers = &self.routers;
        let is_source =
            |w: &str| routers.contains_key(w) || profile.receivers.iter().any(|r| r == w);
        self.aliases.observe(&cx, i, &is_source);
    }

    // ---- head matching ----

    fn match_at(&mut self, i: usize) {
        match self.view.tokens[i].kind {
            TokenKind::Punct(_) => {
                if !self.try_attribute(i) {
                    self.try_element(i);
                }
            }
            TokenKind::Word => {
                if !self.try_member_call(i) && !self.try_bare_call(i) && !self.try_property(i) {
                    self.try_definition(i);
                }
            }
            _ => {}
        }
    }

    fn try_attribute(&mut self, i: usize) -> bool {
        let view = self.view;
        let profile = self.profile;
        let tokens = &view.tokens;
        for sigil in &profile.index.attribute_sigils {
            let Some(name) = sigil_end(tokens, i, sigil) else {
                continue;
            };
            if sigil.starts_with('[') && !bracket_position(tokens, i) {
                continue;
            }
            // `(@Query() q, ...)` decorates a parameter.
            if i > 0 && matches!(tokens[i - 1].kind, TokenKind::Punct('(' | ',')) {
                return false;
            }
            let Some(word) = tokens.get(name).filter(|t| t.is_word()) else {
                continue;
            };
            if word.start != tokens[name - 1].end {
                continue;
            }
            let Some(list) = profile.index.attributes.get(word.text(view.text)) else {
                continue;
            };
            let Some(&pattern) = list
                .iter()
                .find(|&&p| profile.routes[p].sigils.iter().any(|s| s == sigil))
            else {
                continue;
            };
            return self.process(Matched {
                pattern,
                head: i,
                name,
                receiver: None,
                verb: None,
                bracket: sigil.ends_with('['),
            });
        }
        false
    }

    /// `<Token` opening a markup element. A `<` glued to a preceding word
    /// is a type argument list, not markup.
    fn try_element(&mut self, i: usize) -> bool {
        let view = self.view;
        let profile = self.profile;
        let tokens = &view.tokens;
        if profile.index.elements.is_empty() || !tokens[i].is_punct('<') {
            return false;
        }
        let generic = i > 0 && tokens[i - 1].is_word() && tokens[i - 1].end == tokens[i].start;
        if generic {
            return false;
        }
        let Some(word) = tokens.get(i + 1).filter(|t| t.is_word() && t.start == tokens[i].end) else {
            return false;
        };
        let Some(list) = profile.index.elements.get(word.text(view.text)) else {
            return false;
        };
        self.process(Matched {
            pattern: list[0],
            head: i,
            name: i + 1,
            receiver: None,
            verb: None,
            bracket: false,
        })
    }

    /// `token:` at the start of an entry of a brace-delimited object literal.
    fn try_property(&mut self, i: usize) -> bool {
        let view = self.view;
        let profile = self.profile;
        let tokens = &view.tokens;
        let Some(list) = profile.index.properties.get(tokens[i].text(view.text)) else {
            return false;
        };
        let keyed = tokens
            .get(i + 1)
            .is_some_and(|t| t.is_punct(':') && t.start == tokens[i].end);
        let entry_start = i > 0 && matches!(tokens[i - 1].kind, TokenKind::Punct('{' | ','));
        if !keyed || !entry_start {
            return false;
        }
        self.process(Matched {
            pattern: list[0],
            head: i,
            name: i,
            receiver: None,
            verb: None,
            bracket: false,
        })
    }

    fn try_member_call(&mut self, i: usize) -> bool {
        let view = self.view;
        let profile = self.profile;
        let tokens = &view.tokens;
        let receiver = tokens[i].text(view.text);
        for sep in &profile.index.separators {
            let Some(name) = sigil_end(tokens, i + 1, sep) else {
                continue;
            };
            let Some(word) = tokens.get(name).filter(|t| t.is_word()) else {
                continue;
            };
            let Some(list) = profile.index.member.get(word.text(view.text)) else {
                continue;
            };
            for &p in list {
                let pattern = &profile.routes[p];
                if !pattern.accepts_separator(sep) || !self.receiver_ok(pattern, receiver, i) {
                    continue;
                }
                if self.process(Matched {
                    pattern: p,
                    head: i,
                    name,
                    receiver: Some(i),
                    verb: None,
                    bracket: false,
                }) {
                    return true;
                }
            }
        }
        false
    }

    fn receiver_ok(&self, pattern: &RoutePattern, receiver: &str, at: usize) -> bool {
        if pattern.receivers.iter().any(|r| r == "*" || r == receiver) {
            return true;
        }
        if pattern.receivers.is_empty() && self.profile.receivers.iter().any(|r| r == receiver) {
            return true;
        }
        if self.routers.contains_key(receiver) {
            return true;
        }
        // Decorator position: `@anything.get(...)`.
        at > 0 && self.view.tokens[at - 1].is_punct('@')
    }

    fn try_bare_call(&mut self, i: usize) -> bool {
        let view = self.view;
        let profile = self.profile;
        if !self.bare_position(i) {
            return false;
        }
        let word = view.tokens[i].text(view.text);
        if let Some(list) = profile.index.bare.get(word) {
            for &pattern in list {
                if self.process(Matched {
                    pattern,
                    head: i,
                    name: i,
                    receiver: None,
                    verb: None,
                    bracket: false,
                }) {
                    return true;
                }
            }
            return false;
        }
        let role = self
            .aliases
            .resolve(word, i, &view.blocks)
            .map(|b| b.role.clone());
        match role {
            Some(AliasRole::Verb { method, pattern }) => self.process(Matched {
                pattern,
                head: i,
                name: i,
                receiver: None,
                verb: Some(method),
                bracket: false,
            }),
            Some(AliasRole::RouterFactory { pattern }) => self.process(Matched {
                pattern,
                head: i,
                name: i,
                receiver: None,
                verb: None,
                bracket: false,
            }),
            _ => false,
        }
    }

    /// Not a member access, a declaration name, or a decorator.
    fn bare_position(&self, i: usize) -> bool {
        let tokens = &self.view.tokens;
        if i == 0 || tokens[i].newline_before {
            return true;
        }
        let prev = &tokens[i - 1];
        match prev.kind {
            TokenKind::Punct('.' | '@' | '#' | '$') => false,
            TokenKind::Punct('>') => !(i >= 2 && tokens[i - 2].is_punct('-')),
            TokenKind::Punct(':') => !(i >= 2 && tokens[i - 2].is_punct(':')),
            TokenKind::Word => self.view.blocks.opened_at(i - 1).is_some(),
            _ => true,
        }
    }

    fn try_definition(&mut self, i: usize) -> bool {
        let view = self.view;
        let profile = self.profile;
        let tokens = &view.tokens;
        let Some(list) = profile.index.definitions.get(tokens[i].text(view.text)) else {
            return false;
        };
        let declared = i > 0 && !tokens[i].newline_before && tokens[i - 1].is_word();
        if !declared || !tokens.get(i + 1).is_some_and(|t| t.is_punct('(')) {
            return false;
        }
        self.process(Matched {
            pattern: list[0],
            head: i,
            name: i,
            receiver: None,
            verb: None,
            bracket: false,
        })
    }

    // ---- declaration assembly ----

    /// Assemble and dispatch a matched head. Returns whether the shape matched.
    fn process(&mut self, m: Matched) -> bool {
        let profile = self.profile;
        let pattern = &profile.routes[m.pattern];
        let head = &self.view.tokens[m.head];
        let (line, offset) = (head.line, head.start);
        let mut local = 0u32;
        self.current = self.begin_declaration();

        let result = self
            .invocation(&m, pattern, &mut local)
            .and_then(|inv| match inv {
                None => Ok(false),
                Some(inv) => self.dispatch(&m, pattern, &inv, &mut local).map(|_| true),
            });
        match result {
            Ok(matched) => matched,
            Err(abort) => {
                self.abort(abort, line, offset, pattern);
                true
            }
        }
    }

    fn dispatch(&mut self, m: &Matched, pattern: &'s RoutePattern, inv: &Invocation, local: &mut u32) -> Result<(), Abort> {
        if self.mentions_excluded(inv, pattern) {
            tracing::debug!(pattern = %pattern.name, line = self.view.tokens[m.head].line, "excluded argument, skipping");
            return Ok(());
        }
        match pattern.role {
            Role::Endpoint | Role::PathModifier => self.endpoint(m, pattern, inv, local),
            Role::Container => {
                if let Some(info) = self.container_after(inv.end + 1, local)? {
                    self.push_container(self.reader, m.head, pattern, inv, info);
                }
                Ok(())
            }
            Role::Group => self.group(m, pattern, inv, local),
            Role::RouterFactory => {
                self.router_factory(m, pattern, inv);
                Ok(())
            }
            Role::Mount => {
                self.mount(m, pattern, inv);
                Ok(())
            }
            Role::Chain => self.chain(m, pattern, inv),
            Role::Resource => self.resource(m, pattern, inv, local),
        }
    }

    fn invocation(&mut self, m: &Matched, pattern: &RoutePattern, local: &mut u32) -> Result<Option<Invocation>, Abort> {
        let view = self.view;
        let tokens = &view.tokens;
        let reader = self.reader;
        match pattern.surface {
            Surface::Element => {
                let (close, args) = reader.parse_element(m.name + 1, &mut self.budget, local)?;
                return Ok(Some(Invocation { args, end: close }));
            }
            Surface::Property => return Ok(self.object_entries(m, pattern)),
            _ => {}
        }
        let next = call_open(tokens, m.name, self.limits.max_declaration_tokens as usize);

        let mut inv = if tokens.get(next).is_some_and(|t| t.is_punct('(')) {
            let (close, args) = reader.parse_parens(next, &mut self.budget, local)?;
            Invocation { args, end: close }
        } else {
            match (pattern.surface, pattern.call) {
                (Surface::Attribute | Surface::DocAnnotation, _) => Invocation {
                    args: Vec::new(),
                    end: m.name,
                },
                (Surface::MethodDefinition, _) | (_, CallStyle::Parens) => return Ok(None),
                (_, CallStyle::ParensOptional) => {
                    if pattern.requires_block && view.blocks.opened_at(next).is_some() {
                        Invocation {
                            args: Vec::new(),
                            end: m.name,
                        }
                    } else {
                        let blocks = &view.blocks;
                        let opener = |k: usize| blocks.opened_at(k).is_some();
                        let (last, args) = reader.parse_bare(next, &mut self.budget, local, &opener)?;
                        if args.is_empty() && !pattern.requires_block {
                            return Ok(None);
                        }
                        Invocation {
                            args,
                            end: last.unwrap_or(m.name),
                        }
                    }
                }
            }
        };
        if m.bracket && tokens.get(inv.end + 1).is_some_and(|t| t.is_punct(']')) {
            inv.end += 1;
        }
        if pattern.requires_block && view.blocks.opened_at(inv.end + 1).is_none() {
            return Ok(None);
        }
        Ok(Some(inv))
    }

    /// Entries of the object literal holding a property head, when it also
    /// carries one of the pattern's companion keys.
    fn object_entries(&self, m: &Matched, pattern: &RoutePattern) -> Option<Invocation> {
        let view = self.view;
        let block = view.blocks.get(view.blocks.enclosing(m.head));
        let (open, close) = (block.open?, block.close?);
        if !view.tokens[open].is_punct('{') {
            return None;
        }
        let args = self.reader.split(open + 1, close);
        let companion = args.iter().any(|a| {
            a.key
                .as_ref()
                .is_some_and(|k| pattern.companion_keys.iter().any(|c| c == k))
        });
        companion.then_some(Invocation { args, end: close })
    }

    fn mentions_excluded(&self, inv: &Invocation, pattern: &RoutePattern) -> bool {
        if pattern.exclude_args.is_empty() {
            return false;
        }
        let view = self.view;
        let tokens = &view.tokens;
        inv.args.iter().any(|arg| {
            (arg.start..arg.end).any(|k| {
                tokens[k].is_word()
                    && pattern.exclude_args.iter().any(|e| e == tokens[k].text(view.text))
                    && tokens.get(k + 1).is_some_and(|t| t.is_punct('('))
            })
        })
    }

    // ---- role handlers ----

    fn endpoint(&mut self, m: &Matched, pattern: &'s RoutePattern, inv: &Invocation, local: &mut u32) -> Result<(), Abort> {
        let view = self.view;
        let tokens = &view.tokens;
        let reader = self.reader;
        let after = inv.end + 1;
        let head = &tokens[m.head];

        if pattern.container_aware && pattern.surface == Surface::Attribute {
            if let Some(info) = self.container_after(after, local)? {
                self.push_container(reader, m.head, pattern, inv, info);
                return Ok(());
            }
        }
        let Some((paths, absolute)) = self.paths(reader, pattern, inv, head.line, head.start) else {
            return Ok(());
        };
        let name_text = tokens[m.name].text(view.text);
        let verbs = self.verbs(reader, pattern, inv, name_text, m.verb.as_deref());
        let handler = self.handler(reader, pattern, inv, after, local)?;
        let cluster = match pattern.surface {
            Surface::Attribute => Some(self.skip_decorations(after, local)?),
            _ => None,
        };
        let in_code = !view
            .classification
            .overlaps_comment(head.start, tokens[m.name].end);

        self.out.candidates.push(DeclarationCandidate {
            verbs,
            paths,
            start_offset: head.start,
            end_offset: tokens[inv.end].end,
            line: head.line,
            declaration: self.current,
            container: self.container_ref(m),
            handler,
            pattern: pattern.name.clone(),
            surface: pattern.surface,
            is_fully_in_code: in_code,
            regex_path: pattern.regex_path,
            absolute,
            cluster,
            modifier: pattern.role == Role::PathModifier,
        });
        Ok(())
    }

    fn group(&mut self, m: &Matched, pattern: &'s RoutePattern, inv: &Invocation, local: &mut u32) -> Result<(), Abort> {
        let head = &self.view.tokens[m.head];
        let (line, offset) = (head.line, head.start);
        let (prefixes, confidence) = self.scope_prefixes(self.reader, pattern, inv, line, offset);
        let Some(body) = self.block_after(m.head, inv.end, local)? else {
            tracing::debug!(line, pattern = %pattern.name, "group without a body, ignored");
            return Ok(());
        };
        let origin = self.container_ref(m);
        self.out.constructs.push(ScopeConstruct {
            kind: ScopeKind::Group {
                body,
                anchor: pattern.anchor,
            },
            prefixes,
            confidence,
            line,
            origin,
        });
        Ok(())
    }

    fn router_factory(&mut self, m: &Matched, pattern: &'s RoutePattern, inv: &Invocation) {
        let head = &self.view.tokens[m.head];
        let (line, offset) = (head.line, head.start);
        let Some(name) = self.assigned_name(m.head) else {
            return;
        };
        let (prefixes, confidence) = self.scope_prefixes(self.reader, pattern, inv, line, offset);
        let origin = self.container_ref(m);
        self.routers.insert(name.clone(), self.out.constructs.len());
        tracing::trace!(line, router = %name, "router variable");
        self.out.constructs.push(ScopeConstruct {
            kind: ScopeKind::Router { name },
            prefixes,
            confidence,
            line,
            origin,
        });
    }

    fn mount(&mut self, m: &Matched, pattern: &'s RoutePattern, inv: &Invocation) {
        let view = self.view;
        let tokens = &view.tokens;
        let reader = self.reader;
        let target = inv
            .args
            .iter()
            .filter(|a| a.key.is_none() && a.end == a.start + 1 && tokens[a.start].is_word())
            .map(|a| tokens[a.start].text(view.text))
            .find(|name| self.routers.contains_key(*name));
        let Some(target) = target else {
            return;
        };
        let head = &tokens[m.head];
        let (line, offset) = (head.line, head.start);
        // `app.use(router)`: the router argument is not a prefix.
        let values: SmallVec<[PathValue; 1]> = self
            .path_values(reader, pattern, inv)
            .unwrap_or_default()
            .into_iter()
            .filter(|v| !matches!(v, PathValue::Dynamic(e) if e == target))
            .collect();
        let (prefixes, confidence) = self.prefixes_from(values, pattern, line, offset);
        let origin = self.container_ref(m);
        self.out.constructs.push(ScopeConstruct {
            kind: ScopeKind::Mount {
                target: target.to_string(),
            },
            prefixes,
            confidence,
            line,
            origin,
        });
    }

    fn chain(&mut self, m: &Matched, pattern: &'s RoutePattern, inv: &Invocation) -> Result<(), Abort> {
        let view = self.view;
        let tokens = &view.tokens;
        let reader = self.reader;
        let profile = self.profile;
        let head = &tokens[m.head];
        let Some((paths, absolute)) = self.paths(reader, pattern, inv, head.line, head.start) else {
            return Ok(());
        };
        let container = self.container_ref(m);
        let separators: SmallVec<[&str; 2]> = if pattern.separators.is_empty() {
            smallvec!["."]
        } else {
            pattern.separators.iter().map(String::as_str).collect()
        };

        let mut k = inv.end + 1;
        loop {
            let Some(name) = separators.iter().find_map(|sep| sigil_end(tokens, k, sep)) else {
                break;
            };
            let Some(verb_token) = tokens.get(name).filter(|t| t.is_word()) else {
                break;
            };
            let verb_text = verb_token.text(view.text);
            let accepted = if pattern.chain_tokens.is_empty() {
                canonical_method(verb_text).is_some()
            } else {
                pattern.chain_tokens.iter().any(|t| t == verb_text)
            };
            let open = call_open(tokens, name, self.limits.max_declaration_tokens as usize);
            if !accepted || !tokens.get(open).is_some_and(|t| t.is_punct('(')) {
                break;
            }
            let declaration = self.begin_declaration();
            let mut local = 0u32;
            let (close, args) = match reader.parse_parens(open, &mut self.budget, &mut local) {
                Ok(parsed) => parsed,
                Err(abort) => {
                    self.abort(abort, verb_token.line, verb_token.start, pattern);
                    return Ok(());
                }
            };
            let Some(method) = profile.verb_for_token(pattern, verb_text) else {
                break;
            };
            let handler = args
                .iter()
                .filter(|a| a.key.is_none())
                .last()
                .and_then(|a| reader.reference(a));
            self.out.candidates.push(DeclarationCandidate {
                verbs: smallvec![method.to_string()],
                paths: paths.clone(),
                start_offset: verb_token.start,
                end_offset: tokens[close].end,
                line: verb_token.line,
                declaration,
                container: container.clone(),
                handler,
                pattern: pattern.name.clone(),
                surface: pattern.surface,
                is_fully_in_code: !view
                    .classification
                    .overlaps_comment(verb_token.start, verb_token.end),
                regex_path: pattern.regex_path,
                absolute,
                cluster: None,
                modifier: false,
            });
            k = close + 1;
        }
        Ok(())
    }

    fn resource(&mut self, m: &Matched, pattern: &'s RoutePattern, inv: &Invocation, local: &mut u32) -> Result<(), Abort> {
        let view = self.view;
        let tokens = &view.tokens;
        let reader = self.reader;
        let profile = self.profile;
        let head = &tokens[m.head];
        let (line, offset) = (head.line, head.start);

        let name = match self
            .path_values(reader, pattern, inv)
            .and_then(|values| values.into_iter().next())
        {
            Some(PathValue::Static(s)) => s.trim_matches('/').to_string(),
            Some(PathValue::Partial(expression)) | Some(PathValue::Dynamic(expression)) => {
                let reason = ScanError::UnresolvedPath { line, expression };
                self.discard(line, offset, pattern, reason, Confidence::DynamicPathUnresolved);
                return Ok(());
            }
            None => return Ok(()),
        };
        if name.is_empty() {
            return Ok(());
        }
        let filter = |key: &str| -> Vec<String> {
            reader
                .keyed_args(&inv.args, &[key.to_string()])
                .iter()
                .flat_map(|arg| reader.names(arg))
                .collect()
        };
        let only = filter("only");
        let except = filter("except");
        let singular = singularize(&name);
        let member_param = pattern.member_param.replace("{singular}", &singular);
        let container = self.container_ref(m);

        let base = self.out.constructs.len();
        self.out.constructs.push(ScopeConstruct {
            kind: ScopeKind::ResourceBase { name: name.clone() },
            prefixes: smallvec![name.clone()],
            confidence: Confidence::Static,
            line,
            origin: container,
        });

        for action in &profile.resource_actions {
            if (pattern.singular && action.plural_only)
                || pattern.skip_actions.contains(&action.name)
                || (!only.is_empty() && !only.contains(&action.name))
                || except.contains(&action.name)
            {
                continue;
            }
            let path = if action.member && !pattern.singular {
                format!("{member_param}{}", action.suffix)
            } else {
                action.suffix.clone()
            };
            let verbs: VerbList = action
                .methods
                .iter()
                .filter_map(|method| canonical_method(method))
                .map(String::from)
                .collect();
            self.out.candidates.push(DeclarationCandidate {
                verbs,
                paths: smallvec![RawPath::fixed(path)],
                start_offset: offset,
                end_offset: tokens[inv.end].end,
                line,
                declaration: self.current,
                container: ContainerRef::Construct(base),
                handler: Some(format!("{name}#{}", action.name)),
                pattern: pattern.name.clone(),
                surface: pattern.surface,
                is_fully_in_code: !view
                    .classification
                    .overlaps_comment(offset, tokens[m.name].end),
                regex_path: false,
                absolute: false,
                cluster: None,
                modifier: false,
            });
        }

        if let Some(body) = self.block_after(m.head, inv.end, local)? {
            let nested = if pattern.singular {
                String::new()
            } else {
                pattern.nested_param.replace("{singular}", &singular)
            };
            self.out.constructs.push(ScopeConstruct {
                kind: ScopeKind::ResourceBlock {
                    base,
                    body,
                    member_param,
                },
                prefixes: smallvec![nested],
                confidence: Confidence::Static,
                line,
                origin: ContainerRef::Construct(base),
            });
        }
        Ok(())
    }

    fn push_container(
        &mut self,
        reader: ArgReader<'_>,
        at: usize,
        pattern: &RoutePattern,
        inv: &Invocation,
        info: ContainerInfo,
    ) {
        let view = self.view;
        let (line, offset) = match reader.tokens.get(at) {
            Some(t) => (t.line, t.start),
            None => (view.lines.line_of(view.text.len()), view.text.len()),
        };
        let (prefixes, confidence) = self.scope_prefixes(reader, pattern, inv, line, offset);
        tracing::trace!(line, container = ?info.name, "container prefix");
        self.out.constructs.push(ScopeConstruct {
            kind: ScopeKind::Container {
                name: info.name,
                body: info.body,
            },
            prefixes,
            confidence,
            line,
            origin: ContainerRef::Block(view.blocks.enclosing(info.keyword)),
        });
    }

    // ---- documentation annotations ----

    fn match_doc(&mut self, doc: &'s DocBlock) {
        let view = self.view;
        let profile = self.profile;
        let reader = ArgReader::new(&doc.tokens, view.text, &profile.lexical);
        let next_main = view.token_at_or_after(doc.span.end);

        for i in 0..doc.tokens.len() {
            if !doc.tokens[i].newline_before {
                continue;
            }
            for sigil in &profile.index.doc_sigils {
                let Some(name) = sigil_end(&doc.tokens, i, sigil) else {
                    continue;
                };
                let Some(word) = doc.tokens.get(name).filter(|t| t.is_word()) else {
                    continue;
                };
                let Some(list) = profile.index.doc.get(word.text(view.text)) else {
                    continue;
                };
                let pattern = &profile.routes[list[0]];
                let (line, offset) = (doc.tokens[i].line, doc.tokens[i].start);
                let mut local = 0u32;
                self.current = self.begin_declaration();
                let result = self.doc_declaration(reader, pattern, i, name, next_main, &mut local);
                if let Err(abort) = result {
                    self.abort(abort, line, offset, pattern);
                    if abort == Abort::File {
                        return;
                    }
                }
                break;
            }
        }
    }

    fn doc_declaration(
        &mut self,
        reader: ArgReader<'s>,
        pattern: &'s RoutePattern,
        at: usize,
        name: usize,
        next_main: usize,
        local: &mut u32,
    ) -> Result<(), Abort> {
        let view = self.view;
        let tokens = reader.tokens;
        let inv = if tokens.get(name + 1).is_some_and(|t| t.is_punct('(')) {
            let (close, args) = reader.parse_parens(name + 1, &mut self.budget, local)?;
            Invocation { args, end: close }
        } else {
            Invocation {
                args: Vec::new(),
                end: name,
            }
        };
        let (line, offset) = (tokens[at].line, tokens[at].start);

        if pattern.container_aware || pattern.role == Role::Container {
            if let Some(info) = self.container_after(next_main, local)? {
                self.push_container(reader, at, pattern, &inv, info);
                return Ok(());
            }
            if pattern.role == Role::Container {
                return Ok(());
            }
        }
        let Some((paths, absolute)) = self.paths(reader, pattern, &inv, line, offset) else {
            return Ok(());
        };
        let verbs = self.verbs(reader, pattern, &inv, tokens[name].text(view.text), None);
        let handler = self.handler(reader, pattern, &inv, next_main, local)?;
        self.out.candidates.push(DeclarationCandidate {
            verbs,
            paths,
            start_offset: offset,
            end_offset: tokens[inv.end].end,
            line,
            declaration: self.current,
            container: ContainerRef::Block(view.blocks.enclosing(next_main)),
            handler,
            pattern: pattern.name.clone(),
            surface: Surface::DocAnnotation,
            is_fully_in_code: false,
            regex_path: pattern.regex_path,
            absolute,
            cluster: None,
            modifier: false,
        });
        Ok(())
    }

    // ---- argument interpretation ----

    fn path_values(&self, reader: ArgReader<'_>, pattern: &RoutePattern, inv: &Invocation) -> Option<SmallVec<[PathValue; 1]>> {
        let rule = &pattern.path;
        if let Some(arg) = reader.keyed_args(&inv.args, &rule.keys).first() {
            return Some(reader.values(arg));
        }
        if !rule.positional {
            return None;
        }
        if let Some(arg) = reader.positional(&inv.args, rule.position) {
            return Some(reader.values(arg));
        }
        // `get 'photos/search' => 'photos#search'`
        if rule.position == 0 {
            let rocket = inv.args.first().and_then(|a| a.key_token).and_then(|k| {
                let token = &reader.tokens[k];
                token.literal().map(|lit| lit.value.clone())
            });
            if let Some(path) = rocket {
                return Some(smallvec![PathValue::Static(path)]);
            }
        }
        None
    }

    /// Endpoint paths. `None` means the declaration was discarded.
    fn paths(
        &mut self,
        reader: ArgReader<'_>,
        pattern: &RoutePattern,
        inv: &Invocation,
        line: u32,
        offset: usize,
    ) -> Option<(SmallVec<[RawPath; 1]>, bool)> {
        if let Some(fixed) = &pattern.path.fixed {
            return Some((smallvec![RawPath::fixed(fixed.clone())], false));
        }
        let Some(values) = self.path_values(reader, pattern, inv) else {
            if pattern.path.required {
                tracing::trace!(line, pattern = %pattern.name, "no path, skipping");
                return None;
            }
            let fallback = pattern.path.fallback.clone().unwrap_or_default();
            return Some((smallvec![RawPath::fixed(fallback)], false));
        };
        let mut paths: SmallVec<[RawPath; 1]> = SmallVec::new();
        let mut unresolved = None;
        for value in values {
            match value {
                PathValue::Static(text) => paths.push(RawPath::fixed(text)),
                PathValue::Partial(prefix) => paths.push(RawPath {
                    text: format!("{prefix}{}", self.limits.wildcard),
                    confidence: Confidence::DynamicPathUnresolved,
                }),
                PathValue::Dynamic(expression) => {
                    unresolved.get_or_insert(expression);
                }
            }
        }
        if paths.is_empty() {
            let reason = ScanError::UnresolvedPath {
                line,
                expression: unresolved.unwrap_or_default(),
            };
            self.discard(line, offset, pattern, reason, Confidence::DynamicPathUnresolved);
            return None;
        }
        let mut absolute = false;
        for path in paths.iter_mut() {
            if let Some(marker) = pattern
                .absolute_prefixes
                .iter()
                .find(|m| path.text.starts_with(m.as_str()))
            {
                absolute = true;
                path.text = path.text[marker.len()..].to_string();
            }
        }
        Some((paths, absolute))
    }

    /// Prefixes for a scope construct, with the confidence every endpoint
    /// under it inherits.
    fn scope_prefixes(
        &mut self,
        reader: ArgReader<'_>,
        pattern: &RoutePattern,
        inv: &Invocation,
        line: u32,
        offset: usize,
    ) -> (SmallVec<[String; 1]>, Confidence) {
        if let Some(fixed) = &pattern.path.fixed {
            return (smallvec![fixed.clone()], Confidence::Static);
        }
        let values = self.path_values(reader, pattern, inv).unwrap_or_default();
        self.prefixes_from(values, pattern, line, offset)
    }

    /// A partly literal prefix keeps its literal part plus the wildcard.
    /// A fully dynamic one becomes the wildcard alone and is reported.
    /// No value at all is the empty prefix.
    fn prefixes_from(
        &mut self,
        values: SmallVec<[PathValue; 1]>,
        pattern: &RoutePattern,
        line: u32,
        offset: usize,
    ) -> (SmallVec<[String; 1]>, Confidence) {
        let wildcard = &self.limits.wildcard;
        let mut out: SmallVec<[String; 1]> = SmallVec::new();
        let mut confidence = Confidence::Static;
        for value in values {
            match value {
                PathValue::Static(text) => out.push(text),
                PathValue::Partial(prefix) => {
                    confidence = Confidence::DynamicPathUnresolved;
                    out.push(format!("{prefix}{wildcard}"));
                }
                PathValue::Dynamic(expression) => {
                    confidence = Confidence::DynamicPathUnresolved;
                    out.push(wildcard.clone());
                    let reason = ScanError::UnresolvedPath { line, expression };
                    tracing::debug!(line, offset, pattern = %pattern.name, error = %reason, "dynamic scope prefix");
                    self.out.diagnostics.push(reason);
                }
            }
        }
        if out.is_empty() {
            out.push(String::new());
        }
        (out, confidence)
    }

    fn verbs(
        &self,
        reader: ArgReader<'_>,
        pattern: &RoutePattern,
        inv: &Invocation,
        name: &str,
        forced: Option<&str>,
    ) -> VerbList {
        if let Some(method) = forced {
            return smallvec![method.to_string()];
        }
        let mut methods: Vec<&'static str> = Vec::new();
        match pattern.verbs.source {
            VerbSource::Token => {
                if let Some(method) = self.profile.verb_for_token(pattern, name) {
                    methods.push(method);
                }
            }
            VerbSource::Argument => {
                for arg in reader.keyed_args(&inv.args, &pattern.verbs.keys) {
                    reader.methods(&arg, &mut methods);
                }
                if let Some(position) = pattern.verbs.position {
                    if let Some(arg) = reader.positional(&inv.args, position) {
                        reader.methods(arg, &mut methods);
                    }
                }
            }
            VerbSource::Fixed => {
                methods.extend(pattern.verbs.fixed.iter().filter_map(|m| canonical_verb(m)));
            }
        }
        if methods.is_empty() {
            methods.extend(pattern.verbs.default.iter().filter_map(|m| canonical_verb(m)));
        }
        if methods.is_empty() {
            methods.push(ANY);
        }
        let mut verbs = VerbList::new();
        for method in methods {
            if !verbs.iter().any(|v| v == method) {
                verbs.push(method.to_string());
            }
        }
        verbs
    }

    fn handler(
        &mut self,
        reader: ArgReader<'_>,
        pattern: &RoutePattern,
        inv: &Invocation,
        after: usize,
        local: &mut u32,
    ) -> Result<Option<String>, Abort> {
        Ok(match pattern.handler.source {
            HandlerSource::NextDeclaration => self.next_declaration(after, local)?,
            HandlerSource::LastArgument => inv
                .args
                .iter()
                .filter(|a| a.key.is_none())
                .last()
                .and_then(|a| reader.reference(a)),
            HandlerSource::Keyword => reader
                .keyed_args(&inv.args, &pattern.handler.keys)
                .first()
                .and_then(|arg| match reader.literal(arg.start, arg.end) {
                    PathValue::Static(value) => Some(value),
                    _ => reader.reference(arg).or_else(|| reader.element_name(arg)),
                }),
            HandlerSource::None => None,
        })
    }

    // ---- lookahead over the main token stream ----

    /// Index of the first token after any run of decorations at `from`.
    fn skip_decorations(&mut self, from: usize, local: &mut u32) -> Result<usize, Abort> {
        let view = self.view;
        let tokens = &view.tokens;
        let profile = self.profile;
        let reader = self.reader;
        let mut k = from;
        'outer: loop {
            for sigil in &profile.index.skip_sigils {
                let Some(name) = sigil_end(tokens, k, sigil) else {
                    continue;
                };
                if sigil.ends_with('[') {
                    k = reader.matching(name - 1, &mut self.budget, local)? + 1;
                    continue 'outer;
                }
                if tokens.get(name).is_some_and(Token::is_word) {
                    k = name + 1;
                    while tokens.get(k).is_some_and(|t| t.is_punct('.'))
                        && tokens.get(k + 1).is_some_and(Token::is_word)
                    {
                        k += 2;
                    }
                    if tokens.get(k).is_some_and(|t| t.is_punct('(')) {
                        k = reader.matching(k, &mut self.budget, local)? + 1;
                    }
                    continue 'outer;
                }
            }
            return Ok(k);
        }
    }

    /// Class-like declaration right after any decorations and modifiers.
    fn container_after(&mut self, from: usize, local: &mut u32) -> Result<Option<ContainerInfo>, Abort> {
        let view = self.view;
        let tokens = &view.tokens;
        let syntax = &self.profile.containers;
        let mut k = self.skip_decorations(from, local)?;
        while let Some(token) = tokens.get(k) {
            if token.is_word() && syntax.modifiers.iter().any(|m| m == token.text(view.text)) {
                k = self.skip_decorations(k + 1, local)?;
            } else {
                break;
            }
        }
        let Some(keyword) = tokens.get(k) else {
            return Ok(None);
        };
        if !keyword.is_word() || !syntax.keywords.iter().any(|w| w == keyword.text(view.text)) {
            return Ok(None);
        }
        let name = tokens
            .get(k + 1)
            .filter(|t| t.is_word())
            .map(|t| t.text(view.text).to_string());
        let limit = k.saturating_add(self.limits.max_declaration_tokens as usize);
        let mut j = k + 1;
        while j < tokens.len() && j < limit {
            self.budget.tick(local)?;
            if let Some(body) = view.blocks.opened_at(j) {
                return Ok(Some(ContainerInfo {
                    name,
                    body,
                    keyword: k,
                }));
            }
            if tokens[j].is_punct(';') {
                break;
            }
            j += 1;
        }
        Ok(None)
    }

    /// Name of the next function-like declaration at `from`.
    fn next_declaration(&mut self, from: usize, local: &mut u32) -> Result<Option<String>, Abort> {
        let view = self.view;
        let tokens = &view.tokens;
        let mut k = self.skip_decorations(from, local)?;
        let limit = k.saturating_add(64);
        while k < tokens.len() && k < limit {
            self.budget.tick(local)?;
            let token = &tokens[k];
            if matches!(token.kind, TokenKind::Punct(';' | '{' | '}' | '=')) {
                return Ok(None);
            }
            if token.is_word() && tokens.get(k + 1).is_some_and(|t| t.is_punct('(')) {
                return Ok(Some(token.text(view.text).to_string()));
            }
            k += 1;
        }
        Ok(None)
    }

    /// Body block of a scope construct: the first block opened along the
    /// rest of the statement, else a closure inside its own arguments.
    fn block_after(&mut self, head: usize, end: usize, local: &mut u32) -> Result<Option<BlockId>, Abort> {
        let view = self.view;
        let tokens = &view.tokens;
        let blocks = &view.blocks;
        let close_keywords = &self.profile.blocks.close_keywords;
        let limit = end.saturating_add(1 + self.limits.max_declaration_tokens as usize);
        let mut depth: u32 = 0;
        let mut k = end + 1;
        while k < tokens.len() && k < limit {
            self.budget.tick(local)?;
            if let Some(block) = blocks.opened_at(k) {
                return Ok(Some(block));
            }
            let token = &tokens[k];
            if depth == 0 {
                let chained = token.is_punct('.')
                    || (token.is_punct('-') && tokens.get(k + 1).is_some_and(|t| t.is_punct('>')));
                if token.is_punct(';')
                    || token.is_close_bracket()
                    || (token.is_word() && close_keywords.iter().any(|c| c == token.text(view.text)))
                    || (k > end + 1 && token.newline_before && !chained)
                {
                    break;
                }
            }
            if token.is_open_bracket() {
                depth += 1;
            } else if token.is_close_bracket() {
                depth = depth.saturating_sub(1);
            }
            k += 1;
        }
        for k in head.saturating_add(1)..=end {
            if let Some(block) = blocks.opened_at(k) {
                if matches!(tokens[k - 1].kind, TokenKind::Punct(')' | '>')) {
                    return Ok(Some(block));
                }
            }
        }
        Ok(None)
    }

    /// Variable assigned by the expression starting at `head`.
    fn assigned_name(&self, head: usize) -> Option<String> {
        let view = self.view;
        let tokens = &view.tokens;
        let adjacent = |a: usize, b: usize| tokens[a].end == tokens[b].start;
        let eq = head.checked_sub(1)?;
        if !tokens[eq].is_punct('=') {
            return None;
        }
        let mut name = eq.checked_sub(1)?;
        if matches!(tokens[name].kind, TokenKind::Punct('=' | '!' | '<' | '>')) && adjacent(name, eq) {
            return None;
        }
        if tokens[name].is_punct(':') && adjacent(name, eq) {
            name = name.checked_sub(1)?;
        } else if name >= 2 && tokens[name].is_word() && tokens[name - 1].is_punct(':') {
            name -= 2;
        }
        let token = &tokens[name];
        token.is_word().then(|| token.text(view.text).to_string())
    }

    fn container_ref(&self, m: &Matched) -> ContainerRef {
        let view = self.view;
        let block = view.blocks.enclosing(m.head);
        match m.receiver.map(|r| view.tokens[r].text(view.text)) {
            Some(name) if self.routers.contains_key(name) => ContainerRef::Router {
                name: name.to_string(),
                block,
            },
            _ => ContainerRef::Block(block),
        }
    }

    /// Fold path-only attributes into sibling verb attributes on the same
    /// item. A path attribute with no verb sibling stays as an endpoint.
    fn merge_clusters(&mut self) {
        let candidates = &mut self.out.candidates;
        let mut groups: FxHashMap<usize, SmallVec<[usize; 4]>> = FxHashMap::default();
        for (i, c) in candidates.iter().enumerate() {
            if let Some(target) = c.cluster {
                groups.entry(target).or_default().push(i);
            }
        }
        let mut removed = vec![false; candidates.len()];
        for members in groups.values() {
            let Some(&source) = members.iter().find(|&&i| candidates[i].modifier) else {
                continue;
            };
            let endpoints: SmallVec<[usize; 4]> = members
                .iter()
                .copied()
                .filter(|&i| !candidates[i].modifier)
                .collect();
            if endpoints.is_empty() {
                continue;
            }
            let paths = candidates[source].paths.clone();
            let absolute = candidates[source].absolute;
            for &e in &endpoints {
                if candidates[e].paths.iter().all(|p| p.text.is_empty()) {
                    candidates[e].paths = paths.clone();
                    candidates[e].absolute = absolute;
                }
            }
            for &i in members.iter().filter(|&&i| candidates[i].modifier) {
                removed[i] = true;
            }
        }
        let mut index = 0;
        candidates.retain(|_| {
            let keep = !removed[index];
            index += 1;
            keep
        });
    }
}

/// Index where the argument list of a call named at `name` should open.
/// A type argument list glued to the name (`get<T>(...)`) is skipped when
/// a `(` follows it.
fn call_open(tokens: &[Token], name: usize, limit: usize) -> usize {
    let next = name + 1;
    let glued = tokens
        .get(next)
        .is_some_and(|t| t.is_punct('<') && tokens[name].end == t.start);
    if !glued {
        return next;
    }
    let mut depth = 0u32;
    let end = tokens.len().min(next.saturating_add(limit));
    for k in next..end {
        let token = &tokens[k];
        if token.is_punct('<') {
            depth += 1;
        } else if token.is_punct('>') {
            let prev = &tokens[k - 1];
            let arrow = matches!(prev.kind, TokenKind::Punct('=' | '-')) && prev.end == token.start;
            if arrow {
                continue;
            }
            depth = depth.saturating_sub(1);
            if depth == 0 {
                return if tokens.get(k + 1).is_some_and(|t| t.is_punct('(')) {
                    k + 1
                } else {
                    next
                };
            }
        }
    }
    next
}

/// Token index after `sigil` when its characters appear as adjacent
/// punctuation starting at `at`.
fn sigil_end(tokens: &[Token], at: usize, sigil: &str) -> Option<usize> {
    let mut k = at;
    for c in sigil.chars() {
        let token = tokens.get(k)?;
        if !token.is_punct(c) || (k > at && tokens[k - 1].end != token.start) {
            return None;
        }
        k += 1;
    }
    Some(k)
}

/// A `[` at the start of a line or right after another attribute.
fn bracket_position(tokens: &[Token], i: usize) -> bool {
    i == 0 || tokens[i].newline_before || tokens[i - 1].is_punct(']')
}

/// Naive English singular for resource names.
pub(crate) fn singularize(plural: &str) -> String {
    if let Some(stem) = plural.strip_suffix("ies") {
        format!("{stem}y")
    } else if plural.ends_with("sses") || plural.ends_with("xes") || plural.ends_with("ches") {
        plural[..plural.len() - 2].to_string()
    } else if plural.ends_with('s') && !plural.ends_with("ss") {
        plural[..plural.len() - 1].to_string()
    } else {
        plural.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::profiles::ProfileRegistry;

    fn scan(ecosystem: &str, text: &str) -> ScanOutput {
        let registry = ProfileRegistry::builtin().unwrap();
        let profile = registry.get(ecosystem).unwrap();
        let view = SourceView::build(text, &profile);
        DeclarationScanner::new(&profile, ScanLimits::default()).scan(&view)
    }

    #[test]
    fn test_singularize() {
        assert_eq!(singularize("users"), "user");
        assert_eq!(singularize("categories"), "category");
        assert_eq!(singularize("boxes"), "box");
        assert_eq!(singularize("address"), "address");
        assert_eq!(singularize("profile"), "profile");
    }

    #[test]
    fn test_member_call_candidate() {
        let out = scan("express", "app.get('/users', listUsers);");
        assert_eq!(out.candidates.len(), 1);
        let c = &out.candidates[0];
        assert_eq!(c.verbs.as_slice(), ["GET".to_string()]);
        assert_eq!(c.paths[0].text, "/users");
        assert_eq!(c.handler.as_deref(), Some("listUsers"));
        assert!(c.is_fully_in_code);
        assert_eq!(c.line, 1);
    }

    #[test]
    fn test_commented_declaration_is_not_a_candidate() {
        let out = scan("express", "// app.get('/a', h);\n/* app.post('/b', h); */\napp.put('/c', h);");
        assert_eq!(out.candidates.len(), 1);
        assert_eq!(out.candidates[0].paths[0].text, "/c");
        assert_eq!(out.candidates[0].line, 3);
    }

    #[test]
    fn test_router_factory_and_mount_constructs() {
        let out = scan(
            "express",
            "const api = express.Router();\napi.get('/x', h);\napp.use('/api', api);",
        );
        assert_eq!(out.constructs.len(), 2);
        assert!(matches!(&out.constructs[0].kind, ScopeKind::Router { name } if name == "api"));
        assert!(matches!(&out.constructs[1].kind, ScopeKind::Mount { target } if target == "api"));
        assert_eq!(out.constructs[1].prefixes[0], "/api");
        assert!(matches!(&out.candidates[0].container, ContainerRef::Router { name, .. } if name == "api"));
    }

    #[test]
    fn test_unresolved_path_is_discarded() {
        let out = scan("express", "app.get(routePath, h);");
        assert!(out.candidates.is_empty());
        assert_eq!(out.discarded.len(), 1);
        assert!(matches!(out.discarded[0].reason, ScanError::UnresolvedPath { .. }));
    }

    #[test]
    fn test_declaration_ceiling() {
        let registry = ProfileRegistry::builtin().unwrap();
        let profile = registry.get("express").unwrap();
        let text = "app.get('/a', function () { return [1, 2, 3, 4, 5, 6, 7, 8]; });\napp.get('/b', h);";
        let view = SourceView::build(text, &profile);
        let limits = ScanLimits {
            max_declaration_tokens: 10,
            ..ScanLimits::default()
        };
        let out = DeclarationScanner::new(&profile, limits).scan(&view);
        assert_eq!(out.candidates.len(), 1);
        assert_eq!(out.candidates[0].paths[0].text, "/b");
        assert_eq!(out.discarded[0].confidence, Confidence::BudgetExceeded);
        assert!(out.partial);
    }

    #[test]
    fn test_type_arguments_before_call() {
        let out = scan("express", "router.get<{ id: string }>('/typed/:id', h);\nrouter.post<Body, Reply<T>>('/typed', h);");
        let paths: Vec<_> = out.candidates.iter().map(|c| c.paths[0].text.as_str()).collect();
        assert_eq!(paths, ["/typed/:id", "/typed"]);
    }

    #[test]
    fn test_dynamic_mount_prefix_is_wildcard() {
        let out = scan(
            "express",
            "const r = express.Router();\napp.use(`/v${n}`, r);\napp.use(r);",
        );
        assert_eq!(out.constructs[1].prefixes[0], "/v*");
        assert_eq!(out.constructs[1].confidence, Confidence::DynamicPathUnresolved);
        assert_eq!(out.constructs[2].prefixes[0], "");
        assert_eq!(out.constructs[2].confidence, Confidence::Static);
    }

    #[test]
    fn test_declaration_index_per_declaration() {
        let out = scan("express", "app.get('/a', h);\napp.route('/b').get(h).post(h);");
        let indices: Vec<_> = out.candidates.iter().map(|c| c.declaration).collect();
        assert_eq!(indices.len(), 3);
        assert!(indices.windows(2).all(|w| w[0] < w[1]));
    }

    #[test]
    fn test_iteration_budget_marks_partial() {
        let registry = ProfileRegistry::builtin().unwrap();
        let profile = registry.get("express").unwrap();
        let text = "app.get('/a', h);\n".repeat(50);
        let view = SourceView::build(&text, &profile);
        let limits = ScanLimits {
            iteration_budget: 40,
            ..ScanLimits::default()
        };
        let out = DeclarationScanner::new(&profile, limits).scan(&view);
        assert!(out.partial);
        assert!(out.candidates.len() < 50);
        assert!(out
            .diagnostics
            .iter()
            .any(|d| matches!(d, ScanError::AssemblyBudgetExceeded { limit: 40, .. })));
    }
}

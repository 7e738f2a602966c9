//! Endpoint assembly: prefix composition, placeholder substitution, and
//! expansion of each candidate into one endpoint per path and verb.

use routemap_core::types::collections::FxHashSet;

use crate::profiles::{EcosystemProfile, PlaceholderSource, Surface};
use crate::scanner::{BlockTree, DeclarationCandidate};
use crate::scope::{join, normalize, ScopeTree};
use crate::types::{Confidence, Endpoint};

/// Turns one file's candidates into endpoints.
pub struct EndpointAssembler<'a> {
    profile: &'a EcosystemProfile,
    file: &'a str,
}

impl<'a> EndpointAssembler<'a> {
    pub fn new(profile: &'a EcosystemProfile, file: &'a str) -> Self {
        Self { profile, file }
    }

    /// Endpoints in candidate order; within a candidate, paths in
    /// declaration order and verbs in list order. Candidates expanded from
    /// one declaration share its `declaration_order`.
    pub fn assemble(
        &self,
        candidates: &[DeclarationCandidate],
        tree: &ScopeTree,
        blocks: &BlockTree,
    ) -> Vec<Endpoint> {
        let mut endpoints = Vec::with_capacity(candidates.len());
        let mut order = 0u32;
        let mut previous: Option<u32> = None;
        for candidate in candidates {
            if previous.is_some_and(|p| p != candidate.declaration) {
                order += 1;
            }
            previous = Some(candidate.declaration);
            if !candidate.is_fully_in_code && candidate.surface != Surface::DocAnnotation {
                tracing::debug!(line = candidate.line, pattern = %candidate.pattern, "candidate overlaps a comment");
                continue;
            }
            self.expand(candidate, order, tree, blocks, &mut endpoints);
        }
        endpoints
    }

    fn expand(
        &self,
        candidate: &DeclarationCandidate,
        order: u32,
        tree: &ScopeTree,
        blocks: &BlockTree,
        out: &mut Vec<Endpoint>,
    ) {
        let scope = tree.scope_for(&candidate.container, blocks);
        let container = tree.container_name(scope);
        let handler = candidate.handler.as_deref();
        let (variants, scope_confidence) = if candidate.absolute {
            (vec![Vec::new()], Confidence::Static)
        } else {
            (tree.prefix_variants(scope), tree.confidence(scope))
        };

        let mut seen: FxHashSet<(String, String)> = FxHashSet::default();
        for raw_path in &candidate.paths {
            for variant in &variants {
                let segments: Vec<String> = variant
                    .iter()
                    .copied()
                    .chain(std::iter::once(raw_path.text.as_str()))
                    .map(|s| self.substitute(s, container, handler))
                    .collect();
                let raw = join(segments.iter().map(String::as_str), candidate.regex_path);
                let path = normalize(&raw);
                for verb in &candidate.verbs {
                    if !seen.insert((verb.clone(), path.clone())) {
                        continue;
                    }
                    out.push(Endpoint {
                        method: verb.clone(),
                        path: path.clone(),
                        raw_path: raw.clone(),
                        file: self.file.to_string(),
                        line: candidate.line,
                        handler_name: candidate.handler.clone(),
                        declaration_order: order,
                        confidence: raw_path.confidence.weakest(scope_confidence),
                        ecosystem: self.profile.id.clone(),
                        pattern: candidate.pattern.clone(),
                    });
                }
            }
        }
    }

    fn substitute(&self, segment: &str, container: Option<&str>, handler: Option<&str>) -> String {
        let mut out = segment.to_string();
        for placeholder in &self.profile.placeholders {
            if !out.contains(&placeholder.token) {
                continue;
            }
            let value = match placeholder.source {
                PlaceholderSource::Container => container,
                PlaceholderSource::Handler => handler,
            };
            let Some(value) = value else {
                continue;
            };
            let value = if placeholder.strip_suffix.is_empty() {
                value
            } else {
                value.strip_suffix(placeholder.strip_suffix.as_str()).unwrap_or(value)
            };
            out = out.replace(&placeholder.token, value);
        }
        out
    }
}

//! Declaration scanner: tokenizes live code, builds the block tree, and
//! matches the profile's route patterns.

pub mod args;
pub mod blocks;
pub mod matcher;
pub mod token;
pub mod types;

pub use blocks::{BlockId, BlockTree, ROOT_BLOCK};
pub use matcher::{DeclarationScanner, ScanLimits};
pub use token::{Literal, Token, TokenKind, Tokenizer};
pub use types::{
    ContainerRef, DeclarationCandidate, DiscardedCandidate, RawPath, ScanOutput, ScopeConstruct,
    ScopeKind,
};

use crate::lexical::{Classification, LexicalClassifier, LineIndex, Span};
use crate::profiles::EcosystemProfile;

/// Tokens of one documentation comment.
#[derive(Debug, Clone)]
pub struct DocBlock {
    pub span: Span,
    pub tokens: Vec<Token>,
}

/// Everything derived from the raw text before pattern matching.
#[derive(Debug, Clone)]
pub struct SourceView<'a> {
    pub text: &'a str,
    pub lines: LineIndex,
    pub classification: Classification,
    pub tokens: Vec<Token>,
    pub doc_blocks: Vec<DocBlock>,
    pub blocks: BlockTree,
}

impl<'a> SourceView<'a> {
    pub fn build(text: &'a str, profile: &EcosystemProfile) -> Self {
        let lines = LineIndex::new(text);
        let classification = LexicalClassifier::new(&profile.lexical).classify(text, &lines);
        let tokenizer = Tokenizer::new(&profile.lexical);
        let tokens = tokenizer.tokenize(text, &classification, &lines);
        let blocks = BlockTree::build(&tokens, text, &profile.blocks);

        let mut doc_blocks = Vec::new();
        if profile.has_doc_patterns() {
            for span in classification.spans.iter().filter(|s| s.is_doc()) {
                let Some(delim) = span
                    .delimiter
                    .and_then(|d| profile.lexical.doc_comments.get(d as usize))
                else {
                    continue;
                };
                let tokens = tokenizer.tokenize_doc(
                    text,
                    span,
                    delim.open.len(),
                    delim.close.len(),
                    &lines,
                );
                doc_blocks.push(DocBlock { span: *span, tokens });
            }
        }

        Self {
            text,
            lines,
            classification,
            tokens,
            doc_blocks,
            blocks,
        }
    }

    /// Index of the first code token starting at or after `offset`.
    pub fn token_at_or_after(&self, offset: usize) -> usize {
        self.tokens.partition_point(|t| t.start < offset)
    }
}

//! Scanner output: declaration candidates and scope constructs.

use smallvec::SmallVec;

use routemap_core::errors::ScanError;
use routemap_core::types::collections::VerbList;

use super::blocks::BlockId;
use crate::profiles::{GroupAnchor, Surface};
use crate::types::Confidence;

/// One path a declaration registers, before prefix composition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawPath {
    /// Literal text, with the wildcard appended when only a prefix was static.
    pub text: String,
    pub confidence: Confidence,
}

impl RawPath {
    pub fn fixed(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            confidence: Confidence::Static,
        }
    }
}

/// Where a declaration or construct sits for prefix purposes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ContainerRef {
    /// Innermost lexical block around it.
    Block(BlockId),
    /// Registered on a router variable. Falls back to the block when the
    /// variable was never created in this file.
    Router { name: String, block: BlockId },
    /// Under the scope created by another construct.
    Construct(usize),
}

#[derive(Debug, Clone, PartialEq)]
pub struct DeclarationCandidate {
    pub verbs: VerbList,
    pub paths: SmallVec<[RawPath; 1]>,
    pub start_offset: usize,
    pub end_offset: usize,
    pub line: u32,
    /// Index of the source declaration. Every candidate one declaration
    /// expands into (resource actions) carries the same index.
    pub declaration: u32,
    pub container: ContainerRef,
    pub handler: Option<String>,
    pub pattern: String,
    pub surface: Surface,
    /// Head and path tokens lie entirely in code or string spans.
    pub is_fully_in_code: bool,
    pub regex_path: bool,
    /// Opts out of enclosing prefixes.
    pub absolute: bool,
    /// Token the attribute decorates; siblings share it.
    pub(crate) cluster: Option<usize>,
    pub(crate) modifier: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScopeKind {
    Container { name: Option<String>, body: BlockId },
    Group { body: BlockId, anchor: GroupAnchor },
    Router { name: String },
    Mount { target: String },
    ResourceBase { name: String },
    ResourceBlock { base: usize, body: BlockId, member_param: String },
}

/// A syntactic construct that contributes a path prefix.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScopeConstruct {
    pub kind: ScopeKind,
    /// First entry is the primary prefix; others are alternates.
    pub prefixes: SmallVec<[String; 1]>,
    /// `DynamicPathUnresolved` when a prefix was only partly literal.
    pub confidence: Confidence,
    pub line: u32,
    pub origin: ContainerRef,
}

/// A declaration dropped before assembly.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiscardedCandidate {
    pub line: u32,
    pub offset: usize,
    pub pattern: String,
    pub reason: ScanError,
    pub confidence: Confidence,
}

#[derive(Debug, Clone, Default)]
pub struct ScanOutput {
    pub candidates: Vec<DeclarationCandidate>,
    pub constructs: Vec<ScopeConstruct>,
    pub discarded: Vec<DiscardedCandidate>,
    pub diagnostics: Vec<ScanError>,
    /// Some declaration could not be fully assembled: the file budget ran
    /// out, or a single declaration hit its ceiling.
    pub partial: bool,
    pub steps: u64,
}

//! Prefix scope tree.
//!
//! Nodes live in an arena indexed by [`ScopeId`]; node 0 is the synthetic
//! file root with an empty prefix. Every scope construct found by the
//! scanner becomes one node. Parents are resolved after all nodes exist,
//! so a construct may refer to scopes declared later in the file (a mount
//! after the router's routes, a doc-comment container). Mounts are applied
//! last and re-parent the mounted router's node.

use smallvec::{smallvec, SmallVec};

use routemap_core::types::collections::FxHashMap;

use crate::profiles::GroupAnchor;
use crate::scanner::{BlockId, BlockTree, ContainerRef, ScopeConstruct, ScopeKind};
use crate::types::Confidence;

pub type ScopeId = usize;

pub const ROOT_SCOPE: ScopeId = 0;

/// Upper bound on prefix combinations produced for one declaration.
const MAX_PREFIX_VARIANTS: usize = 16;

/// What a node's prefix applies to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScopeTarget {
    File,
    /// Everything lexically inside the block.
    Block(BlockId),
    /// Declarations registered on the router variable.
    Router(String),
    /// Declarations generated by another construct (resource actions).
    Construct(usize),
    /// A mount point; applies to whatever is mounted under it.
    Mount(String),
}

#[derive(Debug, Clone)]
pub struct ScopeNode {
    pub id: ScopeId,
    pub parent: Option<ScopeId>,
    /// Primary prefix first, then alternates.
    pub prefixes: SmallVec<[String; 1]>,
    pub applies_to: ScopeTarget,
    /// Name of the class-like item, for containers.
    pub container_name: Option<String>,
    /// Resource base node and member segment, for resource blocks.
    pub resource: Option<(ScopeId, String)>,
    /// Confidence of this node's own prefix.
    pub confidence: Confidence,
    pub line: u32,
}

impl ScopeNode {
    pub fn prefix_segment(&self) -> &str {
        self.prefixes.first().map(String::as_str).unwrap_or("")
    }
}

/// Arena of prefix scopes for one file, rooted at [`ROOT_SCOPE`].
#[derive(Debug, Clone)]
pub struct ScopeTree {
    nodes: Vec<ScopeNode>,
    by_block: FxHashMap<BlockId, ScopeId>,
    by_router: FxHashMap<String, ScopeId>,
    by_construct: FxHashMap<usize, ScopeId>,
}

impl ScopeTree {
    /// All nodes, root first, indexed by [`ScopeId`].
    pub fn nodes(&self) -> &[ScopeNode] {
        &self.nodes
    }

    /// `id`, its parent, and so on up to the root.
    pub fn ancestors(&self, id: ScopeId) -> impl Iterator<Item = ScopeId> + '_ {
        std::iter::successors(Some(id), move |&n| self.nodes[n].parent)
    }

    /// Innermost scope a declaration at `origin` falls under.
    pub fn scope_for(&self, origin: &ContainerRef, blocks: &BlockTree) -> ScopeId {
        match origin {
            ContainerRef::Block(block) => self.scope_for_block(*block, blocks),
            ContainerRef::Router { name, block } => match self.by_router.get(name) {
                Some(&id) => id,
                None => self.scope_for_block(*block, blocks),
            },
            ContainerRef::Construct(index) => {
                self.by_construct.get(index).copied().unwrap_or(ROOT_SCOPE)
            }
        }
    }

    fn scope_for_block(&self, block: BlockId, blocks: &BlockTree) -> ScopeId {
        blocks
            .ancestors(block)
            .find_map(|b| self.by_block.get(&b).copied())
            .unwrap_or(ROOT_SCOPE)
    }

    /// Prefix segment lists, root first, one per combination of alternates.
    pub fn prefix_variants(&self, id: ScopeId) -> Vec<Vec<&str>> {
        let mut chain: Vec<ScopeId> = self.ancestors(id).collect();
        chain.reverse();
        let mut variants: Vec<Vec<&str>> = vec![Vec::new()];
        for node in chain.into_iter().map(|n| &self.nodes[n]) {
            if node.prefixes.len() <= 1 {
                for v in &mut variants {
                    v.push(node.prefix_segment());
                }
                continue;
            }
            let mut next = Vec::with_capacity(variants.len() * node.prefixes.len());
            'product: for v in &variants {
                for prefix in &node.prefixes {
                    if next.len() == MAX_PREFIX_VARIANTS {
                        break 'product;
                    }
                    let mut extended = v.clone();
                    extended.push(prefix.as_str());
                    next.push(extended);
                }
            }
            variants = next;
        }
        variants
    }

    /// Weakest prefix confidence from `id` up to the root.
    pub fn confidence(&self, id: ScopeId) -> Confidence {
        self.ancestors(id)
            .map(|n| self.nodes[n].confidence)
            .fold(Confidence::Static, Confidence::weakest)
    }

    /// Name of the nearest enclosing container.
    pub fn container_name(&self, id: ScopeId) -> Option<&str> {
        self.ancestors(id)
            .find_map(|n| self.nodes[n].container_name.as_deref())
    }
}

/// Builds a [`ScopeTree`] from the scanner's constructs.
pub struct ScopeTreeBuilder<'a> {
    blocks: &'a BlockTree,
}

impl<'a> ScopeTreeBuilder<'a> {
    /// Builder resolving block-bound scopes against `blocks`.
    pub fn new(blocks: &'a BlockTree) -> Self {
        Self { blocks }
    }

    /// One node per construct, parents resolved, mounts applied.
    pub fn build(&self, constructs: &[ScopeConstruct]) -> ScopeTree {
        let mut tree = ScopeTree {
            nodes: vec![ScopeNode {
                id: ROOT_SCOPE,
                parent: None,
                prefixes: smallvec![String::new()],
                applies_to: ScopeTarget::File,
                container_name: None,
                resource: None,
                confidence: Confidence::Static,
                line: 0,
            }],
            by_block: FxHashMap::default(),
            by_router: FxHashMap::default(),
            by_construct: FxHashMap::default(),
        };
        // A node bound to a block that already has one nests under it.
        let mut stacked: FxHashMap<ScopeId, ScopeId> = FxHashMap::default();

        for (index, construct) in constructs.iter().enumerate() {
            let id = tree.nodes.len();
            let (applies_to, container_name) = match &construct.kind {
                ScopeKind::Container { name, body } => (ScopeTarget::Block(*body), name.clone()),
                ScopeKind::Group { body, .. } => (ScopeTarget::Block(*body), None),
                ScopeKind::ResourceBlock { body, .. } => (ScopeTarget::Block(*body), None),
                ScopeKind::Router { name } => (ScopeTarget::Router(name.clone()), None),
                ScopeKind::Mount { target } => (ScopeTarget::Mount(target.clone()), None),
                ScopeKind::ResourceBase { .. } => (ScopeTarget::Construct(index), None),
            };
            match &applies_to {
                ScopeTarget::Block(body) => {
                    if let Some(previous) = tree.by_block.insert(*body, id) {
                        stacked.insert(id, previous);
                    }
                }
                ScopeTarget::Router(name) => {
                    tree.by_router.entry(name.clone()).or_insert(id);
                }
                _ => {}
            }
            tree.by_construct.insert(index, id);
            tree.nodes.push(ScopeNode {
                id,
                parent: None,
                prefixes: construct.prefixes.clone(),
                applies_to,
                container_name,
                resource: None,
                confidence: construct.confidence,
                line: construct.line,
            });
        }

        for (index, construct) in constructs.iter().enumerate() {
            let id = index + 1;
            let parent = match stacked.get(&id) {
                Some(&previous) => previous,
                None => tree.scope_for(&construct.origin, self.blocks),
            };
            let parent = if parent == id { ROOT_SCOPE } else { parent };
            tree.nodes[id].parent = Some(parent);

            match &construct.kind {
                ScopeKind::ResourceBlock { base, member_param, .. } => {
                    let base_id = tree.by_construct.get(base).copied().unwrap_or(ROOT_SCOPE);
                    tree.nodes[id].resource = Some((base_id, member_param.clone()));
                }
                ScopeKind::Group { anchor, .. } if *anchor != GroupAnchor::Enclosing => {
                    self.anchor_to_resource(&mut tree, id, parent, *anchor);
                }
                _ => {}
            }
        }

        let mut mounted: FxHashMap<ScopeId, ScopeId> = FxHashMap::default();
        for (index, construct) in constructs.iter().enumerate() {
            let ScopeKind::Mount { target } = &construct.kind else {
                continue;
            };
            let mount = index + 1;
            let Some(&router) = tree.by_router.get(target) else {
                continue;
            };
            if mounted.contains_key(&router) {
                tracing::trace!(router = %target, line = construct.line, "router already mounted");
                continue;
            }
            if tree.ancestors(mount).any(|n| n == router) {
                tracing::debug!(router = %target, line = construct.line, "mount cycle ignored");
                continue;
            }
            tracing::trace!(router = %target, mount, "router mounted");
            mounted.insert(router, mount);
            tree.nodes[router].parent = Some(mount);
        }

        tree
    }

    /// `member do` / `collection do` inside a resource block re-anchor on
    /// the resource itself instead of the nested-resource prefix.
    fn anchor_to_resource(&self, tree: &mut ScopeTree, id: ScopeId, parent: ScopeId, anchor: GroupAnchor) {
        let resource = tree
            .ancestors(parent)
            .find_map(|n| tree.nodes[n].resource.clone());
        let Some((base, member)) = resource else {
            return;
        };
        let lead = match anchor {
            GroupAnchor::ResourceMember => member,
            _ => String::new(),
        };
        let node = &mut tree.nodes[id];
        node.parent = Some(base);
        for prefix in node.prefixes.iter_mut() {
            *prefix = if prefix.is_empty() {
                lead.clone()
            } else {
                format!("{lead}/{prefix}")
            };
        }
    }
}

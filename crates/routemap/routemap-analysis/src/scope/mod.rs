//! Prefix scopes and path composition.

pub mod path;
pub mod tree;

pub use path::{join, normalize};
pub use tree::{ScopeId, ScopeNode, ScopeTarget, ScopeTree, ScopeTreeBuilder, ROOT_SCOPE};

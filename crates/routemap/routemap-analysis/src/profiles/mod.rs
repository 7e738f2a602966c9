//! Ecosystem profiles: declarative syntax and routing tables, plus the
//! registry that maps ecosystem ids to them.

pub mod registry;
pub mod types;

pub use registry::ProfileRegistry;
pub use types::{
    BindingSyntax, BlockSyntax, CallStyle, ContainerSyntax, Delimiter, EcosystemProfile,
    GroupAnchor, HandlerRule, HandlerSource, LexicalSyntax, PathRule, Placeholder,
    PlaceholderSource, ResourceAction, Role, RoutePattern, StringDelimiter, StringPrefix,
    Surface, VerbRule, VerbSource,
};

//! Declarative ecosystem profile model.
//!
//! A profile is a TOML table. Nothing here is ecosystem-specific: every
//! framework difference is expressed as data in one of these structs.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use smallvec::SmallVec;

use routemap_core::errors::ProfileError;
use routemap_core::types::collections::FxHashMap;

use crate::http::{canonical_method, canonical_verb};

/// Everything the engine knows about one framework ecosystem.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EcosystemProfile {
    pub id: String,
    #[serde(default)]
    pub name: String,
    /// File extensions (without the dot) this profile usually applies to.
    #[serde(default)]
    pub extensions: Vec<String>,
    #[serde(default)]
    pub lexical: LexicalSyntax,
    #[serde(default)]
    pub blocks: BlockSyntax,
    #[serde(default)]
    pub containers: ContainerSyntax,
    #[serde(default)]
    pub bindings: BindingSyntax,
    /// Identifiers accepted as receivers of member-call patterns that do not
    /// name their own.
    #[serde(default)]
    pub receivers: Vec<String>,
    /// Extra prefixes treated as attribute introducers when skipping over
    /// decorations (in addition to every attribute pattern's sigils).
    #[serde(default)]
    pub attribute_sigils: Vec<String>,
    #[serde(default)]
    pub placeholders: Vec<Placeholder>,
    /// Expansion table for resource-style declarations.
    #[serde(default)]
    pub resource_actions: Vec<ResourceAction>,
    #[serde(default)]
    pub routes: Vec<RoutePattern>,

    #[serde(skip)]
    pub(crate) index: PatternIndex,
}

/// Comment and string syntax.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct LexicalSyntax {
    pub line_comments: Vec<String>,
    /// Prefixes that look like a line comment but are code (`#[` in PHP).
    pub line_comment_exclusions: Vec<String>,
    pub block_comments: Vec<Delimiter>,
    pub doc_comments: Vec<Delimiter>,
    pub strings: Vec<StringDelimiter>,
    /// Identifiers that glue onto a following string literal (`r`, `f`).
    pub string_prefixes: Vec<StringPrefix>,
    pub concat_operators: Vec<String>,
    /// Adjacent literals concatenate without an operator.
    pub implicit_concat: bool,
    /// `:name` is a symbol literal.
    pub symbols: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Delimiter {
    pub open: String,
    pub close: String,
    /// Both delimiters only count at the start of a line.
    #[serde(default)]
    pub line_start: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StringDelimiter {
    pub open: String,
    pub close: String,
    #[serde(default)]
    pub escape: Option<char>,
    #[serde(default)]
    pub multiline: bool,
    /// Markers that start an interpolated expression inside the literal.
    #[serde(default)]
    pub interpolation: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StringPrefix {
    pub prefix: String,
    #[serde(default)]
    pub interpolation: Vec<String>,
}

/// How lexical blocks open and close.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BlockSyntax {
    pub braces: bool,
    /// Keywords that open a block wherever they appear (`do`, `def`).
    pub open_keywords: Vec<String>,
    /// Keywords that open a block only at the start of a statement (`if`).
    pub line_open_keywords: Vec<String>,
    pub close_keywords: Vec<String>,
}

impl Default for BlockSyntax {
    fn default() -> Self {
        Self {
            braces: true,
            open_keywords: Vec::new(),
            line_open_keywords: Vec::new(),
            close_keywords: Vec::new(),
        }
    }
}

/// Class-like declarations that attribute containers attach to.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ContainerSyntax {
    pub keywords: Vec<String>,
    /// Words allowed between the attributes and the keyword (`public`, `export`).
    pub modifiers: Vec<String>,
}

/// Variable declaration shapes the alias resolver understands.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct BindingSyntax {
    pub declaration_keywords: Vec<String>,
    pub destructure_open: Option<char>,
    pub destructure_close: Option<char>,
    /// Separator between original and local name inside a destructuring pattern.
    pub rename_separators: Vec<String>,
    pub assignment_operators: Vec<String>,
    /// Call heads whose results may be destructured into registrars (`require`).
    pub alias_sources: Vec<String>,
}

/// Text substituted into paths at composition time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Placeholder {
    pub token: String,
    pub source: PlaceholderSource,
    #[serde(default)]
    pub strip_suffix: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlaceholderSource {
    /// Name of the nearest enclosing container.
    Container,
    /// Handler name of the declaration.
    Handler,
}

/// One generated route of a resource declaration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceAction {
    pub name: String,
    pub methods: Vec<String>,
    #[serde(default)]
    pub suffix: String,
    /// Path includes the member parameter.
    #[serde(default)]
    pub member: bool,
    /// Skipped for singular resources.
    #[serde(default)]
    pub plural_only: bool,
}

/// A syntactic shape that declares an endpoint or a scope.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoutePattern {
    pub name: String,
    pub surface: Surface,
    /// Identifiers that trigger this pattern (decorator name, method name, ...).
    pub tokens: Vec<String>,
    #[serde(default)]
    pub role: Role,
    /// Attribute introducers (`@`, `[`, `#[`).
    #[serde(default)]
    pub sigils: Vec<String>,
    /// Member-call separators. Empty means `.`.
    #[serde(default)]
    pub separators: Vec<String>,
    /// Accepted receivers. Empty defers to the profile list; `*` accepts any.
    #[serde(default)]
    pub receivers: Vec<String>,
    #[serde(default)]
    pub call: CallStyle,
    /// A block must follow the invocation.
    #[serde(default)]
    pub requires_block: bool,
    /// When the decorated item is a container, this is a container prefix.
    #[serde(default)]
    pub container_aware: bool,
    /// May be renamed or destructured into a local binding.
    #[serde(default)]
    pub aliasable: bool,
    /// Path is a regular expression; anchors are stripped.
    #[serde(default)]
    pub regex_path: bool,
    #[serde(default)]
    pub verbs: VerbRule,
    /// Token to method overrides (`GetMapping` -> `GET`).
    #[serde(default)]
    pub verb_map: BTreeMap<String, String>,
    #[serde(default)]
    pub path: PathRule,
    #[serde(default)]
    pub handler: HandlerRule,
    /// Calls inside the arguments that disqualify the declaration (`include`).
    #[serde(default)]
    pub exclude_args: Vec<String>,
    /// Methods chainable after a `chain` declaration. Empty accepts any verb.
    #[serde(default)]
    pub chain_tokens: Vec<String>,
    /// Path markers that opt a declaration out of every enclosing prefix.
    #[serde(default)]
    pub absolute_prefixes: Vec<String>,
    #[serde(default)]
    pub anchor: GroupAnchor,
    /// Resource declaration names a single resource.
    #[serde(default)]
    pub singular: bool,
    /// Member path segment for resources; `{singular}` expands to the singular name.
    #[serde(default)]
    pub member_param: String,
    /// Prefix that nested declarations under a resource receive.
    #[serde(default)]
    pub nested_param: String,
    /// Resource actions this pattern never generates.
    #[serde(default)]
    pub skip_actions: Vec<String>,
    /// Property patterns match only in object literals that also carry one
    /// of these keys.
    #[serde(default)]
    pub companion_keys: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Surface {
    /// Sigil-introduced decoration on the following item.
    Attribute,
    /// `receiver<sep>token(...)`.
    MemberCall,
    /// `token(...)` or a paren-less `token args`.
    BareCall,
    /// A method whose name carries the verb (`doGet`).
    MethodDefinition,
    /// Annotation inside a documentation comment.
    DocAnnotation,
    /// Markup element `<Token name="value" ...>`.
    Element,
    /// `token: value` entry of an object literal.
    Property,
}

impl Surface {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Attribute => "attribute",
            Self::MemberCall => "member_call",
            Self::BareCall => "bare_call",
            Self::MethodDefinition => "method_definition",
            Self::DocAnnotation => "doc_annotation",
            Self::Element => "element",
            Self::Property => "property",
        }
    }
}

impl std::fmt::Display for Surface {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    #[default]
    Endpoint,
    /// Prefix for everything inside the decorated class-like item.
    Container,
    /// Prefix for everything inside the following block.
    Group,
    /// Assignment creating a router variable, optionally with a prefix.
    RouterFactory,
    /// Attaches a router variable under a prefix.
    Mount,
    /// Base path for chained verb calls.
    Chain,
    /// Expands into the profile's resource action table.
    Resource,
    /// Path-only attribute that combines with sibling verb attributes.
    PathModifier,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CallStyle {
    #[default]
    Parens,
    ParensOptional,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GroupAnchor {
    #[default]
    Enclosing,
    /// Re-anchors on the enclosing resource's member path.
    ResourceMember,
    /// Re-anchors on the enclosing resource's collection path.
    ResourceCollection,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct VerbRule {
    pub source: VerbSource,
    /// Keyword arguments holding methods.
    pub keys: Vec<String>,
    /// Positional argument holding methods.
    pub position: Option<usize>,
    pub fixed: Vec<String>,
    /// Used when the argument source yields nothing.
    pub default: Vec<String>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VerbSource {
    #[default]
    Token,
    Argument,
    Fixed,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PathRule {
    /// Keyword arguments holding the path, checked before the positional one.
    pub keys: Vec<String>,
    pub positional: bool,
    /// Index among positional arguments.
    pub position: usize,
    /// Constant path; arguments are ignored.
    pub fixed: Option<String>,
    /// Path used when the arguments name none. May hold placeholders.
    pub fallback: Option<String>,
    /// Declarations naming no path are skipped.
    pub required: bool,
}

impl Default for PathRule {
    fn default() -> Self {
        Self {
            keys: Vec::new(),
            positional: true,
            position: 0,
            fixed: None,
            fallback: None,
            required: false,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct HandlerRule {
    pub source: HandlerSource,
    pub keys: Vec<String>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HandlerSource {
    /// The next named declaration after the construct.
    #[default]
    NextDeclaration,
    /// The last positional argument when it is a plain reference.
    LastArgument,
    /// A keyword argument (`to: 'users#index'`).
    Keyword,
    None,
}

/// Token lookup tables built once per profile.
#[derive(Debug, Clone, Default)]
pub(crate) struct PatternIndex {
    pub attributes: FxHashMap<String, SmallVec<[usize; 2]>>,
    pub member: FxHashMap<String, SmallVec<[usize; 2]>>,
    pub bare: FxHashMap<String, SmallVec<[usize; 2]>>,
    pub definitions: FxHashMap<String, SmallVec<[usize; 2]>>,
    pub doc: FxHashMap<String, SmallVec<[usize; 2]>>,
    pub elements: FxHashMap<String, SmallVec<[usize; 2]>>,
    pub properties: FxHashMap<String, SmallVec<[usize; 2]>>,
    /// Aliasable tokens to their pattern.
    pub aliasable: FxHashMap<String, usize>,
    /// Attribute sigils, longest first.
    pub attribute_sigils: Vec<String>,
    pub doc_sigils: Vec<String>,
    /// Every sigil that introduces a decoration, longest first.
    pub skip_sigils: Vec<String>,
    /// Member-call separators, longest first.
    pub separators: Vec<String>,
}

impl EcosystemProfile {
    /// Parse one profile table and prepare it for scanning.
    pub fn from_toml(source: &str) -> Result<Self, ProfileError> {
        let mut profile: Self = toml::from_str(source)?;
        profile.prepare()?;
        Ok(profile)
    }

    /// Validate the profile and build its lookup tables.
    pub fn prepare(&mut self) -> Result<(), ProfileError> {
        self.validate()?;
        self.index = self.build_index();
        Ok(())
    }

    fn invalid(&self, reason: String) -> ProfileError {
        ProfileError::Invalid {
            profile: self.id.clone(),
            reason,
        }
    }

    fn validate(&self) -> Result<(), ProfileError> {
        if self.id.trim().is_empty() {
            return Err(self.invalid("empty ecosystem id".to_string()));
        }
        for delimiter in &self.lexical.strings {
            if delimiter.open.is_empty() || delimiter.close.is_empty() {
                return Err(self.invalid("empty string delimiter".to_string()));
            }
        }
        for delimiter in self
            .lexical
            .block_comments
            .iter()
            .chain(&self.lexical.doc_comments)
        {
            if delimiter.open.is_empty() || delimiter.close.is_empty() {
                return Err(self.invalid("empty comment delimiter".to_string()));
            }
        }
        if self.lexical.line_comments.iter().any(String::is_empty) {
            return Err(self.invalid("empty line comment marker".to_string()));
        }
        for action in &self.resource_actions {
            if let Some(bad) = action.methods.iter().find(|m| canonical_method(m).is_none()) {
                return Err(self.invalid(format!(
                    "resource action '{}' names unknown method '{bad}'",
                    action.name
                )));
            }
        }
        for pattern in &self.routes {
            if pattern.tokens.is_empty() {
                return Err(self.invalid(format!("pattern '{}' has no tokens", pattern.name)));
            }
            let methods = pattern
                .verb_map
                .values()
                .chain(&pattern.verbs.fixed)
                .chain(&pattern.verbs.default);
            for method in methods {
                if canonical_verb(method).is_none() {
                    return Err(self.invalid(format!(
                        "pattern '{}' names unknown method '{method}'",
                        pattern.name
                    )));
                }
            }
            match pattern.surface {
                Surface::Attribute | Surface::DocAnnotation if pattern.sigils.is_empty() => {
                    return Err(self.invalid(format!(
                        "{} pattern '{}' needs at least one sigil",
                        pattern.surface, pattern.name
                    )));
                }
                _ => {}
            }
            if pattern.role == Role::Resource && self.resource_actions.is_empty() {
                return Err(self.invalid(format!(
                    "resource pattern '{}' but no resource_actions table",
                    pattern.name
                )));
            }
            if pattern.surface == Surface::Property && pattern.companion_keys.is_empty() {
                return Err(self.invalid(format!(
                    "property pattern '{}' needs companion keys",
                    pattern.name
                )));
            }
            if pattern.verbs.source == VerbSource::Fixed && pattern.verbs.fixed.is_empty() {
                return Err(self.invalid(format!(
                    "pattern '{}' uses fixed verbs but lists none",
                    pattern.name
                )));
            }
        }
        Ok(())
    }

    fn build_index(&self) -> PatternIndex {
        let mut index = PatternIndex::default();
        for (i, pattern) in self.routes.iter().enumerate() {
            let table = match pattern.surface {
                Surface::Attribute => &mut index.attributes,
                Surface::MemberCall => &mut index.member,
                Surface::BareCall => &mut index.bare,
                Surface::MethodDefinition => &mut index.definitions,
                Surface::DocAnnotation => &mut index.doc,
                Surface::Element => &mut index.elements,
                Surface::Property => &mut index.properties,
            };
            for token in &pattern.tokens {
                table.entry(token.clone()).or_default().push(i);
            }
            if pattern.aliasable {
                for token in &pattern.tokens {
                    index.aliasable.entry(token.clone()).or_insert(i);
                }
            }
            let sigils = match pattern.surface {
                Surface::Attribute => Some(&mut index.attribute_sigils),
                Surface::DocAnnotation => Some(&mut index.doc_sigils),
                _ => None,
            };
            if let Some(list) = sigils {
                for sigil in &pattern.sigils {
                    if !list.contains(sigil) {
                        list.push(sigil.clone());
                    }
                }
            }
            if pattern.surface == Surface::MemberCall {
                if pattern.separators.is_empty() {
                    push_unique(&mut index.separators, ".");
                }
                for sep in &pattern.separators {
                    push_unique(&mut index.separators, sep);
                }
            }
        }
        for sigil in index.attribute_sigils.iter().chain(&self.attribute_sigils) {
            push_unique(&mut index.skip_sigils, sigil);
        }
        for list in [
            &mut index.attribute_sigils,
            &mut index.doc_sigils,
            &mut index.skip_sigils,
            &mut index.separators,
        ] {
            list.sort_by(|a, b| b.len().cmp(&a.len()));
        }
        index
    }

    /// Method a pattern token stands for.
    pub fn verb_for_token(&self, pattern: &RoutePattern, token: &str) -> Option<&'static str> {
        match pattern.verb_map.get(token) {
            Some(mapped) => canonical_verb(mapped),
            None => canonical_method(token),
        }
    }

    pub fn has_doc_patterns(&self) -> bool {
        !self.index.doc.is_empty()
    }
}

impl RoutePattern {
    pub fn accepts_separator(&self, sep: &str) -> bool {
        if self.separators.is_empty() {
            sep == "."
        } else {
            self.separators.iter().any(|s| s == sep)
        }
    }
}

fn push_unique(list: &mut Vec<String>, value: &str) {
    if !list.iter().any(|v| v == value) {
        list.push(value.to_string());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MINIMAL: &str = r#"
id = "mini"
receivers = ["app"]

[lexical]
line_comments = ["//"]
strings = [{ open = "'", close = "'", escape = "\\" }]

[[routes]]
name = "mini-verb"
surface = "member_call"
tokens = ["get", "post"]
aliasable = true

[[routes]]
name = "mini-attr"
surface = "attribute"
sigils = ["@"]
tokens = ["GetMapping"]
verb_map = { GetMapping = "GET" }
"#;

    #[test]
    fn test_minimal_profile_parses_with_defaults() {
        let profile = EcosystemProfile::from_toml(MINIMAL).unwrap();
        assert_eq!(profile.id, "mini");
        assert!(profile.blocks.braces);
        assert_eq!(profile.lexical.strings[0].escape, Some('\\'));
        let verb = &profile.routes[0];
        assert_eq!(verb.role, Role::Endpoint);
        assert!(verb.path.positional);
        assert_eq!(verb.handler.source, HandlerSource::NextDeclaration);
        assert_eq!(profile.index.aliasable.get("get"), Some(&0));
        assert_eq!(profile.index.separators, vec![".".to_string()]);
        assert_eq!(profile.index.attribute_sigils, vec!["@".to_string()]);
    }

    #[test]
    fn test_verb_for_token_prefers_verb_map() {
        let profile = EcosystemProfile::from_toml(MINIMAL).unwrap();
        assert_eq!(profile.verb_for_token(&profile.routes[1], "GetMapping"), Some("GET"));
        assert_eq!(profile.verb_for_token(&profile.routes[0], "post"), Some("POST"));
    }

    #[test]
    fn test_unknown_method_is_rejected() {
        let source = r#"
id = "bad"
[[routes]]
name = "bad-verb"
surface = "bare_call"
tokens = ["fetch"]
verbs = { source = "fixed", fixed = ["FETCH"] }
"#;
        let err = EcosystemProfile::from_toml(source).unwrap_err();
        assert!(matches!(err, ProfileError::Invalid { .. }));
        assert!(err.to_string().contains("FETCH"));
    }

    #[test]
    fn test_operation_types_allowed_in_verb_map() {
        let source = r#"
id = "gql"
[[routes]]
name = "gql-field"
surface = "attribute"
sigils = ["@"]
tokens = ["Query"]
verb_map = { Query = "QUERY" }
"#;
        let profile = EcosystemProfile::from_toml(source).unwrap();
        assert_eq!(profile.verb_for_token(&profile.routes[0], "Query"), Some("QUERY"));
        // Without a mapping the token is not a method.
        assert_eq!(canonical_method("Query"), None);
    }

    #[test]
    fn test_property_without_companion_keys_is_rejected() {
        let source = r#"
id = "bad"
[[routes]]
name = "bare-path"
surface = "property"
tokens = ["path"]
"#;
        let err = EcosystemProfile::from_toml(source).unwrap_err();
        assert!(err.to_string().contains("companion"));
    }

    #[test]
    fn test_attribute_without_sigil_is_rejected() {
        let source = r#"
id = "bad"
[[routes]]
name = "naked"
surface = "attribute"
tokens = ["Get"]
"#;
        assert!(EcosystemProfile::from_toml(source).is_err());
    }

    #[test]
    fn test_malformed_table_is_parse_error() {
        let err = EcosystemProfile::from_toml("id = ").unwrap_err();
        assert!(matches!(err, ProfileError::Parse(_)));
    }
}

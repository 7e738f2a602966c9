//! Path joining and parameter normalization.

use std::sync::OnceLock;

use regex::Regex;

/// Join prefix segments and a declaration path into one raw path.
///
/// Each segment is trimmed of surrounding whitespace and slashes, empty
/// segments vanish, and the result always starts with a single `/`.
/// `regex` strips `^`/`$` anchors from every segment first.
pub fn join<'a>(segments: impl IntoIterator<Item = &'a str>, regex: bool) -> String {
    let mut out = String::from("/");
    for segment in segments {
        let mut segment = segment.trim();
        if regex {
            segment = segment.strip_prefix('^').unwrap_or(segment);
            segment = segment.strip_suffix('$').unwrap_or(segment);
        }
        let segment = segment.trim_matches('/');
        if segment.is_empty() {
            continue;
        }
        if !out.ends_with('/') {
            out.push('/');
        }
        out.push_str(segment);
    }
    out
}

/// Canonical form of a raw path: parameters as `{name}`, no duplicate
/// slashes, no trailing slash except for the root.
pub fn normalize(raw: &str) -> String {
    let mut path = named_groups(raw);
    path = angle_params(&path);
    path = brace_params(&path);
    path = prefixed_params(&path);

    let mut out = String::with_capacity(path.len() + 1);
    if !path.starts_with('/') {
        out.push('/');
    }
    for c in path.chars() {
        if c == '/' && out.ends_with('/') {
            continue;
        }
        out.push(c);
    }
    while out.len() > 1 && out.ends_with('/') {
        out.pop();
    }
    out
}

fn regex(cell: &'static OnceLock<Option<Regex>>, pattern: &str) -> Option<&'static Regex> {
    cell.get_or_init(|| Regex::new(pattern).ok()).as_ref()
}

fn replace(cell: &'static OnceLock<Option<Regex>>, pattern: &str, path: &str, with: &str) -> String {
    match regex(cell, pattern) {
        Some(re) => re.replace_all(path, with).into_owned(),
        None => path.to_string(),
    }
}

/// `(?P<year>[0-9]{4})` and `(?<year>...)`.
fn named_groups(path: &str) -> String {
    static RE: OnceLock<Option<Regex>> = OnceLock::new();
    replace(&RE, r"\(\?P?<(\w+)>(?:[^()]|\([^()]*\))*\)", path, "{$1}")
}

/// `<id>`, `<int:id>`, `<path:rest>`.
fn angle_params(path: &str) -> String {
    static RE: OnceLock<Option<Regex>> = OnceLock::new();
    replace(&RE, r"<(?:[^:<>/]+:)?(\w+)>", path, "{$1}")
}

/// `:id`, `:id?`, `:id(\d+)`, `$id`, `*rest` at the start of a segment.
fn prefixed_params(path: &str) -> String {
    static RE: OnceLock<Option<Regex>> = OnceLock::new();
    replace(
        &RE,
        r"(^|[/.\-])[:$*]([A-Za-z_]\w*)\??(?:\([^)]*\))?",
        path,
        "${1}{${2}}",
    )
}

/// `{id}`, `{id:int}`, `{id?}`, `{*slug}`, `{id:[0-9]{4}}`, `{page<\d+>?1}`.
/// Constraints may nest braces, so this walks instead of matching.
fn brace_params(path: &str) -> String {
    let bytes = path.as_bytes();
    let mut out = String::with_capacity(path.len());
    let mut i = 0;
    let mut copied = 0;
    while i < bytes.len() {
        if bytes[i] != b'{' {
            i += 1;
            continue;
        }
        let Some(close) = matching_brace(bytes, i) else {
            break;
        };
        let inner = &path[i + 1..close];
        let name_start = inner.trim_start_matches('*');
        let name_len = name_start
            .find(|c: char| !(c.is_ascii_alphanumeric() || c == '_'))
            .unwrap_or(name_start.len());
        let name = &name_start[..name_len];
        let valid = name
            .chars()
            .next()
            .is_some_and(|c| c.is_ascii_alphabetic() || c == '_');
        if valid {
            out.push_str(&path[copied..i]);
            out.push('{');
            out.push_str(name);
            out.push('}');
            copied = close + 1;
        }
        i = close + 1;
    }
    out.push_str(&path[copied..]);
    out
}

fn matching_brace(bytes: &[u8], open: usize) -> Option<usize> {
    let mut depth = 0usize;
    for (k, &b) in bytes.iter().enumerate().skip(open) {
        match b {
            b'{' => depth += 1,
            b'}' => {
                depth -= 1;
                if depth == 0 {
                    return Some(k);
                }
            }
            _ => {}
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_join_trims_and_skips_empty_segments() {
        assert_eq!(join(["/api/", "", "/", "v1", "users/"], false), "/api/v1/users");
        assert_eq!(join(["", ""], false), "/");
        assert_eq!(join(["  /api ", "/x"], false), "/api/x");
    }

    #[test]
    fn test_join_strips_regex_anchors() {
        assert_eq!(join(["blog/", "^articles/(?P<year>[0-9]{4})/$"], true), "/blog/articles/(?P<year>[0-9]{4})");
    }

    #[test]
    fn test_parameter_spellings_normalize_to_braces() {
        for raw in [
            "/users/:id",
            "/users/{id}",
            "/users/{id:int}",
            "/users/{id?}",
            "/users/<id>",
            "/users/<int:id>",
            "/users/$id",
            "/users/:id(\\d+)",
            "/users/(?P<id>\\d+)",
            "/users/{id:[0-9]{2}}",
        ] {
            assert_eq!(normalize(raw), "/users/{id}", "{raw}");
        }
    }

    #[test]
    fn test_normalize_slashes() {
        assert_eq!(normalize(""), "/");
        assert_eq!(normalize("/"), "/");
        assert_eq!(normalize("//api//users/"), "/api/users");
        assert_eq!(normalize("api"), "/api");
    }

    #[test]
    fn test_wildcards_and_globs() {
        assert_eq!(normalize("/files/*"), "/files/*");
        assert_eq!(normalize("/static/*filepath"), "/static/{filepath}");
        assert_eq!(normalize("/api*"), "/api*");
        assert_eq!(normalize("/docs/{**slug}"), "/docs/{slug}");
    }

    #[test]
    fn test_non_parameter_braces_are_kept() {
        assert_eq!(normalize("/year/([0-9]{4})"), "/year/([0-9]{4})");
        assert_eq!(normalize("/a/{}"), "/a/{}");
    }
}

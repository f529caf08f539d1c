//! Route pattern syntax.
//!
//! Routes are written with colon parameters (`/user/:id`) or brace
//! parameters (`/user/{id}`). Both are stored in the brace form, prefixed
//! by the HTTP method: `GET /user/{id}`.

use std::borrow::Cow;
use std::sync::OnceLock;

use regex::{Captures, Regex};

fn colon_param() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r":([A-Za-z0-9_]+)").expect("valid regex"))
}

fn brace_param() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"\{(?:\$|[A-Za-z0-9_]+(?:\.\.\.)?)\}").expect("valid regex")
    })
}

/// Rewrites every `:name` segment of `path` to `{name}`.
///
/// Runs of slashes are collapsed first so that interpolated parameters never
/// sit next to an empty segment. Nothing else about the path is validated.
///
/// # Example
///
/// ```rust
/// use nine_router::transform_path;
///
/// assert_eq!(transform_path("/user/:id/messages/:name"), "/user/{id}/messages/{name}");
/// assert_eq!(transform_path("//files//{name}"), "/files/{name}");
/// ```
#[must_use]
pub fn transform_path(path: &str) -> String {
    let mut collapsed = String::with_capacity(path.len());
    let mut previous_slash = false;
    for ch in path.chars() {
        if ch == '/' && previous_slash {
            continue;
        }
        previous_slash = ch == '/';
        collapsed.push(ch);
    }

    colon_param()
        .replace_all(&collapsed, |caps: &Captures<'_>| format!("{{{}}}", &caps[1]))
        .into_owned()
}

/// Builds the dispatch key for a route: `"<METHOD> <transformed path>"`.
///
/// ```rust
/// use nine_router::route_pattern;
///
/// assert_eq!(route_pattern("GET", "/user/:id"), "GET /user/{id}");
/// ```
#[must_use]
pub fn route_pattern(method: &str, path: &str) -> String {
    format!("{method} {}", transform_path(path))
}

/// Splits a route pattern into its method and path parts.
#[must_use]
pub fn split_pattern(pattern: &str) -> Option<(&str, &str)> {
    let (method, path) = pattern.split_once(' ')?;
    let path = path.trim_start();
    if method.is_empty() || path.is_empty() {
        return None;
    }
    Some((method, path))
}

/// Converts a stored pattern into an anchored regular expression source.
///
/// Every `{name}` placeholder becomes `([^/]+)`, a `{name...}` placeholder
/// becomes `(.+)` and `{$}` matches nothing after the slash it follows. All
/// other text is matched literally.
///
/// ```rust
/// use nine_router::pattern_to_regex;
///
/// assert_eq!(pattern_to_regex("GET /user/{id}"), "^GET /user/([^/]+)$");
/// assert_eq!(pattern_to_regex("GET /files/{path...}"), "^GET /files/(.+)$");
/// assert_eq!(pattern_to_regex("GET /docs/{$}"), "^GET /docs/$");
/// ```
#[must_use]
pub fn pattern_to_regex(pattern: &str) -> String {
    let mut source = String::with_capacity(pattern.len() + 16);
    source.push('^');

    let mut last = 0;
    for placeholder in brace_param().find_iter(pattern) {
        source.push_str(&regex::escape(&pattern[last..placeholder.start()]));
        let group = match placeholder.as_str() {
            "{$}" => "",
            rest if rest.ends_with("...}") => "(.+)",
            _ => "([^/]+)",
        };
        source.push_str(group);
        last = placeholder.end();
    }
    source.push_str(&regex::escape(&pattern[last..]));

    source.push('$');
    source
}

/// Compiles a stored pattern with [`pattern_to_regex`].
///
/// # Errors
///
/// Returns the regex error if the compiled expression exceeds the engine's
/// size limits.
pub fn compile_pattern(pattern: &str) -> Result<Regex, regex::Error> {
    Regex::new(&pattern_to_regex(pattern))
}

/// Percent-decodes one path segment.
///
/// Segments that are not valid UTF-8 once decoded are returned unchanged.
///
/// ```rust
/// use nine_router::decode_segment;
///
/// assert_eq!(decode_segment("Jo%C3%A3o%20Silva"), "João Silva");
/// assert_eq!(decode_segment("a+b"), "a+b");
/// ```
#[must_use]
pub fn decode_segment(raw: &str) -> Cow<'_, str> {
    if !raw.contains('%') {
        return Cow::Borrowed(raw);
    }
    urlencoding::decode(raw).unwrap_or(Cow::Borrowed(raw))
}

/// Percent-decodes a request path segment by segment.
///
/// An encoded slash stays `%2F` so that it never splits a segment.
///
/// ```rust
/// use nine_router::decode_path;
///
/// assert_eq!(decode_path("/caf%C3%A9"), "/café");
/// assert_eq!(decode_path("/a%2Fb/c"), "/a%2Fb/c");
/// ```
#[must_use]
pub fn decode_path(path: &str) -> Cow<'_, str> {
    if !path.contains('%') {
        return Cow::Borrowed(path);
    }
    let parts: Vec<String> = path
        .split('/')
        .map(|part| decode_segment(part).replace('/', "%2F"))
        .collect();
    Cow::Owned(parts.join("/"))
}

//! Request multiplexer.
//!
//! Maps `"<METHOD> <path>"` patterns to values and resolves incoming
//! requests to the most specific matching pattern.
//!
//! Path syntax:
//!
//! - `/users/list` literal segments
//! - `/users/{id}` one non-empty segment, captured as `id`
//! - `/files/{path...}` the rest of the path (last segment only)
//! - `/docs/` a trailing slash matches the whole subtree
//! - `/docs/{$}` only the path with the trailing slash
//!
//! A `GET` pattern also serves `HEAD` requests. Request segments are
//! percent-decoded before they are compared or captured; an encoded slash
//! never splits a segment.

use std::borrow::Cow;

use http::Method;
use thiserror::Error;

use crate::params::Params;
use crate::pattern::{decode_segment, split_pattern};

/// Errors raised while inserting a pattern.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MuxError {
    /// The pattern could not be parsed.
    #[error("invalid pattern {pattern:?}: {reason}")]
    InvalidPattern {
        /// The offending pattern.
        pattern: String,
        /// What is wrong with it.
        reason: &'static str,
    },

    /// A pattern with the same method and shape is already registered.
    #[error("pattern {pattern:?} conflicts with {existing:?}")]
    Duplicate {
        /// The rejected pattern.
        pattern: String,
        /// The pattern registered first.
        existing: String,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Literal(String),
    Param(String),
    Wildcard(String),
}

impl Segment {
    fn rank(&self) -> u8 {
        match self {
            Self::Literal(_) => 3,
            Self::Param(_) => 2,
            Self::Wildcard(_) => 1,
        }
    }

    fn same_shape(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Literal(a), Self::Literal(b)) => a == b,
            (Self::Param(_), Self::Param(_)) | (Self::Wildcard(_), Self::Wildcard(_)) => true,
            _ => false,
        }
    }
}

#[derive(Debug, Clone)]
struct Entry<T> {
    pattern: String,
    method: Method,
    segments: Vec<Segment>,
    subtree: bool,
    rank: Vec<u8>,
    value: T,
}

impl<T> Entry<T> {
    fn same_route(&self, other: &Self) -> bool {
        self.method == other.method
            && self.subtree == other.subtree
            && self.segments.len() == other.segments.len()
            && self
                .segments
                .iter()
                .zip(&other.segments)
                .all(|(a, b)| a.same_shape(b))
    }

    fn match_path(&self, path: &str) -> Option<Params> {
        let rest = path.strip_prefix('/')?;
        let parts: Vec<Cow<'_, str>> = rest.split('/').map(decode_segment).collect();
        let mut params = Params::new();

        for (i, segment) in self.segments.iter().enumerate() {
            match segment {
                Segment::Wildcard(name) => {
                    if parts.len() <= i {
                        return None;
                    }
                    params.push(name.as_str(), parts[i..].join("/"));
                    return Some(params);
                }
                Segment::Literal(literal) => {
                    if &**parts.get(i)? != literal.as_str() {
                        return None;
                    }
                }
                Segment::Param(name) => {
                    let part = parts.get(i)?;
                    if part.is_empty() {
                        return None;
                    }
                    params.push(name.as_str(), &**part);
                }
            }
        }

        let matched = if self.subtree {
            parts.len() > self.segments.len()
        } else {
            parts.len() == self.segments.len()
        };
        matched.then_some(params)
    }
}

/// Outcome of [`Mux::lookup`].
#[derive(Debug)]
pub enum Lookup<'a, T> {
    /// A pattern accepted the request.
    Found {
        /// The full pattern that matched.
        pattern: &'a str,
        /// The value registered with it.
        value: &'a T,
        /// Parameters captured from the path.
        params: Params,
    },
    /// The path is known, but not for this method.
    MethodNotAllowed {
        /// Methods that would have matched, sorted.
        allow: Vec<Method>,
    },
    /// No pattern matches the path.
    NotFound,
}

/// Resolves requests to registered values.
///
/// # Example
///
/// ```rust
/// use http::Method;
/// use nine_router::{Lookup, Mux};
///
/// let mut mux = Mux::new();
/// mux.insert("GET /users/{id}", "show").unwrap();
///
/// match mux.lookup(&Method::GET, "/users/7") {
///     Lookup::Found { value, params, .. } => {
///         assert_eq!(*value, "show");
///         assert_eq!(params.get("id"), Some("7"));
///     }
///     _ => unreachable!(),
/// }
/// ```
#[derive(Debug, Clone)]
pub struct Mux<T> {
    entries: Vec<Entry<T>>,
}

impl<T> Default for Mux<T> {
    fn default() -> Self {
        Self {
            entries: Vec::new(),
        }
    }
}

impl<T> Mux<T> {
    /// Creates an empty multiplexer.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the number of registered patterns.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true if no pattern is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Registers `value` under `pattern`.
    ///
    /// # Errors
    ///
    /// Fails if the pattern is malformed or if a pattern with the same method
    /// and shape (parameter names aside) is already registered.
    pub fn insert(&mut self, pattern: &str, value: T) -> Result<(), MuxError> {
        let entry = parse(pattern, value)?;
        if let Some(existing) = self.entries.iter().find(|e| e.same_route(&entry)) {
            return Err(MuxError::Duplicate {
                pattern: pattern.to_string(),
                existing: existing.pattern.clone(),
            });
        }
        self.entries.push(entry);
        Ok(())
    }

    /// Finds the most specific pattern for `method` and `path`.
    ///
    /// Literal segments beat parameters, parameters beat wildcards and exact
    /// paths beat subtrees. Among equally specific patterns the first
    /// registered wins.
    pub fn lookup(&self, method: &Method, path: &str) -> Lookup<'_, T> {
        let mut best: Option<(&Entry<T>, Params, bool)> = None;
        let mut allow: Vec<Method> = Vec::new();

        for entry in &self.entries {
            let Some(params) = entry.match_path(path) else {
                continue;
            };

            let exact_method = entry.method == *method;
            let serves_head = *method == Method::HEAD && entry.method == Method::GET;
            if !exact_method && !serves_head {
                if entry.method == Method::GET {
                    allow.push(Method::HEAD);
                }
                allow.push(entry.method.clone());
                continue;
            }

            let better = best.as_ref().map_or(true, |(current, _, current_exact)| {
                (entry.rank.as_slice(), exact_method) > (current.rank.as_slice(), *current_exact)
            });
            if better {
                best = Some((entry, params, exact_method));
            }
        }

        match best {
            Some((entry, params, _)) => Lookup::Found {
                pattern: &entry.pattern,
                value: &entry.value,
                params,
            },
            None if allow.is_empty() => Lookup::NotFound,
            None => {
                allow.sort_by(|a, b| a.as_str().cmp(b.as_str()));
                allow.dedup();
                Lookup::MethodNotAllowed { allow }
            }
        }
    }
}

fn parse<T>(pattern: &str, value: T) -> Result<Entry<T>, MuxError> {
    let invalid = |reason| MuxError::InvalidPattern {
        pattern: pattern.to_string(),
        reason,
    };

    let (method, path) = split_pattern(pattern).ok_or_else(|| invalid("expected \"METHOD /path\""))?;
    let method = Method::from_bytes(method.as_bytes()).map_err(|_| invalid("invalid method"))?;
    let body = path
        .strip_prefix('/')
        .ok_or_else(|| invalid("path must start with '/'"))?;

    let subtree = path.ends_with('/');
    let body = if subtree {
        &body[..body.len().saturating_sub(1)]
    } else {
        body
    };

    let raw: Vec<&str> = if body.is_empty() && subtree {
        Vec::new()
    } else {
        body.split('/').collect()
    };

    let mut segments = Vec::with_capacity(raw.len());
    for (i, part) in raw.iter().enumerate() {
        let last = i + 1 == raw.len();
        let segment = match part.strip_prefix('{').and_then(|p| p.strip_suffix('}')) {
            Some("$") if last && !subtree => Segment::Literal(String::new()),
            Some("$") => return Err(invalid("{$} must end the pattern")),
            Some(name) => match name.strip_suffix("...") {
                Some(name) if last && !subtree && !name.is_empty() => {
                    Segment::Wildcard(name.to_string())
                }
                Some(_) => return Err(invalid("{name...} must end the pattern")),
                None if name.is_empty() => return Err(invalid("empty parameter name")),
                None => Segment::Param(name.to_string()),
            },
            None if part.contains(['{', '}']) => {
                return Err(invalid("parameters must span a whole segment"))
            }
            None => Segment::Literal((*part).to_string()),
        };
        segments.push(segment);
    }

    let mut rank: Vec<u8> = segments.iter().map(Segment::rank).collect();
    if subtree {
        rank.push(0);
    }

    Ok(Entry {
        pattern: pattern.to_string(),
        method,
        segments,
        subtree,
        rank,
        value,
    })
}

//! The route table.
//!
//! Every registered route is kept, in registration order, under its
//! `"<METHOD> <path>"` pattern. The table answers one question at request
//! time: does *any* registered pattern accept this method and path?
//!
//! Matching against a pattern is done with a regular expression compiled from
//! the stored pattern, so the lexicographic order used by the binary search is
//! only a hint: `GET /user/{id}` sorts after `GET /user/123` yet matches it.
//! When the search converges without a hit the table falls back to a linear
//! scan.

use std::sync::OnceLock;

use regex::Regex;

use crate::pattern::{compile_pattern, route_pattern};

/// A registered route: its pattern and the value attached to it.
#[derive(Debug, Clone)]
pub struct Route<T> {
    pattern: String,
    value: T,
    regex: OnceLock<Option<Regex>>,
}

impl<T> Route<T> {
    fn new(pattern: String, value: T) -> Self {
        Self {
            pattern,
            value,
            regex: OnceLock::new(),
        }
    }

    /// Returns the stored pattern, e.g. `GET /user/{id}`.
    #[must_use]
    pub fn pattern(&self) -> &str {
        &self.pattern
    }

    /// Returns the value registered with the pattern.
    #[must_use]
    pub fn value(&self) -> &T {
        &self.value
    }

    /// Tests a query pattern (`"<METHOD> <path>"`) against this route.
    ///
    /// A pattern that fails to compile never matches.
    #[must_use]
    pub fn matches(&self, query: &str) -> bool {
        self.regex
            .get_or_init(|| compile_pattern(&self.pattern).ok())
            .as_ref()
            .is_some_and(|re| re.is_match(query))
    }
}

/// An append-only collection of routes.
///
/// Registration takes `&mut self`; lookups take `&self` and can be shared
/// between threads once registration is over.
///
/// # Example
///
/// ```rust
/// use nine_router::RouteTable;
///
/// let mut table = RouteTable::new();
/// table.register("GET /user", "list");
/// table.register("GET /user/{id}", "show");
///
/// assert!(table.exists("GET", "/user/123"));
/// assert!(!table.exists("GET", "/nonexistent"));
/// ```
#[derive(Debug, Clone)]
pub struct RouteTable<T> {
    routes: Vec<Route<T>>,
    sorted: OnceLock<Vec<usize>>,
}

impl<T> Default for RouteTable<T> {
    fn default() -> Self {
        Self {
            routes: Vec::new(),
            sorted: OnceLock::new(),
        }
    }
}

impl<T> RouteTable<T> {
    /// Creates an empty table.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a route. Identical patterns are all retained.
    pub fn register(&mut self, pattern: impl Into<String>, value: T) {
        self.routes.push(Route::new(pattern.into(), value));
        self.sorted = OnceLock::new();
    }

    /// Returns the number of registered routes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.routes.len()
    }

    /// Returns true if nothing has been registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }

    /// Iterates over routes in registration order.
    pub fn iter(&self) -> impl Iterator<Item = &Route<T>> {
        self.routes.iter()
    }

    /// Iterates over routes ordered by pattern string.
    ///
    /// The sort is stable, so identical patterns keep their registration order.
    pub fn sorted(&self) -> impl Iterator<Item = &Route<T>> {
        self.sorted_indices().iter().map(|&i| &self.routes[i])
    }

    /// Returns true if some registered route accepts `method` and `path`.
    ///
    /// `path` goes through the same transformation as registration, so
    /// `exists("GET", "/user/:id")` is a valid query too.
    #[must_use]
    pub fn exists(&self, method: &str, path: &str) -> bool {
        self.find(&route_pattern(method, path)).is_some()
    }

    /// Finds a route whose pattern matches the given query pattern.
    #[must_use]
    pub fn find(&self, query: &str) -> Option<&Route<T>> {
        if self.routes.is_empty() {
            return None;
        }

        let order = self.sorted_indices();
        let (mut low, mut high) = (0, order.len());
        while low < high {
            let middle = low + (high - low) / 2;
            let route = &self.routes[order[middle]];
            if route.matches(query) {
                return Some(route);
            }
            if route.pattern.as_str() < query {
                low = middle + 1;
            } else {
                high = middle;
            }
        }

        self.routes.iter().find(|route| route.matches(query))
    }

    fn sorted_indices(&self) -> &[usize] {
        self.sorted.get_or_init(|| {
            let mut order: Vec<usize> = (0..self.routes.len()).collect();
            order.sort_by(|&a, &b| self.routes[a].pattern.cmp(&self.routes[b].pattern));
            order
        })
    }
}

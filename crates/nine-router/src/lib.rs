//! Route patterns and request matching for Nine.
//!
//! This crate holds the routing pieces that do not depend on the HTTP
//! runtime:
//!
//! - **Pattern transformer**: `/user/:id` becomes `/user/{id}`, and a
//!   route is keyed by `"<METHOD> <path>"`.
//! - **Route table**: every registered route in registration order, with an
//!   existence check used to answer 404 before any handler runs.
//! - **Multiplexer**: resolves a request to the most specific pattern and
//!   extracts its path parameters.
//!
//! # Example
//!
//! ```rust
//! use http::Method;
//! use nine_router::{route_pattern, Lookup, Mux, RouteTable};
//!
//! let pattern = route_pattern("GET", "/user/:id");
//! assert_eq!(pattern, "GET /user/{id}");
//!
//! let mut table = RouteTable::new();
//! table.register(pattern.clone(), ());
//! assert!(table.exists("GET", "/user/123"));
//!
//! let mut mux = Mux::new();
//! mux.insert(&pattern, "user").unwrap();
//! assert!(matches!(mux.lookup(&Method::GET, "/user/123"), Lookup::Found { .. }));
//! ```

#![doc(html_root_url = "https://docs.rs/nine-router/0.1.0")]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

mod mux;
mod params;
mod pattern;
mod table;

pub use mux::{Lookup, Mux, MuxError};
pub use params::Params;
pub use pattern::{
    compile_pattern, decode_path, decode_segment, pattern_to_regex, route_pattern, split_pattern,
    transform_path,
};
pub use table::{Route, RouteTable};

//! Shared utilities used across the analysis modules.
//!
//! - [`graph`] - the generic directed graph, its builder and graph algorithms
//! - [`dot`] - Graphviz DOT rendering helpers

pub mod dot;
pub mod graph;

pub use dot::escape_dot;

//! Generic directed graph infrastructure.
//!
//! The same graph type backs every structure derived from a method: the control-flow
//! graph, its augmented form, the post-dominator tree and the control-dependence graph.
//!
//! # Architecture
//!
//! - [`DirectedGraphBuilder`] - mutable construction with the node/edge contract checks
//! - [`DirectedGraph`] - the frozen result, with arena nodes and adjacency lists
//! - [`NodeId`] / [`EdgeId`] - dense indices into a graph
//! - [`Edge`] - `(source, target, weight)`; labels live in a side table
//! - [`algorithms`] - traversal, path and dominator algorithms over the graph traits
//!
//! # Examples
//!
//! ```rust
//! use bytescope::utils::graph::DirectedGraphBuilder;
//!
//! let mut builder = DirectedGraphBuilder::new();
//! let a = builder.add_node("a");
//! builder.add_node("b");
//! builder.add_labeled_edge(&"a", &"b", "T")?;
//! let graph = builder.build();
//!
//! let b = graph.node_id(&"b").unwrap();
//! assert_eq!(graph.edge_label(a, b), Some("T"));
//! # Ok::<(), bytescope::Error>(())
//! ```

mod builder;
mod directed;
mod edge;
mod node;
mod traits;

pub mod algorithms;

pub use builder::DirectedGraphBuilder;
pub use directed::DirectedGraph;
pub use edge::{Edge, EdgeId, DEFAULT_WEIGHT};
pub use node::NodeId;
pub use traits::{GraphBase, Ordered, Predecessors, RootedGraph, Successors, WeightedSuccessors};

//! Graph algorithms for program analysis.
//!
//! All algorithms are written against the traits in [`crate::utils::graph`] and work
//! on any graph implementing them.
//!
//! # Available Algorithms
//!
//! ## Traversal
//!
//! - [`dfs`] - Depth-first search traversal
//! - [`bfs`] - Breadth-first search traversal
//! - [`postorder`] / [`reverse_postorder`] - Depth-first finishing orders
//! - [`reachable`] - Reachability bitmap from a set of roots
//!
//! ## Paths
//!
//! - [`has_path`] - Reachability between two nodes
//! - [`dijkstra`] - Cheapest path by edge weight
//! - [`all_simple_paths`] - Every acyclic path between two nodes
//!
//! ## Dominator Analysis
//!
//! - [`compute_dominators`] - Compute the dominator tree using Lengauer-Tarjan
//! - [`DominatorTree`] - Result of dominator computation
//!
//! # Algorithm Selection
//!
//! | Algorithm | Time Complexity | Use Case |
//! |-----------|-----------------|----------|
//! | DFS/BFS | O(V + E) | Reachability, CFG validation |
//! | Dijkstra | O(E log V) | Entry paths for stack simulation |
//! | Simple paths | exponential | Small acyclic regions only |
//! | Dominators | O(E α(E, V)) | Post-dominator trees |
//!
//! # Examples
//!
//! ```rust
//! use bytescope::utils::graph::{algorithms, DirectedGraphBuilder, NodeId};
//!
//! let mut builder = DirectedGraphBuilder::new();
//! builder.add_nodes(["A", "B", "C"]);
//! builder.add_edges([(&"A", &"B"), (&"B", &"C")])?;
//! let graph = builder.build();
//!
//! let order: Vec<NodeId> = algorithms::dfs(&graph, NodeId::new(0)).collect();
//! assert_eq!(order, vec![NodeId::new(0), NodeId::new(1), NodeId::new(2)]);
//! # Ok::<(), bytescope::Error>(())
//! ```

mod dominators;
mod paths;
mod traversal;

pub use dominators::{compute_dominators, DominatorIterator, DominatorTree};
pub use paths::{all_simple_paths, dijkstra, has_path, Path};
pub use traversal::{
    bfs, dfs, postorder, reachable, reverse_postorder, BfsIterator, DfsIterator,
};

//! DOT format utilities for graph visualization.
//!
//! This module provides utilities for generating DOT format output,
//! which can be rendered using Graphviz tools.

use std::fmt::Write;

/// Escapes a string for safe use in DOT format labels and identifiers.
///
/// This function handles all characters that have special meaning in DOT format,
/// including quotes, backslashes, newlines, and angle brackets. JVM method names such
/// as `<init>` depend on the angle bracket escaping.
///
/// # Examples
///
/// ```rust
/// use bytescope::utils::escape_dot;
///
/// let escaped = escape_dot("<init>");
/// assert_eq!(escaped, "\\<init\\>");
/// ```
#[must_use]
pub fn escape_dot(s: &str) -> String {
    s.replace('\\', "\\\\")
        .replace('"', "\\\"")
        .replace('\n', "\\n")
        .replace('\r', "")
        .replace('<', "\\<")
        .replace('>', "\\>")
}

/// Visual role of a node in a rendered instruction graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeStyle {
    /// An ordinary instruction
    Plain,
    /// The method-entry sentinel or graph root
    Entry,
    /// The method-exit sentinel
    Exit,
}

/// Incremental writer for a single `digraph`.
///
/// Nodes are referenced by their index, which callers take from
/// [`crate::utils::graph::NodeId::index`].
pub(crate) struct DotWriter {
    out: String,
}

impl DotWriter {
    /// Starts a new digraph with the shared node and edge defaults.
    pub(crate) fn new(kind: &str, title: Option<&str>) -> Self {
        let mut out = String::new();
        let _ = writeln!(out, "digraph {kind} {{");
        if let Some(name) = title {
            let _ = writeln!(out, "    label=\"{kind}: {}\";", escape_dot(name));
        }
        out.push_str("    labelloc=t;\n");
        out.push_str("    node [shape=box, fontname=\"Courier\", fontsize=10];\n");
        out.push_str("    edge [fontname=\"Courier\", fontsize=9];\n\n");
        DotWriter { out }
    }

    pub(crate) fn node(&mut self, index: usize, label: &str, style: NodeStyle) {
        let fill = match style {
            NodeStyle::Plain => "",
            NodeStyle::Entry => ", style=filled, fillcolor=lightgreen",
            NodeStyle::Exit => ", style=filled, fillcolor=lightcoral",
        };
        let _ = writeln!(
            self.out,
            "    n{index} [label=\"{}\"{fill}];",
            escape_dot(label)
        );
    }

    pub(crate) fn edge(&mut self, source: usize, target: usize, label: Option<&str>) {
        match label {
            Some(text) => {
                let _ = writeln!(
                    self.out,
                    "    n{source} -> n{target} [label=\"{}\"];",
                    escape_dot(text)
                );
            }
            None => {
                let _ = writeln!(self.out, "    n{source} -> n{target};");
            }
        }
    }

    pub(crate) fn finish(mut self) -> String {
        self.out.push_str("}\n");
        self.out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_escape_dot_basic() {
        assert_eq!(escape_dot("iload 1"), "iload 1");
    }

    #[test]
    fn test_escape_dot_quotes() {
        assert_eq!(escape_dot("ldc \"hello\""), "ldc \\\"hello\\\"");
    }

    #[test]
    fn test_escape_dot_newlines() {
        assert_eq!(escape_dot("line1\r\nline2"), "line1\\nline2");
    }

    #[test]
    fn test_escape_dot_method_names() {
        assert_eq!(
            escape_dot("invokespecial java/lang/Object.<init>"),
            "invokespecial java/lang/Object.\\<init\\>"
        );
    }

    #[test]
    fn test_writer_output() {
        let mut dot = DotWriter::new("CFG", Some("Foo.bar"));
        dot.node(0, "entry", NodeStyle::Entry);
        dot.node(1, "return", NodeStyle::Plain);
        dot.node(2, "exit", NodeStyle::Exit);
        dot.edge(0, 1, None);
        dot.edge(1, 2, Some("T"));
        let text = dot.finish();

        assert!(text.starts_with("digraph CFG {\n"));
        assert!(text.contains("label=\"CFG: Foo.bar\";"));
        assert!(text.contains("n0 [label=\"entry\", style=filled, fillcolor=lightgreen];"));
        assert!(text.contains("n1 [label=\"return\"];"));
        assert!(text.contains("n0 -> n1;"));
        assert!(text.contains("n1 -> n2 [label=\"T\"];"));
        assert!(text.ends_with("}\n"));
    }
}

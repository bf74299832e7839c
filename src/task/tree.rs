// src/task/tree.rs

//! Introspection metadata attached to every task.
//!
//! The tree is informational only: it is what `--tasks` prints and what
//! visualization tooling would consume. Nothing in the engine reads it.

use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeKind {
    /// A declared, named task.
    Task,
    /// A composition or an anonymous body.
    Function,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TreeNode {
    pub label: String,
    pub kind: NodeKind,
    /// True for compositions.
    pub branch: bool,
    pub nodes: Vec<TreeNode>,
}

impl TreeNode {
    pub fn task(label: impl Into<String>, nodes: Vec<TreeNode>) -> Self {
        Self {
            label: label.into(),
            kind: NodeKind::Task,
            branch: false,
            nodes,
        }
    }

    pub fn function(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            kind: NodeKind::Function,
            branch: false,
            nodes: Vec::new(),
        }
    }

    pub fn composition(label: impl Into<String>, nodes: Vec<TreeNode>) -> Self {
        Self {
            label: label.into(),
            kind: NodeKind::Function,
            branch: true,
            nodes,
        }
    }

    fn write_children(&self, f: &mut fmt::Formatter<'_>, prefix: &str) -> fmt::Result {
        write_nodes(&self.nodes, f, prefix)
    }
}

impl fmt::Display for TreeNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{}", self.label)?;
        self.write_children(f, "")
    }
}

/// Registry-level view: one node per registered task.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskTree {
    pub label: String,
    pub nodes: Vec<TreeNode>,
}

impl fmt::Display for TaskTree {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{}", self.label)?;
        write_nodes(&self.nodes, f, "")
    }
}

fn write_nodes(nodes: &[TreeNode], f: &mut fmt::Formatter<'_>, prefix: &str) -> fmt::Result {
    for (i, node) in nodes.iter().enumerate() {
        let last = i + 1 == nodes.len();
        let (branch, indent) = if last { ("└─ ", "   ") } else { ("├─ ", "│  ") };
        writeln!(f, "{prefix}{branch}{}", node.label)?;
        node.write_children(f, &format!("{prefix}{indent}"))?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn renders_nested_tree() {
        let tree = TaskTree {
            label: "Tasks".into(),
            nodes: vec![
                TreeNode::task("clean", vec![]),
                TreeNode::task(
                    "build",
                    vec![TreeNode::composition(
                        "<series>",
                        vec![TreeNode::task("clean", vec![]), TreeNode::function("<anonymous>")],
                    )],
                ),
            ],
        };

        let expected = "\
Tasks
├─ clean
└─ build
   └─ <series>
      ├─ clean
      └─ <anonymous>
";
        assert_eq!(tree.to_string(), expected);
    }
}

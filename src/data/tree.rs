//! Rooted phylogenetic tree with Newick parsing.
//!
//! Carries exactly what the UniFrac metrics need: node names, branch
//! lengths, and postorder traversal.

use crate::error::{BetaDivError, Result};

/// Index of a node within a [`PhyloTree`].
pub type NodeId = usize;

/// A single tree node.
#[derive(Debug, Clone)]
pub struct Node {
    /// Node identifier (index into the tree's node vector).
    pub id: NodeId,
    /// Taxon name (leaves) or internal label.
    pub name: Option<String>,
    /// Length of the branch leading to this node.
    pub branch_length: Option<f64>,
    /// Parent node, None for the root.
    pub parent: Option<NodeId>,
    /// Child nodes in input order.
    pub children: Vec<NodeId>,
}

impl Node {
    /// Whether this node is a leaf.
    pub fn is_leaf(&self) -> bool {
        self.children.is_empty()
    }
}

/// A rooted phylogenetic tree stored as a node vector.
#[derive(Debug, Clone)]
pub struct PhyloTree {
    nodes: Vec<Node>,
    root: NodeId,
}

impl PhyloTree {
    /// Parse a Newick format string.
    ///
    /// Supports the standard grammar: nested parentheses, optional node
    /// labels, and optional `:length` branch lengths.
    pub fn from_newick(input: &str) -> Result<Self> {
        let mut parser = NewickParser {
            input: input.as_bytes(),
            pos: 0,
            nodes: Vec::new(),
        };
        let root = parser.parse_subtree(None)?;
        parser.skip_whitespace();
        if parser.peek() != Some(b';') {
            return Err(BetaDivError::InvalidParameter(
                "Expected ';' at end of Newick string".to_string(),
            ));
        }
        Ok(Self {
            nodes: parser.nodes,
            root,
        })
    }

    /// Serialize to a Newick string.
    pub fn to_newick(&self) -> String {
        let mut buf = String::new();
        self.write_subtree(self.root, &mut buf);
        buf.push(';');
        buf
    }

    fn write_subtree(&self, id: NodeId, buf: &mut String) {
        let node = &self.nodes[id];
        if !node.children.is_empty() {
            buf.push('(');
            for (i, &child) in node.children.iter().enumerate() {
                if i > 0 {
                    buf.push(',');
                }
                self.write_subtree(child, buf);
            }
            buf.push(')');
        }
        if let Some(ref name) = node.name {
            buf.push_str(name);
        }
        if let Some(len) = node.branch_length {
            buf.push(':');
            let s = format!("{:.10}", len);
            let s = s.trim_end_matches('0').trim_end_matches('.');
            buf.push_str(s);
        }
    }

    /// The root node id.
    pub fn root(&self) -> NodeId {
        self.root
    }

    /// Total number of nodes.
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Access a node by id.
    pub fn node(&self, id: NodeId) -> &Node {
        &self.nodes[id]
    }

    /// Ids of all leaf nodes.
    pub fn leaves(&self) -> Vec<NodeId> {
        self.nodes
            .iter()
            .filter(|n| n.is_leaf())
            .map(|n| n.id)
            .collect()
    }

    /// Names of all named leaves.
    pub fn leaf_names(&self) -> Vec<String> {
        self.nodes
            .iter()
            .filter(|n| n.is_leaf())
            .filter_map(|n| n.name.clone())
            .collect()
    }

    /// Node ids in postorder (children before parents).
    pub fn postorder(&self) -> Vec<NodeId> {
        let mut order = Vec::with_capacity(self.nodes.len());
        let mut stack = vec![(self.root, false)];
        while let Some((id, expanded)) = stack.pop() {
            if expanded {
                order.push(id);
            } else {
                stack.push((id, true));
                for &child in self.nodes[id].children.iter().rev() {
                    stack.push((child, false));
                }
            }
        }
        order
    }
}

struct NewickParser<'a> {
    input: &'a [u8],
    pos: usize,
    nodes: Vec<Node>,
}

impl<'a> NewickParser<'a> {
    fn peek(&self) -> Option<u8> {
        self.input.get(self.pos).copied()
    }

    fn skip_whitespace(&mut self) {
        while self
            .peek()
            .map(|b| b.is_ascii_whitespace())
            .unwrap_or(false)
        {
            self.pos += 1;
        }
    }

    fn alloc_node(&mut self, parent: Option<NodeId>) -> NodeId {
        let id = self.nodes.len();
        self.nodes.push(Node {
            id,
            name: None,
            branch_length: None,
            parent,
            children: Vec::new(),
        });
        id
    }

    fn parse_subtree(&mut self, parent: Option<NodeId>) -> Result<NodeId> {
        self.skip_whitespace();
        let id = self.alloc_node(parent);

        if self.peek() == Some(b'(') {
            self.pos += 1;
            loop {
                let child = self.parse_subtree(Some(id))?;
                self.nodes[id].children.push(child);
                self.skip_whitespace();
                match self.peek() {
                    Some(b',') => {
                        self.pos += 1;
                    }
                    Some(b')') => {
                        self.pos += 1;
                        break;
                    }
                    _ => {
                        return Err(BetaDivError::InvalidParameter(
                            "Expected ',' or ')' in Newick string".to_string(),
                        ))
                    }
                }
            }
        }

        self.skip_whitespace();
        let name = self.parse_label();
        if !name.is_empty() {
            self.nodes[id].name = Some(name);
        }

        if self.peek() == Some(b':') {
            self.pos += 1;
            let length = self.parse_label();
            let value: f64 = length.parse().map_err(|_| {
                BetaDivError::InvalidParameter(format!(
                    "Invalid branch length '{}' in Newick string",
                    length
                ))
            })?;
            self.nodes[id].branch_length = Some(value);
        }

        Ok(id)
    }

    fn parse_label(&mut self) -> String {
        let start = self.pos;
        while let Some(b) = self.peek() {
            if matches!(b, b'(' | b')' | b',' | b':' | b';') || b.is_ascii_whitespace() {
                break;
            }
            self.pos += 1;
        }
        String::from_utf8_lossy(&self.input[start..self.pos]).into_owned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_simple() {
        let tree = PhyloTree::from_newick("((A:0.1,B:0.2):0.3,C:0.4);").unwrap();
        assert_eq!(tree.node_count(), 5);
        let mut names = tree.leaf_names();
        names.sort();
        assert_eq!(names, vec!["A", "B", "C"]);
    }

    #[test]
    fn test_branch_lengths() {
        let tree = PhyloTree::from_newick("(A:1.5,B:2.5);").unwrap();
        let lengths: Vec<f64> = tree
            .leaves()
            .into_iter()
            .map(|id| tree.node(id).branch_length.unwrap())
            .collect();
        assert_eq!(lengths, vec![1.5, 2.5]);
    }

    #[test]
    fn test_postorder_children_before_parents() {
        let tree = PhyloTree::from_newick("((A,B)AB,C)root;").unwrap();
        let order = tree.postorder();
        assert_eq!(order.len(), 5);
        // Root comes last
        assert_eq!(*order.last().unwrap(), tree.root());
        for &id in &order {
            let node = tree.node(id);
            for &child in &node.children {
                let child_pos = order.iter().position(|&x| x == child).unwrap();
                let parent_pos = order.iter().position(|&x| x == id).unwrap();
                assert!(child_pos < parent_pos);
            }
        }
    }

    #[test]
    fn test_newick_roundtrip() {
        let input = "((A:0.1,B:0.2):0.3,C:0.4);";
        let tree = PhyloTree::from_newick(input).unwrap();
        let written = tree.to_newick();
        let reparsed = PhyloTree::from_newick(&written).unwrap();
        assert_eq!(reparsed.node_count(), tree.node_count());
        assert_eq!(written, input);
    }

    #[test]
    fn test_missing_semicolon_fails() {
        assert!(PhyloTree::from_newick("(A,B)").is_err());
    }

    #[test]
    fn test_bad_branch_length_fails() {
        assert!(PhyloTree::from_newick("(A:x,B:1);").is_err());
    }
}

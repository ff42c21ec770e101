//! Parent-pointer index over the directories under a base directory

use std::collections::HashMap;
use std::path::{Path, PathBuf};

/// Index of a directory inside a [`DirectoryTree`]
pub type NodeId = usize;

struct Node {
    path: PathBuf,
    parent: Option<NodeId>,
    depth: usize,
    children: Vec<NodeId>,
}

/// Directories below one base, each linked to its parent
///
/// Inserting a path also inserts every intermediate directory between it
/// and the base, so ancestor questions are answered by following parent
/// links instead of re-splitting paths. The base is always node `0`.
pub struct DirectoryTree {
    nodes: Vec<Node>,
    index: HashMap<PathBuf, NodeId>,
}

impl DirectoryTree {
    /// Node id of the base directory
    pub const ROOT: NodeId = 0;

    pub fn new(base: &Path) -> Self {
        let mut index = HashMap::new();
        index.insert(base.to_path_buf(), Self::ROOT);
        Self {
            nodes: vec![Node {
                path: base.to_path_buf(),
                parent: None,
                depth: 0,
                children: Vec::new(),
            }],
            index,
        }
    }

    /// Build a tree holding `directories` and their ancestors
    ///
    /// Paths outside `base` are ignored.
    pub fn from_directories<'a>(base: &Path, directories: impl IntoIterator<Item = &'a Path>) -> Self {
        let mut tree = Self::new(base);
        for directory in directories {
            tree.insert(directory);
        }
        tree
    }

    /// Insert `path` and any missing ancestors up to the base
    ///
    /// Returns `None` when `path` is not inside the base directory.
    pub fn insert(&mut self, path: &Path) -> Option<NodeId> {
        if let Some(&id) = self.index.get(path) {
            return Some(id);
        }

        let base = &self.nodes[Self::ROOT].path;
        if !path.starts_with(base) {
            return None;
        }

        // Collect the missing chain, deepest first
        let mut missing = Vec::new();
        let mut current = path;
        let anchor = loop {
            if let Some(&id) = self.index.get(current) {
                break id;
            }
            missing.push(current.to_path_buf());
            current = current.parent()?;
        };

        let mut parent = anchor;
        for dir in missing.into_iter().rev() {
            let id = self.nodes.len();
            let depth = self.nodes[parent].depth + 1;
            self.nodes.push(Node {
                path: dir.clone(),
                parent: Some(parent),
                depth,
                children: Vec::new(),
            });
            self.nodes[parent].children.push(id);
            self.index.insert(dir, id);
            parent = id;
        }
        Some(parent)
    }

    pub fn get(&self, path: &Path) -> Option<NodeId> {
        self.index.get(path).copied()
    }

    pub fn path(&self, id: NodeId) -> &Path {
        &self.nodes[id].path
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.nodes[id].parent
    }

    /// Distance from the base directory
    pub fn depth(&self, id: NodeId) -> usize {
        self.nodes[id].depth
    }

    pub fn children(&self, id: NodeId) -> &[NodeId] {
        &self.nodes[id].children
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        // The base is always present
        false
    }

    /// `id` followed by each of its ancestors, ending at the base
    pub fn ancestors(&self, id: NodeId) -> impl Iterator<Item = NodeId> + '_ {
        std::iter::successors(Some(id), |&current| self.nodes[current].parent)
    }

    /// All nodes, shallowest first; siblings ordered by case-folded path
    pub fn by_depth(&self) -> Vec<NodeId> {
        let mut ids: Vec<NodeId> = (0..self.nodes.len()).collect();
        ids.sort_by_cached_key(|&id| {
            (
                self.nodes[id].depth,
                self.nodes[id].path.to_string_lossy().to_lowercase(),
            )
        });
        ids
    }

    /// Subtree byte totals from per-directory direct byte counts
    ///
    /// Each node's total is its own direct bytes plus the totals of its
    /// children, accumulated deepest first in a single pass.
    pub fn subtree_totals(&self, direct_bytes: &HashMap<PathBuf, u64>) -> Vec<u64> {
        let mut totals: Vec<u64> = self
            .nodes
            .iter()
            .map(|node| direct_bytes.get(&node.path).copied().unwrap_or(0))
            .collect();

        let mut order = self.by_depth();
        order.reverse();
        for id in order {
            if let Some(parent) = self.nodes[id].parent {
                totals[parent] += totals[id];
            }
        }
        totals
    }
}

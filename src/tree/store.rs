use petgraph::stable_graph::{NodeIndex, StableGraph};
use petgraph::visit::{Dfs, EdgeRef};

use crate::error::{Result, TagCsvError};

use super::node::NodeData;
use super::path::{join_path, segments};

/// Path-addressable node store the exchange operations work against.
///
/// Paths are slash-separated and relative to the project root; the empty
/// path addresses the root itself.
pub trait TagStore {
    fn project_name(&self) -> &str;

    fn get(&self, path: &str) -> Option<&NodeData>;

    /// Children of the node at `path`, in insertion order.
    fn children(&self, path: &str) -> Result<Vec<&NodeData>>;

    fn add(&mut self, parent_path: &str, node: NodeData) -> Result<()>;

    /// Remove the node at `path` along with its subtree.
    fn delete(&mut self, path: &str) -> Option<NodeData>;

    fn exists(&self, path: &str) -> bool {
        self.get(path).is_some()
    }
}

/// In-memory project tree backed by a stable graph.
///
/// Edges point from parent to child and carry an insertion sequence number
/// so children can be listed in the order they were added.
pub struct ProjectTree {
    graph: StableGraph<NodeData, u64>,
    root: NodeIndex,
    next_seq: u64,
}

impl ProjectTree {
    pub fn new(project_name: &str) -> Self {
        let mut graph = StableGraph::new();
        let root = graph.add_node(NodeData::object(project_name));
        ProjectTree {
            graph,
            root,
            next_seq: 0,
        }
    }

    pub fn root(&self) -> NodeIndex {
        self.root
    }

    /// Number of nodes, excluding the root.
    pub fn node_count(&self) -> usize {
        self.graph.node_count() - 1
    }

    pub fn get_node(&self, idx: NodeIndex) -> Option<&NodeData> {
        self.graph.node_weight(idx)
    }

    pub fn resolve(&self, path: &str) -> Option<NodeIndex> {
        let mut current = self.root;
        for segment in segments(path) {
            current = self.find_child(current, segment)?;
        }
        Some(current)
    }

    pub fn child_indices(&self, idx: NodeIndex) -> Vec<NodeIndex> {
        let mut edges: Vec<(u64, NodeIndex)> = self
            .graph
            .edges(idx)
            .map(|edge| (*edge.weight(), edge.target()))
            .collect();
        edges.sort_by_key(|(seq, _)| *seq);
        edges.into_iter().map(|(_, target)| target).collect()
    }

    fn find_child(&self, parent: NodeIndex, name: &str) -> Option<NodeIndex> {
        self.graph
            .edges(parent)
            .map(|edge| edge.target())
            .find(|&child| {
                self.graph
                    .node_weight(child)
                    .is_some_and(|node| node.name == name)
            })
    }

    /// Attach `node` under `parent`, validating the name and the parent kind.
    /// `parent_path` is only used for error messages.
    pub fn add_child(
        &mut self,
        parent: NodeIndex,
        parent_path: &str,
        node: NodeData,
    ) -> Result<NodeIndex> {
        if node.name.is_empty() || node.name.contains('/') {
            return Err(TagCsvError::InvalidName { name: node.name });
        }

        let parent_kind = &self
            .graph
            .node_weight(parent)
            .ok_or_else(|| TagCsvError::NodeNotFound {
                path: parent_path.to_string(),
            })?
            .kind;
        if !parent_kind.is_container() {
            return Err(TagCsvError::NotAContainer {
                path: parent_path.to_string(),
            });
        }

        if self.find_child(parent, &node.name).is_some() {
            return Err(TagCsvError::NodeExists {
                path: join_path(parent_path, &node.name),
            });
        }

        let idx = self.graph.add_node(node);
        self.graph.add_edge(parent, idx, self.next_seq);
        self.next_seq += 1;
        Ok(idx)
    }

    /// Remove a node and everything below it, returning the removed node data.
    pub fn remove_subtree(&mut self, idx: NodeIndex) -> Option<NodeData> {
        if idx == self.root {
            return None;
        }

        let mut descendants = Vec::new();
        let mut dfs = Dfs::new(&self.graph, idx);
        while let Some(nx) = dfs.next(&self.graph) {
            if nx != idx {
                descendants.push(nx);
            }
        }
        for nx in descendants {
            self.graph.remove_node(nx);
        }
        self.graph.remove_node(idx)
    }

    /// Depth-first listing of every node below the root as `(path, node)`.
    pub fn iter_paths(&self) -> Vec<(String, &NodeData)> {
        let mut out = Vec::new();
        self.collect_paths(self.root, "", &mut out);
        out
    }

    fn collect_paths<'a>(
        &'a self,
        idx: NodeIndex,
        path: &str,
        out: &mut Vec<(String, &'a NodeData)>,
    ) {
        for child in self.child_indices(idx) {
            if let Some(node) = self.graph.node_weight(child) {
                let child_path = join_path(path, &node.name);
                out.push((child_path.clone(), node));
                self.collect_paths(child, &child_path, out);
            }
        }
    }
}

impl TagStore for ProjectTree {
    fn project_name(&self) -> &str {
        &self.graph[self.root].name
    }

    fn get(&self, path: &str) -> Option<&NodeData> {
        self.resolve(path).and_then(|idx| self.graph.node_weight(idx))
    }

    fn children(&self, path: &str) -> Result<Vec<&NodeData>> {
        let idx = self.resolve(path).ok_or_else(|| TagCsvError::NodeNotFound {
            path: path.to_string(),
        })?;
        Ok(self
            .child_indices(idx)
            .into_iter()
            .filter_map(|child| self.graph.node_weight(child))
            .collect())
    }

    fn add(&mut self, parent_path: &str, node: NodeData) -> Result<()> {
        let parent = self
            .resolve(parent_path)
            .ok_or_else(|| TagCsvError::NodeNotFound {
                path: parent_path.to_string(),
            })?;
        self.add_child(parent, parent_path, node)?;
        Ok(())
    }

    fn delete(&mut self, path: &str) -> Option<NodeData> {
        let idx = self.resolve(path)?;
        self.remove_subtree(idx)
    }
}

impl Default for ProjectTree {
    fn default() -> Self {
        Self::new("Project")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tree::node::DataType;

    fn names(nodes: &[&NodeData]) -> Vec<String> {
        nodes.iter().map(|n| n.name.clone()).collect()
    }

    #[test]
    fn test_add_and_get() {
        let mut tree = ProjectTree::new("Plant");
        tree.add("", NodeData::folder("Line1")).unwrap();
        tree.add("Line1", NodeData::tag("Speed", DataType::Float))
            .unwrap();

        assert_eq!(tree.project_name(), "Plant");
        assert_eq!(tree.node_count(), 2);
        assert!(tree.get("Line1").unwrap().kind.is_container());
        assert!(tree.get("Line1/Speed").unwrap().kind.is_tag());
        assert!(tree.get("/Line1/Speed/").is_some());
        assert!(tree.get("Line1/Missing").is_none());
        assert_eq!(tree.get("").unwrap().name, "Plant");
    }

    #[test]
    fn test_children_keep_insertion_order() {
        let mut tree = ProjectTree::new("Plant");
        for name in ["c", "a", "b"] {
            tree.add("", NodeData::folder(name)).unwrap();
        }
        let children = tree.children("").unwrap();
        assert_eq!(names(&children), vec!["c", "a", "b"]);
    }

    #[test]
    fn test_add_rejects_duplicates() {
        let mut tree = ProjectTree::new("Plant");
        tree.add("", NodeData::folder("Line1")).unwrap();
        let err = tree.add("", NodeData::folder("Line1")).unwrap_err();
        assert!(matches!(err, TagCsvError::NodeExists { path } if path == "Line1"));
    }

    #[test]
    fn test_add_under_tag_fails() {
        let mut tree = ProjectTree::new("Plant");
        tree.add("", NodeData::tag("Speed", DataType::Float))
            .unwrap();
        let err = tree.add("Speed", NodeData::folder("Sub")).unwrap_err();
        assert!(matches!(err, TagCsvError::NotAContainer { .. }));
        assert!(err.is_store());
    }

    #[test]
    fn test_add_rejects_bad_names() {
        let mut tree = ProjectTree::new("Plant");
        assert!(matches!(
            tree.add("", NodeData::folder("")),
            Err(TagCsvError::InvalidName { .. })
        ));
        assert!(matches!(
            tree.add("", NodeData::folder("a/b")),
            Err(TagCsvError::InvalidName { .. })
        ));
        assert!(matches!(
            tree.add("Nowhere", NodeData::folder("x")),
            Err(TagCsvError::NodeNotFound { .. })
        ));
    }

    #[test]
    fn test_delete_removes_subtree() {
        let mut tree = ProjectTree::new("Plant");
        tree.add("", NodeData::folder("Line1")).unwrap();
        tree.add("Line1", NodeData::structure_group("Motor"))
            .unwrap();
        tree.add("Line1/Motor", NodeData::tag("Rpm", DataType::Int32))
            .unwrap();
        tree.add("", NodeData::folder("Line2")).unwrap();
        assert_eq!(tree.node_count(), 4);

        let removed = tree.delete("Line1").unwrap();
        assert_eq!(removed.name, "Line1");
        assert_eq!(tree.node_count(), 1);
        assert!(tree.get("Line1/Motor/Rpm").is_none());
        assert!(tree.get("Line2").is_some());

        assert!(tree.delete("Line1").is_none());
        assert!(tree.delete("").is_none());
    }

    #[test]
    fn test_iter_paths_depth_first() {
        let mut tree = ProjectTree::new("Plant");
        tree.add("", NodeData::folder("A")).unwrap();
        tree.add("A", NodeData::tag("x", DataType::Boolean))
            .unwrap();
        tree.add("", NodeData::folder("B")).unwrap();

        let paths: Vec<String> = tree.iter_paths().into_iter().map(|(p, _)| p).collect();
        assert_eq!(paths, vec!["A", "A/x", "B"]);
    }
}

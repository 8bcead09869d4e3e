use std::fs;
use std::path::Path;

use log::debug;
use petgraph::stable_graph::NodeIndex;
use serde::{Deserialize, Serialize};

use crate::error::{Result, TagCsvError};

use super::node::{NodeData, NodeKind};
use super::path::join_path;
use super::store::{ProjectTree, TagStore};

pub const PROJECT_FILE_VERSION: u32 = 1;

/// On-disk JSON form of a [`ProjectTree`].
#[derive(Debug, Serialize, Deserialize)]
pub struct ProjectFile {
    pub tagcsv_project: ProjectHeader,
    #[serde(default)]
    pub nodes: Vec<ProjectNode>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ProjectHeader {
    pub version: u32,
    pub name: String,
    pub saved_at: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProjectNode {
    pub name: String,
    #[serde(flatten)]
    pub kind: NodeKind,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<ProjectNode>,
}

impl ProjectFile {
    pub fn from_tree(tree: &ProjectTree) -> Self {
        ProjectFile {
            tagcsv_project: ProjectHeader {
                version: PROJECT_FILE_VERSION,
                name: tree.project_name().to_string(),
                saved_at: chrono::Utc::now().to_rfc3339(),
            },
            nodes: snapshot_children(tree, tree.root()),
        }
    }

    pub fn into_tree(self) -> Result<ProjectTree> {
        if self.tagcsv_project.version != PROJECT_FILE_VERSION {
            return Err(TagCsvError::Config(format!(
                "Unsupported project file version {} (expected {})",
                self.tagcsv_project.version, PROJECT_FILE_VERSION
            )));
        }

        let mut tree = ProjectTree::new(&self.tagcsv_project.name);
        let root = tree.root();
        for node in self.nodes {
            restore_node(&mut tree, root, "", node)?;
        }
        Ok(tree)
    }
}

fn snapshot_children(tree: &ProjectTree, idx: NodeIndex) -> Vec<ProjectNode> {
    tree.child_indices(idx)
        .into_iter()
        .filter_map(|child| {
            let node = tree.get_node(child)?;
            Some(ProjectNode {
                name: node.name.clone(),
                kind: node.kind.clone(),
                children: snapshot_children(tree, child),
            })
        })
        .collect()
}

fn restore_node(
    tree: &mut ProjectTree,
    parent: NodeIndex,
    parent_path: &str,
    node: ProjectNode,
) -> Result<()> {
    let path = join_path(parent_path, &node.name);
    let idx = tree.add_child(parent, parent_path, NodeData::new(node.name, node.kind))?;
    for child in node.children {
        restore_node(tree, idx, &path, child)?;
    }
    Ok(())
}

impl ProjectTree {
    pub fn load(path: &Path) -> Result<ProjectTree> {
        let json = fs::read_to_string(path)?;
        let file: ProjectFile = serde_json::from_str(&json)?;
        let tree = file.into_tree()?;
        debug!(
            "Loaded project \"{}\" ({} nodes) from {}",
            tree.project_name(),
            tree.node_count(),
            path.display()
        );
        Ok(tree)
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(&ProjectFile::from_tree(self))?;
        fs::write(path, json)?;
        debug!("Saved project to {}", path.display());
        Ok(())
    }
}

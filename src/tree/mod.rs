pub mod node;
pub mod path;
pub mod project_file;
pub mod store;

pub use node::{ArrayUpdateMode, DataType, NodeData, NodeKind, TagSpec};
pub use project_file::{ProjectFile, ProjectHeader, ProjectNode};
pub use store::{ProjectTree, TagStore};

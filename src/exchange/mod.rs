//! Flattening a tag tree to CSV rows and replaying rows back into a tree.

pub mod export;
pub mod import;
pub mod record;
pub mod task;

pub use export::{ExportStats, export_to_csv};
pub use import::{ImportStats, StructureRun, import_from_csv};
pub use record::{HEADER, TagRecord};
pub use task::{BackgroundTask, CancelToken, Exchange};

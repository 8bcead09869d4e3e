use std::path::Path;

use log::{debug, error, info, warn};

use crate::csv_codec::{CsvWriter, Dialect};
use crate::error::{Result, TagCsvError};
use crate::tree::path::{join_path, normalize, strip_project_prefix};
use crate::tree::{NodeKind, TagSpec, TagStore};

use super::record::{HEADER, TagRecord};
use super::task::CancelToken;

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ExportStats {
    pub exported: usize,
    /// Nodes left out because their name or path contains the delimiter.
    pub filtered: usize,
    /// Tags left out because their data type cannot be exchanged.
    pub skipped: usize,
    pub cancelled: bool,
}

/// Records collected from a tree walk, in traversal order.
#[derive(Debug, Default)]
pub struct Flattened {
    pub records: Vec<TagRecord>,
    pub filtered: usize,
    pub skipped: usize,
    pub cancelled: bool,
}

/// Resolve the export root, accepting references that still carry the
/// project name as their first segment.
pub fn resolve_root<S: TagStore>(store: &S, reference: &str) -> Result<String> {
    let root = normalize(strip_project_prefix(store.project_name(), reference));
    match store.get(&root) {
        Some(node) if root.is_empty() || node.kind.is_container() => Ok(root),
        Some(_) => Err(TagCsvError::Config(format!(
            "Driver reference \"{}\" does not point to a container node",
            reference
        ))),
        None => Err(TagCsvError::Config(format!(
            "Driver reference \"{}\" is empty or invalid, please check settings",
            reference
        ))),
    }
}

/// Walk the tree below `root` depth-first and flatten every reachable tag.
pub fn flatten<S: TagStore>(
    store: &S,
    root: &str,
    dialect: &Dialect,
    cancel: &CancelToken,
) -> Result<Flattened> {
    let root_is_structure = store
        .get(root)
        .map(|node| node.kind.is_structure_group())
        .unwrap_or(false);

    let mut out = Flattened::default();
    walk(store, root, root_is_structure, dialect, cancel, &mut out)?;
    Ok(out)
}

fn walk<S: TagStore>(
    store: &S,
    path: &str,
    in_structure: bool,
    dialect: &Dialect,
    cancel: &CancelToken,
    out: &mut Flattened,
) -> Result<()> {
    for child in store.children(path)? {
        if cancel.is_cancelled() {
            out.cancelled = true;
            return Ok(());
        }

        let child_path = join_path(path, &child.name);

        if dialect.conflicts_with(&child.name) {
            warn!(
                "Tag name \"{}\" cannot contain the separator character, please enable the WrapFields option. This tag will not be exported.",
                child.name
            );
            out.filtered += 1;
            continue;
        }
        if dialect.conflicts_with(&child_path) {
            warn!(
                "Tag path \"{}\" cannot contain the separator character, please enable the WrapFields option. This tag will not be exported.",
                child_path
            );
            out.filtered += 1;
            continue;
        }

        match &child.kind {
            NodeKind::Tag(spec) => match record_from_tag(&child.name, path, in_structure, spec) {
                Ok(record) => out.records.push(record),
                Err(e) => {
                    warn!("Skipping tag \"{}\": {}", child_path, e);
                    out.skipped += 1;
                }
            },
            kind if kind.is_container() => {
                walk(
                    store,
                    &child_path,
                    kind.is_structure_group(),
                    dialect,
                    cancel,
                    out,
                )?;
                if out.cancelled {
                    return Ok(());
                }
            }
            _ => debug!("Skipping object {}", child_path),
        }
    }
    Ok(())
}

fn record_from_tag(name: &str, parent_path: &str, in_structure: bool, spec: &TagSpec) -> Result<TagRecord> {
    Ok(TagRecord {
        name: name.to_string(),
        path: parent_path.to_string(),
        is_structure: in_structure,
        data_type: spec.resolved_type()?,
        array_elements: spec.array_elements(),
        array_update_mode: spec.array_update_mode,
        symbol_name: spec.symbol_name.clone(),
    })
}

/// Write the header and one row per record. Returns the number of rows written.
pub fn write_csv(path: &Path, dialect: Dialect, records: &[TagRecord]) -> Result<usize> {
    info!("Writing {} variable(s) to CSV file", records.len());
    let mut writer = CsvWriter::create(path, dialect)?;
    writer.write_fields(HEADER)?;
    for record in records {
        writer.write_fields(record.to_fields())?;
    }
    writer.finish()?;
    Ok(records.len())
}

/// Flatten the tree below `reference` and write it to `csv_path`.
pub fn export_to_csv<S: TagStore>(
    store: &S,
    reference: &str,
    csv_path: &Path,
    dialect: Dialect,
    cancel: &CancelToken,
) -> Result<ExportStats> {
    let root = resolve_root(store, reference)?;
    let flattened = flatten(store, &root, &dialect, cancel)?;
    write_flattened(csv_path, dialect, flattened)
}

/// Write out a finished walk; a cancelled walk writes nothing.
pub fn write_flattened(csv_path: &Path, dialect: Dialect, flattened: Flattened) -> Result<ExportStats> {
    let mut stats = ExportStats {
        exported: 0,
        filtered: flattened.filtered,
        skipped: flattened.skipped,
        cancelled: flattened.cancelled,
    };
    if stats.cancelled {
        warn!("Export cancelled before writing {}", csv_path.display());
        return Ok(stats);
    }

    stats.exported = write_csv(csv_path, dialect, &flattened.records).inspect_err(|e| {
        error!("Unable to export tags, error: {}", e);
    })?;
    info!("Finished exporting {} tag(s) to CSV file", stats.exported);
    Ok(stats)
}

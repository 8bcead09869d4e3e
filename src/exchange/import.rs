use std::io::Read;
use std::path::Path;

use log::{error, info, warn};

use crate::csv_codec::CsvReader;
use crate::error::{Result, TagCsvError};
use crate::tree::path::{join_path, normalize, segments, split_last};
use crate::tree::{NodeData, TagStore};

use super::record::TagRecord;
use super::task::CancelToken;

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ImportStats {
    pub imported: usize,
    /// Rows rejected by validation; the pass continued past them.
    pub rows_failed: usize,
    pub folders_created: usize,
    pub groups_created: usize,
    pub cancelled: bool,
}

/// Tracks the structure groups opened by earlier rows.
///
/// The open groups form a chain from the outermost group down to the most
/// recently opened nested one. Rows that are not structure members leave the
/// chain alone. A structure row continues the run when its path is an open
/// group, opens a nested group when its path lies below the innermost one,
/// and otherwise closes groups until one of those holds.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct StructureRun {
    open: Vec<String>,
}

impl StructureRun {
    /// Fold the next record into the run. The returned flag is true when the
    /// record opens a new structure group.
    pub fn next(mut self, record: &TagRecord) -> (StructureRun, bool) {
        if !record.is_structure {
            return (self, false);
        }
        let group = normalize(&record.path);
        while let Some(innermost) = self.open.last() {
            if *innermost == group {
                return (self, false);
            }
            if is_below(&group, innermost) {
                break;
            }
            self.open.pop();
        }
        self.open.push(group);
        (self, true)
    }
}

fn is_below(path: &str, ancestor: &str) -> bool {
    path.strip_prefix(ancestor).is_some_and(|rest| rest.starts_with('/'))
}

/// Tree changes made for one record.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct RowOutcome {
    pub folders_created: usize,
    pub group_created: bool,
}

/// Create every missing folder along `path`. Existing nodes are reused as-is.
pub fn ensure_folders<S: TagStore>(store: &mut S, path: &str) -> Result<usize> {
    let mut created = 0;
    let mut parent = String::new();
    for segment in segments(path) {
        let current = join_path(&parent, segment);
        if !store.exists(&current) {
            store.add(&parent, NodeData::folder(segment)).inspect_err(|e| {
                error!("Cannot create folder \"{}\" in current project, error {}", current, e);
            })?;
            created += 1;
        }
        parent = current;
    }
    Ok(created)
}

/// Replay one record against the tree.
///
/// The tag node at the record's location is always replaced. For structure
/// members, `opens_group` decides whether the group is recreated or the tag
/// joins the group created by an earlier row.
pub fn apply_record<S: TagStore>(
    store: &mut S,
    record: &TagRecord,
    opens_group: bool,
) -> Result<RowOutcome> {
    let mut outcome = RowOutcome::default();

    if !record.is_structure {
        let parent = normalize(&record.path);
        outcome.folders_created = ensure_folders(store, &parent)?;
        store.delete(&join_path(&parent, &record.name));
        store.add(&parent, record.to_node())?;
        return Ok(outcome);
    }

    let (group_parent, group_name) =
        split_last(&record.path).ok_or_else(|| TagCsvError::InvalidValue {
            field: "Path".to_string(),
            value: record.path.clone(),
        })?;
    let group_path = join_path(&group_parent, &group_name);
    outcome.folders_created = ensure_folders(store, &group_parent)?;

    let existing_group = store
        .get(&group_path)
        .map(|node| node.kind.is_structure_group());
    match existing_group {
        // Only structure groups are replaced.
        Some(false) => {
            error!(
                "Cannot create structure \"{}\": a node of another kind is already there",
                group_path
            );
            return Err(TagCsvError::NodeExists { path: group_path });
        }
        Some(true) if !opens_group => {}
        Some(true) => {
            store.delete(&group_path);
            store.add(&group_parent, NodeData::structure_group(&group_name))?;
            outcome.group_created = true;
        }
        None => {
            if !opens_group {
                warn!("Structure \"{}\" vanished mid-run; recreating it", group_path);
            }
            store.add(&group_parent, NodeData::structure_group(&group_name))?;
            outcome.group_created = true;
        }
    }

    store.delete(&join_path(&group_path, &record.name));
    store.add(&group_path, record.to_node())?;
    Ok(outcome)
}

/// Read rows from `reader` and replay them against `store`.
///
/// Rows failing validation are logged and skipped. Tree errors abort the
/// pass; nodes created before the failure stay in place.
pub fn import_rows<S: TagStore, R: Read>(
    store: &mut S,
    reader: &mut CsvReader<R>,
    cancel: &CancelToken,
) -> Result<ImportStats> {
    let mut stats = ImportStats::default();
    let mut run = StructureRun::default();

    loop {
        if cancel.is_cancelled() {
            warn!("Import cancelled after {} tag(s)", stats.imported);
            stats.cancelled = true;
            break;
        }

        let Some(row) = reader.next_row()? else {
            break;
        };

        let record = match row {
            Ok(row) => match TagRecord::from_row(&row) {
                Ok(record) => record,
                Err(e) if e.is_schema() => {
                    warn!("Skipping CSV line {}: {}", row.line(), e);
                    stats.rows_failed += 1;
                    continue;
                }
                Err(e) => return Err(e),
            },
            Err(row_error) => {
                warn!("Skipping CSV line {}: {}", row_error.line, row_error.error);
                stats.rows_failed += 1;
                continue;
            }
        };

        let (next_run, opens_group) = run.next(&record);
        run = next_run;

        let outcome = apply_record(store, &record, opens_group)?;
        stats.folders_created += outcome.folders_created;
        if outcome.group_created {
            stats.groups_created += 1;
        }
        stats.imported += 1;
    }

    Ok(stats)
}

/// Import every row of the CSV file at `csv_path` into `store`.
pub fn import_from_csv<S: TagStore>(
    store: &mut S,
    csv_path: &Path,
    delimiter: char,
    cancel: &CancelToken,
) -> Result<ImportStats> {
    info!("Importing tag(s) from CSV file at: \"{}\"", csv_path.display());

    let result = CsvReader::open(csv_path, delimiter)
        .and_then(|mut reader| import_rows(store, &mut reader, cancel));

    match result {
        Ok(stats) => {
            info!("Successfully imported {} tag(s) from CSV file", stats.imported);
            if stats.rows_failed > 0 {
                warn!("{} row(s) could not be imported", stats.rows_failed);
            }
            Ok(stats)
        }
        Err(e) => {
            error!("{}", e);
            Err(e)
        }
    }
}

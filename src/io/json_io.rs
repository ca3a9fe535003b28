use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::analysis::StandMetrics;
use crate::error::SimError;
use crate::models::{Tree, TreeRecord};

/// A JSON tree list is either a bare array or an object with a `trees` array.
#[derive(Deserialize)]
#[serde(untagged)]
enum TreeList {
    Bare(Vec<TreeRecord>),
    Wrapped { trees: Vec<TreeRecord> },
}

fn validated(list: TreeList) -> Result<Vec<TreeRecord>, SimError> {
    let records = match list {
        TreeList::Bare(records) | TreeList::Wrapped { trees: records } => records,
    };
    for (i, record) in records.iter().enumerate() {
        record.validate(i + 1)?;
    }
    Ok(records)
}

/// Read tree records from a JSON file.
pub fn read_tree_records_json(path: impl AsRef<Path>) -> Result<Vec<TreeRecord>, SimError> {
    let content = std::fs::read_to_string(path.as_ref())?;
    validated(serde_json::from_str(&content)?)
}

/// Read tree records from JSON bytes.
pub fn read_tree_records_json_from_bytes(data: &[u8]) -> Result<Vec<TreeRecord>, SimError> {
    let content = std::str::from_utf8(data)
        .map_err(|e| SimError::ParseError(format!("Invalid UTF-8: {e}")))?;
    validated(serde_json::from_str(content)?)
}

fn write_value<T: Serialize + ?Sized>(
    value: &T,
    path: impl AsRef<Path>,
    pretty: bool,
) -> Result<(), SimError> {
    let content = if pretty {
        serde_json::to_string_pretty(value)?
    } else {
        serde_json::to_string(value)?
    };
    std::fs::write(path.as_ref(), content)?;
    Ok(())
}

/// Write per-period stand metrics to a JSON file.
pub fn write_metrics_json(
    metrics: &[StandMetrics],
    path: impl AsRef<Path>,
    pretty: bool,
) -> Result<(), SimError> {
    write_value(metrics, path, pretty)
}

/// Write a tree list to a JSON file.
pub fn write_trees_json(trees: &[Tree], path: impl AsRef<Path>, pretty: bool) -> Result<(), SimError> {
    let records: Vec<TreeRecord> = trees.iter().map(TreeRecord::from).collect();
    write_value(&records, path, pretty)
}

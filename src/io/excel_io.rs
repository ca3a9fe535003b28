use std::collections::HashMap;
use std::path::Path;

use calamine::{open_workbook, Data, DataType, Reader, Xlsx};
use rust_xlsxwriter::{Workbook, Worksheet};

use crate::analysis::StandMetrics;
use crate::error::SimError;
use crate::models::{Tree, TreeRecord};

const TREE_HEADERS: [&str; 7] = [
    "tree_id",
    "species",
    "dbh",
    "height",
    "age",
    "crown_ratio",
    "weight",
];

const METRIC_HEADERS: [&str; 10] = [
    "age",
    "tree_count",
    "records",
    "mean_dbh",
    "qmd",
    "mean_height",
    "basal_area",
    "ccf",
    "volume_cuft",
    "mortality",
];

/// Read tree records from the first sheet of an Excel (.xlsx) file.
///
/// The first row holds column names, matched case-insensitively: a `dbh`
/// column is required; tree_id, species, height, age, crown_ratio and
/// weight are optional. Blank rows are skipped.
pub fn read_tree_records_excel(path: impl AsRef<Path>) -> Result<Vec<TreeRecord>, SimError> {
    let mut workbook: Xlsx<_> = open_workbook(path.as_ref())?;

    let sheet_name = workbook
        .sheet_names()
        .first()
        .cloned()
        .ok_or_else(|| SimError::Excel("No sheets found in workbook".to_string()))?;

    let range = workbook
        .worksheet_range(&sheet_name)
        .map_err(|e| SimError::Excel(e.to_string()))?;

    let mut rows = range.rows();
    let header = rows
        .next()
        .ok_or_else(|| SimError::Excel(format!("Sheet '{sheet_name}' is empty")))?;
    let columns: HashMap<String, usize> = header
        .iter()
        .enumerate()
        .map(|(i, cell)| (cell.to_string().trim().to_lowercase(), i))
        .collect();
    let dbh_col = *columns
        .get("dbh")
        .ok_or_else(|| SimError::Excel("Missing required column 'dbh'".to_string()))?;

    let mut records = Vec::new();
    for row in rows {
        if row.iter().all(|c| matches!(c, Data::Empty)) {
            continue;
        }

        let cell = |name: &str| columns.get(name).and_then(|&i| row.get(i));
        let get_opt_f64 = |name: &str| cell(name).and_then(|c| c.as_f64());
        let get_opt_string = |name: &str| {
            cell(name)
                .map(|c| c.to_string().trim().to_string())
                .filter(|s| !s.is_empty())
        };

        let position = records.len() + 1;
        let dbh = row.get(dbh_col).and_then(|c| c.as_f64()).ok_or_else(|| {
            SimError::Excel(format!("Record {position}: 'dbh' is missing or not a number"))
        })?;

        let record = TreeRecord {
            tree_id: get_opt_f64("tree_id")
                .map(|v| whole_number("tree_id", position, v))
                .transpose()?,
            species: get_opt_string("species"),
            dbh,
            height: get_opt_f64("height"),
            age: get_opt_f64("age")
                .map(|v| whole_number("age", position, v))
                .transpose()?,
            crown_ratio: get_opt_f64("crown_ratio"),
            weight: get_opt_f64("weight"),
        };
        record.validate(position)?;
        records.push(record);
    }

    Ok(records)
}

/// Excel stores every number as f64; ids and ages must still be exact
/// non-negative integers.
fn whole_number(name: &str, position: usize, value: f64) -> Result<u32, SimError> {
    if value.fract() == 0.0 && (0.0..=f64::from(u32::MAX)).contains(&value) {
        Ok(value as u32)
    } else {
        Err(SimError::ParseError(format!(
            "Record {position}: '{name}' must be a non-negative whole number, got {value}"
        )))
    }
}

fn write_headers(worksheet: &mut Worksheet, headers: &[&str]) -> Result<(), SimError> {
    for (col, header) in headers.iter().enumerate() {
        worksheet
            .write_string(0, col as u16, *header)
            .map_err(|e| SimError::Excel(e.to_string()))?;
    }
    Ok(())
}

fn write_opt(worksheet: &mut Worksheet, row: u32, col: u16, value: Option<f64>) -> Result<(), SimError> {
    if let Some(v) = value {
        worksheet
            .write_number(row, col, v)
            .map_err(|e| SimError::Excel(e.to_string()))?;
    }
    Ok(())
}

/// Write per-period stand metrics to an Excel (.xlsx) file.
pub fn write_metrics_excel(metrics: &[StandMetrics], path: impl AsRef<Path>) -> Result<(), SimError> {
    let mut workbook = Workbook::new();
    let worksheet = workbook.add_worksheet();
    worksheet
        .set_name("Metrics")
        .map_err(|e| SimError::Excel(e.to_string()))?;
    write_headers(worksheet, &METRIC_HEADERS)?;

    for (i, m) in metrics.iter().enumerate() {
        let row = i as u32 + 1;
        let values = [
            f64::from(m.age),
            m.tree_count,
            m.records as f64,
            m.mean_dbh,
            m.qmd,
            m.mean_height,
            m.basal_area,
            m.ccf,
            m.volume_cuft,
            m.mortality,
        ];
        for (col, value) in values.into_iter().enumerate() {
            worksheet
                .write_number(row, col as u16, value)
                .map_err(|e| SimError::Excel(e.to_string()))?;
        }
    }

    workbook
        .save(path.as_ref())
        .map_err(|e| SimError::Excel(e.to_string()))?;
    Ok(())
}

/// Write a tree list to an Excel (.xlsx) file in the layout the reader accepts.
pub fn write_trees_excel(trees: &[Tree], path: impl AsRef<Path>) -> Result<(), SimError> {
    let mut workbook = Workbook::new();
    let worksheet = workbook.add_worksheet();
    worksheet
        .set_name("Trees")
        .map_err(|e| SimError::Excel(e.to_string()))?;
    write_headers(worksheet, &TREE_HEADERS)?;

    for (i, tree) in trees.iter().enumerate() {
        let row = i as u32 + 1;
        worksheet
            .write_number(row, 0, f64::from(tree.id))
            .map_err(|e| SimError::Excel(e.to_string()))?;
        worksheet
            .write_string(row, 1, &tree.species)
            .map_err(|e| SimError::Excel(e.to_string()))?;
        write_opt(worksheet, row, 2, Some(tree.dbh))?;
        write_opt(worksheet, row, 3, Some(tree.height))?;
        write_opt(worksheet, row, 4, Some(f64::from(tree.age)))?;
        write_opt(worksheet, row, 5, Some(tree.crown_ratio))?;
        write_opt(worksheet, row, 6, Some(tree.weight))?;
    }

    workbook
        .save(path.as_ref())
        .map_err(|e| SimError::Excel(e.to_string()))?;
    Ok(())
}

mod csv_io;
mod excel_io;
mod json_io;
mod species_io;

use std::path::Path;

use crate::analysis::StandMetrics;
use crate::error::SimError;
use crate::models::{Tree, TreeRecord};

pub use csv_io::{read_tree_records_csv, read_tree_records_csv_from_bytes, write_metrics_csv, write_trees_csv};
pub use excel_io::{read_tree_records_excel, write_metrics_excel, write_trees_excel};
pub use json_io::{
    read_tree_records_json, read_tree_records_json_from_bytes, write_metrics_json, write_trees_json,
};
pub use species_io::{
    load_coefficient_store, parse_species_csv, parse_species_json, parse_species_toml,
    read_species_file, write_species_file, SpeciesCoefficientRow,
};

/// Trait for reading tree lists from a file.
pub trait TreeListReader {
    fn read(&self, path: &Path) -> Result<Vec<TreeRecord>, SimError>;
}

/// Trait for writing simulation output to a file.
pub trait MetricsWriter {
    fn write_metrics(&self, metrics: &[StandMetrics], path: &Path) -> Result<(), SimError>;
    fn write_trees(&self, trees: &[Tree], path: &Path) -> Result<(), SimError>;
}

/// CSV format reader/writer.
pub struct CsvFormat;

impl TreeListReader for CsvFormat {
    fn read(&self, path: &Path) -> Result<Vec<TreeRecord>, SimError> {
        read_tree_records_csv(path)
    }
}

impl MetricsWriter for CsvFormat {
    fn write_metrics(&self, metrics: &[StandMetrics], path: &Path) -> Result<(), SimError> {
        write_metrics_csv(metrics, path)
    }

    fn write_trees(&self, trees: &[Tree], path: &Path) -> Result<(), SimError> {
        write_trees_csv(trees, path)
    }
}

/// JSON format reader/writer.
#[derive(Default)]
pub struct JsonFormat {
    pub pretty: bool,
}

impl TreeListReader for JsonFormat {
    fn read(&self, path: &Path) -> Result<Vec<TreeRecord>, SimError> {
        read_tree_records_json(path)
    }
}

impl MetricsWriter for JsonFormat {
    fn write_metrics(&self, metrics: &[StandMetrics], path: &Path) -> Result<(), SimError> {
        write_metrics_json(metrics, path, self.pretty)
    }

    fn write_trees(&self, trees: &[Tree], path: &Path) -> Result<(), SimError> {
        write_trees_json(trees, path, self.pretty)
    }
}

/// Excel (.xlsx) format reader/writer.
pub struct ExcelFormat;

impl TreeListReader for ExcelFormat {
    fn read(&self, path: &Path) -> Result<Vec<TreeRecord>, SimError> {
        read_tree_records_excel(path)
    }
}

impl MetricsWriter for ExcelFormat {
    fn write_metrics(&self, metrics: &[StandMetrics], path: &Path) -> Result<(), SimError> {
        write_metrics_excel(metrics, path)
    }

    fn write_trees(&self, trees: &[Tree], path: &Path) -> Result<(), SimError> {
        write_trees_excel(trees, path)
    }
}

use std::io::Read;
use std::path::Path;

use crate::analysis::StandMetrics;
use crate::error::SimError;
use crate::models::{Tree, TreeRecord};

fn reader_builder() -> csv::ReaderBuilder {
    let mut builder = csv::ReaderBuilder::new();
    builder.has_headers(true).flexible(true).trim(csv::Trim::All);
    builder
}

fn parse_records<R: Read>(rdr: &mut csv::Reader<R>) -> Result<Vec<TreeRecord>, SimError> {
    let mut records = Vec::new();
    for (i, result) in rdr.deserialize().enumerate() {
        let record: TreeRecord = result?;
        record.validate(i + 1)?;
        records.push(record);
    }
    Ok(records)
}

/// Read tree records from a CSV file.
///
/// Requires a `dbh` column; `tree_id`, `species`, `height`, `age`,
/// `crown_ratio` and `weight` are optional and may be left blank.
pub fn read_tree_records_csv(path: impl AsRef<Path>) -> Result<Vec<TreeRecord>, SimError> {
    let mut rdr = reader_builder().from_path(path.as_ref())?;
    parse_records(&mut rdr)
}

/// Read tree records from CSV bytes.
pub fn read_tree_records_csv_from_bytes(data: &[u8]) -> Result<Vec<TreeRecord>, SimError> {
    let mut rdr = reader_builder().from_reader(data);
    parse_records(&mut rdr)
}

/// Write per-period stand metrics to a CSV file.
pub fn write_metrics_csv(metrics: &[StandMetrics], path: impl AsRef<Path>) -> Result<(), SimError> {
    let mut wtr = csv::Writer::from_path(path.as_ref())?;
    for row in metrics {
        wtr.serialize(row)?;
    }
    wtr.flush()?;
    Ok(())
}

/// Write a tree list to a CSV file in the same layout the reader accepts.
pub fn write_trees_csv(trees: &[Tree], path: impl AsRef<Path>) -> Result<(), SimError> {
    let mut wtr = csv::Writer::from_path(path.as_ref())?;
    for tree in trees {
        wtr.serialize(TreeRecord::from(tree))?;
    }
    wtr.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_read_full_columns() {
        let data = b"tree_id,species,dbh,height,age,crown_ratio,weight\n\
                     1,LP,8.5,52.0,20,0.45,25\n\
                     2,LP,6.1,44.0,18,0.5,25\n";
        let records = read_tree_records_csv_from_bytes(data).unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].tree_id, Some(1));
        assert_eq!(records[0].species.as_deref(), Some("LP"));
        assert_eq!(records[1].age, Some(18));
        assert_eq!(records[1].weight, Some(25.0));
    }

    #[test]
    fn test_read_minimal_columns() {
        let data = b"dbh\n4.0\n5.5\n";
        let records = read_tree_records_csv_from_bytes(data).unwrap();
        assert_eq!(records.len(), 2);
        assert!(records[0].tree_id.is_none());
        assert!(records[0].height.is_none());
        assert!(records[1].weight.is_none());
    }

    #[test]
    fn test_blank_optional_fields() {
        let data = b"tree_id,species,dbh,height,age,crown_ratio,weight\n\
                     7, LP , 3.2 ,,,,\n";
        let records = read_tree_records_csv_from_bytes(data).unwrap();
        assert_eq!(records[0].tree_id, Some(7));
        assert_eq!(records[0].species.as_deref(), Some("LP"));
        assert_eq!(records[0].dbh, 3.2);
        assert!(records[0].crown_ratio.is_none());
    }

    #[test]
    fn test_rejects_invalid_record() {
        let data = b"tree_id,species,dbh,crown_ratio\n3,LP,5.0,1.4\n";
        let err = read_tree_records_csv_from_bytes(data).unwrap_err();
        let message = err.to_string();
        assert!(message.contains("Tree 3 (LP)"), "{message}");
        assert!(message.contains("1.4"), "{message}");
    }

    #[test]
    fn test_missing_dbh_is_parse_failure() {
        let data = b"tree_id,species,height\n1,LP,40\n";
        assert!(matches!(
            read_tree_records_csv_from_bytes(data),
            Err(SimError::Csv(_))
        ));
    }

    #[test]
    fn test_write_and_read_trees() {
        let trees = vec![
            Tree::new(1, "LP", 9.0, 58.0, 25, 0.4, 150.0),
            Tree::new(2, "LP", 7.0, 50.0, 25, 0.35, 150.0),
        ];
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("trees.csv");
        write_trees_csv(&trees, &path).unwrap();

        let records = read_tree_records_csv(&path).unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[1], TreeRecord::from(&trees[1]));
    }

    #[test]
    fn test_write_metrics() {
        let trees = vec![Tree::new(1, "LP", 9.0, 58.0, 25, 0.4, 150.0)];
        let metrics = vec![StandMetrics::from_trees(25, &trees, 120.0, 2000.0, 4.0)];
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("metrics.csv");
        write_metrics_csv(&metrics, &path).unwrap();

        let content = std::fs::read_to_string(&path).unwrap();
        let header = content.lines().next().unwrap();
        assert!(header.starts_with("age,tree_count,records,mean_dbh,qmd"));
        assert_eq!(content.lines().count(), 2);
    }
}

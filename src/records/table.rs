use std::path::Path;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{AppError, Context, Result};
use crate::utils::ensure_parent_dir;

/// Column-ordered result set returned by the data service.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Table {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<Value>>,
}

impl Table {
    pub fn new(columns: Vec<String>, rows: Vec<Vec<Value>>) -> Self {
        Self { columns, rows }
    }

    pub fn empty(columns: Vec<String>) -> Self {
        Self {
            columns,
            rows: Vec::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Append the rows of `other`, which must share this table's column layout.
    pub fn append(&mut self, other: Table) -> Result<()> {
        if other.columns != self.columns {
            return Err(AppError::message(format!(
                "cannot merge result sets with different columns: {:?} vs {:?}",
                self.columns, other.columns
            )));
        }
        self.rows.extend(other.rows);
        Ok(())
    }

    /// Concatenate `parts` in order. The first part defines the layout;
    /// `columns` is used only when there are no parts at all.
    pub fn concat<I>(columns: Vec<String>, parts: I) -> Result<Table>
    where
        I: IntoIterator<Item = Table>,
    {
        let mut parts = parts.into_iter();
        let Some(mut merged) = parts.next() else {
            return Ok(Table::empty(columns));
        };
        for part in parts {
            merged.append(part)?;
        }
        Ok(merged)
    }

    /// Reorder columns to `columns`, dropping any the caller did not ask for.
    /// Fails with the name of the first requested column that is missing.
    pub fn project(self, columns: &[String]) -> std::result::Result<Table, String> {
        if self.columns == columns {
            return Ok(self);
        }

        let mut positions = Vec::with_capacity(columns.len());
        for wanted in columns {
            match self.columns.iter().position(|have| have == wanted) {
                Some(idx) => positions.push(idx),
                None => return Err(wanted.clone()),
            }
        }

        let rows = self
            .rows
            .into_iter()
            .map(|row| {
                positions
                    .iter()
                    .map(|&idx| row.get(idx).cloned().unwrap_or(Value::Null))
                    .collect()
            })
            .collect();
        Ok(Table::new(columns.to_vec(), rows))
    }

    pub fn save_to_csv<P: AsRef<Path>>(&self, file_path: P) -> Result<()> {
        let path = file_path.as_ref();
        ensure_parent_dir(path)?;
        let mut writer = csv::Writer::from_path(path)
            .with_context(|| format!("Failed to create CSV writer for {}", path.display()))?;

        writer.write_record(&self.columns)?;
        for row in &self.rows {
            writer.write_record(row.iter().map(cell_to_string))?;
        }

        writer.flush().context("Failed to flush CSV writer")?;
        Ok(())
    }
}

pub fn cell_to_string(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn columns() -> Vec<String> {
        vec!["Stkcd".to_string(), "Clsprc".to_string()]
    }

    #[test]
    fn concat_keeps_part_order() {
        let first = Table::new(columns(), vec![vec![json!("000001"), json!(10.5)]]);
        let second = Table::new(
            columns(),
            vec![
                vec![json!("000002"), json!(20.1)],
                vec![json!("000004"), json!(null)],
            ],
        );

        let merged = Table::concat(columns(), vec![first, second]).unwrap();
        assert_eq!(merged.len(), 3);
        assert_eq!(merged.rows[0][0], json!("000001"));
        assert_eq!(merged.rows[2][0], json!("000004"));
    }

    #[test]
    fn concat_of_nothing_is_empty_with_columns() {
        let merged = Table::concat(columns(), Vec::new()).unwrap();
        assert!(merged.is_empty());
        assert_eq!(merged.columns, columns());
    }

    #[test]
    fn append_rejects_mismatched_columns() {
        let mut table = Table::empty(columns());
        let other = Table::empty(vec!["Stkcd".to_string()]);
        assert!(table.append(other).is_err());
    }

    #[test]
    fn project_reorders_and_drops_columns() {
        let table = Table::new(
            vec!["Clsprc".to_string(), "Trddt".to_string(), "Stkcd".to_string()],
            vec![vec![json!(10.5), json!("2020-01-02"), json!("000001")]],
        );

        let projected = table.clone().project(&columns()).unwrap();
        assert_eq!(projected.columns, columns());
        assert_eq!(projected.rows[0], vec![json!("000001"), json!(10.5)]);

        let missing = table.project(&["Opnprc".to_string()]).unwrap_err();
        assert_eq!(missing, "Opnprc");
    }

    #[test]
    fn writes_csv_with_header() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out").join("prices.csv");
        let table = Table::new(
            columns(),
            vec![vec![json!("000001"), json!(10.5)], vec![json!("000002"), json!(null)]],
        );

        table.save_to_csv(&path).unwrap();

        let written = std::fs::read_to_string(&path).unwrap();
        assert_eq!(written, "Stkcd,Clsprc\n000001,10.5\n000002,\n");
    }
}

use anyhow::{bail, Context, Result};
use csv::ReaderBuilder;
use serde_json::Value as JsonValue;
use std::collections::HashSet;
use std::fs::File;
use std::io::BufReader;
use std::path::Path;
use tracing::{debug, info};

use crate::data::column::ColumnDef;
use crate::data::record::{DataValue, FieldAccess, Record};
use crate::data::type_inference::{infer_columns, InferredType, TypeInference};

/// Rows read from a file, with the field names seen in them
#[derive(Debug, Clone)]
pub struct LoadedTable<R> {
    pub name: String,
    pub source_path: Option<String>,
    /// Field names in first-seen order
    pub field_names: Vec<String>,
    pub rows: Vec<R>,
}

impl<R: FieldAccess> LoadedTable<R> {
    /// Default schema built from sampled values
    pub fn infer_columns(&self) -> Vec<ColumnDef<R>> {
        infer_columns(&self.rows, &self.field_names)
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// Either kind of file the viewer can open
#[derive(Debug, Clone)]
pub enum LoadedFile {
    Json(LoadedTable<JsonValue>),
    Csv(LoadedTable<Record>),
}

/// Load a `.json` or `.csv` file, picking the loader from the extension
pub fn load_file<P: AsRef<Path>>(path: P) -> Result<LoadedFile> {
    let path = path.as_ref();
    let extension = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase());

    match extension.as_deref() {
        Some("json") => Ok(LoadedFile::Json(load_json_rows(path)?)),
        Some("csv") => Ok(LoadedFile::Csv(load_csv_records(path)?)),
        _ => bail!("Unsupported file type: {:?} (expected .json or .csv)", path),
    }
}

fn table_name(path: &Path) -> String {
    path.file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("data")
        .to_string()
}

/// Load a JSON file holding an array of objects
pub fn load_json_rows<P: AsRef<Path>>(path: P) -> Result<LoadedTable<JsonValue>> {
    let path = path.as_ref();
    let file =
        File::open(path).with_context(|| format!("Failed to open JSON file: {:?}", path))?;
    let reader = BufReader::new(file);

    let data: Vec<JsonValue> = serde_json::from_reader(reader)
        .with_context(|| format!("Failed to parse JSON file: {:?}", path))?;

    let mut table = load_json_data(data, &table_name(path))?;
    table.source_path = Some(path.display().to_string());
    info!(
        target: "loader",
        "Loaded {} JSON rows with {} fields from {:?}",
        table.rows.len(),
        table.field_names.len(),
        path
    );
    Ok(table)
}

/// Wrap already-parsed JSON objects; field names are the union of all keys
pub fn load_json_data(data: Vec<JsonValue>, name: &str) -> Result<LoadedTable<JsonValue>> {
    let mut seen = HashSet::new();
    let mut field_names = Vec::new();

    for (idx, item) in data.iter().enumerate() {
        let Some(obj) = item.as_object() else {
            bail!("JSON data must be an array of objects (element {} is not)", idx);
        };
        for key in obj.keys() {
            if seen.insert(key.clone()) {
                field_names.push(key.clone());
            }
        }
    }

    Ok(LoadedTable {
        name: name.to_string(),
        source_path: None,
        field_names,
        rows: data,
    })
}

/// Load a CSV file with a header row; cell types are inferred per column
pub fn load_csv_records<P: AsRef<Path>>(path: P) -> Result<LoadedTable<Record>> {
    let path = path.as_ref();
    let file = File::open(path).with_context(|| format!("Failed to open CSV file: {:?}", path))?;

    let mut reader = ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_reader(file);

    let headers: Vec<String> = reader
        .headers()
        .with_context(|| format!("Failed to read CSV headers: {:?}", path))?
        .iter()
        .map(|h| h.trim().to_string())
        .collect();

    let mut string_rows = Vec::new();
    for (line, result) in reader.records().enumerate() {
        let record =
            result.with_context(|| format!("Failed to read CSV record {} in {:?}", line + 1, path))?;
        string_rows.push(record.iter().map(str::to_string).collect::<Vec<String>>());
    }

    let mut kinds = vec![InferredType::Null; headers.len()];
    for row in string_rows.iter().take(100) {
        for (col_idx, value) in row.iter().enumerate().take(headers.len()) {
            let inferred = TypeInference::infer_from_string(value);
            kinds[col_idx] = TypeInference::merge_types(kinds[col_idx], inferred);
        }
    }
    debug!(target: "loader", "CSV column kinds: {:?}", kinds);

    let rows = string_rows
        .into_iter()
        .map(|values| {
            let mut record = Record::new();
            for (col_idx, header) in headers.iter().enumerate() {
                let value = values
                    .get(col_idx)
                    .map(|text| TypeInference::parse_cell(text, kinds[col_idx]))
                    .unwrap_or(DataValue::Null);
                record.insert(header.clone(), value);
            }
            record
        })
        .collect::<Vec<_>>();

    info!(
        target: "loader",
        "Loaded {} CSV rows with {} columns from {:?}",
        rows.len(),
        headers.len(),
        path
    );

    Ok(LoadedTable {
        name: table_name(path),
        source_path: Some(path.display().to_string()),
        field_names: headers,
        rows,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_json_field_names_are_first_seen_union() {
        let data = vec![json!({ "a": 1, "b": 2 }), json!({ "c": 3, "a": 4 })];
        let table = load_json_data(data, "t").unwrap();

        assert_eq!(table.field_names, ["a", "b", "c"]);
        assert_eq!(table.len(), 2);
    }

    #[test]
    fn test_json_rejects_non_objects() {
        let data = vec![json!({ "a": 1 }), json!(5)];
        assert!(load_json_data(data, "t").is_err());
    }

    #[test]
    fn test_empty_json_is_empty_table() {
        let table = load_json_data(Vec::new(), "t").unwrap();
        assert!(table.is_empty());
        assert!(table.field_names.is_empty());
        assert!(table.infer_columns().is_empty());
    }

    #[test]
    fn test_missing_csv_cells_are_null() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("short.csv");
        std::fs::write(&path, "id,amount\nA,1\nB\n").unwrap();

        let table = load_csv_records(&path).unwrap();
        assert_eq!(table.rows[1].get("amount"), Some(&DataValue::Null));
        assert_eq!(table.rows[0].get("amount"), Some(&DataValue::Integer(1)));
    }
}

use case_table::data::column::{ColumnType, FilterKind};
use case_table::data::filter::FilterValue;
use case_table::data::record::DataValue;
use case_table::data::view_engine::{DataViewEngine, ViewOptions};
use case_table::loaders::{load_csv_records, load_file, load_json_rows, LoadedFile};
use std::fs;
use std::path::PathBuf;
use tempfile::tempdir;

fn get_test_data_path(filename: &str) -> PathBuf {
    let mut path = PathBuf::from(env!("CARGO_MANIFEST_DIR"));
    path.push("data");
    path.push(filename);
    path
}

#[test]
fn test_load_sample_cases() {
    let table = load_json_rows(get_test_data_path("cases.json")).expect("Failed to load cases.json");

    assert_eq!(table.name, "cases");
    assert_eq!(table.len(), 12);
    for field in ["id", "div", "status", "bucket", "amount", "openedAt"] {
        assert!(table.field_names.iter().any(|f| f == field), "missing {}", field);
    }

    let columns = table.infer_columns();
    let amount = columns.iter().find(|c| c.key == "amount").unwrap();
    assert_eq!(amount.column_type, ColumnType::Number);
    assert_eq!(amount.filter, FilterKind::NumberRange);

    let opened = columns.iter().find(|c| c.key == "openedAt").unwrap();
    assert_eq!(opened.column_type, ColumnType::Date);
    assert_eq!(opened.filter, FilterKind::DateRange);

    let id = columns.iter().find(|c| c.key == "id").unwrap();
    assert_eq!(id.column_type, ColumnType::String);
}

#[test]
fn test_sample_cases_through_engine() {
    let table = load_json_rows(get_test_data_path("cases.json")).unwrap();
    let columns = table.infer_columns();
    let mut engine = DataViewEngine::new(columns, table.rows, ViewOptions::default()).unwrap();

    let view = engine.view();
    assert_eq!(view.total_count, 12);
    assert_eq!(view.total_pages, 3);

    engine.set_search_term("inbox");
    assert_eq!(engine.view().total_count, 6);

    engine.set_column_filter("amount", FilterValue::min("1000"));
    assert_eq!(engine.view().total_count, 3);

    engine.reset();
    engine.set_column_filter("openedAt", FilterValue::start("2024-03-01"));
    assert_eq!(engine.view().total_count, 5);

    engine.set_sort("amount");
    engine.set_sort("amount");
    let first = engine.view().visible_rows[0]["id"].clone();
    assert_eq!(first, "CASE-10052");
}

#[test]
fn test_load_csv_infers_types() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("cases.csv");
    fs::write(
        &path,
        "id,amount,opened,urgent\n\
         CASE-1,100,2024-01-05,true\n\
         CASE-2,2.5,2024/02/01,false\n\
         CASE-3,,01/15/2024,\n",
    )
    .unwrap();

    let table = load_csv_records(&path).unwrap();
    assert_eq!(table.field_names, ["id", "amount", "opened", "urgent"]);
    assert_eq!(table.len(), 3);

    assert_eq!(table.rows[0].get("amount"), Some(&DataValue::Float(100.0)));
    assert_eq!(table.rows[2].get("amount"), Some(&DataValue::Null));
    assert_eq!(table.rows[0].get("urgent"), Some(&DataValue::Boolean(true)));
    assert_eq!(table.rows[1].get("opened"), Some(&DataValue::from("2024/02/01")));

    let columns = table.infer_columns();
    assert_eq!(columns[1].column_type, ColumnType::Number);
    assert_eq!(columns[2].column_type, ColumnType::Date);
    assert_eq!(columns[3].column_type, ColumnType::String);

    let mut engine = DataViewEngine::new(columns, table.rows, ViewOptions::default()).unwrap();
    engine.set_sort("opened");
    let order: Vec<usize> = engine.view().visible_indices.to_vec();
    assert_eq!(order, [0, 2, 1]);
}

#[test]
fn test_load_file_dispatches_on_extension() {
    let dir = tempdir().unwrap();

    let json_path = dir.path().join("rows.JSON");
    fs::write(&json_path, r#"[{"id": "A"}, {"id": "B", "extra": 1}]"#).unwrap();
    match load_file(&json_path).unwrap() {
        LoadedFile::Json(table) => assert_eq!(table.field_names, ["id", "extra"]),
        LoadedFile::Csv(_) => panic!("expected JSON"),
    }

    let csv_path = dir.path().join("rows.csv");
    fs::write(&csv_path, "id\nA\n").unwrap();
    assert!(matches!(load_file(&csv_path).unwrap(), LoadedFile::Csv(_)));

    let txt_path = dir.path().join("rows.txt");
    fs::write(&txt_path, "id\nA\n").unwrap();
    assert!(load_file(&txt_path).is_err());
}

#[test]
fn test_load_errors_carry_path() {
    let dir = tempdir().unwrap();
    let missing = dir.path().join("missing.json");
    let err = load_json_rows(&missing).unwrap_err();
    assert!(format!("{:#}", err).contains("missing.json"));

    let broken = dir.path().join("broken.json");
    fs::write(&broken, "{ not json").unwrap();
    assert!(load_json_rows(&broken).is_err());

    let scalar = dir.path().join("scalar.json");
    fs::write(&scalar, "[1, 2]").unwrap();
    assert!(load_json_rows(&scalar).is_err());
}

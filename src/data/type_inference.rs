//! Column kind inference for loaded files.
//!
//! Hosts normally supply their own schema. When a file is opened without
//! one, the loaders sample its values and build a default schema from what
//! they find: numeric columns become sortable number ranges, date columns
//! sortable date ranges, everything else a sortable text filter.

use regex::Regex;
use std::sync::LazyLock;

use crate::data::column::{ColumnDef, ColumnType, FilterKind};
use crate::data::record::{DataValue, FieldAccess};

/// Date layouts recognised during inference; each one is also accepted by
/// timestamp coercion.
static DATE_PATTERNS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    vec![
        // YYYY-MM-DD
        Regex::new(r"^(19|20)\d{2}-(0[1-9]|1[0-2])-(0[1-9]|[12]\d|3[01])$").unwrap(),
        // YYYY/MM/DD
        Regex::new(r"^(19|20)\d{2}/(0[1-9]|1[0-2])/(0[1-9]|[12]\d|3[01])$").unwrap(),
        // MM/DD/YYYY
        Regex::new(r"^(0[1-9]|1[0-2])/(0[1-9]|[12]\d|3[01])/(19|20)\d{2}$").unwrap(),
        // YYYY-MM-DD[T ]HH:MM[:SS[.fff]][Z|+HH:MM]
        Regex::new(
            r"^(19|20)\d{2}-(0[1-9]|1[0-2])-(0[1-9]|[12]\d|3[01])[T ]\d{2}:\d{2}(:\d{2}(\.\d+)?)?(Z|[+-]\d{2}:\d{2})?$",
        )
        .unwrap(),
    ]
});

/// Number of rows sampled per column
const SAMPLE_SIZE: usize = 100;

/// Detected kind of a value or column
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InferredType {
    Null,
    Boolean,
    Integer,
    Float,
    Date,
    Text,
}

impl InferredType {
    /// Column type used for comparison and range filters
    pub fn column_type(self) -> ColumnType {
        match self {
            InferredType::Integer | InferredType::Float => ColumnType::Number,
            InferredType::Date => ColumnType::Date,
            InferredType::Null | InferredType::Boolean | InferredType::Text => ColumnType::String,
        }
    }

    /// Filter offered for a column of this kind
    pub fn filter_kind(self) -> FilterKind {
        match self.column_type() {
            ColumnType::Number => FilterKind::NumberRange,
            ColumnType::Date => FilterKind::DateRange,
            ColumnType::String => FilterKind::Text,
        }
    }
}

/// Type inference utilities
pub struct TypeInference;

impl TypeInference {
    /// Infer the kind of a single raw text value
    pub fn infer_from_string(value: &str) -> InferredType {
        let value = value.trim();
        if value.is_empty() || value.eq_ignore_ascii_case("null") {
            return InferredType::Null;
        }

        if value.eq_ignore_ascii_case("true") || value.eq_ignore_ascii_case("false") {
            return InferredType::Boolean;
        }

        if value.parse::<i64>().is_ok() {
            return InferredType::Integer;
        }

        if value.parse::<f64>().is_ok_and(f64::is_finite) {
            return InferredType::Float;
        }

        if Self::looks_like_date(value) {
            return InferredType::Date;
        }

        InferredType::Text
    }

    /// Infer the kind of an already-typed value
    pub fn infer_from_value(value: &DataValue) -> InferredType {
        match value {
            DataValue::Null => InferredType::Null,
            DataValue::Boolean(_) => InferredType::Boolean,
            DataValue::Integer(_) => InferredType::Integer,
            DataValue::Float(_) => InferredType::Float,
            DataValue::DateTime(_) => InferredType::Date,
            DataValue::String(s) => Self::infer_from_string(s),
        }
    }

    /// Strict date check; ID-like strings such as "BQ-81198596" stay text
    pub fn looks_like_date(value: &str) -> bool {
        if value.len() < 8 || value.len() > 35 {
            return false;
        }
        DATE_PATTERNS.iter().any(|pattern| pattern.is_match(value))
    }

    /// Merge two kinds observed in the same column.
    ///
    /// Null yields to anything, integers widen to floats, and any other mix
    /// degrades to text.
    pub fn merge_types(a: InferredType, b: InferredType) -> InferredType {
        use InferredType::*;

        match (a, b) {
            (x, y) if x == y => x,
            (Null, t) | (t, Null) => t,
            (Integer, Float) | (Float, Integer) => Float,
            _ => Text,
        }
    }

    /// Infer a column kind from sampled values
    pub fn infer_from_samples<'a, I>(values: I) -> InferredType
    where
        I: Iterator<Item = &'a DataValue>,
    {
        let mut result = InferredType::Null;

        for value in values.take(SAMPLE_SIZE) {
            result = Self::merge_types(result, Self::infer_from_value(value));
            if result == InferredType::Text {
                break;
            }
        }

        result
    }

    /// Convert raw text to a typed value for a column of the given kind.
    ///
    /// Dates are kept as text; coercion parses them when needed, and search
    /// then matches the text as the file spelled it.
    pub fn parse_cell(text: &str, kind: InferredType) -> DataValue {
        if text.trim().is_empty() {
            return DataValue::Null;
        }

        let trimmed = text.trim();
        match kind {
            InferredType::Integer => trimmed
                .parse::<i64>()
                .map(DataValue::Integer)
                .unwrap_or_else(|_| DataValue::String(text.to_string())),
            InferredType::Float => trimmed
                .parse::<f64>()
                .map(DataValue::Float)
                .unwrap_or_else(|_| DataValue::String(text.to_string())),
            InferredType::Boolean => match trimmed.to_ascii_lowercase().as_str() {
                "true" => DataValue::Boolean(true),
                "false" => DataValue::Boolean(false),
                _ => DataValue::String(text.to_string()),
            },
            InferredType::Null if trimmed.eq_ignore_ascii_case("null") => DataValue::Null,
            InferredType::Null | InferredType::Date | InferredType::Text => {
                DataValue::String(text.to_string())
            }
        }
    }
}

/// Build a default schema for `field_names` by sampling `rows`
pub fn infer_columns<R: FieldAccess>(rows: &[R], field_names: &[String]) -> Vec<ColumnDef<R>> {
    field_names
        .iter()
        .map(|name| {
            let samples: Vec<DataValue> = rows
                .iter()
                .take(SAMPLE_SIZE)
                .map(|row| row.field(name).unwrap_or(DataValue::Null))
                .collect();
            let kind = TypeInference::infer_from_samples(samples.iter());

            ColumnDef::new(name.as_str())
                .with_type(kind.column_type())
                .with_filter(kind.filter_kind())
                .with_sortable(true)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::record::Record;

    #[test]
    fn test_basic_type_inference() {
        assert_eq!(TypeInference::infer_from_string("123"), InferredType::Integer);
        assert_eq!(TypeInference::infer_from_string("123.45"), InferredType::Float);
        assert_eq!(TypeInference::infer_from_string("FALSE"), InferredType::Boolean);
        assert_eq!(TypeInference::infer_from_string("Inbox"), InferredType::Text);
        assert_eq!(TypeInference::infer_from_string(" "), InferredType::Null);
        assert_eq!(TypeInference::infer_from_string("NaN"), InferredType::Text);
    }

    #[test]
    fn test_date_detection() {
        for date in [
            "2024-01-15",
            "2024/01/15",
            "01/15/2024",
            "2024-01-15T10:30:00",
            "2024-01-15 10:30",
            "2024-01-15T10:30:00.250Z",
            "2024-01-15T10:30:00+02:00",
        ] {
            assert_eq!(
                TypeInference::infer_from_string(date),
                InferredType::Date,
                "{} should be a date",
                date
            );
        }
    }

    #[test]
    fn test_case_ids_are_not_dates() {
        for id in ["CASE-10045", "BQ-81198596", "DIV-2024-001", "2024-13-01", "2024-01-32"] {
            assert_eq!(
                TypeInference::infer_from_string(id),
                InferredType::Text,
                "{} should be text",
                id
            );
        }
    }

    #[test]
    fn test_type_merging() {
        use InferredType::*;

        assert_eq!(TypeInference::merge_types(Null, Integer), Integer);
        assert_eq!(TypeInference::merge_types(Integer, Float), Float);
        assert_eq!(TypeInference::merge_types(Date, Null), Date);
        assert_eq!(TypeInference::merge_types(Date, Integer), Text);
        assert_eq!(TypeInference::merge_types(Boolean, Integer), Text);
    }

    #[test]
    fn test_parse_cell() {
        assert_eq!(
            TypeInference::parse_cell("42", InferredType::Integer),
            DataValue::Integer(42)
        );
        assert_eq!(
            TypeInference::parse_cell("oops", InferredType::Integer),
            DataValue::from("oops")
        );
        assert_eq!(
            TypeInference::parse_cell("True", InferredType::Boolean),
            DataValue::Boolean(true)
        );
        assert_eq!(
            TypeInference::parse_cell("2024-01-15", InferredType::Date),
            DataValue::from("2024-01-15")
        );
        assert_eq!(TypeInference::parse_cell("", InferredType::Text), DataValue::Null);
    }

    #[test]
    fn test_infer_columns() {
        let rows = vec![
            Record::new()
                .with("id", "CASE-1")
                .with("amount", 10i64)
                .with("opened", "2024-01-02"),
            Record::new()
                .with("id", "CASE-2")
                .with("amount", 2.5)
                .with("opened", DataValue::Null),
        ];
        let names = vec!["id".to_string(), "amount".to_string(), "opened".to_string()];

        let columns = infer_columns(&rows, &names);
        assert_eq!(columns[0].column_type, ColumnType::String);
        assert_eq!(columns[0].filter, FilterKind::Text);
        assert_eq!(columns[1].column_type, ColumnType::Number);
        assert_eq!(columns[1].filter, FilterKind::NumberRange);
        assert_eq!(columns[2].column_type, ColumnType::Date);
        assert_eq!(columns[2].filter, FilterKind::DateRange);
        assert!(columns.iter().all(|c| c.sortable));
    }
}

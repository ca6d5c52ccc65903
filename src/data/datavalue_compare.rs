use crate::data::coercion::{to_number, to_timestamp};
use crate::data::column::ColumnType;
use crate::data::record::DataValue;
use std::cmp::Ordering;

/// Sort key for one cell, resolved once per row before sorting.
///
/// Keys form a total order: coerced values first (numeric order), then
/// uncoercible values as folded text, then missing values. String columns
/// only produce `Text` keys.
#[derive(Debug, Clone, PartialEq)]
pub enum SortKey {
    Coerced(f64),
    Text(String),
    Missing,
}

impl SortKey {
    pub fn new(value: &DataValue, column_type: ColumnType) -> Self {
        if value.is_null() {
            return SortKey::Missing;
        }
        let coerced = match column_type {
            ColumnType::Number => to_number(value),
            ColumnType::Date => to_timestamp(value),
            ColumnType::String => None,
        };
        match coerced {
            Some(n) => SortKey::Coerced(n),
            None => SortKey::Text(value.to_search_text().to_lowercase()),
        }
    }

    pub fn is_missing(&self) -> bool {
        matches!(self, SortKey::Missing)
    }

    /// Ascending order over present keys; `Missing` sorts after everything
    fn cmp_ascending(&self, other: &Self) -> Ordering {
        match (self, other) {
            (SortKey::Coerced(a), SortKey::Coerced(b)) => a.total_cmp(b),
            (SortKey::Text(a), SortKey::Text(b)) => a.cmp(b),
            (SortKey::Missing, SortKey::Missing) => Ordering::Equal,
            (a, b) => a.rank().cmp(&b.rank()),
        }
    }

    fn rank(&self) -> u8 {
        match self {
            SortKey::Coerced(_) => 0,
            SortKey::Text(_) => 1,
            SortKey::Missing => 2,
        }
    }
}

/// Compare two present (non-null) values according to the column type.
///
/// Number and date columns compare their coerced values. A value that cannot
/// be coerced sorts after every value that can, and uncoercible values compare
/// as case-insensitive text among themselves.
pub fn compare_typed(a: &DataValue, b: &DataValue, column_type: ColumnType) -> Ordering {
    SortKey::new(a, column_type).cmp_ascending(&SortKey::new(b, column_type))
}

/// Directional comparison of resolved keys: present values are ordered by
/// `ascending`, missing values stay last either way.
pub fn compare_keys(a: &SortKey, b: &SortKey, ascending: bool) -> Ordering {
    match (a.is_missing(), b.is_missing()) {
        (false, false) if !ascending => a.cmp_ascending(b).reverse(),
        _ => a.cmp_ascending(b),
    }
}

/// Directional comparison of two cell values, see [`compare_keys`]
pub fn compare_for_sort(
    a: &DataValue,
    b: &DataValue,
    column_type: ColumnType,
    ascending: bool,
) -> Ordering {
    compare_keys(
        &SortKey::new(a, column_type),
        &SortKey::new(b, column_type),
        ascending,
    )
}

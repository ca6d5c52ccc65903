use anyhow::{bail, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;

use crate::data::record::{DataValue, FieldAccess};

/// Governs how a column's values are compared and range-filtered
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ColumnType {
    #[default]
    String,
    Number,
    Date,
}

/// The kind of per-column filter a column offers
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum FilterKind {
    #[default]
    None,
    Text,
    NumberRange,
    DateRange,
}

/// Reads a column value from a row and its index in the source collection
pub type AccessorFn<R> = Arc<dyn Fn(&R, usize) -> DataValue + Send + Sync>;

/// Produces the text a row is searched by for one column
pub type SearchTextFn<R> = Arc<dyn Fn(&R) -> String + Send + Sync>;

/// How a column reads its value when it does not simply use its key
pub enum Accessor<R> {
    Function(AccessorFn<R>),
    Field(String),
}

impl<R> Clone for Accessor<R> {
    fn clone(&self) -> Self {
        match self {
            Accessor::Function(f) => Accessor::Function(Arc::clone(f)),
            Accessor::Field(name) => Accessor::Field(name.clone()),
        }
    }
}

impl<R> fmt::Debug for Accessor<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Accessor::Function(_) => write!(f, "Function(..)"),
            Accessor::Field(name) => write!(f, "Field({:?})", name),
        }
    }
}

/// Describes how to read, compare, search and filter one field of a row
pub struct ColumnDef<R> {
    pub key: String,
    pub header: String,
    pub column_type: ColumnType,
    pub sortable: bool,
    pub filter: FilterKind,
    pub searchable: bool,
    accessor: Option<Accessor<R>>,
    search_text: Option<SearchTextFn<R>>,
}

impl<R> ColumnDef<R> {
    /// A searchable, unsortable string column read by `key`
    pub fn new(key: impl Into<String>) -> Self {
        let key = key.into();
        Self {
            header: key.clone(),
            key,
            column_type: ColumnType::String,
            sortable: false,
            filter: FilterKind::None,
            searchable: true,
            accessor: None,
            search_text: None,
        }
    }

    pub fn with_header(mut self, header: impl Into<String>) -> Self {
        self.header = header.into();
        self
    }

    pub fn with_type(mut self, column_type: ColumnType) -> Self {
        self.column_type = column_type;
        self
    }

    pub fn with_sortable(mut self, sortable: bool) -> Self {
        self.sortable = sortable;
        self
    }

    pub fn with_filter(mut self, filter: FilterKind) -> Self {
        self.filter = filter;
        self
    }

    pub fn with_searchable(mut self, searchable: bool) -> Self {
        self.searchable = searchable;
        self
    }

    /// Read the value with a function instead of a field lookup
    pub fn with_accessor<F>(mut self, accessor: F) -> Self
    where
        F: Fn(&R, usize) -> DataValue + Send + Sync + 'static,
    {
        self.accessor = Some(Accessor::Function(Arc::new(accessor)));
        self
    }

    /// Read the value from a named field other than the key.
    ///
    /// An accessor function, if already set, still wins.
    pub fn with_field(mut self, field: impl Into<String>) -> Self {
        if !matches!(self.accessor, Some(Accessor::Function(_))) {
            self.accessor = Some(Accessor::Field(field.into()));
        }
        self
    }

    /// Override the text this column contributes to search and text filters
    pub fn with_search_text<F>(mut self, search_text: F) -> Self
    where
        F: Fn(&R) -> String + Send + Sync + 'static,
    {
        self.search_text = Some(Arc::new(search_text));
        self
    }

    pub fn accessor(&self) -> Option<&Accessor<R>> {
        self.accessor.as_ref()
    }
}

impl<R: FieldAccess> ColumnDef<R> {
    /// Resolve this column's value for a row.
    ///
    /// Precedence: accessor function, then field reference, then the key as
    /// a field name. A field the row does not have resolves to `Null`.
    pub fn value(&self, row: &R, row_index: usize) -> DataValue {
        match &self.accessor {
            Some(Accessor::Function(f)) => f(row, row_index),
            Some(Accessor::Field(name)) => row.field(name).unwrap_or(DataValue::Null),
            None => row.field(&self.key).unwrap_or(DataValue::Null),
        }
    }

    /// Normalized text for search and text filters (not yet lowercased)
    pub fn search_text(&self, row: &R, row_index: usize) -> String {
        match &self.search_text {
            Some(f) => f(row),
            None => self.value(row, row_index).to_search_text(),
        }
    }
}

impl<R> Clone for ColumnDef<R> {
    fn clone(&self) -> Self {
        Self {
            key: self.key.clone(),
            header: self.header.clone(),
            column_type: self.column_type,
            sortable: self.sortable,
            filter: self.filter,
            searchable: self.searchable,
            accessor: self.accessor.clone(),
            search_text: self.search_text.clone(),
        }
    }
}

impl<R> fmt::Debug for ColumnDef<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ColumnDef")
            .field("key", &self.key)
            .field("header", &self.header)
            .field("column_type", &self.column_type)
            .field("sortable", &self.sortable)
            .field("filter", &self.filter)
            .field("searchable", &self.searchable)
            .field("accessor", &self.accessor)
            .field("search_text", &self.search_text.is_some())
            .finish()
    }
}

/// Ordered list of column descriptors with unique keys
pub struct ColumnSchema<R> {
    columns: Vec<ColumnDef<R>>,
}

impl<R> ColumnSchema<R> {
    pub fn new(columns: Vec<ColumnDef<R>>) -> Result<Self> {
        let mut seen = HashSet::new();
        for column in &columns {
            if !seen.insert(column.key.as_str()) {
                bail!("Duplicate column key '{}' in schema", column.key);
            }
        }
        Ok(Self { columns })
    }

    pub fn get(&self, key: &str) -> Option<&ColumnDef<R>> {
        self.columns.iter().find(|c| c.key == key)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    pub fn columns(&self) -> &[ColumnDef<R>] {
        &self.columns
    }

    pub fn searchable(&self) -> impl Iterator<Item = &ColumnDef<R>> {
        self.columns.iter().filter(|c| c.searchable)
    }

    pub fn keys(&self) -> Vec<String> {
        self.columns.iter().map(|c| c.key.clone()).collect()
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }
}

impl<R> Clone for ColumnSchema<R> {
    fn clone(&self) -> Self {
        Self {
            columns: self.columns.clone(),
        }
    }
}

impl<R> fmt::Debug for ColumnSchema<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(&self.columns).finish()
    }
}

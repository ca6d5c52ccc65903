use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use tracing::warn;

use crate::data::column::{ColumnSchema, FilterKind};
use crate::data::filter::FilterValue;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SortDirection {
    #[serde(rename = "asc")]
    Ascending,
    #[serde(rename = "desc")]
    Descending,
}

impl SortDirection {
    pub fn is_ascending(self) -> bool {
        self == SortDirection::Ascending
    }
}

impl fmt::Display for SortDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SortDirection::Ascending => write!(f, "asc"),
            SortDirection::Descending => write!(f, "desc"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SortSpec {
    pub key: String,
    pub direction: SortDirection,
}

impl SortSpec {
    pub fn ascending(key: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            direction: SortDirection::Ascending,
        }
    }

    pub fn descending(key: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            direction: SortDirection::Descending,
        }
    }
}

/// Next step of the per-column sort cycle: none → asc → desc → none.
///
/// A key other than the currently sorted one always starts at ascending.
pub fn next_sort(current: Option<&SortSpec>, key: &str) -> Option<SortSpec> {
    match current {
        Some(spec) if spec.key == key => match spec.direction {
            SortDirection::Ascending => Some(SortSpec::descending(key)),
            SortDirection::Descending => None,
        },
        _ => Some(SortSpec::ascending(key)),
    }
}

/// A single user-driven change to the view state
#[derive(Debug, Clone, PartialEq)]
pub enum ViewChange {
    SearchTerm(String),
    ColumnFilter { key: String, fragment: FilterValue },
    /// Advance the sort cycle for a column
    Sort(String),
    PageSize(usize),
    /// Requested page, clamped against the current page count
    PageIndex(usize),
    Reset,
}

impl ViewChange {
    /// Every accepted change except explicit paging sends the view back to
    /// the first page.
    fn resets_page(&self) -> bool {
        !matches!(self, ViewChange::PageIndex(_))
    }
}

/// User-controlled parameters that drive view derivation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ViewState {
    pub search_term: String,
    pub column_filters: BTreeMap<String, FilterValue>,
    pub sort: Option<SortSpec>,
    pub page_size: usize,
    /// 1-based, may exceed the page count until the next derivation clamps it
    pub page_index: usize,
}

impl Default for ViewState {
    fn default() -> Self {
        Self::new(5)
    }
}

impl ViewState {
    pub fn new(page_size: usize) -> Self {
        Self {
            search_term: String::new(),
            column_filters: BTreeMap::new(),
            sort: None,
            page_size: page_size.max(1),
            page_index: 1,
        }
    }

    /// Whether any of search, filters or sort differs from its default
    pub fn is_reset_available(&self) -> bool {
        !self.search_term.is_empty() || !self.column_filters.is_empty() || self.sort.is_some()
    }

    /// Apply one change.
    ///
    /// This is the only place view state is mutated, and the only place the
    /// page index is reset. Returns `false` when the change was ignored
    /// (sort or filter on a column that does not support it), in which case
    /// nothing, including the page index, is touched.
    pub fn apply<R>(
        &mut self,
        change: ViewChange,
        schema: &ColumnSchema<R>,
        total_pages: usize,
    ) -> bool {
        let resets_page = change.resets_page();

        match change {
            ViewChange::SearchTerm(term) => self.search_term = term,
            ViewChange::ColumnFilter { key, fragment } => {
                if !schema.contains(&key) {
                    return false;
                }
                let bag = self.column_filters.entry(key.clone()).or_default();
                bag.merge(fragment);
                if bag.is_blank() {
                    self.column_filters.remove(&key);
                }
            }
            ViewChange::Sort(key) => {
                match schema.get(&key) {
                    Some(column) if column.sortable => {}
                    _ => return false,
                }
                self.sort = next_sort(self.sort.as_ref(), &key);
            }
            ViewChange::PageSize(size) => {
                if size == 0 {
                    warn!("Page size 0 requested, using 1");
                }
                self.page_size = size.max(1);
            }
            ViewChange::PageIndex(index) => {
                self.page_index = index.clamp(1, total_pages.max(1));
            }
            ViewChange::Reset => {
                self.search_term.clear();
                self.column_filters.clear();
                self.sort = None;
            }
        }

        if resets_page {
            self.page_index = 1;
        }
        true
    }

    /// Drop sort and filters the schema can no longer honor.
    ///
    /// Returns `true` when anything was removed.
    pub fn retain_valid<R>(&mut self, schema: &ColumnSchema<R>) -> bool {
        let mut changed = false;

        let sort_valid = self
            .sort
            .as_ref()
            .map_or(true, |spec| schema.get(&spec.key).is_some_and(|c| c.sortable));
        if !sort_valid {
            warn!("Dropping sort on '{:?}' after schema change", self.sort);
            self.sort = None;
            changed = true;
        }

        let before = self.column_filters.len();
        self.column_filters.retain(|key, _| {
            schema
                .get(key)
                .is_some_and(|column| column.filter != FilterKind::None)
        });
        if self.column_filters.len() != before {
            warn!(
                "Dropped {} column filter(s) after schema change",
                before - self.column_filters.len()
            );
            changed = true;
        }

        changed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::column::ColumnDef;
    use serde_json::Value;

    fn schema() -> ColumnSchema<Value> {
        ColumnSchema::new(vec![
            ColumnDef::new("id").with_sortable(true).with_filter(FilterKind::Text),
            ColumnDef::new("n")
                .with_sortable(true)
                .with_filter(FilterKind::NumberRange),
            ColumnDef::new("note"),
        ])
        .unwrap()
    }

    #[test]
    fn test_sort_cycle() {
        let first = next_sort(None, "id");
        assert_eq!(first, Some(SortSpec::ascending("id")));
        let second = next_sort(first.as_ref(), "id");
        assert_eq!(second, Some(SortSpec::descending("id")));
        assert_eq!(next_sort(second.as_ref(), "id"), None);

        // Switching column restarts at ascending
        assert_eq!(
            next_sort(second.as_ref(), "n"),
            Some(SortSpec::ascending("n"))
        );
    }

    #[test]
    fn test_accepted_changes_reset_page() {
        let schema = schema();
        let mut state = ViewState::new(5);

        for change in [
            ViewChange::SearchTerm("x".into()),
            ViewChange::ColumnFilter {
                key: "n".into(),
                fragment: FilterValue::min("1"),
            },
            ViewChange::Sort("id".into()),
            ViewChange::PageSize(10),
            ViewChange::Reset,
        ] {
            state.page_index = 3;
            assert!(state.apply(change.clone(), &schema, 4));
            assert_eq!(state.page_index, 1, "{:?} should reset the page", change);
        }
    }

    #[test]
    fn test_ignored_changes_keep_page() {
        let schema = schema();
        let mut state = ViewState::new(5);
        state.page_index = 3;

        assert!(!state.apply(ViewChange::Sort("note".into()), &schema, 4));
        assert!(!state.apply(ViewChange::Sort("missing".into()), &schema, 4));
        assert!(!state.apply(
            ViewChange::ColumnFilter {
                key: "missing".into(),
                fragment: FilterValue::text("x"),
            },
            &schema,
            4
        ));
        assert_eq!(state.page_index, 3);
        assert!(state.sort.is_none());
        assert!(state.column_filters.is_empty());
    }

    #[test]
    fn test_page_index_clamps() {
        let schema = schema();
        let mut state = ViewState::new(5);

        state.apply(ViewChange::PageIndex(10), &schema, 3);
        assert_eq!(state.page_index, 3);
        state.apply(ViewChange::PageIndex(0), &schema, 3);
        assert_eq!(state.page_index, 1);
    }

    #[test]
    fn test_zero_page_size_clamps_to_one() {
        let mut state = ViewState::new(0);
        assert_eq!(state.page_size, 1);
        state.apply(ViewChange::PageSize(0), &schema(), 1);
        assert_eq!(state.page_size, 1);
    }

    #[test]
    fn test_blank_filter_is_removed() {
        let schema = schema();
        let mut state = ViewState::new(5);

        state.apply(
            ViewChange::ColumnFilter {
                key: "n".into(),
                fragment: FilterValue::min("2").with_max("5"),
            },
            &schema,
            1,
        );
        assert!(state.is_reset_available());

        state.apply(
            ViewChange::ColumnFilter {
                key: "n".into(),
                fragment: FilterValue::min("").with_max(""),
            },
            &schema,
            1,
        );
        assert!(state.column_filters.is_empty());
        assert!(!state.is_reset_available());
    }

    #[test]
    fn test_reset_keeps_page_size() {
        let schema = schema();
        let mut state = ViewState::new(5);
        state.apply(ViewChange::PageSize(20), &schema, 1);
        state.apply(ViewChange::SearchTerm("abc".into()), &schema, 1);
        state.apply(ViewChange::Sort("n".into()), &schema, 1);

        state.apply(ViewChange::Reset, &schema, 1);
        assert_eq!(state, ViewState::new(20));
    }

    #[test]
    fn test_retain_valid_after_schema_change() {
        let mut state = ViewState::new(5);
        let old = schema();
        state.apply(ViewChange::Sort("n".into()), &old, 1);
        state.apply(
            ViewChange::ColumnFilter {
                key: "id".into(),
                fragment: FilterValue::text("case"),
            },
            &old,
            1,
        );
        state.apply(
            ViewChange::ColumnFilter {
                key: "n".into(),
                fragment: FilterValue::min("1"),
            },
            &old,
            1,
        );

        let new: ColumnSchema<Value> = ColumnSchema::new(vec![
            ColumnDef::new("id").with_filter(FilterKind::Text),
            ColumnDef::new("n"),
        ])
        .unwrap();

        assert!(state.retain_valid(&new));
        assert!(state.sort.is_none());
        assert_eq!(state.column_filters.keys().collect::<Vec<_>>(), vec!["id"]);
        assert!(!state.retain_valid(&new));
    }
}

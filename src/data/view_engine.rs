use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{debug, warn};

use crate::data::column::{ColumnDef, ColumnSchema};
use crate::data::data_view::{derive_view, DerivedView};
use crate::data::filter::FilterValue;
use crate::data::record::FieldAccess;
use crate::data::view_state::{SortSpec, ViewChange, ViewState};

/// Construction-time settings for a view
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ViewOptions {
    pub page_size: usize,
    pub default_sort: Option<SortSpec>,
    /// Sizes offered by the host's page size selector
    pub page_size_options: Vec<usize>,
    pub enable_global_search: bool,
    pub enable_column_search: bool,
}

impl Default for ViewOptions {
    fn default() -> Self {
        Self {
            page_size: 5,
            default_sort: None,
            page_size_options: vec![5, 10, 20],
            enable_global_search: true,
            enable_column_search: true,
        }
    }
}

impl ViewOptions {
    pub fn with_page_size(mut self, page_size: usize) -> Self {
        self.page_size = page_size;
        self
    }

    pub fn with_default_sort(mut self, sort: SortSpec) -> Self {
        self.default_sort = Some(sort);
        self
    }
}

/// Everything a host needs to render the current page
#[derive(Debug)]
pub struct ViewSnapshot<'a, R> {
    pub columns: &'a [ColumnDef<R>],
    pub visible_rows: Vec<&'a R>,
    /// Source indices of `visible_rows`, usable as stable row keys
    pub visible_indices: &'a [usize],
    pub total_count: usize,
    pub source_count: usize,
    pub total_pages: usize,
    pub effective_page_index: usize,
    pub page_size: usize,
    pub range_start: usize,
    pub range_end: usize,
    pub has_previous_page: bool,
    pub has_next_page: bool,
    pub sort: Option<&'a SortSpec>,
    pub search_term: &'a str,
    pub column_filters: &'a BTreeMap<String, FilterValue>,
    pub is_reset_available: bool,
}

impl<R> ViewSnapshot<'_, R> {
    /// The "no records to display" signal
    pub fn is_empty(&self) -> bool {
        self.total_count == 0
    }
}

/// Owns the view state for one table and keeps the derived view current.
///
/// Every mutation goes through [`DataViewEngine::apply`], which updates the
/// state and recomputes the derived view before returning.
pub struct DataViewEngine<R> {
    schema: ColumnSchema<R>,
    rows: Arc<Vec<R>>,
    options: ViewOptions,
    state: ViewState,
    derived: DerivedView,
}

impl<R: FieldAccess> DataViewEngine<R> {
    pub fn new(
        columns: Vec<ColumnDef<R>>,
        rows: impl Into<Arc<Vec<R>>>,
        options: ViewOptions,
    ) -> Result<Self> {
        let schema = ColumnSchema::new(columns)?;
        let rows = rows.into();

        let mut state = ViewState::new(options.page_size);
        if options.page_size == 0 {
            warn!("Page size 0 configured, using 1");
        }
        if let Some(sort) = &options.default_sort {
            if schema.get(&sort.key).is_some_and(|c| c.sortable) {
                state.sort = Some(sort.clone());
            } else {
                warn!("Default sort column '{}' is not sortable, ignoring", sort.key);
            }
        }

        let derived = derive_view(&state, &schema, &rows);
        debug!(
            "Created view over {} rows and {} columns",
            rows.len(),
            schema.len()
        );

        Ok(Self {
            schema,
            rows,
            options,
            state,
            derived,
        })
    }

    /// Apply one view change and recompute.
    ///
    /// Returns `false` when the change was ignored: a search or column filter
    /// while that feature is disabled, or a sort/filter on a column that does
    /// not support it.
    pub fn apply(&mut self, change: ViewChange) -> bool {
        crate::trace_view_change!(change);

        let enabled = match &change {
            ViewChange::SearchTerm(_) => self.options.enable_global_search,
            ViewChange::ColumnFilter { .. } => self.options.enable_column_search,
            _ => true,
        };
        if !enabled {
            debug!("Ignoring {:?}: feature disabled", change);
            return false;
        }

        let applied = self
            .state
            .apply(change, &self.schema, self.derived.total_pages());
        if applied {
            self.recompute();
        }
        applied
    }

    pub fn set_search_term(&mut self, term: impl Into<String>) {
        self.apply(ViewChange::SearchTerm(term.into()));
    }

    /// Merge `fragment` into the filter for `key`
    pub fn set_column_filter(&mut self, key: impl Into<String>, fragment: FilterValue) {
        self.apply(ViewChange::ColumnFilter {
            key: key.into(),
            fragment,
        });
    }

    /// Advance the sort cycle for `key` (none → asc → desc → none)
    pub fn set_sort(&mut self, key: impl Into<String>) {
        self.apply(ViewChange::Sort(key.into()));
    }

    pub fn set_page_size(&mut self, size: usize) {
        self.apply(ViewChange::PageSize(size));
    }

    pub fn set_page_index(&mut self, index: usize) {
        self.apply(ViewChange::PageIndex(index));
    }

    pub fn next_page(&mut self) -> bool {
        let next = self.derived.effective_page_index() + 1;
        self.apply(ViewChange::PageIndex(next))
    }

    pub fn previous_page(&mut self) -> bool {
        let previous = self.derived.effective_page_index().saturating_sub(1);
        self.apply(ViewChange::PageIndex(previous))
    }

    /// Clear search, filters and sort; page size is kept
    pub fn reset(&mut self) {
        self.apply(ViewChange::Reset);
    }

    /// Replace the row collection wholesale
    pub fn set_rows(&mut self, rows: impl Into<Arc<Vec<R>>>) {
        self.rows = rows.into();
        self.state.page_index = 1;
        self.recompute();
    }

    /// Replace the column schema, dropping sort and filters it can no
    /// longer honor
    pub fn set_columns(&mut self, columns: Vec<ColumnDef<R>>) -> Result<()> {
        self.schema = ColumnSchema::new(columns)?;
        self.state.retain_valid(&self.schema);
        self.state.page_index = 1;
        self.recompute();
        Ok(())
    }

    pub fn view(&self) -> ViewSnapshot<'_, R> {
        let derived = &self.derived;
        let visible_indices = derived.visible_indices();

        ViewSnapshot {
            columns: self.schema.columns(),
            visible_rows: visible_indices.iter().map(|&idx| &self.rows[idx]).collect(),
            visible_indices,
            total_count: derived.total_count(),
            source_count: self.rows.len(),
            total_pages: derived.total_pages(),
            effective_page_index: derived.effective_page_index(),
            page_size: derived.page_size(),
            range_start: derived.range_start(),
            range_end: derived.range_end(),
            has_previous_page: derived.has_previous_page(),
            has_next_page: derived.has_next_page(),
            sort: self.state.sort.as_ref(),
            search_term: &self.state.search_term,
            column_filters: &self.state.column_filters,
            is_reset_available: self.state.is_reset_available(),
        }
    }

    /// Source indices of every row surviving search and filters, in order
    pub fn filtered_sorted_indices(&self) -> &[usize] {
        self.derived.filtered_sorted_indices()
    }

    pub fn state(&self) -> &ViewState {
        &self.state
    }

    pub fn schema(&self) -> &ColumnSchema<R> {
        &self.schema
    }

    pub fn rows(&self) -> &Arc<Vec<R>> {
        &self.rows
    }

    pub fn options(&self) -> &ViewOptions {
        &self.options
    }

    fn recompute(&mut self) {
        self.derived = derive_view(&self.state, &self.schema, &self.rows);
    }
}

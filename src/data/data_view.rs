use tracing::{debug, trace};

use crate::data::column::ColumnSchema;
use crate::data::datavalue_compare::{compare_keys, SortKey};
use crate::data::filter::{normalize_search_term, row_matches_search, ColumnPredicate};
use crate::data::record::FieldAccess;
use crate::data::view_state::ViewState;

/// The result of applying view state to a row collection.
///
/// Rows are referenced by their index in the source collection; the source
/// itself is never copied or modified.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DerivedView {
    /// Source indices that survived search and filters, in display order
    filtered_sorted: Vec<usize>,
    total_pages: usize,
    effective_page_index: usize,
    page_size: usize,
    page_start: usize,
    page_end: usize,
}

impl DerivedView {
    pub fn filtered_sorted_indices(&self) -> &[usize] {
        &self.filtered_sorted
    }

    /// Source indices of the rows on the current page
    pub fn visible_indices(&self) -> &[usize] {
        &self.filtered_sorted[self.page_start..self.page_end]
    }

    pub fn total_count(&self) -> usize {
        self.filtered_sorted.len()
    }

    pub fn total_pages(&self) -> usize {
        self.total_pages
    }

    pub fn effective_page_index(&self) -> usize {
        self.effective_page_index
    }

    pub fn page_size(&self) -> usize {
        self.page_size
    }

    /// True when no row survived search and filters
    pub fn is_empty(&self) -> bool {
        self.filtered_sorted.is_empty()
    }

    /// 1-based position of the first visible row, 0 when empty
    pub fn range_start(&self) -> usize {
        if self.page_start == self.page_end {
            0
        } else {
            self.page_start + 1
        }
    }

    /// 1-based position of the last visible row, 0 when empty
    pub fn range_end(&self) -> usize {
        self.page_end
    }

    pub fn has_previous_page(&self) -> bool {
        self.effective_page_index > 1
    }

    pub fn has_next_page(&self) -> bool {
        self.effective_page_index < self.total_pages
    }
}

/// Number of pages needed for `total_count` rows, never less than one
pub fn page_count(total_count: usize, page_size: usize) -> usize {
    total_count.div_ceil(page_size.max(1)).max(1)
}

/// Derive the visible view: search, then column filters, then sort, then
/// paginate.
///
/// This is a pure function of its inputs. Filters and sorts that name a
/// column missing from the schema are skipped.
pub fn derive_view<R: FieldAccess>(
    state: &ViewState,
    schema: &ColumnSchema<R>,
    rows: &[R],
) -> DerivedView {
    let mut indices: Vec<usize> = (0..rows.len()).collect();

    if let Some(needle) = normalize_search_term(&state.search_term) {
        indices.retain(|&idx| row_matches_search(schema, &rows[idx], idx, &needle));
        trace!(target: "view", "search '{}' kept {} rows", needle, indices.len());
    }

    let predicates: Vec<ColumnPredicate<'_, R>> = state
        .column_filters
        .iter()
        .filter_map(|(key, bag)| match schema.get(key) {
            Some(column) => ColumnPredicate::compile(column, bag),
            None => {
                trace!(target: "view", "ignoring filter on unknown column '{}'", key);
                None
            }
        })
        .collect();

    if !predicates.is_empty() {
        indices.retain(|&idx| predicates.iter().all(|p| p.matches(&rows[idx], idx)));
        trace!(
            target: "view",
            "{} column filter(s) kept {} rows",
            predicates.len(),
            indices.len()
        );
    }

    if let Some(sort) = &state.sort {
        match schema.get(&sort.key) {
            Some(column) => {
                // Resolve each key once, then sort stably on the cached keys
                let mut keyed: Vec<(usize, SortKey)> = indices
                    .iter()
                    .map(|&idx| {
                        let value = column.value(&rows[idx], idx);
                        (idx, SortKey::new(&value, column.column_type))
                    })
                    .collect();
                let ascending = sort.direction.is_ascending();
                keyed.sort_by(|(_, a), (_, b)| compare_keys(a, b, ascending));
                indices = keyed.into_iter().map(|(idx, _)| idx).collect();
            }
            None => trace!(target: "view", "ignoring sort on unknown column '{}'", sort.key),
        }
    }

    let page_size = state.page_size.max(1);
    let total_count = indices.len();
    let total_pages = page_count(total_count, page_size);
    let effective_page_index = state.page_index.clamp(1, total_pages);
    let page_start = ((effective_page_index - 1) * page_size).min(total_count);
    let page_end = (page_start + page_size).min(total_count);

    debug!(
        target: "view",
        "derived view: {} of {} rows, page {}/{} (size {})",
        total_count,
        rows.len(),
        effective_page_index,
        total_pages,
        page_size
    );

    DerivedView {
        filtered_sorted: indices,
        total_pages,
        effective_page_index,
        page_size,
        page_start,
        page_end,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::column::{ColumnDef, ColumnType, FilterKind};
    use crate::data::filter::FilterValue;
    use crate::data::view_state::SortSpec;
    use serde_json::{json, Value};

    fn schema() -> ColumnSchema<Value> {
        ColumnSchema::new(vec![
            ColumnDef::new("id").with_sortable(true),
            ColumnDef::new("n")
                .with_type(ColumnType::Number)
                .with_sortable(true)
                .with_filter(FilterKind::NumberRange),
        ])
        .unwrap()
    }

    fn ids(rows: &[Value], view: &DerivedView) -> Vec<String> {
        view.visible_indices()
            .iter()
            .map(|&idx| rows[idx]["id"].as_str().unwrap_or_default().to_string())
            .collect()
    }

    #[test]
    fn test_page_count() {
        assert_eq!(page_count(0, 5), 1);
        assert_eq!(page_count(5, 5), 1);
        assert_eq!(page_count(6, 5), 2);
        assert_eq!(page_count(12, 5), 3);
        assert_eq!(page_count(3, 0), 3);
    }

    #[test]
    fn test_empty_rows() {
        let rows: Vec<Value> = Vec::new();
        let view = derive_view(&ViewState::new(5), &schema(), &rows);

        assert!(view.is_empty());
        assert_eq!(view.total_pages(), 1);
        assert_eq!(view.effective_page_index(), 1);
        assert!(view.visible_indices().is_empty());
        assert_eq!((view.range_start(), view.range_end()), (0, 0));
        assert!(!view.has_previous_page());
        assert!(!view.has_next_page());
    }

    #[test]
    fn test_stale_page_index_is_clamped() {
        let rows: Vec<Value> = (0..12).map(|i| json!({ "id": format!("R{}", i), "n": i })).collect();
        let mut state = ViewState::new(5);
        state.page_index = 10;

        let view = derive_view(&state, &schema(), &rows);
        assert_eq!(view.effective_page_index(), 3);
        assert_eq!(view.visible_indices(), &[10, 11]);
        assert_eq!((view.range_start(), view.range_end()), (11, 12));
        assert!(view.has_previous_page());
        assert!(!view.has_next_page());
    }

    #[test]
    fn test_sort_with_missing_values_last() {
        let rows = vec![
            json!({ "id": "A", "n": null }),
            json!({ "id": "B", "n": 2 }),
            json!({ "id": "C" }),
            json!({ "id": "D", "n": 1 }),
        ];
        let mut state = ViewState::new(10);

        state.sort = Some(SortSpec::ascending("n"));
        assert_eq!(ids(&rows, &derive_view(&state, &schema(), &rows)), ["D", "B", "A", "C"]);

        state.sort = Some(SortSpec::descending("n"));
        assert_eq!(ids(&rows, &derive_view(&state, &schema(), &rows)), ["B", "D", "A", "C"]);
    }

    #[test]
    fn test_unknown_sort_and_filter_keys_are_ignored() {
        let rows = vec![json!({ "id": "B" }), json!({ "id": "A" })];
        let mut state = ViewState::new(10);
        state.sort = Some(SortSpec::ascending("missing"));
        state
            .column_filters
            .insert("missing".into(), FilterValue::text("zzz"));

        let view = derive_view(&state, &schema(), &rows);
        assert_eq!(ids(&rows, &view), ["B", "A"]);
    }

    #[test]
    fn test_search_then_filter() {
        let rows = vec![
            json!({ "id": "CASE-1", "n": 1 }),
            json!({ "id": "CASE-2", "n": 5 }),
            json!({ "id": "OTHER-3", "n": 9 }),
        ];
        let mut state = ViewState::new(10);
        state.search_term = "  case ".into();
        state.column_filters.insert("n".into(), FilterValue::min("2"));

        let view = derive_view(&state, &schema(), &rows);
        assert_eq!(ids(&rows, &view), ["CASE-2"]);
    }
}

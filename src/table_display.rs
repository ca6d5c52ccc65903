use anyhow::{Context, Result};
use comfy_table::{Attribute, Cell, ContentArrangement, Table};
use crossterm::style::Stylize;
use std::path::Path;

use crate::data::column::ColumnDef;
use crate::data::record::{DataValue, FieldAccess};
use crate::data::view_engine::{DataViewEngine, ViewSnapshot};
use crate::data::view_state::SortDirection;

const NULL_DISPLAY: &str = "NULL";

fn header_cell<R>(column: &ColumnDef<R>, snapshot: &ViewSnapshot<'_, R>) -> Cell {
    let marker = match snapshot.sort {
        Some(sort) if sort.key == column.key => match sort.direction {
            SortDirection::Ascending => " ▲",
            SortDirection::Descending => " ▼",
        },
        _ => "",
    };
    Cell::new(format!("{}{}", column.header, marker)).add_attribute(Attribute::Bold)
}

fn cell_text(value: &DataValue) -> String {
    match value {
        DataValue::Null => NULL_DISPLAY.to_string(),
        other => other.to_string(),
    }
}

/// Render the current page as a table
pub fn render_table<R: FieldAccess>(snapshot: &ViewSnapshot<'_, R>) -> String {
    let mut table = Table::new();
    table.set_content_arrangement(ContentArrangement::Dynamic);
    table.set_header(
        snapshot
            .columns
            .iter()
            .map(|column| header_cell(column, snapshot))
            .collect::<Vec<_>>(),
    );

    for (row, &idx) in snapshot.visible_rows.iter().zip(snapshot.visible_indices) {
        table.add_row(
            snapshot
                .columns
                .iter()
                .map(|column| cell_text(&column.value(row, idx)))
                .collect::<Vec<_>>(),
        );
    }

    table.to_string()
}

/// "Showing a-b of n" plus the page position
pub fn render_footer<R>(snapshot: &ViewSnapshot<'_, R>) -> String {
    let mut footer = format!(
        "Showing {}-{} of {}",
        snapshot.range_start, snapshot.range_end, snapshot.total_count
    );
    if snapshot.total_count != snapshot.source_count {
        footer.push_str(&format!(" (filtered from {})", snapshot.source_count));
    }
    footer.push_str(&format!(
        " | Page {} of {} | {} per page",
        snapshot.effective_page_index, snapshot.total_pages, snapshot.page_size
    ));
    footer
}

/// One line describing active search, filters and sort, if any
pub fn render_state_summary<R>(snapshot: &ViewSnapshot<'_, R>) -> Option<String> {
    let mut parts = Vec::new();

    if !snapshot.search_term.trim().is_empty() {
        parts.push(format!("search \"{}\"", snapshot.search_term.trim()));
    }
    for (key, bag) in snapshot.column_filters {
        let mut bounds = Vec::new();
        let named = [
            ("contains", &bag.value),
            ("min", &bag.min),
            ("max", &bag.max),
            ("from", &bag.start),
            ("to", &bag.end),
        ];
        for (label, value) in named {
            if let Some(value) = value.as_deref().filter(|v| !v.trim().is_empty()) {
                bounds.push(format!("{} {}", label, value));
            }
        }
        parts.push(format!("{}: {}", key, bounds.join(", ")));
    }
    if let Some(sort) = snapshot.sort {
        parts.push(format!("sort {} {}", sort.key, sort.direction));
    }

    if parts.is_empty() {
        None
    } else {
        Some(parts.join(" | "))
    }
}

/// Describe the schema: key, header, type, sorting and filter per column
pub fn render_columns<R>(columns: &[ColumnDef<R>]) -> String {
    let mut table = Table::new();
    table.set_header(
        ["Key", "Header", "Type", "Sortable", "Filter", "Searchable"]
            .into_iter()
            .map(|h| Cell::new(h).add_attribute(Attribute::Bold))
            .collect::<Vec<_>>(),
    );
    for column in columns {
        table.add_row(vec![
            column.key.clone(),
            column.header.clone(),
            format!("{:?}", column.column_type),
            if column.sortable { "yes" } else { "no" }.to_string(),
            format!("{:?}", column.filter),
            if column.searchable { "yes" } else { "no" }.to_string(),
        ]);
    }
    table.to_string()
}

/// Print the current page with its footer
pub fn display_view<R: FieldAccess>(snapshot: &ViewSnapshot<'_, R>) {
    if let Some(summary) = render_state_summary(snapshot) {
        println!("{}", summary.cyan());
    }

    if snapshot.is_empty() {
        println!("{}", "No records to display.".yellow());
    } else {
        println!("{}", render_table(snapshot));
    }

    println!("{}", render_footer(snapshot).green());
}

/// Write every row that survives search and filters, in display order
pub fn export_to_csv<R: FieldAccess>(engine: &DataViewEngine<R>, path: &Path) -> Result<usize> {
    let mut writer = csv::Writer::from_path(path)
        .with_context(|| format!("Failed to create CSV file: {:?}", path))?;

    let columns = engine.schema().columns();
    writer.write_record(columns.iter().map(|c| c.header.as_str()))?;

    let rows = engine.rows();
    let indices = engine.filtered_sorted_indices();
    for &idx in indices {
        writer.write_record(
            columns
                .iter()
                .map(|column| column.value(&rows[idx], idx).to_string()),
        )?;
    }

    writer
        .flush()
        .with_context(|| format!("Failed to write CSV file: {:?}", path))?;
    Ok(indices.len())
}

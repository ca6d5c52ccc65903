//! Global search and per-column filter predicates.
//!
//! Filter input arrives as loose text from the host (range bounds typed into
//! fields, partial edits). Each active filter is compiled once per
//! derivation into a [`ColumnPredicate`] so rows are tested against
//! pre-parsed bounds and pre-folded needles.

use serde::{Deserialize, Serialize};

use crate::data::coercion::{parse_number, parse_timestamp, to_number, to_timestamp};
use crate::data::column::{ColumnDef, ColumnSchema, FilterKind};
use crate::data::record::FieldAccess;

/// Value bag for one column filter.
///
/// `value` is used by text filters, `min`/`max` by number ranges and
/// `start`/`end` by date ranges. `None` and blank strings both mean "not
/// supplied".
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FilterValue {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub min: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub start: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub end: Option<String>,
}

impl FilterValue {
    pub fn text(value: impl Into<String>) -> Self {
        Self {
            value: Some(value.into()),
            ..Self::default()
        }
    }

    pub fn min(min: impl Into<String>) -> Self {
        Self::default().with_min(min)
    }

    pub fn max(max: impl Into<String>) -> Self {
        Self::default().with_max(max)
    }

    pub fn start(start: impl Into<String>) -> Self {
        Self::default().with_start(start)
    }

    pub fn end(end: impl Into<String>) -> Self {
        Self::default().with_end(end)
    }

    pub fn with_min(mut self, min: impl Into<String>) -> Self {
        self.min = Some(min.into());
        self
    }

    pub fn with_max(mut self, max: impl Into<String>) -> Self {
        self.max = Some(max.into());
        self
    }

    pub fn with_start(mut self, start: impl Into<String>) -> Self {
        self.start = Some(start.into());
        self
    }

    pub fn with_end(mut self, end: impl Into<String>) -> Self {
        self.end = Some(end.into());
        self
    }

    /// Overlay the fields present in `fragment`; absent fields keep their
    /// current value.
    pub fn merge(&mut self, fragment: FilterValue) {
        let FilterValue {
            value,
            min,
            max,
            start,
            end,
        } = fragment;
        if value.is_some() {
            self.value = value;
        }
        if min.is_some() {
            self.min = min;
        }
        if max.is_some() {
            self.max = max;
        }
        if start.is_some() {
            self.start = start;
        }
        if end.is_some() {
            self.end = end;
        }
    }

    /// True when no field carries a non-blank value
    pub fn is_blank(&self) -> bool {
        [&self.value, &self.min, &self.max, &self.start, &self.end]
            .into_iter()
            .all(|field| supplied(field).is_none())
    }
}

/// A non-blank, trimmed field value
fn supplied(field: &Option<String>) -> Option<&str> {
    field
        .as_deref()
        .map(str::trim)
        .filter(|text| !text.is_empty())
}

/// Normalize a search term: trimmed and lowercased, `None` when blank
pub fn normalize_search_term(term: &str) -> Option<String> {
    let trimmed = term.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_lowercase())
}

/// True when any searchable column's text contains `needle`.
///
/// `needle` must already be normalized. A schema with no searchable
/// columns matches nothing.
pub fn row_matches_search<R: FieldAccess>(
    schema: &ColumnSchema<R>,
    row: &R,
    row_index: usize,
    needle: &str,
) -> bool {
    schema.searchable().any(|column| {
        column
            .search_text(row, row_index)
            .to_lowercase()
            .contains(needle)
    })
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum Bounds {
    Number { min: Option<f64>, max: Option<f64> },
    Date { start: Option<f64>, end: Option<f64> },
}

#[derive(Debug, Clone, PartialEq)]
enum Predicate {
    Text(String),
    Range(Bounds),
}

/// A compiled, active filter for one column
#[derive(Debug)]
pub struct ColumnPredicate<'a, R> {
    column: &'a ColumnDef<R>,
    predicate: Predicate,
}

impl<'a, R: FieldAccess> ColumnPredicate<'a, R> {
    /// Compile a filter bag against its column.
    ///
    /// Returns `None` when the filter imposes no restriction: the column has
    /// no filter kind, or every relevant field is blank. A non-blank bound
    /// that does not parse keeps the filter active (rows still need a
    /// coercible value) but does not bound anything.
    pub fn compile(column: &'a ColumnDef<R>, bag: &FilterValue) -> Option<Self> {
        let predicate = match column.filter {
            FilterKind::None => return None,
            FilterKind::Text => Predicate::Text(normalize_search_term(bag.value.as_deref()?)?),
            FilterKind::NumberRange => {
                let (min, max) = (supplied(&bag.min), supplied(&bag.max));
                if min.is_none() && max.is_none() {
                    return None;
                }
                Predicate::Range(Bounds::Number {
                    min: min.and_then(parse_number),
                    max: max.and_then(parse_number),
                })
            }
            FilterKind::DateRange => {
                let (start, end) = (supplied(&bag.start), supplied(&bag.end));
                if start.is_none() && end.is_none() {
                    return None;
                }
                Predicate::Range(Bounds::Date {
                    start: start.and_then(parse_timestamp),
                    end: end.and_then(parse_timestamp),
                })
            }
        };

        Some(Self { column, predicate })
    }

    pub fn column_key(&self) -> &str {
        &self.column.key
    }

    pub fn matches(&self, row: &R, row_index: usize) -> bool {
        match &self.predicate {
            Predicate::Text(needle) => self
                .column
                .search_text(row, row_index)
                .to_lowercase()
                .contains(needle.as_str()),
            Predicate::Range(bounds) => {
                let value = self.column.value(row, row_index);
                let (coerced, lower, upper) = match *bounds {
                    Bounds::Number { min, max } => (to_number(&value), min, max),
                    Bounds::Date { start, end } => (to_timestamp(&value), start, end),
                };
                // Missing and malformed values are excluded by an active range
                let Some(v) = coerced else {
                    return false;
                };
                lower.map_or(true, |lo| lo <= v) && upper.map_or(true, |hi| v <= hi)
            }
        }
    }
}

//! The filter -> sort -> paginate pipeline.
//!
//! Everything here is a pure function of the records and the [`ViewState`]:
//! running the pipeline twice on the same inputs gives the same rows in the same order.

use std::cmp::Ordering;
use std::iter::Peekable;
use std::ops::Range;
use std::str::Chars;

use log::debug;
use serde::Serialize;

use crate::field_mapper::fold;
use crate::{Record, SortColumn, SortDirection, ViewState};

fn take_digits(it: &mut Peekable<Chars<'_>>) -> String {
    let mut s = String::new();
    while let Some(c) = it.next_if(|c| c.is_ascii_digit()) {
        s.push(c);
    }
    s
}

fn compare_numeric(a: &str, b: &str) -> Ordering {
    let a = a.trim_start_matches('0');
    let b = b.trim_start_matches('0');
    a.len().cmp(&b.len()).then_with(|| a.cmp(b))
}

/// Natural ordering of already folded strings: digit runs compare by value.
fn compare_folded(a: &str, b: &str) -> Ordering {
    let mut ai = a.chars().peekable();
    let mut bi = b.chars().peekable();
    loop {
        match (ai.peek().copied(), bi.peek().copied()) {
            (None, None) => return Ordering::Equal,
            (None, Some(_)) => return Ordering::Less,
            (Some(_), None) => return Ordering::Greater,
            (Some(x), Some(y)) if x.is_ascii_digit() && y.is_ascii_digit() => {
                let da = take_digits(&mut ai);
                let db = take_digits(&mut bi);
                let ord = compare_numeric(&da, &db);
                if ord != Ordering::Equal {
                    return ord;
                }
            }
            (Some(x), Some(y)) => {
                if x != y {
                    return x.cmp(&y);
                }
                ai.next();
                bi.next();
            }
        }
    }
}

/// Case- and accent-insensitive comparison where `"bv 2"` sorts before `"bv 10"`.
pub fn compare_text(a: &str, b: &str) -> Ordering {
    compare_folded(&fold(a), &fold(b))
}

/// Keeps the records matching the precinct filter and the search query.
pub fn filter<'a>(records: &'a [Record], state: &ViewState) -> Vec<&'a Record> {
    let query = state.search_query.trim().to_lowercase();
    let precinct = state.precinct_filter.as_str();
    records
        .iter()
        .filter(|r| precinct.is_empty() || r.precinct == precinct)
        .filter(|r| query.is_empty() || r.search_text().contains(&query))
        .collect()
}

/// Stable sort on `column`, ties broken on `"<lastName> <firstName>"`.
pub fn sort(rows: &mut Vec<&Record>, column: SortColumn, direction: SortDirection) {
    // Fold once per row instead of once per comparison.
    let mut keyed: Vec<(String, String, &Record)> = rows
        .iter()
        .map(|r| (fold(r.field(column)), fold(&r.full_name()), *r))
        .collect();
    keyed.sort_by(|(pa, ta, _), (pb, tb, _)| {
        let ord = compare_folded(pa, pb).then_with(|| compare_folded(ta, tb));
        direction.apply(ord)
    });
    *rows = keyed.into_iter().map(|(_, _, r)| r).collect();
}

/// Where the current page sits in the filtered rows.
#[derive(Eq, PartialEq, Debug, Clone, Copy, Serialize)]
pub struct PageInfo {
    pub page: usize,
    #[serde(rename = "totalPages")]
    pub total_pages: usize,
    #[serde(rename = "totalCount")]
    pub total_count: usize,
}

impl PageInfo {
    pub fn has_previous(&self) -> bool {
        self.page > 1
    }

    pub fn has_next(&self) -> bool {
        self.page < self.total_pages
    }
}

/// Clamps the requested page and computes the slice of rows it covers.
///
/// There is always at least one page, even with no rows.
pub fn paginate(total: usize, requested_page: usize, page_size: usize) -> (PageInfo, Range<usize>) {
    let page_size = page_size.max(1);
    let total_pages = total.div_ceil(page_size).max(1);
    let page = requested_page.clamp(1, total_pages);
    let start = ((page - 1) * page_size).min(total);
    let end = start.saturating_add(page_size).min(total);
    (
        PageInfo {
            page,
            total_pages,
            total_count: total,
        },
        start..end,
    )
}

/// The output of the pipeline.
#[derive(Eq, PartialEq, Debug, Clone)]
pub struct View<'a> {
    /// All the filtered rows, sorted. This is what "export view" writes.
    pub rows: Vec<&'a Record>,
    pub page: PageInfo,
    range: Range<usize>,
}

impl<'a> View<'a> {
    /// The rows of the current page.
    pub fn page_rows(&self) -> &[&'a Record] {
        &self.rows[self.range.clone()]
    }

    /// 1-based position of the first row of the page, for display.
    pub fn first_row_number(&self) -> usize {
        self.range.start + 1
    }
}

pub fn derive_view<'a>(records: &'a [Record], state: &ViewState) -> View<'a> {
    let mut rows = filter(records, state);
    sort(&mut rows, state.sort_column, state.sort_direction);
    let (page, range) = paginate(rows.len(), state.page_number, state.page_size);
    debug!(
        "derive_view: {} of {} records, page {:?}",
        rows.len(),
        records.len(),
        page
    );
    View { rows, page, range }
}

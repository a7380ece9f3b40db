// Plain text rendering of a page of the view.

use std::io::Write;

use canvass_core::{Record, View};
use snafu::prelude::*;

use crate::cli::*;

const MAX_CELL_WIDTH: usize = 30;

const HEADERS: [&str; 9] = [
    "#",
    "id",
    "last name",
    "first name",
    "precinct",
    "address",
    "phone",
    "status",
    "remark",
];

fn truncate(s: &str) -> String {
    if s.chars().count() <= MAX_CELL_WIDTH {
        s.to_string()
    } else {
        let mut res: String = s.chars().take(MAX_CELL_WIDTH - 3).collect();
        res.push_str("...");
        res
    }
}

fn cells(number: usize, r: &Record) -> Vec<String> {
    vec![
        number.to_string(),
        r.id.clone(),
        truncate(&r.last_name),
        truncate(&r.first_name),
        truncate(&r.precinct),
        truncate(&r.address),
        truncate(&r.phone),
        r.status.label().to_string(),
        truncate(&r.remark),
    ]
}

fn format_line(row: &[String], widths: &[usize]) -> String {
    let padded: Vec<String> = row
        .iter()
        .zip(widths)
        .map(|(cell, w)| format!("{}{}", cell, " ".repeat(w - cell.chars().count())))
        .collect();
    padded.join("  ").trim_end().to_string()
}

/// `Page p / n - total rows`
pub fn page_line(view: &View<'_>) -> String {
    format!(
        "Page {} / {} - {} rows",
        view.page.page, view.page.total_pages, view.page.total_count
    )
}

/// The current page as an aligned table, followed by the page line.
pub fn format_page(view: &View<'_>) -> String {
    let mut res = String::new();
    let rows = view.page_rows();
    if rows.is_empty() {
        res.push_str("No records\n");
    } else {
        let header: Vec<String> = HEADERS.iter().map(|h| h.to_string()).collect();
        let body: Vec<Vec<String>> = rows
            .iter()
            .enumerate()
            .map(|(idx, r)| cells(view.first_row_number() + idx, r))
            .collect();
        let mut widths: Vec<usize> = header.iter().map(|h| h.chars().count()).collect();
        for row in body.iter() {
            for (w, cell) in widths.iter_mut().zip(row) {
                *w = (*w).max(cell.chars().count());
            }
        }
        res.push_str(&format_line(&header, &widths));
        res.push('\n');
        for row in body.iter() {
            res.push_str(&format_line(row, &widths));
            res.push('\n');
        }
    }
    res.push_str(&page_line(view));
    res.push('\n');
    res
}

pub fn write_page<W: Write>(out: &mut W, view: &View<'_>) -> CliResult<()> {
    out.write_all(format_page(view).as_bytes())
        .context(WritingOutputSnafu {})
}

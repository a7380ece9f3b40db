// Export subsets and their CSV form.

use std::io::Write;

use chrono::NaiveDateTime;
use log::debug;
use snafu::prelude::*;

use crate::error::*;
use crate::{Record, Status};

/// Header of every export, in canonical field order. Each name maps back to its
/// field on import.
pub const CSV_HEADERS: [&str; 9] = [
    "last_name",
    "first_name",
    "precinct",
    "address",
    "email",
    "phone",
    "remark",
    "status",
    "id",
];

#[derive(Eq, PartialEq, Debug, Clone, Copy, Hash)]
pub enum ExportKind {
    /// Every record.
    Full,
    /// The filtered and sorted rows, all pages included.
    View,
    Favorable,
    FavorableUndecided,
}

impl ExportKind {
    pub const ALL: [ExportKind; 4] = [
        ExportKind::Full,
        ExportKind::View,
        ExportKind::Favorable,
        ExportKind::FavorableUndecided,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            ExportKind::Full => "full",
            ExportKind::View => "view",
            ExportKind::Favorable => "favorable",
            ExportKind::FavorableUndecided => "favorable-undecided",
        }
    }

    pub fn from_name(name: &str) -> Option<ExportKind> {
        ExportKind::ALL.iter().copied().find(|k| k.name() == name)
    }

    fn file_prefix(&self) -> &'static str {
        match self {
            ExportKind::Full => "voters_full",
            ExportKind::View => "voters_view",
            ExportKind::Favorable => "favorable",
            ExportKind::FavorableUndecided => "favorable_undecided",
        }
    }

    fn keeps(&self, status: Status) -> bool {
        match self {
            ExportKind::Full | ExportKind::View => true,
            ExportKind::Favorable => status == Status::Favorable,
            ExportKind::FavorableUndecided => {
                matches!(status, Status::Favorable | Status::Undecided)
            }
        }
    }
}

/// Picks the rows of an export. `View` takes `view_rows` as they are; the other kinds
/// read the whole collection in stored order.
pub fn select<'a>(kind: ExportKind, records: &'a [Record], view_rows: &[&'a Record]) -> Vec<&'a Record> {
    match kind {
        ExportKind::View => view_rows.to_vec(),
        _ => records.iter().filter(|r| kind.keeps(r.status)).collect(),
    }
}

/// `YYYY-MM-DD_HH-MM`, which sorts chronologically as text.
pub fn timestamp(now: &NaiveDateTime) -> String {
    now.format("%Y-%m-%d_%H-%M").to_string()
}

pub fn file_name(kind: ExportKind, now: &NaiveDateTime) -> String {
    format!("{}_{}.csv", kind.file_prefix(), timestamp(now))
}

/// The rows of one export, ready to serialize.
#[derive(Eq, PartialEq, Debug, Clone)]
pub struct ExportSet<'a> {
    pub kind: ExportKind,
    pub file_name: String,
    pub rows: Vec<&'a Record>,
}

impl<'a> ExportSet<'a> {
    pub fn to_csv(&self) -> CanvassResult<String> {
        to_csv_string(&self.rows)
    }
}

pub fn write_csv<W: Write>(rows: &[&Record], out: W) -> CanvassResult<W> {
    let mut writer = csv::WriterBuilder::new().from_writer(out);
    writer.write_record(CSV_HEADERS).context(CsvWriteSnafu {})?;
    for r in rows {
        writer
            .write_record([
                r.last_name.as_str(),
                r.first_name.as_str(),
                r.precinct.as_str(),
                r.address.as_str(),
                r.email.as_str(),
                r.phone.as_str(),
                r.remark.as_str(),
                r.status.as_str(),
                r.id.as_str(),
            ])
            .context(CsvWriteSnafu {})?;
    }
    debug!("write_csv: {} rows", rows.len());
    writer
        .into_inner()
        .map_err(|e| e.into_error())
        .context(CsvFlushSnafu {})
}

pub fn to_csv_string(rows: &[&Record]) -> CanvassResult<String> {
    let bytes = write_csv(rows, Vec::new())?;
    String::from_utf8(bytes).context(CsvEncodingSnafu {})
}

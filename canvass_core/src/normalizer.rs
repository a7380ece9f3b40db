// Turns raw CSV text into canonical records.

use std::collections::HashSet;
use std::sync::atomic::{AtomicU64, Ordering};

use chrono::Utc;
use log::{debug, info, warn};
use snafu::prelude::*;

use crate::error::*;
use crate::field_mapper::{address, aliases, fold, RawRow};
use crate::{Record, Status};

const BOM: char = '\u{feff}';
const DELIMITER_CANDIDATES: [u8; 4] = [b',', b';', b'\t', b'|'];

static ID_COUNTER: AtomicU64 = AtomicU64::new(0);

fn to_base36(mut n: u64) -> String {
    const DIGITS: &[u8; 36] = b"0123456789abcdefghijklmnopqrstuvwxyz";
    if n == 0 {
        return "0".to_string();
    }
    let mut out: Vec<u8> = Vec::new();
    while n > 0 {
        out.push(DIGITS[(n % 36) as usize]);
        n /= 36;
    }
    out.reverse();
    out.into_iter().map(char::from).collect()
}

/// A fresh record id: `row_<millis>_<counter>`, both in base 36.
///
/// The counter is process-wide, so ids generated within the same millisecond stay distinct.
pub fn new_record_id() -> String {
    let millis = Utc::now().timestamp_millis().max(0) as u64;
    let n = ID_COUNTER.fetch_add(1, Ordering::Relaxed) + 1;
    format!("row_{}_{}", to_base36(millis), to_base36(n))
}

/// Classifies free-text status input.
///
/// Canonical names match exactly. Anything else is matched on its folded prefix
/// (French campaign vocabulary); unknown or blank input is `NotContacted`.
pub fn coerce_status(raw: &str) -> Status {
    let folded = fold(raw.trim());
    if let Some(status) = Status::from_canonical(&folded) {
        return status;
    }
    if folded.starts_with("fav") {
        Status::Favorable
    } else if folded.starts_with("inde") {
        Status::Undecided
    } else if folded.starts_with("defa") || folded.starts_with("opp") || folded.starts_with("contre")
    {
        Status::Unfavorable
    } else if folded.starts_with("abs") {
        Status::Absent
    } else {
        Status::NotContacted
    }
}

/// CSV text ready for the parser: leading BOM and `sep=` line removed.
#[derive(Eq, PartialEq, Debug, Clone, Copy)]
pub struct PreparedInput<'a> {
    pub body: &'a str,
    pub delimiter: u8,
}

fn first_line(s: &str) -> &str {
    s.split('\n').next().unwrap_or("").trim_end_matches('\r')
}

/// Reads an Excel-style `sep=;` directive.
fn sep_directive(line: &str) -> Option<u8> {
    // Only spaces are trimmed: the directive character itself may be a tab.
    let line = line.trim_matches(' ');
    let prefix = line.get(..4)?;
    if !prefix.eq_ignore_ascii_case("sep=") {
        return None;
    }
    match line[4..].as_bytes() {
        [b] if b.is_ascii() => Some(*b),
        _ => None,
    }
}

/// The most frequent candidate delimiter outside quotes, `,` when there is none.
fn detect_delimiter(header_line: &str) -> u8 {
    let mut counts = [0usize; DELIMITER_CANDIDATES.len()];
    let mut in_quotes = false;
    for b in header_line.bytes() {
        if b == b'"' {
            in_quotes = !in_quotes;
            continue;
        }
        if in_quotes {
            continue;
        }
        if let Some(idx) = DELIMITER_CANDIDATES.iter().position(|d| *d == b) {
            counts[idx] += 1;
        }
    }
    let mut best = 0;
    for idx in 1..counts.len() {
        if counts[idx] > counts[best] {
            best = idx;
        }
    }
    DELIMITER_CANDIDATES[best]
}

pub fn prepare_input(raw: &str) -> PreparedInput<'_> {
    let text = raw.strip_prefix(BOM).unwrap_or(raw);
    let head = first_line(text);
    if let Some(delimiter) = sep_directive(head) {
        let body = match text.find('\n') {
            Some(pos) => &text[pos + 1..],
            None => "",
        };
        debug!("prepare_input: sep directive {:?}", delimiter as char);
        return PreparedInput { body, delimiter };
    }
    let delimiter = detect_delimiter(head);
    debug!("prepare_input: detected delimiter {:?}", delimiter as char);
    PreparedInput {
        body: text,
        delimiter,
    }
}

/// Parses CSV text with a header row into raw rows.
pub fn parse_rows(raw: &str) -> CanvassResult<Vec<RawRow>> {
    let input = prepare_input(raw);
    if input.body.trim().is_empty() {
        return MissingHeaderSnafu {}.fail();
    }
    let mut reader = csv::ReaderBuilder::new()
        .delimiter(input.delimiter)
        .has_headers(true)
        .flexible(true)
        .from_reader(input.body.as_bytes());
    let headers = reader.headers().context(CsvParseSnafu {})?.clone();
    debug!("parse_rows: headers: {:?}", headers);
    if headers.iter().all(|h| h.trim().is_empty()) {
        return MissingHeaderSnafu {}.fail();
    }

    let mut res: Vec<RawRow> = Vec::new();
    for (idx, line_r) in reader.records().enumerate() {
        let line = line_r.context(CsvParseSnafu {})?;
        debug!("parse_rows: lineno: {:?} row: {:?}", idx + 2, line);
        res.push(RawRow::from_pairs(headers.iter().zip(line.iter())));
    }
    Ok(res)
}

/// Builds the canonical record for one raw row. A missing id gets a fresh one.
pub fn normalize_row(row: &RawRow) -> Record {
    let id = row.lookup(aliases::ID);
    Record {
        id: if id.is_empty() { new_record_id() } else { id },
        last_name: row.lookup(aliases::LAST_NAME),
        first_name: row.lookup(aliases::FIRST_NAME),
        precinct: row.lookup(aliases::PRECINCT),
        address: address(row),
        email: row.lookup(aliases::EMAIL),
        phone: row.lookup(aliases::PHONE),
        remark: row.lookup(aliases::REMARK),
        status: coerce_status(&row.lookup(aliases::STATUS)),
    }
}

/// The records of one import, with the number of rows that were dropped as blank.
#[derive(Eq, PartialEq, Debug, Clone, Default)]
pub struct NormalizedBatch {
    pub records: Vec<Record>,
    pub discarded: usize,
}

/// Parses and normalizes a whole file. Either every row is processed or an error is returned.
pub fn normalize_batch(raw: &str) -> CanvassResult<NormalizedBatch> {
    let rows = parse_rows(raw)?;
    let mut seen: HashSet<String> = HashSet::new();
    let mut batch = NormalizedBatch::default();
    for (idx, row) in rows.iter().enumerate() {
        let mut record = normalize_row(row);
        if record.is_blank() {
            debug!("normalize_batch: row {}: no name nor address, skipping", idx + 1);
            batch.discarded += 1;
            continue;
        }
        if !seen.insert(record.id.clone()) {
            let fresh = new_record_id();
            warn!(
                "normalize_batch: row {}: duplicate id {:?}, replaced by {:?}",
                idx + 1,
                record.id,
                fresh
            );
            record.id = fresh;
            seen.insert(record.id.clone());
        }
        batch.records.push(record);
    }
    info!(
        "normalize_batch: {} records, {} blank rows discarded",
        batch.records.len(),
        batch.discarded
    );
    Ok(batch)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_coercion() {
        for s in ["Favorable", "favorable ", "FAV", "Favorables"] {
            assert_eq!(coerce_status(s), Status::Favorable, "{:?}", s);
        }
        assert_eq!(coerce_status("Indécis"), Status::Undecided);
        assert_eq!(coerce_status("indecise"), Status::Undecided);
        assert_eq!(coerce_status("Défavorable"), Status::Unfavorable);
        assert_eq!(coerce_status("Opposé"), Status::Unfavorable);
        assert_eq!(coerce_status("contre"), Status::Unfavorable);
        assert_eq!(coerce_status("Absent"), Status::Absent);
        assert_eq!(coerce_status("xyz"), Status::NotContacted);
        assert_eq!(coerce_status(""), Status::NotContacted);
        assert_eq!(coerce_status("Non contacté"), Status::NotContacted);
    }

    #[test]
    fn canonical_names_round_trip() {
        for s in Status::ALL {
            assert_eq!(coerce_status(s.as_str()), s);
        }
    }

    #[test]
    fn ids_are_unique() {
        let ids: HashSet<String> = (0..1000).map(|_| new_record_id()).collect();
        assert_eq!(ids.len(), 1000);
        assert!(ids.iter().all(|id| id.starts_with("row_")));
    }

    #[test]
    fn base36() {
        assert_eq!(to_base36(0), "0");
        assert_eq!(to_base36(35), "z");
        assert_eq!(to_base36(36), "10");
    }

    #[test]
    fn bom_and_sep_line_are_stripped() {
        let input = prepare_input("\u{feff}sep=;\r\nNom;Prénom\r\nDupont;Jean\r\n");
        assert_eq!(input.delimiter, b';');
        assert_eq!(input.body, "Nom;Prénom\r\nDupont;Jean\r\n");
        assert_eq!(prepare_input("SEP=\t\nNom\tPrénom\n").delimiter, b'\t');
        // Not a directive: kept as the header line.
        assert_eq!(prepare_input("sep=;;\nNom\n").body, "sep=;;\nNom\n");
    }

    #[test]
    fn delimiter_detection() {
        assert_eq!(prepare_input("Nom;Prénom;Bureau\n").delimiter, b';');
        assert_eq!(prepare_input("Nom\tPrénom\n").delimiter, b'\t');
        assert_eq!(prepare_input("Nom,Prénom\n").delimiter, b',');
        assert_eq!(prepare_input("Nom\n").delimiter, b',');
        // Delimiters inside quotes do not count.
        assert_eq!(prepare_input("\"a;b;c\",Nom,Prénom\n").delimiter, b',');
    }

    #[test]
    fn scenario_french_headers() {
        let batch = normalize_batch("Nom,Prénom,Bureau,Email\nDupont,Jean,101,jean@x.fr\n").unwrap();
        assert_eq!(batch.records.len(), 1);
        let r = &batch.records[0];
        assert_eq!(r.last_name, "Dupont");
        assert_eq!(r.first_name, "Jean");
        assert_eq!(r.precinct, "101");
        assert_eq!(r.email, "jean@x.fr");
        assert_eq!(r.status, Status::NotContacted);
        assert!(!r.id.is_empty());
    }

    #[test]
    fn blank_rows_are_discarded() {
        let raw = "Nom;Prénom;Adresse;Email\nDupont;Jean;;\n;;;lost@x.fr\n;;;\n";
        let batch = normalize_batch(raw).unwrap();
        assert_eq!(batch.records.len(), 1);
        assert_eq!(batch.discarded, 2);
    }

    #[test]
    fn existing_ids_are_kept_and_duplicates_replaced() {
        let raw = "id,nom\nabc,Dupont\nabc,Durand\n,Martin\n";
        let batch = normalize_batch(raw).unwrap();
        assert_eq!(batch.records[0].id, "abc");
        assert_ne!(batch.records[1].id, "abc");
        assert!(batch.records[2].id.starts_with("row_"));
    }

    #[test]
    fn values_are_trimmed_and_status_read() {
        let raw = "Nom,Prénom,Statut,Remarque\n  Dupont , Jean ,Indécis, rappeler \n";
        let r = &normalize_batch(raw).unwrap().records[0];
        assert_eq!(r.last_name, "Dupont");
        assert_eq!(r.first_name, "Jean");
        assert_eq!(r.status, Status::Undecided);
        assert_eq!(r.remark, "rappeler");
    }

    #[test]
    fn short_rows_are_accepted() {
        let raw = "Nom,Prénom,Téléphone\nDupont\nMartin,Paul,0601020304\n";
        let batch = normalize_batch(raw).unwrap();
        assert_eq!(batch.records.len(), 2);
        assert_eq!(batch.records[0].phone, "");
        assert_eq!(batch.records[1].phone, "0601020304");
    }

    #[test]
    fn missing_header_is_an_error() {
        assert!(matches!(normalize_batch(""), Err(CanvassError::MissingHeader {})));
        assert!(matches!(
            normalize_batch("\u{feff}  \n"),
            Err(CanvassError::MissingHeader {})
        ));
        assert!(matches!(
            normalize_batch("sep=;\n"),
            Err(CanvassError::MissingHeader {})
        ));
    }

    #[test]
    fn synthesized_address_counts_as_identity() {
        let raw = "Numéro,Rue,Ville\n4,rue Pasteur,Ris-Orangis\n";
        let batch = normalize_batch(raw).unwrap();
        assert_eq!(batch.records.len(), 1);
        assert_eq!(batch.records[0].address, "4 rue Pasteur, Ris-Orangis");
    }
}
